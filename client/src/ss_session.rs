//! SS-facing half of the REPL: the direct data path followed after an NM
//! `SS <ip> <port>` indirection reply (spec §6).

use docs_common::error::DocsError;
use docs_common::proto::{dial, Connection};

pub struct SsSession {
    conn: Connection,
}

impl SsSession {
    pub async fn connect(ip: &str, port: u16) -> Result<Self, DocsError> {
        let mut conn = dial(ip, port).await?;
        conn.read_line().await?; // WELCOME SS CLIENT
        Ok(Self { conn })
    }

    pub async fn read(&mut self, filename: &str) -> Result<Vec<String>, DocsError> {
        self.conn.write_line(&format!("READ {filename}")).await?;
        let header = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
        if header != "OK" {
            return Ok(vec![header]);
        }
        self.read_until("END").await
    }

    pub async fn stream(&mut self, filename: &str) -> Result<Vec<String>, DocsError> {
        self.conn.write_line(&format!("STREAM {filename}")).await?;
        let header = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
        if header != "OK" {
            return Ok(vec![header]);
        }
        self.read_until("STOP").await
    }

    pub async fn write_begin(&mut self, filename: &str, sidx: usize) -> Result<String, DocsError> {
        self.conn.write_line(&format!("WRITE_BEGIN {filename} {sidx}")).await?;
        self.conn.read_line().await?.ok_or(DocsError::SystemError)
    }

    pub async fn write_update(&mut self, filename: &str, sidx: usize, widx: i64, content: &str) -> Result<String, DocsError> {
        self.conn
            .write_line(&format!("WRITE_UPDATE {filename} {sidx} {widx} {content}"))
            .await?;
        self.conn.read_line().await?.ok_or(DocsError::SystemError)
    }

    pub async fn write_end(&mut self, filename: &str, sidx: usize) -> Result<String, DocsError> {
        self.conn.write_line(&format!("WRITE_END {filename} {sidx}")).await?;
        self.conn.read_line().await?.ok_or(DocsError::SystemError)
    }

    pub async fn quit(&mut self) {
        let _ = self.conn.write_line("QUIT").await;
    }

    async fn read_until(&mut self, terminator: &str) -> Result<Vec<String>, DocsError> {
        let mut lines = Vec::new();
        loop {
            let line = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
            if line == terminator {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }
}
