//! NM-facing half of the REPL: dial, read the welcome banner, send a raw
//! command line, and read back either a single reply line or a multi-line
//! `END`-terminated block depending on which command was sent (spec §6).

use docs_common::error::DocsError;
use docs_common::proto::{dial, Connection};

pub enum Reply {
    Line(String),
    Block(Vec<String>),
}

/// Commands whose NM reply is a single line rather than an `END`-terminated
/// block, per the table in spec §4.1.
fn is_single_line(cmd: &str) -> bool {
    matches!(
        cmd,
        "LOGIN"
            | "CREATE"
            | "CREATEFOLDER"
            | "DELETE"
            | "MOVE"
            | "ADDACCESS"
            | "REMACCESS"
            | "REQUESTACCESS"
            | "APPROVE_REQUEST"
            | "UNDO"
            | "CHECKPOINT"
            | "REVERT"
            | "READ"
            | "STREAM"
            | "WRITE"
    )
}

pub struct NmSession {
    conn: Connection,
}

impl NmSession {
    pub async fn connect(host: &str, port: u16) -> Result<(Self, String), DocsError> {
        let mut conn = dial(host, port).await?;
        let welcome = conn.read_line().await?.unwrap_or_default();
        Ok((Self { conn }, welcome))
    }

    pub async fn send(&mut self, line: &str) -> Result<Reply, DocsError> {
        self.conn.write_line(line).await?;
        let cmd = line.split_whitespace().next().unwrap_or_default();

        if cmd == "EXEC" {
            let first = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
            if !first.starts_with("OK") {
                return Ok(Reply::Line(first));
            }
            let mut lines = vec![first];
            lines.extend(self.read_block().await?);
            return Ok(Reply::Block(lines));
        }

        if is_single_line(cmd) {
            let reply = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
            Ok(Reply::Line(reply))
        } else {
            Ok(Reply::Block(self.read_block().await?))
        }
    }

    async fn read_block(&mut self) -> Result<Vec<String>, DocsError> {
        let mut lines = Vec::new();
        loop {
            let line = self.conn.read_line().await?.ok_or(DocsError::SystemError)?;
            if line == "END" {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_commands_classified_correctly() {
        for cmd in ["LOGIN", "CREATE", "DELETE", "MOVE", "READ", "STREAM", "WRITE", "UNDO"] {
            assert!(is_single_line(cmd), "{cmd} should be single-line");
        }
    }

    #[test]
    fn block_commands_classified_correctly() {
        for cmd in ["INFO", "VIEW", "VIEWFOLDER", "LISTREQUESTS", "SEARCH", "LIST", "VIEWCHECKPOINT", "LISTCHECKPOINTS"] {
            assert!(!is_single_line(cmd), "{cmd} should be a block reply");
        }
    }
}
