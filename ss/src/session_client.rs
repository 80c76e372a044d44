//! Client-port session loop (spec §6): `READ`, `STREAM`, `WRITE_BEGIN`,
//! `WRITE_UPDATE`, `WRITE_END`, `QUIT`.

use std::sync::Arc;
use std::time::Duration;

use docs_common::error::DocsError;
use docs_common::proto::Connection;
use docs_common::session_id::SessionId;
use docs_common::{blob, logging};
use tokio::net::TcpStream;

use crate::locktable::LockTable;
use crate::paths::Layout;
use crate::swap;

pub struct ClientState {
    pub layout: Layout,
    pub table: LockTable,
}

pub async fn handle_client_connection(stream: TcpStream, session: SessionId, state: Arc<ClientState>) {
    let mut conn = Connection::new(stream);
    if conn.write_line("WELCOME SS CLIENT").await.is_err() {
        return;
    }

    loop {
        let line = match conn.read_line().await {
            Ok(Some(l)) => l,
            _ => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "QUIT" {
            conn.write_line("BYE").await.ok();
            break;
        }

        if let Err(e) = dispatch(&mut conn, line, session, &state).await {
            logging::log_event("SS", "CLIENT_ERR", "client", line, -1);
            let _ = e;
        }
    }

    swap::reap_session(&state.layout, &state.table, session).await;
}

async fn dispatch(
    conn: &mut Connection,
    line: &str,
    session: SessionId,
    state: &ClientState,
) -> Result<(), DocsError> {
    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();

    match cmd {
        "READ" => handle_read(conn, &state.layout, rest).await,
        "STREAM" => handle_stream(conn, &state.layout, rest).await,
        "WRITE_BEGIN" => handle_write_begin(conn, state, rest, session).await,
        "WRITE_UPDATE" => handle_write_update(conn, state, rest, session).await,
        "WRITE_END" => handle_write_end(conn, state, rest, session).await,
        _ => conn.write_err(&DocsError::UnknownCommand).await,
    }
}

async fn handle_read(conn: &mut Connection, layout: &Layout, filename: &str) -> Result<(), DocsError> {
    let live = layout.live(filename);
    match blob::read_whole(&live).await {
        Ok(bytes) => {
            conn.write_line("OK").await?;
            let text = String::from_utf8_lossy(&bytes);
            let lines: Vec<&str> = text.lines().collect();
            conn.write_block(lines).await
        }
        Err(_) => conn.write_err(&DocsError::FileNotFound).await,
    }
}

async fn handle_stream(conn: &mut Connection, layout: &Layout, filename: &str) -> Result<(), DocsError> {
    let live = layout.live(filename);
    match blob::read_whole(&live).await {
        Ok(bytes) => {
            conn.write_line("OK").await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            for word in text.split_whitespace() {
                conn.write_line(word).await?;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            conn.write_line("STOP").await
        }
        Err(_) => conn.write_err(&DocsError::FileNotFound).await,
    }
}

async fn handle_write_begin(
    conn: &mut Connection,
    state: &ClientState,
    rest: &str,
    session: SessionId,
) -> Result<(), DocsError> {
    let mut tok = rest.splitn(2, ' ');
    let filename = tok.next().unwrap_or_default().to_string();
    let sidx: usize = match tok.next().and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => return conn.write_err(&DocsError::InvalidArgs).await,
    };

    match swap::write_begin(&state.layout, &state.table, &filename, sidx, session).await {
        Ok(()) => conn.write_line(&format!("OK lock {filename} {sidx}")).await,
        Err(e) => conn.write_err(&e).await,
    }
}

async fn handle_write_update(
    conn: &mut Connection,
    state: &ClientState,
    rest: &str,
    session: SessionId,
) -> Result<(), DocsError> {
    let mut tok = rest.splitn(4, ' ');
    let filename = tok.next().unwrap_or_default().to_string();
    let sidx: usize = match tok.next().and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => return conn.write_err(&DocsError::InvalidArgs).await,
    };
    let widx: i64 = match tok.next().and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => return conn.write_err(&DocsError::InvalidArgs).await,
    };
    let content = tok.next().unwrap_or_default();

    match swap::write_update(&state.layout, &state.table, &filename, sidx, widx, content, session).await {
        Ok(()) => conn.write_line("OK updated").await,
        Err(e) => conn.write_err(&e).await,
    }
}

async fn handle_write_end(
    conn: &mut Connection,
    state: &ClientState,
    rest: &str,
    session: SessionId,
) -> Result<(), DocsError> {
    let mut tok = rest.splitn(2, ' ');
    let filename = tok.next().unwrap_or_default().to_string();
    let sidx: usize = match tok.next().and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => return conn.write_err(&DocsError::InvalidArgs).await,
    };

    match swap::write_end(&state.layout, &state.table, &filename, sidx, session).await {
        Ok(()) => conn.write_line("OK end").await,
        Err(e) => conn.write_err(&e).await,
    }
}
