//! Admin-port session loop (spec §6): one command per connection, SS
//! closes after replying. Used by the NM for CREATE, CREATEFOLDER, DELETE,
//! MOVE, CHECKLOCK, INFO, FETCH, SYNC, UNDO, CHECKPOINT, VIEWCHECKPOINT,
//! REVERT, LISTCHECKPOINTS, SEARCH.

use std::sync::Arc;

use docs_common::error::DocsError;
use docs_common::logging;
use docs_common::proto::Connection;
use tokio::net::TcpStream;

use crate::session_client::ClientState;
use crate::{checkpoint, search, storage, swap};

pub async fn handle_admin_connection(stream: TcpStream, state: Arc<ClientState>) {
    let mut conn = Connection::new(stream);
    let line = match conn.read_line().await {
        Ok(Some(l)) => l,
        _ => return,
    };
    if let Err(e) = dispatch(&mut conn, &line, &state).await {
        logging::log_event("SS", "ADMIN_ERR", "admin", &line, -1);
        let _ = e;
    }
}

async fn dispatch(conn: &mut Connection, line: &str, state: &ClientState) -> Result<(), DocsError> {
    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match cmd {
        "CREATE" => match storage::create(&state.layout, rest, false).await {
            Ok(()) => conn.write_line("OK created").await,
            Err(e) => conn.write_err(&e).await,
        },
        "CREATEFOLDER" => match storage::create(&state.layout, rest, true).await {
            Ok(()) => conn.write_line("OK created").await,
            Err(e) => conn.write_err(&e).await,
        },
        "DELETE" => match storage::delete(&state.layout, &state.table, rest).await {
            Ok(()) => conn.write_line("OK deleted").await,
            Err(e) => conn.write_err(&e).await,
        },
        "MOVE" => {
            let mut tok = rest.splitn(2, ' ');
            let old = tok.next().unwrap_or_default();
            let new = tok.next().unwrap_or_default();
            match storage::move_file(&state.layout, &state.table, old, new).await {
                Ok(()) => conn.write_line("OK moved").await,
                Err(e) => conn.write_err(&e).await,
            }
        }
        "CHECKLOCK" => {
            if swap::checklock(&state.table, rest).await {
                conn.write_line("OK not locked").await
            } else {
                conn.write_line("ERR file locked").await
            }
        }
        "INFO" => {
            let info = storage::info(&state.layout, rest).await;
            conn.write_line(&format!("SIZE {} WORDS {} CHARS {}", info.size, info.words, info.chars))
                .await
        }
        "FETCH" => match storage::fetch_lines(&state.layout, rest).await {
            Ok(lines) => {
                conn.write_line("BEGIN").await?;
                for line in lines {
                    conn.write_line(&line).await?;
                }
                conn.write_line("END").await
            }
            Err(_) => conn.write_err(&DocsError::FileNotFound).await,
        },
        "SYNC" => handle_sync(conn, state, rest).await,
        "UNDO" => match checkpoint::undo(&state.layout, rest).await {
            Ok(()) => conn.write_line("OK undo").await,
            Err(_) => conn.write_err(&DocsError::SystemError).await,
        },
        "CHECKPOINT" => {
            let mut tok = rest.splitn(2, ' ');
            let fname = tok.next().unwrap_or_default();
            let tag = tok.next().unwrap_or_default();
            match checkpoint::checkpoint(&state.layout, fname, tag).await {
                Ok(()) => conn.write_line("OK checkpoint created").await,
                Err(_) => conn.write_err(&DocsError::FileNotFound).await,
            }
        }
        "VIEWCHECKPOINT" => {
            let mut tok = rest.splitn(2, ' ');
            let fname = tok.next().unwrap_or_default();
            let tag = tok.next().unwrap_or_default();
            match checkpoint::view_checkpoint(&state.layout, fname, tag).await {
                Ok(bytes) => {
                    conn.write_line("OK").await?;
                    let text = String::from_utf8_lossy(&bytes);
                    for line in text.lines() {
                        conn.write_line(&format!("L {line}")).await?;
                    }
                    conn.write_line("END").await
                }
                Err(_) => conn.write_err(&DocsError::FileNotFound).await,
            }
        }
        "REVERT" => {
            let mut tok = rest.splitn(2, ' ');
            let fname = tok.next().unwrap_or_default();
            let tag = tok.next().unwrap_or_default();
            match checkpoint::revert(&state.layout, fname, tag).await {
                Ok(()) => conn.write_line("OK reverted").await,
                Err(_) => conn.write_err(&DocsError::FileNotFound).await,
            }
        }
        "LISTCHECKPOINTS" => {
            let tags = checkpoint::list_checkpoints(&state.layout, rest).await;
            let mut lines = vec!["CHECKPOINTS:".to_string()];
            lines.extend(tags);
            conn.write_block(lines).await
        }
        "SEARCH" => {
            let matches = search::search(&state.layout, rest).await;
            let mut lines = vec!["SEARCH RESULTS:".to_string()];
            lines.extend(matches.into_iter().map(|m| format!("--> {m}")));
            conn.write_block(lines).await
        }
        _ => conn.write_err(&DocsError::UnknownCommand).await,
    }
}

async fn handle_sync(conn: &mut Connection, state: &ClientState, filename: &str) -> Result<(), DocsError> {
    conn.write_line("OK").await?;
    let mut lines = Vec::new();
    loop {
        match conn.read_line().await {
            Ok(Some(l)) if l == "END" => break,
            Ok(Some(l)) => lines.push(l.strip_prefix("L ").unwrap_or(&l).to_string()),
            _ => break,
        }
    }
    let content = lines.join("\n");
    match storage::sync_write(&state.layout, filename, content.as_bytes()).await {
        Ok(()) => conn.write_line("OK synced").await,
        Err(_) => conn.write_line("ERR sync failed").await,
    }
}
