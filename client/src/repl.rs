//! Interactive line REPL (spec §2): every command is sent to the NM first;
//! READ/STREAM/WRITE follow the `SS <ip> <port>` indirection reply to talk
//! to the storage server directly.

use docs_common::error::DocsError;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::nm_session::{NmSession, Reply};
use crate::ss_session::SsSession;

struct WriteSession {
    ss: SsSession,
    filename: String,
    sidx: usize,
}

pub async fn run(nm_host: &str, nm_port: u16) -> Result<(), DocsError> {
    let (mut nm, welcome) = NmSession::connect(nm_host, nm_port).await?;
    println!("{welcome}");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut write_session: Option<WriteSession> = None;

    print!("> ");
    flush_stdout();

    while let Some(line) = stdin.next_line().await.map_err(|_| DocsError::SystemError)? {
        let line = line.trim();
        if line.is_empty() {
            print!("> ");
            flush_stdout();
            continue;
        }

        let cmd = line.split_whitespace().next().unwrap_or_default();
        let handled = match cmd {
            "WRITE_UPDATE" => handle_write_update(line, &mut write_session).await,
            "WRITE_END" => handle_write_end(&mut write_session).await,
            _ => None,
        };

        if let Some(output) = handled {
            println!("{output}");
        } else {
            match nm.send(line).await {
                Ok(Reply::Line(l)) => {
                    println!("{l}");
                    if let Some((ip, port)) = parse_ss_indirection(&l) {
                        follow_indirection(cmd, line, &ip, port, &mut write_session).await;
                    }
                    if cmd == "QUIT" {
                        break;
                    }
                }
                Ok(Reply::Block(lines)) => {
                    for l in lines {
                        println!("{l}");
                    }
                }
                Err(e) => println!("{}", e.wire_line()),
            }
        }

        print!("> ");
        flush_stdout();
    }

    if let Some(mut ws) = write_session.take() {
        ws.ss.quit().await;
    }
    Ok(())
}

fn parse_ss_indirection(line: &str) -> Option<(String, u16)> {
    let mut tok = line.split_whitespace();
    if tok.next()? != "SS" {
        return None;
    }
    let ip = tok.next()?.to_string();
    let port: u16 = tok.next()?.parse().ok()?;
    Some((ip, port))
}

async fn follow_indirection(cmd: &str, original: &str, ip: &str, port: u16, write_session: &mut Option<WriteSession>) {
    let Ok(mut ss) = SsSession::connect(ip, port).await else {
        println!("ERR SS not reachable");
        return;
    };

    let mut tok = original.split_whitespace();
    tok.next(); // command itself
    let filename = tok.next().unwrap_or_default().to_string();

    match cmd {
        "READ" => match ss.read(&filename).await {
            Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
            Err(e) => println!("{}", e.wire_line()),
        },
        "STREAM" => match ss.stream(&filename).await {
            Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
            Err(e) => println!("{}", e.wire_line()),
        },
        "WRITE" => {
            let sidx: usize = tok.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            match ss.write_begin(&filename, sidx).await {
                Ok(reply) => {
                    println!("{reply}");
                    *write_session = Some(WriteSession { ss, filename, sidx });
                }
                Err(e) => println!("{}", e.wire_line()),
            }
        }
        _ => {}
    }
}

async fn handle_write_update(line: &str, write_session: &mut Option<WriteSession>) -> Option<String> {
    let Some(ws) = write_session.as_mut() else {
        return Some("ERR no active write session".to_string());
    };
    let mut tok = line.split_whitespace();
    tok.next(); // WRITE_UPDATE
    let widx: i64 = match tok.next().and_then(|s| s.parse().ok()) {
        Some(v) => v,
        None => return Some("ERR bad args".to_string()),
    };
    let content = tok.collect::<Vec<_>>().join(" ");
    match ws.ss.write_update(&ws.filename, ws.sidx, widx, &content).await {
        Ok(reply) => Some(reply),
        Err(e) => Some(e.wire_line()),
    }
}

async fn handle_write_end(write_session: &mut Option<WriteSession>) -> Option<String> {
    let mut ws = write_session.take()?;
    match ws.ss.write_end(&ws.filename, ws.sidx).await {
        Ok(reply) => Some(reply),
        Err(e) => Some(e.wire_line()),
    }
}

fn flush_stdout() {
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ss_indirection_line() {
        assert_eq!(
            parse_ss_indirection("SS 10.0.0.5 8000"),
            Some(("10.0.0.5".to_string(), 8000))
        );
    }

    #[test]
    fn rejects_non_ss_lines() {
        assert_eq!(parse_ss_indirection("OK done"), None);
        assert_eq!(parse_ss_indirection("SS 10.0.0.5"), None);
        assert_eq!(parse_ss_indirection("SS 10.0.0.5 not-a-port"), None);
    }

    #[tokio::test]
    async fn write_update_without_open_session_errors() {
        let mut write_session: Option<WriteSession> = None;
        let reply = handle_write_update("WRITE_UPDATE 2 brave", &mut write_session).await;
        assert_eq!(reply, Some("ERR no active write session".to_string()));
    }

    #[tokio::test]
    async fn write_end_without_open_session_returns_none() {
        let mut write_session: Option<WriteSession> = None;
        assert_eq!(handle_write_end(&mut write_session).await, None);
    }
}
