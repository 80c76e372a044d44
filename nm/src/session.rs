//! Client-port session loop (spec §6): `WELCOME Docs++ NM. Please LOGIN
//! <username>`, one command per line, tracks the session's logged-in user.

use std::sync::Arc;

use docs_common::logging;
use docs_common::proto::Connection;
use tokio::net::TcpStream;

use crate::commands;
use crate::state::NmState;

#[derive(Default)]
pub struct SessionCtx {
    pub user: Option<String>,
    /// `LOGIN <user> [advertised_port]` — recorded for parity with the
    /// original, but carries no behavior (§9 supplement).
    pub advertised_port: Option<u16>,
}

pub async fn handle_client_connection(stream: TcpStream, state: Arc<NmState>) {
    let mut conn = Connection::new(stream);
    if conn
        .write_line("WELCOME Docs++ NM. Please LOGIN <username>")
        .await
        .is_err()
    {
        return;
    }

    let mut ctx = SessionCtx::default();

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
            let _ = conn.write_line("BYE").await;
            break;
        }

        if let Err(e) = commands::dispatch(&mut conn, line, &mut ctx, &state).await {
            logging::log_event("NM", "DISPATCH_ERR", ctx.user.as_deref().unwrap_or("-"), line, -1);
            let _ = e;
        }
    }
}
