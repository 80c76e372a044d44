mod checkpoint;
mod locktable;
mod paths;
mod search;
mod session_admin;
mod session_client;
mod storage;
mod swap;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use docs_common::config::{self, SsConfig};
use docs_common::proto::dial;
use docs_common::session_id::SessionIdGenerator;
use docs_common::{logging, DocsError};
use tokio::net::TcpListener;
use tracing::{info, warn};

use locktable::LockTable;
use paths::Layout;
use session_client::ClientState;

#[derive(Parser, Debug)]
#[command(name = "ss", about = "Docs++ Storage Server")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    ss_id: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    client_port: Option<u16>,
    #[arg(long)]
    admin_port: Option<u16>,
    #[arg(long)]
    nm_host: Option<String>,
    #[arg(long)]
    nm_port: Option<u16>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), DocsError> {
    let args = Args::parse();
    let _guard = logging::init("ss");

    let mut cfg: SsConfig = config::load(args.config.as_ref())?;
    if let Some(v) = args.ss_id { cfg.ss_id = v; }
    if let Some(v) = args.host { cfg.host = v; }
    if let Some(v) = args.client_port { cfg.client_port = v; }
    if let Some(v) = args.admin_port { cfg.admin_port = v; }
    if let Some(v) = args.nm_host { cfg.nm_host = v; }
    if let Some(v) = args.nm_port { cfg.nm_port = v; }
    if let Some(v) = args.data_dir { cfg.data_dir = v; }

    let state = Arc::new(ClientState {
        layout: Layout::new(cfg.data_dir.clone()),
        table: LockTable::new(),
    });
    let sessions = Arc::new(SessionIdGenerator::new());

    tokio::fs::create_dir_all(&cfg.data_dir).await.ok();

    let client_listener = TcpListener::bind((cfg.host.as_str(), cfg.client_port))
        .await
        .map_err(|_| DocsError::SystemError)?;
    let admin_listener = TcpListener::bind((cfg.host.as_str(), cfg.admin_port))
        .await
        .map_err(|_| DocsError::SystemError)?;

    info!("ss '{}' listening: client={}:{} admin={}:{}", cfg.ss_id, cfg.host, cfg.client_port, cfg.host, cfg.admin_port);

    let heartbeat_cfg = cfg.clone();
    tokio::spawn(async move {
        heartbeat_loop(heartbeat_cfg).await;
    });

    let client_state = state.clone();
    let client_host = cfg.host.clone();
    let client_port = cfg.client_port;
    let client_task = tokio::spawn(async move {
        loop {
            match client_listener.accept().await {
                Ok((stream, _addr)) => {
                    let session = sessions.next();
                    let st = client_state.clone();
                    tokio::spawn(async move {
                        session_client::handle_client_connection(stream, session, st).await;
                    });
                }
                Err(e) => warn!("client accept error on {}:{}: {e}", client_host, client_port),
            }
        }
    });

    let admin_state = state.clone();
    let admin_task = tokio::spawn(async move {
        loop {
            match admin_listener.accept().await {
                Ok((stream, _addr)) => {
                    let st = admin_state.clone();
                    tokio::spawn(async move {
                        session_admin::handle_admin_connection(stream, st).await;
                    });
                }
                Err(e) => warn!("admin accept error: {e}"),
            }
        }
    });

    let _ = tokio::join!(client_task, admin_task);
    Ok(())
}

/// Sends `REGISTER <ss_id> <client_port> <admin_port> <ip>` on startup,
/// then on a fixed ≈20s cadence (spec §4.3).
async fn heartbeat_loop(cfg: SsConfig) {
    let mut interval = tokio::time::interval(Duration::from_secs(20));
    loop {
        interval.tick().await;
        if let Err(e) = send_register(&cfg).await {
            warn!("REGISTER to {}:{} failed: {e}", cfg.nm_host, cfg.nm_port);
        }
    }
}

async fn send_register(cfg: &SsConfig) -> Result<(), DocsError> {
    let mut conn = dial(&cfg.nm_host, cfg.nm_port).await?;
    conn.write_line(&format!(
        "REGISTER {} {} {} {}",
        cfg.ss_id, cfg.client_port, cfg.admin_port, cfg.host
    ))
    .await?;
    conn.read_line().await?;
    Ok(())
}
