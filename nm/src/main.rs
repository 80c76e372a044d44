mod catalog;
mod commands;
mod registry;
mod render;
mod session;
mod ss_link;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use docs_common::config::{self, NmConfig};
use docs_common::{logging, DocsError};
use tokio::net::TcpListener;
use tracing::info;

use state::NmState;

#[derive(Parser, Debug)]
#[command(name = "nm", about = "Docs++ Naming Server")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    ss_port: Option<u16>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    allow_unsafe_exec: bool,
}

#[tokio::main]
async fn main() -> Result<(), DocsError> {
    let args = Args::parse();
    let _guard = logging::init("nm");

    let mut cfg: NmConfig = config::load(args.config.as_ref())?;
    if let Some(v) = args.host { cfg.host = v; }
    if let Some(v) = args.port { cfg.port = v; }
    if let Some(v) = args.ss_port { cfg.ss_port = v; }
    if let Some(v) = args.data_dir { cfg.data_dir = v; }
    if args.allow_unsafe_exec { cfg.allow_unsafe_exec = true; }

    let state = Arc::new(NmState::new(cfg));

    let client_listener = TcpListener::bind((state.cfg.host.as_str(), state.cfg.port))
        .await
        .map_err(|_| DocsError::SystemError)?;
    let ss_listener = TcpListener::bind((state.cfg.host.as_str(), state.cfg.ss_port))
        .await
        .map_err(|_| DocsError::SystemError)?;

    info!(
        "nm listening: clients={}:{} ss_registration={}:{}",
        state.cfg.host, state.cfg.port, state.cfg.host, state.cfg.ss_port
    );

    let detector_state = state.clone();
    tokio::spawn(async move {
        registry::run_failure_detector(detector_state).await;
    });

    let registration_state = state.clone();
    let registration_task = tokio::spawn(async move {
        registry::run_registration_listener(registration_state, ss_listener).await;
    });

    let client_task = tokio::spawn(async move {
        loop {
            match client_listener.accept().await {
                Ok((stream, _addr)) => {
                    let st = state.clone();
                    tokio::spawn(async move {
                        session::handle_client_connection(stream, st).await;
                    });
                }
                Err(e) => tracing::warn!("client accept error: {e}"),
            }
        }
    });

    let _ = tokio::join!(client_task, registration_task);
    Ok(())
}
