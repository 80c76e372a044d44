//! SS registration channel, liveness failure detector, and crash-recovery
//! orchestration (spec §4.3).

use std::sync::Arc;
use std::time::Duration;

use docs_common::error::DocsError;
use docs_common::proto::Connection;
use docs_common::time::unix_now;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::ss_link::{self, SsEndpoint};
use crate::state::NmState;

/// Accept loop for `REGISTER <ss_id> <client_port> <admin_port> <ip>` —
/// one line per connection, the SS closes right after sending it.
pub async fn run_registration_listener(state: Arc<NmState>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let st = state.clone();
                tokio::spawn(async move {
                    handle_registration(stream, st).await;
                });
            }
            Err(e) => warn!("ss registration accept error: {e}"),
        }
    }
}

async fn handle_registration(stream: TcpStream, state: Arc<NmState>) {
    let mut conn = Connection::new(stream);
    let line = match conn.read_line().await {
        Ok(Some(l)) => l,
        _ => return,
    };
    let mut parts = line.split_whitespace();
    let tag = parts.next().unwrap_or_default();
    if tag != "REGISTER" {
        let _ = conn.write_err(&DocsError::UnknownCommand).await;
        return;
    }
    let (Some(ss_id), Some(client_port), Some(admin_port), Some(ip)) = (
        parts.next(),
        parts.next().and_then(|p| p.parse::<u16>().ok()),
        parts.next().and_then(|p| p.parse::<u16>().ok()),
        parts.next(),
    ) else {
        let _ = conn.write_err(&DocsError::InvalidArgs).await;
        return;
    };

    let recovered = {
        let mut cat = state.catalog.lock().await;
        match cat.register_ss(ss_id, ip, client_port, admin_port) {
            Ok((was_recovering, _)) => was_recovering,
            Err(e) => {
                let _ = conn.write_err(&e).await;
                return;
            }
        }
    };

    let _ = conn.write_line("OK REGISTERED").await;
    info!("ss '{ss_id}' registered at {ip}:{client_port}/{admin_port}");

    if recovered {
        let state = state.clone();
        let ss_id = ss_id.to_string();
        tokio::spawn(async move {
            recover_ss(state, &ss_id).await;
        });
    }
}

/// Every ~10s, mark any SS whose last heartbeat is older than
/// `ss_liveness_secs` as inactive.
pub async fn run_failure_detector(state: Arc<NmState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(10));
    loop {
        interval.tick().await;
        let now = unix_now();
        let deadline = state.cfg.ss_liveness_secs as i64;
        let mut cat = state.catalog.lock().await;
        for rec in cat.ss_registry.iter_mut() {
            if rec.is_active && now - rec.last_heartbeat > deadline {
                rec.is_active = false;
                warn!("ss '{}' marked inactive (no heartbeat for {}s)", rec.ss_id, now - rec.last_heartbeat);
            }
        }
    }
}

/// Recover a just-reregistered SS: fetch every file it's responsible for
/// from an active replica and `SYNC` it back in (spec §4.3).
async fn recover_ss(state: Arc<NmState>, ss_id: &str) {
    let (recovered_ep, replica_ep, filenames): (SsEndpoint, Option<SsEndpoint>, Vec<String>) = {
        let cat = state.catalog.lock().await;
        let Some(rec) = cat.ss_registry.iter().find(|s| s.ss_id == ss_id) else {
            return;
        };
        let recovered_ep = SsEndpoint {
            ip: rec.ip.clone(),
            admin_port: rec.admin_port,
        };
        let source = if rec.is_primary {
            cat.replicas_of(ss_id).into_iter().find(|r| r.is_active).map(|r| SsEndpoint {
                ip: r.ip.clone(),
                admin_port: r.admin_port,
            })
        } else {
            rec.replica_of.as_ref().and_then(|primary_id| {
                cat.ss_registry
                    .iter()
                    .find(|s| &s.ss_id == primary_id && s.is_active)
                    .map(|s| SsEndpoint { ip: s.ip.clone(), admin_port: s.admin_port })
            })
        };
        let filenames = cat
            .files
            .iter()
            .filter(|f| f.ss_ip == rec.ip && f.ss_client_port == rec.client_port)
            .map(|f| f.filename.clone())
            .collect();
        (recovered_ep, source, filenames)
    };

    let Some(replica_ep) = replica_ep else {
        warn!("no active replica found to recover ss '{ss_id}' from");
        return;
    };

    for filename in filenames {
        match ss_link::fetch(&replica_ep, &filename).await {
            Ok(bytes) => {
                if let Err(e) = ss_link::sync(&recovered_ep, &filename, &bytes).await {
                    warn!("recovery sync failed for '{filename}' on '{ss_id}': {e}");
                }
            }
            Err(e) => warn!("recovery fetch failed for '{filename}': {e}"),
        }
    }
    info!("recovery complete for ss '{ss_id}'");
}
