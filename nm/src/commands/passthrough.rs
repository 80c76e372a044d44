//! Pass-through delegation to SS admin: CHECKPOINT, VIEWCHECKPOINT, REVERT,
//! LISTCHECKPOINTS, UNDO (spec §4.1).

use docs_common::error::DocsError;
use docs_common::logging;
use docs_common::proto::Connection;

use crate::session::SessionCtx;
use crate::ss_link::{self, SsEndpoint};
use crate::state::NmState;

use super::require_login;

async fn resolve_endpoint(state: &NmState, filename: &str, user: &str, need_write: bool) -> Result<SsEndpoint, DocsError> {
    let cat = state.catalog.lock().await;
    let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
    let entry = &cat.files[idx];
    if need_write {
        if !entry.can_write(user) {
            return Err(DocsError::NoWriteAccess);
        }
    } else if !entry.can_read(user) {
        return Err(DocsError::NoAccess);
    }
    let rec = cat.route(&entry.ss_ip, entry.ss_client_port).ok_or(DocsError::SsNotAvailable)?;
    Ok(SsEndpoint { ip: rec.ip.clone(), admin_port: rec.admin_port })
}

pub async fn checkpoint(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let tag = tok.next().ok_or(DocsError::InvalidArgs)?;
    let ep = resolve_endpoint(state, filename, user, false).await?;
    ss_link::checkpoint(&ep, filename, tag).await?;
    logging::log_event("NM", "CHECKPOINT", user, &format!("{filename} {tag}"), 0);
    conn.write_line("OK checkpoint created").await
}

pub async fn view_checkpoint(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let tag = tok.next().ok_or(DocsError::InvalidArgs)?;
    let ep = resolve_endpoint(state, filename, user, false).await?;
    let content = ss_link::view_checkpoint(&ep, filename, tag).await?;
    conn.write_block(content.lines()).await
}

pub async fn revert(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let tag = tok.next().ok_or(DocsError::InvalidArgs)?;
    let ep = resolve_endpoint(state, filename, user, false).await?;
    ss_link::revert(&ep, filename, tag).await?;
    logging::log_event("NM", "REVERT", user, &format!("{filename} {tag}"), 0);
    conn.write_line("OK reverted").await
}

pub async fn list_checkpoints(conn: &mut Connection, filename: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let ep = resolve_endpoint(state, filename, user, false).await?;
    let tags = ss_link::list_checkpoints(&ep, filename).await?;
    conn.write_block(tags).await
}

pub async fn undo(conn: &mut Connection, filename: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let ep = resolve_endpoint(state, filename, user, true).await?;
    ss_link::undo(&ep, filename).await?;
    logging::log_event("NM", "UNDO", user, filename, 0);
    conn.write_line("OK Undo Successful!").await
}
