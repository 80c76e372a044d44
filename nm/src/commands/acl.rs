//! ADDACCESS/REMACCESS/REQUESTACCESS/APPROVE_REQUEST/LISTREQUESTS (spec §4.1).

use docs_common::error::DocsError;
use docs_common::logging;
use docs_common::proto::Connection;

use crate::catalog::AccessType;
use crate::session::SessionCtx;
use crate::state::NmState;

use super::require_login;

pub async fn add_access(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let flag = tok.next().ok_or(DocsError::InvalidArgs)?;
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let target = tok.next().ok_or(DocsError::InvalidArgs)?;
    let write = match flag {
        "-W" => true,
        "-R" => false,
        _ => return Err(DocsError::InvalidArgs),
    };

    let mut cat = state.catalog.lock().await;
    let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
    if !cat.files[idx].is_owner(user) {
        return Err(DocsError::OnlyOwner);
    }
    cat.files[idx].grant(target, write);
    drop(cat);
    state.persist().await;
    logging::log_event("NM", "ADDACCESS", user, &format!("{filename} {target} {flag}"), 0);
    conn.write_line("OK Access granted successfully!").await
}

pub async fn rem_access(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let target = tok.next().ok_or(DocsError::InvalidArgs)?;

    let mut cat = state.catalog.lock().await;
    let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
    if !cat.files[idx].is_owner(user) {
        return Err(DocsError::OnlyOwner);
    }
    cat.files[idx].revoke(target);
    drop(cat);
    state.persist().await;
    logging::log_event("NM", "REMACCESS", user, &format!("{filename} {target}"), 0);
    conn.write_line("OK Access removed successfully!").await
}

pub async fn request_access(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let filename = rest.split_whitespace().next().ok_or(DocsError::InvalidArgs)?;

    let mut cat = state.catalog.lock().await;
    let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
    if cat.files[idx].can_read(user) {
        return Err(DocsError::InvalidArgs);
    }
    cat.add_access_request(filename, user, AccessType::Read)?;
    drop(cat);
    state.persist().await;
    logging::log_event("NM", "REQUESTACCESS", user, filename, 0);
    conn.write_line("OK Access request submitted successfully!").await
}

pub async fn approve_request(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?.to_string();
    let target = tok.next().ok_or(DocsError::InvalidArgs)?.to_string();
    let write = matches!(tok.next(), Some("-W"));

    let mut cat = state.catalog.lock().await;
    let idx = cat.find(&filename).ok_or(DocsError::FileNotFound)?;
    if !cat.files[idx].is_owner(user) {
        return Err(DocsError::OnlyOwner);
    }
    let request = cat.take_access_request(&filename, &target).ok_or(DocsError::InvalidArgs)?;
    let write = write || request.access_type == crate::catalog::AccessType::Write;
    cat.files[idx].grant(&target, write);
    drop(cat);
    state.persist().await;
    logging::log_event("NM", "APPROVE_REQUEST", user, &format!("{filename} {target}"), 0);
    conn.write_line("OK Access request approved successfully!").await
}

pub async fn list_requests(conn: &mut Connection, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let cat = state.catalog.lock().await;
    let lines: Vec<String> = cat
        .access_requests
        .iter()
        .filter(|r| {
            cat.files
                .iter()
                .find(|f| f.filename == r.filename)
                .map(|f| f.is_owner(user))
                .unwrap_or(false)
        })
        .map(|r| {
            let kind = if r.access_type == AccessType::Write { "-W" } else { "-R" };
            format!("{} {} {}", r.filename, r.requesting_user, kind)
        })
        .collect();
    drop(cat);
    conn.write_block(lines).await
}
