//! NM command dispatcher (spec §4.1): one arm per wire command. Each handler
//! takes the catalog mutex only for the read-modify sequence it actually
//! needs, releasing it before any NM→SS round-trip and re-acquiring to
//! finalize, per §5's lock-ordering discipline.

mod acl;
mod exec;
mod passthrough;
mod view;

use docs_common::error::DocsError;
use docs_common::logging;
use docs_common::proto::Connection;
use docs_common::time::unix_now;

use crate::catalog::{Catalog, FileEntry, SsRecord};
use crate::session::SessionCtx;
use crate::ss_link::{self, SsEndpoint};
use crate::state::NmState;

pub async fn dispatch(
    conn: &mut Connection,
    line: &str,
    ctx: &mut SessionCtx,
    state: &NmState,
) -> Result<(), DocsError> {
    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    let result = match cmd {
        "LOGIN" => login(conn, rest, ctx, state).await,
        "CREATE" => create(conn, rest, ctx, state, false).await,
        "CREATEFOLDER" => create(conn, rest, ctx, state, true).await,
        "READ" | "STREAM" => route_data(conn, rest, ctx, state, false).await,
        "WRITE" => route_data(conn, rest, ctx, state, true).await,
        "DELETE" => delete(conn, rest, ctx, state).await,
        "MOVE" => move_file(conn, rest, ctx, state).await,
        "INFO" => info(conn, rest, ctx, state).await,
        "ADDACCESS" => acl::add_access(conn, rest, ctx, state).await,
        "REMACCESS" => acl::rem_access(conn, rest, ctx, state).await,
        "REQUESTACCESS" => acl::request_access(conn, rest, ctx, state).await,
        "APPROVE_REQUEST" => acl::approve_request(conn, rest, ctx, state).await,
        "LISTREQUESTS" | "VIEWREQUESTS" => acl::list_requests(conn, ctx, state).await,
        "VIEW" if rest.trim_start().starts_with("REQUEST") => acl::list_requests(conn, ctx, state).await,
        "CHECKPOINT" => passthrough::checkpoint(conn, rest, ctx, state).await,
        "VIEWCHECKPOINT" => passthrough::view_checkpoint(conn, rest, ctx, state).await,
        "REVERT" => passthrough::revert(conn, rest, ctx, state).await,
        "LISTCHECKPOINTS" => passthrough::list_checkpoints(conn, rest, ctx, state).await,
        "UNDO" => passthrough::undo(conn, rest, ctx, state).await,
        "EXEC" => exec::exec(conn, rest, ctx, state).await,
        "VIEW" => view::view(conn, rest, ctx, state).await,
        "VIEWFOLDER" => view::view_folder(conn, rest, state).await,
        "SEARCH" => view::search(conn, rest, ctx, state).await,
        "LIST" => view::list_users(conn, state).await,
        _ => Err(DocsError::UnknownCommand),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => conn.write_err(&e).await,
    }
}

pub(crate) fn require_login<'a>(ctx: &'a SessionCtx) -> Result<&'a str, DocsError> {
    ctx.user.as_deref().ok_or(DocsError::NotLoggedIn)
}

async fn login(conn: &mut Connection, rest: &str, ctx: &mut SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let mut parts = rest.split_whitespace();
    let user = parts.next().ok_or(DocsError::InvalidArgs)?.to_string();
    let advertised_port = parts.next().and_then(|p| p.parse::<u16>().ok());
    {
        let mut cat = state.catalog.lock().await;
        cat.add_user(&user)?;
    }
    ctx.user = Some(user.clone());
    ctx.advertised_port = advertised_port;
    logging::log_event("NM", "LOGIN", &user, "", 0);
    conn.write_line(&format!("OK LOGGED IN {user}")).await
}

/// Snapshot the assigned SS (or pick one for CREATE), release the lock,
/// hand the admin call off, then re-acquire to record the result.
async fn create(
    conn: &mut Connection,
    filename: &str,
    ctx: &SessionCtx,
    state: &NmState,
    is_folder: bool,
) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let valid = if is_folder {
        docs_common::validate::is_valid_folder_path(filename)
    } else {
        docs_common::validate::is_valid_filename(filename)
    };
    if !valid {
        return Err(DocsError::InvalidArgs);
    }

    let (primary, replicas): (SsRecord, Vec<SsRecord>) = {
        let cat = state.catalog.lock().await;
        if cat.ss_registry.is_empty() {
            return Err(DocsError::SsNotAvailable);
        }
        let primary = cat.first_active_primary().ok_or(DocsError::SsNotAvailable)?.clone();
        let replicas = cat.replicas_of(&primary.ss_id).into_iter().cloned().collect();
        (primary, replicas)
    };

    let ep = SsEndpoint { ip: primary.ip.clone(), admin_port: primary.admin_port };
    if is_folder {
        ss_link::create_folder(&ep, filename).await?;
    } else {
        ss_link::create(&ep, filename).await?;
    }

    let now = unix_now();
    {
        let mut cat = state.catalog.lock().await;
        cat.insert_file(FileEntry {
            filename: filename.to_string(),
            owner: user.to_string(),
            is_folder,
            ss_ip: primary.ip.clone(),
            ss_client_port: primary.client_port,
            readers: vec![],
            writers: vec![],
            created_time: now,
            modified_time: now,
            last_access_time: now,
            word_count: 0,
            char_count: 0,
        })?;
    }

    for replica in replicas {
        let rep_ep = SsEndpoint { ip: replica.ip.clone(), admin_port: replica.admin_port };
        ss_link::replicate_create(&rep_ep, filename, is_folder).await;
    }

    state.persist().await;
    logging::log_event("NM", if is_folder { "CREATEFOLDER" } else { "CREATE" }, user, filename, 0);
    if is_folder {
        conn.write_line("OK Folder created successfully!").await
    } else {
        conn.write_line("OK File Created Successfully!").await
    }
}

/// READ/STREAM/WRITE all resolve to `SS <ip> <port>` indirection after an
/// ACL check and a timestamp bump.
async fn route_data(
    conn: &mut Connection,
    rest: &str,
    ctx: &SessionCtx,
    state: &NmState,
    write: bool,
) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;

    let ep = {
        let mut cat = state.catalog.lock().await;
        let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
        let entry = &cat.files[idx];
        if write {
            if !entry.can_write(user) {
                return Err(DocsError::NoWriteAccess);
            }
        } else if !entry.can_read(user) {
            return Err(DocsError::NoAccess);
        }
        let (ss_ip, ss_client_port) = (entry.ss_ip.clone(), entry.ss_client_port);
        let rec = cat.route(&ss_ip, ss_client_port).ok_or(DocsError::SsNotAvailable)?.clone();
        let now = unix_now();
        let idx = cat.find(filename).expect("validated above");
        if write {
            cat.files[idx].modified_time = now;
        } else {
            cat.files[idx].last_access_time = now;
        }
        rec
    };

    logging::log_event("NM", if write { "WRITE" } else { "READ" }, user, filename, 0);
    conn.write_line(&format!("SS {} {}", ep.ip, ep.client_port)).await
}

async fn delete(conn: &mut Connection, filename: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let ep = {
        let mut cat = state.catalog.lock().await;
        let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
        if !cat.files[idx].is_owner(user) {
            return Err(DocsError::OnlyOwner);
        }
        let (ip, port) = (cat.files[idx].ss_ip.clone(), cat.files[idx].ss_client_port);
        let rec = cat.route(&ip, port).ok_or(DocsError::SsNotAvailable)?.clone();
        rec
    };
    let ep = SsEndpoint { ip: ep.ip, admin_port: ep.admin_port };

    if !ss_link::checklock(&ep, filename).await? {
        return Err(DocsError::FileLockedForWriting);
    }
    ss_link::delete(&ep, filename).await?;

    {
        let mut cat = state.catalog.lock().await;
        cat.remove_file(filename)?;
    }
    state.persist().await;
    logging::log_event("NM", "DELETE", user, filename, 0);
    conn.write_line(&format!("OK File '{filename}' deleted successfully!")).await
}

async fn move_file(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let mut tok = rest.split_whitespace();
    let filename = tok.next().ok_or(DocsError::InvalidArgs)?;
    let folder = tok.next().ok_or(DocsError::InvalidArgs)?;

    let leaf = filename.rsplit('/').next().unwrap_or(filename);
    let new_name = format!("{folder}/{leaf}");

    let ep = {
        let mut cat = state.catalog.lock().await;
        let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
        if !cat.files[idx].is_owner(user) {
            return Err(DocsError::OnlyOwner);
        }
        if !cat.contains(folder) {
            return Err(DocsError::FileNotFound);
        }
        if cat.contains(&new_name) {
            return Err(DocsError::FileExists);
        }
        let (ip, port) = (cat.files[idx].ss_ip.clone(), cat.files[idx].ss_client_port);
        cat.route(&ip, port).ok_or(DocsError::SsNotAvailable)?.clone()
    };
    let ep = SsEndpoint { ip: ep.ip, admin_port: ep.admin_port };
    ss_link::move_file(&ep, filename, &new_name).await?;

    {
        let mut cat = state.catalog.lock().await;
        let is_folder = cat.find(filename).map(|i| cat.files[i].is_folder).unwrap_or(false);
        cat.rename_file(filename, new_name.clone())?;
        if is_folder {
            rewrite_children(&mut cat, filename, &new_name);
        }
    }
    state.persist().await;
    logging::log_event("NM", "MOVE", user, &format!("{filename} -> {new_name}"), 0);
    conn.write_line(&format!("OK '{filename}' moved successfully!")).await
}

/// Resolution of the §9 open question: recursively rewrite child filenames
/// under the moved folder's old prefix.
fn rewrite_children(cat: &mut Catalog, old_prefix: &str, new_prefix: &str) {
    let old_dir = format!("{old_prefix}/");
    let renames: Vec<(String, String)> = cat
        .files
        .iter()
        .filter(|f| f.filename.starts_with(&old_dir))
        .map(|f| {
            let suffix = &f.filename[old_dir.len()..];
            (f.filename.clone(), format!("{new_prefix}/{suffix}"))
        })
        .collect();
    for (old, new) in renames {
        let _ = cat.rename_file(&old, new);
    }
}

async fn info(conn: &mut Connection, filename: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;
    let (ep, owner, readers, writers, created, modified, accessed) = {
        let mut cat = state.catalog.lock().await;
        let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
        if !cat.files[idx].can_read(user) {
            return Err(DocsError::NoAccess);
        }
        let entry = cat.files[idx].clone();
        let rec = cat.route(&entry.ss_ip, entry.ss_client_port).ok_or(DocsError::SsNotAvailable)?.clone();
        (
            SsEndpoint { ip: rec.ip, admin_port: rec.admin_port },
            entry.owner,
            entry.readers,
            entry.writers,
            entry.created_time,
            entry.modified_time,
            entry.last_access_time,
        )
    };
    let info = ss_link::info(&ep, filename).await?;

    {
        let mut cat = state.catalog.lock().await;
        if let Some(idx) = cat.find(filename) {
            cat.files[idx].word_count = info.words;
            cat.files[idx].char_count = info.chars;
        }
    }

    conn.write_block([
        format!("FILE {filename}"),
        format!("OWNER {owner}"),
        format!("CREATED {}", docs_common::time::unix_to_ist_string(created)),
        format!("MODIFIED {}", docs_common::time::unix_to_ist_string(modified)),
        format!("LAST_ACCESS {}", docs_common::time::unix_to_ist_string(accessed)),
        format!("READERS {}", readers.join(",")),
        format!("WRITERS {}", writers.join(",")),
        format!("SIZE {}", info.size),
        format!("WORDS {}", info.words),
        format!("CHARS {}", info.chars),
    ])
    .await
}
