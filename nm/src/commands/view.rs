//! VIEW, VIEWFOLDER, SEARCH, LIST (spec §4.1).

use std::collections::HashSet;

use docs_common::error::DocsError;
use docs_common::proto::Connection;

use crate::render;
use crate::session::SessionCtx;
use crate::ss_link::SsEndpoint;
use crate::state::NmState;

use super::require_login;

pub async fn view(conn: &mut Connection, rest: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let show_all = rest.contains("-a");
    let long = rest.contains("-l");

    let cat = state.catalog.lock().await;
    let visible: Vec<crate::catalog::FileEntry> = cat
        .files
        .iter()
        .filter(|f| {
            show_all
                || ctx
                    .user
                    .as_deref()
                    .map(|u| f.can_read(u))
                    .unwrap_or(false)
        })
        .cloned()
        .collect();

    if !long {
        let lines: Vec<String> = visible.into_iter().map(|f| f.filename).collect();
        drop(cat);
        return conn.write_block(lines).await;
    }

    let endpoints: Vec<(crate::catalog::FileEntry, Option<SsEndpoint>)> = visible
        .into_iter()
        .map(|f| {
            let ep = cat
                .route(&f.ss_ip, f.ss_client_port)
                .map(|rec| SsEndpoint { ip: rec.ip.clone(), admin_port: rec.admin_port });
            (f, ep)
        })
        .collect();
    drop(cat);

    let mut rows = Vec::with_capacity(endpoints.len());
    for (entry, ep) in endpoints {
        let (size, words, chars) = match ep {
            Some(ep) => match crate::ss_link::info(&ep, &entry.filename).await {
                Ok(info) => (info.size, info.words, info.chars),
                Err(_) => (0, 0, 0),
            },
            None => (0, 0, 0),
        };
        rows.push(render::format_view_row(&entry, size, words, chars));
    }
    conn.write_block(rows).await
}

pub async fn view_folder(conn: &mut Connection, path: &str, state: &NmState) -> Result<(), DocsError> {
    let cat = state.catalog.lock().await;
    let lines = render::render_folder_tree(&cat.files, path.trim());
    drop(cat);
    conn.write_block(lines).await
}

pub async fn search(conn: &mut Connection, keyword: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?.to_string();

    let endpoints: Vec<SsEndpoint> = {
        let cat = state.catalog.lock().await;
        cat.ss_registry
            .iter()
            .filter(|s| s.is_active)
            .map(|s| SsEndpoint { ip: s.ip.clone(), admin_port: s.admin_port })
            .collect()
    };

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for ep in &endpoints {
        if let Ok(matches) = crate::ss_link::search(ep, keyword).await {
            for m in matches {
                if seen.insert(m.clone()) {
                    hits.push(m);
                }
            }
        }
    }

    let cat = state.catalog.lock().await;
    let filtered: Vec<String> = hits
        .into_iter()
        .filter(|f| cat.files.iter().find(|e| &e.filename == f).map(|e| e.can_read(&user)).unwrap_or(true))
        .collect();
    drop(cat);

    let mut lines = vec!["SEARCH RESULTS:".to_string()];
    lines.extend(filtered.into_iter().map(|f| format!("--> {f}")));
    conn.write_block(lines).await
}

pub async fn list_users(conn: &mut Connection, state: &NmState) -> Result<(), DocsError> {
    let cat = state.catalog.lock().await;
    let lines = cat.users.clone();
    drop(cat);
    conn.write_block(lines).await
}
