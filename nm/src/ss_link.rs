//! NM-side admin client: one command per connection to an SS's admin port
//! (spec §4.1, §6). Mirrors the teacher's `api_client.rs` pattern of small,
//! typed functions wrapping a transport — here a line-framed TCP dial
//! instead of an HTTP client.

use docs_common::error::DocsError;
use docs_common::proto::dial;

pub struct SsEndpoint {
    pub ip: String,
    pub admin_port: u16,
}

async fn one_shot(ep: &SsEndpoint, line: &str) -> Result<String, DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(line).await?;
    conn.read_line()
        .await?
        .ok_or(DocsError::SsNoResponse)
}

pub async fn create(ep: &SsEndpoint, filename: &str) -> Result<(), DocsError> {
    one_shot(ep, &format!("CREATE {filename}")).await.map(|_| ())
}

pub async fn create_folder(ep: &SsEndpoint, path: &str) -> Result<(), DocsError> {
    one_shot(ep, &format!("CREATEFOLDER {path}")).await.map(|_| ())
}

pub async fn delete(ep: &SsEndpoint, filename: &str) -> Result<(), DocsError> {
    let reply = one_shot(ep, &format!("DELETE {filename}")).await?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::SystemError) }
}

pub async fn move_file(ep: &SsEndpoint, old: &str, new: &str) -> Result<(), DocsError> {
    let reply = one_shot(ep, &format!("MOVE {old} {new}")).await?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::FileNotFound) }
}

pub async fn checklock(ep: &SsEndpoint, filename: &str) -> Result<bool, DocsError> {
    let reply = one_shot(ep, &format!("CHECKLOCK {filename}")).await?;
    Ok(reply == "OK not locked")
}

pub struct Info {
    pub size: u64,
    pub words: u64,
    pub chars: u64,
}

pub async fn info(ep: &SsEndpoint, filename: &str) -> Result<Info, DocsError> {
    let reply = one_shot(ep, &format!("INFO {filename}")).await?;
    let mut size = 0u64;
    let mut words = 0u64;
    let mut chars = 0u64;
    let tokens: Vec<&str> = reply.split_whitespace().collect();
    for pair in tokens.chunks(2) {
        if let [key, val] = pair {
            match *key {
                "SIZE" => size = val.parse().unwrap_or(0),
                "WORDS" => words = val.parse().unwrap_or(0),
                "CHARS" => chars = val.parse().unwrap_or(0),
                _ => {}
            }
        }
    }
    Ok(Info { size, words, chars })
}

/// `FETCH <f>` → `BEGIN` ... `L <line>` ... `END`, returned as the
/// reassembled original bytes.
pub async fn fetch(ep: &SsEndpoint, filename: &str) -> Result<Vec<u8>, DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(&format!("FETCH {filename}")).await?;
    let header = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
    if header != "BEGIN" {
        return Err(DocsError::FileNotFound);
    }
    let mut lines = Vec::new();
    loop {
        let line = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
        if line == "END" {
            break;
        }
        lines.push(line);
    }
    let joined: Vec<&str> = lines
        .iter()
        .map(|l| l.strip_prefix("L ").unwrap_or(l.as_str()))
        .collect();
    Ok(joined.join("\n").into_bytes())
}

/// `SYNC <f>` streaming the given content line-by-line, terminated `END`.
pub async fn sync(ep: &SsEndpoint, filename: &str, content: &[u8]) -> Result<(), DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(&format!("SYNC {filename}")).await?;
    conn.read_line().await?; // "OK"
    let text = String::from_utf8_lossy(content);
    for line in text.lines() {
        conn.write_line(&format!("L {line}")).await?;
    }
    conn.write_line("END").await?;
    let reply = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::SystemError) }
}

pub async fn undo(ep: &SsEndpoint, filename: &str) -> Result<(), DocsError> {
    let reply = one_shot(ep, &format!("UNDO {filename}")).await?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::SystemError) }
}

pub async fn checkpoint(ep: &SsEndpoint, filename: &str, tag: &str) -> Result<(), DocsError> {
    let reply = one_shot(ep, &format!("CHECKPOINT {filename} {tag}")).await?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::FileNotFound) }
}

pub async fn view_checkpoint(ep: &SsEndpoint, filename: &str, tag: &str) -> Result<String, DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(&format!("VIEWCHECKPOINT {filename} {tag}")).await?;
    let header = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
    if header != "OK" {
        return Err(DocsError::FileNotFound);
    }
    let mut lines = Vec::new();
    loop {
        let line = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
        if line == "END" {
            break;
        }
        lines.push(line);
    }
    let joined: Vec<&str> = lines
        .iter()
        .map(|l| l.strip_prefix("L ").unwrap_or(l.as_str()))
        .collect();
    Ok(joined.join("\n"))
}

pub async fn revert(ep: &SsEndpoint, filename: &str, tag: &str) -> Result<(), DocsError> {
    let reply = one_shot(ep, &format!("REVERT {filename} {tag}")).await?;
    if reply.starts_with("OK") { Ok(()) } else { Err(DocsError::FileNotFound) }
}

pub async fn list_checkpoints(ep: &SsEndpoint, filename: &str) -> Result<Vec<String>, DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(&format!("LISTCHECKPOINTS {filename}")).await?;
    let mut lines = Vec::new();
    loop {
        let line = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
        if line == "END" {
            break;
        }
        lines.push(line);
    }
    Ok(lines.into_iter().filter(|l| l != "CHECKPOINTS:").collect())
}

pub async fn search(ep: &SsEndpoint, keyword: &str) -> Result<Vec<String>, DocsError> {
    let mut conn = dial(&ep.ip, ep.admin_port).await?;
    conn.write_line(&format!("SEARCH {keyword}")).await?;
    let mut lines = Vec::new();
    loop {
        let line = conn.read_line().await?.ok_or(DocsError::SsNoResponse)?;
        if line == "END" {
            break;
        }
        lines.push(line);
    }
    Ok(lines
        .into_iter()
        .filter_map(|l| l.strip_prefix("--> ").map(|s| s.to_string()))
        .collect())
}

/// Best-effort, fire-and-forget replication of CREATE/CREATEFOLDER to a
/// replica — the reply is not read (spec §4.3).
pub async fn replicate_create(ep: &SsEndpoint, filename: &str, is_folder: bool) {
    let cmd = if is_folder { "CREATEFOLDER" } else { "CREATE" };
    if let Ok(mut conn) = dial(&ep.ip, ep.admin_port).await {
        let _ = conn.write_line(&format!("{cmd} {filename}")).await;
    }
}
