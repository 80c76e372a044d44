//! EXEC safety gate (spec §4.4): fetch the file, check every command token
//! against an allow-list unless the launch-time flag disables the gate, run
//! it through the OS shell, stream output, then clean up.

use docs_common::error::DocsError;
use docs_common::logging;
use docs_common::proto::Connection;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::session::SessionCtx;
use crate::ss_link::{self, SsEndpoint};
use crate::state::NmState;

use super::require_login;

const ALLOWED_COMMANDS: &[&str] = &["echo", "ls", "pwd", "dir", "type"];
const SHELL_METACHARS: &[char] = &[';', '|', '&', '`', '$', '<', '>', '\n'];

fn find_disallowed(script: &str) -> Option<String> {
    for raw in script.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(c) = line.chars().find(|c| SHELL_METACHARS.contains(c)) {
            return Some(c.to_string());
        }
        let token = line.split_whitespace().next().unwrap_or("");
        if !ALLOWED_COMMANDS.contains(&token) {
            return Some(token.to_string());
        }
    }
    None
}

pub async fn exec(conn: &mut Connection, filename: &str, ctx: &SessionCtx, state: &NmState) -> Result<(), DocsError> {
    let user = require_login(ctx)?;

    let ep = {
        let cat = state.catalog.lock().await;
        let idx = cat.find(filename).ok_or(DocsError::FileNotFound)?;
        let entry = &cat.files[idx];
        let rec = cat.route(&entry.ss_ip, entry.ss_client_port).ok_or(DocsError::SsNotAvailable)?;
        SsEndpoint { ip: rec.ip.clone(), admin_port: rec.admin_port }
    };

    let bytes = ss_link::fetch(&ep, filename).await?;
    let script = String::from_utf8_lossy(&bytes).into_owned();

    if !state.cfg.allow_unsafe_exec {
        if let Some(bad) = find_disallowed(&script) {
            logging::log_event("NM", "EXEC", user, &format!("{filename} blocked:{bad}"), -1);
            return Err(DocsError::ExecBlocked(bad));
        }
    }

    let tmp = tempfile::NamedTempFile::new().map_err(|_| DocsError::SystemError)?;
    {
        let mut f = tokio::fs::File::create(tmp.path()).await.map_err(|_| DocsError::SystemError)?;
        f.write_all(script.as_bytes()).await.map_err(|_| DocsError::SystemError)?;
        f.flush().await.map_err(|_| DocsError::SystemError)?;
    }

    conn.write_line("OK").await?;

    let output = Command::new("sh")
        .arg(tmp.path())
        .output()
        .await
        .map_err(|_| DocsError::SystemError)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();

    logging::log_event("NM", "EXEC", user, filename, 0);
    conn.write_block(lines).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_every_whitelisted_command() {
        let script = "echo hi\nls -la\npwd\ndir\ntype a.txt\n";
        assert_eq!(find_disallowed(script), None);
    }

    #[test]
    fn flags_first_disallowed_command() {
        let script = "echo hi\nrm -rf /\nls\n";
        assert_eq!(find_disallowed(script), Some("rm".to_string()));
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let script = "# a comment\n\n  \necho fine\n";
        assert_eq!(find_disallowed(script), None);
    }

    #[test]
    fn rejects_chained_command_after_allowed_one() {
        let script = "echo hi; rm -rf /\n";
        assert_eq!(find_disallowed(script), Some(";".to_string()));
    }

    #[test]
    fn rejects_piped_and_substituted_commands() {
        assert!(find_disallowed("echo hi && rm -rf /\n").is_some());
        assert!(find_disallowed("echo `rm -rf /`\n").is_some());
        assert!(find_disallowed("ls | rm\n").is_some());
    }
}
