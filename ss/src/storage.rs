//! CRUD admin operations on file blobs (spec §4.2, §6): CREATE, DELETE,
//! MOVE, INFO, FETCH, SYNC.

use docs_common::blob;
use docs_common::error::DocsError;

use crate::locktable::LockTable;
use crate::paths::Layout;

pub async fn create(layout: &Layout, filename: &str, is_folder: bool) -> Result<(), DocsError> {
    if is_folder {
        let dir = layout.live(filename);
        tokio::fs::create_dir_all(&dir).await.map_err(|_| DocsError::SystemError)
    } else {
        let live = layout.live(filename);
        if blob::exists(&live).await {
            return Err(DocsError::FileExists);
        }
        blob::write_whole(&live, b"").await
    }
}

pub async fn delete(layout: &Layout, table: &LockTable, filename: &str) -> Result<(), DocsError> {
    if !crate::swap::checklock(table, filename).await {
        return Err(DocsError::FileLockedForWriting);
    }
    let live = layout.live(filename);
    let meta = tokio::fs::metadata(&live).await.map_err(|_| DocsError::FileNotFound)?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(&live).await.map_err(|_| DocsError::SystemError)?;
    } else {
        blob::remove(&live).await?;
    }
    table.remove_file(filename);
    Ok(())
}

pub async fn move_file(layout: &Layout, table: &LockTable, old: &str, new: &str) -> Result<(), DocsError> {
    let old_path = layout.live(old);
    let new_path = layout.live(new);
    if !blob::exists(&old_path).await {
        return Err(DocsError::FileNotFound);
    }
    if let Some(parent) = new_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|_| DocsError::SystemError)?;
    }
    tokio::fs::rename(&old_path, &new_path)
        .await
        .map_err(|_| DocsError::SystemError)?;
    table.rename_file(old, new);
    Ok(())
}

pub struct Info {
    pub size: u64,
    pub words: usize,
    pub chars: usize,
}

pub async fn info(layout: &Layout, filename: &str) -> Info {
    let live = layout.live(filename);
    match blob::read_whole(&live).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            Info {
                size: bytes.len() as u64,
                words: text.split_whitespace().count(),
                chars: bytes.len(),
            }
        }
        Err(_) => Info { size: 0, words: 0, chars: 0 },
    }
}

/// `BEGIN` / `L <line>`... / `END` body for FETCH, each content line split
/// on `\n` and prefixed `L `.
pub async fn fetch_lines(layout: &Layout, filename: &str) -> Result<Vec<String>, DocsError> {
    let live = layout.live(filename);
    let bytes = blob::read_whole(&live).await?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.lines().map(|l| format!("L {l}")).collect())
}

/// Reassemble `L `-prefixed FETCH lines back into the original bytes.
pub fn reassemble_fetch_lines(lines: &[String]) -> Vec<u8> {
    let joined: Vec<&str> = lines
        .iter()
        .map(|l| l.strip_prefix("L ").unwrap_or(l.as_str()))
        .collect();
    joined.join("\n").into_bytes()
}

/// SYNC: write recovered content straight to the live path.
pub async fn sync_write(layout: &Layout, filename: &str, content: &[u8]) -> Result<(), DocsError> {
    blob::write_whole(layout.live(filename), content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_then_delete_then_create_yields_empty_file() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();

        create(&layout, "a.txt", false).await.unwrap();
        assert!(matches!(create(&layout, "a.txt", false).await, Err(DocsError::FileExists)));
        delete(&layout, &table, "a.txt").await.unwrap();
        create(&layout, "a.txt", false).await.unwrap();

        let bytes = blob::read_whole(layout.live("a.txt")).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn delete_blocked_while_locked() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        create(&layout, "a.txt", false).await.unwrap();
        crate::swap::write_begin(&layout, &table, "a.txt", 0, docs_common::session_id::SessionId(1))
            .await
            .unwrap();

        let err = delete(&layout, &table, "a.txt").await.unwrap_err();
        assert_eq!(err, DocsError::FileLockedForWriting);
    }

    #[tokio::test]
    async fn fetch_and_reassemble_round_trips() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        blob::write_whole(layout.live("a.txt"), b"line one\nline two").await.unwrap();

        let lines = fetch_lines(&layout, "a.txt").await.unwrap();
        assert_eq!(lines, vec!["L line one".to_string(), "L line two".to_string()]);
        let bytes = reassemble_fetch_lines(&lines);
        assert_eq!(bytes, b"line one\nline two");
    }
}
