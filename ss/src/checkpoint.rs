//! Checkpoint/undo/revert (spec §3, §4.2).

use docs_common::blob;
use docs_common::error::DocsError;

use crate::paths::Layout;

pub async fn checkpoint(layout: &Layout, filename: &str, tag: &str) -> Result<(), DocsError> {
    let live = layout.live(filename);
    let bytes = blob::read_whole(&live).await?;
    blob::write_whole(layout.checkpoint(filename, tag), &bytes).await
}

pub async fn view_checkpoint(layout: &Layout, filename: &str, tag: &str) -> Result<Vec<u8>, DocsError> {
    blob::read_whole(layout.checkpoint(filename, tag)).await
}

/// Copies checkpoint bytes back into the live file. Does not delete the
/// checkpoint (invariant I14).
pub async fn revert(layout: &Layout, filename: &str, tag: &str) -> Result<(), DocsError> {
    let bytes = blob::read_whole(layout.checkpoint(filename, tag)).await?;
    blob::write_whole(layout.live(filename), &bytes).await
}

pub async fn list_checkpoints(layout: &Layout, filename: &str) -> Vec<String> {
    let dir = layout.checkpoint_dir(filename);
    let mut tags = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(ft) = entry.file_type().await {
                if ft.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        tags.push(name.to_string());
                    }
                }
            }
        }
    }
    tags.sort();
    tags
}

/// Moves `undo/<f>.bak` atop the live file and deletes the undo copy
/// (invariant I13: only the most recent pre-edit state is kept).
pub async fn undo(layout: &Layout, filename: &str) -> Result<(), DocsError> {
    let undo_path = layout.undo(filename);
    let bytes = blob::read_whole(&undo_path).await?;
    blob::write_whole(layout.live(filename), &bytes).await?;
    blob::remove(&undo_path).await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn checkpoint_then_revert_restores_exact_bytes() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        blob::write_whole(layout.live("r.txt"), b"hello.").await.unwrap();
        checkpoint(&layout, "r.txt", "v1").await.unwrap();

        blob::write_whole(layout.live("r.txt"), b"hello. world.").await.unwrap();
        revert(&layout, "r.txt", "v1").await.unwrap();

        let bytes = blob::read_whole(layout.live("r.txt")).await.unwrap();
        assert_eq!(bytes, b"hello.");
        // Checkpoint survives revert (immutable).
        assert_eq!(blob::read_whole(layout.checkpoint("r.txt", "v1")).await.unwrap(), b"hello.");
    }

    #[tokio::test]
    async fn list_checkpoints_enumerates_tags() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        blob::write_whole(layout.live("r.txt"), b"hello.").await.unwrap();
        checkpoint(&layout, "r.txt", "v1").await.unwrap();
        checkpoint(&layout, "r.txt", "v2").await.unwrap();

        let tags = list_checkpoints(&layout, "r.txt").await;
        assert_eq!(tags, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[tokio::test]
    async fn undo_restores_pre_write_snapshot_once() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        blob::write_whole(layout.undo("a.txt"), b"before.").await.unwrap();
        blob::write_whole(layout.live("a.txt"), b"after.").await.unwrap();

        undo(&layout, "a.txt").await.unwrap();
        let bytes = blob::read_whole(layout.live("a.txt")).await.unwrap();
        assert_eq!(bytes, b"before.");

        // Repeating UNDO with the snapshot gone is a no-op error, not a crash.
        assert!(undo(&layout, "a.txt").await.is_err());
    }
}
