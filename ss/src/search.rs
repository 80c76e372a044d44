//! Case-insensitive substring SEARCH across every regular file under the
//! data root (spec §4.2). The original shells out to nothing here, but
//! checkpoint/undo directory listing elsewhere shells out to `ls`/`dir`;
//! REDESIGN FLAGS calls for an in-process walker throughout, so this uses
//! `walkdir` (as the retrieval pack's backup/archival examples do for tree
//! walks) rather than spawning a subprocess.

use walkdir::WalkDir;

use crate::paths::Layout;

pub async fn search(layout: &Layout, keyword: &str) -> Vec<String> {
    let data_root = layout.data_root.clone();
    let undo_root = layout.undo_root.clone();
    let checkpoint_root = layout.checkpoint_root.clone();
    let keyword = keyword.to_lowercase();

    tokio::task::spawn_blocking(move || {
        let mut matches = Vec::new();
        for entry in WalkDir::new(&data_root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.starts_with(&undo_root) || path.starts_with(&checkpoint_root) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(path) else { continue };
            if content.to_lowercase().contains(&keyword) {
                if let Ok(rel) = path.strip_prefix(&data_root) {
                    matches.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        matches.sort();
        matches
    })
    .await
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_common::blob;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_case_insensitive_matches_and_skips_internal_dirs() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        blob::write_whole(layout.live("a.txt"), b"I love PINEAPPLE juice").await.unwrap();
        blob::write_whole(layout.live("b.txt"), b"nothing here").await.unwrap();
        blob::write_whole(layout.undo("a.txt"), b"pineapple backup").await.unwrap();

        let results = search(&layout, "pineapple").await;
        assert_eq!(results, vec!["a.txt".to_string()]);
    }
}
