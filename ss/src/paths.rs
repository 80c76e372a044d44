//! Path layout under the SS data root, per spec §6's "Persisted state layout".

use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct Layout {
    pub data_root: PathBuf,
    pub undo_root: PathBuf,
    pub checkpoint_root: PathBuf,
}

impl Layout {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            undo_root: data_root.join(".undo"),
            checkpoint_root: data_root.join(".checkpoints"),
            data_root,
        }
    }

    pub fn live(&self, filename: &str) -> PathBuf {
        self.data_root.join(filename)
    }

    pub fn swap(&self, filename: &str, session: impl std::fmt::Display) -> PathBuf {
        let mut p = self.data_root.join(filename).into_os_string();
        p.push(format!(".swap.{session}"));
        PathBuf::from(p)
    }

    pub fn undo(&self, filename: &str) -> PathBuf {
        self.undo_root.join(format!("{filename}.bak"))
    }

    pub fn checkpoint(&self, filename: &str, tag: &str) -> PathBuf {
        self.checkpoint_root.join(filename).join(tag).join("file")
    }

    pub fn checkpoint_dir(&self, filename: &str) -> PathBuf {
        self.checkpoint_root.join(filename)
    }

    pub fn is_under_data_root(&self, path: &Path) -> bool {
        path.starts_with(&self.data_root)
    }
}
