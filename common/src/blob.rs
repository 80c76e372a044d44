//! Whole-file blob persistence with parent-directory creation, the Rust
//! equivalent of `original_source/lib/src/util.c`'s `read_file_all` /
//! `write_file_all`.

use std::path::Path;

use crate::error::DocsError;

pub async fn read_whole(path: impl AsRef<Path>) -> Result<Vec<u8>, DocsError> {
    tokio::fs::read(path.as_ref())
        .await
        .map_err(|_| DocsError::FileNotFound)
}

pub async fn write_whole(path: impl AsRef<Path>, data: &[u8]) -> Result<(), DocsError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| DocsError::SystemError)?;
        }
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|_| DocsError::SystemError)
}

pub async fn exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::metadata(path.as_ref()).await.is_ok()
}

pub async fn remove(path: impl AsRef<Path>) -> Result<(), DocsError> {
    tokio::fs::remove_file(path.as_ref())
        .await
        .map_err(|_| DocsError::SystemError)
}
