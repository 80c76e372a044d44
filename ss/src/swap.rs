//! The sentence-lock + swap-file write protocol (spec §4.2).

use docs_common::error::DocsError;
use docs_common::session_id::SessionId;
use docs_common::{blob, sentence};

use crate::locktable::{LockTable, MAX_SENT};
use crate::paths::Layout;

pub async fn write_begin(
    layout: &Layout,
    table: &LockTable,
    filename: &str,
    sidx: usize,
    session: SessionId,
) -> Result<(), DocsError> {
    if sidx >= MAX_SENT {
        return Err(DocsError::ResourceLimit);
    }

    let live = layout.live(filename);
    let committed = if blob::exists(&live).await {
        blob::read_whole(&live).await?
    } else {
        Vec::new()
    };
    let text = String::from_utf8_lossy(&committed).into_owned();
    let max_allowed = sentence::max_write_begin_index(&text);
    if sidx > max_allowed {
        return Err(DocsError::SentenceOutOfRange { max: max_allowed });
    }

    let handle = table.get_or_create(filename);
    let mut guard = handle.lock().await;
    if guard.slots[sidx].is_some() {
        return Err(DocsError::SentenceLocked);
    }
    guard.slots[sidx] = Some(session);

    let swap_path = layout.swap(filename, session);
    blob::write_whole(&swap_path, &committed).await?;
    let undo_path = layout.undo(filename);
    blob::write_whole(&undo_path, &committed).await?;

    Ok(())
}

pub async fn write_update(
    layout: &Layout,
    table: &LockTable,
    filename: &str,
    sidx: usize,
    widx: i64,
    content: &str,
    session: SessionId,
) -> Result<(), DocsError> {
    let handle = table.get(filename).ok_or(DocsError::NotLockedBySession)?;
    let guard = handle.lock().await;
    if guard.slots.get(sidx).copied().flatten() != Some(session) {
        return Err(DocsError::NotLockedBySession);
    }
    drop(guard);

    let swap_path = layout.swap(filename, session);
    let swap_bytes = if blob::exists(&swap_path).await {
        blob::read_whole(&swap_path).await?
    } else {
        Vec::new()
    };
    let text = String::from_utf8_lossy(&swap_bytes).into_owned();
    let mut sentences = sentence::split_sentences(&text);
    sentence::ensure_index(&mut sentences, sidx);
    sentence::apply_word_update(&mut sentences, sidx, widx, content)?;
    let rebuilt = sentence::rebuild(&sentences);
    blob::write_whole(&swap_path, rebuilt.as_bytes()).await?;
    Ok(())
}

pub async fn write_end(
    layout: &Layout,
    table: &LockTable,
    filename: &str,
    sidx: usize,
    session: SessionId,
) -> Result<(), DocsError> {
    let handle = table.get(filename).ok_or(DocsError::NotLockedBySession)?;
    let mut guard = handle.lock().await;
    if guard.slots.get(sidx).copied().flatten() != Some(session) {
        return Err(DocsError::NotLockedBySession);
    }

    let swap_path = layout.swap(filename, session);
    // Missing swap at WRITE_END is treated as an empty commit (spec §7).
    let bytes = if blob::exists(&swap_path).await {
        let b = blob::read_whole(&swap_path).await?;
        blob::remove(&swap_path).await.ok();
        b
    } else {
        Vec::new()
    };
    let live = layout.live(filename);
    blob::write_whole(&live, &bytes).await?;
    guard.slots[sidx] = None;
    drop(guard);
    table.try_reclaim(filename);
    Ok(())
}

pub async fn checklock(table: &LockTable, filename: &str) -> bool {
    match table.get(filename) {
        None => true,
        Some(handle) => handle.lock().await.is_unlocked(),
    }
}

/// Clear all locks a dropped session still held and delete its orphaned
/// swap files (resolution of the §9 open question: reap on connection
/// close).
pub async fn reap_session(layout: &Layout, table: &LockTable, session: SessionId) {
    let touched = table.clear_session(session).await;
    for filename in touched {
        let swap_path = layout.swap(&filename, session);
        if blob::exists(&swap_path).await {
            blob::remove(&swap_path).await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_common::session_id::SessionId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn begin_update_end_round_trip() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        let session = SessionId(1);

        write_begin(&layout, &table, "a.txt", 0, session).await.unwrap();
        write_update(&layout, &table, "a.txt", 0, 0, "Hello", session)
            .await
            .unwrap();
        write_update(&layout, &table, "a.txt", 0, 1, "world.", session)
            .await
            .unwrap();
        write_end(&layout, &table, "a.txt", 0, session).await.unwrap();

        let content = blob::read_whole(layout.live("a.txt")).await.unwrap();
        assert_eq!(String::from_utf8(content).unwrap(), "Hello world.");
        assert!(checklock(&table, "a.txt").await);
    }

    #[tokio::test]
    async fn second_session_blocked_on_same_sentence() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();

        write_begin(&layout, &table, "a.txt", 0, SessionId(1)).await.unwrap();
        let err = write_begin(&layout, &table, "a.txt", 0, SessionId(2))
            .await
            .unwrap_err();
        assert_eq!(err, DocsError::SentenceLocked);
    }

    #[tokio::test]
    async fn distinct_sentences_both_succeed() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        blob::write_whole(layout.live("a.txt"), b"One. Two. Three.").await.unwrap();

        write_begin(&layout, &table, "a.txt", 0, SessionId(1)).await.unwrap();
        write_begin(&layout, &table, "a.txt", 1, SessionId(2)).await.unwrap();
    }

    #[tokio::test]
    async fn begin_out_of_range_rejected() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        blob::write_whole(layout.live("a.txt"), b"One. Two.").await.unwrap();
        let err = write_begin(&layout, &table, "a.txt", 5, SessionId(1))
            .await
            .unwrap_err();
        assert_eq!(err, DocsError::SentenceOutOfRange { max: 2 });
    }

    #[tokio::test]
    async fn no_update_end_yields_unchanged_file() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        blob::write_whole(layout.live("a.txt"), b"Original.").await.unwrap();

        write_begin(&layout, &table, "a.txt", 0, SessionId(1)).await.unwrap();
        write_end(&layout, &table, "a.txt", 0, SessionId(1)).await.unwrap();

        let content = blob::read_whole(layout.live("a.txt")).await.unwrap();
        assert_eq!(String::from_utf8(content).unwrap(), "Original.");
    }

    #[tokio::test]
    async fn reap_session_clears_slot_and_swap() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let table = LockTable::new();
        let session = SessionId(9);
        write_begin(&layout, &table, "a.txt", 0, session).await.unwrap();
        assert!(blob::exists(layout.swap("a.txt", session)).await);

        reap_session(&layout, &table, session).await;

        assert!(!blob::exists(layout.swap("a.txt", session)).await);
        assert!(checklock(&table, "a.txt").await);
    }
}
