//! The per-file sentence-lock table (spec §4.2, §5).
//!
//! REDESIGN FLAGS: the original's `file_locks` array with a stringly-keyed
//! linear scan becomes a concurrent map keyed by filename; per-file state is
//! an owned structure behind its own mutex, handed out as a reference-
//! counted handle rather than reclaimed by "mark slot empty."

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use docs_common::session_id::SessionId;
use tokio::sync::Mutex as AsyncMutex;

/// Resource bound from spec §5: sentence slots per file.
pub const MAX_SENT: usize = 2048;

pub struct FileLock {
    pub filename: String,
    pub slots: Vec<Option<SessionId>>,
}

impl FileLock {
    fn new(filename: String) -> Self {
        Self { filename, slots: vec![None; MAX_SENT] }
    }

    pub fn is_unlocked(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }
}

/// `locks_table_mutex` from §5: guards only the map of filename → handle.
/// Never held across an `.await`.
#[derive(Default)]
pub struct LockTable {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<FileLock>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn get_or_create(&self, filename: &str) -> Arc<AsyncMutex<FileLock>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(filename.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(FileLock::new(filename.to_string()))))
            .clone()
    }

    pub fn get(&self, filename: &str) -> Option<Arc<AsyncMutex<FileLock>>> {
        self.inner.lock().unwrap().get(filename).cloned()
    }

    /// Drop the table's handle to `filename` if nothing else references it
    /// and every slot is unlocked. Called after a `WRITE_END` to bound
    /// memory (resource limit: "locked files tracked ≤ 256").
    pub fn try_reclaim(&self, filename: &str) {
        let mut map = self.inner.lock().unwrap();
        let should_remove = match map.get(filename) {
            Some(arc) if Arc::strong_count(arc) == 1 => match arc.try_lock() {
                Ok(guard) => guard.is_unlocked(),
                Err(_) => false,
            },
            _ => false,
        };
        if should_remove {
            map.remove(filename);
        }
    }

    /// Clear every sentence slot held by `session`, across every tracked
    /// file. Used to reap state when a client-port connection ends
    /// mid-WRITE (spec §9 open question, resolved in DESIGN.md).
    ///
    /// Returns the filenames that had a slot cleared, so the caller can
    /// remove the corresponding orphaned swap files.
    pub async fn clear_session(&self, session: SessionId) -> Vec<String> {
        let handles: Vec<Arc<AsyncMutex<FileLock>>> = {
            let map = self.inner.lock().unwrap();
            map.values().cloned().collect()
        };
        let mut touched = Vec::new();
        for handle in handles {
            let mut guard = handle.lock().await;
            let mut any = false;
            for slot in guard.slots.iter_mut() {
                if *slot == Some(session) {
                    *slot = None;
                    any = true;
                }
            }
            if any {
                touched.push(guard.filename.clone());
            }
        }
        for filename in &touched {
            self.try_reclaim(filename);
        }
        touched
    }

    pub fn remove_file(&self, filename: &str) {
        self.inner.lock().unwrap().remove(filename);
    }

    pub fn rename_file(&self, old: &str, new: &str) {
        let mut map = self.inner.lock().unwrap();
        if let Some(handle) = map.remove(old) {
            map.insert(new.to_string(), handle);
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_returns_same_handle() {
        let table = LockTable::new();
        let a = table.get_or_create("f.txt");
        let b = table.get_or_create("f.txt");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn try_reclaim_drops_unlocked_unreferenced_entry() {
        let table = LockTable::new();
        {
            let _ = table.get_or_create("f.txt");
        }
        table.try_reclaim("f.txt");
        assert_eq!(table.tracked_count(), 0);
    }

    #[tokio::test]
    async fn clear_session_frees_only_its_own_slots() {
        let table = LockTable::new();
        let handle = table.get_or_create("f.txt");
        {
            let mut guard = handle.lock().await;
            guard.slots[0] = Some(SessionId(1));
            guard.slots[1] = Some(SessionId(2));
        }
        let touched = table.clear_session(SessionId(1)).await;
        assert_eq!(touched, vec!["f.txt".to_string()]);
        let guard = handle.lock().await;
        assert_eq!(guard.slots[0], None);
        assert_eq!(guard.slots[1], Some(SessionId(2)));
    }
}
