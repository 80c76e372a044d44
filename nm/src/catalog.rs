//! The NM's in-memory metadata catalog (spec §3, §4.1).

use std::collections::HashMap;
use std::num::NonZeroUsize;

use docs_common::error::DocsError;
use docs_common::time::unix_now;
use lru::LruCache;
use serde::{Deserialize, Serialize};

pub const MAX_FILES: usize = 1024;
pub const MAX_USERS: usize = 256;
pub const MAX_ACCESS_REQUESTS: usize = 1024;
pub const MAX_SS: usize = 32;
pub const LRU_CAPACITY: usize = 64;

pub fn same_user(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub owner: String,
    pub is_folder: bool,
    pub ss_ip: String,
    pub ss_client_port: u16,
    pub readers: Vec<String>,
    pub writers: Vec<String>,
    pub created_time: i64,
    pub modified_time: i64,
    pub last_access_time: i64,
    pub word_count: u64,
    pub char_count: u64,
}

impl FileEntry {
    pub fn can_read(&self, user: &str) -> bool {
        same_user(user, &self.owner)
            || self.readers.iter().any(|u| same_user(u, user))
            || self.writers.iter().any(|u| same_user(u, user))
    }

    pub fn can_write(&self, user: &str) -> bool {
        same_user(user, &self.owner) || self.writers.iter().any(|u| same_user(u, user))
    }

    pub fn is_owner(&self, user: &str) -> bool {
        same_user(user, &self.owner)
    }

    /// Invariant I3/8-3: grant wins, a user is never both reader and
    /// writer simultaneously.
    pub fn grant(&mut self, user: &str, write: bool) {
        self.readers.retain(|u| !same_user(u, user));
        self.writers.retain(|u| !same_user(u, user));
        if write {
            self.writers.push(user.to_string());
        } else {
            self.readers.push(user.to_string());
        }
    }

    pub fn revoke(&mut self, user: &str) {
        self.readers.retain(|u| !same_user(u, user));
        self.writers.retain(|u| !same_user(u, user));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    Read,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub filename: String,
    pub requesting_user: String,
    pub access_type: AccessType,
    pub request_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsRecord {
    pub ss_id: String,
    pub ip: String,
    pub client_port: u16,
    pub admin_port: u16,
    pub is_primary: bool,
    pub replica_of: Option<String>,
    pub last_heartbeat: i64,
    pub is_active: bool,
}

/// The persisted subset of catalog state (spec §6's "Persisted state
/// layout"). `ss_registry` is rebuilt from scratch by re-registration and
/// is intentionally not part of this.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    files: Vec<FileEntry>,
    users: Vec<String>,
    access_requests: Vec<AccessRequest>,
}

pub struct Catalog {
    pub files: Vec<FileEntry>,
    index: HashMap<String, usize>,
    lru: LruCache<String, usize>,
    pub users: Vec<String>,
    pub access_requests: Vec<AccessRequest>,
    pub ss_registry: Vec<SsRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            index: HashMap::new(),
            lru: LruCache::new(NonZeroUsize::new(LRU_CAPACITY).unwrap()),
            users: Vec::new(),
            access_requests: Vec::new(),
            ss_registry: Vec::new(),
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, f) in self.files.iter().enumerate() {
            self.index.insert(f.filename.clone(), i);
        }
        self.lru.clear();
    }

    pub fn from_persisted_bytes(bytes: &[u8]) -> Result<Self, DocsError> {
        let persisted: Persisted = serde_json::from_slice(bytes).map_err(|_| DocsError::SystemError)?;
        let mut cat = Self::new();
        cat.files = persisted.files;
        cat.users = persisted.users;
        cat.access_requests = persisted.access_requests;
        cat.rebuild_index();
        Ok(cat)
    }

    pub fn to_persisted_bytes(&self) -> Vec<u8> {
        let persisted = Persisted {
            files: self.files.clone(),
            users: self.users.clone(),
            access_requests: self.access_requests.clone(),
        };
        serde_json::to_vec_pretty(&persisted).unwrap_or_default()
    }

    /// Lookup validated against invariant I15: a cached LRU hit is only
    /// trusted if `files[i].filename == key` still holds; otherwise it's
    /// refreshed from the authoritative index.
    pub fn find(&mut self, filename: &str) -> Option<usize> {
        if let Some(&idx) = self.lru.get(filename) {
            if self.files.get(idx).map(|f| f.filename.as_str()) == Some(filename) {
                return Some(idx);
            }
        }
        let idx = *self.index.get(filename)?;
        self.lru.put(filename.to_string(), idx);
        Some(idx)
    }

    pub fn contains(&mut self, filename: &str) -> bool {
        self.find(filename).is_some()
    }

    pub fn insert_file(&mut self, entry: FileEntry) -> Result<(), DocsError> {
        if self.files.len() >= MAX_FILES {
            return Err(DocsError::ResourceLimit);
        }
        if self.index.contains_key(&entry.filename) {
            return Err(DocsError::FileExists);
        }
        let idx = self.files.len();
        self.index.insert(entry.filename.clone(), idx);
        self.files.push(entry);
        Ok(())
    }

    pub fn remove_file(&mut self, filename: &str) -> Result<FileEntry, DocsError> {
        let idx = self.index.remove(filename).ok_or(DocsError::FileNotFound)?;
        let removed = self.files.remove(idx);
        self.rebuild_index();
        self.access_requests.retain(|r| r.filename != filename);
        Ok(removed)
    }

    pub fn rename_file(&mut self, old: &str, new: String) -> Result<(), DocsError> {
        let idx = self.index.remove(old).ok_or(DocsError::FileNotFound)?;
        self.files[idx].filename = new.clone();
        self.index.insert(new, idx);
        self.lru.clear();
        Ok(())
    }

    pub fn add_user(&mut self, user: &str) -> Result<(), DocsError> {
        if self.users.iter().any(|u| same_user(u, user)) {
            return Ok(());
        }
        if self.users.len() >= MAX_USERS {
            return Err(DocsError::ResourceLimit);
        }
        self.users.push(user.to_string());
        Ok(())
    }

    pub fn is_known_user(&self, user: &str) -> bool {
        self.users.iter().any(|u| same_user(u, user))
    }

    pub fn add_access_request(&mut self, filename: &str, user: &str, access_type: AccessType) -> Result<(), DocsError> {
        if self
            .access_requests
            .iter()
            .any(|r| r.filename == filename && same_user(&r.requesting_user, user))
        {
            return Err(DocsError::InvalidArgs);
        }
        if self.access_requests.len() >= MAX_ACCESS_REQUESTS {
            return Err(DocsError::ResourceLimit);
        }
        self.access_requests.push(AccessRequest {
            filename: filename.to_string(),
            requesting_user: user.to_string(),
            access_type,
            request_time: unix_now(),
        });
        Ok(())
    }

    pub fn take_access_request(&mut self, filename: &str, user: &str) -> Option<AccessRequest> {
        let pos = self
            .access_requests
            .iter()
            .position(|r| r.filename == filename && same_user(&r.requesting_user, user))?;
        Some(self.access_requests.remove(pos))
    }

    pub fn register_ss(&mut self, ss_id: &str, ip: &str, client_port: u16, admin_port: u16) -> Result<(bool, usize), DocsError> {
        if let Some(pos) = self.ss_registry.iter().position(|s| s.ss_id == ss_id) {
            let was_inactive = !self.ss_registry[pos].is_active;
            let rec = &mut self.ss_registry[pos];
            rec.ip = ip.to_string();
            rec.client_port = client_port;
            rec.admin_port = admin_port;
            rec.last_heartbeat = unix_now();
            rec.is_active = true;
            return Ok((was_inactive, pos));
        }
        if self.ss_registry.len() >= MAX_SS {
            return Err(DocsError::ResourceLimit);
        }
        let next_index = self.ss_registry.len();
        let is_primary = next_index % 2 == 0;
        let replica_of = if is_primary {
            None
        } else {
            self.ss_registry.get(next_index - 1).map(|s| s.ss_id.clone())
        };
        self.ss_registry.push(SsRecord {
            ss_id: ss_id.to_string(),
            ip: ip.to_string(),
            client_port,
            admin_port,
            is_primary,
            replica_of,
            last_heartbeat: unix_now(),
            is_active: true,
        });
        Ok((false, self.ss_registry.len() - 1))
    }

    /// Select an active SS serving `(ss_ip, ss_client_port)`: either that
    /// exact primary, or an active replica-of it (spec §4.1 routing policy).
    pub fn route(&self, ss_ip: &str, ss_client_port: u16) -> Option<&SsRecord> {
        let primary_id = self
            .ss_registry
            .iter()
            .find(|s| s.ip == ss_ip && s.client_port == ss_client_port)
            .map(|s| s.ss_id.clone())?;
        self.ss_registry
            .iter()
            .find(|s| s.is_active && (s.ss_id == primary_id || s.replica_of.as_deref() == Some(primary_id.as_str())))
    }

    pub fn replicas_of(&self, ss_id: &str) -> Vec<&SsRecord> {
        self.ss_registry
            .iter()
            .filter(|s| s.replica_of.as_deref() == Some(ss_id))
            .collect()
    }

    pub fn first_active_primary(&self) -> Option<&SsRecord> {
        self.ss_registry
            .iter()
            .find(|s| s.is_primary && s.is_active)
            .or_else(|| self.ss_registry.iter().find(|s| s.is_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, owner: &str) -> FileEntry {
        FileEntry {
            filename: name.to_string(),
            owner: owner.to_string(),
            is_folder: false,
            ss_ip: "127.0.0.1".to_string(),
            ss_client_port: 8000,
            readers: vec![],
            writers: vec![],
            created_time: 0,
            modified_time: 0,
            last_access_time: 0,
            word_count: 0,
            char_count: 0,
        }
    }

    #[test]
    fn insert_then_find_then_remove() {
        let mut cat = Catalog::new();
        cat.insert_file(entry("a.txt", "alice")).unwrap();
        assert!(cat.find("a.txt").is_some());
        cat.remove_file("a.txt").unwrap();
        assert!(cat.find("a.txt").is_none());
    }

    #[test]
    fn duplicate_create_rejected() {
        let mut cat = Catalog::new();
        cat.insert_file(entry("a.txt", "alice")).unwrap();
        assert_eq!(cat.insert_file(entry("a.txt", "bob")).unwrap_err(), DocsError::FileExists);
    }

    #[test]
    fn grant_moves_user_between_lists_never_both() {
        let mut e = entry("a.txt", "alice");
        e.grant("bob", false);
        assert!(e.readers.contains(&"bob".to_string()));
        e.grant("bob", true);
        assert!(!e.readers.contains(&"bob".to_string()));
        assert!(e.writers.contains(&"bob".to_string()));
    }

    #[test]
    fn case_insensitive_username_comparisons() {
        let e = entry("a.txt", "Alice");
        assert!(e.is_owner("alice"));
        assert!(e.is_owner("ALICE"));
    }

    #[test]
    fn persisted_round_trip_rebuilds_index() {
        let mut cat = Catalog::new();
        cat.insert_file(entry("a.txt", "alice")).unwrap();
        cat.add_user("alice").unwrap();
        let bytes = cat.to_persisted_bytes();
        let mut reloaded = Catalog::from_persisted_bytes(&bytes).unwrap();
        assert!(reloaded.find("a.txt").is_some());
        assert!(reloaded.is_known_user("alice"));
    }

    #[test]
    fn registration_assigns_primary_replica_alternating() {
        let mut cat = Catalog::new();
        let (recovered1, _) = cat.register_ss("ss1", "127.0.0.1", 8000, 8001).unwrap();
        let (recovered2, _) = cat.register_ss("ss2", "127.0.0.1", 9000, 9001).unwrap();
        assert!(!recovered1 && !recovered2);
        assert!(cat.ss_registry[0].is_primary);
        assert!(!cat.ss_registry[1].is_primary);
        assert_eq!(cat.ss_registry[1].replica_of.as_deref(), Some("ss1"));
    }

    #[test]
    fn reregistration_after_inactivity_reports_recovered() {
        let mut cat = Catalog::new();
        cat.register_ss("ss1", "127.0.0.1", 8000, 8001).unwrap();
        cat.ss_registry[0].is_active = false;
        let (recovered, _) = cat.register_ss("ss1", "127.0.0.1", 8000, 8001).unwrap();
        assert!(recovered);
    }
}
