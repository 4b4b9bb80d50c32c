//! File-level parse cache (§0.4, §4.E "Cache integration").
//!
//! An optional external collaborator the Graph Builder MAY consult, keyed
//! by `(path, content fingerprint)`, to skip re-parsing an unchanged file.
//! Corruption or a missing backing store is never fatal — a read failure
//! degrades to a cache miss.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::graph::Module;
use crate::triple::Triple;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub module: Option<SerializedModule>,
    pub triples: Vec<SerializedTriple>,
}

/// A flat, serde-friendly mirror of [`Module`] — the real type holds a
/// `HashSet` and nested structures that round-trip fine through `bincode`
/// but are kept separate here so cache schema changes never ripple into
/// the in-memory graph type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModule {
    pub path: String,
    pub uri: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub layer: Option<String>,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub exports: Vec<String>,
    pub calls: Vec<String>,
}

impl From<&Module> for SerializedModule {
    fn from(m: &Module) -> Self {
        let mut tags: Vec<String> = m.tags.iter().cloned().collect();
        tags.sort();
        SerializedModule {
            path: m.path.clone(),
            uri: m.uri.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            language: m.language.clone(),
            layer: m.layer.clone(),
            tags,
            dependencies: m.dependencies.clone(),
            exports: m.exports.clone(),
            calls: m.calls.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl From<&Triple> for SerializedTriple {
    fn from(t: &Triple) -> Self {
        SerializedTriple {
            subject: t.subject.clone(),
            predicate: t.predicate.clone(),
            object: t.object.to_string(),
        }
    }
}

/// Content fingerprint over path + mtime + length (§0.4) — cheap to
/// compute, sufficient to detect the common case of an unchanged file.
pub fn fingerprint(path: &Path, len: u64, modified: SystemTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(len.to_le_bytes());
    let mut time_hasher = DefaultHasher::new();
    modified.hash(&mut time_hasher);
    hasher.update(time_hasher.finish().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

pub trait FileCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn put(&self, key: &str, entry: &CacheEntry);
}

/// The default collaborator: does nothing, every lookup misses.
#[derive(Debug, Clone, Default)]
pub struct NoopCache;

impl FileCache for NoopCache {
    fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    fn put(&self, _key: &str, _entry: &CacheEntry) {}
}

/// A directory of `bincode`-serialized entries, one file per key. Reads
/// and writes never panic and never propagate errors — any failure is
/// treated the way the teacher's `storage/persist` layer treats a torn
/// write: log and move on, never block the caller on durability.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let _ = fs::create_dir_all(&dir);
        DiskCache { dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.bin"))
    }
}

impl FileCache for DiskCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let bytes = fs::read(self.entry_path(key)).ok()?;
        bincode::deserialize(&bytes).ok()
    }

    fn put(&self, key: &str, entry: &CacheEntry) {
        let Ok(bytes) = bincode::serialize(entry) else { return };
        let _ = fs::write(self.entry_path(key), bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_cache_always_misses() {
        let cache = NoopCache;
        cache.put("k", &CacheEntry { fingerprint: "f".into(), module: None, triples: vec![] });
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn disk_cache_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let entry = CacheEntry {
            fingerprint: "abc".into(),
            module: None,
            triples: vec![SerializedTriple { subject: "s".into(), predicate: "p".into(), object: "\"o\"".into() }],
        };
        cache.put("key1", &entry);
        let fetched = cache.get("key1").unwrap();
        assert_eq!(fetched.fingerprint, "abc");
        assert_eq!(fetched.triples.len(), 1);
    }

    #[test]
    fn disk_cache_miss_on_corrupt_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        fs::write(dir.path().join("broken.bin"), b"not bincode").unwrap();
        assert!(cache.get("broken").is_none());
    }

    #[test]
    fn fingerprint_changes_with_length() {
        let path = Path::new("a.rs");
        let t = SystemTime::UNIX_EPOCH;
        let f1 = fingerprint(path, 10, t);
        let f2 = fingerprint(path, 20, t);
        assert_ne!(f1, f2);
    }
}
