//! Expiring caches for remote site metadata
//!
//! Listing pages change rarely, and every subject/season view fans out into
//! several page fetches, so results are kept for a configurable time.
//! Entries are evicted lazily on read and in bulk by [`MetadataCache::sweep`].

use crate::config::CacheConfig;
use crate::types::{QualificationSummary, Season, Subject};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    payload: V,
    expires_at: Instant,
}

/// Key-value map whose entries expire after a fixed TTL
///
/// The lock is never held across an `.await`; callers clone values out.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the payload if present and not yet expired
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a payload, replacing any previous entry for the key
    pub fn set(&self, key: K, payload: V) {
        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                payload,
                expires_at,
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Drop expired entries, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The four metadata keyspaces
pub struct MetadataCache {
    /// Subject lists keyed by upper-cased qualification ID
    pub subjects: TtlCache<String, Vec<Subject>>,
    /// Season lists keyed by (qualification ID, subject code)
    pub seasons: TtlCache<(String, String), Vec<Season>>,
    /// File counts keyed by season page URL
    pub file_counts: TtlCache<String, usize>,
    /// Qualification summary (single entry)
    pub qualifications: TtlCache<(), Vec<QualificationSummary>>,
}

impl MetadataCache {
    /// Create empty caches with the configured TTLs
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            subjects: TtlCache::new(config.subjects_ttl),
            seasons: TtlCache::new(config.seasons_ttl),
            file_counts: TtlCache::new(config.file_count_ttl),
            qualifications: TtlCache::new(config.qualifications_ttl),
        }
    }

    /// Drop every cached entry in every keyspace
    pub fn clear(&self) {
        self.subjects.clear();
        self.seasons.clear();
        self.file_counts.clear();
        self.qualifications.clear();
        tracing::info!("metadata cache cleared");
    }

    /// Drop expired entries in every keyspace, returning how many were removed
    pub fn sweep(&self) -> usize {
        let removed = self.subjects.sweep()
            + self.seasons.sweep()
            + self.file_counts.sweep()
            + self.qualifications.sweep();
        if removed > 0 {
            tracing::debug!(removed, "swept expired cache entries");
        }
        removed
    }
}
