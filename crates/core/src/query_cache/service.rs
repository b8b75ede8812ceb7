//! Storage behind the query cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{QueryKey, ResultSet};

/// One captured result set.
///
/// Entries are never mutated; a miss replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub rows: Arc<ResultSet>,
    pub captured_at: DateTime<Utc>,
}

/// Key/value storage for cached reads.
pub trait CacheService: Send + Sync {
    fn get(&self, key: &QueryKey) -> Option<CacheEntry>;
    fn put(&self, key: QueryKey, entry: CacheEntry);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local map of entries.
///
/// Expired entries are left in place until overwritten; memory is reclaimed
/// only when the service is dropped.
#[derive(Debug, Default)]
pub struct MemoryCacheService {
    entries: DashMap<QueryKey, CacheEntry>,
}

impl MemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheService for MemoryCacheService {
    fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: QueryKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
