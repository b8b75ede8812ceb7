//! Read-through cache for parametrized store reads.
//!
//! Independent of pages and sections: any read path can route a query through
//! [`QueryCache::cached_read`]. Entries expire lazily; an entry older than the
//! TTL is treated as absent and replaced by the next read.

pub mod key;
pub mod service;

pub use key::QueryKey;
pub use service::{CacheEntry, CacheService, MemoryCacheService};
pub use tokio_rusqlite::rusqlite::types::Value as SqlValue;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Number, Value};

use crate::Error;
use crate::clock::{Clock, SystemClock};
use crate::freshness;

/// Column names plus rows of values from one read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name. Blobs become hex strings.
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), json_value(value)))
                    .collect()
            })
            .collect()
    }
}

fn json_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Number((*i).into()),
        SqlValue::Real(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Blob(b) => Value::String(hex::encode(b)),
    }
}

/// Something that can execute a read-only parametrized query.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn read(&self, signature: &str, params: &[SqlValue]) -> Result<ResultSet, Error>;
}

#[async_trait]
impl<T: QueryStore + ?Sized> QueryStore for Arc<T> {
    async fn read(&self, signature: &str, params: &[SqlValue]) -> Result<ResultSet, Error> {
        (**self).read(signature, params).await
    }
}

/// TTL read-through cache in front of a [`QueryStore`].
pub struct QueryCache<S> {
    store: S,
    service: Arc<dyn CacheService>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S: QueryStore> QueryCache<S> {
    /// Cache backed by a fresh in-memory service and the system clock.
    pub fn new(store: S, ttl: Duration) -> Self {
        Self::with_parts(store, Arc::new(MemoryCacheService::new()), Arc::new(SystemClock), ttl)
    }

    pub fn with_parts(store: S, service: Arc<dyn CacheService>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, service, clock, ttl }
    }

    /// Serve `signature` with `params` from the cache if captured within the
    /// TTL, otherwise read the store and replace the entry.
    ///
    /// Store errors propagate unchanged; nothing is cached for a failed read.
    pub async fn cached_read(&self, signature: &str, params: &[SqlValue]) -> Result<Arc<ResultSet>, Error> {
        let key = QueryKey::new(signature, params);
        let now = self.clock.now();

        if let Some(entry) = self.service.get(&key)
            && freshness::evaluate(entry.captured_at, now, self.ttl).is_hit()
        {
            tracing::trace!(rows = entry.rows.len(), "query cache hit");
            return Ok(entry.rows);
        }

        let rows = Arc::new(self.store.read(signature, params).await?);
        tracing::trace!(rows = rows.len(), "query cache miss");

        self.service.put(key, CacheEntry { rows: Arc::clone(&rows), captured_at: now });
        Ok(rows)
    }

    /// Read straight from the store, for callers that just wrote.
    ///
    /// The cached entry is neither consulted nor replaced.
    pub async fn read_uncached(&self, signature: &str, params: &[SqlValue]) -> Result<Arc<ResultSet>, Error> {
        Ok(Arc::new(self.store.read(signature, params).await?))
    }

    pub fn service(&self) -> &Arc<dyn CacheService> {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeDelta, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store stub returning the call number as the single value.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryStore for CountingStore {
        async fn read(&self, _signature: &str, _params: &[SqlValue]) -> Result<ResultSet, Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ResultSet::new(vec!["call".into()], vec![vec![SqlValue::Integer(n as i64)]]))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl QueryStore for FailingStore {
        async fn read(&self, _signature: &str, _params: &[SqlValue]) -> Result<ResultSet, Error> {
            Err(Error::InvalidInput("boom".into()))
        }
    }

    fn cache(store: Arc<CountingStore>, clock: Arc<ManualClock>) -> QueryCache<Arc<CountingStore>> {
        QueryCache::with_parts(store, Arc::new(MemoryCacheService::new()), clock, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_is_served_from_cache() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(Arc::clone(&store), Arc::clone(&clock));

        let first = cache.cached_read("SELECT ?1", &[SqlValue::Integer(7)]).await.unwrap();
        clock.advance(TimeDelta::seconds(10));
        let second = cache.cached_read("SELECT ?1", &[SqlValue::Integer(7)]).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_read_after_ttl_hits_store_again() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(Arc::clone(&store), Arc::clone(&clock));

        cache.cached_read("SELECT 1", &[]).await.unwrap();
        clock.advance(TimeDelta::seconds(11));
        let refreshed = cache.cached_read("SELECT 1", &[]).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.rows()[0][0], SqlValue::Integer(2));

        // The refreshed entry starts a new window.
        clock.advance(TimeDelta::seconds(5));
        cache.cached_read("SELECT 1", &[]).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_params_are_cached_separately() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(Arc::clone(&store), clock);

        cache.cached_read("SELECT ?1", &[SqlValue::Integer(1)]).await.unwrap();
        cache.cached_read("SELECT ?1", &[SqlValue::Integer(2)]).await.unwrap();
        cache.cached_read("SELECT ?1", &[SqlValue::Integer(1)]).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.service().len(), 2);
    }

    #[tokio::test]
    async fn test_read_uncached_bypasses_entry() {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = cache(Arc::clone(&store), clock);

        cache.cached_read("SELECT 1", &[]).await.unwrap();
        let bypass = cache.read_uncached("SELECT 1", &[]).await.unwrap();
        let cached = cache.cached_read("SELECT 1", &[]).await.unwrap();

        assert_eq!(bypass.rows()[0][0], SqlValue::Integer(2));
        assert_eq!(cached.rows()[0][0], SqlValue::Integer(1));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_read_is_not_cached() {
        let cache = QueryCache::new(FailingStore, Duration::from_secs(10));
        assert!(cache.cached_read("SELECT 1", &[]).await.is_err());
        assert!(cache.service().is_empty());
    }

    #[test]
    fn test_result_set_to_json_rows() {
        let rows = ResultSet::new(
            vec!["slug".into(), "hits".into(), "ratio".into(), "raw".into(), "gone".into()],
            vec![vec![
                SqlValue::Text("news".into()),
                SqlValue::Integer(3),
                SqlValue::Real(0.5),
                SqlValue::Blob(vec![0xab]),
                SqlValue::Null,
            ]],
        );
        let json = rows.to_json_rows();
        assert_eq!(json[0]["slug"], "news");
        assert_eq!(json[0]["hits"], 3);
        assert_eq!(json[0]["ratio"], 0.5);
        assert_eq!(json[0]["raw"], "ab");
        assert!(json[0]["gone"].is_null());
    }
}
