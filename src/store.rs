use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::BoxError;

/// Consumer-provided shared TTL key/value backend (e.g. Redis).
///
/// This is the only synchronization point of the subsystem: revocation
/// markers, permission cache entries, and rate counters all live here.
/// Every operation is a single round trip and may block on the network;
/// implementations should bound each call with their own operation timeout
/// and surface failures as errors, never by hanging.
pub trait TtlStore: Send + Sync + 'static {
    /// Read a key. `Ok(None)` is a miss; an empty string is a *hit*.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, BoxError>> + Send;

    /// Write a key with a TTL, overwriting any existing value and TTL.
    fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Atomically increment a counter, creating it at 1 if absent.
    /// Returns the post-increment count. Must be a single backend primitive
    /// (INCR-like), not a read-modify-write pair. Keys created by `incr`
    /// carry no TTL until [`expire`](Self::expire) is called.
    fn incr(&self, key: &str) -> impl Future<Output = Result<i64, BoxError>> + Send;

    /// Set the TTL of an existing key. No-op if the key is absent.
    fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Remove a key.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Counter(i64),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process [`TtlStore`] for tests and single-node deployments.
///
/// Entries expire lazily on access. Uses `tokio::time::Instant` so TTL
/// behavior is testable under a paused runtime clock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TtlStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(match &entry.value {
                Value::Text(s) => s.clone(),
                Value::Counter(n) => n.to_string(),
            })),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BoxError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, BoxError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Counter(0),
            expires_at: None,
        });
        let count = match entry.value {
            Value::Counter(n) => n + 1,
            // INCR on a non-numeric value restarts the counter.
            Value::Text(_) => 1,
        };
        entry.value = Value::Counter(count);
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), BoxError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store whose every operation fails, for degradation tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct BrokenStore;

#[cfg(test)]
impl TtlStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, BoxError> {
        Err("backend down".into())
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), BoxError> {
        Err("backend down".into())
    }

    async fn incr(&self, _key: &str) -> Result<i64, BoxError> {
        Err("backend down".into())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), BoxError> {
        Err("backend down".into())
    }

    async fn delete(&self, _key: &str) -> Result<(), BoxError> {
        Err("backend down".into())
    }
}

/// Store whose every operation never resolves, for deadline tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct HangingStore;

#[cfg(test)]
impl TtlStore for HangingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, BoxError> {
        std::future::pending().await
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), BoxError> {
        std::future::pending().await
    }

    async fn incr(&self, _key: &str) -> Result<i64, BoxError> {
        std::future::pending().await
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), BoxError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), BoxError> {
        std::future::pending().await
    }
}
