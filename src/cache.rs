//! Content-addressed result cache.
//!
//! Keys are derived from a BLAKE3 hash of the stable JSON encoding of the
//! inputs (object keys sorted), so identical inputs always map to identical
//! keys. The cache is a pure accelerator: backend failures are logged and
//! treated as misses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::traits::CacheBackend;

/// Builds `namespace:hash` for `payload`. Case-folded.
pub fn cache_key<T: Serialize>(namespace: &str, payload: &T) -> String {
    // serde_json::Map is ordered by key, so the round trip through Value
    // sorts object keys at every level. Key payloads are plain structs of
    // numbers and strings; only maps with non-string keys fail to encode.
    let encoded = serde_json::to_value(payload).and_then(|value| serde_json::to_string(&value));
    debug_assert!(encoded.is_ok(), "cache key payload must encode as JSON");
    let canonical = encoded.unwrap_or_default();
    let digest = blake3::hash(canonical.as_bytes());
    normalize_key(&format!("{}:{}", namespace, digest.to_hex()))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Typed, failure-swallowing front for a [`CacheBackend`].
#[derive(Clone, Default)]
pub struct ResultCache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub fn is_available(&self) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|backend| backend.is_available())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref().filter(|b| b.is_available())?;
        let key = normalize_key(key);

        let raw = match backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(backend) = self.backend.as_ref().filter(|b| b.is_available()) else {
            return;
        };
        let key = normalize_key(key);

        let result = serde_json::to_string(value)
            .map_err(CacheError::from)
            .and_then(|raw| backend.set(&key, &raw, ttl));
        if let Err(err) = result {
            warn!(key = %key, error = %err, "cache write failed");
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process backend with passive TTL expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the backend going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError::Backend(err.to_string()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.check_available()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError::Backend(err.to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
