//! Memoization for expensive, pure pipeline steps.
//!
//! Text-layer extraction, OCR and model generation are pure functions of
//! their input bytes and parameters, so repeating them for an identical
//! upload is wasted work. Instead of an ambient global, the cache is an
//! explicit [`MemoCache`] handed to the stages through
//! [`crate::config::SummaryConfig::cache`]; tests swap in [`NoopCache`] or
//! inspect an [`InMemoryCache`] directly.
//!
//! Keys carry the SHA-256 of the content rather than the content itself, so a
//! 200 MB scan costs 64 hex characters of key space.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifies one memoized computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Which computation produced the value, e.g. `"pdf-ocr"` or `"generate"`.
    pub scope: &'static str,
    /// Hex-encoded SHA-256 of the input content.
    pub digest: String,
    /// Extra parameters that change the result (OCR language, schema…).
    pub params: Vec<String>,
}

impl CacheKey {
    /// Build a key from raw content bytes and the parameters that affect the result.
    pub fn new(scope: &'static str, content: &[u8], params: &[&str]) -> Self {
        Self {
            scope,
            digest: content_digest(content),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Hex SHA-256 of `content`.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// A memoized outcome. Backend failures are remembered too, with their
/// reason, so a broken upload is not re-processed on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedOutput {
    Text(String),
    Failed(String),
}

/// Storage for memoized outcomes.
///
/// Implementations must be `Send + Sync`: extraction backends run on the
/// blocking pool and the cache outlives a single request.
pub trait MemoCache: Send + Sync {
    /// Look up a previously stored outcome.
    fn get(&self, key: &CacheKey) -> Option<CachedOutput>;

    /// Store an outcome, replacing any previous value.
    fn insert(&self, key: CacheKey, value: CachedOutput);
}

/// Process-local cache with no eviction.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<CacheKey, CachedOutput>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedOutput> {
        // A poisoned lock only means another thread panicked mid-insert;
        // treat it as a miss rather than propagating the panic.
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, value: CachedOutput) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value);
        }
    }
}

/// A cache that never remembers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl MemoCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<CachedOutput> {
        None
    }

    fn insert(&self, _key: CacheKey, _value: CachedOutput) {}
}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type SharedCache = Arc<dyn MemoCache>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex_sha256() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keys_differ_by_scope_content_and_params() {
        let a = CacheKey::new("pdf-ocr", b"bytes", &["eng"]);
        assert_eq!(a, CacheKey::new("pdf-ocr", b"bytes", &["eng"]));
        assert_ne!(a, CacheKey::new("image-ocr", b"bytes", &["eng"]));
        assert_ne!(a, CacheKey::new("pdf-ocr", b"other", &["eng"]));
        assert_ne!(a, CacheKey::new("pdf-ocr", b"bytes", &["fra"]));
    }

    #[test]
    fn in_memory_cache_round_trip() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("pdf-text-layer", b"%PDF-1.7", &[]);
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), CachedOutput::Failed("corrupt xref".into()));
        assert_eq!(cache.get(&key), Some(CachedOutput::Failed("corrupt xref".into())));

        cache.insert(key.clone(), CachedOutput::Text("hello".into()));
        assert_eq!(cache.get(&key), Some(CachedOutput::Text("hello".into())));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn noop_cache_forgets() {
        let cache = NoopCache;
        let key = CacheKey::new("generate", b"prompt", &[]);
        cache.insert(key.clone(), CachedOutput::Text("x".into()));
        assert!(cache.get(&key).is_none());
    }
}
