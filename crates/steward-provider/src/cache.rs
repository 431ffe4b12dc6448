use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::provider::{ChatResponse, TaskClass};

/// Keywords whose presence in a query forces a fresh provider call — spec.md
/// §4.4 step 3. Freshness-sensitive queries must never be served stale.
const BYPASS_KEYWORDS: &[&str] = &["now", "current", "today", "latest", "trending", "live", "status"];

const QUERY_HASH_PREFIX_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub sets: u64,
    pub deletes: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// "0.00%"-formatted with no divide-by-zero on an empty cache.
    pub fn hit_rate(&self) -> String {
        let total = self.hits + self.misses;
        if total == 0 {
            return "0.00%".to_string();
        }
        format!("{:.2}%", (self.hits as f64 / total as f64) * 100.0)
    }
}

struct Entry {
    value: ChatResponse,
    expires_at: Option<Instant>,
    recency: u64,
}

struct Inner {
    entries: HashMap<u64, Entry>,
    recency_counter: u64,
    stats: CacheStats,
}

/// Response cache keyed by `(provider/model, query, task class)` — spec.md
/// §4.4 steps 3 and 5, §8. Insertion-order-as-recency LRU (re-inserted on
/// access) plus per-entry TTL; a background sweep clears expired entries.
/// One mutex guards map and counters together (§5: negligible contention at
/// the few-hundred-entry scale this cache runs at).
pub struct LruTtlCache {
    inner: Mutex<Inner>,
    enabled: bool,
    ttl: Duration,
    max_size: usize,
}

impl LruTtlCache {
    pub fn new(enabled: bool, ttl_seconds: u64, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency_counter: 0,
                stats: CacheStats {
                    max_size,
                    ..Default::default()
                },
            }),
            enabled,
            ttl: Duration::from_secs(ttl_seconds),
            max_size,
        }
    }

    fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    fn should_bypass(&self, query: &str) -> bool {
        if !self.enabled || self.ttl_seconds() == 0 {
            return true;
        }
        let normalized = query.to_lowercase();
        BYPASS_KEYWORDS.iter().any(|kw| normalized.contains(kw))
    }

    pub fn get(&self, model: &str, query: &str, task_class: TaskClass) -> Option<ChatResponse> {
        if self.should_bypass(query) {
            return None;
        }
        let key = cache_key(model, query, task_class);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        let expired = match inner.entries.get(&key) {
            Some(e) => e.expires_at.is_some_and(|at| at <= Instant::now()),
            None => false,
        };
        if expired {
            inner.entries.remove(&key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            inner.stats.size = inner.entries.len();
            return None;
        }

        inner.recency_counter += 1;
        let next_recency = inner.recency_counter;
        match inner.entries.get_mut(&key) {
            Some(e) => {
                e.recency = next_recency;
                let value = e.value.clone();
                inner.stats.hits += 1;
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&self, model: &str, query: &str, task_class: TaskClass, value: ChatResponse) {
        if self.should_bypass(query) {
            return;
        }
        let key = cache_key(model, query, task_class);
        let expires_at = if self.ttl_seconds() == 0 {
            None
        } else {
            Some(Instant::now() + self.ttl)
        };

        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.recency_counter += 1;
        let recency = inner.recency_counter;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.recency)
                .map(|(k, _)| *k)
            {
                inner.entries.remove(&lru_key);
                inner.stats.evictions += 1;
            }
        }

        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                recency,
            },
        );
        inner.stats.sets += 1;
        inner.stats.size = inner.entries.len();
    }

    pub fn delete(&self, model: &str, query: &str, task_class: TaskClass) -> bool {
        let key = cache_key(model, query, task_class);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let removed = inner.entries.remove(&key).is_some();
        if removed {
            inner.stats.deletes += 1;
            inner.stats.size = inner.entries.len();
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().expect("cache mutex poisoned").stats
    }

    /// Background 60s sweep — O(n) over entries scanned, spec.md §4.4.
    pub fn sweep_expired(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();
        let expired_keys: Vec<u64> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| *k)
            .collect();
        let count = expired_keys.len() as u64;
        for key in expired_keys {
            inner.entries.remove(&key);
        }
        inner.stats.expirations += count;
        inner.stats.size = inner.entries.len();
    }

    /// Spawns the periodic sweep task. Caller keeps the returned handle alive
    /// for as long as the cache should keep sweeping.
    pub fn spawn_sweeper(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                self.sweep_expired();
            }
        })
    }
}

fn cache_key(model: &str, query: &str, task_class: TaskClass) -> u64 {
    use std::hash::{Hash, Hasher};
    let normalized: String = query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(QUERY_HASH_PREFIX_LEN)
        .collect();

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    model.hash(&mut hasher);
    normalized.hash(&mut hasher);
    task_class.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(text: &str) -> ChatResponse {
        ChatResponse {
            text: text.to_string(),
            tokens: Some(1),
            model_info: "test-model".to_string(),
        }
    }

    #[test]
    fn empty_cache_hit_rate_has_no_divide_by_zero() {
        let cache = LruTtlCache::new(true, 300, 100);
        assert_eq!(cache.stats().hit_rate(), "0.00%");
    }

    #[test]
    fn hits_plus_misses_equals_get_calls() {
        let cache = LruTtlCache::new(true, 300, 100);
        cache.put("m", "hello there friend", TaskClass::Simple, resp("hi"));
        cache.get("m", "hello there friend", TaskClass::Simple);
        cache.get("m", "something else entirely", TaskClass::Simple);
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn max_size_one_always_evicts() {
        let cache = LruTtlCache::new(true, 300, 1);
        cache.put("m", "first query here", TaskClass::Simple, resp("a"));
        cache.put("m", "second query here", TaskClass::Simple, resp("b"));
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.get("m", "first query here", TaskClass::Simple).is_none());
        assert!(cache.get("m", "second query here", TaskClass::Simple).is_some());
    }

    #[test]
    fn ttl_zero_never_expires_but_bypasses_cache() {
        // ttl=0 means "never expires" per config semantics, but step 3 also
        // says cache is bypassed entirely when TTL <= 0.
        let cache = LruTtlCache::new(true, 0, 100);
        cache.put("m", "some query text", TaskClass::Simple, resp("a"));
        assert_eq!(cache.stats().size, 0);
        assert!(cache.get("m", "some query text", TaskClass::Simple).is_none());
    }

    #[test]
    fn bypass_keyword_skips_cache_entirely() {
        let cache = LruTtlCache::new(true, 300, 100);
        cache.put("m", "what is the current trending topic", TaskClass::Simple, resp("a"));
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().sets, 0);
    }

    #[test]
    fn lru_eviction_with_max_size_three() {
        let cache = LruTtlCache::new(true, 300, 3);
        cache.put("m", "query a text", TaskClass::Simple, resp("a"));
        cache.put("m", "query b text", TaskClass::Simple, resp("b"));
        cache.put("m", "query c text", TaskClass::Simple, resp("c"));
        cache.put("m", "query d text", TaskClass::Simple, resp("d"));

        assert!(cache.get("m", "query a text", TaskClass::Simple).is_none());
        assert!(cache.get("m", "query b text", TaskClass::Simple).is_some());
        assert!(cache.get("m", "query c text", TaskClass::Simple).is_some());
        assert!(cache.get("m", "query d text", TaskClass::Simple).is_some());
        assert_eq!(cache.stats().size, 3);
    }
}
