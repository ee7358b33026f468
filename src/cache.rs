//! Bounded, TTL-expiring memoization of query responses (spec §4.8).
//!
//! Deliberately simple: a capacity-bounded map behind a `Mutex`, evicting
//! expired entries first and falling back to removing an arbitrary entry
//! when still over capacity. This crate's response *shaping* (JSON, status
//! codes) lives in `api.rs`; this module only memoizes whatever `String`
//! body that layer hands it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CachedResponse {
    body: String,
    expires_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
    ttl: Duration,
    capacity: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> ResponseCache {
        ResponseCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, body: String) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            evict_one(&mut entries);
        }
        entries.insert(
            key,
            CachedResponse {
                body,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }
}

fn evict_one(entries: &mut HashMap<String, CachedResponse>) {
    let now = Instant::now();
    if let Some(expired_key) = entries
        .iter()
        .find(|(_, v)| v.expires_at <= now)
        .map(|(k, _)| k.clone())
    {
        entries.remove(&expired_key);
        return;
    }
    if let Some(any_key) = entries.keys().next().cloned() {
        entries.remove(&any_key);
    }
}

/// Positions many moves deep into a game are rarely queried twice; caching
/// them would just burn memory on one-shot lookups, so the API layer skips
/// the cache once a FEN's fullmove number (its 6th space-separated field)
/// exceeds `threshold`. A malformed/absent fullmove field is treated as "not
/// deep", i.e. still eligible for caching.
pub fn should_cache(fen: &str, threshold: u32) -> bool {
    fen.split_whitespace()
        .nth(5)
        .and_then(|n| n.parse::<u32>().ok())
        .map(|fullmove| fullmove <= threshold)
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_value() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        cache.put("k".into(), "v".into());
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = ResponseCache::new(Duration::from_millis(1), 10);
        cache.put("k".into(), "v".into());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.put("a".into(), "1".into());
        cache.put("b".into(), "2".into());
        cache.put("c".into(), "3".into());
        assert!(cache.len() <= 2);
    }

    #[test]
    fn should_cache_respects_fullmove_threshold() {
        let shallow = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let deep = "8/8/8/8/8/8/8/8 w - - 0 80";
        assert!(should_cache(shallow, 40));
        assert!(!should_cache(deep, 40));
    }
}
