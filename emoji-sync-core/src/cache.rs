//! Per-client, scope-keyed cache of emoji listings.
//!
//! Each directory client owns one [`ScopeCache`]. Entries live as long as the
//! client (no TTL) and are dropped explicitly with [`ScopeCache::invalidate`]
//! after any write against the scope.
//!
//! Every invalidation bumps the scope's generation. A listing is stored only if
//! the generation read before fetching it is still current, so a fetch that
//! overlaps a write never repopulates the cache with the pre-write inventory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::contract::Emoji;

#[derive(Debug, Default)]
struct Entries {
    listings: HashMap<String, Vec<Emoji>>,
    generations: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeCache {
    entries: Arc<Mutex<Entries>>,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached listing for `scope`, if any.
    pub async fn get(&self, scope: &str) -> Option<Vec<Emoji>> {
        let entries = self.entries.lock().await;
        entries.listings.get(scope).cloned()
    }

    /// Current generation of `scope`. Read it before fetching a listing.
    pub async fn generation(&self, scope: &str) -> u64 {
        let entries = self.entries.lock().await;
        entries.generations.get(scope).copied().unwrap_or(0)
    }

    /// Store a listing fetched at `generation`. Returns false, storing nothing,
    /// when the scope was invalidated since.
    pub async fn put(&self, scope: &str, emojis: Vec<Emoji>, generation: u64) -> bool {
        let mut entries = self.entries.lock().await;
        let current = entries.generations.get(scope).copied().unwrap_or(0);
        if current != generation {
            tracing::debug!(scope, generation, current, "[CACHE] Discarding listing fetched before a write");
            return false;
        }
        entries.listings.insert(scope.to_string(), emojis);
        true
    }

    /// Drop the entry for `scope` and bump its generation. Returns whether an
    /// entry was present.
    pub async fn invalidate(&self, scope: &str) -> bool {
        let mut entries = self.entries.lock().await;
        *entries.generations.entry(scope.to_string()).or_insert(0) += 1;
        let removed = entries.listings.remove(scope).is_some();
        if removed {
            tracing::debug!(scope, "[CACHE] Invalidated emoji listing");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let cache = ScopeCache::new();
        assert!(cache.get("team").await.is_none());

        let generation = cache.generation("team").await;
        assert!(
            cache
                .put("team", vec![Emoji::new("party", "party", "https://e/p.gif")], generation)
                .await
        );
        assert_eq!(cache.get("team").await.map(|v| v.len()), Some(1));

        assert!(cache.invalidate("team").await);
        assert!(!cache.invalidate("team").await);
        assert!(cache.get("team").await.is_none());
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let cache = ScopeCache::new();
        cache.put("a", vec![], 0).await;
        cache
            .put("b", vec![Emoji::new("x", "x", "https://e/x.png")], 0)
            .await;

        cache.invalidate("a").await;
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.get("b").await.map(|v| v.len()), Some(1));
        assert_eq!(cache.generation("b").await, 0);
    }

    #[tokio::test]
    async fn test_listing_fetched_before_invalidation_is_not_stored() {
        let cache = ScopeCache::new();

        let generation = cache.generation("group").await;
        // A write lands while the listing is in flight.
        cache.invalidate("group").await;

        let stored = cache
            .put("group", vec![Emoji::new("1", "party", "https://e/p.gif")], generation)
            .await;
        assert!(!stored);
        assert!(cache.get("group").await.is_none());

        let generation = cache.generation("group").await;
        assert!(cache.put("group", vec![], generation).await);
        assert_eq!(cache.get("group").await, Some(vec![]));
    }
}
