//! Feature cache
//!
//! Holds at most one live instance per (type, feature name). A hit returns
//! the cached `Arc` unchanged, which is what lets every consumer of a feature
//! share one object without further synchronisation.

use crate::feature::{BoundFeature, LiveFeature};
use dashmap::DashMap;
use featsync_binder::FeatureSettings;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Cache key: concrete type plus feature name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    type_id: TypeId,
    feature: String,
}

impl FeatureKey {
    /// Key for feature `feature` of type `T`
    #[inline]
    #[must_use]
    pub fn new<T: FeatureSettings>(feature: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            feature: feature.into(),
        }
    }

    /// Feature name
    #[inline]
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Type ID
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// One cached entry, stored both typed (for lookups) and erased (for
/// store-wide operations)
struct CacheEntry {
    typed: Arc<dyn Any + Send + Sync>,
    live: Arc<dyn LiveFeature>,
}

/// Per-store cache of bound features
#[derive(Default)]
pub struct FeatureCache {
    entries: DashMap<FeatureKey, CacheEntry>,
}

impl FeatureCache {
    /// Create an empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance of feature `feature` of type `T`
    #[must_use]
    pub fn get<T: FeatureSettings>(&self, feature: &str) -> Option<Arc<T>> {
        self.get_bound::<T>(feature)
            .map(|bound| Arc::clone(bound.instance()))
    }

    /// Cached record of feature `feature` of type `T`
    #[must_use]
    pub fn get_bound<T: FeatureSettings>(&self, feature: &str) -> Option<Arc<BoundFeature<T>>> {
        let key = FeatureKey::new::<T>(feature);
        let typed = Arc::clone(&self.entries.get(&key)?.typed);
        typed.downcast::<BoundFeature<T>>().ok()
    }

    /// Cached instance, or the one built by `factory`
    ///
    /// See [`FeatureCache::get_or_create_bound`].
    pub fn get_or_create<T, F>(&self, feature: &str, factory: F) -> Arc<T>
    where
        T: FeatureSettings,
        F: FnOnce() -> BoundFeature<T>,
    {
        Arc::clone(self.get_or_create_bound(feature, factory).instance())
    }

    /// Cached record, or the one built by `factory`
    ///
    /// `factory` only runs on a miss, with the key's shard locked, so two
    /// racing lookups still end up with one instance. It must not touch
    /// this cache.
    pub fn get_or_create_bound<T, F>(&self, feature: &str, factory: F) -> Arc<BoundFeature<T>>
    where
        T: FeatureSettings,
        F: FnOnce() -> BoundFeature<T>,
    {
        if let Some(bound) = self.get_bound::<T>(feature) {
            return bound;
        }

        let typed = {
            let entry = self
                .entries
                .entry(FeatureKey::new::<T>(feature))
                .or_insert_with(|| {
                    let bound = Arc::new(factory());
                    CacheEntry {
                        typed: Arc::clone(&bound) as Arc<dyn Any + Send + Sync>,
                        live: bound,
                    }
                });
            Arc::clone(&entry.typed)
        };
        match typed.downcast::<BoundFeature<T>>() {
            Ok(bound) => bound,
            Err(_) => unreachable!("cache key carries the concrete type"),
        }
    }

    /// Whether feature `feature` of type `T` is cached
    #[must_use]
    pub fn contains<T: FeatureSettings>(&self, feature: &str) -> bool {
        self.entries.contains_key(&FeatureKey::new::<T>(feature))
    }

    /// Number of cached features
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached keys, sorted by feature name
    #[must_use]
    pub fn keys(&self) -> Vec<FeatureKey> {
        let mut keys: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort_by(|a, b| a.feature.cmp(&b.feature));
        keys
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Erased view of every entry
    pub(crate) fn live_features(&self) -> Vec<Arc<dyn LiveFeature>> {
        self.entries.iter().map(|e| Arc::clone(&e.live)).collect()
    }
}

impl std::fmt::Debug for FeatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureCache")
            .field("features", &self.keys().iter().map(FeatureKey::feature).collect::<Vec<_>>())
            .finish()
    }
}
