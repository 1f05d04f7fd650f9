//! Shared cache of fast sites, allocators, and adapters.
//!
//! Sites are partitioned into buckets by native layout, each a sharded
//! [`DashMap`]. Builds take the bucket's mutex and re-check before
//! constructing, so one thread builds a given site while others wait and
//! then reuse it.
//!
//! Adapters are held weakly: a site owns its adapters, and once every site
//! referring to an adapter is replaced the adapter and its function are
//! released. Dead entries are swept whenever the table doubles.

use super::{FastBindStats, FastCallSite, NativeAllocator, NestedInvokeAdapter};
use crate::binder::{CallSignature, InvokeBinder};
use crate::error::BindError;
use dashmap::DashMap;
use ember_runtime::{FunctionObject, LayoutId, NativeLayout, TypeId, TypeVersion, Value};
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

/// Adapter table size below which dead entries are left in place.
const ADAPTER_PRUNE_FLOOR: usize = 64;

/// Key of a cached site inside a layout bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SiteKey {
    pub(crate) type_id: TypeId,
    pub(crate) signature: CallSignature,
}

/// Key of a nested adapter: callable identity plus the nested signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AdapterKey {
    callable: usize,
    signature: CallSignature,
}

// =============================================================================
// Layout Bucket
// =============================================================================

/// Sites and allocator for one native layout.
pub(crate) struct LayoutBucket {
    sites: DashMap<SiteKey, Arc<FastCallSite>, FxBuildHasher>,
    allocator: OnceLock<Option<Arc<NativeAllocator>>>,
    build_lock: Mutex<()>,
}

/// What a build closure produced.
pub(crate) enum BuildOutcome<T> {
    Built(Arc<FastCallSite>),
    Rejected(T),
}

impl LayoutBucket {
    fn new() -> Self {
        Self {
            sites: DashMap::with_hasher(FxBuildHasher),
            allocator: OnceLock::new(),
            build_lock: Mutex::new(()),
        }
    }

    /// Cached site for `key` if it was built for `version`.
    #[inline]
    pub(crate) fn lookup(&self, key: &SiteKey, version: TypeVersion) -> Option<Arc<FastCallSite>> {
        self.sites
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(|site| site.version() == version)
    }

    /// Return the cached site or build one under the bucket lock.
    ///
    /// Rejections are not cached. A stale entry under the same key is
    /// replaced by the new build.
    pub(crate) fn get_or_build<T, F>(
        &self,
        key: SiteKey,
        version: TypeVersion,
        stats: &FastBindStats,
        build: F,
    ) -> Result<BuildOutcome<T>, BindError>
    where
        F: FnOnce() -> Result<BuildOutcome<T>, BindError>,
    {
        if let Some(site) = self.lookup(&key, version) {
            stats.record_cache_reuse();
            return Ok(BuildOutcome::Built(site));
        }

        let _guard = self.build_lock.lock();
        if let Some(site) = self.lookup(&key, version) {
            stats.record_cache_reuse();
            return Ok(BuildOutcome::Built(site));
        }

        let outcome = build()?;
        if let BuildOutcome::Built(site) = &outcome {
            self.sites.insert(key, site.clone());
        }
        Ok(outcome)
    }

    /// The layout's direct allocator, created on first request.
    pub(crate) fn allocator(
        &self,
        layout: &NativeLayout,
        stats: &FastBindStats,
    ) -> Option<Arc<NativeAllocator>> {
        self.allocator
            .get_or_init(|| {
                let allocator = NativeAllocator::for_layout(layout).map(Arc::new);
                if allocator.is_some() {
                    stats.record_allocator_build();
                }
                allocator
            })
            .clone()
    }

    fn len(&self) -> usize {
        self.sites.len()
    }
}

// =============================================================================
// Cache
// =============================================================================

/// All memoized fast-binding artifacts of one binder.
pub struct FastBindCache {
    buckets: DashMap<LayoutId, Arc<LayoutBucket>, FxBuildHasher>,
    adapters: DashMap<AdapterKey, Weak<NestedInvokeAdapter>, FxBuildHasher>,
    /// Adapter table size that triggers the next sweep.
    prune_at: AtomicUsize,
}

impl FastBindCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            buckets: DashMap::with_hasher(FxBuildHasher),
            adapters: DashMap::with_hasher(FxBuildHasher),
            prune_at: AtomicUsize::new(ADAPTER_PRUNE_FLOOR),
        }
    }

    /// Bucket for `layout`, created if missing.
    pub(crate) fn bucket(&self, layout: LayoutId) -> Arc<LayoutBucket> {
        if let Some(bucket) = self.buckets.get(&layout) {
            return bucket.value().clone();
        }
        self.buckets
            .entry(layout)
            .or_insert_with(|| Arc::new(LayoutBucket::new()))
            .value()
            .clone()
    }

    /// Shared adapter for `func` under the nested `binder`.
    pub(crate) fn adapter(
        &self,
        func: &Arc<FunctionObject>,
        binder: &InvokeBinder,
        stats: &FastBindStats,
    ) -> Arc<NestedInvokeAdapter> {
        // A live adapter holds the function, so the address cannot be
        // reused while the entry upgrades.
        let key = AdapterKey {
            callable: Arc::as_ptr(func) as usize,
            signature: binder.signature().clone(),
        };
        let adapter = {
            let mut entry = self.adapters.entry(key).or_default();
            if let Some(adapter) = entry.upgrade() {
                return adapter;
            }
            stats.record_adapter_build();
            let adapter = Arc::new(NestedInvokeAdapter::new(
                Value::Function(func.clone()),
                binder.clone(),
            ));
            *entry = Arc::downgrade(&adapter);
            adapter
        };
        self.prune_adapters();
        adapter
    }

    /// Drop entries whose adapters are gone once the table reaches the
    /// sweep threshold.
    fn prune_adapters(&self) {
        let threshold = self.prune_at.load(Ordering::Relaxed);
        if self.adapters.len() < threshold {
            return;
        }
        let before = self.adapters.len();
        self.adapters.retain(|_, adapter| adapter.strong_count() > 0);
        let live = self.adapters.len();
        self.prune_at
            .store((live * 2).max(ADAPTER_PRUNE_FLOOR), Ordering::Relaxed);
        trace!(removed = before - live, live, "pruned nested adapters");
    }

    /// Number of layout buckets.
    pub fn layout_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of cached sites, stale entries included.
    pub fn site_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    /// Number of adapter entries, including ones not yet swept.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for FastBindCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FastBindCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastBindCache")
            .field("layouts", &self.layout_count())
            .field("sites", &self.site_count())
            .field("adapters", &self.adapter_count())
            .finish()
    }
}
