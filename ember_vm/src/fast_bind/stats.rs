//! Fast-binding counters.
//!
//! Relaxed atomics; values are for diagnostics and tests, not
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a [`super::FastBinder`].
#[derive(Debug, Default)]
pub struct FastBindStats {
    site_builds: AtomicU64,
    cache_reuses: AtomicU64,
    allocator_builds: AtomicU64,
    adapter_builds: AtomicU64,
    ineligible: AtomicU64,
    fast_hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time copy of [`FastBindStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Fast sites constructed.
    pub site_builds: u64,
    /// Build requests answered by an already cached site.
    pub cache_reuses: u64,
    pub allocator_builds: u64,
    pub adapter_builds: u64,
    /// Types rejected for specialization.
    pub ineligible: u64,
    /// Calls served by a fast site.
    pub fast_hits: u64,
    /// Guard failures or empty call-site targets.
    pub misses: u64,
    /// Calls run through the general protocol.
    pub fallbacks: u64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl FastBindStats {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_site_build, site_builds);
    counter!(record_cache_reuse, cache_reuses);
    counter!(record_allocator_build, allocator_builds);
    counter!(record_adapter_build, adapter_builds);
    counter!(record_ineligible, ineligible);
    counter!(record_fast_hit, fast_hits);
    counter!(record_miss, misses);
    counter!(record_fallback, fallbacks);

    /// Point-in-time copy; counters are read independently.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            site_builds: self.site_builds.load(Ordering::Relaxed),
            cache_reuses: self.cache_reuses.load(Ordering::Relaxed),
            allocator_builds: self.allocator_builds.load(Ordering::Relaxed),
            adapter_builds: self.adapter_builds.load(Ordering::Relaxed),
            ineligible: self.ineligible.load(Ordering::Relaxed),
            fast_hits: self.fast_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Fraction of calls served by a fast site, in percent.
    pub fn hit_rate(&self) -> f64 {
        let total = self.fast_hits + self.fallbacks;
        if total == 0 {
            0.0
        } else {
            self.fast_hits as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = FastBindStats::new();
        stats.record_site_build();
        stats.record_fast_hit();
        stats.record_fast_hit();
        stats.record_fast_hit();
        stats.record_fallback();
        let snap = stats.snapshot();
        assert_eq!(snap.site_builds, 1);
        assert_eq!(snap.fast_hits, 3);
        assert_eq!(snap.hit_rate(), 75.0);
    }

    #[test]
    fn test_empty_hit_rate() {
        assert_eq!(StatsSnapshot::default().hit_rate(), 0.0);
    }
}
