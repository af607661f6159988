//! Memoisation of normal resolution results.
//!
//! Purely a performance layer: entries expire after a TTL, and every rule
//! mutation bumps the generation and clears the map. A resolution that began
//! under an older generation is not stored. Mutations made through another
//! instance are picked up by comparing the store's rules revision before each
//! lookup.

use crate::models::{PricingRequest, PricingResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Cache key derived from a validated request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    client_id: Option<Uuid>,
    governorate_id: Option<Uuid>,
    city_id: Option<Uuid>,
    zone_name: Option<String>,
    package_type: Option<String>,
}

impl From<&PricingRequest> for CacheKey {
    fn from(request: &PricingRequest) -> Self {
        Self {
            client_id: request.client_id,
            governorate_id: request.governorate_id,
            city_id: request.city_id,
            zone_name: request.zone_name.as_ref().map(|z| z.to_lowercase()),
            package_type: request.package_type.as_ref().map(|p| p.to_lowercase()),
        }
    }
}

struct CachedResult {
    result: PricingResult,
    stored_at: Instant,
}

pub struct ResolutionCache {
    entries: DashMap<CacheKey, CachedResult>,
    generation: AtomicU64,
    store_revision: AtomicI64,
    ttl: Duration,
    max_entries: usize,
}

impl ResolutionCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            store_revision: AtomicI64::new(i64::MIN),
            ttl,
            max_entries,
        }
    }

    /// Current generation; capture it before resolving.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Record the store's current rules revision. When it moved since the
    /// last observation every entry is dropped. Returns whether it moved.
    pub fn observe_store_revision(&self, revision: i64) -> bool {
        let previous = self.store_revision.swap(revision, Ordering::AcqRel);
        if previous == revision {
            return false;
        }
        self.invalidate_all();
        true
    }

    pub fn get(&self, key: &CacheKey) -> Option<PricingResult> {
        {
            let entry = self.entries.get(key)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.result.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    /// Store a result computed under `generation`. Degraded results and
    /// results from a superseded generation are dropped.
    pub fn insert(&self, key: CacheKey, result: &PricingResult, generation: u64) -> bool {
        if result.is_degraded() || generation != self.generation() {
            return false;
        }
        if self.entries.len() >= self.max_entries {
            self.evict_expired();
            if self.entries.len() >= self.max_entries {
                return false;
            }
        }
        self.entries.insert(
            key,
            CachedResult {
                result: result.clone(),
                stored_at: Instant::now(),
            },
        );
        // A mutation may have landed between the check above and the insert.
        if generation != self.generation() {
            self.entries.clear();
            return false;
        }
        true
    }

    /// Drop everything. Called after every successful rule mutation.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, cached| cached.stored_at.elapsed() < ttl);
    }
}
