// patterns/cache.rs
use crate::error::GlobError;
use crate::patterns::segment::{compile_segment, SegmentMatcher, SegmentOpts};
use lru::LruCache;
use once_cell::sync::Lazy;
use std::{num::NonZeroUsize, sync::Mutex};

// Limit cache size to prevent uncontrolled memory growth
const MAX_CACHE_SIZE: usize = 1000;
const MAX_SEGMENT_LEN: usize = 1000;
const MAX_GROUP_COUNT: usize = 100;

/// Metrics for cache performance monitoring
#[derive(Clone, Debug, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheMetrics {
    /// Calculates the cache hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// LRU cache of compiled segment matchers, keyed by glob text and flags
struct SegmentCache {
    cache: Mutex<LruCache<String, SegmentMatcher>>,
    metrics: Mutex<CacheMetrics>,
}

impl SegmentCache {
    fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(MAX_CACHE_SIZE).unwrap())),
            metrics: Mutex::new(CacheMetrics::default()),
        }
    }

    fn get(&self, key: &str) -> Option<SegmentMatcher> {
        let mut cache = self.cache.lock().unwrap();
        let mut metrics = self.metrics.lock().unwrap();
        match cache.get(key) {
            Some(m) => {
                metrics.hits += 1;
                Some(m.clone())
            }
            None => {
                metrics.misses += 1;
                None
            }
        }
    }

    fn put(&self, key: String, value: SegmentMatcher) {
        let mut cache = self.cache.lock().unwrap();
        cache.put(key, value);
        self.metrics.lock().unwrap().size = cache.len();
    }

    fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.cache.lock().unwrap().clear();
        self.metrics.lock().unwrap().size = 0;
    }
}

static SEGMENT_CACHE: Lazy<SegmentCache> = Lazy::new(SegmentCache::new);

/// Retrieves a compiled segment matcher from cache or compiles and caches it
///
/// # Errors
///
/// Returns `GlobError::RegexTooComplex` for segments exceeding complexity
/// limits, or a compile error for malformed classes and extglobs.
pub fn get_or_compile(segment: &str, opts: SegmentOpts) -> Result<SegmentMatcher, GlobError> {
    if segment.len() > MAX_SEGMENT_LEN || segment.matches('(').count() > MAX_GROUP_COUNT {
        return Err(GlobError::RegexTooComplex);
    }

    let key = opts.cache_key(segment);
    if let Some(cached) = SEGMENT_CACHE.get(&key) {
        return Ok(cached);
    }

    let m = compile_segment(segment, opts)?;
    SEGMENT_CACHE.put(key, m.clone());
    Ok(m)
}

/// Clears the segment matcher cache
pub fn clear_cache() {
    SEGMENT_CACHE.clear();
}

/// Returns metrics for the segment matcher cache
pub fn segment_cache_metrics() -> CacheMetrics {
    SEGMENT_CACHE.metrics()
}
