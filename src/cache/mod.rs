//! Run-wide package metadata cache.
//!
//! Every snapshot of a package pulls its metadata through the cache so the
//! descriptor is parsed and held once, no matter how many file entries or
//! inspections reference it. There is no eviction: the cache is bounded by
//! the number of distinct packages in a run.

use crate::error::{InspectError, MetadataErrorKind, Result};
use crate::model::{BuildSide, MetadataHandle, PackageMetadata};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Thread-safe, load-once cache of package metadata keyed by package name.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<String, MetadataHandle>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Statistics for cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached packages
    pub entries: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that invoked the loader
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served without loading.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl MetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached metadata for `package`, loading it on first use.
    ///
    /// The loader runs at most once per package name for the lifetime of the
    /// cache. A failing loader, or one that returns metadata for a different
    /// package, leaves the cache unchanged.
    pub fn get_or_load<F, E>(&self, package: &str, loader: F) -> Result<MetadataHandle>
    where
        F: FnOnce() -> std::result::Result<PackageMetadata, E>,
        E: Display,
    {
        if let Some(handle) = self.get(package) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(handle);
        }

        let mut entries = self.entries.write().expect("metadata cache lock poisoned");

        // Another worker may have loaded it while we waited for the lock
        if let Some(handle) = entries.get(package) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(handle));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let metadata = loader().map_err(|e| {
            tracing::warn!(package, "Metadata load failed: {e}");
            InspectError::metadata_load(package, e.to_string())
        })?;

        if metadata.name != package {
            return Err(InspectError::MetadataLoad {
                package: package.to_string(),
                source: MetadataErrorKind::NameMismatch {
                    found: metadata.name,
                },
            });
        }

        tracing::debug!(package, nvr = %metadata.nvr(), "Cached package metadata");
        let handle = Arc::new(metadata);
        entries.insert(package.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Look up metadata without loading.
    #[must_use]
    pub fn get(&self, package: &str) -> Option<MetadataHandle> {
        self.entries
            .read()
            .expect("metadata cache lock poisoned")
            .get(package)
            .map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, package: &str) -> bool {
        self.entries
            .read()
            .expect("metadata cache lock poisoned")
            .contains_key(package)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("metadata cache lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached package names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .expect("metadata cache lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// One metadata cache per side of a comparison.
///
/// Both builds usually carry a package of the same name, so each side keeps
/// its own name-keyed cache.
#[derive(Debug, Default)]
pub struct BuildCaches {
    before: MetadataCache,
    after: MetadataCache,
}

impl BuildCaches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn side(&self, side: BuildSide) -> &MetadataCache {
        match side {
            BuildSide::Before => &self.before,
            BuildSide::After => &self.after,
        }
    }

    /// Combined statistics of both sides.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (b, a) = (self.before.stats(), self.after.stats());
        CacheStats {
            entries: b.entries + a.entries,
            hits: b.hits + a.hits,
            misses: b.misses + a.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn meta(name: &str, version: &str) -> PackageMetadata {
        PackageMetadata::new(name, version, "1")
    }

    #[test]
    fn test_load_once_semantics() {
        let cache = MetadataCache::new();
        let first = cache
            .get_or_load("foo", || Ok::<_, String>(meta("foo", "1.0")))
            .expect("first load");
        let second = cache
            .get_or_load("foo", || Ok::<_, String>(meta("foo", "9.9")))
            .expect("second lookup");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version, "1.0");
        assert_eq!(cache.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn test_failed_load_leaves_cache_unchanged() {
        let cache = MetadataCache::new();
        let err = cache
            .get_or_load("foo", || Err::<PackageMetadata, _>("corrupt header"))
            .expect_err("loader fails");
        assert!(matches!(err, InspectError::MetadataLoad { ref package, .. } if package == "foo"));
        assert!(!cache.contains("foo"));

        // A later successful load still works
        let handle = cache
            .get_or_load("foo", || Ok::<_, String>(meta("foo", "1.0")))
            .expect("retry");
        assert_eq!(handle.name, "foo");
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let cache = MetadataCache::new();
        let err = cache
            .get_or_load("foo", || Ok::<_, String>(meta("bar", "1.0")))
            .expect_err("mismatch");
        assert!(matches!(
            err,
            InspectError::MetadataLoad {
                source: MetadataErrorKind::NameMismatch { .. },
                ..
            }
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_loads_run_loader_once() {
        let cache = Arc::new(MetadataCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_load("shared", || {
                            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                            Ok::<_, String>(meta("shared", "1.0"))
                        })
                        .expect("load")
                })
            })
            .collect();

        let results: Vec<MetadataHandle> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_build_caches_are_independent() {
        let caches = BuildCaches::new();
        let before = caches
            .side(BuildSide::Before)
            .get_or_load("foo", || Ok::<_, String>(meta("foo", "1.0")))
            .expect("before");
        let after = caches
            .side(BuildSide::After)
            .get_or_load("foo", || Ok::<_, String>(meta("foo", "2.0")))
            .expect("after");
        assert_eq!(before.version, "1.0");
        assert_eq!(after.version, "2.0");
        assert_eq!(caches.stats().misses, 2);
    }

    #[test]
    fn test_names_sorted() {
        let cache = MetadataCache::new();
        for name in ["zlib", "bash", "foo"] {
            cache
                .get_or_load(name, || Ok::<_, String>(meta(name, "1")))
                .expect("load");
        }
        assert_eq!(cache.names(), vec!["bash", "foo", "zlib"]);
    }
}
