//! Process-wide map from requested path to extracted location.
//!
//! Each path owns a one-shot cell. Concurrent callers for the same path block
//! on that cell while a single loader runs; unrelated paths never wait on
//! each other. A failed load leaves the cell empty so a later call retries.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use resloader_archive::ExtractedResource;

use crate::error::Result;

#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: DashMap<String, Arc<OnceCell<ExtractedResource>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached resource for `key`, running `load` at most once per
    /// successful extraction.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<ExtractedResource>
    where
        F: FnOnce() -> Result<ExtractedResource>,
    {
        // Clone the cell out so the shard lock is not held while loading.
        let cell = self.entries.entry(key.to_owned()).or_default().clone();
        if let Some(hit) = cell.get() {
            tracing::debug!(path = key, "resource cache hit");
            return Ok(hit.clone());
        }
        let resource = cell.get_or_try_init(|| {
            tracing::debug!(path = key, "resource cache miss");
            load()
        })?;
        Ok(resource.clone())
    }

    pub fn get(&self, key: &str) -> Option<ExtractedResource> {
        self.entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Forgets `key`, so the next request extracts again.
    pub fn invalidate(&self, key: &str) -> Option<ExtractedResource> {
        self.entries
            .remove(key)
            .and_then(|(_, cell)| cell.get().cloned())
    }

    /// Number of paths with a completed extraction.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    #[test]
    fn second_call_reuses_first_result() {
        let cache = ResourceCache::new();
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExtractedResource::file("/tmp/resource-loader/a.so"))
        };

        let first = cache.get_or_load("/a.so", load).unwrap();
        let second = cache.get_or_load("/a.so", load).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_exact_strings() {
        let cache = ResourceCache::new();
        cache.get_or_load("/a.so", || Ok(ExtractedResource::file("/x/1"))).unwrap();
        cache.get_or_load("a.so", || Ok(ExtractedResource::file("/x/2"))).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failure_is_not_cached() {
        let cache = ResourceCache::new();
        let err = cache.get_or_load("/a.so", || Err(Error::NotFound("/a.so".into()))).unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.get("/a.so").is_none());

        let ok = cache.get_or_load("/a.so", || Ok(ExtractedResource::file("/x/a.so"))).unwrap();
        assert_eq!(ok.path(), std::path::Path::new("/x/a.so"));
    }

    #[test]
    fn invalidate_forces_reload() {
        let cache = ResourceCache::new();
        cache.get_or_load("/a.so", || Ok(ExtractedResource::file("/x/1"))).unwrap();
        assert!(cache.invalidate("/a.so").is_some());
        let again = cache.get_or_load("/a.so", || Ok(ExtractedResource::file("/x/2"))).unwrap();
        assert_eq!(again.path(), std::path::Path::new("/x/2"));
    }

    #[test]
    fn concurrent_callers_share_one_extraction() {
        let cache = Arc::new(ResourceCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_load("/lib/libsodium.so", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(ExtractedResource::file("/tmp/x/libsodium.so"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn unrelated_paths_do_not_wait_on_each_other() {
        let cache = Arc::new(ResourceCache::new());
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let slow = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache
                    .get_or_load("/slow", || {
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(ExtractedResource::file("/x/slow"))
                    })
                    .unwrap()
            })
        };

        started_rx.recv().unwrap();
        // Completes while "/slow" is still in flight.
        let fast = cache.get_or_load("/fast", || Ok(ExtractedResource::file("/x/fast"))).unwrap();
        assert_eq!(fast.path(), std::path::Path::new("/x/fast"));

        release_tx.send(()).unwrap();
        assert_eq!(slow.join().unwrap().path(), std::path::Path::new("/x/slow"));
    }
}
