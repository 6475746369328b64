//! Bounded cache of loaded models
//!
//! Loading a model is expensive, so loaded handles are kept in an LRU map
//! shared by every request. The lock only guards map bookkeeping; loads run
//! with no lock held.

use log::{debug, info};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::config::registry::ModelRegistry;
use crate::errors::{StudioError, StudioResult};
use crate::services::engine::{ModelHandle, ModelLoader};

pub struct ModelCache {
    registry: Arc<ModelRegistry>,
    loader: Arc<dyn ModelLoader>,
    entries: Mutex<LruCache<String, Arc<ModelHandle>>>,
    loads: AtomicUsize,
}

impl ModelCache {
    pub fn new(
        registry: Arc<ModelRegistry>,
        loader: Arc<dyn ModelLoader>,
        capacity: usize,
    ) -> StudioResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            StudioError::Configuration("Model cache capacity must be at least 1".to_string())
        })?;

        Ok(Self {
            registry,
            loader,
            entries: Mutex::new(LruCache::new(capacity)),
            loads: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Return the loaded handle for `name`, loading it on a miss.
    ///
    /// Two concurrent misses on the same name both load; the later insert
    /// replaces the earlier one.
    pub async fn acquire(&self, name: &str) -> StudioResult<Arc<ModelHandle>> {
        let descriptor = self.registry.require(name)?;

        if let Some(handle) = self.entries.lock().get(name) {
            debug!(
                "Model cache hit: {} (loaded {:.1}s ago)",
                name,
                handle.loaded_at().elapsed().as_secs_f64()
            );
            return Ok(Arc::clone(handle));
        }

        info!("Loading model {} ({})", name, descriptor.repo_id);
        let started = Instant::now();
        self.loads.fetch_add(1, Ordering::SeqCst);

        let model = self
            .loader
            .load(descriptor)
            .await
            .map_err(|e| StudioError::LoadFailure {
                model: name.to_string(),
                reason: e.to_string(),
            })?;

        let handle = Arc::new(ModelHandle::new(descriptor.clone(), model));
        info!("Loaded model {} in {:?}", name, started.elapsed());

        let evicted = self
            .entries
            .lock()
            .push(name.to_string(), Arc::clone(&handle));

        // Dropped here, outside the lock
        if let Some((key, _old)) = evicted {
            if key == name {
                debug!("Replaced concurrently loaded {}", key);
            } else {
                info!("Evicted model {} to make room for {}", key, name);
            }
        }

        Ok(handle)
    }

    /// Membership check, does not touch recency
    pub fn is_loaded(&self, name: &str) -> bool {
        self.entries.lock().contains(name)
    }

    /// Loaded model names, most recently used first
    pub fn loaded_models(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Drop one model from the cache. Returns whether it was loaded.
    pub fn evict(&self, name: &str) -> bool {
        let removed = self.entries.lock().pop(name);
        if removed.is_some() {
            info!("Evicted model {}", name);
        }
        removed.is_some()
    }

    /// Unload everything
    pub fn clear(&self) {
        let drained: Vec<_> = {
            let mut entries = self.entries.lock();
            let names = entries.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
            entries.clear();
            names
        };
        for name in drained {
            info!("Unloaded model {}", name);
        }
    }

    /// Number of loader invocations so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
