//! # Global Resource Cache
//!
//! Owns reusable GPU objects for one shared context.
//!
//! ## Pipelines
//!
//! Pipelines are interned by [`PipelineKey`]. Each key gets its own slot; the
//! map lock is held only long enough to find or create the slot, and the
//! compile runs under the slot's lock. Concurrent callers for the same key
//! therefore wait for one compile and receive the same `Arc`, while compiles
//! for different keys proceed in parallel. A failed compile leaves the slot
//! empty so a later caller can retry.
//!
//! ## Scratch textures
//!
//! Budgeted textures return here when their last [`TextureRef`] drops and are
//! reused for equal [`ScratchKey`]s. Idle textures are evicted least recently
//! used first once the budget is exceeded. Evicted textures are destroyed
//! after the cache lock is released. Non-budgeted textures are never tracked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use super::device::Device;
use super::error::EngineResult;
use super::resource::{Budgeted, GraphicsPipeline, PipelineKey, ScratchKey, Texture, TextureRef};
use super::types::ImageDesc;

new_key_type! {
    /// Handle to an idle scratch texture
    struct ScratchHandle;
}

type PipelineSlot = Arc<Mutex<Option<Arc<GraphicsPipeline>>>>;

/// Idle texture waiting for reuse
#[derive(Debug)]
struct ScratchEntry {
    texture: Texture,
    last_used: u64,
}

#[derive(Debug, Default)]
struct ScratchState {
    idle: SlotMap<ScratchHandle, ScratchEntry>,
    by_key: HashMap<ScratchKey, Vec<ScratchHandle>>,
    /// Bytes of every live budgeted texture, idle or in use
    budgeted_bytes: u64,
    /// Budgeted textures alive, idle or in use
    budgeted_count: usize,
    timestamp: u64,
}

impl ScratchState {
    fn take_idle(&mut self, key: &ScratchKey) -> Option<Texture> {
        let handles = self.by_key.get_mut(key)?;
        let handle = handles.pop()?;
        if handles.is_empty() {
            self.by_key.remove(key);
        }
        self.idle.remove(handle).map(|entry| entry.texture)
    }

    /// Remove LRU idle textures until within `budget`; returns them for
    /// destruction outside the lock
    fn evict_over_budget(&mut self, budget: u64) -> Vec<Texture> {
        let mut evicted = Vec::new();
        while self.budgeted_bytes > budget {
            let Some((handle, _)) = self.idle.iter().min_by_key(|(_, entry)| entry.last_used) else {
                break;
            };
            if let Some(texture) = self.remove_idle(handle) {
                evicted.push(texture);
            }
        }
        evicted
    }

    fn remove_idle(&mut self, handle: ScratchHandle) -> Option<Texture> {
        let entry = self.idle.remove(handle)?;
        let key = ScratchKey(*entry.texture.desc());
        if let Some(handles) = self.by_key.get_mut(&key) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.by_key.remove(&key);
            }
        }
        self.budgeted_bytes -= entry.texture.memory_size();
        self.budgeted_count -= 1;
        Some(entry.texture)
    }
}

/// State reachable from outstanding [`TextureRef`]s
#[derive(Debug)]
pub(crate) struct CacheShared {
    budget: u64,
    scratch: Mutex<ScratchState>,
}

impl CacheShared {
    pub(crate) fn return_texture(&self, texture: Texture) {
        let evicted = {
            let mut state = self.scratch.lock();
            state.timestamp += 1;
            let last_used = state.timestamp;
            let key = ScratchKey(*texture.desc());
            let handle = state.idle.insert(ScratchEntry { texture, last_used });
            state.by_key.entry(key).or_default().push(handle);
            state.evict_over_budget(self.budget)
        };
        destroy_evicted(evicted);
    }
}

fn destroy_evicted(evicted: Vec<Texture>) {
    for texture in evicted {
        log::debug!(
            "[GLOBAL_CACHE] Evicting texture #{} ({} bytes)",
            texture.unique_id(),
            texture.memory_size()
        );
    }
}

/// Budget-aware owner of shared pipelines and scratch textures
#[derive(Debug)]
pub struct GlobalResourceCache {
    shared: Arc<CacheShared>,
    pipelines: Mutex<HashMap<PipelineKey, PipelineSlot>>,
    pipeline_count: AtomicUsize,
}

impl GlobalResourceCache {
    /// Create a cache retaining at most `budget` bytes of idle budgeted textures
    pub fn new(budget: u64) -> Self {
        log::debug!("[GLOBAL_CACHE] Created with budget {} bytes", budget);
        Self {
            shared: Arc::new(CacheShared {
                budget,
                scratch: Mutex::new(ScratchState::default()),
            }),
            pipelines: Mutex::new(HashMap::new()),
            pipeline_count: AtomicUsize::new(0),
        }
    }

    /// Budget in bytes
    pub fn budget(&self) -> u64 {
        self.shared.budget
    }

    /// Cached pipeline for `key`, if compiled already
    pub fn find_pipeline(&self, key: &PipelineKey) -> Option<Arc<GraphicsPipeline>> {
        let slot = self.pipelines.lock().get(key).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    /// Cached pipeline for `key`, compiling it with `compile` on first use
    ///
    /// Exactly one compile runs per key even when called concurrently.
    pub fn find_or_create_pipeline(
        &self,
        key: &PipelineKey,
        compile: impl FnOnce() -> EngineResult<GraphicsPipeline>,
    ) -> EngineResult<Arc<GraphicsPipeline>> {
        let slot = {
            let mut pipelines = self.pipelines.lock();
            Arc::clone(pipelines.entry(key.clone()).or_default())
        };

        let mut entry = slot.lock();
        if let Some(pipeline) = entry.as_ref() {
            return Ok(Arc::clone(pipeline));
        }

        log::debug!("[GLOBAL_CACHE] Compiling pipeline for key {}", key);
        let pipeline = Arc::new(compile()?);
        *entry = Some(Arc::clone(&pipeline));
        self.pipeline_count.fetch_add(1, Ordering::Relaxed);
        Ok(pipeline)
    }

    /// Number of compiled pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipeline_count.load(Ordering::Relaxed)
    }

    /// Texture for `desc`, reusing an idle budgeted one when possible
    pub fn find_or_create_texture(
        &self,
        device: &dyn Device,
        desc: &ImageDesc,
        budgeted: Budgeted,
        label: &str,
    ) -> EngineResult<TextureRef> {
        if budgeted == Budgeted::Yes {
            let reused = self.shared.scratch.lock().take_idle(&ScratchKey(*desc));
            if let Some(texture) = reused {
                log::debug!("[GLOBAL_CACHE] Reusing scratch texture #{} for '{}'", texture.unique_id(), label);
                return Ok(TextureRef::new(texture, Arc::downgrade(&self.shared)));
            }
        }

        let image = device.create_image(desc, label)?;
        let texture = Texture::new(image, budgeted);
        if budgeted == Budgeted::Yes {
            let mut state = self.shared.scratch.lock();
            state.budgeted_bytes += texture.memory_size();
            state.budgeted_count += 1;
            // In-use textures count toward the budget but cannot be evicted
            let evicted = state.evict_over_budget(self.shared.budget);
            drop(state);
            destroy_evicted(evicted);
        }
        Ok(TextureRef::new(texture, Arc::downgrade(&self.shared)))
    }

    /// Bytes held by live budgeted textures, idle or in use
    pub fn budgeted_bytes(&self) -> u64 {
        self.shared.scratch.lock().budgeted_bytes
    }

    /// Number of live budgeted textures, idle or in use
    pub fn resource_count(&self) -> usize {
        self.shared.scratch.lock().budgeted_count
    }

    /// Number of idle textures waiting for reuse
    pub fn idle_count(&self) -> usize {
        self.shared.scratch.lock().idle.len()
    }

    /// Destroy every idle texture
    pub fn purge_scratch(&self) {
        let evicted = {
            let mut state = self.shared.scratch.lock();
            let handles: Vec<ScratchHandle> = state.idle.keys().collect();
            handles
                .into_iter()
                .filter_map(|handle| state.remove_idle(handle))
                .collect::<Vec<_>>()
        };
        log::debug!("[GLOBAL_CACHE] Purging {} scratch textures", evicted.len());
        destroy_evicted(evicted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockCaps, MockDevice};
    use crate::engine::device::GraphicsPipelineDesc;
    use crate::engine::format::BackendFormat;
    use crate::engine::types::ColorType;

    fn desc(size: u32) -> ImageDesc {
        ImageDesc::new(BackendFormat::mock(ColorType::Rgba8888), size, size, false, true)
    }

    fn device() -> MockDevice {
        MockDevice::new(MockCaps::all_supported())
    }

    fn pipeline_desc() -> Arc<GraphicsPipelineDesc> {
        Arc::new(GraphicsPipelineDesc {
            label: "test".to_string(),
            vertex_source: String::new(),
            fragment_source: String::new(),
            uniform_block_size: 0,
            sampler_count: 0,
            color_format: BackendFormat::mock(ColorType::Rgba8888),
            sample_count: 1,
        })
    }

    #[test]
    fn test_budgeted_texture_is_reused() {
        let device = device();
        let cache = GlobalResourceCache::new(1 << 20);

        let first = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "a").unwrap();
        let first_id = first.texture().unique_id();
        drop(first);
        assert_eq!(cache.idle_count(), 1);

        let second = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "b").unwrap();
        assert_eq!(second.texture().unique_id(), first_id);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(device.images_created(), 1);
    }

    #[test]
    fn test_non_budgeted_texture_is_destroyed() {
        let device = device();
        let cache = GlobalResourceCache::new(1 << 20);

        let texture = cache.find_or_create_texture(&device, &desc(16), Budgeted::No, "rt").unwrap();
        assert_eq!(cache.budgeted_bytes(), 0);
        drop(texture);
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(cache.resource_count(), 0);
    }

    #[test]
    fn test_lru_eviction_over_budget() {
        let device = device();
        // Room for two 16x16 RGBA textures
        let cache = GlobalResourceCache::new(2 * 16 * 16 * 4);

        let a = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "a").unwrap();
        let b = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "b").unwrap();
        let c = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "c").unwrap();
        let b_id = b.texture().unique_id();
        drop(a);
        drop(b);
        drop(c);

        // `a` went idle first and was evicted once it was over budget
        assert_eq!(cache.idle_count(), 2);
        assert_eq!(cache.budgeted_bytes(), 2 * 16 * 16 * 4);

        let reused = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "d").unwrap();
        let reused_2 = cache.find_or_create_texture(&device, &desc(16), Budgeted::Yes, "e").unwrap();
        let ids = [reused.texture().unique_id(), reused_2.texture().unique_id()];
        assert!(ids.contains(&b_id));
    }

    #[test]
    fn test_purge_scratch() {
        let device = device();
        let cache = GlobalResourceCache::new(1 << 20);
        drop(cache.find_or_create_texture(&device, &desc(8), Budgeted::Yes, "a").unwrap());
        drop(cache.find_or_create_texture(&device, &desc(4), Budgeted::Yes, "b").unwrap());
        assert_eq!(cache.idle_count(), 2);

        cache.purge_scratch();
        assert_eq!(cache.idle_count(), 0);
        assert_eq!(cache.budgeted_bytes(), 0);
    }

    #[test]
    fn test_pipeline_compiled_once() {
        let device = device();
        let cache = GlobalResourceCache::new(0);
        let key = PipelineKey::new(vec![2, 29], BackendFormat::mock(ColorType::Rgba8888), 1);
        let compile = || {
            let desc = pipeline_desc();
            let backend = device.create_graphics_pipeline(&desc)?;
            Ok(GraphicsPipeline::new(key.clone(), desc, backend))
        };

        let a = cache.find_or_create_pipeline(&key, compile).unwrap();
        let b = cache.find_or_create_pipeline(&key, compile).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.pipeline_count(), 1);
        assert_eq!(device.pipelines_compiled(), 1);
        assert!(cache.find_pipeline(&key).is_some());
    }

    #[test]
    fn test_failed_compile_can_retry() {
        let cache = GlobalResourceCache::new(0);
        let key = PipelineKey::new(vec![1], BackendFormat::mock(ColorType::Rgba8888), 1);

        let failed = cache.find_or_create_pipeline(&key, || {
            Err(crate::engine::EngineError::PipelineCompilation("bad shader".to_string()))
        });
        assert!(failed.is_err());
        assert!(cache.find_pipeline(&key).is_none());
        assert_eq!(cache.pipeline_count(), 0);

        let device = device();
        let ok = cache.find_or_create_pipeline(&key, || {
            let desc = pipeline_desc();
            let backend = device.create_graphics_pipeline(&desc)?;
            Ok(GraphicsPipeline::new(key.clone(), desc, backend))
        });
        assert!(ok.is_ok());
        assert_eq!(cache.pipeline_count(), 1);
    }
}
