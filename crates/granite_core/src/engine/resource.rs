//! Cached GPU objects and the keys they are found by

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use super::device::{BackendImage, BackendPipeline, GraphicsPipelineDesc};
use super::format::BackendFormat;
use super::global_cache::CacheShared;
use super::types::ImageDesc;

static NEXT_RESOURCE_ID: AtomicU32 = AtomicU32::new(1);

fn next_resource_id() -> u32 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Whether a resource counts against the cache budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Budgeted {
    /// Retained for reuse when released, evicted under budget pressure
    Yes,
    /// Destroyed as soon as the last reference drops
    No,
}

/// Canonical identity of an assembled pipeline
///
/// `stage_ids` is the pre-order fragment stage tree. Two recordings that
/// assemble equal keys share one compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    /// Fragment stage IDs in pre-order
    pub stage_ids: Vec<u32>,
    /// Color attachment format
    pub format: BackendFormat,
    /// Color attachment sample count
    pub sample_count: u32,
}

impl PipelineKey {
    /// New key
    pub fn new(stage_ids: Vec<u32>, format: BackendFormat, sample_count: u32) -> Self {
        Self { stage_ids, format, sample_count }
    }
}

impl std::fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, id) in self.stage_ids.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "] {} x{}", self.format, self.sample_count)
    }
}

/// Scratch texture identity: textures with equal descriptors are interchangeable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScratchKey(pub ImageDesc);

/// Compiled pipeline owned by the global resource cache
#[derive(Debug)]
pub struct GraphicsPipeline {
    key: PipelineKey,
    desc: Arc<GraphicsPipelineDesc>,
    backend: Box<dyn BackendPipeline>,
    unique_id: u32,
}

impl GraphicsPipeline {
    pub(crate) fn new(key: PipelineKey, desc: Arc<GraphicsPipelineDesc>, backend: Box<dyn BackendPipeline>) -> Self {
        Self {
            key,
            desc,
            backend,
            unique_id: next_resource_id(),
        }
    }

    /// Key the pipeline was built for
    pub fn key(&self) -> &PipelineKey {
        &self.key
    }

    /// Generated shader description
    pub fn desc(&self) -> &GraphicsPipelineDesc {
        &self.desc
    }

    /// Backend object
    pub fn backend(&self) -> &dyn BackendPipeline {
        self.backend.as_ref()
    }

    /// Process-unique resource ID
    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }
}

/// Texture allocation plus its cache bookkeeping
#[derive(Debug)]
pub struct Texture {
    image: Box<dyn BackendImage>,
    budgeted: Budgeted,
    unique_id: u32,
}

impl Texture {
    pub(crate) fn new(image: Box<dyn BackendImage>, budgeted: Budgeted) -> Self {
        Self {
            image,
            budgeted,
            unique_id: next_resource_id(),
        }
    }

    /// Descriptor of the backing image
    pub fn desc(&self) -> &ImageDesc {
        self.image.desc()
    }

    /// Backend image
    pub fn image(&self) -> &dyn BackendImage {
        self.image.as_ref()
    }

    /// Budget participation
    pub fn budgeted(&self) -> Budgeted {
        self.budgeted
    }

    /// Process-unique resource ID
    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }

    /// Bytes this texture occupies
    pub fn memory_size(&self) -> u64 {
        self.desc().memory_size()
    }
}

/// Owning handle to a texture
///
/// Dropping the handle hands a budgeted texture back to the global resource
/// cache; a non-budgeted one is destroyed on the spot. Wrap in `Arc` when
/// several images alias the same allocation.
#[derive(Debug)]
pub struct TextureRef {
    texture: Option<Texture>,
    cache: Weak<CacheShared>,
}

impl TextureRef {
    pub(crate) fn new(texture: Texture, cache: Weak<CacheShared>) -> Self {
        Self {
            texture: Some(texture),
            cache,
        }
    }

    /// Borrow the texture
    pub fn texture(&self) -> &Texture {
        // Only `Drop` takes the texture out
        self.texture.as_ref().unwrap_or_else(|| unreachable!("texture taken before drop"))
    }

    /// Descriptor of the backing image
    pub fn desc(&self) -> &ImageDesc {
        self.texture().desc()
    }
}

impl Drop for TextureRef {
    fn drop(&mut self) {
        let Some(texture) = self.texture.take() else { return };
        if texture.budgeted == Budgeted::Yes {
            if let Some(cache) = self.cache.upgrade() {
                cache.return_texture(texture);
                return;
            }
        }
        log::debug!(
            "[RESOURCE] Destroying texture #{} ({})",
            texture.unique_id,
            texture.image.label()
        );
    }
}
