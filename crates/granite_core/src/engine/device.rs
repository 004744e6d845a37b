//! Backend device seam
//!
//! A [`Device`] wraps an already-initialized native device and queue. It never
//! owns the native instance or device; the caller destroys those after every
//! object created through it has been released.

use std::sync::Arc;

use super::caps::Caps;
use super::error::EngineResult;
use super::format::BackendFormat;
use super::types::{BackendApi, ImageDesc};

/// Backend image allocation
///
/// Destroyed when dropped.
pub trait BackendImage: Send + Sync + std::fmt::Debug {
    /// Descriptor the image was created from
    fn desc(&self) -> &ImageDesc;

    /// Debug label
    fn label(&self) -> &str;
}

/// Backend pipeline object
///
/// Destroyed when dropped.
pub trait BackendPipeline: Send + Sync + std::fmt::Debug {
    /// Debug label
    fn label(&self) -> &str;
}

/// Everything a backend needs to build one graphics pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineDesc {
    /// Debug label
    pub label: String,
    /// Vertex shader source
    pub vertex_source: String,
    /// Fragment shader source assembled from fragment stages
    pub fragment_source: String,
    /// Size in bytes of the fragment uniform block
    pub uniform_block_size: u32,
    /// Number of sampler bindings
    pub sampler_count: u32,
    /// Color attachment format
    pub color_format: BackendFormat,
    /// Color attachment sample count
    pub sample_count: u32,
}

/// Native device bound to one backend
pub trait Device: Send + Sync + std::fmt::Debug {
    /// Backend this device belongs to
    fn backend(&self) -> BackendApi;

    /// Capability table for this device
    fn caps(&self) -> Arc<dyn Caps>;

    /// Allocate an image
    fn create_image(&self, desc: &ImageDesc, label: &str) -> EngineResult<Box<dyn BackendImage>>;

    /// Compile a graphics pipeline
    ///
    /// May be slow; callers must not hold cache-wide locks across it.
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> EngineResult<Box<dyn BackendPipeline>>;
}
