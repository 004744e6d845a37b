//! Backend-agnostic engine layer
//!
//! Shared context, capability queries, caches and the device seam that the
//! `granite` layer records against.

pub mod caps;
pub mod context_id;
pub mod device;
pub mod error;
pub mod format;
pub mod global_cache;
pub mod resource;
pub mod shared_context;
pub mod thread_safe_cache;
pub mod types;

pub use caps::Caps;
pub use context_id::ContextId;
pub use device::{BackendImage, BackendPipeline, Device, GraphicsPipelineDesc};
pub use error::{EngineError, EngineResult};
pub use format::BackendFormat;
pub use global_cache::GlobalResourceCache;
pub use resource::{Budgeted, GraphicsPipeline, PipelineKey, ScratchKey, Texture, TextureRef};
pub use shared_context::SharedContext;
pub use thread_safe_cache::{PipelineDescCache, ThreadSafeCache};
pub use types::{BackendApi, ChannelFlags, ColorType, CompressionType, IRect, ImageDesc, ImageInfo, LoadOp, SurfaceOrigin};
