//! # Granite Core
//!
//! GPU resource ownership, shared context and pipeline assembly for the
//! Granite renderer.
//!
//! ## Features
//!
//! - **Shared Context**: one backend-bound context per logical device, shared by
//!   every recording thread
//! - **Capability Queries**: default, compressed and MSAA format lookups backed
//!   by a per-device capability table
//! - **Pipeline Assembly**: fragment stages keyed by permanent IDs, assembled
//!   into shaders with stage-qualified uniforms
//! - **Resource Caching**: pipelines compiled once per key across threads,
//!   budgeted scratch textures with LRU eviction
//! - **Surfaces**: render targets with copy-on-snapshot images and ordered
//!   teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use granite_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = Arc::new(MockDevice::new(MockCaps::all_supported()));
//!     let shared = SharedContext::make(device, ContextOptions::default())?;
//!     let recorder = RecordingContext::new(shared)?;
//!
//!     let info = ImageInfo::new(256, 256, ColorType::Rgba8888);
//!     let surface = GraniteSurface::make_render_target(&recorder, info, false, SurfaceOrigin::UpperLeft, None)
//!         .ok_or("surface creation failed")?;
//!     surface.canvas().draw_paint(&Paint::new([1.0, 0.0, 0.0, 1.0]))?;
//!     surface.flush()?;
//!
//!     let recording = recorder.snap();
//!     println!("{} tasks recorded", recording.tasks().len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backends;
pub mod config;
pub mod core;
pub mod engine;
pub mod foundation;
pub mod granite;

/// Common imports for users of the core
pub mod prelude {
    pub use crate::{
        backends::{MockCaps, MockDevice},
        config::{Config, ConfigError},
        core::{ContextOptions, GraniteConfig},
        engine::{
            BackendApi, BackendFormat, Budgeted, ColorType, CompressionType, EngineError, EngineResult, IRect,
            ImageInfo, PipelineKey, SharedContext, SurfaceOrigin,
        },
        granite::{
            BlendMode, Canvas, GraniteImage, GraniteSurface, Paint, Recording, RecordingContext, Shader,
            StageRegistry, TileMode,
        },
    };
}
