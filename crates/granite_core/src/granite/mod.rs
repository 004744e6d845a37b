//! # Granite
//!
//! Recording layer on top of the engine: fragment stages and their registry,
//! pipeline assembly, paints, recording contexts, devices, images and
//! surfaces.

pub mod blend;
pub mod builtin_stages;
pub mod device;
pub mod fragment_stage;
pub mod image;
pub mod paint;
pub mod pipeline;
pub mod recording;
pub mod shader_var;
pub mod stage_registry;
pub mod surface;
pub mod uniform_handler;

#[cfg(test)]
mod tests;

pub use blend::{BlendMode, BlendModeSet};
pub use builtin_stages::BuiltinStageId;
pub use device::GraniteDevice;
pub use fragment_stage::{FragmentStage, ReqFlags};
pub use image::GraniteImage;
pub use paint::{Paint, Shader, TileMode};
pub use pipeline::generate_pipeline_desc;
pub use recording::{Recording, RecordingContext, Task};
pub use stage_registry::{RegistryError, StageRegistry, StageRegistryBuilder, FIRST_CUSTOM_STAGE_ID, FIRST_FIXED_BLEND_STAGE_ID};
pub use surface::{Canvas, ContentChangeMode, GraniteSurface, Surface, SurfaceDevice};
pub use uniform_handler::{UniformDataGatherer, UniformHandler};
