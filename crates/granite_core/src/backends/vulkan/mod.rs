//! Vulkan backend
//!
//! Consumes an already-initialized instance, device and queue; window system
//! integration and library loading happen elsewhere.

pub mod caps;
pub mod device;
pub mod util;

pub use caps::VulkanCaps;
pub use device::{ShaderCompiler, ShaderStage, VulkanBackendContext, VulkanDevice, VulkanImage, VulkanPipeline};
