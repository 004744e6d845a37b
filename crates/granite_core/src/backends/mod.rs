//! Backend implementations of the device seam

pub mod mock;
pub mod vulkan;

pub use mock::{MockCaps, MockDevice};
pub use vulkan::{VulkanCaps, VulkanDevice};
