//! Opaque native format token
//!
//! A [`BackendFormat`] names a texel format in the vocabulary of one backend.
//! All per-format facts (channels, compression, sizes) route through the
//! backend's own translation tables so no other component hand-rolls them.

use std::borrow::Cow;

use ash::vk;

use super::types::{BackendApi, ChannelFlags, ColorType, CompressionType};
use crate::backends::vulkan::util as vk_util;

/// Native pixel/texel format of some backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFormat {
    /// A `VkFormat`, optionally backed by an external (YCbCr / Android) format
    Vulkan {
        /// Native enumerant
        format: vk::Format,
        /// Externally defined format that can only be sampled
        external: bool,
    },
    /// Headless backend format, described by layout only
    Mock {
        /// Uncompressed layout, `Unknown` for compressed formats
        color_type: ColorType,
        /// Compression scheme, `None` for uncompressed formats
        compression: CompressionType,
    },
}

impl BackendFormat {
    /// Wrap a plain `VkFormat`
    pub const fn vulkan(format: vk::Format) -> Self {
        Self::Vulkan { format, external: false }
    }

    /// Uncompressed mock format
    pub const fn mock(color_type: ColorType) -> Self {
        Self::Mock { color_type, compression: CompressionType::None }
    }

    /// Compressed mock format
    pub const fn mock_compressed(compression: CompressionType) -> Self {
        Self::Mock { color_type: ColorType::Unknown, compression }
    }

    /// Backend this format belongs to
    pub fn backend(&self) -> BackendApi {
        match self {
            Self::Vulkan { .. } => BackendApi::Vulkan,
            Self::Mock { .. } => BackendApi::Mock,
        }
    }

    /// Native `VkFormat`, if this is a Vulkan format
    pub fn vk_format(&self) -> Option<vk::Format> {
        match *self {
            Self::Vulkan { format, .. } => Some(format),
            Self::Mock { .. } => None,
        }
    }

    /// Whether the format is defined outside the native enumeration
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Vulkan { external: true, .. })
    }

    /// Color channels stored by this format, empty for depth/stencil
    pub fn channel_flags(&self) -> ChannelFlags {
        match *self {
            Self::Vulkan { format, .. } => vk_util::format_channel_flags(format),
            Self::Mock { color_type, compression } => match compression {
                CompressionType::None => color_type.channel_flags(),
                CompressionType::Etc2Rgb8Unorm | CompressionType::Bc1Rgb8Unorm => ChannelFlags::RGB,
                CompressionType::Bc1Rgba8Unorm => ChannelFlags::RGBA,
            },
        }
    }

    /// Compression scheme, `None` for uncompressed formats
    pub fn compression_type(&self) -> CompressionType {
        match *self {
            Self::Vulkan { format, .. } => vk_util::format_compression_type(format),
            Self::Mock { compression, .. } => compression,
        }
    }

    /// Bytes per texel, or per 4x4 block for compressed formats
    pub fn bytes_per_block(&self) -> u32 {
        match *self {
            Self::Vulkan { format, .. } => vk_util::format_bytes_per_block(format),
            Self::Mock { color_type, compression } => {
                if compression.is_compressed() {
                    8
                } else {
                    color_type.bytes_per_pixel()
                }
            }
        }
    }

    /// Depth bits, 0 without a depth aspect
    pub fn depth_bits(&self) -> u32 {
        match *self {
            Self::Vulkan { format, .. } => vk_util::format_depth_bits(format),
            Self::Mock { .. } => 0,
        }
    }

    /// Stencil bits, 0 without a stencil aspect
    pub fn stencil_bits(&self) -> u32 {
        match *self {
            Self::Vulkan { format, .. } => vk_util::format_stencil_bits(format),
            Self::Mock { .. } => 0,
        }
    }

    /// Human readable name for diagnostics
    pub fn name(&self) -> Cow<'static, str> {
        match *self {
            Self::Vulkan { format, .. } => Cow::Borrowed(vk_util::format_name(format)),
            Self::Mock { color_type, compression } => {
                if compression.is_compressed() {
                    Cow::Owned(format!("Mock({compression:?})"))
                } else {
                    Cow::Owned(format!("Mock({color_type:?})"))
                }
            }
        }
    }
}

impl std::fmt::Display for BackendFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
