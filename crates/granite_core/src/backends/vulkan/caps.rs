//! Vulkan capability table
//!
//! Built once from physical device queries. Per-format facts live in a table
//! indexed by the dense format index, so every lookup is an array access.

use std::ffi::CStr;

use ash::vk;

use super::util::{self, FORMAT_COUNT, SUPPORTED_FORMATS};
use crate::engine::caps::{max_sample_count, Caps};
use crate::engine::format::BackendFormat;
use crate::engine::types::{ColorType, CompressionType};

const SAMPLE_COUNTS: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];

/// Native formats that can back a color type, in preference order
fn color_type_candidates(color_type: ColorType) -> &'static [vk::Format] {
    match color_type {
        ColorType::Alpha8 | ColorType::Gray8 | ColorType::R8 => &[vk::Format::R8_UNORM],
        ColorType::Bgr565 => &[vk::Format::R5G6B5_UNORM_PACK16],
        ColorType::Abgr4444 => &[vk::Format::R4G4B4A4_UNORM_PACK16, vk::Format::B4G4R4A4_UNORM_PACK16],
        ColorType::Rgba8888 | ColorType::Rgb888x => &[vk::Format::R8G8B8A8_UNORM],
        ColorType::Rgba8888Srgb => &[vk::Format::R8G8B8A8_SRGB],
        ColorType::Rg88 => &[vk::Format::R8G8_UNORM],
        ColorType::Bgra8888 => &[vk::Format::B8G8R8A8_UNORM],
        ColorType::Rgba1010102 => &[vk::Format::A2B10G10R10_UNORM_PACK32],
        ColorType::Bgra1010102 => &[vk::Format::A2R10G10B10_UNORM_PACK32],
        ColorType::AlphaF16 => &[vk::Format::R16_SFLOAT],
        ColorType::RgbaF16 | ColorType::RgbaF16Clamped => &[vk::Format::R16G16B16A16_SFLOAT],
        ColorType::RgbaF32 => &[vk::Format::R32G32B32A32_SFLOAT],
        ColorType::Alpha16 => &[vk::Format::R16_UNORM],
        ColorType::Rg1616 => &[vk::Format::R16G16_UNORM],
        ColorType::RgF16 => &[vk::Format::R16G16_SFLOAT],
        ColorType::Rgba16161616 => &[vk::Format::R16G16B16A16_UNORM],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FormatInfo {
    optimal_features: vk::FormatFeatureFlags,
    max_samples: u32,
}

impl FormatInfo {
    fn is_texturable(&self) -> bool {
        self.optimal_features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE)
    }

    fn is_renderable(&self) -> bool {
        self.optimal_features.contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT)
    }
}

/// Capability table of one physical device
#[derive(Debug, Clone)]
pub struct VulkanCaps {
    /// Indexed by `format_to_index`; slot 0 is the unsupported format
    formats: [FormatInfo; FORMAT_COUNT + 1],
    max_texture_size: u32,
    vendor_id: u32,
    device_type: vk::PhysicalDeviceType,
    device_name: String,
}

impl VulkanCaps {
    /// Query format support and limits from a physical device
    pub fn new(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let format_properties: Vec<(vk::Format, vk::FormatFeatureFlags)> = SUPPORTED_FORMATS
            .iter()
            .map(|&format| {
                let props = unsafe { instance.get_physical_device_format_properties(physical_device, format) };
                (format, props.optimal_tiling_features)
            })
            .collect();

        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let mut caps = Self::from_properties(
            &format_properties,
            properties.limits.framebuffer_color_sample_counts,
            properties.limits.max_image_dimension2_d,
        );
        caps.vendor_id = properties.vendor_id;
        caps.device_type = properties.device_type;
        caps.device_name = device_name;

        log::info!(
            "[VULKAN_CAPS] {} ({}, {}), max texture size {}",
            caps.device_name,
            util::vendor_id_to_name(caps.vendor_id),
            util::device_type_to_name(caps.device_type),
            caps.max_texture_size
        );
        caps
    }

    /// Build from already-queried properties
    ///
    /// Formats outside the dense table are ignored.
    pub fn from_properties(
        format_features: &[(vk::Format, vk::FormatFeatureFlags)],
        color_sample_counts: vk::SampleCountFlags,
        max_texture_size: u32,
    ) -> Self {
        let max_color_samples = max_sample_count(
            SAMPLE_COUNTS
                .into_iter()
                .filter(|&count| color_sample_counts.contains(util::to_vk_sample_count(count))),
        );

        let mut formats = [FormatInfo::default(); FORMAT_COUNT + 1];
        for &(format, features) in format_features {
            let index = util::format_to_index(format);
            if index == 0 {
                continue;
            }
            let info = &mut formats[index];
            info.optimal_features = features;
            if info.is_renderable() {
                info.max_samples = max_color_samples.max(1);
            }
        }

        Self {
            formats,
            max_texture_size,
            vendor_id: 0,
            device_type: vk::PhysicalDeviceType::OTHER,
            device_name: String::new(),
        }
    }

    fn info(&self, format: vk::Format) -> &FormatInfo {
        // index 0 holds the empty entry
        &self.formats[util::format_to_index(format)]
    }

    /// PCI vendor ID of the device
    pub fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    /// Physical device type
    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.device_type
    }

    /// Driver-reported device name
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Caps for VulkanCaps {
    fn default_backend_format(&self, color_type: ColorType, renderable: bool) -> Option<BackendFormat> {
        color_type_candidates(color_type)
            .iter()
            .copied()
            .find(|&format| {
                let info = self.info(format);
                info.is_texturable() && (!renderable || info.is_renderable())
            })
            .map(BackendFormat::vulkan)
    }

    fn compressed_backend_format(&self, compression: CompressionType) -> Option<BackendFormat> {
        let format = util::compression_type_to_format(compression)?;
        self.info(format).is_texturable().then_some(BackendFormat::vulkan(format))
    }

    fn is_format_renderable(&self, color_type: ColorType, format: &BackendFormat, sample_count: u32) -> bool {
        let Some(vk_format) = format.vk_format() else {
            return false;
        };
        if format.is_external() || !color_type_candidates(color_type).contains(&vk_format) {
            return false;
        }
        let info = self.info(vk_format);
        info.is_renderable() && sample_count.is_power_of_two() && sample_count <= info.max_samples
    }

    fn is_format_texturable(&self, format: &BackendFormat) -> bool {
        match format.vk_format() {
            // External formats are sampled through a conversion the device already vetted
            Some(_) if format.is_external() => true,
            Some(vk_format) => self.info(vk_format).is_texturable(),
            None => false,
        }
    }

    fn max_render_target_sample_count(&self, format: &BackendFormat) -> u32 {
        match format.vk_format() {
            Some(vk_format) if !format.is_external() => self.info(vk_format).max_samples,
            _ => 0,
        }
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERABLE: vk::FormatFeatureFlags = vk::FormatFeatureFlags::from_raw(
        vk::FormatFeatureFlags::SAMPLED_IMAGE.as_raw() | vk::FormatFeatureFlags::COLOR_ATTACHMENT.as_raw(),
    );

    fn caps() -> VulkanCaps {
        VulkanCaps::from_properties(
            &[
                (vk::Format::R8G8B8A8_UNORM, RENDERABLE),
                (vk::Format::R8_UNORM, vk::FormatFeatureFlags::SAMPLED_IMAGE),
                (vk::Format::B4G4R4A4_UNORM_PACK16, RENDERABLE),
                (vk::Format::BC1_RGBA_UNORM_BLOCK, vk::FormatFeatureFlags::SAMPLED_IMAGE),
                (vk::Format::D24_UNORM_S8_UINT, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
            ],
            vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4,
            16384,
        )
    }

    #[test]
    fn test_default_format_for_renderable_color_type() {
        let caps = caps();
        let format = caps.default_backend_format(ColorType::Rgba8888, true).unwrap();
        assert_eq!(format.vk_format(), Some(vk::Format::R8G8B8A8_UNORM));
        assert!(caps.is_format_renderable(ColorType::Rgba8888, &format, 1));
        assert_eq!(caps.max_render_target_sample_count(&format), 4);
    }

    #[test]
    fn test_texturable_only_format() {
        let caps = caps();
        assert!(caps.default_backend_format(ColorType::Alpha8, false).is_some());
        assert!(caps.default_backend_format(ColorType::Alpha8, true).is_none());
        let format = BackendFormat::vulkan(vk::Format::R8_UNORM);
        assert_eq!(caps.max_render_target_sample_count(&format), 0);
    }

    #[test]
    fn test_falls_back_to_second_candidate() {
        let format = caps().default_backend_format(ColorType::Abgr4444, true).unwrap();
        assert_eq!(format.vk_format(), Some(vk::Format::B4G4R4A4_UNORM_PACK16));
    }

    #[test]
    fn test_compressed_lookup() {
        let caps = caps();
        let format = caps.compressed_backend_format(CompressionType::Bc1Rgba8Unorm).unwrap();
        assert!(caps.is_format_texturable(&format));
        assert!(caps.compressed_backend_format(CompressionType::Etc2Rgb8Unorm).is_none());
        assert!(caps.compressed_backend_format(CompressionType::None).is_none());
    }

    #[test]
    fn test_renderability_is_per_color_type() {
        let caps = caps();
        let format = BackendFormat::vulkan(vk::Format::R8G8B8A8_UNORM);
        assert!(!caps.is_format_renderable(ColorType::Bgra8888, &format, 1));
        assert!(!caps.is_format_renderable(ColorType::Rgba8888, &format, 8));
        assert!(!caps.is_format_renderable(ColorType::Rgba8888, &BackendFormat::mock(ColorType::Rgba8888), 1));
    }
}
