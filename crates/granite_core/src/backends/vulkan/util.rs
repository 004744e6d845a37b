//! Vulkan translation tables
//!
//! Pure lookups over native enumerants: dense format indices, per-format
//! channel/compression/size facts, vendor and device-type names, and result
//! code messages. Nothing here holds state, so every function is safe to call
//! from any thread.
//!
//! The two `vk_check*` helpers are the boundary with the native API. A failed
//! check is a contract violation, not a runtime condition, and panics.

use std::borrow::Cow;

use ash::vk;

use crate::engine::types::{ChannelFlags, CompressionType, LoadOp};

/// Number of formats with a nonzero dense index
pub const FORMAT_COUNT: usize = 24;

/// Dense index of the last color format; depth/stencil formats follow it
pub const LAST_COLOR_FORMAT_INDEX: usize = 21;

/// Every supported format, ordered by dense index (`SUPPORTED_FORMATS[i]` has index `i + 1`)
pub const SUPPORTED_FORMATS: [vk::Format; FORMAT_COUNT] = [
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::R8_UNORM,
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::R5G6B5_UNORM_PACK16,
    vk::Format::R16G16B16A16_SFLOAT,
    vk::Format::R16_SFLOAT,
    vk::Format::R8G8B8_UNORM,
    vk::Format::R8G8_UNORM,
    vk::Format::A2B10G10R10_UNORM_PACK32,
    vk::Format::A2R10G10B10_UNORM_PACK32,
    vk::Format::B4G4R4A4_UNORM_PACK16,
    vk::Format::R4G4B4A4_UNORM_PACK16,
    vk::Format::R32G32B32A32_SFLOAT,
    vk::Format::R8G8B8A8_SRGB,
    vk::Format::ETC2_R8G8B8_UNORM_BLOCK,
    vk::Format::BC1_RGB_UNORM_BLOCK,
    vk::Format::BC1_RGBA_UNORM_BLOCK,
    vk::Format::R16_UNORM,
    vk::Format::R16G16_UNORM,
    vk::Format::R16G16B16A16_UNORM,
    vk::Format::R16G16_SFLOAT,
    vk::Format::S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT_S8_UINT,
];

/// Known PCI vendor IDs
pub mod vendor {
    /// AMD
    pub const AMD: u32 = 0x1002;
    /// Imagination Technologies
    pub const IMG_TEC: u32 = 0x1010;
    /// Apple
    pub const APPLE: u32 = 0x106B;
    /// NVIDIA
    pub const NVIDIA: u32 = 0x10DE;
    /// ARM
    pub const ARM: u32 = 0x13B5;
    /// Broadcom
    pub const BROADCOM: u32 = 0x14E4;
    /// Google
    pub const GOOGLE: u32 = 0x1AE0;
    /// Moore Threads
    pub const MOORE_THREADS: u32 = 0x1ED5;
    /// Qualcomm
    pub const QUALCOMM: u32 = 0x5143;
    /// Intel
    pub const INTEL: u32 = 0x8086;
}

/// Dense table index of a format, 0 when unsupported
///
/// Must agree with [`format_is_supported`].
pub fn format_to_index(format: vk::Format) -> usize {
    match format {
        vk::Format::R8G8B8A8_UNORM => 1,
        vk::Format::R8_UNORM => 2,
        vk::Format::B8G8R8A8_UNORM => 3,
        vk::Format::R5G6B5_UNORM_PACK16 => 4,
        vk::Format::R16G16B16A16_SFLOAT => 5,
        vk::Format::R16_SFLOAT => 6,
        vk::Format::R8G8B8_UNORM => 7,
        vk::Format::R8G8_UNORM => 8,
        vk::Format::A2B10G10R10_UNORM_PACK32 => 9,
        vk::Format::A2R10G10B10_UNORM_PACK32 => 10,
        vk::Format::B4G4R4A4_UNORM_PACK16 => 11,
        vk::Format::R4G4B4A4_UNORM_PACK16 => 12,
        vk::Format::R32G32B32A32_SFLOAT => 13,
        vk::Format::R8G8B8A8_SRGB => 14,
        vk::Format::ETC2_R8G8B8_UNORM_BLOCK => 15,
        vk::Format::BC1_RGB_UNORM_BLOCK => 16,
        vk::Format::BC1_RGBA_UNORM_BLOCK => 17,
        vk::Format::R16_UNORM => 18,
        vk::Format::R16G16_UNORM => 19,
        vk::Format::R16G16B16A16_UNORM => 20,
        vk::Format::R16G16_SFLOAT => 21,
        vk::Format::S8_UINT => 22,
        vk::Format::D24_UNORM_S8_UINT => 23,
        vk::Format::D32_SFLOAT_S8_UINT => 24,
        _ => 0,
    }
}

/// Whether the engine has table entries for a format
///
/// Consistent with [`format_to_index`].
pub fn format_is_supported(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8_UNORM
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::R5G6B5_UNORM_PACK16
            | vk::Format::R16G16B16A16_SFLOAT
            | vk::Format::R16_SFLOAT
            | vk::Format::R8G8B8_UNORM
            | vk::Format::R8G8_UNORM
            | vk::Format::A2B10G10R10_UNORM_PACK32
            | vk::Format::A2R10G10B10_UNORM_PACK32
            | vk::Format::B4G4R4A4_UNORM_PACK16
            | vk::Format::R4G4B4A4_UNORM_PACK16
            | vk::Format::R32G32B32A32_SFLOAT
            | vk::Format::R8G8B8A8_SRGB
            | vk::Format::ETC2_R8G8B8_UNORM_BLOCK
            | vk::Format::BC1_RGB_UNORM_BLOCK
            | vk::Format::BC1_RGBA_UNORM_BLOCK
            | vk::Format::R16_UNORM
            | vk::Format::R16G16_UNORM
            | vk::Format::R16G16B16A16_UNORM
            | vk::Format::R16G16_SFLOAT
            | vk::Format::S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT
    )
}

/// Color channels of a format, empty for depth/stencil or unknown formats
pub fn format_channel_flags(format: vk::Format) -> ChannelFlags {
    match format {
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R16G16B16A16_UNORM
        | vk::Format::BC1_RGBA_UNORM_BLOCK
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::R4G4B4A4_UNORM_PACK16
        | vk::Format::B4G4R4A4_UNORM_PACK16
        | vk::Format::A2R10G10B10_UNORM_PACK32
        | vk::Format::A2B10G10R10_UNORM_PACK32
        | vk::Format::R16G16B16A16_SFLOAT
        | vk::Format::R32G32B32A32_SFLOAT
        | vk::Format::B8G8R8A8_UNORM => ChannelFlags::RGBA,
        vk::Format::R8_UNORM
        | vk::Format::R16_UNORM
        | vk::Format::R16_SFLOAT => ChannelFlags::RED,
        vk::Format::R5G6B5_UNORM_PACK16
        | vk::Format::BC1_RGB_UNORM_BLOCK
        | vk::Format::ETC2_R8G8B8_UNORM_BLOCK
        | vk::Format::R8G8B8_UNORM => ChannelFlags::RGB,
        vk::Format::R8G8_UNORM
        | vk::Format::R16G16_SFLOAT
        | vk::Format::R16G16_UNORM => ChannelFlags::RG,
        // either depth/stencil format or not in the table yet
        _ => ChannelFlags::empty(),
    }
}

/// Compression scheme of a format
pub fn format_compression_type(format: vk::Format) -> CompressionType {
    match format {
        vk::Format::ETC2_R8G8B8_UNORM_BLOCK => CompressionType::Etc2Rgb8Unorm,
        vk::Format::BC1_RGB_UNORM_BLOCK => CompressionType::Bc1Rgb8Unorm,
        vk::Format::BC1_RGBA_UNORM_BLOCK => CompressionType::Bc1Rgba8Unorm,
        _ => CompressionType::None,
    }
}

/// Native format for a compression scheme
pub fn compression_type_to_format(compression: CompressionType) -> Option<vk::Format> {
    match compression {
        CompressionType::None => None,
        CompressionType::Etc2Rgb8Unorm => Some(vk::Format::ETC2_R8G8B8_UNORM_BLOCK),
        CompressionType::Bc1Rgb8Unorm => Some(vk::Format::BC1_RGB_UNORM_BLOCK),
        CompressionType::Bc1Rgba8Unorm => Some(vk::Format::BC1_RGBA_UNORM_BLOCK),
    }
}

/// Bytes per texel, or per block for compressed formats
///
/// Planar formats are over-estimated on purpose: the value feeds GPU memory
/// budgeting, and exact accounting would need a per-plane query.
pub fn format_bytes_per_block(format: vk::Format) -> u32 {
    match format {
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::R16G16_SFLOAT
        | vk::Format::R16G16_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::A2R10G10B10_UNORM_PACK32
        | vk::Format::A2B10G10R10_UNORM_PACK32
        | vk::Format::B8G8R8A8_UNORM => 4,
        vk::Format::R8_UNORM
        | vk::Format::S8_UINT => 1,
        vk::Format::R5G6B5_UNORM_PACK16
        | vk::Format::R16_UNORM
        | vk::Format::R4G4B4A4_UNORM_PACK16
        | vk::Format::B4G4R4A4_UNORM_PACK16
        | vk::Format::R8G8_UNORM
        | vk::Format::R16_SFLOAT => 2,
        vk::Format::R16G16B16A16_SFLOAT
        | vk::Format::D32_SFLOAT_S8_UINT
        | vk::Format::R16G16B16A16_UNORM
        | vk::Format::BC1_RGBA_UNORM_BLOCK
        | vk::Format::BC1_RGB_UNORM_BLOCK
        | vk::Format::ETC2_R8G8B8_UNORM_BLOCK => 8,
        vk::Format::R32G32B32A32_SFLOAT => 16,
        vk::Format::R8G8B8_UNORM
        | vk::Format::G8_B8R8_2PLANE_420_UNORM
        | vk::Format::G8_B8_R8_3PLANE_420_UNORM => 3,
        _ => 0,
    }
}

/// Depth bits of a format, 0 without a depth aspect
pub fn format_depth_bits(format: vk::Format) -> u32 {
    match format {
        vk::Format::D16_UNORM
        | vk::Format::D16_UNORM_S8_UINT => 16,
        vk::Format::D24_UNORM_S8_UINT
        | vk::Format::X8_D24_UNORM_PACK32 => 24,
        vk::Format::D32_SFLOAT
        | vk::Format::D32_SFLOAT_S8_UINT => 32,
        _ => 0,
    }
}

/// Stencil bits of a format, 0 without a stencil aspect
pub fn format_stencil_bits(format: vk::Format) -> u32 {
    match format {
        vk::Format::S8_UINT
        | vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => 8,
        _ => 0,
    }
}

/// Display name of a format, `"Unknown"` outside the table
pub fn format_name(format: vk::Format) -> &'static str {
    match format {
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::R8_UNORM => "R8_UNORM",
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::R5G6B5_UNORM_PACK16 => "R5G6B5_UNORM_PACK16",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        vk::Format::R16_SFLOAT => "R16_SFLOAT",
        vk::Format::R8G8B8_UNORM => "R8G8B8_UNORM",
        vk::Format::R8G8_UNORM => "R8G8_UNORM",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM_PACK32",
        vk::Format::A2R10G10B10_UNORM_PACK32 => "A2R10G10B10_UNORM_PACK32",
        vk::Format::B4G4R4A4_UNORM_PACK16 => "B4G4R4A4_UNORM_PACK16",
        vk::Format::R4G4B4A4_UNORM_PACK16 => "R4G4B4A4_UNORM_PACK16",
        vk::Format::R32G32B32A32_SFLOAT => "R32G32B32A32_SFLOAT",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::ETC2_R8G8B8_UNORM_BLOCK => "ETC2_R8G8B8_UNORM_BLOCK",
        vk::Format::BC1_RGB_UNORM_BLOCK => "BC1_RGB_UNORM_BLOCK",
        vk::Format::BC1_RGBA_UNORM_BLOCK => "BC1_RGBA_UNORM_BLOCK",
        vk::Format::R16_UNORM => "R16_UNORM",
        vk::Format::R16G16_UNORM => "R16G16_UNORM",
        vk::Format::R16G16B16A16_UNORM => "R16G16B16A16_UNORM",
        vk::Format::R16G16_SFLOAT => "R16G16_SFLOAT",
        vk::Format::S8_UINT => "S8_UINT",
        vk::Format::D24_UNORM_S8_UINT => "D24_UNORM_S8_UINT",
        vk::Format::D32_SFLOAT_S8_UINT => "D32_SFLOAT_S8_UINT",
        _ => "Unknown",
    }
}

/// Vendor name for a `VkPhysicalDeviceProperties::vendorID`
pub fn vendor_id_to_name(vendor_id: u32) -> Cow<'static, str> {
    let name = match vendor_id {
        vendor::AMD => "AMD",
        vendor::IMG_TEC => "ImgTec",
        vendor::APPLE => "Apple",
        vendor::NVIDIA => "NVIDIA",
        vendor::ARM => "ARM",
        vendor::BROADCOM => "Broadcom",
        vendor::GOOGLE => "Google",
        vendor::MOORE_THREADS => "Moore Threads",
        vendor::QUALCOMM => "Qualcomm",
        vendor::INTEL => "Intel",
        id if id == vk::VendorId::MESA.as_raw() as u32 => "Mesa",
        unknown => return Cow::Owned(format!("Unknown [0x{unknown:X}]")),
    };
    Cow::Borrowed(name)
}

/// Display name of a physical device type
pub fn device_type_to_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

/// Human readable description of a `VkResult`
///
/// The only sanctioned way to render a result code for logs.
pub fn result_code_to_message(result: vk::Result) -> Cow<'static, str> {
    let message = match result {
        // Success codes
        vk::Result::SUCCESS => "Command successfully completed.",
        vk::Result::NOT_READY => "A fence or query has not yet completed.",
        vk::Result::TIMEOUT => "A wait operation has not completed in the specified time.",
        vk::Result::EVENT_SET => "An event is signaled.",
        vk::Result::EVENT_RESET => "An event is unsignaled.",
        vk::Result::INCOMPLETE => "A return array was too small for the result.",
        vk::Result::SUBOPTIMAL_KHR => {
            "A swap-chain no longer matches the surface properties exactly, but can still \
             be used to present to the surface successfully."
        }

        // Error codes
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => "A host memory allocation has failed.",
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => "A device memory allocation has failed.",
        vk::Result::ERROR_INITIALIZATION_FAILED => {
            "Initialization of an object could not be completed for implementation-specific reasons."
        }
        vk::Result::ERROR_DEVICE_LOST => "The logical or physical device has been lost.",
        vk::Result::ERROR_MEMORY_MAP_FAILED => "Mapping of a memory object has failed.",
        vk::Result::ERROR_LAYER_NOT_PRESENT => "A requested layer is not present or could not be loaded.",
        vk::Result::ERROR_EXTENSION_NOT_PRESENT => "A requested extension is not supported.",
        vk::Result::ERROR_FEATURE_NOT_PRESENT => "A requested feature is not supported.",
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => {
            "The requested version of Vulkan is not supported by the driver or is otherwise \
             incompatible for implementation-specific reasons."
        }
        vk::Result::ERROR_TOO_MANY_OBJECTS => "Too many objects of the type have already been created.",
        vk::Result::ERROR_FORMAT_NOT_SUPPORTED => "A requested format is not supported on this device.",
        vk::Result::ERROR_FRAGMENTED_POOL => "A pool allocation has failed due to fragmentation of the pool's memory.",
        vk::Result::ERROR_OUT_OF_POOL_MEMORY => "A pool memory allocation has failed.",
        vk::Result::ERROR_UNKNOWN => "An unknown error has occurred.",
        vk::Result::ERROR_SURFACE_LOST_KHR => "A surface is no longer available.",
        vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR => {
            "The requested window is already connected to a VkSurfaceKHR, or to some other non-Vulkan API."
        }
        vk::Result::ERROR_OUT_OF_DATE_KHR => {
            "A surface has changed in such a way that it is no longer compatible with the swap-chain, \
             and further presentation requests using the swap-chain will fail. Applications must query \
             the new surface properties and recreate their swap-chain if they wish to continue \
             presenting to the surface."
        }
        vk::Result::ERROR_INCOMPATIBLE_DISPLAY_KHR => {
            "The display used by a swap-chain does not use the same presentable image layout, or is \
             incompatible in a way that prevents sharing an image."
        }
        vk::Result::ERROR_VALIDATION_FAILED_EXT => "A validation layer found an error.",
        unknown => return Cow::Owned(format!("Unknown [{}]", unknown.as_raw())),
    };
    Cow::Borrowed(message)
}

/// Abort unless `result` is `VK_SUCCESS`
#[track_caller]
pub fn vk_check(result: vk::Result) {
    if result != vk::Result::SUCCESS {
        let message = result_code_to_message(result);
        log::error!("[VULKAN] Native call returned {:?}: {}", result, message);
        panic!("Vulkan contract violation ({result:?}): {message}");
    }
}

/// Abort if `result` is an error code; informational codes such as
/// `NOT_READY`, `TIMEOUT` or `SUBOPTIMAL_KHR` pass
#[track_caller]
pub fn vk_check_error(result: vk::Result) {
    if result.as_raw() < vk::Result::SUCCESS.as_raw() {
        let message = result_code_to_message(result);
        log::error!("[VULKAN] Native call failed with {:?}: {}", result, message);
        panic!("Vulkan contract violation ({result:?}): {message}");
    }
}

/// Native sample count flag, empty for counts Vulkan cannot express
pub fn to_vk_sample_count(sample_count: u32) -> vk::SampleCountFlags {
    match sample_count {
        1 => vk::SampleCountFlags::TYPE_1,
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        32 => vk::SampleCountFlags::TYPE_32,
        64 => vk::SampleCountFlags::TYPE_64,
        _ => vk::SampleCountFlags::empty(),
    }
}

/// Native attachment load op and the layout the attachment must start in
pub fn to_vk_load_op(load_op: LoadOp) -> (vk::AttachmentLoadOp, vk::ImageLayout) {
    match load_op {
        LoadOp::Load => (vk::AttachmentLoadOp::LOAD, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        LoadOp::Clear => (vk::AttachmentLoadOp::CLEAR, vk::ImageLayout::UNDEFINED),
        LoadOp::DontCare => (vk::AttachmentLoadOp::DONT_CARE, vk::ImageLayout::UNDEFINED),
    }
}

/// View aspect for an image of `format`
pub fn image_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    let mut aspect = vk::ImageAspectFlags::empty();
    if format_depth_bits(format) > 0 {
        aspect |= vk::ImageAspectFlags::DEPTH;
    }
    if format_stencil_bits(format) > 0 {
        aspect |= vk::ImageAspectFlags::STENCIL;
    }
    if aspect.is_empty() {
        vk::ImageAspectFlags::COLOR
    } else {
        aspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Core format range plus the extension blocks that define formats
    fn all_format_candidates() -> impl Iterator<Item = vk::Format> {
        let core = 0..=300;
        let extensions = [
            1_000_054_000..=1_000_054_010, // PVRTC
            1_000_066_000..=1_000_066_015, // ASTC HDR
            1_000_156_000..=1_000_156_040, // YCbCr
            1_000_330_000..=1_000_330_005,
            1_000_340_000..=1_000_340_003,
        ];
        core.chain(extensions.into_iter().flatten()).map(vk::Format::from_raw)
    }

    #[test]
    fn test_index_and_support_agree() {
        for format in all_format_candidates() {
            assert_eq!(
                format_is_supported(format),
                format_to_index(format) != 0,
                "tables disagree on {:?}",
                format
            );
        }
    }

    #[test]
    fn test_indices_are_dense() {
        let indices: BTreeSet<usize> = all_format_candidates()
            .filter(|f| format_is_supported(*f))
            .map(format_to_index)
            .collect();
        let expected: BTreeSet<usize> = (1..=FORMAT_COUNT).collect();
        assert_eq!(indices, expected);

        let supported = all_format_candidates().filter(|f| format_is_supported(*f)).count();
        assert_eq!(supported, FORMAT_COUNT);
    }

    #[test]
    fn test_supported_formats_ordered_by_index() {
        for (i, format) in SUPPORTED_FORMATS.iter().enumerate() {
            assert_eq!(format_to_index(*format), i + 1);
        }
        for format in &SUPPORTED_FORMATS[LAST_COLOR_FORMAT_INDEX..] {
            assert!(format_channel_flags(*format).is_empty());
        }
        for format in &SUPPORTED_FORMATS[..LAST_COLOR_FORMAT_INDEX] {
            assert!(!format_channel_flags(*format).is_empty());
            assert_ne!(format_name(*format), "Unknown");
        }
    }

    #[test]
    fn test_planar_formats_are_over_estimated() {
        assert_eq!(format_bytes_per_block(vk::Format::G8_B8R8_2PLANE_420_UNORM), 3);
        assert_eq!(format_bytes_per_block(vk::Format::G8_B8_R8_3PLANE_420_UNORM), 3);
        assert!(!format_is_supported(vk::Format::G8_B8R8_2PLANE_420_UNORM));
    }

    #[test]
    fn test_compression_round_trip_through_table() {
        for compression in [
            CompressionType::Etc2Rgb8Unorm,
            CompressionType::Bc1Rgb8Unorm,
            CompressionType::Bc1Rgba8Unorm,
        ] {
            let format = compression_type_to_format(compression).unwrap();
            assert_eq!(format_compression_type(format), compression);
        }
        assert_eq!(format_compression_type(vk::Format::R8_UNORM), CompressionType::None);
    }

    #[test]
    fn test_depth_and_stencil_bits() {
        assert_eq!(format_depth_bits(vk::Format::D32_SFLOAT_S8_UINT), 32);
        assert_eq!(format_stencil_bits(vk::Format::S8_UINT), 8);
        assert_eq!(format_depth_bits(vk::Format::S8_UINT), 0);
        assert_eq!(format_stencil_bits(vk::Format::R8G8B8A8_UNORM), 0);
    }

    #[test]
    fn test_vendor_names_with_fallback() {
        assert_eq!(vendor_id_to_name(vendor::NVIDIA), "NVIDIA");
        assert_eq!(vendor_id_to_name(0x1_0005), "Mesa");
        assert_eq!(vendor_id_to_name(0xBEEF), "Unknown [0xBEEF]");
    }

    #[test]
    fn test_device_type_names() {
        assert_eq!(device_type_to_name(vk::PhysicalDeviceType::DISCRETE_GPU), "Discrete GPU");
        assert_eq!(device_type_to_name(vk::PhysicalDeviceType::OTHER), "Other");
        assert_eq!(device_type_to_name(vk::PhysicalDeviceType::from_raw(77)), "Other");
    }

    #[test]
    fn test_result_messages_with_fallback() {
        assert_eq!(result_code_to_message(vk::Result::SUCCESS), "Command successfully completed.");
        assert_eq!(
            result_code_to_message(vk::Result::ERROR_DEVICE_LOST),
            "The logical or physical device has been lost."
        );
        assert_eq!(result_code_to_message(vk::Result::from_raw(-123_456)), "Unknown [-123456]");
    }

    #[test]
    fn test_check_error_tolerates_informational_codes() {
        vk_check(vk::Result::SUCCESS);
        vk_check_error(vk::Result::SUCCESS);
        vk_check_error(vk::Result::NOT_READY);
        vk_check_error(vk::Result::TIMEOUT);
        vk_check_error(vk::Result::SUBOPTIMAL_KHR);
    }

    #[test]
    #[should_panic(expected = "Vulkan contract violation")]
    fn test_check_rejects_informational_codes() {
        vk_check(vk::Result::NOT_READY);
    }

    #[test]
    #[should_panic(expected = "device has been lost")]
    fn test_check_error_rejects_errors() {
        vk_check_error(vk::Result::ERROR_DEVICE_LOST);
    }

    #[test]
    fn test_sample_count_translation() {
        assert_eq!(to_vk_sample_count(4), vk::SampleCountFlags::TYPE_4);
        assert!(to_vk_sample_count(3).is_empty());
        assert!(to_vk_sample_count(0).is_empty());
    }

    #[test]
    fn test_load_op_translation() {
        assert_eq!(to_vk_load_op(LoadOp::Clear).0, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(
            to_vk_load_op(LoadOp::Load),
            (vk::AttachmentLoadOp::LOAD, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        );
        assert_eq!(to_vk_load_op(LoadOp::DontCare).1, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn test_image_aspect_per_plane() {
        assert_eq!(image_aspect(vk::Format::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
        assert_eq!(image_aspect(vk::Format::S8_UINT), vk::ImageAspectFlags::STENCIL);
        assert_eq!(image_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            image_aspect(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }
}
