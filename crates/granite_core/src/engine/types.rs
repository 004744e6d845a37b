//! Backend-agnostic value types used across the engine
//!
//! Color types, compression types, channel flags and the image descriptors
//! that surfaces and textures are created from.

use bitflags::bitflags;
use serde::{Serialize, Deserialize};

use super::format::BackendFormat;

/// Which native graphics API a context or device is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendApi {
    /// Vulkan through `ash`
    Vulkan,
    /// Headless backend that allocates nothing on a GPU
    Mock,
}

bitflags! {
    /// Which color channels a format or color type carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelFlags: u32 {
        /// Red channel
        const RED = 0x1;
        /// Green channel
        const GREEN = 0x2;
        /// Blue channel
        const BLUE = 0x4;
        /// Alpha channel
        const ALPHA = 0x8;
        /// Single luminance channel
        const GRAY = 0x10;
        /// Red + green
        const RG = Self::RED.bits() | Self::GREEN.bits();
        /// Red + green + blue
        const RGB = Self::RG.bits() | Self::BLUE.bits();
        /// All four color channels
        const RGBA = Self::RGB.bits() | Self::ALPHA.bits();
    }
}

/// Block compression schemes understood by the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionType {
    /// Not compressed
    None,
    /// ETC2 RGB8
    Etc2Rgb8Unorm,
    /// BC1 RGB8
    Bc1Rgb8Unorm,
    /// BC1 RGBA8
    Bc1Rgba8Unorm,
}

impl CompressionType {
    /// Whether this is an actual compression scheme
    pub fn is_compressed(self) -> bool {
        self != Self::None
    }
}

/// Abstract pixel layouts, independent of any backend format
///
/// The variants after `R8` are engine-internal layouts; they never reach the
/// public capability queries (see [`ColorType::to_public`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorType {
    /// No valid layout
    Unknown,
    /// 8-bit alpha
    Alpha8,
    /// 5-6-5 packed
    Bgr565,
    /// 4-4-4-4 packed
    Abgr4444,
    /// 8-bit RGBA
    Rgba8888,
    /// 8-bit RGBA, sRGB encoded
    Rgba8888Srgb,
    /// 8-bit RGB with an ignored fourth byte
    Rgb888x,
    /// 8-bit red/green
    Rg88,
    /// 8-bit BGRA
    Bgra8888,
    /// 10-10-10-2 RGBA
    Rgba1010102,
    /// 10-10-10-2 BGRA
    Bgra1010102,
    /// 8-bit gray
    Gray8,
    /// Half-float alpha
    AlphaF16,
    /// Half-float RGBA
    RgbaF16,
    /// Half-float RGBA clamped to [0, 1]
    RgbaF16Clamped,
    /// Float RGBA
    RgbaF32,
    /// 16-bit alpha
    Alpha16,
    /// 16-bit red/green
    Rg1616,
    /// Half-float red/green
    RgF16,
    /// 16-bit RGBA
    Rgba16161616,
    /// 8-bit red
    R8,
    /// Internal: alpha stored in the red channel of a four-channel format
    Alpha8xxx,
    /// Internal: float alpha in a four-channel format
    AlphaF32xxx,
    /// Internal: gray stored in a four-channel format
    Gray8xxx,
    /// Internal: red stored in a four-channel format
    R8xxx,
    /// Internal: tightly packed 24-bit RGB
    Rgb888,
    /// Internal: 16-bit red
    R16,
    /// Internal: half-float red
    RF16,
    /// Internal: gray + alpha
    GrayAlpha88,
}

impl ColorType {
    /// Map a color type to its public form
    ///
    /// Internal layouts have no public default format and map to `Unknown`.
    pub fn to_public(self) -> Self {
        match self {
            Self::Alpha8xxx
            | Self::AlphaF32xxx
            | Self::Gray8xxx
            | Self::R8xxx
            | Self::Rgb888
            | Self::R16
            | Self::RF16
            | Self::GrayAlpha88 => Self::Unknown,
            public => public,
        }
    }

    /// Channels present in this layout
    pub fn channel_flags(self) -> ChannelFlags {
        match self {
            Self::Unknown => ChannelFlags::empty(),
            Self::Alpha8 | Self::AlphaF16 | Self::Alpha16 | Self::Alpha8xxx | Self::AlphaF32xxx => {
                ChannelFlags::ALPHA
            }
            Self::Bgr565 | Self::Rgb888x | Self::Rgb888 => ChannelFlags::RGB,
            Self::Rg88 | Self::Rg1616 | Self::RgF16 => ChannelFlags::RG,
            Self::Gray8 | Self::Gray8xxx => ChannelFlags::GRAY,
            Self::GrayAlpha88 => ChannelFlags::GRAY | ChannelFlags::ALPHA,
            Self::R8 | Self::R8xxx | Self::R16 | Self::RF16 => ChannelFlags::RED,
            Self::Abgr4444
            | Self::Rgba8888
            | Self::Rgba8888Srgb
            | Self::Bgra8888
            | Self::Rgba1010102
            | Self::Bgra1010102
            | Self::RgbaF16
            | Self::RgbaF16Clamped
            | Self::RgbaF32
            | Self::Rgba16161616 => ChannelFlags::RGBA,
        }
    }

    /// Bytes used by one pixel, 0 for `Unknown`
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Alpha8 | Self::Gray8 | Self::R8 => 1,
            Self::Bgr565 | Self::Abgr4444 | Self::Rg88 | Self::AlphaF16 | Self::Alpha16
            | Self::R16 | Self::RF16 | Self::GrayAlpha88 => 2,
            Self::Rgb888 => 3,
            Self::Rgba8888 | Self::Rgba8888Srgb | Self::Rgb888x | Self::Bgra8888
            | Self::Rgba1010102 | Self::Bgra1010102 | Self::Rg1616 | Self::RgF16
            | Self::Alpha8xxx | Self::Gray8xxx | Self::R8xxx => 4,
            Self::RgbaF16 | Self::RgbaF16Clamped | Self::Rgba16161616 => 8,
            Self::RgbaF32 | Self::AlphaF32xxx => 16,
        }
    }
}

/// Which corner texel row zero sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceOrigin {
    /// Row zero is the top row
    #[default]
    UpperLeft,
    /// Row zero is the bottom row
    LowerLeft,
}

/// What happens to attachment contents at the start of a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// Keep previous contents
    Load,
    /// Clear to the pass clear color
    #[default]
    Clear,
    /// Contents are undefined
    DontCare,
}

/// Integer rectangle, edges are exclusive on the right and bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IRect {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge (exclusive)
    pub right: i32,
    /// Bottom edge (exclusive)
    pub bottom: i32,
}

impl IRect {
    /// Rectangle from edges
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle anchored at the origin
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Width, zero when inverted
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left).max(0) as u32
    }

    /// Height, zero when inverted
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top).max(0) as u32
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Self) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }
}

/// Dimensions and pixel layout of a surface or image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout
    pub color_type: ColorType,
}

impl ImageInfo {
    /// New image info
    pub const fn new(width: u32, height: u32, color_type: ColorType) -> Self {
        Self { width, height, color_type }
    }

    /// Bounds as a rectangle at the origin
    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.width, self.height)
    }

    /// Non-empty with a known color type
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.color_type != ColorType::Unknown
    }

    /// Same layout, different dimensions
    pub fn with_dimensions(&self, width: u32, height: u32) -> Self {
        Self { width, height, ..*self }
    }
}

/// Backend-level description of a texture allocation
///
/// Also the identity used for scratch reuse in the global resource cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDesc {
    /// Native format
    pub format: BackendFormat,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Number of mip levels, 1 when not mipmapped
    pub mip_levels: u32,
    /// MSAA sample count
    pub sample_count: u32,
    /// Usable as a color attachment
    pub renderable: bool,
}

impl ImageDesc {
    /// Descriptor for a single-sampled 2D texture
    pub fn new(format: BackendFormat, width: u32, height: u32, mipmapped: bool, renderable: bool) -> Self {
        let mip_levels = if mipmapped {
            32 - width.max(height).max(1).leading_zeros()
        } else {
            1
        };
        Self {
            format,
            width,
            height,
            mip_levels,
            sample_count: 1,
            renderable,
        }
    }

    /// Whether more than one mip level is allocated
    pub fn is_mipmapped(&self) -> bool {
        self.mip_levels > 1
    }

    /// Estimated GPU memory footprint in bytes
    ///
    /// Uses the format's bytes-per-block, which over-estimates planar formats.
    pub fn memory_size(&self) -> u64 {
        let bytes_per_block = u64::from(self.format.bytes_per_block());
        let mut total = 0u64;
        let (mut w, mut h) = (u64::from(self.width), u64::from(self.height));
        for _ in 0..self.mip_levels {
            let blocks = if self.format.compression_type().is_compressed() {
                w.div_ceil(4) * h.div_ceil(4)
            } else {
                w * h
            };
            total += blocks * bytes_per_block;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        total * u64::from(self.sample_count.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_color_types_have_no_public_form() {
        assert_eq!(ColorType::R8xxx.to_public(), ColorType::Unknown);
        assert_eq!(ColorType::Rgb888.to_public(), ColorType::Unknown);
        assert_eq!(ColorType::Rgba8888.to_public(), ColorType::Rgba8888);
        assert_eq!(ColorType::R8.to_public(), ColorType::R8);
    }

    #[test]
    fn test_channel_flag_combinations() {
        assert_eq!(ChannelFlags::RGBA.bits(), 0xF);
        assert!(ChannelFlags::RGB.contains(ChannelFlags::RG));
        assert_eq!(ColorType::Rg88.channel_flags(), ChannelFlags::RG);
    }

    #[test]
    fn test_mip_level_count() {
        let format = BackendFormat::mock(ColorType::Rgba8888);
        assert_eq!(ImageDesc::new(format, 256, 64, true, false).mip_levels, 9);
        assert_eq!(ImageDesc::new(format, 256, 64, false, false).mip_levels, 1);
        assert_eq!(ImageDesc::new(format, 1, 1, true, false).mip_levels, 1);
    }

    #[test]
    fn test_memory_size_includes_mips() {
        let format = BackendFormat::mock(ColorType::Rgba8888);
        let desc = ImageDesc::new(format, 4, 4, true, false);
        // 4x4 + 2x2 + 1x1 texels at 4 bytes
        assert_eq!(desc.memory_size(), (16 + 4 + 1) * 4);
    }

    #[test]
    fn test_rect_contains() {
        let bounds = IRect::from_size(100, 50);
        assert!(bounds.contains(&IRect::new(10, 10, 20, 20)));
        assert!(!bounds.contains(&IRect::new(90, 10, 120, 20)));
        assert!(IRect::new(5, 5, 5, 10).is_empty());
    }
}
