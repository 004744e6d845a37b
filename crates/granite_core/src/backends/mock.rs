//! Headless backend
//!
//! Implements [`Device`] and [`Caps`] without touching a GPU. Used by the test
//! suite and the demo; also handy for running recording code on machines
//! without a Vulkan driver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::caps::Caps;
use crate::engine::device::{BackendImage, BackendPipeline, Device, GraphicsPipelineDesc};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::format::BackendFormat;
use crate::engine::types::{BackendApi, ColorType, CompressionType, ImageDesc};

const ALL_COMPRESSIONS: [CompressionType; 3] = [
    CompressionType::Etc2Rgb8Unorm,
    CompressionType::Bc1Rgb8Unorm,
    CompressionType::Bc1Rgba8Unorm,
];

const PUBLIC_COLOR_TYPES: [ColorType; 20] = [
    ColorType::Alpha8,
    ColorType::Bgr565,
    ColorType::Abgr4444,
    ColorType::Rgba8888,
    ColorType::Rgba8888Srgb,
    ColorType::Rgb888x,
    ColorType::Rg88,
    ColorType::Bgra8888,
    ColorType::Rgba1010102,
    ColorType::Bgra1010102,
    ColorType::Gray8,
    ColorType::AlphaF16,
    ColorType::RgbaF16,
    ColorType::RgbaF16Clamped,
    ColorType::RgbaF32,
    ColorType::Alpha16,
    ColorType::Rg1616,
    ColorType::RgF16,
    ColorType::Rgba16161616,
    ColorType::R8,
];

#[derive(Debug, Clone, Copy, Default)]
struct MockFormatInfo {
    texturable: bool,
    /// 0 when not renderable
    max_samples: u32,
}

/// Capability table declared up front by the caller
#[derive(Debug, Clone)]
pub struct MockCaps {
    formats: HashMap<ColorType, MockFormatInfo>,
    compressions: Vec<CompressionType>,
    max_texture_size: u32,
}

impl MockCaps {
    /// Caps that support nothing
    pub fn new() -> Self {
        Self {
            formats: HashMap::new(),
            compressions: Vec::new(),
            max_texture_size: 8192,
        }
    }

    /// Every public color type renderable at 4x MSAA, every compression texturable
    pub fn all_supported() -> Self {
        let mut caps = Self::new();
        for color_type in PUBLIC_COLOR_TYPES {
            caps = caps.with_renderable(color_type, 4);
        }
        for compression in ALL_COMPRESSIONS {
            caps = caps.with_compression(compression);
        }
        caps
    }

    /// Declare a color type sampleable but not renderable
    pub fn with_texturable(mut self, color_type: ColorType) -> Self {
        self.formats.entry(color_type).or_default().texturable = true;
        self
    }

    /// Declare a color type renderable up to `max_samples`
    pub fn with_renderable(mut self, color_type: ColorType, max_samples: u32) -> Self {
        let info = self.formats.entry(color_type).or_default();
        info.texturable = true;
        info.max_samples = max_samples;
        self
    }

    /// Declare a compression scheme texturable
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        if compression.is_compressed() && !self.compressions.contains(&compression) {
            self.compressions.push(compression);
        }
        self
    }

    /// Set the largest texture dimension
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    fn info(&self, format: &BackendFormat) -> Option<(ColorType, MockFormatInfo)> {
        match *format {
            BackendFormat::Mock { color_type, compression: CompressionType::None } => {
                self.formats.get(&color_type).map(|info| (color_type, *info))
            }
            _ => None,
        }
    }
}

impl Default for MockCaps {
    fn default() -> Self {
        Self::new()
    }
}

impl Caps for MockCaps {
    fn default_backend_format(&self, color_type: ColorType, renderable: bool) -> Option<BackendFormat> {
        let info = self.formats.get(&color_type)?;
        if !info.texturable || (renderable && info.max_samples == 0) {
            return None;
        }
        Some(BackendFormat::mock(color_type))
    }

    fn compressed_backend_format(&self, compression: CompressionType) -> Option<BackendFormat> {
        self.compressions
            .contains(&compression)
            .then(|| BackendFormat::mock_compressed(compression))
    }

    fn is_format_renderable(&self, color_type: ColorType, format: &BackendFormat, sample_count: u32) -> bool {
        match self.info(format) {
            Some((format_color_type, info)) => {
                format_color_type == color_type
                    && sample_count.is_power_of_two()
                    && sample_count <= info.max_samples
            }
            None => false,
        }
    }

    fn is_format_texturable(&self, format: &BackendFormat) -> bool {
        match *format {
            BackendFormat::Mock { compression, .. } if compression.is_compressed() => {
                self.compressions.contains(&compression)
            }
            _ => self.info(format).is_some_and(|(_, info)| info.texturable),
        }
    }

    fn max_render_target_sample_count(&self, format: &BackendFormat) -> u32 {
        self.info(format).map_or(0, |(_, info)| info.max_samples)
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

/// Image that only remembers its descriptor
#[derive(Debug)]
pub struct MockImage {
    desc: ImageDesc,
    label: String,
}

impl BackendImage for MockImage {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Pipeline that only remembers its label
#[derive(Debug)]
pub struct MockPipeline {
    label: String,
}

impl BackendPipeline for MockPipeline {
    fn label(&self) -> &str {
        &self.label
    }
}

/// Headless device that counts what it was asked to create
#[derive(Debug)]
pub struct MockDevice {
    caps: Arc<MockCaps>,
    images_created: AtomicUsize,
    pipelines_compiled: AtomicUsize,
    fail_image_creation: AtomicBool,
    compile_delay: Option<Duration>,
}

impl MockDevice {
    /// Device answering capability queries from `caps`
    pub fn new(caps: MockCaps) -> Self {
        Self {
            caps: Arc::new(caps),
            images_created: AtomicUsize::new(0),
            pipelines_compiled: AtomicUsize::new(0),
            fail_image_creation: AtomicBool::new(false),
            compile_delay: None,
        }
    }

    /// Make every pipeline compile take at least `delay`
    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = Some(delay);
        self
    }

    /// Make subsequent image allocations fail
    pub fn set_fail_image_creation(&self, fail: bool) {
        self.fail_image_creation.store(fail, Ordering::Relaxed);
    }

    /// Images allocated so far
    pub fn images_created(&self) -> usize {
        self.images_created.load(Ordering::Relaxed)
    }

    /// Pipelines compiled so far
    pub fn pipelines_compiled(&self) -> usize {
        self.pipelines_compiled.load(Ordering::Relaxed)
    }
}

impl Device for MockDevice {
    fn backend(&self) -> BackendApi {
        BackendApi::Mock
    }

    fn caps(&self) -> Arc<dyn Caps> {
        self.caps.clone()
    }

    fn create_image(&self, desc: &ImageDesc, label: &str) -> EngineResult<Box<dyn BackendImage>> {
        if self.fail_image_creation.load(Ordering::Relaxed) {
            return Err(EngineError::ImageCreation(format!("'{label}': allocation disabled")));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(EngineError::ImageCreation(format!("'{label}': empty dimensions")));
        }
        let max = self.caps.max_texture_size();
        if desc.width > max || desc.height > max {
            return Err(EngineError::ImageCreation(format!(
                "'{label}': {}x{} exceeds max texture size {max}",
                desc.width, desc.height
            )));
        }
        if !self.caps.is_format_texturable(&desc.format) {
            return Err(EngineError::ImageCreation(format!("'{label}': format {} unsupported", desc.format)));
        }

        self.images_created.fetch_add(1, Ordering::Relaxed);
        log::debug!("[MOCK] Created image '{}' {}x{} {}", label, desc.width, desc.height, desc.format);
        Ok(Box::new(MockImage {
            desc: *desc,
            label: label.to_string(),
        }))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> EngineResult<Box<dyn BackendPipeline>> {
        if desc.color_format.backend() != BackendApi::Mock {
            return Err(EngineError::PipelineCompilation(format!(
                "'{}': color format {} belongs to another backend",
                desc.label, desc.color_format
            )));
        }
        if let Some(delay) = self.compile_delay {
            std::thread::sleep(delay);
        }
        self.pipelines_compiled.fetch_add(1, Ordering::Relaxed);
        log::debug!("[MOCK] Compiled pipeline '{}'", desc.label);
        Ok(Box::new(MockPipeline {
            label: desc.label.clone(),
        }))
    }
}
