//! # Capability Table
//!
//! Per-backend answers to "which native format backs this color type" and
//! "what can the device do with it". Implementations are immutable once built
//! and are shared across recording threads behind an `Arc`.

use super::format::BackendFormat;
use super::types::{ColorType, CompressionType};

/// Format capability queries for one device
pub trait Caps: Send + Sync + std::fmt::Debug {
    /// Default native format for a color type
    ///
    /// When `renderable` is set, only formats usable as a single-sampled color
    /// attachment qualify.
    fn default_backend_format(&self, color_type: ColorType, renderable: bool) -> Option<BackendFormat>;

    /// Native format for a compression scheme, `None` when the device lacks it
    fn compressed_backend_format(&self, compression: CompressionType) -> Option<BackendFormat>;

    /// Whether `format` can be rendered to at `sample_count`
    fn is_format_renderable(&self, color_type: ColorType, format: &BackendFormat, sample_count: u32) -> bool;

    /// Whether `format` can be sampled
    fn is_format_texturable(&self, format: &BackendFormat) -> bool;

    /// Largest supported MSAA count for `format`, 0 when not renderable at all
    fn max_render_target_sample_count(&self, format: &BackendFormat) -> u32;

    /// Largest texture dimension
    fn max_texture_size(&self) -> u32;
}

/// Largest power of two in `counts`, used to reduce a device's supported
/// sample counts to one number
pub fn max_sample_count(counts: impl IntoIterator<Item = u32>) -> u32 {
    counts.into_iter().filter(|c| c.is_power_of_two()).max().unwrap_or(0)
}
