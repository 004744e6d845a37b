//! # Surface
//!
//! User-facing render target. A surface owns the only long-lived reference to
//! its device and draws through a [`Canvas`].
//!
//! ## Teardown
//!
//! Dropping a surface first marks the device immutable and only then releases
//! the reference. Image views linked to the device therefore never see a
//! mutable device once teardown has begun.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::blend::BlendMode;
use super::device::GraniteDevice;
use super::image::GraniteImage;
use super::paint::{Color4f, Paint};
use super::recording::RecordingContext;
use crate::engine::error::EngineResult;
use crate::engine::resource::Budgeted;
use crate::engine::types::{IRect, ImageInfo, LoadOp, SurfaceOrigin};

/// Label used by [`GraniteSurface::make_render_target`] when none is given
pub const DEFAULT_RENDER_TARGET_LABEL: &str = "SurfaceRenderTarget";

static NEXT_GENERATION_ID: AtomicU32 = AtomicU32::new(1);

fn next_generation_id() -> u32 {
    NEXT_GENERATION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Device operations a surface relies on
pub trait SurfaceDevice: Send + Sync {
    /// Flush pending work and refuse further draws
    fn set_immutable(&self);

    /// Hand pending work to the recorder; no-op when nothing is pending
    fn flush_pending_work(&self) -> EngineResult<()>;
}

impl SurfaceDevice for GraniteDevice {
    fn set_immutable(&self) {
        GraniteDevice::set_immutable(self);
    }

    fn flush_pending_work(&self) -> EngineResult<()> {
        GraniteDevice::flush_pending_work(self)
    }
}

/// What happens to existing contents before a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChangeMode {
    /// Existing contents may be thrown away
    Discard,
    /// Existing contents must be preserved
    Retain,
}

/// Surface over a device
#[derive(Debug)]
pub struct Surface<D: SurfaceDevice = GraniteDevice> {
    /// `None` only while dropping
    device: Option<Arc<D>>,
    generation_id: AtomicU32,
}

/// Surface over the GPU device
pub type GraniteSurface = Surface<GraniteDevice>;

impl<D: SurfaceDevice> Surface<D> {
    /// Wrap `device`
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device: Some(device),
            generation_id: AtomicU32::new(next_generation_id()),
        }
    }

    /// Underlying device
    pub fn device(&self) -> &Arc<D> {
        // Only `Drop` takes the device out
        self.device.as_ref().unwrap_or_else(|| unreachable!("device taken before drop"))
    }

    /// Hand pending draws to the recording context
    ///
    /// Safe to call any number of times.
    pub fn flush(&self) -> EngineResult<()> {
        self.device().flush_pending_work()
    }

    /// Identifier of the current contents, changes on every content change
    pub fn generation_id(&self) -> u32 {
        self.generation_id.load(Ordering::Acquire)
    }

    /// Announce a write; bumps the generation ID
    pub fn notify_content_will_change(&self, mode: ContentChangeMode) {
        let generation = next_generation_id();
        self.generation_id.store(generation, Ordering::Release);
        log::trace!("[SURFACE] Content change ({:?}), generation {}", mode, generation);
    }

    /// Snapshots are always copies, so nothing is left to copy on write
    pub fn on_copy_on_write(&self, _mode: ContentChangeMode) -> bool {
        true
    }
}

impl<D: SurfaceDevice> Drop for Surface<D> {
    fn drop(&mut self) {
        if let Some(device) = self.device.as_ref() {
            device.set_immutable();
        }
        // Release only after the device is immutable
        let device = self.device.take();
        drop(device);
        log::trace!("[SURFACE] Released device");
    }
}

impl Surface<GraniteDevice> {
    /// Create a surface, `None` when its device cannot be created
    ///
    /// Non-budgeted surfaces are fully allocated on return. `initial_load_op`
    /// applies to the first draw flushed into the surface.
    pub fn make(
        recording_context: &Arc<RecordingContext>,
        info: ImageInfo,
        budgeted: Budgeted,
        mipmapped: bool,
        approx_fit: bool,
        origin: SurfaceOrigin,
        initial_load_op: LoadOp,
        label: &str,
    ) -> Option<Self> {
        let device = GraniteDevice::make(
            recording_context,
            info,
            budgeted,
            mipmapped,
            approx_fit,
            origin,
            initial_load_op,
            label,
        )?;
        debug_assert!(budgeted == Budgeted::Yes || device.is_instantiated());
        log::debug!(
            "[SURFACE] Created '{}' {}x{} {:?} ({:?})",
            label,
            info.width,
            info.height,
            info.color_type,
            budgeted
        );
        Some(Self::new(device))
    }

    /// Exact-fit, non-budgeted surface that starts out cleared
    pub fn make_render_target(
        recording_context: &Arc<RecordingContext>,
        info: ImageInfo,
        mipmapped: bool,
        origin: SurfaceOrigin,
        label: Option<&str>,
    ) -> Option<Self> {
        Self::make(
            recording_context,
            info,
            Budgeted::No,
            mipmapped,
            false,
            origin,
            LoadOp::Clear,
            label.unwrap_or(DEFAULT_RENDER_TARGET_LABEL),
        )
    }

    /// Logical size and color type
    pub fn image_info(&self) -> ImageInfo {
        self.device().image_info()
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image_info().width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image_info().height
    }

    /// Recording context the device flushes into
    pub fn recording_context(&self) -> &Arc<RecordingContext> {
        self.device().recording_context()
    }

    /// Drawing interface sharing this surface's device
    pub fn canvas(&self) -> Canvas {
        Canvas {
            device: Arc::clone(self.device()),
        }
    }

    /// Copy of `subset` (the whole surface when `None`)
    ///
    /// The copy has a mip chain when the surface does.
    pub fn new_image_snapshot(&self, subset: Option<IRect>) -> Option<GraniteImage> {
        let mipmapped = self.device().target().desc().is_mipmapped();
        self.make_image_copy(subset, mipmapped)
    }

    /// Copy of `subset`, optionally with a mip chain
    pub fn make_image_copy(&self, subset: Option<IRect>, mipmapped: bool) -> Option<GraniteImage> {
        let subset = subset.unwrap_or_else(|| self.image_info().bounds());
        self.device().make_image_copy(subset, mipmapped)
    }
}

/// Draw commands targeting one device
#[derive(Debug, Clone)]
pub struct Canvas {
    device: Arc<GraniteDevice>,
}

impl Canvas {
    /// Target device
    pub fn device(&self) -> &Arc<GraniteDevice> {
        &self.device
    }

    /// Fill everything with `paint`
    pub fn draw_paint(&self, paint: &Paint) -> EngineResult<()> {
        self.device.draw_paint(paint)
    }

    /// Fill `rect` with `paint`
    pub fn draw_rect(&self, rect: IRect, paint: &Paint) -> EngineResult<()> {
        self.device.draw_rect(rect, paint)
    }

    /// Replace everything with `color`
    pub fn clear(&self, color: Color4f) -> EngineResult<()> {
        self.device.draw_paint(&Paint::new(color).with_blend_mode(BlendMode::Src))
    }
}
