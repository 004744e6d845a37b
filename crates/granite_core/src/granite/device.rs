//! # Device
//!
//! A render target plus the draws recorded into it that have not been handed
//! to the recording context yet.
//!
//! ## Lifecycle
//!
//! A device is mutable until [`GraniteDevice::set_immutable`] runs. That call
//! flushes pending draws and sets the flag under the same lock draws are
//! queued under, so anything that observes an immutable device also observes
//! all of its work flushed. Immutable devices refuse further draws.
//!
//! The first flushed draw carries the device's initial [`LoadOp`]; every later
//! draw loads what is already in the target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::image::GraniteImage;
use super::paint::Paint;
use super::recording::{CopyTask, DrawTask, RecordingContext, Task};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::resource::{Budgeted, GraphicsPipeline, PipelineKey, TextureRef};
use crate::engine::types::{IRect, ImageDesc, ImageInfo, LoadOp, SurfaceOrigin};

/// Smallest dimension handed out for approximate-fit targets
const MIN_APPROX_DIMENSION: u32 = 16;

/// Round `n` up so similar sizes share scratch textures
///
/// Powers of two up to 1024; above that, the half step between powers of two
/// is used when it fits.
pub fn approx_dimension(n: u32) -> u32 {
    let n = n.max(MIN_APPROX_DIMENSION);
    let ceil = n.next_power_of_two();
    if ceil <= 1024 {
        return ceil;
    }
    let mid = ceil / 2 + ceil / 4;
    if n <= mid {
        mid
    } else {
        ceil
    }
}

/// Texture that is allocated on first use
#[derive(Debug)]
pub struct TextureProxy {
    desc: ImageDesc,
    budgeted: Budgeted,
    label: String,
    texture: Mutex<Option<Arc<TextureRef>>>,
}

impl TextureProxy {
    /// Uninstantiated proxy
    pub fn new(desc: ImageDesc, budgeted: Budgeted, label: impl Into<String>) -> Self {
        Self {
            desc,
            budgeted,
            label: label.into(),
            texture: Mutex::new(None),
        }
    }

    /// Descriptor the texture will be created with
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Budget participation of the backing texture
    pub fn budgeted(&self) -> Budgeted {
        self.budgeted
    }

    /// Whether the backing texture exists
    pub fn is_instantiated(&self) -> bool {
        self.texture.lock().is_some()
    }

    /// Backing texture, if instantiated
    pub fn texture(&self) -> Option<Arc<TextureRef>> {
        self.texture.lock().clone()
    }

    /// Backing texture, allocating it if needed
    pub fn instantiate(&self, recording_context: &RecordingContext) -> EngineResult<Arc<TextureRef>> {
        let mut texture = self.texture.lock();
        if let Some(existing) = texture.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(recording_context.create_texture(&self.desc, self.budgeted, &self.label)?);
        log::debug!(
            "[DEVICE] Instantiated '{}' {}x{} as texture #{}",
            self.label,
            self.desc.width,
            self.desc.height,
            created.texture().unique_id()
        );
        *texture = Some(Arc::clone(&created));
        Ok(created)
    }
}

#[derive(Debug)]
struct PendingDraw {
    pipeline: Arc<GraphicsPipeline>,
    uniform_data: Vec<u8>,
    bounds: IRect,
}

#[derive(Debug)]
struct PendingWork {
    draws: Vec<PendingDraw>,
    next_load_op: LoadOp,
}

/// Render target that records draws
#[derive(Debug)]
pub struct GraniteDevice {
    recording_context: Arc<RecordingContext>,
    info: ImageInfo,
    origin: SurfaceOrigin,
    target: TextureProxy,
    /// Also guards transitions of `immutable`
    pending: Mutex<PendingWork>,
    immutable: AtomicBool,
}

impl GraniteDevice {
    /// Create a device, `None` when the target cannot be created
    ///
    /// Non-budgeted targets are allocated before this returns.
    pub fn make(
        recording_context: &Arc<RecordingContext>,
        info: ImageInfo,
        budgeted: Budgeted,
        mipmapped: bool,
        approx_fit: bool,
        origin: SurfaceOrigin,
        initial_load_op: LoadOp,
        label: &str,
    ) -> Option<Arc<Self>> {
        if !info.is_valid() {
            log::warn!("[DEVICE] Invalid image info {:?} for '{}'", info, label);
            return None;
        }
        let shared = recording_context.shared_context();
        let Some(format) = shared.default_backend_format(info.color_type, true) else {
            log::warn!("[DEVICE] {:?} is not renderable, cannot create '{}'", info.color_type, label);
            return None;
        };
        let max_size = shared
            .caps()
            .map_or(0, |caps| caps.max_texture_size())
            .min(shared.options().max_texture_size);
        if info.width > max_size || info.height > max_size {
            log::warn!(
                "[DEVICE] '{}' {}x{} exceeds max texture size {}",
                label,
                info.width,
                info.height,
                max_size
            );
            return None;
        }

        let (width, height) = if approx_fit {
            (
                approx_dimension(info.width).min(max_size),
                approx_dimension(info.height).min(max_size),
            )
        } else {
            (info.width, info.height)
        };
        let target = TextureProxy::new(ImageDesc::new(format, width, height, mipmapped, true), budgeted, label);
        if budgeted == Budgeted::No {
            if let Err(e) = target.instantiate(recording_context) {
                log::warn!("[DEVICE] Failed to allocate '{}': {}", label, e);
                return None;
            }
        }

        Some(Arc::new(Self {
            recording_context: Arc::clone(recording_context),
            info,
            origin,
            target,
            pending: Mutex::new(PendingWork {
                draws: Vec::new(),
                next_load_op: initial_load_op,
            }),
            immutable: AtomicBool::new(false),
        }))
    }

    /// Logical size and color type
    pub fn image_info(&self) -> ImageInfo {
        self.info
    }

    /// Row order of the target
    pub fn origin(&self) -> SurfaceOrigin {
        self.origin
    }

    /// Recording context draws are flushed to
    pub fn recording_context(&self) -> &Arc<RecordingContext> {
        &self.recording_context
    }

    /// Backing render target
    pub fn target(&self) -> &TextureProxy {
        &self.target
    }

    /// Whether the render target has been allocated
    pub fn is_instantiated(&self) -> bool {
        self.target.is_instantiated()
    }

    /// Whether the device accepts no further draws
    pub fn is_immutable(&self) -> bool {
        self.immutable.load(Ordering::Acquire)
    }

    /// Draws recorded but not yet flushed
    pub fn pending_draw_count(&self) -> usize {
        self.pending.lock().draws.len()
    }

    /// Fill the whole target with `paint`
    pub fn draw_paint(&self, paint: &Paint) -> EngineResult<()> {
        self.record_draw(self.info.bounds(), paint)
    }

    /// Fill `rect` with `paint`
    pub fn draw_rect(&self, rect: IRect, paint: &Paint) -> EngineResult<()> {
        self.record_draw(rect, paint)
    }

    fn record_draw(&self, bounds: IRect, paint: &Paint) -> EngineResult<()> {
        if self.is_immutable() {
            log::warn!("[DEVICE] Draw rejected, device is immutable");
            return Err(EngineError::DeviceImmutable);
        }
        if bounds.is_empty() {
            return Ok(());
        }

        let paint_key = paint.build_key(self.recording_context.registry());
        let desc = self.target.desc();
        let key = PipelineKey::new(paint_key.stage_ids.clone(), desc.format, desc.sample_count);
        let pipeline = self.recording_context.find_or_create_pipeline(&key)?;

        let mut pending = self.pending.lock();
        if self.is_immutable() {
            log::warn!("[DEVICE] Draw rejected, device became immutable while recording");
            return Err(EngineError::DeviceImmutable);
        }
        pending.draws.push(PendingDraw {
            pipeline,
            uniform_data: paint_key.uniform_data(),
            bounds,
        });
        Ok(())
    }

    /// Hand pending draws to the recording context
    ///
    /// No-op when nothing is pending. When the target cannot be allocated the
    /// draws stay pending and a later flush retries them.
    pub fn flush_pending_work(&self) -> EngineResult<()> {
        let mut pending = self.pending.lock();
        self.flush_locked(&mut pending)
    }

    fn flush_locked(&self, pending: &mut PendingWork) -> EngineResult<()> {
        if pending.draws.is_empty() {
            return Ok(());
        }
        let target = self.target.instantiate(&self.recording_context)?;
        log::debug!("[DEVICE] Flushing {} draws", pending.draws.len());
        for draw in pending.draws.drain(..) {
            let load_op = std::mem::replace(&mut pending.next_load_op, LoadOp::Load);
            self.recording_context.add_task(Task::Draw(DrawTask {
                target: Arc::clone(&target),
                pipeline: draw.pipeline,
                uniform_data: draw.uniform_data,
                bounds: draw.bounds,
                load_op,
            }));
        }
        Ok(())
    }

    /// Flush, then stop accepting draws
    pub fn set_immutable(&self) {
        let mut pending = self.pending.lock();
        if self.is_immutable() {
            return;
        }
        if let Err(e) = self.flush_locked(&mut pending) {
            log::warn!(
                "[DEVICE] Dropping {} pending draws while becoming immutable: {}",
                pending.draws.len(),
                e
            );
            pending.draws.clear();
        }
        self.immutable.store(true, Ordering::Release);
        drop(pending);
        log::debug!("[DEVICE] Marked immutable");
    }

    /// Copy `subset` of the target into a new image
    ///
    /// Pending draws are flushed first so the copy sees them.
    pub fn make_image_copy(&self, subset: IRect, mipmapped: bool) -> Option<GraniteImage> {
        if subset.is_empty() || !self.info.bounds().contains(&subset) {
            log::warn!("[DEVICE] Copy subset {:?} outside {:?}", subset, self.info.bounds());
            return None;
        }
        if let Err(e) = self.flush_pending_work() {
            log::warn!("[DEVICE] Flush before copy failed: {}", e);
            return None;
        }

        let src = match self.target.instantiate(&self.recording_context) {
            Ok(src) => src,
            Err(e) => {
                log::warn!("[DEVICE] Copy source unavailable: {}", e);
                return None;
            }
        };
        let desc = ImageDesc::new(self.target.desc().format, subset.width(), subset.height(), mipmapped, false);
        let dst = match self.recording_context.create_texture(&desc, Budgeted::Yes, "ImageCopy") {
            Ok(dst) => Arc::new(dst),
            Err(e) => {
                log::warn!("[DEVICE] Copy destination unavailable: {}", e);
                return None;
            }
        };

        self.recording_context.add_task(Task::Copy(CopyTask {
            src,
            src_rect: subset,
            dst: Arc::clone(&dst),
        }));
        Some(GraniteImage::new(dst, self.info.with_dimensions(subset.width(), subset.height())))
    }

    /// Image aliasing the target without copying
    ///
    /// The image stays linked to this device until the device becomes
    /// immutable; reading it while linked flushes the device.
    pub fn make_image_view(self: &Arc<Self>) -> Option<GraniteImage> {
        let texture = match self.target.instantiate(&self.recording_context) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("[DEVICE] Target unavailable for image view: {}", e);
                return None;
            }
        };
        Some(GraniteImage::linked(texture, self.info, Arc::downgrade(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockCaps, MockDevice};
    use crate::core::config::ContextOptions;
    use crate::engine::shared_context::SharedContext;
    use crate::engine::types::ColorType;
    use crate::granite::recording::Task;

    fn recorder() -> (Arc<MockDevice>, Arc<RecordingContext>) {
        let device = Arc::new(MockDevice::new(MockCaps::all_supported()));
        let shared = SharedContext::make(device.clone(), ContextOptions::default()).unwrap();
        (device, RecordingContext::new(shared).unwrap())
    }

    fn info() -> ImageInfo {
        ImageInfo::new(64, 48, ColorType::Rgba8888)
    }

    #[test]
    fn test_approx_dimension() {
        assert_eq!(approx_dimension(1), 16);
        assert_eq!(approx_dimension(100), 128);
        assert_eq!(approx_dimension(1024), 1024);
        assert_eq!(approx_dimension(1100), 1536);
        assert_eq!(approx_dimension(1600), 2048);
    }

    #[test]
    fn test_non_budgeted_target_is_instantiated_eagerly() {
        let (mock, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::No, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        assert!(device.is_instantiated());
        assert_eq!(mock.images_created(), 1);

        let lazy = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, true, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        assert!(!lazy.is_instantiated());
        assert_eq!(lazy.target().desc().width, 64);
    }

    #[test]
    fn test_make_fails_without_partial_device() {
        let (mock, rc) = recorder();
        mock.set_fail_image_creation(true);
        assert!(GraniteDevice::make(&rc, info(), Budgeted::No, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").is_none());
        let bad = ImageInfo::new(0, 10, ColorType::Rgba8888);
        assert!(GraniteDevice::make(&rc, bad, Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").is_none());
    }

    #[test]
    fn test_flush_moves_draws_to_recording() {
        let (_, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        device.flush_pending_work().unwrap();
        assert_eq!(rc.pending_task_count(), 0);

        device.draw_paint(&Paint::new([1.0, 0.0, 0.0, 1.0])).unwrap();
        device.draw_rect(IRect::new(0, 0, 8, 8), &Paint::default()).unwrap();
        assert_eq!(device.pending_draw_count(), 2);
        device.flush_pending_work().unwrap();
        device.flush_pending_work().unwrap();
        assert_eq!(rc.pending_task_count(), 2);
        assert!(device.is_instantiated());
    }

    #[test]
    fn test_immutable_device_flushes_then_refuses() {
        let (_, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        device.draw_paint(&Paint::default()).unwrap();
        device.set_immutable();
        assert!(device.is_immutable());
        assert_eq!(rc.pending_task_count(), 1);
        assert!(matches!(device.draw_paint(&Paint::default()), Err(EngineError::DeviceImmutable)));
    }

    #[test]
    fn test_image_copy_records_copy_after_draws() {
        let (_, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        device.draw_paint(&Paint::default()).unwrap();
        let image = device.make_image_copy(IRect::new(8, 8, 24, 40), false).unwrap();
        assert_eq!((image.width(), image.height()), (16, 32));

        let recording = rc.snap();
        assert!(matches!(recording.tasks()[0], Task::Draw(_)));
        assert!(matches!(recording.tasks()[1], Task::Copy(_)));
        assert!(device.make_image_copy(IRect::new(0, 0, 65, 1), false).is_none());
    }

    #[test]
    fn test_failed_flush_keeps_draws_for_retry() {
        let (mock, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, true, SurfaceOrigin::UpperLeft, LoadOp::Clear, "lazy").unwrap();
        device.draw_paint(&Paint::default()).unwrap();

        mock.set_fail_image_creation(true);
        assert!(matches!(device.flush_pending_work(), Err(EngineError::ImageCreation(_))));
        assert_eq!(device.pending_draw_count(), 1);
        assert_eq!(rc.pending_task_count(), 0);

        mock.set_fail_image_creation(false);
        device.flush_pending_work().unwrap();
        assert_eq!(device.pending_draw_count(), 0);
        assert_eq!(rc.pending_task_count(), 1);
    }

    #[test]
    fn test_only_first_flushed_draw_uses_initial_load_op() {
        let (_, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        device.draw_paint(&Paint::default()).unwrap();
        device.draw_paint(&Paint::default()).unwrap();
        device.flush_pending_work().unwrap();
        device.draw_paint(&Paint::default()).unwrap();
        device.flush_pending_work().unwrap();

        let load_ops: Vec<_> = rc
            .snap()
            .tasks()
            .iter()
            .filter_map(|task| match task {
                Task::Draw(draw) => Some(draw.load_op),
                Task::Copy(_) => None,
            })
            .collect();
        assert_eq!(load_ops, [LoadOp::Clear, LoadOp::Load, LoadOp::Load]);

        let keep = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Load, "t").unwrap();
        keep.draw_paint(&Paint::default()).unwrap();
        keep.flush_pending_work().unwrap();
        assert!(matches!(&rc.snap().tasks()[0], Task::Draw(draw) if draw.load_op == LoadOp::Load));
    }

    #[test]
    fn test_draws_racing_immutability_are_flushed_or_rejected() {
        let (_, rc) = recorder();
        let device = GraniteDevice::make(&rc, info(), Budgeted::Yes, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "t").unwrap();
        let accepted = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while device.draw_rect(IRect::new(0, 0, 4, 4), &Paint::default()).is_ok() {
                    accepted.fetch_add(1, Ordering::Relaxed);
                }
            });
            while accepted.load(Ordering::Relaxed) < 8 {
                std::thread::yield_now();
            }
            device.set_immutable();
        });

        assert!(device.is_immutable());
        assert_eq!(device.pending_draw_count(), 0);
        assert_eq!(rc.pending_task_count(), accepted.load(Ordering::Relaxed));
    }
}
