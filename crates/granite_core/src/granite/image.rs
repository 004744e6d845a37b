//! Read-only images backed by GPU textures

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::device::GraniteDevice;
use crate::engine::resource::TextureRef;
use crate::engine::types::ImageInfo;

/// Texture plus its logical size and color type
///
/// Snapshots own a fresh copy. Views created by
/// [`GraniteDevice::make_image_view`] alias the device's target and stay
/// linked to it until the device becomes immutable.
#[derive(Debug)]
pub struct GraniteImage {
    texture: Arc<TextureRef>,
    info: ImageInfo,
    device_link: Mutex<Option<Weak<GraniteDevice>>>,
}

impl GraniteImage {
    /// Image owning (a share of) `texture`
    pub fn new(texture: Arc<TextureRef>, info: ImageInfo) -> Self {
        Self {
            texture,
            info,
            device_link: Mutex::new(None),
        }
    }

    pub(crate) fn linked(texture: Arc<TextureRef>, info: ImageInfo, device: Weak<GraniteDevice>) -> Self {
        Self {
            texture,
            info,
            device_link: Mutex::new(Some(device)),
        }
    }

    /// Backing texture
    pub fn texture(&self) -> &Arc<TextureRef> {
        &self.texture
    }

    /// Logical size and color type
    pub fn image_info(&self) -> ImageInfo {
        self.info
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Whether the image still tracks a mutable device
    pub fn is_linked_to_device(&self) -> bool {
        self.device_link.lock().is_some()
    }

    /// Called before work reads this image
    ///
    /// A linked, still-mutable device is flushed so its pending draws land
    /// before the read. Once the device is immutable or gone, the link is
    /// dropped for good.
    pub fn notify_in_use(&self) {
        let mut link = self.device_link.lock();
        let Some(device) = link.as_ref().and_then(Weak::upgrade) else {
            *link = None;
            return;
        };
        if device.is_immutable() {
            log::trace!("[IMAGE] Device is immutable, unlinking");
            *link = None;
            return;
        }
        drop(link);
        if let Err(e) = device.flush_pending_work() {
            log::warn!("[IMAGE] Flushing linked device failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockCaps, MockDevice};
    use crate::core::config::ContextOptions;
    use crate::engine::resource::Budgeted;
    use crate::engine::shared_context::SharedContext;
    use crate::engine::types::{ColorType, LoadOp, SurfaceOrigin};
    use crate::granite::paint::Paint;
    use crate::granite::recording::RecordingContext;

    fn device() -> (Arc<RecordingContext>, Arc<GraniteDevice>) {
        let mock = Arc::new(MockDevice::new(MockCaps::all_supported()));
        let shared = SharedContext::make(mock, ContextOptions::default()).unwrap();
        let rc = RecordingContext::new(shared).unwrap();
        let info = ImageInfo::new(32, 32, ColorType::Rgba8888);
        let device = GraniteDevice::make(&rc, info, Budgeted::No, false, false, SurfaceOrigin::UpperLeft, LoadOp::Clear, "view").unwrap();
        (rc, device)
    }

    #[test]
    fn test_linked_view_flushes_mutable_device() {
        let (rc, device) = device();
        let view = device.make_image_view().unwrap();
        assert!(view.is_linked_to_device());
        assert!(Arc::ptr_eq(view.texture(), &device.target().texture().unwrap()));

        device.draw_paint(&Paint::default()).unwrap();
        view.notify_in_use();
        assert_eq!(device.pending_draw_count(), 0);
        assert_eq!(rc.pending_task_count(), 1);
        assert!(view.is_linked_to_device());
    }

    #[test]
    fn test_view_unlinks_from_immutable_device() {
        let (_, device) = device();
        let view = device.make_image_view().unwrap();
        device.set_immutable();
        view.notify_in_use();
        assert!(!view.is_linked_to_device());
    }

    #[test]
    fn test_view_unlinks_from_dropped_device() {
        let (_, device) = device();
        let view = device.make_image_view().unwrap();
        drop(device);
        view.notify_in_use();
        assert!(!view.is_linked_to_device());
        assert_eq!(view.width(), 32);
    }
}
