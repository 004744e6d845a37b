//! # Shared Context
//!
//! Backend-bound state shared by every recording derived from one logical
//! device: the capability table, the cross-thread cache and the global
//! resource cache.
//!
//! ## Lifecycle
//!
//! A context is constructed without a device. [`SharedContext::init`] runs
//! once the device exists and installs all three shared objects together, so
//! they are either all present or all absent. [`SharedContext::discard`] is a
//! one-shot terminal transition callable from any thread.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::caps::Caps;
use super::context_id::ContextId;
use super::device::Device;
use super::error::{EngineError, EngineResult};
use super::format::BackendFormat;
use super::global_cache::GlobalResourceCache;
use super::thread_safe_cache::PipelineDescCache;
use super::types::{BackendApi, ColorType, CompressionType};
use crate::core::config::ContextOptions;

/// Objects that appear together when the device is attached
#[derive(Debug)]
struct DeviceState {
    device: Arc<dyn Device>,
    caps: Arc<dyn Caps>,
    thread_safe_cache: PipelineDescCache,
    global_cache: GlobalResourceCache,
}

/// Process-visible state for one logical device
#[derive(Debug)]
pub struct SharedContext {
    backend: BackendApi,
    options: ContextOptions,
    context_id: ContextId,
    state: OnceLock<DeviceState>,
    discarded: AtomicBool,
}

impl SharedContext {
    /// Create a context without a device
    pub fn new(backend: BackendApi, options: ContextOptions) -> Self {
        let context_id = ContextId::next();
        log::debug!("[SHARED_CONTEXT] Created context {} for {:?}", context_id, backend);
        Self {
            backend,
            options,
            context_id,
            state: OnceLock::new(),
            discarded: AtomicBool::new(false),
        }
    }

    /// Create and initialize a context in one step
    ///
    /// The returned `Arc` is the only reference that ever existed before
    /// `init`, which is what makes the single `init` call safe.
    pub fn make(device: Arc<dyn Device>, options: ContextOptions) -> EngineResult<Arc<Self>> {
        let context = Self::new(device.backend(), options);
        context.init(device)?;
        Ok(Arc::new(context))
    }

    /// Attach the device and build the shared objects
    pub fn init(&self, device: Arc<dyn Device>) -> EngineResult<()> {
        if device.backend() != self.backend {
            return Err(EngineError::BackendMismatch {
                expected: self.backend,
                actual: device.backend(),
            });
        }

        let caps = device.caps();
        let state = DeviceState {
            thread_safe_cache: PipelineDescCache::new(self.options.thread_safe_cache_capacity),
            global_cache: GlobalResourceCache::new(self.options.resource_budget),
            caps,
            device,
        };
        self.state.set(state).map_err(|_| EngineError::AlreadyInitialized)?;

        log::info!(
            "[SHARED_CONTEXT] Context {} initialized ({:?}, budget {} bytes)",
            self.context_id,
            self.backend,
            self.options.resource_budget
        );
        Ok(())
    }

    /// Whether `init` has completed
    pub fn is_valid(&self) -> bool {
        self.state.get().is_some()
    }

    /// Backend this context is bound to
    pub fn backend(&self) -> BackendApi {
        self.backend
    }

    /// Options fixed at construction
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Unique, nonzero context identifier
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Capability table, `None` before `init`
    pub fn caps(&self) -> Option<&Arc<dyn Caps>> {
        self.state.get().map(|s| &s.caps)
    }

    /// Cross-thread cache, `None` before `init`
    pub fn thread_safe_cache(&self) -> Option<&PipelineDescCache> {
        self.state.get().map(|s| &s.thread_safe_cache)
    }

    /// Global resource cache, `None` before `init`
    pub fn global_resource_cache(&self) -> Option<&GlobalResourceCache> {
        self.state.get().map(|s| &s.global_cache)
    }

    /// Device, `None` before `init`
    pub fn device(&self) -> Option<&Arc<dyn Device>> {
        self.state.get().map(|s| &s.device)
    }

    fn caps_or_warn(&self, query: &str) -> Option<&Arc<dyn Caps>> {
        let caps = self.caps();
        if caps.is_none() {
            log::warn!("[SHARED_CONTEXT] {} on uninitialized context {}", query, self.context_id);
        }
        caps
    }

    /// Default native format for a color type
    ///
    /// The color type is reduced to its public form first. A format returned
    /// for `renderable` is renderable at one sample.
    pub fn default_backend_format(&self, color_type: ColorType, renderable: bool) -> Option<BackendFormat> {
        let caps = self.caps_or_warn("default_backend_format")?;
        let color_type = color_type.to_public();
        let format = caps.default_backend_format(color_type, renderable)?;
        debug_assert!(!renderable || caps.is_format_renderable(color_type, &format, 1));
        Some(format)
    }

    /// Native format for a compression scheme
    ///
    /// A returned format is never external and is always texturable.
    pub fn compressed_backend_format(&self, compression: CompressionType) -> Option<BackendFormat> {
        let caps = self.caps_or_warn("compressed_backend_format")?;
        let format = caps.compressed_backend_format(compression)?;
        debug_assert!(!format.is_external() && caps.is_format_texturable(&format));
        Some(format)
    }

    /// Largest MSAA count for surfaces of `color_type`
    ///
    /// 0 means not renderable at all, 1 means single-sampled only.
    pub fn max_surface_sample_count(&self, color_type: ColorType) -> u32 {
        let Some(caps) = self.caps_or_warn("max_surface_sample_count") else {
            return 0;
        };
        let Some(format) = caps.default_backend_format(color_type.to_public(), true) else {
            return 0;
        };
        caps.max_render_target_sample_count(&format)
    }

    /// Mark the context discarded
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn discard(&self) -> bool {
        let first = self
            .discarded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            log::debug!("[SHARED_CONTEXT] Context {} discarded", self.context_id);
        }
        first
    }

    /// Whether `discard` has run
    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::Acquire)
    }
}

impl PartialEq for SharedContext {
    fn eq(&self, other: &Self) -> bool {
        self.context_id == other.context_id
    }
}

impl Eq for SharedContext {}

impl Hash for SharedContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.context_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockCaps, MockDevice};

    fn mock_device(caps: MockCaps) -> Arc<dyn Device> {
        Arc::new(MockDevice::new(caps))
    }

    #[test]
    fn test_uninitialized_context_returns_sentinels() {
        let context = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        assert!(!context.is_valid());
        assert!(context.caps().is_none());
        assert!(context.default_backend_format(ColorType::Rgba8888, false).is_none());
        assert_eq!(context.max_surface_sample_count(ColorType::Rgba8888), 0);
    }

    #[test]
    fn test_init_installs_everything_together() {
        let context = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        context.init(mock_device(MockCaps::all_supported())).unwrap();
        assert!(context.is_valid());
        assert!(context.caps().is_some());
        assert!(context.thread_safe_cache().is_some());
        assert!(context.global_resource_cache().is_some());
        assert!(context.device().is_some());
    }

    #[test]
    fn test_second_init_rejected() {
        let context = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        context.init(mock_device(MockCaps::all_supported())).unwrap();
        let again = context.init(mock_device(MockCaps::all_supported()));
        assert!(matches!(again, Err(EngineError::AlreadyInitialized)));
    }

    #[test]
    fn test_backend_mismatch_rejected() {
        let context = SharedContext::new(BackendApi::Vulkan, ContextOptions::default());
        let result = context.init(mock_device(MockCaps::all_supported()));
        assert!(matches!(
            result,
            Err(EngineError::BackendMismatch { expected: BackendApi::Vulkan, actual: BackendApi::Mock })
        ));
        assert!(!context.is_valid());
    }

    #[test]
    fn test_discard_is_one_shot() {
        let context = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        assert!(!context.is_discarded());
        assert!(context.discard());
        assert!(!context.discard());
        assert!(context.is_discarded());
    }

    #[test]
    fn test_internal_color_type_has_no_default_format() {
        let context = SharedContext::make(
            mock_device(MockCaps::all_supported()),
            ContextOptions::default(),
        )
        .unwrap();
        assert!(context.default_backend_format(ColorType::Rgba8888, true).is_some());
        assert!(context.default_backend_format(ColorType::R8xxx, false).is_none());
    }

    #[test]
    fn test_non_renderable_color_type_has_zero_samples() {
        let caps = MockCaps::new().with_texturable(ColorType::Gray8);
        let context = SharedContext::make(mock_device(caps), ContextOptions::default()).unwrap();
        assert!(context.default_backend_format(ColorType::Gray8, false).is_some());
        assert!(context.default_backend_format(ColorType::Gray8, true).is_none());
        assert_eq!(context.max_surface_sample_count(ColorType::Gray8), 0);
    }

    #[test]
    fn test_compressed_format_lookup() {
        let caps = MockCaps::new().with_compression(CompressionType::Bc1Rgba8Unorm);
        let context = SharedContext::make(mock_device(caps), ContextOptions::default()).unwrap();
        let format = context.compressed_backend_format(CompressionType::Bc1Rgba8Unorm).unwrap();
        assert_eq!(format.compression_type(), CompressionType::Bc1Rgba8Unorm);
        assert!(context.compressed_backend_format(CompressionType::Etc2Rgb8Unorm).is_none());
    }

    #[test]
    fn test_equality_by_context_id() {
        let a = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        let b = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        assert_eq!(a, a);
        assert_ne!(a, b);
    }
}
