//! # Recording Context
//!
//! Per-thread state for issuing work against a [`SharedContext`]. Devices
//! hand their draws to the recording context when flushed; [`RecordingContext::snap`]
//! collects everything recorded so far into a [`Recording`] for the
//! submission thread.
//!
//! Within one recording context tasks keep issue order. Nothing orders tasks
//! across recording contexts.

use std::sync::Arc;

use parking_lot::Mutex;

use super::pipeline::generate_pipeline_desc;
use super::stage_registry::StageRegistry;
use crate::engine::context_id::ContextId;
use crate::engine::device::Device;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::global_cache::GlobalResourceCache;
use crate::engine::resource::{Budgeted, GraphicsPipeline, PipelineKey, TextureRef};
use crate::engine::shared_context::SharedContext;
use crate::engine::thread_safe_cache::PipelineDescCache;
use crate::engine::types::{IRect, ImageDesc, LoadOp};

/// A draw into a render target
#[derive(Debug)]
pub struct DrawTask {
    /// Render target
    pub target: Arc<TextureRef>,
    /// Pipeline to bind
    pub pipeline: Arc<GraphicsPipeline>,
    /// Fragment uniform block contents
    pub uniform_data: Vec<u8>,
    /// Covered pixels
    pub bounds: IRect,
    /// How the target's contents are treated before this draw
    pub load_op: LoadOp,
}

/// A texture-to-texture copy
#[derive(Debug)]
pub struct CopyTask {
    /// Source texture
    pub src: Arc<TextureRef>,
    /// Region of `src` to copy
    pub src_rect: IRect,
    /// Destination texture, written at the origin
    pub dst: Arc<TextureRef>,
}

/// One unit of recorded GPU work
#[derive(Debug)]
pub enum Task {
    /// Draw
    Draw(DrawTask),
    /// Copy
    Copy(CopyTask),
}

/// Work snapped from a recording context, ready for submission
#[derive(Debug)]
pub struct Recording {
    context_id: ContextId,
    tasks: Vec<Task>,
    pipelines: Vec<Arc<GraphicsPipeline>>,
}

impl Recording {
    /// Shared context the work was recorded against
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Tasks in issue order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Distinct pipelines the tasks bind
    pub fn pipelines(&self) -> &[Arc<GraphicsPipeline>] {
        &self.pipelines
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    tasks: Vec<Task>,
    pipelines: Vec<Arc<GraphicsPipeline>>,
}

/// Per-thread recorder bound to one shared context
#[derive(Debug)]
pub struct RecordingContext {
    shared: Arc<SharedContext>,
    registry: &'static StageRegistry,
    state: Mutex<RecordingState>,
}

impl RecordingContext {
    /// Recorder using the process-wide stage registry
    pub fn new(shared: Arc<SharedContext>) -> EngineResult<Arc<Self>> {
        Self::with_registry(shared, StageRegistry::global())
    }

    /// Recorder using `registry`
    pub fn with_registry(shared: Arc<SharedContext>, registry: &'static StageRegistry) -> EngineResult<Arc<Self>> {
        if !shared.is_valid() {
            return Err(EngineError::NotInitialized);
        }
        if shared.is_discarded() {
            return Err(EngineError::Discarded);
        }
        log::debug!("[RECORDING] New recording context on shared context {}", shared.context_id());
        Ok(Arc::new(Self {
            shared,
            registry,
            state: Mutex::new(RecordingState::default()),
        }))
    }

    /// Shared context this recorder feeds
    pub fn shared_context(&self) -> &Arc<SharedContext> {
        &self.shared
    }

    /// Stage registry used for pipeline assembly
    pub fn registry(&self) -> &'static StageRegistry {
        self.registry
    }

    fn device_state(&self) -> EngineResult<(&Arc<dyn Device>, &PipelineDescCache, &GlobalResourceCache)> {
        if self.shared.is_discarded() {
            return Err(EngineError::Discarded);
        }
        match (
            self.shared.device(),
            self.shared.thread_safe_cache(),
            self.shared.global_resource_cache(),
        ) {
            (Some(device), Some(descs), Some(resources)) => Ok((device, descs, resources)),
            _ => Err(EngineError::NotInitialized),
        }
    }

    /// Compiled pipeline for `key`
    ///
    /// Shader generation goes through the cross-thread cache and compilation
    /// through the global resource cache, so each runs once per key.
    pub fn find_or_create_pipeline(&self, key: &PipelineKey) -> EngineResult<Arc<GraphicsPipeline>> {
        let (device, descs, resources) = self.device_state()?;

        let pipeline = resources.find_or_create_pipeline(key, || {
            let desc = descs.find_or_insert_with(key, || generate_pipeline_desc(self.registry, key))?;
            let backend = device.create_graphics_pipeline(&desc)?;
            Ok(GraphicsPipeline::new(key.clone(), desc, backend))
        })?;

        let mut state = self.state.lock();
        if !state.pipelines.iter().any(|p| Arc::ptr_eq(p, &pipeline)) {
            state.pipelines.push(Arc::clone(&pipeline));
        }
        Ok(pipeline)
    }

    /// Texture from the global resource cache
    pub fn create_texture(&self, desc: &ImageDesc, budgeted: Budgeted, label: &str) -> EngineResult<TextureRef> {
        let (device, _, resources) = self.device_state()?;
        resources.find_or_create_texture(device.as_ref(), desc, budgeted, label)
    }

    /// Append a task
    pub fn add_task(&self, task: Task) {
        self.state.lock().tasks.push(task);
    }

    /// Tasks recorded since the last snap
    pub fn pending_task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Take everything recorded so far
    pub fn snap(&self) -> Recording {
        let state = std::mem::take(&mut *self.state.lock());
        log::debug!(
            "[RECORDING] Snapped {} tasks using {} pipelines",
            state.tasks.len(),
            state.pipelines.len()
        );
        Recording {
            context_id: self.shared.context_id(),
            tasks: state.tasks,
            pipelines: state.pipelines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockCaps, MockDevice};
    use crate::core::config::ContextOptions;
    use crate::engine::format::BackendFormat;
    use crate::engine::types::{BackendApi, ColorType};
    use crate::granite::builtin_stages::BuiltinStageId;

    fn shared() -> (Arc<MockDevice>, Arc<SharedContext>) {
        let device = Arc::new(MockDevice::new(MockCaps::all_supported()));
        let shared = SharedContext::make(device.clone(), ContextOptions::default()).unwrap();
        (device, shared)
    }

    fn solid_key() -> PipelineKey {
        PipelineKey::new(
            vec![BuiltinStageId::SolidColorShader.id()],
            BackendFormat::mock(ColorType::Rgba8888),
            1,
        )
    }

    #[test]
    fn test_requires_initialized_context() {
        let shared = Arc::new(SharedContext::new(BackendApi::Mock, ContextOptions::default()));
        assert!(matches!(RecordingContext::new(shared), Err(EngineError::NotInitialized)));
    }

    #[test]
    fn test_pipeline_compiled_once_per_key() {
        let (device, shared) = shared();
        let recorder = RecordingContext::new(shared.clone()).unwrap();
        let a = recorder.find_or_create_pipeline(&solid_key()).unwrap();
        let b = recorder.find_or_create_pipeline(&solid_key()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(device.pipelines_compiled(), 1);
        assert_eq!(shared.thread_safe_cache().unwrap().len(), 1);

        let recording = recorder.snap();
        assert_eq!(recording.pipelines().len(), 1);
        assert_eq!(recording.context_id(), shared.context_id());
    }

    #[test]
    fn test_bad_key_is_not_cached() {
        let (device, shared) = shared();
        let recorder = RecordingContext::new(shared.clone()).unwrap();
        let key = PipelineKey::new(vec![11], BackendFormat::mock(ColorType::Rgba8888), 1);
        assert!(matches!(recorder.find_or_create_pipeline(&key), Err(EngineError::UnknownStage(11))));
        assert_eq!(device.pipelines_compiled(), 0);
        assert_eq!(shared.global_resource_cache().unwrap().pipeline_count(), 0);
    }

    #[test]
    fn test_discarded_context_refuses_work() {
        let (_, shared) = shared();
        let recorder = RecordingContext::new(shared.clone()).unwrap();
        shared.discard();
        assert!(matches!(recorder.find_or_create_pipeline(&solid_key()), Err(EngineError::Discarded)));
        assert!(matches!(RecordingContext::new(shared), Err(EngineError::Discarded)));
    }

    #[test]
    fn test_snap_drains_tasks() {
        let (_, shared) = shared();
        let recorder = RecordingContext::new(shared).unwrap();
        let desc = ImageDesc::new(BackendFormat::mock(ColorType::Rgba8888), 8, 8, false, false);
        let src = Arc::new(recorder.create_texture(&desc, Budgeted::Yes, "src").unwrap());
        let dst = Arc::new(recorder.create_texture(&desc, Budgeted::Yes, "dst").unwrap());
        recorder.add_task(Task::Copy(CopyTask {
            src,
            src_rect: IRect::from_size(8, 8),
            dst,
        }));
        assert_eq!(recorder.pending_task_count(), 1);
        let recording = recorder.snap();
        assert_eq!(recording.tasks().len(), 1);
        assert!(recorder.snap().is_empty());
    }
}
