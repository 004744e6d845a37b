//! Concurrent recorders assembling identical pipelines

use std::sync::{Arc, Barrier};
use std::time::Duration;

use crate::backends::mock::{MockCaps, MockDevice};
use crate::core::config::ContextOptions;
use crate::engine::format::BackendFormat;
use crate::engine::resource::{Budgeted, GraphicsPipeline, PipelineKey};
use crate::engine::shared_context::SharedContext;
use crate::engine::types::{ColorType, ImageInfo, LoadOp, SurfaceOrigin};
use crate::granite::blend::BlendMode;
use crate::granite::paint::{Paint, Shader, TileMode};
use crate::granite::recording::{RecordingContext, Task};
use crate::granite::stage_registry::FIRST_FIXED_BLEND_STAGE_ID;
use crate::granite::surface::GraniteSurface;

fn slow_context() -> (Arc<MockDevice>, Arc<SharedContext>) {
    let device = Arc::new(MockDevice::new(MockCaps::all_supported()).with_compile_delay(Duration::from_millis(25)));
    let shared = SharedContext::make(device.clone(), ContextOptions::default()).unwrap();
    (device, shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_recorders_share_one_compiled_pipeline() {
        let (device, shared) = slow_context();
        let key = PipelineKey::new(
            vec![2, 5, FIRST_FIXED_BLEND_STAGE_ID + 3],
            BackendFormat::mock(ColorType::Rgba8888),
            1,
        );
        let barrier = Barrier::new(2);

        let pipelines: Vec<Arc<GraphicsPipeline>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        let recorder = RecordingContext::new(shared.clone()).unwrap();
                        barrier.wait();
                        recorder.find_or_create_pipeline(&key).unwrap();
                        let recording = recorder.snap();
                        assert_eq!(recording.pipelines().len(), 1);
                        Arc::clone(&recording.pipelines()[0])
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(Arc::ptr_eq(&pipelines[0], &pipelines[1]));
        assert_eq!(pipelines[0].key(), &key);
        assert_eq!(device.pipelines_compiled(), 1);
        assert_eq!(shared.global_resource_cache().unwrap().pipeline_count(), 1);
        assert_eq!(shared.thread_safe_cache().unwrap().len(), 1);
    }

    #[test]
    fn test_surfaces_on_many_threads_reuse_paint_pipelines() {
        let (device, shared) = slow_context();
        let threads = 4;
        let barrier = Barrier::new(threads);

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    let recorder = RecordingContext::new(shared.clone()).unwrap();
                    let info = ImageInfo::new(32, 32, ColorType::Rgba8888);
                    let surface = GraniteSurface::make(
                        &recorder,
                        info,
                        Budgeted::Yes,
                        false,
                        true,
                        SurfaceOrigin::UpperLeft,
                        LoadOp::Clear,
                        "worker",
                    )
                    .unwrap();
                    let gradient = Shader::linear_gradient(
                        [0.0, 0.0],
                        [32.0, 0.0],
                        &[[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
                        None,
                        TileMode::Clamp,
                    )
                    .unwrap();

                    barrier.wait();
                    let canvas = surface.canvas();
                    canvas.draw_paint(&Paint::default().with_shader(gradient)).unwrap();
                    canvas.draw_paint(&Paint::new([0.0, 1.0, 0.0, 0.5]).with_blend_mode(BlendMode::Multiply)).unwrap();
                    surface.flush().unwrap();

                    let recording = recorder.snap();
                    assert_eq!(recording.tasks().len(), 2);
                    assert!(recording.tasks().iter().all(|task| matches!(task, Task::Draw(_))));
                });
            }
        });

        assert_eq!(device.pipelines_compiled(), 2);
        assert_eq!(shared.global_resource_cache().unwrap().pipeline_count(), 2);
    }
}
