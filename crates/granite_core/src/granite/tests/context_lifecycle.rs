//! Shared context identity, discard and capability scenarios

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use crate::backends::mock::{MockCaps, MockDevice};
use crate::core::config::ContextOptions;
use crate::engine::context_id::INVALID_CONTEXT_ID;
use crate::engine::shared_context::SharedContext;
use crate::engine::types::{BackendApi, ColorType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_contexts_get_distinct_ids() {
        let threads = 8;
        let per_thread = 64;
        let barrier = Barrier::new(threads);

        let ids: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        (0..per_thread)
                            .map(|_| SharedContext::new(BackendApi::Mock, ContextOptions::default()).context_id().get())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(ids.len(), threads * per_thread);
        assert!(ids.iter().all(|id| *id != INVALID_CONTEXT_ID));
        let unique: HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_concurrent_discard_has_one_winner() {
        let context = SharedContext::new(BackendApi::Mock, ContextOptions::default());
        let threads = 16;
        let barrier = Barrier::new(threads);
        let winners = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    barrier.wait();
                    if context.discard() {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::Relaxed), 1);
        assert!(context.is_discarded());
    }

    #[test]
    fn test_renderable_at_4x_reports_format_and_sample_count() {
        let caps = MockCaps::new().with_renderable(ColorType::Rgba8888, 4);
        let shared = SharedContext::make(Arc::new(MockDevice::new(caps)), ContextOptions::default()).unwrap();

        let format = shared.default_backend_format(ColorType::Rgba8888, true);
        assert!(format.is_some());
        assert_eq!(shared.max_surface_sample_count(ColorType::Rgba8888), 4);
        assert_eq!(shared.max_surface_sample_count(ColorType::Bgra8888), 0);
    }
}
