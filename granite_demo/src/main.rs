//! Granite headless demo
//!
//! Records on two threads against one shared context using the mock backend,
//! then prints what the caches ended up holding.
//!
//! Usage: `granite_demo [config.toml|config.ron]`

use std::sync::Arc;
use std::thread;

use granite_core::foundation::logging;
use granite_core::prelude::*;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Surface creation failed for '{0}'")]
    Surface(String),

    #[error("Snapshot of '{0}' failed")]
    Snapshot(String),

    #[error("Recording thread panicked")]
    ThreadPanicked,
}

fn load_config() -> Result<GraniteConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => GraniteConfig::load_from_file(&path)?,
        None => GraniteConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Draw a small scene on one recording thread
fn record_scene(shared: Arc<SharedContext>, name: &str, tint: [f32; 4]) -> Result<Recording, DemoError> {
    let recorder = RecordingContext::new(shared)?;
    let info = ImageInfo::new(512, 384, ColorType::Rgba8888);
    let surface = GraniteSurface::make_render_target(&recorder, info, false, SurfaceOrigin::UpperLeft, Some(name))
        .ok_or_else(|| DemoError::Surface(name.to_string()))?;

    let canvas = surface.canvas();
    canvas.clear([0.1, 0.1, 0.1, 1.0])?;

    let gradient = Shader::linear_gradient(
        [0.0, 0.0],
        [512.0, 0.0],
        &[tint, [1.0, 1.0, 1.0, 1.0], tint],
        None,
        TileMode::Mirror,
    );
    if let Some(gradient) = gradient {
        canvas.draw_rect(IRect::new(32, 32, 480, 192), &Paint::default().with_shader(gradient))?;
    }
    canvas.draw_rect(
        IRect::new(64, 224, 448, 352),
        &Paint::new([tint[0], tint[1], tint[2], 0.5]).with_blend_mode(BlendMode::Multiply),
    )?;
    surface.flush()?;

    let snapshot = surface
        .new_image_snapshot(Some(IRect::new(0, 0, 256, 192)))
        .ok_or_else(|| DemoError::Snapshot(name.to_string()))?;
    log::info!("[{}] Snapshot {}x{}", name, snapshot.width(), snapshot.height());

    drop(surface);
    Ok(recorder.snap())
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting Granite demo");

    let device = Arc::new(MockDevice::new(MockCaps::all_supported()));
    let shared = SharedContext::make(device.clone(), config.context.clone())?;
    log::info!(
        "Shared context {} ready, max Rgba8888 samples: {}",
        shared.context_id(),
        shared.max_surface_sample_count(ColorType::Rgba8888)
    );

    let scenes = [("left", [1.0, 0.3, 0.2, 1.0]), ("right", [0.2, 0.4, 1.0, 1.0])];
    let handles: Vec<_> = scenes
        .into_iter()
        .map(|(name, tint)| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || record_scene(shared, name, tint))
        })
        .collect();

    for handle in handles {
        let recording = handle.join().map_err(|_| DemoError::ThreadPanicked)??;
        println!(
            "Recording for context {}: {} tasks, {} pipelines",
            recording.context_id(),
            recording.tasks().len(),
            recording.pipelines().len()
        );
    }

    if let Some(cache) = shared.global_resource_cache() {
        println!(
            "Global cache: {} pipelines, {} budgeted textures ({} bytes), {} idle",
            cache.pipeline_count(),
            cache.resource_count(),
            cache.budgeted_bytes(),
            cache.idle_count()
        );
        cache.purge_scratch();
    }
    println!(
        "Backend: {} images allocated, {} pipelines compiled",
        device.images_created(),
        device.pipelines_compiled()
    );

    shared.discard();
    log::info!("Granite demo finished");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
