//! Relief viewer
//!
//! Renders the stock editor scene for a fixed number of frames on the
//! headless device while replaying a scripted editor session. An optional
//! first argument names a TOML or RON configuration file.

mod demo_scene;
mod script;

use std::time::Duration;

use relief_engine::assets::AssetLibrary;
use relief_engine::core::config::{ApplicationConfig, Config};
use relief_engine::foundation::time::FrameTimer;
use relief_engine::input::{InputManager, KeyCode};
use relief_engine::render::backends::HeadlessDevice;
use relief_engine::render::{PipelinePrograms, ProgramLibrary, RenderPipeline};

const DEFAULT_CONFIG: &str = "relief_viewer.toml";

const MESH_SHADER: &str = include_str!("../shaders/mesh.glsl");
const RELIEF_SHADER: &str = include_str!("../shaders/relief.glsl");
const LIGHT_SHADER: &str = include_str!("../shaders/light.glsl");
const BLOOM_SHADER: &str = include_str!("../shaders/bloom.glsl");
const FORWARD_SHADER: &str = include_str!("../shaders/forward.glsl");
const DEFERRED_SHADER: &str = include_str!("../shaders/deferred.glsl");

fn load_programs(device: &mut HeadlessDevice, names: &PipelinePrograms) -> Result<ProgramLibrary, Box<dyn std::error::Error>> {
    let mut library = ProgramLibrary::new();
    for (name, source) in [
        (&names.mesh, MESH_SHADER),
        (&names.relief, RELIEF_SHADER),
        (&names.light, LIGHT_SHADER),
        (&names.bloom, BLOOM_SHADER),
        (&names.forward, FORWARD_SHADER),
        (&names.deferred, DEFERRED_SHADER),
    ] {
        library.load(device, name, source)?;
    }
    Ok(library)
}

fn run(config: &ApplicationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut device = HeadlessDevice::new();

    let names = PipelinePrograms::default();
    let mut programs = load_programs(&mut device, &names)?;
    let mut assets = AssetLibrary::new(&mut device, &config.run.assets_dir)?;
    let mut scene = demo_scene::build(&mut assets, &mut device);

    let mut pipeline = RenderPipeline::new(&mut device, config, names)?;
    let info = pipeline.device_info();
    log::info!("Device: {} ({}), {}", info.renderer, info.vendor, info.version);
    log::info!("Shading language: {}", info.shading_language_version);

    let mut input = InputManager::new();
    let mut script = script::Script::new();
    let mut timer = FrameTimer::new();
    let step = Duration::from_secs_f32(config.run.fixed_delta);

    for frame in 0..config.run.frames {
        script.apply(frame, &mut input, &mut pipeline)?;
        let state = input.end_frame();
        if state.is_key_down(KeyCode::Escape) {
            log::info!("Escape pressed, stopping");
            break;
        }

        timer.advance(step);
        pipeline.update(&mut device, &state, timer.delta_time(), &mut scene)?;
        pipeline.render(&mut device, &scene, &mut assets, &programs)?;

        if timer.frame_count() % 60 == 0 {
            log::info!(
                "Frame {} | {:.1} fps (avg {:.1}) | {:.2} ms | camera at {:?}",
                timer.frame_count(),
                timer.fps(),
                timer.average_fps(),
                timer.frame_time_ms(),
                pipeline.camera().position()
            );
        }
    }

    let (width, height) = pipeline.size();
    log::info!("Rendered {} frames at {}x{}", timer.frame_count(), width, height);

    pipeline.destroy(&mut device);
    programs.destroy(&mut device);
    assets.destroy(&mut device);

    for error in device.validation_errors() {
        log::warn!("Device validation: {}", error);
    }
    if device.live_object_count() > 0 {
        log::warn!("{} device objects still alive at shutdown", device.live_object_count());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {:?}", panic_info);

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = ApplicationConfig::load_or_default(&path)?;
    config.validate()?;
    log::info!("Starting relief viewer with {} ({} frames)", path, config.run.frames);

    run(&config).map_err(|e| {
        log::error!("Viewer failed: {}", e);
        e
    })
}
