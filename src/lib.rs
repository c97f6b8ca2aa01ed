//! Screenshot beautifier core: scene model, compositor, overlay editing
//! engine and export pipeline, all rendered headlessly onto `tiny-skia`
//! surfaces.

pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod scene;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::{AppError, AppResult};

use config::AppConfig;
use export::{ExportJob, ExportSink, FileExportSink, JobStatus};
use render::{Compositor, FontBook, SourceImage};
use scene::Scene;
use state::{SessionEvent, StateMachine};

/// One headless render: source image in, framed export out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub input: PathBuf,
    /// Scene description (JSON); config defaults apply when absent.
    pub scene: Option<PathBuf>,
    /// Defaults to `$HOME/Pictures`.
    pub out_dir: Option<PathBuf>,
}

/// Entrypoint used by the CLI binary.
pub fn run(options: &RunOptions) -> AppResult<PathBuf> {
    logging::init();
    tracing::info!("starting shotframe");
    let config = config::load_app_config();
    run_with_config(options, &config)
}

pub fn run_with_config(options: &RunOptions, config: &AppConfig) -> AppResult<PathBuf> {
    let mut session = StateMachine::new();

    let source = Arc::new(SourceImage::open(&options.input)?);
    session.transition(SessionEvent::LoadImage)?;
    let dims = source.dims();
    tracing::info!(width = dims.width, height = dims.height, "image loaded");

    let scene = load_scene(options.scene.as_deref(), config)?;
    let sink = match &options.out_dir {
        Some(dir) => FileExportSink::with_dir(dir.clone()),
        None => FileExportSink::with_default_dir()?,
    };
    let compositor = Compositor::new(FontBook::system(&config.font_dirs));

    session.transition(SessionEvent::BeginExport)?;
    let job = ExportJob::spawn(compositor, scene, source);
    let result = loop {
        match job.poll() {
            JobStatus::Pending => std::thread::sleep(export::worker::EXPORT_POLL_INTERVAL),
            JobStatus::Done(result) => break result,
        }
    };
    session.transition(SessionEvent::FinishExport)?;

    let path = sink.deliver(&result?)?;
    session.transition(SessionEvent::Close)?;
    tracing::info!(path = %path.display(), state = %session, "run complete");
    Ok(path)
}

fn load_scene(path: Option<&Path>, config: &AppConfig) -> AppResult<Scene> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let scene: Scene = serde_json::from_str(&contents)?;
            tracing::debug!(path = %path.display(), "scene description loaded");
            Ok(scene)
        }
        None => {
            let mut scene = Scene::new();
            config.apply_to(&mut scene);
            Ok(scene)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;
    use crate::scene::{ExportFormat, ExportSettings, PixelMultiplier};
    use image::{Rgba, RgbaImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("shotframe-run-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    #[test]
    fn run_writes_framed_export() {
        let dir = scratch_dir("export");
        let input = dir.join("input.png");
        RgbaImage::from_pixel(20, 10, Rgba([0, 200, 0, 255]))
            .save(&input)
            .expect("write input");

        let config = AppConfig {
            default_padding: Some(5),
            default_background: Some(Color::WHITE),
            export: Some(ExportSettings::new(
                ExportFormat::Png,
                1.0,
                PixelMultiplier::X1,
            )),
            ..AppConfig::default()
        };
        let options = RunOptions {
            input,
            scene: None,
            out_dir: Some(dir.join("out")),
        };
        let path = run_with_config(&options, &config).expect("run");
        assert_eq!(path, dir.join("out").join("screenshot.png"));

        let decoded = image::open(&path).expect("decode export").to_rgba8();
        assert!(decoded.width() >= 30 && decoded.height() >= 20);
        std::fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn scene_file_overrides_config_defaults() {
        let dir = scratch_dir("scene");
        let scene_path = dir.join("scene.json");
        std::fs::write(&scene_path, r#"{ "padding": { "x": 12, "y": 3 } }"#).expect("scene file");

        let config = AppConfig {
            default_padding: Some(40),
            ..AppConfig::default()
        };
        let scene = load_scene(Some(&scene_path), &config).expect("scene loads");
        assert_eq!((scene.padding().x, scene.padding().y), (12, 3));

        std::fs::write(&scene_path, r#"{ "padding": { "x": 4000000000, "y": 3 } }"#)
            .expect("scene file");
        let oversized = load_scene(Some(&scene_path), &config).expect("scene loads");
        assert_eq!(oversized.padding().x, 200);

        let fallback = load_scene(None, &config).expect("default scene");
        assert_eq!(fallback.padding().x, 40);
        std::fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn missing_input_is_reported() {
        let options = RunOptions {
            input: PathBuf::from("/nonexistent/shotframe-input.png"),
            scene: None,
            out_dir: Some(std::env::temp_dir()),
        };
        assert!(run_with_config(&options, &AppConfig::default()).is_err());
    }
}
