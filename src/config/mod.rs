use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::editor::Overlay;
use crate::geometry::Color;
use crate::scene::{ExportSettings, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "shotframe";
const APP_CONFIG_FILE: &str = "config.json";

/// Editor defaults from `config.json`. Missing keys keep the scene defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Applied to both axes.
    pub default_padding: Option<i64>,
    pub default_background: Option<Color>,
    pub window_bar_color: Option<Color>,
    pub corner_radius: Option<f32>,
    pub export: Option<ExportSettings>,
    /// Searched in addition to the system font directories.
    pub font_dirs: Vec<PathBuf>,
    pub snap_grid_px: Option<f32>,
}

impl AppConfig {
    /// Seeds a fresh scene with the configured defaults.
    pub fn apply_to(&self, scene: &mut Scene) {
        if let Some(padding) = self.default_padding {
            scene.set_padding(padding, padding);
        }
        if let Some(color) = self.default_background {
            scene.set_solid_background(color);
        }
        if let Some(color) = self.window_bar_color {
            scene.set_window_bar_color(color);
        }
        if let Some(radius) = self.corner_radius {
            scene.set_corner_radius(radius);
        }
        if let Some(settings) = self.export {
            // Re-run the constructor so out-of-range quality is clamped.
            scene.set_export_settings(ExportSettings::new(
                settings.format,
                settings.jpeg_quality(),
                settings.multiplier,
            ));
        }
    }

    /// Turns on grid snapping when a grid size is configured.
    pub fn apply_to_overlay(&self, overlay: &mut Overlay) {
        if let Some(grid) = self.snap_grid_px {
            overlay.set_grid_size(grid);
            overlay.set_snap_to_grid(true);
        }
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(err) => {
            tracing::debug!(%err, "no config directory; using defaults");
            return AppConfig::default();
        }
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Background, ExportFormat, PixelMultiplier};

    fn scratch_root(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("shotframe-config-{name}-{}", std::process::id()));
        dir
    }

    fn write_config(root: &Path, contents: &str) {
        let dir = root.join(APP_DIR);
        std::fs::create_dir_all(&dir).expect("config dir");
        std::fs::write(dir.join(APP_CONFIG_FILE), contents).expect("config file");
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "shotframe",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/shotframe/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path(
            "shotframe",
            "config.json",
            Some(Path::new("")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/shotframe/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("shotframe", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn parses_partial_config() {
        let config: AppConfig = serde_json::from_str(
            r##"{
                "default_padding": 32,
                "default_background": "#112233",
                "export": { "format": "jpeg", "jpeg_quality": 0.8, "multiplier": "1.5" },
                "font_dirs": ["/opt/fonts"]
            }"##,
        )
        .expect("config parses");

        assert_eq!(config.default_padding, Some(32));
        assert_eq!(config.default_background, Some(Color::rgb(0x11, 0x22, 0x33)));
        assert_eq!(config.window_bar_color, None);
        assert_eq!(config.font_dirs, vec![PathBuf::from("/opt/fonts")]);
        let export = config.export.expect("export section");
        assert_eq!(export.format, ExportFormat::Jpeg);
        assert_eq!(export.multiplier, PixelMultiplier::X1_5);
    }

    #[test]
    fn apply_to_seeds_scene_and_clamps() {
        let config = AppConfig {
            default_padding: Some(999),
            default_background: Some(Color::rgb(1, 2, 3)),
            export: serde_json::from_str(
                r#"{ "format": "jpeg", "jpeg_quality": 0.1, "multiplier": "3" }"#,
            )
            .expect("settings"),
            ..AppConfig::default()
        };
        let mut scene = Scene::new();
        config.apply_to(&mut scene);

        assert_eq!(scene.padding().x, 200);
        assert_eq!(scene.padding().y, 200);
        assert!(matches!(
            scene.background(),
            Background::Solid { color } if *color == Color::rgb(1, 2, 3)
        ));
        assert_eq!(scene.export_settings().jpeg_quality(), 0.6);
        assert_eq!(scene.export_settings().multiplier, PixelMultiplier::X3);
    }

    #[test]
    fn snap_grid_enables_overlay_snapping() {
        let mut overlay = Overlay::new();
        AppConfig::default().apply_to_overlay(&mut overlay);
        assert!(!overlay.snap_to_grid());

        let config = AppConfig {
            snap_grid_px: Some(12.0),
            ..AppConfig::default()
        };
        config.apply_to_overlay(&mut overlay);
        assert!(overlay.snap_to_grid());
        assert_eq!(overlay.grid_size(), 12.0);
    }

    #[test]
    fn load_reads_file_and_falls_back_on_bad_json() {
        let root = scratch_root("load");
        write_config(&root, r#"{ "snap_grid_px": 12.0 }"#);
        let config = load_app_config_with(Some(&root), None);
        assert_eq!(config.snap_grid_px, Some(12.0));

        write_config(&root, "{ not json");
        assert_eq!(load_app_config_with(Some(&root), None), AppConfig::default());

        std::fs::remove_dir_all(&root).expect("cleanup");
        assert_eq!(load_app_config_with(Some(&root), None), AppConfig::default());
    }
}
