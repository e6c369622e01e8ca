use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::editor::DEFAULT_CANVAS_BOUNDS;
use crate::geometry::PixelSize;

const APP_DIR: &str = "shotpad";
const APP_CONFIG_FILE: &str = "config.json";

/// Optional operator overrides read from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub(crate) data_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) pictures_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) canvas: Option<CanvasConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct CanvasConfig {
    pub(crate) max_width: u32,
    pub(crate) max_height: u32,
}

impl AppConfig {
    /// Canvas fitting bounds, falling back to the built-in default when the
    /// override is absent or degenerate.
    pub(crate) fn canvas_bounds(&self) -> PixelSize {
        match self.canvas {
            Some(canvas) if canvas.max_width > 0 && canvas.max_height > 0 => {
                PixelSize::new(canvas.max_width, canvas.max_height)
            }
            Some(canvas) => {
                tracing::warn!(?canvas, "ignoring empty canvas bounds override");
                DEFAULT_CANVAS_BOUNDS
            }
            None => DEFAULT_CANVAS_BOUNDS,
        }
    }
}

/// Loads `config.json`, falling back to defaults when it is absent or broken.
pub(crate) fn load_app_config() -> AppConfig {
    let xdg = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    load_config_from(config_file_path(xdg.as_deref(), home.as_deref()))
}

fn load_config_from(path: Option<PathBuf>) -> AppConfig {
    let Some(path) = path else {
        return AppConfig::default();
    };
    if !path.exists() {
        return AppConfig::default();
    }

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(?err, ?path, "config file could not be read; using defaults");
            return AppConfig::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(?err, ?path, "config file is not valid JSON; using defaults");
        AppConfig::default()
    })
}

/// `$XDG_CONFIG_HOME/shotpad/config.json`, else `$HOME/.config/shotpad/config.json`.
fn config_file_path(xdg_config_home: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let root = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home?.join(".config"),
    };
    Some(root.join(APP_DIR).join(APP_CONFIG_FILE))
}
