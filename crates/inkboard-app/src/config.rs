//! Application configuration.

use inkboard_core::{Brush, DEFAULT_REFRESH_INTERVAL_SECS, Rgba8, SurfaceStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "inkboard";

/// Smallest allowed refresh interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;
/// Largest canvas edge in pixels.
pub const MAX_CANVAS_EDGE: u32 = inkboard_core::MAX_RASTER_EDGE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("No backend URL configured (set backend_url or INKBOARD_URL)")]
    MissingBackend,
}

/// Drawing canvas settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: Rgba8,
    pub brush_color: Rgba8,
    pub brush_width: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 300,
            background: Rgba8::white(),
            brush_color: Rgba8::black(),
            brush_width: 2.0,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub backend_url: String,
    /// Public (anonymous) API key.
    pub anon_key: String,
    pub poll_interval_secs: u64,
    pub canvas: CanvasConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            anon_key: String::new(),
            poll_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            canvas: CanvasConfig::default(),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/inkboard/config.toml`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join("config.toml"))
    }

    /// `<data_dir>/inkboard/session.json`
    pub fn session_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(APP_DIR).join("session.json"))
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config file not found, using defaults");
            log::debug!("Expected config at: {}", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate_and_clamp();

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override backend settings from `INKBOARD_URL` / `INKBOARD_ANON_KEY`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("INKBOARD_URL").filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(key) = lookup("INKBOARD_ANON_KEY").filter(|v| !v.is_empty()) {
            self.anon_key = key;
        }
    }

    /// Clamp values to usable ranges:
    /// - `poll_interval_secs`: at least 5
    /// - `canvas.width`, `canvas.height`: 1 - 4096
    /// - `canvas.brush_width`: 0.5 - 64.0
    /// - `canvas.background`: forced opaque
    pub fn validate_and_clamp(&mut self) {
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            log::warn!(
                "Invalid poll_interval_secs {}, raising to {}",
                self.poll_interval_secs,
                MIN_POLL_INTERVAL_SECS
            );
            self.poll_interval_secs = MIN_POLL_INTERVAL_SECS;
        }

        let canvas = &mut self.canvas;
        if !(1..=MAX_CANVAS_EDGE).contains(&canvas.width) {
            log::warn!("Invalid canvas width {}, clamping to 1-{} range", canvas.width, MAX_CANVAS_EDGE);
            canvas.width = canvas.width.clamp(1, MAX_CANVAS_EDGE);
        }
        if !(1..=MAX_CANVAS_EDGE).contains(&canvas.height) {
            log::warn!("Invalid canvas height {}, clamping to 1-{} range", canvas.height, MAX_CANVAS_EDGE);
            canvas.height = canvas.height.clamp(1, MAX_CANVAS_EDGE);
        }

        if !(0.5..=64.0).contains(&canvas.brush_width) {
            log::warn!("Invalid brush_width {:.1}, clamping to 0.5-64.0 range", canvas.brush_width);
            canvas.brush_width = if canvas.brush_width.is_nan() {
                CanvasConfig::default().brush_width
            } else {
                canvas.brush_width.clamp(0.5, 64.0)
            };
        }

        if !canvas.background.is_opaque() {
            log::warn!("Canvas background must be opaque, ignoring alpha");
            canvas.background = canvas.background.opaque();
        }
    }

    /// Fails when no backend URL is configured.
    pub fn require_backend(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::MissingBackend);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn surface_style(&self) -> SurfaceStyle {
        SurfaceStyle {
            background: self.canvas.background,
            brush: Brush {
                color: self.canvas.brush_color,
                width: self.canvas.brush_width,
            },
        }
    }
}
