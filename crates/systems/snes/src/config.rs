//! Renderer configuration, stored as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gfx_core::graphics::{PixelFormat, ScreenGeometry};
use gfx_core::logging::{log, LogCategory, LogConfig, LogLevel};

use crate::capture::CaptureConfig;
use crate::ConfigError;

/// Logging options applied to the global [`LogConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Global level ("off", "error", "warn", "info", "debug", "trace").
    pub level: String,
    /// Per-category overrides, e.g. `"capture": "debug"`.
    pub categories: Vec<(String, String)>,
    /// Messages per second per category, 0 for unlimited.
    pub rate_limit: usize,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            categories: Vec::new(),
            rate_limit: 0,
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub pixel_format: PixelFormat,
    pub geometry: ScreenGeometry,
    /// Master enable for color math.
    pub transparency: bool,
    /// Packed color used for every backdrop fill.
    pub forced_backdrop: Option<u16>,
    pub capture: CaptureConfig,
    pub logging: LogSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb565,
            geometry: ScreenGeometry::default(),
            transparency: true,
            forced_backdrop: None,
            capture: CaptureConfig::default(),
            logging: LogSettings::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        log(LogCategory::Config, LogLevel::Info, || {
            format!("Loaded render config from {}", path.display())
        });
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.width == 0 || g.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "geometry {}x{} has no pixels",
                g.width, g.height
            )));
        }
        if g.width < 256 {
            return Err(ConfigError::Invalid(format!(
                "buffer width {} is narrower than a scanline",
                g.width
            )));
        }
        if self.capture.milestones.contains(&0) {
            return Err(ConfigError::Invalid(
                "capture milestones start at 1".to_string(),
            ));
        }
        if LogLevel::from_str(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        for (category, level) in &self.logging.categories {
            if LogCategory::from_str(category).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown log category '{}'",
                    category
                )));
            }
            if LogLevel::from_str(level).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown log level '{}' for {}",
                    level, category
                )));
            }
        }
        Ok(())
    }

    /// Push the logging section into the global log configuration.
    pub fn apply_logging(&self) -> Result<(), ConfigError> {
        let settings = &self.logging;
        let logs = LogConfig::global();
        if let Some(level) = LogLevel::from_str(&settings.level) {
            logs.set_global_level(level);
        }
        for (category, level) in &settings.categories {
            if let (Some(category), Some(level)) =
                (LogCategory::from_str(category), LogLevel::from_str(level))
            {
                logs.set_level(category, level);
            }
        }
        logs.set_rate_limit(settings.rate_limit);
        match &settings.file {
            Some(path) => logs.set_log_file(path.clone())?,
            None => logs.clear_log_file(),
        }
        log(LogCategory::Config, LogLevel::Info, || {
            format!("Log level set to {}", settings.level)
        });
        Ok(())
    }
}
