//! # Engine Configuration
//!
//! Window, renderer and logging settings grouped under one serializable
//! root. Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::math::Color;

/// Root engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window creation settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config for EngineConfig {}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Client area width in screen coordinates
    pub width: u32,
    /// Client area height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
    /// Synchronize buffer swaps with the display refresh
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ember Application".to_string(),
            width: 800,
            height: 600,
            resizable: true,
            vsync: true,
        }
    }
}

impl WindowConfig {
    /// Create a window configuration with a title and size
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Self::default()
        }
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Background clear color
    pub clear_color: Color,
    /// Query the driver error state after every GPU call and log failures
    pub diagnostics: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::rgb(16, 16, 20),
            diagnostics: cfg!(debug_assertions),
        }
    }
}

/// # Logging Configuration
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "ember_engine=debug").
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter; `RUST_LOG` is used when absent
    pub filter: Option<String>,
    /// Append-only file receiving warnings and errors
    pub log_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let path = path.to_str().unwrap();

        let mut config = EngineConfig::default();
        config.window = WindowConfig::new("Shapes", 1024, 768);
        config.logging.log_file = Some("errors.log".to_string());
        config.save_to_file(path).unwrap();

        let loaded = EngineConfig::load_from_file(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        std::fs::write(&path, "(window: (title: \"Partial\"))").unwrap();

        let loaded = EngineConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.window.title, "Partial");
        assert_eq!(loaded.window.width, 800);
        assert_eq!(loaded.renderer, RendererConfig::default());
    }

    #[test]
    fn test_unsupported_extension_falls_back() {
        assert!(matches!(
            EngineConfig::load_from_file("engine.ini"),
            Err(crate::config::ConfigError::Io(_) | crate::config::ConfigError::UnsupportedFormat(_))
        ));
        assert_eq!(EngineConfig::load_or_default("does/not/exist.toml"), EngineConfig::default());
    }
}
