use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Viewer tuning knobs, read once at startup from `config.toml` in the
/// platform config directory. Anything missing falls back to the defaults
/// below; an unreadable or invalid file is ignored with a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Lower zoom bound.
    pub min_zoom: f32,
    /// Upper zoom bound.
    pub max_zoom: f32,
    /// Multiplicative step for zoom in/out.
    pub zoom_step: f32,
    /// Padding between and around laid-out pages, in canvas points.
    pub page_padding: f32,
    /// Extra margin beyond the viewport within which pages are pre-rendered.
    pub lookahead: f32,
    /// Quiet period before a resize triggers fit-width, in milliseconds.
    pub resize_debounce_ms: u64,
    /// Optional window icon image.
    pub icon_path: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.2,
            max_zoom: 5.0,
            zoom_step: 1.25,
            page_padding: 40.0,
            lookahead: 800.0,
            resize_debounce_ms: 200,
            icon_path: None,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let payload = match std::fs::read_to_string(path) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(?err, ?path, "failed to read config file, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&payload) {
            Ok(config) => config,
            Err(err) => {
                warn!(?err, ?path, "invalid config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ViewerConfig::load(&dir.path().join("config.toml"));
        assert_eq!(config.max_zoom, 5.0);
        assert_eq!(config.resize_debounce_ms, 200);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_zoom = 8.0\nlookahead = 400.0\n").unwrap();

        let config = ViewerConfig::load(&path);
        assert_eq!(config.max_zoom, 8.0);
        assert_eq!(config.lookahead, 400.0);
        assert_eq!(config.min_zoom, 0.2);
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_zoom = \"fast\"").unwrap();

        let config = ViewerConfig::load(&path);
        assert_eq!(config.max_zoom, 5.0);
    }

    #[test]
    fn clamp_zoom_respects_bounds() {
        let config = ViewerConfig::default();
        assert_eq!(config.clamp_zoom(0.01), config.min_zoom);
        assert_eq!(config.clamp_zoom(9.0), config.max_zoom);
        assert_eq!(config.clamp_zoom(1.0), 1.0);
    }
}
