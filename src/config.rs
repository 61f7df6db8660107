use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

const APP_DIR: &str = "tagshelf";
const CONFIG_FILE: &str = "config.json";

/// User settings, stored as JSON in the platform config directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// File extensions (without the dot) that count as videos
    pub video_extensions: Vec<String>,
    /// Sub-directory next to the videos that holds cover images
    pub cover_dir: String,
    pub batch_size: usize,
    /// Scroll fraction past which the next batch is loaded
    pub scroll_threshold: f32,
    pub check_delay_ms: u64,
    pub tile_width: f32,
    pub tile_gap: f32,
    /// Size of a "find similar" result
    pub similar_count: usize,
    pub show_thumbnails: bool,
    pub decode_workers: usize,
    /// Executable used to play videos
    pub player_path: String,
    pub last_directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video_extensions: ["mp4", "avi", "mkv", "mov", "wmv"]
                .into_iter()
                .map(String::from)
                .collect(),
            cover_dir: "cover".to_string(),
            batch_size: 24,
            scroll_threshold: 0.6,
            check_delay_ms: 50,
            tile_width: 330.0,
            tile_gap: 5.0,
            similar_count: 15,
            show_thumbnails: true,
            decode_workers: std::thread::available_parallelism()
                .map(|n| n.get().clamp(1, 4))
                .unwrap_or(2),
            player_path: "mpv".to_string(),
            last_directory: None,
        }
    }
}

impl AppConfig {
    /// `<config_dir>/tagshelf/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location. Never fails: a missing file gives the
    /// defaults and a broken one is reported and replaced by the defaults.
    pub fn load() -> Self {
        let mut config = match Self::default_path() {
            Some(path) => match Self::load_from(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("{}; using defaults", e);
                    Self::default()
                }
            },
            None => {
                warn!("no configuration directory on this platform; using defaults");
                Self::default()
            }
        };

        if let Ok(player) = std::env::var("TAGSHELF_PLAYER") {
            debug!("player overridden from environment: {}", player);
            config.player_path = player;
        }

        config
    }

    /// Load from an explicit path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("no configuration at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!("loaded configuration from {}", path.display());
        Ok(config.sanitized())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e| ConfigError::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, content).map_err(io_err)?;

        debug!("saved configuration to {}", path.display());
        Ok(())
    }

    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ms)
    }

    /// Box a decoded cover must fit in: the tile minus its gaps, 3:2 portrait
    pub fn cover_box(&self) -> (u32, u32) {
        let width = (self.tile_width - 2.0 * self.tile_gap).max(1.0);
        (width as u32, (width / 1.5).max(1.0) as u32)
    }

    /// True if `ext` (no dot) is one of the configured video extensions
    pub fn is_video_extension(&self, ext: &str) -> bool {
        self.video_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }

    /// Pull hand-edited values back into workable ranges
    fn sanitized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.scroll_threshold = if self.scroll_threshold.is_finite() {
            self.scroll_threshold.clamp(0.0, 1.0)
        } else {
            Self::default().scroll_threshold
        };
        self.decode_workers = self.decode_workers.max(1);
        if !(self.tile_width.is_finite() && self.tile_width > 2.0 * self.tile_gap) {
            self.tile_width = Self::default().tile_width;
            self.tile_gap = Self::default().tile_gap;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.player_path = "/usr/bin/vlc".to_string();
        config.last_directory = Some(PathBuf::from("/videos"));
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "batch_size": 0, "similar_count": 5 }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.similar_count, 5);
        assert_eq!(config.cover_dir, "cover");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_cover_box_and_extensions() {
        let config = AppConfig::default();
        assert_eq!(config.cover_box(), (320, 213));
        assert!(config.is_video_extension("MKV"));
        assert!(!config.is_video_extension("txt"));
    }
}
