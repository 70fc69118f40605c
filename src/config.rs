use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::playback::looping::{LoopCount, LoopMode};

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seek: SeekConfig,
    pub looping: LoopConfig,
    pub progress: ProgressConfig,
    pub remote: RemoteConfig,
    pub player: PlayerConfig,
}

/// Constants used by the smart-seek heuristic (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    pub default_backtrack: f64,
    pub gap_threshold: f64,
    pub max_backtrack: f64,
    pub boundary_pad: f64,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            default_backtrack: 0.12,
            gap_threshold: 0.35,
            max_backtrack: 1.0,
            boundary_pad: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub mode: LoopMode,
    pub count: LoopCount,
    pub auto_next: bool,
    pub video_loop: bool,
    /// How far before a line's end the repeat fires
    pub end_margin: f64,
    /// How far before the video's end the whole-video loop fires
    pub video_end_margin: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            mode: LoopMode::Continuous,
            count: LoopCount::One,
            auto_next: false,
            video_loop: false,
            end_margin: 0.1,
            video_end_margin: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub save_interval_secs: u64,
    pub min_save_gap_secs: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: 30,
            min_save_gap_secs: 2.0,
        }
    }
}

impl ProgressConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    pub fn min_save_gap(&self) -> Duration {
        Duration::from_secs_f64(self.min_save_gap_secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: String,
    pub user_id: String,
    pub timeout_secs: u64,
    pub recordings_bucket: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: String::new(),
            user_id: String::new(),
            timeout_secs: 10,
            recordings_bucket: "recordings".to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub mpv_path: String,
    /// Step used by the offset adjustment keys (seconds)
    pub offset_step: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_path: "mpv".to_string(),
            offset_step: 0.05,
        }
    }
}

impl Config {
    /// Load the config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let seek = &self.seek;
        for (field, value) in [
            ("seek.default_backtrack", seek.default_backtrack),
            ("seek.gap_threshold", seek.gap_threshold),
            ("seek.max_backtrack", seek.max_backtrack),
            ("seek.boundary_pad", seek.boundary_pad),
            ("looping.end_margin", self.looping.end_margin),
            ("looping.video_end_margin", self.looping.video_end_margin),
            ("progress.min_save_gap_secs", self.progress.min_save_gap_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }

        if self.progress.save_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "progress.save_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("sublearn-tui").join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}

pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sublearn-tui")
        .join("sublearn.log")
}

pub const DEFAULT_CONFIG: &str = r#"# sublearn-tui configuration

[seek]
# Seconds to step back before a line when the gap to the previous line is small
default_backtrack = 0.12
# Gaps at least this long allow a deeper backtrack into the silence
gap_threshold = 0.35
# Upper bound for the deeper backtrack
max_backtrack = 1.0
# Never land closer than this to the previous line's end
boundary_pad = 0.03

[looping]
# continuous or single
mode = "continuous"
# one, two, three or infinite
count = "one"
# Advance to the next line after the repetitions are used up
auto_next = false
# Restart the whole video when it reaches the end
video_loop = false
end_margin = 0.1
video_end_margin = 0.5

[progress]
# Save watch position every N seconds while playing
save_interval_secs = 30
# Never save more than once in this window
min_save_gap_secs = 2.0

[remote]
# PostgREST-compatible backend; may also come from SUBLEARN_URL etc.
url = ""
anon_key = ""
access_token = ""
user_id = ""
timeout_secs = 10
recordings_bucket = "recordings"

[player]
mpv_path = "mpv"
offset_step = 0.05
"#;
