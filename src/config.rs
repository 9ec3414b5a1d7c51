//! Session configuration
//!
//! A [`SessionConfig`] is chosen once at construction and never mutated
//! afterwards. It can be built in code or loaded from a TOML file.

use crate::errors::CameraError;
use crate::types::{Position, ResolutionPreset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settle delay applied after a device replacement when none is configured.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

const MAX_SETTLE_DELAY_MS: u64 = 10_000;

/// Immutable capture parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Resolution preset applied when the session is created
    pub preset: ResolutionPreset,
    /// Device position selected at startup
    pub position: Position,
    /// Attach an audio input alongside video
    pub audio_enabled: bool,
    /// Attach the still photo output
    pub photo_enabled: bool,
    /// Attach the code/metadata detection output
    pub metadata_enabled: bool,
    /// Wait after a device replacement before preview frames resume
    pub settle_delay_ms: u64,
}

impl SessionConfig {
    /// The standard configuration: back camera, high preset, photo output on,
    /// audio and metadata detection off.
    pub fn standard() -> Self {
        Self {
            preset: ResolutionPreset::High,
            position: Position::Back,
            audio_enabled: false,
            photo_enabled: true,
            metadata_enabled: false,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_preset(mut self, preset: ResolutionPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.audio_enabled = enabled;
        self
    }

    pub fn with_photo(mut self, enabled: bool) -> Self {
        self.photo_enabled = enabled;
        self
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.metadata_enabled = enabled;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CameraError> {
        toml::from_str(contents).map_err(|e| {
            CameraError::InitializationError(format!("Failed to parse config: {}", e))
        })
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::standard());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::InitializationError(format!("Failed to read config file: {}", e))
        })?;

        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded session configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::InitializationError(format!(
                    "Failed to create config directory: {}",
                    e
                ))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::InitializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CameraError::InitializationError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved session configuration to {:?}", path);
        Ok(())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("camera-session.toml")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.settle_delay_ms == 0 || self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(format!(
                "Settle delay must be between 1 and {} ms",
                MAX_SETTLE_DELAY_MS
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::standard()
    }
}
