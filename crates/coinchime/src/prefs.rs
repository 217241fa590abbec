//! Persisted audio preferences
//!
//! Two kinds of state survive a restart: the mute flag and the volume
//! levels. They live in one small ron file, read once at engine
//! construction and rewritten on every mutating call.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// The persisted slice of mixer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPrefs {
    /// Whether playback is muted
    pub muted: bool,
    /// Master volume, [0, 1]
    pub master_volume: f32,
    /// Sound-effect volume, [0, 1]
    pub sfx_volume: f32,
    /// Music volume, [0, 1]
    pub music_volume: f32,
}

impl Default for AudioPrefs {
    fn default() -> Self {
        Self {
            muted: false,
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
        }
    }
}

impl AudioPrefs {
    /// Load preferences from `path`. A missing file yields the defaults;
    /// a corrupt file is an error so callers can decide whether to reset.
    ///
    /// # Errors
    /// `Prefs` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| AudioError::Prefs(e.to_string()))?;
        ron::from_str(&contents).map_err(|e| AudioError::Prefs(e.to_string()))
    }

    /// Write preferences to `path`, creating parent directories as needed.
    ///
    /// # Errors
    /// `Prefs` if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), AudioError> {
        let contents = ron::ser::to_string_pretty(self, Default::default())
            .map_err(|e| AudioError::Prefs(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AudioError::Prefs(e.to_string()))?;
            }
        }
        std::fs::write(path, contents).map_err(|e| AudioError::Prefs(e.to_string()))
    }
}
