//! Mixer state
//!
//! Master, SFX and music volumes plus the persisted mute flag. Volumes are
//! read at schedule time only: changing a volume affects the next playback
//! call, not instances already running (fade ramps capture their targets
//! when scheduled).

use crate::prefs::AudioPrefs;

/// Volume group categories for independent volume control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeGroup {
    /// Master volume (applies to everything)
    Master,
    /// Sound effects
    Sfx,
    /// Background music
    Music,
}

/// Mixer holding group volumes and the mute flag.
#[derive(Debug, Clone)]
pub struct Mixer {
    master: f32,
    sfx: f32,
    music: f32,
    muted: bool,
}

impl Mixer {
    /// Create a mixer from persisted preferences.
    pub fn from_prefs(prefs: &AudioPrefs) -> Self {
        Self {
            master: prefs.master_volume.clamp(0.0, 1.0),
            sfx: prefs.sfx_volume.clamp(0.0, 1.0),
            music: prefs.music_volume.clamp(0.0, 1.0),
            muted: prefs.muted,
        }
    }

    /// Snapshot the mixer into a persistable preferences value.
    pub fn to_prefs(&self) -> AudioPrefs {
        AudioPrefs {
            muted: self.muted,
            master_volume: self.master,
            sfx_volume: self.sfx,
            music_volume: self.music,
        }
    }

    /// Set volume for a group, clamped to [0, 1].
    pub fn set_volume(&mut self, group: VolumeGroup, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        match group {
            VolumeGroup::Master => self.master = clamped,
            VolumeGroup::Sfx => self.sfx = clamped,
            VolumeGroup::Music => self.music = clamped,
        }
    }

    /// Get the stored volume for a group.
    pub fn volume(&self, group: VolumeGroup) -> f32 {
        match group {
            VolumeGroup::Master => self.master,
            VolumeGroup::Sfx => self.sfx,
            VolumeGroup::Music => self.music,
        }
    }

    /// Effective volume for a non-music sound: call x sfx x master.
    pub fn effective_sfx(&self, call_volume: f32) -> f32 {
        (call_volume * self.sfx * self.master).clamp(0.0, 1.0)
    }

    /// Effective volume for music: call x music x master.
    pub fn effective_music(&self, call_volume: f32) -> f32 {
        (call_volume * self.music * self.master).clamp(0.0, 1.0)
    }

    /// Set the mute flag. Muting never touches the stored volumes.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Whether playback is muted.
    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::from_prefs(&AudioPrefs::default())
    }
}
