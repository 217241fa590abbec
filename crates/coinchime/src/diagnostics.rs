//! Structured diagnostic events
//!
//! The engine never propagates playback failures to callers; instead every
//! recovered failure is reported here so the host application (and the test
//! suite) can observe what happened without scraping log output. Hosts
//! install an observer with [`crate::engine::SoundEngine::set_diagnostics_callback`].

use crate::engine::InstanceId;
use crate::registry::SoundId;

/// A recovered, non-fatal condition inside the sound engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No loadable asset for this sound; playback fell back to synthesis.
    AssetUnavailable {
        /// The sound that had no registered pool
        sound: SoundId,
    },
    /// The platform refused a playback attempt; the instance was dropped.
    PlaybackRejected {
        /// The sound whose start was refused
        sound: SoundId,
        /// Backend-provided reason
        reason: String,
    },
    /// Reverb was requested on an instance whose output is already committed.
    EffectUnavailable {
        /// The instance the effect could not be applied to
        instance: InstanceId,
    },
    /// A preset name had no entry in the preset table.
    UnknownPreset {
        /// The name as given by the caller
        name: String,
    },
    /// A group name had no entry in the group table.
    UnknownGroup {
        /// The name as given by the caller
        name: String,
    },
}

/// Observer callback for diagnostic events.
///
/// Single-threaded by design, matching the engine's cooperative model.
pub type DiagnosticsCb = Box<dyn Fn(&Diagnostic)>;
