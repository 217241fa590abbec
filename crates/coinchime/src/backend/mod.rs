//! Audio backend implementations
//!
//! Platform-independent abstraction over audio output. The engine drives
//! everything through [`AudioBackend`]; [`rodio_backend::RodioBackend`] is
//! the production implementation and [`mock_backend::MockBackend`] backs
//! the test suite and headless hosts.
//!
//! Deliberately NOT `Send + Sync`: the whole engine is single-threaded and
//! event-driven, so handles and sinks never cross threads.

pub mod mock_backend;
pub mod rodio_backend;

use crate::error::AudioError;
use crate::sample::SampleData;

/// Handle for tracking one playing sound inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle {
    /// Unique identifier for the sound
    pub id: u32,
    /// Generation counter for handle validation
    pub generation: u32,
}

impl SoundHandle {
    /// Create a new sound handle
    pub fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}

/// Per-start playback parameters, applied before the first sample plays.
#[derive(Debug, Clone, Copy)]
pub struct PlayParams {
    /// Initial volume, [0, 1]
    pub volume: f32,
    /// Playback-rate multiplier (1.0 = normal pitch)
    pub speed: f32,
    /// Repeat the buffer indefinitely
    pub looped: bool,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            speed: 1.0,
            looped: false,
        }
    }
}

/// Audio backend trait for platform abstraction
pub trait AudioBackend {
    /// Initialize the audio backend
    fn initialize(&mut self, config: &AudioBackendConfig) -> Result<(), AudioError>;

    /// Shutdown the audio backend
    fn shutdown(&mut self);

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Update the backend (cleanup finished sounds, etc.)
    fn update(&mut self);

    /// Stop all playing sounds
    fn stop_all(&mut self);

    /// Start playback of a decoded sample buffer.
    ///
    /// # Errors
    /// - `BackendNotInitialized` if called before `initialize`
    /// - `PlaybackFailed` if the platform refuses the playback attempt
    fn play_samples(
        &mut self,
        data: &SampleData,
        params: PlayParams,
    ) -> Result<SoundHandle, AudioError>;

    /// Pause a playing sound
    fn pause(&mut self, handle: SoundHandle) -> Result<(), AudioError>;

    /// Resume a paused sound
    fn resume(&mut self, handle: SoundHandle) -> Result<(), AudioError>;

    /// Stop a sound and release its handle
    fn stop(&mut self, handle: SoundHandle) -> Result<(), AudioError>;

    /// Set volume of a sound
    fn set_volume(&mut self, handle: SoundHandle, volume: f32) -> Result<(), AudioError>;

    /// Get volume of a sound
    fn get_volume(&self, handle: SoundHandle) -> Result<f32, AudioError>;

    /// Set the playback-rate multiplier of a sound
    fn set_speed(&mut self, handle: SoundHandle, speed: f32) -> Result<(), AudioError>;

    /// Check if a sound is playing (started, not paused, not finished)
    fn is_playing(&self, handle: SoundHandle) -> bool;
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of output channels (1=mono, 2=stereo)
    pub channels: u16,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Create and initialize the default audio backend for the platform.
///
/// # Errors
/// `BackendInitFailed` when no output device is available; hosts typically
/// fall back to [`mock_backend::MockBackend`] and keep the UI silent.
pub fn create_backend(config: &AudioBackendConfig) -> Result<Box<dyn AudioBackend>, AudioError> {
    let mut backend = Box::new(rodio_backend::RodioBackend::new());
    backend.initialize(config)?;
    Ok(backend)
}
