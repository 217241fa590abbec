//! Error types for the sound engine
//!
//! These errors circulate between the backend, the asset pipeline and the
//! engine internals. The public playback surface absorbs them: a failed
//! `play` degrades to a diagnostic event, never to an `Err` at a call site.

/// Errors produced by the audio subsystem
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    /// Backend used before `initialize` succeeded
    #[error("audio backend not initialized")]
    BackendNotInitialized,

    /// Backend failed to start (no output device, device busy, ...)
    #[error("audio backend initialization failed: {0}")]
    BackendInitFailed(String),

    /// A playback attempt was refused by the platform
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// Handle does not correspond to an active sound
    #[error("invalid sound handle")]
    InvalidHandle,

    /// Fetched bytes could not be decoded as audio
    #[error("failed to decode audio data: {0}")]
    DecodeFailed(String),

    /// Asset store I/O failure
    #[error("asset store error: {0}")]
    Store(#[from] std::io::Error),

    /// Preferences file could not be parsed or written
    #[error("preferences error: {0}")]
    Prefs(String),
}
