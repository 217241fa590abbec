//! Rodio audio backend implementation
//!
//! Uses the Rodio library for cross-platform audio playback. Each playing
//! sound owns one `Sink`; the engine hands this backend fully decoded
//! sample buffers, so no file or decoder state lives here.
//!
//! # Example
//!
//! ```no_run
//! use coinchime::backend::{AudioBackend, AudioBackendConfig, PlayParams};
//! use coinchime::backend::rodio_backend::RodioBackend;
//! use coinchime::sample::SampleData;
//!
//! let mut backend = RodioBackend::new();
//! backend.initialize(&AudioBackendConfig::default()).unwrap();
//!
//! let beep = SampleData::new(1, 44_100, vec![0.0; 4410]);
//! let handle = backend.play_samples(&beep, PlayParams::default()).unwrap();
//!
//! backend.set_volume(handle, 0.5).unwrap();
//! backend.update(); // sweeps finished sounds
//! backend.shutdown();
//! ```

use std::collections::HashMap;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioBackend, AudioBackendConfig, PlayParams, SoundHandle};
use crate::error::AudioError;
use crate::sample::SampleData;

/// Rodio-based audio backend
pub struct RodioBackend {
    /// Audio output stream (must be kept alive)
    _output_stream: Option<OutputStream>,
    /// Output stream handle for creating sinks
    stream_handle: Option<OutputStreamHandle>,
    /// Active sound sinks
    active_sounds: HashMap<SoundHandle, Sink>,
    /// Next sound ID for handle generation
    next_id: u32,
    /// Initialization state
    initialized: bool,
}

impl RodioBackend {
    /// Create a new Rodio backend
    pub fn new() -> Self {
        Self {
            _output_stream: None,
            stream_handle: None,
            active_sounds: HashMap::new(),
            next_id: 0,
            initialized: false,
        }
    }

    /// Generate a new sound handle
    fn next_handle(&mut self) -> SoundHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        SoundHandle::new(id, 0)
    }
}

impl AudioBackend for RodioBackend {
    fn initialize(&mut self, _config: &AudioBackendConfig) -> Result<(), AudioError> {
        if self.initialized {
            return Ok(());
        }

        // Create output stream
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            AudioError::BackendInitFailed(format!("Failed to create audio output: {e}"))
        })?;

        self._output_stream = Some(stream);
        self.stream_handle = Some(stream_handle);
        self.initialized = true;

        log::info!("Rodio audio backend initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        self.stop_all();
        self.stream_handle = None;
        self._output_stream = None;
        self.initialized = false;

        log::info!("Rodio audio backend shutdown");
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self) {
        // Remove finished sounds
        self.active_sounds.retain(|_handle, sink| !sink.empty());
    }

    fn stop_all(&mut self) {
        for (_handle, sink) in self.active_sounds.drain() {
            sink.stop();
        }
    }

    fn play_samples(
        &mut self,
        data: &SampleData,
        params: PlayParams,
    ) -> Result<SoundHandle, AudioError> {
        let stream_handle = self
            .stream_handle
            .as_ref()
            .ok_or(AudioError::BackendNotInitialized)?;

        // Create sink for this sound
        let sink = Sink::try_new(stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to create sink: {e}")))?;

        sink.set_volume(params.volume.clamp(0.0, 1.0));
        if (params.speed - 1.0).abs() > f32::EPSILON {
            sink.set_speed(params.speed);
        }

        let buffer = SamplesBuffer::new(
            data.channels.max(1),
            data.sample_rate,
            data.samples.clone(),
        );
        if params.looped {
            sink.append(buffer.repeat_infinite());
        } else {
            sink.append(buffer);
        }

        // Generate handle and store sink
        let handle = self.next_handle();
        self.active_sounds.insert(handle, sink);

        Ok(handle)
    }

    fn pause(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let sink = self
            .active_sounds
            .get(&handle)
            .ok_or(AudioError::InvalidHandle)?;
        sink.pause();
        Ok(())
    }

    fn resume(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let sink = self
            .active_sounds
            .get(&handle)
            .ok_or(AudioError::InvalidHandle)?;
        sink.play();
        Ok(())
    }

    /// Stop succeeds even if the handle is unknown (idempotent).
    fn stop(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        if let Some(sink) = self.active_sounds.remove(&handle) {
            sink.stop();
        }
        Ok(())
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) -> Result<(), AudioError> {
        let sink = self
            .active_sounds
            .get(&handle)
            .ok_or(AudioError::InvalidHandle)?;
        sink.set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    fn get_volume(&self, handle: SoundHandle) -> Result<f32, AudioError> {
        let sink = self
            .active_sounds
            .get(&handle)
            .ok_or(AudioError::InvalidHandle)?;
        Ok(sink.volume())
    }

    fn set_speed(&mut self, handle: SoundHandle, speed: f32) -> Result<(), AudioError> {
        let sink = self
            .active_sounds
            .get(&handle)
            .ok_or(AudioError::InvalidHandle)?;
        sink.set_speed(speed.max(0.01));
        Ok(())
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        self.active_sounds
            .get(&handle)
            .map(|sink| !sink.is_paused() && !sink.empty())
            .unwrap_or(false)
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}
