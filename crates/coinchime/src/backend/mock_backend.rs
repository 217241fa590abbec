//! Mock audio backend
//!
//! Implements [`AudioBackend`] without touching any audio device, recording
//! every call so tests can assert on what would have been heard. The state
//! lives behind a shared cell: tests keep a clone of the handle returned by
//! [`MockBackend::state`] after the engine takes ownership of the backend.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{AudioBackend, AudioBackendConfig, PlayParams, SoundHandle};
use crate::error::AudioError;
use crate::sample::SampleData;

/// Snapshot of one `play_samples` call.
#[derive(Debug, Clone)]
pub struct StartedSound {
    /// Handle assigned to the sound
    pub handle: SoundHandle,
    /// Volume at start
    pub volume: f32,
    /// Playback rate at start
    pub speed: f32,
    /// Loop flag
    pub looped: bool,
    /// Channel count of the buffer
    pub channels: u16,
    /// Sample rate of the buffer
    pub sample_rate: u32,
    /// Frame count of the buffer
    pub frames: usize,
}

#[derive(Debug)]
struct MockSound {
    volume: f32,
    paused: bool,
    finished: bool,
    pause_calls: usize,
}

/// Shared observable state of a [`MockBackend`].
#[derive(Debug, Default)]
pub struct MockState {
    /// Every started sound, in start order
    pub started: Vec<StartedSound>,
    /// When set, the next `play_samples` fails (the autoplay-policy analog)
    pub fail_next_play: bool,
    sounds: HashMap<SoundHandle, MockSound>,
    stopped: Vec<SoundHandle>,
}

impl MockState {
    /// Mark a sound as naturally finished.
    pub fn finish(&mut self, handle: SoundHandle) {
        if let Some(sound) = self.sounds.get_mut(&handle) {
            sound.finished = true;
        }
    }

    /// Current volume of a live sound.
    pub fn volume_of(&self, handle: SoundHandle) -> Option<f32> {
        self.sounds.get(&handle).map(|s| s.volume)
    }

    /// Whether a live sound is paused.
    pub fn is_paused(&self, handle: SoundHandle) -> bool {
        self.sounds.get(&handle).is_some_and(|s| s.paused)
    }

    /// How many times `pause` ran against a sound.
    pub fn pause_calls(&self, handle: SoundHandle) -> usize {
        self.sounds.get(&handle).map_or(0, |s| s.pause_calls)
    }

    /// Handles explicitly stopped (not naturally finished).
    pub fn stopped(&self) -> &[SoundHandle] {
        &self.stopped
    }

    /// Number of sounds currently live (started, not stopped).
    pub fn live_count(&self) -> usize {
        self.sounds.len()
    }
}

/// Deviceless backend for tests and headless hosts.
pub struct MockBackend {
    state: Rc<RefCell<MockState>>,
    next_id: u32,
    initialized: bool,
}

impl MockBackend {
    /// Create a mock backend with fresh state.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::default())),
            next_id: 0,
            initialized: false,
        }
    }

    /// Shared handle onto the observable state.
    pub fn state(&self) -> Rc<RefCell<MockState>> {
        Rc::clone(&self.state)
    }

    fn next_handle(&mut self) -> SoundHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        SoundHandle::new(id, 0)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for MockBackend {
    fn initialize(&mut self, _config: &AudioBackendConfig) -> Result<(), AudioError> {
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.stop_all();
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self) {
        let mut state = self.state.borrow_mut();
        state.sounds.retain(|_, s| !s.finished);
    }

    fn stop_all(&mut self) {
        let mut state = self.state.borrow_mut();
        let handles: Vec<SoundHandle> = state.sounds.keys().copied().collect();
        state.stopped.extend(handles);
        state.sounds.clear();
    }

    fn play_samples(
        &mut self,
        data: &SampleData,
        params: PlayParams,
    ) -> Result<SoundHandle, AudioError> {
        if !self.initialized {
            return Err(AudioError::BackendNotInitialized);
        }
        {
            let mut state = self.state.borrow_mut();
            if state.fail_next_play {
                state.fail_next_play = false;
                return Err(AudioError::PlaybackFailed(
                    "playback blocked by platform policy".into(),
                ));
            }
        }

        let handle = self.next_handle();
        let mut state = self.state.borrow_mut();
        state.started.push(StartedSound {
            handle,
            volume: params.volume,
            speed: params.speed,
            looped: params.looped,
            channels: data.channels,
            sample_rate: data.sample_rate,
            frames: data.frames(),
        });
        state.sounds.insert(
            handle,
            MockSound {
                volume: params.volume,
                paused: false,
                finished: false,
                pause_calls: 0,
            },
        );
        Ok(handle)
    }

    fn pause(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let mut state = self.state.borrow_mut();
        let sound = state.sounds.get_mut(&handle).ok_or(AudioError::InvalidHandle)?;
        sound.paused = true;
        sound.pause_calls += 1;
        Ok(())
    }

    fn resume(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let mut state = self.state.borrow_mut();
        let sound = state.sounds.get_mut(&handle).ok_or(AudioError::InvalidHandle)?;
        sound.paused = false;
        Ok(())
    }

    fn stop(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        let mut state = self.state.borrow_mut();
        if state.sounds.remove(&handle).is_some() {
            state.stopped.push(handle);
        }
        Ok(())
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) -> Result<(), AudioError> {
        let mut state = self.state.borrow_mut();
        let sound = state.sounds.get_mut(&handle).ok_or(AudioError::InvalidHandle)?;
        sound.volume = volume;
        Ok(())
    }

    fn get_volume(&self, handle: SoundHandle) -> Result<f32, AudioError> {
        let state = self.state.borrow();
        state
            .sounds
            .get(&handle)
            .map(|s| s.volume)
            .ok_or(AudioError::InvalidHandle)
    }

    fn set_speed(&mut self, handle: SoundHandle, _speed: f32) -> Result<(), AudioError> {
        let state = self.state.borrow();
        if state.sounds.contains_key(&handle) {
            Ok(())
        } else {
            Err(AudioError::InvalidHandle)
        }
    }

    fn is_playing(&self, handle: SoundHandle) -> bool {
        let state = self.state.borrow();
        state
            .sounds
            .get(&handle)
            .is_some_and(|s| !s.paused && !s.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blip() -> SampleData {
        SampleData::new(1, 44_100, vec![0.1; 32])
    }

    #[test]
    fn test_records_started_sounds() {
        let mut backend = MockBackend::new();
        backend.initialize(&AudioBackendConfig::default()).unwrap();

        let handle = backend
            .play_samples(
                &blip(),
                PlayParams {
                    volume: 0.4,
                    speed: 1.5,
                    looped: true,
                },
            )
            .unwrap();

        let state = backend.state();
        let state = state.borrow();
        assert_eq!(state.started.len(), 1);
        assert_eq!(state.started[0].handle, handle);
        assert!((state.started[0].volume - 0.4).abs() < 1e-6);
        assert!(state.started[0].looped);
    }

    #[test]
    fn test_scripted_play_failure() {
        let mut backend = MockBackend::new();
        backend.initialize(&AudioBackendConfig::default()).unwrap();
        backend.state().borrow_mut().fail_next_play = true;

        let result = backend.play_samples(&blip(), PlayParams::default());
        assert!(matches!(result, Err(AudioError::PlaybackFailed(_))));

        // Flag is one-shot.
        assert!(backend.play_samples(&blip(), PlayParams::default()).is_ok());
    }

    #[test]
    fn test_finish_then_update_sweeps() {
        let mut backend = MockBackend::new();
        backend.initialize(&AudioBackendConfig::default()).unwrap();
        let handle = backend.play_samples(&blip(), PlayParams::default()).unwrap();

        assert!(backend.is_playing(handle));
        backend.state().borrow_mut().finish(handle);
        assert!(!backend.is_playing(handle));

        backend.update();
        assert_eq!(backend.state().borrow().live_count(), 0);
    }

    #[test]
    fn test_pause_resume_and_counting() {
        let mut backend = MockBackend::new();
        backend.initialize(&AudioBackendConfig::default()).unwrap();
        let handle = backend.play_samples(&blip(), PlayParams::default()).unwrap();

        backend.pause(handle).unwrap();
        assert!(!backend.is_playing(handle));
        assert_eq!(backend.state().borrow().pause_calls(handle), 1);

        backend.resume(handle).unwrap();
        assert!(backend.is_playing(handle));
    }
}
