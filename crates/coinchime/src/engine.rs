//! The playback engine
//!
//! One [`SoundEngine`] instance owns the backend, the pools, the mixer and
//! every piece of playback bookkeeping. It is constructed explicitly by the
//! application's composition root and injected into consumers; there is no
//! global instance.
//!
//! Every public call returns synchronously. Time-driven behavior (start
//! delays, fade ramps, sequences, completion sweeps) advances in
//! [`SoundEngine::update`], which the host calls once per frame.
//!
//! Nothing in the playback path returns an error: a failed start degrades
//! to a diagnostic event and, where possible, a synthesized tone. Audio is
//! an enhancement layer; it must never take the application down with it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;

use crate::backend::{AudioBackend, AudioBackendConfig, PlayParams, SoundHandle};
use crate::compose::{GroupTable, PresetTable, SequenceEntry, SequenceRunner};
use crate::diagnostics::{Diagnostic, DiagnosticsCb};
use crate::effects::{self, ImpulseResponse};
use crate::error::AudioError;
use crate::mixer::{Mixer, VolumeGroup};
use crate::music::{MusicSlot, MUSIC_SWAP_FADE};
use crate::pool::{PoolGrowthPolicy, PoolHandle, PoolManager};
use crate::prefs::AudioPrefs;
use crate::registry::{self, SoundId};
use crate::sample::{self, SampleData};
use crate::store::AssetStore;
use crate::synth;

/// Identifier for one active playback instance.
///
/// Ids are handed out in creation order, which is also the eviction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

/// Per-call playback parameters. Nothing here persists across calls.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackOptions {
    /// Call volume multiplier, combined with sfx/music and master volume
    pub volume: f32,
    /// Repeat until explicitly stopped
    pub looped: bool,
    /// Playback-rate multiplier; `None` plays at recorded pitch
    pub pitch: Option<f32>,
    /// Seconds to wait before the sound becomes audible
    pub delay: f32,
    /// Ramp from silence to the target volume over this many seconds
    pub fade_in: f32,
    /// Stereo pan position in [-1, 1]
    pub pan: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looped: false,
            pitch: None,
            delay: 0.0,
            fade_in: 0.0,
            pan: 0.0,
        }
    }
}

impl PlaybackOptions {
    /// Set the call volume multiplier.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Loop until explicitly stopped.
    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Set the playback-rate multiplier.
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Delay the audible start.
    pub fn with_delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Fade in over the given duration.
    pub fn with_fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds;
        self
    }

    /// Set the stereo pan position.
    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }
}

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ceiling on concurrent active instances; exceeding it evicts the
    /// oldest instance rather than blocking or rejecting
    pub max_active: usize,
    /// Sample rate for synthesized audio and the reverb impulse response
    pub sample_rate: u32,
    /// Where to persist mute/volume preferences; `None` keeps them in memory
    pub prefs_path: Option<PathBuf>,
    /// Pool behavior under concurrent load
    pub growth: PoolGrowthPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_active: 10,
            sample_rate: 44_100,
            prefs_path: None,
            growth: PoolGrowthPolicy::CloneOnDemand,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum InstanceState {
    /// Waiting out the start delay; no backend sound exists yet
    Pending { remaining: f32 },
    /// Ramping from silence up to the target volume
    FadingIn { elapsed: f32, duration: f32 },
    /// Audible at target volume (or paused on top of it)
    Playing,
    /// Ramping to silence, then stopped and deregistered
    FadingOut {
        elapsed: f32,
        duration: f32,
        start_volume: f32,
    },
}

struct ActiveInstance {
    sound: SoundId,
    pool: PoolHandle,
    handle: Option<SoundHandle>,
    source: Arc<SampleData>,
    state: InstanceState,
    paused: bool,
    target_volume: f32,
    volume_now: f32,
    speed: f32,
    looped: bool,
    pan: f32,
    reverb: Option<f32>,
    fade_in: f32,
}

/// A delayed fallback tone. Untracked: synthesized sounds cannot be stopped
/// or faded individually.
struct PendingTone {
    remaining: f32,
    data: SampleData,
    params: PlayParams,
}

/// The sound engine. See the module docs for the ownership model.
pub struct SoundEngine {
    config: EngineConfig,
    backend: Box<dyn AudioBackend>,
    store: Box<dyn AssetStore>,
    pools: PoolManager,
    mixer: Mixer,
    groups: GroupTable,
    presets: PresetTable,
    sequences: SequenceRunner,
    music: MusicSlot,
    reverb_ir: ImpulseResponse,
    active: BTreeMap<u64, ActiveInstance>,
    pending_tones: Vec<PendingTone>,
    next_instance: u64,
    diagnostics: Option<DiagnosticsCb>,
    disposed: bool,
}

impl SoundEngine {
    /// Construct an engine over a backend and an asset store.
    ///
    /// Initializes the backend if the caller has not, loads persisted
    /// preferences (an unreadable prefs file falls back to defaults) and
    /// synthesizes the reverb impulse response.
    ///
    /// # Errors
    /// `BackendInitFailed` if backend initialization fails. Hosts that want
    /// audio to be strictly optional pass a pre-initialized
    /// [`crate::backend::mock_backend::MockBackend`] instead.
    pub fn new(
        config: EngineConfig,
        mut backend: Box<dyn AudioBackend>,
        store: Box<dyn AssetStore>,
    ) -> Result<Self, AudioError> {
        if !backend.is_initialized() {
            backend.initialize(&AudioBackendConfig {
                sample_rate: config.sample_rate,
                channels: 2,
            })?;
        }

        let prefs = match &config.prefs_path {
            Some(path) => AudioPrefs::load(path).unwrap_or_else(|e| {
                log::warn!("audio prefs unreadable, using defaults: {e}");
                AudioPrefs::default()
            }),
            None => AudioPrefs::default(),
        };

        let reverb_ir = ImpulseResponse::generate(config.sample_rate);
        let growth = config.growth;

        Ok(Self {
            config,
            backend,
            store,
            pools: PoolManager::new(growth),
            mixer: Mixer::from_prefs(&prefs),
            groups: GroupTable::with_defaults(),
            presets: PresetTable::with_defaults(),
            sequences: SequenceRunner::default(),
            music: MusicSlot::new(),
            reverb_ir,
            active: BTreeMap::new(),
            pending_tones: Vec::new(),
            next_instance: 0,
            diagnostics: None,
            disposed: false,
        })
    }

    /// Install an observer for recovered failures. Pass `None` to remove.
    pub fn set_diagnostics_callback(&mut self, cb: Option<DiagnosticsCb>) {
        self.diagnostics = cb;
    }

    // ------------------------------------------------------------------
    // Preloading
    // ------------------------------------------------------------------

    /// Resolve, probe, fetch and decode one catalog sound, building its
    /// handle pool. Returns whether the sound is now registered.
    ///
    /// Any failure (probe miss, fetch error, undecodable bytes) leaves the
    /// sound unregistered so playback transparently falls back to
    /// synthesis; nothing is raised to the caller.
    pub fn preload(&mut self, id: SoundId) -> bool {
        if self.disposed {
            return false;
        }
        let spec = registry::spec_for(id);
        if !self.store.probe(&spec.locator) {
            self.report(Diagnostic::AssetUnavailable { sound: id });
            return false;
        }
        let loaded = self
            .store
            .read(&spec.locator)
            .and_then(|bytes| sample::decode_bytes(&bytes));
        match loaded {
            Ok(data) => {
                self.pools.register(id, data, spec.pool_size);
                true
            }
            Err(e) => {
                log::warn!("failed to load asset for {id}: {e}");
                self.report(Diagnostic::AssetUnavailable { sound: id });
                false
            }
        }
    }

    /// Preload the entire catalog. Returns how many sounds registered.
    pub fn preload_all(&mut self) -> usize {
        SoundId::all()
            .iter()
            .filter(|&&id| self.preload(id))
            .count()
    }

    /// Whether a sound has a loaded pool.
    pub fn is_registered(&self, id: SoundId) -> bool {
        self.pools.is_registered(id)
    }

    /// Current pool size for a sound (free and busy handles).
    pub fn pool_size(&self, id: SoundId) -> Option<usize> {
        self.pools.len(id)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Play a sound with its category's default gain.
    pub fn play(&mut self, id: SoundId) -> Option<InstanceId> {
        let gain = registry::spec_for(id).category.base_gain();
        self.play_with(id, PlaybackOptions::default().with_volume(gain))
    }

    /// Play a sound with explicit options.
    ///
    /// Returns the instance id for pooled playback. Returns `None` with no
    /// side effect while muted, and `None` for fallback-synthesized
    /// playback (synthesized sounds are untracked).
    pub fn play_with(&mut self, id: SoundId, options: PlaybackOptions) -> Option<InstanceId> {
        self.play_internal(id, options, false)
    }

    fn play_internal(
        &mut self,
        id: SoundId,
        options: PlaybackOptions,
        music: bool,
    ) -> Option<InstanceId> {
        if self.disposed {
            return None;
        }
        // Muted playback is a complete no-op, not a zero-volume sound.
        if self.mixer.is_muted() {
            return None;
        }

        // Back-pressure by eviction: admission never blocks or rejects.
        while self.active.len() >= self.config.max_active.max(1) {
            if !self.evict_oldest() {
                break;
            }
        }

        let target = if music {
            self.mixer.effective_music(options.volume)
        } else {
            self.mixer.effective_sfx(options.volume)
        };
        let speed = options.pitch.unwrap_or(1.0);

        match self.pools.acquire(id) {
            Some((pool, source)) => {
                let key = self.next_instance;
                self.next_instance += 1;
                self.active.insert(
                    key,
                    ActiveInstance {
                        sound: id,
                        pool,
                        handle: None,
                        source,
                        state: InstanceState::Pending {
                            remaining: options.delay.max(0.0),
                        },
                        paused: false,
                        target_volume: target,
                        volume_now: 0.0,
                        speed,
                        looped: options.looped,
                        pan: options.pan,
                        reverb: None,
                        fade_in: options.fade_in.max(0.0),
                    },
                );
                if options.delay <= 0.0 && !self.start_instance(key) {
                    return None;
                }
                Some(InstanceId(key))
            }
            None => {
                self.report(Diagnostic::AssetUnavailable { sound: id });
                self.synthesize(id, &options, target, speed);
                None
            }
        }
    }

    /// Schedule the procedural stand-in for a sound with no loadable asset.
    fn synthesize(&mut self, id: SoundId, options: &PlaybackOptions, target: f32, speed: f32) {
        let recipe = synth::recipe_for(id);
        let mut data = synth::render(&recipe, self.config.sample_rate, 1.0);
        if options.pan != 0.0 {
            data = effects::apply_pan(&data, options.pan);
        }
        let params = PlayParams {
            volume: target,
            speed,
            looped: options.looped,
        };
        if options.delay > 0.0 {
            self.pending_tones.push(PendingTone {
                remaining: options.delay,
                data,
                params,
            });
        } else if let Err(e) = self.backend.play_samples(&data, params) {
            self.report(Diagnostic::PlaybackRejected {
                sound: id,
                reason: e.to_string(),
            });
        }
    }

    /// Commit a pending instance to the backend.
    fn start_instance(&mut self, key: u64) -> bool {
        let (sound, source, pan, reverb, target, fade_in, speed, looped) =
            match self.active.get(&key) {
                Some(inst) => (
                    inst.sound,
                    Arc::clone(&inst.source),
                    inst.pan,
                    inst.reverb,
                    inst.target_volume,
                    inst.fade_in,
                    inst.speed,
                    inst.looped,
                ),
                None => return false,
            };

        // Effects run buffer-side, before the samples are committed.
        let mut prepared: Option<SampleData> = None;
        if let Some(amount) = reverb {
            prepared = Some(effects::apply_reverb(&source, &self.reverb_ir, amount));
        }
        if pan != 0.0 {
            let panned = match &prepared {
                Some(d) => effects::apply_pan(d, pan),
                None => effects::apply_pan(&source, pan),
            };
            prepared = Some(panned);
        }
        let data: &SampleData = match &prepared {
            Some(d) => d,
            None => &*source,
        };

        let start_volume = if fade_in > 0.0 { 0.0 } else { target };
        let params = PlayParams {
            volume: start_volume,
            speed,
            looped,
        };
        match self.backend.play_samples(data, params) {
            Ok(handle) => {
                if let Some(inst) = self.active.get_mut(&key) {
                    inst.handle = Some(handle);
                    inst.volume_now = start_volume;
                    inst.state = if fade_in > 0.0 {
                        InstanceState::FadingIn {
                            elapsed: 0.0,
                            duration: fade_in,
                        }
                    } else {
                        InstanceState::Playing
                    };
                }
                true
            }
            Err(e) => {
                // Expected on platforms that gate audio behind a user
                // gesture; the next user-triggered call will succeed.
                self.report(Diagnostic::PlaybackRejected {
                    sound,
                    reason: e.to_string(),
                });
                self.deregister(key);
                false
            }
        }
    }

    /// Stop an instance immediately and remove it from the active set.
    pub fn stop(&mut self, instance: InstanceId) {
        self.stop_key(instance.0);
    }

    /// Ramp an instance to silence over `seconds`, then stop it.
    /// A non-positive duration stops immediately, as does an instance that
    /// has not started yet.
    pub fn fade_out(&mut self, instance: InstanceId, seconds: f32) {
        let stop_now = match self.active.get_mut(&instance.0) {
            None => return,
            Some(inst) => {
                if seconds <= 0.0 || inst.handle.is_none() {
                    true
                } else {
                    inst.state = InstanceState::FadingOut {
                        elapsed: 0.0,
                        duration: seconds,
                        start_volume: inst.volume_now,
                    };
                    false
                }
            }
        };
        if stop_now {
            self.stop_key(instance.0);
        }
    }

    /// Stop every active instance and cancel pending sequences and tones.
    pub fn stop_all(&mut self) {
        let keys: Vec<u64> = self.active.keys().copied().collect();
        for key in keys {
            self.stop_key(key);
        }
        self.pending_tones.clear();
        self.sequences.clear();
    }

    /// Number of instances in the active set (pending starts included).
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Play one uniformly-chosen member of a slice of interchangeable ids.
    pub fn play_random(&mut self, ids: &[SoundId], options: PlaybackOptions) -> Option<InstanceId> {
        if ids.is_empty() {
            log::warn!("play_random called with an empty id list");
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..ids.len());
        self.play_with(ids[idx], options)
    }

    /// Play a random member of a named group.
    pub fn play_group(&mut self, name: &str, options: PlaybackOptions) -> Option<InstanceId> {
        let members: Vec<SoundId> = match self.groups.get(name) {
            Some(m) => m.to_vec(),
            None => {
                self.report(Diagnostic::UnknownGroup {
                    name: name.to_string(),
                });
                return None;
            }
        };
        self.play_random(&members, options)
    }

    /// Trigger a named preset: every member is scheduled now, each with its
    /// own relative delay, layering into one composite event.
    pub fn play_preset(&mut self, name: &str) {
        let entries = match self.presets.get(name) {
            Some(preset) => preset.entries.clone(),
            None => {
                self.report(Diagnostic::UnknownPreset {
                    name: name.to_string(),
                });
                return;
            }
        };
        for entry in entries {
            let mut options = PlaybackOptions::default()
                .with_volume(entry.volume)
                .with_delay(entry.delay);
            if let Some(pitch) = entry.pitch {
                options = options.with_pitch(pitch);
            }
            self.play_with(entry.sound, options);
        }
    }

    /// Start a strictly-ordered sequence: each entry's delay elapses before
    /// that entry fires, and the next delay starts counting only then.
    pub fn play_sequence(&mut self, entries: Vec<SequenceEntry>) {
        if self.disposed {
            return;
        }
        let due = self.sequences.start(entries);
        for entry in due {
            self.play_with(
                entry.sound,
                PlaybackOptions::default().with_volume(entry.volume),
            );
        }
    }

    /// Host extension point for the preset table.
    pub fn presets_mut(&mut self) -> &mut PresetTable {
        &mut self.presets
    }

    /// Host extension point for the group table.
    pub fn groups_mut(&mut self) -> &mut GroupTable {
        &mut self.groups
    }

    // ------------------------------------------------------------------
    // Music
    // ------------------------------------------------------------------

    /// Start a background track, looped, fading in over `fade_in` seconds.
    /// Any current track fades out over a fixed short duration, so swaps
    /// read as a crossfade.
    pub fn play_music(&mut self, id: SoundId, fade_in: f32) {
        if self.disposed || self.mixer.is_muted() {
            return;
        }
        if let Some(old) = self.music.take() {
            self.fade_out(old, MUSIC_SWAP_FADE);
        }
        let options = PlaybackOptions::default().looped().with_fade_in(fade_in);
        let instance = self.play_internal(id, options, true);
        self.music.set(instance);
    }

    /// Fade out and clear the current track; no-op when nothing plays.
    pub fn stop_music(&mut self, fade_out: f32) {
        if let Some(current) = self.music.take() {
            self.fade_out(current, fade_out);
        }
    }

    /// Whether a track currently owns the music slot.
    pub fn music_playing(&self) -> bool {
        self.music.is_occupied()
    }

    // ------------------------------------------------------------------
    // Mixer controls
    // ------------------------------------------------------------------

    /// Set master volume, clamped to [0, 1]. Applies to the next playback
    /// call; running instances keep their scheduled volume.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.mixer.set_volume(VolumeGroup::Master, volume);
        self.persist();
    }

    /// Set sound-effect volume, clamped to [0, 1].
    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.mixer.set_volume(VolumeGroup::Sfx, volume);
        self.persist();
    }

    /// Set music volume, clamped to [0, 1].
    pub fn set_music_volume(&mut self, volume: f32) {
        self.mixer.set_volume(VolumeGroup::Music, volume);
        self.persist();
    }

    /// Stored master volume.
    pub fn master_volume(&self) -> f32 {
        self.mixer.volume(VolumeGroup::Master)
    }

    /// Stored sound-effect volume.
    pub fn sfx_volume(&self) -> f32 {
        self.mixer.volume(VolumeGroup::Sfx)
    }

    /// Stored music volume.
    pub fn music_volume(&self) -> f32 {
        self.mixer.volume(VolumeGroup::Music)
    }

    /// Mute playback: pauses every active instance in place and blocks new
    /// playback. Volumes are untouched. Idempotent.
    pub fn mute(&mut self) {
        if self.mixer.is_muted() {
            return;
        }
        self.mixer.set_muted(true);
        self.pause_all();
        self.persist();
    }

    /// Clear the mute flag. Paused instances stay paused until explicitly
    /// resumed or re-triggered; unmuting never bursts old audio back in.
    pub fn unmute(&mut self) {
        self.mixer.set_muted(false);
        self.persist();
    }

    /// Flip the mute flag.
    pub fn toggle_mute(&mut self) {
        if self.mixer.is_muted() {
            self.unmute();
        } else {
            self.mute();
        }
    }

    /// Whether playback is muted.
    pub fn is_muted(&self) -> bool {
        self.mixer.is_muted()
    }

    /// Pause every active instance in place.
    pub fn pause_all(&mut self) {
        let keys: Vec<u64> = self.active.keys().copied().collect();
        for key in keys {
            if let Some(inst) = self.active.get_mut(&key) {
                if inst.paused {
                    continue;
                }
                inst.paused = true;
                if let Some(handle) = inst.handle {
                    let _ = self.backend.pause(handle);
                }
            }
        }
    }

    /// Resume every paused instance.
    pub fn resume_all(&mut self) {
        let keys: Vec<u64> = self.active.keys().copied().collect();
        for key in keys {
            if let Some(inst) = self.active.get_mut(&key) {
                if !inst.paused {
                    continue;
                }
                inst.paused = false;
                if let Some(handle) = inst.handle {
                    let _ = self.backend.resume(handle);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Apply convolution reverb to an instance.
    ///
    /// Succeeds while the instance is still pending its start delay; once
    /// samples are committed to the output the graph cannot be rewired, so
    /// the call reports [`Diagnostic::EffectUnavailable`] and changes
    /// nothing.
    pub fn apply_reverb(&mut self, instance: InstanceId, amount: f32) {
        let applied = match self.active.get_mut(&instance.0) {
            None => {
                log::warn!("apply_reverb: unknown instance");
                return;
            }
            Some(inst) => match inst.state {
                InstanceState::Pending { .. } => {
                    inst.reverb = Some(amount.clamp(0.0, 1.0));
                    true
                }
                _ => false,
            },
        };
        if !applied {
            self.report(Diagnostic::EffectUnavailable { instance });
        }
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advance all time-driven behavior by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.disposed {
            return;
        }
        let dt = dt.max(0.0);

        self.fire_pending_tones(dt);

        let due = self.sequences.advance(dt);
        for entry in due {
            self.play_with(
                entry.sound,
                PlaybackOptions::default().with_volume(entry.volume),
            );
        }

        let keys: Vec<u64> = self.active.keys().copied().collect();
        for key in keys {
            self.update_instance(key, dt);
        }

        self.backend.update();
    }

    fn fire_pending_tones(&mut self, dt: f32) {
        let mut i = 0;
        while i < self.pending_tones.len() {
            self.pending_tones[i].remaining -= dt;
            if self.pending_tones[i].remaining > 0.0 {
                i += 1;
                continue;
            }
            let tone = self.pending_tones.swap_remove(i);
            // A mute that landed during the delay swallows the tone;
            // untracked sounds cannot be paused and resumed.
            if self.mixer.is_muted() {
                continue;
            }
            if let Err(e) = self.backend.play_samples(&tone.data, tone.params) {
                log::debug!("delayed fallback tone dropped: {e}");
            }
        }
    }

    fn update_instance(&mut self, key: u64, dt: f32) {
        let mut set_volume: Option<(SoundHandle, f32)> = None;
        let mut start = false;
        let mut stop_after_fade = false;
        let mut check_finished: Option<SoundHandle> = None;

        match self.active.get_mut(&key) {
            None => return,
            Some(inst) => {
                if inst.paused {
                    return;
                }
                match inst.state {
                    InstanceState::Pending { remaining } => {
                        let remaining = remaining - dt;
                        if remaining <= 0.0 {
                            start = true;
                        } else {
                            inst.state = InstanceState::Pending { remaining };
                        }
                    }
                    InstanceState::FadingIn { elapsed, duration } => {
                        let elapsed = elapsed + dt;
                        let t = if duration > 0.0 {
                            (elapsed / duration).min(1.0)
                        } else {
                            1.0
                        };
                        inst.volume_now = inst.target_volume * t;
                        if let Some(handle) = inst.handle {
                            set_volume = Some((handle, inst.volume_now));
                        }
                        inst.state = if t >= 1.0 {
                            InstanceState::Playing
                        } else {
                            InstanceState::FadingIn { elapsed, duration }
                        };
                    }
                    InstanceState::Playing => {
                        if !inst.looped {
                            check_finished = inst.handle;
                        }
                    }
                    InstanceState::FadingOut {
                        elapsed,
                        duration,
                        start_volume,
                    } => {
                        let elapsed = elapsed + dt;
                        let t = if duration > 0.0 {
                            (elapsed / duration).min(1.0)
                        } else {
                            1.0
                        };
                        inst.volume_now = start_volume * (1.0 - t);
                        if let Some(handle) = inst.handle {
                            set_volume = Some((handle, inst.volume_now));
                        }
                        if t >= 1.0 {
                            stop_after_fade = true;
                        } else {
                            inst.state = InstanceState::FadingOut {
                                elapsed,
                                duration,
                                start_volume,
                            };
                        }
                    }
                }
            }
        }

        if let Some((handle, volume)) = set_volume {
            let _ = self.backend.set_volume(handle, volume);
        }
        if start {
            let _ = self.start_instance(key);
            return;
        }
        if stop_after_fade {
            self.stop_key(key);
            return;
        }
        if let Some(handle) = check_finished {
            if !self.backend.is_playing(handle) {
                // Natural end of a non-looping sound.
                self.deregister(key);
            }
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Tear the engine down: stop everything, drop the pools, shut the
    /// backend down. Further calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.stop_all();
        self.pools.clear();
        self.backend.shutdown();
        self.disposed = true;
        log::info!("sound engine disposed");
    }

    /// Whether `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Stop the oldest active instance to admit a newer one.
    fn evict_oldest(&mut self) -> bool {
        match self.active.keys().next().copied() {
            Some(key) => {
                if let Some(inst) = self.active.get(&key) {
                    log::debug!("active ceiling reached, evicting oldest ({})", inst.sound);
                }
                self.stop_key(key);
                true
            }
            None => false,
        }
    }

    fn stop_key(&mut self, key: u64) {
        if let Some(inst) = self.active.get(&key) {
            if let Some(handle) = inst.handle {
                let _ = self.backend.stop(handle);
            }
        }
        self.deregister(key);
    }

    fn deregister(&mut self, key: u64) {
        if let Some(inst) = self.active.remove(&key) {
            self.pools.release(inst.pool);
            self.music.clear_if(InstanceId(key));
        }
    }

    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::AssetUnavailable { sound } => {
                log::debug!("no loadable asset for {sound}; synthesizing");
            }
            Diagnostic::PlaybackRejected { sound, reason } => {
                log::warn!("playback of {sound} rejected: {reason}");
            }
            Diagnostic::EffectUnavailable { .. } => {
                log::warn!("reverb skipped: instance output already committed");
            }
            Diagnostic::UnknownPreset { name } => {
                log::warn!("unknown preset '{name}'");
            }
            Diagnostic::UnknownGroup { name } => {
                log::warn!("unknown group '{name}'");
            }
        }
        if let Some(cb) = &self.diagnostics {
            cb(&diagnostic);
        }
    }

    fn persist(&self) {
        if let Some(path) = &self.config.prefs_path {
            if let Err(e) = self.mixer.to_prefs().save(path) {
                log::warn!("failed to persist audio prefs: {e}");
            }
        }
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::mock_backend::{MockBackend, MockState};
    use crate::sample::test_util::make_wav;
    use crate::store::MemStore;

    /// Sounds the test store carries assets for; everything else falls back
    /// to synthesis.
    const LOADED: &[SoundId] = &[
        SoundId::ClickA,
        SoundId::CoinDrop,
        SoundId::Tap,
        SoundId::ThemeSunnyside,
        SoundId::ThemeArcade,
    ];

    fn engine_with(config: EngineConfig) -> (SoundEngine, Rc<RefCell<MockState>>) {
        let backend = MockBackend::new();
        let state = backend.state();
        let mut store = MemStore::new();
        let wav = make_wav(22_050, &vec![2_000_i16; 2_205]);
        for &id in LOADED {
            store.insert(&registry::spec_for(id).locator, wav.clone());
        }
        let mut engine = SoundEngine::new(config, Box::new(backend), Box::new(store)).unwrap();
        assert_eq!(engine.preload_all(), LOADED.len());
        (engine, state)
    }

    fn engine() -> (SoundEngine, Rc<RefCell<MockState>>) {
        engine_with(EngineConfig::default())
    }

    fn capture_diagnostics(engine: &mut SoundEngine) -> Rc<RefCell<Vec<Diagnostic>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        engine.set_diagnostics_callback(Some(Box::new(move |d| sink.borrow_mut().push(d.clone()))));
        events
    }

    #[test]
    fn test_play_schedules_effective_volume() {
        let (mut engine, state) = engine();
        engine.set_master_volume(0.5);
        engine.set_sfx_volume(0.8);

        let inst = engine.play_with(SoundId::ClickA, PlaybackOptions::default().with_volume(0.5));
        assert!(inst.is_some());
        assert_eq!(engine.active_count(), 1);

        let state = state.borrow();
        assert_eq!(state.started.len(), 1);
        assert!((state.started[0].volume - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_unregistered_play_synthesizes_the_recipe() {
        let (mut engine, state) = engine();
        let events = capture_diagnostics(&mut engine);

        let inst = engine.play_with(SoundId::Fanfare, PlaybackOptions::default());
        assert!(inst.is_none(), "synthesized playback is untracked");
        assert_eq!(engine.active_count(), 0);

        let expected = synth::render(&synth::recipe_for(SoundId::Fanfare), 44_100, 1.0).frames();
        assert_eq!(state.borrow().started[0].frames, expected);
        assert!(matches!(
            events.borrow()[0],
            Diagnostic::AssetUnavailable {
                sound: SoundId::Fanfare
            }
        ));
    }

    #[test]
    fn test_every_catalog_sound_makes_noise_without_assets() {
        let backend = MockBackend::new();
        let state = backend.state();
        let mut engine = SoundEngine::new(
            EngineConfig::default(),
            Box::new(backend),
            Box::new(MemStore::new()),
        )
        .unwrap();

        for &id in SoundId::all() {
            engine.play(id);
        }
        assert_eq!(state.borrow().started.len(), SoundId::all().len());
    }

    #[test]
    fn test_muted_play_has_no_side_effect() {
        let (mut engine, state) = engine();
        engine.mute();

        assert!(engine.play(SoundId::ClickA).is_none());
        assert_eq!(engine.active_count(), 0);
        assert_eq!(state.borrow().started.len(), 0);
    }

    #[test]
    fn test_eviction_is_fifo_at_ceiling() {
        let (mut engine, state) = engine_with(EngineConfig {
            max_active: 3,
            ..Default::default()
        });

        engine.play(SoundId::ClickA).unwrap();
        engine.play(SoundId::CoinDrop).unwrap();
        engine.play(SoundId::Tap).unwrap();
        assert_eq!(engine.active_count(), 3);

        engine.play(SoundId::CoinDrop).unwrap();
        assert_eq!(engine.active_count(), 3);

        // The stopped sound is exactly the earliest-created one.
        let state = state.borrow();
        assert_eq!(state.stopped().to_vec(), vec![state.started[0].handle]);
    }

    #[test]
    fn test_pool_clones_on_concurrent_demand() {
        let (mut engine, _state) = engine();
        let base = engine.pool_size(SoundId::CoinDrop).unwrap();

        for _ in 0..base {
            engine.play(SoundId::CoinDrop).unwrap();
        }
        assert_eq!(engine.pool_size(SoundId::CoinDrop), Some(base));

        // One more concurrent play clones a handle instead of reusing a
        // busy one.
        engine.play(SoundId::CoinDrop).unwrap();
        assert_eq!(engine.pool_size(SoundId::CoinDrop), Some(base + 1));
        assert_eq!(engine.active_count(), base + 1);
    }

    #[test]
    fn test_fixed_growth_policy_falls_back_to_synthesis() {
        let (mut engine, state) = engine_with(EngineConfig {
            growth: PoolGrowthPolicy::Fixed,
            ..Default::default()
        });

        assert!(engine.play(SoundId::Tap).is_some());
        assert!(engine.play(SoundId::Tap).is_some());
        // Pool of 2 saturated: the third play synthesizes instead.
        assert!(engine.play(SoundId::Tap).is_none());
        assert_eq!(engine.pool_size(SoundId::Tap), Some(2));
        assert_eq!(state.borrow().started.len(), 3);
    }

    #[test]
    fn test_delay_defers_backend_start() {
        let (mut engine, state) = engine();
        let inst = engine
            .play_with(SoundId::ClickA, PlaybackOptions::default().with_delay(0.2))
            .unwrap();
        assert_eq!(state.borrow().started.len(), 0);
        assert_eq!(engine.active_count(), 1);

        engine.update(0.1);
        assert_eq!(state.borrow().started.len(), 0);

        engine.update(0.15);
        assert_eq!(state.borrow().started.len(), 1);
        engine.stop(inst);
    }

    #[test]
    fn test_fade_in_ramps_to_target() {
        let (mut engine, state) = engine();
        engine
            .play_with(
                SoundId::ClickA,
                PlaybackOptions::default().with_volume(0.8).with_fade_in(0.5),
            )
            .unwrap();

        let handle = state.borrow().started[0].handle;
        assert_eq!(state.borrow().volume_of(handle), Some(0.0));

        engine.update(0.25);
        assert!((state.borrow().volume_of(handle).unwrap() - 0.4).abs() < 1e-5);

        engine.update(0.25);
        assert!((state.borrow().volume_of(handle).unwrap() - 0.8).abs() < 1e-5);

        // Ramp holds at the target once complete.
        engine.update(0.25);
        assert!((state.borrow().volume_of(handle).unwrap() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_fade_out_ramps_then_stops() {
        let (mut engine, state) = engine();
        let inst = engine
            .play_with(SoundId::ClickA, PlaybackOptions::default())
            .unwrap();
        let handle = state.borrow().started[0].handle;

        engine.fade_out(inst, 0.2);
        engine.update(0.1);
        assert!((state.borrow().volume_of(handle).unwrap() - 0.5).abs() < 1e-5);

        engine.update(0.1);
        assert_eq!(engine.active_count(), 0);
        assert!(state.borrow().stopped().contains(&handle));
    }

    #[test]
    fn test_natural_completion_deregisters_and_frees_pool() {
        let (mut engine, state) = engine();
        engine.play(SoundId::ClickA).unwrap();
        let handle = state.borrow().started[0].handle;

        state.borrow_mut().finish(handle);
        engine.update(0.016);
        assert_eq!(engine.active_count(), 0);

        // The freed slot is reused; the pool does not grow.
        engine.play(SoundId::ClickA).unwrap();
        assert_eq!(engine.pool_size(SoundId::ClickA), Some(4));
    }

    #[test]
    fn test_mute_pauses_unmute_does_not_resume() {
        let (mut engine, state) = engine();
        engine.play(SoundId::ClickA).unwrap();
        engine.play(SoundId::CoinDrop).unwrap();
        engine.play(SoundId::Tap).unwrap();
        let handles: Vec<_> = state.borrow().started.iter().map(|s| s.handle).collect();

        engine.mute();
        assert!(engine.is_muted());
        for &h in &handles {
            assert!(state.borrow().is_paused(h));
        }

        // Second mute is idempotent: no double-pause.
        engine.mute();
        for &h in &handles {
            assert_eq!(state.borrow().pause_calls(h), 1);
        }

        engine.unmute();
        assert!(!engine.is_muted());
        for &h in &handles {
            assert!(state.borrow().is_paused(h), "unmute must not auto-resume");
        }
        assert_eq!(engine.active_count(), 3);

        // Explicit resume is the only way back.
        engine.resume_all();
        for &h in &handles {
            assert!(!state.borrow().is_paused(h));
        }
    }

    #[test]
    fn test_volume_setters_clamp_and_are_idempotent() {
        let (mut engine, _state) = engine();

        engine.set_master_volume(1.5);
        assert_eq!(engine.master_volume(), 1.0);

        engine.set_master_volume(-0.2);
        assert_eq!(engine.master_volume(), 0.0);

        engine.set_master_volume(0.7);
        engine.set_master_volume(0.7);
        assert_eq!(engine.master_volume(), 0.7);
    }

    #[test]
    fn test_preset_layers_with_relative_delays() {
        let (mut engine, state) = engine();

        // Members at offsets 0 / 0.2 / 0.4 are all scheduled at call time.
        engine.play_preset("achievement-unlock");
        assert_eq!(state.borrow().started.len(), 1);

        engine.update(0.2);
        assert_eq!(state.borrow().started.len(), 2);

        engine.update(0.2);
        assert_eq!(state.borrow().started.len(), 3);
    }

    #[test]
    fn test_unknown_preset_and_group_are_noops() {
        let (mut engine, state) = engine();
        let events = capture_diagnostics(&mut engine);

        engine.play_preset("does-not-exist");
        assert!(engine.play_group("does-not-exist", PlaybackOptions::default()).is_none());

        assert_eq!(state.borrow().started.len(), 0);
        let events = events.borrow();
        assert!(matches!(events[0], Diagnostic::UnknownPreset { .. }));
        assert!(matches!(events[1], Diagnostic::UnknownGroup { .. }));
    }

    #[test]
    fn test_sequence_orders_strictly() {
        let (mut engine, state) = engine();
        engine.play_sequence(vec![
            SequenceEntry::new(SoundId::ClickA, 0.0),
            SequenceEntry::new(SoundId::Tap, 0.1),
        ]);
        assert_eq!(state.borrow().started.len(), 1);

        engine.update(0.05);
        assert_eq!(state.borrow().started.len(), 1);

        engine.update(0.05);
        assert_eq!(state.borrow().started.len(), 2);
    }

    #[test]
    fn test_group_play_starts_one_sound() {
        let (mut engine, state) = engine();
        engine.play_group("click", PlaybackOptions::default());
        assert_eq!(state.borrow().started.len(), 1);
    }

    #[test]
    fn test_music_swap_crossfades() {
        let (mut engine, state) = engine();
        engine.set_music_volume(0.5);

        engine.play_music(SoundId::ThemeSunnyside, 0.0);
        assert!(engine.music_playing());
        let first = state.borrow().started[0].handle;
        assert!(state.borrow().started[0].looped);
        assert!((state.borrow().started[0].volume - 0.5).abs() < 1e-6);

        engine.play_music(SoundId::ThemeArcade, 0.3);
        assert_eq!(engine.active_count(), 2, "old and new overlap during the swap");
        let second = state.borrow().started[1].handle;
        assert_eq!(state.borrow().volume_of(second), Some(0.0));

        // Ride out both ramps (fixed 0.8 s out, 0.3 s in).
        for _ in 0..10 {
            engine.update(0.1);
        }
        assert!(state.borrow().stopped().contains(&first));
        assert_eq!(engine.active_count(), 1);
        assert!(engine.music_playing());
        assert!((state.borrow().volume_of(second).unwrap() - 0.5).abs() < 1e-5);

        engine.stop_music(0.0);
        assert!(!engine.music_playing());
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_reverb_applies_only_before_start() {
        let (mut engine, state) = engine();
        let events = capture_diagnostics(&mut engine);

        let pending = engine
            .play_with(SoundId::ClickA, PlaybackOptions::default().with_delay(0.1))
            .unwrap();
        engine.apply_reverb(pending, 0.5);
        assert!(events.borrow().is_empty());

        engine.update(0.2);
        let started = engine.play(SoundId::ClickA).unwrap();
        {
            let state = state.borrow();
            // The reverberated start carries the convolution tail.
            assert!(state.started[0].frames > state.started[1].frames);
        }

        engine.apply_reverb(started, 0.5);
        assert!(matches!(
            events.borrow().last(),
            Some(Diagnostic::EffectUnavailable { .. })
        ));
    }

    #[test]
    fn test_playback_rejection_is_absorbed() {
        let (mut engine, state) = engine();
        let events = capture_diagnostics(&mut engine);

        state.borrow_mut().fail_next_play = true;
        let inst = engine.play(SoundId::ClickA);
        assert!(inst.is_none());
        assert_eq!(engine.active_count(), 0);
        assert!(matches!(
            events.borrow().last(),
            Some(Diagnostic::PlaybackRejected { .. })
        ));

        // The pool slot was released; the next call plays normally.
        engine.play(SoundId::ClickA).unwrap();
        assert_eq!(engine.pool_size(SoundId::ClickA), Some(4));
    }

    #[test]
    fn test_pitch_and_pan_reach_the_backend() {
        let (mut engine, state) = engine();
        engine.play_with(SoundId::ClickA, PlaybackOptions::default().with_pitch(1.5));
        engine.play_with(SoundId::ClickA, PlaybackOptions::default().with_pan(0.5));

        let state = state.borrow();
        assert!((state.started[0].speed - 1.5).abs() < 1e-6);
        // Pan renders the mono asset into a stereo buffer.
        assert_eq!(state.started[1].channels, 2);
    }

    #[test]
    fn test_delayed_fallback_honors_delay() {
        let (mut engine, state) = engine();
        engine.play_with(SoundId::Sparkle, PlaybackOptions::default().with_delay(0.15));
        assert_eq!(state.borrow().started.len(), 0);

        engine.update(0.1);
        assert_eq!(state.borrow().started.len(), 0);

        engine.update(0.1);
        assert_eq!(state.borrow().started.len(), 1);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let (mut engine, state) = engine();
        engine.play(SoundId::ClickA).unwrap();

        engine.dispose();
        assert!(engine.is_disposed());
        assert_eq!(engine.active_count(), 0);
        assert_eq!(state.borrow().live_count(), 0);
        assert!(engine.play(SoundId::ClickA).is_none());
    }

    #[test]
    fn test_prefs_persist_across_engines() {
        let dir = std::env::temp_dir().join("coinchime-engine-prefs");
        let path = dir.join("audio.ron");
        std::fs::remove_file(&path).ok();

        {
            let mut engine = SoundEngine::new(
                EngineConfig {
                    prefs_path: Some(path.clone()),
                    ..Default::default()
                },
                Box::new(MockBackend::new()),
                Box::new(MemStore::new()),
            )
            .unwrap();
            engine.set_master_volume(0.25);
            engine.mute();
        }

        let engine = SoundEngine::new(
            EngineConfig {
                prefs_path: Some(path),
                ..Default::default()
            },
            Box::new(MockBackend::new()),
            Box::new(MemStore::new()),
        )
        .unwrap();
        assert!(engine.is_muted());
        assert!((engine.master_volume() - 0.25).abs() < 1e-6);

        std::fs::remove_dir_all(&dir).ok();
    }
}
