//! Procedural fallback synthesis
//!
//! When a sound has no loadable asset the engine still has to make a noise:
//! offline devices, blocked downloads and missing pipeline assets must all
//! degrade to "synthesized instead of sampled", never to silence. Every
//! [`SoundId`] maps to a short tone recipe here; the match is exhaustive so
//! adding a catalog entry without a recipe fails to compile.

use crate::registry::SoundId;
use crate::sample::SampleData;

/// Oscillator shape for one tone segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine
    Sine,
    /// Square (hollow, buzzy)
    Square,
    /// Triangle (soft, flute-like)
    Triangle,
    /// Sawtooth (bright, brassy)
    Saw,
    /// White noise burst
    Noise,
}

/// One segment of a synthesized sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSegment {
    /// Oscillator frequency in Hz (ignored for noise)
    pub freq: f32,
    /// Segment length in seconds
    pub duration: f32,
    /// Oscillator shape
    pub waveform: Waveform,
    /// Peak amplitude in [0, 1] before engine gain
    pub volume: f32,
}

impl ToneSegment {
    const fn new(freq: f32, duration: f32, waveform: Waveform, volume: f32) -> Self {
        Self {
            freq,
            duration,
            waveform,
            volume,
        }
    }
}

/// An ordered list of segments approximating one catalog sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthRecipe {
    /// Segments rendered back to back
    pub segments: Vec<ToneSegment>,
}

impl SynthRecipe {
    /// Total rendered duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

// Segment shorthand used by the recipe table.
use Waveform::{Noise, Saw, Sine, Square, Triangle};

/// Generic stand-in tone for sounds with no tailored recipe.
pub fn default_recipe() -> SynthRecipe {
    SynthRecipe {
        segments: vec![ToneSegment::new(660.0, 0.09, Sine, 0.5)],
    }
}

/// The synthesis recipe approximating `id`.
///
/// Exhaustive over the catalog: no playback request can end in total
/// silence because an asset failed to load.
pub fn recipe_for(id: SoundId) -> SynthRecipe {
    let segments = match id {
        // Clicks: a short noise tick over a sine body, pitched per variant.
        SoundId::ClickA => vec![
            ToneSegment::new(2_400.0, 0.012, Noise, 0.35),
            ToneSegment::new(900.0, 0.03, Sine, 0.5),
        ],
        SoundId::ClickB => vec![
            ToneSegment::new(2_400.0, 0.012, Noise, 0.35),
            ToneSegment::new(1_100.0, 0.03, Sine, 0.5),
        ],
        SoundId::ClickC => vec![
            ToneSegment::new(2_400.0, 0.01, Noise, 0.25),
            ToneSegment::new(760.0, 0.035, Sine, 0.45),
        ],
        SoundId::Tap => vec![ToneSegment::new(520.0, 0.04, Triangle, 0.4)],

        // Rising third for success, flat low buzz for refusal.
        SoundId::Success => vec![
            ToneSegment::new(523.25, 0.09, Triangle, 0.55),
            ToneSegment::new(659.25, 0.12, Triangle, 0.55),
        ],
        SoundId::Denied => vec![
            ToneSegment::new(160.0, 0.08, Square, 0.45),
            ToneSegment::new(140.0, 0.12, Square, 0.4),
        ],

        // Coin sounds: bright high pings with a fast decay.
        SoundId::CoinDrop => vec![
            ToneSegment::new(1_975.5, 0.05, Sine, 0.6),
            ToneSegment::new(2_637.0, 0.12, Sine, 0.5),
        ],
        SoundId::CoinClink => vec![
            ToneSegment::new(2_349.3, 0.04, Sine, 0.55),
            ToneSegment::new(3_135.9, 0.07, Sine, 0.4),
        ],
        SoundId::CashRegister => vec![
            ToneSegment::new(1_200.0, 0.03, Square, 0.4),
            ToneSegment::new(1_200.0, 0.03, Square, 0.4),
            ToneSegment::new(2_093.0, 0.25, Sine, 0.6),
        ],

        // Reward chimes walk up the C-major triad.
        SoundId::ChoreDone => vec![
            ToneSegment::new(783.99, 0.1, Sine, 0.55),
            ToneSegment::new(1_046.5, 0.16, Sine, 0.55),
        ],
        SoundId::GoalMilestone => vec![
            ToneSegment::new(659.25, 0.08, Triangle, 0.5),
            ToneSegment::new(783.99, 0.08, Triangle, 0.5),
            ToneSegment::new(1_046.5, 0.18, Triangle, 0.55),
        ],
        SoundId::Fanfare => vec![
            ToneSegment::new(523.25, 0.11, Saw, 0.45),
            ToneSegment::new(659.25, 0.11, Saw, 0.45),
            ToneSegment::new(783.99, 0.11, Saw, 0.45),
            ToneSegment::new(1_046.5, 0.3, Saw, 0.5),
        ],
        SoundId::Sparkle => vec![
            ToneSegment::new(3_520.0, 0.05, Sine, 0.3),
            ToneSegment::new(4_186.0, 0.05, Sine, 0.28),
            ToneSegment::new(5_274.0, 0.08, Sine, 0.25),
        ],
        SoundId::Whoosh => vec![ToneSegment::new(0.0, 0.22, Noise, 0.35)],

        // Theme fallbacks: a gentle four-note motif that loops tolerably.
        SoundId::ThemeSunnyside => vec![
            ToneSegment::new(392.0, 0.4, Triangle, 0.3),
            ToneSegment::new(440.0, 0.4, Triangle, 0.3),
            ToneSegment::new(523.25, 0.4, Triangle, 0.3),
            ToneSegment::new(440.0, 0.4, Triangle, 0.3),
        ],
        SoundId::ThemeArcade => vec![
            ToneSegment::new(523.25, 0.2, Square, 0.25),
            ToneSegment::new(659.25, 0.2, Square, 0.25),
            ToneSegment::new(783.99, 0.2, Square, 0.25),
            ToneSegment::new(659.25, 0.2, Square, 0.25),
        ],
    };
    SynthRecipe { segments }
}

/// Attack portion of the per-segment envelope, seconds.
const ATTACK_SECS: f32 = 0.004;
/// Decay time constant as a fraction of segment length.
const DECAY_FRACTION: f32 = 0.35;

/// Render a recipe to a mono sample buffer.
///
/// `gain` is the already-mixed playback volume (call x sfx x master),
/// captured at schedule time like every other volume read.
pub fn render(recipe: &SynthRecipe, sample_rate: u32, gain: f32) -> SampleData {
    let gain = gain.clamp(0.0, 1.0);
    let mut samples = Vec::new();
    // LCG noise source; deterministic so renders are reproducible.
    let mut noise_state: u32 = 0x2F6E_2B1D;

    for segment in &recipe.segments {
        let count = (segment.duration * sample_rate as f32) as usize;
        let decay_tau = (segment.duration * DECAY_FRACTION).max(1e-3);
        let mut phase: f32 = 0.0;
        let dt = 1.0 / sample_rate as f32;

        for i in 0..count {
            let t = i as f32 * dt;
            let envelope = if t < ATTACK_SECS {
                t / ATTACK_SECS
            } else {
                (-(t - ATTACK_SECS) / decay_tau).exp()
            };

            phase += segment.freq * dt;
            let frac = phase.fract();
            let value = match segment.waveform {
                Waveform::Sine => (frac * std::f32::consts::TAU).sin(),
                Waveform::Square => {
                    if frac < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Waveform::Triangle => 4.0 * (frac - 0.5).abs() - 1.0,
                Waveform::Saw => 2.0 * frac - 1.0,
                Waveform::Noise => {
                    noise_state = noise_state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    ((noise_state >> 16) as f32 / 32_768.0) - 1.0
                }
            };

            samples.push(value * envelope * segment.volume * gain);
        }
    }

    if samples.is_empty() {
        // Zero-length recipes still need a playable buffer.
        samples.push(0.0);
    }

    SampleData::new(1, sample_rate, samples)
}
