//! Buffer-domain effects
//!
//! Stereo panning and a small convolution reverb. Both operate on sample
//! buffers *before* they are committed to the output: once a sink owns its
//! samples the graph cannot be rewired, so the engine applies effects while
//! an instance is still pending and refuses afterwards.

use rand::Rng;

use crate::sample::SampleData;

/// Constant-power stereo gains for a pan position in [-1, 1].
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    // Map [-1, 1] onto a quarter circle so l^2 + r^2 stays 1.
    let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Render a buffer into stereo with the given pan position.
///
/// Mono input is split across both channels; stereo input keeps its
/// channel separation and is gain-weighted.
pub fn apply_pan(data: &SampleData, pan: f32) -> SampleData {
    let (left_gain, right_gain) = pan_gains(pan);
    let frames = data.frames();
    let mut samples = Vec::with_capacity(frames * 2);

    match data.channels {
        2 => {
            for frame in data.samples.chunks_exact(2) {
                samples.push(frame[0] * left_gain);
                samples.push(frame[1] * right_gain);
            }
        }
        _ => {
            // Mono (or anything exotic collapsed to its first channel).
            let step = usize::from(data.channels.max(1));
            for frame in data.samples.chunks(step) {
                samples.push(frame[0] * left_gain);
                samples.push(frame[0] * right_gain);
            }
        }
    }

    SampleData::new(2, data.sample_rate, samples)
}

/// Impulse response for the convolution reverb, synthesized once at engine
/// construction: lowpass-filtered white noise under an exponential decay.
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Reverb tail length in seconds. Short keeps direct convolution cheap
/// while still reading as "roomy" on UI sounds.
const IR_SECS: f32 = 0.25;
/// One-pole lowpass coefficient for the IR noise.
const IR_FILTER: f32 = 0.25;

impl ImpulseResponse {
    /// Generate an impulse response at the given sample rate.
    pub fn generate(sample_rate: u32) -> Self {
        let mut rng = rand::thread_rng();
        let count = ((IR_SECS * sample_rate as f32) as usize).max(1);
        let mut samples = Vec::with_capacity(count);
        let mut filtered = 0.0_f32;

        for i in 0..count {
            let t = i as f32 / count as f32;
            let white: f32 = rng.gen_range(-1.0..1.0);
            filtered += IR_FILTER * (white - filtered);
            samples.push(filtered * (-4.0 * t).exp());
        }

        // Normalize energy so the wet path does not clip.
        let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>().sqrt();
        if energy > f32::EPSILON {
            for s in &mut samples {
                *s /= energy;
            }
        }

        Self {
            samples,
            sample_rate,
        }
    }

    /// IR length in samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the IR is empty (never true for generated responses).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate the IR was generated at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Mix a buffer with its convolution against `ir`.
///
/// Output = dry * (1 - amount) + wet * amount, per channel, with the wet
/// tail extending the buffer by the IR length.
pub fn apply_reverb(data: &SampleData, ir: &ImpulseResponse, amount: f32) -> SampleData {
    let amount = amount.clamp(0.0, 1.0);
    if amount == 0.0 || ir.is_empty() {
        return data.clone();
    }

    let channels = usize::from(data.channels.max(1));
    let frames = data.frames();
    let out_frames = frames + ir.samples.len();
    let mut samples = vec![0.0_f32; out_frames * channels];

    for ch in 0..channels {
        for n in 0..frames {
            let x = data.samples[n * channels + ch];
            if x == 0.0 {
                continue;
            }
            // Dry contribution.
            samples[n * channels + ch] += x * (1.0 - amount);
            // Wet contribution: smear x across the IR tail.
            for (k, h) in ir.samples.iter().enumerate() {
                samples[(n + k) * channels + ch] += x * h * amount;
            }
        }
    }

    for s in &mut samples {
        *s = s.clamp(-1.0, 1.0);
    }

    SampleData::new(data.channels, data.sample_rate, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_gains_constant_power() {
        for pan in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let (l, r) = pan_gains(pan);
            assert!((l * l + r * r - 1.0).abs() < 1e-5, "pan {pan} not unit power");
        }
        let (l, r) = pan_gains(-1.0);
        assert!(l > 0.99 && r < 0.01);
    }

    #[test]
    fn test_apply_pan_produces_stereo() {
        let mono = SampleData::new(1, 48_000, vec![1.0, 1.0]);
        let panned = apply_pan(&mono, 1.0);
        assert_eq!(panned.channels, 2);
        assert_eq!(panned.frames(), 2);
        // Hard right: left channel silent.
        assert!(panned.samples[0] < 0.01);
        assert!(panned.samples[1] > 0.99);
    }

    #[test]
    fn test_reverb_extends_by_tail() {
        let ir = ImpulseResponse::generate(8_000);
        let dry = SampleData::new(1, 8_000, vec![1.0, 0.0, 0.0, 0.0]);
        let wet = apply_reverb(&dry, &ir, 0.5);
        assert_eq!(wet.frames(), dry.frames() + ir.len());
    }

    #[test]
    fn test_reverb_amount_zero_is_identity() {
        let ir = ImpulseResponse::generate(8_000);
        let dry = SampleData::new(1, 8_000, vec![0.5, -0.5, 0.25]);
        assert_eq!(apply_reverb(&dry, &ir, 0.0), dry);
    }

    #[test]
    fn test_reverb_keeps_samples_in_range() {
        let ir = ImpulseResponse::generate(8_000);
        let dry = SampleData::new(2, 8_000, vec![1.0; 64]);
        let wet = apply_reverb(&dry, &ir, 1.0);
        assert!(wet.samples.iter().all(|s| s.abs() <= 1.0));
    }
}
