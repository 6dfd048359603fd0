//! Seeded noise generation (§4.6, SPEC_FULL.md C.8). Determinism is
//! the point: a fixed seed means the same preset always produces the
//! same loop buffer, so regression tests and the EBU stereo-ID pulse
//! cadence stay reproducible across runs.
//!
//! White noise is sampled directly; pink and brown are white noise run
//! through the same `Biquad` cascade used elsewhere in the crate,
//! approximating the target spectral tilt rather than an exact
//! Voss-McCartney or integrator topology (SPEC_FULL.md E.3).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::biquad::Biquad;

const LOOP_SECONDS: f32 = 10.0;
const CROSSFADE_SECONDS: f32 = 0.05;
const NOISE_SEED: u64 = 0x4C4F_5544_4C49_4E45; // "LOUDLINE" in hex-ish form, fixed forever.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// Highpass at `lo_hz`, lowpass at `hi_hz`, plus a -3dB low-shelf at
/// 1kHz — the band-edge-filters-plus-shelf topology the source
/// describes for pink noise.
fn pink_cascade(sample_rate: f32, lo_hz: f32, hi_hz: f32) -> Vec<Biquad> {
    vec![
        one_pole_highpass(sample_rate, lo_hz),
        one_pole_lowpass(sample_rate, hi_hz),
        shelf(sample_rate, 1000.0, -3.0),
    ]
}

/// 200Hz lowpass (Q~0.7) followed by the same band-edge filters.
fn brown_cascade(sample_rate: f32, lo_hz: f32, hi_hz: f32) -> Vec<Biquad> {
    vec![
        lowpass_q(sample_rate, 200.0, 0.7),
        one_pole_highpass(sample_rate, lo_hz),
        one_pole_lowpass(sample_rate, hi_hz),
    ]
}

/// Simple one-pole low-shelf approximation, reusing the biquad's
/// general direct-form-I machinery with b2/a2 = 0.
fn shelf(sample_rate: f32, corner_hz: f32, gain_db_per_octave: f32) -> Biquad {
    let corner_hz = corner_hz.clamp(10.0, sample_rate * 0.45) as f64;
    let x = (-std::f64::consts::TAU * corner_hz / sample_rate as f64).exp();
    let gain = 10f64.powf(gain_db_per_octave as f64 / 20.0);
    Biquad::from_coefficients(1.0 - x * (1.0 - gain), 0.0, 0.0, -x, 0.0)
}

fn one_pole_highpass(sample_rate: f32, corner_hz: f32) -> Biquad {
    let corner_hz = corner_hz.clamp(1.0, sample_rate * 0.45) as f64;
    let x = (-std::f64::consts::TAU * corner_hz / sample_rate as f64).exp();
    let gain = (1.0 + x) / 2.0;
    Biquad::from_coefficients(gain, -gain, 0.0, -x, 0.0)
}

fn one_pole_lowpass(sample_rate: f32, corner_hz: f32) -> Biquad {
    let corner_hz = corner_hz.clamp(1.0, sample_rate * 0.45) as f64;
    let x = (-std::f64::consts::TAU * corner_hz / sample_rate as f64).exp();
    Biquad::from_coefficients(1.0 - x, 0.0, 0.0, -x, 0.0)
}

/// Standard RBJ lowpass biquad, used for the brown-noise 200Hz pole.
fn lowpass_q(sample_rate: f32, corner_hz: f32, q: f64) -> Biquad {
    let w0 = std::f64::consts::TAU * corner_hz as f64 / sample_rate as f64;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let a0 = 1.0 + alpha;
    let b0 = (1.0 - cos_w0) / 2.0 / a0;
    let b1 = (1.0 - cos_w0) / a0;
    let b2 = b0;
    let a1 = -2.0 * cos_w0 / a0;
    let a2 = (1.0 - alpha) / a0;
    Biquad::from_coefficients(b0, b1, b2, a1, a2)
}

struct LoopBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    pos: usize,
}

impl LoopBuffer {
    fn generate(sample_rate: f32, color: NoiseColor, lo_hz: f32, hi_hz: f32, uncorrelated: bool) -> Self {
        let n = (sample_rate * LOOP_SECONDS) as usize;
        let fade_n = ((sample_rate * CROSSFADE_SECONDS) as usize).max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(NOISE_SEED);

        let mut left = white_buffer(&mut rng, n);
        let mut right = if uncorrelated {
            white_buffer(&mut rng, n)
        } else {
            left.clone()
        };

        match color {
            NoiseColor::White => {}
            NoiseColor::Pink => {
                filter_in_place(&mut left, &mut pink_cascade(sample_rate, lo_hz, hi_hz));
                if uncorrelated {
                    filter_in_place(&mut right, &mut pink_cascade(sample_rate, lo_hz, hi_hz));
                } else {
                    right = left.clone();
                }
            }
            NoiseColor::Brown => {
                filter_in_place(&mut left, &mut brown_cascade(sample_rate, lo_hz, hi_hz));
                if uncorrelated {
                    filter_in_place(&mut right, &mut brown_cascade(sample_rate, lo_hz, hi_hz));
                } else {
                    right = left.clone();
                }
            }
        }

        normalize(&mut left);
        if uncorrelated {
            normalize(&mut right);
        } else {
            right = left.clone();
        }

        crossfade_loop_seam(&mut left, fade_n);
        if uncorrelated {
            crossfade_loop_seam(&mut right, fade_n);
        } else {
            right = left.clone();
        }

        Self { left, right, pos: 0 }
    }

    fn next_pair(&mut self) -> (f32, f32) {
        let l = self.left[self.pos];
        let r = self.right[self.pos];
        self.pos += 1;
        if self.pos >= self.left.len() {
            self.pos = 0;
        }
        (l, r)
    }
}

fn white_buffer(rng: &mut ChaCha8Rng, n: usize) -> Vec<f32> {
    (0..n).map(|_| rng.random_range(-1.0f32..=1.0f32)).collect()
}

fn filter_in_place(buf: &mut [f32], cascade: &mut [Biquad]) {
    for sample in buf.iter_mut() {
        let mut s = *sample;
        for stage in cascade.iter_mut() {
            s = stage.process(s, 0);
        }
        *sample = s;
    }
}

fn normalize(buf: &mut [f32]) {
    let peak = buf.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak > 1e-9 {
        let scale = 0.9 / peak;
        for s in buf.iter_mut() {
            *s *= scale;
        }
    }
}

/// Crossfades the tail of the buffer into its head so the loop point
/// never clicks.
fn crossfade_loop_seam(buf: &mut [f32], fade_n: usize) {
    let len = buf.len();
    if fade_n * 2 >= len {
        return;
    }
    let head: Vec<f32> = buf[..fade_n].to_vec();
    for i in 0..fade_n {
        let t = i as f32 / fade_n as f32;
        let tail_idx = len - fade_n + i;
        buf[tail_idx] = buf[tail_idx] * (1.0 - t) + head[i] * t;
    }
}

pub struct NoiseGenerator {
    buffer: LoopBuffer,
}

impl NoiseGenerator {
    pub fn new(sample_rate: f32, color: NoiseColor, lo_hz: f32, hi_hz: f32, uncorrelated: bool) -> Self {
        Self {
            buffer: LoopBuffer::generate(sample_rate, color, lo_hz, hi_hz, uncorrelated),
        }
    }

    pub fn next_pair(&mut self) -> (f32, f32) {
        self.buffer.next_pair()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_identical_buffers() {
        let a = LoopBuffer::generate(48000.0, NoiseColor::White, 20.0, 20000.0, false);
        let b = LoopBuffer::generate(48000.0, NoiseColor::White, 20.0, 20000.0, false);
        assert_eq!(a.left, b.left);
    }

    #[test]
    fn correlated_mode_keeps_channels_identical() {
        let gen = LoopBuffer::generate(48000.0, NoiseColor::Pink, 20.0, 20000.0, false);
        assert_eq!(gen.left, gen.right);
    }

    #[test]
    fn uncorrelated_mode_differs_between_channels() {
        let gen = LoopBuffer::generate(48000.0, NoiseColor::White, 20.0, 20000.0, true);
        assert_ne!(gen.left, gen.right);
    }

    #[test]
    fn buffer_stays_within_unit_range() {
        let gen = LoopBuffer::generate(48000.0, NoiseColor::Brown, 20.0, 20000.0, false);
        assert!(gen.left.iter().all(|s| s.abs() <= 1.0));
    }
}
