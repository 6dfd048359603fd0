//! Lissajous pattern generator for goniometer calibration (§4.6).
//!
//! A 1:1 frequency ratio with a phase offset renders as the classic
//! phase-delay ellipse; any other ratio switches to two independent
//! oscillators so the goniometer traces the intended N:M figure
//! instead of a degenerate ellipse.

use std::f32::consts::TAU;

pub struct LissajousGenerator {
    sample_rate: f32,
    base_freq_hz: f32,
    ratio_num: u32,
    ratio_den: u32,
    phase_offset_rad: f32,
    phase_left: f32,
    phase_right: f32,
}

impl LissajousGenerator {
    pub fn new(
        sample_rate: f32,
        base_freq_hz: f32,
        ratio_num: u32,
        ratio_den: u32,
        phase_deg: f32,
    ) -> Self {
        Self {
            sample_rate,
            base_freq_hz: base_freq_hz.max(1.0),
            ratio_num: ratio_num.max(1),
            ratio_den: ratio_den.max(1),
            phase_offset_rad: phase_deg.to_radians(),
            phase_left: 0.0,
            phase_right: 0.0,
        }
    }

    fn is_unity_ratio(&self) -> bool {
        self.ratio_num == self.ratio_den
    }

    pub fn next_pair(&mut self, amplitude: f32) -> (f32, f32) {
        if self.is_unity_ratio() {
            // Single oscillator, right channel phase-delayed: the
            // simplest and most common calibration figure.
            let left = self.phase_left.sin() * amplitude;
            let right = (self.phase_left + self.phase_offset_rad).sin() * amplitude;
            self.phase_left += TAU * self.base_freq_hz / self.sample_rate;
            if self.phase_left >= TAU {
                self.phase_left -= TAU;
            }
            (left, right)
        } else {
            let freq_left = self.base_freq_hz * self.ratio_num as f32;
            let freq_right = self.base_freq_hz * self.ratio_den as f32;
            let left = self.phase_left.sin() * amplitude;
            let right = (self.phase_right + self.phase_offset_rad).sin() * amplitude;
            self.phase_left += TAU * freq_left / self.sample_rate;
            self.phase_right += TAU * freq_right / self.sample_rate;
            if self.phase_left >= TAU {
                self.phase_left -= TAU;
            }
            if self.phase_right >= TAU {
                self.phase_right -= TAU;
            }
            (left, right)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_phase_unity_ratio_is_mono() {
        let mut gen = LissajousGenerator::new(48000.0, 440.0, 1, 1, 0.0);
        for _ in 0..1000 {
            let (l, r) = gen.next_pair(0.8);
            assert!((l - r).abs() < 1e-6);
        }
    }

    #[test]
    fn ninety_degree_phase_produces_circle_like_quadrature() {
        let mut gen = LissajousGenerator::new(48000.0, 440.0, 1, 1, 90.0);
        let mut max_diff = 0.0f32;
        for _ in 0..1000 {
            let (l, r) = gen.next_pair(1.0);
            max_diff = max_diff.max((l * l + r * r - 1.0).abs());
        }
        assert!(max_diff < 0.05);
    }

    #[test]
    fn non_unity_ratio_uses_independent_frequencies() {
        let mut gen = LissajousGenerator::new(48000.0, 100.0, 3, 2, 0.0);
        let mut diverged = false;
        for _ in 0..2000 {
            let (l, r) = gen.next_pair(1.0);
            if (l - r).abs() > 1e-3 {
                diverged = true;
            }
        }
        assert!(diverged);
    }
}
