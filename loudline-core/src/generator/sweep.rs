//! Logarithmic sine sweep with look-ahead frequency scheduling (§4.6).
//!
//! The instantaneous frequency is computed 200ms ahead of the sample
//! currently being rendered and eased toward over that window, so a
//! listener hears a smooth glide rather than a stair-stepped one.

use std::f64::consts::TAU;

const LOOKAHEAD_SECONDS: f32 = 0.2;

pub struct SweepGenerator {
    sample_rate: f32,
    lo_hz: f32,
    hi_hz: f32,
    duration_s: f32,
    elapsed_s: f32,
    phase: f64,
    current_freq_hz: f32,
}

impl SweepGenerator {
    pub fn new(sample_rate: f32, lo_hz: f32, hi_hz: f32, duration_s: f32) -> Self {
        let lo_hz = lo_hz.max(1.0);
        let hi_hz = hi_hz.max(lo_hz + 1.0);
        Self {
            sample_rate,
            lo_hz,
            hi_hz,
            duration_s: duration_s.max(0.1),
            elapsed_s: 0.0,
            phase: 0.0,
            current_freq_hz: lo_hz,
        }
    }

    fn freq_at(&self, t: f32) -> f32 {
        let clamped = (t / self.duration_s).clamp(0.0, 1.0);
        let ratio = (self.hi_hz / self.lo_hz) as f64;
        (self.lo_hz as f64 * ratio.powf(clamped as f64)) as f32
    }

    pub fn next_sample(&mut self) -> f32 {
        let target = self.freq_at(self.elapsed_s + LOOKAHEAD_SECONDS);
        // Ease the carrier toward the look-ahead target rather than
        // jumping straight to it, matching the scheduler's own
        // look-ahead-then-ease discipline for routing edges.
        self.current_freq_hz += 0.02 * (target - self.current_freq_hz);

        let out = self.phase.sin() as f32;
        self.phase += TAU * self.current_freq_hz as f64 / self.sample_rate as f64;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        self.elapsed_s += 1.0 / self.sample_rate;
        if self.elapsed_s >= self.duration_s {
            self.elapsed_s = 0.0;
        }
        out
    }

    pub fn progress(&self) -> f32 {
        self.elapsed_s / self.duration_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_progresses_from_low_toward_high() {
        let mut sweep = SweepGenerator::new(48000.0, 20.0, 20000.0, 1.0);
        for _ in 0..48000 {
            sweep.next_sample();
        }
        assert!(sweep.current_freq_hz > 1000.0);
    }

    #[test]
    fn sweep_loops_after_duration() {
        let mut sweep = SweepGenerator::new(48000.0, 100.0, 200.0, 0.1);
        for _ in 0..4800 {
            sweep.next_sample();
        }
        assert!(sweep.progress() < 0.5);
    }
}
