//! Phase-accumulating sine oscillator with schedule-ahead frequency
//! changes, so a generator parameter edit never produces a phase
//! discontinuity mid-buffer.

use std::f32::consts::TAU;

pub struct Oscillator {
    sample_rate: f32,
    phase: f32,
    freq_hz: f32,
    pending_freq_hz: Option<f32>,
}

impl Oscillator {
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            freq_hz,
            pending_freq_hz: None,
        }
    }

    /// Queues a frequency change to take effect at the next zero
    /// crossing, avoiding an audible click.
    pub fn schedule_frequency(&mut self, freq_hz: f32) {
        self.pending_freq_hz = Some(freq_hz);
    }

    pub fn next_sample(&mut self) -> f32 {
        let out = self.phase.sin();
        let prev_phase = self.phase;
        self.phase += TAU * self.freq_hz / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
            if let Some(pending) = self.pending_freq_hz.take() {
                self.freq_hz = pending;
            }
        }
        let _ = prev_phase;
        out
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_change_waits_for_cycle_boundary() {
        let mut osc = Oscillator::new(48000.0, 100.0);
        osc.schedule_frequency(1000.0);
        for _ in 0..479 {
            osc.next_sample();
        }
        assert!((osc.freq_hz - 100.0).abs() < 1e-6);
    }

    #[test]
    fn output_stays_in_unit_range() {
        let mut osc = Oscillator::new(48000.0, 1000.0);
        for _ in 0..48000 {
            let s = osc.next_sample();
            assert!(s >= -1.0 && s <= 1.0);
        }
    }
}
