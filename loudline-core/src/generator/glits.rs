//! GLITS (EBU 3304) stereo identification tone: a continuous 1kHz
//! sine on both channels, gated into a 4-second repeating mute
//! pattern that identifies which channel is which — L mutes once per
//! cycle, R mutes twice — with 2ms linear ramps on every mute edge so
//! the gating never clicks (§4.6).

use std::f32::consts::TAU;

const TONE_HZ: f32 = 1000.0;
const CYCLE_S: f32 = 4.0;
const RAMP_MS: f32 = 2.0;

const L_MUTE_WINDOWS: [(f32, f32); 1] = [(0.0, 0.25)];
const R_MUTE_WINDOWS: [(f32, f32); 2] = [(0.5, 0.75), (1.0, 1.25)];

fn gate_target(t: f32, windows: &[(f32, f32)]) -> f32 {
    for &(start, end) in windows {
        if t >= start && t < end {
            return 0.0;
        }
    }
    1.0
}

pub struct GlitsGenerator {
    sample_rate: f32,
    phase: f32,
    cycle_elapsed_s: f32,
    left_gain: f32,
    right_gain: f32,
}

impl GlitsGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            cycle_elapsed_s: 0.0,
            left_gain: 1.0,
            right_gain: 1.0,
        }
    }

    pub fn next_pair(&mut self, amplitude: f32) -> (f32, f32) {
        let dt = 1.0 / self.sample_rate;
        let ramp_step = dt / (RAMP_MS / 1000.0);

        let left_target = gate_target(self.cycle_elapsed_s, &L_MUTE_WINDOWS);
        let right_target = gate_target(self.cycle_elapsed_s, &R_MUTE_WINDOWS);
        self.left_gain = step_toward(self.left_gain, left_target, ramp_step);
        self.right_gain = step_toward(self.right_gain, right_target, ramp_step);

        let carrier = self.phase.sin() * amplitude;
        self.phase += TAU * TONE_HZ / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }

        self.cycle_elapsed_s += dt;
        if self.cycle_elapsed_s >= CYCLE_S {
            self.cycle_elapsed_s -= CYCLE_S;
        }

        (carrier * self.left_gain, carrier * self.right_gain)
    }
}

fn step_toward(current: f32, target: f32, step: f32) -> f32 {
    if current < target {
        (current + step).min(target)
    } else if current > target {
        (current - step).max(target)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_mutes_at_cycle_start() {
        let mut glits = GlitsGenerator::new(48000.0);
        let (l, _) = glits.next_pair(1.0);
        assert_eq!(l, 0.0);
    }

    #[test]
    fn right_sounds_while_left_is_muted_at_start() {
        let mut glits = GlitsGenerator::new(48000.0);
        for _ in 0..480 {
            glits.next_pair(1.0);
        }
        let (_, r) = glits.next_pair(1.0);
        assert!(r.abs() > 0.0);
    }

    #[test]
    fn right_mutes_twice_per_cycle() {
        let mut glits = GlitsGenerator::new(4000.0);
        let mut right_silent_windows = 0;
        let mut was_silent = false;
        for _ in 0..(4000.0 * CYCLE_S) as usize {
            let (_, r) = glits.next_pair(1.0);
            let silent = r.abs() < 1e-4;
            if silent && !was_silent {
                right_silent_windows += 1;
            }
            was_silent = silent;
        }
        assert_eq!(right_silent_windows, 2);
    }

    #[test]
    fn gain_never_overshoots_unity() {
        let mut glits = GlitsGenerator::new(48000.0);
        for _ in 0..48000 * 4 {
            let (l, r) = glits.next_pair(0.7);
            assert!(l.abs() <= 0.7001 && r.abs() <= 0.7001);
        }
    }
}
