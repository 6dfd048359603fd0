//! Stereo field analysis: correlation, balance, width, M/S levels and
//! principal-axis rotation, computed once per render tick from the
//! shared sample window (§4.5).
//!
//! Mid/side convention follows the teacher's stereo enhancer
//! (`M=(L+R)/2`, `S=(R-L)/2`), generalized from width *processing*
//! to width *measurement*.

use crate::peak_hold::PeakHold;
use crate::sample_window::WindowSnapshot;

const EPSILON: f32 = 1e-9;
const MS_FLOOR_DB: f32 = -60.0;
const ROTATION_DEAD_ZONE: f32 = 0.05;
const ROTATION_HISTORY_LEN: usize = 25;

/// Raw covariance sums for one window, also consumed by the
/// goniometer pipeline (SPEC_FULL.md C.6-7).
#[derive(Clone, Copy, Default)]
pub struct CovarianceSums {
    pub sum_l2: f64,
    pub sum_r2: f64,
    pub sum_lr: f64,
    pub sum_m2: f64,
    pub sum_s2: f64,
    pub count: usize,
}

pub fn covariance_sums(window: &WindowSnapshot) -> CovarianceSums {
    let mut sums = CovarianceSums::default();
    let n = window.left.len().min(window.right.len());
    for i in 0..n {
        let l = window.left[i] as f64;
        let r = window.right[i] as f64;
        let m = (l + r) * 0.5;
        let s = (r - l) * 0.5;
        sums.sum_l2 += l * l;
        sums.sum_r2 += r * r;
        sums.sum_lr += l * r;
        sums.sum_m2 += m * m;
        sums.sum_s2 += s * s;
    }
    sums.count = n;
    sums
}

fn rms(sum_sq: f64, count: usize) -> f32 {
    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt() as f32
    }
}

fn linear_to_db_floored(linear: f32, floor_db: f32) -> f32 {
    if linear > 1e-9 {
        (20.0 * linear.log10()).max(floor_db)
    } else {
        floor_db
    }
}

pub struct StereoAnalyzer {
    width_smooth: f32,
    width_hold: PeakHold,
    mid_smooth_db: f32,
    side_smooth_db: f32,
    rotation_smooth: f32,
    rotation_history: Vec<f32>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StereoReading {
    pub correlation: f32,
    pub balance_db: f32,
    pub width: f32,
    pub width_peak: f32,
    pub mid_db: f32,
    pub side_db: f32,
    pub rotation: f32,
}

impl StereoAnalyzer {
    pub fn new() -> Self {
        Self {
            width_smooth: 0.0,
            width_hold: PeakHold::default(),
            mid_smooth_db: MS_FLOOR_DB,
            side_smooth_db: MS_FLOOR_DB,
            rotation_smooth: 0.0,
            rotation_history: Vec::with_capacity(ROTATION_HISTORY_LEN),
        }
    }

    pub fn update(&mut self, window: &WindowSnapshot, now: std::time::Instant) -> StereoReading {
        let sums = covariance_sums(window);
        let rms_l = rms(sums.sum_l2, sums.count);
        let rms_r = rms(sums.sum_r2, sums.count);
        let rms_m = rms(sums.sum_m2, sums.count);
        let rms_s = rms(sums.sum_s2, sums.count);

        let correlation = (sums.sum_lr as f32
            / (sums.sum_l2 as f32 * sums.sum_r2 as f32 + EPSILON).sqrt())
            .clamp(-1.0, 1.0);

        let balance_db =
            (20.0 * ((rms_l + EPSILON) / (rms_r + EPSILON)).log10()).clamp(-12.0, 12.0);

        let raw_width = rms_s / (rms_m + rms_s + EPSILON);
        self.width_smooth += 0.15 * (raw_width - self.width_smooth);
        self.width_hold.update(self.width_smooth, now);

        let raw_mid_db = linear_to_db_floored(rms_m, MS_FLOOR_DB);
        let raw_side_db = linear_to_db_floored(rms_s, MS_FLOOR_DB);
        self.mid_smooth_db += 0.15 * (raw_mid_db - self.mid_smooth_db);
        self.side_smooth_db += 0.15 * (raw_side_db - self.side_smooth_db);

        let theta = 0.5
            * f64::atan2(
                2.0 * sums.sum_lr,
                sums.sum_l2 - sums.sum_r2,
            );
        let mut raw_rotation = (theta / (std::f64::consts::FRAC_PI_4)) as f32;
        raw_rotation = raw_rotation.clamp(-1.0, 1.0);
        if raw_rotation.abs() < ROTATION_DEAD_ZONE {
            raw_rotation = 0.0;
        }
        self.rotation_smooth += 0.04 * (raw_rotation - self.rotation_smooth);
        self.rotation_history.push(self.rotation_smooth);
        if self.rotation_history.len() > ROTATION_HISTORY_LEN {
            self.rotation_history.remove(0);
        }

        StereoReading {
            correlation,
            balance_db,
            width: self.width_smooth,
            width_peak: self.width_hold.hold_db(),
            mid_db: self.mid_smooth_db,
            side_db: self.side_smooth_db,
            rotation: self.rotation_smooth,
        }
    }

    pub fn rotation_history(&self) -> &[f32] {
        &self.rotation_history
    }

    pub fn reset(&mut self) {
        self.width_smooth = 0.0;
        self.width_hold.reset();
        self.mid_smooth_db = MS_FLOOR_DB;
        self.side_smooth_db = MS_FLOOR_DB;
        self.rotation_smooth = 0.0;
        self.rotation_history.clear();
    }
}

impl Default for StereoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_window::WINDOW_SIZE;
    use std::sync::Arc;
    use std::time::Instant;

    fn window_from(left: Vec<f32>, right: Vec<f32>) -> WindowSnapshot {
        let mut l = [0.0f32; WINDOW_SIZE];
        let mut r = [0.0f32; WINDOW_SIZE];
        l[..left.len()].copy_from_slice(&left);
        r[..right.len()].copy_from_slice(&right);
        WindowSnapshot {
            left: Arc::new(l),
            right: Arc::new(r),
            generation: 1,
        }
    }

    fn sine(n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| (i as f32 * 0.05).sin() * amp)
            .collect()
    }

    #[test]
    fn mono_window_has_correlation_one() {
        let mut analyzer = StereoAnalyzer::new();
        let tone = sine(WINDOW_SIZE, 0.5);
        let window = window_from(tone.clone(), tone);
        let reading = analyzer.update(&window, Instant::now());
        assert!((reading.correlation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn anti_phase_window_has_correlation_minus_one() {
        let mut analyzer = StereoAnalyzer::new();
        let tone = sine(WINDOW_SIZE, 0.5);
        let inverted: Vec<f32> = tone.iter().map(|s| -s).collect();
        let window = window_from(tone, inverted);
        let reading = analyzer.update(&window, Instant::now());
        assert!((reading.correlation + 1.0).abs() < 1e-6);
    }

    #[test]
    fn anti_phase_collapses_mid_to_silence() {
        let mut analyzer = StereoAnalyzer::new();
        let tone = sine(WINDOW_SIZE, 0.5);
        let inverted: Vec<f32> = tone.iter().map(|s| -s).collect();
        let window = window_from(tone, inverted);
        // Drive smoothing to convergence.
        let mut reading = StereoReading::default();
        for _ in 0..200 {
            reading = analyzer.update(&window, Instant::now());
        }
        assert!(reading.mid_db <= MS_FLOOR_DB + 0.5);
    }
}
