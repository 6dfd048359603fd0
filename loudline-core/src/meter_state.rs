//! The published, widget-facing snapshot (§4.9 step 5, §9 "widgets are
//! pure consumers"). `MeterState` is shared between the two loops but
//! each field has exactly one writer: MeasureLoop (20Hz, slow/gated
//! values) or RenderState (60Hz, ballistics/hold/stereo/visual).

use crate::goniometer::GoniometerPoint;
use crate::stereo::StereoReading;

/// Loudness-colour mapping against target (§4.8 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoudnessColor {
    Green,
    Cyan,
    Amber,
    Red,
}

pub fn loudness_color(momentary_lufs: f32, target_lufs: f32) -> LoudnessColor {
    let delta = momentary_lufs - target_lufs;
    if delta < -1.0 {
        LoudnessColor::Cyan
    } else if delta <= 1.0 {
        LoudnessColor::Green
    } else if delta <= 3.0 {
        LoudnessColor::Amber
    } else {
        LoudnessColor::Red
    }
}

/// Time-ordered, pruned `(t_ms, short_term_lufs)` history for the
/// radar/history display (§3, §8 invariant 9).
pub struct RadarHistory {
    entries: Vec<(u64, f32)>,
    window_ms: u64,
}

impl RadarHistory {
    pub fn new(window_seconds: f32) -> Self {
        Self {
            entries: Vec::new(),
            window_ms: (window_seconds * 1000.0) as u64,
        }
    }

    pub fn push(&mut self, t_ms: u64, short_term_lufs: f32) {
        self.entries.push((t_ms, short_term_lufs));
        self.prune(t_ms);
    }

    pub fn set_window_seconds(&mut self, window_seconds: f32) {
        self.window_ms = (window_seconds * 1000.0) as u64;
    }

    pub fn prune(&mut self, now_ms: u64) {
        let window_ms = self.window_ms;
        self.entries.retain(|&(t, _)| now_ms.saturating_sub(t) <= window_ms);
    }

    pub fn entries(&self) -> &[(u64, f32)] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Three-second peak-over latch (§4.9 step 4, §8 scenario S5).
#[derive(Default)]
pub struct PeakOverLatch {
    active: bool,
    trigger_ms: u64,
}

const PEAK_OVER_CLEAR_MS: u64 = 500;

impl PeakOverLatch {
    pub fn update(&mut self, current_tp_dbtp: f32, limit_dbtp: f32, now_ms: u64) -> bool {
        if current_tp_dbtp >= limit_dbtp {
            self.active = true;
            self.trigger_ms = now_ms;
        } else if self.active && now_ms.saturating_sub(self.trigger_ms) > PEAK_OVER_CLEAR_MS {
            self.active = false;
        }
        self.active
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.trigger_ms = 0;
    }
}

/// Values written by MeasureLoop (20Hz).
#[derive(Debug, Clone, Copy, Default)]
pub struct SlowMetrics {
    pub momentary_lufs: Option<f32>,
    pub short_term_lufs: Option<f32>,
    pub integrated_lufs: Option<f32>,
    pub loudness_range_lu: Option<f32>,
    pub crest_db: Option<f32>,
    pub tp_max_cumulative_dbtp: f32,
    pub elapsed_s: f32,
    pub color: Option<LoudnessColor>,
}

/// Values written by RenderState (60Hz).
#[derive(Clone, Default)]
pub struct FastMetrics {
    pub true_peak_dbtp: [f32; 2],
    pub true_peak_hold_dbtp: [f32; 2],
    pub ppm_dbfs: [f32; 2],
    pub ppm_hold_dbfs: [f32; 2],
    pub ppm_dbu: [Option<f32>; 2],
    pub stereo: StereoReading,
    pub goniometer: Vec<GoniometerPoint>,
    pub peak_over: bool,
}

#[derive(Clone, Default)]
pub struct MeterState {
    pub slow: SlowMetrics,
    pub fast: FastMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mapping_bands() {
        assert_eq!(loudness_color(-23.0, -23.0), LoudnessColor::Green);
        assert_eq!(loudness_color(-25.0, -23.0), LoudnessColor::Cyan);
        assert_eq!(loudness_color(-21.0, -23.0), LoudnessColor::Amber);
        assert_eq!(loudness_color(-18.0, -23.0), LoudnessColor::Red);
    }

    #[test]
    fn radar_history_prunes_old_entries() {
        let mut radar = RadarHistory::new(1.0);
        radar.push(0, -20.0);
        radar.push(500, -21.0);
        radar.push(1500, -22.0);
        assert_eq!(radar.entries().len(), 2);
    }

    #[test]
    fn peak_over_latch_clears_after_500ms() {
        let mut latch = PeakOverLatch::default();
        assert!(latch.update(-0.5, -1.0, 0));
        assert!(latch.update(-2.0, -1.0, 100));
        assert!(!latch.update(-2.0, -1.0, 700));
    }
}
