//! The 60Hz render tick (§4.9). Owns True Peak and PPM ballistics,
//! stereo-field analysis and the goniometer point pipeline, and the
//! peak-over latch. MeasureLoop only ever reads these results back
//! through a [`crate::measure_loop::FastSnapshot`] (§5).

use std::time::{Duration, Instant};

use crate::goniometer::{self, GoniometerPoint};
use crate::meter_state::{FastMetrics, PeakOverLatch};
use crate::ppm::PpmMeter;
use crate::sample_window::{SampleWindow, WindowSnapshot};
use crate::stereo::StereoAnalyzer;
use crate::true_peak::TruePeakMeter;

/// Frames arriving more than this far apart (UI stall, debugger pause,
/// scheduler hiccup) are treated as a glitch: the previous window is
/// reused rather than feeding a torn or silent buffer into the
/// ballistics (§4.9 step 1).
const GLITCH_GAP: Duration = Duration::from_millis(80);

pub struct RenderState {
    true_peak: TruePeakMeter,
    ppm: PpmMeter,
    stereo: StereoAnalyzer,
    peak_over: PeakOverLatch,
    last_tick: Option<Instant>,
    cached_window: WindowSnapshot,
    epoch: Instant,
}

impl RenderState {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            true_peak: TruePeakMeter::new(),
            ppm: PpmMeter::new(sample_rate),
            stereo: StereoAnalyzer::new(),
            peak_over: PeakOverLatch::default(),
            last_tick: None,
            cached_window: WindowSnapshot::default(),
            epoch: Instant::now(),
        }
    }

    /// One 60Hz tick (§4.9 steps 1-5). `limit_dbtp` is the configured
    /// true-peak ceiling used to drive the peak-over latch.
    pub fn tick(&mut self, window_store: &SampleWindow, limit_dbtp: f32, now: Instant) -> FastMetrics {
        let glitched = match self.last_tick {
            Some(prev) if now.duration_since(prev) > GLITCH_GAP => true,
            _ => false,
        };
        self.last_tick = Some(now);

        let window = if glitched {
            self.cached_window.clone()
        } else {
            let fresh = window_store.snapshot();
            self.cached_window = fresh.clone();
            fresh
        };

        self.true_peak.update(&window, now);
        self.ppm.update(window.left.as_slice(), window.right.as_slice(), now);
        let stereo = self.stereo.update(&window, now);
        let goniometer: Vec<GoniometerPoint> = goniometer::goniometer_points(&window).to_vec();

        let tp_max = self.true_peak.hold_db(0).max(self.true_peak.hold_db(1));
        let now_ms = now.duration_since(self.epoch).as_millis() as u64;
        let peak_over = self.peak_over.update(tp_max, limit_dbtp, now_ms);

        FastMetrics {
            true_peak_dbtp: [self.true_peak.smooth_db(0), self.true_peak.smooth_db(1)],
            true_peak_hold_dbtp: [self.true_peak.hold_db(0), self.true_peak.hold_db(1)],
            ppm_dbfs: [self.ppm.current_dbfs(0), self.ppm.current_dbfs(1)],
            ppm_hold_dbfs: [self.ppm.hold_dbfs(0), self.ppm.hold_dbfs(1)],
            ppm_dbu: [self.ppm.display_dbu(0), self.ppm.display_dbu(1)],
            stereo,
            goniometer,
            peak_over,
        }
    }

    /// The snapshot this tick analyzed, including a reused window on a
    /// glitched tick. MeasureLoop reads this rather than taking its own
    /// snapshot of the sample window (§5 ordering guarantee).
    pub fn window(&self) -> &WindowSnapshot {
        &self.cached_window
    }

    pub fn reset(&mut self) {
        self.true_peak.reset();
        self.ppm.reset();
        self.stereo.reset();
        self.peak_over.reset();
        self.last_tick = None;
        self.cached_window = WindowSnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_window::WINDOW_SIZE;

    #[test]
    fn silent_window_produces_no_peak_over() {
        let window = SampleWindow::new();
        let mut render = RenderState::new(48000.0);
        let fast = render.tick(&window, -1.0, Instant::now());
        assert!(!fast.peak_over);
    }

    #[test]
    fn loud_window_trips_peak_over_latch() {
        let window = SampleWindow::new();
        window.publish([0.99; WINDOW_SIZE], [0.99; WINDOW_SIZE]);
        let mut render = RenderState::new(48000.0);
        let t0 = Instant::now();
        let mut fast = FastMetrics::default();
        for i in 0..10 {
            fast = render.tick(&window, -1.0, t0 + Duration::from_millis(i * 17));
        }
        assert!(fast.peak_over);
    }

    #[test]
    fn reused_cached_window_after_long_gap() {
        let window = SampleWindow::new();
        window.publish([0.5; WINDOW_SIZE], [0.5; WINDOW_SIZE]);
        let mut render = RenderState::new(48000.0);
        let t0 = Instant::now();
        render.tick(&window, -1.0, t0);
        window.publish([0.0; WINDOW_SIZE], [0.0; WINDOW_SIZE]);
        // Simulate a stall far longer than the glitch gap, then a tick:
        // the cached (loud) window should still be what gets re-analyzed.
        let fast = render.tick(&window, -1.0, t0 + Duration::from_millis(500));
        assert!(fast.true_peak_dbtp[0] > -60.0);
    }
}
