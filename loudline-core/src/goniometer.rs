//! Goniometer/vectorscope point pipeline (SPEC_FULL.md C.7).
//!
//! A pure function turning a sample window into a fixed-size set of
//! `(mid, side)` points, normalized to +/-1. Local capture and remote
//! ingest (§4.10) both produce this exact shape, so widgets never need
//! to know which source fed them.

use crate::sample_window::WindowSnapshot;

/// Matches the remote-probe frame's point count (§4.10).
pub const GONIOMETER_POINTS: usize = 128;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GoniometerPoint {
    pub m: f32,
    pub s: f32,
}

/// Decimates the window evenly down to [`GONIOMETER_POINTS`] points
/// using the same M/S convention as [`crate::stereo::StereoAnalyzer`].
pub fn goniometer_points(window: &WindowSnapshot) -> [GoniometerPoint; GONIOMETER_POINTS] {
    let n = window.left.len().min(window.right.len());
    let mut points = [GoniometerPoint::default(); GONIOMETER_POINTS];
    if n == 0 {
        return points;
    }
    for (out_idx, point) in points.iter_mut().enumerate() {
        let src_idx = (out_idx * n) / GONIOMETER_POINTS;
        let l = window.left[src_idx];
        let r = window.right[src_idx];
        point.m = ((l + r) * 0.5).clamp(-1.0, 1.0);
        point.s = ((r - l) * 0.5).clamp(-1.0, 1.0);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_window::WINDOW_SIZE;
    use std::sync::Arc;

    #[test]
    fn mono_signal_produces_zero_side() {
        let tone: Vec<f32> = (0..WINDOW_SIZE).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let mut buf = [0.0f32; WINDOW_SIZE];
        buf.copy_from_slice(&tone);
        let window = WindowSnapshot {
            left: Arc::new(buf),
            right: Arc::new(buf),
            generation: 1,
        };
        let points = goniometer_points(&window);
        assert!(points.iter().all(|p| p.s.abs() < 1e-6));
    }
}
