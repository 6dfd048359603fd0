//! ITU-R BS.1770-4 K-weighting filter.
//!
//! Two cascaded biquad stages per channel: a high-shelf pre-filter
//! (+4dB above ~1.5kHz) followed by an RLB high-pass (~60Hz, exact
//! corner per BS.1770-4 is 38.1Hz Q 0.5). Feeds the LUFS block-energy
//! accumulator only; every other meter reads the unweighted stream.

use crate::biquad::Biquad;

/// Exact BS.1770-4 coefficients at 48kHz (the standard gives these to
/// more digits than float precision needs; kept at full length since
/// they're the published reference values).
fn pre_filter_48k() -> Biquad {
    Biquad::from_coefficients(
        1.53512485958697,
        -2.69169618940638,
        1.19839281085285,
        -1.69065929318241,
        0.73248077421585,
    )
}

fn rlb_filter_48k() -> Biquad {
    Biquad::from_coefficients(1.0, -2.0, 1.0, -1.99004745483398, 0.99007225036621)
}

/// Bilinear-transform fallback for non-48kHz capture devices, since
/// nothing in §6 guarantees the negotiated device rate.
fn shelf_design(f0: f64, gain_db: f64, q: f64, sample_rate: f64) -> Biquad {
    let a = 10f64.powf(gain_db / 40.0);
    let omega = 2.0 * std::f64::consts::PI * f0 / sample_rate;
    let cos_omega = omega.cos();
    let sin_omega = omega.sin();
    let alpha = sin_omega / (2.0 * q);
    let sqrt_a = a.sqrt();

    let b0 = a * ((a + 1.0) + (a - 1.0) * cos_omega + 2.0 * sqrt_a * alpha);
    let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega);
    let b2 = a * ((a + 1.0) + (a - 1.0) * cos_omega - 2.0 * sqrt_a * alpha);
    let a0 = (a + 1.0) - (a - 1.0) * cos_omega + 2.0 * sqrt_a * alpha;
    let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega);
    let a2 = (a + 1.0) - (a - 1.0) * cos_omega - 2.0 * sqrt_a * alpha;

    Biquad::from_coefficients(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0)
}

fn highpass_q_design(f0: f64, q: f64, sample_rate: f64) -> Biquad {
    let omega = 2.0 * std::f64::consts::PI * f0 / sample_rate;
    let cos_omega = omega.cos();
    let sin_omega = omega.sin();
    let alpha = sin_omega / (2.0 * q);
    let a0 = 1.0 + alpha;

    Biquad::from_coefficients(
        ((1.0 + cos_omega) / 2.0) / a0,
        (-(1.0 + cos_omega)) / a0,
        ((1.0 + cos_omega) / 2.0) / a0,
        (-2.0 * cos_omega) / a0,
        (1.0 - alpha) / a0,
    )
}

/// Two-stage K-weighting filter, one instance shared across both
/// channels (state is per-channel internally).
pub struct KWeightingFilter {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeightingFilter {
    pub fn new(sample_rate: f64) -> Self {
        let (shelf, highpass) = if (sample_rate - 48000.0).abs() < 1.0 {
            (pre_filter_48k(), rlb_filter_48k())
        } else {
            (
                shelf_design(1681.974450955533, 3.999843853973347, 0.7071752369554196, sample_rate),
                highpass_q_design(38.13547087602444, 0.5003270373238773, sample_rate),
            )
        };
        Self { shelf, highpass }
    }

    #[inline]
    pub fn process(&mut self, input: f32, channel: usize) -> f32 {
        let stage1 = self.shelf.process(input, channel);
        self.highpass.process(stage1, channel)
    }

    pub fn reset(&mut self) {
        self.shelf.reset();
        self.highpass.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_is_blocked() {
        let mut f = KWeightingFilter::new(48000.0);
        let mut last = 0.0;
        for _ in 0..4000 {
            last = f.process(1.0, 0);
        }
        assert!(last.abs() < 0.05, "DC should be attenuated, got {last}");
    }

    #[test]
    fn non_standard_rate_does_not_panic() {
        let mut f = KWeightingFilter::new(44100.0);
        for _ in 0..100 {
            f.process(0.3, 0);
        }
    }
}
