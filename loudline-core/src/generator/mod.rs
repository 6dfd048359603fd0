//! Deterministic test-signal generation with schedule-ahead automation
//! (§4.6). All generator kinds render into a fixed-size stereo buffer
//! that the [`crate::source::SourceController`] pulls from the
//! real-time thread; none of them block or allocate per-sample.

mod glits;
mod lissajous;
mod noise;
mod oscillator;
mod sweep;

pub use glits::GlitsGenerator;
pub use lissajous::LissajousGenerator;
pub use noise::{NoiseColor, NoiseGenerator};
pub use oscillator::Oscillator;
pub use sweep::SweepGenerator;

/// How a generator's output maps onto the two output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Routing {
    #[default]
    Stereo,
    StereoUncorrelated,
    Mono,
    LeftOnly,
    RightOnly,
    AntiPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SignalKind {
    Sine,
    Pink,
    White,
    Brown,
    Sweep,
    Glits,
    Lissajous,
    VectorText,
}

/// Typed preset record, replacing the "dynamic data-attribute" pattern
/// the source UI used with exhaustive case handling on the preset kind
/// (SPEC_FULL.md C.8, §9 design note).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignalPreset {
    pub kind: SignalKind,
    pub freq_hz: f32,
    pub level_dbfs: f32,
    pub lo_hz: f32,
    pub hi_hz: f32,
    pub routing: Routing,
    pub phase_deg: f32,
    pub ratio_num: u32,
    pub ratio_den: u32,
    pub sweep_duration_s: f32,
    pub pulsed_stereo_id: bool,
}

impl Default for SignalPreset {
    fn default() -> Self {
        Self {
            kind: SignalKind::Sine,
            freq_hz: 1000.0,
            level_dbfs: -18.0,
            lo_hz: 20.0,
            hi_hz: 20_000.0,
            routing: Routing::Stereo,
            phase_deg: 0.0,
            ratio_num: 1,
            ratio_den: 1,
            sweep_duration_s: 10.0,
            pulsed_stereo_id: false,
        }
    }
}

fn route(mono_sample: f32, routing: Routing, left_unique: f32) -> (f32, f32) {
    match routing {
        Routing::Stereo => (mono_sample, mono_sample),
        Routing::StereoUncorrelated => (left_unique, mono_sample),
        Routing::Mono => (mono_sample, mono_sample),
        Routing::LeftOnly => (mono_sample, 0.0),
        Routing::RightOnly => (0.0, mono_sample),
        Routing::AntiPhase => (mono_sample, -mono_sample),
    }
}

enum ActiveKind {
    Sine(Oscillator),
    Noise(NoiseGenerator),
    Sweep(SweepGenerator),
    Glits(GlitsGenerator),
    Lissajous(LissajousGenerator),
}

/// Owns exactly one active generator at a time, applying the
/// collapse-swap-expand discipline on preset switch (§4.6
/// "Switch-preset"): the monitor-send gain downstream of the
/// generator is untouched across a swap, and a short gain ramp on the
/// new generator's own output prevents a click at the seam.
pub struct SignalGenerator {
    sample_rate: f32,
    preset: SignalPreset,
    active: ActiveKind,
    /// Per-channel linear gain ramp applied across a preset swap.
    ramp_gain: f32,
    ramp_target: f32,
    ramp_step: f32,
}

const SWAP_RAMP_MS: f32 = 2.0;

impl SignalGenerator {
    pub fn new(sample_rate: f32, preset: SignalPreset) -> Self {
        let active = Self::build(sample_rate, &preset);
        Self {
            sample_rate,
            preset,
            active,
            ramp_gain: 0.0,
            ramp_target: 1.0,
            ramp_step: 1.0 / (sample_rate * SWAP_RAMP_MS / 1000.0),
        }
    }

    fn build(sample_rate: f32, preset: &SignalPreset) -> ActiveKind {
        match preset.kind {
            SignalKind::Sine | SignalKind::VectorText => {
                ActiveKind::Sine(Oscillator::new(sample_rate, preset.freq_hz))
            }
            SignalKind::Pink => ActiveKind::Noise(NoiseGenerator::new(
                sample_rate,
                NoiseColor::Pink,
                preset.lo_hz,
                preset.hi_hz,
                preset.routing == Routing::StereoUncorrelated,
            )),
            SignalKind::White => ActiveKind::Noise(NoiseGenerator::new(
                sample_rate,
                NoiseColor::White,
                preset.lo_hz,
                preset.hi_hz,
                preset.routing == Routing::StereoUncorrelated,
            )),
            SignalKind::Brown => ActiveKind::Noise(NoiseGenerator::new(
                sample_rate,
                NoiseColor::Brown,
                preset.lo_hz,
                preset.hi_hz,
                preset.routing == Routing::StereoUncorrelated,
            )),
            SignalKind::Sweep => ActiveKind::Sweep(SweepGenerator::new(
                sample_rate,
                preset.lo_hz,
                preset.hi_hz,
                preset.sweep_duration_s,
            )),
            SignalKind::Glits => ActiveKind::Glits(GlitsGenerator::new(sample_rate)),
            SignalKind::Lissajous => ActiveKind::Lissajous(LissajousGenerator::new(
                sample_rate,
                preset.freq_hz,
                preset.ratio_num,
                preset.ratio_den,
                preset.phase_deg,
            )),
        }
    }

    /// Tears down the current generator and brings up `preset`,
    /// preserving the ramp-based click protection across the seam.
    pub fn switch_preset(&mut self, preset: SignalPreset) {
        self.active = Self::build(self.sample_rate, &preset);
        self.preset = preset;
        self.ramp_gain = 0.0;
        self.ramp_target = 1.0;
    }

    pub fn preset(&self) -> SignalPreset {
        self.preset
    }

    pub fn is_pulsed(&self) -> bool {
        self.preset.pulsed_stereo_id
    }

    /// Render `left`/`right` buffers of equal length.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let amplitude = 10f32.powf(self.preset.level_dbfs / 20.0);
        let routing = self.preset.routing;

        for i in 0..left.len().min(right.len()) {
            let (mono, left_unique) = match &mut self.active {
                ActiveKind::Sine(osc) => {
                    let s = osc.next_sample() * amplitude;
                    (s, s)
                }
                ActiveKind::Noise(noise) => {
                    let (l, r) = noise.next_pair();
                    (r * amplitude, l * amplitude)
                }
                ActiveKind::Sweep(sweep) => {
                    let s = sweep.next_sample() * amplitude;
                    (s, s)
                }
                ActiveKind::Glits(glits) => {
                    let (l, r) = glits.next_pair(amplitude);
                    left[i] = l * self.ramp_gain;
                    right[i] = r * self.ramp_gain;
                    self.advance_ramp();
                    continue;
                }
                ActiveKind::Lissajous(liss) => {
                    let (l, r) = liss.next_pair(amplitude);
                    left[i] = l * self.ramp_gain;
                    right[i] = r * self.ramp_gain;
                    self.advance_ramp();
                    continue;
                }
            };
            let (l, r) = route(mono, routing, left_unique);
            left[i] = l * self.ramp_gain;
            right[i] = r * self.ramp_gain;
            self.advance_ramp();
        }
    }

    fn advance_ramp(&mut self) {
        if self.ramp_gain < self.ramp_target {
            self.ramp_gain = (self.ramp_gain + self.ramp_step).min(self.ramp_target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_preset_ramps_from_silence() {
        let mut generator = SignalGenerator::new(
            48000.0,
            SignalPreset {
                kind: SignalKind::Sine,
                ..Default::default()
            },
        );
        let mut l = [0.0f32; 8];
        let mut r = [0.0f32; 8];
        generator.switch_preset(SignalPreset {
            kind: SignalKind::Sine,
            freq_hz: 2000.0,
            ..Default::default()
        });
        generator.render(&mut l, &mut r);
        assert!(l[0].abs() < l[7].abs() || l[7] == 0.0, "ramp should not start at full gain");
    }

    #[test]
    fn anti_phase_routing_inverts_right() {
        let mut generator = SignalGenerator::new(
            48000.0,
            SignalPreset {
                kind: SignalKind::Sine,
                routing: Routing::AntiPhase,
                level_dbfs: 0.0,
                ..Default::default()
            },
        );
        let mut l = [0.0f32; 256];
        let mut r = [0.0f32; 256];
        generator.render(&mut l, &mut r);
        for i in 64..256 {
            assert!((l[i] + r[i]).abs() < 1e-5);
        }
    }
}
