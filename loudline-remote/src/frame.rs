//! Wire shapes for the remote broker protocol (§4.10, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LufsFields {
    pub m: f32,
    pub s: f32,
    pub i: f32,
    pub lra: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct StereoPair {
    pub l: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct StereoFields {
    pub corr: f32,
    pub bal: f32,
    pub width: f32,
    pub width_peak: f32,
    pub mid: f32,
    pub side: f32,
    pub rot: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct GoniometerPoint {
    pub m: f32,
    pub s: f32,
}

/// 128 pre-transformed (M,S) pairs and 31 ISO 266 one-third-octave
/// band magnitudes, as delivered by the probe (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualizationFields {
    pub goniometer_points: Vec<GoniometerPoint>,
    pub spectrum_bands: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsFrame {
    pub probe_id: String,
    pub lufs: LufsFields,
    pub true_peak: StereoPair,
    pub ppm: StereoPair,
    pub rms: StereoPair,
    pub stereo: StereoFields,
    pub visualization: VisualizationFields,
    pub latency_ms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub id: String,
    pub name: String,
    pub is_online: bool,
}

/// Client to broker messages (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { probe_id: String },
    Unsubscribe { probe_id: String },
    RefreshProbeList,
}

/// Broker to client messages (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ProbeList { probes: Vec<ProbeInfo> },
    Metrics { probe_id: String, frame: MetricsFrame },
    Status { state: String },
}
