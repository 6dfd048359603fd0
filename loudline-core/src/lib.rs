//! Metering core: signal analysis, synthetic-signal generation and the
//! real-time audio engine. No UI, no persistence, no network — those
//! live in the crates above this one.

pub mod biquad;
pub mod engine;
pub mod error;
pub mod generator;
pub mod goniometer;
pub mod kweight;
pub mod lufs;
pub mod measure_loop;
pub mod meter_state;
pub mod peak_hold;
pub mod ppm;
pub mod render_state;
pub mod sample_window;
pub mod source;
pub mod stereo;
pub mod transition_guard;
pub mod true_peak;

pub use engine::{AudioCommand, AudioEngine, AudioEvent, SourceMode};
pub use error::{CaptureError, GeneratorError, PresetError};
pub use generator::{SignalGenerator, SignalKind, SignalPreset};
pub use measure_loop::MeasureLoop;
pub use meter_state::MeterState;
pub use render_state::RenderState;
pub use sample_window::{SampleWindow, WindowSnapshot, WINDOW_SIZE};
pub use source::SourceController;
pub use transition_guard::TransitionGuard;
