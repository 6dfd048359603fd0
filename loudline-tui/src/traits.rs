//! Widget interface consumed by the core (§6). Each widget is a black
//! box exposing `resize()` and exactly one of the draw variants below;
//! widgets never call back into the core (§9 design note on breaking
//! the widgets/bootstrap cycle).

use loudline_core::goniometer::GoniometerPoint;

/// Every widget can be told its drawing area changed.
pub trait Resizable {
    fn resize(&mut self, width: u16, height: u16);
}

/// Widgets that draw directly from L/R sample buffers (waveform-style
/// displays). `should_render` is sourced from [`loudline_core::TransitionGuard::should_render`];
/// implementations should skip drawing (or freeze the last frame) when
/// it is `false`.
pub trait TimeDomainWidget: Resizable {
    fn draw(&mut self, buf_l: &[f32], buf_r: &[f32], should_render: bool);
}

/// Widgets that draw a single scalar metric (a LUFS readout, a numeric
/// correlation display).
pub trait ScalarWidget: Resizable {
    fn draw_value(&mut self, metric: Option<f32>);
}

/// Widgets fed by pre-transformed points (goniometer / vectorscope).
pub trait PointsWidget: Resizable {
    fn draw_from_points(&mut self, points: &[GoniometerPoint]);
}

/// Widgets fed by one-third-octave band magnitudes (spectrum display).
pub trait BandsWidget: Resizable {
    fn draw_from_bands(&mut self, bands: &[f32]);
}
