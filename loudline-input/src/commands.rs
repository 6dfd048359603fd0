//! Command definitions for the meter suite's operator keyboard input.

pub use loudline_core::engine::SourceMode;
pub use loudline_core::generator::{Routing, SignalKind};

/// Input modes (vim-style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Command,
    Help,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Command => "COMMAND",
            Mode::Help => "HELP",
        }
    }
}

/// Cycling direction for ring-shaped selections (source, generator kind,
/// routing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Commands that can be dispatched from input.
#[derive(Debug, Clone)]
pub enum Command {
    // Source routing (§4.7)
    SwitchSource(SourceMode),
    CycleSource(Direction),

    // Generator selection and parameters (§4.6)
    CycleGeneratorKind(Direction),
    CycleRouting,
    AdjustGeneratorLevel(f32),
    AdjustGeneratorFreq(f32),
    ToggleStereoIdPulse,

    // Per-source trim / monitor (§4.7)
    AdjustTrim(SourceMode, f32),
    AdjustMonitorGain(SourceMode, f32),
    ToggleMonitorMute(SourceMode),

    // Process-wide settings (§4.12)
    AdjustTargetLufs(f32),
    AdjustTruePeakLimit(f32),
    AdjustRadarWindow(f32),

    // Meter lifecycle
    ResetMeters,

    // Focus navigation
    CycleFocus,

    // Mode changes
    EnterCommandMode,
    EnterNormalMode,
    ToggleHelp,

    // Command mode
    ExecuteCommand(String),

    // Application
    Quit,
    Cancel,

    // Help navigation
    HelpScrollUp,
    HelpScrollDown,
}
