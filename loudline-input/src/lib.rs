//! Input types for the Loudline meter suite - command definitions and
//! modal keyboard translation.

mod commands;
mod modal;

pub use commands::{Command, Direction, Mode, Routing, SignalKind, SourceMode};
pub use modal::InputHandler;
