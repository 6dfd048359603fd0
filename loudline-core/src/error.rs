//! Error kinds for the metering core (§7). Every kind documents its
//! own propagation policy at the call site rather than here: most are
//! recoverable and surface as a UI-visible message while the system
//! returns to an idle state, never as a panic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio engine available on this host")]
    UnsupportedEngine,
    #[error("capture permission denied or no audio track available")]
    PermissionDenied,
    #[error("requested capture device was not found")]
    DeviceNotFound,
    #[error("capture stream build failed: {0}")]
    StreamBuildFailed(String),
    #[error("capture ended unexpectedly")]
    StreamEnded,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("preset switch failed: {0}")]
    SwitchFailed(String),
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("invalid preset parameter: {0}")]
    InvalidParameter(String),
}
