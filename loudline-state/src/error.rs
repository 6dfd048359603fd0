//! Error kinds for persistence and migration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file: {0}")]
    Read(String),
    #[error("failed to write state file: {0}")]
    Write(String),
    #[error("failed to parse state file: {0}")]
    Parse(String),
    #[error("unknown schema version {0}, newest known is {1}")]
    UnknownSchemaVersion(u32, u32),
}
