use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection timed out")]
    Timeout,
    #[error("failed to send client message")]
    SendFailed,
    #[error("malformed broker frame: {0}")]
    Protocol(String),
}
