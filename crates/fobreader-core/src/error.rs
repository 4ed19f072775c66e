use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Value errors
    #[error("Invalid pin role: {0}")]
    InvalidPinRole(String),

    #[error("Invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
