//! Error types for hardware operations.
//!
//! Startup failures (a GPIO line or the serial device cannot be claimed) are
//! reported as [`HardwareError::InitializationFailed`] and are fatal for the
//! terminal. Read misses are not errors at all: input sources return an empty
//! credential instead.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation is not supported on this platform.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data passed to or received from a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Error from the core value types.
    #[error(transparent)]
    Core(#[from] fobreader_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Whether this error happened while bringing the terminal up.
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Self::InitializationFailed { .. })
    }
}

impl From<gpio_cdev::Error> for HardwareError {
    fn from(error: gpio_cdev::Error) -> Self {
        Self::communication(format!("GPIO: {error}"))
    }
}

impl From<serialport::Error> for HardwareError {
    fn from(error: serialport::Error) -> Self {
        Self::communication(format!("Serial: {error}"))
    }
}
