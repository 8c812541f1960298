use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Invalid RFID: {0}")]
    InvalidRfid(String),

    // Lifecycle errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Raised by codec-driven readers (`FramedRead`) when the byte source fails
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid message format error.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessageFormat {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
