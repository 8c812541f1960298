//! Error types for the serial link.
//!
//! Every error surfaced by a [`FrameSource`](crate::FrameSource) is fatal to
//! the event bridge: the gateway stops and exits so a supervisor can restart
//! it with a fresh device handle.

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur on the link to the door controller.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The serial device could not be opened or configured.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// A command could not be framed.
    #[error("Framing error: {0}")]
    Framing(#[from] latchkey_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new open failure error.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_error() {
        let error = HardwareError::open_failed("/dev/ttyUSB0", "No such file or directory");
        assert!(matches!(error, HardwareError::OpenFailed { .. }));
        assert_eq!(
            error.to_string(),
            "Failed to open /dev/ttyUSB0: No such file or directory"
        );
    }

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("/dev/ttyACM0");
        assert_eq!(error.to_string(), "Device disconnected: /dev/ttyACM0");
    }

    #[test]
    fn test_framing_error_from_core() {
        let error: HardwareError = latchkey_core::Error::FrameTooLarge {
            size: 5000,
            max_size: 4096,
        }
        .into();
        assert!(matches!(error, HardwareError::Framing(_)));
    }
}
