//! Error types for hardware capability operations.
//!
//! These cover the ways the serial transport and the biometric sensor can
//! fail. The session layer turns every one of them into state plus a log
//! line, so the `Display` text is what the user ends up seeing.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during transport or sensor operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No usable radio adapter on this host.
    #[error("Bluetooth adapter not available")]
    AdapterUnavailable,

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation is not supported by this device.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Opening the link failed; the message is shown as reported by the
    /// transport.
    #[error("{message}")]
    ConnectionFailed { message: String },

    /// The sensor read a biometric that did not match.
    #[error("Biometric did not match, try again")]
    BiometricRejected,

    /// The sensor reported an error code.
    #[error("Error {code}: {message}")]
    BiometricError { code: i32, message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a new sensor error.
    pub fn biometric(code: i32, message: impl Into<String>) -> Self {
        Self::BiometricError {
            code,
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_unavailable_error() {
        let error = HardwareError::AdapterUnavailable;
        assert_eq!(error.to_string(), "Bluetooth adapter not available");
    }

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("HC-05");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: HC-05");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(3000);
        assert_eq!(error.to_string(), "Operation timeout after 3000ms");
    }

    #[test]
    fn test_connection_failed_shows_raw_reason() {
        let error = HardwareError::connection_failed("timeout");
        assert_eq!(error.to_string(), "timeout");
    }

    #[test]
    fn test_biometric_errors() {
        assert_eq!(
            HardwareError::BiometricRejected.to_string(),
            "Biometric did not match, try again"
        );
        assert_eq!(
            HardwareError::biometric(7, "Too many attempts").to_string(),
            "Error 7: Too many attempts"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error: HardwareError = io.into();
        assert!(matches!(error, HardwareError::Io(_)));
        assert_eq!(error.to_string(), "I/O error: refused");
    }

    #[test]
    fn test_unsupported_and_other() {
        assert_eq!(
            HardwareError::unsupported("face unlock").to_string(),
            "Unsupported operation: face unlock"
        );
        assert_eq!(HardwareError::other("boom").to_string(), "boom");
    }
}
