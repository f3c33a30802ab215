/// DWHQ Error Module
///
/// This module defines the error types for the dwhq crate. The variants
/// follow the driver-level error taxonomy: terminal errors are raised
/// immediately, transient errors are candidates for a bounded retry, and
/// `ConnectionExhausted` reports a retry budget that has been spent.
use thiserror::Error;

/// Error type covering every failure mode of the data-warehouse client.
///
/// Retryability is encoded in [`DwhError::is_retryable`] so the connect
/// loop has a single place to consult:
/// - Terminal: `Programming`, `Data`, `Integrity`, `NotSupported`, `Config`
/// - Transient: `Operational`, `Timeout`, `Database`
#[derive(Error, Debug)]
pub enum DwhError {
    /// Malformed query or request; retrying cannot help.
    #[error("Programming error: {0}")]
    Programming(String),

    /// Invalid data for the requested operation.
    #[error("Data error: {0}")]
    Data(String),

    /// Constraint violation reported by the server.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Operation the server or driver does not support.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Configuration errors (bad driver index, invalid settings).
    /// Raised before any network activity.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connectivity hiccups and other operational failures; retryable.
    #[error("Operational error: {0}")]
    Operational(String),

    /// Connection or login timeout; retryable.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic driver/database failure; retryable.
    #[error("Database error: {0}")]
    Database(String),

    /// The retry budget was spent without a successful connection.
    #[error("Failed to connect to the data warehouse after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    /// Query execution errors outside the connect phase.
    #[error("Query error: {0}")]
    Query(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors (table export)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DwhError {
    /// Whether the connect loop may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DwhError::Operational(_) | DwhError::Timeout(_) | DwhError::Database(_)
        )
    }
}

/// Type alias for Result to use DwhError as the error type.
///
/// This provides a consistent error type across the entire crate
/// instead of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, DwhError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let prog_err = DwhError::Programming("bad column".to_string());
        assert!(prog_err.to_string().contains("Programming error"));

        let config_err = DwhError::Config("driver index 7 is out of range".to_string());
        assert!(config_err.to_string().contains("Configuration error"));

        let exhausted = DwhError::ConnectionExhausted { attempts: 3 };
        assert!(exhausted.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_retryability_classification() {
        assert!(DwhError::Operational("network blip".into()).is_retryable());
        assert!(DwhError::Timeout("login timed out".into()).is_retryable());
        assert!(DwhError::Database("generic failure".into()).is_retryable());

        assert!(!DwhError::Programming("syntax".into()).is_retryable());
        assert!(!DwhError::Data("bad value".into()).is_retryable());
        assert!(!DwhError::Integrity("fk violation".into()).is_retryable());
        assert!(!DwhError::NotSupported("MARS".into()).is_retryable());
        assert!(!DwhError::Config("bad index".into()).is_retryable());
        assert!(!DwhError::ConnectionExhausted { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let dwh_err: DwhError = io_err.into();
        match dwh_err {
            DwhError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let json_str = "{ invalid json }";
        let json_err: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str(json_str);
        let dwh_err: DwhError = json_err.unwrap_err().into();
        match dwh_err {
            DwhError::Json(_) => {}
            _ => panic!("Expected JSON error"),
        }
    }
}
