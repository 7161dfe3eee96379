//! Error types for platform operations

use thiserror::Error;

/// Result type alias for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Errors reported by a `TemplateCatalog` or `UnitRuntime` implementation
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The API server answered with an error status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API server
        message: String,
    },

    /// Object does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Connection or protocol failure before an answer was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reading a stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container will not start without outside intervention
    #[error("Container did not start: {0}")]
    NotStarted(String),

    /// The platform returned an object missing required fields
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl PlatformError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Api { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(PlatformError::NotFound("pod".into()).is_not_found());
        assert!(PlatformError::api_error(404, "gone").is_not_found());
        assert!(!PlatformError::api_error(409, "conflict").is_not_found());
    }

    #[test]
    fn test_display() {
        let err = PlatformError::api_error(422, "spec.containers: Required value");
        assert_eq!(
            err.to_string(),
            "API error (status 422): spec.containers: Required value"
        );
    }
}
