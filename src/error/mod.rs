//! Error types and handlers for registry operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A reference string that does not match the reference grammar
    #[error("Invalid reference: {reference}")]
    InvalidReference { reference: String },

    /// A digest string that is not `algo:hex`
    #[error("Invalid digest '{digest}': {reason}")]
    InvalidDigest { digest: String, reason: String },

    /// The registry has no manifest for the requested tag or digest
    #[error("Could not find manifest for {reference}")]
    UnknownManifest { reference: String },

    /// Non-success HTTP status from the registry
    #[error("HTTP error during {context} (status {status}): {message}")]
    Http {
        context: String,
        status: u16,
        message: String,
    },

    /// Transport failure, no response was received
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Violations of the chunked upload protocol
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RegistryError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Http { status, .. } => Some(*status),
            RegistryError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_manifest() {
        let err = RegistryError::UnknownManifest {
            reference: "localhost:5000/seeds:abc123".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find manifest for localhost:5000/seeds:abc123"
        );
    }

    #[test]
    fn test_error_display_invalid_reference() {
        let err = RegistryError::InvalidReference {
            reference: "bad:ref:".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid reference: bad:ref:");
    }

    #[test]
    fn test_http_error_status() {
        let err = RegistryError::Http {
            context: "manifest push".to_string(),
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(RegistryError::Upload("x".to_string()).status(), None);
    }
}
