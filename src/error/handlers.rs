//! Standardized mapping from HTTP responses to registry errors

use crate::error::RegistryError;
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Build an error for a non-success status with a message tailored to the status
    pub fn handle_status(status: StatusCode, error_text: &str, context: &str) -> RegistryError {
        let message = match status.as_u16() {
            400 => {
                if error_text.contains("DIGEST_INVALID") {
                    format!(
                        "Digest validation failed, uploaded content does not match the digest: {}",
                        error_text
                    )
                } else {
                    format!("Bad request: {}", error_text)
                }
            }
            401 => format!("Authentication required: {}", error_text),
            403 => format!("Permission denied: {}", error_text),
            404 => format!("Repository, upload session or content not found: {}", error_text),
            409 => format!("Conflict: {}", error_text),
            413 => format!("Content too large for registry: {}", error_text),
            416 => format!(
                "Requested range not satisfiable, upload session out of sync: {}",
                error_text
            ),
            429 => format!("Rate limited: {}", error_text),
            500 => format!("Registry server error: {}", error_text),
            502 | 503 => format!("Registry unavailable: {}", error_text),
            _ => format!("Unexpected response: {}", error_text),
        };

        RegistryError::Http {
            context: context.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}
