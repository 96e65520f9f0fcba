//! Registry operations - one backend per content kind
//!
//! [`BlobOperations`] and [`ManifestOperations`] speak the distribution HTTP API
//! through an [`HttpTransport`](crate::registry::transport::HttpTransport). They do
//! no deduplication of their own; see [`crate::registry::dedup`].

pub mod blob_operations;
pub mod manifest_operations;

pub use blob_operations::{BlobOperations, BlobReader};
pub use manifest_operations::ManifestOperations;

use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::transport::HttpResponse;
use reqwest::StatusCode;
use url::Url;

/// `{base}v2/{repository}/{tail...}` with every component pushed as its own
/// percent-encoded path segment.
///
/// `.` and `..` would be dropped by URL normalization and are rejected, as are
/// empty segments. The one exception is a trailing empty `tail` element, which
/// leaves the path ending in `/`.
pub fn api_url(base: &Url, repository: &str, tail: &[&str]) -> Result<Url> {
    let segments: Vec<&str> = repository.split('/').chain(tail.iter().copied()).collect();
    let last = segments.len() - 1;
    let usable = segments.iter().enumerate().all(|(i, segment)| match *segment {
        "." | ".." => false,
        "" => i == last && !tail.is_empty(),
        _ => true,
    });
    if !usable {
        return Err(RegistryError::InvalidReference {
            reference: segments.join("/"),
        });
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RegistryError::Configuration(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push("v2")
        .extend(segments);
    Ok(url)
}

/// Interpret an existence probe. 200 means present and 404 absent. Any other
/// status is reported as absent with a warning, or as an error when `strict`.
pub(crate) async fn existence(
    response: HttpResponse,
    strict: bool,
    context: &str,
    subject: &str,
    logger: &Logger,
) -> Result<bool> {
    match response.status {
        StatusCode::OK => {
            logger.detail(&format!("✅ {} exists in registry", subject));
            Ok(true)
        }
        StatusCode::NOT_FOUND => {
            logger.detail(&format!("❌ {} does not exist in registry", subject));
            Ok(false)
        }
        status if strict => {
            logger.error(&format!(
                "Unexpected status {} during {} for {}",
                status, context, subject
            ));
            Err(response.into_error(context).await)
        }
        status => {
            logger.warning(&format!(
                "Unexpected status {} during {} for {}, treating it as absent",
                status, context, subject
            ));
            Ok(false)
        }
    }
}
