//! Registry module for OCI distribution API interactions
//!
//! The transport seam, the per-content-kind operations, the dedup aggregates and
//! the [`RegistryClient`] facade that ties them together.

pub mod client;
pub mod dedup;
pub mod operations;
pub mod transport;

pub use client::{RegistryClient, RegistryClientBuilder};
pub use dedup::{BlobPullPusher, ManifestPullPusher};
pub use operations::{BlobOperations, BlobReader, ManifestOperations};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
