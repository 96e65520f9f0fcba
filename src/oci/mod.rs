//! OCI content model
//!
//! Descriptors, manifests and references as they travel over the distribution
//! protocol. Nothing in here performs network I/O.

pub mod descriptor;
pub mod manifest;
pub mod reference;

pub use descriptor::{Annotations, Descriptor};
pub use manifest::Manifest;
pub use reference::Reference;

/// Media type of an OCI image manifest
pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Media type of the empty `{}` config blob
pub const OCI_EMPTY: &str = "application/vnd.oci.empty.v1+json";

/// Media type used for raw blob chunks
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Annotation carrying an artifact's display filename on a layer descriptor
pub const FILENAME_ANNOTATION: &str = "org.opencontainers.image.title";
