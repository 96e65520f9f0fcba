//! linkspocket library
//!
//! A client for the OCI distribution API: content descriptors and manifests, the
//! reference grammar, the session-based chunked blob upload, manifest transfer
//! and dedup-on-push, plus the stream wrappers that tie transfers to progress
//! display.

pub mod cli;
pub mod common;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod oci;
pub mod registry;
pub mod upload;

pub use config::{RegistryConfig, Scheme};
pub use digest::Digest;
pub use error::{RegistryError, Result};
pub use logging::Logger;
pub use oci::{Descriptor, Manifest, Reference};
pub use registry::{RegistryClient, RegistryClientBuilder};
