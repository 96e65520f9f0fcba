//! Protocol role interfaces
//!
//! Pulling and pushing are separate capabilities. A registry backend implements
//! whichever roles it supports, and decorators such as the dedup wrappers in
//! [`crate::registry::dedup`] compose them without knowing the backend.

use crate::digest::Digest;
use crate::error::Result;
use crate::oci::{Descriptor, Manifest};
use crate::registry::BlobReader;
use async_trait::async_trait;
use std::io::Read;

/// Blob content source handed to a push
pub type BlobSource<'a> = &'a mut (dyn Read + Send);

#[async_trait]
pub trait BlobPuller: Send + Sync {
    /// Whether the registry already stores the blob
    async fn does_blob_exist(&self, repository: &str, digest: &Digest) -> Result<bool>;

    /// Open a streaming reader over a stored blob. The caller owns its closure.
    async fn pull_blob(&self, repository: &str, digest: &Digest) -> Result<BlobReader>;
}

#[async_trait]
pub trait BlobPusher: Send + Sync {
    /// Upload exactly `descriptor.size` bytes from `content` under `descriptor.digest`
    async fn push_blob(
        &self,
        repository: &str,
        descriptor: &Descriptor,
        content: BlobSource<'_>,
    ) -> Result<()>;
}

#[async_trait]
pub trait ManifestPuller: Send + Sync {
    async fn does_manifest_exist(&self, repository: &str, reference: &str) -> Result<bool>;

    /// `None` when the registry has no manifest under `reference`
    async fn pull_manifest(&self, repository: &str, reference: &str) -> Result<Option<Manifest>>;
}

#[async_trait]
pub trait ManifestPusher: Send + Sync {
    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<()>;
}
