//! Blob operations for registry client
//!
//! Implements the distribution API blob endpoints:
//! - Blob existence checks (GET /v2/{name}/blobs/{digest})
//! - Chunked blob upload (/v2/{name}/blobs/uploads/)
//! - Streamed blob download (GET /v2/{name}/blobs/{digest})

use crate::common::streams::TeeWriter;
use crate::common::{BlobPuller, BlobPusher, BlobSource};
use crate::config::RegistryConfig;
use crate::digest::{Digest, DigestWriter};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::oci::Descriptor;
use crate::registry::operations::{api_url, existence};
use crate::registry::transport::{Body, HttpRequest, HttpTransport};
use crate::upload::ChunkedUploader;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Method;
use std::io::Write;
use std::sync::Arc;
use url::Url;

pub struct BlobOperations {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    strict_existence_checks: bool,
    uploader: ChunkedUploader,
    output: Logger,
}

impl BlobOperations {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &RegistryConfig,
        output: Logger,
    ) -> Result<Self> {
        let base_url = config.base_url()?;
        let uploader = ChunkedUploader::new(
            Arc::clone(&transport),
            base_url.clone(),
            config.chunk_size,
            output.clone(),
        );

        Ok(Self {
            transport,
            base_url,
            strict_existence_checks: config.strict_existence_checks,
            uploader,
            output,
        })
    }

    fn blob_url(&self, repository: &str, digest: &Digest) -> Result<Url> {
        let digest = digest.to_string();
        api_url(&self.base_url, repository, &["blobs", digest.as_str()])
    }
}

#[async_trait]
impl BlobPuller for BlobOperations {
    async fn does_blob_exist(&self, repository: &str, digest: &Digest) -> Result<bool> {
        let url = self.blob_url(repository, digest)?;
        self.output.detail(&format!(
            "Checking blob existence in remote registry: {}",
            digest.short()
        ));

        let response = self.transport.send(HttpRequest::new(Method::GET, url)).await?;
        existence(
            response,
            self.strict_existence_checks,
            "blob existence check",
            &format!("Blob {}", digest.short()),
            &self.output,
        )
        .await
    }

    async fn pull_blob(&self, repository: &str, digest: &Digest) -> Result<BlobReader> {
        let url = self.blob_url(repository, digest)?;
        self.output.detail(&format!("Pulling blob {} from {}", digest.short(), repository));

        let response = self.transport.send(HttpRequest::new(Method::GET, url)).await?;
        if !response.status.is_success() {
            return Err(response.into_error("blob pull").await);
        }

        Ok(BlobReader::new(response.into_body()))
    }
}

#[async_trait]
impl BlobPusher for BlobOperations {
    async fn push_blob(
        &self,
        repository: &str,
        descriptor: &Descriptor,
        content: BlobSource<'_>,
    ) -> Result<()> {
        self.uploader.upload(repository, descriptor, content).await
    }
}

/// Streaming view of a pulled blob body
///
/// The body is released by [`BlobReader::close`] or when the reader is dropped,
/// so every exit path of the caller frees the connection.
pub struct BlobReader {
    body: Option<Body>,
}

impl BlobReader {
    pub fn new(body: Body) -> Self {
        Self { body: Some(body) }
    }

    /// Next chunk of the body, `None` at the end or once closed
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };

        match body.next().await {
            Some(chunk) => chunk.map(Some),
            None => {
                self.close();
                Ok(None)
            }
        }
    }

    /// Drain the rest of the body into `writer`, returning the bytes written
    pub async fn copy_to(&mut self, writer: &mut (dyn Write + Send)) -> Result<u64> {
        let mut written = 0u64;
        while let Some(chunk) = self.next_chunk().await? {
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        writer.flush()?;
        Ok(written)
    }

    /// [`BlobReader::copy_to`], failing if the copied bytes do not hash to `expected`
    pub async fn copy_verified(
        &mut self,
        writer: &mut (dyn Write + Send),
        expected: &Digest,
    ) -> Result<u64> {
        let mut tee = TeeWriter::new(writer, DigestWriter::new());
        let written = self.copy_to(&mut tee).await?;

        let (_, digester) = tee.into_inner();
        let actual = digester.finish();
        if actual != *expected {
            return Err(RegistryError::InvalidDigest {
                digest: expected.to_string(),
                reason: format!("downloaded content hashes to {}", actual),
            });
        }
        Ok(written)
    }

    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.copy_to(&mut bytes).await?;
        Ok(bytes)
    }

    pub fn close(&mut self) {
        self.body = None;
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }
}

impl std::fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader")
            .field("closed", &self.is_closed())
            .finish()
    }
}
