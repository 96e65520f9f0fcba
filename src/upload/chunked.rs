//! Chunked blob upload
//!
//! POST opens a session, each PATCH sends one chunk to the location returned by the
//! previous response, and a PUT carrying the digest closes it. The location and
//! offset travel through the loop as an [`UploadSession`] value that each step
//! consumes and replaces.

use crate::common::streams::read_full;
use crate::common::BlobSource;
use crate::digest::Digest;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::oci::{Descriptor, OCTET_STREAM};
use crate::registry::operations::api_url;
use crate::registry::transport::{HttpRequest, HttpTransport};
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Where the next chunk goes and how many bytes the server has accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    location: Url,
    offset: u64,
}

impl UploadSession {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            offset: 0,
        }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// `Content-Range` for a chunk of `len` bytes at the current offset, inclusive
    /// end. `len` must be positive.
    pub fn content_range(&self, len: u64) -> String {
        debug_assert!(len > 0);
        format!("{}-{}", self.offset, self.offset + len - 1)
    }

    /// The session after `len` more bytes were accepted and the server handed out
    /// `next_location`
    pub fn advance(self, len: u64, next_location: Url) -> Self {
        Self {
            location: next_location,
            offset: self.offset + len,
        }
    }

    /// Current location with its `digest` query parameter set to `digest`. Every
    /// other query parameter is kept in order.
    pub fn finalize_url(&self, digest: &Digest) -> Url {
        let kept: Vec<(String, String)> = self
            .location
            .query_pairs()
            .filter(|(key, _)| key != "digest")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.location.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("digest", &digest.to_string());
        url
    }
}

/// Resolve a `Location` header, which registries may send relative to their root
pub fn resolve_location(base: &Url, location: &str) -> Result<Url> {
    Ok(base.join(location)?)
}

pub struct ChunkedUploader {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    chunk_size: usize,
    logger: Logger,
}

impl ChunkedUploader {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: Url,
        chunk_size: usize,
        logger: Logger,
    ) -> Self {
        Self {
            transport,
            base_url,
            chunk_size,
            logger,
        }
    }

    /// Run the whole POST, PATCH..., PUT sequence for one blob. Sends exactly
    /// `descriptor.size` bytes read from `content`.
    pub async fn upload(
        &self,
        repository: &str,
        descriptor: &Descriptor,
        content: BlobSource<'_>,
    ) -> Result<()> {
        let size = descriptor.size;
        self.logger.step(&format!(
            "Uploading blob {} ({})",
            descriptor.digest.short(),
            self.logger.format_size(size)
        ));

        let start_time = Instant::now();
        let mut session = self.initiate(repository).await?;
        let mut buffer = vec![0u8; self.chunk_size];
        let mut chunks = 0usize;

        while session.offset() < size {
            let want = (self.chunk_size as u64).min(size - session.offset()) as usize;
            let read = read_full(&mut *content, &mut buffer[..want])?;
            if read == 0 {
                return Err(RegistryError::Upload(format!(
                    "source for {} ended after {} of {} bytes",
                    descriptor.digest,
                    session.offset(),
                    size
                )));
            }

            session = self.send_chunk(session, &buffer[..read]).await?;
            chunks += 1;
            self.logger.detail(&format!(
                "Chunk {} accepted, {} / {}",
                chunks,
                self.logger.format_size(session.offset()),
                self.logger.format_size(size)
            ));
        }

        self.finalize(&session, &descriptor.digest).await?;
        self.logger.success(&format!(
            "Blob {} uploaded in {} chunk(s), {}",
            descriptor.digest.short(),
            chunks,
            self.logger.format_duration(start_time.elapsed())
        ));
        Ok(())
    }

    /// Open an upload session
    pub async fn initiate(&self, repository: &str) -> Result<UploadSession> {
        let url = api_url(&self.base_url, repository, &["blobs", "uploads", ""])?;
        self.logger.detail(&format!("Opening upload session: POST {}", url));

        let response = self.transport.send(HttpRequest::new(Method::POST, url)).await?;
        if !response.status.is_success() {
            return Err(response.into_error("blob upload initiation").await);
        }

        let location = response.location().ok_or_else(|| {
            RegistryError::Upload("upload initiation response has no Location header".to_string())
        })?;
        Ok(UploadSession::new(resolve_location(&self.base_url, location)?))
    }

    /// PATCH one chunk to the session's current location
    pub async fn send_chunk(&self, session: UploadSession, chunk: &[u8]) -> Result<UploadSession> {
        let len = chunk.len() as u64;
        let request = HttpRequest::new(Method::PATCH, session.location().clone())
            .header(CONTENT_LENGTH, HeaderValue::from(len))
            .header(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM))
            .try_header(CONTENT_RANGE, &session.content_range(len))?
            .body(chunk.to_vec());

        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(response.into_error("blob chunk upload").await);
        }

        let location = response.location().ok_or_else(|| {
            RegistryError::Upload(format!(
                "chunk response at offset {} has no Location header",
                session.offset()
            ))
        })?;
        let next = resolve_location(&self.base_url, location)?;
        Ok(session.advance(len, next))
    }

    /// PUT to the last location with the digest query parameter
    pub async fn finalize(&self, session: &UploadSession, digest: &Digest) -> Result<()> {
        let url = session.finalize_url(digest);
        self.logger.detail(&format!("Finalizing upload: PUT {}", url));

        let response = self.transport.send(HttpRequest::new(Method::PUT, url)).await?;
        if !response.status.is_success() {
            return Err(response.into_error("blob upload finalize").await);
        }
        Ok(())
    }
}
