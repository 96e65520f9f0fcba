//! Registry client facade
//!
//! [`RegistryClient`] wires the blob and manifest backends to one transport and
//! wraps them in the dedup aggregates. Scheme and host are fixed at construction
//! through [`RegistryConfig`]; every call only names a repository and a digest or
//! reference.

use crate::common::streams::{ProgressReader, Tick};
use crate::common::{BlobPuller, BlobPusher, BlobSource, ManifestPuller, ManifestPusher};
use crate::config::RegistryConfig;
use crate::digest::Digest;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::oci::{Descriptor, Manifest, Reference};
use crate::registry::dedup::{BlobPullPusher, ManifestPullPusher};
use crate::registry::operations::{BlobOperations, BlobReader, ManifestOperations};
use crate::registry::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

pub struct RegistryClientBuilder {
    config: RegistryConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            transport: None,
            output: Logger::default(),
        }
    }

    /// Replace the default `reqwest` transport
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        let blob_ops = Arc::new(BlobOperations::new(
            Arc::clone(&transport),
            &self.config,
            self.output.clone(),
        )?);
        let manifest_ops = Arc::new(ManifestOperations::new(
            transport,
            &self.config,
            self.output.clone(),
        )?);

        self.output.verbose(&format!(
            "Registry client for {} ({}, chunk size {})",
            self.config.registry,
            self.config.scheme,
            self.output.format_size(self.config.chunk_size as u64)
        ));

        Ok(RegistryClient {
            blobs: BlobPullPusher::new(blob_ops.clone(), blob_ops, self.output.clone()),
            manifests: ManifestPullPusher::new(
                manifest_ops.clone(),
                manifest_ops,
                self.output.clone(),
            ),
            config: self.config,
            output: self.output,
        })
    }
}

pub struct RegistryClient {
    config: RegistryConfig,
    blobs: BlobPullPusher,
    manifests: ManifestPullPusher,
    output: Logger,
}

impl RegistryClient {
    pub fn builder(config: RegistryConfig) -> RegistryClientBuilder {
        RegistryClientBuilder::new(config)
    }

    pub fn new(config: RegistryConfig, output: Logger) -> Result<Self> {
        Self::builder(config).with_logger(output).build()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.output
    }

    pub fn blobs(&self) -> &BlobPullPusher {
        &self.blobs
    }

    pub fn manifests(&self) -> &ManifestPullPusher {
        &self.manifests
    }

    pub async fn does_blob_exist(&self, repository: &str, digest: &Digest) -> Result<bool> {
        self.blobs.does_blob_exist(repository, digest).await
    }

    pub async fn pull_blob(&self, repository: &str, digest: &Digest) -> Result<BlobReader> {
        self.blobs.pull_blob(repository, digest).await
    }

    /// Push unless the registry already has the digest
    pub async fn push_blob(
        &self,
        repository: &str,
        descriptor: &Descriptor,
        content: BlobSource<'_>,
    ) -> Result<()> {
        self.blobs.push_blob(repository, descriptor, content).await
    }

    /// Push the content bound to `descriptor`, reporting every read to `observer`.
    /// The bound content is consumed.
    pub async fn push_descriptor<T>(
        &self,
        repository: &str,
        descriptor: &mut Descriptor,
        observer: T,
    ) -> Result<()>
    where
        T: Tick + Send,
    {
        let content = descriptor.take_content().ok_or_else(|| {
            RegistryError::Upload(format!("descriptor {} has no content to push", descriptor))
        })?;

        let mut reader = ProgressReader::new(content, observer);
        self.blobs.push_blob(repository, descriptor, &mut reader).await
    }

    pub async fn does_manifest_exist(&self, repository: &str, reference: &str) -> Result<bool> {
        self.manifests.does_manifest_exist(repository, reference).await
    }

    pub async fn pull_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<Option<Manifest>> {
        self.manifests.pull_manifest(repository, reference).await
    }

    /// Push unless a manifest already exists under `reference`
    pub async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<()> {
        self.manifests.push_manifest(repository, reference, manifest).await
    }

    /// Pull the manifest a reference points at, by tag or else by digest
    pub async fn require_manifest(&self, reference: &Reference) -> Result<Manifest> {
        let target = reference.reference().ok_or_else(|| RegistryError::InvalidReference {
            reference: reference.to_string(),
        })?;

        match self.pull_manifest(&reference.repository, target).await? {
            Some(manifest) => Ok(manifest),
            None => Err(RegistryError::UnknownManifest {
                reference: reference.to_string(),
            }),
        }
    }
}
