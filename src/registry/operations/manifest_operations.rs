//! Manifest operations for registry client
//!
//! HEAD, PUT and GET on /v2/{name}/manifests/{reference}, always negotiating the
//! OCI image manifest media type.

use crate::common::{ManifestPuller, ManifestPusher};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::oci::{Manifest, OCI_MANIFEST};
use crate::registry::operations::{api_url, existence};
use crate::registry::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use url::Url;

pub struct ManifestOperations {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    strict_existence_checks: bool,
    output: Logger,
}

impl ManifestOperations {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &RegistryConfig,
        output: Logger,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            base_url: config.base_url()?,
            strict_existence_checks: config.strict_existence_checks,
            output,
        })
    }

    fn manifest_url(&self, repository: &str, reference: &str) -> Result<Url> {
        if reference.is_empty() {
            return Err(RegistryError::InvalidReference {
                reference: format!("{}:", repository),
            });
        }
        api_url(&self.base_url, repository, &["manifests", reference])
    }

    fn request(&self, method: Method, url: Url) -> HttpRequest {
        HttpRequest::new(method, url)
            .header(ACCEPT, HeaderValue::from_static(OCI_MANIFEST))
            .header(CONTENT_TYPE, HeaderValue::from_static(OCI_MANIFEST))
    }
}

#[async_trait]
impl ManifestPuller for ManifestOperations {
    async fn does_manifest_exist(&self, repository: &str, reference: &str) -> Result<bool> {
        let url = self.manifest_url(repository, reference)?;
        self.output
            .detail(&format!("Checking manifest {}:{} in remote registry", repository, reference));

        let response = self.transport.send(self.request(Method::HEAD, url)).await?;
        existence(
            response,
            self.strict_existence_checks,
            "manifest existence check",
            &format!("Manifest {}:{}", repository, reference),
            &self.output,
        )
        .await
    }

    async fn pull_manifest(&self, repository: &str, reference: &str) -> Result<Option<Manifest>> {
        let url = self.manifest_url(repository, reference)?;
        self.output.step(&format!("Pulling manifest {}:{}", repository, reference));

        let response = self.transport.send(self.request(Method::GET, url)).await?;
        if response.status == StatusCode::NOT_FOUND {
            self.output
                .detail(&format!("❌ Manifest {}:{} not found", repository, reference));
            return Ok(None);
        }
        if !response.status.is_success() {
            return Err(response.into_error("manifest pull").await);
        }

        let body = response.bytes().await?;
        let manifest = Manifest::from_json(&body)?;
        self.output.detail(&format!(
            "Manifest has {} layer(s), config {}",
            manifest.layers.len(),
            manifest.config.digest.short()
        ));
        Ok(Some(manifest))
    }
}

#[async_trait]
impl ManifestPusher for ManifestOperations {
    async fn push_manifest(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<()> {
        let url = self.manifest_url(repository, reference)?;
        let body = manifest.to_json()?;
        self.output.step(&format!(
            "Pushing manifest {}:{} ({})",
            repository,
            reference,
            self.output.format_size(body.len() as u64)
        ));

        let request = HttpRequest::new(Method::PUT, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(OCI_MANIFEST))
            .body(body);
        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(response.into_error("manifest push").await);
        }

        self.output
            .success(&format!("Manifest {}:{} pushed", repository, reference));
        Ok(())
    }
}
