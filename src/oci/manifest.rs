//! OCI image manifests
//!
//! A manifest lists an artifact's config blob and its ordered layers. It is pushed
//! and pulled as a single JSON document addressed by repository plus tag or digest.

use crate::error::Result;
use crate::oci::{Annotations, Descriptor, OCI_EMPTY, OCI_MANIFEST};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq)]
pub struct Manifest {
    /// Artifact media type. Written as `artifactType` unless it is the plain manifest type.
    pub media_type: String,
    pub config: Descriptor,
    /// Order is significant and survives serialization unchanged
    pub layers: Vec<Descriptor>,
    pub annotations: Annotations,
}

/// Wire form written on push
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument<'a> {
    schema_version: u32,
    media_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_type: Option<&'a str>,
    config: &'a Descriptor,
    layers: &'a [Descriptor],
    #[serde(skip_serializing_if = "no_annotations")]
    annotations: &'a Annotations,
}

fn no_annotations(annotations: &&Annotations) -> bool {
    annotations.is_empty()
}

/// Wire form accepted on pull
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PulledManifest {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    artifact_type: Option<String>,
    config: Descriptor,
    #[serde(default)]
    layers: Vec<Descriptor>,
    #[serde(default)]
    annotations: Annotations,
}

impl Manifest {
    /// A manifest with the empty `{}` config and no layers
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            config: Descriptor::empty(Some(OCI_EMPTY)),
            layers: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    pub fn with_config(mut self, config: Descriptor) -> Self {
        self.config = config;
        self
    }

    pub fn add_layer(&mut self, layer: Descriptor) {
        self.layers.push(layer);
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// The config descriptor followed by every layer, in order
    pub fn blobs(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::once(&self.config).chain(self.layers.iter())
    }

    pub fn blobs_mut(&mut self) -> impl Iterator<Item = &mut Descriptor> {
        std::iter::once(&mut self.config).chain(self.layers.iter_mut())
    }

    /// Canonical JSON pushed to the registry
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let artifact_type = (self.media_type != OCI_MANIFEST && !self.media_type.is_empty())
            .then_some(self.media_type.as_str());

        let document = ManifestDocument {
            schema_version: 2,
            media_type: OCI_MANIFEST,
            artifact_type,
            config: &self.config,
            layers: &self.layers,
            annotations: &self.annotations,
        };

        Ok(serde_json::to_vec_pretty(&document)?)
    }

    /// Decode a pulled manifest. Descriptors carry metadata only, no content.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let pulled: PulledManifest = serde_json::from_slice(bytes)?;

        Ok(Self {
            media_type: pulled
                .artifact_type
                .or(pulled.media_type)
                .unwrap_or_default(),
            config: pulled.config,
            layers: pulled.layers,
            annotations: pulled.annotations,
        })
    }
}
