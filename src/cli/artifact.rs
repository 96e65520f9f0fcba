//! Directory artifacts
//!
//! A pushed directory becomes one manifest: every regular file is a layer titled
//! with its file name, and the config blob lists the files in layer order.

use crate::common::streams::named;
use crate::error::Result;
use crate::oci::{Descriptor, Manifest, FILENAME_ANNOTATION, OCTET_STREAM};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const ARTIFACT_MEDIA_TYPE: &str = "application/vnd.linkspocket.artifact.v1";
pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.linkspocket.config.v1+json";

/// File name the pulled config blob is written to
pub const CONFIG_FILE_NAME: &str = ".config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub files: Vec<String>,
}

/// Regular files directly inside `dir`, sorted by name
pub fn artifact_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            files.push((name.to_string_lossy().into_owned(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

/// Describe every file in `dir` and bind each descriptor to its open file
pub fn artifact_from_dir(dir: &Path) -> Result<Manifest> {
    let files = artifact_files(dir)?;

    let config = ArtifactConfig {
        files: files.iter().map(|(name, _)| name.clone()).collect(),
    };
    let config_bytes = serde_json::to_vec(&config)?;
    let config_descriptor = Descriptor::from_bytes(&config_bytes, CONFIG_MEDIA_TYPE)
        .with_content(named("config", Cursor::new(config_bytes)));

    let mut manifest = Manifest::new(ARTIFACT_MEDIA_TYPE).with_config(config_descriptor);
    for (name, path) in files {
        let layer = Descriptor::from_stream(named(name.clone(), File::open(&path)?), OCTET_STREAM)?
            .with_annotation(FILENAME_ANNOTATION, name);
        manifest.add_layer(layer);
    }

    Ok(manifest)
}

/// Tag derived from the config digest
pub fn autotag(manifest: &Manifest) -> String {
    manifest.config.digest.short()
}

/// Whether a pulled layer title can be used as a file name inside the output
/// directory
pub fn is_plain_file_name(title: &str) -> bool {
    !title.is_empty()
        && title != "."
        && title != ".."
        && Path::new(title).file_name().is_some_and(|name| name == title)
}
