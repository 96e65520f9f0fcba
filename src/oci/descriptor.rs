//! Content descriptors
//!
//! A [`Descriptor`] announces a blob's digest, size and media type to the registry.
//! Digest and size are always computed from the bytes that will be transferred:
//! [`Descriptor::from_stream`] makes a full hashing pass over the source and rewinds
//! it, so the announcement and the upload can never disagree.

use crate::common::streams::{named, Named, NamedReader, SeekRead, Sizer, TeeWriter};
use crate::digest::{Digest, DigestWriter};
use crate::error::Result;
use crate::oci::{FILENAME_ANNOTATION, OCI_EMPTY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Seek, SeekFrom};

/// Descriptor and manifest annotations, kept sorted for reproducible JSON
pub type Annotations = BTreeMap<String, String>;

/// Content bound to a descriptor for a later push
pub type Content = NamedReader<Box<dyn SeekRead>>;

const EMPTY_JSON: &[u8] = b"{}";

/// Represents content stored in a registry
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub digest: Digest,
    pub size: u64,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
    #[serde(skip)]
    content: Option<Content>,
}

impl Descriptor {
    pub fn new(digest: Digest, size: u64, media_type: impl Into<String>) -> Self {
        Self {
            digest,
            size,
            media_type: media_type.into(),
            annotations: Annotations::new(),
            content: None,
        }
    }

    /// Hash a whole buffer. The descriptor has no bound content.
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::new(Digest::sha256(bytes), bytes.len() as u64, media_type)
    }

    /// Hash a named stream without buffering it, rewind it and bind it as the
    /// descriptor's content
    pub fn from_stream<R>(mut source: NamedReader<R>, media_type: impl Into<String>) -> Result<Self>
    where
        R: SeekRead + 'static,
    {
        let (digest, size) = digest_stream(&mut source)?;
        let name = source.name().to_string();

        Ok(Self::new(digest, size, media_type).bind(name, Box::new(source.into_inner())))
    }

    /// Serialize a value with `serialize`, then describe the produced bytes
    pub fn from_object<T, F>(value: &T, media_type: impl Into<String>, serialize: F) -> Result<Self>
    where
        T: ?Sized,
        F: FnOnce(&T) -> Result<Vec<u8>>,
    {
        let bytes = serialize(value)?;
        Ok(Self::from_bytes(&bytes, media_type))
    }

    /// [`Descriptor::from_object`] with compact JSON
    pub fn from_json<T: Serialize + ?Sized>(
        value: &T,
        media_type: impl Into<String>,
    ) -> Result<Self> {
        Self::from_object(value, media_type, |v| Ok(serde_json::to_vec(v)?))
    }

    /// The well-known descriptor of the `{}` config blob, bound to its two bytes
    pub fn empty(media_type: Option<&str>) -> Self {
        Self::from_bytes(EMPTY_JSON, media_type.unwrap_or(OCI_EMPTY))
            .bind("<empty>".to_string(), Box::new(Cursor::new(EMPTY_JSON.to_vec())))
    }

    pub fn with_content<R: SeekRead + 'static>(self, content: NamedReader<R>) -> Self {
        let name = content.name().to_string();
        self.bind(name, Box::new(content.into_inner()))
    }

    fn bind(mut self, name: String, content: Box<dyn SeekRead>) -> Self {
        self.content = Some(named(name, content));
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotate(key, value);
        self
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Display filename carried by the title annotation
    pub fn title(&self) -> Option<&str> {
        self.annotations.get(FILENAME_ANNOTATION).map(String::as_str)
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn content_mut(&mut self) -> Option<&mut Content> {
        self.content.as_mut()
    }

    pub fn take_content(&mut self) -> Option<Content> {
        self.content.take()
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
            && self.size == other.size
            && self.media_type == other.media_type
            && self.annotations == other.annotations
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("digest", &self.digest.to_string())
            .field("size", &self.size)
            .field("media_type", &self.media_type)
            .field("annotations", &self.annotations)
            .field("content", &self.content.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {} bytes)", self.digest, self.media_type, self.size)
    }
}

/// Hash and count a seekable stream from its current position to its end, then
/// seek back to where it started
pub fn digest_stream<R: io::Read + Seek + ?Sized>(source: &mut R) -> Result<(Digest, u64)> {
    let start = source.stream_position()?;
    let mut tee = TeeWriter::new(DigestWriter::new(), Sizer::new());
    io::copy(source, &mut tee)?;
    source.seek(SeekFrom::Start(start))?;

    let (digester, sizer) = tee.into_inner();
    Ok((digester.finish(), sizer.written()))
}
