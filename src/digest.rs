//! SHA256 content digests
//!
//! A [`Digest`] is an algorithm name plus the raw hash bytes. Its canonical string
//! form is `algo:hex`, which is what registries use in URLs and descriptors.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// The only algorithm used to address content pushed by this crate
pub const SHA256: &str = "sha256";

/// Digest of the two-byte JSON document `{}`
pub const EMPTY_JSON_DIGEST: &str =
    "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

/// Content address for a blob in a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hash: Vec<u8>,
}

impl Digest {
    pub fn new(algorithm: impl Into<String>, hash: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            hash,
        }
    }

    /// Compute the SHA256 digest of a buffer
    pub fn sha256(data: &[u8]) -> Self {
        let mut writer = DigestWriter::new();
        writer.update(data);
        writer.finish()
    }

    /// Build a digest from an algorithm name and a hex encoded hash
    pub fn from_hex(algorithm: &str, hex_hash: &str) -> Result<Self> {
        let hash = hex::decode(hex_hash).map_err(|e| RegistryError::InvalidDigest {
            digest: format!("{}:{}", algorithm, hex_hash),
            reason: e.to_string(),
        })?;
        Ok(Self::new(algorithm, hash))
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.hash)
    }

    /// First 12 hex characters, for log lines and generated tags
    pub fn short(&self) -> String {
        self.hex().chars().take(12).collect()
    }

    /// Check that `data` hashes to this digest
    pub fn verify(&self, data: &[u8]) -> Result<bool> {
        if self.algorithm != SHA256 {
            return Err(RegistryError::InvalidDigest {
                digest: self.to_string(),
                reason: format!("unsupported algorithm '{}'", self.algorithm),
            });
        }
        Ok(Self::sha256(data) == *self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex())
    }
}

impl FromStr for Digest {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, hex_hash) = s.split_once(':').ok_or_else(|| RegistryError::InvalidDigest {
            digest: s.to_string(),
            reason: "missing ':' separator".to_string(),
        })?;

        if algorithm.is_empty() {
            return Err(RegistryError::InvalidDigest {
                digest: s.to_string(),
                reason: "empty algorithm".to_string(),
            });
        }

        Self::from_hex(algorithm, hex_hash)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Treats the SHA256 hasher as a write-only stream
#[derive(Clone, Default)]
pub struct DigestWriter {
    hasher: Sha256,
}

impl DigestWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finish(self) -> Digest {
        Digest::new(SHA256, self.hasher.finalize().to_vec())
    }
}

impl Write for DigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
