//! Artifact references
//!
//! Parses `[registry/][namespace/...]repository[:tag][@digest]`. The first path
//! segment is taken as the registry only when it looks like a host, that is when it
//! contains a `.` or a `:` after its first character. Tags follow the distribution
//! tag grammar `[A-Za-z0-9_][A-Za-z0-9._-]{0,127}` and repository segments may not
//! be `.` or `..`, so every component can be used as a single URL path segment.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::str::FromStr;

/// Registry used when a reference names none
pub const DEFAULT_REGISTRY: &str = "localhost:5000";

const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub registry: String,
    /// Namespace segments and repository name joined with `/`
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl Reference {
    pub fn new(registry: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: None,
            digest: None,
        }
    }

    /// Parse a reference string, `None` when it does not match the grammar
    pub fn parse(s: &str) -> Option<Self> {
        let (name, digest) = match s.split_once('@') {
            Some((_, "")) => return None,
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (s, None),
        };

        // A host-like first segment is a registry, unless the remainder then fails
        // to parse, in which case the whole name is tried without one.
        if let Some((host, rest)) = name.split_once('/') {
            if looks_like_host(host) {
                if let Some((repository, tag)) = split_repository(rest) {
                    return Some(Self {
                        registry: host.to_string(),
                        repository,
                        tag,
                        digest,
                    });
                }
            }
        }

        let (repository, tag) = split_repository(name)?;
        Some(Self {
            registry: DEFAULT_REGISTRY.to_string(),
            repository,
            tag,
            digest,
        })
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(tag);
        self
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    /// What to address the manifest by: the tag, else the digest
    pub fn reference(&self) -> Option<&str> {
        self.tag.as_deref().or(self.digest.as_deref())
    }
}

fn looks_like_host(segment: &str) -> bool {
    segment
        .char_indices()
        .any(|(i, c)| i > 0 && (c == '.' || c == ':'))
}

/// Whether `tag` matches `[A-Za-z0-9_][A-Za-z0-9._-]{0,127}`
pub fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    tag.len() <= MAX_TAG_LEN
        && (first.is_ascii_alphanumeric() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn split_repository(rest: &str) -> Option<(String, Option<String>)> {
    let (path, tag) = match rest.split_once(':') {
        Some((_, tag)) if !is_valid_tag(tag) => return None,
        Some((path, tag)) => (path, Some(tag.to_string())),
        None => (rest, None),
    };

    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return None;
    }

    Some((path.to_string(), tag))
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| RegistryError::InvalidReference {
            reference: s.to_string(),
        })
    }
}
