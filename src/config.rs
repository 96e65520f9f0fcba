//! Configuration module for registry connection settings

use crate::error::{RegistryError, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Bytes sent per PATCH request
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub const DEFAULT_USER_AGENT: &str = concat!("linkspocket/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(RegistryError::Configuration(format!(
                "unknown scheme '{}', expected http or https",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry host, optionally with a port
    pub registry: String,
    pub scheme: Scheme,
    pub chunk_size: usize,
    /// Whole-request timeout applied by the HTTP client
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Fail existence checks on statuses other than 200 and 404 instead of
    /// reporting the content as absent
    pub strict_existence_checks: bool,
}

impl RegistryConfig {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            scheme: Scheme::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strict_existence_checks: false,
        }
    }

    /// Load settings from `REGISTRY_ADDRESS`, `REGISTRY_SCHEME`, `CHUNK_SIZE` and
    /// `REGISTRY_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let registry = lookup("REGISTRY_ADDRESS")
            .ok_or_else(|| RegistryError::Configuration("REGISTRY_ADDRESS not set".to_string()))?;
        let mut config = Self::new(registry);

        if let Some(scheme) = lookup("REGISTRY_SCHEME") {
            config.scheme = scheme.parse()?;
        }

        if let Some(chunk_size) = lookup("CHUNK_SIZE") {
            let chunk_size = chunk_size.parse::<usize>().map_err(|e| {
                RegistryError::Configuration(format!("invalid CHUNK_SIZE '{}': {}", chunk_size, e))
            })?;
            config = config.with_chunk_size(chunk_size);
        }

        if let Some(secs) = lookup("REGISTRY_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                RegistryError::Configuration(format!(
                    "invalid REGISTRY_TIMEOUT_SECS '{}': {}",
                    secs, e
                ))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_strict_existence_checks(mut self, strict: bool) -> Self {
        self.strict_existence_checks = strict;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.is_empty() {
            return Err(RegistryError::Configuration("registry address is empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(RegistryError::Configuration("chunk size must be positive".to_string()));
        }
        Ok(())
    }

    /// `{scheme}://{registry}/`, the base every protocol path is joined onto
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}://{}/", self.scheme, self.registry))?)
    }
}
