//! HTTP transport seam
//!
//! Every registry call goes through [`HttpTransport::send`]. Production code uses
//! [`ReqwestTransport`]; tests substitute a recording fake. A transport is shared
//! read-only behind an `Arc` and keeps no per-call state.

use crate::config::RegistryConfig;
use crate::error::handlers::HttpErrorHandler;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Client, Method, StatusCode};
use url::Url;

/// Streamed response body
pub type Body = BoxStream<'static, Result<Vec<u8>>>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header built from a runtime string
    pub fn try_header(self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            RegistryError::Upload(format!("invalid value for header {}: {}", name, e))
        })?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: Body,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A response whose whole body is already in memory
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        let body = if body.is_empty() {
            stream::empty().boxed()
        } else {
            stream::iter(vec![Ok(body)]).boxed()
        };
        Self::new(status, headers, body)
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header(LOCATION)
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Collect the whole body
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }

    /// Body text for error reports. Never fails.
    pub async fn text(self) -> String {
        match self.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => "Failed to read error response".to_string(),
        }
    }

    /// Consume a non-success response into an `Http` error
    pub async fn into_error(self, context: &str) -> RegistryError {
        let status = self.status;
        let text = self.text().await;
        HttpErrorHandler::handle_status(status, &text, context)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one request. Only a failure to get any response is an error here;
    /// status handling belongs to the caller.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(RegistryError::from))
            .boxed();

        Ok(HttpResponse::new(status, headers, body))
    }
}
