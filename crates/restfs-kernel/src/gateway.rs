//! Transport gateway.
//!
//! Every outbound call goes through [`Gateway::execute`]: the base address
//! is prepended, a bearer token is attached when configured, and the
//! response is classified (2xx is success, anything else is reported with
//! its status). Nothing is retried here; callers decide how to react.
//!
//! The wire itself sits behind the [`Transport`] trait. Production uses
//! [`ReqwestTransport`], a pooled client that is safe to share across
//! threads, so calls are not serialized unless `serialize_requests` asks
//! for it.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::constants::{MAX_REDIRECTS, TRANSPORT_FAILURE_STATUS};
use crate::route::{Method, Route};
use crate::vfs::VfsError;

/// A request as handed to the transport (absolute URL, all headers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Look up a header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for a status in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The call never produced an HTTP status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Gateway failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The service answered outside `[200, 300)`.
    #[error("{method} {url} -> HTTP {status}")]
    Status {
        method: Method,
        url: String,
        status: u16,
    },

    /// The transport could not complete the call.
    #[error("{method} {url} -> {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: TransportError,
    },
}

impl GatewayError {
    /// The numeric status, or a negative sentinel for transport failures.
    pub fn status_code(&self) -> i32 {
        match self {
            GatewayError::Status { status, .. } => i32::from(*status),
            GatewayError::Transport { .. } => TRANSPORT_FAILURE_STATUS,
        }
    }

    /// Returns true if the service answered with exactly `status`.
    pub fn is_status(&self, status: u16) -> bool {
        matches!(self, GatewayError::Status { status: s, .. } if *s == status)
    }

    /// Returns true if no HTTP status was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }
}

/// Remote rejections are invalid arguments; calls that never got a status
/// are transport (I/O) failures.
impl From<GatewayError> for VfsError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Status { .. } => VfsError::invalid_argument(e.to_string()),
            GatewayError::Transport { .. } => VfsError::transport(e.to_string()),
        }
    }
}

/// The HTTP wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are *not* errors at this level.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Error building the production transport.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    #[error("failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA bundle {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with a fixed timeout, redirect following, and an
    /// optional extra trust anchor (PEM).
    pub fn new(timeout: Duration, ca_bundle: Option<&Path>) -> Result<Self, TransportBuildError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(path) = ca_bundle {
            let shown = path.display().to_string();
            let pem = std::fs::read(path).map_err(|source| TransportBuildError::CaBundle {
                path: shown.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|source| TransportBuildError::Certificate { path: shown, source })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(TransportBuildError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Classifying, authenticating front for a [`Transport`].
pub struct Gateway {
    base_url: String,
    token: Option<String>,
    transport: Arc<dyn Transport>,
    single_flight: Option<Mutex<()>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("single_flight", &self.single_flight.is_some())
            .finish()
    }
}

impl Gateway {
    /// Create a gateway for `base_url` (trailing `/` is trimmed).
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: None,
            transport,
            single_flight: None,
        }
    }

    /// Attach `Authorization: Bearer <token>` to every call.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Allow only one call in flight at a time.
    pub fn serialized(mut self, serialize: bool) -> Self {
        self.single_flight = serialize.then(|| Mutex::new(()));
        self
    }

    /// The configured API base address.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute a routed request.
    pub async fn execute(&self, route: &Route, body: Option<&[u8]>) -> Result<Vec<u8>, GatewayError> {
        self.execute_raw(route.method, route.url(), &route.headers, body)
            .await
    }

    /// Execute `method url` with the given content headers and body.
    pub async fn execute_raw(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, GatewayError> {
        let full_url = format!("{}{}", self.base_url, url);

        let mut all_headers = Vec::with_capacity(headers.len() + 1);
        if let Some(token) = &self.token {
            all_headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        all_headers.extend(headers.iter().cloned());

        let request = HttpRequest {
            method,
            url: full_url.clone(),
            headers: all_headers,
            body: body.map(<[u8]>::to_vec),
        };

        tracing::debug!(%method, url = %full_url, "sending request");

        let result = {
            let _guard = match &self.single_flight {
                Some(lock) => Some(lock.lock().await),
                None => None,
            };
            self.transport.send(request).await
        };

        match result {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => {
                tracing::warn!(%method, url = %full_url, status = response.status, "request rejected");
                Err(GatewayError::Status {
                    method,
                    url: full_url,
                    status: response.status,
                })
            }
            Err(source) => {
                tracing::warn!(
                    %method,
                    url = %full_url,
                    status = TRANSPORT_FAILURE_STATUS,
                    error = %source,
                    "request failed"
                );
                Err(GatewayError::Transport {
                    method,
                    url: full_url,
                    source,
                })
            }
        }
    }
}
