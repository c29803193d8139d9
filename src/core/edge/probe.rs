//! Probe Issuer
//!
//! Executes one HTTP GET against a CDN-fronted hostname - either through
//! normal DNS routing or pinned to a specific edge node's network address -
//! and extracts normalized cache metadata from the response headers.

use crate::core::edge::clock::Clock;
use crate::core::edge::retry::CheckFailure;
use crate::core::edge::types::{CacheStatus, EdgeNode, HostResponse, Protocol};
use crate::core::trace::logger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use isahc::config::{Configurable, RedirectPolicy};
use isahc::error::ErrorKind;
use isahc::{AsyncReadResponseExt, HttpClient, Request};

/// Response header naming the edge node that served the request
pub const CACHE_HOST_HEADER: &str = "cache-host";
/// Response header carrying the provider's cache disposition
pub const CACHE_STATUS_HEADER: &str = "cache-status";

/// Transport-level probe failures.
///
/// Name-resolution failures are distinguished from connection resets because
/// only the latter is an acceptable "edge intentionally rejected" signal when
/// probing a hostname expected to be inactive.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeTransportError {
    #[error("name resolution failed: {0}")]
    NameResolution(String),
    #[error("connection refused or reset: {0}")]
    ConnectionFailed(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// Probe issuer failures
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The edge did not report its cache disposition. Fatal for the calling
    /// campaign: an edge that does not expose cache status cannot be
    /// validated by this engine.
    #[error("cache-status header is absent from response of {url}")]
    MissingCacheStatus { url: String },
    /// The edge did not identify itself. Histories are keyed by serving
    /// node, so an unattributable observation cannot be aggregated.
    #[error("cache-host header is absent from response of {url}")]
    MissingCacheHost { url: String },
    #[error("invalid probe url [{url}]")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to create probe client: {0}")]
    ClientInit(String),
    #[error(transparent)]
    Transport(#[from] ProbeTransportError),
}

/// Raw result of one wire-level GET
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status_code: u16,
    /// Response headers with lowercased names
    pub headers: HashMap<String, String>,
    pub duration: Duration,
}

/// HTTP client abstraction for dependency injection and testing
#[async_trait::async_trait]
pub trait ProbeClient: Send + Sync {
    /// Execute a GET without following redirects.
    ///
    /// `host_override` carries the logical hostname when the URL targets a
    /// literal edge address, so the edge still sees the original
    /// virtual-hosting identity.
    async fn get(
        &self,
        url: String,
        host_override: Option<String>,
        timeout_ms: u32,
    ) -> Result<WireResponse, ProbeTransportError>;
}

/// Production probe client implementation using isahc
pub struct IsahcProbeClient {
    client: HttpClient,
}

impl IsahcProbeClient {
    pub fn new() -> Result<Self, ProbeError> {
        let client = HttpClient::builder()
            .redirect_policy(RedirectPolicy::None)
            .build()
            .map_err(|e| ProbeError::ClientInit(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ProbeClient for IsahcProbeClient {
    async fn get(
        &self,
        url: String,
        host_override: Option<String>,
        timeout_ms: u32,
    ) -> Result<WireResponse, ProbeTransportError> {
        let start = Instant::now();

        let mut builder = Request::get(&url)
            .timeout(Duration::from_millis(timeout_ms as u64))
            .redirect_policy(RedirectPolicy::None)
            .header("Accept", "*/*");
        if let Some(host) = &host_override {
            builder = builder.header("Host", host.as_str());
        }
        let request = builder
            .body(Vec::new())
            .map_err(|e| ProbeTransportError::Other(format!("request creation failed: {}", e)))?;

        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(classify_transport_error)?;
        let duration = start.elapsed();

        let status_code = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), value_str.to_string());
            }
        }

        // Consume the body to complete the request
        let _ = response.bytes().await.unwrap_or_default();

        Ok(WireResponse {
            status_code,
            headers,
            duration,
        })
    }
}

fn classify_transport_error(error: isahc::Error) -> ProbeTransportError {
    let message = error.to_string();
    match error.kind() {
        ErrorKind::NameResolution => ProbeTransportError::NameResolution(message),
        ErrorKind::ConnectionFailed => ProbeTransportError::ConnectionFailed(message),
        ErrorKind::Timeout => ProbeTransportError::Timeout(message),
        _ => ProbeTransportError::Other(message),
    }
}

/// One fully-interpreted probe result
#[derive(Debug, Clone)]
pub struct Observation {
    /// Edge node that actually served the request, from `Cache-Host`
    pub node: String,
    /// Timestamped cache disposition, from `Cache-Status`
    pub response: HostResponse,
    pub status_code: u16,
    /// Full response headers for scenario-specific checks such as
    /// static-header echo verification
    pub headers: HashMap<String, String>,
}

impl Observation {
    /// Value the edge echoed for an injected static header, if any
    pub fn echoed_header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Issues single probes and normalizes their cache metadata.
///
/// No shared state is mutated; the only side effect is the network call.
pub struct EdgeProbe {
    client: Arc<dyn ProbeClient>,
    clock: Arc<dyn Clock>,
    protocol: Protocol,
    timeout_ms: u32,
}

impl EdgeProbe {
    pub fn new(
        client: Arc<dyn ProbeClient>,
        clock: Arc<dyn Clock>,
        protocol: Protocol,
        timeout_ms: u32,
    ) -> Self {
        Self {
            client,
            clock,
            protocol,
            timeout_ms,
        }
    }

    /// Probe one CDN-fronted hostname.
    ///
    /// # Arguments
    /// * `cname` - the CDN-facing hostname of the resource under test
    /// * `pin_to_node` - force routing to this edge node's literal address,
    ///   presenting `cname` via Host header for virtual hosting
    /// * `query_token` - opaque token appended as a query parameter to defeat
    ///   accidental response caching by intermediaries
    ///
    /// # Errors
    /// * [`ProbeError::MissingCacheStatus`] / [`ProbeError::MissingCacheHost`]
    ///   when the edge response lacks the required metadata headers
    /// * [`ProbeError::Transport`] for connection-level failures, passed
    ///   through undigested so callers can distinguish name-resolution
    ///   failures from resets
    pub async fn probe(
        &self,
        cname: &str,
        pin_to_node: Option<&EdgeNode>,
        query_token: Option<u64>,
    ) -> Result<Observation, ProbeError> {
        let (request_url, host_override) = self.build_request_url(cname, pin_to_node, query_token)?;

        let trace = logger();
        trace.probe_issued(cname, pin_to_node.map(|node| node.url.as_str()), &request_url);

        let wire = self
            .client
            .get(request_url.clone(), host_override, self.timeout_ms)
            .await?;
        // TODO: measure gaps from the response Date header rather than local
        // completion time, so slow transfers don't inflate them
        let completed_at = self.clock.now();

        let node = wire
            .headers
            .get(CACHE_HOST_HEADER)
            .cloned()
            .ok_or_else(|| ProbeError::MissingCacheHost {
                url: request_url.clone(),
            })?;
        let raw_status =
            wire.headers
                .get(CACHE_STATUS_HEADER)
                .ok_or_else(|| ProbeError::MissingCacheStatus {
                    url: request_url.clone(),
                })?;
        let status = CacheStatus::parse(raw_status);

        trace.probe_completed(cname, &node, status.as_str(), wire.duration.as_millis() as u64);

        Ok(Observation {
            node,
            response: HostResponse::new(completed_at, status),
            status_code: wire.status_code,
            headers: wire.headers,
        })
    }

    /// Scenario-setup check: the hostname must not serve CDN content yet.
    ///
    /// Passes on a 404 response and on a connection reset (the edge
    /// intentionally rejecting an unconfigured cname). Any other status is an
    /// ordinary assertion failure the retry wrapper may absorb, while a
    /// name-resolution failure points at missing DNS records and fails the
    /// check outright.
    pub async fn expect_unavailable(&self, cname: &str) -> Result<(), CheckFailure> {
        let (request_url, _) = self
            .build_request_url(cname, None, None)
            .map_err(|e| CheckFailure::Fatal(e.to_string()))?;

        let trace = logger();
        trace.probe_issued(cname, None, &request_url);

        match self.client.get(request_url, None, self.timeout_ms).await {
            Ok(wire) if wire.status_code == 404 => Ok(()),
            Ok(wire) => Err(CheckFailure::Assertion(format!(
                "[{}] returned {}, expected 404",
                cname, wire.status_code
            ))),
            Err(ProbeTransportError::ConnectionFailed(message)) => {
                trace.debug("EdgeProbe", &format!("[{}] rejected: {}", cname, message));
                Ok(())
            }
            Err(ProbeTransportError::Timeout(message)) => Err(CheckFailure::ReadTimeout(message)),
            Err(ProbeTransportError::NameResolution(message)) => Err(CheckFailure::Fatal(format!(
                "[{}] does not resolve - check DNS records: {}",
                cname, message
            ))),
            Err(other) => Err(CheckFailure::Fatal(other.to_string())),
        }
    }

    /// Build the request URL and optional Host override.
    ///
    /// Pinned probes target the node's literal IP while the Host header keeps
    /// the original cname, so TLS-SNI/virtual-hosting still routes to the
    /// right resource on the edge.
    fn build_request_url(
        &self,
        cname: &str,
        pin_to_node: Option<&EdgeNode>,
        query_token: Option<u64>,
    ) -> Result<(String, Option<String>), ProbeError> {
        let authority = match pin_to_node {
            Some(node) => node.ip_address.to_string(),
            None => cname.to_string(),
        };

        let mut request_url = format!("{}://{}/", self.protocol, authority);
        if let Some(token) = query_token {
            request_url.push_str(&format!("?cachebust={}", token));
        }

        url::Url::parse(&request_url).map_err(|source| ProbeError::InvalidUrl {
            url: request_url.clone(),
            source,
        })?;

        let host_override = pin_to_node.map(|_| cname.to_string());
        Ok((request_url, host_override))
    }
}
