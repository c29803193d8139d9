// Core types for edge-cache verification
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Cache disposition reported by an edge node in its `Cache-Status` header.
///
/// Provider-defined values pass through verbatim; only the subset
/// {MISS, REVALIDATED} is treated specially as "cache-fill events" by the
/// revalidation classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the edge cache without contacting the origin
    Hit,
    /// Entry was absent, fetched from origin and cached
    Miss,
    /// Entry expired, re-checked against origin and refreshed
    Revalidated,
    /// Served stale while the entry is being refreshed
    Stale,
    /// Entry expired and was served anyway
    Expired,
    /// Any other provider-defined value, kept verbatim
    Other(String),
}

impl CacheStatus {
    /// Parse a raw `Cache-Status` header value
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "HIT" => CacheStatus::Hit,
            "MISS" => CacheStatus::Miss,
            "REVALIDATED" => CacheStatus::Revalidated,
            "STALE" => CacheStatus::Stale,
            "EXPIRED" => CacheStatus::Expired,
            other => CacheStatus::Other(other.to_string()),
        }
    }

    /// Whether this disposition marks a cache-fill event: the edge node just
    /// populated or re-populated its cache entry from the origin.
    pub fn is_cache_fill(&self) -> bool {
        matches!(self, CacheStatus::Miss | CacheStatus::Revalidated)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Revalidated => "REVALIDATED",
            CacheStatus::Stale => "STALE",
            CacheStatus::Expired => "EXPIRED",
            CacheStatus::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One probe's (timestamp, cache-status) pair. Immutable once created;
/// equality is structural.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    /// Completion time of the probe, from the campaign clock
    pub at: Instant,
    /// Cache disposition the edge node reported
    pub status: CacheStatus,
}

impl HostResponse {
    pub fn new(at: Instant, status: CacheStatus) -> Self {
        Self { at, status }
    }
}

/// Ordered per-node observation sequences for one target resource.
///
/// Append-only: insertion order is temporal order, so timestamps within one
/// node's sequence are non-decreasing as long as appends happen synchronously
/// as probes complete (no internal parallelism in a campaign).
#[derive(Debug, Default)]
pub struct ObservationHistory {
    per_node: BTreeMap<String, Vec<HostResponse>>,
}

impl ObservationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one response to a node's sequence and return the full sequence
    /// for immediate classification.
    pub fn append(&mut self, node: &str, response: HostResponse) -> &[HostResponse] {
        let sequence = self.per_node.entry(node.to_string()).or_default();
        sequence.push(response);
        sequence
    }

    pub fn sequence(&self, node: &str) -> Option<&[HostResponse]> {
        self.per_node.get(node).map(Vec::as_slice)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &[HostResponse])> {
        self.per_node
            .iter()
            .map(|(node, sequence)| (node.as_str(), sequence.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.per_node.is_empty()
    }
}

/// One known edge-cache machine, addressable both by the hostname it reports
/// in `Cache-Host` and by its literal network address for pinned probes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EdgeNode {
    pub url: String,
    pub ip_address: IpAddr,
}

/// Probing strategy of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStrategy {
    /// Unpinned probes through normal DNS routing; the serving node is
    /// discovered from each response
    Random,
    /// Probes pinned to each configured edge node in turn
    Targeted,
}

/// URL scheme used for probe requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// Per-scenario campaign configuration. Read-only during a campaign.
#[derive(Debug, Clone)]
pub struct PolicyParameters {
    /// Declared TTL of the edge cache entries under test
    pub ttl: Duration,
    /// Fraction of the TTL a revalidation gap must exceed to be accepted,
    /// in (0, 1]. Absorbs clock and network jitter.
    pub tolerance_ratio: f64,
    /// Number of TTL periods the campaign keeps probing for
    pub periods_to_test: u32,
    /// Return as soon as any single (resource, node) history is accepted
    pub finish_on_first_success: bool,
    pub strategy: ProbeStrategy,
    /// Append a unique query token to every probe URL to defeat accidental
    /// caching by intermediaries
    pub vary_query: bool,
}

impl PolicyParameters {
    /// Wall-clock budget of one campaign run
    pub fn time_budget(&self) -> Duration {
        self.ttl * self.periods_to_test
    }
}

/// Per-(resource, node) acceptance verdicts of one campaign run.
///
/// A resource is fully accepted only when all its node sub-results are
/// accepted; `passed` additionally requires every probed resource to be fully
/// accepted (or, with `finish_on_first_success`, any single acceptance).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignReport {
    pub passed: bool,
    pub results: BTreeMap<String, BTreeMap<String, bool>>,
}

impl CampaignReport {
    pub fn node_accepted(&self, resource_id: &str, node: &str) -> Option<bool> {
        self.results.get(resource_id)?.get(node).copied()
    }

    pub fn resource_accepted(&self, resource_id: &str) -> bool {
        self.results
            .get(resource_id)
            .map(|nodes| !nodes.is_empty() && nodes.values().all(|&accepted| accepted))
            .unwrap_or(false)
    }
}
