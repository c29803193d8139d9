/*!
Tests for the probe issuer: URL construction, node pinning, cache-header
extraction and the fatal missing-header conditions.
*/

use crate::common::{edge_node, ManualClock, MockProbeClient};
use edgeprobe::core::edge::clock::Clock;
use edgeprobe::core::edge::probe::{EdgeProbe, ProbeError, ProbeTransportError};
use edgeprobe::core::edge::retry::CheckFailure;
use edgeprobe::core::edge::types::{CacheStatus, Protocol};
use std::sync::Arc;

fn edge_probe(client: Arc<MockProbeClient>, clock: Arc<ManualClock>) -> EdgeProbe {
    let clock_dyn: Arc<dyn Clock> = clock;
    EdgeProbe::new(client, clock_dyn, Protocol::Http, 2000)
}

#[tokio::test]
async fn unpinned_probe_extracts_node_and_cache_status() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply("qa-1.example.com", "edge-a", "MISS");

    let client_handle = client.clone();
    let probe = edge_probe(client, clock);

    let observation = probe
        .probe("qa-1.example.com", None, None)
        .await
        .expect("probe should succeed");

    assert_eq!(observation.node, "edge-a");
    assert_eq!(observation.response.status, CacheStatus::Miss);
    assert_eq!(observation.status_code, 200);

    let calls = client_handle.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "http://qa-1.example.com/");
    assert_eq!(calls[0].host_override, None);
}

#[tokio::test]
async fn pinned_probe_targets_the_node_address_with_host_override() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    let key = MockProbeClient::pinned_key("qa-1.example.com", "192.0.2.17");
    client.push_reply(&key, "edge-a", "HIT");

    let client_handle = client.clone();
    let probe = edge_probe(client, clock);
    let node = edge_node("edge-a", "192.0.2.17");

    let observation = probe
        .probe("qa-1.example.com", Some(&node), None)
        .await
        .expect("pinned probe should succeed");

    assert_eq!(observation.response.status, CacheStatus::Hit);

    let calls = client_handle.calls();
    assert_eq!(calls[0].url, "http://192.0.2.17/");
    assert_eq!(calls[0].host_override.as_deref(), Some("qa-1.example.com"));
}

#[tokio::test]
async fn query_token_lands_in_the_probe_url() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply("qa-1.example.com", "edge-a", "MISS");

    let client_handle = client.clone();
    let probe = edge_probe(client, clock);

    probe
        .probe("qa-1.example.com", None, Some(7))
        .await
        .expect("probe should succeed");

    assert_eq!(
        client_handle.calls()[0].url,
        "http://qa-1.example.com/?cachebust=7"
    );
}

#[tokio::test]
async fn missing_cache_status_header_surfaces_the_fatal_condition() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply_without_cache_status("qa-1.example.com", "edge-a");

    let probe = edge_probe(client, clock);

    let error = probe
        .probe("qa-1.example.com", None, None)
        .await
        .expect_err("a response without cache-status cannot be used");
    assert!(matches!(error, ProbeError::MissingCacheStatus { .. }));
}

#[tokio::test]
async fn missing_cache_host_header_cannot_be_aggregated() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply_without_node("qa-1.example.com", "HIT");

    let probe = edge_probe(client, clock);

    let error = probe
        .probe("qa-1.example.com", None, None)
        .await
        .expect_err("a response without cache-host cannot be attributed to a node");
    assert!(matches!(error, ProbeError::MissingCacheHost { .. }));
}

#[tokio::test]
async fn connection_failures_pass_through_as_transport_errors() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_failure(
        "qa-1.example.com",
        ProbeTransportError::ConnectionFailed("connection reset by peer".to_string()),
    );

    let probe = edge_probe(client, clock);

    let error = probe
        .probe("qa-1.example.com", None, None)
        .await
        .expect_err("transport failure must not be swallowed");
    assert!(matches!(error, ProbeError::Transport(_)));
}

#[tokio::test]
async fn unavailability_check_passes_on_404() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_status("qa-1.example.com", 404);

    let probe = edge_probe(client, clock);
    assert!(probe.expect_unavailable("qa-1.example.com").await.is_ok());
}

#[tokio::test]
async fn unavailability_check_accepts_a_connection_reset() {
    // An edge rejecting an unconfigured cname is the expected signal
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_failure(
        "qa-1.example.com",
        ProbeTransportError::ConnectionFailed("connection reset by peer".to_string()),
    );

    let probe = edge_probe(client, clock);
    assert!(probe.expect_unavailable("qa-1.example.com").await.is_ok());
}

#[tokio::test]
async fn unavailability_check_flags_a_still_serving_cname_as_retryable() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_status("qa-1.example.com", 200);

    let probe = edge_probe(client, clock);

    let failure = probe
        .expect_unavailable("qa-1.example.com")
        .await
        .expect_err("still-serving cname must fail the check");
    assert!(failure.is_transient());
    assert!(matches!(failure, CheckFailure::Assertion(_)));
}

#[tokio::test]
async fn unavailability_check_fails_hard_on_name_resolution() {
    // Missing DNS records are a setup problem, not a transient condition
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_failure(
        "qa-1.example.com",
        ProbeTransportError::NameResolution("no such host".to_string()),
    );

    let probe = edge_probe(client, clock);

    let failure = probe
        .expect_unavailable("qa-1.example.com")
        .await
        .expect_err("unresolvable cname must fail the check");
    assert!(!failure.is_transient());
}

#[tokio::test]
async fn echoed_static_headers_are_readable_from_the_observation() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply("qa-7.example.com", "edge-a", "HIT");

    let probe = edge_probe(client, clock);

    let observation = probe
        .probe("qa-7.example.com", None, None)
        .await
        .expect("probe should succeed");

    // The mock only sets the cache headers; an uninjected header reads as
    // absent rather than failing
    assert_eq!(observation.echoed_header("param-to-test"), None);
    assert_eq!(observation.echoed_header("Cache-Host"), Some("edge-a"));
}

#[tokio::test]
async fn provider_defined_statuses_pass_through_verbatim() {
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(MockProbeClient::new(clock.clone()));
    client.push_reply("qa-1.example.com", "edge-a", "UPDATING");

    let probe = edge_probe(client, clock);

    let observation = probe
        .probe("qa-1.example.com", None, None)
        .await
        .expect("probe should succeed");
    assert_eq!(
        observation.response.status,
        CacheStatus::Other("UPDATING".to_string())
    );
    assert!(!observation.response.status.is_cache_fill());
}
