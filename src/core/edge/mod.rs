//! Edge-Cache Verification Engine
//!
//! The behavioral core of the harness:
//! - Probe issuer with edge-node pinning and cache-header extraction
//! - Revalidation classifier for TTL conformance of one node's history
//! - Campaign runner with random and targeted probing strategies
//! - Retry wrapper for assertion-bearing checks
//! - Resource filters selecting the subjects of one test scenario

pub mod campaign;
pub mod classifier;
pub mod clock;
pub mod filters;
pub mod probe;
pub mod retry;
pub mod types;

// Re-export public API
pub use campaign::{CampaignError, CampaignRunner};
pub use classifier::{cache_revalidated_within_ttl, RevalidatedTooEarly, DEFAULT_TOLERANCE_RATIO};
pub use clock::{Clock, SystemClock};
pub use filters::{all_of, select_resources, ScenarioSetupError};
pub use probe::{
    EdgeProbe, IsahcProbeClient, Observation, ProbeClient, ProbeError, ProbeTransportError,
    WireResponse,
};
pub use retry::{retry_check, CheckFailure, RetryError};
pub use types::*;
