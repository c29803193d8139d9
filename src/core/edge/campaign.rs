/*!
Campaign Runner - repeated probing of target resources for a bounded
wall-clock window.

Two interchangeable probing strategies share one aggregation/termination
algorithm:

- **Random**: unpinned probes through normal DNS routing; the serving edge
  node is discovered from each response, so evidence accrues per node
  organically and unevenly.
- **Targeted**: every probe is pinned to one configured edge node; a priming
  pass seeds a baseline history per (resource, node) pair before the timed
  loop, and a pair leaves the pending set as soon as its history is accepted.

Every new response is classified as soon as it arrives, so
`finish_on_first_success` short-circuits at the earliest possible probe and
an early revalidation surfaces immediately rather than after the full time
budget.

Scheduling is single-threaded with blocking I/O: probes are issued
sequentially, observation histories are owned by one campaign invocation and
discarded at its end. The deadline is enforced by polling the clock before
each probe, so a slow request can overrun the nominal budget by up to one
request's latency; the per-request timeout bounds the worst case.
*/

use crate::core::edge::classifier::{cache_revalidated_within_ttl, RevalidatedTooEarly};
use crate::core::edge::clock::Clock;
use crate::core::edge::probe::{EdgeProbe, Observation, ProbeError};
use crate::core::edge::types::{
    CampaignReport, EdgeNode, ObservationHistory, PolicyParameters, ProbeStrategy,
};
use crate::core::model::TargetResource;
use crate::core::trace::{logger, TraceLogger};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Campaign-level failures
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    /// Caller error - the upstream filter step must select at least one
    /// resource and report an empty selection as a scenario setup failure
    #[error("no resources to probe")]
    EmptyResourceSet,
    #[error("targeted probing requires at least one configured edge node")]
    NoEdgeNodes,
    /// A node revalidated before the tolerated share of its TTL. Hard
    /// failure for positive-TTL scenarios, the asserted outcome for
    /// negative ones.
    #[error(transparent)]
    EarlyRevalidation(#[from] RevalidatedTooEarly),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Per-resource observation histories and acceptance flags of one run.
///
/// Owned exclusively by one campaign invocation; never shared across
/// concurrent campaigns.
#[derive(Default)]
struct Aggregation {
    histories: BTreeMap<String, ObservationHistory>,
    results: BTreeMap<String, BTreeMap<String, bool>>,
}

impl Aggregation {
    fn new(resources: &[TargetResource]) -> Self {
        let mut aggregation = Self::default();
        for resource in resources {
            aggregation
                .histories
                .insert(resource.id.clone(), ObservationHistory::new());
            aggregation.results.insert(resource.id.clone(), BTreeMap::new());
        }
        aggregation
    }

    /// Append a priming observation without evaluating it. Priming responses
    /// count as evidence for later gaps but never produce a verdict on their
    /// own.
    fn record_baseline(&mut self, resource_id: &str, observation: &Observation) {
        self.histories
            .entry(resource_id.to_string())
            .or_default()
            .append(&observation.node, observation.response.clone());
        self.results
            .entry(resource_id.to_string())
            .or_default()
            .entry(observation.node.clone())
            .or_insert(false);
    }

    /// Append one observation and classify the extended sequence.
    ///
    /// Returns `Ok(true)` when the node's history was newly accepted. Nodes
    /// already accepted are not re-evaluated.
    fn observe(
        &mut self,
        resource_id: &str,
        observation: &Observation,
        params: &PolicyParameters,
    ) -> Result<bool, RevalidatedTooEarly> {
        let sequence = self
            .histories
            .entry(resource_id.to_string())
            .or_default()
            .append(&observation.node, observation.response.clone());

        let accepted = self
            .results
            .entry(resource_id.to_string())
            .or_default()
            .entry(observation.node.clone())
            .or_insert(false);
        if *accepted {
            return Ok(false);
        }

        if cache_revalidated_within_ttl(sequence, params.ttl, params.tolerance_ratio)? {
            *accepted = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Whether every observed node of this resource has been accepted
    fn resource_fully_accepted(&self, resource_id: &str) -> bool {
        self.results
            .get(resource_id)
            .map(|nodes| !nodes.is_empty() && nodes.values().all(|&accepted| accepted))
            .unwrap_or(false)
    }

    fn into_report(self, passed: bool) -> CampaignReport {
        CampaignReport {
            passed,
            results: self.results,
        }
    }
}

/// Orchestrates repeated probing of a set of target resources.
pub struct CampaignRunner {
    probe: EdgeProbe,
    clock: Arc<dyn Clock>,
    edge_nodes: Vec<EdgeNode>,
    query_counter: AtomicU64,
}

impl CampaignRunner {
    pub fn new(probe: EdgeProbe, clock: Arc<dyn Clock>) -> Self {
        Self {
            probe,
            clock,
            edge_nodes: Vec::new(),
            query_counter: AtomicU64::new(0),
        }
    }

    /// Configure the known edge nodes (required for the targeted strategy)
    pub fn with_edge_nodes(mut self, edge_nodes: Vec<EdgeNode>) -> Self {
        self.edge_nodes = edge_nodes;
        self
    }

    /// Run one campaign over `resources` under `params`.
    ///
    /// The wall-clock budget is `periods_to_test * ttl`. The returned report
    /// carries per-(resource, node) acceptance flags even when the campaign
    /// as a whole did not pass.
    ///
    /// # Errors
    ///
    /// [`CampaignError::EarlyRevalidation`] propagates out of the campaign as
    /// soon as any node revalidates prematurely; probe failures (including a
    /// missing cache-status header) abort the campaign immediately.
    pub async fn run(
        &self,
        resources: &[TargetResource],
        params: &PolicyParameters,
    ) -> Result<CampaignReport, CampaignError> {
        if resources.is_empty() {
            return Err(CampaignError::EmptyResourceSet);
        }

        let trace = logger();
        let started = self.clock.now();

        let outcome = match params.strategy {
            ProbeStrategy::Random => self.run_random(resources, params, &trace).await,
            ProbeStrategy::Targeted => self.run_targeted(resources, params, &trace).await,
        };

        if let Ok(report) = &outcome {
            trace.campaign_summary(
                report.passed,
                resources.len(),
                self.clock.now().duration_since(started).as_millis() as u64,
            );
        }
        outcome
    }

    fn next_query_token(&self, params: &PolicyParameters) -> Option<u64> {
        params
            .vary_query
            .then(|| self.query_counter.fetch_add(1, Ordering::Relaxed))
    }

    async fn run_random(
        &self,
        resources: &[TargetResource],
        params: &PolicyParameters,
        trace: &TraceLogger,
    ) -> Result<CampaignReport, CampaignError> {
        let mut aggregation = Aggregation::new(resources);
        let deadline = self.clock.now() + params.time_budget();

        'probing: while self.clock.now() < deadline {
            for resource in resources {
                if self.clock.now() >= deadline {
                    break 'probing;
                }
                let observation = self
                    .probe
                    .probe(&resource.cname, None, self.next_query_token(params))
                    .await?;
                if aggregation.observe(&resource.id, &observation, params)? {
                    trace.cache_verdict(&resource.id, &observation.node, "accepted");
                    if params.finish_on_first_success {
                        return Ok(aggregation.into_report(true));
                    }
                }
            }
        }

        let passed = resources
            .iter()
            .all(|resource| aggregation.resource_fully_accepted(&resource.id));
        Ok(aggregation.into_report(passed))
    }

    async fn run_targeted(
        &self,
        resources: &[TargetResource],
        params: &PolicyParameters,
        trace: &TraceLogger,
    ) -> Result<CampaignReport, CampaignError> {
        if self.edge_nodes.is_empty() {
            return Err(CampaignError::NoEdgeNodes);
        }

        let mut aggregation = Aggregation::new(resources);
        // (resource, node) pairs still needing evidence, keyed by the
        // configured node url
        let mut pending: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        // Priming pass: one pinned probe per pair establishes a non-empty
        // baseline history before the timed loop begins
        for resource in resources {
            for node in &self.edge_nodes {
                let observation = self
                    .probe
                    .probe(&resource.cname, Some(node), self.next_query_token(params))
                    .await?;
                aggregation.record_baseline(&resource.id, &observation);
                pending
                    .entry(resource.id.clone())
                    .or_default()
                    .insert(node.url.clone());
            }
        }

        let deadline = self.clock.now() + params.time_budget();

        'probing: while self.clock.now() < deadline && !pending.is_empty() {
            for resource in resources {
                if !pending.contains_key(&resource.id) {
                    continue;
                }
                for node in &self.edge_nodes {
                    if self.clock.now() >= deadline {
                        break 'probing;
                    }
                    let node_pending = pending
                        .get(&resource.id)
                        .map_or(false, |nodes| nodes.contains(&node.url));
                    if !node_pending {
                        continue;
                    }

                    let observation = self
                        .probe
                        .probe(&resource.cname, Some(node), self.next_query_token(params))
                        .await?;
                    if aggregation.observe(&resource.id, &observation, params)? {
                        trace.cache_verdict(&resource.id, &observation.node, "accepted");
                        if params.finish_on_first_success {
                            return Ok(aggregation.into_report(true));
                        }
                        if let Some(nodes) = pending.get_mut(&resource.id) {
                            nodes.remove(&node.url);
                            if nodes.is_empty() {
                                pending.remove(&resource.id);
                            }
                        }
                        if pending.is_empty() {
                            break 'probing;
                        }
                    }
                }
            }
        }

        let passed = pending.is_empty();
        Ok(aggregation.into_report(passed))
    }
}
