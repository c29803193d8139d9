//! Revalidation Classifier
//!
//! Decides, from one edge node's ordered response history, whether cache-fill
//! events are spaced according to the declared TTL. Pure and deterministic
//! given its input sequence.

use crate::core::edge::types::HostResponse;
use std::time::{Duration, Instant};

/// Default fraction of the nominal TTL a revalidation gap must exceed.
/// Absorbs clock and network jitter while still catching clearly-too-early
/// revalidations.
pub const DEFAULT_TOLERANCE_RATIO: f64 = 0.9;

/// A cache entry was re-filled before the tolerated share of its TTL elapsed.
///
/// This is a policy violation distinct from an ordinary `false` verdict:
/// campaigns probing resources with disabled or short caching assert on this
/// condition specifically, so it is surfaced as an error rather than a
/// boolean.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "cache revalidated after {:.3}s where more than {:.3}s was required",
    .gap.as_secs_f64(),
    .required.as_secs_f64()
)]
pub struct RevalidatedTooEarly {
    /// Observed gap between two successive cache-fill events
    pub gap: Duration,
    /// Minimum acceptable gap, `tolerance_ratio * ttl`
    pub required: Duration,
}

/// Classify one node's ordered history against the declared TTL.
///
/// Scans the sequence once, tracking the timestamp of the most recent
/// cache-fill event (MISS or REVALIDATED):
/// - the first fill event only records its timestamp;
/// - a subsequent fill event with a gap above `tolerance_ratio * ttl` accepts
///   immediately (`Ok(true)`) - no further history is needed once one
///   legitimate TTL-driven revalidation is observed;
/// - a subsequent fill event with a smaller gap raises
///   [`RevalidatedTooEarly`];
/// - fewer than two fill events leave the verdict inconclusive (`Ok(false)`),
///   which is "not yet proven", not an error.
///
/// The classifier relies on the append-only history invariant (timestamps
/// non-decreasing) and never re-sorts its input.
pub fn cache_revalidated_within_ttl(
    history: &[HostResponse],
    ttl: Duration,
    tolerance_ratio: f64,
) -> Result<bool, RevalidatedTooEarly> {
    let required = ttl.mul_f64(tolerance_ratio);
    let mut last_fill: Option<Instant> = None;

    for response in history {
        if !response.status.is_cache_fill() {
            continue;
        }
        match last_fill {
            None => last_fill = Some(response.at),
            Some(previous) => {
                let gap = response.at.duration_since(previous);
                if gap > required {
                    return Ok(true);
                }
                return Err(RevalidatedTooEarly { gap, required });
            }
        }
    }

    Ok(false)
}
