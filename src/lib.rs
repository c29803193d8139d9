/*!
edgeprobe - CDN edge-cache behavioral verification harness.

Probes CDN-fronted hostnames over a bounded time window, classifies each
response's cache disposition from edge headers, and decides whether the
observed revalidation cadence is consistent with the declared TTL, ACL and
query-string policy of the resource under test.
*/

pub mod cli;
pub mod config;
pub mod core;
