//! Typed snapshot of a CDN resource's policy-relevant configuration.
//!
//! Field names map the management API's camelCase wire format. Every option
//! block is optional: an absent block means the feature is disabled on the
//! resource, and filters must treat it that way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The subject under test: identifier, CDN-facing hostname and a read-only
/// snapshot of the policy attributes relevant to filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResource {
    pub id: String,
    pub cname: String,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "folderId", default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(rename = "originGroupId", default, skip_serializing_if = "Option::is_none")]
    pub origin_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ResourceOptions>,
}

impl TargetResource {
    /// The declared edge-cache TTL in seconds, when edge caching is enabled
    /// and the API-carried string value parses.
    pub fn declared_ttl(&self) -> Option<u64> {
        let settings = self.options.as_ref()?.edge_cache_settings.as_ref()?;
        if !settings.enabled {
            return None;
        }
        settings.default_value.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceOptions {
    #[serde(
        rename = "edgeCacheSettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edge_cache_settings: Option<EdgeCacheSettings>,
    #[serde(
        rename = "queryParamsOptions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub query_params_options: Option<QueryParamsOptions>,
    #[serde(rename = "staticHeaders", default, skip_serializing_if = "Option::is_none")]
    pub static_headers: Option<EnabledMap>,
    #[serde(rename = "ipAddressAcl", default, skip_serializing_if = "Option::is_none")]
    pub ip_address_acl: Option<IpAddressAcl>,
}

/// The API carries the TTL as a string in `defaultValue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCacheSettings {
    pub enabled: bool,
    #[serde(rename = "defaultValue")]
    pub default_value: String,
}

impl EdgeCacheSettings {
    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            enabled: true,
            default_value: ttl_seconds.to_string(),
        }
    }

    pub fn disabled_with_ttl(ttl_seconds: u64) -> Self {
        Self {
            enabled: false,
            default_value: ttl_seconds.to_string(),
        }
    }
}

/// Enabled flag plus a typed value (the API's enabled/value wrapper shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledValue<T> {
    pub enabled: bool,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParamsOptions {
    #[serde(rename = "ignoreQueryString")]
    pub ignore_query_string: EnabledValue<bool>,
}

/// Enabled flag plus a header-name -> value map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledMap {
    pub enabled: bool,
    #[serde(default)]
    pub value: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AclPolicy {
    #[serde(rename = "POLICY_TYPE_ALLOW")]
    Allow,
    #[serde(rename = "POLICY_TYPE_DENY")]
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddressAcl {
    pub enabled: bool,
    #[serde(rename = "exceptedValues")]
    pub excepted_values: Vec<String>,
    #[serde(rename = "policyType")]
    pub policy_type: AclPolicy,
}
