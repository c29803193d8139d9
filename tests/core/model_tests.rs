/*!
Tests for the resource snapshot model: camelCase wire aliases and
absent-block handling.
*/

use edgeprobe::core::model::{AclPolicy, TargetResource};

#[test]
fn deserializes_the_management_api_wire_format() {
    let raw = r#"{
        "id": "cdnrcblizmcdlwnddrko",
        "cname": "qa-2.example.com",
        "active": true,
        "folderId": "b1gexample",
        "originGroupId": "341382",
        "options": {
            "edgeCacheSettings": {"enabled": true, "defaultValue": "30"},
            "queryParamsOptions": {"ignoreQueryString": {"enabled": true, "value": true}},
            "staticHeaders": {"enabled": true, "value": {"param-to-test": "abc123"}},
            "ipAddressAcl": {
                "enabled": true,
                "exceptedValues": ["0.0.0.0/32"],
                "policyType": "POLICY_TYPE_ALLOW"
            }
        }
    }"#;

    let resource: TargetResource = serde_json::from_str(raw).expect("wire format should parse");

    assert_eq!(resource.id, "cdnrcblizmcdlwnddrko");
    assert_eq!(resource.folder_id.as_deref(), Some("b1gexample"));
    assert_eq!(resource.origin_group_id.as_deref(), Some("341382"));

    let options = resource.options.as_ref().expect("options present");
    let cache = options.edge_cache_settings.as_ref().expect("cache block present");
    assert!(cache.enabled);
    assert_eq!(cache.default_value, "30");

    let acl = options.ip_address_acl.as_ref().expect("acl block present");
    assert_eq!(acl.policy_type, AclPolicy::Allow);
    assert_eq!(acl.excepted_values, vec!["0.0.0.0/32".to_string()]);

    let headers = options.static_headers.as_ref().expect("headers block present");
    assert_eq!(headers.value.get("param-to-test").map(String::as_str), Some("abc123"));
}

#[test]
fn option_blocks_may_all_be_absent() {
    let raw = r#"{"id": "cdnroq3y4e74osnivr7e", "cname": "qa-1.example.com"}"#;

    let resource: TargetResource = serde_json::from_str(raw).expect("minimal form should parse");

    assert!(!resource.active);
    assert!(resource.options.is_none());
    assert_eq!(resource.declared_ttl(), None);
}

#[test]
fn declared_ttl_parses_the_api_carried_string() {
    let raw = r#"{
        "id": "cdnr5t2qvpsnaaglie2c",
        "cname": "qa-4.example.com",
        "active": true,
        "options": {"edgeCacheSettings": {"enabled": true, "defaultValue": "600"}}
    }"#;

    let resource: TargetResource = serde_json::from_str(raw).expect("should parse");
    assert_eq!(resource.declared_ttl(), Some(600));
}

#[test]
fn declared_ttl_is_absent_when_caching_is_disabled() {
    let raw = r#"{
        "id": "cdnrqvhjv4tyhbfwimw3",
        "cname": "qa-3.example.com",
        "active": true,
        "options": {"edgeCacheSettings": {"enabled": false, "defaultValue": "30"}}
    }"#;

    let resource: TargetResource = serde_json::from_str(raw).expect("should parse");
    assert_eq!(resource.declared_ttl(), None);
}
