//! Resource Filters
//!
//! Pure predicates over [`TargetResource`] configuration, composable by
//! logical AND, selecting the subset of resources one test scenario applies
//! to. Absent optional blocks (options, ACL, cache settings, query params,
//! static headers) always mean "feature disabled", never an error.

use crate::core::model::TargetResource;

/// An empty selection is a scenario setup failure, distinct from a
/// behavioral test failure.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioSetupError {
    #[error("no resources match the scenario filter")]
    NoMatchingResources,
}

pub fn is_active(resource: &TargetResource) -> bool {
    resource.active
}

pub fn is_not_active(resource: &TargetResource) -> bool {
    !is_active(resource)
}

/// No IP ACL configured, or one configured but disabled
pub fn no_ip_acl(resource: &TargetResource) -> bool {
    resource
        .options
        .as_ref()
        .and_then(|options| options.ip_address_acl.as_ref())
        .map_or(true, |acl| !acl.enabled)
}

pub fn has_enabled_ip_acl(resource: &TargetResource) -> bool {
    !no_ip_acl(resource)
}

pub fn edge_cache_enabled(resource: &TargetResource) -> bool {
    resource
        .options
        .as_ref()
        .and_then(|options| options.edge_cache_settings.as_ref())
        .map_or(false, |settings| settings.enabled)
}

pub fn edge_cache_disabled(resource: &TargetResource) -> bool {
    !edge_cache_enabled(resource)
}

/// Edge cache enabled with exactly this declared TTL
pub fn has_default_ttl(ttl_seconds: u64) -> impl Fn(&TargetResource) -> bool {
    move |resource| {
        edge_cache_enabled(resource)
            && resource
                .options
                .as_ref()
                .and_then(|options| options.edge_cache_settings.as_ref())
                .map_or(false, |settings| settings.default_value == ttl_seconds.to_string())
    }
}

pub fn ignores_query_string(resource: &TargetResource) -> bool {
    resource
        .options
        .as_ref()
        .and_then(|options| options.query_params_options.as_ref())
        .map_or(false, |query| {
            query.ignore_query_string.enabled && query.ignore_query_string.value
        })
}

pub fn keeps_query_string(resource: &TargetResource) -> bool {
    !ignores_query_string(resource)
}

pub fn has_static_headers(resource: &TargetResource) -> bool {
    resource
        .options
        .as_ref()
        .and_then(|options| options.static_headers.as_ref())
        .map_or(false, |headers| headers.enabled && !headers.value.is_empty())
}

/// Compose predicates by logical AND
pub fn all_of<'a>(
    filters: &'a [&'a dyn Fn(&TargetResource) -> bool],
) -> impl Fn(&TargetResource) -> bool + 'a {
    move |resource| filters.iter().all(|filter| filter(resource))
}

/// Select the resources a scenario applies to.
///
/// # Errors
/// [`ScenarioSetupError::NoMatchingResources`] when the filter yields an
/// empty set - the scenario cannot run, which is a setup failure rather than
/// a test verdict.
pub fn select_resources<'a>(
    resources: &'a [TargetResource],
    filter: impl Fn(&TargetResource) -> bool,
) -> Result<Vec<&'a TargetResource>, ScenarioSetupError> {
    let selected: Vec<&TargetResource> = resources.iter().filter(|r| filter(r)).collect();
    if selected.is_empty() {
        return Err(ScenarioSetupError::NoMatchingResources);
    }
    Ok(selected)
}
