use crate::{collection::Collection, plugin::Plugin};
use gateway_controller_core::endpoints::EndpointsForBackend;

/// Joins every plugin-contributed endpoint collection into one, keyed by backend.
///
/// Backend kinds are disjoint, so members are not expected to report the same backend. Should they,
/// the member registered under the lowest group/kind wins.
pub fn join_endpoints(plugin: &Plugin) -> Collection<EndpointsForBackend> {
    let members = plugin
        .contributes_backends
        .iter()
        .filter_map(|(gk, backends)| {
            let endpoints = backends.endpoints.clone()?;
            tracing::debug!(kind = %gk, "Joining endpoints");
            Some(endpoints)
        })
        .collect();
    Collection::join("EndpointIRs", members)
}
