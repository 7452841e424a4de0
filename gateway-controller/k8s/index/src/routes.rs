//! Derives a unified route IR from the four Gateway API route kinds.

use crate::{
    backends::{BackendError, BackendIndex, BackendRef},
    client::Watched,
    collection::Collection,
    policies::PolicyIndex,
    store::object_source,
};
use gateway_controller_core::{
    route::{BackendRefIr, ParentRef, RouteIr, RouteKind, RouteRuleIr},
    ObjectSource, GATEWAY_GROUP,
};
use gateway_controller_k8s_api::{
    gateway::{
        grpcroutes::GRPCRoute, httproutes::HTTPRoute, tcproutes::TCPRoute, tlsroutes::TLSRoute,
    },
    route::{BackendRefView, ParentRefView, RouteSpec, RuleView},
};

#[derive(Clone, Debug)]
pub struct RoutesIndex {
    routes: Collection<RouteIr>,
    backends: BackendIndex,
    policies: Option<PolicyIndex>,
}

/// The raw route collections the index is built from.
#[derive(Clone, Debug)]
pub struct RouteInputs {
    pub http: Collection<HTTPRoute>,
    pub grpc: Collection<GRPCRoute>,
    pub tcp: Collection<TCPRoute>,
    pub tls: Collection<TLSRoute>,
}

impl RouteInputs {
    /// Route inputs that are empty and synced.
    pub fn empty() -> Self {
        Self {
            http: Collection::empty("disable/HTTPRoutes"),
            grpc: Collection::empty("disable/GRPCRoutes"),
            tcp: Collection::empty("disable/TCPRoutes"),
            tls: Collection::empty("disable/TLSRoutes"),
        }
    }
}

impl RoutesIndex {
    pub fn new(inputs: RouteInputs, policies: Option<PolicyIndex>, backends: BackendIndex) -> Self {
        let RouteInputs {
            http,
            grpc,
            tcp,
            tls,
        } = inputs;
        let members = vec![
            route_irs(RouteKind::Http, http, &backends, &policies),
            route_irs(RouteKind::Grpc, grpc, &backends, &policies),
            route_irs(RouteKind::Tcp, tcp, &backends, &policies),
            route_irs(RouteKind::Tls, tls, &backends, &policies),
        ];
        Self {
            routes: Collection::join("RouteIRs", members),
            backends,
            policies,
        }
    }

    pub fn fetch(&self, route: &ObjectSource) -> Option<RouteIr> {
        self.routes.get(route)
    }

    pub fn list(&self) -> Vec<RouteIr> {
        self.routes.list()
    }

    /// Returns the routes that name the given gateway as a parent.
    pub fn routes_for_gateway(&self, gateway: &ObjectSource) -> Vec<RouteIr> {
        self.routes
            .list()
            .into_iter()
            .filter(|r| r.is_attached_to(gateway))
            .collect()
    }

    pub fn collection(&self) -> &Collection<RouteIr> {
        &self.routes
    }

    /// True once every route kind, the backend index, and the policy index are synced.
    pub fn has_synced(&self) -> bool {
        self.routes.has_synced()
            && self.backends.has_synced()
            && self.policies.as_ref().map_or(true, PolicyIndex::has_synced)
    }
}

fn route_irs<R>(
    kind: RouteKind,
    routes: Collection<R>,
    backends: &BackendIndex,
    policies: &Option<PolicyIndex>,
) -> Collection<RouteIr>
where
    R: Watched + RouteSpec,
{
    let mut deps = vec![routes.dependency()];
    deps.extend(backends.dependencies());
    deps.extend(policies.as_ref().map(PolicyIndex::dependency));

    let backends = backends.clone();
    let policies = policies.clone();
    Collection::derive(format!("{kind}IRs"), deps, move || {
        routes
            .snapshot()
            .values()
            .filter_map(|route| {
                let source = object_source(route);
                let spec = match route.spec_view() {
                    Ok(spec) => spec,
                    Err(error) => {
                        tracing::warn!(route = %source, %error, "Failed to read route spec");
                        return None;
                    }
                };
                let ir = RouteIr {
                    kind,
                    parent_refs: spec
                        .parent_refs
                        .iter()
                        .map(|p| parent_ref(&source, p))
                        .collect(),
                    hostnames: spec.hostnames,
                    rules: spec
                        .rules
                        .iter()
                        .filter_map(|rule| route_rule(&source, rule, &backends))
                        .collect(),
                    attached_policies: policies
                        .as_ref()
                        .map(|p| p.policies_for(&source))
                        .unwrap_or_default(),
                    source: source.clone(),
                };
                Some((source, ir))
            })
            .collect()
    })
}

fn parent_ref(route: &ObjectSource, parent: &ParentRefView) -> ParentRef {
    ParentRef {
        group: parent
            .group
            .clone()
            .unwrap_or_else(|| GATEWAY_GROUP.to_string()),
        kind: parent.kind.clone().unwrap_or_else(|| "Gateway".to_string()),
        namespace: parent
            .namespace
            .clone()
            .unwrap_or_else(|| route.namespace.clone()),
        name: parent.name.clone(),
        section_name: parent.section_name.clone(),
        port: parent.port.and_then(|p| u16::try_from(p).ok()),
    }
}

/// Resolves a rule's backends.
///
/// A rule that refers to a backend it is not permitted to reference is dropped. Other resolution
/// failures are recorded on the affected backend so that its share of traffic fails.
fn route_rule(route: &ObjectSource, rule: &RuleView, backends: &BackendIndex) -> Option<RouteRuleIr> {
    let mut resolved = Vec::with_capacity(rule.backend_refs.len());
    for backend_ref in &rule.backend_refs {
        match resolve_backend(route, backend_ref, backends) {
            Ok(backend) => resolved.push(backend),
            Err(BackendError::NotPermitted { to, .. }) => {
                tracing::warn!(%route, backend = %to, "Dropping rule with unpermitted backend reference");
                return None;
            }
            Err(error) => {
                tracing::debug!(%route, %error, "Unresolved backend reference");
                resolved.push(BackendRefIr {
                    target: backend_ref_target(route, backend_ref),
                    port: port(backend_ref),
                    weight: weight(backend_ref),
                    backend: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }
    Some(RouteRuleIr {
        name: rule.name.clone(),
        backends: resolved,
    })
}

fn resolve_backend(
    route: &ObjectSource,
    backend_ref: &BackendRefView,
    backends: &BackendIndex,
) -> Result<BackendRefIr, BackendError> {
    let reference = backend_ref_of(backend_ref);
    let backend = backends.get_backend_from_ref(route, &reference)?;
    Ok(BackendRefIr {
        target: reference.target(route),
        port: reference.port,
        weight: weight(backend_ref),
        backend: Some(backend),
        error: None,
    })
}

fn backend_ref_of(backend_ref: &BackendRefView) -> BackendRef {
    BackendRef::new(
        backend_ref.group.as_deref(),
        backend_ref.kind.as_deref(),
        backend_ref.namespace.as_deref(),
        backend_ref.name.clone(),
        port(backend_ref),
    )
}

fn backend_ref_target(route: &ObjectSource, backend_ref: &BackendRefView) -> ObjectSource {
    backend_ref_of(backend_ref).target(route)
}

fn port(backend_ref: &BackendRefView) -> Option<u16> {
    backend_ref.port.and_then(|p| u16::try_from(p).ok())
}

fn weight(backend_ref: &BackendRefView) -> u32 {
    backend_ref
        .weight
        .map(|w| u32::try_from(w).unwrap_or(0))
        .unwrap_or(1)
}
