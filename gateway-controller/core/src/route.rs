use crate::{backend::BackendObjectIr, policy::PolicyAtt, Keyed, ObjectSource};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteKind {
    Http,
    Grpc,
    Tcp,
    Tls,
}

/// A reference from a route to the object it attaches to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub section_name: Option<String>,
    pub port: Option<u16>,
}

/// The unified representation of HTTPRoute, GRPCRoute, TCPRoute, and TLSRoute objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteIr {
    pub source: ObjectSource,
    pub kind: RouteKind,
    pub parent_refs: Vec<ParentRef>,
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRuleIr>,
    pub attached_policies: Vec<PolicyAtt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRuleIr {
    pub name: Option<String>,
    pub backends: Vec<BackendRefIr>,
}

/// A backend reference after resolution.
///
/// A reference that could not be resolved keeps its target and carries the reason in `error`, so
/// that the data plane can return errors for the affected share of traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendRefIr {
    pub target: ObjectSource,
    pub port: Option<u16>,
    pub weight: u32,
    pub backend: Option<BackendObjectIr>,
    pub error: Option<String>,
}

impl Keyed for RouteIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

impl RouteIr {
    /// Returns true if any of the route's parent references names the given object.
    pub fn is_attached_to(&self, parent: &ObjectSource) -> bool {
        self.parent_refs.iter().any(|p| {
            p.group == parent.group
                && p.kind == parent.kind
                && p.namespace == parent.namespace
                && p.name == parent.name
        })
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => "HTTPRoute".fmt(f),
            Self::Grpc => "GRPCRoute".fmt(f),
            Self::Tcp => "TCPRoute".fmt(f),
            Self::Tls => "TLSRoute".fmt(f),
        }
    }
}
