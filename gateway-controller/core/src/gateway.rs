use crate::{policy::PolicyAtt, Keyed, ObjectSource};
use std::collections::BTreeSet;

/// Which namespaces may attach routes to a listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedNamespaces {
    All,
    /// Routes in the namespace of the listener's parent.
    Same,
    /// The namespaces currently matching the listener's selector.
    Selected(BTreeSet<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerIr {
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub hostname: Option<String>,

    /// The gateway or listener set that declared this listener.
    pub parent: ObjectSource,
    pub allowed_namespaces: AllowedNamespaces,
}

/// The data-plane-programming view of a gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayIr {
    pub source: ObjectSource,
    pub class_name: String,
    pub controller_name: String,
    pub listeners: Vec<ListenerIr>,
    pub listener_sets: Vec<ObjectSource>,
    pub attached_policies: Vec<PolicyAtt>,
}

/// The infrastructure-provisioning view of a gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayForDeployer {
    pub source: ObjectSource,
    pub class_name: String,
    pub controller_name: String,
    pub ports: BTreeSet<u16>,
}

impl Keyed for GatewayIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

impl Keyed for GatewayForDeployer {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

impl ListenerIr {
    pub fn allows_route_from(&self, route_ns: &str) -> bool {
        self.allowed_namespaces.allows(&self.parent.namespace, route_ns)
    }
}

impl AllowedNamespaces {
    /// Returns true if a route in `route_ns` may attach to a listener whose parent is in
    /// `parent_ns`.
    pub fn allows(&self, parent_ns: &str, route_ns: &str) -> bool {
        match self {
            Self::All => true,
            Self::Same => parent_ns == route_ns,
            Self::Selected(namespaces) => namespaces.contains(route_ns),
        }
    }
}
