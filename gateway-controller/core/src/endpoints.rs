use crate::{Keyed, ObjectSource};
use std::{collections::BTreeMap, net::IpAddr};

/// Topology of an endpoint, derived from node labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locality {
    pub region: String,
    pub zone: String,
    pub subzone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndpointWithMd {
    pub addr: IpAddr,
    pub port: u16,
    pub labels: BTreeMap<String, String>,
}

/// The endpoints of a single backend, by backend port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointsForBackend {
    pub backend: ObjectSource,
    pub ports: BTreeMap<u16, PortEndpoints>,
}

/// The endpoints serving one port of a backend, grouped by locality.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortEndpoints {
    pub cluster_name: String,
    pub by_locality: BTreeMap<Locality, Vec<EndpointWithMd>>,
}

impl Keyed for EndpointsForBackend {
    fn key(&self) -> ObjectSource {
        self.backend.clone()
    }
}

impl EndpointsForBackend {
    /// The total number of endpoints across all ports.
    pub fn len(&self) -> usize {
        self.ports.values().map(PortEndpoints::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PortEndpoints {
    pub fn len(&self) -> usize {
        self.by_locality.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
