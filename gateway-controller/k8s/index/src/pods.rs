use crate::{collection::Collection, store::object_source};
use ahash::AHashMap as HashMap;
use gateway_controller_core::{endpoints::Locality, Keyed, ObjectSource};
use gateway_controller_k8s_api::{Labels, Node, Pod, ResourceExt};
use std::{collections::BTreeMap, net::IpAddr};

const REGION_LABEL: &str = "topology.kubernetes.io/region";
const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
const SUBZONE_LABEL: &str = "topology.istio.io/subzone";

/// A pod, annotated with the locality of the node it is scheduled on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalityPod {
    pub source: ObjectSource,
    pub labels: Labels,
    pub locality: Locality,
    pub addresses: Vec<IpAddr>,

    /// Container ports, by port name.
    pub named_ports: BTreeMap<String, u16>,
    pub ready: bool,
}

impl Keyed for LocalityPod {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

/// Joins pods with the topology labels of their nodes.
///
/// Pods without an address are omitted.
pub fn locality_pods(pods: &Collection<Pod>, nodes: &Collection<Node>) -> Collection<LocalityPod> {
    let deps = vec![pods.dependency(), nodes.dependency()];
    let pods = pods.clone();
    let nodes = nodes.clone();
    Collection::derive("LocalityPods", deps, move || {
        let localities = nodes
            .snapshot()
            .values()
            .map(|node| (node.name_unchecked(), node_locality(node)))
            .collect::<HashMap<_, _>>();

        pods.snapshot()
            .values()
            .filter_map(|pod| {
                let locality = pod
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.node_name.as_ref())
                    .and_then(|node| localities.get(node).cloned())
                    .unwrap_or_default();
                let pod = LocalityPod::new(pod, locality)?;
                Some((pod.key(), pod))
            })
            .collect()
    })
}

fn node_locality(node: &Node) -> Locality {
    let labels = node.labels();
    let get = |key: &str| labels.get(key).cloned().unwrap_or_default();
    Locality {
        region: get(REGION_LABEL),
        zone: get(ZONE_LABEL),
        subzone: get(SUBZONE_LABEL),
    }
}

impl LocalityPod {
    fn new(pod: &Pod, locality: Locality) -> Option<Self> {
        let status = pod.status.as_ref()?;
        let mut addresses = status
            .pod_ips
            .iter()
            .flatten()
            .filter_map(|ip| ip.ip.parse::<IpAddr>().ok())
            .collect::<Vec<_>>();
        if addresses.is_empty() {
            addresses.extend(status.pod_ip.as_deref().and_then(|ip| ip.parse::<IpAddr>().ok()));
        }
        if addresses.is_empty() {
            return None;
        }

        let ready = status
            .conditions
            .iter()
            .flatten()
            .any(|c| c.type_ == "Ready" && c.status == "True");

        let named_ports = pod
            .spec
            .iter()
            .flat_map(|spec| spec.containers.iter())
            .flat_map(|c| c.ports.iter().flatten())
            .filter_map(|p| {
                let name = p.name.clone()?;
                let port = u16::try_from(p.container_port).ok()?;
                Some((name, port))
            })
            .collect();

        Some(Self {
            source: object_source(pod),
            labels: pod.metadata.labels.clone().into(),
            locality,
            addresses,
            named_ports,
            ready,
        })
    }
}
