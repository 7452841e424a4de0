//! Contributes Kubernetes Services as backends.

use super::{BackendPlugin, Plugin};
use crate::{collection::Collection, pods::LocalityPod, store::object_source, CommonCollections};
use ahash::AHashMap as HashMap;
use gateway_controller_core::{
    backend::BackendObjectIr,
    endpoints::{EndpointWithMd, EndpointsForBackend, PortEndpoints},
    GroupKind, Keyed,
};
use gateway_controller_k8s_api::{IntOrString, Labels, Selector, Service};
use std::collections::BTreeMap;

pub fn service_group_kind() -> GroupKind {
    GroupKind::new("", "Service")
}

/// Builds the plugin from the phase-1 collections.
pub fn plugin(common: &CommonCollections, cluster_domain: &str) -> Plugin {
    let backends = service_backends(common.services(), cluster_domain);
    let endpoints = service_endpoints(common.services(), common.locality_pods());
    let mut plugin = Plugin::default();
    plugin.contributes_backends.insert(
        service_group_kind(),
        BackendPlugin {
            backends,
            endpoints: Some(endpoints),
            alias_kinds: Vec::new(),
        },
    );
    plugin
}

pub fn service_backends(
    services: &Collection<Service>,
    cluster_domain: &str,
) -> Collection<BackendObjectIr> {
    let cluster_domain = cluster_domain.to_string();
    services.map("ServiceBackends", move |svc: &Service| {
        let source = object_source(svc);
        let ports = svc
            .spec
            .iter()
            .flat_map(|spec| spec.ports.iter().flatten())
            .filter_map(|p| u16::try_from(p.port).ok())
            .collect();
        let hostname = format!("{}.{}.svc.{cluster_domain}", source.name, source.namespace);
        let mut backend = BackendObjectIr::new(source);
        backend.ports = ports;
        backend.canonical_hostname = Some(hostname);
        Some(backend)
    })
}

/// Selects the ready pods of each service, by service port.
pub fn service_endpoints(
    services: &Collection<Service>,
    pods: &Collection<LocalityPod>,
) -> Collection<EndpointsForBackend> {
    let deps = vec![services.dependency(), pods.dependency()];
    let services = services.clone();
    let pods = pods.clone();
    Collection::derive("ServiceEndpoints", deps, move || {
        let pods = pods.snapshot();
        let mut by_namespace = HashMap::<&str, Vec<&LocalityPod>>::new();
        for pod in pods.values().filter(|p| p.ready) {
            by_namespace
                .entry(pod.source.namespace.as_str())
                .or_default()
                .push(pod);
        }

        services
            .snapshot()
            .values()
            .filter_map(|svc| {
                let namespace = svc.metadata.namespace.as_deref().unwrap_or_default();
                let pods = by_namespace.get(namespace).map(Vec::as_slice).unwrap_or(&[]);
                let eps = endpoints_for(svc, pods)?;
                Some((eps.key(), eps))
            })
            .collect()
    })
}

fn endpoints_for(svc: &Service, pods: &[&LocalityPod]) -> Option<EndpointsForBackend> {
    let spec = svc.spec.as_ref()?;
    let selector = spec.selector.as_ref().filter(|s| !s.is_empty())?;
    let selector = Selector::from_map(selector.clone());
    let selected = pods
        .iter()
        .filter(|p| selector.matches(&p.labels))
        .collect::<Vec<_>>();

    let backend = BackendObjectIr::new(object_source(svc));
    let mut ports = BTreeMap::new();
    for svc_port in spec.ports.iter().flatten() {
        let Ok(port) = u16::try_from(svc_port.port) else {
            continue;
        };
        let mut eps = PortEndpoints {
            cluster_name: backend.cluster_name(Some(port)),
            by_locality: BTreeMap::new(),
        };
        for pod in &selected {
            let target = match svc_port.target_port.as_ref() {
                None => Some(port),
                Some(IntOrString::Int(p)) => u16::try_from(*p).ok(),
                Some(IntOrString::String(name)) => pod.named_ports.get(name).copied(),
            };
            let Some(target) = target else {
                continue;
            };
            let locality = eps.by_locality.entry(pod.locality.clone()).or_default();
            for addr in &pod.addresses {
                locality.push(EndpointWithMd {
                    addr: *addr,
                    port: target,
                    labels: endpoint_labels(&pod.labels),
                });
            }
        }
        for endpoints in eps.by_locality.values_mut() {
            endpoints.sort();
        }
        ports.insert(port, eps);
    }

    Some(EndpointsForBackend {
        backend: backend.source,
        ports,
    })
}

fn endpoint_labels(labels: &Labels) -> BTreeMap<String, String> {
    labels.as_ref().clone()
}
