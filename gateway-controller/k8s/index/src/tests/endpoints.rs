use super::*;
use crate::{endpoints::join_endpoints, plugin::BackendPlugin};
use gateway_controller_core::{
    backend::BackendObjectIr,
    endpoints::{EndpointsForBackend, Locality, PortEndpoints},
};

fn mk_node(name: &str, zone: &str) -> k8s::Node {
    k8s::Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(maplit::btreemap! {
                "topology.kubernetes.io/region".to_string() => "region-1".to_string(),
                "topology.kubernetes.io/zone".to_string() => zone.to_string(),
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn mk_pod(ns: &str, name: &str, app: &str, node: &str, ip: &str, ready: bool) -> k8s::Pod {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "namespace": ns, "name": name, "labels": { "app": app } },
        "spec": {
            "nodeName": node,
            "containers": [{
                "name": "app",
                "ports": [{ "name": "http", "containerPort": 8080 }],
            }],
        },
        "status": {
            "podIP": ip,
            "conditions": [{ "type": "Ready", "status": if ready { "True" } else { "False" } }],
        },
    }))
    .expect("pod must decode")
}

#[test]
fn service_endpoints_are_grouped_by_locality() {
    init_tracing();

    let (mut client, common) = mk_common(Settings::default(), Plugin::default());
    client.apply(mk_node("node-a", "zone-a"));
    client.apply(mk_node("node-b", "zone-b"));
    client.apply(mk_service("ns-0", "web", 80));
    client.apply(mk_pod("ns-0", "web-1", "web", "node-a", "10.0.0.1", true));
    client.apply(mk_pod("ns-0", "web-2", "web", "node-b", "10.0.0.2", true));
    client.apply(mk_pod("ns-0", "web-3", "web", "node-b", "10.0.0.3", false));
    client.apply(mk_pod("ns-0", "api-1", "api", "node-a", "10.0.0.4", true));
    client.apply(mk_pod("ns-1", "web-1", "web", "node-a", "10.0.0.5", true));
    client.sync_all();

    let endpoints = common.endpoints().expect("endpoints");
    assert!(endpoints.has_synced());
    let eps = endpoints
        .get(&service_key("ns-0", "web"))
        .expect("service must have endpoints");
    assert_eq!(eps.len(), 2, "only ready pods selected by the service");

    let port = eps.ports.get(&80).expect("service port");
    assert_eq!(port.cluster_name, "Service_core_ns-0_web_80");
    let zone_a = Locality {
        region: "region-1".to_string(),
        zone: "zone-a".to_string(),
        subzone: String::new(),
    };
    let in_zone_a = port.by_locality.get(&zone_a).expect("zone-a endpoints");
    assert_eq!(in_zone_a.len(), 1);
    assert_eq!(in_zone_a[0].addr.to_string(), "10.0.0.1");
    assert_eq!(in_zone_a[0].port, 8080, "named target ports resolve per pod");

    client.delete(&mk_pod("ns-0", "web-1", "web", "node-a", "10.0.0.1", true));
    let eps = endpoints
        .get(&service_key("ns-0", "web"))
        .expect("service must have endpoints");
    assert_eq!(eps.len(), 1);
}

#[test]
fn endpoints_join_every_plugin() {
    let upstream_kind = GroupKind::new("example.com", "Upstream");
    let upstream = upstream_kind.object("ns-0", "api");
    let static_endpoints = EndpointsForBackend {
        backend: upstream.clone(),
        ports: maplit::btreemap! { 443 => PortEndpoints::default() },
    };

    let mut plugin = Plugin::default();
    plugin.contributes_backends.insert(
        upstream_kind,
        BackendPlugin {
            backends: Collection::from_static("Upstreams", vec![BackendObjectIr::new(upstream.clone())]),
            endpoints: Some(Collection::from_static("UpstreamEndpoints", vec![static_endpoints])),
            alias_kinds: vec![],
        },
    );
    plugin.contributes_backends.insert(
        GroupKind::new("example.com", "NoEndpoints"),
        BackendPlugin {
            backends: Collection::empty("NoEndpoints"),
            endpoints: None,
            alias_kinds: vec![],
        },
    );

    let (mut client, common) = mk_common(Settings::default(), plugin.clone());
    client.apply(mk_service("ns-0", "web", 80));
    client.sync_all();

    let endpoints = common.endpoints().expect("endpoints");
    assert!(endpoints.get(&upstream).is_some());
    assert!(endpoints.get(&service_key("ns-0", "web")).is_some());

    let joined = join_endpoints(&plugin);
    assert_eq!(joined.name(), "EndpointIRs");
    assert_eq!(joined.list().len(), 1);
    assert!(joined.has_synced());
}
