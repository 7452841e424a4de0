use crate::{
    client::{Client, Watched},
    collection::Collection,
    discovery::DiscoveryFilter,
    plugin::{kubernetes, Plugin, PolicyPlugin},
    store::{object_source, store, StoreWriter},
    CommonCollections, Options,
};
use gateway_controller_core::{
    policy::{PolicyIr, PolicyTargetRef, PolicyWrapper},
    ControllerNames, GroupKind, Keyed, ObjectSource, Settings,
};
use gateway_controller_k8s_api::{
    self as k8s,
    gateway::{
        gatewayclasses::GatewayClass, gateways::Gateway, httproutes::HTTPRoute,
        referencegrants::ReferenceGrant,
    },
    ObjectMeta,
};
use serde_json::json;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};
use tracing::Level;

mod common;
mod discovery;
mod endpoints;
mod secrets;

const CONTROLLER: &str = "example.com/gateway";
const AGENT_CONTROLLER: &str = "example.com/agent";

/// A client whose watches are driven directly by the test.
#[derive(Default)]
struct TestClient {
    filter: Option<DiscoveryFilter>,
    writers: HashMap<TypeId, Box<dyn ErasedWriter>>,
    watched: Vec<String>,
}

trait ErasedWriter: Send {
    fn mark_synced(&mut self);
    fn as_any(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Send + Sync + 'static> ErasedWriter for StoreWriter<T> {
    fn mark_synced(&mut self) {
        StoreWriter::mark_synced(self)
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

impl Client for TestClient {
    fn set_object_filter(&mut self, filter: DiscoveryFilter) {
        self.filter = Some(filter);
    }

    fn object_filter(&self) -> Option<&DiscoveryFilter> {
        self.filter.as_ref()
    }

    fn watch_unfiltered<T: Watched>(&mut self, name: &str) -> Collection<T> {
        let (writer, collection) = store::<T>(name);
        self.watched.push(name.to_string());
        self.writers.insert(TypeId::of::<T>(), Box::new(writer));
        collection
    }

    fn watch_cluster<T: Watched>(&mut self, name: &str) -> Collection<T> {
        self.watch_unfiltered(name)
    }
}

impl TestClient {
    fn writer<T: Watched>(&mut self) -> &mut StoreWriter<T> {
        self.writers
            .get_mut(&TypeId::of::<T>())
            .and_then(|w| w.as_any().downcast_mut::<StoreWriter<T>>())
            .expect("resource kind must be watched")
    }

    fn apply<T: Watched>(&mut self, obj: T) {
        self.writer::<T>().insert_keyed(object_source(&obj), obj);
    }

    fn delete<T: Watched>(&mut self, obj: &T) {
        self.writer::<T>().remove(&object_source(obj));
    }

    /// Completes the initial list of every watch registered so far.
    fn sync_all(&mut self) {
        for writer in self.writers.values_mut() {
            writer.mark_synced();
        }
    }

    fn is_watched(&self, name: &str) -> bool {
        self.watched.iter().any(|w| w == name)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .try_init()
        .ok();
}

fn controller_names() -> ControllerNames {
    ControllerNames {
        controller: CONTROLLER.to_string(),
        agent_controller: AGENT_CONTROLLER.to_string(),
    }
}

/// Builds a composition root with both phases initialized, using the Service plugin plus `extra`.
fn mk_common(settings: Settings, extra: Plugin) -> (TestClient, CommonCollections) {
    let mut client = TestClient::default();
    let mut common =
        CommonCollections::new(&mut client, settings, controller_names(), Options::default())
            .expect("common collections must build");
    let plugin = kubernetes::plugin(&common, "cluster.local").merge(extra);
    common
        .init_plugins(&mut client, &plugin)
        .expect("plugins must initialize");
    (client, common)
}

fn meta(ns: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(ns.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn mk_namespace(name: &str, labels: &[(&str, &str)]) -> k8s::Namespace {
    k8s::Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn mk_secret(ns: &str, name: &str) -> k8s::Secret {
    k8s::Secret {
        metadata: meta(ns, name),
        data: Some(maplit::btreemap! {
            "tls.crt".to_string() => k8s::ByteString(b"cert".to_vec()),
        }),
        ..Default::default()
    }
}

fn mk_service(ns: &str, name: &str, port: i32) -> k8s::Service {
    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "namespace": ns, "name": name },
        "spec": {
            "selector": { "app": name },
            "ports": [{ "port": port, "targetPort": "http" }],
        },
    }))
    .expect("service must decode")
}

fn mk_gateway_class(name: &str, controller: &str) -> GatewayClass {
    serde_json::from_value(json!({
        "apiVersion": "gateway.networking.k8s.io/v1",
        "kind": "GatewayClass",
        "metadata": { "name": name },
        "spec": { "controllerName": controller },
    }))
    .expect("gateway class must decode")
}

fn mk_gateway(ns: &str, name: &str, class: &str, port: i32) -> Gateway {
    serde_json::from_value(json!({
        "apiVersion": "gateway.networking.k8s.io/v1",
        "kind": "Gateway",
        "metadata": { "namespace": ns, "name": name },
        "spec": {
            "gatewayClassName": class,
            "listeners": [{
                "name": "http",
                "port": port,
                "protocol": "HTTP",
                "allowedRoutes": { "namespaces": { "from": "All" } },
            }],
        },
    }))
    .expect("gateway must decode")
}

fn mk_http_route(ns: &str, name: &str, gateway: &str, rules: serde_json::Value) -> HTTPRoute {
    serde_json::from_value(json!({
        "apiVersion": "gateway.networking.k8s.io/v1",
        "kind": "HTTPRoute",
        "metadata": { "namespace": ns, "name": name },
        "spec": {
            "parentRefs": [{ "name": gateway }],
            "rules": rules,
        },
    }))
    .expect("route must decode")
}

/// Grants `from_kind` objects in `from_ns` access to every `to_kind` object in `ns`.
fn mk_ref_grant(ns: &str, name: &str, from_kind: &str, from_ns: &str, to_kind: &str) -> ReferenceGrant {
    let from_group = if from_kind.ends_with("Route") || from_kind == "Gateway" {
        "gateway.networking.k8s.io"
    } else {
        ""
    };
    serde_json::from_value(json!({
        "apiVersion": "gateway.networking.k8s.io/v1beta1",
        "kind": "ReferenceGrant",
        "metadata": { "namespace": ns, "name": name },
        "spec": {
            "from": [{ "group": from_group, "kind": from_kind, "namespace": from_ns }],
            "to": [{ "group": "", "kind": to_kind }],
        },
    }))
    .expect("reference grant must decode")
}

#[derive(Debug)]
struct TestPolicy {
    timeout_secs: u32,
}

impl PolicyIr for TestPolicy {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn test_policy_kind() -> GroupKind {
    GroupKind::new("policy.example.com", "TestPolicy")
}

fn mk_policy(ns: &str, name: &str, target_kind: &str, target: &str, timeout_secs: u32) -> PolicyWrapper {
    let group = if target_kind == "Service" {
        ""
    } else {
        "gateway.networking.k8s.io"
    };
    PolicyWrapper {
        source: test_policy_kind().object(ns, name),
        target_refs: vec![PolicyTargetRef {
            group: group.to_string(),
            kind: target_kind.to_string(),
            name: target.to_string(),
            section_name: None,
        }],
        policy_ir: Arc::new(TestPolicy { timeout_secs }),
    }
}

/// A plugin contributing a fixed set of test policies.
fn policy_plugin(policies: Vec<PolicyWrapper>) -> Plugin {
    let mut plugin = Plugin::default();
    plugin.contributes_policies.insert(
        test_policy_kind(),
        PolicyPlugin {
            policies: Collection::from_static("TestPolicies", policies),
        },
    );
    plugin
}

fn service_key(ns: &str, name: &str) -> ObjectSource {
    GroupKind::new("", "Service").object(ns, name)
}

fn route_key(route: &HTTPRoute) -> ObjectSource {
    object_source(route)
}

fn gateway_key(ns: &str, name: &str) -> ObjectSource {
    GroupKind::new("gateway.networking.k8s.io", "Gateway").object(ns, name)
}

#[test]
fn keys_identify_resources() {
    let route = mk_http_route("ns-0", "route", "gw", json!([]));
    let key = route_key(&route);
    assert_eq!(key.group, "gateway.networking.k8s.io");
    assert_eq!(key.kind, "HTTPRoute");
    assert_eq!(key.namespace, "ns-0");
    assert_eq!(key.name, "route");

    let policy = mk_policy("ns-0", "p", "Service", "svc", 1);
    assert_eq!(policy.key(), test_policy_kind().object("ns-0", "p"));
}
