use super::*;
use crate::Error;

#[test]
fn has_synced_requires_both_phases() {
    init_tracing();

    let mut client = TestClient::default();
    let mut common = CommonCollections::new(
        &mut client,
        Settings::default(),
        controller_names(),
        Options::default(),
    )
    .expect("common collections must build");
    assert!(!common.has_synced());
    assert!(common.routes().is_none(), "phase-2 indices must be absent");

    client.sync_all();
    assert!(
        !common.has_synced(),
        "phase 1 alone must not report synced"
    );
    assert_eq!(common.unsynced(), vec!["plugins"]);

    let plugin = kubernetes::plugin(&common, "cluster.local");
    common
        .init_plugins(&mut client, &plugin)
        .expect("plugins must initialize");
    assert!(
        !common.has_synced(),
        "phase-2 watches have not completed their initial list"
    );

    client.sync_all();
    assert!(common.has_synced());
    assert!(common.unsynced().is_empty());

    // Later updates never unsync the graph.
    client.apply(mk_namespace("ns-0", &[]));
    client.apply(mk_service("ns-0", "svc", 80));
    client.delete(&mk_namespace("ns-0", &[]));
    assert!(common.has_synced());
}

#[test]
fn plugins_initialize_once() {
    let (mut client, mut common) = mk_common(Settings::default(), Plugin::default());
    let err = common
        .init_plugins(&mut client, &Plugin::default())
        .expect_err("second initialization must fail");
    assert!(matches!(err, Error::PluginsAlreadyInitialized));
}

#[test]
fn policies_are_absent_without_envoy() {
    let settings = Settings {
        enable_envoy: false,
        ..Default::default()
    };
    let (mut client, common) = mk_common(
        settings,
        policy_plugin(vec![mk_policy("ns-0", "p", "Service", "svc", 5)]),
    );
    assert!(common.policies().is_none());
    assert!(!client.is_watched("HTTPRoutes"));

    client.sync_all();
    assert!(
        common.has_synced(),
        "disabled indices must not block readiness"
    );
    assert!(common.routes().expect("routes index").list().is_empty());
    assert!(common.endpoints().expect("endpoints").is_empty());
}

#[test]
fn policies_are_indexed_by_target() {
    let (mut client, common) = mk_common(
        Settings::default(),
        policy_plugin(vec![
            mk_policy("ns-0", "a", "Service", "svc", 5),
            mk_policy("ns-0", "b", "Service", "svc", 10),
        ]),
    );
    client.sync_all();

    let policies = common.policies().expect("policy index");
    let attached = policies.policies_for(&service_key("ns-0", "svc"));
    assert_eq!(attached.len(), 2);
    let timeouts = attached
        .iter()
        .filter_map(|att| att.policy_ir.as_any().downcast_ref::<TestPolicy>())
        .map(|p| p.timeout_secs)
        .collect::<Vec<_>>();
    assert_eq!(timeouts, vec![5, 10]);

    assert!(
        policies.policies_for(&service_key("ns-1", "svc")).is_empty(),
        "policies only target objects in their own namespace"
    );
}
