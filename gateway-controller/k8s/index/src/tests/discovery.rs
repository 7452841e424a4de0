use super::*;
use crate::{discovery::DiscoveryError, secrets::SecretRef};

fn discovery_settings() -> Settings {
    Settings {
        discovery_namespace_selectors: json!([{ "matchLabels": { "discovered": "true" } }])
            .to_string(),
        ..Default::default()
    }
}

#[test]
fn invalid_selectors_are_fatal() {
    let mut client = TestClient::default();
    let settings = Settings {
        discovery_namespace_selectors: json!([{
            "matchExpressions": [{ "key": "env", "operator": "Matches" }],
        }])
        .to_string(),
        ..Default::default()
    };
    let err = CommonCollections::new(&mut client, settings, controller_names(), Options::default())
        .expect_err("selector must be rejected");
    assert!(matches!(
        err,
        crate::Error::Discovery(DiscoveryError::InvalidSelector { index: 0, .. })
    ));

    let settings = Settings {
        discovery_namespace_selectors: "not json".to_string(),
        ..Default::default()
    };
    let err = CommonCollections::new(&mut client, settings, controller_names(), Options::default())
        .expect_err("selectors must parse");
    assert!(matches!(err, crate::Error::Discovery(DiscoveryError::Parse(_))));
}

#[test]
fn filter_is_installed_before_namespaced_watches() {
    let (client, _common) = mk_common(discovery_settings(), Plugin::default());
    assert!(client.object_filter().is_some());
    assert_eq!(
        client.watched.first().map(String::as_str),
        Some("Namespaces"),
        "only the namespace watch may precede the filter"
    );
}

#[test]
fn undiscovered_namespaces_are_hidden() {
    init_tracing();

    let (mut client, common) = mk_common(discovery_settings(), Plugin::default());
    client.apply(mk_namespace("visible", &[("discovered", "true")]));
    client.apply(mk_namespace("hidden", &[]));
    client.apply(mk_secret("visible", "creds"));
    client.apply(mk_secret("hidden", "creds"));
    client.apply(mk_service("visible", "svc", 80));
    client.apply(mk_service("hidden", "svc", 80));
    client.sync_all();
    assert!(common.has_synced());

    let filter = common.discovery_filter();
    assert!(filter.allows("visible"));
    assert!(!filter.allows("hidden"));
    assert!(filter.allows(""), "cluster-scoped objects are always visible");

    let services = common.services().list();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].metadata.namespace.as_deref(), Some("visible"));

    let from = GroupKind::new("gateway.networking.k8s.io", "Gateway").object("hidden", "gw");
    assert!(common
        .secrets()
        .get_secret(&from, &SecretRef::k8s(None, "creds"))
        .is_err());

    // Labeling the namespace reveals its objects.
    client.apply(mk_namespace("hidden", &[("discovered", "true")]));
    assert_eq!(common.services().len(), 2);
    assert!(common
        .secrets()
        .get_secret(&from, &SecretRef::k8s(None, "creds"))
        .is_ok());

    // Unlabeling it hides them again.
    client.apply(mk_namespace("hidden", &[]));
    assert_eq!(common.services().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn namespace_changes_are_signaled() {
    use futures::prelude::*;

    let (mut client, common) = mk_common(discovery_settings(), Plugin::default());
    let mut updates = common.discovery_filter().updates();
    client.apply(mk_namespace("ns-0", &[("discovered", "true")]));
    tokio::time::timeout(std::time::Duration::from_secs(1), updates.next())
        .await
        .expect("update must be signaled")
        .expect("stream must not end");
    assert_eq!(common.discovery_filter().allowed_namespaces().len(), 1);
}
