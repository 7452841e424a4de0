use super::*;
use crate::secrets::{SecretError, SecretRef};

fn gateway_source(ns: &str) -> ObjectSource {
    gateway_key(ns, "gw")
}

#[test]
fn same_namespace_secrets_resolve() {
    let (mut client, common) = mk_common(Settings::default(), Plugin::default());
    client.apply(mk_secret("ns-0", "creds"));
    client.sync_all();

    let secret = common
        .secrets()
        .get_secret(&gateway_source("ns-0"), &SecretRef::k8s(None, "creds"))
        .expect("secret must resolve");
    assert_eq!(secret.data.get("tls.crt").map(Vec::as_slice), Some(&b"cert"[..]));
}

#[test]
fn cross_namespace_secrets_require_grants() {
    init_tracing();

    let (mut client, common) = mk_common(Settings::default(), Plugin::default());
    client.apply(mk_secret("certs", "creds"));
    client.sync_all();

    let from = gateway_source("ns-0");
    let secret_ref = SecretRef::k8s(Some("certs".to_string()), "creds");
    let missing_ref = SecretRef::k8s(Some("certs".to_string()), "missing");

    // A denied lookup is indistinguishable from a missing secret.
    let denied = common.secrets().get_secret(&from, &secret_ref);
    assert!(matches!(denied, Err(SecretError::NotFound(_))));
    let missing = common.secrets().get_secret(&from, &missing_ref);
    assert!(matches!(missing, Err(SecretError::NotFound(_))));

    let grant = mk_ref_grant("certs", "allow-gateways", "Gateway", "ns-0", "Secret");
    client.apply(grant.clone());
    assert!(common.secrets().get_secret(&from, &secret_ref).is_ok());
    assert!(
        common
            .secrets()
            .get_secret(&gateway_source("ns-1"), &secret_ref)
            .is_err(),
        "grants only apply to the namespaces they name"
    );

    client.delete(&grant);
    assert!(common.secrets().get_secret(&from, &secret_ref).is_err());
}

#[test]
fn grants_may_name_a_target() {
    let (mut client, common) = mk_common(Settings::default(), Plugin::default());
    client.apply(mk_secret("certs", "a"));
    client.apply(mk_secret("certs", "b"));
    client.apply(
        serde_json::from_value::<ReferenceGrant>(json!({
            "apiVersion": "gateway.networking.k8s.io/v1beta1",
            "kind": "ReferenceGrant",
            "metadata": { "namespace": "certs", "name": "only-a" },
            "spec": {
                "from": [{
                    "group": "gateway.networking.k8s.io",
                    "kind": "Gateway",
                    "namespace": "ns-0",
                }],
                "to": [{ "group": "", "kind": "Secret", "name": "a" }],
            },
        }))
        .expect("grant must decode"),
    );
    client.sync_all();

    let from = gateway_source("ns-0");
    let secrets = common.secrets();
    assert!(secrets
        .get_secret(&from, &SecretRef::k8s(Some("certs".into()), "a"))
        .is_ok());
    assert!(secrets
        .get_secret(&from, &SecretRef::k8s(Some("certs".into()), "b"))
        .is_err());

    let grants = common.ref_grants();
    let gateway = GroupKind::new("gateway.networking.k8s.io", "Gateway");
    let secret = GroupKind::new("core", "Secret");
    assert!(grants.is_authorized(&gateway, "ns-1", &secret, "ns-1"));
    assert!(!grants.is_authorized(&gateway, "ns-0", &secret, "certs"));
}

#[test]
fn unknown_secret_kinds_are_rejected() {
    let (_client, common) = mk_common(Settings::default(), Plugin::default());
    let secret_ref = SecretRef {
        group_kind: GroupKind::new("vault.example.com", "VaultSecret"),
        namespace: None,
        name: "creds".to_string(),
    };
    assert!(matches!(
        common
            .secrets()
            .get_secret(&gateway_source("ns-0"), &secret_ref),
        Err(SecretError::UnknownKind(_))
    ));
}

#[test]
fn secret_payloads_are_not_logged() {
    let (mut client, common) = mk_common(Settings::default(), Plugin::default());
    client.apply(mk_secret("ns-0", "creds"));
    let secret = common
        .secrets()
        .get_secret(&gateway_source("ns-0"), &SecretRef::k8s(None, "creds"))
        .expect("secret must resolve");
    assert!(!format!("{secret:?}").contains("cert\""));
}
