use crate::{
    collection::{Collection, Dependency},
    ref_grants::RefGrantIndex,
    store::object_source,
};
use gateway_controller_core::{secret::SecretIr, GroupKind, ObjectSource};
use gateway_controller_k8s_api::{ResourceExt, Secret};
use std::collections::BTreeMap;

/// Merges every secret-like kind into one lookup, authorizing cross-namespace reads.
#[derive(Clone, Debug)]
pub struct SecretIndex {
    secrets: BTreeMap<GroupKind, Collection<SecretIr>>,
    ref_grants: RefGrantIndex,
}

/// A reference to a secret. The namespace defaults to that of the referring object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub group_kind: GroupKind,
    pub namespace: Option<String>,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The secret does not exist or the referring object may not read it.
    #[error("secret {0} not found")]
    NotFound(ObjectSource),

    #[error("unsupported secret kind {0}")]
    UnknownKind(GroupKind),
}

pub fn secret_group_kind() -> GroupKind {
    GroupKind::new("", "Secret")
}

/// Converts native Kubernetes secrets into their IR.
pub fn k8s_secrets(secrets: &Collection<Secret>) -> Collection<SecretIr> {
    secrets.map("Secrets", |secret: &Secret| {
        Some(SecretIr {
            source: object_source(secret),
            data: secret
                .data
                .iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.0.clone()))
                .collect(),
            resource_version: secret.resource_version(),
        })
    })
}

// === impl SecretRef ===

impl SecretRef {
    /// A reference to a native Kubernetes secret.
    pub fn k8s(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            group_kind: secret_group_kind(),
            namespace,
            name: name.into(),
        }
    }

    fn target(&self, from: &ObjectSource) -> ObjectSource {
        let namespace = self
            .namespace
            .clone()
            .unwrap_or_else(|| from.namespace.clone());
        self.group_kind.object(namespace, self.name.clone())
    }
}

// === impl SecretIndex ===

impl SecretIndex {
    pub fn new(secrets: BTreeMap<GroupKind, Collection<SecretIr>>, ref_grants: RefGrantIndex) -> Self {
        Self {
            secrets,
            ref_grants,
        }
    }

    /// Resolves a secret referenced by `from`.
    ///
    /// A cross-namespace reference without a grant fails exactly as if the secret did not exist.
    pub fn get_secret(&self, from: &ObjectSource, secret_ref: &SecretRef) -> Result<SecretIr, SecretError> {
        let secrets = self
            .secrets
            .get(&secret_ref.group_kind)
            .ok_or_else(|| SecretError::UnknownKind(secret_ref.group_kind.clone()))?;

        let target = secret_ref.target(from);
        if !self.ref_grants.reference_allowed(from, &target) {
            tracing::debug!(%from, %target, "Secret reference not permitted");
            return Err(SecretError::NotFound(target));
        }

        secrets.get(&target).ok_or(SecretError::NotFound(target))
    }

    /// True once every contributing secret collection is synced.
    pub fn has_synced(&self) -> bool {
        self.secrets.values().all(Collection::has_synced)
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.secrets
            .values()
            .map(Collection::dependency)
            .chain(Some(self.ref_grants.dependency()))
            .collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &GroupKind> + '_ {
        self.secrets.keys()
    }
}
