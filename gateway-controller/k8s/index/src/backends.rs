use crate::{
    collection::{Collection, Dependency},
    policies::PolicyIndex,
    ref_grants::RefGrantIndex,
};
use gateway_controller_core::{backend::BackendObjectIr, GroupKind, ObjectSource};
use std::collections::BTreeMap;

/// A registry of plugin-contributed backend kinds.
///
/// Backend kinds are registered during initialization with [`BackendIndex::add_backends`]. Once the
/// index is shared (cloned into the route index) it is no longer mutated.
#[derive(Clone, Debug)]
pub struct BackendIndex {
    /// Backends with their policies attached, by kind.
    backends: BTreeMap<GroupKind, Collection<BackendObjectIr>>,

    /// Maps alias kinds onto the kind they resolve as.
    aliases: BTreeMap<GroupKind, GroupKind>,

    policies: Option<PolicyIndex>,
    ref_grants: RefGrantIndex,
}

/// A typed reference to a backend, as found on a route.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackendRef {
    pub group_kind: GroupKind,
    pub namespace: Option<String>,
    pub name: String,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("unsupported backend kind {0}")]
    UnknownKind(GroupKind),

    #[error("backend {0} not found")]
    NotFound(ObjectSource),

    #[error("reference from {from} to backend {to} is not permitted")]
    NotPermitted { from: ObjectSource, to: ObjectSource },
}

// === impl BackendRef ===

impl BackendRef {
    /// Builds a reference from Gateway API fields, where the kind defaults to `Service` in the
    /// core group.
    pub fn new(
        group: Option<&str>,
        kind: Option<&str>,
        namespace: Option<&str>,
        name: impl Into<String>,
        port: Option<u16>,
    ) -> Self {
        Self {
            group_kind: GroupKind::new(group.unwrap_or(""), kind.unwrap_or("Service")),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(Into::into),
            name: name.into(),
            port,
        }
    }

    /// The referenced object, given the referring object.
    pub fn target(&self, from: &ObjectSource) -> ObjectSource {
        let namespace = self
            .namespace
            .clone()
            .unwrap_or_else(|| from.namespace.clone());
        self.group_kind.object(namespace, self.name.clone())
    }
}

// === impl BackendIndex ===

impl BackendIndex {
    pub fn new(policies: Option<PolicyIndex>, ref_grants: RefGrantIndex) -> Self {
        Self {
            backends: BTreeMap::new(),
            aliases: BTreeMap::new(),
            policies,
            ref_grants,
        }
    }

    /// Registers a backend kind, along with kinds that resolve as aliases of it.
    pub fn add_backends(
        &mut self,
        group_kind: GroupKind,
        backends: Collection<BackendObjectIr>,
        alias_kinds: &[GroupKind],
    ) {
        let backends = match self.policies.clone() {
            None => backends,
            Some(policies) => attach_policies(&group_kind, backends, policies),
        };
        for alias in alias_kinds {
            tracing::debug!(%alias, kind = %group_kind, "Registering backend alias");
            self.aliases.insert(alias.clone(), group_kind.clone());
        }
        tracing::debug!(kind = %group_kind, "Registering backends");
        self.backends.insert(group_kind, backends);
    }

    /// Resolves a backend reference made by `from`.
    pub fn get_backend_from_ref(
        &self,
        from: &ObjectSource,
        backend_ref: &BackendRef,
    ) -> Result<BackendObjectIr, BackendError> {
        let referenced = backend_ref.target(from);
        // Grants apply even to kinds that no plugin serves.
        if !self.ref_grants.reference_allowed(from, &referenced) {
            return Err(BackendError::NotPermitted {
                from: from.clone(),
                to: referenced,
            });
        }

        let (group_kind, backends) = self.resolve_kind(&backend_ref.group_kind)?;
        let key = group_kind.object(referenced.namespace.clone(), referenced.name.clone());
        backends.get(&key).ok_or(BackendError::NotFound(referenced))
    }

    /// True once every registered backend collection, and the policy index, is synced.
    pub fn has_synced(&self) -> bool {
        self.backends.values().all(Collection::has_synced)
            && self.policies.as_ref().map_or(true, PolicyIndex::has_synced)
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.backends
            .values()
            .map(Collection::dependency)
            .chain(Some(self.ref_grants.dependency()))
            .collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &GroupKind> + '_ {
        self.backends.keys()
    }

    pub fn backends(&self, group_kind: &GroupKind) -> Option<&Collection<BackendObjectIr>> {
        self.resolve_kind(group_kind).ok().map(|(_, c)| c)
    }

    fn resolve_kind(
        &self,
        group_kind: &GroupKind,
    ) -> Result<(&GroupKind, &Collection<BackendObjectIr>), BackendError> {
        if let Some((gk, backends)) = self.backends.get_key_value(group_kind) {
            return Ok((gk, backends));
        }
        self.aliases
            .get(group_kind)
            .and_then(|primary| self.backends.get_key_value(primary))
            .ok_or_else(|| BackendError::UnknownKind(group_kind.clone()))
    }
}

fn attach_policies(
    group_kind: &GroupKind,
    backends: Collection<BackendObjectIr>,
    policies: PolicyIndex,
) -> Collection<BackendObjectIr> {
    let name = format!("{group_kind}/WithPolicies");
    let deps = vec![backends.dependency(), policies.dependency()];
    Collection::derive(name, deps, move || {
        backends
            .snapshot()
            .iter()
            .map(|(key, backend)| {
                let mut backend = backend.clone();
                backend.attached_policies = policies.policies_for(key);
                (key.clone(), backend)
            })
            .collect()
    })
}
