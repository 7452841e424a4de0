//! Capabilities contributed by extensions.
//!
//! A [`Plugin`] maps resource kinds onto the collections an extension contributes for them.
//! Plugins are assembled after phase 1 of [`CommonCollections`](crate::CommonCollections), from
//! which they may derive their collections, and handed to phase 2.

pub mod kubernetes;

use crate::collection::Collection;
use gateway_controller_core::{
    backend::BackendObjectIr, endpoints::EndpointsForBackend, policy::PolicyWrapper, GroupKind,
};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct Plugin {
    pub contributes_backends: BTreeMap<GroupKind, BackendPlugin>,
    pub contributes_policies: BTreeMap<GroupKind, PolicyPlugin>,
}

#[derive(Clone, Debug)]
pub struct BackendPlugin {
    pub backends: Collection<BackendObjectIr>,

    /// The endpoints of the contributed backends, if the plugin discovers them.
    pub endpoints: Option<Collection<EndpointsForBackend>>,

    /// Kinds that resolve as the contributed kind.
    pub alias_kinds: Vec<GroupKind>,
}

#[derive(Clone, Debug)]
pub struct PolicyPlugin {
    pub policies: Collection<PolicyWrapper>,
}

impl Plugin {
    /// Combines the contributions of two plugins. Contributions in `other` replace those of
    /// `self` for the same kind.
    pub fn merge(mut self, other: Plugin) -> Self {
        self.contributes_backends.extend(other.contributes_backends);
        self.contributes_policies.extend(other.contributes_policies);
        self
    }

    pub fn policies(&self) -> BTreeMap<GroupKind, Collection<PolicyWrapper>> {
        self.contributes_policies
            .iter()
            .map(|(gk, p)| (gk.clone(), p.policies.clone()))
            .collect()
    }
}
