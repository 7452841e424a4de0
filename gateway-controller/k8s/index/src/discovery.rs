//! Restricts which namespaces the controller observes.
//!
//! The filter is computed from a list of label selectors. A namespace is discovered when it matches
//! any selector; with no selectors, every namespace is discovered. The filter is installed on the
//! [`Client`](crate::Client) before any other watch is registered so that every index observes only
//! objects in discovered namespaces.

use crate::{
    collection::{Collection, Dependency},
    namespaces::{namespace_key, NamespaceMetadata},
};
use futures::prelude::*;
use gateway_controller_k8s_api::{labels::InvalidSelector, LabelSelector, Selector};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct DiscoveryFilter {
    selectors: Arc<[Selector]>,
    allowed: Collection<NamespaceMetadata>,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to parse discovery namespace selectors: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid discovery namespace selector at index {index}: {source}")]
    InvalidSelector {
        index: usize,
        #[source]
        source: InvalidSelector,
    },
}

/// Parses the serialized form of a selector list. An empty string denotes no selectors.
pub fn parse_selectors(raw: &str) -> Result<Vec<LabelSelector>, DiscoveryError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(DiscoveryError::Parse)
}

impl DiscoveryFilter {
    pub fn new(
        namespaces: Collection<NamespaceMetadata>,
        selectors: &[LabelSelector],
    ) -> Result<Self, DiscoveryError> {
        let selectors = selectors
            .iter()
            .enumerate()
            .map(|(index, sel)| {
                Selector::try_from(sel)
                    .map_err(|source| DiscoveryError::InvalidSelector { index, source })
            })
            .collect::<Result<Arc<[Selector]>, _>>()?;

        let allowed = {
            let selectors = selectors.clone();
            namespaces.filter("DiscoveredNamespaces", vec![], move |_, ns| {
                selects(&selectors, ns)
            })
        };

        tracing::debug!(selectors = selectors.len(), "Built discovery filter");
        Ok(Self { selectors, allowed })
    }

    /// Returns true if objects in the given namespace are visible.
    ///
    /// Cluster-scoped objects, which have no namespace, are always visible.
    pub fn allows(&self, namespace: &str) -> bool {
        if namespace.is_empty() || self.selectors.is_empty() {
            return true;
        }
        self.allowed.get(&namespace_key(namespace)).is_some()
    }

    /// The namespaces that currently pass the filter.
    pub fn allowed_namespaces(&self) -> Collection<NamespaceMetadata> {
        self.allowed.clone()
    }

    pub fn has_synced(&self) -> bool {
        self.allowed.has_synced()
    }

    /// Yields whenever the set of discovered namespaces may have changed.
    pub fn updates(&self) -> impl Stream<Item = ()> + Send + Unpin + 'static {
        self.allowed.updates()
    }

    pub fn dependency(&self) -> Dependency {
        self.allowed.dependency()
    }

    /// Hides the items of `collection` whose namespace is not discovered.
    pub fn apply<T>(&self, collection: Collection<T>) -> Collection<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if self.selectors.is_empty() {
            return collection;
        }
        let name = format!("{}/Discovered", collection.name());
        let deps = vec![collection.dependency(), self.dependency()];
        let allowed = self.allowed.clone();
        Collection::derive(name, deps, move || {
            let allowed = allowed.snapshot();
            collection
                .snapshot()
                .iter()
                .filter(|(key, _)| {
                    key.namespace.is_empty()
                        || allowed.contains_key(&namespace_key(key.namespace.clone()))
                })
                .map(|(key, item)| (key.clone(), item.clone()))
                .collect()
        })
    }
}

fn selects(selectors: &[Selector], ns: &NamespaceMetadata) -> bool {
    selectors.is_empty() || selectors.iter().any(|s| s.matches(&ns.labels))
}
