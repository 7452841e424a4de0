use crate::collection::Collection;
use gateway_controller_core::{Keyed, ObjectSource};
use gateway_controller_k8s_api::{Labels, Namespace, ResourceExt};

/// The attributes of a namespace that discovery and route attachment depend on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceMetadata {
    pub name: String,
    pub labels: Labels,
}

pub fn namespace_key(name: impl Into<String>) -> ObjectSource {
    ObjectSource {
        group: String::new(),
        kind: "Namespace".to_string(),
        namespace: String::new(),
        name: name.into(),
    }
}

/// Projects raw namespaces onto their metadata.
pub fn namespace_metadata(namespaces: &Collection<Namespace>) -> Collection<NamespaceMetadata> {
    namespaces.map("NamespaceMetadata", |ns: &Namespace| {
        Some(NamespaceMetadata {
            name: ns.name_unchecked(),
            labels: ns.metadata.labels.clone().into(),
        })
    })
}

impl Keyed for NamespaceMetadata {
    fn key(&self) -> ObjectSource {
        namespace_key(self.name.clone())
    }
}
