use crate::{policy::PolicyAtt, Keyed, ObjectSource};

/// A routable destination contributed by a plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendObjectIr {
    pub source: ObjectSource,

    /// The ports the backend exposes. Empty when the backend accepts any port.
    pub ports: Vec<u16>,

    /// The name the data plane should use when addressing this backend.
    pub canonical_hostname: Option<String>,

    pub attached_policies: Vec<PolicyAtt>,
}

impl Keyed for BackendObjectIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

impl BackendObjectIr {
    pub fn new(source: ObjectSource) -> Self {
        Self {
            source,
            ports: Vec::new(),
            canonical_hostname: None,
            attached_policies: Vec::new(),
        }
    }

    /// The name of the data-plane cluster serving the given port of this backend.
    pub fn cluster_name(&self, port: Option<u16>) -> String {
        let ObjectSource {
            group,
            kind,
            namespace,
            name,
        } = &self.source;
        let group = if group.is_empty() { "core" } else { group };
        match port {
            Some(port) => format!("{kind}_{group}_{namespace}_{name}_{port}"),
            None => format!("{kind}_{group}_{namespace}_{name}"),
        }
    }
}
