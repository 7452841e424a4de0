use crate::{Keyed, ObjectSource};
use std::{collections::BTreeMap, fmt};

/// A credential-bearing object, normalized across the secret-like kinds an index merges.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretIr {
    pub source: ObjectSource,

    /// The raw credential payload, by key.
    pub data: BTreeMap<String, Vec<u8>>,

    /// The resource version of the backing object, when known.
    pub resource_version: Option<String>,
}

impl Keyed for SecretIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

// Secret payloads must never end up in logs.
impl fmt::Debug for SecretIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretIr")
            .field("source", &self.source)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("resource_version", &self.resource_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_payload() {
        let secret = SecretIr {
            source: ObjectSource {
                kind: "Secret".into(),
                namespace: "ns".into(),
                name: "creds".into(),
                ..Default::default()
            },
            data: Some(("tls.key".to_string(), b"hunter2".to_vec()))
                .into_iter()
                .collect(),
            resource_version: None,
        };
        let debug = format!("{secret:?}");
        assert!(debug.contains("tls.key"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("104, 117"));
    }
}
