use std::fmt;

/// Identifies a category of cluster object.
///
/// The core API group is represented by the empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

/// The identity of the cluster object from which an entity was derived.
///
/// Cluster-scoped objects have an empty namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectSource {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Implemented by every entity stored in an index.
pub trait Keyed {
    fn key(&self) -> ObjectSource;
}

// === impl GroupKind ===

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: normalize_group(group.into()),
            kind: kind.into(),
        }
    }

    /// Returns an object identity of this kind.
    pub fn object(&self, namespace: impl Into<String>, name: impl Into<String>) -> ObjectSource {
        ObjectSource {
            group: self.group.clone(),
            kind: self.kind.clone(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

// === impl ObjectSource ===

impl ObjectSource {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind {
            group: self.group.clone(),
            kind: self.kind.clone(),
        }
    }

    #[inline]
    pub fn is_kind(&self, gk: &GroupKind) -> bool {
        self.group == gk.group && self.kind == gk.kind
    }
}

impl fmt::Display for ObjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.group_kind(), self.name)
        } else {
            write!(f, "{}/{}/{}", self.group_kind(), self.namespace, self.name)
        }
    }
}

impl Keyed for ObjectSource {
    fn key(&self) -> ObjectSource {
        self.clone()
    }
}

/// Gateway API references spell the core group as either "" or "core".
fn normalize_group(group: String) -> String {
    if group == "core" {
        String::new()
    } else {
        group
    }
}
