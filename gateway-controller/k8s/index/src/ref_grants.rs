use crate::{collection::Collection, collection::Dependency, store::object_source};
use gateway_controller_core::{GroupKind, Keyed, ObjectSource};
use gateway_controller_k8s_api::{gateway::referencegrants::ReferenceGrant, ResourceExt};

/// Authorizes cross-namespace references.
///
/// A grant lives in the namespace of the referenced objects and lists the kinds, by namespace,
/// that may refer to them. References within a namespace never require a grant.
#[derive(Clone, Debug)]
pub struct RefGrantIndex {
    grants: Collection<RefGrantIr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefGrantIr {
    pub source: ObjectSource,
    pub from: Vec<GrantFrom>,
    pub to: Vec<GrantTo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantFrom {
    pub group_kind: GroupKind,
    pub namespace: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantTo {
    pub group_kind: GroupKind,

    /// When set, only the named object is granted.
    pub name: Option<String>,
}

impl Keyed for RefGrantIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

impl RefGrantIr {
    fn from_resource(grant: &ReferenceGrant) -> Self {
        Self {
            source: object_source(grant),
            from: grant
                .spec
                .from
                .iter()
                .map(|f| GrantFrom {
                    group_kind: GroupKind::new(f.group.clone(), f.kind.clone()),
                    namespace: f.namespace.clone(),
                })
                .collect(),
            to: grant
                .spec
                .to
                .iter()
                .map(|t| GrantTo {
                    group_kind: GroupKind::new(t.group.clone(), t.kind.clone()),
                    name: t.name.clone().filter(|n| !n.is_empty()),
                })
                .collect(),
        }
    }

    fn grants(&self, from: &GroupKind, from_ns: &str, to: &GroupKind, to_name: Option<&str>) -> bool {
        let from_ok = self
            .from
            .iter()
            .any(|f| f.group_kind == *from && f.namespace == from_ns);
        from_ok
            && self.to.iter().any(|t| {
                t.group_kind == *to
                    && match (t.name.as_deref(), to_name) {
                        (None, _) => true,
                        (Some(granted), Some(name)) => granted == name,
                        (Some(_), None) => false,
                    }
            })
    }
}

impl RefGrantIndex {
    pub fn new(grants: &Collection<ReferenceGrant>) -> Self {
        let grants = grants.map("RefGrants", |grant: &ReferenceGrant| {
            if grant.namespace().is_none() {
                return None;
            }
            Some(RefGrantIr::from_resource(grant))
        });
        Self { grants }
    }

    pub fn has_synced(&self) -> bool {
        self.grants.has_synced()
    }

    pub fn dependency(&self) -> Dependency {
        self.grants.dependency()
    }

    pub fn grants(&self) -> &Collection<RefGrantIr> {
        &self.grants
    }

    /// Returns true if objects of kind `from` in `from_ns` may refer to any object of kind `to`
    /// in `to_ns`.
    pub fn is_authorized(&self, from: &GroupKind, from_ns: &str, to: &GroupKind, to_ns: &str) -> bool {
        self.allowed(from, from_ns, to, to_ns, None)
    }

    /// Returns true if the object `from` may refer to the object `to`.
    pub fn reference_allowed(&self, from: &ObjectSource, to: &ObjectSource) -> bool {
        self.allowed(
            &from.group_kind(),
            &from.namespace,
            &to.group_kind(),
            &to.namespace,
            Some(&to.name),
        )
    }

    fn allowed(
        &self,
        from: &GroupKind,
        from_ns: &str,
        to: &GroupKind,
        to_ns: &str,
        to_name: Option<&str>,
    ) -> bool {
        if from_ns == to_ns {
            return true;
        }
        let allowed = self
            .grants
            .snapshot()
            .values()
            .filter(|g| g.source.namespace == to_ns)
            .any(|g| g.grants(from, from_ns, to, to_name));
        if !allowed {
            tracing::debug!(%from, from_ns, %to, to_ns, "No reference grant");
        }
        allowed
    }
}
