use crate::{GroupKind, Keyed, ObjectSource};
use std::{any::Any, fmt, sync::Arc};

/// A plugin-defined policy payload.
pub trait PolicyIr: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Names the object a policy attaches to. The target is in the policy's namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyTargetRef {
    pub group: String,
    pub kind: String,
    pub name: String,
    pub section_name: Option<String>,
}

/// A policy object contributed by a plugin.
#[derive(Clone, Debug)]
pub struct PolicyWrapper {
    pub source: ObjectSource,
    pub target_refs: Vec<PolicyTargetRef>,
    pub policy_ir: Arc<dyn PolicyIr>,
}

/// A policy as attached to one of its targets.
#[derive(Clone, Debug)]
pub struct PolicyAtt {
    pub group_kind: GroupKind,
    pub policy_ref: ObjectSource,
    pub section_name: Option<String>,
    pub policy_ir: Arc<dyn PolicyIr>,
}

impl Keyed for PolicyWrapper {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

// === impl PolicyTargetRef ===

impl PolicyTargetRef {
    /// The identity of the targeted object, given the namespace of the policy.
    pub fn target(&self, namespace: &str) -> ObjectSource {
        GroupKind::new(self.group.clone(), self.kind.clone()).object(namespace, self.name.clone())
    }
}

// === impl PolicyAtt ===

// Attachments are identified by the policy and section they come from; payloads are opaque.
impl PartialEq for PolicyAtt {
    fn eq(&self, other: &Self) -> bool {
        self.group_kind == other.group_kind
            && self.policy_ref == other.policy_ref
            && self.section_name == other.section_name
    }
}

impl Eq for PolicyAtt {}
