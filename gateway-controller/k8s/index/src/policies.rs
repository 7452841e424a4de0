use crate::collection::{Collection, Dependency};
use ahash::AHashMap as HashMap;
use gateway_controller_core::{
    policy::{PolicyAtt, PolicyWrapper},
    GroupKind, Keyed, ObjectSource,
};
use std::collections::BTreeMap;

/// Aggregates plugin-contributed policies, indexed by the objects they target.
#[derive(Clone, Debug)]
pub struct PolicyIndex {
    policies: BTreeMap<GroupKind, Collection<PolicyWrapper>>,
    by_target: Collection<TargetPolicies>,
}

/// Every policy attachment for one target object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPolicies {
    pub target: ObjectSource,
    pub attachments: Vec<PolicyAtt>,
}

impl Keyed for TargetPolicies {
    fn key(&self) -> ObjectSource {
        self.target.clone()
    }
}

impl PolicyIndex {
    pub fn new(policies: BTreeMap<GroupKind, Collection<PolicyWrapper>>) -> Self {
        let deps = policies.values().map(Collection::dependency).collect();
        let by_target = {
            let policies = policies.clone();
            Collection::derive("PolicyTargets", deps, move || index_targets(&policies))
        };
        Self {
            policies,
            by_target,
        }
    }

    pub fn has_synced(&self) -> bool {
        self.policies.values().all(Collection::has_synced)
    }

    pub fn dependency(&self) -> Dependency {
        self.by_target.dependency()
    }

    /// Returns the policies attached to an object. Objects without policies yield an empty list.
    pub fn policies_for(&self, target: &ObjectSource) -> Vec<PolicyAtt> {
        self.by_target
            .get(target)
            .map(|t| t.attachments)
            .unwrap_or_default()
    }

    /// Returns the policies attached to an object as a whole or to the named section of it.
    pub fn policies_for_section(&self, target: &ObjectSource, section: &str) -> Vec<PolicyAtt> {
        self.policies_for(target)
            .into_iter()
            .filter(|att| att.section_name.as_deref().map_or(true, |s| s == section))
            .collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &GroupKind> + '_ {
        self.policies.keys()
    }
}

fn index_targets(
    policies: &BTreeMap<GroupKind, Collection<PolicyWrapper>>,
) -> HashMap<ObjectSource, TargetPolicies> {
    let mut by_target = HashMap::<ObjectSource, TargetPolicies>::new();
    for (group_kind, collection) in policies {
        for policy in collection.list() {
            for target_ref in &policy.target_refs {
                let target = target_ref.target(&policy.source.namespace);
                let entry = by_target
                    .entry(target.clone())
                    .or_insert_with(|| TargetPolicies {
                        target,
                        attachments: Vec::new(),
                    });
                entry.attachments.push(PolicyAtt {
                    group_kind: group_kind.clone(),
                    policy_ref: policy.source.clone(),
                    section_name: target_ref.section_name.clone(),
                    policy_ir: policy.policy_ir.clone(),
                });
            }
        }
    }
    by_target
}
