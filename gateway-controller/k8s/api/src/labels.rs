use crate::LabelSelector;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// An object's labels, cheaply cloneable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Labels(Arc<Map>);

pub type Map = BTreeMap<String, String>;

/// A label selector in matchable form.
///
/// An empty selector matches every object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    labels: Map,
    requirements: Vec<Requirement>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Requirement {
    In { key: String, values: BTreeSet<String> },
    NotIn { key: String, values: BTreeSet<String> },
    Exists { key: String },
    DoesNotExist { key: String },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSelector {
    #[error("unknown operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },

    #[error("operator {operator:?} for key {key:?} requires values")]
    MissingValues { key: String, operator: String },

    #[error("operator {operator:?} for key {key:?} must not have values")]
    UnexpectedValues { key: String, operator: String },
}

// === impl Selector ===

impl Selector {
    /// Builds a selector from a `matchLabels`-style map.
    pub fn from_map(labels: Map) -> Self {
        Self {
            labels,
            requirements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        let labels = labels.as_ref();
        self.labels.iter().all(|(k, v)| labels.get(k) == Some(v))
            && self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl TryFrom<&LabelSelector> for Selector {
    type Error = InvalidSelector;

    fn try_from(sel: &LabelSelector) -> Result<Self, Self::Error> {
        let requirements = sel
            .match_expressions
            .iter()
            .flatten()
            .map(|req| {
                let values = req.values.clone().unwrap_or_default();
                Requirement::parse(&req.key, &req.operator, values)
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            labels: sel.match_labels.clone().unwrap_or_default(),
            requirements,
        })
    }
}

// === impl Requirement ===

impl Requirement {
    fn parse(key: &str, operator: &str, values: Vec<String>) -> Result<Self, InvalidSelector> {
        let key = key.to_string();
        let values = values.into_iter().collect::<BTreeSet<_>>();
        let invalid = |values_required: bool| {
            let (key, operator) = (key.clone(), operator.to_string());
            if values_required {
                InvalidSelector::MissingValues { key, operator }
            } else {
                InvalidSelector::UnexpectedValues { key, operator }
            }
        };
        match operator {
            "In" | "NotIn" if values.is_empty() => Err(invalid(true)),
            "Exists" | "DoesNotExist" if !values.is_empty() => Err(invalid(false)),
            "In" => Ok(Self::In { key, values }),
            "NotIn" => Ok(Self::NotIn { key, values }),
            "Exists" => Ok(Self::Exists { key }),
            "DoesNotExist" => Ok(Self::DoesNotExist { key }),
            _ => Err(InvalidSelector::UnknownOperator {
                key,
                operator: operator.to_string(),
            }),
        }
    }

    fn matches(&self, labels: &Map) -> bool {
        match self {
            Self::In { key, values } => labels.get(key).is_some_and(|v| values.contains(v)),
            Self::NotIn { key, values } => labels.get(key).map_or(true, |v| !values.contains(v)),
            Self::Exists { key } => labels.contains_key(key),
            Self::DoesNotExist { key } => !labels.contains_key(key),
        }
    }
}

// === impl Labels ===

impl From<Map> for Labels {
    #[inline]
    fn from(labels: Map) -> Self {
        Self(Arc::new(labels))
    }
}

impl From<Option<Map>> for Labels {
    #[inline]
    fn from(labels: Option<Map>) -> Self {
        labels.unwrap_or_default().into()
    }
}

impl AsRef<Map> for Labels {
    #[inline]
    fn as_ref(&self) -> &Map {
        &self.0
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Labels {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let labels = iter
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Map>();
        labels.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn selector(match_labels: &[(&str, &str)], exprs: &[(&str, &str, &[&str])]) -> Selector {
        let sel = LabelSelector {
            match_labels: Some(
                match_labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            match_expressions: Some(
                exprs
                    .iter()
                    .map(|(key, operator, values)| LabelSelectorRequirement {
                        key: key.to_string(),
                        operator: operator.to_string(),
                        values: Some(values.iter().map(|v| v.to_string()).collect()),
                    })
                    .collect(),
            ),
        };
        Selector::try_from(&sel).expect("selector must be valid")
    }

    #[test]
    fn matches_labels_and_expressions() {
        let cases: &[(Selector, &[(&str, &str)], bool, &str)] = &[
            (Selector::default(), &[], true, "empty selector"),
            (selector(&[("foo", "bar")], &[]), &[("foo", "bar")], true, "exact label"),
            (
                selector(&[("foo", "bar")], &[]),
                &[("foo", "bar"), ("bah", "baz")],
                true,
                "extra labels",
            ),
            (selector(&[("foo", "bar")], &[]), &[("foo", "baz")], false, "label mismatch"),
            (selector(&[], &[("foo", "In", &["bar"])]), &[("foo", "bar")], true, "in"),
            (selector(&[], &[("foo", "In", &["bar"])]), &[], false, "in absent"),
            (selector(&[], &[("foo", "NotIn", &["bar"])]), &[("foo", "bar")], false, "not-in"),
            (selector(&[], &[("foo", "NotIn", &["bar"])]), &[], true, "not-in absent"),
            (selector(&[], &[("foo", "Exists", &[])]), &[("foo", "")], true, "exists"),
            (
                selector(&[], &[("foo", "DoesNotExist", &[])]),
                &[("foo", "")],
                false,
                "does not exist",
            ),
            (
                selector(&[("env", "prod")], &[("tier", "In", &["edge"])]),
                &[("env", "prod")],
                false,
                "labels and expressions must all match",
            ),
        ];
        for (selector, labels, matches, msg) in cases {
            let labels = labels.iter().copied().collect::<Labels>();
            assert_eq!(selector.matches(&labels), *matches, "{msg}");
        }
    }

    #[test]
    fn rejects_invalid_requirements() {
        let parse = |operator: &str, values: Option<Vec<String>>| {
            Selector::try_from(&LabelSelector {
                match_expressions: Some(vec![LabelSelectorRequirement {
                    key: "tier".into(),
                    operator: operator.into(),
                    values,
                }]),
                ..Default::default()
            })
        };

        assert!(matches!(
            parse("Matches", None),
            Err(InvalidSelector::UnknownOperator { .. })
        ));
        assert!(matches!(
            parse("In", Some(vec![])),
            Err(InvalidSelector::MissingValues { .. })
        ));
        assert!(matches!(
            parse("Exists", Some(vec!["edge".into()])),
            Err(InvalidSelector::UnexpectedValues { .. })
        ));
        assert!(parse("DoesNotExist", None).is_ok());
    }
}
