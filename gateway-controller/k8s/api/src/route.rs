//! A kind-agnostic view of Gateway API route specs.
//!
//! HTTPRoute, GRPCRoute, TCPRoute, and TLSRoute share the parent, hostname, and backend reference
//! schema but are generated as distinct types. The view is decoded from a route's serialized spec
//! so that indexing logic is written once.

use crate::gateway::{
    grpcroutes::GRPCRoute, httproutes::HTTPRoute, tcproutes::TCPRoute, tlsroutes::TLSRoute,
};
use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpecView {
    #[serde(default, deserialize_with = "nullable")]
    pub parent_refs: Vec<ParentRefView>,
    #[serde(default, deserialize_with = "nullable")]
    pub hostnames: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub rules: Vec<RuleView>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRefView {
    pub group: Option<String>,
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    pub section_name: Option<String>,
    pub port: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub backend_refs: Vec<BackendRefView>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRefView {
    pub group: Option<String>,
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    pub port: Option<i32>,
    pub weight: Option<i32>,
}

// Generated types may serialize absent lists as `null`.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Implemented by the route kinds that can be viewed as a [`RouteSpecView`].
pub trait RouteSpec {
    fn spec_view(&self) -> Result<RouteSpecView, serde_json::Error>;
}

macro_rules! impl_route_spec {
    ($($route:ty),+) => {
        $(
            impl RouteSpec for $route {
                fn spec_view(&self) -> Result<RouteSpecView, serde_json::Error> {
                    serde_json::from_value(serde_json::to_value(&self.spec)?)
                }
            }
        )+
    };
}

impl_route_spec!(HTTPRoute, GRPCRoute, TCPRoute, TLSRoute);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_route_view() {
        let route: HTTPRoute = serde_json::from_value(json!({
            "apiVersion": "gateway.networking.k8s.io/v1",
            "kind": "HTTPRoute",
            "metadata": { "namespace": "ns", "name": "route" },
            "spec": {
                "parentRefs": [{ "name": "gw", "sectionName": "http" }],
                "hostnames": ["example.com"],
                "rules": [{
                    "backendRefs": [{ "name": "svc", "port": 8080, "weight": 3 }],
                }],
            },
        }))
        .expect("route must decode");

        let view = route.spec_view().expect("view must decode");
        assert_eq!(view.parent_refs.len(), 1);
        assert_eq!(view.parent_refs[0].section_name.as_deref(), Some("http"));
        assert_eq!(view.hostnames, vec!["example.com".to_string()]);
        assert_eq!(
            view.rules[0].backend_refs,
            vec![BackendRefView {
                name: "svc".into(),
                port: Some(8080),
                weight: Some(3),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn tcp_route_view() {
        let route: TCPRoute = serde_json::from_value(json!({
            "apiVersion": "gateway.networking.k8s.io/v1alpha2",
            "kind": "TCPRoute",
            "metadata": { "namespace": "ns", "name": "route" },
            "spec": {
                "parentRefs": [{ "name": "gw" }],
                "rules": [{ "backendRefs": [{ "name": "db", "port": 5432 }] }],
            },
        }))
        .expect("route must decode");

        let view = route.spec_view().expect("view must decode");
        assert!(view.hostnames.is_empty());
        assert_eq!(view.rules[0].backend_refs[0].name, "db");
        assert_eq!(view.rules[0].backend_refs[0].port, Some(5432));
    }
}
