//! A serde model of the subset of the Envoy v3 API that bootstrap assembly inspects.
//!
//! Fields the assembler never reads are carried through untouched in each type's `extra` map, so
//! callers may supply fully-populated resources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The well-known name of Envoy's HTTP connection manager network filter.
pub const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";

const HTTP_CONNECTION_MANAGER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bootstrap {
    pub node: Node,
    pub static_resources: StaticResources,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub cluster: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<Listener>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<Cluster>,
}

/// A protobuf `Any`, in its JSON form: a type URL alongside the message's own fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedConfig {
    #[serde(rename = "@type")]
    pub type_url: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_chains: Vec<FilterChain>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A listener address. Pipe and internal addresses are carried opaquely in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_address: Option<SocketAddress>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketAddress {
    pub address: String,

    #[serde(default)]
    pub port_value: u16,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed_config: Option<TypedConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_hosts: Vec<VirtualHost>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub typed_per_filter_config: BTreeMap<String, TypedConfig>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A route. Only its name is modeled; the match and action are opaque.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

/// A cluster. Only its name is modeled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,

    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConnectionManager {
    pub stat_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_config: Option<RouteConfiguration>,
}

// === impl TypedConfig ===

impl TypedConfig {
    /// Packs a message as an `Any` with the given type URL.
    pub fn pack<T: Serialize>(type_url: impl Into<String>, msg: &T) -> serde_json::Result<Self> {
        let fields = match serde_json::to_value(msg)? {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "typed config must be an object, not {other}"
                )))
            }
        };
        Ok(Self {
            type_url: type_url.into(),
            fields,
        })
    }
}

// === impl HttpConnectionManager ===

impl HttpConnectionManager {
    pub fn with_route_config(stat_prefix: impl Into<String>, route_config: RouteConfiguration) -> Self {
        Self {
            stat_prefix: stat_prefix.into(),
            route_config: Some(route_config),
        }
    }

    pub fn to_typed_config(&self) -> serde_json::Result<TypedConfig> {
        TypedConfig::pack(HTTP_CONNECTION_MANAGER_TYPE_URL, self)
    }
}

// === impl Filter ===

impl Filter {
    pub fn is_http_connection_manager(&self) -> bool {
        self.name == HTTP_CONNECTION_MANAGER
    }
}

// === impl Bootstrap ===

impl Bootstrap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
