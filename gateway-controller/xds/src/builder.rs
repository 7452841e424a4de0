use crate::model::{
    Address, Bootstrap, Cluster, Filter, FilterChain, HttpConnectionManager, Listener, Node, Route,
    RouteConfiguration, SocketAddress, StaticResources, TypedConfig, VirtualHost,
    HTTP_CONNECTION_MANAGER,
};
use std::collections::BTreeMap;

const NODE_ID: &str = "validation-node-id";
const NODE_CLUSTER: &str = "validation-cluster";
const STAT_PREFIX: &str = "placeholder";

const PLACEHOLDER_LISTENER: &str = "placeholder_listener";
const PLACEHOLDER_ADDRESS: &str = "0.0.0.0";
const PLACEHOLDER_PORT: u16 = 8081;
const PLACEHOLDER_FILTER_CHAIN: &str = "placeholder_filter_chain";
const PLACEHOLDER_VHOST: &str = "placeholder_vhost";

/// Accumulates configuration fragments and assembles them into a bootstrap for validation.
///
/// Every `add_*` method copies its arguments, so later changes to the caller's values are not
/// observed by the builder.
///
/// Fragments are rendered in one of two shapes. Filter configurations and loose routes are wrapped
/// in a single placeholder listener. Full listeners are emitted as given, with each HTTP connection
/// manager rewritten to embed the route configuration named after its filter chain. Supplying
/// listeners replaces the placeholder listener.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    filter_configs: BTreeMap<String, TypedConfig>,
    routes: Vec<Route>,
    route_configurations: BTreeMap<String, RouteConfiguration>,
    clusters: Vec<Cluster>,
    listeners: Vec<Listener>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no RouteConfiguration found with name {filter_chain}")]
    MissingRouteConfiguration { filter_chain: String },

    #[error("failed to encode HttpConnectionManager: {0}")]
    Encode(#[source] serde_json::Error),
}

// === impl ConfigBuilder ===

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a per-filter configuration, replacing any earlier configuration for the same filter.
    pub fn add_filter_config(&mut self, name: impl Into<String>, config: &TypedConfig) {
        self.filter_configs.insert(name.into(), config.clone());
    }

    pub fn add_routes(&mut self, routes: &[Route]) {
        self.routes.extend_from_slice(routes);
    }

    /// Adds route configurations, by name. A configuration replaces any earlier one of the same name.
    pub fn add_route_configurations(&mut self, route_configurations: &[RouteConfiguration]) {
        for rc in route_configurations {
            self.route_configurations.insert(rc.name.clone(), rc.clone());
        }
    }

    pub fn add_clusters(&mut self, clusters: &[Cluster]) {
        self.clusters.extend_from_slice(clusters);
    }

    pub fn add_listeners(&mut self, listeners: &[Listener]) {
        self.listeners.extend_from_slice(listeners);
    }

    pub fn build(&self) -> Result<Bootstrap, Error> {
        let mut static_resources = StaticResources::default();

        if !self.filter_configs.is_empty() || !self.routes.is_empty() {
            static_resources.listeners.push(self.placeholder_listener()?);
        }

        static_resources.clusters = self.clusters.clone();

        if !self.listeners.is_empty() {
            let mut listeners = self.listeners.clone();
            for listener in &mut listeners {
                for fc in &mut listener.filter_chains {
                    self.patch_filter_chain(fc)?;
                }
            }
            static_resources.listeners = listeners;
        }

        tracing::debug!(
            listeners = static_resources.listeners.len(),
            clusters = static_resources.clusters.len(),
            "Assembled bootstrap"
        );
        Ok(Bootstrap {
            node: Node {
                id: NODE_ID.to_string(),
                cluster: NODE_CLUSTER.to_string(),
            },
            static_resources,
        })
    }

    fn placeholder_listener(&self) -> Result<Listener, Error> {
        let vhost = VirtualHost {
            name: PLACEHOLDER_VHOST.to_string(),
            domains: vec!["*".to_string()],
            routes: self.routes.clone(),
            typed_per_filter_config: self.filter_configs.clone(),
            ..Default::default()
        };
        let route_config = RouteConfiguration {
            virtual_hosts: vec![vhost],
            ..Default::default()
        };
        let hcm = HttpConnectionManager::with_route_config(STAT_PREFIX, route_config)
            .to_typed_config()
            .map_err(Error::Encode)?;

        Ok(Listener {
            name: PLACEHOLDER_LISTENER.to_string(),
            address: Some(Address {
                socket_address: Some(SocketAddress {
                    address: PLACEHOLDER_ADDRESS.to_string(),
                    port_value: PLACEHOLDER_PORT,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            filter_chains: vec![FilterChain {
                name: PLACEHOLDER_FILTER_CHAIN.to_string(),
                filters: vec![Filter {
                    name: HTTP_CONNECTION_MANAGER.to_string(),
                    typed_config: Some(hcm),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    /// Embeds the route configuration named after the filter chain in each of its HTTP
    /// connection managers.
    fn patch_filter_chain(&self, fc: &mut FilterChain) -> Result<(), Error> {
        for filter in &mut fc.filters {
            if !filter.is_http_connection_manager() {
                continue;
            }
            let rc = self.route_configurations.get(&fc.name).ok_or_else(|| {
                Error::MissingRouteConfiguration {
                    filter_chain: fc.name.clone(),
                }
            })?;
            let hcm = HttpConnectionManager::with_route_config(STAT_PREFIX, rc.clone())
                .to_typed_config()
                .map_err(Error::Encode)?;
            *filter = Filter {
                name: HTTP_CONNECTION_MANAGER.to_string(),
                typed_config: Some(hcm),
                ..Default::default()
            };
        }
        Ok(())
    }
}
