//! The composition root of the index graph.
//!
//! Construction happens in two phases. [`CommonCollections::new`] builds everything that does not
//! depend on plugins. Plugins are then assembled, possibly from the phase-1 collections, and handed
//! to [`CommonCollections::init_plugins`], which builds the policy, backend, endpoint, route, and
//! gateway indices. [`CommonCollections::has_synced`] only returns true once both phases have
//! completed and every index has observed its initial state.

use crate::{
    backends::BackendIndex,
    client::Client,
    collection::Collection,
    discovery::{parse_selectors, DiscoveryError, DiscoveryFilter},
    endpoints::join_endpoints,
    extensions::{gateway_extensions, GatewayExtensionIr},
    gateways::{
        GatewayIndex, GatewayIndexConfig, GatewaysForDeployerTransformation,
        GatewaysForEnvoyTransformation,
    },
    namespaces::{namespace_metadata, NamespaceMetadata},
    plugin::Plugin,
    pods::{locality_pods, LocalityPod},
    policies::PolicyIndex,
    ref_grants::RefGrantIndex,
    routes::{RouteInputs, RoutesIndex},
    secrets::{k8s_secrets, secret_group_kind, SecretIndex},
};
use gateway_controller_core::{endpoints::EndpointsForBackend, ControllerNames, Settings};
use gateway_controller_k8s_api::{
    gateway::{
        gatewayclasses::GatewayClass, gateways::Gateway, grpcroutes::GRPCRoute,
        httproutes::HTTPRoute, referencegrants::ReferenceGrant, tcproutes::TCPRoute,
        tlsroutes::TLSRoute,
    },
    ConfigMap, GatewayExtension, ListenerSet, Namespace, Node, Pod, Secret, Service,
};
use std::fmt;

pub struct CommonCollections {
    settings: Settings,
    controller_names: ControllerNames,
    options: Options,

    discovery: DiscoveryFilter,
    namespaces: Collection<NamespaceMetadata>,
    ref_grants: RefGrantIndex,
    secrets: SecretIndex,
    services: Collection<Service>,
    config_maps: Collection<ConfigMap>,
    locality_pods: Collection<LocalityPod>,
    gateway_extensions: Collection<GatewayExtensionIr>,

    plugins: Option<PluginCollections>,
}

/// Replaces the default gateway transformations.
#[derive(Clone, Default)]
pub struct Options {
    gateway_for_deployer: Option<GatewaysForDeployerTransformation>,
    gateway_for_envoy: Option<GatewaysForEnvoyTransformation>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("plugins have already been initialized")]
    PluginsAlreadyInitialized,
}

struct PluginCollections {
    policies: Option<PolicyIndex>,
    backends: BackendIndex,
    endpoints: Collection<EndpointsForBackend>,
    routes: RoutesIndex,
    gateways: GatewayIndex,
}

// === impl Options ===

impl Options {
    pub fn with_gateway_for_deployer_transformation(
        mut self,
        f: GatewaysForDeployerTransformation,
    ) -> Self {
        self.gateway_for_deployer = Some(f);
        self
    }

    pub fn with_gateway_for_envoy_transformation(
        mut self,
        f: GatewaysForEnvoyTransformation,
    ) -> Self {
        self.gateway_for_envoy = Some(f);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("gateway_for_deployer", &self.gateway_for_deployer.is_some())
            .field("gateway_for_envoy", &self.gateway_for_envoy.is_some())
            .finish()
    }
}

// === impl CommonCollections ===

impl CommonCollections {
    /// Phase 1: builds the collections that plugins may depend on.
    ///
    /// The discovery filter is installed on `client` before any namespaced watch is registered.
    pub fn new<C: Client>(
        client: &mut C,
        settings: Settings,
        controller_names: ControllerNames,
        options: Options,
    ) -> Result<Self, Error> {
        let namespaces = namespace_metadata(&client.watch_cluster::<Namespace>("Namespaces"));

        let selectors = parse_selectors(&settings.discovery_namespace_selectors)?;
        let discovery = DiscoveryFilter::new(namespaces.clone(), &selectors)?;
        client.set_object_filter(discovery.clone());

        let ref_grants = RefGrantIndex::new(&client.watch::<ReferenceGrant>("ReferenceGrants"));
        let secrets = {
            let k8s = k8s_secrets(&client.watch::<Secret>("Secrets"));
            let by_kind = Some((secret_group_kind(), k8s)).into_iter().collect();
            SecretIndex::new(by_kind, ref_grants.clone())
        };

        let services = client.watch::<Service>("Services");
        let config_maps = client.watch::<ConfigMap>("ConfigMaps");
        let locality_pods = locality_pods(
            &client.watch::<Pod>("Pods"),
            &client.watch_cluster::<Node>("Nodes"),
        );
        let gateway_extensions =
            gateway_extensions(&client.watch::<GatewayExtension>("GatewayExtensions"));

        tracing::info!(
            selectors = selectors.len(),
            enable_envoy = settings.enable_envoy,
            "Initialized common collections"
        );
        Ok(Self {
            settings,
            controller_names,
            options,
            discovery,
            namespaces,
            ref_grants,
            secrets,
            services,
            config_maps,
            locality_pods,
            gateway_extensions,
            plugins: None,
        })
    }

    /// Phase 2: builds the indices that depend on plugin contributions.
    ///
    /// May only be called once.
    pub fn init_plugins<C: Client>(&mut self, client: &mut C, plugin: &Plugin) -> Result<(), Error> {
        if self.plugins.is_some() {
            return Err(Error::PluginsAlreadyInitialized);
        }

        let gateway_classes = client.watch_cluster::<GatewayClass>("GatewayClasses");
        let gateways = client.watch::<Gateway>("Gateways");
        let listener_sets = if self.settings.enable_experimental_gateway_api_features {
            client.watch::<ListenerSet>("ListenerSets")
        } else {
            Collection::empty("disable/KubeListenerSets")
        };

        let policies = self
            .settings
            .enable_envoy
            .then(|| PolicyIndex::new(plugin.policies()));

        let gateways = GatewayIndex::new(
            GatewayIndexConfig {
                controller_names: self.controller_names.clone(),
                envoy_controller_name: self.controller_names.controller.clone(),
                gateways,
                listener_sets,
                gateway_classes,
                namespaces: self.namespaces.clone(),
                policies: policies.clone(),
            },
            self.options.gateway_for_deployer.clone(),
            self.options.gateway_for_envoy.clone(),
        );

        let mut backends = BackendIndex::new(policies.clone(), self.ref_grants.clone());
        let (endpoints, routes) = if self.settings.enable_envoy {
            for (gk, contribution) in &plugin.contributes_backends {
                backends.add_backends(
                    gk.clone(),
                    contribution.backends.clone(),
                    &contribution.alias_kinds,
                );
            }
            let inputs = RouteInputs {
                http: client.watch::<HTTPRoute>("HTTPRoutes"),
                grpc: client.watch::<GRPCRoute>("GRPCRoutes"),
                tcp: client.watch::<TCPRoute>("TCPRoutes"),
                tls: client.watch::<TLSRoute>("TLSRoutes"),
            };
            let routes = RoutesIndex::new(inputs, policies.clone(), backends.clone());
            (join_endpoints(plugin), routes)
        } else {
            // Envoy is not programmed, so nothing reads these indices. They are kept synced so
            // that readiness does not depend on them.
            let routes = RoutesIndex::new(RouteInputs::empty(), None, backends.clone());
            (Collection::empty("disable/EndpointIRs"), routes)
        };

        tracing::info!(
            backends = plugin.contributes_backends.len(),
            policies = plugin.contributes_policies.len(),
            "Initialized plugin collections"
        );
        self.plugins = Some(PluginCollections {
            policies,
            backends,
            endpoints,
            routes,
            gateways,
        });
        Ok(())
    }

    /// True once both phases have completed and every index has observed its initial state.
    pub fn has_synced(&self) -> bool {
        let Some(plugins) = self.plugins.as_ref() else {
            return false;
        };
        self.discovery.has_synced()
            && self.namespaces.has_synced()
            && self.ref_grants.has_synced()
            && self.secrets.has_synced()
            && self.services.has_synced()
            && self.config_maps.has_synced()
            && self.locality_pods.has_synced()
            && self.gateway_extensions.has_synced()
            && plugins.policies.as_ref().map_or(true, PolicyIndex::has_synced)
            && plugins.backends.has_synced()
            && plugins.endpoints.has_synced()
            && plugins.routes.has_synced()
            && plugins.gateways.has_synced()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn controller_names(&self) -> &ControllerNames {
        &self.controller_names
    }

    pub fn discovery_filter(&self) -> &DiscoveryFilter {
        &self.discovery
    }

    pub fn namespaces(&self) -> &Collection<NamespaceMetadata> {
        &self.namespaces
    }

    pub fn ref_grants(&self) -> &RefGrantIndex {
        &self.ref_grants
    }

    pub fn secrets(&self) -> &SecretIndex {
        &self.secrets
    }

    pub fn services(&self) -> &Collection<Service> {
        &self.services
    }

    pub fn config_maps(&self) -> &Collection<ConfigMap> {
        &self.config_maps
    }

    pub fn locality_pods(&self) -> &Collection<LocalityPod> {
        &self.locality_pods
    }

    pub fn gateway_extensions(&self) -> &Collection<GatewayExtensionIr> {
        &self.gateway_extensions
    }

    /// The policy index, absent until plugins are initialized or when Envoy is not programmed.
    pub fn policies(&self) -> Option<&PolicyIndex> {
        self.plugins.as_ref()?.policies.as_ref()
    }

    pub fn backends(&self) -> Option<&BackendIndex> {
        self.plugins.as_ref().map(|p| &p.backends)
    }

    pub fn endpoints(&self) -> Option<&Collection<EndpointsForBackend>> {
        self.plugins.as_ref().map(|p| &p.endpoints)
    }

    pub fn routes(&self) -> Option<&RoutesIndex> {
        self.plugins.as_ref().map(|p| &p.routes)
    }

    pub fn gateways(&self) -> Option<&GatewayIndex> {
        self.plugins.as_ref().map(|p| &p.gateways)
    }

    /// Names the collections that have not yet synced, for diagnosing a stalled startup.
    pub fn unsynced(&self) -> Vec<&'static str> {
        let mut checks = vec![
            ("discovery", self.discovery.has_synced()),
            ("namespaces", self.namespaces.has_synced()),
            ("referencegrants", self.ref_grants.has_synced()),
            ("secrets", self.secrets.has_synced()),
            ("services", self.services.has_synced()),
            ("configmaps", self.config_maps.has_synced()),
            ("pods", self.locality_pods.has_synced()),
            ("gatewayextensions", self.gateway_extensions.has_synced()),
        ];
        match self.plugins.as_ref() {
            None => checks.push(("plugins", false)),
            Some(p) => checks.extend([
                (
                    "policies",
                    p.policies.as_ref().map_or(true, PolicyIndex::has_synced),
                ),
                ("backends", p.backends.has_synced()),
                ("endpoints", p.endpoints.has_synced()),
                ("routes", p.routes.has_synced()),
                ("gateways", p.gateways.has_synced()),
            ]),
        }
        checks
            .into_iter()
            .filter(|(_, synced)| !synced)
            .map(|(name, _)| name)
            .collect()
    }
}

impl fmt::Debug for CommonCollections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonCollections")
            .field("settings", &self.settings)
            .field("controller_names", &self.controller_names)
            .field("plugins_initialized", &self.plugins.is_some())
            .finish()
    }
}
