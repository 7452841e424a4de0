//! Derives the two projections of Gateway objects.
//!
//! The deployer projection describes what infrastructure a gateway needs. The Envoy projection
//! describes the listeners that must be programmed into the data plane. Each projection is produced
//! by a replaceable transformation so that either can be extended independently.

use crate::{
    collection::{Collection, Dependency},
    namespaces::NamespaceMetadata,
    policies::PolicyIndex,
    store::object_source,
};
use gateway_controller_core::{
    gateway::{AllowedNamespaces, GatewayForDeployer, GatewayIr, ListenerIr},
    ControllerNames, Keyed, ObjectSource, GATEWAY_GROUP,
};
use gateway_controller_k8s_api::{
    gateway::{gatewayclasses::GatewayClass, gateways::Gateway},
    listener_set::{AllowedRoutes, ListenerEntry},
    ListenerSet, ResourceExt, Selector,
};
use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

/// The inputs gateway transformations read from.
#[derive(Clone, Debug)]
pub struct GatewayIndexConfig {
    /// Gateway classes claimed by any of these controllers are owned by the index.
    pub controller_names: ControllerNames,

    /// The controller name whose gateways are programmed into Envoy.
    pub envoy_controller_name: String,

    pub gateways: Collection<Gateway>,
    pub listener_sets: Collection<ListenerSet>,
    pub gateway_classes: Collection<GatewayClass>,
    pub namespaces: Collection<NamespaceMetadata>,
    pub policies: Option<PolicyIndex>,
}

/// Transforms a single gateway into a projection, or `None` if the gateway is not projected.
pub type GatewayTransform<T> = Box<dyn Fn(&Gateway) -> Option<T> + Send + Sync>;

/// Builds the deployer projection's per-gateway transform from the index inputs.
pub type GatewaysForDeployerTransformation =
    Arc<dyn Fn(&GatewayIndexConfig) -> GatewayTransform<GatewayForDeployer> + Send + Sync>;

/// Builds the Envoy projection's per-gateway transform from the index inputs.
pub type GatewaysForEnvoyTransformation =
    Arc<dyn Fn(&GatewayIndexConfig) -> GatewayTransform<GatewayIr> + Send + Sync>;

#[derive(Clone, Debug)]
pub struct GatewayIndex {
    gateways: Collection<GatewayIr>,
    gateways_for_deployer: Collection<GatewayForDeployer>,
}

// === impl GatewayIndex ===

impl GatewayIndex {
    pub fn new(
        config: GatewayIndexConfig,
        for_deployer: Option<GatewaysForDeployerTransformation>,
        for_envoy: Option<GatewaysForEnvoyTransformation>,
    ) -> Self {
        let deps = config.dependencies();

        let gateways_for_deployer = {
            let transform = match for_deployer {
                Some(f) => f(&config),
                None => default_gateway_for_deployer(&config),
            };
            project("GatewaysForDeployer", &config.gateways, deps.clone(), transform)
        };

        let gateways = {
            let transform = match for_envoy {
                Some(f) => f(&config),
                None => default_gateway_for_envoy(&config),
            };
            project("GatewayIRs", &config.gateways, deps, transform)
        };

        Self {
            gateways,
            gateways_for_deployer,
        }
    }

    /// The Envoy projection.
    pub fn gateways(&self) -> &Collection<GatewayIr> {
        &self.gateways
    }

    /// The deployer projection.
    pub fn gateways_for_deployer(&self) -> &Collection<GatewayForDeployer> {
        &self.gateways_for_deployer
    }

    pub fn has_synced(&self) -> bool {
        self.gateways.has_synced() && self.gateways_for_deployer.has_synced()
    }
}

fn project<T>(
    name: &str,
    gateways: &Collection<Gateway>,
    deps: Vec<Dependency>,
    transform: GatewayTransform<T>,
) -> Collection<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    let gateways = gateways.clone();
    Collection::derive(name, deps, move || {
        gateways
            .snapshot()
            .values()
            .filter_map(|gw| transform(gw))
            .map(|t| (t.key(), t))
            .collect()
    })
}

// === impl GatewayIndexConfig ===

impl GatewayIndexConfig {
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = vec![
            self.gateways.dependency(),
            self.listener_sets.dependency(),
            self.gateway_classes.dependency(),
            self.namespaces.dependency(),
        ];
        deps.extend(self.policies.as_ref().map(PolicyIndex::dependency));
        deps
    }

    /// Returns the controller named by a gateway's class, if the class exists.
    pub fn controller_for(&self, gateway: &Gateway) -> Option<String> {
        let key = ObjectSource {
            group: GATEWAY_GROUP.to_string(),
            kind: "GatewayClass".to_string(),
            namespace: String::new(),
            name: gateway.spec.gateway_class_name.clone(),
        };
        self.gateway_classes
            .get(&key)
            .map(|class| class.spec.controller_name.clone())
    }

    /// Returns the listener sets attached to a gateway, ordered by key.
    pub fn listener_sets_for(&self, gateway: &ObjectSource) -> Vec<ListenerSet> {
        self.listener_sets
            .list()
            .into_iter()
            .filter(|ls| {
                let parent = &ls.spec.parent_ref;
                let namespace = parent
                    .namespace
                    .clone()
                    .or_else(|| ls.namespace())
                    .unwrap_or_default();
                parent.targets_gateway()
                    && parent.name == gateway.name
                    && namespace == gateway.namespace
            })
            .collect()
    }

    fn allowed_namespaces(&self, allowed_routes: Option<&AllowedRoutes>) -> AllowedNamespaces {
        let namespaces = allowed_routes.and_then(|a| a.namespaces.as_ref());
        match namespaces.and_then(|n| n.from.as_deref()) {
            Some("All") => AllowedNamespaces::All,
            Some("Selector") => {
                let selector = namespaces
                    .and_then(|n| n.selector.as_ref())
                    .and_then(|s| Selector::try_from(s).ok());
                let selected = match selector {
                    Some(selector) => self
                        .namespaces
                        .list()
                        .into_iter()
                        .filter(|ns| selector.matches(&ns.labels))
                        .map(|ns| ns.name)
                        .collect(),
                    None => BTreeSet::new(),
                };
                AllowedNamespaces::Selected(selected)
            }
            _ => AllowedNamespaces::Same,
        }
    }
}

/// Projects gateways whose class is claimed by any configured controller.
pub fn default_gateway_for_deployer(
    config: &GatewayIndexConfig,
) -> GatewayTransform<GatewayForDeployer> {
    let config = config.clone();
    Box::new(move |gw: &Gateway| {
        let controller_name = config.controller_for(gw)?;
        if !config.controller_names.contains(&controller_name) {
            return None;
        }
        let source = object_source(gw);
        let ports = gw
            .spec
            .listeners
            .iter()
            .map(|l| l.port)
            .chain(
                config
                    .listener_sets_for(&source)
                    .iter()
                    .flat_map(|ls| ls.spec.listeners.iter().map(|l| l.port)),
            )
            .filter_map(|p| u16::try_from(p).ok())
            .collect();
        Some(GatewayForDeployer {
            class_name: gw.spec.gateway_class_name.clone(),
            controller_name,
            ports,
            source,
        })
    })
}

/// Projects gateways whose class is claimed by the Envoy controller.
///
/// Listeners declared by attached listener sets follow the gateway's own listeners. A listener set
/// listener whose name duplicates an earlier listener is ignored.
pub fn default_gateway_for_envoy(config: &GatewayIndexConfig) -> GatewayTransform<GatewayIr> {
    let config = config.clone();
    Box::new(move |gw: &Gateway| {
        let controller_name = config.controller_for(gw)?;
        if controller_name != config.envoy_controller_name {
            return None;
        }
        let source = object_source(gw);

        let mut names = HashSet::new();
        let mut listeners = Vec::with_capacity(gw.spec.listeners.len());
        for l in &gw.spec.listeners {
            let allowed_routes = serde_json::to_value(&l.allowed_routes)
                .ok()
                .and_then(|v| serde_json::from_value::<Option<AllowedRoutes>>(v).ok())
                .flatten();
            let Ok(port) = u16::try_from(l.port) else {
                tracing::debug!(gateway = %source, listener = %l.name, "Invalid listener port");
                continue;
            };
            names.insert(l.name.clone());
            listeners.push(ListenerIr {
                name: l.name.clone(),
                port,
                protocol: l.protocol.clone(),
                hostname: l.hostname.clone(),
                parent: source.clone(),
                allowed_namespaces: config.allowed_namespaces(allowed_routes.as_ref()),
            });
        }

        let listener_sets = config.listener_sets_for(&source);
        for ls in &listener_sets {
            let parent = object_source(ls);
            for l in &ls.spec.listeners {
                if !names.insert(l.name.clone()) {
                    tracing::debug!(gateway = %source, listener = %l.name, "Duplicate listener");
                    continue;
                }
                if let Some(listener) = listener_set_listener(&config, &parent, l) {
                    listeners.push(listener);
                }
            }
        }

        Some(GatewayIr {
            class_name: gw.spec.gateway_class_name.clone(),
            controller_name,
            listeners,
            listener_sets: listener_sets.iter().map(object_source).collect(),
            attached_policies: config
                .policies
                .as_ref()
                .map(|p| p.policies_for(&source))
                .unwrap_or_default(),
            source,
        })
    })
}

fn listener_set_listener(
    config: &GatewayIndexConfig,
    parent: &ObjectSource,
    l: &ListenerEntry,
) -> Option<ListenerIr> {
    Some(ListenerIr {
        name: l.name.clone(),
        port: u16::try_from(l.port).ok()?,
        protocol: l.protocol.clone(),
        hostname: l.hostname.clone(),
        parent: parent.clone(),
        allowed_namespaces: config.allowed_namespaces(l.allowed_routes.as_ref()),
    })
}
