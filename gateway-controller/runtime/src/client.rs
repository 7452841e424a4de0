use crate::{
    index::{
        metrics::{IndexMetrics, Instrumented},
        store::{store, StoreWriter},
        Client, Collection, DiscoveryFilter, Watched,
    },
    k8s::{self, gateway, Resource},
};
use kube::runtime::watcher;
use std::collections::HashSet;
use tracing::{info_span, Instrument};

/// Feeds resource watches from a kubert runtime into index stores.
///
/// Watches of kinds whose APIs are not served by the cluster are skipped. Their stores are marked
/// synced so that readiness does not block on them.
pub struct KubertClient<'rt, S> {
    runtime: &'rt mut kubert::Runtime<S>,
    metrics: IndexMetrics,
    missing_kinds: HashSet<String>,
    filter: Option<DiscoveryFilter>,
}

impl<'rt, S> KubertClient<'rt, S> {
    pub async fn new(runtime: &'rt mut kubert::Runtime<S>, metrics: IndexMetrics) -> Self {
        let client = runtime.client();
        let mut missing_kinds = HashSet::new();
        macro_rules! discover {
            ($($kind:ty),+ $(,)?) => {
                $(
                    if !api_resource_exists::<$kind>(&client).await {
                        missing_kinds.insert(api_kind::<$kind>());
                    }
                )+
            };
        }
        discover!(
            gateway::gatewayclasses::GatewayClass,
            gateway::gateways::Gateway,
            gateway::httproutes::HTTPRoute,
            gateway::grpcroutes::GRPCRoute,
            gateway::tcproutes::TCPRoute,
            gateway::tlsroutes::TLSRoute,
            gateway::referencegrants::ReferenceGrant,
            k8s::ListenerSet,
            k8s::GatewayExtension,
        );

        Self {
            runtime,
            metrics,
            missing_kinds,
            filter: None,
        }
    }

    fn writer<T: Watched>(&self, mut writer: StoreWriter<T>) -> Option<Instrumented<T>> {
        let kind = api_kind::<T>();
        if self.missing_kinds.contains(&kind) {
            tracing::warn!(%kind, "Resource kind not found, skipping watches");
            writer.mark_synced();
            return None;
        }
        Some(IndexMetrics::instrument(&self.metrics, writer))
    }
}

impl<S: 'static> Client for KubertClient<'_, S> {
    fn set_object_filter(&mut self, filter: DiscoveryFilter) {
        self.filter = Some(filter);
    }

    fn object_filter(&self) -> Option<&DiscoveryFilter> {
        self.filter.as_ref()
    }

    fn watch_unfiltered<T: Watched>(&mut self, name: &str) -> Collection<T> {
        let (writer, collection) = store::<T>(name);
        if let Some(writer) = self.writer(writer) {
            let events = self.runtime.watch_all::<T>(watcher::Config::default());
            tokio::spawn(
                kubert::index::namespaced(writer.shared(), events)
                    .instrument(info_span!("watch", resource = %name)),
            );
        }
        collection
    }

    fn watch_cluster<T: Watched>(&mut self, name: &str) -> Collection<T> {
        let (writer, collection) = store::<T>(name);
        if let Some(writer) = self.writer(writer) {
            let events = self.runtime.watch_all::<T>(watcher::Config::default());
            tokio::spawn(
                kubert::index::cluster(writer.shared(), events)
                    .instrument(info_span!("watch", resource = %name)),
            );
        }
        collection
    }
}

fn api_kind<T: Resource<DynamicType = ()>>() -> String {
    format!("{}/{}", T::api_version(&()), T::kind(&()))
}

async fn api_resource_exists<T>(client: &kube::Client) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&T::api_version(&dt))
        .await
        .ok()
        .iter()
        .flat_map(|r| r.resources.iter())
        .any(|r| r.kind == T::kind(&dt))
}
