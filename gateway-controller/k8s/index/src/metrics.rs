use crate::store::StoreWriter;
use kubert::index::{
    ClusterRemoved, IndexClusterResource, IndexNamespacedResource, NamespacedRemoved,
};
use parking_lot::RwLock;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

/// Counts the updates applied to watched stores.
#[derive(Clone, Debug, Default)]
pub struct IndexMetrics {
    index_size: Family<IndexLabels, Gauge>,
    index_applies: Family<IndexLabels, Counter>,
    index_deletes: Family<IndexLabels, Counter>,
    index_resets: Family<IndexLabels, Counter>,
}

/// A store writer that records [`IndexMetrics`].
pub struct Instrumented<T> {
    inner: StoreWriter<T>,
    labels: IndexLabels,
    metrics: IndexMetrics,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct IndexLabels {
    collection: String,
}

impl IndexMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let metrics = Self::default();
        prom.register(
            "index_size",
            "Gauge of the number of resources in the index",
            metrics.index_size.clone(),
        );
        prom.register(
            "index_applies",
            "Count of applies to the index",
            metrics.index_applies.clone(),
        );
        prom.register(
            "index_deletes",
            "Count of deletes to the index",
            metrics.index_deletes.clone(),
        );
        prom.register(
            "index_resets",
            "Count of resets to the index",
            metrics.index_resets.clone(),
        );
        metrics
    }

    pub fn instrument<T>(&self, inner: StoreWriter<T>) -> Instrumented<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        Instrumented {
            labels: IndexLabels {
                collection: inner.name().to_string(),
            },
            inner,
            metrics: self.clone(),
        }
    }
}

impl<T> Instrumented<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    fn observe_size(&self) {
        self.metrics
            .index_size
            .get_or_create(&self.labels)
            .set(self.inner.len() as i64);
    }
}

impl<T> IndexNamespacedResource<T> for Instrumented<T>
where
    StoreWriter<T>: IndexNamespacedResource<T>,
    T: Clone + Send + Sync + 'static,
{
    fn apply(&mut self, resource: T) {
        self.metrics.index_applies.get_or_create(&self.labels).inc();
        IndexNamespacedResource::apply(&mut self.inner, resource);
        self.observe_size();
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.metrics.index_deletes.get_or_create(&self.labels).inc();
        IndexNamespacedResource::delete(&mut self.inner, namespace, name);
        self.observe_size();
    }

    fn reset(&mut self, resources: Vec<T>, removed: NamespacedRemoved) {
        self.metrics.index_resets.get_or_create(&self.labels).inc();
        IndexNamespacedResource::reset(&mut self.inner, resources, removed);
        self.observe_size();
    }
}

impl<T> IndexClusterResource<T> for Instrumented<T>
where
    StoreWriter<T>: IndexClusterResource<T>,
    T: Clone + Send + Sync + 'static,
{
    fn apply(&mut self, resource: T) {
        self.metrics.index_applies.get_or_create(&self.labels).inc();
        IndexClusterResource::apply(&mut self.inner, resource);
        self.observe_size();
    }

    fn delete(&mut self, name: String) {
        self.metrics.index_deletes.get_or_create(&self.labels).inc();
        IndexClusterResource::delete(&mut self.inner, name);
        self.observe_size();
    }

    fn reset(&mut self, resources: Vec<T>, removed: ClusterRemoved) {
        self.metrics.index_resets.get_or_create(&self.labels).inc();
        IndexClusterResource::reset(&mut self.inner, resources, removed);
        self.observe_size();
    }
}
