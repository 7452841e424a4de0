//! Collections fed from resource watches.

use crate::collection::{next_epoch, Collection, Items, Source, Upstream};
use ahash::AHashMap as HashMap;
use gateway_controller_core::{Keyed, ObjectSource};
use kube::Resource;
use kubert::index::{
    ClusterRemoved, IndexClusterResource, IndexNamespacedResource, NamespacedRemoved,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// Writes to a store-backed [`Collection`].
///
/// The writer implements kubert's index traits so that it can be driven directly by a watch. The
/// collection is considered synced once the writer has observed its first reset, i.e. once the
/// watch's initial list has been applied.
pub struct StoreWriter<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    name: String,
    state: RwLock<State<T>>,
    tx: watch::Sender<u64>,
}

struct State<T> {
    items: Items<T>,
    synced: bool,
    epoch: u64,
}

/// Creates an empty, unsynced store.
pub fn store<T>(name: impl Into<String>) -> (StoreWriter<T>, Collection<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (tx, _) = watch::channel(0);
    let shared = Arc::new(Shared {
        name: name.into(),
        state: RwLock::new(State {
            items: Default::default(),
            synced: false,
            epoch: next_epoch(),
        }),
        tx,
    });
    let collection = Collection::from_source(shared.clone());
    (StoreWriter { shared }, collection)
}

/// Returns the identity of a Kubernetes resource.
pub fn object_source<T>(obj: &T) -> ObjectSource
where
    T: Resource<DynamicType = ()>,
{
    ObjectSource {
        group: T::group(&()).to_string(),
        kind: T::kind(&()).to_string(),
        namespace: obj.meta().namespace.clone().unwrap_or_default(),
        name: obj.meta().name.clone().unwrap_or_default(),
    }
}

fn resource_key<T>(namespace: String, name: String) -> ObjectSource
where
    T: Resource<DynamicType = ()>,
{
    ObjectSource {
        group: T::group(&()).to_string(),
        kind: T::kind(&()).to_string(),
        namespace,
        name,
    }
}

// === impl StoreWriter ===

impl<T> StoreWriter<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn has_synced(&self) -> bool {
        self.shared.state.read().synced
    }

    pub fn len(&self) -> usize {
        self.shared.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the store as synced without changing its contents.
    pub fn mark_synced(&mut self) {
        self.update(|state| {
            let changed = !state.synced;
            state.synced = true;
            changed
        });
    }

    pub fn insert_keyed(&mut self, key: ObjectSource, item: T) {
        self.update(|state| {
            Arc::make_mut(&mut state.items).insert(key, item);
            true
        });
    }

    pub fn remove(&mut self, key: &ObjectSource) {
        self.update(|state| Arc::make_mut(&mut state.items).remove(key).is_some());
    }

    /// Replaces the store's contents and marks it synced.
    pub fn reset_keyed(&mut self, items: impl IntoIterator<Item = (ObjectSource, T)>) {
        let items = Arc::new(items.into_iter().collect::<HashMap<_, _>>());
        self.update(move |state| {
            state.items = items;
            state.synced = true;
            true
        });
    }

    fn update(&mut self, f: impl FnOnce(&mut State<T>) -> bool) {
        let epoch = {
            let mut state = self.shared.state.write();
            if !f(&mut state) {
                return;
            }
            state.epoch = next_epoch();
            state.epoch
        };
        tracing::trace!(store = %self.shared.name, epoch, "Updated");
        self.shared.tx.send_replace(epoch);
    }
}

impl<T> StoreWriter<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    pub fn insert(&mut self, item: T) {
        self.insert_keyed(item.key(), item);
    }

    pub fn reset_items(&mut self, items: impl IntoIterator<Item = T>) {
        self.reset_keyed(items.into_iter().map(|i| (i.key(), i)));
    }
}

impl<T> IndexNamespacedResource<T> for StoreWriter<T>
where
    T: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    fn apply(&mut self, resource: T) {
        self.insert_keyed(object_source(&resource), resource);
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.remove(&resource_key::<T>(namespace, name));
    }

    fn reset(&mut self, resources: Vec<T>, _removed: NamespacedRemoved) {
        self.reset_keyed(resources.into_iter().map(|r| (object_source(&r), r)));
    }
}

impl<T> IndexClusterResource<T> for StoreWriter<T>
where
    T: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    fn apply(&mut self, resource: T) {
        let key = object_source(&resource);
        self.insert_keyed(key, resource);
    }

    fn delete(&mut self, name: String) {
        self.remove(&resource_key::<T>(String::new(), name));
    }

    fn reset(&mut self, resources: Vec<T>, _removed: ClusterRemoved) {
        self.reset_keyed(resources.into_iter().map(|r| (object_source(&r), r)));
    }
}

// === impl Shared ===

impl<T: Send + Sync + 'static> Upstream for Shared<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_synced(&self) -> bool {
        self.state.read().synced
    }

    fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    fn changes(&self) -> Vec<watch::Receiver<u64>> {
        vec![self.tx.subscribe()]
    }
}

impl<T: Send + Sync + 'static> Source<T> for Shared<T> {
    fn items(&self) -> Items<T> {
        self.state.read().items.clone()
    }
}
