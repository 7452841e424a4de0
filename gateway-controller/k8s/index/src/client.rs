use crate::{collection::Collection, discovery::DiscoveryFilter};
use kube::Resource;
use serde::de::DeserializeOwned;
use std::fmt;

/// Resources that may be watched into a [`Collection`].
pub trait Watched:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
}

impl<T> Watched for T where
    T: Resource<DynamicType = ()> + Clone + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
}

/// Registers resource watches.
///
/// Implementations start a watch for each registration and feed it into a store-backed
/// collection. The returned collection becomes synced once the watch's initial list completes.
pub trait Client {
    /// Installs the discovery filter applied by [`Client::watch`].
    fn set_object_filter(&mut self, filter: DiscoveryFilter);

    fn object_filter(&self) -> Option<&DiscoveryFilter>;

    /// Watches a namespaced resource kind in every namespace, ignoring the object filter.
    fn watch_unfiltered<T: Watched>(&mut self, name: &str) -> Collection<T>;

    /// Watches a cluster-scoped resource kind.
    fn watch_cluster<T: Watched>(&mut self, name: &str) -> Collection<T>;

    /// Watches a namespaced resource kind, hiding objects in undiscovered namespaces.
    fn watch<T: Watched>(&mut self, name: &str) -> Collection<T> {
        let raw = self.watch_unfiltered::<T>(name);
        match self.object_filter() {
            Some(filter) => filter.apply(raw),
            None => raw,
        }
    }
}
