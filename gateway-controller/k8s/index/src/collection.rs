//! Keyed, lazily-derived collections of cluster state.
//!
//! A [`Collection`] is a read handle over a keyed set of items. Collections are either backed by a
//! [`Store`](crate::store) that is fed from a watch, derived from other collections, or static.
//!
//! Every store write draws a fresh value from a process-wide epoch counter. A derived collection's
//! epoch is the sum of its dependencies' epochs, which changes whenever any dependency changes, so
//! derived items are recomputed lazily on the first read after an upstream write.

use ahash::AHashMap as HashMap;
use futures::prelude::*;
use gateway_controller_core::{Keyed, ObjectSource};
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub type Items<T> = Arc<HashMap<ObjectSource, T>>;

/// A type-erased handle on a collection, used to track what a derived collection depends on.
#[derive(Clone)]
pub struct Dependency(Arc<dyn Upstream>);

pub struct Collection<T> {
    inner: Arc<dyn Source<T>>,
}

/// The operations every collection supports, regardless of its item type.
pub(crate) trait Upstream: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn has_synced(&self) -> bool;

    fn epoch(&self) -> u64;

    /// Receivers that are notified whenever the collection's contents may have changed.
    fn changes(&self) -> Vec<watch::Receiver<u64>>;
}

pub(crate) trait Source<T>: Upstream {
    fn items(&self) -> Items<T>;
}

struct Derived<T> {
    name: String,
    deps: Vec<Dependency>,
    compute: Box<dyn Fn() -> HashMap<ObjectSource, T> + Send + Sync>,
    cache: Mutex<Option<(u64, Items<T>)>>,
}

struct Static<T> {
    name: String,
    items: Items<T>,
}

static EPOCH: AtomicU64 = AtomicU64::new(0);

/// Returns a value greater than any previously returned.
pub(crate) fn next_epoch() -> u64 {
    EPOCH.fetch_add(1, Ordering::Relaxed) + 1
}

// === impl Collection ===

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name())
            .field("synced", &self.inner.has_synced())
            .finish()
    }
}

impl<T> Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_source(source: Arc<dyn Source<T>>) -> Self {
        Self { inner: source }
    }

    /// Builds a collection whose items are computed from other collections.
    ///
    /// `compute` is invoked lazily, at most once per change to `deps`. The collection is synced
    /// once every dependency is synced.
    pub fn derive<F>(name: impl Into<String>, deps: Vec<Dependency>, compute: F) -> Self
    where
        F: Fn() -> HashMap<ObjectSource, T> + Send + Sync + 'static,
    {
        Self::from_source(Arc::new(Derived {
            name: name.into(),
            deps,
            compute: Box::new(compute),
            cache: Mutex::new(None),
        }))
    }

    /// Merges several collections of the same item type into one.
    ///
    /// When more than one member holds an item with the same key, the earliest member wins.
    pub fn join(name: impl Into<String>, members: Vec<Collection<T>>) -> Self {
        let deps = members.iter().map(Collection::dependency).collect();
        Self::derive(name, deps, move || {
            let mut items = HashMap::new();
            for member in &members {
                for (key, item) in member.snapshot().iter() {
                    items.entry(key.clone()).or_insert_with(|| item.clone());
                }
            }
            items
        })
    }

    /// A collection that holds no items and is always synced.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::from_source(Arc::new(Static {
            name: name.into(),
            items: Default::default(),
        }))
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn has_synced(&self) -> bool {
        self.inner.has_synced()
    }

    pub fn dependency(&self) -> Dependency {
        Dependency(Arc::new(self.clone()))
    }

    /// Returns a point-in-time view of every item.
    pub fn snapshot(&self) -> Items<T> {
        self.inner.items()
    }

    pub fn get(&self, key: &ObjectSource) -> Option<T> {
        self.snapshot().get(key).cloned()
    }

    /// Returns every item, ordered by key.
    pub fn list(&self) -> Vec<T> {
        let items = self.snapshot();
        let mut keys = items.keys().collect::<Vec<_>>();
        keys.sort();
        keys.into_iter()
            .filter_map(|k| items.get(k).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Builds a derived collection by transforming each item. Items mapped to `None` are dropped.
    pub fn map<U, F>(&self, name: impl Into<String>, f: F) -> Collection<U>
    where
        U: Keyed + Clone + Send + Sync + 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        let this = self.clone();
        Collection::derive(name, vec![self.dependency()], move || {
            this.snapshot()
                .values()
                .filter_map(&f)
                .map(|u| (u.key(), u))
                .collect()
        })
    }

    /// Builds a derived collection holding the items accepted by `f`.
    pub fn filter<F>(&self, name: impl Into<String>, deps: Vec<Dependency>, f: F) -> Self
    where
        F: Fn(&ObjectSource, &T) -> bool + Send + Sync + 'static,
    {
        let this = self.clone();
        let deps = Some(self.dependency()).into_iter().chain(deps).collect();
        Self::derive(name, deps, move || {
            this.snapshot()
                .iter()
                .filter(|(k, v)| f(k, v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// Returns a stream that yields whenever the collection's contents may have changed.
    ///
    /// Notifications are coalesced; consumers are expected to re-read the collection. The stream
    /// never ends, so a collection built only from static inputs yields nothing.
    pub fn updates(&self) -> impl Stream<Item = ()> + Send + Unpin + 'static {
        futures::stream::select_all(
            self.inner
                .changes()
                .into_iter()
                .map(|rx| WatchStream::from_changes(rx).map(|_| ())),
        )
        .chain(futures::stream::pending())
    }
}

impl<T> Collection<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    /// A fixed collection that is always synced.
    pub fn from_static(name: impl Into<String>, items: impl IntoIterator<Item = T>) -> Self {
        Self::from_source(Arc::new(Static {
            name: name.into(),
            items: Arc::new(items.into_iter().map(|i| (i.key(), i)).collect()),
        }))
    }
}

impl<T: Send + Sync + 'static> Upstream for Collection<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn has_synced(&self) -> bool {
        self.inner.has_synced()
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch()
    }

    fn changes(&self) -> Vec<watch::Receiver<u64>> {
        self.inner.changes()
    }
}

// === impl Dependency ===

impl Dependency {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn has_synced(&self) -> bool {
        self.0.has_synced()
    }

    fn epoch(&self) -> u64 {
        self.0.epoch()
    }

    fn changes(&self) -> Vec<watch::Receiver<u64>> {
        self.0.changes()
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dependency").field(&self.name()).finish()
    }
}

// === impl Derived ===

impl<T: Send + Sync + 'static> Upstream for Derived<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_synced(&self) -> bool {
        self.deps.iter().all(Dependency::has_synced)
    }

    fn epoch(&self) -> u64 {
        self.deps
            .iter()
            .fold(0u64, |sum, dep| sum.wrapping_add(dep.epoch()))
    }

    fn changes(&self) -> Vec<watch::Receiver<u64>> {
        self.deps.iter().flat_map(Dependency::changes).collect()
    }
}

impl<T: Send + Sync + 'static> Source<T> for Derived<T> {
    fn items(&self) -> Items<T> {
        let epoch = self.epoch();
        if let Some((cached, items)) = self.cache.lock().as_ref() {
            if *cached == epoch {
                return items.clone();
            }
        }

        // Computation may read other derived collections, so the cache lock is not held.
        let items = Arc::new((self.compute)());
        tracing::trace!(collection = %self.name, epoch, items = items.len(), "Recomputed");
        *self.cache.lock() = Some((epoch, items.clone()));
        items
    }
}

// === impl Static ===

impl<T: Send + Sync + 'static> Upstream for Static<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_synced(&self) -> bool {
        true
    }

    fn epoch(&self) -> u64 {
        0
    }

    fn changes(&self) -> Vec<watch::Receiver<u64>> {
        Vec::new()
    }
}

impl<T: Send + Sync + 'static> Source<T> for Static<T> {
    fn items(&self) -> Items<T> {
        self.items.clone()
    }
}
