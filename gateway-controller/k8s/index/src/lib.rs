//! Gateway Controller Index
//!
//! The index watches cluster resources and derives the configuration graph used to program a
//! gateway's data plane:
//!
//! - A discovery filter, computed from namespace label selectors, hides every object in an
//!   undiscovered namespace.
//! - `ReferenceGrant`s authorize references across namespaces. Secret and backend lookups consult
//!   them.
//! - Plugins contribute backend kinds, endpoints, and policies. Policies are indexed by the objects
//!   they target.
//! - `HTTPRoute`, `GRPCRoute`, `TCPRoute`, and `TLSRoute` objects are unified into a route IR with
//!   their backends resolved and policies attached.
//! - `Gateway`s, with their listener sets, are projected once for provisioning and once for
//!   programming Envoy.
//!
//! ```text
//! [ Namespace ] -> [ DiscoveryFilter ] -> [ every namespaced watch ]
//! [ ReferenceGrant ] -> [ Secrets ], [ Backends ] -> [ Routes ] <- [ Policies ]
//! [ GatewayClass ] -> [ Gateways ] <- [ ListenerSets ]
//! ```
//!
//! Every index is a [`Collection`]: a keyed set that is either fed from a watch or derived from
//! other collections. [`CommonCollections`] owns the graph and gates readiness.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backends;
mod client;
mod collection;
mod common;
pub mod discovery;
pub mod endpoints;
pub mod extensions;
pub mod gateways;
pub mod metrics;
pub mod namespaces;
pub mod plugin;
pub mod pods;
pub mod policies;
pub mod ref_grants;
pub mod routes;
pub mod secrets;
pub mod store;

#[cfg(test)]
mod tests;

pub use self::{
    client::{Client, Watched},
    collection::{Collection, Dependency, Items},
    common::{CommonCollections, Error, Options},
    discovery::DiscoveryFilter,
    plugin::Plugin,
};
