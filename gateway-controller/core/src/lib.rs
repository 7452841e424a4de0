//! Intermediate representations shared by the gateway controller's indices.
//!
//! Every derived entity is keyed by an [`ObjectSource`], the identity of the cluster object it was
//! derived from. The types in this crate are decoupled from the Kubernetes wire schema so that
//! plugins can contribute backends, policies, and endpoints without depending on the index.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod endpoints;
pub mod gateway;
mod object_source;
pub mod policy;
pub mod route;
pub mod secret;
mod settings;

pub use self::{
    object_source::{GroupKind, Keyed, ObjectSource},
    settings::{ControllerNames, Settings},
};

/// The API group of the Gateway API resources.
pub const GATEWAY_GROUP: &str = "gateway.networking.k8s.io";
