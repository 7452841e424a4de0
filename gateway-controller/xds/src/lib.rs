//! Assembles minimal Envoy bootstrap documents for offline validation.
//!
//! Configuration fragments are produced independently of one another: filter configurations,
//! routes, route tables, clusters, and listeners. [`ConfigBuilder`] accumulates them and renders
//! a [`Bootstrap`] that an external Envoy can load in validation mode.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod builder;
pub mod model;

pub use self::{
    builder::{ConfigBuilder, Error},
    model::{
        Bootstrap, Cluster, Filter, FilterChain, HttpConnectionManager, Listener, Route,
        RouteConfiguration, TypedConfig, VirtualHost, HTTP_CONNECTION_MANAGER,
    },
};
