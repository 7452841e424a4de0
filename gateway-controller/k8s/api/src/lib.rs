#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gateway_extension;
pub mod labels;
pub mod listener_set;
pub mod route;

pub use self::{
    gateway_extension::{GatewayExtension, GatewayExtensionSpec},
    labels::{Labels, Selector},
    listener_set::{ListenerSet, ListenerSetSpec},
};
pub use gateway_api::apis::experimental as gateway;
pub use gateway_controller_core::GATEWAY_GROUP;
pub use k8s_openapi::{
    api::core::v1::{ConfigMap, Namespace, Node, Pod, PodSpec, PodStatus, Secret, Service},
    apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString},
    ByteString,
};
pub use kube::{core::ObjectMeta, Resource, ResourceExt};
