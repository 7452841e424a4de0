use crate::{collection::Collection, store::object_source};
use gateway_controller_core::{Keyed, ObjectSource};
use gateway_controller_k8s_api::{
    gateway_extension::ExtensionType, GatewayExtension, GatewayExtensionSpec,
};

/// A gateway extension, with its gRPC service resolved to an object reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayExtensionIr {
    pub source: ObjectSource,
    pub extension_type: ExtensionType,
    pub service: Option<ObjectSource>,
    pub port: Option<u16>,
    pub authority: Option<String>,
    pub spec: GatewayExtensionSpec,
}

impl Keyed for GatewayExtensionIr {
    fn key(&self) -> ObjectSource {
        self.source.clone()
    }
}

pub fn gateway_extensions(exts: &Collection<GatewayExtension>) -> Collection<GatewayExtensionIr> {
    exts.map("GatewayExtensions", |ext: &GatewayExtension| {
        let source = object_source(ext);
        let grpc = ext.spec.grpc_service();
        let service = grpc.map(|g| {
            let namespace = g
                .backend_ref
                .namespace
                .clone()
                .unwrap_or_else(|| source.namespace.clone());
            ObjectSource {
                group: String::new(),
                kind: "Service".to_string(),
                namespace,
                name: g.backend_ref.name.clone(),
            }
        });
        Some(GatewayExtensionIr {
            extension_type: ext.spec.extension_type,
            service,
            port: grpc
                .and_then(|g| g.backend_ref.port)
                .and_then(|p| u16::try_from(p).ok()),
            authority: grpc.and_then(|g| g.authority.clone()),
            spec: ext.spec.clone(),
            source,
        })
    })
}
