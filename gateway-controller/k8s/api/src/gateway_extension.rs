use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures an external service that gateways may call out to.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "GatewayExtension",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayExtensionSpec {
    #[serde(rename = "type")]
    pub extension_type: ExtensionType,
    pub ext_auth: Option<ExtensionProvider>,
    pub ext_proc: Option<ExtensionProvider>,
    pub rate_limit: Option<RateLimitProvider>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ExtensionType {
    Extauth,
    ExtProc,
    RateLimit,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionProvider {
    pub grpc_service: GrpcService,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitProvider {
    pub grpc_service: GrpcService,
    pub domain: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcService {
    pub backend_ref: ServiceReference,
    pub authority: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    pub name: String,
    pub namespace: Option<String>,
    pub port: Option<i32>,
}

impl GatewayExtensionSpec {
    /// The gRPC service configured for the declared extension type, if any.
    pub fn grpc_service(&self) -> Option<&GrpcService> {
        match self.extension_type {
            ExtensionType::Extauth => self.ext_auth.as_ref().map(|p| &p.grpc_service),
            ExtensionType::ExtProc => self.ext_proc.as_ref().map(|p| &p.grpc_service),
            ExtensionType::RateLimit => self.rate_limit.as_ref().map(|p| &p.grpc_service),
        }
    }
}
