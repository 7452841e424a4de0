/// Process-wide switches that shape the index graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Serialized Kubernetes label selectors. A namespace is discovered if it matches any of them.
    /// When empty, every namespace is discovered.
    pub discovery_namespace_selectors: String,

    /// Builds the policy, backend, endpoint, and route indices used to program Envoy.
    pub enable_envoy: bool,

    /// Watches experimental Gateway API kinds such as listener sets.
    pub enable_experimental_gateway_api_features: bool,
}

/// The controller names that may claim gateway classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerNames {
    /// The name claimed by the Envoy-programming controller.
    pub controller: String,

    /// The name claimed by the agent controller.
    pub agent_controller: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discovery_namespace_selectors: "[]".to_string(),
            enable_envoy: true,
            enable_experimental_gateway_api_features: false,
        }
    }
}

impl ControllerNames {
    pub fn contains(&self, name: &str) -> bool {
        self.controller == name || self.agent_controller == name
    }
}

impl Default for ControllerNames {
    fn default() -> Self {
        Self {
            controller: "kgateway.dev/kgateway".to_string(),
            agent_controller: "kgateway.dev/agentgateway".to_string(),
        }
    }
}
