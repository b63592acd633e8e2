//! LLM Router Plugins
//!
//! Configuration and assembly layer: reads the plugin configuration,
//! resolves stage identifiers through the registry and builds the masking
//! pipeline plus the request and response guardrail pipelines.

pub mod config;
pub mod registry;

pub use config::{GuardrailsConfig, PluginsConfig};
pub use registry::{PluginRegistry, StageKind};

pub use llm_router_core::{GateOutcome, GatePipeline, Payload, TransformPipeline};
pub use llm_router_guardrails::{GuardrailConfig, NaskGuard, SojkaGuard};
pub use llm_router_maskers::{FastMasker, FastMaskerConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PluginsConfig;
    pub use crate::registry::{PluginRegistry, StageKind};
    pub use llm_router_core::prelude::*;
}
