//! Plugin configuration
//!
//! Loaded once per process from YAML, optionally patched from the
//! environment, and validated before any pipeline is assembled.

use crate::registry::StageKind;
use llm_router_core::{Capability, Error, Result};
use llm_router_guardrails::GuardrailConfig;
use llm_router_maskers::{FastMaskerConfig, RULE_NAMES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Overrides `guardrails.nask_guard.host`
pub const ENV_NASK_GUARD_HOST: &str = "LLM_ROUTER_GUARDRAIL_NASK_GUARD_HOST_EP";

/// Overrides `guardrails.sojka_guard.host`
pub const ENV_SOJKA_GUARD_HOST: &str = "LLM_ROUTER_GUARDRAIL_SOJKA_GUARD_HOST_EP";

/// Overrides `fast_masker.enable_beta_rules`
pub const ENV_USE_BETA_FEATURES: &str = "LLM_ROUTER_USE_BETA_FEATURES";

/// Top-level plugin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Transform stage ids, applied in order
    #[serde(default)]
    pub masking_pipeline: Vec<String>,

    /// Gate stage ids run on requests
    #[serde(default)]
    pub request_guardrails: Vec<String>,

    /// Gate stage ids run on responses
    #[serde(default)]
    pub response_guardrails: Vec<String>,

    /// Upper bound on a single gate stage, in milliseconds
    #[serde(default = "default_gate_timeout_ms")]
    pub gate_timeout_ms: u64,

    /// FastMasker settings
    #[serde(default)]
    pub fast_masker: FastMaskerConfig,

    /// Remote guardrail services
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
}

/// Connection settings per remote guardrail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default)]
    pub nask_guard: GuardrailConfig,

    #[serde(default)]
    pub sojka_guard: GuardrailConfig,
}

fn default_gate_timeout_ms() -> u64 {
    10_000
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            masking_pipeline: Vec::new(),
            request_guardrails: Vec::new(),
            response_guardrails: Vec::new(),
            gate_timeout_ms: default_gate_timeout_ms(),
            fast_masker: FastMaskerConfig::default(),
            guardrails: GuardrailsConfig::default(),
        }
    }
}

impl PluginsConfig {
    /// Parse from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse plugins config: {}", e)))
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read plugins config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply the deployment environment variables on top of file values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_NASK_GUARD_HOST) {
            debug!(host = %host, "nask_guard host overridden from environment");
            self.guardrails.nask_guard.host = host;
        }
        if let Some(host) = lookup(ENV_SOJKA_GUARD_HOST) {
            debug!(host = %host, "sojka_guard host overridden from environment");
            self.guardrails.sojka_guard.host = host;
        }
        if let Some(flag) = lookup(ENV_USE_BETA_FEATURES) {
            self.fast_masker.enable_beta_rules = is_truthy(&flag);
        }
        self
    }

    /// Per-gate-stage bound
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }

    /// Reject configurations that cannot be assembled
    pub fn validate(&self) -> Result<()> {
        check_ids("masking_pipeline", &self.masking_pipeline, Capability::Transform)?;
        check_ids("request_guardrails", &self.request_guardrails, Capability::Gate)?;
        check_ids("response_guardrails", &self.response_guardrails, Capability::Gate)?;

        if self.gate_timeout_ms == 0 {
            return Err(Error::config("gate_timeout_ms must be greater than zero"));
        }

        if self.uses(StageKind::FastMasker) {
            self.fast_masker.validate()?;
        } else if let Some(unknown) = self
            .fast_masker
            .disabled_rules
            .iter()
            .find(|name| !RULE_NAMES.contains(&name.as_str()))
        {
            return Err(Error::config(format!("Unknown masking rule '{}'", unknown)));
        }

        Ok(())
    }

    /// Whether any pipeline lists `kind`
    pub fn uses(&self, kind: StageKind) -> bool {
        self.masking_pipeline
            .iter()
            .chain(&self.request_guardrails)
            .chain(&self.response_guardrails)
            .any(|id| id == kind.id())
    }
}

fn check_ids(list: &str, ids: &[String], expected: Capability) -> Result<()> {
    for id in ids {
        let kind: StageKind = id.parse()?;
        if kind.capability() != expected {
            return Err(Error::config(format!(
                "'{}' is a {} stage and cannot be used in {}",
                id,
                kind.capability(),
                list
            )));
        }
    }
    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
