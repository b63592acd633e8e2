//! Plugin registry and pipeline assembly
//!
//! Stage identifiers resolve to a closed set of [`StageKind`]s. Instances are
//! created on first use and kept in a per-registry session cache, so every
//! pipeline built from the same registry shares them.

use crate::config::PluginsConfig;
use llm_router_core::{
    Capability, Error, GatePipeline, GateStage, Result, TransformPipeline, TransformStage,
};
use llm_router_guardrails::{NaskGuard, SojkaGuard};
use llm_router_maskers::FastMasker;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Every stage the registry can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Rule-based PII masker (`fast_masker`)
    FastMasker,
    /// NASK remote safety check (`nask_guard`)
    NaskGuard,
    /// Sójka remote safety check (`sojka_guard`)
    SojkaGuard,
}

impl StageKind {
    /// All kinds, in registration order
    pub const ALL: [StageKind; 3] = [Self::FastMasker, Self::NaskGuard, Self::SojkaGuard];

    /// Identifier used in configuration
    pub fn id(&self) -> &'static str {
        match self {
            Self::FastMasker => FastMasker::NAME,
            Self::NaskGuard => NaskGuard::NAME,
            Self::SojkaGuard => SojkaGuard::NAME,
        }
    }

    /// Whether the stage rewrites payloads or passes judgement on them
    pub fn capability(&self) -> Capability {
        match self {
            Self::FastMasker => Capability::Transform,
            Self::NaskGuard | Self::SojkaGuard => Capability::Gate,
        }
    }

    fn build(&self, config: &PluginsConfig) -> Result<StageInstance> {
        let instance = match self {
            Self::FastMasker => {
                StageInstance::Transform(Arc::new(FastMasker::from_config(&config.fast_masker)?))
            }
            Self::NaskGuard => {
                StageInstance::Gate(Arc::new(NaskGuard::new(&config.guardrails.nask_guard)?))
            }
            Self::SojkaGuard => {
                StageInstance::Gate(Arc::new(SojkaGuard::new(&config.guardrails.sojka_guard)?))
            }
        };
        Ok(instance)
    }
}

impl FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|k| k.id()).collect();
                Error::config(format!(
                    "Unknown plugin '{}'. Available plugins: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Clone)]
enum StageInstance {
    Transform(Arc<dyn TransformStage>),
    Gate(Arc<dyn GateStage>),
}

/// Builds and caches stages, and assembles pipelines from configuration
pub struct PluginRegistry {
    config: PluginsConfig,
    session: Mutex<HashMap<StageKind, StageInstance>>,
}

impl PluginRegistry {
    /// Create a registry; the configuration is validated first
    pub fn new(config: PluginsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session: Mutex::new(HashMap::new()),
        })
    }

    /// Load a YAML file, apply environment overrides and create the registry
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = PluginsConfig::from_file(path)?.with_env_overrides();
        Self::new(config)
    }

    /// The configuration this registry was built from
    pub fn config(&self) -> &PluginsConfig {
        &self.config
    }

    /// Get (building on first use) the transform stage named `id`
    pub fn transform_stage(&self, id: &str) -> Result<Arc<dyn TransformStage>> {
        match self.instance(id.parse()?)? {
            StageInstance::Transform(stage) => Ok(stage),
            StageInstance::Gate(_) => Err(wrong_capability(id, Capability::Transform)),
        }
    }

    /// Get (building on first use) the gate stage named `id`
    pub fn gate_stage(&self, id: &str) -> Result<Arc<dyn GateStage>> {
        match self.instance(id.parse()?)? {
            StageInstance::Gate(stage) => Ok(stage),
            StageInstance::Transform(_) => Err(wrong_capability(id, Capability::Gate)),
        }
    }

    fn instance(&self, kind: StageKind) -> Result<StageInstance> {
        let mut session = self.session.lock();
        if let Some(instance) = session.get(&kind) {
            return Ok(instance.clone());
        }

        let instance = kind.build(&self.config).map_err(|e| {
            if e.is_config() {
                e
            } else {
                Error::config(format!("Failed to construct plugin '{}': {}", kind, e))
            }
        })?;
        session.insert(kind, instance.clone());
        info!(plugin = %kind, capability = %kind.capability(), "Registered plugin");

        Ok(instance)
    }

    /// Assemble the masking pipeline
    pub fn build_masking_pipeline(&self) -> Result<TransformPipeline> {
        let mut pipeline = TransformPipeline::new("masking");
        for id in &self.config.masking_pipeline {
            pipeline = pipeline.add_stage(self.transform_stage(id)?);
        }

        info!(stages = ?pipeline.stage_names(), "Assembled masking pipeline");
        Ok(pipeline)
    }

    /// Assemble the request guardrail pipeline
    pub fn build_request_guardrails(&self) -> Result<GatePipeline> {
        self.build_gate_pipeline("request_guardrails", &self.config.request_guardrails)
    }

    /// Assemble the response guardrail pipeline
    pub fn build_response_guardrails(&self) -> Result<GatePipeline> {
        self.build_gate_pipeline("response_guardrails", &self.config.response_guardrails)
    }

    fn build_gate_pipeline(&self, name: &str, ids: &[String]) -> Result<GatePipeline> {
        let mut pipeline = GatePipeline::new(name).with_stage_timeout(self.config.gate_timeout());
        for id in ids {
            pipeline = pipeline.add_stage(self.gate_stage(id)?);
        }

        info!(
            pipeline = name,
            stages = ?pipeline.stage_names(),
            timeout_ms = self.config.gate_timeout_ms,
            "Assembled guardrail pipeline"
        );
        Ok(pipeline)
    }

    /// Identifiers of the stages instantiated so far
    pub fn registered(&self) -> Vec<&'static str> {
        let session = self.session.lock();
        StageKind::ALL
            .iter()
            .filter(|kind| session.contains_key(kind))
            .map(|kind| kind.id())
            .collect()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("config", &self.config)
            .field("registered", &self.registered())
            .finish()
    }
}

fn wrong_capability(id: &str, expected: Capability) -> Error {
    Error::config(format!("'{}' is not a {} stage", id, expected))
}
