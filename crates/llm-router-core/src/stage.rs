//! Stage traits and common types

use crate::payload::Payload;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stage that rewrites the payload (masking)
#[async_trait]
pub trait TransformStage: Send + Sync {
    /// Apply the stage, returning a new payload
    async fn apply(&self, payload: &Payload) -> Result<Payload>;

    /// Get the stage name
    fn name(&self) -> &str;
}

/// A stage that judges the payload (guardrail)
#[async_trait]
pub trait GateStage: Send + Sync {
    /// Check the payload
    async fn check(&self, payload: &Payload) -> Result<GateVerdict>;

    /// Get the stage name
    fn name(&self) -> &str;
}

/// Outcome of a single gate stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the payload may pass
    pub safe: bool,

    /// Opaque detail reported by the stage
    #[serde(default)]
    pub detail: Value,
}

impl GateVerdict {
    /// A passing verdict with an empty detail
    pub fn safe() -> Self {
        Self {
            safe: true,
            detail: Value::Object(Default::default()),
        }
    }

    /// A failing verdict carrying `detail`
    pub fn unsafe_with(detail: Value) -> Self {
        Self {
            safe: false,
            detail,
        }
    }
}

/// The two stage capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Payload to payload
    Transform,
    /// Payload to verdict
    Gate,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transform => write!(f, "transform"),
            Self::Gate => write!(f, "gate"),
        }
    }
}
