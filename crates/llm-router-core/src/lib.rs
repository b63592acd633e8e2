//! LLM Router Core
//!
//! Types and traits shared by the masking and guardrail plugins.
//!
//! This crate provides:
//! - Error types and result handling
//! - The JSON payload model and its text-bearing field walker
//! - Stage traits for the two capabilities (transform and gate)
//! - Transform pipelines (fail-open) and gate pipelines (fail-closed, short-circuit)

pub mod error;
pub mod payload;
pub mod pipeline;
pub mod stage;

pub use error::{Error, Result};
pub use payload::{ChatMessage, Payload, TextScope};
pub use pipeline::{GateOutcome, GatePipeline, TransformPipeline};
pub use stage::{Capability, GateStage, GateVerdict, TransformStage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::payload::{ChatMessage, Payload, TextScope};
    pub use crate::pipeline::{GateOutcome, GatePipeline, TransformPipeline};
    pub use crate::stage::{Capability, GateStage, GateVerdict, TransformStage};
}
