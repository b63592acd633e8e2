//! Transform and gate pipelines
//!
//! Both pipelines run their stages strictly in the configured order.
//!
//! - A [`TransformPipeline`] folds the payload through every stage. A stage
//!   that fails is logged and skipped, so the call always yields a payload
//!   (fail-open).
//! - A [`GatePipeline`] asks every stage for a verdict and stops at the first
//!   unsafe one. Errors and timeouts count as unsafe (fail-closed).

use crate::payload::Payload;
use crate::stage::{GateStage, TransformStage};
use crate::Error;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Default bound on a single gate stage
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Terminal state of a gate pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Every stage reported safe
    Accepted,

    /// A stage reported unsafe, failed or timed out
    Rejected {
        /// Name of the rejecting stage
        stage: String,
        /// Detail reported by the stage (opaque when the stage failed)
        detail: Value,
    },
}

impl GateOutcome {
    /// Check if the payload was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Detail of the rejection, if any
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::Accepted => None,
            Self::Rejected { detail, .. } => Some(detail),
        }
    }
}

/// Ordered list of masking stages
#[derive(Clone)]
pub struct TransformPipeline {
    name: String,
    stages: Vec<Arc<dyn TransformStage>>,
}

impl TransformPipeline {
    /// Create a new empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn add_stage(mut self, stage: Arc<dyn TransformStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Pipeline name used in logs and metrics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order.
    ///
    /// The result is the payload as of the last stage that succeeded.
    pub async fn apply(&self, payload: Payload) -> Payload {
        let start = Instant::now();
        let mut current = payload;

        for stage in &self.stages {
            match stage.apply(&current).await {
                Ok(next) => {
                    debug!(pipeline = %self.name, stage = stage.name(), "transform stage applied");
                    current = next;
                }
                Err(e) => {
                    warn!(
                        pipeline = %self.name,
                        stage = stage.name(),
                        error = %e,
                        "transform stage failed, passing payload through"
                    );
                    metrics::counter!(
                        "llm_router_stage_failures_total",
                        "pipeline" => self.name.clone(),
                        "stage" => stage.name().to_string()
                    )
                    .increment(1);
                }
            }
        }

        metrics::histogram!("llm_router_pipeline_latency_us", "pipeline" => self.name.clone())
            .record(start.elapsed().as_micros() as f64);

        current
    }
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Ordered list of guardrail stages
#[derive(Clone)]
pub struct GatePipeline {
    name: String,
    stages: Vec<Arc<dyn GateStage>>,
    stage_timeout: Duration,
}

impl GatePipeline {
    /// Create a new empty pipeline with the default stage timeout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            stage_timeout: DEFAULT_GATE_TIMEOUT,
        }
    }

    /// Bound every stage invocation by `timeout`
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Append a stage
    pub fn add_stage(mut self, stage: Arc<dyn GateStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Pipeline name used in logs and metrics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-stage timeout
    pub fn stage_timeout(&self) -> Duration {
        self.stage_timeout
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Evaluate stages left to right, stopping at the first rejection
    pub async fn evaluate(&self, payload: &Payload) -> GateOutcome {
        let start = Instant::now();
        let outcome = self.run(payload).await;

        let decision = if outcome.is_accepted() { "accepted" } else { "rejected" };
        metrics::counter!(
            "llm_router_gate_decisions_total",
            "pipeline" => self.name.clone(),
            "decision" => decision
        )
        .increment(1);
        metrics::histogram!("llm_router_pipeline_latency_us", "pipeline" => self.name.clone())
            .record(start.elapsed().as_micros() as f64);

        outcome
    }

    async fn run(&self, payload: &Payload) -> GateOutcome {
        for stage in &self.stages {
            let result = tokio::time::timeout(self.stage_timeout, stage.check(payload))
                .await
                .unwrap_or(Err(Error::Timeout));

            match result {
                Ok(verdict) if verdict.safe => {
                    debug!(pipeline = %self.name, stage = stage.name(), "gate stage passed");
                }
                Ok(verdict) => {
                    debug!(pipeline = %self.name, stage = stage.name(), "gate stage rejected payload");
                    return GateOutcome::Rejected {
                        stage: stage.name().to_string(),
                        detail: verdict.detail,
                    };
                }
                Err(e) => {
                    error!(
                        pipeline = %self.name,
                        stage = stage.name(),
                        error = %e,
                        "gate stage failed, rejecting payload"
                    );
                    metrics::counter!(
                        "llm_router_stage_failures_total",
                        "pipeline" => self.name.clone(),
                        "stage" => stage.name().to_string()
                    )
                    .increment(1);
                    return GateOutcome::Rejected {
                        stage: stage.name().to_string(),
                        detail: unavailable_detail(),
                    };
                }
            }
        }

        GateOutcome::Accepted
    }
}

impl fmt::Debug for GatePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}

/// Detail reported when a stage could not produce a verdict
pub fn unavailable_detail() -> Value {
    json!({ "reason": "guardrail_unavailable" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::GateVerdict;
    use crate::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct Suffix(&'static str);

    #[async_trait]
    impl TransformStage for Suffix {
        async fn apply(&self, payload: &Payload) -> Result<Payload> {
            Ok(payload.map_text(crate::TextScope::MessageContents, |s| {
                format!("{}{}", s, self.0)
            }))
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Fixed(bool);

    #[async_trait]
    impl GateStage for Fixed {
        async fn check(&self, _payload: &Payload) -> Result<GateVerdict> {
            if self.0 {
                Ok(GateVerdict::safe())
            } else {
                Ok(GateVerdict::unsafe_with(json!({"why": "fixed"})))
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn payload() -> Payload {
        Payload::from_messages(vec![crate::ChatMessage::user("x")])
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let pipeline = TransformPipeline::new("masking")
            .add_stage(Arc::new(Suffix("a")))
            .add_stage(Arc::new(Suffix("b")));

        let out = pipeline.apply(payload()).await;
        assert_eq!(out.messages()[0].content, "xab");
        assert_eq!(pipeline.stage_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_transform_is_identity() {
        let pipeline = TransformPipeline::new("masking");
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.apply(payload()).await, payload());
    }

    #[tokio::test]
    async fn test_empty_gate_accepts() {
        let pipeline = GatePipeline::new("request");
        assert_eq!(pipeline.evaluate(&payload()).await, GateOutcome::Accepted);
    }

    #[tokio::test]
    async fn test_gate_rejection_carries_detail() {
        let pipeline = GatePipeline::new("request")
            .add_stage(Arc::new(Fixed(true)))
            .add_stage(Arc::new(Fixed(false)));

        let outcome = pipeline.evaluate(&payload()).await;
        assert_eq!(outcome.detail(), Some(&json!({"why": "fixed"})));
        assert!(!outcome.is_accepted());
    }
}
