//! NASK PL-Guard safety classifier
//!
//! The configured host is the full endpoint URL.

use crate::client::GuardrailClient;
use crate::config::GuardrailConfig;
use async_trait::async_trait;
use llm_router_core::{Error, GateStage, GateVerdict, Payload, Result};
use tracing::info;

/// Gate stage backed by the NASK guardrail service
#[derive(Debug, Clone)]
pub struct NaskGuard {
    client: GuardrailClient,
}

impl NaskGuard {
    /// Stage identifier used in pipeline configuration
    pub const NAME: &'static str = "nask_guard";

    /// Create the stage; fails if no host is configured
    pub fn new(config: &GuardrailConfig) -> Result<Self> {
        if !config.has_host() {
            return Err(Error::config(
                "nask_guard requires a host: set guardrails.nask_guard.host \
                 or LLM_ROUTER_GUARDRAIL_NASK_GUARD_HOST_EP",
            ));
        }

        let client = GuardrailClient::new(Self::endpoint_for(&config.host), config.timeout())?;
        info!(endpoint = client.endpoint(), "nask_guard ready");

        Ok(Self { client })
    }

    /// Endpoint URL for a configured host
    pub fn endpoint_for(host: &str) -> String {
        host.trim().to_string()
    }

    /// The URL payloads are sent to
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

#[async_trait]
impl GateStage for NaskGuard {
    async fn check(&self, payload: &Payload) -> Result<GateVerdict> {
        self.client.check(payload).await
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_host() {
        let guard = NaskGuard::new(&GuardrailConfig::new("http://nask:8000/api/guard")).unwrap();
        assert_eq!(guard.endpoint(), "http://nask:8000/api/guard");
        assert_eq!(guard.name(), "nask_guard");
    }

    #[test]
    fn test_empty_host_fails() {
        let err = NaskGuard::new(&GuardrailConfig::default()).unwrap_err();
        assert!(err.is_config());
    }
}
