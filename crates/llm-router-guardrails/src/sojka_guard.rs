//! Sójka safety classifier

use crate::client::GuardrailClient;
use crate::config::GuardrailConfig;
use async_trait::async_trait;
use llm_router_core::{Error, GateStage, GateVerdict, Payload, Result};
use tracing::info;

/// Path appended to the configured host
pub const SOJKA_ENDPOINT_PATH: &str = "api/guardrails/sojka_guard";

/// Gate stage backed by the Sójka guardrail service
#[derive(Debug, Clone)]
pub struct SojkaGuard {
    client: GuardrailClient,
}

impl SojkaGuard {
    /// Stage identifier used in pipeline configuration
    pub const NAME: &'static str = "sojka_guard";

    /// Create the stage; fails if no host is configured
    pub fn new(config: &GuardrailConfig) -> Result<Self> {
        if !config.has_host() {
            return Err(Error::config(
                "sojka_guard requires a host: set guardrails.sojka_guard.host \
                 or LLM_ROUTER_GUARDRAIL_SOJKA_GUARD_HOST_EP",
            ));
        }

        let client = GuardrailClient::new(Self::endpoint_for(&config.host), config.timeout())?;
        info!(endpoint = client.endpoint(), "sojka_guard ready");

        Ok(Self { client })
    }

    /// Endpoint URL for a configured host
    pub fn endpoint_for(host: &str) -> String {
        format!("{}/{}", host.trim().trim_end_matches('/'), SOJKA_ENDPOINT_PATH)
    }

    /// The URL payloads are sent to
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

#[async_trait]
impl GateStage for SojkaGuard {
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
    fn test_endpoint_joins_path() {
        assert_eq!(
            SojkaGuard::endpoint_for("http://sojka:8000/"),
            "http://sojka:8000/api/guardrails/sojka_guard"
        );
        assert_eq!(
            SojkaGuard::endpoint_for("http://sojka:8000"),
            "http://sojka:8000/api/guardrails/sojka_guard"
        );
    }

    #[test]
    fn test_empty_host_fails() {
        let err = SojkaGuard::new(&GuardrailConfig::new("")).unwrap_err();
        assert!(err.is_config());
    }
}
