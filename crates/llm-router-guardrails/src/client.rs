//! HTTP client shared by the remote guardrail stages
//!
//! The payload is POSTed as JSON and the service answers with
//! `{"results": {"safe": bool, "detailed": [...]}}`. A response without a
//! boolean `results.safe` is read as unsafe.

use llm_router_core::{Error, GateVerdict, Payload, Result};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// JSON client bound to one guardrail endpoint
#[derive(Debug, Clone)]
pub struct GuardrailClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GuardrailClient {
    /// Create a client for `endpoint`; every request is bounded by `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::config("guardrail endpoint must not be empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    /// The URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `payload` and read the verdict.
    ///
    /// Transport failures, non-2xx statuses and non-object bodies are errors.
    pub async fn check(&self, payload: &Payload) -> Result<GateVerdict> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .json(payload.as_value())
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "Guardrail request failed");
                Error::guardrail(format!("request to {} failed: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(endpoint = %self.endpoint, %status, "Guardrail returned an error status");
            return Err(Error::guardrail(format!(
                "{} returned HTTP {}",
                self.endpoint, status
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            Error::guardrail(format!("malformed response from {}: {}", self.endpoint, e))
        })?;

        let verdict = parse_verdict(body)?;

        metrics::histogram!("llm_router_guardrail_request_latency_us")
            .record(start.elapsed().as_micros() as f64);
        debug!(
            endpoint = %self.endpoint,
            safe = verdict.safe,
            latency_ms = start.elapsed().as_millis() as u64,
            "Guardrail responded"
        );

        Ok(verdict)
    }
}

/// Read a service response into a verdict whose detail is the whole body
pub fn parse_verdict(body: Value) -> Result<GateVerdict> {
    if !body.is_object() {
        return Err(Error::guardrail("guardrail response is not a JSON object"));
    }

    let safe = body
        .get("results")
        .and_then(|results| results.get("safe"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(GateVerdict { safe, detail: body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_safe() {
        let body = json!({"results": {"safe": true, "detailed": []}});
        let verdict = parse_verdict(body.clone()).unwrap();
        assert!(verdict.safe);
        assert_eq!(verdict.detail, body);
    }

    #[test]
    fn test_parse_missing_safe_is_unsafe() {
        assert!(!parse_verdict(json!({"results": {}})).unwrap().safe);
        assert!(!parse_verdict(json!({})).unwrap().safe);
        assert!(!parse_verdict(json!({"results": {"safe": "yes"}})).unwrap().safe);
    }

    #[test]
    fn test_parse_non_object_fails() {
        assert!(parse_verdict(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let err = GuardrailClient::new("  ", Duration::from_secs(1)).unwrap_err();
        assert!(err.is_config());
    }
}
