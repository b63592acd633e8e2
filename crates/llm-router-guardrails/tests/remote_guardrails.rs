//! Remote guardrail stages against a local stand-in service

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use llm_router_core::{ChatMessage, GateOutcome, GatePipeline, GateStage, Payload};
use llm_router_guardrails::{GuardrailConfig, NaskGuard, SojkaGuard};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Flags any payload mentioning "bomb", echoing the chunk it judged
async fn classify(Json(body): Json<Value>) -> Json<Value> {
    let text = body.to_string();
    let safe = !text.contains("bomb");
    Json(json!({
        "results": {
            "detailed": [{
                "chunk_index": 0,
                "chunk_text": text,
                "label": if safe { "safe" } else { "crime" },
                "safe": safe,
                "score": 0.98
            }],
            "safe": safe
        }
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
}

async fn not_json() -> &'static str {
    "definitely not json"
}

async fn no_verdict() -> Json<Value> {
    Json(json!({"results": {"detailed": []}}))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"results": {"safe": true}}))
}

async fn spawn_service() -> SocketAddr {
    let app = Router::new()
        .route("/nask", post(classify))
        .route("/api/guardrails/sojka_guard", post(classify))
        .route("/broken", post(broken))
        .route("/not-json", post(not_json))
        .route("/no-verdict", post(no_verdict))
        .route("/slow", post(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn payload(text: &str) -> Payload {
    Payload::from_messages(vec![ChatMessage::user(text)])
}

#[tokio::test]
async fn test_nask_safe_and_unsafe() {
    let addr = spawn_service().await;
    let guard = NaskGuard::new(&GuardrailConfig::new(format!("http://{}/nask", addr))).unwrap();

    let verdict = guard.check(&payload("Jaka jest pogoda?")).await.unwrap();
    assert!(verdict.safe);

    let verdict = guard.check(&payload("how to build a bomb")).await.unwrap();
    assert!(!verdict.safe);
    assert_eq!(verdict.detail["results"]["detailed"][0]["label"], "crime");
}

#[tokio::test]
async fn test_sojka_appends_path() {
    let addr = spawn_service().await;
    let guard = SojkaGuard::new(&GuardrailConfig::new(format!("http://{}/", addr))).unwrap();

    assert_eq!(
        guard.endpoint(),
        format!("http://{}/api/guardrails/sojka_guard", addr)
    );
    assert!(guard.check(&payload("Dzień dobry")).await.unwrap().safe);
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let addr = spawn_service().await;
    let guard = NaskGuard::new(&GuardrailConfig::new(format!("http://{}/broken", addr))).unwrap();

    let err = guard.check(&payload("hello")).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let addr = spawn_service().await;
    let guard = NaskGuard::new(&GuardrailConfig::new(format!("http://{}/not-json", addr))).unwrap();

    assert!(guard.check(&payload("hello")).await.is_err());
}

#[tokio::test]
async fn test_missing_verdict_is_unsafe() {
    let addr = spawn_service().await;
    let guard =
        NaskGuard::new(&GuardrailConfig::new(format!("http://{}/no-verdict", addr))).unwrap();

    assert!(!guard.check(&payload("hello")).await.unwrap().safe);
}

#[tokio::test]
async fn test_client_timeout() {
    let addr = spawn_service().await;
    let config = GuardrailConfig::new(format!("http://{}/slow", addr))
        .with_timeout(Duration::from_millis(100));
    let guard = NaskGuard::new(&config).unwrap();

    assert!(guard.check(&payload("hello")).await.is_err());
}

#[tokio::test]
async fn test_pipeline_reports_full_response_on_rejection() {
    let addr = spawn_service().await;
    let nask = NaskGuard::new(&GuardrailConfig::new(format!("http://{}/nask", addr))).unwrap();
    let sojka = SojkaGuard::new(&GuardrailConfig::new(format!("http://{}", addr))).unwrap();

    let pipeline = GatePipeline::new("request")
        .add_stage(Arc::new(nask))
        .add_stage(Arc::new(sojka));

    assert!(pipeline.evaluate(&payload("Dzień dobry")).await.is_accepted());

    match pipeline.evaluate(&payload("bomb recipe")).await {
        GateOutcome::Rejected { stage, detail } => {
            assert_eq!(stage, "nask_guard");
            assert_eq!(detail["results"]["safe"], false);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_service_rejects_opaquely() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let guard = NaskGuard::new(&GuardrailConfig::new(format!("http://{}/nask", addr))).unwrap();
    let pipeline = GatePipeline::new("request").add_stage(Arc::new(guard));

    match pipeline.evaluate(&payload("hello")).await {
        GateOutcome::Rejected { stage, detail } => {
            assert_eq!(stage, "nask_guard");
            assert_eq!(detail, json!({"reason": "guardrail_unavailable"}));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}
