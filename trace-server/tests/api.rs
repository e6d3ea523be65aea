use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures::stream;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use trace_adapters::embeddings::EmbeddingAdapter;
use trace_adapters::traits::{
    AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest, ModelAdapter,
};
use trace_graph::InMemoryGraphStore;
use trace_orchestrator::DecisionOrchestrator;
use trace_policy::KnowledgeBase;
use trace_server::{AppState, router};

const APPROVE: &str = "DECISION: APPROVE\nCONFIDENCE: 0.8\nREASONING: Outage confirmed by ticket.\n\
                       POLICIES: Service Outage Compensation Policy\nPRECEDENTS: No";

struct CannedModel {
    metadata: AdapterMetadata,
}

#[async_trait]
impl ModelAdapter for CannedModel {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, _request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let chunk = InferenceChunk::new(APPROVE, true);
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }
}

/// Maps every text onto the same direction.
struct ConstantEmbedder {
    metadata: AdapterMetadata,
}

#[async_trait]
impl EmbeddingAdapter for ConstantEmbedder {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn embed(&self, _text: &str) -> AdapterResult<Vec<f32>> {
        Ok(vec![0.6, 0.8, 0.0])
    }
}

async fn app() -> (Router, InMemoryGraphStore) {
    let store = InMemoryGraphStore::new();
    KnowledgeBase::builtin()
        .unwrap()
        .load_into(&store)
        .await
        .unwrap();
    let orchestrator = DecisionOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(CannedModel {
            metadata: AdapterMetadata::new("test", "canned"),
        }),
        Arc::new(ConstantEmbedder {
            metadata: AdapterMetadata::new("test", "constant"),
        }),
    );
    (router(AppState::new(orchestrator)), store)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_and_health_report_status() {
    let (app, _) = app().await;

    let (status, body) = call(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "Context Graph API");

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn decide_returns_outcome_and_records_trace() {
    let (app, _) = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/decide",
        Some(json!({
            "request": "Customer wants a refund after the outage",
            "evidence": [
                "Ticket #4521 confirms downtime",
                { "id": "ticket-4521", "type": "support_ticket", "issue": "API down" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["decision"], "APPROVE");
    assert_eq!(body["confidence"], 0.8);
    assert_eq!(body["used_precedents"], false);
    assert_eq!(body["precedents_found"], 0);
    assert!(body["policies_considered"].as_u64().unwrap() > 0);
    assert!(body.get("llm_response").is_none());

    let id = body["decision_id"].as_str().unwrap().to_owned();
    let (status, trace) = call(&app, Method::GET, &format!("/decisions/{id}/trace"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trace["decision"]["id"], id.as_str());
    assert_eq!(trace["actors"][0]["id"], "api_user");
    assert_eq!(trace["evidence"].as_array().unwrap().len(), 2);
    assert_eq!(trace["policies_followed"][0]["id"], "policy-outage-compensation");
    assert!(trace["decision"].get("embedding").is_none());

    let (_, second) = call(
        &app,
        Method::POST,
        "/decide",
        Some(json!({ "request": "Another outage refund", "actor": "agent-7" })),
    )
    .await;
    assert_eq!(second["precedents_found"], 1);
    assert_eq!(second["precedents_details"][0]["id"], id.as_str());
}

#[tokio::test]
async fn blank_requests_are_rejected() {
    let (app, _) = app().await;
    let (status, body) = call(&app, Method::POST, "/decide", Some(json!({ "request": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn decisions_can_be_written_and_read_back() {
    let (app, _) = app().await;

    let (status, _) = call(&app, Method::GET, "/decisions/dec-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/decisions",
        Some(json!({
            "id": "dec-manual",
            "payload": { "response": "DENY", "confidence": 0.4, "reviewer": null }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "id": "dec-manual" }));

    let (status, body) = call(&app, Method::GET, "/decisions/dec-manual", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "dec-manual");
    assert_eq!(body["response"], "DENY");
    assert!(body.get("reviewer").is_none());

    let (status, body) = call(&app, Method::GET, "/decisions/dec-manual?database=sandbox", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Decision not found");
}

#[tokio::test]
async fn approvals_attach_to_existing_decisions() {
    let (app, store) = app().await;
    call(
        &app,
        Method::POST,
        "/decisions",
        Some(json!({ "id": "dec-approve-me", "payload": { "response": "ESCALATE" } })),
    )
    .await;
    let edges_before = store.edge_count().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/decisions/dec-approve-me/approvals",
        Some(json!({ "approver": "jane.doe", "role": "manager" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["approval_id"].as_str().unwrap().starts_with("appr-"));
    assert_eq!(store.edge_count().await, edges_before + 1);

    let (_, trace) = call(&app, Method::GET, "/decisions/dec-approve-me/trace", None).await;
    assert_eq!(trace["approvals"][0]["approver"], "jane.doe");
    assert_eq!(trace["approvals"][0]["role"], "manager");

    let (status, _) = call(
        &app,
        Method::POST,
        "/decisions/dec-unknown/approvals",
        Some(json!({ "approver": "jane.doe" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn policies_are_selected_by_tags_or_category() {
    let (app, _) = app().await;

    let (status, body) = call(&app, Method::GET, "/policies?tags=sla,%20outage", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["policies"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|policy| policy["id"].as_str())
        .collect();
    assert!(ids.contains(&"policy-outage-compensation"));
    assert_eq!(body["count"], ids.len());

    let (status, body) = call(&app, Method::GET, "/policies?category=Refunds", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = call(&app, Method::GET, "/policies", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("tags"));
}

async fn raw_post(app: &Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_bodies_are_json_bad_requests() {
    let (app, store) = app().await;
    let nodes_before = store.node_count().await;

    for body in ["{}", "{not json", r#"{"request": 5}"#] {
        let (status, response) = raw_post(&app, "/decide", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["detail"].is_string(), "{body}: {response}");
    }

    let (status, response) = raw_post(&app, "/decisions", r#"{"id": "dec-1"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["detail"].as_str().unwrap().contains("payload"));

    let (status, response) = raw_post(&app, "/decisions/dec-1/approvals", "[]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["detail"].is_string());

    assert_eq!(store.node_count().await, nodes_before);
}

#[tokio::test]
async fn invalid_evidence_ids_write_nothing() {
    let (app, store) = app().await;
    let nodes_before = store.node_count().await;
    let edges_before = store.edge_count().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/decide",
        Some(json!({
            "request": "Refund after outage",
            "evidence": [{ "id": " padded-id", "type": "ticket" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("padded-id"));
    assert_eq!(store.node_count().await, nodes_before);
    assert_eq!(store.edge_count().await, edges_before);
}
