//! REST routes.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use trace_graph::DecisionTrace;
use trace_orchestrator::{ApprovalRecord, DecisionOutcome, DecisionRequest, EvidenceItem};
use trace_primitives::{NodeId, NodeLabel, Properties, normalize_properties};
use trace_telemetry::{HealthStatus, ServiceInfo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Service name reported by the root endpoint.
pub const SERVICE_NAME: &str = "Context Graph API";

/// Actor recorded for API decisions that name none.
pub const API_ACTOR: &str = "api_user";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/decide", post(decide))
        .route("/decisions", post(upsert_decision))
        .route("/decisions/{id}", get(read_decision))
        .route("/decisions/{id}/trace", get(read_trace))
        .route("/decisions/{id}/approvals", post(approve_decision))
        .route("/policies", get(list_policies))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}

/// Body of `POST /decide`.
#[derive(Debug, Deserialize)]
pub struct DecideBody {
    /// The customer request.
    pub request: String,
    /// Optional supporting evidence.
    #[serde(default)]
    pub evidence: Option<Vec<EvidenceItem>>,
    /// Actor recorded as making the decision.
    #[serde(default)]
    pub actor: Option<String>,
    /// Target database.
    #[serde(default)]
    pub database: Option<String>,
}

/// Response of `POST /decide`.
#[derive(Debug, Serialize)]
pub struct DecideResponse {
    status: &'static str,
    decision_id: String,
    decision: String,
    confidence: f64,
    reasoning: String,
    policies_considered: usize,
    precedents_found: usize,
    used_precedents: bool,
    policies_details: Vec<Properties>,
    precedents_details: Vec<Properties>,
}

impl From<DecisionOutcome> for DecideResponse {
    fn from(outcome: DecisionOutcome) -> Self {
        Self {
            status: "ok",
            decision_id: outcome.decision_id.to_string(),
            decision: outcome.decision.to_string(),
            confidence: outcome.confidence,
            reasoning: outcome.reasoning,
            policies_considered: outcome.policies_considered,
            precedents_found: outcome.precedents_found,
            used_precedents: outcome.used_precedents,
            policies_details: outcome.policies_details,
            precedents_details: outcome.precedents_details,
        }
    }
}

async fn decide(
    State(state): State<AppState>,
    body: Result<Json<DecideBody>, JsonRejection>,
) -> ApiResult<Json<DecideResponse>> {
    let Json(body) = body?;
    let actor = body
        .actor
        .as_deref()
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .unwrap_or(API_ACTOR);

    let mut request = DecisionRequest::new(body.request).with_actor(NodeId::new(actor)?);
    request.evidence = body.evidence.unwrap_or_default();
    request.database = body.database;

    let outcome = state.orchestrator().decide(request).await?;
    info!(decision_id = %outcome.decision_id, verdict = %outcome.decision, "decision served");
    Ok(Json(outcome.into()))
}

/// Body of `POST /decisions`.
#[derive(Debug, Deserialize)]
pub struct DecisionIn {
    /// Decision identifier.
    pub id: String,
    /// Properties to merge into the decision.
    pub payload: Value,
    /// Target database.
    #[serde(default)]
    pub database: Option<String>,
}

async fn upsert_decision(
    State(state): State<AppState>,
    body: Result<Json<DecisionIn>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let id = NodeId::new(body.id)?;
    let props = normalize_properties(body.payload)?;
    let store = state.store(body.database.as_deref()).await?;
    store.upsert_node(NodeLabel::Decision, &id, props).await?;
    Ok(Json(json!({ "status": "ok", "id": id })))
}

/// Query string selecting a database.
#[derive(Debug, Default, Deserialize)]
pub struct DatabaseQuery {
    /// Target database.
    pub database: Option<String>,
}

async fn read_decision(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<DatabaseQuery>, QueryRejection>,
) -> ApiResult<Json<Properties>> {
    let (Path(id), Query(query)) = (id?, query?);
    let id = NodeId::new(id)?;
    let store = state.store(query.database.as_deref()).await?;
    store
        .get_node(NodeLabel::Decision, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Decision not found".into()))
}

async fn read_trace(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    query: Result<Query<DatabaseQuery>, QueryRejection>,
) -> ApiResult<Json<DecisionTrace>> {
    let (Path(id), Query(query)) = (id?, query?);
    let id = NodeId::new(id)?;
    let store = state.store(query.database.as_deref()).await?;
    store
        .decision_trace(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Decision not found".into()))
}

/// Body of `POST /decisions/{id}/approvals`.
#[derive(Debug, Deserialize)]
pub struct ApprovalBody {
    /// The approval itself.
    #[serde(flatten)]
    pub approval: ApprovalRecord,
    /// Target database.
    #[serde(default)]
    pub database: Option<String>,
}

async fn approve_decision(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<ApprovalBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let (Path(id), Json(body)) = (id?, body?);
    let id = NodeId::new(id)?;
    let approval_id = state
        .orchestrator()
        .record_approval(&id, &body.approval, body.database.as_deref())
        .await?;
    Ok(Json(json!({
        "status": "ok",
        "decision_id": id,
        "approval_id": approval_id,
    })))
}

/// Query string of `GET /policies`.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyQuery {
    /// Comma-separated tags.
    pub tags: Option<String>,
    /// Category id or name.
    pub category: Option<String>,
    /// Target database.
    pub database: Option<String>,
}

async fn list_policies(
    State(state): State<AppState>,
    query: Result<Query<PolicyQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let store = state.store(query.database.as_deref()).await?;

    let policies = if let Some(category) = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|category| !category.is_empty())
    {
        store.policies_by_category(category).await?
    } else {
        let tags: Vec<String> = query
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect();
        if tags.is_empty() {
            return Err(ApiError::BadRequest(
                "provide `tags` or `category` to select policies".into(),
            ));
        }
        store.policies_by_tags(&tags).await?
    };

    Ok(Json(json!({ "count": policies.len(), "policies": policies })))
}
