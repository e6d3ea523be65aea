//! The decision pipeline.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use trace_adapters::embeddings::EmbeddingAdapter;
use trace_adapters::traits::{InferenceRequest, ModelAdapter, collect_text};
use trace_graph::{EmbeddingVector, GraphStore, Precedent};
use trace_policy::{PolicySummary, Verdict, extract_tags};
use trace_primitives::{
    DecisionId, NodeId, NodeLabel, Properties, Relation, normalize_properties,
};
use uuid::Uuid;

use crate::{
    DecisionObserver, DecisionRequest, EvidenceItem, OrchestratorError, OrchestratorResult,
    ParsedDecision, PipelineStep, build_decision_prompt, parse_decision,
};

/// Actor recorded when a request names none.
pub const DEFAULT_ACTOR_ID: &str = "agent-ai-001";

/// Tunables for [`DecisionOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of precedents retrieved per decision.
    pub precedent_top_k: usize,
    /// Actor recorded when a request names none.
    pub default_actor: String,
    /// Display name stored on actor nodes.
    pub actor_name: String,
    /// Sampling temperature passed to the model.
    pub temperature: Option<f32>,
    /// Output token limit passed to the model.
    pub max_output_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            precedent_top_k: 5,
            default_actor: DEFAULT_ACTOR_ID.to_owned(),
            actor_name: "DecisionBot".to_owned(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Result of a decision, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutcome {
    /// Identifier of the recorded decision node.
    pub decision_id: DecisionId,
    /// The verdict.
    pub decision: Verdict,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Model reasoning.
    pub reasoning: String,
    /// Number of policies shown to the model.
    pub policies_considered: usize,
    /// Number of precedents shown to the model.
    pub precedents_found: usize,
    /// Whether the model said precedents influenced it.
    pub used_precedents: bool,
    /// Tags extracted from the request.
    pub tags: Vec<String>,
    /// Policies linked with `FOLLOWS`.
    pub policies_followed: Vec<String>,
    /// Properties of the policies shown to the model.
    pub policies_details: Vec<Properties>,
    /// Precedent properties including `similarity`.
    pub precedents_details: Vec<Properties>,
    /// Raw model answer.
    pub llm_response: String,
}

/// A human sign-off recorded against a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Who approved.
    pub approver: String,
    /// Role or level of the approver, e.g. `manager`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Runs decisions against a graph store and a model.
#[derive(Clone)]
pub struct DecisionOrchestrator {
    store: Arc<dyn GraphStore>,
    model: Arc<dyn ModelAdapter>,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: OrchestratorConfig,
    observer: Option<Arc<dyn DecisionObserver>>,
}

impl fmt::Debug for DecisionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionOrchestrator")
            .field("database", &self.store.database())
            .field("model", &self.model.metadata().model())
            .field("embedding_model", &self.embedder.metadata().model())
            .field("config", &self.config)
            .field("observer_configured", &self.observer.is_some())
            .finish()
    }
}

impl DecisionOrchestrator {
    /// Creates an orchestrator with default settings.
    #[must_use]
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: Arc<dyn ModelAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Self {
        Self {
            store,
            model,
            embedder,
            config: OrchestratorConfig::default(),
            observer: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs an observer notified at every step.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the root graph store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Returns the store bound to `database`, or the root store.
    ///
    /// # Errors
    ///
    /// Returns an error if the named database cannot be opened.
    pub async fn store_for(&self, database: Option<&str>) -> OrchestratorResult<Arc<dyn GraphStore>> {
        match database.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) if name != self.store.database() => Ok(self.store.scoped(name).await?),
            _ => Ok(Arc::clone(&self.store)),
        }
    }

    fn notify(&self, step: PipelineStep) {
        if let Some(observer) = &self.observer {
            observer.on_step(step);
        }
    }

    fn observe(&self, f: impl FnOnce(&dyn DecisionObserver)) {
        if let Some(observer) = &self.observer {
            f(observer.as_ref());
        }
    }

    /// Decides `request` and records the decision trace.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidRequest`] for a blank request, and
    /// adapter or graph errors when a step fails. Failing to store the
    /// decision's embedding is logged and does not fail the call.
    pub async fn decide(&self, request: DecisionRequest) -> OrchestratorResult<DecisionOutcome> {
        let text = request.request.trim();
        if text.is_empty() {
            return Err(OrchestratorError::invalid("request must not be empty"));
        }
        let decision_id = DecisionId::generate();
        let evidence_nodes = evidence_nodes(&decision_id, &request.evidence)?;
        let actor = match &request.actor {
            Some(actor) => actor.clone(),
            None => NodeId::new(self.config.default_actor.as_str())?,
        };
        let store = self.store_for(request.database.as_deref()).await?;

        self.notify(PipelineStep::Policies);
        let tags = extract_tags(text);
        let policies: Vec<PolicySummary> = store
            .policies_by_tags(&tags)
            .await?
            .into_iter()
            .map(PolicySummary::new)
            .collect();
        self.observe(|observer| observer.on_policies(&tags, &policies));

        self.notify(PipelineStep::Precedents);
        let embedding = EmbeddingVector::new(self.embedder.embed(text).await?)?;
        let precedents = store
            .similar_decisions(&embedding, self.config.precedent_top_k)
            .await?;
        self.observe(|observer| observer.on_precedents(&precedents));

        self.notify(PipelineStep::Prompt);
        let prompt = build_decision_prompt(text, &policies, &precedents, &request.evidence);
        self.observe(|observer| observer.on_prompt(&prompt));

        self.notify(PipelineStep::Inference);
        let mut inference = InferenceRequest::user(prompt)?;
        if let Some(temperature) = self.config.temperature {
            inference = inference.with_temperature(temperature);
        }
        if let Some(tokens) = self.config.max_output_tokens {
            inference = inference.with_max_output_tokens(tokens);
        }
        let answer = collect_text(self.model.infer(inference).await?).await?;

        self.notify(PipelineStep::Parse);
        let parsed = parse_decision(&answer);
        self.observe(|observer| observer.on_parsed(&parsed));

        self.notify(PipelineStep::Record);
        let followed = followed_policies(&policies, &parsed.policies_mentioned);

        self.record(
            store.as_ref(),
            &decision_id,
            text,
            &tags,
            &parsed,
            &actor,
            &evidence_nodes,
            &followed,
        )
        .await?;

        if let Err(err) = store.set_embedding(decision_id.as_node_id(), &embedding).await {
            warn!(decision_id = %decision_id, error = %err, "failed to store decision embedding");
        }

        let outcome = DecisionOutcome {
            decision_id,
            decision: parsed.verdict,
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
            policies_considered: policies.len(),
            precedents_found: precedents.len(),
            used_precedents: parsed.used_precedents,
            tags,
            policies_followed: followed.iter().map(ToString::to_string).collect(),
            policies_details: policies
                .into_iter()
                .map(PolicySummary::into_properties)
                .collect(),
            precedents_details: precedents.iter().map(Precedent::to_detail).collect(),
            llm_response: answer,
        };
        self.observe(|observer| observer.on_recorded(&outcome));
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        store: &dyn GraphStore,
        decision_id: &DecisionId,
        prompt: &str,
        tags: &[String],
        parsed: &ParsedDecision,
        actor: &NodeId,
        evidence: &[(NodeId, Properties)],
        followed: &[NodeId],
    ) -> OrchestratorResult<()> {
        let decision = decision_id.as_node_id();
        let model = self.model.metadata().model();

        let props = object(json!({
            "prompt": prompt,
            "response": parsed.verdict.as_str(),
            "confidence": parsed.confidence,
            "reasoning": parsed.reasoning,
            "policies_mentioned": parsed.policies_mentioned,
            "used_precedents": parsed.used_precedents,
            "created_at": Utc::now().to_rfc3339(),
            "llm_model": model,
            "tags": tags,
        }));
        store.upsert_node(NodeLabel::Decision, decision, props).await?;

        let actor_props = object(json!({
            "name": self.config.actor_name,
            "type": "ai_agent",
            "model": model,
        }));
        store.upsert_node(NodeLabel::Actor, actor, actor_props).await?;
        store.link(Relation::Made, actor, decision).await?;

        for (evidence_id, props) in evidence {
            store
                .upsert_node(NodeLabel::Evidence, evidence_id, props.clone())
                .await?;
            store.link(Relation::JustifiedBy, decision, evidence_id).await?;
        }

        for policy in followed {
            if !store.link(Relation::Follows, decision, policy).await? {
                debug!(decision_id = %decision_id, policy = %policy, "followed policy vanished");
            }
        }
        Ok(())
    }

    /// Embeds an existing decision's prompt so it can serve as a precedent.
    ///
    /// Returns `false` when the decision or its prompt is missing.
    ///
    /// # Errors
    ///
    /// Returns adapter or graph errors.
    pub async fn index_decision(
        &self,
        id: &NodeId,
        database: Option<&str>,
    ) -> OrchestratorResult<bool> {
        let store = self.store_for(database).await?;
        let Some(decision) = store.get_node(NodeLabel::Decision, id).await? else {
            return Ok(false);
        };
        let Some(prompt) = decision
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|prompt| !prompt.trim().is_empty())
        else {
            debug!(decision_id = %id, "decision has no prompt to embed");
            return Ok(false);
        };

        let embedding = EmbeddingVector::new(self.embedder.embed(prompt).await?)?;
        Ok(store.set_embedding(id, &embedding).await?)
    }

    /// Records a human approval of a decision.
    ///
    /// Returns the identifier of the new approval node.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] when the decision does not
    /// exist and [`OrchestratorError::InvalidRequest`] for a blank approver.
    pub async fn record_approval(
        &self,
        decision: &NodeId,
        approval: &ApprovalRecord,
        database: Option<&str>,
    ) -> OrchestratorResult<NodeId> {
        if approval.approver.trim().is_empty() {
            return Err(OrchestratorError::invalid("approver must not be empty"));
        }
        let store = self.store_for(database).await?;
        if store.get_node(NodeLabel::Decision, decision).await?.is_none() {
            return Err(OrchestratorError::NotFound {
                what: "decision",
                id: decision.to_string(),
            });
        }

        let suffix = Uuid::new_v4().simple().to_string();
        let approval_id = NodeId::new(format!("appr-{}", &suffix[..12]))?;
        let mut props = object(json!({
            "approver": approval.approver.trim(),
            "decision_id": decision.as_str(),
            "approved_at": Utc::now().to_rfc3339(),
        }));
        if let Some(role) = &approval.role {
            props.insert("role".into(), Value::from(role.as_str()));
        }
        if let Some(comment) = &approval.comment {
            props.insert("comment".into(), Value::from(comment.as_str()));
        }

        store.upsert_node(NodeLabel::Approval, &approval_id, props).await?;
        store.link(Relation::Approved, &approval_id, decision).await?;
        debug!(decision_id = %decision, approval_id = %approval_id, "approval recorded");
        Ok(approval_id)
    }
}

/// Evidence node ids and properties; record ids are kept, other items get
/// `{decision}-ev{n}`.
fn evidence_nodes(
    decision_id: &DecisionId,
    evidence: &[EvidenceItem],
) -> OrchestratorResult<Vec<(NodeId, Properties)>> {
    evidence
        .iter()
        .enumerate()
        .map(|(index, item)| -> OrchestratorResult<(NodeId, Properties)> {
            let id = match item.record_id() {
                Some(id) => NodeId::new(id)?,
                None => NodeId::new(format!("{decision_id}-ev{}", index + 1))?,
            };
            let props = normalize_properties(Value::Object(item.to_properties()))?;
            Ok((id, props))
        })
        .collect()
}

/// Policies the model named, or the top-ranked policy when it named none.
fn followed_policies(policies: &[PolicySummary], mentioned: &str) -> Vec<NodeId> {
    let named: Vec<NodeId> = policies
        .iter()
        .filter(|policy| policy.is_mentioned_in(mentioned))
        .filter_map(|policy| NodeId::new(policy.id()).ok())
        .collect();
    if !named.is_empty() {
        return named;
    }
    policies
        .first()
        .and_then(|policy| NodeId::new(policy.id()).ok())
        .into_iter()
        .collect()
}

fn object(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}
