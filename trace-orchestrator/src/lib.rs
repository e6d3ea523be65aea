//! Decision orchestration.
//!
//! [`DecisionOrchestrator::decide`] runs the six-step pipeline: gather
//! policies by tag, search precedents by embedding, build the prompt, call the
//! model, parse its answer, and record the decision trace in the graph.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod prompt;
pub mod request;
pub mod response;

pub use error::{OrchestratorError, OrchestratorResult};
pub use observer::{
    CompositeDecisionObserver, DecisionObserver, PipelineStep, TracingDecisionObserver,
};
pub use orchestrator::{
    ApprovalRecord, DEFAULT_ACTOR_ID, DecisionOrchestrator, DecisionOutcome, OrchestratorConfig,
};
pub use prompt::build_decision_prompt;
pub use request::{DecisionRequest, EvidenceItem};
pub use response::{ParsedDecision, parse_decision};
