//! Progress reporting for the decision pipeline.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use trace_graph::Precedent;
use trace_policy::PolicySummary;

use crate::{DecisionOutcome, ParsedDecision};

const POLICIES_SHOWN: usize = 5;
const PRECEDENTS_SHOWN: usize = 3;

/// Stages of [`crate::DecisionOrchestrator::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    /// Query the knowledge base for policies.
    Policies,
    /// Search similar past decisions.
    Precedents,
    /// Assemble the model prompt.
    Prompt,
    /// Call the model.
    Inference,
    /// Parse the model answer.
    Parse,
    /// Record the decision trace.
    Record,
}

impl PipelineStep {
    /// Number of steps in the pipeline.
    pub const COUNT: usize = 6;

    /// One-based position of the step.
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Policies => 1,
            Self::Precedents => 2,
            Self::Prompt => 3,
            Self::Inference => 4,
            Self::Parse => 5,
            Self::Record => 6,
        }
    }

    /// Human-readable description of the step.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Policies => "querying knowledge base for relevant policies",
            Self::Precedents => "searching for similar past decisions",
            Self::Prompt => "building prompt with full context",
            Self::Inference => "calling model for decision",
            Self::Parse => "parsing model response",
            Self::Record => "recording decision trace",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}",
            self.position(),
            Self::COUNT,
            self.description()
        )
    }
}

/// Observer notified as a decision moves through the pipeline.
///
/// All methods default to no-ops.
pub trait DecisionObserver: Send + Sync {
    /// A step is starting.
    fn on_step(&self, _step: PipelineStep) {}

    /// Policies were found for `tags`.
    fn on_policies(&self, _tags: &[String], _policies: &[PolicySummary]) {}

    /// Precedents were found.
    fn on_precedents(&self, _precedents: &[Precedent]) {}

    /// The prompt was built.
    fn on_prompt(&self, _prompt: &str) {}

    /// The model answer was parsed.
    fn on_parsed(&self, _parsed: &ParsedDecision) {}

    /// The decision trace was recorded.
    fn on_recorded(&self, _outcome: &DecisionOutcome) {}
}

/// Observer that reports pipeline progress to the tracing system.
#[derive(Debug, Default)]
pub struct TracingDecisionObserver;

impl DecisionObserver for TracingDecisionObserver {
    fn on_step(&self, step: PipelineStep) {
        info!(step = step.position(), total = PipelineStep::COUNT, "{step}");
    }

    fn on_policies(&self, tags: &[String], policies: &[PolicySummary]) {
        info!(tags = ?tags, policies = policies.len(), "policies found");
        for policy in policies.iter().take(POLICIES_SHOWN) {
            debug!(
                policy = policy.id(),
                name = policy.name().unwrap_or_default(),
                severity = %policy.severity(),
                "policy"
            );
        }
    }

    fn on_precedents(&self, precedents: &[Precedent]) {
        info!(precedents = precedents.len(), "precedents found");
        for precedent in precedents.iter().take(PRECEDENTS_SHOWN) {
            debug!(
                decision = precedent.text("id"),
                similarity = precedent.similarity,
                verdict = precedent.text("response"),
                "precedent"
            );
        }
    }

    fn on_prompt(&self, prompt: &str) {
        debug!(chars = prompt.len(), "prompt built");
    }

    fn on_parsed(&self, parsed: &ParsedDecision) {
        info!(
            verdict = %parsed.verdict,
            confidence = parsed.confidence,
            used_precedents = parsed.used_precedents,
            "model answer parsed"
        );
    }

    fn on_recorded(&self, outcome: &DecisionOutcome) {
        info!(
            decision_id = %outcome.decision_id,
            verdict = %outcome.decision,
            policies = outcome.policies_considered,
            precedents = outcome.precedents_found,
            "decision recorded"
        );
    }
}

/// Observer that forwards notifications to a collection of observers.
#[derive(Default)]
pub struct CompositeDecisionObserver {
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl CompositeDecisionObserver {
    /// Creates a composite observer from the supplied list.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn DecisionObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: Arc<dyn DecisionObserver>) {
        self.observers.push(observer);
    }
}

impl DecisionObserver for CompositeDecisionObserver {
    fn on_step(&self, step: PipelineStep) {
        for observer in &self.observers {
            observer.on_step(step);
        }
    }

    fn on_policies(&self, tags: &[String], policies: &[PolicySummary]) {
        for observer in &self.observers {
            observer.on_policies(tags, policies);
        }
    }

    fn on_precedents(&self, precedents: &[Precedent]) {
        for observer in &self.observers {
            observer.on_precedents(precedents);
        }
    }

    fn on_prompt(&self, prompt: &str) {
        for observer in &self.observers {
            observer.on_prompt(prompt);
        }
    }

    fn on_parsed(&self, parsed: &ParsedDecision) {
        for observer in &self.observers {
            observer.on_parsed(parsed);
        }
    }

    fn on_recorded(&self, outcome: &DecisionOutcome) {
        for observer in &self.observers {
            observer.on_recorded(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct StepLog(Mutex<Vec<usize>>);

    impl DecisionObserver for StepLog {
        fn on_step(&self, step: PipelineStep) {
            self.0.lock().unwrap().push(step.position());
        }
    }

    #[test]
    fn steps_render_progress() {
        assert_eq!(
            PipelineStep::Precedents.to_string(),
            "[2/6] searching for similar past decisions"
        );
        assert_eq!(PipelineStep::Record.position(), PipelineStep::COUNT);
    }

    #[test]
    fn composite_forwards_to_every_observer() {
        let first = Arc::new(StepLog::default());
        let second = Arc::new(StepLog::default());
        let mut composite = CompositeDecisionObserver::new([first.clone() as Arc<dyn DecisionObserver>]);
        composite.push(second.clone());

        composite.on_step(PipelineStep::Prompt);
        composite.on_prompt("ignored by step logs");

        assert_eq!(*first.0.lock().unwrap(), [3]);
        assert_eq!(*second.0.lock().unwrap(), [3]);
    }
}
