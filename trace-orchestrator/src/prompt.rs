//! Prompt assembly for the decision model.

use std::fmt::Write;

use trace_graph::Precedent;
use trace_policy::PolicySummary;

use crate::EvidenceItem;

const INSTRUCTIONS: &str = "INSTRUCTIONS:
Based on the above context, make a decision. You must:

1. DECISION: State clearly \"APPROVE\" or \"DENY\" or \"ESCALATE\"
2. CONFIDENCE: Provide a confidence score (0.0 to 1.0)
3. REASONING: Explain your reasoning in 2-3 sentences
4. POLICIES: List which policies you followed or overrode
5. PRECEDENTS: Mention if precedents influenced your decision

Format your response as:
DECISION: [APPROVE/DENY/ESCALATE]
CONFIDENCE: [0.0-1.0]
REASONING: [Your explanation]
POLICIES: [Policy names you considered]
PRECEDENTS: [Yes/No - did precedents influence this?]
";

/// Builds the decision prompt from the request and its gathered context.
///
/// Sections without content are omitted.
#[must_use]
pub fn build_decision_prompt(
    request: &str,
    policies: &[PolicySummary],
    precedents: &[Precedent],
    evidence: &[EvidenceItem],
) -> String {
    let mut prompt = format!(
        "You are an AI decision agent for a SaaS company. A customer has made a request that \
         requires a decision.\n\nCUSTOMER REQUEST:\n{request}\n\n"
    );

    // Writing to a String cannot fail.
    if !policies.is_empty() {
        prompt.push_str("RELEVANT COMPANY POLICIES:\n");
        for (index, policy) in policies.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. {}",
                index + 1,
                policy.name().unwrap_or("Unknown Policy")
            );
            let _ = writeln!(
                prompt,
                "   Description: {}",
                policy.description().unwrap_or("N/A")
            );
            let _ = writeln!(
                prompt,
                "   Severity: {}",
                policy.severity_label().unwrap_or("N/A")
            );
            if policy.requires_approval() {
                let _ = writeln!(
                    prompt,
                    "   Requires Approval: {}",
                    policy.approval_level().unwrap_or("Yes")
                );
            }
            if let Some(conditions) = policy.exception_conditions() {
                let _ = writeln!(prompt, "   Exceptions: {conditions}");
            }
            prompt.push('\n');
        }
    }

    if !precedents.is_empty() {
        prompt.push_str("SIMILAR PAST DECISIONS (Precedents):\n");
        for (index, precedent) in precedents.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. (Similarity: {:.2}) {}",
                index + 1,
                precedent.similarity,
                or_na(precedent.decision.get("prompt").and_then(|v| v.as_str()))
            );
            let _ = writeln!(
                prompt,
                "   Decision: {}",
                or_na(precedent.decision.get("response").and_then(|v| v.as_str()))
            );
            let _ = writeln!(
                prompt,
                "   Reasoning: {}",
                or_na(precedent.decision.get("reasoning").and_then(|v| v.as_str()))
            );
            prompt.push('\n');
        }
    }

    if !evidence.is_empty() {
        prompt.push_str("EVIDENCE (Customer Context):\n");
        for (index, item) in evidence.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", index + 1, item.describe());
        }
        prompt.push('\n');
    }

    prompt.push_str(INSTRUCTIONS);
    prompt
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use trace_primitives::Properties;

    use super::*;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn minimal_prompt_has_request_and_instructions() {
        let prompt = build_decision_prompt("Refund my order", &[], &[], &[]);
        assert!(prompt.starts_with("You are an AI decision agent for a SaaS company."));
        assert!(prompt.contains("CUSTOMER REQUEST:\nRefund my order\n\nINSTRUCTIONS:"));
        assert!(!prompt.contains("RELEVANT COMPANY POLICIES"));
        assert!(prompt.ends_with("PRECEDENTS: [Yes/No - did precedents influence this?]\n"));
    }

    #[test]
    fn lists_policies_precedents_and_evidence() {
        let policies = vec![
            PolicySummary::new(props(json!({
                "name": "Non-Refundable Ticket Policy",
                "description": "No refunds",
                "severity": "strict",
                "requires_approval": true,
                "approval_level": "manager",
                "exception_conditions": "Service failures"
            }))),
            PolicySummary::new(props(json!({ "requires_approval": true }))),
        ];
        let precedents = vec![Precedent::new(
            props(json!({ "prompt": "Refund after outage", "response": "APPROVE" })),
            0.8765,
        )];
        let evidence = vec![EvidenceItem::Text("Customer since 2019".into())];

        let prompt = build_decision_prompt("Refund", &policies, &precedents, &evidence);

        assert!(prompt.contains(
            "RELEVANT COMPANY POLICIES:\n1. Non-Refundable Ticket Policy\n   Description: No refunds\n   \
             Severity: strict\n   Requires Approval: manager\n   Exceptions: Service failures\n\n"
        ));
        assert!(prompt.contains(
            "2. Unknown Policy\n   Description: N/A\n   Severity: N/A\n   Requires Approval: Yes\n\n"
        ));
        assert!(prompt.contains(
            "SIMILAR PAST DECISIONS (Precedents):\n1. (Similarity: 0.88) Refund after outage\n   \
             Decision: APPROVE\n   Reasoning: N/A\n\n"
        ));
        assert!(prompt.contains("EVIDENCE (Customer Context):\n1. Customer since 2019\n\nINSTRUCTIONS:"));
    }
}
