//! Parsing of the model's structured answer.

use serde::Serialize;
use trace_policy::Verdict;

/// Confidence used when the model gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Fields extracted from a model answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDecision {
    /// The verdict, `UNKNOWN` when missing.
    pub verdict: Verdict,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-text reasoning.
    pub reasoning: String,
    /// Policy names as written by the model.
    pub policies_mentioned: String,
    /// Whether the model said precedents influenced it.
    pub used_precedents: bool,
}

impl Default for ParsedDecision {
    fn default() -> Self {
        Self {
            verdict: Verdict::Unknown,
            confidence: DEFAULT_CONFIDENCE,
            reasoning: String::new(),
            policies_mentioned: String::new(),
            used_precedents: false,
        }
    }
}

/// Parses `DECISION:` / `CONFIDENCE:` / `REASONING:` / `POLICIES:` /
/// `PRECEDENTS:` lines; anything else is ignored.
#[must_use]
pub fn parse_decision(answer: &str) -> ParsedDecision {
    let mut parsed = ParsedDecision::default();

    for line in answer.lines().map(str::trim) {
        if let Some(value) = field(line, "DECISION:") {
            parsed.verdict = Verdict::parse(value);
        } else if let Some(value) = field(line, "CONFIDENCE:") {
            if let Some(confidence) = parse_confidence(value) {
                parsed.confidence = confidence;
            }
        } else if let Some(value) = field(line, "REASONING:") {
            value.clone_into(&mut parsed.reasoning);
        } else if let Some(value) = field(line, "POLICIES:") {
            value.clone_into(&mut parsed.policies_mentioned);
        } else if let Some(value) = field(line, "PRECEDENTS:") {
            parsed.used_precedents = value.to_lowercase().contains("yes");
        }
    }

    parsed
}

fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}

fn parse_confidence(value: &str) -> Option<f64> {
    let bare = value.trim_matches(|c: char| c == '[' || c == ']').trim();
    bare.parse::<f64>()
        .ok()
        .filter(|confidence| confidence.is_finite())
        .map(|confidence| confidence.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_answer() {
        let parsed = parse_decision(
            "DECISION: APPROVE\nCONFIDENCE: 0.85\nREASONING: Outage verified.\n\
             POLICIES: Service Outage Compensation Policy\nPRECEDENTS: Yes, two similar cases",
        );
        assert_eq!(parsed.verdict, Verdict::Approve);
        assert!((parsed.confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(parsed.reasoning, "Outage verified.");
        assert_eq!(parsed.policies_mentioned, "Service Outage Compensation Policy");
        assert!(parsed.used_precedents);
    }

    #[test]
    fn falls_back_to_defaults() {
        let parsed = parse_decision("I think we should help.\nCONFIDENCE: high");
        assert_eq!(parsed, ParsedDecision::default());
    }

    #[test]
    fn clamps_confidence_and_reads_negative_precedents() {
        let parsed = parse_decision("  DECISION: deny\nCONFIDENCE: 1.7\nPRECEDENTS: No");
        assert_eq!(parsed.verdict, Verdict::Deny);
        assert!((parsed.confidence - 1.0).abs() < f64::EPSILON);
        assert!(!parsed.used_precedents);

        assert!(parse_decision("CONFIDENCE: -3").confidence.abs() < f64::EPSILON);
        assert!((parse_decision("CONFIDENCE: [0.4]").confidence - 0.4).abs() < f64::EPSILON);
    }
}
