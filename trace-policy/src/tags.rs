//! Keyword tagging of free-text requests.

use std::collections::BTreeSet;

/// Tag attached to every request.
pub const BASE_TAG: &str = "refund";

const KEYWORD_TAGS: &[(&str, &[&str])] = &[
    ("refund", &["refund"]),
    ("discount", &["discount", "vip", "exception"]),
    ("vip", &["vip", "exception", "customer_service"]),
    ("outage", &["outage", "sla", "compensation"]),
    ("enterprise", &["vip", "exception"]),
    ("exception", &["exception"]),
    ("escalation", &["escalation", "high_value"]),
];

/// Extracts policy tags from a request by case-insensitive keyword match.
///
/// The result is sorted, deduplicated and always contains [`BASE_TAG`].
#[must_use]
pub fn extract_tags(request: &str) -> Vec<String> {
    let lowered = request.to_lowercase();
    let mut tags: BTreeSet<&str> = KEYWORD_TAGS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .flat_map(|(_, tags)| tags.iter().copied())
        .collect();
    tags.insert(BASE_TAG);
    tags.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_includes_refund() {
        assert_eq!(extract_tags("Can I change my password?"), ["refund"]);
    }

    #[test]
    fn maps_keywords_case_insensitively() {
        assert_eq!(
            extract_tags("VIP Enterprise customer hit an OUTAGE"),
            ["compensation", "customer_service", "exception", "outage", "refund", "sla", "vip"]
        );
    }

    #[test]
    fn matches_substrings() {
        assert_eq!(
            extract_tags("needs escalation for a discounted plan"),
            ["discount", "escalation", "exception", "high_value", "refund", "vip"]
        );
    }
}
