//! Policy severity levels.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How strictly a policy must be applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Rules that require approval to override.
    Strict,
    /// Default expectations with room for judgement.
    Moderate,
    /// Guidance that agents may adapt freely.
    Flexible,
    /// Any unrecognised severity label, kept verbatim.
    Other(String),
}

impl Severity {
    /// Parses a severity label; unknown labels become [`Severity::Other`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "strict" => Self::Strict,
            "moderate" => Self::Moderate,
            "flexible" => Self::Flexible,
            _ => Self::Other(label.to_owned()),
        }
    }

    /// Reads the severity of a policy property value.
    ///
    /// Missing or non-string values rank as an empty [`Severity::Other`].
    #[must_use]
    pub fn from_property(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .map_or_else(|| Self::Other(String::new()), Self::parse)
    }

    /// Numeric rank used for ordering policy lists (higher is stricter).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Strict => 3,
            Self::Moderate => 2,
            Self::Flexible => 1,
            Self::Other(_) => 0,
        }
    }

    /// Returns the label as stored in the graph.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Strict => "strict",
            Self::Moderate => "moderate",
            Self::Flexible => "flexible",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn orders_by_strictness() {
        let mut levels = vec![
            Severity::parse("flexible"),
            Severity::parse("advisory"),
            Severity::parse("STRICT"),
            Severity::parse("moderate"),
        ];
        levels.sort_by_key(|level| std::cmp::Reverse(level.rank()));
        let labels: Vec<_> = levels.iter().map(Severity::as_str).collect();
        assert_eq!(labels, ["strict", "moderate", "flexible", "advisory"]);
    }

    #[test]
    fn reads_property_values() {
        assert_eq!(Severity::from_property(Some(&json!("strict"))), Severity::Strict);
        assert_eq!(Severity::from_property(Some(&json!(3))).rank(), 0);
        assert_eq!(Severity::from_property(None).rank(), 0);
    }
}
