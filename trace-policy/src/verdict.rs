//! Verdicts returned by the decision model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome the model chose for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    /// The request is granted.
    Approve,
    /// The request is rejected.
    Deny,
    /// The request needs a human decision.
    Escalate,
    /// The model gave no verdict.
    #[default]
    Unknown,
    /// Any other verdict text, kept verbatim.
    Other(String),
}

impl Verdict {
    /// Parses verdict text, ignoring case and surrounding brackets.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let bare = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed)
            .trim();
        match bare.to_ascii_uppercase().as_str() {
            "" | "UNKNOWN" => Self::Unknown,
            "APPROVE" => Self::Approve,
            "DENY" => Self::Deny,
            "ESCALATE" => Self::Escalate,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    /// Returns the verdict as stored on decision nodes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approve => "APPROVE",
            Self::Deny => "DENY",
            Self::Escalate => "ESCALATE",
            Self::Unknown => "UNKNOWN",
            Self::Other(text) => text,
        }
    }
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
