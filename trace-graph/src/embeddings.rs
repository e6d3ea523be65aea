//! The vector kept on a decision for precedent search.
//!
//! A vector is only built from finite values and never empty, so cosine
//! scoring can rely on both. Serde goes through `Vec<f32>` and re-checks the
//! values on the way in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GraphError, GraphResult};

/// Embedding of a decision's request text.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wraps provider output.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidRecord`] for an empty vector or one holding
    /// NaN or infinity.
    pub fn new(values: Vec<f32>) -> GraphResult<Self> {
        if values.is_empty() {
            return Err(GraphError::InvalidRecord("embedding has no dimensions"));
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(GraphError::InvalidRecord("embedding holds NaN or infinity"));
        }
        Ok(Self(values))
    }

    /// Narrows a vector read back from Neo4j, which stores floats as `f64`.
    ///
    /// # Errors
    ///
    /// Same rules as [`EmbeddingVector::new`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(values: &[f64]) -> GraphResult<Self> {
        Self::new(values.iter().map(|value| *value as f32).collect())
    }

    /// The components.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// The components as `f64`, the float type Neo4j lists hold.
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().copied().map(f64::from).collect()
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed vector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn dot(&self, other: &Self) -> f32 {
        self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum()
    }

    pub(crate) fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = GraphError;

    fn try_from(values: Vec<f32>) -> GraphResult<Self> {
        Self::new(values)
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(vector: EmbeddingVector) -> Self {
        vector.0
    }
}

// Prints the dimension count only.
impl fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmbeddingVector({} dims)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_finite_vectors() {
        assert!(matches!(
            EmbeddingVector::new(Vec::new()),
            Err(GraphError::InvalidRecord(_))
        ));
        assert!(matches!(
            EmbeddingVector::new(vec![0.1, f32::INFINITY]),
            Err(GraphError::InvalidRecord(_))
        ));
    }

    #[test]
    fn widens_and_narrows_for_storage() {
        let embedding = EmbeddingVector::from_f64(&[0.5, -0.25]).unwrap();
        assert_eq!(embedding.as_slice(), &[0.5, -0.25]);
        assert_eq!(embedding.to_f64(), vec![0.5, -0.25]);
        assert_eq!(format!("{embedding:?}"), "EmbeddingVector(2 dims)");
    }

    #[test]
    fn deserializing_applies_the_same_checks() {
        let embedding: EmbeddingVector = serde_json::from_str("[0.6, 0.8]").unwrap();
        assert!((embedding.magnitude() - 1.0).abs() < 1e-6);
        assert!(serde_json::from_str::<EmbeddingVector>("[]").is_err());
        assert_eq!(serde_json::to_string(&embedding).unwrap(), "[0.6,0.8]");
    }
}
