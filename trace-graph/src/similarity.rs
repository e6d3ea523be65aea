//! Client-side cosine similarity over stored decision embeddings.

use std::cmp::Ordering;

use trace_primitives::Properties;

use crate::{EmbeddingVector, Precedent};

/// Cosine similarity between two embeddings.
///
/// Returns `None` when the dimensions differ and `0.0` when either vector has
/// zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let denom = a.magnitude() * b.magnitude();
    if denom == 0.0 {
        return Some(0.0);
    }
    Some(a.dot(b) / denom)
}

/// Scores `candidates` against `query`, highest similarity first, keeping at
/// most `top_k` entries.
#[must_use]
pub fn rank_precedents(
    query: &EmbeddingVector,
    candidates: Vec<(Properties, EmbeddingVector)>,
    top_k: usize,
) -> Vec<Precedent> {
    let mut scored: Vec<Precedent> = candidates
        .into_iter()
        .filter_map(|(decision, embedding)| {
            cosine_similarity(query, &embedding)
                .map(|similarity| Precedent::new(decision, similarity))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn vector(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    fn decision(id: &str) -> Properties {
        json!({ "id": id }).as_object().cloned().unwrap()
    }

    #[test]
    fn scores_identical_and_orthogonal_vectors() {
        let a = vector(&[1.0, 0.0]);
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &vector(&[0.0, 2.0])).unwrap().abs() < 1e-6);
    }

    #[test]
    fn zero_magnitude_scores_zero_and_mismatch_is_skipped() {
        let a = vector(&[1.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &vector(&[0.0, 0.0])), Some(0.0));
        assert_eq!(cosine_similarity(&a, &vector(&[1.0, 0.0, 0.0])), None);
    }

    #[test]
    fn ranks_highest_first_and_truncates() {
        let query = vector(&[1.0, 0.0]);
        let ranked = rank_precedents(
            &query,
            vec![
                (decision("dec-far"), vector(&[0.0, 1.0])),
                (decision("dec-near"), vector(&[1.0, 0.1])),
                (decision("dec-mid"), vector(&[1.0, 1.0])),
                (decision("dec-3d"), vector(&[1.0, 0.0, 0.0])),
            ],
            2,
        );

        let ids: Vec<_> = ranked
            .iter()
            .map(|precedent| precedent.decision["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["dec-near", "dec-mid"]);
    }
}
