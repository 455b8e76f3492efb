//! Cosine similarity scoring and exhaustive top-K ranking.
//!
//! Ranking is a full scan: every candidate is scored, the list is stably sorted
//! by descending score, and the first `k` are kept. Equal scores keep the order
//! the candidates were produced in, so a frozen corpus always ranks the same way.

pub mod filter;

use arcana_core::{EmbeddingRecord, Error, ScoringSubject};

pub use filter::CandidateFilter;

/// Why two vectors could not be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("vectors have different lengths: {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector has zero norm")]
    ZeroNorm,

    #[error("vector has a non-finite component")]
    NonFinite,
}

/// A candidate together with its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub record: &'a EmbeddingRecord,
    pub score: f32,
}

/// Dot product accumulated in f64.
///
/// f64 holds the square of any finite f32 without overflow or underflow.
fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn norm(v: &[f32]) -> f64 {
    dot_product(v, v).sqrt()
}

/// Checks a norm before it is used as a divisor.
fn check_norm(norm: f64) -> Result<f64, ScoreError> {
    if !norm.is_finite() {
        Err(ScoreError::NonFinite)
    } else if norm == 0.0 {
        Err(ScoreError::ZeroNorm)
    } else {
        Ok(norm)
    }
}

/// Cosine similarity of two equal-length vectors, in [-1, 1].
///
/// A zero vector has no direction, so it is an error rather than a score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let norm_a = check_norm(norm(a))?;
    let norm_b = check_norm(norm(b))?;
    cosine_with_norms(a, norm_a, b, norm_b)
}

fn cosine_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> Result<f32, ScoreError> {
    // Rounding can push |cos| a hair past 1.
    let cos = (dot_product(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    if cos.is_nan() {
        return Err(ScoreError::NonFinite);
    }
    Ok(cos as f32)
}

/// Score every candidate against `query` and keep the best `k`.
///
/// `dimension` is the corpus dimension; the query must match it exactly.
pub fn rank<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = &'a EmbeddingRecord>,
    dimension: usize,
    k: usize,
) -> arcana_core::Result<Vec<Scored<'a>>> {
    if k == 0 {
        return Err(Error::InvalidLimit);
    }
    if query.len() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }

    let query_norm = check_norm(norm(query)).map_err(|_| Error::Scoring {
        subject: ScoringSubject::Query,
    })?;

    let mut scored = Vec::new();
    for record in candidates {
        if record.vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: record.vector.len(),
            });
        }
        let score = check_norm(norm(&record.vector))
            .and_then(|record_norm| {
                cosine_with_norms(query, query_norm, &record.vector, record_norm)
            })
            .map_err(|_| Error::Scoring {
                subject: ScoringSubject::Record(record.key()),
            })?;
        scored.push(Scored { record, score });
    }

    // Stable: ties keep candidate order. Scores are never NaN here.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);

    tracing::debug!(
        dimension,
        k,
        returned = scored.len(),
        top = ?scored.first().map(|s| s.score),
        "ranked candidates"
    );

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcana_core::{Lens, RecordKey, Variant};

    fn record(entity: &str, variant: Variant, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            entity: entity.to_string(),
            variant,
            lens: Lens::Combined,
            text: String::new(),
            vector,
        }
    }

    /// Deterministic pseudo-random vectors without pulling in a rng crate.
    fn pseudo_vector(seed: usize, dim: usize) -> Vec<f32> {
        (0..dim)
            .map(|j| (((seed * 31 + j * 17) as f32) * 0.37).sin())
            .collect()
    }

    #[test]
    fn test_identical_vectors() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-6, "score was {score}");
    }

    #[test]
    fn test_orthogonal_vectors() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-6, "score was {score}");
    }

    #[test]
    fn test_opposite_vectors() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-6, "score was {score}");
    }

    #[test]
    fn test_similar_vectors() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[1.1, 2.1, 2.9]).unwrap();
        assert!(score > 0.9 && score <= 1.0, "score was {score}");
    }

    #[test]
    fn test_zero_vector_is_an_error() {
        assert_eq!(
            cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]),
            Err(ScoreError::ZeroNorm)
        );
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]),
            Err(ScoreError::LengthMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn test_symmetric_bounded_and_self_maximal() {
        for i in 0..20 {
            let a = pseudo_vector(i, 64);
            let b = pseudo_vector(i + 100, 64);

            let ab = cosine_similarity(&a, &b).unwrap();
            let ba = cosine_similarity(&b, &a).unwrap();
            assert_eq!(ab, ba);
            assert!((-1.0..=1.0).contains(&ab), "score was {ab}");

            let aa = cosine_similarity(&a, &a).unwrap();
            assert!((aa - 1.0).abs() < 1e-5, "self score was {aa}");
        }
    }

    #[test]
    fn test_rank_sorted_and_truncated() {
        let records = vec![
            record("a", Variant::Primary, vec![0.0, 1.0]),
            record("b", Variant::Primary, vec![1.0, 0.0]),
            record("c", Variant::Primary, vec![1.0, 1.0]),
        ];
        let ranked = rank(&[1.0, 0.0], &records, 2, 2).unwrap();
        let names: Vec<_> = ranked.iter().map(|s| s.record.entity.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn test_rank_ties_keep_candidate_order() {
        let records = vec![
            record("first", Variant::Primary, vec![1.0, 0.0]),
            record("second", Variant::Inverted, vec![2.0, 0.0]),
            record("third", Variant::Primary, vec![3.0, 0.0]),
        ];
        let ranked = rank(&[5.0, 0.0], &records, 2, 3).unwrap();
        let names: Vec<_> = ranked.iter().map(|s| s.record.entity.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("card{i}"), Variant::Primary, pseudo_vector(i, 32)))
            .collect();
        let query = pseudo_vector(7, 32);

        let first: Vec<_> = rank(&query, &records, 32, 10)
            .unwrap()
            .iter()
            .map(|s| (s.record.entity.clone(), s.score.to_bits()))
            .collect();
        let second: Vec<_> = rank(&query, &records, 32, 10)
            .unwrap()
            .iter()
            .map(|s| (s.record.entity.clone(), s.score.to_bits()))
            .collect();
        assert_eq!(first, second);

        for pair in first.windows(2) {
            assert!(f32::from_bits(pair[0].1) >= f32::from_bits(pair[1].1));
        }
    }

    #[test]
    fn test_rank_k_larger_than_candidates() {
        let records = vec![record("a", Variant::Primary, vec![1.0, 0.0])];
        let ranked = rank(&[1.0, 0.0], &records, 2, 10).unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_rank_empty_candidates() {
        let ranked = rank(&[1.0, 0.0], std::iter::empty::<&EmbeddingRecord>(), 2, 3).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_rejects_zero_k() {
        let err = rank(&[1.0, 0.0], std::iter::empty::<&EmbeddingRecord>(), 2, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidLimit));
    }

    #[test]
    fn test_rank_rejects_wrong_query_dimension() {
        let records = vec![record("a", Variant::Primary, vec![1.0, 0.0])];
        let err = rank(&[1.0, 0.0, 0.0], &records, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_rank_names_zero_norm_record() {
        let records = vec![
            record("ok", Variant::Primary, vec![1.0, 0.0]),
            record("broken", Variant::Inverted, vec![0.0, 0.0]),
        ];
        let err = rank(&[1.0, 0.0], &records, 2, 1).unwrap_err();
        let Error::Scoring {
            subject: ScoringSubject::Record(key),
        } = err
        else {
            panic!("expected a scoring error, got {err:?}");
        };
        assert_eq!(key, RecordKey::new("broken", Variant::Inverted, Lens::Combined));
    }

    #[test]
    fn test_rank_rejects_zero_query() {
        let records = vec![record("ok", Variant::Primary, vec![1.0, 0.0])];
        let err = rank(&[0.0, 0.0], &records, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Scoring {
                subject: ScoringSubject::Query
            }
        ));
    }

    #[test]
    fn test_large_components_score_finite() {
        let big = [1e20_f32, 1e20, 1e20];
        let score = cosine_similarity(&big, &big).unwrap();
        assert!((score - 1.0).abs() < 1e-6, "score was {score}");

        let huge = [f32::MAX, f32::MAX, -f32::MAX];
        let score = cosine_similarity(&huge, &big).unwrap();
        assert!((-1.0..=1.0).contains(&score), "score was {score}");
    }

    #[test]
    fn test_tiny_components_are_not_zero_norm() {
        let tiny = [1e-25_f32, 1e-25, 1e-25];
        let score = cosine_similarity(&tiny, &[1.0, 1.0, 1.0]).unwrap();
        assert!((score - 1.0).abs() < 1e-6, "score was {score}");

        let subnormal = [f32::from_bits(1), 0.0];
        assert!(cosine_similarity(&subnormal, &[1.0, 0.0]).is_ok());
    }

    #[test]
    fn test_non_finite_component_is_an_error() {
        assert_eq!(
            cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]),
            Err(ScoreError::NonFinite)
        );
        assert_eq!(
            cosine_similarity(&[1.0, 1.0], &[f32::INFINITY, 1.0]),
            Err(ScoreError::NonFinite)
        );
    }

    #[test]
    fn test_rank_large_magnitude_candidates() {
        let records = vec![
            record("unit", Variant::Primary, vec![0.0, 1.0, 0.0]),
            record("big", Variant::Primary, vec![1e20, 1e20, 1e20]),
        ];
        let ranked = rank(&[1e20, 1e20, 1e20], &records, 3, 2).unwrap();
        assert!(ranked.iter().all(|s| s.score.is_finite()));
        assert_eq!(ranked[0].record.entity, "big");
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        assert!((ranked[1].score - 1.0 / 3.0_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_rank_names_non_finite_record() {
        let records = vec![record("broken", Variant::Primary, vec![f32::INFINITY, 0.0])];
        let err = rank(&[1.0, 0.0], &records, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Scoring {
                subject: ScoringSubject::Record(_)
            }
        ));
    }
}
