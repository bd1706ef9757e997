use crate::error::{Result, SearchError};
use crate::keyword::QueryTerms;
use crate::score;
use rag_vector_store::{Document, RetrievalResult};
use serde::Serialize;

/// Candidate pool drawn from the vector index per requested result.
pub const CANDIDATE_MULTIPLIER: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridHit {
    pub row: usize,
    pub document: Document,
    /// Raw squared L2 distance from the vector index.
    pub vector_score: f64,
    pub keyword_score: f64,
    pub combined_score: f64,
}

pub fn validate_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(SearchError::InvalidParameter(format!(
            "alpha must be within [0, 1], got {alpha}"
        )))
    }
}

/// Re-rank vector candidates by the blended score.
///
/// `candidates` must be in vector rank order; equal combined scores keep
/// that order. Returns at most `k` hits.
pub fn rerank(
    query: &str,
    candidates: Vec<RetrievalResult>,
    alpha: f64,
    k: usize,
) -> Result<Vec<HybridHit>> {
    validate_alpha(alpha)?;
    let terms = QueryTerms::parse(query);

    let mut hits: Vec<HybridHit> = candidates
        .into_iter()
        .map(|candidate| {
            let keyword_score = terms.score(&candidate.document.text);
            HybridHit {
                row: candidate.row,
                combined_score: score::combined_score(alpha, candidate.score, keyword_score),
                vector_score: candidate.score,
                keyword_score,
                document: candidate.document,
            }
        })
        .collect();

    // Stable: equal combined scores keep vector rank.
    hits.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    hits.truncate(k);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(row: usize, text: &str, distance: f64) -> RetrievalResult {
        RetrievalResult {
            row,
            document: Document::text(text),
            score: distance,
        }
    }

    fn candidates() -> Vec<RetrievalResult> {
        vec![
            candidate(0, "cat on mat", 0.0),
            candidate(2, "cat and dog", 0.5),
            candidate(1, "dog in fog", 2.0),
        ]
    }

    #[test]
    fn alpha_out_of_range_rejected() {
        for alpha in [-0.1, 1.5, f64::NAN] {
            let err = rerank("cat", candidates(), alpha, 2).unwrap_err();
            assert!(matches!(err, SearchError::InvalidParameter(_)));
        }
    }

    #[test]
    fn keyword_weight_can_reorder_candidates() {
        let hits = rerank("dog", candidates(), 0.0, 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|hit| hit.row).collect();
        // Rows 2 and 1 tie at keyword score 1.0 and keep vector rank order.
        assert_eq!(rows, vec![2, 1, 0]);
    }

    #[test]
    fn pure_vector_weight_follows_distance() {
        let hits = rerank("dog", candidates(), 1.0, 2).unwrap();
        assert_eq!(hits[0].row, 0);
        assert_eq!(hits[0].combined_score, 1.0);
        assert_eq!(hits[1].row, 2);
        assert_eq!(hits[1].combined_score, 0.5);
    }

    #[test]
    fn scores_reported_per_hit() {
        let hits = rerank("cat", candidates(), 0.5, 1).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.vector_score, 0.0);
        assert_eq!(hit.keyword_score, 1.0);
        assert_eq!(hit.combined_score, 1.0);
    }

    #[test]
    fn overflowed_distance_ranks_last() {
        let mut pool = candidates();
        pool.insert(0, candidate(3, "cat on mat", f64::INFINITY));
        let hits = rerank("cat", pool, 0.5, 4).unwrap();
        let rows: Vec<usize> = hits.iter().map(|hit| hit.row).collect();
        assert_eq!(rows, vec![0, 2, 1, 3]);
    }

    #[test]
    fn deterministic_for_same_input() {
        let first = rerank("cat dog", candidates(), 0.7, 3).unwrap();
        let second = rerank("cat dog", candidates(), 0.7, 3).unwrap();
        assert_eq!(first, second);
    }
}
