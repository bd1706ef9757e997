//! Where raw index distances are reinterpreted as scores.
//!
//! The index reports squared L2 distance (lower is closer). Two public
//! behaviours nevertheless treat that number as if it were a similarity:
//! threshold filtering keeps results whose *distance* is at least the
//! threshold, and hybrid scoring uses `1 - distance` as if distances lived in
//! `[0, 1]`. Both are observable contracts, so they are kept literally and
//! confined to this module. For embeddings whose distances exceed 1 the
//! hybrid vector term goes negative and distorts the blend.

/// Threshold filter applied by `retrieve`: compares the raw distance.
#[must_use]
pub fn meets_score_threshold(distance: f64, threshold: f64) -> bool {
    distance >= threshold
}

/// Vector half of the hybrid score: `1 - distance`, unclamped.
#[must_use]
pub fn distance_as_similarity(distance: f64) -> f64 {
    1.0 - distance
}

/// `alpha * (1 - distance) + (1 - alpha) * keyword_score`.
#[must_use]
pub fn combined_score(alpha: f64, distance: f64, keyword_score: f64) -> f64 {
    alpha * distance_as_similarity(distance) + (1.0 - alpha) * keyword_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_compares_raw_distance() {
        assert!(meets_score_threshold(0.0, 0.0));
        assert!(meets_score_threshold(2.5, 1.0));
        assert!(!meets_score_threshold(0.2, 0.5));
    }

    #[test]
    fn similarity_is_not_clamped() {
        assert_eq!(distance_as_similarity(0.0), 1.0);
        assert_eq!(distance_as_similarity(3.0), -2.0);
    }

    #[test]
    fn combined_score_blends_linearly() {
        assert_eq!(combined_score(1.0, 0.25, 0.0), 0.75);
        assert_eq!(combined_score(0.0, 0.25, 0.4), 0.4);
        assert!((combined_score(0.5, 0.5, 1.0) - 0.75).abs() < 1e-12);
    }
}
