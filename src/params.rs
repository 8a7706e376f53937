//! Maps the user-facing diversity slider onto MMR tunables

use serde::Serialize;

/// Relevance weight at diversity 0 and the total drop across the slider
const LAMBDA_MAX: f64 = 0.95;
const LAMBDA_SPAN: f64 = 0.40;

const GAMMA_SOURCE: f64 = 0.08;
const GAMMA_CATEGORY: f64 = 0.05;
const GAMMA_LANGUAGE: f64 = 0.01;

const CAP_MAX: f64 = 15.0;
const CAP_SPAN: f64 = 10.0;
pub const CAP_FLOOR: usize = 5;

/// Immutable parameter bundle for one rerank call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MmrParams {
    pub diversity_level: f64,
    pub lambda: f64,
    pub gamma_source: f64,
    pub gamma_category: f64,
    pub gamma_language: f64,
    pub max_per_source: usize,
}

impl MmrParams {
    /// Interpolate all tunables from `diversity_level` in [0, 1].
    ///
    /// The caller validates the range; this function does not clamp.
    pub fn from_diversity_level(diversity_level: f64) -> Self {
        let cap = (CAP_MAX - CAP_SPAN * diversity_level).round_ties_even() as usize;

        Self {
            diversity_level,
            lambda: LAMBDA_MAX - LAMBDA_SPAN * diversity_level,
            gamma_source: GAMMA_SOURCE * diversity_level,
            gamma_category: GAMMA_CATEGORY * diversity_level,
            gamma_language: GAMMA_LANGUAGE * diversity_level,
            max_per_source: cap.max(CAP_FLOOR),
        }
    }

    /// Penalty for repeating already-selected source/category/language
    pub fn penalty(&self, source_count: usize, category_count: usize, language_count: usize) -> f64 {
        self.gamma_source * source_count as f64
            + self.gamma_category * category_count as f64
            + self.gamma_language * language_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let lo = MmrParams::from_diversity_level(0.0);
        assert!((lo.lambda - 0.95).abs() < 1e-6);
        assert_eq!(lo.max_per_source, 15);
        assert_eq!(lo.gamma_source, 0.0);

        let hi = MmrParams::from_diversity_level(1.0);
        assert!((hi.lambda - 0.55).abs() < 1e-6);
        assert_eq!(hi.max_per_source, 5);
        assert!((hi.gamma_source - 0.08).abs() < 1e-6);
        assert!((hi.gamma_category - 0.05).abs() < 1e-6);
        assert!((hi.gamma_language - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_monotonic_within_bounds() {
        let mut prev = MmrParams::from_diversity_level(0.0);
        for step in 1..=100 {
            let p = MmrParams::from_diversity_level(step as f64 / 100.0);
            assert!(p.lambda <= prev.lambda);
            assert!(p.max_per_source <= prev.max_per_source);
            assert!((0.55 - 1e-6..=0.95 + 1e-6).contains(&p.lambda));
            assert!((5..=15).contains(&p.max_per_source));
            prev = p;
        }
    }

    #[test]
    fn test_half_rounds_to_even() {
        // 15 - 2.5 = 12.5
        assert_eq!(MmrParams::from_diversity_level(0.25).max_per_source, 12);
    }
}
