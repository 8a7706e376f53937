//! Core type definitions for diversity-aware reranking

use serde::{Deserialize, Serialize};

/// Minimum embedding length accepted for content similarity
pub const MIN_EMBEDDING_DIM: usize = 10;

/// One rankable article, as delivered by the candidate view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub article_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,

    /// Cosine distance to the user profile (may exceed 1)
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds since publication
    #[serde(default)]
    pub age_seconds: Option<f64>,
    /// Relevance already computed upstream; skips the relevance source
    #[serde(default)]
    pub rel_score: Option<f64>,

    /// Content embedding used for redundancy
    pub embedding: Vec<f64>,
}

impl Candidate {
    pub fn source_key(&self) -> &str {
        self.source.as_deref().unwrap_or("")
    }

    pub fn category_key(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    pub fn language_key(&self) -> &str {
        self.language.as_deref().unwrap_or("")
    }
}

/// Features the relevance model was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceFeatures {
    pub cosine_similarity: f64,
    pub hours_since_publish: f64,
    pub source: String,
    pub category: String,
}

impl RelevanceFeatures {
    /// Derive training-time features from raw candidate fields
    pub fn derive(distance: f64, age_seconds: f64, source: &str, category: &str) -> Self {
        Self {
            cosine_similarity: (1.0 - distance).clamp(0.0, 1.0),
            hours_since_publish: age_seconds / 3600.0,
            source: source.to_string(),
            category: category.to_string(),
        }
    }
}

/// Rerank request as received on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankRequest {
    pub diversity_level: f64,
    /// Falls back to the configured default when omitted
    #[serde(default)]
    pub k: Option<usize>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub article_id: i64,
    pub rank: usize, // 1-based
    pub mmr_score: f64,
    pub rel_score: f64,
    pub source: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub explain_relevance: Option<RelevanceExplanation>,
    pub explain_diversity: Option<DiversityExplanation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResponse {
    pub lambda_mmr: f64,
    pub max_per_source: usize,
    pub items: Vec<RankedItem>,
}

impl RerankResponse {
    /// Well-formed result for an empty candidate list
    pub fn empty() -> Self {
        Self {
            lambda_mmr: 0.0,
            max_per_source: 0,
            items: vec![],
        }
    }
}

/// Terms of the MMR objective for one selection step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MmrComponents {
    pub lambda_rel: f64,
    pub redundancy: f64,
    pub penalties_total: f64,
}

/// Why an item landed where it did in the diversified list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityExplanation {
    pub lambda: f64,
    pub diversity_level: f64,
    pub rel: f64,
    pub max_sim_to_selected: f64,
    pub pen_source_count: usize,
    pub pen_category_count: usize,
    pub pen_language_count: usize,
    pub gamma_source: f64,
    pub gamma_category: f64,
    pub gamma_language: f64,
    pub hard_cap_max_per_source: usize,
    pub hard_cap_blocked: bool,
    pub relevance_percentile: f64,
    pub mmr_components: MmrComponents,
    pub reason: crate::explain::DiversityReason,
    pub message: String,
}

/// One log-odds contribution surfaced to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub contribution: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelevanceExplanation {
    Available {
        intercept: f64,
        top_positive: Vec<FeatureContribution>,
        top_negative: Vec<FeatureContribution>,
        age_seconds: Option<f64>,
        old_threshold_seconds: f64,
    },
    Unavailable {
        reasons: Vec<FeatureContribution>,
        note: String,
    },
}

impl RelevanceExplanation {
    pub fn unavailable() -> Self {
        Self::Unavailable {
            reasons: vec![],
            note: "explainability_not_available".to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Rerank request plus evaluation knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    #[serde(flatten)]
    pub rerank: RerankRequest,
    #[serde(default)]
    pub redundancy_threshold: Option<f64>,
}

/// Diversity of the reranked list next to a relevance-only top-k
#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    pub with_mmr: crate::metrics::ListMetrics,
    pub without_mmr: crate::metrics::ListMetrics,
    pub relevance_with_mmr: crate::metrics::RelevanceStats,
    pub relevance_without_mmr: crate::metrics::RelevanceStats,
    pub rerank: RerankResponse,
}
