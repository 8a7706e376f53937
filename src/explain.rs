//! Explanations for selection decisions and relevance scores
//!
//! Diversity attribution is a fixed decision table evaluated top to bottom;
//! the first matching guard names the reason. It is informational only and
//! never feeds back into selection.

use crate::params::MmrParams;
use crate::selection::SelectionStep;
use crate::types::{DiversityExplanation, FeatureContribution, RelevanceExplanation};
use serde::{Deserialize, Serialize};

const HIGH_REL_PCT: f64 = 0.70;
const LOW_REL_PCT: f64 = 0.35;
/// max_sim at or below this counts as novel content
const LOW_REDUNDANCY: f64 = 0.55;

/// Articles older than this may be labelled as old
pub const OLD_THRESHOLD_SECONDS: f64 = 3.0 * 24.0 * 3600.0;

const TOP_POSITIVE: usize = 3;
const TOP_NEGATIVE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiversityReason {
    HighRelevance,
    DiversityDespiteLowRelevance,
    DiversityPenalties,
    ReduceRepetition,
    Balanced,
    HardCapFallback,
}

impl DiversityReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::HighRelevance => "Selected mainly for high relevance to your interests.",
            Self::DiversityDespiteLowRelevance => {
                "Lower relevance, but selected to increase diversity and reduce repetition."
            }
            Self::DiversityPenalties => {
                "Selected to satisfy diversity penalties (source/category/language)."
            }
            Self::ReduceRepetition => "Selected mainly to reduce repetition in the list.",
            Self::Balanced => "Balanced choice between relevance and diversity.",
            Self::HardCapFallback => {
                "Hard cap blocked remaining sources; fell back to max relevance among remaining."
            }
        }
    }
}

/// Attribute one selection step to its dominant driver
pub fn classify(step: &SelectionStep) -> DiversityReason {
    if step.hard_cap_fallback {
        return DiversityReason::HardCapFallback;
    }

    let c = &step.components;
    let guards: [(bool, DiversityReason); 4] = [
        (
            step.relevance_percentile >= HIGH_REL_PCT
                && c.lambda_rel >= c.redundancy + c.penalties_total,
            DiversityReason::HighRelevance,
        ),
        (
            step.relevance_percentile <= LOW_REL_PCT && step.max_sim <= LOW_REDUNDANCY,
            DiversityReason::DiversityDespiteLowRelevance,
        ),
        (
            c.penalties_total > c.lambda_rel && c.penalties_total > c.redundancy,
            DiversityReason::DiversityPenalties,
        ),
        (c.redundancy >= c.lambda_rel, DiversityReason::ReduceRepetition),
    ];

    guards
        .into_iter()
        .find(|(hit, _)| *hit)
        .map(|(_, reason)| reason)
        .unwrap_or(DiversityReason::Balanced)
}

pub fn explain_diversity(step: &SelectionStep, params: &MmrParams) -> DiversityExplanation {
    let reason = classify(step);
    DiversityExplanation {
        lambda: params.lambda,
        diversity_level: params.diversity_level,
        rel: step.relevance,
        max_sim_to_selected: step.max_sim,
        pen_source_count: step.source_count,
        pen_category_count: step.category_count,
        pen_language_count: step.language_count,
        gamma_source: params.gamma_source,
        gamma_category: params.gamma_category,
        gamma_language: params.gamma_language,
        hard_cap_max_per_source: params.max_per_source,
        hard_cap_blocked: step.hard_cap_fallback,
        relevance_percentile: step.relevance_percentile,
        mmr_components: step.components,
        reason,
        message: reason.message().to_string(),
    }
}

/// Build a relevance explanation from per-feature log-odds contributions.
///
/// `names` and `contributions` must be parallel; a length mismatch yields the
/// unavailable explanation rather than an error.
pub fn explain_relevance(
    names: &[String],
    contributions: &[f64],
    intercept: f64,
    age_seconds: Option<f64>,
) -> RelevanceExplanation {
    if names.len() != contributions.len() {
        tracing::warn!(
            "Feature names ({}) and contributions ({}) differ in length",
            names.len(),
            contributions.len()
        );
        return RelevanceExplanation::unavailable();
    }

    let is_old = age_seconds.map_or(false, |age| age > OLD_THRESHOLD_SECONDS);

    let mut order: Vec<usize> = (0..contributions.len()).collect();
    // stable sort keeps feature order among equal contributions
    order.sort_by(|&a, &b| contributions[a].total_cmp(&contributions[b]));

    let top_positive = order
        .iter()
        .rev()
        .filter(|&&i| contributions[i] > 0.0)
        .take(TOP_POSITIVE)
        .map(|&i| FeatureContribution {
            feature: names[i].clone(),
            contribution: contributions[i],
            text: humanize_positive(&names[i]),
        })
        .collect();

    let top_negative = order
        .iter()
        .filter(|&&i| contributions[i] < 0.0)
        .filter_map(|&i| {
            humanize_negative(&names[i], is_old).map(|text| FeatureContribution {
                feature: names[i].clone(),
                contribution: contributions[i],
                text,
            })
        })
        .take(TOP_NEGATIVE)
        .collect();

    RelevanceExplanation::Available {
        intercept,
        top_positive,
        top_negative,
        age_seconds,
        old_threshold_seconds: OLD_THRESHOLD_SECONDS,
    }
}

fn humanize_positive(name: &str) -> String {
    if name.contains("cosine_similarity") {
        return "High semantic similarity to your profile".to_string();
    }
    if name.contains("hours_since_publish") {
        return "Recent article".to_string();
    }
    if let Some((_, s)) = name.split_once("cat__source_") {
        return format!("Source preference: {}", s);
    }
    if let Some((_, c)) = name.split_once("cat__category_") {
        return format!("Category preference: {}", c);
    }
    name.to_string()
}

/// `None` drops the reason entirely (recency only counts against old articles)
fn humanize_negative(name: &str, is_old: bool) -> Option<String> {
    if name.contains("cosine_similarity") {
        return Some("Low semantic similarity to your profile".to_string());
    }
    if name.contains("hours_since_publish") {
        return is_old.then(|| "Older article".to_string());
    }
    if let Some((_, s)) = name.split_once("cat__source_") {
        return Some(format!("Reduced interest in source: {}", s));
    }
    if let Some((_, c)) = name.split_once("cat__category_") {
        return Some(format!("Reduced interest in category: {}", c));
    }
    Some(name.to_string())
}
