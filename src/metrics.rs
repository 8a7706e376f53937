//! Offline diversity metrics for comparing a reranked list against a
//! relevance-only baseline

use crate::similarity::{normalize_rows, cosine_similarity};
use crate::types::Candidate;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_REDUNDANCY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListMetrics {
    /// Intra-list diversity: mean of (1 - cosine) over all pairs
    pub ild: f64,
    pub avg_cosine_sim: f64,
    /// Share of pairs at or above the redundancy threshold
    pub redundancy_rate: f64,
    pub unique_sources: usize,
    pub source_entropy: f64,
    pub unique_categories: usize,
    pub category_entropy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelevanceStats {
    pub avg_rel: f64,
    pub min_rel: f64,
    pub max_rel: f64,
}

/// Upper-triangle pairwise cosine similarities
fn pairwise_sims(embeddings: &[Vec<f64>]) -> Vec<f64> {
    let normed = normalize_rows(embeddings);
    let mut sims = Vec::new();
    for i in 0..normed.len() {
        for j in (i + 1)..normed.len() {
            sims.push(cosine_similarity(&normed[i], &normed[j]));
        }
    }
    sims
}

/// Shannon entropy (natural log) of a label distribution
pub fn entropy<'a>(labels: impl IntoIterator<Item = &'a str>) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.ln()
        })
        .sum()
}

pub fn list_metrics(items: &[&Candidate], redundancy_threshold: f64) -> ListMetrics {
    if items.is_empty() {
        return ListMetrics::default();
    }

    let embeddings: Vec<Vec<f64>> = items.iter().map(|c| c.embedding.clone()).collect();
    let sims = pairwise_sims(&embeddings);

    let (avg_cosine_sim, ild, redundancy_rate) = if sims.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let n = sims.len() as f64;
        let avg = sims.iter().sum::<f64>() / n;
        let redundant = sims.iter().filter(|&&s| s >= redundancy_threshold).count() as f64;
        (avg, 1.0 - avg, redundant / n)
    };

    let sources: Vec<&str> = items.iter().map(|c| c.source_key()).collect();
    let categories: Vec<&str> = items.iter().map(|c| c.category_key()).collect();

    ListMetrics {
        ild,
        avg_cosine_sim,
        redundancy_rate,
        unique_sources: unique(&sources),
        source_entropy: entropy(sources.iter().copied()),
        unique_categories: unique(&categories),
        category_entropy: entropy(categories.iter().copied()),
    }
}

fn unique(labels: &[&str]) -> usize {
    let mut seen: Vec<&str> = labels.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

pub fn relevance_stats(scores: &[f64]) -> RelevanceStats {
    if scores.is_empty() {
        return RelevanceStats::default();
    }
    RelevanceStats {
        avg_rel: scores.iter().sum::<f64>() / scores.len() as f64,
        min_rel: scores.iter().copied().fold(f64::INFINITY, f64::min),
        max_rel: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Top-k indices by relevance alone; ties keep input order
pub fn relevance_baseline(relevance: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..relevance.len()).collect();
    order.sort_by(|&a, &b| relevance[b].total_cmp(&relevance[a]));
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_uniform_two() {
        let e = entropy(["a", "b", "a", "b"]);
        assert!((e - std::f64::consts::LN_2).abs() < 1e-5);
        assert_eq!(entropy(["x", "x"]), 0.0);
        assert_eq!(entropy(std::iter::empty::<&str>()), 0.0);
    }

    #[test]
    fn test_baseline_is_stable() {
        assert_eq!(relevance_baseline(&[0.5, 0.9, 0.5, 0.1], 3), vec![1, 0, 2]);
    }
}
