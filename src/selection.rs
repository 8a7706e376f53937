//! Greedy MMR selection with soft repetition penalties and a per-source hard cap

use crate::params::MmrParams;
use crate::similarity::SimilarityMatrix;
use crate::types::MmrComponents;
use std::collections::HashMap;

/// Grouping keys of one candidate; missing values are the empty string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLabels<'a> {
    pub source: &'a str,
    pub category: &'a str,
    pub language: &'a str,
}

/// One position of the output list with everything needed to explain it
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStep {
    pub index: usize,
    pub score: f64,
    pub relevance: f64,
    pub max_sim: f64,
    pub components: MmrComponents,
    /// Occurrence counts of this item's labels before it was picked
    pub source_count: usize,
    pub category_count: usize,
    pub language_count: usize,
    /// Rank of the item's relevance among the candidates still remaining, in (0, 1]
    pub relevance_percentile: f64,
    /// Picked by max relevance because every remaining source was capped
    pub hard_cap_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionOutcome {
    pub steps: Vec<SelectionStep>,
}

impl SelectionOutcome {
    pub fn indices(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.index).collect()
    }

    pub fn fallback_count(&self) -> usize {
        self.steps.iter().filter(|s| s.hard_cap_fallback).count()
    }
}

/// Mutable bookkeeping scoped to a single call
struct SelectionState<'a> {
    selected: Vec<usize>,
    remaining: Vec<usize>, // kept in input order for stable ties
    source_counts: HashMap<&'a str, usize>,
    category_counts: HashMap<&'a str, usize>,
    language_counts: HashMap<&'a str, usize>,
}

impl<'a> SelectionState<'a> {
    fn new(n: usize) -> Self {
        Self {
            selected: Vec::new(),
            remaining: (0..n).collect(),
            source_counts: HashMap::new(),
            category_counts: HashMap::new(),
            language_counts: HashMap::new(),
        }
    }

    fn counts(&self, labels: &ItemLabels<'a>) -> (usize, usize, usize) {
        (
            self.source_counts.get(labels.source).copied().unwrap_or(0),
            self.category_counts.get(labels.category).copied().unwrap_or(0),
            self.language_counts.get(labels.language).copied().unwrap_or(0),
        )
    }

    fn percentile(&self, relevance: &[f64], rel: f64) -> f64 {
        let at_or_below = self
            .remaining
            .iter()
            .filter(|&&j| relevance[j] <= rel)
            .count();
        at_or_below as f64 / self.remaining.len().max(1) as f64
    }

    fn commit(&mut self, step: &SelectionStep, labels: &ItemLabels<'a>) {
        self.selected.push(step.index);
        self.remaining.retain(|&j| j != step.index);
        *self.source_counts.entry(labels.source).or_insert(0) += 1;
        *self.category_counts.entry(labels.category).or_insert(0) += 1;
        *self.language_counts.entry(labels.language).or_insert(0) += 1;
    }
}

/// Select up to `k` candidates maximizing
/// `λ·rel − (1−λ)·max_sim − penalties`, one at a time.
///
/// `relevance`, `labels` and the similarity matrix must all describe the
/// same `N` candidates in the same order. Equal scores resolve to the lowest
/// input index.
pub fn select_mmr<'a>(
    relevance: &[f64],
    labels: &[ItemLabels<'a>],
    similarity: &SimilarityMatrix,
    k: usize,
    params: &MmrParams,
) -> SelectionOutcome {
    let n = relevance.len();
    debug_assert_eq!(labels.len(), n);
    debug_assert_eq!(similarity.len(), n);

    let target = k.min(n);
    let mut state: SelectionState<'a> = SelectionState::new(n);
    let mut steps = Vec::with_capacity(target);

    if target == 0 {
        return SelectionOutcome { steps };
    }

    let first = pick_first(relevance, &state, params);
    state.commit(&first, &labels[first.index]);
    steps.push(first);

    while steps.len() < target && !state.remaining.is_empty() {
        let step = match best_uncapped(relevance, labels, similarity, &state, params) {
            Some(step) => step,
            None => {
                let step = fallback_max_relevance(relevance, labels, similarity, &state, params);
                tracing::debug!(
                    "Hard cap blocked all {} remaining candidates; fell back to index {}",
                    state.remaining.len(),
                    step.index
                );
                step
            }
        };
        state.commit(&step, &labels[step.index]);
        steps.push(step);
    }

    SelectionOutcome { steps }
}

/// Highest relevance overall; nothing is selected yet, so no redundancy or penalty
fn pick_first(relevance: &[f64], state: &SelectionState<'_>, params: &MmrParams) -> SelectionStep {
    let index = argmax_first(state.remaining.iter().map(|&i| (i, relevance[i])))
        .unwrap_or(0);
    let rel = relevance[index];
    let lambda_rel = params.lambda * rel;

    SelectionStep {
        index,
        score: lambda_rel,
        relevance: rel,
        max_sim: 0.0,
        components: MmrComponents {
            lambda_rel,
            redundancy: 0.0,
            penalties_total: 0.0,
        },
        source_count: 0,
        category_count: 0,
        language_count: 0,
        relevance_percentile: state.percentile(relevance, rel),
        hard_cap_fallback: false,
    }
}

fn best_uncapped<'a>(
    relevance: &[f64],
    labels: &[ItemLabels<'a>],
    similarity: &SimilarityMatrix,
    state: &SelectionState<'a>,
    params: &MmrParams,
) -> Option<SelectionStep> {
    let mut best: Option<SelectionStep> = None;

    for &i in &state.remaining {
        let (src, cat, lang) = state.counts(&labels[i]);
        if src >= params.max_per_source {
            continue;
        }

        let max_sim = similarity.max_sim_to(i, &state.selected);
        let components = MmrComponents {
            lambda_rel: params.lambda * relevance[i],
            redundancy: (1.0 - params.lambda) * max_sim,
            penalties_total: params.penalty(src, cat, lang),
        };
        let score = components.lambda_rel - components.redundancy - components.penalties_total;

        // strict comparison keeps the earliest index on ties
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(SelectionStep {
                index: i,
                score,
                relevance: relevance[i],
                max_sim,
                components,
                source_count: src,
                category_count: cat,
                language_count: lang,
                relevance_percentile: 0.0,
                hard_cap_fallback: false,
            });
        }
    }

    best.map(|mut step| {
        step.relevance_percentile = state.percentile(relevance, step.relevance);
        step
    })
}

/// Every remaining source is at its cap: ignore the cap and take max relevance
fn fallback_max_relevance<'a>(
    relevance: &[f64],
    labels: &[ItemLabels<'a>],
    similarity: &SimilarityMatrix,
    state: &SelectionState<'a>,
    params: &MmrParams,
) -> SelectionStep {
    let index = argmax_first(state.remaining.iter().map(|&i| (i, relevance[i])))
        .unwrap_or(state.remaining[0]);
    let rel = relevance[index];
    let (src, cat, lang) = state.counts(&labels[index]);
    let max_sim = similarity.max_sim_to(index, &state.selected);
    let lambda_rel = params.lambda * rel;

    SelectionStep {
        index,
        score: lambda_rel,
        relevance: rel,
        max_sim,
        components: MmrComponents {
            lambda_rel,
            redundancy: (1.0 - params.lambda) * max_sim,
            penalties_total: params.penalty(src, cat, lang),
        },
        source_count: src,
        category_count: cat,
        language_count: lang,
        relevance_percentile: state.percentile(relevance, rel),
        hard_cap_fallback: true,
    }
}

/// Index of the maximum value; first occurrence wins
fn argmax_first(values: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_occurrence() {
        let vals = vec![(0, 0.2), (1, 0.9), (2, 0.9), (3, 0.1)];
        assert_eq!(argmax_first(vals.into_iter()), Some(1));
        assert_eq!(argmax_first(std::iter::empty()), None);
    }
}
