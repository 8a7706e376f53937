//! RerankEngine: validates a request, scores relevance, and runs diversified selection

use crate::error::{RerankError, Result};
use crate::explain::explain_diversity;
use crate::metrics::{list_metrics, relevance_baseline, relevance_stats, DEFAULT_REDUNDANCY_THRESHOLD};
use crate::params::MmrParams;
use crate::relevance::RelevanceSource;
use crate::selection::{select_mmr, ItemLabels, SelectionOutcome};
use crate::similarity::SimilarityMatrix;
use crate::types::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Request bounds enforced before any ranking work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestLimits {
    pub default_k: usize,
    pub max_k: usize,
    /// Upper bound on N; similarity work grows with its square
    pub max_candidates: usize,
    pub embedding_dim: Option<usize>,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_k: 50,
            max_k: 200,
            max_candidates: 1000,
            embedding_dim: None,
        }
    }
}

/// Main rerank engine (thread-safe via Arc, no per-call state)
pub struct RerankEngine {
    pub relevance: Box<dyn RelevanceSource>,
    pub limits: RequestLimits,
}

pub type SharedRerankEngine = Arc<RerankEngine>;

/// Validated request with one relevance score per candidate
struct Scored<'a> {
    k: usize,
    params: MmrParams,
    candidates: &'a [Candidate],
    features: Vec<Option<RelevanceFeatures>>,
    /// Candidates whose relevance came from the configured source
    model_scored: Vec<bool>,
    relevance: Vec<f64>,
}

impl RerankEngine {
    pub fn new(relevance: Box<dyn RelevanceSource>, limits: RequestLimits) -> SharedRerankEngine {
        Arc::new(Self { relevance, limits })
    }

    /// Engine with default request limits
    pub fn new_simple(relevance: Box<dyn RelevanceSource>) -> SharedRerankEngine {
        Self::new(relevance, RequestLimits::default())
    }

    /// Main entry point: diversify a scored candidate list
    pub async fn rerank(&self, req: &RerankRequest) -> Result<RerankResponse> {
        let start = Instant::now();

        info!(
            "Reranking: {} candidates, diversity_level={}, k={:?}, relevance={}",
            req.candidates.len(),
            req.diversity_level,
            req.k,
            self.relevance.name()
        );

        let scored = match self.score(req).await? {
            Some(scored) => scored,
            None => return Ok(RerankResponse::empty()),
        };

        let (response, _) = self.rank(&scored).await?;

        info!(
            "Rerank complete: {} items, lambda={:.2}, max_per_source={} ({} ms)",
            response.items.len(),
            response.lambda_mmr,
            response.max_per_source,
            start.elapsed().as_millis()
        );

        Ok(response)
    }

    /// Rerank, then measure diversity against a relevance-only top-k
    pub async fn compare(&self, req: &CompareRequest) -> Result<CompareResponse> {
        let threshold = req
            .redundancy_threshold
            .unwrap_or(DEFAULT_REDUNDANCY_THRESHOLD);
        if !threshold.is_finite() {
            return Err(RerankError::InvalidInput(
                "redundancy_threshold must be finite".to_string(),
            ));
        }

        let scored = match self.score(&req.rerank).await? {
            Some(scored) => scored,
            None => {
                return Ok(CompareResponse {
                    with_mmr: Default::default(),
                    without_mmr: Default::default(),
                    relevance_with_mmr: Default::default(),
                    relevance_without_mmr: Default::default(),
                    rerank: RerankResponse::empty(),
                })
            }
        };

        let (rerank, mmr_ids) = self.rank(&scored).await?;

        let pick = |ids: &[usize]| -> Vec<&Candidate> {
            ids.iter().map(|&i| &scored.candidates[i]).collect()
        };
        let rels = |ids: &[usize]| -> Vec<f64> { ids.iter().map(|&i| scored.relevance[i]).collect() };

        let baseline_ids = relevance_baseline(&scored.relevance, scored.k);

        Ok(CompareResponse {
            with_mmr: list_metrics(&pick(&mmr_ids), threshold),
            without_mmr: list_metrics(&pick(&baseline_ids), threshold),
            relevance_with_mmr: relevance_stats(&rels(&mmr_ids)),
            relevance_without_mmr: relevance_stats(&rels(&baseline_ids)),
            rerank,
        })
    }

    /// Validate and score; `None` for an empty candidate list
    async fn score<'a>(&self, req: &'a RerankRequest) -> Result<Option<Scored<'a>>> {
        let k = self.validate_scalars(req)?;
        if req.candidates.is_empty() {
            debug!("Empty candidate list; returning empty result");
            return Ok(None);
        }
        if req.candidates.len() > self.limits.max_candidates {
            return Err(RerankError::InvalidInput(format!(
                "at most {} candidates per request, got {}",
                self.limits.max_candidates,
                req.candidates.len()
            )));
        }
        self.validate_candidates(&req.candidates)?;

        let features: Vec<Option<RelevanceFeatures>> = req
            .candidates
            .iter()
            .map(|c| match (c.distance, c.age_seconds) {
                (Some(d), Some(age)) => Some(RelevanceFeatures::derive(
                    d,
                    age,
                    c.source_key(),
                    c.category_key(),
                )),
                _ => None,
            })
            .collect();

        let model_scored: Vec<bool> = req.candidates.iter().map(|c| c.rel_score.is_none()).collect();
        let relevance = self.score_relevance(&req.candidates, &features, &model_scored).await?;

        Ok(Some(Scored {
            k,
            params: MmrParams::from_diversity_level(req.diversity_level),
            candidates: &req.candidates,
            features,
            model_scored,
            relevance,
        }))
    }

    fn validate_scalars(&self, req: &RerankRequest) -> Result<usize> {
        if !(0.0..=1.0).contains(&req.diversity_level) {
            return Err(RerankError::InvalidInput(format!(
                "diversity_level must be in [0, 1], got {}",
                req.diversity_level
            )));
        }

        let k = req.k.unwrap_or(self.limits.default_k);
        if k == 0 || k > self.limits.max_k {
            return Err(RerankError::InvalidInput(format!(
                "k must be in 1..={}, got {}",
                self.limits.max_k, k
            )));
        }
        Ok(k)
    }

    fn validate_candidates(&self, candidates: &[Candidate]) -> Result<()> {
        let expected_dim = self
            .limits
            .embedding_dim
            .unwrap_or_else(|| candidates[0].embedding.len());

        for c in candidates {
            let id = c.article_id;
            let dim = c.embedding.len();

            if dim < MIN_EMBEDDING_DIM {
                return Err(RerankError::InvalidInput(format!(
                    "embedding for article_id={} has length {}, need at least {}",
                    id, dim, MIN_EMBEDDING_DIM
                )));
            }
            if dim != expected_dim {
                return Err(RerankError::InvalidInput(format!(
                    "embedding for article_id={} has length {}, expected {}",
                    id, dim, expected_dim
                )));
            }
            if c.embedding.iter().any(|x| !x.is_finite()) {
                return Err(RerankError::InvalidInput(format!(
                    "embedding for article_id={} contains non-finite values",
                    id
                )));
            }

            if let Some(rel) = c.rel_score {
                if !(0.0..=1.0).contains(&rel) {
                    return Err(RerankError::InvalidInput(format!(
                        "rel_score for article_id={} must be in [0, 1], got {}",
                        id, rel
                    )));
                }
                continue;
            }

            let distance = c.distance.ok_or_else(|| {
                RerankError::InvalidInput(format!(
                    "Missing 'distance' for article_id={}. Candidate list must provide profile distance.",
                    id
                ))
            })?;
            let age = c.age_seconds.ok_or_else(|| {
                RerankError::InvalidInput(format!(
                    "Missing 'age_seconds' for article_id={}. Candidate list must provide age_seconds.",
                    id
                ))
            })?;
            if !(distance.is_finite() && distance >= 0.0) {
                return Err(RerankError::InvalidInput(format!(
                    "distance for article_id={} must be a non-negative number, got {}",
                    id, distance
                )));
            }
            if !(age.is_finite() && age >= 0.0) {
                return Err(RerankError::InvalidInput(format!(
                    "age_seconds for article_id={} must be a non-negative number, got {}",
                    id, age
                )));
            }
        }

        Ok(())
    }

    /// Precomputed scores pass through; the rest go to the relevance source in one batch
    async fn score_relevance(
        &self,
        candidates: &[Candidate],
        features: &[Option<RelevanceFeatures>],
        model_scored: &[bool],
    ) -> Result<Vec<f64>> {
        let pending: Vec<usize> = (0..candidates.len()).filter(|&i| model_scored[i]).collect();
        let rows: Vec<RelevanceFeatures> = pending
            .iter()
            .filter_map(|&i| features[i].clone())
            .collect();

        let scores = if rows.is_empty() {
            Vec::new()
        } else {
            self.relevance.score(&rows).await.map_err(|e| {
                tracing::error!("Relevance source '{}' failed: {:?}", self.relevance.name(), e);
                RerankError::Relevance(format!("{:#}", e))
            })?
        };

        if scores.len() != pending.len() {
            return Err(RerankError::Relevance(format!(
                "expected {} scores, got {}",
                pending.len(),
                scores.len()
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(RerankError::Relevance(format!(
                "score {} is not a probability",
                bad
            )));
        }

        let mut relevance: Vec<f64> = candidates.iter().map(|c| c.rel_score.unwrap_or(0.0)).collect();
        for (&i, s) in pending.iter().zip(scores) {
            relevance[i] = s;
        }
        Ok(relevance)
    }

    /// Similarity matrix and greedy selection, off the async workers.
    ///
    /// The work is O(N²·d), so it runs on the blocking pool and the caller's
    /// timeout can fire while it is in flight.
    async fn select(&self, scored: &Scored<'_>) -> Result<SelectionOutcome> {
        let embeddings: Vec<Vec<f64>> = scored.candidates.iter().map(|c| c.embedding.clone()).collect();
        let keys: Vec<[String; 3]> = scored
            .candidates
            .iter()
            .map(|c| {
                [
                    c.source_key().to_string(),
                    c.category_key().to_string(),
                    c.language_key().to_string(),
                ]
            })
            .collect();
        let relevance = scored.relevance.clone();
        let (k, params) = (scored.k, scored.params);

        tokio::task::spawn_blocking(move || {
            let similarity = SimilarityMatrix::from_embeddings(&embeddings);
            let labels: Vec<ItemLabels<'_>> = keys
                .iter()
                .map(|[source, category, language]| ItemLabels {
                    source: source.as_str(),
                    category: category.as_str(),
                    language: language.as_str(),
                })
                .collect();
            select_mmr(&relevance, &labels, &similarity, k, &params)
        })
        .await
        .map_err(|e| RerankError::Internal(format!("selection task failed: {}", e)))
    }

    /// Selected candidate indices are returned alongside the response, in rank order
    async fn rank(&self, scored: &Scored<'_>) -> Result<(RerankResponse, Vec<usize>)> {
        let candidates = scored.candidates;
        let params = scored.params;

        let outcome = self.select(scored).await?;

        let fallbacks = outcome.fallback_count();
        if fallbacks > 0 {
            warn!(
                "Hard cap of {} per source exhausted every source; {} items chosen by relevance fallback",
                params.max_per_source, fallbacks
            );
        }

        let items = outcome
            .steps
            .iter()
            .enumerate()
            .map(|(pos, step)| {
                let cand = &candidates[step.index];
                RankedItem {
                    article_id: cand.article_id,
                    rank: pos + 1,
                    mmr_score: step.score,
                    rel_score: step.relevance,
                    source: cand.source.clone(),
                    category: cand.category.clone(),
                    language: cand.language.clone(),
                    title: cand.title.clone(),
                    explain_relevance: Some(self.relevance_explanation(scored, step.index)),
                    explain_diversity: Some(explain_diversity(step, &params)),
                }
            })
            .collect();

        let response = RerankResponse {
            lambda_mmr: params.lambda,
            max_per_source: params.max_per_source,
            items,
        };
        Ok((response, outcome.indices()))
    }

    fn relevance_explanation(&self, scored: &Scored<'_>, index: usize) -> RelevanceExplanation {
        if !scored.model_scored[index] {
            return RelevanceExplanation::unavailable();
        }
        scored.features[index]
            .as_ref()
            .and_then(|f| {
                self.relevance
                    .explain(f, scored.candidates[index].age_seconds)
            })
            .unwrap_or_else(RelevanceExplanation::unavailable)
    }
}
