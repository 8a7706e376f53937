//! Relevance sources: per-candidate probability that an article matches the user

use crate::error::{RerankError, Result as RerankResult};
use crate::explain::explain_relevance;
use crate::types::{RelevanceExplanation, RelevanceFeatures};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Trait for pluggable relevance scorers
#[async_trait]
pub trait RelevanceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// One probability in [0, 1] per feature row, same order
    async fn score(&self, features: &[RelevanceFeatures]) -> Result<Vec<f64>>;

    /// Log-odds attribution, when the model internals are known
    fn explain(
        &self,
        _features: &RelevanceFeatures,
        _age_seconds: Option<f64>,
    ) -> Option<RelevanceExplanation> {
        None
    }
}

/// Uses the profile similarity feature directly as relevance
pub struct SimilarityRelevance;

#[async_trait]
impl RelevanceSource for SimilarityRelevance {
    fn name(&self) -> &'static str {
        "profile_similarity"
    }

    async fn score(&self, features: &[RelevanceFeatures]) -> Result<Vec<f64>> {
        Ok(features.iter().map(|f| f.cosine_similarity).collect())
    }
}

/// Serialized logistic regression over one-hot + passthrough features
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Training-time categories folded into the `infrequent_sklearn` column,
    /// keyed by column name (`source`, `category`)
    #[serde(default)]
    pub infrequent_categories: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
enum TransformedFeature {
    CosineSimilarity,
    HoursSincePublish,
    Source(String),
    SourceInfrequent,
    Category(String),
    CategoryInfrequent,
}

impl TransformedFeature {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "num__cosine_similarity" => return Some(Self::CosineSimilarity),
            "num__hours_since_publish" => return Some(Self::HoursSincePublish),
            "cat__source_infrequent_sklearn" => return Some(Self::SourceInfrequent),
            "cat__category_infrequent_sklearn" => return Some(Self::CategoryInfrequent),
            _ => {}
        }
        if let Some(s) = name.strip_prefix("cat__source_") {
            return Some(Self::Source(s.to_string()));
        }
        name.strip_prefix("cat__category_")
            .map(|c| Self::Category(c.to_string()))
    }
}

/// Local logistic-regression ranker loaded from a JSON artifact
#[derive(Debug, Clone)]
pub struct LogisticRanker {
    names: Vec<String>,
    features: Vec<TransformedFeature>,
    coefficients: Vec<f64>,
    intercept: f64,
    infrequent_sources: Vec<String>,
    infrequent_categories: Vec<String>,
}

impl LogisticRanker {
    pub fn load(path: impl AsRef<Path>) -> RerankResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .map_err(|e| RerankError::ModelLoad(format!("{:#}", e)))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| RerankError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(mut artifact: ModelArtifact) -> RerankResult<Self> {
        if artifact.feature_names.len() != artifact.coefficients.len() {
            return Err(RerankError::ModelLoad(format!(
                "{} feature names but {} coefficients",
                artifact.feature_names.len(),
                artifact.coefficients.len()
            )));
        }
        if artifact.feature_names.is_empty() {
            return Err(RerankError::ModelLoad("model has no features".to_string()));
        }

        let features = artifact
            .feature_names
            .iter()
            .map(|name| {
                TransformedFeature::parse(name).ok_or_else(|| {
                    RerankError::ModelLoad(format!("unrecognized feature name '{}'", name))
                })
            })
            .collect::<RerankResult<Vec<_>>>()?;

        Ok(Self {
            names: artifact.feature_names,
            features,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            infrequent_sources: artifact
                .infrequent_categories
                .remove("source")
                .unwrap_or_default(),
            infrequent_categories: artifact
                .infrequent_categories
                .remove("category")
                .unwrap_or_default(),
        })
    }

    /// Dense transformed feature vector; unknown categories encode as all zeros
    fn transform(&self, f: &RelevanceFeatures) -> Vec<f64> {
        let indicator = |hit: bool| if hit { 1.0 } else { 0.0 };
        self.features
            .iter()
            .map(|feat| match feat {
                TransformedFeature::CosineSimilarity => f.cosine_similarity,
                TransformedFeature::HoursSincePublish => f.hours_since_publish,
                TransformedFeature::Source(s) => indicator(*s == f.source),
                TransformedFeature::SourceInfrequent => {
                    indicator(self.infrequent_sources.contains(&f.source))
                }
                TransformedFeature::Category(c) => indicator(*c == f.category),
                TransformedFeature::CategoryInfrequent => {
                    indicator(self.infrequent_categories.contains(&f.category))
                }
            })
            .collect()
    }

    fn contributions(&self, f: &RelevanceFeatures) -> Vec<f64> {
        self.transform(f)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .collect()
    }

    pub fn predict(&self, f: &RelevanceFeatures) -> f64 {
        let logit = self.intercept + self.contributions(f).iter().sum::<f64>();
        sigmoid(logit)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[async_trait]
impl RelevanceSource for LogisticRanker {
    fn name(&self) -> &'static str {
        "logistic_ranker"
    }

    async fn score(&self, features: &[RelevanceFeatures]) -> Result<Vec<f64>> {
        Ok(features.iter().map(|f| self.predict(f)).collect())
    }

    fn explain(
        &self,
        features: &RelevanceFeatures,
        age_seconds: Option<f64>,
    ) -> Option<RelevanceExplanation> {
        Some(explain_relevance(
            &self.names,
            &self.contributions(features),
            self.intercept,
            age_seconds,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature_names() {
        assert_eq!(
            TransformedFeature::parse("cat__source_infrequent_sklearn"),
            Some(TransformedFeature::SourceInfrequent)
        );
        assert_eq!(
            TransformedFeature::parse("cat__category_sports"),
            Some(TransformedFeature::Category("sports".to_string()))
        );
        assert_eq!(TransformedFeature::parse("num__word_count"), None);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }
}
