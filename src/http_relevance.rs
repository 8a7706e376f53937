//! HTTP-based relevance source that calls a remote scoring service

use crate::relevance::RelevanceSource;
use crate::types::RelevanceFeatures;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to the scoring service
#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    rows: &'a [RelevanceFeatures],
}

/// Response from the scoring service
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    scores: Vec<f64>,
    #[serde(default)]
    model: Option<String>,
}

pub struct HttpRelevanceSource {
    service_url: String,
    client: reqwest::Client,
}

impl HttpRelevanceSource {
    pub fn new(service_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build relevance HTTP client")?;
        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn score_url(&self) -> String {
        format!("{}/score", self.service_url)
    }
}

#[async_trait]
impl RelevanceSource for HttpRelevanceSource {
    fn name(&self) -> &'static str {
        "http_relevance"
    }

    async fn score(&self, features: &[RelevanceFeatures]) -> Result<Vec<f64>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.score_url())
            .json(&ScoreRequest { rows: features })
            .send()
            .await
            .context("Failed to call relevance service")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Relevance service error ({}): {}", status, error_text);
        }

        let body: ScoreResponse = response
            .json()
            .await
            .context("Failed to parse relevance service response")?;

        if body.scores.len() != features.len() {
            anyhow::bail!(
                "Relevance service returned {} scores for {} rows",
                body.scores.len(),
                features.len()
            );
        }

        tracing::debug!(
            "Relevance service scored {} rows (model={:?})",
            body.scores.len(),
            body.model
        );

        Ok(body.scores)
    }
}
