//! newsrank - diversity-aware news reranking
//!
//! Re-orders relevance-scored candidates to balance relevance against
//! topical, source, and language diversity:
//! - One diversity slider mapped onto MMR tunables
//! - Cosine redundancy over content embeddings
//! - Greedy MMR selection with soft penalties and a per-source hard cap
//! - Per-item explanations of relevance and diversity

pub mod types;
pub mod params;
pub mod similarity;
pub mod selection;
pub mod explain;
pub mod relevance;
pub mod http_relevance;
pub mod metrics;
pub mod engine;
pub mod error;
pub mod config;
pub mod server;

pub use types::*;
pub use params::MmrParams;
pub use engine::{RerankEngine, RequestLimits, SharedRerankEngine};
pub use error::RerankError;
pub use config::ServiceConfig;
pub use relevance::{LogisticRanker, ModelArtifact, RelevanceSource, SimilarityRelevance};
pub use http_relevance::HttpRelevanceSource;
