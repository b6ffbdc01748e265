// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod tokenize;
pub mod sparse;
pub mod corpus;
pub mod vectorize;
pub mod lexicon;
pub mod sentiment;
pub mod cluster;
pub mod error;

// Adapters and run orchestration around the core
pub mod ingest;
pub mod analysis;
pub mod config;

// HTTP surface
pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cluster::{Clustering, Convergence, KMeans, KMeansConfig};
pub use crate::corpus::{Corpus, CorpusStats, Document, Review};
pub use crate::error::AnalysisError;
pub use crate::lexicon::Lexicon;
pub use crate::sparse::SparseVector;

use tracing::info;

/// Build the full router from config on disk: loads `InsightsConfig` and the
/// lexicon it points at, and serves `/metrics`. Used by the binary and by tests
/// that want the real wiring.
pub fn app() -> anyhow::Result<axum::Router> {
    let config = config::InsightsConfig::load()?;
    let lexicon = Lexicon::load_from_file(&config.lexicon.path)?;
    let metrics = metrics::Metrics::init(lexicon.len())?;
    info!(
        k = config.clustering.k,
        sample_size = ?config.clustering.sample_size,
        seed = ?config.clustering.seed,
        "insights app configured"
    );
    Ok(create_router(AppState::new(lexicon, config)).merge(metrics.router()))
}
