use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analysis::{self, CorpusReport};
use crate::config::InsightsConfig;
use crate::corpus::{Corpus, Review};
use crate::lexicon::Lexicon;
use crate::sentiment::{explain, Explanation};
use crate::tokenize::tokenize;

#[derive(Clone)]
pub struct AppState {
    pub lexicon: Arc<Lexicon>,
    pub config: Arc<InsightsConfig>,
}

impl AppState {
    pub fn new(lexicon: Lexicon, config: InsightsConfig) -> Self {
        Self {
            lexicon: Arc::new(lexicon),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/score", post(score))
        .route("/analyze", post(analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct ScoreReq {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct ScoreResp {
    score: f64,
    tokens_count: usize,
    explanation: Explanation,
}

async fn score(State(state): State<AppState>, Json(body): Json<ScoreReq>) -> Json<ScoreResp> {
    let tokens = tokenize(body.text.as_deref());
    let explanation = explain(&tokens, &state.lexicon);
    Json(ScoreResp {
        score: explanation.total,
        tokens_count: tokens.len(),
        explanation,
    })
}

/// Corpus plus optional per-request overrides of the configured clustering.
#[derive(Deserialize)]
struct AnalyzeReq {
    reviews: Vec<Review>,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    sample_size: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    max_iterations: Option<usize>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<CorpusReport>, (StatusCode, String)> {
    let mut clustering = state.config.clustering.clone();
    if let Some(k) = body.k {
        clustering.k = k;
    }
    if let Some(n) = body.sample_size {
        clustering.sample_size = Some(n);
    }
    if let Some(s) = body.seed {
        clustering.seed = Some(s);
    }
    if let Some(m) = body.max_iterations {
        clustering.max_iterations = m;
    }

    let lexicon = state.lexicon.clone();
    let report_cfg = state.config.report.clone();
    let reviews = body.reviews;

    // CPU-bound batch; keep it off the async workers.
    let res = tokio::task::spawn_blocking(move || {
        let corpus = Corpus::new(reviews);
        let mut rng = match clustering.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        analysis::run(&corpus, &lexicon, &clustering, &report_cfg, &mut rng)
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "analysis task failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "analysis failed".to_string())
    })?;

    res.map(Json)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
}
