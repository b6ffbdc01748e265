// src/analysis.rs
//! Batch analysis run over one corpus snapshot.
//!
//! Order:
//! 1) validate clustering parameters against the eligible corpus
//! 2) corpus statistics, built once
//! 3) sentiment per document + per-rating summary
//! 4) uniform sample → TF-IDF vectors → k-means
//! 5) per-cluster report (centroid terms, average rating, previews)

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cluster::{KMeans, KMeansConfig};
use crate::config::{ClusteringSection, ReportSection};
use crate::corpus::{Corpus, CorpusStats, Document, IdfExtremes};
use crate::error::AnalysisError;
use crate::lexicon::Lexicon;
use crate::sentiment::{score_corpus, summarize_by_rating, RatingSummary};
use crate::sparse::SparseVector;
use crate::vectorize::tf_idf_batch;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("insights_runs_total", "Completed corpus analysis runs.");
        describe_counter!("insights_reviews_scored_total", "Eligible reviews scored.");
        describe_counter!(
            "insights_kmeans_converged_total",
            "K-means runs that stopped on unchanged centroids."
        );
        describe_histogram!("insights_kmeans_iterations", "K-means iterations per run.");
    });
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusReport {
    pub documents: usize,
    pub eligible: usize,
    pub vocabulary: usize,
    pub idf: IdfExtremes,
    /// Per document, in corpus order; `None` for missing/blank text.
    pub scores: Vec<Option<f64>>,
    pub ratings: Vec<RatingSummary>,
    pub clustering: ClusteringReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub sample_size: usize,
    pub iterations: usize,
    pub converged: bool,
    pub clusters: Vec<ClusterReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub label: usize,
    pub size: usize,
    /// Corpus positions of the members.
    pub members: Vec<usize>,
    /// Mean star rating of rated members; `None` when no member is rated.
    pub average_rating: Option<f64>,
    /// Member count per source label; unlabelled members are not counted.
    pub sources: BTreeMap<String, usize>,
    pub top_terms: Vec<(String, f64)>,
    pub centroid: SparseVector,
    pub preview: Vec<String>,
}

/// Check parameters against the eligible count. Returns the effective sample size.
pub fn validate(clustering: &ClusteringSection, eligible: usize) -> Result<usize, AnalysisError> {
    let sample = clustering.sample_size.unwrap_or(eligible);
    if sample > eligible {
        return Err(AnalysisError::SampleTooLarge {
            requested: sample,
            eligible,
        });
    }
    KMeans::new(kmeans_config(clustering)).validate(sample)?;
    Ok(sample)
}

fn kmeans_config(c: &ClusteringSection) -> KMeansConfig {
    KMeansConfig {
        k: c.k,
        max_iterations: c.max_iterations,
        convergence: c.convergence,
    }
}

/// Run the whole batch. `rng` drives both the document sample and centroid seeding.
pub fn run<R: Rng + ?Sized>(
    corpus: &Corpus,
    lexicon: &Lexicon,
    clustering: &ClusteringSection,
    report: &ReportSection,
    rng: &mut R,
) -> Result<CorpusReport, AnalysisError> {
    ensure_metrics_described();

    let eligible: Vec<&Document> = corpus.eligible().collect();
    let sample_size = validate(clustering, eligible.len())?;

    let stats = CorpusStats::build(corpus);

    let scores = score_corpus(corpus, lexicon);
    let ratings = summarize_by_rating(corpus, &scores);
    counter!("insights_reviews_scored_total").increment(eligible.len() as u64);

    let mut picked = rand::seq::index::sample(rng, eligible.len(), sample_size).into_vec();
    picked.sort_unstable();
    let sample: Vec<&Document> = picked.into_iter().map(|i| eligible[i]).collect();
    let vectors = tf_idf_batch(&sample, &stats);

    let clustered = KMeans::new(kmeans_config(clustering)).fit(&vectors, rng)?;
    histogram!("insights_kmeans_iterations").record(clustered.iterations as f64);
    if clustered.converged {
        counter!("insights_kmeans_converged_total").increment(1);
    }

    let clusters = clustered
        .clusters()
        .into_iter()
        .map(|c| {
            let docs: Vec<&Document> = c.members.iter().map(|&i| sample[i]).collect();
            ClusterReport {
                label: c.label,
                size: docs.len(),
                members: docs.iter().map(|d| d.id).collect(),
                average_rating: average_rating(&docs),
                sources: source_counts(&docs),
                top_terms: c.centroid.top_terms(report.top_terms),
                centroid: c.centroid.clone(),
                preview: docs
                    .iter()
                    .filter_map(|d| d.text())
                    .take(report.preview_count)
                    .map(|t| truncate_chars(t, report.preview_chars))
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    for c in &clusters {
        info!(target: "insights::cluster", label = c.label, size = c.size, average_rating = ?c.average_rating, "cluster");
    }
    counter!("insights_runs_total").increment(1);

    Ok(CorpusReport {
        documents: corpus.len(),
        eligible: stats.n(),
        vocabulary: stats.vocabulary_size(),
        idf: stats.idf_extremes(report.common_terms, report.unique_terms),
        scores,
        ratings,
        clustering: ClusteringReport {
            sample_size,
            iterations: clustered.iterations,
            converged: clustered.converged,
            clusters,
        },
    })
}

fn average_rating(docs: &[&Document]) -> Option<f64> {
    let rated: Vec<i32> = docs.iter().filter_map(|d| d.rating()).collect();
    if rated.is_empty() {
        return None;
    }
    Some(rated.iter().map(|&r| r as f64).sum::<f64>() / rated.len() as f64)
}

fn source_counts(docs: &[&Document]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for d in docs.iter().filter(|d| !d.review.source.is_empty()) {
        *out.entry(d.review.source.clone()).or_insert(0) += 1;
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
