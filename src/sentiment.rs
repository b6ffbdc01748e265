// src/sentiment.rs
//! # Sentiment Scorer
//! Lexicon score = dot(term frequency, lexicon). A token contributes
//! `count * lexicon_weight`; tokens missing from the lexicon contribute nothing.
//!
//! A score of exactly `0.0` means "no signal" and is left out of the
//! per-rating aggregation.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::corpus::{anon_hash, Corpus};
use crate::lexicon::Lexicon;
use crate::sparse::{term_frequency, SparseVector};

pub fn score<S: AsRef<str>>(tokens: &[S], lexicon: &Lexicon) -> f64 {
    score_tf(&term_frequency(tokens), lexicon)
}

pub fn score_tf(tf: &SparseVector, lexicon: &Lexicon) -> f64 {
    tf.dot(lexicon.as_vector())
}

/// One token's share of a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub token: String,
    pub frequency: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Breakdown of a score, largest contributions (by magnitude) first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub contributions: Vec<Contribution>,
    pub total: f64,
}

/// Diagnostic view of [`score`]. `total` equals `score(tokens, lexicon)`.
pub fn explain<S: AsRef<str>>(tokens: &[S], lexicon: &Lexicon) -> Explanation {
    let tf = term_frequency(tokens);
    let mut contributions: Vec<Contribution> = tf
        .iter()
        .filter_map(|(t, freq)| {
            lexicon.weight(t).map(|w| Contribution {
                token: t.to_string(),
                frequency: freq,
                weight: w,
                contribution: freq * w,
            })
        })
        .collect();
    contributions.sort_by(|a, b| {
        b.contribution
            .abs()
            .total_cmp(&a.contribution.abs())
            .then_with(|| a.token.cmp(&b.token))
    });
    Explanation {
        contributions,
        total: score_tf(&tf, lexicon),
    }
}

/// Average non-zero score at one star rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub rating: i32,
    pub average: f64,
    pub count: usize,
}

/// Score every document. Ineligible documents (missing/blank text) get `None`.
pub fn score_corpus(corpus: &Corpus, lexicon: &Lexicon) -> Vec<Option<f64>> {
    corpus
        .documents()
        .iter()
        .map(|d| {
            if !d.is_eligible() {
                return None;
            }
            let s = score_tf(d.term_frequency(), lexicon);
            if let Some(text) = d.text() {
                debug!(target: "insights::sentiment", id = %anon_hash(text), score = s, "scored review");
            }
            Some(s)
        })
        .collect()
}

/// Group non-zero scores by rating, ascending by rating. Documents without a
/// rating or without a score are skipped.
pub fn summarize_by_rating(corpus: &Corpus, scores: &[Option<f64>]) -> Vec<RatingSummary> {
    let mut buckets: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (doc, s) in corpus.documents().iter().zip(scores) {
        let (Some(rating), Some(s)) = (doc.rating(), *s) else {
            continue;
        };
        if s == 0.0 {
            continue;
        }
        let e = buckets.entry(rating).or_insert((0.0, 0));
        e.0 += s;
        e.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(rating, (sum, count))| RatingSummary {
            rating,
            average: sum / count as f64,
            count,
        })
        .collect()
}
