// src/corpus.rs
//! # Corpus
//! Review records, documents with cache-once derived data, and the corpus-wide
//! statistics (document frequency + IDF) built exactly once per run.
//!
//! `CorpusStats` is an immutable value: build it after every document is
//! ingested, then pass it by reference into each vectorizer call.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::sparse::{term_frequency, SparseVector};
use crate::tokenize::tokenize;

/// Uniform review record handed over by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    /// Dataset label (brand, location). Empty when the caller gave none.
    #[serde(default, alias = "source_label")]
    pub source: String,
}

impl Review {
    pub fn new(text: impl Into<String>, rating: Option<i32>) -> Self {
        Self {
            text: Some(text.into()),
            rating,
            source: String::new(),
        }
    }
}

/// A review at a fixed position in the corpus, with lazily derived tokens/TF.
#[derive(Debug)]
pub struct Document {
    pub id: usize,
    pub review: Review,
    tokens: OnceCell<Vec<String>>,
    tf: OnceCell<SparseVector>,
}

impl Document {
    pub fn new(id: usize, review: Review) -> Self {
        Self {
            id,
            review,
            tokens: OnceCell::new(),
            tf: OnceCell::new(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.review.text.as_deref()
    }

    pub fn rating(&self) -> Option<i32> {
        self.review.rating
    }

    /// Non-empty text after trimming. Only eligible documents count toward
    /// `N`, document frequency and rating aggregation.
    pub fn is_eligible(&self) -> bool {
        self.text().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn tokens(&self) -> &[String] {
        self.tokens.get_or_init(|| tokenize(self.text()))
    }

    pub fn term_frequency(&self) -> &SparseVector {
        self.tf.get_or_init(|| term_frequency(self.tokens()))
    }
}

/// Ordered, append-only collection of documents for a single batch run.
#[derive(Debug, Default)]
pub struct Corpus {
    docs: Vec<Document>,
}

impl Corpus {
    pub fn new(reviews: impl IntoIterator<Item = Review>) -> Self {
        let docs = reviews
            .into_iter()
            .enumerate()
            .map(|(id, r)| Document::new(id, r))
            .collect();
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Document> {
        self.docs.get(id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn eligible(&self) -> impl Iterator<Item = &Document> + '_ {
        self.docs.iter().filter(|d| d.is_eligible())
    }
}

/// Document frequency and inverse document frequency over the eligible corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    n: usize,
    doc_freq: BTreeMap<String, usize>,
    idf: SparseIdf,
}

/// IDF index. Unlike a `SparseVector` it keeps `0.0` entries: a token that
/// appears in every document is still "seen in the corpus".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SparseIdf(BTreeMap<String, f64>);

impl SparseIdf {
    pub fn get(&self, token: &str) -> Option<f64> {
        self.0.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl CorpusStats {
    pub fn build(corpus: &Corpus) -> Self {
        let mut n = 0usize;
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus.eligible() {
            n += 1;
            let unique: BTreeSet<&str> = doc.tokens().iter().map(String::as_str).collect();
            for t in unique {
                *doc_freq.entry(t.to_string()).or_insert(0) += 1;
            }
        }

        let idf = doc_freq
            .iter()
            .map(|(t, &df)| (t.clone(), (n as f64 / df as f64).ln()))
            .collect();

        info!(
            target: "insights::corpus",
            eligible = n,
            total = corpus.len(),
            vocabulary = doc_freq.len(),
            "corpus statistics built"
        );

        Self {
            n,
            doc_freq,
            idf: SparseIdf(idf),
        }
    }

    /// Eligible document count `N`.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn doc_freq(&self, token: &str) -> usize {
        self.doc_freq.get(token).copied().unwrap_or(0)
    }

    pub fn idf(&self) -> &SparseIdf {
        &self.idf
    }

    pub fn vocabulary_size(&self) -> usize {
        self.doc_freq.len()
    }

    /// `(lowest, highest)` IDF tokens: the most common and the most distinctive
    /// words. Both lists are ascending by IDF, ties broken by token.
    pub fn idf_extremes(&self, lowest: usize, highest: usize) -> IdfExtremes {
        let mut sorted: Vec<(String, f64)> =
            self.idf.iter().map(|(t, v)| (t.to_string(), v)).collect();
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let most_common = sorted.iter().take(lowest).cloned().collect();
        let start = sorted.len().saturating_sub(highest);
        let most_unique = sorted[start..].to_vec();
        IdfExtremes {
            most_common,
            most_unique,
        }
    }
}

/// Short SHA-256 fingerprint of review text for logs. Raw text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdfExtremes {
    pub most_common: Vec<(String, f64)>,
    pub most_unique: Vec<(String, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[Option<&str>]) -> Corpus {
        Corpus::new(texts.iter().map(|t| Review {
            text: t.map(str::to_string),
            rating: None,
            source: "test".into(),
        }))
    }

    #[test]
    fn review_accepts_source_label() {
        let r: Review =
            serde_json::from_str(r#"{"text":"hot coffee","rating":4,"source_label":"Mc Cafe"}"#)
                .unwrap();
        assert_eq!(r.source, "Mc Cafe");
        let r: Review = serde_json::from_str(r#"{"text":"ok"}"#).unwrap();
        assert_eq!(r.source, "");
        assert_eq!(r.rating, None);
    }

    #[test]
    fn blank_and_missing_text_are_not_eligible() {
        let c = corpus(&[Some("great coffee"), Some("   "), None, Some("")]);
        let stats = CorpusStats::build(&c);
        assert_eq!(stats.n(), 1);
        assert_eq!(c.eligible().count(), 1);
    }

    #[test]
    fn doc_freq_counts_once_per_document() {
        let c = corpus(&[Some("coffee coffee coffee"), Some("coffee donut")]);
        let stats = CorpusStats::build(&c);
        assert_eq!(stats.doc_freq("coffee"), 2);
        assert_eq!(stats.doc_freq("donut"), 1);
        assert_eq!(stats.doc_freq("bagel"), 0);
    }

    #[test]
    fn idf_is_ln_n_over_df() {
        let c = corpus(&[Some("coffee donut"), Some("coffee"), Some("tea")]);
        let stats = CorpusStats::build(&c);
        let idf = stats.idf();
        assert!((idf.get("coffee").unwrap() - (3.0f64 / 2.0).ln()).abs() < 1e-12);
        assert!((idf.get("donut").unwrap() - 3.0f64.ln()).abs() < 1e-12);
        assert_eq!(idf.get("bagel"), None);
    }

    #[test]
    fn idf_zero_exactly_when_token_in_every_document() {
        let c = corpus(&[Some("coffee donut"), Some("coffee tea")]);
        let stats = CorpusStats::build(&c);
        assert_eq!(stats.idf().get("coffee"), Some(0.0));
        for (_, v) in stats.idf().iter() {
            assert!(v >= 0.0);
        }
        assert!(stats.idf().get("tea").unwrap() > 0.0);
    }

    #[test]
    fn idf_extremes_are_ascending() {
        let c = corpus(&[Some("coffee donut"), Some("coffee tea"), Some("coffee tea")]);
        let stats = CorpusStats::build(&c);
        let ex = stats.idf_extremes(1, 2);
        assert_eq!(ex.most_common[0].0, "coffee");
        assert_eq!(ex.most_unique.len(), 2);
        assert_eq!(ex.most_unique[1].0, "donut");
        assert!(ex.most_unique[0].1 <= ex.most_unique[1].1);
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("the donut was stale");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("the donut was stale"));
        assert_ne!(a, anon_hash("the donut was fresh"));
    }

    #[test]
    fn document_caches_tokens() {
        let d = Document::new(0, Review::new("Great coffee", Some(5)));
        let first = d.tokens().as_ptr();
        assert_eq!(d.tokens(), ["great", "coffee"]);
        assert_eq!(first, d.tokens().as_ptr());
        assert_eq!(d.term_frequency().get("great"), 1.0);
    }
}
