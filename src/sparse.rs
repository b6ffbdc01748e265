// src/sparse.rs
//! # Sparse Vector
//! Token → weight map where absence means zero. Zero weights are never stored,
//! so `len()` is the number of non-zero dimensions and the empty vector is the
//! zero vector.
//!
//! Keys are kept ordered: every sum runs over tokens in the same order no
//! matter which map instance is iterated, so `dot(a, b)` is bit-identical to
//! `dot(b, a)` and reruns over the same inputs give the same floats.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct SparseVector {
    weights: BTreeMap<String, f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `token`'s weight. A zero weight removes the entry.
    pub fn insert(&mut self, token: impl Into<String>, weight: f64) {
        let token = token.into();
        if weight == 0.0 {
            self.weights.remove(&token);
        } else {
            self.weights.insert(token, weight);
        }
    }

    /// Weight of `token`, `0.0` when absent.
    #[inline]
    pub fn get(&self, token: &str) -> f64 {
        self.weights.get(token).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.weights.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.weights.keys().map(String::as_str)
    }

    /// Sum over tokens present in both vectors of `self[t] * other[t]`.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .weights
            .iter()
            .filter_map(|(t, &w)| large.weights.get(t).map(|&v| w * v))
            .sum()
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Cosine similarity; `0.0` when either side is the zero vector.
    pub fn cosine_similarity(&self, other: &SparseVector) -> f64 {
        let m1 = self.magnitude();
        let m2 = other.magnitude();
        if m1 == 0.0 || m2 == 0.0 {
            return 0.0;
        }
        self.dot(other) / (m1 * m2)
    }

    /// Largest absolute per-token difference between two vectors (missing = 0).
    pub fn max_abs_diff(&self, other: &SparseVector) -> f64 {
        let left = self
            .weights
            .iter()
            .map(|(t, &w)| (w - other.get(t)).abs());
        let right = other
            .weights
            .iter()
            .filter(|(t, _)| !self.weights.contains_key(*t))
            .map(|(_, &w)| w.abs());
        left.chain(right).fold(0.0, f64::max)
    }

    /// Weights sorted by descending value, ties by token. Used for word-cloud style output.
    pub fn top_terms(&self, n: usize) -> Vec<(String, f64)> {
        let mut all: Vec<(String, f64)> = self.weights.iter().map(|(k, &v)| (k.clone(), v)).collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut v = SparseVector::new();
        for (t, w) in iter {
            v.insert(t, w);
        }
        v
    }
}

/// Zero weights are dropped on the way in.
impl From<BTreeMap<String, f64>> for SparseVector {
    fn from(weights: BTreeMap<String, f64>) -> Self {
        weights.into_iter().collect()
    }
}

impl From<SparseVector> for BTreeMap<String, f64> {
    fn from(v: SparseVector) -> Self {
        v.weights
    }
}

/// Count occurrences of each token.
pub fn term_frequency<S: AsRef<str>>(tokens: &[S]) -> SparseVector {
    let mut counts: BTreeMap<String, f64> = BTreeMap::new();
    for t in tokens {
        *counts.entry(t.as_ref().to_string()).or_insert(0.0) += 1.0;
    }
    SparseVector { weights: counts }
}

/// Per-token mean over `vectors` (missing = 0).
///
/// # Panics
/// On an empty slice: the mean of no vectors is undefined and callers must
/// never ask for it.
pub fn mean(vectors: &[&SparseVector]) -> SparseVector {
    assert!(
        !vectors.is_empty(),
        "sparse mean requested over an empty vector set"
    );
    let mut summed: BTreeMap<String, f64> = BTreeMap::new();
    for v in vectors {
        for (t, &w) in &v.weights {
            *summed.entry(t.clone()).or_insert(0.0) += w;
        }
    }
    let n = vectors.len() as f64;
    summed.into_iter().map(|(t, s)| (t, s / n)).collect()
}
