// src/vectorize.rs
//! TF-IDF vectorizer. Pure functions over tokens + frozen corpus statistics.

use rayon::prelude::*;

use crate::corpus::{CorpusStats, Document};
use crate::sparse::{term_frequency, SparseVector};

/// TF-IDF weights for `tokens`. Tokens unknown to the IDF index are dropped,
/// and so are tokens whose IDF is zero (present in every document).
pub fn tf_idf<S: AsRef<str>>(tokens: &[S], stats: &CorpusStats) -> SparseVector {
    weight_tf(&term_frequency(tokens), stats)
}

/// Weight an existing TF vector by IDF.
pub fn weight_tf(tf: &SparseVector, stats: &CorpusStats) -> SparseVector {
    let idf = stats.idf();
    tf.iter()
        .filter_map(|(t, count)| idf.get(t).map(|w| (t, count * w)))
        .collect()
}

/// Vectorize many documents on the rayon pool. Output order matches input order.
pub fn tf_idf_batch(docs: &[&Document], stats: &CorpusStats) -> Vec<SparseVector> {
    docs.par_iter()
        .map(|d| weight_tf(d.term_frequency(), stats))
        .collect()
}
