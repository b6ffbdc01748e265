// src/lexicon.rs
//! Polarity lexicon: token → real score (positive = favorable).
//!
//! File format: one `token<TAB>score` per line, blank lines ignored.

use anyhow::{anyhow, Context, Result};
use std::{fs, path::Path};
use tracing::{info, warn};

use crate::sparse::SparseVector;

/// Immutable polarity lexicon. Stored as a sparse vector so scoring is a plain
/// dot product against a document's term frequencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    weights: SparseVector,
}

impl Lexicon {
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            weights: pairs.into_iter().collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        let lex = Self::parse_tsv(&content)
            .with_context(|| format!("parsing lexicon {}", path.display()))?;
        info!(target: "insights::sentiment", entries = lex.len(), path = %path.display(), "lexicon loaded");
        Ok(lex)
    }

    pub fn parse_tsv(s: &str) -> Result<Self> {
        let mut weights = SparseVector::new();
        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let lineno = i + 1;
            let (word, score) = line
                .split_once('\t')
                .ok_or_else(|| anyhow!("line {lineno}: expected `token<TAB>score`"))?;
            let word = word.trim();
            if word.is_empty() || score.contains('\t') {
                return Err(anyhow!("line {lineno}: expected `token<TAB>score`"));
            }
            let score: f64 = score
                .trim()
                .parse()
                .with_context(|| format!("line {lineno}: invalid score for `{word}`"))?;
            if weights.contains(word) {
                warn!(target: "insights::sentiment", token = word, line = lineno, "duplicate lexicon entry, last one wins");
            }
            weights.insert(word, score);
        }
        Ok(Self { weights })
    }

    pub fn weight(&self, token: &str) -> Option<f64> {
        self.weights.contains(token).then(|| self.weights.get(token))
    }

    pub fn as_vector(&self) -> &SparseVector {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_tab_separated_lines() {
        let lex = Lexicon::parse_tsv("great\t1.0\nawful\t-2.5\n\nfine\t0.25\n").unwrap();
        assert_eq!(lex.len(), 3);
        assert_eq!(lex.weight("awful"), Some(-2.5));
        assert_eq!(lex.weight("meh"), None);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = Lexicon::parse_tsv("great\t1.0\nbroken line\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        let err = Lexicon::parse_tsv("great\tlots\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn duplicate_entries_last_wins() {
        let lex = Lexicon::parse_tsv("good\t1\ngood\t2\n").unwrap();
        assert_eq!(lex.weight("good"), Some(2.0));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "tasty\t1.5").unwrap();
        writeln!(f, "cold\t-1").unwrap();
        drop(f);
        let lex = Lexicon::load_from_file(&path).unwrap();
        assert_eq!(lex.weight("tasty"), Some(1.5));
        assert!(Lexicon::load_from_file(dir.path().join("missing.tsv")).is_err());
    }
}
