// src/config.rs
//! Run configuration from TOML (`config/insights.toml` by default) with env overrides.
//!
//! ```toml
//! [lexicon]
//! path = "config/lexicon.tsv"
//!
//! [clustering]
//! k = 4
//! max_iterations = 100
//! sample_size = 1781        # optional; absent = whole eligible corpus
//! seed = 42                 # optional; absent = OS entropy
//! convergence = "exact"     # or { tolerance = 1e-9 }
//!
//! [report]
//! top_terms = 20
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::cluster::{Convergence, DEFAULT_K, DEFAULT_MAX_ITERATIONS};

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/insights.toml";
pub const DEFAULT_LEXICON_PATH: &str = "config/lexicon.tsv";

pub const ENV_CONFIG_PATH: &str = "INSIGHTS_CONFIG_PATH";
pub const ENV_SEED: &str = "INSIGHTS_SEED";
pub const ENV_SAMPLE_SIZE: &str = "INSIGHTS_SAMPLE_SIZE";
pub const ENV_K: &str = "INSIGHTS_K";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct InsightsConfig {
    #[serde(default)]
    pub lexicon: LexiconSection,
    #[serde(default)]
    pub clustering: ClusteringSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LexiconSection {
    #[serde(default = "default_lexicon_path")]
    pub path: PathBuf,
}

impl Default for LexiconSection {
    fn default() -> Self {
        Self {
            path: default_lexicon_path(),
        }
    }
}

fn default_lexicon_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEXICON_PATH)
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClusteringSection {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub sample_size: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub convergence: Convergence,
}

impl Default for ClusteringSection {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sample_size: None,
            seed: None,
            convergence: Convergence::Exact,
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReportSection {
    /// Centroid terms listed per cluster.
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
    /// Lowest-IDF (most common) tokens to report.
    #[serde(default = "default_common_terms")]
    pub common_terms: usize,
    /// Highest-IDF (most distinctive) tokens to report.
    #[serde(default = "default_unique_terms")]
    pub unique_terms: usize,
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_terms: default_top_terms(),
            common_terms: default_common_terms(),
            unique_terms: default_unique_terms(),
            preview_count: default_preview_count(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_top_terms() -> usize {
    20
}
fn default_common_terms() -> usize {
    20
}
fn default_unique_terms() -> usize {
    5
}
fn default_preview_count() -> usize {
    10
}
fn default_preview_chars() -> usize {
    200
}

impl InsightsConfig {
    /// Load from `$INSIGHTS_CONFIG_PATH` or `config/insights.toml`, then apply env overrides.
    /// A missing default file is not an error: built-in defaults are used.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if explicit.is_some() || path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading insights config at {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("parsing insights config {}", path.display()))?
        } else {
            Self::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(seed) = parse_env::<u64>(ENV_SEED) {
            self.clustering.seed = Some(seed);
        }
        if let Some(n) = parse_env::<usize>(ENV_SAMPLE_SIZE) {
            self.clustering.sample_size = Some(n);
        }
        if let Some(k) = parse_env::<usize>(ENV_K) {
            self.clustering.k = k;
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = InsightsConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, InsightsConfig::default());
        assert_eq!(cfg.clustering.k, 4);
        assert_eq!(cfg.clustering.max_iterations, 100);
        assert_eq!(cfg.clustering.convergence, Convergence::Exact);
        assert_eq!(cfg.report.preview_chars, 200);
    }

    #[test]
    fn parses_all_sections() {
        let cfg = InsightsConfig::from_toml_str(
            r#"
            [lexicon]
            path = "data/lex.tsv"

            [clustering]
            k = 6
            sample_size = 1781
            seed = 7
            convergence = { tolerance = 1e-9 }

            [report]
            top_terms = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.lexicon.path, PathBuf::from("data/lex.tsv"));
        assert_eq!(cfg.clustering.k, 6);
        assert_eq!(cfg.clustering.sample_size, Some(1781));
        assert_eq!(cfg.clustering.seed, Some(7));
        assert_eq!(cfg.clustering.convergence, Convergence::Tolerance(1e-9));
        assert_eq!(cfg.report.top_terms, 5);
        assert_eq!(cfg.report.unique_terms, 5);
    }

    #[test]
    fn rejects_bad_convergence() {
        assert!(InsightsConfig::from_toml_str("[clustering]\nconvergence = \"fuzzy\"").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_path_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("insights.toml");
        fs::write(&p, "[clustering]\nk = 3\nseed = 1\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_SEED, "42");
        env::set_var(ENV_K, "not-a-number");
        let cfg = InsightsConfig::load().unwrap();
        assert_eq!(cfg.clustering.k, 3);
        assert_eq!(cfg.clustering.seed, Some(42));

        env::set_var(ENV_CONFIG_PATH, dir.path().join("missing.toml").display().to_string());
        assert!(InsightsConfig::load().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_SEED);
        env::remove_var(ENV_K);
    }
}
