// src/ingest.rs
//! Source-record adapter: turns scraped review exports into uniform [`Review`]s.
//!
//! Scraped records carry the body under `Details` and the rating as a star
//! string such as `"4 stars"`. Several datasets (one per brand/location) are
//! concatenated in order, each record labelled with its dataset's name.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

use crate::corpus::Review;

/// Raw scraped record. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRecord {
    #[serde(default, alias = "Details", alias = "text")]
    pub details: Option<String>,
    #[serde(default, alias = "Stars", alias = "stars")]
    pub stars: Option<StarField>,
}

/// Exports are inconsistent: some carry `"5 stars"`, some a bare number
/// (integer or float; a float is truncated toward zero).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StarField {
    Number(i32),
    Float(f64),
    Text(String),
}

/// Parse a star string: the leading whitespace-separated field as an integer.
/// `"5 stars"` → `Some(5)`, `""` / `"n/a"` → `None`.
pub fn parse_star_rating(raw: &str) -> Option<i32> {
    raw.split_whitespace().next()?.parse().ok()
}

impl SourceRecord {
    pub fn into_review(self, source: &str) -> Review {
        let rating = match self.stars {
            Some(StarField::Number(n)) => Some(n),
            Some(StarField::Float(f)) => Some(f.trunc() as i32),
            Some(StarField::Text(s)) => parse_star_rating(&s),
            None => None,
        };
        Review {
            text: self.details,
            rating,
            source: source.to_string(),
        }
    }
}

/// Named dataset of raw records.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: String,
    pub records: Vec<SourceRecord>,
}

impl Dataset {
    pub fn from_json_str(label: impl Into<String>, s: &str) -> Result<Self> {
        let records: Vec<SourceRecord> = serde_json::from_str(s)?;
        Ok(Self {
            label: label.into(),
            records,
        })
    }

    /// Load a JSON array of records from disk.
    pub fn load_json<P: AsRef<Path>>(label: impl Into<String>, path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading reviews from {}", path.display()))?;
        Self::from_json_str(label, &content)
            .with_context(|| format!("parsing reviews {}", path.display()))
    }
}

/// Concatenate datasets in order into one review list.
pub fn merge(datasets: impl IntoIterator<Item = Dataset>) -> Vec<Review> {
    let mut out = Vec::new();
    for ds in datasets {
        let n = ds.records.len();
        let label = ds.label;
        out.extend(ds.records.into_iter().map(|r| r.into_review(&label)));
        info!(target: "insights::corpus", source = %label, records = n, "dataset merged");
    }
    out
}
