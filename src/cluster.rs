// src/cluster.rs
//! # K-Means over sparse TF-IDF vectors
//!
//! Cosine similarity, random seeding without replacement, full reassignment
//! every iteration. An assignment pass always reads the previous iteration's
//! centroids only; the update runs after every document has been assigned.
//!
//! Termination: centroids unchanged (per [`Convergence`]) or the iteration cap.
//! The returned labels are always the assignment against the returned
//! centroids, so re-assigning with them is a fixed point.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::sparse::{mean, SparseVector};

pub const DEFAULT_K: usize = 4;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// When two successive centroid sets count as "unchanged".
///
/// `Exact` compares weights bit-for-bit. Centroid means are summed in a fixed
/// order, so once membership stops moving the next update reproduces the same
/// floats and `Exact` does fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    #[default]
    Exact,
    /// Every token of every centroid moved by at most this much.
    Tolerance(f64),
}

impl Convergence {
    fn unchanged(&self, old: &[SparseVector], new: &[SparseVector]) -> bool {
        match *self {
            Convergence::Exact => old == new,
            Convergence::Tolerance(eps) => old
                .iter()
                .zip(new)
                .all(|(a, b)| a.max_abs_diff(b) <= eps),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub convergence: Convergence,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence: Convergence::Exact,
        }
    }
}

/// Result of a k-means run. `labels[i]` is the cluster of `vectors[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub centroids: Vec<SparseVector>,
    pub iterations: usize,
    pub converged: bool,
}

/// One cluster's view: label, centroid and member positions (into the input slice).
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<'a> {
    pub label: usize,
    pub centroid: &'a SparseVector,
    pub members: Vec<usize>,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Member positions per cluster, in input order.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.k()];
        for (i, &l) in self.labels.iter().enumerate() {
            out[l].push(i);
        }
        out
    }

    pub fn clusters(&self) -> Vec<Cluster<'_>> {
        self.members()
            .into_iter()
            .enumerate()
            .map(|(label, members)| Cluster {
                label,
                centroid: &self.centroids[label],
                members,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Reject a configuration that cannot run on `available` vectors.
    pub fn validate(&self, available: usize) -> Result<(), AnalysisError> {
        let k = self.config.k;
        if k == 0 {
            return Err(AnalysisError::ZeroClusters);
        }
        if k > available {
            return Err(AnalysisError::TooManyClusters { k, available });
        }
        Ok(())
    }

    /// Cluster `vectors`. The random source seeds the initial centroids.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        vectors: &[SparseVector],
        rng: &mut R,
    ) -> Result<Clustering, AnalysisError> {
        self.validate(vectors.len())?;
        let k = self.config.k;

        let mut centroids: Vec<SparseVector> =
            rand::seq::index::sample(rng, vectors.len(), k)
                .into_iter()
                .map(|i| vectors[i].clone())
                .collect();

        let mut labels = Vec::new();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;
            let next_labels = assign(vectors, &centroids);
            let moved = if labels.is_empty() {
                next_labels.len()
            } else {
                labels.iter().zip(&next_labels).filter(|(a, b)| a != b).count()
            };
            labels = next_labels;

            let next = update(vectors, &labels, &centroids);
            debug!(target: "insights::cluster", iteration = iterations, moved, "k-means iteration");

            if self.config.convergence.unchanged(&centroids, &next) {
                converged = true;
                centroids = next;
                break;
            }
            centroids = next;
        }

        // Exact convergence means the labels already came from these centroids.
        if !(converged && self.config.convergence == Convergence::Exact) {
            labels = assign(vectors, &centroids);
        }

        info!(
            target: "insights::cluster",
            k,
            documents = vectors.len(),
            iterations,
            converged,
            "k-means finished"
        );

        Ok(Clustering {
            labels,
            centroids,
            iterations,
            converged,
        })
    }
}

/// Index of the most similar centroid; ties go to the lowest index.
pub fn nearest(v: &SparseVector, centroids: &[SparseVector]) -> usize {
    let mut best = 0;
    let mut best_sim = f64::NEG_INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let sim = v.cosine_similarity(c);
        if sim > best_sim {
            best = i;
            best_sim = sim;
        }
    }
    best
}

/// Assignment step: every vector against the same, fixed centroid set.
pub fn assign(vectors: &[SparseVector], centroids: &[SparseVector]) -> Vec<usize> {
    vectors
        .par_iter()
        .map(|v| nearest(v, centroids))
        .collect()
}

/// Update step: member mean per cluster; an empty cluster keeps its previous centroid.
fn update(
    vectors: &[SparseVector],
    labels: &[usize],
    previous: &[SparseVector],
) -> Vec<SparseVector> {
    let mut groups: Vec<Vec<&SparseVector>> = vec![Vec::new(); previous.len()];
    for (v, &l) in vectors.iter().zip(labels) {
        groups[l].push(v);
    }
    groups
        .iter()
        .zip(previous)
        .map(|(g, prev)| if g.is_empty() { prev.clone() } else { mean(g) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn v(pairs: &[(&str, f64)]) -> SparseVector {
        pairs.iter().map(|&(t, w)| (t, w)).collect()
    }

    /// Two obvious topics: coffee vs. drive-thru service.
    fn two_topics() -> Vec<SparseVector> {
        vec![
            v(&[("coffee", 2.0), ("roast", 1.0)]),
            v(&[("coffee", 1.0), ("bitter", 1.0)]),
            v(&[("roast", 2.0), ("bitter", 0.5)]),
            v(&[("drive", 1.0), ("slow", 2.0)]),
            v(&[("drive", 2.0), ("line", 1.0)]),
            v(&[("slow", 1.0), ("line", 2.0)]),
        ]
    }

    #[test]
    fn rejects_bad_k() {
        let km = KMeans::new(KMeansConfig {
            k: 0,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            km.fit(&two_topics(), &mut rng).unwrap_err(),
            AnalysisError::ZeroClusters
        );

        let km = KMeans::new(KMeansConfig {
            k: 7,
            ..Default::default()
        });
        assert_eq!(
            km.fit(&two_topics(), &mut rng).unwrap_err(),
            AnalysisError::TooManyClusters { k: 7, available: 6 }
        );
    }

    #[test]
    fn assignment_separates_disjoint_topics() {
        let data = two_topics();
        let seeds = vec![data[0].clone(), data[3].clone()];
        let labels = assign(&data, &seeds);
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);

        // one update keeps the split and reaches a fixed point
        let next = update(&data, &labels, &seeds);
        assert_eq!(assign(&data, &next), labels);
        assert_eq!(update(&data, &labels, &next), next);
    }

    #[test]
    fn seeded_runs_terminate_with_valid_labels() {
        let data = two_topics();
        for seed in 0..10 {
            let km = KMeans::new(KMeansConfig {
                k: 2,
                ..Default::default()
            });
            let c = km.fit(&data, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(c.iterations >= 1 && c.iterations <= DEFAULT_MAX_ITERATIONS);
            assert_eq!(c.labels.len(), data.len());
            assert_eq!(c.centroids.len(), 2);
        }
    }

    #[test]
    fn exact_convergence_fires_before_the_cap() {
        let data = two_topics();
        let km = KMeans::new(KMeansConfig {
            k: 2,
            convergence: Convergence::Exact,
            ..Default::default()
        });
        for seed in 0..10 {
            let c = km.fit(&data, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(c.converged, "seed {seed} hit the iteration cap");
            assert!(c.iterations < DEFAULT_MAX_ITERATIONS);
            assert_eq!(assign(&data, &c.centroids), c.labels);
        }
    }

    #[test]
    fn every_document_in_exactly_one_cluster_and_fixed_point() {
        let data = two_topics();
        let km = KMeans::new(KMeansConfig {
            k: 3,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(7);
        let c = km.fit(&data, &mut rng).unwrap();
        let total: usize = c.members().iter().map(Vec::len).sum();
        assert_eq!(total, data.len());
        assert!(c.labels.iter().all(|&l| l < 3));
        assert_eq!(assign(&data, &c.centroids), c.labels);
    }

    #[test]
    fn same_seed_same_result() {
        let data = two_topics();
        let km = KMeans::new(KMeansConfig {
            k: 2,
            ..Default::default()
        });
        let a = km.fit(&data, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = km.fit(&data, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn iteration_cap_still_yields_consistent_labels() {
        let data = two_topics();
        let km = KMeans::new(KMeansConfig {
            k: 2,
            max_iterations: 1,
            convergence: Convergence::Exact,
        });
        let c = km.fit(&data, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(c.iterations, 1);
        assert_eq!(assign(&data, &c.centroids), c.labels);
    }

    #[test]
    fn tolerance_convergence_stops() {
        let data = two_topics();
        let km = KMeans::new(KMeansConfig {
            k: 2,
            max_iterations: 100,
            convergence: Convergence::Tolerance(1e-9),
        });
        let c = km.fit(&data, &mut StdRng::seed_from_u64(5)).unwrap();
        assert!(c.converged);
        assert!(c.iterations < 100);
        assert_eq!(assign(&data, &c.centroids), c.labels);
    }

    #[test]
    fn ties_go_to_first_centroid() {
        let doc = v(&[("x", 1.0)]);
        let same = vec![v(&[("x", 2.0)]), v(&[("x", 5.0)])];
        assert_eq!(nearest(&doc, &same), 0);
        // zero-vector document: every similarity is 0.0
        assert_eq!(nearest(&SparseVector::new(), &same), 0);
    }

    #[test]
    fn empty_cluster_keeps_previous_centroid() {
        let data = vec![v(&[("a", 1.0)]), v(&[("a", 3.0)])];
        let prev = vec![v(&[("a", 1.0)]), v(&[("z", 1.0)])];
        let next = update(&data, &[0, 0], &prev);
        assert_eq!(next[0], v(&[("a", 2.0)]));
        assert_eq!(next[1], prev[1]);
    }
}
