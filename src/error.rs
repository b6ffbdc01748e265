//! Configuration errors reported before any clustering work starts.

/// Rejected analysis request. Nothing has been computed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("k must be at least 1")]
    ZeroClusters,

    #[error("k = {k} exceeds the {available} sampled documents")]
    TooManyClusters { k: usize, available: usize },

    #[error("sample size {requested} exceeds the {eligible} eligible documents")]
    SampleTooLarge { requested: usize, eligible: usize },
}
