use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::RawPrediction;

pub mod client;
pub mod inference;

pub use client::HostedClassifier;

/// Seam for the hosted emotion model so the journal pipeline can be exercised
/// with fakes.
pub trait Classifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RawPrediction>, ClassifierError>>;
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Network failure, timeout, or a non-success status from the host.
    #[error("emotion model unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// The host answered, but not in any shape we accept.
    #[error("unexpected classifier payload: {0}")]
    InvalidOutput(String),
}
