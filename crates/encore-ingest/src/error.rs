//! Error type for `encore-ingest`.

use encore_upstream::{NormalizeError, UpstreamError};
use thiserror::Error;

/// A failed ingestion pass. Any of these aborts the pass before its batch is
/// committed, so partial results are never durable.
#[derive(Debug, Error)]
pub enum IngestError {
  #[error("upstream fetch failed: {0}")]
  Upstream(#[from] UpstreamError),

  #[error("detail record rejected: {0}")]
  Normalize(#[from] NormalizeError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    IngestError::Store(Box::new(e))
  }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
