//! Error types for `encore-upstream`.

use thiserror::Error;

/// A failed round trip to the upstream provider: network trouble, a non-2xx
/// status, or a response body that is not the expected XML envelope.
#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("upstream returned {status} for {url}")]
  Status { status: u16, url: String },

  #[error("xml error: {0}")]
  Xml(String),

  #[error("empty envelope from {0}")]
  EmptyEnvelope(String),
}

/// A single raw record that cannot be reshaped into its canonical form.
/// Scoped to the record, never to the whole batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
  #[error("missing field {0:?}")]
  MissingField(&'static str),

  #[error("field {field:?} is not a YYYY.MM.DD date: {value:?}")]
  BadDate { field: &'static str, value: String },

  #[error("field {field:?} is not numeric: {value:?}")]
  BadNumber { field: &'static str, value: String },
}
