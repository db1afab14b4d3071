//! Per-entity refresh policies for the reconciler.
//!
//! The upstream pipeline treats its entities asymmetrically: performance
//! summaries and details are written once and never touched again, while
//! facility rows are overwritten on every pass. Rather than hard-coding that
//! asymmetry, each entity carries an explicit policy flag so the behaviour
//! is visible and testable.

use serde::{Deserialize, Serialize};

/// What an ingestion pass does when a row for an identifier already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
  /// Insert if absent; an existing row is left untouched and the associated
  /// detail fetch is skipped entirely.
  WriteOnce,
  /// Re-fetch and overwrite all mutable fields on every pass.
  Overwrite,
}

impl RefreshPolicy {
  pub fn overwrites(self) -> bool { matches!(self, RefreshPolicy::Overwrite) }
}

/// The per-entity policy set consulted by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestPolicy {
  pub summary:  RefreshPolicy,
  pub detail:   RefreshPolicy,
  pub facility: RefreshPolicy,
}

impl Default for IngestPolicy {
  /// The upstream pipeline's observed behaviour: summaries and details are
  /// write-once, facilities are overwritten on every pass.
  fn default() -> Self {
    Self {
      summary:  RefreshPolicy::WriteOnce,
      detail:   RefreshPolicy::WriteOnce,
      facility: RefreshPolicy::Overwrite,
    }
  }
}
