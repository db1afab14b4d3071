//! Facility — a venue that hosts performances.
//!
//! Unlike performance details, facility rows are overwritten field-by-field
//! on every ingestion pass (see [`crate::policy`]). The seat count, phone,
//! coordinates, and address come from a secondary per-facility fetch.

use serde::{Deserialize, Serialize};

/// A performance facility (venue complex), keyed by the upstream identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
  /// Upstream-assigned opaque identifier, unique.
  pub id:             String,
  pub name:           String,
  /// Parent region name (시도).
  pub region:         String,
  /// Sub-region name (구군).
  pub sub_region:     String,
  /// Characteristic-code classification of the facility.
  pub characteristic: String,
  /// Number of sub-venues (halls) within the complex.
  pub hall_count:     i64,
  pub seat_count:     i64,
  pub open_year:      Option<String>,
  pub phone:          Option<String>,
  pub url:            Option<String>,
  pub address:        Option<String>,
  pub latitude:       f64,
  pub longitude:      f64,
}
