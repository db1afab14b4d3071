//! The denormalised upcoming-performances snapshot.
//!
//! This table has an independent lifecycle from the summary table: it is
//! rebuilt wholesale from a rolling future window and can be cleared without
//! touching anything else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the upcoming-performances snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPerformance {
  pub id:         String,
  pub name:       String,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub venue:      String,
  pub poster:     String,
  pub area:       Option<String>,
  pub genre:      Option<String>,
  pub open_run:   Option<bool>,
  pub state:      String,
}
