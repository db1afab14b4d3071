//! Performance records — the list-view summary and the full-profile detail.
//!
//! Both are keyed by the upstream-assigned opaque identifier. The summary is
//! what listing queries page over; the detail is fetched lazily by the
//! reconciler the first time an identifier is seen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Date window ─────────────────────────────────────────────────────────────

/// An inclusive calendar-date window, as used by listing queries and by the
/// upstream feed. The upstream does not enforce `start <= end`, so neither do
/// we.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl DateWindow {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Self { Self { start, end } }

  /// A single-day window.
  pub fn day(date: NaiveDate) -> Self { Self { start: date, end: date } }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// The list-view projection of a performance.
///
/// Created by the reconciler from the upstream listing feed; read-only to API
/// consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
  /// Upstream-assigned opaque identifier, unique.
  pub id:             String,
  pub name:           String,
  pub start_date:     NaiveDate,
  pub end_date:       NaiveDate,
  pub venue:          String,
  pub poster:         String,
  pub genre:          String,
  /// Lifecycle state label as reported by the upstream ("공연중", …).
  pub state:          String,
  /// Open-run flag; `None` when the feed omits it.
  pub open_run:       Option<bool>,
  /// Region code; `None` when the feed omits it.
  pub area:           Option<String>,
  /// Child-suitability label; the listing feed rarely carries it.
  pub kid_flag:       Option<String>,
  /// Date this row was written by an ingestion pass.
  pub last_refreshed: NaiveDate,
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// A related-content link attached to a performance detail (booking sites,
/// style guides, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLink {
  pub name: String,
  pub url:  String,
}

/// The full-profile projection of a performance, stored separately from the
/// summary and created once, lazily, on first ingestion of the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDetail {
  pub id:                 String,
  pub name:               String,
  pub start_date:         NaiveDate,
  pub end_date:           NaiveDate,
  pub venue:              String,
  pub cast:               String,
  pub crew:               String,
  pub runtime:            String,
  pub age_rating:         String,
  /// Production company.
  pub producer:           String,
  pub price_guidance:     String,
  pub poster:             String,
  pub synopsis:           String,
  pub genre:              String,
  pub state:              String,
  pub open_run:           Option<bool>,
  /// Style-guide image URLs, comma-joined regardless of the upstream shape.
  pub style_urls:         String,
  /// Free-text schedule guidance ("화요일 ~ 금요일(20:00), …").
  pub schedule_guidance:  String,
  pub related_links:      Vec<RelatedLink>,
  pub last_refreshed:     NaiveDate,
}
