//! The `CatalogStore` trait and supporting query/batch types.
//!
//! The trait is implemented by storage backends (e.g. `encore-store-sqlite`).
//! Higher layers (`encore-ingest`, `encore-api`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  facility::Facility,
  performance::{DateWindow, PerformanceDetail, PerformanceSummary},
  upcoming::UpcomingPerformance,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// 1-based page number plus page size, as exposed by the read API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: u32,
  pub rows: u32,
}

impl PageRequest {
  pub fn new(page: u32, rows: u32) -> Self {
    Self { page: page.max(1), rows }
  }

  pub fn offset(&self) -> u32 { (self.page - 1) * self.rows }

  pub fn limit(&self) -> u32 { self.rows }
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: 1, rows: 10 } }
}

/// Parameters for [`CatalogStore::list_performances`].
///
/// The date window is required and matches any performance whose run overlaps
/// it (`start_date <= window.end AND end_date >= window.start`). All other
/// filters are optional.
#[derive(Debug, Clone)]
pub struct PerformanceFilter {
  pub window:      DateWindow,
  /// Substring match on the performance name.
  pub name:        Option<String>,
  /// Substring match on the venue name.
  pub venue:       Option<String>,
  /// Exact match on the genre label.
  pub genre:       Option<String>,
  /// Prefix match on the performance identifier.
  pub id_prefix:   Option<String>,
  /// Prefix match on the area code (region, or region + sub-region concat).
  pub area_prefix: Option<String>,
  pub kid_flag:    Option<String>,
  /// Exact match on the lifecycle state label.
  pub state:       Option<String>,
  pub open_run:    Option<bool>,
  pub page:        PageRequest,
}

impl PerformanceFilter {
  /// A filter over `window` with no optional criteria set.
  pub fn over(window: DateWindow) -> Self {
    Self {
      window,
      name:        None,
      venue:       None,
      genre:       None,
      id_prefix:   None,
      area_prefix: None,
      kid_flag:    None,
      state:       None,
      open_run:    None,
      page:        PageRequest::default(),
    }
  }
}

/// Parameters for [`CatalogStore::list_facilities`].
#[derive(Debug, Clone, Default)]
pub struct FacilityFilter {
  /// Exact match on the parent region name.
  pub region:         Option<String>,
  /// Exact match on the sub-region name.
  pub sub_region:     Option<String>,
  /// Exact match on the characteristic code.
  pub characteristic: Option<String>,
  /// Substring match on the facility name.
  pub name:           Option<String>,
  pub page:           PageRequest,
}

// ─── Batch types ─────────────────────────────────────────────────────────────

/// Rows produced by one performance ingestion pass, committed in a single
/// transaction by [`CatalogStore::apply_performance_batch`].
#[derive(Debug, Clone, Default)]
pub struct PerformanceBatch {
  pub summaries: Vec<PerformanceSummary>,
  pub details:   Vec<PerformanceDetail>,
}

impl PerformanceBatch {
  pub fn is_empty(&self) -> bool {
    self.summaries.is_empty() && self.details.is_empty()
  }
}

/// Counts reported by [`CatalogStore::apply_facility_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacilityBatchOutcome {
  pub inserted: usize,
  pub updated:  usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the encore catalog store backend.
///
/// Each write method is one transaction: an ingestion batch, a pick save, or
/// a snapshot replacement either commits entirely or leaves the store
/// untouched.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Performance reads ─────────────────────────────────────────────────

  /// Page over summaries matching `filter`. Zero matches is a valid empty
  /// result, not an error.
  fn list_performances<'a>(
    &'a self,
    filter: &'a PerformanceFilter,
  ) -> impl Future<Output = Result<Vec<PerformanceSummary>, Self::Error>> + Send + 'a;

  /// Distinct performance names matching `filter` — the autocomplete feed.
  fn performance_names<'a>(
    &'a self,
    filter: &'a PerformanceFilter,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Summaries for an explicit id set, in no particular order. Unknown ids
  /// are silently absent from the result.
  fn performances_by_ids<'a>(
    &'a self,
    ids: &'a [String],
  ) -> impl Future<Output = Result<Vec<PerformanceSummary>, Self::Error>> + Send + 'a;

  /// The detail row for `id`, or `None`.
  fn get_performance_detail<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<PerformanceDetail>, Self::Error>> + Send + 'a;

  fn summary_exists<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn detail_exists<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Up to `limit` summaries with genre `genre` starting on or after
  /// `on_or_after`, sampled in arbitrary order.
  fn sample_by_genre<'a>(
    &'a self,
    genre:       &'a str,
    on_or_after: NaiveDate,
    limit:       u32,
  ) -> impl Future<Output = Result<Vec<PerformanceSummary>, Self::Error>> + Send + 'a;

  // ── Facility reads ────────────────────────────────────────────────────

  fn list_facilities<'a>(
    &'a self,
    filter: &'a FacilityFilter,
  ) -> impl Future<Output = Result<Vec<Facility>, Self::Error>> + Send + 'a;

  fn get_facility<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + 'a;

  // ── Upcoming snapshot ─────────────────────────────────────────────────

  /// Snapshot rows with `start_date > after`, ordered by start date.
  fn list_upcoming(
    &self,
    after: NaiveDate,
  ) -> impl Future<Output = Result<Vec<UpcomingPerformance>, Self::Error>> + Send + '_;

  // ── Ingest writes — one transaction each ──────────────────────────────

  /// Commit a performance batch atomically. Summaries and details upsert by
  /// identifier, so re-applying rows the reconciler chose to re-include is
  /// well-defined.
  fn apply_performance_batch(
    &self,
    batch: PerformanceBatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Upsert facility rows atomically: new identifiers insert, existing rows
  /// have every mutable field overwritten.
  fn apply_facility_batch(
    &self,
    facilities: Vec<Facility>,
  ) -> impl Future<Output = Result<FacilityBatchOutcome, Self::Error>> + Send + '_;

  /// Replace the whole upcoming snapshot in one transaction; returns the
  /// number of rows written.
  fn replace_upcoming(
    &self,
    rows: Vec<UpcomingPerformance>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn clear_upcoming(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Session-scoped picks and genre preferences ────────────────────────

  /// Replace the pick set for `token`: prior picks are deleted and `ids`
  /// inserted in the same transaction, so stale and fresh selections never
  /// merge. Ids are not validated against the summary table.
  fn save_picks<'a>(
    &'a self,
    token: &'a str,
    ids:   &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn picks_for<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Replace the preferred-genre set for `token`; same replacement contract
  /// as [`CatalogStore::save_picks`].
  fn save_genre_prefs<'a>(
    &'a self,
    token:  &'a str,
    genres: &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn genre_prefs_for<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}
