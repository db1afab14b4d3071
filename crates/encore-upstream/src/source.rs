//! The `UpstreamSource` trait — what the reconciler needs from the feed.
//!
//! Implemented by [`crate::client::UpstreamClient`] for the real provider
//! and by in-memory fakes in `encore-ingest`'s tests.

use std::future::Future;

use encore_core::DateWindow;

use crate::{error::UpstreamError, xml::RawRecord};

/// A paginated view of the upstream performance/facility feed.
///
/// Pages are 1-based; an empty page marks the end of a window. Detail
/// endpoints answer with exactly one record.
pub trait UpstreamSource: Send + Sync {
  /// One listing page of performances active inside `window` (inclusive).
  fn fetch_performances(
    &self,
    window: DateWindow,
    page:   u32,
    rows:   u32,
  ) -> impl Future<Output = Result<Vec<RawRecord>, UpstreamError>> + Send + '_;

  /// The full-profile record for one performance identifier.
  fn fetch_performance_detail<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<RawRecord, UpstreamError>> + Send + 'a;

  /// One listing page of facilities, optionally restricted to a region code.
  fn fetch_facilities<'a>(
    &'a self,
    region: Option<&'a str>,
    page:   u32,
    rows:   u32,
  ) -> impl Future<Output = Result<Vec<RawRecord>, UpstreamError>> + Send + 'a;

  /// The detail record for one facility identifier.
  fn fetch_facility_detail<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<RawRecord, UpstreamError>> + Send + 'a;
}
