//! [`Reconciler`] — the plan → fetch → commit engine.
//!
//! A pass walks listing pages until an empty page, normalizes each record,
//! and consults the store to decide what the batch contains. Detail fetches
//! for new identifiers fan out with bounded concurrency — still exactly one
//! fetch per identifier — and the whole batch commits in one transaction at
//! the end. Any fetch or normalization failure on the detail path aborts the
//! pass before commit, so the store never holds a partial batch.
//!
//! Listing-record normalization failures are record-scoped: the record is
//! skipped with a warning and the pass continues.

use std::{collections::HashSet, future::Future, sync::Arc};

use chrono::Utc;
use futures::{StreamExt as _, TryStreamExt as _, stream};
use serde::Serialize;
use tokio::sync::Mutex;

use encore_core::{
  DateWindow, IngestPolicy,
  facility::Facility,
  store::{CatalogStore, PerformanceBatch},
};
use encore_upstream::{RawRecord, UpstreamSource, normalize};

use crate::error::{IngestError, Result};

/// Rows requested per listing page.
const PAGE_ROWS: u32 = 1000;

/// Default bound on concurrent detail fetches.
const DETAIL_CONCURRENCY: usize = 4;

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Counts from one performance pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PerformanceRefresh {
  pub pages_walked:      u32,
  pub records_seen:      usize,
  pub records_skipped:   usize,
  pub summaries_written: usize,
  pub details_written:   usize,
}

/// Counts from one facility pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FacilityRefresh {
  pub records_seen:    usize,
  pub records_skipped: usize,
  pub inserted:        usize,
  pub updated:         usize,
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// The reconciliation/upsert engine.
///
/// Holds an async mutex so that a request-triggered refresh and the startup
/// refresh cannot interleave their writes; passes are serialised, never run
/// concurrently.
pub struct Reconciler<C, S> {
  source:             C,
  store:              Arc<S>,
  policy:             IngestPolicy,
  detail_concurrency: usize,
  lock:               Mutex<()>,
}

impl<C, S> Reconciler<C, S>
where
  C: UpstreamSource,
  S: CatalogStore,
{
  pub fn new(source: C, store: Arc<S>) -> Self {
    Self {
      source,
      store,
      policy: IngestPolicy::default(),
      detail_concurrency: DETAIL_CONCURRENCY,
      lock: Mutex::new(()),
    }
  }

  pub fn with_policy(mut self, policy: IngestPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_detail_concurrency(mut self, bound: usize) -> Self {
    self.detail_concurrency = bound.max(1);
    self
  }

  /// Walk listing pages starting at 1 until an empty page.
  async fn walk_pages<F, Fut>(&self, mut fetch_page: F) -> Result<(Vec<RawRecord>, u32)>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<RawRecord>>> + Send,
  {
    let mut records = Vec::new();
    let mut page = 1;
    loop {
      let page_records = fetch_page(page).await?;
      if page_records.is_empty() {
        break;
      }
      records.extend(page_records);
      page += 1;
    }
    Ok((records, page - 1))
  }

  // ── Performances ──────────────────────────────────────────────────────────

  /// Re-walk `window` and reconcile every listed performance.
  pub async fn refresh_performances(
    &self,
    window: DateWindow,
  ) -> Result<PerformanceRefresh> {
    let _guard = self.lock.lock().await;
    let today = Utc::now().date_naive();

    let (records, pages_walked) = self
      .walk_pages(|page| async move {
        Ok(
          self
            .source
            .fetch_performances(window, page, PAGE_ROWS)
            .await?,
        )
      })
      .await?;

    let mut report = PerformanceRefresh {
      pages_walked,
      records_seen: records.len(),
      ..Default::default()
    };

    // Plan: decide per identifier what the batch contains.
    let mut batch = PerformanceBatch::default();
    let mut pending_details: Vec<String> = Vec::new();
    let mut planned: HashSet<String> = HashSet::new();

    for raw in &records {
      let summary = match normalize::summary(raw, today) {
        Ok(s) => s,
        Err(e) => {
          tracing::warn!(error = %e, "skipping malformed listing record");
          report.records_skipped += 1;
          continue;
        }
      };
      let id = summary.id.clone();
      if !planned.insert(id.clone()) {
        continue;
      }

      if self.policy.summary.overwrites()
        || !self.store.summary_exists(&id).await.map_err(IngestError::store)?
      {
        batch.summaries.push(summary);
      }
      if self.policy.detail.overwrites()
        || !self.store.detail_exists(&id).await.map_err(IngestError::store)?
      {
        pending_details.push(id);
      }
    }

    // Fetch: one detail round trip per pending identifier, fanned out with
    // bounded concurrency. The first failure aborts the pass.
    batch.details = stream::iter(pending_details.into_iter().map(|id| {
      let source = &self.source;
      async move {
        let raw = source.fetch_performance_detail(&id).await?;
        normalize::detail(&raw, today).map_err(IngestError::from)
      }
    }))
    .buffer_unordered(self.detail_concurrency)
    .try_collect()
    .await?;

    report.summaries_written = batch.summaries.len();
    report.details_written = batch.details.len();

    // Commit: one transaction for the whole batch.
    if !batch.is_empty() {
      self
        .store
        .apply_performance_batch(batch)
        .await
        .map_err(IngestError::store)?;
    }

    tracing::info!(
      pages = report.pages_walked,
      seen = report.records_seen,
      skipped = report.records_skipped,
      summaries = report.summaries_written,
      details = report.details_written,
      "performance refresh committed"
    );
    Ok(report)
  }

  // ── Facilities ────────────────────────────────────────────────────────────

  /// Reconcile the facility catalog, optionally restricted to a region code.
  ///
  /// Under the default `Overwrite` policy every listed facility is
  /// re-fetched and its stored row overwritten; under `WriteOnce` known
  /// identifiers are skipped, detail fetch included.
  pub async fn refresh_facilities(
    &self,
    region: Option<&str>,
  ) -> Result<FacilityRefresh> {
    let _guard = self.lock.lock().await;

    let (records, _) = self
      .walk_pages(|page| async move {
        Ok(self.source.fetch_facilities(region, page, PAGE_ROWS).await?)
      })
      .await?;

    let mut report = FacilityRefresh {
      records_seen: records.len(),
      ..Default::default()
    };

    let mut pending: Vec<RawRecord> = Vec::new();
    let mut planned: HashSet<String> = HashSet::new();
    for raw in records {
      let Some(id) = raw.get("mt10id").map(str::to_string) else {
        tracing::warn!("skipping facility listing record without identifier");
        report.records_skipped += 1;
        continue;
      };
      if !planned.insert(id.clone()) {
        continue;
      }
      if !self.policy.facility.overwrites()
        && self
          .store
          .get_facility(&id)
          .await
          .map_err(IngestError::store)?
          .is_some()
      {
        continue;
      }
      pending.push(raw);
    }

    let facilities: Vec<Facility> =
      stream::iter(pending.into_iter().map(|listing| {
        let source = &self.source;
        async move {
          let id = listing.require("mt10id")?;
          let detail = source.fetch_facility_detail(id).await?;
          normalize::facility(&listing, &detail).map_err(IngestError::from)
        }
      }))
      .buffer_unordered(self.detail_concurrency)
      .try_collect()
      .await?;

    let outcome = self
      .store
      .apply_facility_batch(facilities)
      .await
      .map_err(IngestError::store)?;
    report.inserted = outcome.inserted;
    report.updated = outcome.updated;

    tracing::info!(
      seen = report.records_seen,
      skipped = report.records_skipped,
      inserted = report.inserted,
      updated = report.updated,
      "facility refresh committed"
    );
    Ok(report)
  }

  // ── Upcoming snapshot ─────────────────────────────────────────────────────

  /// Re-walk `window` and replace the upcoming snapshot wholesale.
  pub async fn rebuild_upcoming(&self, window: DateWindow) -> Result<usize> {
    let _guard = self.lock.lock().await;

    let (records, _) = self
      .walk_pages(|page| async move {
        Ok(
          self
            .source
            .fetch_performances(window, page, PAGE_ROWS)
            .await?,
        )
      })
      .await?;

    let mut rows = Vec::with_capacity(records.len());
    for raw in &records {
      match normalize::upcoming(raw) {
        Ok(row) => rows.push(row),
        Err(e) => {
          tracing::warn!(error = %e, "skipping malformed upcoming record");
        }
      }
    }

    let written = self
      .store
      .replace_upcoming(rows)
      .await
      .map_err(IngestError::store)?;
    tracing::info!(rows = written, "upcoming snapshot rebuilt");
    Ok(written)
  }
}
