//! Reconciler tests against a fake upstream source and an in-memory store.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::NaiveDate;
use encore_core::{
  DateWindow, IngestPolicy, RefreshPolicy,
  store::{CatalogStore, PerformanceFilter},
};
use encore_store_sqlite::SqliteStore;
use encore_upstream::{RawRecord, UpstreamError, UpstreamSource};

use crate::{IngestError, Reconciler};

// ─── Fake source ─────────────────────────────────────────────────────────────

/// Serves canned listing pages and detail records, counting detail fetches.
#[derive(Default, Clone)]
struct FakeSource {
  performance_pages: Vec<Vec<RawRecord>>,
  details:           HashMap<String, RawRecord>,
  facility_pages:    Vec<Vec<RawRecord>>,
  facility_details:  HashMap<String, RawRecord>,
  detail_fetches:    Arc<AtomicUsize>,
  facility_fetches:  Arc<AtomicUsize>,
}

impl UpstreamSource for FakeSource {
  async fn fetch_performances(
    &self,
    _window: DateWindow,
    page:    u32,
    _rows:   u32,
  ) -> Result<Vec<RawRecord>, UpstreamError> {
    Ok(
      self
        .performance_pages
        .get(page as usize - 1)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn fetch_performance_detail(
    &self,
    id: &str,
  ) -> Result<RawRecord, UpstreamError> {
    self.detail_fetches.fetch_add(1, Ordering::SeqCst);
    self
      .details
      .get(id)
      .cloned()
      .ok_or_else(|| UpstreamError::EmptyEnvelope(id.to_string()))
  }

  async fn fetch_facilities(
    &self,
    _region: Option<&str>,
    page:    u32,
    _rows:   u32,
  ) -> Result<Vec<RawRecord>, UpstreamError> {
    Ok(
      self
        .facility_pages
        .get(page as usize - 1)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn fetch_facility_detail(
    &self,
    id: &str,
  ) -> Result<RawRecord, UpstreamError> {
    self.facility_fetches.fetch_add(1, Ordering::SeqCst);
    self
      .facility_details
      .get(id)
      .cloned()
      .ok_or_else(|| UpstreamError::EmptyEnvelope(id.to_string()))
  }
}

// ─── Record builders ─────────────────────────────────────────────────────────

fn listing(id: &str) -> RawRecord {
  RawRecord::from_fields([
    ("mt20id", id),
    ("prfnm", "무대 인사"),
    ("prfpdfrom", "2026.09.01"),
    ("prfpdto", "2026.09.30"),
    ("fcltynm", "대학로 소극장"),
    ("poster", "http://img.example/p.gif"),
    ("genrenm", "연극"),
    ("prfstate", "공연예정"),
  ])
}

fn detail_record(id: &str) -> RawRecord {
  let mut raw = listing(id);
  raw.fields.insert("prfcast".into(), "홍길동".into());
  raw.fields.insert("prfruntime".into(), "1시간 40분".into());
  raw.styurls.push("http://img.example/s.jpg".into());
  raw
}

fn facility_listing(id: &str) -> RawRecord {
  RawRecord::from_fields([
    ("mt10id", id),
    ("fcltynm", "예술의전당"),
    ("mt13cnt", "7"),
    ("fcltychartr", "공공(문예회관)"),
    ("sidonm", "서울"),
    ("gugunnm", "서초구"),
  ])
}

fn facility_detail(seats: &str) -> RawRecord {
  RawRecord::from_fields([
    ("seatscale", seats),
    ("telno", "02-580-1300"),
    ("adres", "서울특별시 서초구"),
    ("la", "37.48"),
    ("lo", "127.01"),
  ])
}

fn window() -> DateWindow {
  DateWindow::new(
    NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
    NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
  )
}

fn wide_filter() -> PerformanceFilter {
  PerformanceFilter::over(DateWindow::new(
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
  ))
}

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.unwrap())
}

fn four_record_source() -> FakeSource {
  // Page 1 held a single record (the upstream serialises that as a
  // singleton), page 2 an array of three, page 3 is empty.
  let ids = ["PF1", "PF2", "PF3", "PF4"];
  FakeSource {
    performance_pages: vec![
      vec![listing(ids[0])],
      ids[1..].iter().map(|id| listing(id)).collect(),
    ],
    details: ids
      .iter()
      .map(|id| (id.to_string(), detail_record(id)))
      .collect(),
    ..Default::default()
  }
}

// ─── Performance passes ──────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_listing_yields_four_rows_and_four_detail_fetches() {
  let source = four_record_source();
  let fetches = source.detail_fetches.clone();
  let store = store().await;
  let reconciler = Reconciler::new(source, store.clone());

  let report = reconciler.refresh_performances(window()).await.unwrap();

  assert_eq!(report.pages_walked, 2);
  assert_eq!(report.records_seen, 4);
  assert_eq!(report.summaries_written, 4);
  assert_eq!(report.details_written, 4);
  assert_eq!(fetches.load(Ordering::SeqCst), 4);

  let rows = store.list_performances(&wide_filter()).await.unwrap();
  assert_eq!(rows.len(), 4);
  for id in ["PF1", "PF2", "PF3", "PF4"] {
    assert!(store.detail_exists(id).await.unwrap());
  }
}

#[tokio::test]
async fn second_pass_is_idempotent_and_skips_detail_fetches() {
  let source = four_record_source();
  let fetches = source.detail_fetches.clone();
  let store = store().await;
  let reconciler = Reconciler::new(source, store.clone());

  reconciler.refresh_performances(window()).await.unwrap();
  let second = reconciler.refresh_performances(window()).await.unwrap();

  // Existing summaries are left untouched and existing details are not
  // re-fetched.
  assert_eq!(second.summaries_written, 0);
  assert_eq!(second.details_written, 0);
  assert_eq!(fetches.load(Ordering::SeqCst), 4);

  let rows = store.list_performances(&wide_filter()).await.unwrap();
  assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn overwrite_detail_policy_refetches_every_pass() {
  let source = four_record_source();
  let fetches = source.detail_fetches.clone();
  let store = store().await;
  let reconciler =
    Reconciler::new(source, store.clone()).with_policy(IngestPolicy {
      detail: RefreshPolicy::Overwrite,
      ..IngestPolicy::default()
    });

  reconciler.refresh_performances(window()).await.unwrap();
  reconciler.refresh_performances(window()).await.unwrap();

  assert_eq!(fetches.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn malformed_listing_record_is_skipped_not_fatal() {
  let mut bad = listing("PF9");
  bad.fields.insert("prfpdfrom".into(), "09/01/2026".into());
  let source = FakeSource {
    performance_pages: vec![vec![listing("PF1"), bad]],
    details: HashMap::from([("PF1".to_string(), detail_record("PF1"))]),
    ..Default::default()
  };
  let store = store().await;
  let reconciler = Reconciler::new(source, store.clone());

  let report = reconciler.refresh_performances(window()).await.unwrap();
  assert_eq!(report.records_skipped, 1);
  assert_eq!(report.summaries_written, 1);
  assert!(store.summary_exists("PF1").await.unwrap());
  assert!(!store.summary_exists("PF9").await.unwrap());
}

#[tokio::test]
async fn bad_detail_date_aborts_the_whole_batch() {
  let mut broken = detail_record("PF2");
  broken.fields.insert("prfpdto".into(), "말도 안 됨".into());
  let source = FakeSource {
    performance_pages: vec![vec![listing("PF1"), listing("PF2")]],
    details: HashMap::from([
      ("PF1".to_string(), detail_record("PF1")),
      ("PF2".to_string(), broken),
    ]),
    ..Default::default()
  };
  let store = store().await;
  let reconciler = Reconciler::new(source, store.clone());

  let err = reconciler.refresh_performances(window()).await.unwrap_err();
  assert!(matches!(err, IngestError::Normalize(_)));

  // Full-batch rollback: nothing from the failed pass is durable, including
  // the summary that normalized cleanly.
  let rows = store.list_performances(&wide_filter()).await.unwrap();
  assert!(rows.is_empty());
  assert!(!store.detail_exists("PF1").await.unwrap());
}

#[tokio::test]
async fn missing_detail_record_aborts_with_an_upstream_error() {
  let source = FakeSource {
    performance_pages: vec![vec![listing("PF1")]],
    ..Default::default()
  };
  let store = store().await;
  let reconciler = Reconciler::new(source, store.clone());

  let err = reconciler.refresh_performances(window()).await.unwrap_err();
  assert!(matches!(err, IngestError::Upstream(_)));
  assert!(!store.summary_exists("PF1").await.unwrap());
}

// ─── Facility passes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn facility_pass_refetches_and_overwrites_every_run() {
  let store = store().await;

  let first = FakeSource {
    facility_pages: vec![vec![facility_listing("FC1")]],
    facility_details: HashMap::from([(
      "FC1".to_string(),
      facility_detail("6987"),
    )]),
    ..Default::default()
  };
  let report = Reconciler::new(first, store.clone())
    .refresh_facilities(None)
    .await
    .unwrap();
  assert_eq!(report.inserted, 1);
  assert_eq!(report.updated, 0);

  // Same identifier, new seat count: the stored row is overwritten.
  let second = FakeSource {
    facility_pages: vec![vec![facility_listing("FC1")]],
    facility_details: HashMap::from([(
      "FC1".to_string(),
      facility_detail("7000"),
    )]),
    ..Default::default()
  };
  let fetches = second.facility_fetches.clone();
  let report = Reconciler::new(second, store.clone())
    .refresh_facilities(None)
    .await
    .unwrap();
  assert_eq!(report.updated, 1);
  assert_eq!(fetches.load(Ordering::SeqCst), 1);

  let got = store.get_facility("FC1").await.unwrap().unwrap();
  assert_eq!(got.seat_count, 7000);
}

#[tokio::test]
async fn write_once_facility_policy_skips_known_identifiers() {
  let store = store().await;
  let policy = IngestPolicy {
    facility: RefreshPolicy::WriteOnce,
    ..IngestPolicy::default()
  };

  let source = FakeSource {
    facility_pages: vec![vec![facility_listing("FC1")]],
    facility_details: HashMap::from([(
      "FC1".to_string(),
      facility_detail("6987"),
    )]),
    ..Default::default()
  };
  let fetches = source.facility_fetches.clone();
  let reconciler =
    Reconciler::new(source, store.clone()).with_policy(policy);

  reconciler.refresh_facilities(None).await.unwrap();
  let second = reconciler.refresh_facilities(None).await.unwrap();

  // Known identifier: no detail fetch, no write.
  assert_eq!(fetches.load(Ordering::SeqCst), 1);
  assert_eq!(second.inserted, 0);
  assert_eq!(second.updated, 0);

  let got = store.get_facility("FC1").await.unwrap().unwrap();
  assert_eq!(got.seat_count, 6987);
}

// ─── Upcoming snapshot ───────────────────────────────────────────────────────

#[tokio::test]
async fn rebuild_upcoming_replaces_the_snapshot_wholesale() {
  let store = store().await;

  let source = FakeSource {
    performance_pages: vec![vec![listing("PF1"), listing("PF2")]],
    ..Default::default()
  };
  let written = Reconciler::new(source, store.clone())
    .rebuild_upcoming(window())
    .await
    .unwrap();
  assert_eq!(written, 2);

  let source = FakeSource {
    performance_pages: vec![vec![listing("PF3")]],
    ..Default::default()
  };
  let written = Reconciler::new(source, store.clone())
    .rebuild_upcoming(window())
    .await
    .unwrap();
  assert_eq!(written, 1);

  let rows = store
    .list_upcoming(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].id, "PF3");
}
