//! JSON REST API for the encore performance catalog.
//!
//! Exposes an axum [`Router`] backed by any [`CatalogStore`] and any
//! [`UpstreamSource`] (the latter only feeds the admin refresh endpoints).
//! TLS and deployment concerns are the caller's responsibility.

pub mod admin;
pub mod auth;
pub mod error;
pub mod facilities;
pub mod performances;
pub mod picks;
pub mod recommendations;
pub mod tokens;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use auth::TokenService;
use encore_core::store::CatalogStore;
use encore_ingest::Reconciler;
use encore_upstream::UpstreamSource;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_upcoming_days() -> u32 { 30 }

/// Runtime server configuration, deserialised from `config.toml` plus
/// `ENCORE_`-prefixed environment overrides.
///
/// The upstream API key and the token-signing secret are explicit inputs
/// here; nothing deeper in the stack reads ambient process state.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub upstream_base_url: String,
  pub upstream_api_key:  String,
  pub token_secret:      String,
  /// Length of the upcoming-snapshot window, in days.
  #[serde(default = "default_upcoming_days")]
  pub upcoming_days:     u32,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<C, S> {
  pub store:      Arc<S>,
  pub tokens:     Arc<TokenService>,
  pub reconciler: Arc<Reconciler<C, S>>,
  pub config:     Arc<ServerConfig>,
}

// Manual impl — `derive(Clone)` would demand `C: Clone + S: Clone`.
impl<C, S> Clone for AppState<C, S> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      tokens:     self.tokens.clone(),
      reconciler: self.reconciler.clone(),
      config:     self.config.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the encore API.
pub fn router<C, S>(state: AppState<C, S>) -> Router
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  Router::new()
    .route("/performances", get(performances::list::<C, S>))
    .route(
      "/performances/upcoming",
      get(performances::upcoming::<C, S>)
        .delete(performances::clear_upcoming::<C, S>),
    )
    .route(
      "/performances/autocomplete",
      get(performances::autocomplete::<C, S>),
    )
    .route("/performances/{id}", get(performances::detail::<C, S>))
    .route("/facilities", get(facilities::list::<C, S>))
    .route("/facilities/{id}", get(facilities::get_one::<C, S>))
    .route(
      "/admin/refresh-performances",
      post(admin::refresh_performances::<C, S>),
    )
    .route(
      "/admin/refresh-facilities",
      post(admin::refresh_facilities::<C, S>),
    )
    .route("/token", post(tokens::issue::<C, S>))
    .route("/picks", post(picks::save::<C, S>).get(picks::list::<C, S>))
    .route("/genres", post(picks::save_genres::<C, S>))
    .route("/recommendations", get(recommendations::list::<C, S>))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Days, NaiveDate, Utc};
  use encore_core::{
    DateWindow,
    performance::PerformanceSummary,
    store::{CatalogStore as _, PerformanceBatch},
    upcoming::UpcomingPerformance,
  };
  use encore_store_sqlite::SqliteStore;
  use encore_upstream::{RawRecord, UpstreamError, UpstreamSource};
  use serde_json::Value;
  use tower::ServiceExt as _;

  /// Canned upstream: one listing page, details for every listed id.
  #[derive(Default)]
  struct StubSource {
    listing: Vec<RawRecord>,
  }

  impl UpstreamSource for StubSource {
    async fn fetch_performances(
      &self,
      _window: DateWindow,
      page:    u32,
      _rows:   u32,
    ) -> Result<Vec<RawRecord>, UpstreamError> {
      Ok(if page == 1 { self.listing.clone() } else { Vec::new() })
    }

    async fn fetch_performance_detail(
      &self,
      id: &str,
    ) -> Result<RawRecord, UpstreamError> {
      self
        .listing
        .iter()
        .find(|r| r.get("mt20id") == Some(id))
        .cloned()
        .ok_or_else(|| UpstreamError::EmptyEnvelope(id.to_string()))
    }

    async fn fetch_facilities(
      &self,
      _region: Option<&str>,
      _page:   u32,
      _rows:   u32,
    ) -> Result<Vec<RawRecord>, UpstreamError> {
      Ok(Vec::new())
    }

    async fn fetch_facility_detail(
      &self,
      id: &str,
    ) -> Result<RawRecord, UpstreamError> {
      Err(UpstreamError::EmptyEnvelope(id.to_string()))
    }
  }

  async fn make_state(listing: Vec<RawRecord>) -> AppState<StubSource, SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let config = ServerConfig {
      host:              "127.0.0.1".to_string(),
      port:              8000,
      store_path:        PathBuf::from(":memory:"),
      upstream_base_url: "http://upstream.invalid".to_string(),
      upstream_api_key:  "test-key".to_string(),
      token_secret:      "test-secret".to_string(),
      upcoming_days:     30,
    };
    AppState {
      reconciler: Arc::new(Reconciler::new(
        StubSource { listing },
        store.clone(),
      )),
      tokens: Arc::new(TokenService::new(&config.token_secret)),
      config: Arc::new(config),
      store,
    }
  }

  async fn request(
    state:   AppState<StubSource, SqliteStore>,
    method:  &str,
    uri:     &str,
    token:   Option<&str>,
    body:    Option<&Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string())),
      None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn summary(id: &str, genre: &str, start: NaiveDate) -> PerformanceSummary {
    PerformanceSummary {
      id:             id.to_string(),
      name:           format!("공연 {id}"),
      start_date:     start,
      end_date:       start + Days::new(30),
      venue:          "블루스퀘어".to_string(),
      poster:         "http://img.example/p.gif".to_string(),
      genre:          genre.to_string(),
      state:          "공연예정".to_string(),
      open_run:       Some(false),
      area:           Some("11".to_string()),
      kid_flag:       None,
      last_refreshed: Utc::now().date_naive(),
    }
  }

  async fn seed_summaries(
    state:     &AppState<StubSource, SqliteStore>,
    summaries: Vec<PerformanceSummary>,
  ) {
    state
      .store
      .apply_performance_batch(PerformanceBatch { summaries, details: vec![] })
      .await
      .unwrap();
  }

  async fn issue_token(state: &AppState<StubSource, SqliteStore>) -> String {
    let (status, body) =
      request(state.clone(), "POST", "/token", None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
  }

  // ── Listings ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn listing_requires_well_formed_dates() {
    let state = make_state(vec![]).await;
    let (status, body) = request(
      state,
      "GET",
      "/performances?stdate=2026-01-01&eddate=20261231",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("YYYYMMDD"));
  }

  #[tokio::test]
  async fn listing_returns_matching_rows_and_empty_success() {
    let state = make_state(vec![]).await;
    seed_summaries(&state, vec![
      summary("PF1", "뮤지컬", d(2026, 3, 1)),
      summary("PF2", "연극", d(2026, 3, 1)),
    ])
    .await;

    let (status, body) = request(
      state.clone(),
      "GET",
      "/performances?stdate=20260101&eddate=20261231&genre=%EB%AE%A4%EC%A7%80%EC%BB%AC",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "PF1");

    // Zero matches after filtering is an empty success, not a 404.
    let (status, body) = request(
      state,
      "GET",
      "/performances?stdate=20270101&eddate=20271231",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn detail_lookup_misses_with_404() {
    let state = make_state(vec![]).await;
    let (status, body) =
      request(state, "GET", "/performances/PF404", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("PF404"));
  }

  #[tokio::test]
  async fn facility_listing_with_no_rows_is_empty_success() {
    let state = make_state(vec![]).await;
    let (status, body) = request(state, "GET", "/facilities", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
  }

  // ── Upcoming snapshot ───────────────────────────────────────────────────

  #[tokio::test]
  async fn upcoming_rows_default_their_optional_fields() {
    let state = make_state(vec![]).await;
    let start = Utc::now().date_naive() + Days::new(5);
    state
      .store
      .replace_upcoming(vec![UpcomingPerformance {
        id:         "PF1".to_string(),
        name:       "다가오는 공연".to_string(),
        start_date: start,
        end_date:   start + Days::new(10),
        venue:      "대학로".to_string(),
        poster:     "http://img.example/u.gif".to_string(),
        area:       None,
        genre:      None,
        open_run:   None,
        state:      "공연예정".to_string(),
      }])
      .await
      .unwrap();

    let (status, body) =
      request(state, "GET", "/performances/upcoming", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["area"], "Unknown");
    assert_eq!(rows[0]["genre"], "Unknown");
    assert_eq!(rows[0]["open_run"], "N/A");
  }

  #[tokio::test]
  async fn delete_upcoming_clears_the_snapshot() {
    let state = make_state(vec![]).await;
    let start = Utc::now().date_naive() + Days::new(5);
    state
      .store
      .replace_upcoming(vec![UpcomingPerformance {
        id:         "PF1".to_string(),
        name:       "곧 사라질 행".to_string(),
        start_date: start,
        end_date:   start + Days::new(10),
        venue:      "대학로".to_string(),
        poster:     "http://img.example/u.gif".to_string(),
        area:       None,
        genre:      None,
        open_run:   None,
        state:      "공연예정".to_string(),
      }])
      .await
      .unwrap();

    let (status, _) = request(
      state.clone(),
      "DELETE",
      "/performances/upcoming",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) =
      request(state, "GET", "/performances/upcoming", None, None).await;
    assert!(body.as_array().unwrap().is_empty());
  }

  // ── Tokens and picks ────────────────────────────────────────────────────

  #[tokio::test]
  async fn picks_require_a_bearer_token() {
    let state = make_state(vec![]).await;
    let (status, _) = request(state.clone(), "GET", "/picks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
      request(state, "GET", "/picks", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn picks_save_then_read_resolves_summaries() {
    let state = make_state(vec![]).await;
    seed_summaries(&state, vec![summary("PF1", "뮤지컬", d(2026, 3, 1))]).await;
    let token = issue_token(&state).await;

    let (status, _) = request(
      state.clone(),
      "POST",
      "/picks",
      Some(&token),
      Some(&serde_json::json!(["PF1", "PF404"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
      request(state, "GET", "/picks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    // The unknown id was accepted on save but cannot resolve to a summary.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "PF1");
  }

  #[tokio::test]
  async fn saving_picks_twice_replaces_the_set() {
    let state = make_state(vec![]).await;
    seed_summaries(&state, vec![
      summary("PF1", "뮤지컬", d(2026, 3, 1)),
      summary("PF2", "연극", d(2026, 3, 1)),
    ])
    .await;
    let token = issue_token(&state).await;

    request(
      state.clone(),
      "POST",
      "/picks",
      Some(&token),
      Some(&serde_json::json!(["PF1"])),
    )
    .await;
    request(
      state.clone(),
      "POST",
      "/picks",
      Some(&token),
      Some(&serde_json::json!(["PF2"])),
    )
    .await;

    let (_, body) = request(state, "GET", "/picks", Some(&token), None).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "PF2");
  }

  // ── Recommendations ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn recommendations_without_saved_genres_is_404() {
    let state = make_state(vec![]).await;
    let token = issue_token(&state).await;
    let (status, _) =
      request(state, "GET", "/recommendations", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn recommendations_group_future_rows_by_genre() {
    let state = make_state(vec![]).await;
    let today = Utc::now().date_naive();
    seed_summaries(&state, vec![
      summary("FUT1", "뮤지컬", today + Days::new(10)),
      summary("FUT2", "뮤지컬", today + Days::new(20)),
      summary("PAST", "뮤지컬", today - Days::new(400)),
      summary("PLAY", "연극", today + Days::new(10)),
    ])
    .await;
    let token = issue_token(&state).await;

    request(
      state.clone(),
      "POST",
      "/genres",
      Some(&token),
      Some(&serde_json::json!(["뮤지컬"])),
    )
    .await;

    let (status, body) =
      request(state, "GET", "/recommendations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let map = body.as_object().unwrap();
    assert_eq!(map.len(), 1);
    let rows = map["뮤지컬"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
      assert_eq!(row["genre"], "뮤지컬");
      let start: NaiveDate =
        serde_json::from_value(row["start_date"].clone()).unwrap();
      assert!(start >= today);
    }
  }

  // ── Admin refresh ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_refresh_ingests_the_stub_listing_end_to_end() {
    let listing: Vec<RawRecord> = ["PF1", "PF2", "PF3", "PF4"]
      .iter()
      .map(|id| {
        RawRecord::from_fields([
          ("mt20id", *id),
          ("prfnm", "공연"),
          ("prfpdfrom", "2026.09.01"),
          ("prfpdto", "2026.09.30"),
          ("genrenm", "연극"),
        ])
      })
      .collect();
    let state = make_state(listing).await;

    let (status, body) = request(
      state.clone(),
      "POST",
      "/admin/refresh-performances?stdate=20260901&eddate=20260930",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["performances"]["summaries_written"], 4);
    assert_eq!(body["performances"]["details_written"], 4);
    assert_eq!(body["upcoming_rows"], 4);

    let (status, body) = request(
      state,
      "GET",
      "/performances?stdate=20260901&eddate=20260930",
      None,
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
  }
}
