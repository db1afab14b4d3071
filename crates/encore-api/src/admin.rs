//! Administrative refresh endpoints.
//!
//! Both run behind the reconciler's ingestion lock, so a request-triggered
//! refresh serialises against the startup refresh rather than interleaving
//! with it.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};

use encore_core::{DateWindow, store::CatalogStore};
use encore_ingest::{FacilityRefresh, PerformanceRefresh};
use encore_upstream::UpstreamSource;

use crate::{AppState, error::ApiError, performances::parse_date};

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
  pub stdate: Option<String>,
  pub eddate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
  pub performances:  PerformanceRefresh,
  pub upcoming_rows: usize,
}

/// `POST /admin/refresh-performances` — re-walk the window (default: today)
/// and rebuild the upcoming snapshot for the configured horizon.
pub async fn refresh_performances<C, S>(
  State(state): State<AppState<C, S>>,
  Query(params): Query<RefreshParams>,
) -> Result<Json<RefreshResponse>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let today = Utc::now().date_naive();
  let window = match (params.stdate, params.eddate) {
    (Some(start), Some(end)) => {
      DateWindow::new(parse_date(&start)?, parse_date(&end)?)
    }
    (None, None) => DateWindow::day(today),
    _ => {
      return Err(ApiError::BadRequest(
        "stdate and eddate must be supplied together".to_string(),
      ));
    }
  };

  let performances = state.reconciler.refresh_performances(window).await?;

  let horizon = today + Days::new(state.config.upcoming_days.into());
  let upcoming_rows = state
    .reconciler
    .rebuild_upcoming(DateWindow::new(today, horizon))
    .await?;

  Ok(Json(RefreshResponse { performances, upcoming_rows }))
}

#[derive(Debug, Deserialize)]
pub struct FacilityParams {
  pub region: Option<String>,
}

/// `POST /admin/refresh-facilities`
pub async fn refresh_facilities<C, S>(
  State(state): State<AppState<C, S>>,
  Query(params): Query<FacilityParams>,
) -> Result<Json<FacilityRefresh>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let report = state
    .reconciler
    .refresh_facilities(params.region.as_deref())
    .await?;
  Ok(Json(report))
}
