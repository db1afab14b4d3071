//! Handlers for `/performances` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/performances` | Required `stdate`/`eddate` (`YYYYMMDD`) |
//! | `GET`    | `/performances/upcoming` | Snapshot rows starting after today |
//! | `DELETE` | `/performances/upcoming` | Clear the snapshot |
//! | `GET`    | `/performances/autocomplete` | Name suggestions |
//! | `GET`    | `/performances/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use encore_core::{
  DateWindow,
  performance::{PerformanceDetail, PerformanceSummary},
  store::{CatalogStore, PageRequest, PerformanceFilter},
  upcoming::UpcomingPerformance,
};
use encore_upstream::UpstreamSource;

use crate::{AppState, error::ApiError};

/// `YYYYMMDD`, as the read API and the upstream both speak.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
  NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| {
    ApiError::BadRequest("invalid date format, use YYYYMMDD".to_string())
  })
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub stdate:     String,
  pub eddate:     String,
  pub cpage:      Option<u32>,
  pub rows:       Option<u32>,
  pub name:       Option<String>,
  pub venue:      Option<String>,
  pub genre:      Option<String>,
  pub id_prefix:  Option<String>,
  pub region:     Option<String>,
  pub sub_region: Option<String>,
  pub kid_flag:   Option<String>,
  pub state:      Option<String>,
  pub open_run:   Option<bool>,
}

impl ListParams {
  fn into_filter(self) -> Result<PerformanceFilter, ApiError> {
    let window =
      DateWindow::new(parse_date(&self.stdate)?, parse_date(&self.eddate)?);

    // Region filters concatenate into a prefix match on the area code.
    let area_prefix = self.region.map(|region| {
      format!("{region}{}", self.sub_region.unwrap_or_default())
    });

    Ok(PerformanceFilter {
      window,
      name: self.name,
      venue: self.venue,
      genre: self.genre,
      id_prefix: self.id_prefix,
      area_prefix,
      kid_flag: self.kid_flag,
      state: self.state,
      open_run: self.open_run,
      page: PageRequest::new(self.cpage.unwrap_or(1), self.rows.unwrap_or(10)),
    })
  }
}

/// `GET /performances` — paged listing; zero matches is an empty success.
pub async fn list<C, S>(
  State(state): State<AppState<C, S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PerformanceSummary>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let filter = params.into_filter()?;
  let rows = state
    .store
    .list_performances(&filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Autocomplete ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
  pub stdate: String,
  pub eddate: String,
  pub name:   String,
  pub cpage:  Option<u32>,
  pub rows:   Option<u32>,
}

/// `GET /performances/autocomplete` — distinct name suggestions.
pub async fn autocomplete<C, S>(
  State(state): State<AppState<C, S>>,
  Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<String>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let mut filter = PerformanceFilter::over(DateWindow::new(
    parse_date(&params.stdate)?,
    parse_date(&params.eddate)?,
  ));
  filter.name = Some(params.name);
  filter.page =
    PageRequest::new(params.cpage.unwrap_or(1), params.rows.unwrap_or(10));

  let names = state
    .store
    .performance_names(&filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(names))
}

// ─── Upcoming snapshot ────────────────────────────────────────────────────────

/// Snapshot row shaped for the front end: optional fields are defaulted
/// rather than null.
#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
  pub id:         String,
  pub name:       String,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub venue:      String,
  pub poster:     String,
  pub area:       String,
  pub genre:      String,
  pub open_run:   String,
  pub state:      String,
}

impl From<UpcomingPerformance> for UpcomingResponse {
  fn from(row: UpcomingPerformance) -> Self {
    Self {
      id:         row.id,
      name:       row.name,
      start_date: row.start_date,
      end_date:   row.end_date,
      venue:      row.venue,
      poster:     row.poster,
      area:       row.area.unwrap_or_else(|| "Unknown".to_string()),
      genre:      row.genre.unwrap_or_else(|| "Unknown".to_string()),
      open_run:   match row.open_run {
        Some(true) => "Y".to_string(),
        Some(false) => "N".to_string(),
        None => "N/A".to_string(),
      },
      state:      row.state,
    }
  }
}

/// `GET /performances/upcoming` — snapshot rows starting after today.
pub async fn upcoming<C, S>(
  State(state): State<AppState<C, S>>,
) -> Result<Json<Vec<UpcomingResponse>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let today = Utc::now().date_naive();
  let rows = state
    .store
    .list_upcoming(today)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows.into_iter().map(UpcomingResponse::from).collect()))
}

/// `DELETE /performances/upcoming` — drop the snapshot wholesale.
pub async fn clear_upcoming<C, S>(
  State(state): State<AppState<C, S>>,
) -> Result<Json<Value>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  state.store.clear_upcoming().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "upcoming snapshot cleared" })))
}

// ─── Detail ───────────────────────────────────────────────────────────────────

/// `GET /performances/:id`
pub async fn detail<C, S>(
  State(state): State<AppState<C, S>>,
  Path(id): Path<String>,
) -> Result<Json<PerformanceDetail>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let detail = state
    .store
    .get_performance_detail(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("performance {id} not found")))?;
  Ok(Json(detail))
}
