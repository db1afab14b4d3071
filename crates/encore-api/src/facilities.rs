//! Handlers for `/facilities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/facilities` | Optional region/characteristic/name filters |
//! | `GET`  | `/facilities/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use encore_core::{
  facility::Facility,
  store::{CatalogStore, FacilityFilter, PageRequest},
};
use encore_upstream::UpstreamSource;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub region:         Option<String>,
  pub sub_region:     Option<String>,
  pub characteristic: Option<String>,
  pub name:           Option<String>,
  pub cpage:          Option<u32>,
  pub rows:           Option<u32>,
}

/// `GET /facilities` — paged listing; zero matches is an empty success.
pub async fn list<C, S>(
  State(state): State<AppState<C, S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Facility>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let filter = FacilityFilter {
    region:         params.region,
    sub_region:     params.sub_region,
    characteristic: params.characteristic,
    name:           params.name,
    page:           PageRequest::new(
      params.cpage.unwrap_or(1),
      params.rows.unwrap_or(5),
    ),
  };

  let rows = state
    .store
    .list_facilities(&filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /facilities/:id`
pub async fn get_one<C, S>(
  State(state): State<AppState<C, S>>,
  Path(id): Path<String>,
) -> Result<Json<Facility>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let facility = state
    .store
    .get_facility(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("facility {id} not found")))?;
  Ok(Json(facility))
}
