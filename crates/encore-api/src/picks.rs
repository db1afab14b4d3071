//! Handlers for token-scoped picks and genre preferences.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/picks` | Body: `["PF…", …]`; replaces the saved set |
//! | `GET`  | `/picks` | Summary rows for the saved ids |
//! | `POST` | `/genres` | Body: `["뮤지컬", …]`; replaces the saved set |
//!
//! All require a valid bearer token; the token string itself scopes the
//! stored rows.

use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use encore_core::{performance::PerformanceSummary, store::CatalogStore};
use encore_upstream::UpstreamSource;

use crate::{AppState, auth::bearer_token, error::ApiError};

/// `POST /picks` — full replacement; ids are not validated against the
/// catalog.
pub async fn save<C, S>(
  State(state): State<AppState<C, S>>,
  headers: HeaderMap,
  Json(ids): Json<Vec<String>>,
) -> Result<Json<Value>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let token = state.tokens.verify(bearer_token(&headers)?)?;
  state
    .store
    .save_picks(&token, &ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "picks saved" })))
}

/// `GET /picks` — the saved ids resolved to summary rows; ids no longer in
/// the catalog are silently absent.
pub async fn list<C, S>(
  State(state): State<AppState<C, S>>,
  headers: HeaderMap,
) -> Result<Json<Vec<PerformanceSummary>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let token = state.tokens.verify(bearer_token(&headers)?)?;
  let ids = state
    .store
    .picks_for(&token)
    .await
    .map_err(ApiError::store)?;
  let rows = state
    .store
    .performances_by_ids(&ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `POST /genres` — full replacement of the preferred-genre set feeding
/// recommendations.
pub async fn save_genres<C, S>(
  State(state): State<AppState<C, S>>,
  headers: HeaderMap,
  Json(genres): Json<Vec<String>>,
) -> Result<Json<Value>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let token = state.tokens.verify(bearer_token(&headers)?)?;
  state
    .store
    .save_genre_prefs(&token, &genres)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "genre preferences saved" })))
}
