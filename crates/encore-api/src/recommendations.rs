//! Genre-based recommendations for a session's saved preferences.

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::HeaderMap};
use chrono::{NaiveDate, Utc};

use encore_core::{performance::PerformanceSummary, store::CatalogStore};
use encore_upstream::UpstreamSource;

use crate::{AppState, auth::bearer_token, error::ApiError};

/// Cap per genre in a recommendation response.
const SAMPLE_LIMIT: u32 = 10;

/// For each distinct preferred genre, sample future performances of that
/// genre, grouped by genre. Pure store composition — the handler only adds
/// token verification on top.
pub async fn recommendations_for<S>(
  store:  &S,
  genres: &[String],
  today:  NaiveDate,
) -> Result<BTreeMap<String, Vec<PerformanceSummary>>, S::Error>
where
  S: CatalogStore,
{
  let mut by_genre = BTreeMap::new();
  for genre in genres {
    if by_genre.contains_key(genre) {
      continue;
    }
    let sampled = store.sample_by_genre(genre, today, SAMPLE_LIMIT).await?;
    by_genre.insert(genre.clone(), sampled);
  }
  Ok(by_genre)
}

/// `GET /recommendations` — 404 when the session has no saved genres.
pub async fn list<C, S>(
  State(state): State<AppState<C, S>>,
  headers: HeaderMap,
) -> Result<Json<BTreeMap<String, Vec<PerformanceSummary>>>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let token = state.tokens.verify(bearer_token(&headers)?)?;
  let genres = state
    .store
    .genre_prefs_for(&token)
    .await
    .map_err(ApiError::store)?;
  if genres.is_empty() {
    return Err(ApiError::NotFound(
      "no saved genre preferences for this session".to_string(),
    ));
  }

  let today = Utc::now().date_naive();
  let by_genre = recommendations_for(state.store.as_ref(), &genres, today)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(by_genre))
}
