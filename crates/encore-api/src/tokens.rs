//! Token issuance.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use encore_core::store::CatalogStore;
use encore_upstream::UpstreamSource;

use crate::{AppState, error::ApiError};

/// `POST /token` — mint an anonymous 30-day session token.
pub async fn issue<C, S>(
  State(state): State<AppState<C, S>>,
) -> Result<Json<Value>, ApiError>
where
  C: UpstreamSource + 'static,
  S: CatalogStore + 'static,
{
  let token = state.tokens.issue()?;
  Ok(Json(json!({ "token": token })))
}
