//! Anonymous-session tokens: stateless, signed, 30-day expiry.
//!
//! A token carries no identity — its only claim is the expiry. Whoever holds
//! a valid token owns the picks saved under it. The signing secret is an
//! explicit constructor input, never read from ambient process state.

use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
  errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  /// Expiry, seconds since the Unix epoch.
  exp: i64,
}

/// Issues and verifies HS256 session tokens.
pub struct TokenService {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
}

impl TokenService {
  pub fn new(secret: &str) -> Self {
    Self {
      encoding:   EncodingKey::from_secret(secret.as_bytes()),
      decoding:   DecodingKey::from_secret(secret.as_bytes()),
      validation: Validation::new(Algorithm::HS256),
    }
  }

  /// Mint a fresh token valid for 30 days.
  pub fn issue(&self) -> Result<String, ApiError> {
    let claims = Claims {
      exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    encode(&Header::default(), &claims, &self.encoding)
      .map_err(ApiError::Token)
  }

  /// Check signature and expiry; returns the token string itself, which is
  /// what keys the pick store.
  pub fn verify(&self, token: &str) -> Result<String, ApiError> {
    match decode::<Claims>(token, &self.decoding, &self.validation) {
      Ok(_) => Ok(token.to_string()),
      Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
        Err(ApiError::Unauthorized("token has expired".to_string()))
      }
      Err(_) => Err(ApiError::Unauthorized("invalid token".to_string())),
    }
  }
}

/// Pull the bearer token out of an `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))
}
