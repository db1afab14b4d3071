//! Async HTTP client for the public performance-data provider.
//!
//! The API key is an explicit constructor input, threaded into every request
//! as the `service` query parameter — it is never read from ambient process
//! state here.

use std::time::Duration;

use encore_core::DateWindow;
use reqwest::Client;

use crate::{
  error::UpstreamError,
  source::UpstreamSource,
  xml::{RawRecord, parse_records},
};

/// Path of the performance listing/detail endpoint under the base URL.
const PERFORMANCE_PATH: &str = "pblprfr";
/// Path of the facility listing/detail endpoint under the base URL.
const FACILITY_PATH: &str = "prfplc";

/// Connection settings for the upstream provider.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
  pub base_url: String,
  pub api_key:  String,
  pub timeout:  Duration,
}

impl UpstreamConfig {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      api_key:  api_key.into(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// Async HTTP client for the upstream XML feed.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct UpstreamClient {
  client: Client,
  config: UpstreamConfig,
}

impl UpstreamClient {
  pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
  }

  /// GET `url` with the service key plus `query`, expecting a 2xx XML body.
  async fn get_xml(
    &self,
    url:   String,
    query: &[(&str, String)],
  ) -> Result<Vec<u8>, UpstreamError> {
    tracing::debug!(%url, "upstream fetch");
    let response = self
      .client
      .get(&url)
      .query(&[("service", self.config.api_key.as_str())])
      .query(query)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(UpstreamError::Status { status: status.as_u16(), url });
    }

    Ok(response.bytes().await?.to_vec())
  }

  /// Fetch an endpoint that answers with exactly one record.
  async fn get_single(
    &self,
    url: String,
  ) -> Result<RawRecord, UpstreamError> {
    let body = self.get_xml(url.clone(), &[]).await?;
    parse_records(&body)?
      .into_iter()
      .next()
      .ok_or(UpstreamError::EmptyEnvelope(url))
  }
}

impl UpstreamSource for UpstreamClient {
  async fn fetch_performances(
    &self,
    window: DateWindow,
    page:   u32,
    rows:   u32,
  ) -> Result<Vec<RawRecord>, UpstreamError> {
    let query = [
      ("stdate", window.start.format("%Y%m%d").to_string()),
      ("eddate", window.end.format("%Y%m%d").to_string()),
      ("cpage", page.to_string()),
      ("rows", rows.to_string()),
    ];
    let body = self.get_xml(self.url(PERFORMANCE_PATH), &query).await?;
    parse_records(&body)
  }

  async fn fetch_performance_detail(
    &self,
    id: &str,
  ) -> Result<RawRecord, UpstreamError> {
    self
      .get_single(format!("{}/{id}", self.url(PERFORMANCE_PATH)))
      .await
  }

  async fn fetch_facilities(
    &self,
    region: Option<&str>,
    page:   u32,
    rows:   u32,
  ) -> Result<Vec<RawRecord>, UpstreamError> {
    let mut query = vec![("cpage", page.to_string()), ("rows", rows.to_string())];
    if let Some(code) = region {
      query.push(("signgucode", code.to_string()));
    }
    let body = self.get_xml(self.url(FACILITY_PATH), &query).await?;
    parse_records(&body)
  }

  async fn fetch_facility_detail(
    &self,
    id: &str,
  ) -> Result<RawRecord, UpstreamError> {
    self
      .get_single(format!("{}/{id}", self.url(FACILITY_PATH)))
      .await
  }
}
