//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 strings, tri-state flags as nullable
//! integers, and the related-link list as compact JSON.

use chrono::NaiveDate;
use encore_core::{
  performance::{PerformanceDetail, PerformanceSummary, RelatedLink},
  upcoming::UpcomingPerformance,
};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Flags ───────────────────────────────────────────────────────────────────

pub fn encode_flag(flag: Option<bool>) -> Option<i64> {
  flag.map(i64::from)
}

pub fn decode_flag(value: Option<i64>) -> Option<bool> {
  value.map(|v| v != 0)
}

// ─── Related links ───────────────────────────────────────────────────────────

pub fn encode_links(links: &[RelatedLink]) -> Result<String> {
  Ok(serde_json::to_string(links)?)
}

pub fn decode_links(s: &str) -> Result<Vec<RelatedLink>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `performances` row.
pub struct RawSummary {
  pub id:             String,
  pub name:           String,
  pub start_date:     String,
  pub end_date:       String,
  pub venue:          String,
  pub poster:         String,
  pub genre:          String,
  pub state:          String,
  pub open_run:       Option<i64>,
  pub area:           Option<String>,
  pub kid_flag:       Option<String>,
  pub last_refreshed: String,
}

impl RawSummary {
  pub fn into_summary(self) -> Result<PerformanceSummary> {
    Ok(PerformanceSummary {
      id:             self.id,
      name:           self.name,
      start_date:     decode_date(&self.start_date)?,
      end_date:       decode_date(&self.end_date)?,
      venue:          self.venue,
      poster:         self.poster,
      genre:          self.genre,
      state:          self.state,
      open_run:       decode_flag(self.open_run),
      area:           self.area,
      kid_flag:       self.kid_flag,
      last_refreshed: decode_date(&self.last_refreshed)?,
    })
  }
}

/// Raw values read directly from a `performance_details` row.
pub struct RawDetail {
  pub id:                String,
  pub name:              String,
  pub start_date:        String,
  pub end_date:          String,
  pub venue:             String,
  pub cast:              String,
  pub crew:              String,
  pub runtime:           String,
  pub age_rating:        String,
  pub producer:          String,
  pub price_guidance:    String,
  pub poster:            String,
  pub synopsis:          String,
  pub genre:             String,
  pub state:             String,
  pub open_run:          Option<i64>,
  pub style_urls:        String,
  pub schedule_guidance: String,
  pub related_links:     String,
  pub last_refreshed:    String,
}

impl RawDetail {
  pub fn into_detail(self) -> Result<PerformanceDetail> {
    Ok(PerformanceDetail {
      id:                self.id,
      name:              self.name,
      start_date:        decode_date(&self.start_date)?,
      end_date:          decode_date(&self.end_date)?,
      venue:             self.venue,
      cast:              self.cast,
      crew:              self.crew,
      runtime:           self.runtime,
      age_rating:        self.age_rating,
      producer:          self.producer,
      price_guidance:    self.price_guidance,
      poster:            self.poster,
      synopsis:          self.synopsis,
      genre:             self.genre,
      state:             self.state,
      open_run:          decode_flag(self.open_run),
      style_urls:        self.style_urls,
      schedule_guidance: self.schedule_guidance,
      related_links:     decode_links(&self.related_links)?,
      last_refreshed:    decode_date(&self.last_refreshed)?,
    })
  }
}

/// Raw values read directly from an `upcoming_performances` row.
pub struct RawUpcoming {
  pub id:         String,
  pub name:       String,
  pub start_date: String,
  pub end_date:   String,
  pub venue:      String,
  pub poster:     String,
  pub area:       Option<String>,
  pub genre:      Option<String>,
  pub open_run:   Option<i64>,
  pub state:      String,
}

impl RawUpcoming {
  pub fn into_upcoming(self) -> Result<UpcomingPerformance> {
    Ok(UpcomingPerformance {
      id:         self.id,
      name:       self.name,
      start_date: decode_date(&self.start_date)?,
      end_date:   decode_date(&self.end_date)?,
      venue:      self.venue,
      poster:     self.poster,
      area:       self.area,
      genre:      self.genre,
      open_run:   decode_flag(self.open_run),
      state:      self.state,
    })
  }
}
