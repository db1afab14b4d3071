//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};

use encore_core::{
  facility::Facility,
  performance::{PerformanceDetail, PerformanceSummary},
  store::{
    CatalogStore, FacilityBatchOutcome, FacilityFilter, PerformanceBatch,
    PerformanceFilter,
  },
  upcoming::UpcomingPerformance,
};

use crate::{
  Error, Result,
  encode::{
    RawDetail, RawSummary, RawUpcoming, encode_date, encode_flag,
    encode_links,
  },
  schema::SCHEMA,
};

// ─── Column lists ────────────────────────────────────────────────────────────

const SUMMARY_COLS: &str = "performance_id, name, start_date, end_date, \
   venue, poster, genre, state, open_run, area, kid_flag, last_refreshed";

const DETAIL_COLS: &str = "performance_id, name, start_date, end_date, \
   venue, cast_members, crew, runtime, age_rating, producer, \
   price_guidance, poster, synopsis, genre, state, open_run, style_urls, \
   schedule_guidance, related_links, last_refreshed";

const FACILITY_COLS: &str = "facility_id, name, region, sub_region, \
   characteristic, hall_count, seat_count, open_year, phone, url, address, \
   latitude, longitude";

const UPCOMING_COLS: &str = "performance_id, name, start_date, end_date, \
   venue, poster, area, genre, open_run, state";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn raw_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSummary> {
  Ok(RawSummary {
    id:             row.get(0)?,
    name:           row.get(1)?,
    start_date:     row.get(2)?,
    end_date:       row.get(3)?,
    venue:          row.get(4)?,
    poster:         row.get(5)?,
    genre:          row.get(6)?,
    state:          row.get(7)?,
    open_run:       row.get(8)?,
    area:           row.get(9)?,
    kid_flag:       row.get(10)?,
    last_refreshed: row.get(11)?,
  })
}

fn raw_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDetail> {
  Ok(RawDetail {
    id:                row.get(0)?,
    name:              row.get(1)?,
    start_date:        row.get(2)?,
    end_date:          row.get(3)?,
    venue:             row.get(4)?,
    cast:              row.get(5)?,
    crew:              row.get(6)?,
    runtime:           row.get(7)?,
    age_rating:        row.get(8)?,
    producer:          row.get(9)?,
    price_guidance:    row.get(10)?,
    poster:            row.get(11)?,
    synopsis:          row.get(12)?,
    genre:             row.get(13)?,
    state:             row.get(14)?,
    open_run:          row.get(15)?,
    style_urls:        row.get(16)?,
    schedule_guidance: row.get(17)?,
    related_links:     row.get(18)?,
    last_refreshed:    row.get(19)?,
  })
}

fn facility_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Facility> {
  Ok(Facility {
    id:             row.get(0)?,
    name:           row.get(1)?,
    region:         row.get(2)?,
    sub_region:     row.get(3)?,
    characteristic: row.get(4)?,
    hall_count:     row.get(5)?,
    seat_count:     row.get(6)?,
    open_year:      row.get(7)?,
    phone:          row.get(8)?,
    url:            row.get(9)?,
    address:        row.get(10)?,
    latitude:       row.get(11)?,
    longitude:      row.get(12)?,
  })
}

fn raw_upcoming(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUpcoming> {
  Ok(RawUpcoming {
    id:         row.get(0)?,
    name:       row.get(1)?,
    start_date: row.get(2)?,
    end_date:   row.get(3)?,
    venue:      row.get(4)?,
    poster:     row.get(5)?,
    area:       row.get(6)?,
    genre:      row.get(7)?,
    open_run:   row.get(8)?,
    state:      row.get(9)?,
  })
}

// ─── Param encoding ──────────────────────────────────────────────────────────

fn text(s: String) -> Value { Value::Text(s) }

fn opt_text(s: Option<String>) -> Value {
  s.map(Value::Text).unwrap_or(Value::Null)
}

fn opt_int(v: Option<i64>) -> Value {
  v.map(Value::Integer).unwrap_or(Value::Null)
}

fn summary_params(s: PerformanceSummary) -> Vec<Value> {
  vec![
    text(s.id),
    text(s.name),
    text(encode_date(s.start_date)),
    text(encode_date(s.end_date)),
    text(s.venue),
    text(s.poster),
    text(s.genre),
    text(s.state),
    opt_int(encode_flag(s.open_run)),
    opt_text(s.area),
    opt_text(s.kid_flag),
    text(encode_date(s.last_refreshed)),
  ]
}

fn detail_params(d: PerformanceDetail) -> Result<Vec<Value>> {
  let links = encode_links(&d.related_links)?;
  Ok(vec![
    text(d.id),
    text(d.name),
    text(encode_date(d.start_date)),
    text(encode_date(d.end_date)),
    text(d.venue),
    text(d.cast),
    text(d.crew),
    text(d.runtime),
    text(d.age_rating),
    text(d.producer),
    text(d.price_guidance),
    text(d.poster),
    text(d.synopsis),
    text(d.genre),
    text(d.state),
    opt_int(encode_flag(d.open_run)),
    text(d.style_urls),
    text(d.schedule_guidance),
    text(links),
    text(encode_date(d.last_refreshed)),
  ])
}

fn facility_params(f: Facility) -> Vec<Value> {
  vec![
    text(f.id),
    text(f.name),
    text(f.region),
    text(f.sub_region),
    text(f.characteristic),
    Value::Integer(f.hall_count),
    Value::Integer(f.seat_count),
    opt_text(f.open_year),
    opt_text(f.phone),
    opt_text(f.url),
    opt_text(f.address),
    Value::Real(f.latitude),
    Value::Real(f.longitude),
  ]
}

fn upcoming_params(u: UpcomingPerformance) -> Vec<Value> {
  vec![
    text(u.id),
    text(u.name),
    text(encode_date(u.start_date)),
    text(encode_date(u.end_date)),
    text(u.venue),
    text(u.poster),
    opt_text(u.area),
    opt_text(u.genre),
    opt_int(encode_flag(u.open_run)),
    text(u.state),
  ]
}

// ─── Filter → WHERE clause ───────────────────────────────────────────────────

/// Escape-free LIKE pattern for a substring match.
fn contains(s: &str) -> String { format!("%{s}%") }

fn prefix(s: &str) -> String { format!("{s}%") }

fn performance_conditions(filter: &PerformanceFilter) -> (String, Vec<Value>) {
  // Window overlap: the run intersects [window.start, window.end].
  let mut conds = vec!["start_date <= ?".to_string(), "end_date >= ?".to_string()];
  let mut values = vec![
    text(encode_date(filter.window.end)),
    text(encode_date(filter.window.start)),
  ];

  if let Some(name) = &filter.name {
    conds.push("name LIKE ?".into());
    values.push(text(contains(name)));
  }
  if let Some(venue) = &filter.venue {
    conds.push("venue LIKE ?".into());
    values.push(text(contains(venue)));
  }
  if let Some(genre) = &filter.genre {
    conds.push("genre = ?".into());
    values.push(text(genre.clone()));
  }
  if let Some(id_prefix) = &filter.id_prefix {
    conds.push("performance_id LIKE ?".into());
    values.push(text(prefix(id_prefix)));
  }
  if let Some(area_prefix) = &filter.area_prefix {
    conds.push("area LIKE ?".into());
    values.push(text(prefix(area_prefix)));
  }
  if let Some(kid_flag) = &filter.kid_flag {
    conds.push("kid_flag = ?".into());
    values.push(text(kid_flag.clone()));
  }
  if let Some(state) = &filter.state {
    conds.push("state = ?".into());
    values.push(text(state.clone()));
  }
  if let Some(open_run) = filter.open_run {
    conds.push("open_run = ?".into());
    values.push(Value::Integer(open_run.into()));
  }

  (format!("WHERE {}", conds.join(" AND ")), values)
}

fn facility_conditions(filter: &FacilityFilter) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = Vec::new();
  let mut values: Vec<Value> = Vec::new();

  if let Some(region) = &filter.region {
    conds.push("region = ?".into());
    values.push(text(region.clone()));
  }
  if let Some(sub_region) = &filter.sub_region {
    conds.push("sub_region = ?".into());
    values.push(text(sub_region.clone()));
  }
  if let Some(characteristic) = &filter.characteristic {
    conds.push("characteristic = ?".into());
    values.push(text(characteristic.clone()));
  }
  if let Some(name) = &filter.name {
    conds.push("name LIKE ?".into());
    values.push(text(contains(name)));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, values)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An encore catalog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn exists(&self, sql: &'static str, id: &str) -> Result<bool> {
    let id = id.to_string();
    let found: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![id], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Performance reads ─────────────────────────────────────────────────────

  async fn list_performances(
    &self,
    filter: &PerformanceFilter,
  ) -> Result<Vec<PerformanceSummary>> {
    let (where_clause, mut values) = performance_conditions(filter);
    values.push(Value::Integer(filter.page.limit() as i64));
    values.push(Value::Integer(filter.page.offset() as i64));

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUMMARY_COLS} FROM performances {where_clause}
           ORDER BY start_date, performance_id LIMIT ? OFFSET ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(values), raw_summary)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  async fn performance_names(
    &self,
    filter: &PerformanceFilter,
  ) -> Result<Vec<String>> {
    let (where_clause, mut values) = performance_conditions(filter);
    values.push(Value::Integer(filter.page.limit() as i64));
    values.push(Value::Integer(filter.page.offset() as i64));

    let names: Vec<String> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT DISTINCT name FROM performances {where_clause}
           ORDER BY name LIMIT ? OFFSET ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(values), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(names)
  }

  async fn performances_by_ids(
    &self,
    ids: &[String],
  ) -> Result<Vec<PerformanceSummary>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let values: Vec<Value> =
      ids.iter().cloned().map(Value::Text).collect();

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUMMARY_COLS} FROM performances
           WHERE performance_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(values), raw_summary)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  async fn get_performance_detail(
    &self,
    id: &str,
  ) -> Result<Option<PerformanceDetail>> {
    let id = id.to_string();
    let raw: Option<RawDetail> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {DETAIL_COLS} FROM performance_details
           WHERE performance_id = ?1"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], raw_detail)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDetail::into_detail).transpose()
  }

  async fn summary_exists(&self, id: &str) -> Result<bool> {
    self
      .exists("SELECT 1 FROM performances WHERE performance_id = ?1", id)
      .await
  }

  async fn detail_exists(&self, id: &str) -> Result<bool> {
    self
      .exists(
        "SELECT 1 FROM performance_details WHERE performance_id = ?1",
        id,
      )
      .await
  }

  async fn sample_by_genre(
    &self,
    genre:       &str,
    on_or_after: NaiveDate,
    limit:       u32,
  ) -> Result<Vec<PerformanceSummary>> {
    let genre = genre.to_string();
    let from = encode_date(on_or_after);

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUMMARY_COLS} FROM performances
           WHERE genre = ?1 AND start_date >= ?2
           ORDER BY RANDOM() LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![genre, from, limit], raw_summary)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  // ── Facility reads ────────────────────────────────────────────────────────

  async fn list_facilities(
    &self,
    filter: &FacilityFilter,
  ) -> Result<Vec<Facility>> {
    let (where_clause, mut values) = facility_conditions(filter);
    values.push(Value::Integer(filter.page.limit() as i64));
    values.push(Value::Integer(filter.page.offset() as i64));

    let facilities: Vec<Facility> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {FACILITY_COLS} FROM facilities {where_clause}
           ORDER BY facility_id LIMIT ? OFFSET ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(values), facility_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(facilities)
  }

  async fn get_facility(&self, id: &str) -> Result<Option<Facility>> {
    let id = id.to_string();
    let facility: Option<Facility> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {FACILITY_COLS} FROM facilities WHERE facility_id = ?1"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], facility_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(facility)
  }

  // ── Upcoming snapshot ─────────────────────────────────────────────────────

  async fn list_upcoming(
    &self,
    after: NaiveDate,
  ) -> Result<Vec<UpcomingPerformance>> {
    let after = encode_date(after);

    let raws: Vec<RawUpcoming> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {UPCOMING_COLS} FROM upcoming_performances
           WHERE start_date > ?1 ORDER BY start_date"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![after], raw_upcoming)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpcoming::into_upcoming).collect()
  }

  // ── Ingest writes ─────────────────────────────────────────────────────────

  async fn apply_performance_batch(
    &self,
    batch: PerformanceBatch,
  ) -> Result<()> {
    let summary_rows: Vec<Vec<Value>> =
      batch.summaries.into_iter().map(summary_params).collect();
    let detail_rows: Vec<Vec<Value>> = batch
      .details
      .into_iter()
      .map(detail_params)
      .collect::<Result<_>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO performances ({SUMMARY_COLS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(performance_id) DO UPDATE SET
               name = excluded.name,
               start_date = excluded.start_date,
               end_date = excluded.end_date,
               venue = excluded.venue,
               poster = excluded.poster,
               genre = excluded.genre,
               state = excluded.state,
               open_run = excluded.open_run,
               area = excluded.area,
               kid_flag = excluded.kid_flag,
               last_refreshed = excluded.last_refreshed"
          ))?;
          for row in &summary_rows {
            stmt.execute(params_from_iter(row))?;
          }

          let mut stmt = tx.prepare(&format!(
            "INSERT INTO performance_details ({DETAIL_COLS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(performance_id) DO UPDATE SET
               name = excluded.name,
               start_date = excluded.start_date,
               end_date = excluded.end_date,
               venue = excluded.venue,
               cast_members = excluded.cast_members,
               crew = excluded.crew,
               runtime = excluded.runtime,
               age_rating = excluded.age_rating,
               producer = excluded.producer,
               price_guidance = excluded.price_guidance,
               poster = excluded.poster,
               synopsis = excluded.synopsis,
               genre = excluded.genre,
               state = excluded.state,
               open_run = excluded.open_run,
               style_urls = excluded.style_urls,
               schedule_guidance = excluded.schedule_guidance,
               related_links = excluded.related_links,
               last_refreshed = excluded.last_refreshed"
          ))?;
          for row in &detail_rows {
            stmt.execute(params_from_iter(row))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn apply_facility_batch(
    &self,
    facilities: Vec<Facility>,
  ) -> Result<FacilityBatchOutcome> {
    let rows: Vec<Vec<Value>> =
      facilities.into_iter().map(facility_params).collect();

    let outcome: FacilityBatchOutcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut outcome = FacilityBatchOutcome::default();
        {
          let mut upsert = tx.prepare(&format!(
            "INSERT INTO facilities ({FACILITY_COLS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(facility_id) DO UPDATE SET
               name = excluded.name,
               region = excluded.region,
               sub_region = excluded.sub_region,
               characteristic = excluded.characteristic,
               hall_count = excluded.hall_count,
               seat_count = excluded.seat_count,
               open_year = excluded.open_year,
               phone = excluded.phone,
               url = excluded.url,
               address = excluded.address,
               latitude = excluded.latitude,
               longitude = excluded.longitude"
          ))?;

          for row in &rows {
            let known: bool = tx
              .query_row(
                "SELECT 1 FROM facilities WHERE facility_id = ?1",
                rusqlite::params![row[0]],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false);
            upsert.execute(params_from_iter(row))?;
            if known {
              outcome.updated += 1;
            } else {
              outcome.inserted += 1;
            }
          }
        }
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn replace_upcoming(
    &self,
    rows: Vec<UpcomingPerformance>,
  ) -> Result<usize> {
    let rows: Vec<Vec<Value>> =
      rows.into_iter().map(upcoming_params).collect();

    let written: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM upcoming_performances", [])?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO upcoming_performances ({UPCOMING_COLS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
          ))?;
          for row in &rows {
            stmt.execute(params_from_iter(row))?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;
    Ok(written)
  }

  async fn clear_upcoming(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM upcoming_performances", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Session-scoped picks and genre preferences ────────────────────────────

  async fn save_picks(&self, token: &str, ids: &[String]) -> Result<()> {
    let token = token.to_string();
    let ids = ids.to_vec();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM picks WHERE token = ?1",
          rusqlite::params![token],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO picks (token, performance_id) VALUES (?1, ?2)",
          )?;
          for id in &ids {
            stmt.execute(rusqlite::params![token, id])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn picks_for(&self, token: &str) -> Result<Vec<String>> {
    let token = token.to_string();
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT performance_id FROM picks WHERE token = ?1
           ORDER BY pick_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![token], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn save_genre_prefs(
    &self,
    token:  &str,
    genres: &[String],
  ) -> Result<()> {
    let token = token.to_string();
    let genres = genres.to_vec();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM genre_prefs WHERE token = ?1",
          rusqlite::params![token],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO genre_prefs (token, genre) VALUES (?1, ?2)",
          )?;
          for genre in &genres {
            stmt.execute(rusqlite::params![token, genre])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn genre_prefs_for(&self, token: &str) -> Result<Vec<String>> {
    let token = token.to_string();
    let genres: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT genre FROM genre_prefs WHERE token = ?1 ORDER BY pref_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![token], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(genres)
  }
}
