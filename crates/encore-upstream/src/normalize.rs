//! Reshaping of raw upstream records into canonical domain types.
//!
//! Pure functions: no I/O, no store access. A failure here is scoped to the
//! single record being normalized — the caller decides whether to skip the
//! record or abort its pass.
//!
//! The upstream feed is inconsistent in three ways this module papers over:
//! multi-valued sub-fields may arrive as a singleton or a list (already
//! collapsed by [`crate::xml`]), text fields sometimes carry literal
//! `\uXXXX` escape sequences from double encoding, and dates are plain
//! `YYYY.MM.DD` strings.

use chrono::NaiveDate;
use encore_core::{
  facility::Facility,
  performance::{PerformanceDetail, PerformanceSummary, RelatedLink},
  upcoming::UpcomingPerformance,
};

use crate::{error::NormalizeError, xml::RawRecord};

// ─── Text helpers ────────────────────────────────────────────────────────────

/// Decode literal `\uXXXX` escape sequences embedded in `s`.
///
/// Sequences that do not form a valid code point are left as-is rather than
/// rejected — the surrounding text is still useful.
pub fn decode_unicode_escapes(s: &str) -> String {
  if !s.contains("\\u") {
    return s.to_string();
  }

  let mut out = String::with_capacity(s.len());
  let mut rest = s;
  while let Some(pos) = rest.find("\\u") {
    out.push_str(&rest[..pos]);
    let candidate = &rest[pos + 2..];
    let decoded = candidate
      .get(..4)
      .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
      .and_then(|hex| u32::from_str_radix(hex, 16).ok())
      .and_then(char::from_u32);
    match decoded {
      Some(c) => {
        out.push(c);
        rest = &candidate[4..];
      }
      None => {
        out.push_str("\\u");
        rest = candidate;
      }
    }
  }
  out.push_str(rest);
  out
}

fn text(raw: &RawRecord, field: &'static str) -> Result<String, NormalizeError> {
  raw.require(field).map(decode_unicode_escapes)
}

fn text_or_empty(raw: &RawRecord, field: &str) -> String {
  raw.get(field).map(decode_unicode_escapes).unwrap_or_default()
}

fn opt_text(raw: &RawRecord, field: &str) -> Option<String> {
  raw.get(field).map(decode_unicode_escapes)
}

fn date(raw: &RawRecord, field: &'static str) -> Result<NaiveDate, NormalizeError> {
  let value = raw.require(field)?;
  NaiveDate::parse_from_str(value, "%Y.%m.%d").map_err(|_| {
    NormalizeError::BadDate { field, value: value.to_string() }
  })
}

/// `"Y"`/`"N"` open-run markers; anything else (including absence) is
/// unknown.
fn open_run_flag(raw: &RawRecord) -> Option<bool> {
  match raw.get("openrun") {
    Some("Y") => Some(true),
    Some("N") => Some(false),
    _ => None,
  }
}

fn integer(raw: &RawRecord, field: &'static str) -> Result<i64, NormalizeError> {
  let value = raw.require(field)?;
  value.trim().parse().map_err(|_| NormalizeError::BadNumber {
    field,
    value: value.to_string(),
  })
}

fn float(raw: &RawRecord, field: &'static str) -> Result<f64, NormalizeError> {
  let value = raw.require(field)?;
  value.trim().parse().map_err(|_| NormalizeError::BadNumber {
    field,
    value: value.to_string(),
  })
}

// ─── Performances ────────────────────────────────────────────────────────────

/// Canonicalise one listing record. `refreshed` becomes the row's
/// `last_refreshed` stamp.
pub fn summary(
  raw:       &RawRecord,
  refreshed: NaiveDate,
) -> Result<PerformanceSummary, NormalizeError> {
  Ok(PerformanceSummary {
    id:             text(raw, "mt20id")?,
    name:           text(raw, "prfnm")?,
    start_date:     date(raw, "prfpdfrom")?,
    end_date:       date(raw, "prfpdto")?,
    venue:          text_or_empty(raw, "fcltynm"),
    poster:         text_or_empty(raw, "poster"),
    genre:          text_or_empty(raw, "genrenm"),
    state:          text_or_empty(raw, "prfstate"),
    open_run:       open_run_flag(raw),
    area:           opt_text(raw, "area"),
    kid_flag:       opt_text(raw, "kidstate"),
    last_refreshed: refreshed,
  })
}

/// The `relates` sub-structure as a uniform link list: absence yields an
/// empty list, and a singleton is indistinguishable from a one-element list.
pub fn related_links(raw: &RawRecord) -> Vec<RelatedLink> {
  raw
    .relates
    .iter()
    .map(|r| RelatedLink {
      name: r.name.as_deref().map(decode_unicode_escapes).unwrap_or_default(),
      url:  r.url.clone().unwrap_or_default(),
    })
    .collect()
}

/// Canonicalise one detail record.
pub fn detail(
  raw:       &RawRecord,
  refreshed: NaiveDate,
) -> Result<PerformanceDetail, NormalizeError> {
  Ok(PerformanceDetail {
    id:                text(raw, "mt20id")?,
    name:              text(raw, "prfnm")?,
    start_date:        date(raw, "prfpdfrom")?,
    end_date:          date(raw, "prfpdto")?,
    venue:             text_or_empty(raw, "fcltynm"),
    cast:              text_or_empty(raw, "prfcast"),
    crew:              text_or_empty(raw, "prfcrew"),
    runtime:           text_or_empty(raw, "prfruntime"),
    age_rating:        text_or_empty(raw, "prfage"),
    producer:          text_or_empty(raw, "entrpsnm"),
    price_guidance:    text_or_empty(raw, "pcseguidance"),
    poster:            text_or_empty(raw, "poster"),
    synopsis:          text_or_empty(raw, "sty"),
    genre:             text_or_empty(raw, "genrenm"),
    state:             text_or_empty(raw, "prfstate"),
    open_run:          open_run_flag(raw),
    style_urls:        raw.styurls.join(","),
    schedule_guidance: text_or_empty(raw, "dtguidance"),
    related_links:     related_links(raw),
    last_refreshed:    refreshed,
  })
}

/// Canonicalise one listing record into an upcoming-snapshot row.
pub fn upcoming(raw: &RawRecord) -> Result<UpcomingPerformance, NormalizeError> {
  Ok(UpcomingPerformance {
    id:         text(raw, "mt20id")?,
    name:       text(raw, "prfnm")?,
    start_date: date(raw, "prfpdfrom")?,
    end_date:   date(raw, "prfpdto")?,
    venue:      text_or_empty(raw, "fcltynm"),
    poster:     text_or_empty(raw, "poster"),
    area:       opt_text(raw, "area"),
    genre:      opt_text(raw, "genrenm"),
    open_run:   open_run_flag(raw),
    state:      text_or_empty(raw, "prfstate"),
  })
}

// ─── Facilities ──────────────────────────────────────────────────────────────

/// Canonicalise a facility from its listing record plus the per-facility
/// detail record (seat count, phone, coordinates, address only exist in the
/// latter).
pub fn facility(
  listing: &RawRecord,
  detail:  &RawRecord,
) -> Result<Facility, NormalizeError> {
  Ok(Facility {
    id:             text(listing, "mt10id")?,
    name:           text(listing, "fcltynm")?,
    region:         text_or_empty(listing, "sidonm"),
    sub_region:     text_or_empty(listing, "gugunnm"),
    characteristic: text_or_empty(listing, "fcltychartr"),
    hall_count:     integer(listing, "mt13cnt")?,
    seat_count:     integer(detail, "seatscale")?,
    open_year:      opt_text(listing, "opende"),
    phone:          opt_text(detail, "telno"),
    url:            opt_text(detail, "relateurl"),
    address:        opt_text(detail, "adres"),
    latitude:       float(detail, "la")?,
    longitude:      float(detail, "lo")?,
  })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::xml::{RawRelate, parse_records};

  fn listing_record(id: &str) -> RawRecord {
    RawRecord::from_fields([
      ("mt20id", id),
      ("prfnm", "지킬앤하이드"),
      ("prfpdfrom", "2026.03.01"),
      ("prfpdto", "2026.05.31"),
      ("fcltynm", "샤롯데씨어터"),
      ("poster", "http://img.example/poster.gif"),
      ("genrenm", "뮤지컬"),
      ("prfstate", "공연예정"),
      ("openrun", "N"),
      ("area", "11"),
    ])
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
  }

  #[test]
  fn summary_maps_listing_fields() {
    let s = summary(&listing_record("PF1"), today()).unwrap();
    assert_eq!(s.id, "PF1");
    assert_eq!(s.genre, "뮤지컬");
    assert_eq!(s.start_date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    assert_eq!(s.open_run, Some(false));
    assert_eq!(s.area.as_deref(), Some("11"));
    assert_eq!(s.last_refreshed, today());
  }

  #[test]
  fn missing_optional_fields_default_rather_than_fail() {
    let raw = RawRecord::from_fields([
      ("mt20id", "PF1"),
      ("prfnm", "제목"),
      ("prfpdfrom", "2026.03.01"),
      ("prfpdto", "2026.03.02"),
    ]);
    let s = summary(&raw, today()).unwrap();
    assert_eq!(s.venue, "");
    assert_eq!(s.open_run, None);
    assert_eq!(s.area, None);
  }

  #[test]
  fn unparseable_date_is_a_record_scoped_error() {
    let mut raw = listing_record("PF1");
    raw.fields.insert("prfpdfrom".into(), "2026-03-01".into());
    let err = summary(&raw, today()).unwrap_err();
    assert_eq!(
      err,
      NormalizeError::BadDate {
        field: "prfpdfrom",
        value: "2026-03-01".into()
      }
    );
  }

  #[test]
  fn missing_identifier_is_an_error() {
    let raw = RawRecord::from_fields([("prfnm", "이름")]);
    assert_eq!(
      summary(&raw, today()).unwrap_err(),
      NormalizeError::MissingField("mt20id")
    );
  }

  // A single scalar sub-field and a one-element list must normalize to the
  // same canonical shape.
  #[test]
  fn singleton_and_one_element_list_styurls_normalize_identically() {
    let single = br#"<dbs><db>
      <mt20id>PF1</mt20id><prfnm>n</prfnm>
      <prfpdfrom>2026.03.01</prfpdfrom><prfpdto>2026.03.02</prfpdto>
      <styurls><styurl>http://img.example/a.jpg</styurl></styurls>
    </db></dbs>"#;
    // Identical content; the upstream serialises one-element lists the same
    // way, so both routes go through the Vec collection.
    let one = &parse_records(single).unwrap()[0];
    let d = detail(one, today()).unwrap();
    assert_eq!(d.style_urls, "http://img.example/a.jpg");

    let many = br#"<dbs><db>
      <mt20id>PF1</mt20id><prfnm>n</prfnm>
      <prfpdfrom>2026.03.01</prfpdfrom><prfpdto>2026.03.02</prfpdto>
      <styurls>
        <styurl>http://img.example/a.jpg</styurl>
        <styurl>http://img.example/b.jpg</styurl>
      </styurls>
    </db></dbs>"#;
    let d = detail(&parse_records(many).unwrap()[0], today()).unwrap();
    assert_eq!(d.style_urls, "http://img.example/a.jpg,http://img.example/b.jpg");
  }

  #[test]
  fn decode_unicode_escapes_handles_hangul() {
    assert_eq!(decode_unicode_escapes(r"\uc544\ub9ac\uc544"), "아리아");
    assert_eq!(decode_unicode_escapes("plain"), "plain");
    assert_eq!(decode_unicode_escapes(r"mixed \uc544 tail"), "mixed 아 tail");
  }

  #[test]
  fn invalid_escape_sequences_are_left_as_is() {
    assert_eq!(decode_unicode_escapes(r"\uZZZZ"), r"\uZZZZ");
    assert_eq!(decode_unicode_escapes(r"trailing \u12"), r"trailing \u12");
    // Lone surrogate is not a valid code point.
    assert_eq!(decode_unicode_escapes(r"\ud800"), r"\ud800");
  }

  #[test]
  fn related_links_absent_is_empty_never_an_error() {
    let raw = listing_record("PF1");
    assert!(related_links(&raw).is_empty());
  }

  #[test]
  fn related_links_decode_names() {
    let mut raw = listing_record("PF1");
    raw.relates.push(RawRelate {
      name: Some(r"티켓".into()),
      url:  Some("http://ticket.example".into()),
    });
    let links = related_links(&raw);
    assert_eq!(links[0].name, "티켓");
    assert_eq!(links[0].url, "http://ticket.example");
  }

  #[test]
  fn facility_merges_listing_and_detail_records() {
    let listing = RawRecord::from_fields([
      ("mt10id", "FC1"),
      ("fcltynm", "예술의전당"),
      ("mt13cnt", "7"),
      ("fcltychartr", "공공(문예회관)"),
      ("sidonm", "서울"),
      ("gugunnm", "서초구"),
      ("opende", "1988"),
    ]);
    let det = RawRecord::from_fields([
      ("seatscale", "6987"),
      ("telno", "02-580-1300"),
      ("relateurl", "http://venue.example"),
      ("adres", "서울특별시 서초구 남부순환로 2406"),
      ("la", "37.4802421"),
      ("lo", "127.0114101"),
    ]);
    let f = facility(&listing, &det).unwrap();
    assert_eq!(f.id, "FC1");
    assert_eq!(f.hall_count, 7);
    assert_eq!(f.seat_count, 6987);
    assert!((f.latitude - 37.4802421).abs() < 1e-9);
  }

  #[test]
  fn facility_with_non_numeric_seat_count_fails() {
    let listing = RawRecord::from_fields([
      ("mt10id", "FC1"),
      ("fcltynm", "이름"),
      ("mt13cnt", "1"),
    ]);
    let det = RawRecord::from_fields([
      ("seatscale", "많음"),
      ("la", "37.0"),
      ("lo", "127.0"),
    ]);
    assert!(matches!(
      facility(&listing, &det).unwrap_err(),
      NormalizeError::BadNumber { field: "seatscale", .. }
    ));
  }
}
