//! Parsing of the upstream XML envelope.
//!
//! Every endpoint answers with a `<dbs>` root holding one `<db>` element per
//! record — a single match arrives as one element, many as repeated
//! elements. The event parser below collects both shapes into a
//! `Vec<RawRecord>` so callers never see the ambiguity.
//!
//! Uses `quick-xml`'s event reader with a hand-written state machine, in the
//! same style as the rest of this workspace's XML handling.

use std::collections::HashMap;

use quick_xml::events::Event;

use crate::error::{NormalizeError, UpstreamError};

// ─── Raw record ──────────────────────────────────────────────────────────────

/// One `<relate>` sub-element: a related-content link, possibly with either
/// half missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRelate {
  pub name: Option<String>,
  pub url:  Option<String>,
}

/// One `<db>` element, flattened.
///
/// Simple text children land in `fields` keyed by their upstream element
/// name. The two nested structures (`styurls/styurl`, `relates/relate`) are
/// collected separately — a singleton child yields a one-element `Vec`, so
/// downstream code sees a single uniform shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
  pub fields:  HashMap<String, String>,
  pub styurls: Vec<String>,
  pub relates: Vec<RawRelate>,
}

impl RawRecord {
  pub fn get(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str)
  }

  pub fn require(&self, name: &'static str) -> Result<&str, NormalizeError> {
    self.get(name).ok_or(NormalizeError::MissingField(name))
  }

  /// Test helper: build a record from `(name, value)` pairs.
  pub fn from_fields<'a, I>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (&'a str, &'a str)>,
  {
    Self {
      fields: pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
      ..Self::default()
    }
  }
}

// ─── Envelope parser ─────────────────────────────────────────────────────────

/// Where the cursor sits inside a `<db>` element.
enum Section {
  /// Directly under `<db>`; `Some(name)` while inside a simple field.
  Flat(Option<String>),
  /// Inside `<styurls>`; `true` while inside a `<styurl>`.
  StyUrls(bool),
  /// Inside `<relates>`; the builder is live while inside a `<relate>`.
  Relates(Option<RawRelate>, Option<String>),
}

/// Parse a `dbs/db` envelope into records. Malformed XML is an
/// [`UpstreamError::Xml`]; an envelope with zero `<db>` elements is a valid
/// empty result.
pub fn parse_records(xml: &[u8]) -> Result<Vec<RawRecord>, UpstreamError> {
  let mut reader = quick_xml::Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut records: Vec<RawRecord> = Vec::new();
  let mut current: Option<RawRecord> = None;
  let mut section = Section::Flat(None);
  let mut text = String::new();
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => {
        let name_buf = e.name();
        let local = local_name(name_buf.as_ref());
        match local {
          b"dbs" => {}
          b"db" => {
            current = Some(RawRecord::default());
            section = Section::Flat(None);
          }
          b"styurls" if current.is_some() => {
            section = Section::StyUrls(false);
          }
          b"styurl" => {
            if let Section::StyUrls(inner) = &mut section {
              *inner = true;
            }
          }
          b"relates" if current.is_some() => {
            section = Section::Relates(None, None);
          }
          b"relate" => {
            if let Section::Relates(relate, _) = &mut section {
              *relate = Some(RawRelate::default());
            }
          }
          other => match &mut section {
            Section::Flat(field) if current.is_some() => {
              *field = Some(String::from_utf8_lossy(other).into_owned());
            }
            Section::Relates(Some(_), field) => {
              *field = Some(String::from_utf8_lossy(other).into_owned());
            }
            _ => {}
          },
        }
        text.clear();
      }
      Ok(Event::Text(ref e)) => {
        text.push_str(
          &e.unescape().map_err(|e| UpstreamError::Xml(e.to_string()))?,
        );
      }
      Ok(Event::CData(ref e)) => {
        text.push_str(&String::from_utf8_lossy(e));
      }
      Ok(Event::End(ref e)) => {
        let name_buf = e.name();
        let local = local_name(name_buf.as_ref());
        match local {
          b"db" => {
            if let Some(record) = current.take() {
              records.push(record);
            }
          }
          b"styurls" | b"relates" => {
            section = Section::Flat(None);
          }
          b"styurl" => {
            if let (Section::StyUrls(inner), Some(record)) =
              (&mut section, current.as_mut())
            {
              if *inner && !text.is_empty() {
                record.styurls.push(std::mem::take(&mut text));
              }
              *inner = false;
            }
          }
          b"relate" => {
            if let (Section::Relates(relate, _), Some(record)) =
              (&mut section, current.as_mut())
              && let Some(r) = relate.take()
            {
              record.relates.push(r);
            }
          }
          _ => match &mut section {
            Section::Flat(field) => {
              if let (Some(name), Some(record)) =
                (field.take(), current.as_mut())
                && !text.is_empty()
              {
                record.fields.insert(name, std::mem::take(&mut text));
              }
            }
            Section::Relates(Some(relate), field) => {
              if let Some(name) = field.take() {
                let value =
                  (!text.is_empty()).then(|| std::mem::take(&mut text));
                match name.as_str() {
                  "relatenm" => relate.name = value,
                  "relateurl" => relate.url = value,
                  _ => {}
                }
              }
            }
            _ => {}
          },
        }
        text.clear();
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(UpstreamError::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }

  Ok(records)
}

fn local_name(name: &[u8]) -> &[u8] {
  // strip "prefix:" if present
  if let Some(pos) = name.iter().rposition(|&b| b == b':') {
    &name[pos + 1..]
  } else {
    name
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
