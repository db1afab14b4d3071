//! Upstream feed access for encore.
//!
//! Wraps the public performance-data provider: paginated XML listings, a
//! per-record detail endpoint, and the matching facility endpoints. The
//! [`xml`] module collapses the provider's singleton-vs-list envelope
//! ambiguity at parse time; [`normalize`] turns raw records into the
//! canonical domain shapes.

#![allow(async_fn_in_trait)]

pub mod client;
pub mod error;
pub mod normalize;
pub mod source;
pub mod xml;

pub use client::{UpstreamClient, UpstreamConfig};
pub use error::{NormalizeError, UpstreamError};
pub use source::UpstreamSource;
pub use xml::{RawRecord, RawRelate, parse_records};
