//! Parsing of upstream currency payloads
//!
//! Rate files look like `{"date": "2024-05-01", "usd": {"eur": 0.92, ...}}` and
//! the catalogue is a flat `{"eur": "Euro", ...}` object. The public functions
//! are total: malformed input yields an empty or absent result, never an error.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Catalogue, CatalogueEntry, ParsedRates};

/// Errors that can occur while reading a payload
#[derive(Debug, Error)]
pub enum ParseError {
    /// Payload is not a JSON object
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing expected field in payload
    #[error("Missing expected field in payload: {0}")]
    MissingField(String),

    /// Date field is not a calendar date
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
}

/// Parses the rate table for `base` out of a rate payload
///
/// `base` is matched case-insensitively. Entries whose value is not a number
/// are skipped.
pub fn parse_rates(raw: &str, base: &str) -> ParsedRates {
    match try_parse_rates(raw, base) {
        Ok(rates) => rates,
        Err(e) => {
            tracing::debug!(base, error = %e, "rate payload unusable");
            ParsedRates::new()
        }
    }
}

/// Parses a catalogue payload into entries sorted by uppercase code
pub fn parse_catalogue(raw: &str) -> Catalogue {
    match try_parse_catalogue(raw) {
        Ok(catalogue) => catalogue,
        Err(e) => {
            tracing::debug!(error = %e, "catalogue payload unusable");
            Catalogue::new()
        }
    }
}

/// Reads the publication date embedded in a rate payload
pub fn extract_date(raw: &str) -> Option<NaiveDate> {
    try_extract_date(raw).ok()
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    Ok(serde_json::from_str::<Map<String, Value>>(raw)?)
}

fn try_parse_rates(raw: &str, base: &str) -> Result<ParsedRates, ParseError> {
    let key = base.trim().to_ascii_lowercase();
    let mut root = parse_object(raw)?;

    let Some(Value::Object(table)) = root.remove(&key) else {
        return Err(ParseError::MissingField(key));
    };

    Ok(table
        .into_iter()
        .filter_map(|(code, rate)| rate.as_f64().map(|r| (code.to_ascii_lowercase(), r)))
        .collect())
}

fn try_parse_catalogue(raw: &str) -> Result<Catalogue, ParseError> {
    let root = parse_object(raw)?;

    let mut entries: Catalogue = root
        .into_iter()
        .filter_map(|(code, title)| match title {
            Value::String(title) => Some(CatalogueEntry::new(code.to_ascii_uppercase(), title)),
            _ => None,
        })
        .collect();
    entries.sort_by(|a, b| a.code.cmp(&b.code));

    Ok(entries)
}

fn try_extract_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let root = parse_object(raw)?;
    let date_str = root
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingField("date".to_string()))?;

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ParseError::InvalidDate(date_str.to_string()))
}
