//! Core data models for the rate cache
//!
//! This module contains the types shared by the store, the parser and the
//! refresh orchestrator: currency codes, persisted records and the parsed
//! views handed back to callers.

pub mod parser;

pub use parser::{extract_date, parse_catalogue, parse_rates, ParseError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exchange rates relative to a base currency, keyed by lowercase currency code
pub type ParsedRates = BTreeMap<String, f64>;

/// All known currencies, sorted by code
pub type Catalogue = Vec<CatalogueEntry>;

/// Error returned when a string is not a usable currency code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: '{0}'. Expected 3 or 4 letters, e.g. usd or EUR")]
pub struct InvalidCurrencyCode(pub String);

/// A validated currency code
///
/// Codes are case-insensitive on input and canonicalized to lowercase, which is
/// how the upstream data source names its files and keys its rate objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Lowercase form used for storage keys, URLs and payload lookup
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid_len = (3..=4).contains(&trimmed.len());
        if !valid_len || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidCurrencyCode(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_ascii_uppercase())
    }
}

/// Identifies one persisted record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKey {
    /// Rate table for a base currency
    Rates(CurrencyCode),
    /// The singleton currency catalogue
    Catalogue,
}

impl RecordKey {
    /// Stable name used for file names and log fields
    pub fn storage_name(&self) -> String {
        match self {
            RecordKey::Rates(base) => format!("rates_{}", base.as_str()),
            RecordKey::Catalogue => "currencies".to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_name())
    }
}

/// A raw upstream payload as persisted by the store
///
/// The payload is kept verbatim so it can be re-parsed for any caller; only the
/// refresh orchestrator creates or overwrites records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Which rate table (or the catalogue) this is
    pub key: RecordKey,
    /// Response body exactly as received from a mirror
    pub payload: String,
    /// When the payload was fetched
    pub fetched_at: DateTime<Utc>,
}

/// One currency in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Uppercase currency code
    pub code: String,
    /// Human-readable name, e.g. "Euro"
    pub title: String,
}

impl CatalogueEntry {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }
}

/// One step of a two-phase lookup
///
/// A lookup yields the cached snapshot first and, only if a refresh produced
/// different data, an updated value afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission<T> {
    /// Data already in the store (possibly empty)
    Cached(T),
    /// Freshly fetched data that differs from the cached snapshot
    Updated(T),
}

impl<T> Emission<T> {
    pub fn into_inner(self) -> T {
        match self {
            Emission::Cached(value) | Emission::Updated(value) => value,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Emission::Updated(_))
    }
}
