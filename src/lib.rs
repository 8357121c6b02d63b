//! ratecache library
//!
//! Exchange-rate acquisition and caching: per-base rate tables and the currency
//! catalogue are fetched from a chain of dated mirrors, persisted, and served
//! from cache whenever the network is unavailable or the data is current.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod fetch;
pub mod mirror;
pub mod refresh;
pub mod staleness;

pub use data::{Catalogue, CatalogueEntry, CurrencyCode, Emission, ParsedRates};
pub use refresh::RateService;
