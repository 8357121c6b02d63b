//! Command-line interface parsing for ratecache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a [`ServiceConfig`], plus the plain-text rendering used by the binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::data::{CatalogueEntry, CurrencyCode, Emission, InvalidCurrencyCode, ParsedRates};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The argument is not a currency code
    #[error(transparent)]
    InvalidCurrency(#[from] InvalidCurrencyCode),
}

/// ratecache - Daily exchange rates with offline cache and mirror fallback
#[derive(Parser, Debug)]
#[command(name = "ratecache")]
#[command(about = "Daily exchange rates with offline cache and mirror fallback")]
#[command(version)]
pub struct Cli {
    /// Directory for cached payloads (defaults to the platform cache dir)
    #[arg(long, global = true, env = "RATECACHE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Give up on a single mirror after this many seconds
    #[arg(
        long,
        global = true,
        env = "RATECACHE_TIMEOUT_SECS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..),
        value_name = "SECS"
    )]
    pub timeout_secs: u64,

    /// Log refresh activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show exchange rates for one or more base currencies
    ///
    /// Examples:
    ///   ratecache rates usd
    ///   ratecache rates usd eur --target gbp --target jpy
    ///   ratecache rates chf --offline
    Rates {
        /// Base currency codes
        #[arg(required = true, value_parser = parse_currency_arg)]
        bases: Vec<CurrencyCode>,

        /// Only show these target currencies
        #[arg(long = "target", value_name = "CODE", value_parser = parse_currency_arg)]
        targets: Vec<CurrencyCode>,

        #[command(flatten)]
        refresh: RefreshArgs,
    },

    /// List all known currency codes and titles
    Currencies {
        #[command(flatten)]
        refresh: RefreshArgs,
    },

    /// Show the publication date of the cached rates for a base currency
    Date {
        /// Base currency code
        #[arg(value_parser = parse_currency_arg)]
        base: CurrencyCode,
    },
}

/// Flags controlling whether the network is consulted
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RefreshArgs {
    /// Refresh even if the cached data is current
    #[arg(long)]
    pub force: bool,

    /// Never touch the network; use cached data only
    #[arg(long)]
    pub offline: bool,
}

impl RefreshArgs {
    pub fn is_online(&self) -> bool {
        !self.offline
    }
}

/// Parses a currency code argument
pub fn parse_currency_arg(s: &str) -> Result<CurrencyCode, CliError> {
    Ok(s.parse::<CurrencyCode>()?)
}

impl Cli {
    /// Builds the service configuration from parsed CLI arguments
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            attempt_timeout: Duration::from_secs(self.timeout_secs),
            cache_dir: self.cache_dir.clone(),
            ..ServiceConfig::default()
        }
    }
}

/// Renders one rate emission as a block of `CODE  rate` lines
pub fn format_rates(
    base: &CurrencyCode,
    emission: &Emission<ParsedRates>,
    targets: &[CurrencyCode],
) -> String {
    let (label, rates) = match emission {
        Emission::Cached(rates) => ("cached", rates),
        Emission::Updated(rates) => ("updated", rates),
    };

    let mut out = format!("# {base} ({label})\n");
    if rates.is_empty() {
        out.push_str("no rates available\n");
        return out;
    }

    for (code, rate) in rates {
        if targets.is_empty() || targets.iter().any(|t| t.as_str() == code) {
            out.push_str(&format!("{:<6}{}\n", code.to_ascii_uppercase(), rate));
        }
    }
    out
}

/// Renders the catalogue as `CODE  Title` lines
pub fn format_catalogue(entries: &[CatalogueEntry]) -> String {
    if entries.is_empty() {
        return "no currencies available\n".to_string();
    }
    entries
        .iter()
        .map(|e| format!("{:<8}{}\n", e.code, e.title))
        .collect()
}
