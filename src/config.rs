//! Runtime configuration for the rate service

use std::path::PathBuf;
use std::time::Duration;

/// Default CDN host serving versioned npm packages
pub const DEFAULT_CDN_HOST: &str = "cdn.jsdelivr.net";

/// Default npm package publishing the daily currency data
pub const DEFAULT_PACKAGE: &str = "fawazahmed0/currency-api";

/// Default static-pages host serving dated copies of the data
pub const DEFAULT_PAGES_HOST: &str = "currency-api.pages.dev";

/// Default upper bound on a single mirror attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(3);

/// Where the upstream data is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Host of the primary CDN mirror
    pub cdn_host: String,
    /// Package path on the CDN, without the leading `@`
    pub package: String,
    /// Host suffix of the secondary pages mirror
    pub pages_host: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cdn_host: DEFAULT_CDN_HOST.to_string(),
            package: DEFAULT_PACKAGE.to_string(),
            pages_host: DEFAULT_PAGES_HOST.to_string(),
        }
    }
}

/// Configuration for building a [`RateService`](crate::refresh::RateService)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upstream mirrors
    pub source: SourceConfig,
    /// Timeout applied to each mirror attempt
    pub attempt_timeout: Duration,
    /// Cache directory override; `None` uses the XDG cache directory
    pub cache_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            cache_dir: None,
        }
    }
}
