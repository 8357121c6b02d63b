//! Mirror resolution for the upstream currency data
//!
//! The data is published once a day as a dated npm release (served by a CDN)
//! and as a dated static site. Releases appear slightly ahead of UTC midnight,
//! so tomorrow's tag is tried before today's, then the CDN's `@latest` tag,
//! then the pages mirror for the same two dates.

use chrono::{Duration, NaiveDate};
use std::fmt;

use crate::config::SourceConfig;
use crate::data::RecordKey;

/// Body marker the CDN returns for a release tag that does not exist yet
pub const RELEASE_NOT_FOUND_MARKER: &str = "Couldn't find the requested release version";

/// Body marker of the pages mirror's HTML error page
pub const HTML_ERROR_MARKER: &str = "<h1";

/// Which mirror a candidate URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    /// CDN, dated release tag
    CdnDated,
    /// CDN, `@latest` tag
    CdnLatest,
    /// Static pages, dated subdomain
    PagesDated,
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mirror::CdnDated => "cdn-dated",
            Mirror::CdnLatest => "cdn-latest",
            Mirror::PagesDated => "pages-dated",
        };
        f.write_str(name)
    }
}

impl Mirror {
    /// Whether a successful response body from this mirror is usable
    pub fn accepts(&self, body: &str) -> bool {
        match self {
            Mirror::CdnDated => !body.contains(RELEASE_NOT_FOUND_MARKER),
            Mirror::PagesDated => !body.contains(HTML_ERROR_MARKER),
            Mirror::CdnLatest => true,
        }
    }
}

/// One fetch attempt in preference order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub mirror: Mirror,
}

impl Candidate {
    /// Validity check for a body fetched from this candidate
    pub fn accepts(&self, body: &str) -> bool {
        self.mirror.accepts(body)
    }
}

/// Builds the ordered candidate list for a resource
#[derive(Debug, Clone, Default)]
pub struct MirrorResolver {
    source: SourceConfig,
}

impl MirrorResolver {
    pub fn new(source: SourceConfig) -> Self {
        Self { source }
    }

    /// Candidate URLs for `key` on `today` (UTC), most preferred first
    pub fn candidate_urls(&self, key: &RecordKey, today: NaiveDate) -> Vec<Candidate> {
        let path = resource_path(key);
        let tomorrow = today
            .checked_add_signed(Duration::days(1))
            .unwrap_or(today);

        vec![
            self.cdn_dated(tomorrow, &path),
            self.cdn_dated(today, &path),
            Candidate {
                url: self.cdn_url("latest", &path),
                mirror: Mirror::CdnLatest,
            },
            self.pages_dated(tomorrow, &path),
            self.pages_dated(today, &path),
        ]
    }

    fn cdn_url(&self, tag: &str, path: &str) -> String {
        format!(
            "https://{}/npm/@{}@{}/v1/{}",
            self.source.cdn_host, self.source.package, tag, path
        )
    }

    fn cdn_dated(&self, date: NaiveDate, path: &str) -> Candidate {
        let tag = date.format("%Y.%-m.%-d").to_string();
        Candidate {
            url: self.cdn_url(&tag, path),
            mirror: Mirror::CdnDated,
        }
    }

    fn pages_dated(&self, date: NaiveDate, path: &str) -> Candidate {
        Candidate {
            url: format!(
                "https://{}.{}/v1/{}",
                date.format("%Y-%m-%d"),
                self.source.pages_host,
                path
            ),
            mirror: Mirror::PagesDated,
        }
    }
}

/// Path of a resource below the `v1/` root
pub fn resource_path(key: &RecordKey) -> String {
    match key {
        RecordKey::Rates(base) => format!("currencies/{}.json", base.as_str()),
        RecordKey::Catalogue => "currencies.min.json".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CurrencyCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn usd() -> RecordKey {
        RecordKey::Rates("USD".parse::<CurrencyCode>().unwrap())
    }

    #[test]
    fn test_rate_candidates_order_and_format() {
        let resolver = MirrorResolver::default();
        let urls: Vec<String> = resolver
            .candidate_urls(&usd(), date(2024, 3, 6))
            .into_iter()
            .map(|c| c.url)
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@2024.3.7/v1/currencies/usd.json",
                "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@2024.3.6/v1/currencies/usd.json",
                "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/usd.json",
                "https://2024-03-07.currency-api.pages.dev/v1/currencies/usd.json",
                "https://2024-03-06.currency-api.pages.dev/v1/currencies/usd.json",
            ]
        );
    }

    #[test]
    fn test_catalogue_candidates_share_template() {
        let resolver = MirrorResolver::default();
        let today = date(2024, 12, 31);
        let rates = resolver.candidate_urls(&usd(), today);
        let catalogue = resolver.candidate_urls(&RecordKey::Catalogue, today);

        assert_eq!(rates.len(), catalogue.len());
        for (r, c) in rates.iter().zip(&catalogue) {
            assert_eq!(r.mirror, c.mirror);
            assert_eq!(
                r.url.replace("currencies/usd.json", "currencies.min.json"),
                c.url
            );
        }
        assert_eq!(
            catalogue[0].url,
            "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@2025.1.1/v1/currencies.min.json"
        );
        assert_eq!(
            catalogue[3].url,
            "https://2025-01-01.currency-api.pages.dev/v1/currencies.min.json"
        );
    }

    #[test]
    fn test_mirror_kinds_in_order() {
        let mirrors: Vec<Mirror> = MirrorResolver::default()
            .candidate_urls(&RecordKey::Catalogue, date(2024, 1, 1))
            .into_iter()
            .map(|c| c.mirror)
            .collect();
        assert_eq!(
            mirrors,
            vec![
                Mirror::CdnDated,
                Mirror::CdnDated,
                Mirror::CdnLatest,
                Mirror::PagesDated,
                Mirror::PagesDated,
            ]
        );
    }

    #[test]
    fn test_custom_source_hosts() {
        let resolver = MirrorResolver::new(SourceConfig {
            cdn_host: "cdn.example".to_string(),
            package: "acme/rates".to_string(),
            pages_host: "rates.example".to_string(),
        });
        let candidates = resolver.candidate_urls(&usd(), date(2024, 10, 9));
        assert_eq!(
            candidates[1].url,
            "https://cdn.example/npm/@acme/rates@2024.10.9/v1/currencies/usd.json"
        );
        assert_eq!(
            candidates[4].url,
            "https://2024-10-09.rates.example/v1/currencies/usd.json"
        );
    }

    #[test]
    fn test_validity_predicates() {
        let not_found = format!("{RELEASE_NOT_FOUND_MARKER} for @fawazahmed0/currency-api");
        assert!(!Mirror::CdnDated.accepts(&not_found));
        assert!(Mirror::CdnDated.accepts(r#"{"date":"2024-01-01"}"#));

        assert!(!Mirror::PagesDated.accepts("<html><h1>404 Not Found</h1></html>"));
        assert!(Mirror::PagesDated.accepts(r#"{"eur":"Euro"}"#));

        assert!(Mirror::CdnLatest.accepts(&not_found));
        assert!(Mirror::CdnLatest.accepts("<h1>anything</h1>"));
    }
}
