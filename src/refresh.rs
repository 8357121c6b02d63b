//! Refresh orchestration for rate tables and the currency catalogue
//!
//! Every lookup reads the store, decides whether the cached payload is stale,
//! and if so walks the mirror chain in order until one candidate returns a
//! valid body. Network, parse and store failures never reach the caller: the
//! worst case is the previously cached data, or an empty result.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cache::{CacheManager, RecordStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::config::{ServiceConfig, DEFAULT_ATTEMPT_TIMEOUT};
use crate::data::{
    extract_date, parse_catalogue, parse_rates, Catalogue, CurrencyCode, Emission, ParsedRates,
    Record, RecordKey,
};
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::mirror::{Candidate, MirrorResolver};
use crate::staleness::needs_refresh;

/// Errors that can occur while wiring up a service from configuration
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Http(#[from] FetchError),
}

/// Why a single mirror attempt was rejected
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("invalid response body")]
    InvalidResponse,
}

/// Coordinates the store, the staleness policy and the mirror chain
pub struct RateService {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn Fetcher>,
    resolver: MirrorResolver,
    clock: Arc<dyn Clock>,
    attempt_timeout: Duration,
}

impl RateService {
    /// Creates a service with the default mirrors, wall-clock time and timeout
    pub fn new(store: Arc<dyn RecordStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            resolver: MirrorResolver::default(),
            clock: Arc::new(SystemClock),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Builds a disk-backed, HTTP-backed service
    pub fn from_config(config: &ServiceConfig) -> Result<Self, BuildError> {
        let store = CacheManager::open(config.cache_dir.clone())?;
        let fetcher = HttpFetcher::new(config.attempt_timeout)?;

        Ok(Self::new(Arc::new(store), Arc::new(fetcher))
            .with_resolver(MirrorResolver::new(config.source.clone()))
            .with_attempt_timeout(config.attempt_timeout))
    }

    pub fn with_resolver(mut self, resolver: MirrorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Looks up rates for `base` in the background
    ///
    /// The receiver yields the cached snapshot first and then, only if a
    /// refresh produced a different table, the updated one. Dropping the
    /// receiver cancels any in-flight mirror request.
    pub fn get_rates(
        self: &Arc<Self>,
        base: CurrencyCode,
        force_refresh: bool,
        is_online: bool,
    ) -> mpsc::Receiver<Emission<ParsedRates>> {
        let (tx, rx) = mpsc::channel(2);
        let service = Arc::clone(self);

        tokio::spawn(async move {
            let emit = |emission: Emission<ParsedRates>| {
                let _ = tx.try_send(emission);
            };
            tokio::select! {
                _ = service.run_rates(&base, force_refresh, is_online, emit) => {}
                _ = tx.closed() => debug!(%base, "rate lookup cancelled"),
            }
        });

        rx
    }

    /// Looks up the currency catalogue in the background
    ///
    /// Same two-phase contract as [`get_rates`](Self::get_rates): the cached
    /// catalogue (possibly empty) first, then the refreshed one only if it
    /// differs.
    pub fn get_catalogue(
        self: &Arc<Self>,
        force_refresh: bool,
        is_online: bool,
    ) -> mpsc::Receiver<Emission<Catalogue>> {
        let (tx, rx) = mpsc::channel(2);
        let service = Arc::clone(self);

        tokio::spawn(async move {
            let emit = |emission: Emission<Catalogue>| {
                let _ = tx.try_send(emission);
            };
            tokio::select! {
                _ = service.run_catalogue(force_refresh, is_online, emit) => {}
                _ = tx.closed() => debug!("catalogue lookup cancelled"),
            }
        });

        rx
    }

    /// Runs a rate lookup to completion and returns the effective table
    pub async fn rates(
        &self,
        base: &CurrencyCode,
        force_refresh: bool,
        is_online: bool,
    ) -> ParsedRates {
        self.run_rates(base, force_refresh, is_online, |_| {}).await
    }

    /// Runs a catalogue lookup to completion and returns the effective catalogue
    pub async fn catalogue(&self, force_refresh: bool, is_online: bool) -> Catalogue {
        self.run_catalogue(force_refresh, is_online, |_| {}).await
    }

    /// Publication date of the cached rate table for `base`, if any
    pub async fn last_publication_date(&self, base: &CurrencyCode) -> Option<NaiveDate> {
        let record = self.read_cached(&RecordKey::Rates(base.clone())).await?;
        extract_date(&record.payload)
    }

    /// Rate pipeline; `emit` sees the cached snapshot before any network activity
    pub async fn run_rates<F>(
        &self,
        base: &CurrencyCode,
        force_refresh: bool,
        is_online: bool,
        emit: F,
    ) -> ParsedRates
    where
        F: FnMut(Emission<ParsedRates>) + Send,
    {
        let key = RecordKey::Rates(base.clone());
        let parse = |raw: &str| parse_rates(raw, base.as_str());
        self.run_lookup(key, parse, force_refresh, is_online, emit)
            .await
    }

    /// Catalogue pipeline; `emit` sees the cached snapshot before any network activity
    pub async fn run_catalogue<F>(&self, force_refresh: bool, is_online: bool, emit: F) -> Catalogue
    where
        F: FnMut(Emission<Catalogue>) + Send,
    {
        self.run_lookup(RecordKey::Catalogue, parse_catalogue, force_refresh, is_online, emit)
            .await
    }

    /// Shared pipeline: read, emit cached, maybe refresh, emit update if changed
    async fn run_lookup<T, P, F>(
        &self,
        key: RecordKey,
        parse: P,
        force_refresh: bool,
        is_online: bool,
        mut emit: F,
    ) -> T
    where
        T: Clone + Default + PartialEq + Send,
        P: Fn(&str) -> T + Send + Sync,
        F: FnMut(Emission<T>) + Send,
    {
        let span = info_span!("refresh", key = %key);

        async {
            let cached = self.read_cached(&key).await;
            let snapshot = cached
                .as_ref()
                .map(|record| parse(&record.payload))
                .unwrap_or_default();
            emit(Emission::Cached(snapshot.clone()));

            let Some(payload) = self
                .refresh(&key, cached.as_ref(), force_refresh, is_online)
                .await
            else {
                return snapshot;
            };

            let fresh = parse(&payload);
            if fresh != snapshot {
                emit(Emission::Updated(fresh.clone()));
            } else {
                debug!("refreshed data unchanged");
            }
            fresh
        }
        .instrument(span)
        .await
    }

    /// Store read; a failing store counts as an empty one
    async fn read_cached(&self, key: &RecordKey) -> Option<Record> {
        match self.store.get(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as empty");
                None
            }
        }
    }

    /// Returns a newly fetched payload, or `None` when the cached one stands
    async fn refresh(
        &self,
        key: &RecordKey,
        cached: Option<&Record>,
        force_refresh: bool,
        is_online: bool,
    ) -> Option<String> {
        let now = self.clock.now();

        if !needs_refresh(force_refresh, cached, now) {
            debug!("cache is current");
            return None;
        }
        if !is_online {
            debug!("refresh needed but offline");
            return None;
        }

        let payload = self.fetch_first_valid(key, now.date_naive()).await?;

        let record = Record {
            key: key.clone(),
            payload: payload.clone(),
            fetched_at: self.clock.now(),
        };
        if let Err(e) = self.store.upsert(record).await {
            warn!(error = %e, "failed to persist refreshed payload");
        }

        Some(payload)
    }

    /// Walks the mirror chain strictly in order; first valid body wins
    async fn fetch_first_valid(&self, key: &RecordKey, today: NaiveDate) -> Option<String> {
        for candidate in self.resolver.candidate_urls(key, today) {
            debug!(mirror = %candidate.mirror, url = %candidate.url, "trying mirror");

            match self.attempt(&candidate).await {
                Ok(body) => {
                    info!(mirror = %candidate.mirror, url = %candidate.url, "refreshed");
                    return Some(body);
                }
                Err(e) => {
                    warn!(mirror = %candidate.mirror, url = %candidate.url, error = %e, "mirror attempt failed");
                }
            }
        }

        warn!("all mirrors failed, keeping cached data");
        None
    }

    async fn attempt(&self, candidate: &Candidate) -> Result<String, AttemptError> {
        let body = tokio::time::timeout(self.attempt_timeout, self.fetcher.fetch(&candidate.url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: candidate.url.clone(),
            })??;

        if !candidate.accepts(&body) {
            return Err(AttemptError::InvalidResponse);
        }
        Ok(body)
    }
}
