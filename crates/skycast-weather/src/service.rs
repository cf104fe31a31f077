//! Weather service: geocode a query, fetch through bounded retry, consult
//! the cache, and fall back to stale data when the network fails.
//!
//! The cache is injected at construction, owned by the composition root;
//! there is no global state here. All cache writes replace whole entries,
//! so concurrent lookups settle by last write wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::cache::{cache_key, ForecastCache};
use crate::error::WeatherError;
use crate::geocode::GeocodeClient;
use crate::provider::ForecastProvider;
use crate::retry::RetryConfig;
use crate::types::{Coordinate, Location, NormalizedForecast, Units};

/// Where a returned forecast came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    /// Fresh network fetch
    Network,
    /// Cache entry still inside its TTL; a background refresh is running
    CacheFresh,
    /// Expired cache entry served because the network path failed
    CacheStale,
}

impl DataOrigin {
    /// User-visible caveat for degraded results, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::CacheStale => Some("Using cached data due to network or rate-limit issues."),
            Self::Network | Self::CacheFresh => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::CacheFresh | Self::CacheStale)
    }
}

/// A forecast plus the path it took to the caller.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub forecast: NormalizedForecast,
    pub origin: DataOrigin,
}

/// Tuning knobs for the service, grouped so the constructor stays small.
#[derive(Debug, Clone)]
pub struct WeatherOptions {
    pub retry: RetryConfig,
    /// Cache entries older than this fail the freshness check
    pub ttl: Duration,
    /// Display unit preference carried through to providers
    pub units: Units,
    pub horizon_days: u8,
}

impl Default for WeatherOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            ttl: Duration::from_secs(10 * 60),
            units: Units::Metric,
            horizon_days: 7,
        }
    }
}

/// Bounded fetch state machine; the attempt count is part of the state.
enum FetchState {
    Attempt(u32),
    Done(NormalizedForecast),
    Failed(WeatherError),
}

pub struct WeatherService<P: ForecastProvider> {
    geocoder: GeocodeClient,
    provider: Arc<P>,
    cache: Arc<ForecastCache>,
    options: WeatherOptions,
}

impl<P: ForecastProvider + 'static> WeatherService<P> {
    pub fn new(
        geocoder: GeocodeClient,
        provider: P,
        cache: Arc<ForecastCache>,
        options: WeatherOptions,
    ) -> Self {
        Self {
            geocoder,
            provider: Arc::new(provider),
            cache,
            options,
        }
    }

    /// Resolve a place name or `"lat,lon"` literal and fetch its forecast.
    /// The resolved location replaces the provider's placeholder naming.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast_for_query(&self, query: &str) -> Result<ForecastOutcome, WeatherError> {
        let location = self.geocoder.resolve(query).await?;
        let mut outcome = self.fetch_with_retry(location.coordinate).await?;
        if !location.is_placeholder() {
            outcome.forecast.location = location;
        }
        Ok(outcome)
    }

    /// Fetch a forecast for a coordinate with bounded retry and cache
    /// fallback.
    ///
    /// A fresh cache entry is returned immediately while a detached task
    /// revalidates it in the background (stale-while-revalidate); the
    /// network result supersedes the entry via a whole-entry `put`. When
    /// the network path fails, a cache entry of any age downgrades the
    /// failure to a degraded success carrying a visible caveat. Rate
    /// limiting surfaces as `RateLimited` only once every attempt is spent
    /// and no cached payload exists.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_with_retry(
        &self,
        coordinate: Coordinate,
    ) -> Result<ForecastOutcome, WeatherError> {
        let key = cache_key(coordinate, self.options.horizon_days);

        if let Some(entry) = self.cache.get(&key) {
            if entry.is_fresh(self.options.ttl) {
                tracing::debug!("Serving fresh cache entry {}, revalidating behind it", key);
                self.spawn_revalidate(coordinate, key);
                return Ok(ForecastOutcome {
                    forecast: entry.payload,
                    origin: DataOrigin::CacheFresh,
                });
            }
        }

        match self.run_attempts(coordinate).await {
            Ok(forecast) => {
                self.cache.put(&key, forecast.clone());
                Ok(ForecastOutcome {
                    forecast,
                    origin: DataOrigin::Network,
                })
            }
            Err(err) => match self.cache.get(&key) {
                Some(entry) => {
                    tracing::warn!(
                        "Forecast fetch failed ({}), serving cached data from {}",
                        err,
                        entry.fetched_at
                    );
                    Ok(ForecastOutcome {
                        forecast: entry.payload,
                        origin: DataOrigin::CacheStale,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Search for locations matching a query, in provider relevance order.
    pub async fn search_locations(&self, query: &str) -> Result<Vec<Location>, WeatherError> {
        self.geocoder.search(query).await
    }

    /// Empty the cache and its persisted mirror.
    pub fn clear_cache(&self) -> Result<(), WeatherError> {
        self.cache.clear()
    }

    /// Drive the bounded attempt state machine. Only rate-limit responses
    /// earn another attempt; anything else fails straight out and leaves
    /// the fallback decision to the caller.
    async fn run_attempts(&self, coordinate: Coordinate) -> Result<NormalizedForecast, WeatherError> {
        let retry = &self.options.retry;
        let mut state = FetchState::Attempt(1);

        loop {
            state = match state {
                FetchState::Attempt(n) => {
                    let delay = retry.delay_before_attempt(n);
                    if !delay.is_zero() {
                        tracing::info!(
                            "Backing off {:?} before attempt {} of {}",
                            delay,
                            n,
                            retry.max_attempts
                        );
                        tokio::time::sleep(delay).await;
                    }

                    match self
                        .provider
                        .fetch(coordinate, self.options.units, self.options.horizon_days)
                        .await
                    {
                        Ok(forecast) => FetchState::Done(forecast),
                        Err(err) if err.is_rate_limited() && n < retry.max_attempts => {
                            tracing::warn!(
                                "Rate limited on attempt {} of {}",
                                n,
                                retry.max_attempts
                            );
                            FetchState::Attempt(n + 1)
                        }
                        Err(err) => FetchState::Failed(err),
                    }
                }
                FetchState::Done(forecast) => return Ok(forecast),
                FetchState::Failed(err) => return Err(err),
            };
        }
    }

    /// Single-shot background refresh of a fresh-but-aging entry. Best
    /// effort; failures only log.
    fn spawn_revalidate(&self, coordinate: Coordinate, key: String) {
        let provider = Arc::clone(&self.provider);
        let cache = Arc::clone(&self.cache);
        let units = self.options.units;
        let horizon_days = self.options.horizon_days;

        tokio::spawn(async move {
            match provider.fetch(coordinate, units, horizon_days).await {
                Ok(forecast) => {
                    cache.put(&key, forecast);
                    tracing::debug!("Background revalidation refreshed {}", key);
                }
                Err(e) => {
                    tracing::debug!("Background revalidation failed for {}: {}", key, e);
                }
            }
        });
    }
}
