//! Weather data engine for Skycast
//!
//! Resolves place names or coordinate literals to locations, fetches and
//! normalizes forecasts from Open-Meteo, caches them with a persistent
//! mirror, and wraps fetches in bounded retry with stale-cache fallback.

pub mod cache;
pub mod error;
pub mod geocode;
pub mod locations;
pub mod notify;
pub mod provider;
pub mod retry;
pub mod service;
pub mod types;

pub use cache::{cache_key, CacheEntry, ForecastCache};
pub use error::WeatherError;
pub use geocode::GeocodeClient;
pub use locations::SavedLocationStore;
pub use notify::{Notifier, WeatherNotification};
pub use provider::{ForecastProvider, OpenMeteoProvider};
pub use retry::RetryConfig;
pub use service::{DataOrigin, ForecastOutcome, WeatherOptions, WeatherService};
pub use types::*;
