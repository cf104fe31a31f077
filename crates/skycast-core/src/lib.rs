//! Core runtime for Skycast
//!
//! Provides configuration loading and validation plus process-wide
//! tracing initialization, shared by the weather engine and the binary.

pub mod config;

pub use config::{
    CacheConfig, Config, NotificationConfig, ProviderConfig, Units, ValidationResult,
    WeatherConfig,
};

use anyhow::Result;

/// Initialize the core runtime (tracing/logging).
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
