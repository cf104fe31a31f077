use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use skycast_core::config::Units as ConfigUnits;
use skycast_core::Config;
use skycast_weather::{
    ForecastCache, ForecastOutcome, GeocodeClient, Notifier, OpenMeteoProvider, RetryConfig,
    Units, WeatherOptions, WeatherService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core (tracing)
    skycast_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    // Composition root: the cache is built here and injected, not global
    let cache = Arc::new(ForecastCache::new(&config.effective_cache_dir()));
    let geocoder = GeocodeClient::new(&config.providers.geocode_url)?;
    let provider = OpenMeteoProvider::new(
        &config.providers.forecast_url,
        &config.providers.warnings_url,
    )?;

    let units = match config.weather.units {
        ConfigUnits::Metric => Units::Metric,
        ConfigUnits::Imperial => Units::Imperial,
    };
    let options = WeatherOptions {
        retry: RetryConfig::default(),
        ttl: Duration::from_secs(u64::from(config.cache.ttl_minutes) * 60),
        units,
        horizon_days: config.weather.horizon_days,
    };
    let service = WeatherService::new(geocoder, provider, cache, options);
    let notifier = Notifier::new(
        config.notifications.enabled,
        config.notifications.heat_threshold_c,
        config.notifications.cold_threshold_c,
    );

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.weather.default_query.clone());
    tracing::info!("Fetching forecast for {:?}", query);

    match service.forecast_for_query(&query).await {
        Ok(outcome) => {
            print_forecast(&outcome, units);
            for notification in notifier.prepare(&outcome.forecast) {
                tracing::warn!(
                    "Notification: {} - {}",
                    notification.title,
                    notification.body
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Forecast for {:?} failed: {}", query, e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn print_forecast(outcome: &ForecastOutcome, units: Units) {
    let forecast = &outcome.forecast;
    let (temp_suffix, wind_suffix) = match units {
        Units::Metric => ("°C", "km/h"),
        Units::Imperial => ("°F", "mph"),
    };

    if let Some(notice) = outcome.origin.notice() {
        println!("note: {}", notice);
    }

    let location = &forecast.location;
    if location.country.is_empty() {
        println!("{}", location.display_name);
    } else {
        println!("{} ({})", location.display_name, location.country);
    }

    let current = &forecast.current;
    println!(
        "  {}  {:.1}{}  feels like {:.1}{}  humidity {}%  wind {:.1} {}",
        current.condition.description(),
        current.temperature.in_units(units),
        temp_suffix,
        current.feels_like.in_units(units),
        temp_suffix,
        current.humidity,
        current.wind.in_units(units),
        wind_suffix,
    );

    for day in &forecast.daily {
        println!(
            "  {}  {:<13} {:.1}/{:.1}{}  rain {}%",
            day.date,
            day.condition.description(),
            day.high.in_units(units),
            day.low.in_units(units),
            temp_suffix,
            day.rain_chance,
        );
    }

    for alert in &forecast.alerts {
        println!(
            "  ! {} ({}): {}",
            alert.event, alert.severity, alert.headline
        );
    }
}
