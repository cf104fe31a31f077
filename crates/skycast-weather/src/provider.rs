//! Forecast retrieval and normalization.
//!
//! `OpenMeteoProvider` adapts the Open-Meteo forecast API into the internal
//! `NormalizedForecast` schema: both unit systems are derived up front, WMO
//! condition codes map through a static table, and severe-weather warnings
//! are attached best-effort. Other vendors implement `ForecastProvider`;
//! nothing else changes.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

use crate::error::WeatherError;
use crate::types::{
    rain_chance, ConditionSample, Coordinate, DailySummary, Location, NormalizedForecast,
    Temperature, Units, WeatherAlert, WeatherCondition, WindSpeed,
};

const REQUEST_TIMEOUT_SECS: u64 = 10;

const CURRENT_FIELDS: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "wind_speed_10m",
    "wind_direction_10m",
    "weather_code",
];

const HOURLY_FIELDS: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "precipitation",
    "weather_code",
    "wind_speed_10m",
    "wind_direction_10m",
];

const DAILY_FIELDS: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "weather_code",
    "uv_index_max",
];

/// Adapter seam for forecast vendors.
pub trait ForecastProvider: Send + Sync {
    /// Fetch and normalize a forecast for a coordinate.
    fn fetch(
        &self,
        coordinate: Coordinate,
        units: Units,
        horizon_days: u8,
    ) -> impl Future<Output = Result<NormalizedForecast, WeatherError>> + Send;
}

/// The shipped adapter for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Client,
    forecast_url: String,
    warnings_url: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
    hourly: HourlyBlock,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    relative_humidity_2m: Vec<f64>,
    apparent_temperature: Vec<f64>,
    precipitation: Vec<f64>,
    weather_code: Vec<i32>,
    wind_speed_10m: Vec<f64>,
    wind_direction_10m: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_sum: Vec<f64>,
    weather_code: Vec<i32>,
    #[serde(default)]
    uv_index_max: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct WarningsResponse {
    #[serde(default)]
    warnings: Vec<WarningItem>,
}

#[derive(Debug, Deserialize)]
struct WarningItem {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    expires: Option<String>,
}

impl WarningItem {
    fn into_alert(self, index: usize) -> WeatherAlert {
        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => index.to_string(),
        };
        WeatherAlert {
            id,
            event: self.event.unwrap_or_else(|| "Weather Warning".to_string()),
            severity: self.severity.unwrap_or_default(),
            headline: self.headline.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            expires: self.expires,
        }
    }
}

impl OpenMeteoProvider {
    pub fn new(forecast_url: &str, warnings_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            forecast_url: forecast_url.trim_end_matches('/').to_string(),
            warnings_url: warnings_url.trim_end_matches('/').to_string(),
        })
    }

    /// One request carries the current/hourly/daily variable sets for the
    /// requested horizon. Celsius and km/h are canonical on the wire; both
    /// unit systems are derived during normalization.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(
        &self,
        coordinate: Coordinate,
        units: Units,
        horizon_days: u8,
    ) -> Result<NormalizedForecast, WeatherError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current={}&hourly={}&daily={}&forecast_days={}&timezone=auto",
            self.forecast_url,
            coordinate.latitude,
            coordinate.longitude,
            CURRENT_FIELDS.join(","),
            HOURLY_FIELDS.join(","),
            DAILY_FIELDS.join(","),
            horizon_days,
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(WeatherError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("forecast response: {}", e)))?;

        let alerts = self.fetch_warnings(coordinate).await;
        let forecast = normalize(coordinate, body, alerts)?;
        tracing::info!(
            "Fetched forecast: {} hourly samples, {} days, {} alerts ({:?} display)",
            forecast.hourly.len(),
            forecast.daily.len(),
            forecast.alerts.len(),
            units,
        );
        Ok(forecast)
    }

    /// Severe-weather warnings are best-effort: any failure here degrades
    /// to an empty alert list, never an error.
    async fn fetch_warnings(&self, coordinate: Coordinate) -> Vec<WeatherAlert> {
        let url = format!(
            "{}?latitude={}&longitude={}&timezone=auto",
            self.warnings_url, coordinate.latitude, coordinate.longitude,
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Warnings request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Warnings returned status {}", response.status());
            return Vec::new();
        }

        let body: WarningsResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Warnings parse error: {}", e);
                return Vec::new();
            }
        };

        body.warnings
            .into_iter()
            .enumerate()
            .map(|(i, w)| w.into_alert(i))
            .collect()
    }
}

impl ForecastProvider for OpenMeteoProvider {
    async fn fetch(
        &self,
        coordinate: Coordinate,
        units: Units,
        horizon_days: u8,
    ) -> Result<NormalizedForecast, WeatherError> {
        self.fetch_forecast(coordinate, units, horizon_days).await
    }
}

fn normalize(
    coordinate: Coordinate,
    body: ForecastResponse,
    alerts: Vec<WeatherAlert>,
) -> Result<NormalizedForecast, WeatherError> {
    let hourly = normalize_hourly(&body.hourly)?;
    let daily = normalize_daily(&body.daily)?;

    // The current block carries no precipitation series; the first hourly
    // value stands in for it.
    let current_precip = body.hourly.precipitation.first().copied().unwrap_or(0.0);
    let condition = WeatherCondition::from_wmo_code(body.current.weather_code);
    let current = ConditionSample {
        time: parse_hour(&body.current.time)?,
        temperature: Temperature::from_celsius(body.current.temperature_2m),
        feels_like: Temperature::from_celsius(body.current.apparent_temperature),
        humidity: clamp_humidity(body.current.relative_humidity_2m),
        wind: WindSpeed::from_kmh(body.current.wind_speed_10m),
        wind_direction_deg: normalize_direction(body.current.wind_direction_10m),
        precipitation_mm: current_precip,
        rain_chance: rain_chance(current_precip, condition),
        condition,
    };

    Ok(NormalizedForecast {
        location: Location::from_coordinate(coordinate),
        current,
        hourly,
        daily,
        alerts,
        fetched_at: Utc::now(),
    })
}

fn normalize_hourly(block: &HourlyBlock) -> Result<Vec<ConditionSample>, WeatherError> {
    let n = block.time.len();
    check_series_len("temperature_2m", n, block.temperature_2m.len())?;
    check_series_len("relative_humidity_2m", n, block.relative_humidity_2m.len())?;
    check_series_len("apparent_temperature", n, block.apparent_temperature.len())?;
    check_series_len("precipitation", n, block.precipitation.len())?;
    check_series_len("weather_code", n, block.weather_code.len())?;
    check_series_len("wind_speed_10m", n, block.wind_speed_10m.len())?;
    check_series_len("wind_direction_10m", n, block.wind_direction_10m.len())?;

    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let condition = WeatherCondition::from_wmo_code(block.weather_code[i]);
        samples.push(ConditionSample {
            time: parse_hour(&block.time[i])?,
            temperature: Temperature::from_celsius(block.temperature_2m[i]),
            feels_like: Temperature::from_celsius(block.apparent_temperature[i]),
            humidity: clamp_humidity(block.relative_humidity_2m[i]),
            wind: WindSpeed::from_kmh(block.wind_speed_10m[i]),
            wind_direction_deg: normalize_direction(block.wind_direction_10m[i]),
            precipitation_mm: block.precipitation[i],
            rain_chance: rain_chance(block.precipitation[i], condition),
            condition,
        });
    }
    Ok(samples)
}

fn normalize_daily(block: &DailyBlock) -> Result<Vec<DailySummary>, WeatherError> {
    let n = block.time.len();
    check_series_len("temperature_2m_max", n, block.temperature_2m_max.len())?;
    check_series_len("temperature_2m_min", n, block.temperature_2m_min.len())?;
    check_series_len("precipitation_sum", n, block.precipitation_sum.len())?;
    check_series_len("weather_code", n, block.weather_code.len())?;

    let mut days = Vec::with_capacity(n);
    for i in 0..n {
        let condition = WeatherCondition::from_wmo_code(block.weather_code[i]);
        days.push(DailySummary {
            date: parse_date(&block.time[i])?,
            high: Temperature::from_celsius(block.temperature_2m_max[i]),
            low: Temperature::from_celsius(block.temperature_2m_min[i]),
            condition,
            precipitation_sum_mm: block.precipitation_sum[i],
            rain_chance: rain_chance(block.precipitation_sum[i], condition),
            uv_index: block.uv_index_max.get(i).copied().unwrap_or(0.0),
        });
    }
    Ok(days)
}

fn check_series_len(name: &str, expected: usize, actual: usize) -> Result<(), WeatherError> {
    if expected == actual {
        Ok(())
    } else {
        Err(WeatherError::Parse(format!(
            "series {} has {} entries, expected {}",
            name, actual, expected
        )))
    }
}

fn parse_hour(value: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| WeatherError::Parse(format!("timestamp {:?}: {}", value, e)))
}

fn parse_date(value: &str) -> Result<NaiveDate, WeatherError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| WeatherError::Parse(format!("date {:?}: {}", value, e)))
}

fn clamp_humidity(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn normalize_direction(value: f64) -> u16 {
    value.rem_euclid(360.0).round() as u16 % 360
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sample_response() -> ForecastResponse {
        serde_json::from_value(serde_json::json!({
            "current": {
                "time": "2025-06-01T12:00",
                "temperature_2m": 21.0,
                "relative_humidity_2m": 55,
                "apparent_temperature": 20.2,
                "wind_speed_10m": 16.09344,
                "wind_direction_10m": 270,
                "weather_code": 61
            },
            "hourly": {
                "time": ["2025-06-01T12:00", "2025-06-01T13:00"],
                "temperature_2m": [21.0, 22.5],
                "relative_humidity_2m": [55, 50],
                "apparent_temperature": [20.2, 21.9],
                "precipitation": [0.6, 0.0],
                "weather_code": [61, 777],
                "wind_speed_10m": [16.09344, 10.0],
                "wind_direction_10m": [270, 90]
            },
            "daily": {
                "time": ["2025-06-01", "2025-06-02"],
                "temperature_2m_max": [24.0, 19.0],
                "temperature_2m_min": [13.0, 11.5],
                "precipitation_sum": [6.0, 0.0],
                "weather_code": [61, 0],
                "uv_index_max": [5.2, 3.0]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_derives_both_unit_systems() {
        let coordinate = Coordinate {
            latitude: 51.5,
            longitude: -0.1,
        };
        let forecast = normalize(coordinate, sample_response(), Vec::new()).unwrap();

        assert_eq!(forecast.current.temperature.celsius, 21.0);
        assert_eq!(forecast.current.temperature.fahrenheit, 69.8);
        assert_eq!(forecast.current.wind.mph, 10.0);
        assert_eq!(forecast.current.condition, WeatherCondition::Rain);
        assert_eq!(forecast.current.humidity, 55);
        assert_eq!(forecast.current.wind_direction_deg, 270);
    }

    #[test]
    fn test_normalize_unknown_code_falls_back() {
        let coordinate = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        let forecast = normalize(coordinate, sample_response(), Vec::new()).unwrap();

        assert_eq!(forecast.hourly[1].condition, WeatherCondition::Unknown);
        assert_eq!(forecast.hourly[1].condition.description(), "Unknown");
    }

    #[test]
    fn test_normalize_rain_chance() {
        let coordinate = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        let forecast = normalize(coordinate, sample_response(), Vec::new()).unwrap();

        // 0.6 mm volume gives 40, rain class gives 60; maximum wins
        assert_eq!(forecast.hourly[0].rain_chance, 60);
        // Dry hour with an unknown code keeps the volume floor
        assert_eq!(forecast.hourly[1].rain_chance, 10);
        // 6 mm daily sum lands in the top breakpoint
        assert_eq!(forecast.daily[0].rain_chance, 95);
    }

    #[test]
    fn test_normalize_daily_summaries() {
        let coordinate = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        let forecast = normalize(coordinate, sample_response(), Vec::new()).unwrap();

        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.daily[0].high.celsius, 24.0);
        assert_eq!(forecast.daily[0].low.celsius, 13.0);
        assert_eq!(forecast.daily[0].uv_index, 5.2);
        assert_eq!(forecast.daily[1].condition, WeatherCondition::Clear);
    }

    #[test]
    fn test_normalize_rejects_mismatched_series() {
        let mut body = sample_response();
        body.hourly.precipitation.pop();

        let coordinate = Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
        let err = normalize(coordinate, body, Vec::new()).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
        assert!(err.to_string().contains("precipitation"));
    }

    #[test]
    fn test_normalize_location_is_placeholder() {
        let coordinate = Coordinate {
            latitude: 51.5,
            longitude: -0.1,
        };
        let forecast = normalize(coordinate, sample_response(), Vec::new()).unwrap();
        assert!(forecast.location.is_placeholder());
        assert_eq!(forecast.location.coordinate, coordinate);
    }

    #[test]
    fn test_warning_item_id_variants() {
        let item: WarningItem = serde_json::from_value(serde_json::json!({
            "id": 42,
            "event": "Gale Warning",
            "severity": "severe"
        }))
        .unwrap();
        let alert = item.into_alert(0);
        assert_eq!(alert.id, "42");
        assert!(alert.is_urgent());

        let item: WarningItem = serde_json::from_value(serde_json::json!({})).unwrap();
        let alert = item.into_alert(3);
        assert_eq!(alert.id, "3");
        assert_eq!(alert.event, "Weather Warning");
        assert!(!alert.is_urgent());
    }

    #[test]
    fn test_direction_normalization() {
        assert_eq!(normalize_direction(270.0), 270);
        assert_eq!(normalize_direction(359.6), 0);
        assert_eq!(normalize_direction(-90.0), 270);
    }
}
