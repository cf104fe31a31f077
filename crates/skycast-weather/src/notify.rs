//! Severe-weather notifications.
//!
//! Prepares user-visible notifications from a normalized forecast: one per
//! urgent upstream alert, plus one when the current temperature crosses an
//! extreme threshold. Delivery transports (desktop, push) live outside this
//! crate and consume the prepared values as-is.

use crate::types::NormalizedForecast;

/// A formatted notification ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherNotification {
    pub title: String,
    pub body: String,
}

/// Prepares notifications when the user has granted permission.
#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
    heat_threshold_c: f64,
    cold_threshold_c: f64,
}

impl Notifier {
    pub fn new(enabled: bool, heat_threshold_c: f64, cold_threshold_c: f64) -> Self {
        Self {
            enabled,
            heat_threshold_c,
            cold_threshold_c,
        }
    }

    /// Notifications for urgent alerts and extreme temperatures.
    /// Empty when notifications are not enabled (permission gate).
    pub fn prepare(&self, forecast: &NormalizedForecast) -> Vec<WeatherNotification> {
        if !self.enabled {
            return Vec::new();
        }

        let mut notifications = Vec::new();

        for alert in &forecast.alerts {
            if !alert.is_urgent() {
                continue;
            }
            let body = if alert.headline.is_empty() {
                alert.description.clone()
            } else {
                alert.headline.clone()
            };
            notifications.push(WeatherNotification {
                title: format!("{} ({})", alert.event, alert.severity),
                body,
            });
        }

        let place = &forecast.location.display_name;
        let current = forecast.current.temperature.celsius;
        if current >= self.heat_threshold_c {
            notifications.push(WeatherNotification {
                title: "Extreme heat".to_string(),
                body: format!("Current temperature in {} is {:.1}°C", place, current),
            });
        } else if current <= self.cold_threshold_c {
            notifications.push(WeatherNotification {
                title: "Extreme cold".to_string(),
                body: format!("Current temperature in {} is {:.1}°C", place, current),
            });
        }

        notifications
    }
}
