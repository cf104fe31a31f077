use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name given to locations built straight from coordinate input.
pub const COORDINATE_PLACEHOLDER: &str = "Coordinates";

/// Unit system preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    Sleet,
    Rain,
    HeavyRain,
    Snow,
    Showers,
    Thunderstorm,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 => Self::Rain,
            65 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            80 | 81 => Self::Showers,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Sleet => "Sleet",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Showers => "Rain Showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }

    /// Get the icon token consumed by display layers
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Overcast => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle => "cloud_rain",
            Self::Sleet => "cloud_snow",
            Self::Rain => "cloud_rain",
            Self::HeavyRain => "cloud_rain",
            Self::Snow => "cloud_snow",
            Self::Showers => "cloud_rain",
            Self::Thunderstorm => "cloud_lightning",
            Self::Unknown => "question",
        }
    }

    /// Rain likelihood implied by the condition class alone, in percent.
    /// Feeds the rain-chance heuristic; not a meteorological statement.
    pub fn rain_chance_estimate(&self) -> u8 {
        match self {
            Self::Drizzle => 40,
            Self::Rain | Self::Showers => 60,
            Self::HeavyRain => 80,
            Self::Thunderstorm => 90,
            _ => 0,
        }
    }
}

/// Best-effort rain probability from precipitation volume and condition
/// class. The upstream response carries no probability series, so this
/// combines a fixed volume breakpoint table with the condition-class
/// estimate and takes the larger of the two.
pub fn rain_chance(precipitation_mm: f64, condition: WeatherCondition) -> u8 {
    let by_volume = if precipitation_mm < 0.1 {
        10
    } else if precipitation_mm < 0.5 {
        25
    } else if precipitation_mm < 1.0 {
        40
    } else if precipitation_mm < 2.5 {
        55
    } else if precipitation_mm < 5.0 {
        75
    } else {
        95
    };
    by_volume.max(condition.rain_chance_estimate())
}

/// Round to one decimal place; shared by all derived unit conversions.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Temperature carried in both unit systems so consumers never convert.
/// Celsius is canonical; Fahrenheit is derived at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub celsius: f64,
    pub fahrenheit: f64,
}

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self {
            celsius,
            fahrenheit: round1(celsius * 9.0 / 5.0 + 32.0),
        }
    }

    pub fn in_units(&self, units: Units) -> f64 {
        match units {
            Units::Metric => self.celsius,
            Units::Imperial => self.fahrenheit,
        }
    }
}

/// Wind speed in both unit systems; km/h is canonical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSpeed {
    pub kmh: f64,
    pub mph: f64,
}

impl WindSpeed {
    pub fn from_kmh(kmh: f64) -> Self {
        Self {
            kmh,
            mph: round1(kmh / 1.609_344),
        }
    }

    pub fn in_units(&self, units: Units) -> f64 {
        match units {
            Units::Metric => self.kmh,
            Units::Imperial => self.mph,
        }
    }
}

/// Geographic coordinate pair; immutable once obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Stable location id at 4-decimal precision (about 11 m)
    pub fn id(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// A resolved place: coordinates plus naming from the geocoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub display_name: String,
    pub country: String,
    pub coordinate: Coordinate,
}

impl Location {
    /// Build a location straight from coordinates, without a geocoder.
    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self {
            id: coordinate.id(),
            display_name: COORDINATE_PLACEHOLDER.to_string(),
            country: String::new(),
            coordinate,
        }
    }

    /// True when the display name is the coordinate placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.display_name == COORDINATE_PLACEHOLDER
    }
}

/// One observed or forecast moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSample {
    pub time: NaiveDateTime,
    pub temperature: Temperature,
    pub feels_like: Temperature,
    pub humidity: u8,
    pub wind: WindSpeed,
    pub wind_direction_deg: u16,
    pub precipitation_mm: f64,
    pub rain_chance: u8,
    pub condition: WeatherCondition,
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub high: Temperature,
    pub low: Temperature,
    pub condition: WeatherCondition,
    pub precipitation_sum_mm: f64,
    pub rain_chance: u8,
    pub uv_index: f64,
}

/// A severe-weather warning from the upstream provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub event: String,
    pub severity: String,
    pub headline: String,
    pub description: String,
    pub expires: Option<String>,
}

impl WeatherAlert {
    /// Severe/extreme alerts warrant a user-visible notification.
    pub fn is_urgent(&self) -> bool {
        matches!(
            self.severity.to_lowercase().as_str(),
            "severe" | "extreme"
        )
    }
}

/// Complete normalized forecast bundle.
/// Produced wholesale on every successful fetch; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedForecast {
    pub location: Location,
    pub current: ConditionSample,
    pub hourly: Vec<ConditionSample>,
    pub daily: Vec<DailySummary>,
    pub alerts: Vec<WeatherAlert>,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_code_clear() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
    }

    #[test]
    fn test_wmo_code_partly_cloudy() {
        assert_eq!(
            WeatherCondition::from_wmo_code(1),
            WeatherCondition::PartlyCloudy
        );
        assert_eq!(
            WeatherCondition::from_wmo_code(2),
            WeatherCondition::PartlyCloudy
        );
    }

    #[test]
    fn test_wmo_code_overcast() {
        assert_eq!(
            WeatherCondition::from_wmo_code(3),
            WeatherCondition::Overcast
        );
    }

    #[test]
    fn test_wmo_code_drizzle_and_rain() {
        assert_eq!(
            WeatherCondition::from_wmo_code(53),
            WeatherCondition::Drizzle
        );
        assert_eq!(WeatherCondition::from_wmo_code(61), WeatherCondition::Rain);
        assert_eq!(
            WeatherCondition::from_wmo_code(65),
            WeatherCondition::HeavyRain
        );
        assert_eq!(
            WeatherCondition::from_wmo_code(80),
            WeatherCondition::Showers
        );
        assert_eq!(
            WeatherCondition::from_wmo_code(82),
            WeatherCondition::HeavyRain
        );
    }

    #[test]
    fn test_wmo_code_unknown_maps_to_unknown() {
        assert_eq!(
            WeatherCondition::from_wmo_code(999),
            WeatherCondition::Unknown
        );
        assert_eq!(
            WeatherCondition::from_wmo_code(-1),
            WeatherCondition::Unknown
        );
        assert_eq!(WeatherCondition::Unknown.description(), "Unknown");
        assert_eq!(WeatherCondition::Unknown.icon(), "question");
    }

    #[test]
    fn test_fahrenheit_rounding_rule() {
        let t = Temperature::from_celsius(21.0);
        assert_eq!(t.fahrenheit, 69.8);

        let t = Temperature::from_celsius(0.0);
        assert_eq!(t.fahrenheit, 32.0);

        let t = Temperature::from_celsius(-40.0);
        assert_eq!(t.fahrenheit, -40.0);
    }

    #[test]
    fn test_fahrenheit_round_trip_within_tenth() {
        for tenths in -400..=500 {
            let c = f64::from(tenths) / 10.0;
            let f = Temperature::from_celsius(c).fahrenheit;
            let back = (f - 32.0) * 5.0 / 9.0;
            assert!(
                (back - c).abs() <= 0.1,
                "round trip drifted for {}: got {}",
                c,
                back
            );
        }
    }

    #[test]
    fn test_wind_speed_mph_derivation() {
        let w = WindSpeed::from_kmh(16.09344);
        assert_eq!(w.mph, 10.0);
    }

    #[test]
    fn test_units_selection() {
        let t = Temperature::from_celsius(10.0);
        assert_eq!(t.in_units(Units::Metric), 10.0);
        assert_eq!(t.in_units(Units::Imperial), 50.0);
    }

    #[test]
    fn test_rain_chance_volume_breakpoints() {
        let none = WeatherCondition::Clear;
        assert_eq!(rain_chance(0.0, none), 10);
        assert_eq!(rain_chance(0.3, none), 25);
        assert_eq!(rain_chance(0.7, none), 40);
        assert_eq!(rain_chance(2.0, none), 55);
        assert_eq!(rain_chance(4.0, none), 75);
        assert_eq!(rain_chance(5.0, none), 95);
        assert_eq!(rain_chance(12.0, none), 95);
    }

    #[test]
    fn test_rain_chance_takes_condition_class_maximum() {
        // Dry volume but a thunderstorm code: class estimate wins
        assert_eq!(rain_chance(0.0, WeatherCondition::Thunderstorm), 90);
        // Heavy volume beats a drizzle class estimate
        assert_eq!(rain_chance(6.0, WeatherCondition::Drizzle), 95);
    }

    #[test]
    fn test_coordinate_id_precision() {
        let c = Coordinate {
            latitude: 51.50741,
            longitude: -0.12784,
        };
        assert_eq!(c.id(), "51.5074,-0.1278");
    }

    #[test]
    fn test_location_placeholder() {
        let loc = Location::from_coordinate(Coordinate {
            latitude: 1.0,
            longitude: 2.0,
        });
        assert!(loc.is_placeholder());
        assert_eq!(loc.country, "");
    }

    #[test]
    fn test_alert_urgency_is_case_insensitive() {
        let mut alert = WeatherAlert {
            id: "1".to_string(),
            event: "Storm".to_string(),
            severity: "Severe".to_string(),
            headline: String::new(),
            description: String::new(),
            expires: None,
        };
        assert!(alert.is_urgent());

        alert.severity = "EXTREME".to_string();
        assert!(alert.is_urgent());

        alert.severity = "moderate".to_string();
        assert!(!alert.is_urgent());
    }
}
