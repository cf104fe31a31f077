use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature/display unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Forecast settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Local cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream endpoint settings
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Severe-weather notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Unit system used for display (both systems are always fetched)
    pub units: Units,

    /// Forecast horizon in days
    pub horizon_days: u8,

    /// Query used when none is given on the command line
    pub default_query: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            horizon_days: 7,
            default_query: "London".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Forecast cache time-to-live in minutes; constant for the process
    pub ttl_minutes: u32,

    /// Cache directory; defaults to `<config_dir>/cache` when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Forecast endpoint URL
    pub forecast_url: String,

    /// Geocoding search endpoint URL
    pub geocode_url: String,

    /// Severe-weather warnings endpoint URL
    pub warnings_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            geocode_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            warnings_url: "https://api.open-meteo.com/v1/warnings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether notifications may be prepared at all (permission gate)
    pub enabled: bool,

    /// Current temperature at or above this triggers a heat notification (°C)
    pub heat_threshold_c: f64,

    /// Current temperature at or below this triggers a cold notification (°C)
    pub cold_threshold_c: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            heat_threshold_c: 40.0,
            cold_threshold_c: -10.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
            providers: ProviderConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        if !validation.warnings.is_empty() {
            for warning in &validation.warnings {
                tracing::warn!("Config warning: {}", warning);
            }
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.providers.forecast_url,
            "providers.forecast_url",
            &mut result,
        );
        self.validate_url(
            &self.providers.geocode_url,
            "providers.geocode_url",
            &mut result,
        );
        self.validate_url(
            &self.providers.warnings_url,
            "providers.warnings_url",
            &mut result,
        );

        // Cache TTL bounds the staleness check everywhere
        if self.cache.ttl_minutes == 0 {
            result.add_error("cache.ttl_minutes", "Cache TTL must be greater than 0");
        } else if self.cache.ttl_minutes > 1440 {
            result.add_warning(
                "cache.ttl_minutes",
                "Cache TTL is more than 24 hours; forecasts will be very stale",
            );
        }

        // Open-Meteo serves at most 16 forecast days
        if self.weather.horizon_days == 0 {
            result.add_error(
                "weather.horizon_days",
                "Forecast horizon must be at least 1 day",
            );
        } else if self.weather.horizon_days > 16 {
            result.add_error(
                "weather.horizon_days",
                "Forecast horizon cannot exceed 16 days",
            );
        }

        if self.weather.default_query.trim().is_empty() {
            result.add_warning(
                "weather.default_query",
                "Default query is empty; a query argument will be required",
            );
        }

        if self.notifications.cold_threshold_c >= self.notifications.heat_threshold_c {
            result.add_error(
                "notifications",
                format!(
                    "Cold threshold ({}) must be below heat threshold ({})",
                    self.notifications.cold_threshold_c, self.notifications.heat_threshold_c
                ),
            );
        }

        result
    }

    /// Directory holding the persisted forecast cache mirror
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join("cache"))
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
    }

    #[test]
    fn test_invalid_forecast_url() {
        let mut config = Config::default();
        config.providers.forecast_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "providers.forecast_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.providers.geocode_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_ttl_is_error() {
        let mut config = Config::default();
        config.cache.ttl_minutes = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "cache.ttl_minutes"));
    }

    #[test]
    fn test_horizon_out_of_range() {
        let mut config = Config::default();
        config.weather.horizon_days = 0;
        assert!(!config.validate().is_valid());

        config.weather.horizon_days = 17;
        assert!(!config.validate().is_valid());

        config.weather.horizon_days = 16;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_inverted_thresholds_are_error() {
        let mut config = Config::default();
        config.notifications.cold_threshold_c = 45.0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "notifications"));
    }

    #[test]
    fn test_effective_cache_dir_defaults_under_config_dir() {
        let config = Config::default();
        assert_eq!(
            config.effective_cache_dir(),
            config.config_dir.join("cache")
        );

        let mut config = Config::default();
        config.cache.dir = Some(PathBuf::from("/tmp/skycast-cache"));
        assert_eq!(
            config.effective_cache_dir(),
            PathBuf::from("/tmp/skycast-cache")
        );
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_units_serde_lowercase() {
        let toml_str = "units = \"imperial\"\nhorizon_days = 5\ndefault_query = \"Oslo\"";
        let weather: WeatherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(weather.units, Units::Imperial);
        assert_eq!(weather.horizon_days, 5);
    }
}
