//! Weather engine error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("No matching location found")]
    NotFound,

    #[error("Upstream error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Rate limited by the weather service")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "Location not found. Please check the location name.",
            Self::Upstream { .. } => "The weather service request failed. Please try again.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::Parse(_) => "Received an unexpected response from the weather service.",
            Self::Cache(_) => "Local cache error.",
        }
    }

    /// Whether the retry wrapper may re-attempt after backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        assert!(WeatherError::NotFound.user_message().contains("not found"));
        assert!(WeatherError::RateLimited
            .user_message()
            .contains("try again later"));

        let err = WeatherError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.user_message().contains("try again"));
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(WeatherError::RateLimited.is_rate_limited());
        assert!(!WeatherError::NotFound.is_rate_limited());
        assert!(!WeatherError::Upstream {
            status: 500,
            message: String::new()
        }
        .is_rate_limited());
    }
}
