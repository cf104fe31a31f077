//! Forward geocoding: resolve free-text place names to coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::error::WeatherError;
use crate::types::{Coordinate, Location};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const RESULT_COUNT: u8 = 10;

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    admin1: Option<String>,
}

impl SearchResult {
    fn into_location(self) -> Location {
        let coordinate = Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        let display_name = match self.admin1.as_deref() {
            Some(region) if !region.is_empty() && region != self.name => {
                format!("{}, {}", self.name, region)
            }
            _ => self.name,
        };
        Location {
            id: coordinate.id(),
            display_name,
            country: self.country.unwrap_or_default(),
            coordinate,
        }
    }
}

impl GeocodeClient {
    pub fn new(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a query to a single location.
    ///
    /// A numeric `"lat,lon"` literal resolves directly without a network
    /// call; anything else goes through the search endpoint and the first
    /// result wins (provider relevance order is trusted as-is). No retry;
    /// failures surface immediately.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Location, WeatherError> {
        if let Some(coordinate) = parse_coordinate_literal(query) {
            tracing::debug!("Query parsed as coordinates, skipping lookup");
            return Ok(Location::from_coordinate(coordinate));
        }

        let mut results = self.search(query).await?;
        if results.is_empty() {
            return Err(WeatherError::NotFound);
        }
        Ok(results.remove(0))
    }

    /// Search for locations matching a query, in provider relevance order.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<Location>, WeatherError> {
        let url = format!(
            "{}?name={}&count={}&language=en&format=json",
            self.base_url,
            urlencoding::encode(query),
            RESULT_COUNT,
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("geocode response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .map(SearchResult::into_location)
            .collect())
    }
}

/// Parse a `"lat,lon"` literal: optional sign, decimal fraction, optional
/// whitespace around the comma. Values outside the valid coordinate range
/// are treated as a place name, not a coordinate pair.
fn parse_coordinate_literal(query: &str) -> Option<Coordinate> {
    let (lat, lon) = query.split_once(',')?;
    let latitude: f64 = lat.trim().parse().ok()?;
    let longitude: f64 = lon.trim().parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return None;
    }
    Some(Coordinate {
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_coordinate_literal_plain() {
        let c = parse_coordinate_literal("51.5074,-0.1278").unwrap();
        assert_eq!(c.latitude, 51.5074);
        assert_eq!(c.longitude, -0.1278);
    }

    #[test]
    fn test_coordinate_literal_whitespace_and_signs() {
        let c = parse_coordinate_literal(" -33.8688 , +151.2093 ").unwrap();
        assert_eq!(c.latitude, -33.8688);
        assert_eq!(c.longitude, 151.2093);
    }

    #[test]
    fn test_coordinate_literal_integers() {
        let c = parse_coordinate_literal("51,0").unwrap();
        assert_eq!(c.latitude, 51.0);
        assert_eq!(c.longitude, 0.0);
    }

    #[test]
    fn test_place_names_are_not_literals() {
        assert!(parse_coordinate_literal("London").is_none());
        assert!(parse_coordinate_literal("Paris, France").is_none());
        assert!(parse_coordinate_literal("51.5074").is_none());
    }

    #[test]
    fn test_out_of_range_is_not_a_literal() {
        assert!(parse_coordinate_literal("91.0,0.0").is_none());
        assert!(parse_coordinate_literal("0.0,181.0").is_none());
        assert!(parse_coordinate_literal("nan,0.0").is_none());
    }

    #[tokio::test]
    async fn test_resolve_literal_never_touches_network() {
        // Port 9 is discard; any attempt to connect would error out
        let client = GeocodeClient::new("http://127.0.0.1:9").unwrap();
        let location = client.resolve("51.5074,-0.1278").await.unwrap();
        assert_eq!(location.coordinate.latitude, 51.5074);
        assert_eq!(location.coordinate.longitude, -0.1278);
        assert!(location.is_placeholder());
    }
}
