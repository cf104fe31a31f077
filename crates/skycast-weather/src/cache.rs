//! Forecast cache: an in-memory map mirrored to disk.
//!
//! Entries are whole-payload replacements keyed by rounded coordinates and
//! horizon. `get` never filters by age; freshness is the caller's check via
//! `CacheEntry::is_fresh`. Every `put` mirrors the entry to a JSON file
//! carrying the cache namespace prefix, and the mirror is hydrated once at
//! construction.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WeatherError;
use crate::types::{Coordinate, NormalizedForecast};

/// File name prefix for mirrored entries; bulk clear matches on it.
const CACHE_FILE_PREFIX: &str = "forecast_cache_";

/// Deterministic cache key: coordinates rounded to 3 decimals (about 110 m,
/// deduplicating near-identical lookups) plus the forecast horizon.
pub fn cache_key(coordinate: Coordinate, horizon_days: u8) -> String {
    format!(
        "{:.3},{:.3}:{}",
        coordinate.latitude, coordinate.longitude, horizon_days
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: NormalizedForecast,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// True while `now - fetched_at < ttl`, evaluated at read time.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        match age.to_std() {
            Ok(age) => age < ttl,
            // A future timestamp (clock skew) counts as fresh
            Err(_) => true,
        }
    }
}

/// On-disk form; the key travels inside the file because file names are
/// sanitized and cannot round-trip it.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    payload: NormalizedForecast,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ForecastCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    dir: PathBuf,
}

impl ForecastCache {
    /// Create a cache rooted at `dir`, hydrating any mirrored entries.
    /// Mirror failures degrade to memory-only operation.
    pub fn new(dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!("Failed to create cache directory {}: {}", dir.display(), e);
        }

        let mut entries = HashMap::new();
        match std::fs::read_dir(dir) {
            Ok(listing) => {
                for entry in listing.flatten() {
                    let path = entry.path();
                    if !is_mirror_file(&path) {
                        continue;
                    }
                    match read_mirror_file(&path) {
                        Ok(persisted) => {
                            entries.insert(
                                persisted.key,
                                CacheEntry {
                                    payload: persisted.payload,
                                    fetched_at: persisted.fetched_at,
                                },
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Skipping unreadable cache file {}: {}",
                                path.display(),
                                e
                            );
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read cache directory {}: {}", dir.display(), e);
            }
        }

        if !entries.is_empty() {
            tracing::info!("Hydrated {} cached forecast(s) from disk", entries.len());
        }

        Self {
            entries: Mutex::new(entries),
            dir: dir.to_path_buf(),
        }
    }

    /// Get the stored entry regardless of age; staleness is the caller's
    /// responsibility to check.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    /// Store a payload under `key`, stamped now. Whole-entry replacement.
    pub fn put(&self, key: &str, payload: NormalizedForecast) {
        self.put_entry(
            key,
            CacheEntry {
                payload,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Store a pre-stamped entry (restores and tests).
    pub fn put_entry(&self, key: &str, entry: CacheEntry) {
        self.entries.lock().insert(key.to_string(), entry.clone());

        let persisted = PersistedEntry {
            key: key.to_string(),
            payload: entry.payload,
            fetched_at: entry.fetched_at,
        };
        match serde_json::to_string(&persisted) {
            Ok(contents) => {
                let path = self.dir.join(file_name_for(key));
                if let Err(e) = std::fs::write(&path, contents) {
                    tracing::warn!("Failed to mirror cache entry {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
            }
        }
    }

    /// Number of in-memory entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Empty the in-memory map and delete every mirrored file carrying the
    /// cache namespace prefix. Files outside the namespace are untouched.
    pub fn clear(&self) -> Result<(), WeatherError> {
        self.entries.lock().clear();

        let listing = std::fs::read_dir(&self.dir)
            .map_err(|e| WeatherError::Cache(format!("read cache dir: {}", e)))?;

        let mut failures = Vec::new();
        for entry in listing.flatten() {
            let path = entry.path();
            if !is_mirror_file(&path) {
                continue;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                failures.push(format!("{}: {}", path.display(), e));
            }
        }

        if failures.is_empty() {
            tracing::info!("Cleared forecast cache");
            Ok(())
        } else {
            Err(WeatherError::Cache(format!(
                "failed to remove {}",
                failures.join(", ")
            )))
        }
    }
}

fn is_mirror_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(CACHE_FILE_PREFIX) && n.ends_with(".json"))
}

fn read_mirror_file(path: &Path) -> Result<PersistedEntry, WeatherError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| WeatherError::Cache(format!("read: {}", e)))?;
    serde_json::from_str(&contents).map_err(|e| WeatherError::Cache(format!("parse: {}", e)))
}

/// Keys may contain characters that are unsafe in file names; anything
/// outside a conservative set becomes `_`. Collisions are acceptable
/// because the authoritative key is stored inside the file.
fn file_name_for(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}.json", CACHE_FILE_PREFIX, sanitized)
}
