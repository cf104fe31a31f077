//! Saved-location list with JSON persistence.
//!
//! The list lives in one JSON file and is rewritten wholesale on every
//! mutation. Saved ids carry a creation-timestamp suffix so repeated saves
//! of the same place stay distinct.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::types::Location;

const STORE_FILE: &str = "saved_locations.json";

#[derive(Debug)]
pub struct SavedLocationStore {
    path: PathBuf,
    locations: Vec<Location>,
}

impl SavedLocationStore {
    /// Open the store under `dir`, loading any persisted list.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(STORE_FILE);
        let locations = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read saved locations")?;
            serde_json::from_str(&contents).context("Failed to parse saved locations")?
        } else {
            Vec::new()
        };

        Ok(Self { path, locations })
    }

    /// Save a location and return the stored id.
    pub fn add(&mut self, mut location: Location) -> Result<String> {
        location.id = format!("{}-{}", location.id, Utc::now().timestamp_millis());
        let id = location.id.clone();
        self.locations.push(location);
        self.persist()?;
        Ok(id)
    }

    /// Remove a saved location by id; returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.locations.len();
        self.locations.retain(|l| l.id != id);
        let removed = self.locations.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Saved locations in insertion order.
    pub fn list(&self) -> &[Location] {
        &self.locations
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }
        let contents = serde_json::to_string_pretty(&self.locations)
            .context("Failed to serialize saved locations")?;
        std::fs::write(&self.path, contents).context("Failed to write saved locations")?;
        Ok(())
    }
}
