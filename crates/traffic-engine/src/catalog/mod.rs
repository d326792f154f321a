// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Static airport reference catalog.
//!
//! The catalog is built once from OurAirports-shaped rows and is read-only
//! afterwards. Only large airports with valid coordinates are admitted; every
//! other row is skipped individually without failing the load.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::viewport::LatLng;

/// OurAirports type tag of the airports shown on the map.
pub const LARGE_AIRPORT: &str = "large_airport";

/// Minimum query length before [`AirportCatalog::search`] returns matches.
pub const MIN_SEARCH_LEN: usize = 3;

/// Reasons a reference row is kept out of the catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("airport {0} has no coordinates")]
    MissingCoordinates(String),

    #[error("airport {ident} has coordinates out of range: ({latitude}, {longitude})")]
    OutOfRange {
        ident: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("airport {ident} is a {airport_type}, not a large airport")]
    NotLargeAirport { ident: String, airport_type: String },

    #[error("row has an empty ident")]
    MissingIdent,
}

/// One row of the airport reference table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirportRecord {
    pub ident: String,

    #[serde(rename = "type")]
    pub airport_type: String,

    pub name: String,

    #[serde(rename = "latitude_deg", default)]
    pub latitude: Option<f64>,

    #[serde(rename = "longitude_deg", default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub elevation_ft: Option<i32>,

    #[serde(default)]
    pub iso_country: String,

    #[serde(default)]
    pub iata_code: Option<String>,

    #[serde(default)]
    pub gps_code: Option<String>,
}

/// A large airport with known coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    /// ICAO-style identifier, unique within the catalog.
    pub ident: String,
    pub name: String,
    pub iata_code: Option<String>,
    pub gps_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_ft: Option<i32>,
    pub iso_country: String,
}

impl Airport {
    /// Create an airport with only the required fields set.
    #[must_use]
    pub fn new(ident: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            iata_code: None,
            gps_code: None,
            latitude,
            longitude,
            elevation_ft: None,
            iso_country: String::new(),
        }
    }

    #[must_use]
    pub fn with_iata(mut self, code: impl Into<String>) -> Self {
        self.iata_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_gps_code(mut self, code: impl Into<String>) -> Self {
        self.gps_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, iso_country: impl Into<String>) -> Self {
        self.iso_country = iso_country.into();
        self
    }

    #[must_use]
    pub fn with_elevation(mut self, elevation_ft: i32) -> Self {
        self.elevation_ft = Some(elevation_ft);
        self
    }

    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// "IATA/GPS" label used in marker tooltips.
    #[must_use]
    pub fn code_label(&self) -> String {
        format!(
            "{}/{}",
            self.iata_code.as_deref().unwrap_or("-"),
            self.gps_code.as_deref().unwrap_or("-")
        )
    }

    fn matches(&self, needle: &str) -> bool {
        let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));
        contains(Some(self.name.as_str())) || contains(self.iata_code.as_deref()) || contains(self.gps_code.as_deref())
    }
}

impl TryFrom<AirportRecord> for Airport {
    type Error = CatalogError;

    fn try_from(record: AirportRecord) -> Result<Self, Self::Error> {
        let ident = record.ident.trim().to_string();
        if ident.is_empty() {
            return Err(CatalogError::MissingIdent);
        }
        if record.airport_type != LARGE_AIRPORT {
            return Err(CatalogError::NotLargeAirport {
                ident,
                airport_type: record.airport_type,
            });
        }
        let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
            return Err(CatalogError::MissingCoordinates(ident));
        };
        if !LatLng::new(latitude, longitude).is_valid() {
            return Err(CatalogError::OutOfRange {
                ident,
                latitude,
                longitude,
            });
        }

        let non_empty = |code: Option<String>| code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        Ok(Self {
            ident,
            name: record.name,
            iata_code: non_empty(record.iata_code),
            gps_code: non_empty(record.gps_code),
            latitude,
            longitude,
            elevation_ft: record.elevation_ft,
            iso_country: record.iso_country,
        })
    }
}

/// Read-only airport table keyed by ident.
#[derive(Debug, Clone, Default)]
pub struct AirportCatalog {
    airports: Vec<Airport>,
    by_ident: HashMap<String, usize>,
}

impl AirportCatalog {
    /// Build a catalog from validated airports. The first entry wins on duplicate idents.
    #[must_use]
    pub fn new(airports: Vec<Airport>) -> Self {
        let mut catalog = Self::default();
        for airport in airports {
            catalog.insert(airport);
        }
        catalog
    }

    /// Build a catalog from raw reference rows, skipping every row that does not qualify.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AirportRecord>,
    {
        let mut catalog = Self::default();
        let mut other_types = 0usize;
        let mut rejected = 0usize;

        for record in records {
            match Airport::try_from(record) {
                Ok(airport) => catalog.insert(airport),
                Err(CatalogError::NotLargeAirport { .. }) => other_types += 1,
                Err(e) => {
                    debug!("Skipping airport row: {}", e);
                    rejected += 1;
                }
            }
        }

        info!(
            "Loaded {} large airports ({} other types, {} invalid rows skipped)",
            catalog.len(),
            other_types,
            rejected
        );
        catalog
    }

    fn insert(&mut self, airport: Airport) {
        if self.by_ident.contains_key(&airport.ident) {
            warn!("Duplicate airport ident {}, keeping first entry", airport.ident);
            return;
        }
        self.by_ident.insert(airport.ident.clone(), self.airports.len());
        self.airports.push(airport);
    }

    #[must_use]
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Look up an airport by its ICAO-style ident.
    #[must_use]
    pub fn get(&self, ident: &str) -> Option<&Airport> {
        self.by_ident.get(ident).map(|&i| &self.airports[i])
    }

    /// Case-insensitive IATA lookup.
    #[must_use]
    pub fn find_by_iata(&self, code: &str) -> Option<&Airport> {
        self.airports
            .iter()
            .find(|a| a.iata_code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code)))
    }

    /// Resolve an ident first, then an IATA code.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<&Airport> {
        self.get(&code.to_uppercase()).or_else(|| self.find_by_iata(code))
    }

    /// Airports whose name, IATA code or GPS code contains `query` (case-insensitive).
    ///
    /// Queries shorter than [`MIN_SEARCH_LEN`] characters match nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Airport> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        self.airports.iter().filter(|a| a.matches(&needle)).collect()
    }
}
