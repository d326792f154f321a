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

//! Feed layer: the upstream data contract.
//!
//! The engine never talks to a provider directly. It consumes two traits:
//!
//! - [`TrafficFeed`]: flight-state records for a query window (drives intensity)
//! - [`AirportFeed`]: per-airport departures/arrivals, weather and images
//!
//! [`HttpFeed`] implements both against the proxy backend.

mod http;

pub use http::{HttpFeed, HttpFeedConfig, DEFAULT_FEED_URL};

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::viewport::LatLng;

/// Half-width of the traffic query window around "now".
pub const DEFAULT_HALF_WINDOW_MINUTES: i64 = 30;

/// Errors reported by a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("upstream unavailable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("no data found for {0}")]
    NotFound(String),

    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: &'static str, reason: String },
}

impl FeedError {
    /// True for the "nothing recorded" condition, which callers show as an empty state.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A closed range of Unix timestamps (seconds, UTC) sent with a feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub begin: i64,
    pub end: i64,
}

impl QueryWindow {
    #[must_use]
    pub const fn new(begin: i64, end: i64) -> Self {
        Self { begin, end }
    }

    /// `[now - half_width, now + half_width]`, truncated to whole seconds.
    #[must_use]
    pub fn around(now: DateTime<Utc>, half_width: Duration) -> Self {
        let now = now.timestamp();
        let half = half_width.num_seconds();
        Self {
            begin: now - half,
            end: now + half,
        }
    }

    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        (self.begin..=self.end).contains(&timestamp)
    }

    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        self.end - self.begin
    }
}

/// One flight-state record as delivered by the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    /// Transponder address (hex string).
    #[serde(default)]
    pub icao24: String,

    #[serde(default)]
    pub callsign: Option<String>,

    /// Estimated departure airport; may be a candidate rather than confirmed.
    #[serde(default)]
    pub est_departure_airport: Option<String>,

    /// Estimated arrival airport; may be a candidate rather than confirmed.
    #[serde(default)]
    pub est_arrival_airport: Option<String>,

    #[serde(default, rename = "departureAirportCandidatesCount")]
    pub departure_candidates: u32,

    #[serde(default, rename = "arrivalAirportCandidatesCount")]
    pub arrival_candidates: u32,

    /// Unix seconds.
    #[serde(default)]
    pub first_seen: i64,

    /// Unix seconds.
    #[serde(default)]
    pub last_seen: i64,
}

impl FlightRecord {
    #[must_use]
    pub fn new(icao24: impl Into<String>) -> Self {
        Self {
            icao24: icao24.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn departing(mut self, airport: impl Into<String>) -> Self {
        self.est_departure_airport = Some(airport.into());
        self
    }

    #[must_use]
    pub fn arriving(mut self, airport: impl Into<String>) -> Self {
        self.est_arrival_airport = Some(airport.into());
        self
    }

    #[must_use]
    pub fn with_candidates(mut self, departure: u32, arrival: u32) -> Self {
        self.departure_candidates = departure;
        self.arrival_candidates = arrival;
        self
    }

    #[must_use]
    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = Some(callsign.into());
        self
    }

    #[must_use]
    pub fn seen(mut self, first_seen: i64, last_seen: i64) -> Self {
        self.first_seen = first_seen;
        self.last_seen = last_seen;
        self
    }

    /// Whether `airport` is this record's departure or arrival airport.
    #[must_use]
    pub fn touches(&self, airport: &str) -> bool {
        self.est_departure_airport.as_deref() == Some(airport)
            || self.est_arrival_airport.as_deref() == Some(airport)
    }

    /// Departure plus arrival candidate counts.
    #[must_use]
    pub fn candidate_total(&self) -> u64 {
        u64::from(self.departure_candidates) + u64::from(self.arrival_candidates)
    }

    /// Callsign without the feed's trailing padding.
    #[must_use]
    pub fn display_callsign(&self) -> &str {
        self.callsign.as_deref().map_or("", str::trim)
    }
}

/// Surface wind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    /// Degrees.
    #[serde(default)]
    pub direction: Option<f64>,
    /// Metres per second.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub conditions: Option<String>,
    /// Degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub wind: Wind,
}

/// Source of flight-state records for a time window.
pub trait TrafficFeed: Send + Sync {
    /// Records active in `window`. An empty vector means "no traffic", not an error.
    fn flights(
        &self,
        window: QueryWindow,
    ) -> impl Future<Output = Result<Vec<FlightRecord>, FeedError>> + Send;
}

/// Source of per-airport detail data.
pub trait AirportFeed: Send + Sync {
    /// Flights that departed `airport` within `window`. [`FeedError::NotFound`] when none were recorded.
    fn departures(
        &self,
        airport: &str,
        window: QueryWindow,
    ) -> impl Future<Output = Result<Vec<FlightRecord>, FeedError>> + Send;

    /// Flights that arrived at `airport` within `window`. [`FeedError::NotFound`] when none were recorded.
    fn arrivals(
        &self,
        airport: &str,
        window: QueryWindow,
    ) -> impl Future<Output = Result<Vec<FlightRecord>, FeedError>> + Send;

    fn weather(&self, position: LatLng) -> impl Future<Output = Result<WeatherReport, FeedError>> + Send;

    /// Image URLs for an airport name; empty when the provider has none.
    fn airport_images(&self, name: &str) -> impl Future<Output = Result<Vec<String>, FeedError>> + Send;
}
