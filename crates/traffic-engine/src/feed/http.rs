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

//! HTTP feed against the traffic proxy backend.
//!
//! Endpoints (relative to the configured base URL):
//!
//! ```text
//! GET air-traffic?begin=<epoch>&end=<epoch>
//! GET departures?airport=<ICAO>&begin=<epoch>&end=<epoch>
//! GET arrivals?airport=<ICAO>&begin=<epoch>&end=<epoch>
//! GET current-weather?latitude=<deg>&longitude=<deg>
//! GET airport-images?name=<airport name>
//! ```
//!
//! `air-traffic`, `current-weather` and `airport-images` are the routes of the
//! stock proxy backend. `departures` and `arrivals` pass through to the
//! upstream flights API and must be provided by the proxy as well.
//!
//! A 404 is only treated as "nothing there" for the per-airport endpoints
//! and for images. On `air-traffic` it is an error like any other status.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AirportFeed, FeedError, FlightRecord, QueryWindow, TrafficFeed, WeatherReport};
use crate::viewport::LatLng;

/// Default proxy backend address.
pub const DEFAULT_FEED_URL: &str = "http://localhost:3001/api";

/// Configuration for [`HttpFeed`].
#[derive(Debug, Clone)]
pub struct HttpFeedConfig {
    /// Base URL the endpoint paths are appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpFeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Feed backed by the proxy's JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(config: HttpFeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
        subject: &str,
    ) -> Result<T, FeedError> {
        let url = self.url(endpoint);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FeedError::Malformed {
            endpoint,
            reason: e.to_string(),
        })
    }

    async fn airport_flights(
        &self,
        endpoint: &'static str,
        airport: &str,
        window: QueryWindow,
    ) -> Result<Vec<FlightRecord>, FeedError> {
        let query = [
            ("airport", airport.to_string()),
            ("begin", window.begin.to_string()),
            ("end", window.end.to_string()),
        ];
        self.get_json(endpoint, &query, airport).await
    }
}

impl TrafficFeed for HttpFeed {
    async fn flights(&self, window: QueryWindow) -> Result<Vec<FlightRecord>, FeedError> {
        let query = [
            ("begin", window.begin.to_string()),
            ("end", window.end.to_string()),
        ];
        self.get_json("air-traffic", &query, "flight window").await
    }
}

impl AirportFeed for HttpFeed {
    async fn departures(&self, airport: &str, window: QueryWindow) -> Result<Vec<FlightRecord>, FeedError> {
        self.airport_flights("departures", airport, window).await
    }

    async fn arrivals(&self, airport: &str, window: QueryWindow) -> Result<Vec<FlightRecord>, FeedError> {
        self.airport_flights("arrivals", airport, window).await
    }

    async fn weather(&self, position: LatLng) -> Result<WeatherReport, FeedError> {
        let query = [
            ("latitude", position.lat.to_string()),
            ("longitude", position.lng.to_string()),
        ];
        let subject = format!("weather at ({}, {})", position.lat, position.lng);
        self.get_json("current-weather", &query, &subject).await
    }

    async fn airport_images(&self, name: &str) -> Result<Vec<String>, FeedError> {
        let query = [("name", name.to_string())];
        match self.get_json::<ImagesResponse>("airport-images", &query, name).await {
            Ok(response) => Ok(response.images),
            Err(FeedError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
