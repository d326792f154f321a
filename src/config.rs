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

//! Application configuration management.
//!
//! Persistent configuration is stored in TOML format through `confy`. Every
//! field has a serde default so older or hand-edited files keep loading.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use traffic_engine::feed::DEFAULT_FEED_URL;
use traffic_engine::{HttpFeedConfig, IntensityThresholds, LatLng, SchedulerConfig, ViewportBounds};

const APP_NAME: &str = "airtraffic-map";
const CONFIG_NAME: &str = "config";

/// Environment variable that overrides the configured feed URL.
pub const FEED_URL_ENV: &str = "AIRTRAFFIC_FEED_URL";

/// Initial map view used before the user moves the map
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ViewportConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default)]
    pub center_lng: f64,

    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Map area size in pixels, used to derive bounds from center and zoom
    #[serde(default = "default_width_px")]
    pub width_px: u32,

    #[serde(default = "default_height_px")]
    pub height_px: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: 0.0,
            zoom: default_zoom(),
            width_px: default_width_px(),
            height_px: default_height_px(),
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Traffic proxy base URL (env var takes precedence)
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Per-request timeout for the feed
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Automatic traffic refresh period
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Quiet period after the last map move before filtering
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Traffic window is now +/- this many minutes
    #[serde(default = "default_traffic_half_window_minutes")]
    pub traffic_half_window_minutes: i64,

    /// Intensity tier upper bounds
    #[serde(default)]
    pub thresholds: IntensityThresholds,

    /// Directory holding airports.csv (defaults to the platform data dir)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub initial_viewport: ViewportConfig,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_traffic_half_window_minutes() -> i64 {
    30
}

fn default_center_lat() -> f64 {
    20.0
}

fn default_zoom() -> f64 {
    3.0
}

fn default_width_px() -> u32 {
    1280
}

fn default_height_px() -> u32 {
    800
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            feed_url: default_feed_url(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            debounce_ms: default_debounce_ms(),
            traffic_half_window_minutes: default_traffic_half_window_minutes(),
            thresholds: IntensityThresholds::default(),
            data_dir: None,
            initial_viewport: ViewportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults when missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Feed URL from the environment variable, falling back to the config file
    #[must_use]
    pub fn resolve_feed_url(&self) -> String {
        resolve_feed_url(std::env::var(FEED_URL_ENV).ok().as_deref(), &self.feed_url)
    }

    /// Where the feed URL came from, for display
    #[must_use]
    pub fn feed_url_source() -> &'static str {
        if std::env::var(FEED_URL_ENV).is_ok_and(|v| !v.is_empty()) {
            "environment variable"
        } else {
            "config file"
        }
    }

    #[must_use]
    pub fn feed_config(&self) -> HttpFeedConfig {
        HttpFeedConfig {
            base_url: self.resolve_feed_url(),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs.max(1)),
            traffic_half_window: chrono::Duration::minutes(self.traffic_half_window_minutes.max(1)),
        }
    }

    /// Configured thresholds, or the defaults when they are not strictly increasing
    #[must_use]
    pub fn thresholds(&self) -> IntensityThresholds {
        if self.thresholds.is_ordered() {
            self.thresholds
        } else {
            warn!(
                "Ignoring unordered intensity thresholds {:?}, using defaults",
                self.thresholds
            );
            IntensityThresholds::default()
        }
    }

    /// Directory for the airport reference table
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
        })
    }

    /// Bounds of the initial map view, or the whole map when the view is invalid
    #[must_use]
    pub fn initial_bounds(&self) -> ViewportBounds {
        let view = &self.initial_viewport;
        ViewportBounds::from_center_zoom(
            LatLng::new(view.center_lat, view.center_lng),
            view.zoom,
            view.width_px,
            view.height_px,
        )
        .unwrap_or_else(|e| {
            warn!("Invalid initial viewport ({}), showing the whole map", e);
            ViewportBounds::world()
        })
    }
}

fn resolve_feed_url(env_value: Option<&str>, config_value: &str) -> String {
    match env_value {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => config_value.to_string(),
    }
}
