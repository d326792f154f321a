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

//! Airport traffic intensity engine.
//!
//! This library keeps an airport map's visible set and traffic intensity up to
//! date as the viewport and the traffic feed change. Its layers can be used
//! independently or composed through the scheduler:
//!
//! - **Catalog layer**: the static airport table, search and code lookup
//! - **Viewport layer**: bounds, the containment filter and map focus resolution
//! - **Feed layer**: the upstream data traits and an HTTP implementation
//! - **Intensity layer**: single-pass score aggregation and tier classification
//! - **Window layer**: local-day query windows and hourly activity histograms
//! - **Scheduler**: debounced viewport recompute and periodic traffic refresh
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use traffic_engine::{
//!     AirportCatalog, HttpFeed, HttpFeedConfig, IntensityThresholds, LatLng, RecomputeScheduler,
//!     SchedulerConfig, ViewportBounds,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(AirportCatalog::new(Vec::new()));
//!     let feed = Arc::new(HttpFeed::new(HttpFeedConfig::default())?);
//!     let scheduler = RecomputeScheduler::spawn(SchedulerConfig::default(), catalog, feed);
//!
//!     scheduler.viewport_changed(ViewportBounds::new(
//!         LatLng::new(30.0, -90.0),
//!         LatLng::new(35.0, -80.0),
//!     )?);
//!
//!     let mut visible = scheduler.subscribe_visible();
//!     visible.changed().await?;
//!     for marker in scheduler.frame(&IntensityThresholds::default()).circles() {
//!         println!("{} {}", marker.airport.ident, marker.tier);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ## Intensity Only
//!
//! ```
//! use traffic_engine::intensity::{aggregate, classify, Tier};
//! use traffic_engine::FlightRecord;
//!
//! let records = vec![FlightRecord::new("a0b1c2")
//!     .departing("KATL")
//!     .arriving("KJFK")
//!     .with_candidates(3, 2)];
//!
//! assert_eq!(aggregate(&records, "KATL"), 5);
//! assert_eq!(classify(5), Tier::Green);
//! ```
//!
//! ## Viewport Only
//!
//! ```
//! use traffic_engine::viewport::{filter_visible, LatLng, ViewportBounds};
//! use traffic_engine::Airport;
//!
//! let airports = vec![Airport::new("KATL", "Atlanta", 33.64, -84.43)];
//! let bounds = ViewportBounds::new(LatLng::new(30.0, -90.0), LatLng::new(35.0, -80.0)).unwrap();
//! assert_eq!(filter_visible(&airports, &bounds).len(), 1);
//! ```

pub mod catalog;
pub mod feed;
pub mod frame;
pub mod intensity;
pub mod scheduler;
pub mod viewport;
pub mod window;

pub use catalog::{Airport, AirportCatalog, AirportRecord, CatalogError};
pub use feed::{
    AirportFeed, FeedError, FlightRecord, HttpFeed, HttpFeedConfig, QueryWindow, TrafficFeed, WeatherReport, Wind,
};
pub use frame::{AirportMarker, MapFrame};
pub use intensity::{IntensityMap, IntensitySnapshot, IntensityThresholds, LegendEntry, Tier};
pub use scheduler::{RecomputeScheduler, RefreshStatus, SchedulerConfig};
pub use viewport::{BoundsError, LatLng, MapFocus, ViewportBounds, VisibleSet};
pub use window::{
    local_day_window, ActivityError, ActivityKind, ActivityReport, DayWindow, FixedTimezone, HourlyHistogram,
    TimezoneResolver, TzfResolver, WindowError,
};
