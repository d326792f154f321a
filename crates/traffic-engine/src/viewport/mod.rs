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

//! Viewport geometry and visible-airport filtering.
//!
//! A [`ViewportBounds`] is the geographic rectangle currently shown on the map.
//! [`filter_visible`] selects the catalog entries inside it, and [`VisibleSet`]
//! is the snapshot the scheduler publishes after each debounced recompute.
//!
//! Longitude wraparound at the antimeridian is not handled: a rectangle whose
//! south-west longitude is east of its north-east longitude contains nothing.

mod focus;

pub use focus::{resolve_focus, MapFocus, DEFAULT_CENTER, DEFAULT_ZOOM};

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Airport, AirportCatalog};

/// Web Mercator tile edge in pixels.
const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the Web Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within [-90, 90] x [-180, 180].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Errors raised when constructing viewport bounds.
#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    #[error("south-west latitude {south} lies north of north-east latitude {north}")]
    Inverted { south: f64, north: f64 },

    #[error("viewport corner is not a finite coordinate")]
    NonFinite,
}

/// Geographic rectangle defined by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    south_west: LatLng,
    north_east: LatLng,
}

impl ViewportBounds {
    /// Create bounds, rejecting an inverted latitude range.
    pub fn new(south_west: LatLng, north_east: LatLng) -> Result<Self, BoundsError> {
        let corners = [south_west.lat, south_west.lng, north_east.lat, north_east.lng];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        if south_west.lat > north_east.lat {
            return Err(BoundsError::Inverted {
                south: south_west.lat,
                north: north_east.lat,
            });
        }
        Ok(Self {
            south_west,
            north_east,
        })
    }

    /// Bounds covering the whole globe.
    #[must_use]
    pub const fn world() -> Self {
        Self {
            south_west: LatLng::new(-90.0, -180.0),
            north_east: LatLng::new(90.0, 180.0),
        }
    }

    /// Bounds of a `width_px` x `height_px` map centered on `center` at a slippy-map zoom level.
    pub fn from_center_zoom(center: LatLng, zoom: f64, width_px: u32, height_px: u32) -> Result<Self, BoundsError> {
        if !(center.lat.is_finite() && center.lng.is_finite() && zoom.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        let world_px = TILE_SIZE * 2f64.powf(zoom);
        let (cx, cy) = project(center, world_px);
        let half_w = f64::from(width_px) / 2.0;
        let half_h = f64::from(height_px) / 2.0;

        let south_west = unproject(cx - half_w, cy + half_h, world_px);
        let north_east = unproject(cx + half_w, cy - half_h, world_px);

        Self::new(
            LatLng::new(south_west.lat, south_west.lng.max(-180.0)),
            LatLng::new(north_east.lat, north_east.lng.min(180.0)),
        )
    }

    #[must_use]
    pub fn south_west(&self) -> LatLng {
        self.south_west
    }

    #[must_use]
    pub fn north_east(&self) -> LatLng {
        self.north_east
    }

    /// Inclusive containment on both axes.
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

fn project(point: LatLng, world_px: f64) -> (f64, f64) {
    let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let sin = lat.to_radians().sin();
    let x = (point.lng + 180.0) / 360.0 * world_px;
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)) * world_px;
    (x, y)
}

fn unproject(x: f64, y: f64, world_px: f64) -> LatLng {
    let y = y.clamp(0.0, world_px);
    let lng = x / world_px * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / world_px;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// Airports of `catalog` inside `bounds`, in catalog order.
#[must_use]
pub fn filter_visible(catalog: &[Airport], bounds: &ViewportBounds) -> Vec<Airport> {
    catalog
        .iter()
        .filter(|airport| bounds.contains(airport.position()))
        .cloned()
        .collect()
}

/// Airports visible for one viewport, replaced wholesale on every recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSet {
    /// Incremented on each recompute; 0 is the initial, unfiltered set.
    pub generation: u64,
    pub bounds: ViewportBounds,
    pub airports: Vec<Airport>,
}

impl VisibleSet {
    /// Every catalog airport, as shown before the first viewport event.
    #[must_use]
    pub fn initial(catalog: &AirportCatalog) -> Self {
        Self {
            generation: 0,
            bounds: ViewportBounds::world(),
            airports: catalog.airports().to_vec(),
        }
    }

    #[must_use]
    pub fn compute(catalog: &AirportCatalog, bounds: ViewportBounds, generation: u64) -> Self {
        Self {
            generation,
            bounds,
            airports: filter_visible(catalog.airports(), &bounds),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.airports.iter().any(|a| a.ident == ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(ident: &str, lat: f64, lng: f64) -> Airport {
        Airport::new(ident, ident, lat, lng)
    }

    fn bounds(south: f64, west: f64, north: f64, east: f64) -> ViewportBounds {
        ViewportBounds::new(LatLng::new(south, west), LatLng::new(north, east)).unwrap()
    }

    #[test]
    fn test_atlanta_is_visible() {
        let catalog = vec![airport("KATL", 33.64, -84.43)];
        let visible = filter_visible(&catalog, &bounds(30.0, -90.0, 35.0, -80.0));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].ident, "KATL");
    }

    #[test]
    fn test_containment_matches_rule() {
        let catalog: Vec<Airport> = (-8..=8)
            .flat_map(|i| (-17..=17).map(move |j| (i, j)))
            .map(|(i, j)| airport(&format!("A{i}_{j}"), f64::from(i) * 10.0, f64::from(j) * 10.0))
            .collect();
        let b = bounds(-25.0, -40.0, 30.0, 70.0);

        let visible = filter_visible(&catalog, &b);
        for a in &catalog {
            let inside = a.latitude >= -25.0
                && a.latitude <= 30.0
                && a.longitude >= -40.0
                && a.longitude <= 70.0;
            assert_eq!(visible.contains(a), inside, "{}", a.ident);
        }
    }

    #[test]
    fn test_edges_are_inclusive() {
        let catalog = vec![
            airport("SW", 10.0, 20.0),
            airport("NE", 11.0, 21.0),
            airport("OUT", 11.000_001, 20.5),
        ];
        let visible = filter_visible(&catalog, &bounds(10.0, 20.0, 11.0, 21.0));
        let idents: Vec<_> = visible.iter().map(|a| a.ident.as_str()).collect();
        assert_eq!(idents, vec!["SW", "NE"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let catalog = vec![airport("KATL", 33.64, -84.43), airport("EGLL", 51.47, -0.45)];
        let b = bounds(30.0, -90.0, 55.0, 10.0);
        assert_eq!(filter_visible(&catalog, &b), filter_visible(&catalog, &b));
    }

    #[test]
    fn test_inverted_latitude_rejected() {
        let err = ViewportBounds::new(LatLng::new(40.0, 0.0), LatLng::new(30.0, 10.0)).unwrap_err();
        assert_eq!(err, BoundsError::Inverted { south: 40.0, north: 30.0 });
        assert_eq!(
            ViewportBounds::new(LatLng::new(f64::NAN, 0.0), LatLng::new(30.0, 10.0)),
            Err(BoundsError::NonFinite)
        );
    }

    #[test]
    fn test_antimeridian_span_contains_nothing() {
        let catalog = vec![airport("NZAA", -37.0, 174.8), airport("PHNL", 21.3, -157.9)];
        let b = bounds(-50.0, 170.0, 30.0, -150.0);
        assert!(filter_visible(&catalog, &b).is_empty());
    }

    #[test]
    fn test_center_zoom_bounds_surround_center() {
        let center = LatLng::new(33.64, -84.43);
        let b = ViewportBounds::from_center_zoom(center, 10.0, 1024, 768).unwrap();
        assert!(b.contains(center));
        assert!(b.south_west().lat < b.north_east().lat);
        // About 1.4 degrees of longitude fit in 1024px at zoom 10
        let span = b.north_east().lng - b.south_west().lng;
        assert!((span - 1.406).abs() < 0.01, "span {span}");
    }

    #[test]
    fn test_world_zoom_clamps_longitude() {
        let b = ViewportBounds::from_center_zoom(LatLng::new(20.0, 0.0), 1.0, 4096, 4096).unwrap();
        assert!((b.south_west().lng + 180.0).abs() < f64::EPSILON);
        assert!((b.north_east().lng - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_center_zoom_rejects_non_finite_input() {
        let nan_center = ViewportBounds::from_center_zoom(LatLng::new(f64::NAN, 0.0), 3.0, 1280, 800);
        assert_eq!(nan_center, Err(BoundsError::NonFinite));
        let inf_zoom = ViewportBounds::from_center_zoom(LatLng::new(20.0, 0.0), f64::INFINITY, 1280, 800);
        assert_eq!(inf_zoom, Err(BoundsError::NonFinite));
    }
}
