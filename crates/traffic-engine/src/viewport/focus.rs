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

//! Resolving a user-supplied focus ("lat,lng" or an IATA code) to a map view.

use super::LatLng;
use crate::catalog::AirportCatalog;

/// Map center before any focus is applied.
pub const DEFAULT_CENTER: LatLng = LatLng::new(20.0, 0.0);
/// Zoom level before any focus is applied.
pub const DEFAULT_ZOOM: f64 = 3.0;

const COORDINATE_ZOOM: f64 = 10.0;
const AIRPORT_ZOOM: f64 = 4.0;

/// Where the map should center, and which airport (if any) is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFocus {
    pub center: LatLng,
    pub zoom: f64,
    pub selected: Option<String>,
}

impl Default for MapFocus {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            selected: None,
        }
    }
}

/// Interpret `query` as a coordinate pair or an IATA code.
///
/// Returns `None` when the query is neither a valid coordinate nor a known airport.
#[must_use]
pub fn resolve_focus(catalog: &AirportCatalog, query: &str) -> Option<MapFocus> {
    let query = query.trim();
    if let Some((lat, lng)) = query.split_once(',') {
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        let center = LatLng::new(lat, lng);
        return center.is_valid().then_some(MapFocus {
            center,
            zoom: COORDINATE_ZOOM,
            selected: None,
        });
    }

    catalog.find_by_iata(query).map(|airport| MapFocus {
        center: airport.position(),
        zoom: AIRPORT_ZOOM,
        selected: Some(airport.ident.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Airport;

    fn catalog() -> AirportCatalog {
        AirportCatalog::new(vec![
            Airport::new("KATL", "Hartsfield-Jackson Atlanta International Airport", 33.6367, -84.4281)
                .with_iata("ATL"),
        ])
    }

    #[test]
    fn test_coordinate_focus() {
        let focus = resolve_focus(&catalog(), "48.85, 2.35").unwrap();
        assert_eq!(focus.center, LatLng::new(48.85, 2.35));
        assert!((focus.zoom - 10.0).abs() < f64::EPSILON);
        assert!(focus.selected.is_none());
    }

    #[test]
    fn test_iata_focus_is_case_insensitive() {
        let focus = resolve_focus(&catalog(), "atl").unwrap();
        assert_eq!(focus.selected.as_deref(), Some("KATL"));
        assert!((focus.zoom - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_focus() {
        assert!(resolve_focus(&catalog(), "ZZZ").is_none());
        assert!(resolve_focus(&catalog(), "95.0,10.0").is_none());
        assert!(resolve_focus(&catalog(), "abc,def").is_none());
    }
}
