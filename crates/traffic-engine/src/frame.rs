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

//! Render-time join of the visible set with the latest intensity snapshot.

use crate::catalog::Airport;
use crate::intensity::{IntensitySnapshot, IntensityThresholds, Tier};
use crate::viewport::{ViewportBounds, VisibleSet};

/// One airport marker and its intensity circle.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportMarker {
    pub airport: Airport,
    pub score: u64,
    pub tier: Tier,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    pub bounds: ViewportBounds,
    pub visible_generation: u64,
    pub intensity_generation: u64,
    pub markers: Vec<AirportMarker>,
}

impl MapFrame {
    /// Markers follow the visible set's order. Airports absent from the snapshot score 0.
    #[must_use]
    pub fn compose(visible: &VisibleSet, intensity: &IntensitySnapshot, thresholds: &IntensityThresholds) -> Self {
        let markers = visible
            .airports
            .iter()
            .map(|airport| {
                let score = intensity.score(&airport.ident);
                AirportMarker {
                    airport: airport.clone(),
                    score,
                    tier: thresholds.classify(score),
                }
            })
            .collect();

        Self {
            bounds: visible.bounds,
            visible_generation: visible.generation,
            intensity_generation: intensity.generation,
            markers,
        }
    }

    /// Markers that get an intensity circle.
    pub fn circles(&self) -> impl Iterator<Item = &AirportMarker> {
        self.markers.iter().filter(|marker| marker.tier.is_visible())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AirportCatalog;
    use crate::feed::{FlightRecord, QueryWindow};
    use chrono::Utc;

    #[test]
    fn test_compose_joins_scores_and_tiers() {
        let catalog = AirportCatalog::new(vec![
            Airport::new("KATL", "Atlanta", 33.6367, -84.4281),
            Airport::new("KJFK", "New York JFK", 40.6398, -73.7789),
            Airport::new("KLAX", "Los Angeles", 33.9425, -118.4081),
        ]);
        let records = vec![
            FlightRecord::new("a").departing("KATL").arriving("KJFK").with_candidates(3, 2),
            FlightRecord::new("b").departing("KATL").with_candidates(4, 0),
        ];
        let snapshot = IntensitySnapshot::from_records(&records, QueryWindow::new(0, 3600), Utc::now(), 1);
        let visible = VisibleSet::initial(&catalog);

        let frame = MapFrame::compose(&visible, &snapshot, &IntensityThresholds::default());
        assert_eq!(frame.len(), 3);

        let tiers: Vec<(&str, u64, Tier)> = frame
            .markers
            .iter()
            .map(|m| (m.airport.ident.as_str(), m.score, m.tier))
            .collect();
        assert_eq!(
            tiers,
            vec![("KATL", 9, Tier::Yellow), ("KJFK", 5, Tier::Green), ("KLAX", 0, Tier::None)]
        );
        assert_eq!(frame.circles().count(), 2);
        assert_eq!(frame.intensity_generation, 1);
    }

    #[test]
    fn test_compose_before_first_refresh_has_no_circles() {
        let catalog = AirportCatalog::new(vec![Airport::new("KATL", "Atlanta", 33.6367, -84.4281)]);
        let frame = MapFrame::compose(
            &VisibleSet::initial(&catalog),
            &IntensitySnapshot::empty(),
            &IntensityThresholds::default(),
        );
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.circles().count(), 0);
    }
}
