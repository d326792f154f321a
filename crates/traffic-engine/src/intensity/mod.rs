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

//! Traffic intensity aggregation.
//!
//! An airport's intensity score is the sum of departure and arrival candidate
//! counts over every record in the query window that names the airport as its
//! departure or arrival. Scores are not normalised by window length.
//!
//! [`aggregate`] computes one airport's score directly. [`IntensityMap`] builds
//! every score in a single pass over the records and is what the scheduler
//! publishes; both always agree.

mod classifier;

pub use classifier::{classify, IntensityThresholds, LegendEntry, Tier};

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::feed::{FlightRecord, QueryWindow};

/// Score of `airport_id` over `records`; 0 when no record names it.
#[must_use]
pub fn aggregate(records: &[FlightRecord], airport_id: &str) -> u64 {
    records
        .iter()
        .filter(|record| record.touches(airport_id))
        .map(FlightRecord::candidate_total)
        .sum()
}

/// Scores for every airport named in one batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntensityMap {
    scores: HashMap<String, u64>,
}

impl IntensityMap {
    /// Single pass over `records`.
    ///
    /// A record whose departure and arrival are the same airport counts once for it.
    #[must_use]
    pub fn from_records(records: &[FlightRecord]) -> Self {
        let mut scores: HashMap<String, u64> = HashMap::new();

        for record in records {
            let total = record.candidate_total();
            let departure = record.est_departure_airport.as_deref();
            let arrival = record.est_arrival_airport.as_deref();

            if let Some(departure) = departure {
                let score = scores.entry(departure.to_string()).or_insert(0);
                *score = score.saturating_add(total);
            }
            if let Some(arrival) = arrival.filter(|&a| Some(a) != departure) {
                let score = scores.entry(arrival.to_string()).or_insert(0);
                *score = score.saturating_add(total);
            }
        }

        Self { scores }
    }

    /// Score for `ident`; 0 for airports absent from the batch.
    #[must_use]
    pub fn score(&self, ident: &str) -> u64 {
        self.scores.get(ident).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn tier(&self, ident: &str, thresholds: &IntensityThresholds) -> Tier {
        thresholds.classify(self.score(ident))
    }

    /// Number of airports with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.scores.iter().map(|(ident, &score)| (ident.as_str(), score))
    }
}

/// Intensity state published after each successful traffic refresh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntensitySnapshot {
    /// Incremented on each successful refresh; 0 means no data yet.
    pub generation: u64,
    pub window: Option<QueryWindow>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub record_count: usize,
    pub scores: IntensityMap,
}

impl IntensitySnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(
        records: &[FlightRecord],
        window: QueryWindow,
        fetched_at: DateTime<Utc>,
        generation: u64,
    ) -> Self {
        Self {
            generation,
            window: Some(window),
            fetched_at: Some(fetched_at),
            record_count: records.len(),
            scores: IntensityMap::from_records(records),
        }
    }

    #[must_use]
    pub fn score(&self, ident: &str) -> u64 {
        self.scores.score(ident)
    }
}
