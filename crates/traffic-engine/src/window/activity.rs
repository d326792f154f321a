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

//! Departure and arrival history for one airport's local day.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use log::{debug, info};
use thiserror::Error;

use super::{local_day_window, DayWindow, TimezoneResolver, WindowError};
use crate::catalog::Airport;
use crate::feed::{AirportFeed, FeedError, FlightRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Departures,
    Arrivals,
}

impl ActivityKind {
    /// Departures are keyed by first contact, arrivals by last contact.
    #[must_use]
    pub fn timestamp(self, record: &FlightRecord) -> i64 {
        match self {
            ActivityKind::Departures => record.first_seen,
            ActivityKind::Arrivals => record.last_seen,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ActivityKind::Departures => "departures",
            ActivityKind::Arrivals => "arrivals",
        }
    }
}

/// Ascending by the kind's timestamp; equal timestamps keep feed order.
pub fn sort_activity(records: &mut [FlightRecord], kind: ActivityKind) {
    records.sort_by_key(|record| kind.timestamp(record));
}

/// Flight counts per hour of day on the observer's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HourlyHistogram {
    counts: [u32; 24],
}

impl HourlyHistogram {
    #[must_use]
    pub fn counts(&self) -> &[u32; 24] {
        &self.counts
    }

    /// `"00:00"` through `"23:00"`.
    #[must_use]
    pub fn labels() -> Vec<String> {
        (0..24).map(|hour| format!("{hour:02}:00")).collect()
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Busiest hour and its count; the earliest hour wins ties. `None` when empty.
    #[must_use]
    pub fn peak(&self) -> Option<(usize, u32)> {
        let mut peak: Option<(usize, u32)> = None;
        for (hour, &count) in self.counts.iter().enumerate() {
            if count > 0 && peak.is_none_or(|(_, best)| count > best) {
                peak = Some((hour, count));
            }
        }
        peak
    }
}

/// Bucket `records` by the hour of their kind's timestamp in `observer`'s zone.
///
/// Records with an unrepresentable timestamp are skipped.
pub fn hourly_histogram<Z: TimeZone>(records: &[FlightRecord], kind: ActivityKind, observer: &Z) -> HourlyHistogram {
    let mut histogram = HourlyHistogram::default();
    for record in records {
        let Some(utc) = DateTime::from_timestamp(kind.timestamp(record), 0) else {
            continue;
        };
        let hour = utc.with_timezone(observer).hour() as usize;
        histogram.counts[hour] += 1;
    }
    histogram
}

/// Outcome of an activity load.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityReport {
    Loaded {
        kind: ActivityKind,
        window: DayWindow,
        records: Vec<FlightRecord>,
        histogram: HourlyHistogram,
    },
    /// Nothing recorded in the window. Shown as an empty state, not an error.
    Empty { kind: ActivityKind, window: DayWindow },
}

impl ActivityReport {
    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityReport::Loaded { kind, .. } | ActivityReport::Empty { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn window(&self) -> &DayWindow {
        match self {
            ActivityReport::Loaded { window, .. } | ActivityReport::Empty { window, .. } => window,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[FlightRecord] {
        match self {
            ActivityReport::Loaded { records, .. } => records,
            ActivityReport::Empty { .. } => &[],
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.records().len()
    }
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Fetch the airport's departures or arrivals since local midnight.
///
/// A not-found response and an empty list both yield [`ActivityReport::Empty`].
pub async fn load_activity<F, R, Z>(
    feed: &F,
    airport: &Airport,
    kind: ActivityKind,
    resolver: &R,
    now_utc: DateTime<Utc>,
    observer: &Z,
) -> Result<ActivityReport, ActivityError>
where
    F: AirportFeed,
    R: TimezoneResolver + ?Sized,
    Z: TimeZone,
{
    let window = local_day_window(airport, now_utc, resolver)?;
    let query = window.query_window();
    debug!(
        "Loading {} for {} from {} ({})",
        kind.label(),
        airport.ident,
        window.local_begin(),
        window.zone
    );

    let result = match kind {
        ActivityKind::Departures => feed.departures(&airport.ident, query).await,
        ActivityKind::Arrivals => feed.arrivals(&airport.ident, query).await,
    };

    let mut records = match result {
        Ok(records) => records,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if records.is_empty() {
        info!("No {} recorded for {} today", kind.label(), airport.ident);
        return Ok(ActivityReport::Empty { kind, window });
    }

    sort_activity(&mut records, kind);
    let histogram = hourly_histogram(&records, kind, observer);
    info!("Loaded {} {} for {}", records.len(), kind.label(), airport.ident);

    Ok(ActivityReport::Loaded {
        kind,
        window,
        records,
        histogram,
    })
}
