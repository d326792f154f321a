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

//! Timezone-aware query windows for historical airport activity.
//!
//! Departure and arrival history is requested for the airport's *local* day:
//! from local midnight up to now. The airport's IANA zone comes from its
//! coordinates through a [`TimezoneResolver`].

mod activity;

pub use activity::{
    hourly_histogram, load_activity, sort_activity, ActivityError, ActivityKind, ActivityReport,
    HourlyHistogram,
};

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tzf_rs::DefaultFinder;

use crate::catalog::Airport;
use crate::feed::QueryWindow;
use crate::viewport::LatLng;

/// How far past a skipped local midnight to look for the first valid time.
const MAX_MIDNIGHT_GAP_MINUTES: i64 = 180;
const MIDNIGHT_GAP_STEP_MINUTES: usize = 15;

/// Errors raised while building a local-day window.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("no timezone known for {ident} at ({latitude}, {longitude})")]
    UnknownTimezone {
        ident: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("no valid local start of day for {ident} on {date} in {zone}")]
    NoLocalMidnight { ident: String, date: NaiveDate, zone: Tz },
}

/// Maps a coordinate to its IANA timezone.
pub trait TimezoneResolver {
    fn resolve(&self, position: LatLng) -> Option<Tz>;
}

/// Resolver that answers the same zone for every coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimezone(pub Tz);

impl TimezoneResolver for FixedTimezone {
    fn resolve(&self, _position: LatLng) -> Option<Tz> {
        Some(self.0)
    }
}

/// Offline polygon lookup of timezone boundaries.
pub struct TzfResolver {
    finder: DefaultFinder,
}

impl fmt::Debug for TzfResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TzfResolver").finish_non_exhaustive()
    }
}

impl TzfResolver {
    /// Build the finder. Loads the embedded boundary data, so create one and reuse it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneResolver for TzfResolver {
    fn resolve(&self, position: LatLng) -> Option<Tz> {
        let name = self.finder.get_tz_name(position.lng, position.lat);
        if name.is_empty() {
            return None;
        }
        name.parse::<Tz>().ok()
    }
}

/// The local day so far at an airport, expressed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub zone: Tz,
    /// Local start of day (normally midnight).
    pub begin_utc: DateTime<Utc>,
    /// The instant the window was computed for.
    pub end_utc: DateTime<Utc>,
}

impl DayWindow {
    #[must_use]
    pub fn local_begin(&self) -> DateTime<Tz> {
        self.begin_utc.with_timezone(&self.zone)
    }

    #[must_use]
    pub fn local_end(&self) -> DateTime<Tz> {
        self.end_utc.with_timezone(&self.zone)
    }

    /// Epoch-second range for feed queries.
    #[must_use]
    pub fn query_window(&self) -> QueryWindow {
        QueryWindow::new(self.begin_utc.timestamp(), self.end_utc.timestamp())
    }
}

/// Window from local midnight of the airport's current day up to `now_utc`.
pub fn local_day_window<R>(airport: &Airport, now_utc: DateTime<Utc>, resolver: &R) -> Result<DayWindow, WindowError>
where
    R: TimezoneResolver + ?Sized,
{
    let zone = resolver
        .resolve(airport.position())
        .ok_or_else(|| WindowError::UnknownTimezone {
            ident: airport.ident.clone(),
            latitude: airport.latitude,
            longitude: airport.longitude,
        })?;

    let date = now_utc.with_timezone(&zone).date_naive();
    let begin = start_of_day(zone, date).ok_or_else(|| WindowError::NoLocalMidnight {
        ident: airport.ident.clone(),
        date,
        zone,
    })?;

    Ok(DayWindow {
        zone,
        begin_utc: begin.with_timezone(&Utc),
        end_utc: now_utc,
    })
}

/// Local midnight, or the first valid local time after it when midnight is skipped by DST.
fn start_of_day(zone: Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..=MAX_MIDNIGHT_GAP_MINUTES)
        .step_by(MIDNIGHT_GAP_STEP_MINUTES)
        .find_map(|offset| zone.from_local_datetime(&(midnight + Duration::minutes(offset))).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn narita() -> Airport {
        Airport::new("RJAA", "Narita International Airport", 35.7647, 140.3864).with_iata("NRT")
    }

    #[test]
    fn test_utc_plus_nine_window_starts_at_local_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 20, 30, 0).unwrap();
        let window = local_day_window(&narita(), now, &FixedTimezone(chrono_tz::Asia::Tokyo)).unwrap();

        assert!(window.begin_utc <= now);
        let local = window.local_begin();
        assert_eq!((local.hour(), local.minute()), (0, 0));
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(window.begin_utc, Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap());
        assert_eq!(window.end_utc, now);
    }

    #[test]
    fn test_window_just_before_local_midnight_uses_previous_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 14, 59, 59).unwrap();
        let window = local_day_window(&narita(), now, &FixedTimezone(chrono_tz::Asia::Tokyo)).unwrap();
        assert_eq!(window.begin_utc, Utc.with_ymd_and_hms(2024, 3, 9, 15, 0, 0).unwrap());
        assert_eq!(window.query_window().duration_secs(), 86_399);
    }

    #[test]
    fn test_skipped_midnight_uses_first_valid_time() {
        // Chile starts DST at local midnight on 2024-09-08
        let scl = Airport::new("SCEL", "Arturo Merino Benitez International Airport", -33.393, -70.7858);
        let now = Utc.with_ymd_and_hms(2024, 9, 8, 15, 0, 0).unwrap();
        let window = local_day_window(&scl, now, &FixedTimezone(chrono_tz::America::Santiago)).unwrap();

        assert_eq!(window.local_begin().hour(), 1);
        assert_eq!(window.begin_utc, Utc.with_ymd_and_hms(2024, 9, 8, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_unknown_timezone_is_an_error() {
        struct Nowhere;
        impl TimezoneResolver for Nowhere {
            fn resolve(&self, _position: LatLng) -> Option<Tz> {
                None
            }
        }

        let err = local_day_window(&narita(), Utc::now(), &Nowhere).unwrap_err();
        assert!(matches!(err, WindowError::UnknownTimezone { ref ident, .. } if ident == "RJAA"));
    }

    #[test]
    fn test_tzf_resolves_airport_coordinates() {
        let resolver = TzfResolver::new();
        assert_eq!(resolver.resolve(narita().position()), Some(chrono_tz::Asia::Tokyo));
        assert_eq!(
            resolver.resolve(LatLng::new(33.6367, -84.4281)),
            Some(chrono_tz::America::New_York)
        );
    }
}
