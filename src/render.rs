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

//! Plain-text rendering of map frames, activity reports and the legend.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};
use traffic_engine::{ActivityReport, Airport, HourlyHistogram, IntensityThresholds, MapFrame, RefreshStatus};

const HISTOGRAM_WIDTH: u32 = 40;

/// One line per visible airport, busiest first, capped at `limit` lines.
pub fn format_frame(frame: &MapFrame, limit: usize) -> String {
    let mut markers: Vec<_> = frame.markers.iter().collect();
    markers.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.airport.ident.cmp(&b.airport.ident)));

    let sw = frame.bounds.south_west();
    let ne = frame.bounds.north_east();
    let mut out = format!(
        "{} airports in [{:.2}, {:.2}] - [{:.2}, {:.2}] ({} with traffic)\n",
        frame.len(),
        sw.lat,
        sw.lng,
        ne.lat,
        ne.lng,
        frame.circles().count()
    );

    for marker in markers.iter().take(limit) {
        let _ = writeln!(
            out,
            "  {:<5} {:<8} {:>4} {:<11} {}",
            marker.airport.ident,
            marker.airport.code_label(),
            marker.score,
            marker.tier.color_name(),
            marker.airport.name
        );
    }
    if markers.len() > limit {
        let _ = writeln!(out, "  ... {} more", markers.len() - limit);
    }
    out
}

/// Intensity legend: window description and tier ranges.
pub fn format_legend(thresholds: &IntensityThresholds, half_window_minutes: i64) -> String {
    let mut out = format!(
        "Traffic intensity: flights within +/-{half_window_minutes} minutes of now\n"
    );
    for entry in thresholds.legend() {
        let _ = writeln!(out, "  {entry}");
    }
    out
}

pub fn format_status(status: &RefreshStatus) -> String {
    let mut out = match status.last_success {
        Some(at) => format!("last refresh {}", at.format("%H:%M:%S UTC")),
        None => "no traffic data yet".to_string(),
    };
    if status.in_flight {
        out.push_str(", refreshing");
    }
    if let Some(error) = &status.last_error {
        let _ = write!(out, ", {} failed attempt(s): {}", status.consecutive_failures, error);
    }
    out
}

pub fn format_airport_header(airport: &Airport) -> String {
    format!(
        "{} ({}) {}\n  {:.4}, {:.4}{}",
        airport.ident,
        airport.code_label(),
        airport.name,
        airport.latitude,
        airport.longitude,
        airport
            .elevation_ft
            .map(|ft| format!(", elevation {ft} ft"))
            .unwrap_or_default()
    )
}

/// Activity list with times on the observer's clock, followed by the hourly histogram.
pub fn format_activity<Z>(report: &ActivityReport, observer: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: std::fmt::Display,
{
    let kind = report.kind();
    let window = report.window();
    let mut out = format!(
        "{} since {} local ({})\n",
        capitalize(kind.label()),
        window.local_begin().format("%Y-%m-%d %H:%M"),
        window.zone
    );

    match report {
        ActivityReport::Empty { .. } => {
            let _ = writeln!(out, "  No {} recorded today.", kind.label());
        }
        ActivityReport::Loaded { records, histogram, .. } => {
            let _ = writeln!(out, "  {} flights", records.len());
            for record in records {
                let time = DateTime::from_timestamp(kind.timestamp(record), 0)
                    .map(|t| t.with_timezone(observer).format("%H:%M").to_string())
                    .unwrap_or_else(|| "--:--".to_string());
                let callsign = match record.display_callsign() {
                    "" => record.icao24.as_str(),
                    callsign => callsign,
                };
                let other = match kind {
                    traffic_engine::ActivityKind::Departures => record.est_arrival_airport.as_deref(),
                    traffic_engine::ActivityKind::Arrivals => record.est_departure_airport.as_deref(),
                };
                let _ = writeln!(out, "  {time}  {callsign:<8} {}", other.unwrap_or("?"));
            }
            out.push_str(&format_histogram(histogram));
        }
    }
    out
}

/// Horizontal bar chart, one row per hour with traffic.
pub fn format_histogram(histogram: &HourlyHistogram) -> String {
    let Some((_, peak)) = histogram.peak() else {
        return String::new();
    };

    let mut out = String::from("  Flights per hour:\n");
    for (label, &count) in HourlyHistogram::labels().iter().zip(histogram.counts()) {
        if count == 0 {
            continue;
        }
        let width = (count * HISTOGRAM_WIDTH).div_ceil(peak);
        let _ = writeln!(out, "  {label} {:<w$} {count}", "#".repeat(width as usize), w = HISTOGRAM_WIDTH as usize);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
