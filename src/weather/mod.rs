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

//! Current weather at an airport, formatted for display.

use std::fmt;

use traffic_engine::WeatherReport;

/// Metres per second to knots.
pub const MS_TO_KNOTS: f64 = 1.94384;

/// Display-ready conditions: rounded temperature, wind in knots.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub conditions: Option<String>,
    pub temperature_c: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_kt: Option<f64>,
}

impl WeatherSummary {
    #[must_use]
    pub fn from_report(report: &WeatherReport) -> Self {
        Self {
            conditions: report.conditions.clone().filter(|c| !c.trim().is_empty()),
            temperature_c: report.temperature.map(f64::round),
            wind_direction_deg: report.wind.direction.map(f64::round),
            wind_speed_kt: report.wind.speed.map(|ms| (ms * MS_TO_KNOTS * 10.0).round() / 10.0),
        }
    }
}

impl fmt::Display for WeatherSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.conditions {
            Some(conditions) => write!(f, "{conditions}")?,
            None => write!(f, "conditions unavailable")?,
        }
        if let Some(temperature) = self.temperature_c {
            write!(f, ", {temperature:.0}°C")?;
        }
        match (self.wind_direction_deg, self.wind_speed_kt) {
            (Some(direction), Some(speed)) => write!(f, ", wind {direction:.0}° at {speed:.1} kt"),
            (None, Some(speed)) => write!(f, ", wind {speed:.1} kt"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_engine::Wind;

    #[test]
    fn test_wind_converted_to_knots() {
        let report = WeatherReport {
            conditions: Some("broken clouds".to_string()),
            temperature: Some(12.6),
            wind: Wind {
                direction: Some(270.0),
                speed: Some(5.0),
            },
        };
        let summary = WeatherSummary::from_report(&report);
        assert_eq!(summary.temperature_c, Some(13.0));
        assert_eq!(summary.wind_speed_kt, Some(9.7));
        assert_eq!(summary.to_string(), "broken clouds, 13°C, wind 270° at 9.7 kt");
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let summary = WeatherSummary::from_report(&WeatherReport::default());
        assert_eq!(summary.to_string(), "conditions unavailable");
    }
}
