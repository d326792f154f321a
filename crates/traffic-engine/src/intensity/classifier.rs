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

//! Score to visual tier mapping.
//!
//! Default table (inclusive bounds):
//!
//! | score   | tier   |
//! |---------|--------|
//! | 0       | None   |
//! | 1..=5   | Green  |
//! | 6..=11  | Yellow |
//! | 12..=15 | Red    |
//! | > 15    | None   |
//!
//! A zero score is "no traffic" and draws no marker, unlike light traffic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete intensity classification of an airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Green,
    Yellow,
    Red,
}

impl Tier {
    /// Color name used for the intensity circle.
    #[must_use]
    pub fn color_name(self) -> &'static str {
        match self {
            Tier::None => "transparent",
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
        }
    }

    #[must_use]
    pub fn rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Tier::None => None,
            Tier::Green => Some((0, 128, 0)),
            Tier::Yellow => Some((255, 255, 0)),
            Tier::Red => Some((255, 0, 0)),
        }
    }

    /// Whether an intensity circle is drawn for this tier.
    #[must_use]
    pub fn is_visible(self) -> bool {
        self != Tier::None
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color_name())
    }
}

/// Inclusive upper bounds of the visible tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityThresholds {
    pub green_max: u64,
    pub yellow_max: u64,
    pub red_max: u64,
}

impl Default for IntensityThresholds {
    fn default() -> Self {
        Self {
            green_max: 5,
            yellow_max: 11,
            red_max: 15,
        }
    }
}

impl IntensityThresholds {
    /// Tier for `score`. Defined for every value.
    #[must_use]
    pub fn classify(&self, score: u64) -> Tier {
        match score {
            0 => Tier::None,
            s if s <= self.green_max => Tier::Green,
            s if s <= self.yellow_max => Tier::Yellow,
            s if s <= self.red_max => Tier::Red,
            _ => Tier::None,
        }
    }

    /// `1 <= green_max < yellow_max < red_max`.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.green_max >= 1 && self.green_max < self.yellow_max && self.yellow_max < self.red_max
    }

    /// Score ranges of the visible tiers, lightest first.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        vec![
            LegendEntry {
                tier: Tier::Green,
                min: 1,
                max: self.green_max,
            },
            LegendEntry {
                tier: Tier::Yellow,
                min: self.green_max.saturating_add(1),
                max: self.yellow_max,
            },
            LegendEntry {
                tier: Tier::Red,
                min: self.yellow_max.saturating_add(1),
                max: self.red_max,
            },
        ]
    }
}

/// Classify with the default thresholds.
#[must_use]
pub fn classify(score: u64) -> Tier {
    IntensityThresholds::default().classify(score)
}

/// One row of the intensity legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub tier: Tier,
    pub min: u64,
    pub max: u64,
}

impl fmt::Display for LegendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.tier {
            Tier::None => "None",
            Tier::Green => "Green",
            Tier::Yellow => "Yellow",
            Tier::Red => "Red",
        };
        write!(f, "{name}: {}-{} flights", self.min, self.max)
    }
}
