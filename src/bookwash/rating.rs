/*!
 * Content ratings and target thresholds.
 *
 * A rating holds one level per axis on the five step scale G < PG < PG-13 < R < X.
 * Targets use the same scale; a rating exceeds its targets when any single axis
 * is strictly above the matching threshold.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// One step of the rating scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    G = 1,
    PG = 2,
    #[serde(rename = "PG-13", alias = "PG13")]
    PG13 = 3,
    R = 4,
    X = 5,
}

impl Level {
    /// All levels in ascending order
    pub const ALL: [Level; 5] = [Level::G, Level::PG, Level::PG13, Level::R, Level::X];

    /// Numeric value on the 1..=5 scale
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Level for a numeric value on the 1..=5 scale
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::G),
            2 => Some(Self::PG),
            3 => Some(Self::PG13),
            4 => Some(Self::R),
            5 => Some(Self::X),
            _ => None,
        }
    }

    /// Symbol used in the bookwash format and in classifier responses
    pub fn symbol(self) -> &'static str {
        match self {
            Self::G => "G",
            Self::PG => "PG",
            Self::PG13 => "PG-13",
            Self::R => "R",
            Self::X => "X",
        }
    }

    /// Human readable description used in prompts
    pub fn describe(self) -> &'static str {
        match self {
            Self::G => "suitable for all ages",
            Self::PG => "mild, suitable for children with guidance",
            Self::PG13 => "moderate, suitable for teenagers",
            Self::R => "strong, adults only",
            Self::X => "explicit",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();
        match normalized.as_str() {
            "G" | "1" => Ok(Self::G),
            "PG" | "2" => Ok(Self::PG),
            "PG-13" | "PG13" | "3" => Ok(Self::PG13),
            "R" | "4" => Ok(Self::R),
            "X" | "NC-17" | "5" => Ok(Self::X),
            _ => Err(anyhow!("Invalid rating level: {}", s)),
        }
    }
}

/// The three independent content dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Language,
    Sexual,
    Violence,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Language, Axis::Sexual, Axis::Violence];

    /// Key used in `#RATING:` lines and classifier responses
    pub fn key(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Sexual => "sexual",
            Self::Violence => "violence",
        }
    }

    /// Settings key holding the target threshold for this axis
    pub fn target_key(self) -> &'static str {
        match self {
            Self::Language => "target_language",
            Self::Sexual => "target_sexual",
            Self::Violence => "target_violence",
        }
    }
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "language" | "profanity" => Ok(Self::Language),
            "sexual" | "sexual content" | "sex" => Ok(Self::Sexual),
            "violence" => Ok(Self::Violence),
            _ => Err(anyhow!("Invalid rating axis: {}", s)),
        }
    }
}

/// Classification of one chapter on all three axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rating {
    pub language: Level,
    pub sexual: Level,
    pub violence: Level,
}

impl Rating {
    pub fn new(language: Level, sexual: Level, violence: Level) -> Self {
        Self { language, sexual, violence }
    }

    pub fn get(&self, axis: Axis) -> Level {
        match axis {
            Axis::Language => self.language,
            Axis::Sexual => self.sexual,
            Axis::Violence => self.violence,
        }
    }

    pub fn set(&mut self, axis: Axis, level: Level) {
        match axis {
            Axis::Language => self.language = level,
            Axis::Sexual => self.sexual = level,
            Axis::Violence => self.violence = level,
        }
    }

    /// True if any axis is strictly above its threshold
    pub fn exceeds(&self, targets: &Targets) -> bool {
        !self.exceeded_axes(targets).is_empty()
    }

    /// Axes that are strictly above their threshold
    pub fn exceeded_axes(&self, targets: &Targets) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.get(*axis) > targets.get(*axis))
            .collect()
    }

    /// Parse the value of a `#RATING:` line.
    ///
    /// Unknown keys and unknown levels are skipped one pair at a time. Returns
    /// `None` when no pair could be used at all.
    pub fn parse_line(value: &str) -> Option<Self> {
        let mut rating = Rating::default();
        let mut recognized = 0;

        for pair in value.split_whitespace() {
            let Some((key, level)) = pair.split_once('=') else {
                warn!("Ignoring rating field without '=': {}", pair);
                continue;
            };
            match (key.parse::<Axis>(), level.parse::<Level>()) {
                (Ok(axis), Ok(level)) => {
                    rating.set(axis, level);
                    recognized += 1;
                }
                _ => warn!("Ignoring unrecognized rating field: {}", pair),
            }
        }

        (recognized > 0).then_some(rating)
    }

    /// Value written after `#RATING:`
    pub fn to_line(&self) -> String {
        format!(
            "language={} sexual={} violence={}",
            self.language, self.sexual, self.violence
        )
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// Maximum acceptable level per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
    pub language: Level,
    pub sexual: Level,
    pub violence: Level,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            language: Level::PG,
            sexual: Level::PG,
            violence: Level::PG13,
        }
    }
}

impl Targets {
    pub fn new(language: Level, sexual: Level, violence: Level) -> Self {
        Self { language, sexual, violence }
    }

    pub fn get(&self, axis: Axis) -> Level {
        match axis {
            Axis::Language => self.language,
            Axis::Sexual => self.sexual,
            Axis::Violence => self.violence,
        }
    }

    pub fn set(&mut self, axis: Axis, level: Level) {
        match axis {
            Axis::Language => self.language = level,
            Axis::Sexual => self.sexual = level,
            Axis::Violence => self.violence = level,
        }
    }

    /// One line per axis, used in rewriter prompts
    pub fn describe(&self) -> String {
        Axis::ALL
            .iter()
            .map(|axis| {
                let level = self.get(*axis);
                format!("- {}: at most {} ({})", axis.key(), level, level.describe())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
