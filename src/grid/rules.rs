//! Life-like rule configuration
//!
//! A rule is a pair of 9-bit masks: bit `n` of the birth mask means a dead
//! cell with `n` live neighbours is born, bit `n` of the survive mask means a
//! live cell with `n` live neighbours stays alive. Rules are written in the
//! usual `B#/S#` notation (`B3/S23` is Conway's Life) and every named preset
//! is defined by such a string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named presets in `B#/S#` notation
pub const PRESETS: &[(&str, &str)] = &[
    ("CONWAY", "B3/S23"),
    ("HIGH_LIFE", "B36/S23"),
    ("DAY_AND_NIGHT", "B3678/S34678"),
    ("SEEDS", "B2/S"),
    ("REPLICATOR", "B1357/S1357"),
    ("LIFE_WITHOUT_DEATH", "B3/S012345678"),
    ("MAZE", "B3/S12345"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    #[error("invalid rule string '{0}', expected B#/S# (for example B3/S23)")]
    Malformed(String),
    #[error("unknown rule preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown neighborhood '{0}', expected moore or von-neumann")]
    UnknownNeighborhood(String),
}

/// Birth and survive bitmasks indexed by live-neighbour count (0..=8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleMasks {
    pub birth: u16,
    pub survive: u16,
}

impl RuleMasks {
    /// Build masks from neighbour counts; counts outside 0..=8 are ignored.
    pub fn from_counts(birth: &[u32], survive: &[u32]) -> Self {
        fn mask(counts: &[u32]) -> u16 {
            counts
                .iter()
                .filter(|&&n| n <= 8)
                .fold(0u16, |m, &n| m | (1 << n))
        }
        RuleMasks {
            birth: mask(birth),
            survive: mask(survive),
        }
    }

    /// Parse `B#/S#` notation, case-insensitive. Either digit list may be
    /// empty (`B2/S` is Seeds). Digits 9 are ignored like any out-of-range
    /// count.
    pub fn parse(rule: &str) -> Result<Self, RuleParseError> {
        let malformed = || RuleParseError::Malformed(rule.to_string());
        let upper = rule.trim().to_ascii_uppercase();
        let (birth, survive) = upper.split_once('/').ok_or_else(malformed)?;
        let birth = birth.strip_prefix('B').ok_or_else(malformed)?;
        let survive = survive.strip_prefix('S').ok_or_else(malformed)?;

        let digits = |s: &str| -> Result<Vec<u32>, RuleParseError> {
            s.chars()
                .map(|c| c.to_digit(10).ok_or_else(malformed))
                .collect()
        };
        Ok(Self::from_counts(&digits(birth)?, &digits(survive)?))
    }

    /// Look up a named preset (case-insensitive, `-` and `_` interchangeable).
    pub fn preset(name: &str) -> Result<Self, RuleParseError> {
        let key = name.trim().to_ascii_uppercase().replace('-', "_");
        PRESETS
            .iter()
            .find(|(preset, _)| *preset == key)
            .ok_or_else(|| RuleParseError::UnknownPreset(name.to_string()))
            .and_then(|(_, rule)| Self::parse(rule))
    }

    pub fn conway() -> Self {
        RuleMasks {
            birth: 1 << 3,
            survive: (1 << 2) | (1 << 3),
        }
    }

    pub fn births_on(&self, neighbors: u32) -> bool {
        neighbors <= 8 && self.birth & (1 << neighbors) != 0
    }

    pub fn survives_on(&self, neighbors: u32) -> bool {
        neighbors <= 8 && self.survive & (1 << neighbors) != 0
    }
}

impl Default for RuleMasks {
    fn default() -> Self {
        Self::conway()
    }
}

impl FromStr for RuleMasks {
    type Err = RuleParseError;

    /// Accepts either `B#/S#` notation or a preset name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().to_ascii_uppercase().starts_with('B') && s.contains('/') {
            Self::parse(s)
        } else {
            Self::preset(s)
        }
    }
}

impl fmt::Display for RuleMasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B")?;
        for n in (0..=8).filter(|&n| self.births_on(n)) {
            write!(f, "{}", n)?;
        }
        write!(f, "/S")?;
        for n in (0..=8).filter(|&n| self.survives_on(n)) {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

/// Which neighbours count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Neighborhood {
    /// The 8 surrounding cells
    #[default]
    Moore,
    /// The 4 orthogonal cells
    VonNeumann,
}

impl Neighborhood {
    pub fn offsets(&self) -> &'static [(i64, i64)] {
        match self {
            Neighborhood::Moore => &[
                (-1, -1),
                (0, -1),
                (1, -1),
                (-1, 0),
                (1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
            ],
            Neighborhood::VonNeumann => &[(0, -1), (-1, 0), (1, 0), (0, 1)],
        }
    }
}

impl FromStr for Neighborhood {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "moore" => Ok(Neighborhood::Moore),
            "von-neumann" | "vonneumann" => Ok(Neighborhood::VonNeumann),
            _ => Err(RuleParseError::UnknownNeighborhood(s.to_string())),
        }
    }
}

/// What lies beyond the grid border
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Cells outside the grid are dead
    #[default]
    Clip,
    /// The grid is a torus
    Wrap,
}

/// Everything the stepper needs besides the cells themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    pub masks: RuleMasks,
    pub neighborhood: Neighborhood,
    pub edges: EdgePolicy,
}

impl RuleConfig {
    pub fn new(masks: RuleMasks, neighborhood: Neighborhood, edges: EdgePolicy) -> Self {
        RuleConfig {
            masks,
            neighborhood,
            edges,
        }
    }
}
