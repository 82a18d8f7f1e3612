//! Conversions between the 0-100 rotation slider and favorite fan levels.
//!
//! A boundary table `B` of `n` ascending positions splits the slider into
//! `n - 1` half-open bands `(B[i-1], B[i]]`, numbered `1..n`. A position maps
//! to the band that contains it; a level maps back to a representative
//! position, preferring the one already on display so that small slider
//! moves inside a band do not jump.
//!
//! # Example
//!
//! ```
//! use miair_core::LevelMapper;
//!
//! let mapper = LevelMapper::default();
//! assert_eq!(mapper.level_for_position(37), 7);
//! assert_eq!(mapper.position_for_level(7, Some(37)), 37);
//! assert_eq!(mapper.position_for_level(7, Some(55)), 40);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Boundary table of the Mi Air Purifier 2S (14 levels).
pub const DEFAULT_LEVEL_BOUNDARIES: [u8; 15] =
    [0, 5, 10, 15, 20, 25, 30, 40, 50, 60, 70, 80, 90, 95, 100];

/// Maps slider positions to discrete levels and back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct LevelMapper {
    boundaries: Vec<u8>,
}

impl Default for LevelMapper {
    fn default() -> Self {
        Self {
            boundaries: DEFAULT_LEVEL_BOUNDARIES.to_vec(),
        }
    }
}

impl LevelMapper {
    /// Build a mapper from a boundary table.
    ///
    /// The table must start at 0, end at 100 and be strictly increasing.
    pub fn new(boundaries: Vec<u8>) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(Error::invalid_config(
                "level table needs at least two boundaries",
            ));
        }
        if boundaries.first() != Some(&0) || boundaries.last() != Some(&100) {
            return Err(Error::invalid_config(
                "level table must start at 0 and end at 100",
            ));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_config(
                "level table must be strictly increasing",
            ));
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[u8] {
        &self.boundaries
    }

    /// Highest level (number of bands).
    pub fn max_level(&self) -> u8 {
        self.boundaries.len().saturating_sub(1).max(1) as u8
    }

    /// Level whose band contains `position`. Positions outside every band
    /// (only 0 for a valid table) map to level 1.
    pub fn level_for_position(&self, position: u8) -> u8 {
        self.boundaries
            .windows(2)
            .position(|band| band[0] < position && position <= band[1])
            .map_or(1, |i| (i + 1) as u8)
    }

    /// Slider position to display for `level`.
    ///
    /// Returns `current` when it already lies inside the level's band,
    /// otherwise the band's upper boundary. Level 0 has no band and shows
    /// the bottom of the slider; levels above `max_level` are clamped.
    pub fn position_for_level(&self, level: u8, current: Option<u8>) -> u8 {
        if self.boundaries.len() < 2 {
            return current.unwrap_or_default();
        }
        if level == 0 {
            return self.boundaries[0];
        }

        let level = usize::from(level.min(self.max_level()));
        let (low, high) = (self.boundaries[level - 1], self.boundaries[level]);
        match current {
            Some(p) if low < p && p <= high => p,
            _ => high,
        }
    }
}

impl TryFrom<Vec<u8>> for LevelMapper {
    type Error = Error;

    fn try_from(boundaries: Vec<u8>) -> Result<Self> {
        Self::new(boundaries)
    }
}

impl From<LevelMapper> for Vec<u8> {
    fn from(mapper: LevelMapper) -> Self {
        mapper.boundaries
    }
}
