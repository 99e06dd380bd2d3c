//! Indoor/outdoor mode and the open-place latch.

use core::fmt;

/// Full-frontal openness needed to declare arrival at an open place.
pub const OPEN_PLACE_ENTER: f32 = 0.7;
/// Openness below which a declared open place is abandoned.
pub const OPEN_PLACE_EXIT: f32 = 0.4;

/// Quality class of the latest position fix, following the covariance
/// classification reported with satellite fixes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionQuality {
    /// No usable fix quality.
    #[default]
    Unknown,
    /// Covariance approximated.
    Approximated,
    /// Diagonal of the covariance known.
    DiagonalKnown,
    /// Full covariance known.
    Known,
}

/// Operating mode of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No positioning available; wall tracking only.
    #[default]
    Indoor,
    /// Positioning available; open-place detection enabled.
    Outdoor,
}

impl From<PositionQuality> for Mode {
    fn from(quality: PositionQuality) -> Self {
        match quality {
            PositionQuality::Unknown => Mode::Indoor,
            _ => Mode::Outdoor,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Indoor => write!(f, "indoor"),
            Mode::Outdoor => write!(f, "outdoor"),
        }
    }
}

/// Hysteretic "open place reached" flag.
///
/// Always false indoors. Outdoors it sets once the score reaches
/// [`OPEN_PLACE_ENTER`] and clears only when the score drops below
/// [`OPEN_PLACE_EXIT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenPlaceLatch {
    reached: bool,
}

impl OpenPlaceLatch {
    /// Current flag value.
    pub fn reached(&self) -> bool {
        self.reached
    }

    /// Feed the openness score of the latest scan and return the new flag.
    pub fn update(&mut self, mode: Mode, score: f32) -> bool {
        self.reached = match mode {
            Mode::Indoor => false,
            Mode::Outdoor if self.reached => score >= OPEN_PLACE_EXIT,
            Mode::Outdoor => score >= OPEN_PLACE_ENTER,
        };
        self.reached
    }
}
