//! The most recent range scan, addressable by bearing.

use core::ops::Range;

use wall_kinematics::rad_to_deg;

use crate::error::NavigationError;

/// One complete laser sweep.
///
/// Samples are evenly spaced from `angle_min` in steps of `angle_increment`
/// (counter-clockwise, 0 straight ahead). A range that is not finite or falls
/// outside `[range_min, range_max]` is a "no return" and reads as far away.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFrame {
    angle_min_deg: f32,
    angle_increment_deg: f32,
    range_min: f32,
    range_max: f32,
    ranges: Vec<f32>,
}

impl ScanFrame {
    /// Build a frame from sensor metadata in radians.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidScan)` if the increment is not
    /// positive or the valid range window is empty.
    pub fn new(
        angle_min: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Result<Self, NavigationError> {
        Self::from_degrees(rad_to_deg(angle_min), rad_to_deg(angle_increment), range_min, range_max, ranges)
    }

    /// Build a frame from sensor metadata in degrees.
    ///
    /// # Errors
    ///
    /// Same as [`ScanFrame::new`].
    pub fn from_degrees(
        angle_min_deg: f32,
        angle_increment_deg: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Result<Self, NavigationError> {
        if !(angle_increment_deg > 0.0) || !angle_min_deg.is_finite() {
            return Err(NavigationError::InvalidScan("angle increment must be positive"));
        }
        if !(range_max > range_min) || range_min < 0.0 {
            return Err(NavigationError::InvalidScan("range window must be non-empty and non-negative"));
        }
        Ok(Self {
            angle_min_deg,
            angle_increment_deg,
            range_min,
            range_max,
            ranges,
        })
    }

    /// Number of samples in the sweep.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the sweep holds no samples.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Largest range the sensor reports as a valid return.
    pub fn range_max(&self) -> f32 {
        self.range_max
    }

    /// Bearing of sample `index` in degrees.
    pub fn angle_deg(&self, index: usize) -> f32 {
        self.angle_min_deg + index as f32 * self.angle_increment_deg
    }

    /// Range of sample `index`, or `None` for a no-return.
    pub fn range(&self, index: usize) -> Option<f32> {
        let r = *self.ranges.get(index)?;
        (r.is_finite() && r >= self.range_min && r <= self.range_max).then_some(r)
    }

    /// Range of sample `index` with no-returns read as infinitely far.
    pub fn range_or_far(&self, index: usize) -> f32 {
        self.range(index).unwrap_or(f32::INFINITY)
    }

    /// Index of the sample closest to `deg`, if the bearing is inside the field of view.
    pub fn nearest_index(&self, deg: f32) -> Option<usize> {
        if self.ranges.is_empty() {
            return None;
        }
        let k = ((deg - self.angle_min_deg) / self.angle_increment_deg).round();
        if k < 0.0 || k >= self.ranges.len() as f32 {
            return None;
        }
        Some(k as usize)
    }

    /// Indices of the samples whose bearing lies in `[start_deg, end_deg]`.
    pub fn sector(&self, start_deg: f32, end_deg: f32) -> Range<usize> {
        const TOLERANCE: f32 = 1e-4;
        if self.ranges.is_empty() || end_deg < start_deg {
            return 0..0;
        }
        let first = ((start_deg - self.angle_min_deg) / self.angle_increment_deg - TOLERANCE).ceil();
        let last = ((end_deg - self.angle_min_deg) / self.angle_increment_deg + TOLERANCE).floor();
        let first = first.max(0.0);
        let last = last.min(self.ranges.len() as f32 - 1.0);
        if last < first {
            return 0..0;
        }
        first as usize..last as usize + 1
    }
}
