#![warn(missing_docs)]

//! Tunables of the wall tracker and the geometry derived from them once at startup.

use wall_kinematics::{VelocityLimits, front_left_check_angle, front_wall_check_angle};

use crate::error::NavigationError;

/// Immutable controller configuration, supplied once at startup.
///
/// Angles are in degrees with 0° straight ahead and positive to the left,
/// which is the side of the tracked wall.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Cruise and upper-bound linear velocity (m/s).
    pub max_linear_vel: f32,
    /// Fastest left turn (rad/s).
    pub max_angular_vel: f32,
    /// Fastest right turn (rad/s), usually negative.
    pub min_angular_vel: f32,
    /// Target standoff from the tracked wall (m).
    pub distance_from_wall: f32,
    /// Frontal range that triggers the evasive turn (m).
    pub distance_to_stop: f32,
    /// PID sample period (s).
    pub sampling_rate: f32,
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain.
    pub kd: f32,
    /// Start of the lateral sector (degrees).
    pub start_deg_lateral: f32,
    /// End of the lateral sector (degrees).
    pub end_deg_lateral: f32,
    /// Fraction of frontal rays below the stop distance that triggers the evasive turn.
    pub stop_ray_th: f32,
    /// Distance between the drive wheels (m).
    pub wheel_separation: f32,
    /// Forward margin past the lateral sector used to look for the wall after a gap (m).
    pub distance_to_skip: f32,
    /// Range beyond which a ray counts as open (m).
    pub open_place_distance: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_linear_vel: 0.5,
            max_angular_vel: 1.0,
            min_angular_vel: -1.0,
            distance_from_wall: 0.5,
            distance_to_stop: 0.5,
            sampling_rate: 0.1,
            kp: 1.2,
            ki: 0.0,
            kd: 0.02,
            start_deg_lateral: 45.0,
            end_deg_lateral: 90.0,
            stop_ray_th: 0.5,
            wheel_separation: 0.4,
            distance_to_skip: 0.5,
            open_place_distance: 3.0,
        }
    }
}

/// Quantities computed once from a validated [`TrackingConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingGeometry {
    /// Bounds applied to every emitted command.
    pub limits: VelocityLimits,
    /// Centre of the frontal collision window (degrees).
    pub front_wall_deg: f32,
    /// Bearing where the wall should reappear past a gap (degrees).
    pub front_left_deg: f32,
}

impl TrackingConfig {
    /// Reject tunables that make the controller ill-defined.
    ///
    /// # Errors
    ///
    /// Returns a [`NavigationError`] describing the first offending tunable.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.sampling_rate <= 0.0 || !self.sampling_rate.is_finite() {
            return Err(NavigationError::InvalidSamplingRate("must be positive"));
        }
        if self.max_linear_vel < 0.0 {
            return Err(NavigationError::InvalidDistance("max_linear_vel must be non-negative"));
        }
        if self.distance_from_wall <= 0.0 {
            return Err(NavigationError::InvalidDistance("distance_from_wall must be positive"));
        }
        if self.distance_to_stop <= 0.0 {
            return Err(NavigationError::InvalidDistance("distance_to_stop must be positive"));
        }
        if self.wheel_separation < 0.0 || self.distance_to_skip < 0.0 {
            return Err(NavigationError::InvalidDistance(
                "wheel_separation and distance_to_skip must be non-negative",
            ));
        }
        if self.start_deg_lateral <= 0.0 || self.start_deg_lateral >= 180.0 {
            return Err(NavigationError::InvalidLateralSector("start must lie in (0, 180)"));
        }
        if self.end_deg_lateral < self.start_deg_lateral {
            return Err(NavigationError::InvalidLateralSector("end must not precede start"));
        }
        if !(0.0..=1.0).contains(&self.stop_ray_th) {
            return Err(NavigationError::InvalidStopRayThreshold("must lie in [0, 1]"));
        }
        Ok(())
    }

    /// Validate the configuration and derive the guard geometry.
    ///
    /// # Errors
    ///
    /// Same as [`TrackingConfig::validate`], plus inverted angular bounds.
    pub fn geometry(&self) -> Result<TrackingGeometry, NavigationError> {
        self.validate()?;
        let limits = VelocityLimits::new(self.max_linear_vel, self.min_angular_vel, self.max_angular_vel)?;

        Ok(TrackingGeometry {
            limits,
            front_wall_deg: front_wall_check_angle(self.wheel_separation, self.distance_to_stop),
            front_left_deg: front_left_check_angle(
                self.distance_from_wall,
                self.distance_to_skip,
                self.start_deg_lateral,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let geometry = TrackingConfig::default().geometry().unwrap();
        assert!(geometry.front_wall_deg < 0.0);
        assert!(geometry.front_left_deg > 0.0);
        assert!(geometry.front_left_deg < 45.0);
    }

    #[test]
    fn test_derived_angles_follow_geometry() {
        let config = TrackingConfig {
            wheel_separation: 0.4,
            distance_to_stop: 0.2,
            distance_from_wall: 1.0,
            distance_to_skip: 1.0,
            start_deg_lateral: 45.0,
            ..TrackingConfig::default()
        };
        let geometry = config.geometry().unwrap();
        assert!((geometry.front_wall_deg + 45.0).abs() < 1e-3);
        assert!((geometry.front_left_deg - 26.565).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_non_positive_sampling_rate() {
        let config = TrackingConfig { sampling_rate: 0.0, ..TrackingConfig::default() };
        assert!(matches!(config.geometry(), Err(NavigationError::InvalidSamplingRate(_))));
    }

    #[test]
    fn test_rejects_inverted_angular_bounds() {
        let config = TrackingConfig {
            min_angular_vel: 1.0,
            max_angular_vel: -1.0,
            ..TrackingConfig::default()
        };
        assert!(matches!(config.geometry(), Err(NavigationError::InvalidVelocityBounds(_))));
    }

    #[test]
    fn test_rejects_degenerate_lateral_sector() {
        let config = TrackingConfig { start_deg_lateral: 0.0, ..TrackingConfig::default() };
        assert!(matches!(config.geometry(), Err(NavigationError::InvalidLateralSector(_))));

        let config = TrackingConfig {
            start_deg_lateral: 60.0,
            end_deg_lateral: 30.0,
            ..TrackingConfig::default()
        };
        assert!(matches!(config.geometry(), Err(NavigationError::InvalidLateralSector(_))));
    }

    #[test]
    fn test_rejects_stop_ray_threshold_outside_unit_interval() {
        let config = TrackingConfig { stop_ray_th: 1.5, ..TrackingConfig::default() };
        assert!(matches!(config.geometry(), Err(NavigationError::InvalidStopRayThreshold(_))));
    }
}
