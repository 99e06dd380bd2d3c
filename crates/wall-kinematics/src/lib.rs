#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of planar motion primitives for a wall-tracking robot."]
#![doc = ""]
#![doc = "This crate provides velocity commands and the limits applied before they are emitted,"]
#![doc = "unicycle pose integration, and the guard angles derived once from robot geometry."]

use core::f32::consts::PI;
use core::fmt;
use libm::{atan2f, cosf, sinf, tanf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Convert degrees to radians.
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

/// Convert radians to degrees.
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / PI
}

/// A velocity command expressed in the robot base frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Linear x velocity (m/s).
    pub vx: f32,
    /// Angular z velocity (rad/s), positive turns left.
    pub wz: f32,
}

impl Twist {
    /// Construct a new twist.
    ///
    /// # Arguments
    ///
    /// * `vx`: Linear velocity along the robot's x-axis (m/s).
    /// * `wz`: Angular velocity around the robot's z-axis (rad/s).
    pub const fn new(vx: f32, wz: f32) -> Self {
        Twist { vx, wz }
    }

    /// The zero command used to halt the robot.
    pub const fn stop() -> Self {
        Twist { vx: 0.0, wz: 0.0 }
    }
}

impl fmt::Display for Twist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(vx: {:.2} m/s, ωz: {:.2} rad/s)", self.vx, self.wz)
    }
}

/// Bounds applied to every command before it leaves the controller.
///
/// Linear velocity only has an upper bound: negative requests pass through
/// unchanged. Angular velocity is held inside `[min_angular, max_angular]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLimits {
    max_linear: f32,
    min_angular: f32,
    max_angular: f32,
}

impl VelocityLimits {
    /// Construct a new set of limits.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidAngularBounds)` if `min_angular > max_angular`.
    pub fn new(max_linear: f32, min_angular: f32, max_angular: f32) -> Result<Self, KinematicsError> {
        if min_angular > max_angular {
            return Err(KinematicsError::InvalidAngularBounds(
                "min_angular must not exceed max_angular",
            ));
        }
        Ok(VelocityLimits {
            max_linear,
            min_angular,
            max_angular,
        })
    }

    /// Upper bound on linear velocity (m/s).
    pub fn max_linear(&self) -> f32 {
        self.max_linear
    }

    /// Lower bound on angular velocity (rad/s), the fastest right turn.
    pub fn min_angular(&self) -> f32 {
        self.min_angular
    }

    /// Upper bound on angular velocity (rad/s), the fastest left turn.
    pub fn max_angular(&self) -> f32 {
        self.max_angular
    }

    /// Apply the limits to a requested command.
    pub fn apply(&self, requested: Twist) -> Twist {
        Twist {
            vx: requested.vx.min(self.max_linear),
            wz: requested.wz.min(self.max_angular).max(self.min_angular),
        }
    }
}

/// A 2‑D pose `(x, y, θ)` in meters and radians.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position (m).
    pub x: f32,
    /// World‑frame y position (m).
    pub y: f32,
    /// Heading (rad), normalized to `[-PI, PI)`.
    pub theta: f32,
}

impl Pose {
    /// Construct a new pose.
    pub const fn new(x: f32, y: f32, theta: f32) -> Self {
        Pose { x, y, theta }
    }

    /// Normalize an angle to be within `[-PI, PI)`.
    pub fn normalize_angle(angle: f32) -> f32 {
        let a = angle % (2.0 * PI);
        if a >= PI {
            a - 2.0 * PI
        } else if a < -PI {
            a + 2.0 * PI
        } else {
            a
        }
    }

    /// Advance the pose by applying `twist` for `dt` seconds (unicycle model).
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NegativeTimeDelta)` if `dt` is negative.
    pub fn integrate(&self, twist: Twist, dt: f32) -> Result<Pose, KinematicsError> {
        if dt < 0.0 {
            return Err(KinematicsError::NegativeTimeDelta("must be non-negative"));
        }
        Ok(Pose {
            x: self.x + twist.vx * cosf(self.theta) * dt,
            y: self.y + twist.vx * sinf(self.theta) * dt,
            theta: Pose::normalize_angle(self.theta + twist.wz * dt),
        })
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// Bearing (degrees) of the robot's right edge at the stop distance.
///
/// Rays between this bearing and straight ahead sweep the corridor the chassis
/// will occupy. The result is negative because the right side is negative.
///
/// # Arguments
///
/// * `wheel_separation`: Distance between the drive wheels (m).
/// * `distance_to_stop`: Range at which a frontal obstacle forces an evasive turn (m).
pub fn front_wall_check_angle(wheel_separation: f32, distance_to_stop: f32) -> f32 {
    rad_to_deg(atan2f(-wheel_separation / 2.0, distance_to_stop))
}

/// Bearing (degrees) at which the tracked wall should reappear past a gap.
///
/// The wall at `distance_from_wall` crosses the lateral sector start ray at a
/// forward offset of `distance_from_wall / tan(start)`; the check point sits
/// `distance_to_skip` further ahead of that.
///
/// # Arguments
///
/// * `distance_from_wall`: Target standoff from the tracked wall (m).
/// * `distance_to_skip`: Extra forward margin beyond the lateral sector (m).
/// * `start_deg_lateral`: Start of the lateral sector (degrees, left positive).
pub fn front_left_check_angle(distance_from_wall: f32, distance_to_skip: f32, start_deg_lateral: f32) -> f32 {
    let y = distance_from_wall;
    let x = distance_to_skip + distance_from_wall / tanf(deg_to_rad(start_deg_lateral));
    rad_to_deg(atan2f(y, x))
}
