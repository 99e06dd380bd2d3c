//! This module defines the error types used by the `wall-navigation` crate.

#![warn(missing_docs)]

use wall_kinematics::KinematicsError;

/// Error type for navigation setup.
///
/// The control loop itself never fails; these errors are only produced while
/// validating a configuration at startup or rejecting a malformed scan at ingestion.
#[derive(Debug, PartialEq)]
pub enum NavigationError {
    /// The PID sample period is zero or negative.
    InvalidSamplingRate(&'static str),
    /// A distance tunable is out of range.
    InvalidDistance(&'static str),
    /// The lateral sector bounds cannot be used.
    InvalidLateralSector(&'static str),
    /// The stop-ray threshold is not a fraction.
    InvalidStopRayThreshold(&'static str),
    /// The velocity bounds are inconsistent.
    InvalidVelocityBounds(KinematicsError),
    /// An inbound scan carries unusable metadata.
    InvalidScan(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::InvalidSamplingRate(msg) => write!(f, "Invalid sampling rate: {}", msg),
            NavigationError::InvalidDistance(msg) => write!(f, "Invalid distance: {}", msg),
            NavigationError::InvalidLateralSector(msg) => write!(f, "Invalid lateral sector: {}", msg),
            NavigationError::InvalidStopRayThreshold(msg) => {
                write!(f, "Invalid stop ray threshold: {}", msg)
            }
            NavigationError::InvalidVelocityBounds(err) => write!(f, "Invalid velocity bounds: {}", err),
            NavigationError::InvalidScan(msg) => write!(f, "Invalid scan: {}", msg),
        }
    }
}

impl core::error::Error for NavigationError {}

impl From<KinematicsError> for NavigationError {
    fn from(err: KinematicsError) -> Self {
        NavigationError::InvalidVelocityBounds(err)
    }
}
