#![warn(missing_docs)]

//! Error types for the kinematics library.

use core::fmt;

/// Errors that can occur when building limits or integrating motion.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// The angular velocity bounds are inverted.
    InvalidAngularBounds(&'static str),
    /// A negative time delta was used for pose integration.
    NegativeTimeDelta(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidAngularBounds(msg) => write!(f, "Invalid angular bounds: {}", msg),
            KinematicsError::NegativeTimeDelta(msg) => write!(f, "Negative time delta: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
