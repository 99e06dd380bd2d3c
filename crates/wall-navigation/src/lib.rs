//! Reactive wall tracking from a planar laser scan.
//!
//! Scans and position-fix quality are pushed into a [`WallTracker`]; an
//! accepted goal runs a [`ControlTask`] that evaluates the [`DecisionEngine`]
//! on every new scan and publishes velocity commands and detection labels on
//! the tracker's [`Outputs`].

pub mod analyzer;
pub mod blackboard;
pub mod bus;
pub mod config;
pub mod decision;
pub mod error;
pub mod mode;
pub mod pid;
pub mod scan;
pub mod task;
pub mod tracker;

pub use analyzer::ScanAnalyzer;
pub use config::{TrackingConfig, TrackingGeometry};
pub use decision::{Decision, DecisionEngine, Detection, Observations};
pub use error::NavigationError;
pub use mode::{Mode, OpenPlaceLatch, PositionQuality};
pub use pid::LateralPid;
pub use scan::ScanFrame;
pub use task::{ControlTask, GoalHandle, Outputs, TaskOutcome, TaskState, TaskStatus};
pub use tracker::WallTracker;
