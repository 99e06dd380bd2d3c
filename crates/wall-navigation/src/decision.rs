//! One wall-tracking evaluation cycle.
//!
//! A cycle first gathers [`Observations`] from the scan, then [`DecisionEngine::decide`]
//! picks a command and a detection label from them:
//!
//! 1. a blocked front triggers the evasive turn and a dwell, in either mode;
//! 2. indoors, a corroborated gap in the wall is driven across straight,
//!    otherwise the PID holds the standoff;
//! 3. outdoors, the most open of three forward sectors is headed for, falling
//!    back to the indoor behaviour when none is open enough.

use core::fmt;
use std::time::Duration;

use tracing::debug;
use wall_kinematics::{Twist, deg_to_rad};

use crate::analyzer::ScanAnalyzer;
use crate::config::{TrackingConfig, TrackingGeometry};
use crate::error::NavigationError;
use crate::mode::Mode;
use crate::pid::LateralPid;
use crate::scan::ScanFrame;

/// Range under which the front-left check bearing is considered walled.
pub const FRONT_LEFT_WALL_DISTANCE: f32 = 1.87;
/// Pause after issuing the evasive turn.
pub const EMERGENCY_DWELL: Duration = Duration::from_secs(2);
/// Turn rate of the evasive manoeuvre (degrees per second, right turn).
pub const EMERGENCY_TURN_DEG: f32 = -45.0;
/// Openness a forward sector needs to be a candidate heading.
pub const SECTOR_MIN_SCORE: f32 = 0.7;
/// Sector examined for arrival at an open place (degrees).
pub const OPEN_PLACE_SECTOR: (f32, f32) = (-90.0, 90.0);

const FRONT_SECTOR: (f32, f32) = (-15.0, 15.0);
const LEFT_SECTOR: (f32, f32) = (15.0, 45.0);
const RIGHT_SECTOR: (f32, f32) = (-45.0, -15.0);

/// Label published with every cycle.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Indoor wall tracking (also reported during the evasive turn).
    Indoor,
    /// Open space straight ahead.
    Front,
    /// Open space ahead-left.
    Left,
    /// Open space ahead-right.
    Right,
    /// Outdoors, but no sector open enough.
    NotOpenPlace,
}

impl Detection {
    /// The label text as published.
    pub fn as_str(&self) -> &'static str {
        match self {
            Detection::Indoor => "Indoor",
            Detection::Front => "Front",
            Detection::Left => "Left",
            Detection::Right => "Right",
            Detection::NotOpenPlace => "Not open place",
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a cycle reads from the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observations {
    /// Gap at the lateral sector start.
    pub gap_start: bool,
    /// Gap abeam (90°).
    pub gap_end: bool,
    /// Wall present at the front-left check bearing.
    pub front_left_wall: bool,
    /// Reading at the front-left check bearing is corroborated by its neighbours.
    pub front_left_corroborated: bool,
    /// Fraction of frontal rays inside the stop distance.
    pub front_wall_fraction: f32,
    /// Mean range over the lateral sector.
    pub lateral_mean: f32,
    /// Openness of the front, left and right sectors.
    pub sector_scores: [f32; 3],
}

impl Observations {
    /// Run every analyzer query a cycle needs.
    pub fn gather(frame: &ScanFrame, config: &TrackingConfig, geometry: &TrackingGeometry) -> Self {
        let analyzer = ScanAnalyzer::new(frame);
        let gap_th = config.distance_from_wall * 2.0;
        let score = |(start, end): (f32, f32)| analyzer.open_place_check(start, end, config.open_place_distance);
        Self {
            gap_start: analyzer.conflict_check(config.start_deg_lateral, config.distance_from_wall, gap_th),
            gap_end: analyzer.conflict_check(90.0, config.distance_from_wall, gap_th),
            front_left_wall: analyzer.threshold_check(geometry.front_left_deg, FRONT_LEFT_WALL_DISTANCE),
            front_left_corroborated: analyzer.noise_check(geometry.front_left_deg),
            front_wall_fraction: analyzer.front_wall_check(geometry.front_wall_deg, config.distance_to_stop),
            lateral_mean: analyzer.sector_mean_range(config.start_deg_lateral, config.end_deg_lateral),
            sector_scores: [score(FRONT_SECTOR), score(LEFT_SECTOR), score(RIGHT_SECTOR)],
        }
    }

    fn skip_gap(&self) -> bool {
        (self.gap_start || self.gap_end) && !self.front_left_wall && self.front_left_corroborated
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Command after the emission limits.
    pub command: Twist,
    /// Label for the cycle.
    pub detection: Detection,
    /// How long to hold the command before the next cycle.
    pub hold: Option<Duration>,
}

/// Stateless decision maker; the PID state is owned by the caller.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: TrackingConfig,
    geometry: TrackingGeometry,
}

impl DecisionEngine {
    /// Validate `config` and derive the guard geometry.
    ///
    /// # Errors
    ///
    /// Propagates the validation error from [`TrackingConfig::geometry`].
    pub fn new(config: TrackingConfig) -> Result<Self, NavigationError> {
        let geometry = config.geometry()?;
        Ok(Self { config, geometry })
    }

    /// The geometry derived at construction.
    pub fn geometry(&self) -> &TrackingGeometry {
        &self.geometry
    }

    /// A fresh lateral controller for one task run.
    pub fn new_pid(&self) -> LateralPid {
        LateralPid::new(
            self.config.kp,
            self.config.ki,
            self.config.kd,
            self.config.distance_from_wall,
            self.config.sampling_rate,
        )
    }

    /// Apply the emission limits to a requested command.
    pub fn emit(&self, requested: Twist) -> Twist {
        self.geometry.limits.apply(requested)
    }

    /// Openness of the full frontal half-plane, fed to the open-place latch.
    pub fn open_place_score(&self, frame: &ScanFrame) -> f32 {
        let (start, end) = OPEN_PLACE_SECTOR;
        ScanAnalyzer::new(frame).open_place_check(start, end, self.config.open_place_distance)
    }

    /// Run a full cycle on `frame`.
    pub fn evaluate(&self, frame: &ScanFrame, mode: Mode, pid: &mut LateralPid) -> Decision {
        let obs = Observations::gather(frame, &self.config, &self.geometry);
        let decision = self.decide(&obs, mode, pid);
        debug!(
            %mode,
            detection = %decision.detection,
            vx = decision.command.vx,
            wz = decision.command.wz,
            front_wall = obs.front_wall_fraction,
            lateral_mean = obs.lateral_mean,
            "wall tracking cycle"
        );
        decision
    }

    /// Choose a command from already gathered observations.
    pub fn decide(&self, obs: &Observations, mode: Mode, pid: &mut LateralPid) -> Decision {
        let max_linear = self.config.max_linear_vel;

        if obs.front_wall_fraction >= self.config.stop_ray_th {
            return Decision {
                command: self.emit(Twist::new(max_linear / 4.0, deg_to_rad(EMERGENCY_TURN_DEG))),
                detection: Detection::Indoor,
                hold: Some(EMERGENCY_DWELL),
            };
        }

        let (detection, requested) = match mode {
            Mode::Indoor => (Detection::Indoor, self.track_wall(obs, pid)),
            Mode::Outdoor => match best_sector(&obs.sector_scores) {
                Some(0) => (Detection::Front, Twist::new(max_linear, 0.0)),
                Some(1) => (Detection::Left, Twist::new(max_linear, self.config.max_angular_vel)),
                Some(_) => (Detection::Right, Twist::new(max_linear, self.config.min_angular_vel)),
                None => (Detection::NotOpenPlace, self.track_wall(obs, pid)),
            },
        };

        Decision {
            command: self.emit(requested),
            detection,
            hold: None,
        }
    }

    fn track_wall(&self, obs: &Observations, pid: &mut LateralPid) -> Twist {
        let max_linear = self.config.max_linear_vel;
        if obs.skip_gap() {
            Twist::new(max_linear, 0.0)
        } else {
            Twist::new(max_linear, pid.correct(obs.lateral_mean))
        }
    }
}

/// Index of the highest score that reaches [`SECTOR_MIN_SCORE`]; the earlier sector wins ties.
fn best_sector(scores: &[f32; 3]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score < SECTOR_MIN_SCORE {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
