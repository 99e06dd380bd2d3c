use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};
use wall_navigation::{PositionQuality, TrackingConfig};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Synthetic world and sensor used in place of a real robot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub scan_rate_hz: f32,
    pub fov_deg: f32,
    pub angular_resolution_deg: f32,
    pub range_min: f32,
    pub range_max: f32,
    /// Probability that a ray reports no return.
    pub dropout_probability: f64,
    /// Uniform range noise amplitude (m).
    pub range_noise: f32,
    /// Lateral distance from the start pose to the left wall (m).
    pub wall_offset: f32,
    pub corridor_width: f32,
    /// The corridor opens onto an unobstructed area past this x (m); fixes become available there.
    pub corridor_length: f32,
    pub doorway_start: f32,
    pub doorway_width: f32,
    /// Side of the walled square the corridor opens onto (m).
    pub open_area_size: f32,
    /// Fix quality reported once past the corridor end.
    pub outdoor_quality: PositionQuality,
    /// Stop after this many seconds; run until Ctrl-C when absent.
    pub duration_secs: Option<f32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scan_rate_hz: 10.0,
            fov_deg: 270.0,
            angular_resolution_deg: 1.0,
            range_min: 0.05,
            range_max: 12.0,
            dropout_probability: 0.01,
            range_noise: 0.01,
            wall_offset: 0.6,
            corridor_width: 2.0,
            corridor_length: 10.0,
            doorway_start: 4.0,
            doorway_width: 0.9,
            open_area_size: 8.0,
            outdoor_quality: PositionQuality::Known,
            duration_secs: Some(40.0),
        }
    }
}

impl SimulationConfig {
    /// Reject settings the simulated sensor or world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Message(format!("simulation: {msg}")));
        if !(self.scan_rate_hz.is_finite() && self.scan_rate_hz > 0.0) {
            return invalid("scan_rate_hz must be positive");
        }
        if !(self.angular_resolution_deg.is_finite() && self.angular_resolution_deg > 0.0) {
            return invalid("angular_resolution_deg must be positive");
        }
        if !(self.fov_deg > 0.0 && self.fov_deg <= 360.0) {
            return invalid("fov_deg must lie in (0, 360]");
        }
        if !(self.range_min >= 0.0 && self.range_max > self.range_min) {
            return invalid("range window must be non-empty and non-negative");
        }
        if !(0.0..=1.0).contains(&self.dropout_probability) {
            return invalid("dropout_probability must lie in [0, 1]");
        }
        if !(self.range_noise >= 0.0) {
            return invalid("range_noise must be non-negative");
        }
        if !(self.wall_offset > 0.0 && self.corridor_width > self.wall_offset) {
            return invalid("the start pose must lie strictly inside the corridor");
        }
        if !(self.corridor_length > 0.0 && self.doorway_width >= 0.0) {
            return invalid("corridor_length must be positive and doorway_width non-negative");
        }
        if !(self.open_area_size / 2.0 > self.wall_offset.max(self.corridor_width - self.wall_offset)) {
            return invalid("open_area_size must enclose the corridor mouth");
        }
        if self.duration_secs.is_some_and(|secs| !(secs.is_finite() && secs >= 0.0)) {
            return invalid("duration_secs must be non-negative");
        }
        Ok(())
    }
}

/// Load `path` (TOML, required) with `WALL_TRACKING__SECTION__KEY` environment overrides.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true))
        .add_source(Environment::with_prefix("WALL_TRACKING").separator("__"))
        .build()
        .and_then(|c| c.try_deserialize::<AppConfig>())
        .and_then(|config| config.simulation.validate().map(|()| config));

    match settings {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
