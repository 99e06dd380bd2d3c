//! Simulated laser and drive: a sensor thread feeding scans and fix quality
//! into the tracker, and an actuation thread applying its velocity commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::Rng;
use spin_sleep::SpinSleeper;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};
use wall_kinematics::{Pose, Twist};
use wall_navigation::{NavigationError, PositionQuality, ScanFrame, WallTracker};

use crate::config::SimulationConfig;
use crate::world::World;

const ACTUATION_PERIOD: Duration = Duration::from_millis(1);

/// Ray-casting laser over a [`World`].
pub struct Laser {
    world: World,
    config: SimulationConfig,
}

impl Laser {
    pub fn new(world: World, config: SimulationConfig) -> Self {
        Self { world, config }
    }

    fn samples(&self) -> usize {
        (self.config.fov_deg / self.config.angular_resolution_deg).floor() as usize + 1
    }

    /// Sweep the field of view from `pose`, with dropouts and range noise.
    pub fn scan<R: Rng + ?Sized>(&self, pose: &Pose, rng: &mut R) -> Result<ScanFrame, NavigationError> {
        let cfg = &self.config;
        let angle_min = -cfg.fov_deg / 2.0;
        let ranges = (0..self.samples())
            .map(|i| {
                let bearing = (angle_min + i as f32 * cfg.angular_resolution_deg).to_radians();
                if rng.random_bool(cfg.dropout_probability) {
                    return f32::INFINITY;
                }
                match self.world.cast(pose, bearing) {
                    Some(r) if r <= cfg.range_max => {
                        if cfg.range_noise > 0.0 {
                            r + rng.random_range(-cfg.range_noise..=cfg.range_noise)
                        } else {
                            r
                        }
                    }
                    _ => f32::INFINITY,
                }
            })
            .collect();
        ScanFrame::from_degrees(angle_min, cfg.angular_resolution_deg, cfg.range_min, cfg.range_max, ranges)
    }

    /// Fix quality at `pose`: none inside the corridor, the configured class past its end.
    pub fn quality_at(&self, pose: &Pose) -> PositionQuality {
        if pose.x > self.config.corridor_length {
            self.config.outdoor_quality
        } else {
            PositionQuality::Unknown
        }
    }
}

/// Running simulation threads.
pub struct Simulation {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Simulation {
    pub fn spawn(tracker: Arc<WallTracker>, config: SimulationConfig) -> anyhow::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let last_applied: Arc<RwLock<Twist>> = Arc::default();
        let laser = Laser::new(World::corridor(&config), config.clone());
        let period = Duration::from_secs_f32(1.0 / config.scan_rate_hz);

        info!("Spawning sensor thread...");
        let sensor = std::thread::Builder::new().name("sensor".into()).spawn({
            let tracker = Arc::clone(&tracker);
            let running = Arc::clone(&running);
            let last_applied = Arc::clone(&last_applied);
            move || {
                info!(?period, "Sensor thread started.");
                let sleeper = SpinSleeper::new(100_000);
                let mut rng = rand::rng();
                let mut pose = Pose::default();
                let mut last_tick = Instant::now();
                while running.load(Ordering::Relaxed) {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    let applied = *last_applied.read();
                    match pose.integrate(applied, dt) {
                        Ok(next) => pose = next,
                        Err(e) => warn!(%e, "pose integration skipped"),
                    }
                    debug!(%pose, "sensor tick");

                    tracker.handle_position_quality(laser.quality_at(&pose));
                    match laser.scan(&pose, &mut rng) {
                        Ok(frame) => tracker.handle_scan(frame),
                        Err(e) => warn!(%e, "dropping malformed scan"),
                    }
                    sleeper.sleep(period);
                }
                info!(%pose, "Sensor thread stopped.");
            }
        })?;

        info!("Spawning actuation thread...");
        let actuation = std::thread::Builder::new().name("actuation".into()).spawn({
            let mut cmd_rx = tracker.outputs().cmd_vel.subscribe();
            let running = Arc::clone(&running);
            move || {
                info!("Actuation thread started.");
                let sleeper = SpinSleeper::new(10_000);
                while running.load(Ordering::Relaxed) {
                    match cmd_rx.try_recv() {
                        Ok(twist) => {
                            debug!(%twist, "applying command");
                            *last_applied.write() = *twist;
                        }
                        Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "actuation fell behind cmd_vel"),
                        Err(TryRecvError::Closed) => break,
                        Err(TryRecvError::Empty) => sleeper.sleep(ACTUATION_PERIOD),
                    }
                }
                info!("Actuation thread stopped.");
            }
        })?;

        Ok(Self {
            running,
            threads: vec![sensor, actuation],
        })
    }

    /// Stop and join the simulation threads.
    pub fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        for thread in self.threads {
            if thread.join().is_err() {
                warn!("simulation thread panicked");
            }
        }
    }
}
