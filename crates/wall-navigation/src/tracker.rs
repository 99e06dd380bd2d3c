use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::blackboard::{Blackboard, set_mode, snapshot, store_scan};
use crate::config::TrackingConfig;
use crate::decision::DecisionEngine;
use crate::error::NavigationError;
use crate::mode::{Mode, PositionQuality};
use crate::scan::ScanFrame;
use crate::task::{CancelToken, ControlTask, GoalHandle, Outputs};

const TOPIC_CAPACITY: usize = 16;

/// The wall-tracking node: sensor ingestion, outbound topics and the goal protocol.
///
/// Ingestion methods are cheap and non-blocking and may be called from any
/// thread. Goals run on the tokio runtime that accepted them.
pub struct WallTracker {
    engine: Arc<DecisionEngine>,
    blackboard: Blackboard,
    outputs: Outputs,
    scan_seq: watch::Sender<u64>,
    shutdown: watch::Sender<bool>,
    active: Mutex<Option<CancelToken>>,
    next_goal_id: AtomicU64,
}

impl WallTracker {
    /// # Errors
    ///
    /// Returns the configuration validation error, if any.
    pub fn new(config: TrackingConfig) -> Result<Self, NavigationError> {
        let engine = DecisionEngine::new(config)?;
        let geometry = engine.geometry();
        info!(
            front_wall_deg = geometry.front_wall_deg,
            front_left_deg = geometry.front_left_deg,
            "derived guard angles"
        );
        Ok(Self {
            engine: Arc::new(engine),
            blackboard: Arc::default(),
            outputs: Outputs::new(TOPIC_CAPACITY),
            scan_seq: watch::channel(0).0,
            shutdown: watch::channel(false).0,
            active: Mutex::new(None),
            next_goal_id: AtomicU64::new(1),
        })
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn blackboard(&self) -> Blackboard {
        Arc::clone(&self.blackboard)
    }

    /// Replace the current scan, update the open-place latch and publish it.
    pub fn handle_scan(&self, frame: ScanFrame) {
        let score = self.engine.open_place_score(&frame);
        let (first, arrived) = store_scan(&self.blackboard, frame, score);
        if first {
            info!("initialized scan data");
        }
        self.outputs.open_place_arrived.publish(arrived);
        self.scan_seq.send_modify(|seq| *seq += 1);
    }

    /// Switch mode from the latest position-fix quality.
    pub fn handle_position_quality(&self, quality: PositionQuality) {
        let mode = Mode::from(quality);
        let previous = set_mode(&self.blackboard, mode);
        if previous != mode {
            info!(?quality, %mode, "mode changed");
        }
    }

    /// Accept a goal and start its control task. A goal still running is canceled first.
    pub fn accept_goal(&self) -> GoalHandle {
        let id = self.next_goal_id.fetch_add(1, Ordering::Relaxed);
        let (task, handle, token, result) = ControlTask::new(
            id,
            Arc::clone(&self.engine),
            self.blackboard(),
            self.outputs.clone(),
            self.scan_seq.subscribe(),
            self.shutdown.subscribe(),
        );
        if let Some(previous) = self.active.lock().replace(token) {
            if !previous.is_cancelled() {
                warn!(goal_id = id, "preempting the running goal");
                previous.cancel();
            }
        }
        info!(goal_id = id, initialized = snapshot(&self.blackboard).initialized(), "goal accepted");
        task.spawn(result);
        handle
    }

    /// Signal process shutdown; running goals finish as succeeded.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Detection;
    use crate::task::{TaskState, TaskStatus};
    use std::time::Duration;
    use tokio::time::Instant;
    use wall_kinematics::{Twist, deg_to_rad};

    const EPSILON: f32 = 1e-5;

    fn config() -> TrackingConfig {
        TrackingConfig {
            max_linear_vel: 0.4,
            max_angular_vel: 1.0,
            min_angular_vel: -1.0,
            distance_from_wall: 0.5,
            distance_to_stop: 0.5,
            sampling_rate: 0.1,
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            stop_ray_th: 0.5,
            open_place_distance: 3.0,
            ..TrackingConfig::default()
        }
    }

    fn scan(f: impl Fn(f32) -> f32) -> ScanFrame {
        let ranges = (0..181).map(|i| f(-90.0 + i as f32)).collect();
        ScanFrame::from_degrees(-90.0, 1.0, 0.05, 20.0, ranges).unwrap()
    }

    fn corridor() -> ScanFrame {
        scan(|deg| if deg > 1.0 { 0.5 / deg_to_rad(deg).sin() } else { f32::INFINITY })
    }

    fn open_field() -> ScanFrame {
        scan(|_| 10.0)
    }

    fn blind() -> ScanFrame {
        scan(|_| f32::NAN)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_scan() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut cmd_rx = tracker.outputs().cmd_vel.subscribe();
        let goal = tracker.accept_goal();
        goal.cancel();
        let outcome = goal.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Canceled);
        assert!(!outcome.arrived);
        assert_eq!(*cmd_rx.recv().await.unwrap(), Twist::stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_then_cancel_publishes_stop() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut cmd_rx = tracker.outputs().cmd_vel.subscribe();
        let mut label_rx = tracker.outputs().open_place_detection.subscribe();
        let goal = tracker.accept_goal();

        tracker.handle_scan(corridor());
        let cmd = cmd_rx.recv().await.unwrap();
        assert_eq!(cmd.vx, 0.4);
        assert_eq!(*label_rx.recv().await.unwrap(), Detection::Indoor);
        assert_eq!(goal.state(), TaskState::Executing);

        goal.cancel();
        let mut feedback = goal.feedback();
        let outcome = goal.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Canceled);
        assert_eq!(*cmd_rx.recv().await.unwrap(), Twist::stop());
        assert!(!*feedback.borrow_and_update());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_turn_holds_before_cancel_takes_effect() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut cmd_rx = tracker.outputs().cmd_vel.subscribe();
        let goal = tracker.accept_goal();

        tracker.handle_scan(scan(|_| 0.2));
        let cmd = cmd_rx.recv().await.unwrap();
        assert!((cmd.vx - 0.1).abs() < EPSILON);
        assert!((cmd.wz - deg_to_rad(-45.0)).abs() < EPSILON);

        let started = Instant::now();
        goal.cancel();
        let outcome = goal.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Canceled);
        assert!(started.elapsed() >= Duration::from_millis(1900));
        assert_eq!(*cmd_rx.recv().await.unwrap(), Twist::stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_publishes_open_place_flag() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut arrived_rx = tracker.outputs().open_place_arrived.subscribe();

        tracker.handle_scan(open_field());
        assert!(!*arrived_rx.recv().await.unwrap());

        tracker.handle_position_quality(PositionQuality::Known);
        tracker.handle_scan(open_field());
        assert!(*arrived_rx.recv().await.unwrap());

        tracker.handle_position_quality(PositionQuality::Unknown);
        tracker.handle_scan(open_field());
        assert!(!*arrived_rx.recv().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blind_scan_never_reports_open_place() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut arrived_rx = tracker.outputs().open_place_arrived.subscribe();
        let mut label_rx = tracker.outputs().open_place_detection.subscribe();
        tracker.handle_position_quality(PositionQuality::Known);
        let goal = tracker.accept_goal();

        tracker.handle_scan(blind());
        assert!(!*arrived_rx.recv().await.unwrap());
        assert_eq!(*label_rx.recv().await.unwrap(), Detection::NotOpenPlace);

        goal.cancel();
        assert_eq!(goal.outcome().await.unwrap().status, TaskStatus::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_succeeds_with_arrived_flag() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut label_rx = tracker.outputs().open_place_detection.subscribe();
        tracker.handle_position_quality(PositionQuality::Known);
        let goal = tracker.accept_goal();

        tracker.handle_scan(open_field());
        assert_eq!(*label_rx.recv().await.unwrap(), Detection::Front);

        let mut feedback = goal.feedback();
        feedback.wait_for(|arrived| *arrived).await.unwrap();
        assert!(goal.arrived());

        tracker.shutdown();
        let outcome = goal.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Succeeded);
        assert!(outcome.arrived);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_then_shutdown_still_stops() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut cmd_rx = tracker.outputs().cmd_vel.subscribe();
        let goal = tracker.accept_goal();

        tracker.handle_scan(corridor());
        assert_eq!(cmd_rx.recv().await.unwrap().vx, 0.4);

        goal.cancel();
        tracker.shutdown();
        let outcome = goal.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Canceled);
        assert!(!outcome.arrived);
        assert_eq!(*cmd_rx.recv().await.unwrap(), Twist::stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrival_does_not_end_goal() {
        let tracker = WallTracker::new(config()).unwrap();
        let mut label_rx = tracker.outputs().open_place_detection.subscribe();
        tracker.handle_position_quality(PositionQuality::Known);
        let goal = tracker.accept_goal();

        for _ in 0..3 {
            tracker.handle_scan(open_field());
            assert_eq!(*label_rx.recv().await.unwrap(), Detection::Front);
        }
        assert_eq!(goal.state(), TaskState::Executing);
        goal.cancel();
        assert_eq!(goal.outcome().await.unwrap().status, TaskStatus::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_goal_preempts_running_one() {
        let tracker = WallTracker::new(config()).unwrap();
        let first = tracker.accept_goal();
        let second = tracker.accept_goal();
        assert_ne!(first.id(), second.id());

        let outcome = first.outcome().await.unwrap();
        assert_eq!(outcome.status, TaskStatus::Canceled);

        second.cancel();
        assert_eq!(second.outcome().await.unwrap().status, TaskStatus::Canceled);
    }
}
