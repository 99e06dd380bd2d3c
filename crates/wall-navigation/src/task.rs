//! Goal execution: the cancellable control loop and the requester's handle to it.
//!
//! A goal is always accepted. Its [`ControlTask`] runs on its own tokio task,
//! paced by scan arrivals, until the requester cancels it (a stop command is
//! published and the outcome is [`TaskStatus::Canceled`]) or the tracker shuts
//! down (the outcome is [`TaskStatus::Succeeded`]). Reaching an open place is
//! reported through feedback only and does not end the goal.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};
use wall_kinematics::Twist;

use crate::blackboard::{Blackboard, snapshot};
use crate::decision::{Detection, DecisionEngine};
use crate::pid::LateralPid;
use crate::bus::Topic;

/// Lifecycle of one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Executing,
    Succeeded,
    Canceled,
}

/// How a goal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Canceled,
}

/// Terminal result delivered to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    /// Whether the open place had been reached; always false for a canceled goal.
    pub arrived: bool,
}

/// Outbound topics shared by the ingestion side and the control task.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub cmd_vel: Topic<Twist>,
    pub open_place_arrived: Topic<bool>,
    pub open_place_detection: Topic<Detection>,
}

impl Outputs {
    pub fn new(capacity: usize) -> Self {
        Self {
            cmd_vel: Topic::new("cmd_vel", capacity),
            open_place_arrived: Topic::new("open_place_arrived", capacity),
            open_place_detection: Topic::new("open_place_detection", capacity),
        }
    }
}

/// Cooperative cancellation flag, cloned between the tracker and the requester.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// The requester's side of an accepted goal.
#[derive(Debug)]
pub struct GoalHandle {
    id: u64,
    cancel: CancelToken,
    feedback: watch::Receiver<bool>,
    state: watch::Receiver<TaskState>,
    result: oneshot::Receiver<TaskOutcome>,
}

impl GoalHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the task to stop; it acts on this at the start of its next iteration.
    pub fn cancel(&self) {
        info!(goal_id = self.id, "Received request to cancel goal");
        self.cancel.cancel();
    }

    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Latest progress feedback: the open-place flag.
    pub fn arrived(&self) -> bool {
        *self.feedback.borrow()
    }

    /// A receiver that is notified on every feedback update.
    pub fn feedback(&self) -> watch::Receiver<bool> {
        self.feedback.clone()
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> anyhow::Result<TaskOutcome> {
        self.result
            .await
            .with_context(|| format!("control task for goal {} ended without an outcome", self.id))
    }
}

/// One goal's control loop. Owns the PID state for the duration of the goal.
pub struct ControlTask {
    id: u64,
    engine: Arc<DecisionEngine>,
    blackboard: Blackboard,
    outputs: Outputs,
    pid: LateralPid,
    scans: watch::Receiver<u64>,
    cancel: watch::Receiver<bool>,
    shutdown: watch::Receiver<bool>,
    feedback: watch::Sender<bool>,
    state: watch::Sender<TaskState>,
}

impl ControlTask {
    /// Build a pending task and the handle that controls it.
    pub fn new(
        id: u64,
        engine: Arc<DecisionEngine>,
        blackboard: Blackboard,
        outputs: Outputs,
        scans: watch::Receiver<u64>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, GoalHandle, CancelToken, oneshot::Sender<TaskOutcome>) {
        let (cancel_token, cancel) = CancelToken::new();
        let (feedback_tx, feedback_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(TaskState::Pending);
        let (result_tx, result_rx) = oneshot::channel();
        let pid = engine.new_pid();
        let task = Self {
            id,
            engine,
            blackboard,
            outputs,
            pid,
            scans,
            cancel,
            shutdown,
            feedback: feedback_tx,
            state: state_tx,
        };
        let handle = GoalHandle {
            id,
            cancel: cancel_token.clone(),
            feedback: feedback_rx,
            state: state_rx,
            result: result_rx,
        };
        (task, handle, cancel_token, result_tx)
    }

    /// Spawn the task on the current runtime, delivering its outcome on `result`.
    pub fn spawn(self, result: oneshot::Sender<TaskOutcome>) {
        tokio::spawn(async move {
            let outcome = self.run().await;
            // The requester may have dropped its handle.
            let _ = result.send(outcome);
        });
    }

    /// Run until canceled or shut down.
    pub async fn run(mut self) -> TaskOutcome {
        self.pid.reset();
        self.feedback.send_replace(false);
        self.state.send_replace(TaskState::Executing);
        info!(goal_id = self.id, "EXECUTE");

        loop {
            let source_alive = tokio::select! {
                biased;
                _ = raised(&mut self.cancel, false) => true,
                _ = raised(&mut self.shutdown, true) => false,
                changed = self.scans.changed() => changed.is_ok(),
            };
            // Cancel takes precedence over shutdown.
            if *self.cancel.borrow() {
                self.outputs.cmd_vel.publish(self.engine.emit(Twist::stop()));
                self.state.send_replace(TaskState::Canceled);
                info!(goal_id = self.id, "Goal Canceled");
                return TaskOutcome {
                    status: TaskStatus::Canceled,
                    arrived: false,
                };
            }

            if !source_alive || *self.shutdown.borrow() {
                break;
            }

            let sensors = snapshot(&self.blackboard);
            self.feedback.send_replace(sensors.open_place_reached());

            let Some(frame) = sensors.frame else {
                continue;
            };
            let decision = self.engine.evaluate(&frame, sensors.mode, &mut self.pid);
            self.outputs.cmd_vel.publish(decision.command);
            self.outputs.open_place_detection.publish(decision.detection);

            if let Some(hold) = decision.hold {
                debug!(goal_id = self.id, ?hold, "front blocked, holding evasive turn");
                tokio::time::sleep(hold).await;
            }
        }

        let arrived = snapshot(&self.blackboard).open_place_reached();
        self.state.send_replace(TaskState::Succeeded);
        info!(goal_id = self.id, arrived, "Goal Succeeded");
        TaskOutcome {
            status: TaskStatus::Succeeded,
            arrived,
        }
    }
}

/// Resolves once `flag` reads true. A closed channel counts as raised only if `closed_is_raised`.
async fn raised(flag: &mut watch::Receiver<bool>, closed_is_raised: bool) {
    loop {
        if *flag.borrow_and_update() {
            return;
        }
        if flag.changed().await.is_err() {
            if closed_is_raised {
                return;
            }
            std::future::pending::<()>().await;
        }
    }
}
