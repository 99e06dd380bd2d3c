use parking_lot::RwLock;
use std::sync::Arc;

use crate::mode::{Mode, OpenPlaceLatch};
use crate::scan::ScanFrame;

/// Sensor-side state written by the ingestion callbacks and read once per cycle by the control task.
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    /// Latest scan; `None` until the first one arrives.
    pub frame: Option<Arc<ScanFrame>>,
    pub mode: Mode,
    pub open_place: OpenPlaceLatch,
}

impl SensorState {
    pub fn initialized(&self) -> bool {
        self.frame.is_some()
    }

    pub fn open_place_reached(&self) -> bool {
        self.open_place.reached()
    }
}

pub type Blackboard = Arc<RwLock<SensorState>>;

pub fn snapshot(bb: &Blackboard) -> SensorState {
    (*bb.read()).clone()
}

/// Replace the frame and feed its openness score to the latch in one step.
///
/// Returns `(first_scan, open_place_reached)`.
pub fn store_scan(bb: &Blackboard, frame: ScanFrame, open_place_score: f32) -> (bool, bool) {
    let mut g = bb.write();
    let first = g.frame.is_none();
    g.frame = Some(Arc::new(frame));
    let mode = g.mode;
    let reached = g.open_place.update(mode, open_place_score);
    (first, reached)
}

/// Returns the previous mode.
pub fn set_mode(bb: &Blackboard, mode: Mode) -> Mode {
    std::mem::replace(&mut bb.write().mode, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ScanFrame {
        ScanFrame::from_degrees(-90.0, 1.0, 0.05, 20.0, vec![1.0; 181]).unwrap()
    }

    #[test]
    fn test_first_scan_initializes() {
        let bb: Blackboard = Arc::default();
        assert!(!snapshot(&bb).initialized());
        assert_eq!(store_scan(&bb, frame(), 0.0), (true, false));
        assert_eq!(store_scan(&bb, frame(), 0.0), (false, false));
        assert!(snapshot(&bb).initialized());
    }

    #[test]
    fn test_latch_follows_mode() {
        let bb: Blackboard = Arc::default();
        assert_eq!(store_scan(&bb, frame(), 0.9), (true, false));
        assert_eq!(set_mode(&bb, Mode::Outdoor), Mode::Indoor);
        assert_eq!(store_scan(&bb, frame(), 0.9), (false, true));
        assert_eq!(store_scan(&bb, frame(), 0.5), (false, true));
        assert!(snapshot(&bb).open_place_reached());
    }
}
