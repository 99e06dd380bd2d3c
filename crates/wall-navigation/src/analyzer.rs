//! Angular-sector queries over a [`ScanFrame`].
//!
//! Every query is total: an empty sector, a bearing outside the field of view
//! or a sector full of no-returns yields a neutral answer (`0.0` for
//! fractions, `false` for wall checks) instead of an error. No-returns always
//! read as "far", never as zero.

use wall_kinematics::deg_to_rad;

use crate::scan::ScanFrame;

/// Half-width of the window examined by [`ScanAnalyzer::front_wall_check`] (degrees).
pub const FRONT_WALL_HALF_WIDTH_DEG: f32 = 10.0;
/// Half-width of the neighbourhood that sets the expected wall distance for gap detection (degrees).
pub const GAP_WINDOW_DEG: f32 = 10.0;
/// Samples examined on each side of a bearing when corroborating a reading.
pub const NOISE_NEIGHBORS: usize = 2;
/// Neighbours that must agree with the centre reading for it to be trusted.
pub const NOISE_MIN_SUPPORT: usize = 2;
/// Relative difference under which two finite readings agree.
pub const NOISE_RELATIVE_TOLERANCE: f32 = 0.25;

/// Stateless view answering sector questions about one frame.
#[derive(Debug, Clone, Copy)]
pub struct ScanAnalyzer<'a> {
    frame: &'a ScanFrame,
}

impl<'a> ScanAnalyzer<'a> {
    /// Wrap a frame.
    pub fn new(frame: &'a ScanFrame) -> Self {
        Self { frame }
    }

    /// Mean of the valid ranges in `[start_deg, end_deg]`.
    ///
    /// No-returns are left out of the mean. With no valid sample the sector is
    /// open, so the sensor's maximum range is returned.
    pub fn sector_mean_range(&self, start_deg: f32, end_deg: f32) -> f32 {
        let (sum, count) = self
            .frame
            .sector(start_deg, end_deg)
            .filter_map(|i| self.frame.range(i))
            .fold((0.0_f32, 0_usize), |(sum, count), r| (sum + r, count + 1));
        if count == 0 {
            self.frame.range_max()
        } else {
            sum / count as f32
        }
    }

    /// Range of the sample nearest to `deg`, `None` for a no-return or a bearing outside the sweep.
    pub fn range_at_angle(&self, deg: f32) -> Option<f32> {
        self.frame.nearest_index(deg).and_then(|i| self.frame.range(i))
    }

    /// Whether a wall is closer than `distance` in the exact direction `deg`.
    pub fn threshold_check(&self, deg: f32, distance: f32) -> bool {
        self.range_at_angle(deg).is_some_and(|r| r < distance)
    }

    /// Fraction of rays within [`FRONT_WALL_HALF_WIDTH_DEG`] of `center_deg`
    /// that return closer than `stop_distance`.
    pub fn front_wall_check(&self, center_deg: f32, stop_distance: f32) -> f32 {
        let window = self
            .frame
            .sector(center_deg - FRONT_WALL_HALF_WIDTH_DEG, center_deg + FRONT_WALL_HALF_WIDTH_DEG);
        let total = window.len();
        if total == 0 {
            return 0.0;
        }
        let blocked = window
            .filter(|&i| self.frame.range(i).is_some_and(|r| r < stop_distance))
            .count();
        blocked as f32 / total as f32
    }

    /// Whether the wall is interrupted at `deg`.
    ///
    /// The expected wall distance is the smaller of two references: where a
    /// straight wall held at `standoff` on the positive side would be seen
    /// (`standoff / sin(deg)`), and the closest valid return within
    /// [`GAP_WINDOW_DEG`] on either side of `deg`. A gap is reported when the
    /// reading at `deg` lies at least `gap_threshold` beyond it; a no-return
    /// at `deg` counts as infinitely far. An opening wider than the window is
    /// still caught by the standoff reference. A frame without a single valid
    /// return shows no wall at all and never reports a gap.
    pub fn conflict_check(&self, deg: f32, standoff: f32, gap_threshold: f32) -> bool {
        let Some(center) = self.frame.nearest_index(deg) else {
            return false;
        };
        if !(0..self.frame.len()).any(|i| self.frame.range(i).is_some()) {
            return false;
        }
        let sin = deg_to_rad(deg).sin();
        let along_wall = if sin > f32::EPSILON { standoff / sin } else { f32::INFINITY };
        let expected = self
            .frame
            .sector(deg - GAP_WINDOW_DEG, deg + GAP_WINDOW_DEG)
            .filter(|&i| i != center)
            .filter_map(|i| self.frame.range(i))
            .fold(along_wall, f32::min);
        if !expected.is_finite() {
            return false;
        }
        self.frame.range_or_far(center) - expected >= gap_threshold
    }

    /// Whether the reading at `deg` is corroborated by its neighbours.
    ///
    /// Looks at [`NOISE_NEIGHBORS`] samples on each side and counts those that
    /// agree with the centre: both no-returns, or both finite and within
    /// [`NOISE_RELATIVE_TOLERANCE`] of the nearer one. An isolated dropout in
    /// an otherwise solid wall gathers no support and yields `false`.
    pub fn noise_check(&self, deg: f32) -> bool {
        let Some(center) = self.frame.nearest_index(deg) else {
            return false;
        };
        let lo = center.saturating_sub(NOISE_NEIGHBORS);
        let hi = (center + NOISE_NEIGHBORS).min(self.frame.len() - 1);
        let reference = self.frame.range_or_far(center);
        let support = (lo..=hi)
            .filter(|&i| i != center)
            .filter(|&i| readings_agree(reference, self.frame.range_or_far(i)))
            .count();
        support >= NOISE_MIN_SUPPORT
    }

    /// Fraction of the valid rays in `[start_deg, end_deg]` that see farther than `open_distance`.
    ///
    /// No-returns are left out. A sector without any valid ray scores `0.0`,
    /// so a blind sensor never reads as open ground.
    pub fn open_place_check(&self, start_deg: f32, end_deg: f32, open_distance: f32) -> f32 {
        let (open, valid) = self
            .frame
            .sector(start_deg, end_deg)
            .filter_map(|i| self.frame.range(i))
            .fold((0_usize, 0_usize), |(open, valid), r| {
                (open + usize::from(r > open_distance), valid + 1)
            });
        if valid == 0 {
            return 0.0;
        }
        open as f32 / valid as f32
    }
}

fn readings_agree(a: f32, b: f32) -> bool {
    match (a.is_finite(), b.is_finite()) {
        (false, false) => true,
        (true, true) => (a - b).abs() <= NOISE_RELATIVE_TOLERANCE * a.min(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    /// -90°..=90° in 1° steps.
    fn frame_with(f: impl Fn(f32) -> f32) -> ScanFrame {
        let ranges = (0..181).map(|i| f(-90.0 + i as f32)).collect();
        ScanFrame::from_degrees(-90.0, 1.0, 0.05, 20.0, ranges).unwrap()
    }

    fn uniform(r: f32) -> ScanFrame {
        frame_with(|_| r)
    }

    #[test]
    fn test_sector_mean_ignores_no_returns() {
        let frame = frame_with(|deg| if deg as i32 % 2 == 0 { 1.0 } else { f32::INFINITY });
        let mean = ScanAnalyzer::new(&frame).sector_mean_range(40.0, 60.0);
        assert!((mean - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_sector_mean_all_invalid_is_far() {
        let frame = uniform(f32::NAN);
        let mean = ScanAnalyzer::new(&frame).sector_mean_range(30.0, 90.0);
        assert_eq!(mean, 20.0);
        assert!(mean.is_finite());
    }

    #[test]
    fn test_sector_mean_outside_sweep_is_far() {
        let frame = uniform(1.0);
        assert_eq!(ScanAnalyzer::new(&frame).sector_mean_range(120.0, 150.0), 20.0);
    }

    #[test]
    fn test_threshold_check() {
        let frame = frame_with(|deg| if deg == 30.0 { 1.0 } else { 5.0 });
        let analyzer = ScanAnalyzer::new(&frame);
        assert!(analyzer.threshold_check(30.2, 1.87));
        assert!(!analyzer.threshold_check(31.0, 1.87));
        assert!(!analyzer.threshold_check(120.0, 1.87));
    }

    #[test]
    fn test_threshold_check_no_return_is_not_a_wall() {
        let frame = uniform(f32::INFINITY);
        assert!(!ScanAnalyzer::new(&frame).threshold_check(0.0, 1.87));
    }

    #[test]
    fn test_front_wall_fraction() {
        // Window centred on -20° spans -30..=-10 (21 rays); -15..=-10 of those are blocked.
        let frame = frame_with(|deg| if (-15.0..=-5.0).contains(&deg) { 0.2 } else { 3.0 });
        let fraction = ScanAnalyzer::new(&frame).front_wall_check(-20.0, 0.5);
        assert!((fraction - 6.0 / 21.0).abs() < EPSILON);
    }

    #[test]
    fn test_front_wall_fraction_stays_in_unit_interval() {
        for r in [0.0, 0.1, 0.49, 0.5, 10.0, f32::INFINITY, f32::NAN] {
            let frame = uniform(r);
            let fraction = ScanAnalyzer::new(&frame).front_wall_check(-15.0, 0.5);
            assert!((0.0..=1.0).contains(&fraction), "fraction {fraction} for range {r}");
        }
        let frame = uniform(0.1);
        assert_eq!(ScanAnalyzer::new(&frame).front_wall_check(0.0, 0.5), 1.0);
        assert_eq!(ScanAnalyzer::new(&frame).front_wall_check(170.0, 0.5), 0.0);
    }

    /// Straight wall at `standoff` on the positive side, `fill` inside `opening`.
    fn wall_with_opening(standoff: f32, opening: (f32, f32), fill: f32) -> ScanFrame {
        frame_with(|deg| {
            if (opening.0..=opening.1).contains(&deg) {
                fill
            } else if deg > 1.0 {
                standoff / deg_to_rad(deg).sin()
            } else {
                f32::INFINITY
            }
        })
    }

    #[test]
    fn test_conflict_check_detects_opening() {
        // Wall at 0.6 m except a doorway at 85..=90.
        let frame = frame_with(|deg| if (85.0..=90.0).contains(&deg) { 4.0 } else { 0.6 });
        let analyzer = ScanAnalyzer::new(&frame);
        assert!(analyzer.conflict_check(88.0, 0.6, 1.0));
        assert!(!analyzer.conflict_check(60.0, 0.6, 1.0));
    }

    #[test]
    fn test_conflict_check_no_return_counts_as_far() {
        let frame = frame_with(|deg| if deg == 45.0 { f32::INFINITY } else { 0.7 });
        assert!(ScanAnalyzer::new(&frame).conflict_check(45.0, 0.5, 1.0));
    }

    #[test]
    fn test_conflict_check_opening_wider_than_window() {
        for fill in [f32::INFINITY, 10.0] {
            let frame = wall_with_opening(0.5, (22.0, 57.0), fill);
            let analyzer = ScanAnalyzer::new(&frame);
            assert!(analyzer.conflict_check(45.0, 0.5, 1.0), "fill {fill}");
            assert!(!analyzer.conflict_check(90.0, 0.5, 1.0), "fill {fill}");
        }
    }

    #[test]
    fn test_conflict_check_continuous_wall_is_not_a_gap() {
        let frame = wall_with_opening(0.5, (0.0, -1.0), 0.0);
        let analyzer = ScanAnalyzer::new(&frame);
        assert!(!analyzer.conflict_check(45.0, 0.5, 1.0));
        assert!(!analyzer.conflict_check(90.0, 0.5, 1.0));
        // Somewhat off the standoff is still a wall.
        let frame = wall_with_opening(0.9, (0.0, -1.0), 0.0);
        assert!(!ScanAnalyzer::new(&frame).conflict_check(45.0, 0.5, 1.0));
    }

    #[test]
    fn test_conflict_check_blind_frame_is_false() {
        for r in [f32::INFINITY, f32::NAN] {
            let frame = uniform(r);
            assert!(!ScanAnalyzer::new(&frame).conflict_check(45.0, 0.5, 1.0));
        }
    }

    #[test]
    fn test_noise_check_rejects_isolated_dropout() {
        let frame = frame_with(|deg| if deg == 30.0 { f32::INFINITY } else { 1.0 });
        assert!(!ScanAnalyzer::new(&frame).noise_check(30.0));
    }

    #[test]
    fn test_noise_check_accepts_corroborated_opening() {
        let frame = frame_with(|deg| if (25.0..=35.0).contains(&deg) { f32::INFINITY } else { 1.0 });
        assert!(ScanAnalyzer::new(&frame).noise_check(30.0));

        let frame = frame_with(|deg| if (25.0..=35.0).contains(&deg) { 4.0 + deg * 0.01 } else { 1.0 });
        assert!(ScanAnalyzer::new(&frame).noise_check(30.0));
    }

    #[test]
    fn test_noise_check_at_sweep_edge() {
        let frame = uniform(2.0);
        assert!(ScanAnalyzer::new(&frame).noise_check(90.0));
        assert!(!ScanAnalyzer::new(&frame).noise_check(95.0));
    }

    #[test]
    fn test_open_place_fraction_ignores_no_returns() {
        // -90..=-1 walled at 1 m, 0..=45 open at 10 m, 46..=90 no return.
        let frame = frame_with(|deg| {
            if deg < 0.0 {
                1.0
            } else if deg <= 45.0 {
                10.0
            } else {
                f32::INFINITY
            }
        });
        let fraction = ScanAnalyzer::new(&frame).open_place_check(-90.0, 90.0, 3.0);
        assert!((fraction - 46.0 / 136.0).abs() < EPSILON);
    }

    #[test]
    fn test_open_place_all_invalid_sector_scores_zero() {
        for r in [f32::NAN, f32::INFINITY, 0.0, 25.0] {
            let frame = uniform(r);
            assert_eq!(ScanAnalyzer::new(&frame).open_place_check(-90.0, 90.0, 3.0), 0.0);
        }
    }

    #[test]
    fn test_open_place_fraction_stays_in_unit_interval() {
        for r in [0.0, 2.9, 3.0, 3.1, f32::INFINITY, f32::NAN] {
            let frame = uniform(r);
            let fraction = ScanAnalyzer::new(&frame).open_place_check(-90.0, 90.0, 3.0);
            assert!((0.0..=1.0).contains(&fraction));
        }
        let frame = uniform(10.0);
        assert_eq!(ScanAnalyzer::new(&frame).open_place_check(100.0, 120.0, 3.0), 0.0);
    }
}
