//! Line-segment world used by the simulated laser.

use wall_kinematics::Pose;

use crate::config::SimulationConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub ax: f32,
    pub ay: f32,
    pub bx: f32,
    pub by: f32,
}

impl Segment {
    pub const fn new(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self { ax, ay, bx, by }
    }

    /// Distance along the ray `(ox, oy) + t * (dx, dy)` to this segment, if it is hit ahead.
    fn intersect(&self, ox: f32, oy: f32, dx: f32, dy: f32) -> Option<f32> {
        let ex = self.bx - self.ax;
        let ey = self.by - self.ay;
        let denom = dx * ey - dy * ex;
        if denom.abs() < 1e-9 {
            return None;
        }
        let wx = self.ax - ox;
        let wy = self.ay - oy;
        let t = (wx * ey - wy * ex) / denom;
        let u = (wx * dy - wy * dx) / denom;
        (t > 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct World {
    walls: Vec<Segment>,
}

impl World {
    pub fn new(walls: Vec<Segment>) -> Self {
        Self { walls }
    }

    /// A corridor along +x with the tracked wall on the left and a doorway in
    /// it, opening at `corridor_length` onto a walled square of side
    /// `open_area_size` centred on the corridor axis.
    pub fn corridor(sim: &SimulationConfig) -> Self {
        const BACK: f32 = -2.0;
        let left = sim.wall_offset;
        let right = sim.wall_offset - sim.corridor_width;
        let door_end = sim.doorway_start + sim.doorway_width;
        let end = sim.corridor_length;
        let far = end + sim.open_area_size;
        let half = sim.open_area_size / 2.0;
        Self::new(vec![
            Segment::new(BACK, left, sim.doorway_start, left),
            Segment::new(door_end, left, end, left),
            Segment::new(BACK, right, end, right),
            Segment::new(BACK, right, BACK, left),
            Segment::new(end, left, end, half),
            Segment::new(end, right, end, -half),
            Segment::new(end, half, far, half),
            Segment::new(end, -half, far, -half),
            Segment::new(far, -half, far, half),
        ])
    }

    /// Range from `pose` along `bearing` (radians, robot frame), `None` when nothing is hit.
    pub fn cast(&self, pose: &Pose, bearing: f32) -> Option<f32> {
        let heading = pose.theta + bearing;
        let (dy, dx) = heading.sin_cos();
        self.walls
            .iter()
            .filter_map(|w| w.intersect(pose.x, pose.y, dx, dy))
            .min_by(f32::total_cmp)
    }
}
