//! Lateral distance controller.

/// PID controller turning a measured wall distance into an angular velocity.
///
/// The derivative term is the error divided by the sample period rather than
/// the change in error: no previous error is kept. Output is not clamped here;
/// limits are applied when the command is emitted.
#[derive(Debug, Clone)]
pub struct LateralPid {
    kp: f32,
    ki: f32,
    kd: f32,
    target: f32,
    sample_period: f32,
    ei: f32,
}

impl LateralPid {
    /// Create a controller holding `target` meters off the wall.
    pub fn new(kp: f32, ki: f32, kd: f32, target: f32, sample_period: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            target,
            sample_period,
            ei: 0.0,
        }
    }

    /// Accumulated integral error.
    pub fn integral(&self) -> f32 {
        self.ei
    }

    /// Zero the integral accumulator.
    pub fn reset(&mut self) {
        self.ei = 0.0;
    }

    /// Run one step on the measured lateral distance and return the angular correction.
    pub fn correct(&mut self, measured: f32) -> f32 {
        let e = measured - self.target;
        self.ei += e * self.sample_period;
        let ed = e / self.sample_period;
        self.kp * e + self.ki * self.ei + self.kd * ed
    }
}
