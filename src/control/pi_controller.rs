// PI (Proportional-Integral) controller, incremental form

/// Discrete PI controller in incremental (velocity) form
///
/// `u[n] = u[n-1] + (ki·T − kp)·e[n-1] + kp·e[n]`
///
/// The state is the previous output and the previous error. Both are cleared
/// by [`reset`](Self::reset), which the owning loop calls on every disabled
/// tick so a re-enable starts from rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiController {
    /// Proportional gain
    kp: f32,
    /// Integral gain
    ki: f32,
    /// Sample period [s]
    ts: f32,
    /// u[n-1]
    prev_output: f32,
    /// e[n-1]
    prev_error: f32,
}

impl PiController {
    /// Create a new PI controller at rest
    ///
    /// # Arguments
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    /// * `ts` - Sample period (seconds)
    pub const fn new(kp: f32, ki: f32, ts: f32) -> Self {
        Self {
            kp,
            ki,
            ts,
            prev_output: 0.0,
            prev_error: 0.0,
        }
    }

    /// Update the PI controller with this tick's error
    ///
    /// # Arguments
    /// * `error` - Reference minus measurement
    ///
    /// # Returns
    /// Controller output (unbounded)
    pub fn update(&mut self, error: f32) -> f32 {
        let output = self.prev_output
            + (self.ki * self.ts - self.kp) * self.prev_error
            + self.kp * error;

        self.prev_output = output;
        self.prev_error = error;

        output
    }

    /// Force output and error memory to zero
    pub fn reset(&mut self) {
        self.prev_output = 0.0;
        self.prev_error = 0.0;
    }

    /// Output of the last update
    pub fn get_output(&self) -> f32 {
        self.prev_output
    }

    /// True when both state fields are exactly zero
    pub fn is_at_rest(&self) -> bool {
        self.prev_output == 0.0 && self.prev_error == 0.0
    }

    /// Error memory, for tests only
    #[cfg(test)]
    fn get_error(&self) -> f32 {
        self.prev_error
    }
}
