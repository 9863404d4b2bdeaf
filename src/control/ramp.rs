// Soft-start reference ramp for the inverter d-axis voltage

/// Reference that climbs by a fixed step per tick up to a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    value: f32,
    step: f32,
    target: f32,
    restart: f32,
}

impl Ramp {
    /// # Arguments
    /// * `step` - Increment per tick
    /// * `target` - Saturation value
    /// * `restart` - Value the ramp starts from and returns to on reset
    pub const fn new(step: f32, target: f32, restart: f32) -> Self {
        Self {
            value: restart,
            step,
            target,
            restart,
        }
    }

    /// `value = min(value + step, target)`
    pub fn advance(&mut self) -> f32 {
        let next = self.value + self.step;
        self.value = if next > self.target {
            self.target
        } else {
            next
        };
        self.value
    }

    /// Back to the restart value
    pub fn reset(&mut self) {
        self.value = self.restart;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_saturated(&self) -> bool {
        self.value >= self.target
    }
}
