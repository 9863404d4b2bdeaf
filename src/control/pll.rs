//! Grid synchronisation PLL
//!
//! Synchronous-reference-frame PLL: the grid voltage is projected onto the
//! current angle estimate and a PI regulator drives the q component to zero.
//! The frequency estimate is deliberately left unclamped.

use super::pi_controller::PiController;
use super::transforms::{abc_to_dq, advance_angle, Abc, PhaseAngles};

/// Result of one PLL update
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllOutput {
    /// Grid angle after this tick's update [rad], in [0, 2π)
    pub theta: f32,
    /// Angular frequency estimate [rad/s]
    pub omega: f32,
    /// d projection of the grid voltage on the pre-update angle [V]
    pub vd: f32,
    /// q projection (phase error signal) [V]
    pub vq: f32,
}

/// Grid angle and frequency tracker
#[derive(Debug, Clone, Copy)]
pub struct GridPll {
    /// Frequency regulator; its state is ω[n-1] and vq[n-1]
    frequency_pi: PiController,
    /// Sample period [s]
    ts: f32,
    /// θ[n-1]
    theta: f32,
    /// ω[n-1]
    omega: f32,
    /// ω at power-up, the regulator output is added to it
    initial_omega: f32,
}

impl GridPll {
    /// Create a PLL at angle zero
    ///
    /// # Arguments
    /// * `kp` - Proportional gain [rad/s per V]
    /// * `ki` - Integral gain [rad/s² per V]
    /// * `ts` - Sample period [s]
    /// * `initial_omega` - Frequency estimate at power-up [rad/s]
    pub const fn new(kp: f32, ki: f32, ts: f32, initial_omega: f32) -> Self {
        Self {
            frequency_pi: PiController::new(kp, ki, ts),
            ts,
            theta: 0.0,
            omega: initial_omega,
            initial_omega,
        }
    }

    /// Run one tick
    ///
    /// `ω[n] = ω[n-1] + (ki·T − kp)·vq[n-1] + kp·vq[n]`,
    /// `θ[n] = θ[n-1] + ω[n-1]·T` wrapped into [0, 2π).
    pub fn update(&mut self, grid: Abc) -> PllOutput {
        let projection = abc_to_dq(grid, &PhaseAngles::new(self.theta));

        let omega_prev = self.omega;
        self.omega = self.initial_omega + self.frequency_pi.update(projection.q);
        self.theta = advance_angle(self.theta, omega_prev * self.ts);

        PllOutput {
            theta: self.theta,
            omega: self.omega,
            vd: projection.d,
            vq: projection.q,
        }
    }

    /// Grid angle [rad]
    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Frequency estimate [rad/s]
    pub fn omega(&self) -> f32 {
        self.omega
    }

    /// Start from a known angle and frequency (simulation and test hook)
    pub fn preset(&mut self, theta: f32, omega: f32) {
        self.theta = theta;
        self.omega = omega;
        self.initial_omega = omega;
        self.frequency_pi.reset();
    }
}
