//! Inverter output voltage control
//!
//! Free-running output angle, soft-start on the d reference and a PI per
//! axis. No decoupling; the PI outputs are the voltage references.

use super::mode::{ModeTracker, StageMode, Transition};
use super::modulator::{Modulation, Modulator};
use super::pi_controller::PiController;
use super::ramp::Ramp;
use super::transforms::{abc_to_dq, advance_angle, dq_to_abc, Abc, Dq, PhaseAngles};
use crate::config::InverterConfig;

/// One inverter tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverterOutput {
    pub modulation: Modulation,
    pub transition: Transition,
    /// Output angle used this tick [rad]
    pub theta: f32,
    /// Measured output voltage in the output frame [V]
    pub voltage: Dq,
    /// PI outputs [V]
    pub voltage_command: Dq,
}

/// Three-phase inverter controller
#[derive(Debug, Clone, Copy)]
pub struct InverterController {
    vd_pi: PiController,
    vq_pi: PiController,
    ramp: Ramp,
    vq_ref: f32,
    theta: f32,
    /// ω·T [rad per tick]
    angle_step: f32,
    modulator: Modulator,
    mode: ModeTracker,
}

impl InverterController {
    pub fn new(config: &InverterConfig, sample_period: f32, modulator: Modulator) -> Self {
        Self {
            vd_pi: PiController::new(config.vd_kp, config.vd_ki, sample_period),
            vq_pi: PiController::new(config.vq_kp, config.vq_ki, sample_period),
            ramp: Ramp::new(config.ramp_step, config.vd_target, config.ramp_restart),
            vq_ref: config.vq_ref,
            theta: 0.0,
            angle_step: config.omega * sample_period,
            modulator,
            mode: ModeTracker::new(),
        }
    }

    /// Run one tick
    ///
    /// The output angle advances before anything else, regardless of mode.
    pub fn update(&mut self, command: StageMode, output: Abc, v_dc: f32) -> InverterOutput {
        let transition = self.mode.apply(command);
        self.theta = advance_angle(self.theta, self.angle_step);
        let angles = PhaseAngles::new(self.theta);
        let v_dq = abc_to_dq(output, &angles);

        let voltage_command = if command.is_enabled() {
            let vd_ref = self.ramp.advance();
            Dq::new(
                self.vd_pi.update(vd_ref - v_dq.d),
                self.vq_pi.update(self.vq_ref - v_dq.q),
            )
        } else {
            self.reset();
            Dq::default()
        };

        let modulation = self
            .modulator
            .synthesize(dq_to_abc(voltage_command, &angles), v_dc);

        InverterOutput {
            modulation,
            transition,
            theta: self.theta,
            voltage: v_dq,
            voltage_command,
        }
    }

    /// Zero both PIs and return the ramp to its restart value
    pub fn reset(&mut self) {
        self.vd_pi.reset();
        self.vq_pi.reset();
        self.ramp.reset();
    }

    pub fn mode(&self) -> StageMode {
        self.mode.mode()
    }

    pub fn is_at_rest(&self) -> bool {
        self.vd_pi.is_at_rest() && self.vq_pi.is_at_rest()
    }

    /// Current d reference [V]
    pub fn vd_reference(&self) -> f32 {
        self.ramp.value()
    }

    /// Output angle [rad]
    pub fn theta(&self) -> f32 {
        self.theta
    }
}
