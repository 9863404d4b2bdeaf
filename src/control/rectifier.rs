//! Active front-end rectifier control
//!
//! Cascaded loops: the DC bus PI sets the d-axis current reference, the d and
//! q current PIs (q reference zero, unity power factor) set the converter
//! voltage with ω·L cross-coupling compensation.

use super::mode::{ModeTracker, StageMode, Transition};
use super::modulator::{Modulation, Modulator};
use super::pi_controller::PiController;
use super::pll::PllOutput;
use super::transforms::{abc_to_dq, dq_to_abc, Abc, Dq, PhaseAngles};
use crate::config::RectifierConfig;

/// One rectifier tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectifierOutput {
    pub modulation: Modulation,
    pub transition: Transition,
    /// Measured line current in the grid frame [A]
    pub current: Dq,
    /// Converter voltage command in the grid frame [V]
    pub voltage_command: Dq,
}

/// AFE rectifier controller
#[derive(Debug, Clone, Copy)]
pub struct RectifierController {
    /// Bus voltage loop, output is the d current reference
    vdc_pi: PiController,
    id_pi: PiController,
    iq_pi: PiController,
    vdc_ref: f32,
    /// ω·L of the input inductor [Ω]
    coupling_reactance: f32,
    modulator: Modulator,
    mode: ModeTracker,
}

impl RectifierController {
    pub fn new(config: &RectifierConfig, sample_period: f32, modulator: Modulator) -> Self {
        Self {
            vdc_pi: PiController::new(config.vdc_kp, config.vdc_ki, sample_period),
            id_pi: PiController::new(config.id_kp, config.id_ki, sample_period),
            iq_pi: PiController::new(config.iq_kp, config.iq_ki, sample_period),
            vdc_ref: config.vdc_ref,
            coupling_reactance: config.line_omega * config.inductance,
            modulator,
            mode: ModeTracker::new(),
        }
    }

    /// Run one tick
    ///
    /// # Arguments
    /// * `command` - Enable command sampled for this tick
    /// * `current` - Line currents ia, ib, ic [A]
    /// * `v_dc` - Measured bus voltage [V]
    /// * `grid` - This tick's PLL output (updated angle, measured vd/vq)
    pub fn update(
        &mut self,
        command: StageMode,
        current: Abc,
        v_dc: f32,
        grid: &PllOutput,
    ) -> RectifierOutput {
        let transition = self.mode.apply(command);
        let angles = PhaseAngles::new(grid.theta);
        let i_dq = abc_to_dq(current, &angles);

        let voltage_command = if command.is_enabled() {
            let id_ref = self.vdc_pi.update(self.vdc_ref - v_dc);

            let u_d = self.id_pi.update(id_ref - i_dq.d);
            let vd_ref = u_d - i_dq.q * self.coupling_reactance;

            let u_q = self.iq_pi.update(-i_dq.q);
            let vq_ref = u_q + i_dq.d * self.coupling_reactance;

            Dq::new(grid.vd - vd_ref, grid.vq - vq_ref)
        } else {
            self.reset();
            Dq::default()
        };

        let modulation = self
            .modulator
            .synthesize(dq_to_abc(voltage_command, &angles), v_dc);

        RectifierOutput {
            modulation,
            transition,
            current: i_dq,
            voltage_command,
        }
    }

    /// Zero all loop memory
    pub fn reset(&mut self) {
        self.vdc_pi.reset();
        self.id_pi.reset();
        self.iq_pi.reset();
    }

    pub fn mode(&self) -> StageMode {
        self.mode.mode()
    }

    /// True when every PI state and error is exactly zero
    pub fn is_at_rest(&self) -> bool {
        self.vdc_pi.is_at_rest() && self.id_pi.is_at_rest() && self.iq_pi.is_at_rest()
    }

    /// d current reference from the bus loop [A]
    pub fn id_reference(&self) -> f32 {
        self.vdc_pi.get_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::control::modulator::DutyCycles;

    fn controller() -> RectifierController {
        let config = ConverterConfig::default();
        RectifierController::new(
            &config.rectifier,
            config.sample_period,
            Modulator::new(config.modulator.min_bus_voltage),
        )
    }

    fn grid(vd: f32) -> PllOutput {
        PllOutput {
            theta: 0.0,
            omega: 377.0,
            vd,
            vq: 0.0,
        }
    }

    #[test]
    fn test_disabled_outputs_neutral_duty() {
        let mut afe = controller();
        let out = afe.update(
            StageMode::Disabled,
            Abc::new(3.0, -1.0, -2.0),
            300.0,
            &grid(100.0),
        );
        assert_eq!(out.modulation.duty, DutyCycles::NEUTRAL);
        assert_eq!(out.voltage_command, Dq::default());
        assert!(afe.is_at_rest());
    }

    #[test]
    fn test_bus_deficit_requests_positive_d_current() {
        let mut afe = controller();
        let out = afe.update(StageMode::Enabled, Abc::default(), 300.0, &grid(100.0));
        assert_eq!(out.transition, Transition::Enabled);
        // id_ref = 0.2 · 60 = 12 A, u_d = 5 · 12 = 60 V
        assert!((afe.id_reference() - 12.0).abs() < 1e-4);
        assert!((out.voltage_command.d - 40.0).abs() < 1e-3);
        assert!(out.voltage_command.q.abs() < 1e-6);
    }

    #[test]
    fn test_cross_coupling_terms() {
        let mut afe = controller();
        let x = 377.0 * 0.0012;
        // Bus at reference, so only the current errors and decoupling act
        let current = dq_to_abc(Dq::new(2.0, 1.0), &PhaseAngles::new(0.0));
        let out = afe.update(StageMode::Enabled, current, 360.0, &grid(100.0));
        let u_d = 5.0 * (0.0 - 2.0);
        let u_q = 5.0 * (0.0 - 1.0);
        let expected_d = 100.0 - (u_d - 1.0 * x);
        let expected_q = 0.0 - (u_q + 2.0 * x);
        assert!((out.voltage_command.d - expected_d).abs() < 1e-2);
        assert!((out.voltage_command.q - expected_q).abs() < 1e-2);
    }

    #[test]
    fn test_disable_zeroes_state_same_tick() {
        let mut afe = controller();
        for _ in 0..10 {
            afe.update(StageMode::Enabled, Abc::new(1.0, -0.5, -0.5), 320.0, &grid(100.0));
        }
        assert!(!afe.is_at_rest());
        let out = afe.update(StageMode::Disabled, Abc::new(1.0, -0.5, -0.5), 320.0, &grid(100.0));
        assert_eq!(out.transition, Transition::Disabled);
        assert!(afe.is_at_rest());
        assert_eq!(out.modulation.duty, DutyCycles::NEUTRAL);
    }
}
