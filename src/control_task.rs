//! Control tick
//!
//! [`ControlTask`] owns every piece of persistent control state. Its
//! [`tick`](ControlTask::tick) is the body of the PWM-synchronous interrupt:
//! sample, track the grid, run both stages, write the compare registers, log.

use crate::config::{ConfigError, ConverterConfig};
use crate::control::{
    Abc, DutyCycles, GridPll, InverterController, Modulation, Modulator, RectifierController,
    StageMode, Transition,
};
use crate::diagnostics::{DiagnosticEntry, DiagnosticLog};
use crate::hardware::{ConverterHardware, Phase, PwmLeg, Stage};
use crate::state::{Fault, FaultFlags, SharedState};

/// What one tick produced
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub rectifier_duty: DutyCycles,
    pub inverter_duty: DutyCycles,
    /// Grid angle after this tick [rad]
    pub theta_grid: f32,
    /// Grid frequency estimate [rad/s]
    pub omega: f32,
    /// Cycles from entry to the last PWM write
    pub elapsed_cycles: u32,
    /// Faults raised during this tick
    pub faults: FaultFlags,
}

pub struct ControlTask<'a> {
    config: ConverterConfig,
    shared: &'a SharedState,
    pll: GridPll,
    rectifier: RectifierController,
    inverter: InverterController,
    diagnostics: DiagnosticLog,
}

impl<'a> ControlTask<'a> {
    /// Build all control state from a validated configuration
    pub fn new(config: ConverterConfig, shared: &'a SharedState) -> Result<Self, ConfigError> {
        config.validate()?;

        let ts = config.sample_period;
        let modulator = Modulator::new(config.modulator.min_bus_voltage);

        info!(
            "Control task: T={}s, budget={} cycles",
            ts,
            config.tick_budget_cycles
        );

        Ok(Self {
            config,
            shared,
            pll: GridPll::new(config.pll.kp, config.pll.ki, ts, config.pll.initial_omega),
            rectifier: RectifierController::new(&config.rectifier, ts, modulator),
            inverter: InverterController::new(&config.inverter, ts, modulator),
            diagnostics: DiagnosticLog::new(),
        })
    }

    /// Run one control period to completion
    pub fn tick<H: ConverterHardware>(&mut self, hw: &mut H) -> TickReport {
        let start = hw.cycle_count();
        hw.set_timing_probe(true);

        let raw = hw.sample_analog_inputs();
        let s = self.config.adc.calibrate(&raw);

        let afe_command = self.shared.commands.mode(Stage::Rectifier);
        let inv_command = self.shared.commands.mode(Stage::Inverter);

        let grid = self.pll.update(Abc::new(s.va, s.vb, s.vc));

        let afe = self.rectifier.update(
            afe_command,
            Abc::new(s.ia, s.ib, s.ic),
            s.vdc,
            &grid,
        );
        let inv = self
            .inverter
            .update(inv_command, Abc::new(s.via, s.vib, s.vic), s.vdc);

        let period = hw.pwm_period();
        write_stage(hw, Stage::Rectifier, &afe.modulation.duty, period);
        write_stage(hw, Stage::Inverter, &inv.modulation.duty, period);
        hw.set_driver_enable(Stage::Rectifier, afe_command.is_enabled());
        hw.set_driver_enable(Stage::Inverter, inv_command.is_enabled());

        self.diagnostics.push(DiagnosticEntry::from(&s));
        self.shared.samples.publish(raw);

        let mut faults = FaultFlags::EMPTY;
        self.note_transition(Stage::Rectifier, afe.transition);
        self.note_transition(Stage::Inverter, inv.transition);
        self.note_modulation(&mut faults, afe_command, &afe.modulation);
        self.note_modulation(&mut faults, inv_command, &inv.modulation);

        hw.set_timing_probe(false);
        let elapsed_cycles = hw.cycle_count().wrapping_sub(start);
        if elapsed_cycles > self.config.tick_budget_cycles {
            self.raise(&mut faults, Fault::Overrun);
        }

        TickReport {
            rectifier_duty: afe.modulation.duty,
            inverter_duty: inv.modulation.duty,
            theta_grid: grid.theta,
            omega: grid.omega,
            elapsed_cycles,
            faults,
        }
    }

    fn note_transition(&self, stage: Stage, transition: Transition) {
        match transition {
            Transition::Enabled => info!("{} enabled", stage),
            Transition::Disabled => {
                self.shared.faults.record_mode_reset();
                info!("{} disabled, loops reset", stage);
            }
            Transition::None => {}
        }
    }

    fn note_modulation(&self, faults: &mut FaultFlags, mode: StageMode, m: &Modulation) {
        // With both references zero the guard has no effect on the output
        if m.bus_guard && mode.is_enabled() {
            self.raise(faults, Fault::BusVoltageGuard);
        }
        if m.saturated {
            self.raise(faults, Fault::DutySaturation);
        }
    }

    fn raise(&self, faults: &mut FaultFlags, fault: Fault) {
        faults.insert(fault);
        if self.shared.faults.raise(fault) {
            warn!("Fault latched: {}", fault);
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn pll(&self) -> &GridPll {
        &self.pll
    }

    pub fn rectifier(&self) -> &RectifierController {
        &self.rectifier
    }

    pub fn inverter(&self) -> &InverterController {
        &self.inverter
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }
}

fn write_stage<H: ConverterHardware>(hw: &mut H, stage: Stage, duty: &DutyCycles, period: u16) {
    for (phase, count) in Phase::ALL.into_iter().zip(duty.to_compare(period)) {
        hw.write_pwm_duty(PwmLeg::new(stage, phase), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::modulator::DEFAULT_PWM_PERIOD;
    use crate::config::Topology;
    use crate::sampler::{RawSamples, SampleSet};
    use core::cell::Cell;
    use core::f64::consts::TAU;

    struct MockHardware {
        raw: RawSamples,
        compare: [[u16; 3]; 2],
        enables: [bool; 2],
        cycles: Cell<u32>,
        cycles_per_read: u32,
        probe: bool,
        probe_edges: u32,
    }

    impl MockHardware {
        fn new() -> Self {
            Self {
                raw: RawSamples::mid_scale(),
                compare: [[0; 3]; 2],
                enables: [false; 2],
                cycles: Cell::new(u32::MAX - 100),
                cycles_per_read: 1_000,
                probe: false,
                probe_edges: 0,
            }
        }

        fn duty(&self, stage: Stage) -> [f32; 3] {
            let row = self.compare[stage as usize];
            row.map(|c| c as f32 / DEFAULT_PWM_PERIOD as f32)
        }
    }

    impl ConverterHardware for MockHardware {
        fn sample_analog_inputs(&mut self) -> RawSamples {
            self.raw
        }

        fn write_pwm_duty(&mut self, leg: PwmLeg, count: u16) {
            assert!(count <= DEFAULT_PWM_PERIOD);
            self.compare[leg.stage as usize][leg.phase as usize] = count;
        }

        fn pwm_period(&self) -> u16 {
            DEFAULT_PWM_PERIOD
        }

        fn set_driver_enable(&mut self, stage: Stage, enabled: bool) {
            self.enables[stage as usize] = enabled;
        }

        fn cycle_count(&self) -> u32 {
            let now = self.cycles.get();
            self.cycles.set(now.wrapping_add(self.cycles_per_read));
            now
        }

        fn set_timing_probe(&mut self, high: bool) {
            if high != self.probe {
                self.probe_edges += 1;
            }
            self.probe = high;
        }
    }

    /// Grid, input inductors and bus capacitor, integrated with forward Euler
    struct Plant {
        t: f64,
        ts: f64,
        grid_amplitude: f64,
        grid_omega: f64,
        inductance: f64,
        capacitance: f64,
        current: [f64; 3],
        vdc: f64,
    }

    impl Plant {
        fn new(vdc: f64) -> Self {
            Self {
                t: 0.0,
                ts: 5e-5,
                grid_amplitude: 100.0,
                grid_omega: TAU * 60.0,
                inductance: 0.0012,
                capacitance: 0.02,
                current: [0.0; 3],
                vdc,
            }
        }

        fn grid(&self) -> [f64; 3] {
            let phi = self.grid_omega * self.t;
            [0.0, -TAU / 3.0, TAU / 3.0].map(|off| self.grid_amplitude * libm::cos(phi + off))
        }

        fn measure(&self, task: &ControlTask) -> RawSamples {
            let e = self.grid();
            let samples = SampleSet {
                ia: self.current[0] as f32,
                ib: self.current[1] as f32,
                ic: self.current[2] as f32,
                va: e[0] as f32,
                vb: e[1] as f32,
                vc: e[2] as f32,
                vdc: self.vdc as f32,
                ..SampleSet::default()
            };
            task.config().adc.to_raw(&samples)
        }

        /// Apply one period of rectifier duty
        fn step(&mut self, duty: [f32; 3]) {
            let e = self.grid();
            let pole = duty.map(|d| (d as f64 - 0.5) * self.vdc);
            let common = (pole[0] + pole[1] + pole[2]) / 3.0;
            let v = pole.map(|p| p - common);

            let power: f64 = (0..3).map(|k| v[k] * self.current[k]).sum();
            for k in 0..3 {
                self.current[k] += self.ts / self.inductance * (e[k] - v[k]);
            }
            self.vdc += self.ts * power / (self.capacitance * self.vdc);
            self.t += self.ts;
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let shared = SharedState::new();
        let mut config = ConverterConfig::default();
        config.sample_period = -1.0;
        assert!(matches!(
            ControlTask::new(config, &shared),
            Err(ConfigError::InvalidSamplePeriod)
        ));
    }

    #[test]
    fn test_disabled_stages_idle_at_half_duty() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();

        let report = task.tick(&mut hw);
        assert_eq!(report.rectifier_duty, DutyCycles::NEUTRAL);
        assert_eq!(report.inverter_duty, DutyCycles::NEUTRAL);
        assert_eq!(hw.compare, [[2125; 3]; 2]);
        assert_eq!(hw.enables, [false, false]);
        // Collapsed bus with idle stages is not a fault
        assert!(report.faults.is_empty());
    }

    #[test]
    fn test_timing_probe_and_cycle_wrap() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();

        // Counter starts 100 cycles before wrapping
        let report = task.tick(&mut hw);
        assert_eq!(report.elapsed_cycles, 1_000);
        assert!(!hw.probe);
        assert_eq!(hw.probe_edges, 2);
    }

    #[test]
    fn test_overrun_is_reported() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();
        hw.cycles_per_read = 20_000;

        let report = task.tick(&mut hw);
        assert!(report.faults.contains(Fault::Overrun));
        assert!(shared.faults.is_latched(Fault::Overrun));

        hw.cycles_per_read = 100;
        let report = task.tick(&mut hw);
        assert!(!report.faults.contains(Fault::Overrun));
        // Still latched until cleared
        assert!(shared.faults.is_latched(Fault::Overrun));
        assert_eq!(shared.faults.counters().overruns, 1);
    }

    #[test]
    fn test_enable_disable_cycle() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();
        let mut plant = Plant::new(300.0);

        shared.commands.set(Stage::Rectifier, true);
        shared.commands.set(Stage::Inverter, true);
        for _ in 0..20 {
            hw.raw = plant.measure(&task);
            task.tick(&mut hw);
            plant.step(hw.duty(Stage::Rectifier));
        }
        assert_eq!(hw.enables, [true, true]);
        assert!(!task.rectifier().is_at_rest());
        assert!(!task.inverter().is_at_rest());
        assert!(task.inverter().vd_reference() > 10.0);

        shared.commands.set(Stage::Rectifier, false);
        shared.commands.set(Stage::Inverter, false);
        hw.raw = plant.measure(&task);
        let report = task.tick(&mut hw);

        assert!(task.rectifier().is_at_rest());
        assert!(task.inverter().is_at_rest());
        assert_eq!(task.inverter().vd_reference(), 10.0);
        assert_eq!(report.rectifier_duty, DutyCycles::NEUTRAL);
        assert_eq!(report.inverter_duty, DutyCycles::NEUTRAL);
        assert_eq!(hw.enables, [false, false]);
        assert_eq!(shared.faults.counters().mode_resets, 2);
    }

    #[test]
    fn test_bus_guard_with_enabled_rectifier() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();

        shared.commands.set(Stage::Rectifier, true);
        let report = task.tick(&mut hw);
        assert!(report.faults.contains(Fault::BusVoltageGuard));
        // 360 V error on a 1 V divisor clamps every leg
        assert!(report.faults.contains(Fault::DutySaturation));
        for d in report.rectifier_duty.as_array() {
            assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn test_diagnostics_and_mailbox() {
        let shared = SharedState::new();
        let mut task = ControlTask::new(ConverterConfig::default(), &shared).unwrap();
        let mut hw = MockHardware::new();
        let plant = Plant::new(320.0);

        hw.raw = plant.measure(&task);
        for _ in 0..170 {
            task.tick(&mut hw);
        }
        let log = task.diagnostics();
        assert_eq!(log.len(), 168);
        assert_eq!(log.write_index(), 2);
        let latest = log.latest().unwrap();
        assert!((latest.vdc - 320.0).abs() < 0.2);
        assert!((latest.va - 100.0).abs() < 0.2);
        assert_eq!(shared.samples.latest(), Some(hw.raw));
    }

    #[test]
    fn test_rack2_and_npc_share_the_control_path() {
        for topology in [Topology::BackToBackRack2, Topology::NeutralPointClamped] {
            let shared = SharedState::new();
            let config = ConverterConfig::default().with_topology(topology);
            let mut task = ControlTask::new(config, &shared).unwrap();
            let mut hw = MockHardware::new();
            let report = task.tick(&mut hw);
            assert_eq!(report.rectifier_duty, DutyCycles::NEUTRAL);
        }
    }

    /// Run the rectifier against the plant and check the bus error decays
    /// without a sign change; returns the final error
    fn charge_bus(config: ConverterConfig, ticks: usize, check_saturation: bool) -> f64 {
        let shared = SharedState::new();
        let mut task = ControlTask::new(config, &shared).unwrap();
        let mut hw = MockHardware::new();
        let mut plant = Plant::new(300.0);

        shared.commands.set(Stage::Rectifier, true);

        let vdc_ref = config.rectifier.vdc_ref as f64;
        let mut previous_error = vdc_ref - plant.vdc;
        for n in 0..ticks {
            hw.raw = plant.measure(&task);
            let report = task.tick(&mut hw);
            if check_saturation {
                assert!(!report.faults.contains(Fault::DutySaturation), "tick {}", n);
            }
            plant.step(hw.duty(Stage::Rectifier));

            let error = vdc_ref - plant.vdc;
            assert!(error > 0.0, "sign change at tick {}", n);
            assert!(
                error <= previous_error + 1e-4,
                "error grew at tick {}: {} -> {}",
                n,
                previous_error,
                error
            );
            previous_error = error;
        }
        assert!(task.rectifier().id_reference() > 0.0);
        previous_error
    }

    #[test]
    fn test_bus_charges_from_rest() {
        // Default configuration: PLL starts at zero frequency
        let config = ConverterConfig::default();
        assert_eq!(config.pll.initial_omega, 0.0);
        let error = charge_bus(config, 500, false);
        assert!(error < 60.0 - 1.0, "final error {}", error);
    }

    #[test]
    fn test_bus_charges_with_pll_locked() {
        let mut config = ConverterConfig::default();
        config.pll.initial_omega = core::f32::consts::TAU * 60.0;
        let error = charge_bus(config, 500, true);
        assert!(error < 60.0 - 1.0, "final error {}", error);
    }
}
