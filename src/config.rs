//! Configuration module
//!
//! Converter parameters are fixed at start-up: [`ConverterConfig::default`]
//! builds them from `params`, and [`ConverterConfig::validate`] rejects
//! values the discretized loops cannot run with.

pub mod params;
pub mod topology;

pub use params::*;
pub use topology::{EnableCommandIds, Topology};

use crate::sampler::AdcCalibration;

/// Grid PLL parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PllConfig {
    pub kp: f32,
    pub ki: f32,
    /// Frequency estimate at power-up [rad/s]
    pub initial_omega: f32,
}

/// Rectifier loop parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectifierConfig {
    /// DC bus reference [V]
    pub vdc_ref: f32,
    pub vdc_kp: f32,
    pub vdc_ki: f32,
    pub id_kp: f32,
    pub id_ki: f32,
    pub iq_kp: f32,
    pub iq_ki: f32,
    /// Input inductance [H]
    pub inductance: f32,
    /// Line angular frequency used for decoupling [rad/s]
    pub line_omega: f32,
}

/// Inverter loop parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverterConfig {
    /// Output angle rate [rad/s]
    pub omega: f32,
    pub vd_kp: f32,
    pub vd_ki: f32,
    pub vq_kp: f32,
    pub vq_ki: f32,
    /// Steady-state d-axis reference [V]
    pub vd_target: f32,
    /// q-axis reference [V]
    pub vq_ref: f32,
    /// Ramp increment per tick [V]
    pub ramp_step: f32,
    /// Ramp value after a disable [V]
    pub ramp_restart: f32,
}

/// Duty synthesis parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulatorConfig {
    /// Smallest bus voltage used as a divisor [V]
    pub min_bus_voltage: f32,
}

/// Complete converter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConverterConfig {
    /// Tick period [s]
    pub sample_period: f32,
    /// Cycles one tick may take before it counts as an overrun
    pub tick_budget_cycles: u32,
    pub topology: Topology,
    pub pll: PllConfig,
    pub rectifier: RectifierConfig,
    pub inverter: InverterConfig,
    pub modulator: ModulatorConfig,
    pub adc: AdcCalibration,
}

/// Reasons a configuration is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Sample period is zero, negative or not finite
    InvalidSamplePeriod,
    /// Tick budget of zero cycles
    InvalidTickBudget,
    /// Tick budget longer than the sample period the loops integrate over
    TickBudgetAboveSamplePeriod,
    /// Ramp step is zero, negative or not finite
    InvalidRampStep,
    /// Ramp restart value lies above the ramp target
    RampRestartAboveTarget,
    /// Bus voltage guard is zero, negative or not finite
    InvalidBusGuard,
}

impl ConverterConfig {
    /// Bench defaults (rack 1 back-to-back)
    pub const fn default() -> Self {
        Self {
            sample_period: DEFAULT_SAMPLE_PERIOD,
            tick_budget_cycles: timing::DEFAULT_TICK_BUDGET_CYCLES,
            topology: Topology::BackToBackRack1,
            pll: PllConfig {
                kp: pll::DEFAULT_KP,
                ki: pll::DEFAULT_KI,
                initial_omega: pll::DEFAULT_INITIAL_OMEGA,
            },
            rectifier: RectifierConfig {
                vdc_ref: afe::DEFAULT_VDC_REF,
                vdc_kp: afe::DEFAULT_VDC_KP,
                vdc_ki: afe::DEFAULT_VDC_KI,
                id_kp: afe::DEFAULT_CURRENT_KP,
                id_ki: afe::DEFAULT_CURRENT_KI,
                iq_kp: afe::DEFAULT_CURRENT_KP,
                iq_ki: afe::DEFAULT_CURRENT_KI,
                inductance: afe::DEFAULT_INDUCTANCE,
                line_omega: afe::DEFAULT_LINE_OMEGA,
            },
            inverter: InverterConfig {
                omega: inv::DEFAULT_OMEGA,
                vd_kp: inv::DEFAULT_VOLTAGE_KP,
                vd_ki: inv::DEFAULT_VOLTAGE_KI,
                vq_kp: inv::DEFAULT_VOLTAGE_KP,
                vq_ki: inv::DEFAULT_VOLTAGE_KI,
                vd_target: inv::DEFAULT_VD_TARGET,
                vq_ref: 0.0,
                ramp_step: inv::DEFAULT_RAMP_STEP,
                ramp_restart: inv::DEFAULT_RAMP_RESTART,
            },
            modulator: ModulatorConfig {
                min_bus_voltage: modulator::DEFAULT_MIN_BUS_VOLTAGE,
            },
            adc: AdcCalibration::default(),
        }
    }

    /// Same defaults on another converter variant
    pub const fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Check the parameters the loops divide by or step with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_period.is_finite() && self.sample_period > 0.0) {
            return Err(ConfigError::InvalidSamplePeriod);
        }
        if self.tick_budget_cycles == 0 {
            return Err(ConfigError::InvalidTickBudget);
        }
        let tick_cycles = self.sample_period * timing::CORE_CLOCK_HZ as f32;
        if self.tick_budget_cycles as f32 > tick_cycles + 1.0 {
            return Err(ConfigError::TickBudgetAboveSamplePeriod);
        }
        let ramp = &self.inverter;
        if !(ramp.ramp_step.is_finite() && ramp.ramp_step > 0.0) {
            return Err(ConfigError::InvalidRampStep);
        }
        if ramp.ramp_restart > ramp.vd_target {
            return Err(ConfigError::RampRestartAboveTarget);
        }
        let guard = self.modulator.min_bus_voltage;
        if !(guard.is_finite() && guard > 0.0) {
            return Err(ConfigError::InvalidBusGuard);
        }
        Ok(())
    }
}
