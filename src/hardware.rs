//! Peripheral contract
//!
//! Everything the control tick needs from the board. The firmware binds it to
//! the STM32 timers, ADC and GPIO; tests bind it to a simulated plant.

use crate::sampler::RawSamples;

/// Power stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Active front-end rectifier
    Rectifier,
    /// Output inverter
    Inverter,
}

/// Phase of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];
}

/// One half-bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmLeg {
    pub stage: Stage,
    pub phase: Phase,
}

impl PwmLeg {
    pub const fn new(stage: Stage, phase: Phase) -> Self {
        Self { stage, phase }
    }
}

/// Board access used from the control tick
///
/// All calls are non-blocking. Compare values written in one tick take effect
/// at the next carrier zero.
pub trait ConverterHardware {
    /// Latest conversion of every analog input
    fn sample_analog_inputs(&mut self) -> RawSamples;

    /// Compare value of one leg, `count` in `[0, pwm_period()]`
    fn write_pwm_duty(&mut self, leg: PwmLeg, count: u16);

    /// Carrier period in timer counts
    fn pwm_period(&self) -> u16;

    /// Gate driver enable; the implementation drives the active-low line
    fn set_driver_enable(&mut self, stage: Stage, enabled: bool);

    /// Free-running core cycle counter
    fn cycle_count(&self) -> u32;

    /// Scope pin held high for the duration of the tick
    fn set_timing_probe(&mut self, high: bool);
}
