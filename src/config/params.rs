//! Default control and hardware parameters
//!
//! Values match the bench converter (208 V input, 360 V bus, 170 V peak
//! inverter output). Gains are tuning data, not part of the algorithm.

use core::f32::consts::TAU;

/// Control tick period [s], one PWM carrier period
pub const DEFAULT_SAMPLE_PERIOD: f32 = timing::TICK_PERIOD_US as f32 / 1.0e6;

/// Grid PLL
pub mod pll {
    pub const DEFAULT_KP: f32 = 10.0;
    pub const DEFAULT_KI: f32 = 500.0;
    /// Frequency estimate at power-up [rad/s]
    pub const DEFAULT_INITIAL_OMEGA: f32 = 0.0;
}

/// Active front-end rectifier
pub mod afe {
    use super::TAU;

    /// DC bus voltage reference [V]
    pub const DEFAULT_VDC_REF: f32 = 360.0;
    pub const DEFAULT_VDC_KP: f32 = 0.2;
    pub const DEFAULT_VDC_KI: f32 = 10.0;
    pub const DEFAULT_CURRENT_KP: f32 = 5.0;
    pub const DEFAULT_CURRENT_KI: f32 = 50.0;
    /// Input inductance used by the decoupling terms [H]
    pub const DEFAULT_INDUCTANCE: f32 = 0.0012;
    /// Nominal line frequency [Hz]
    pub const NOMINAL_LINE_HZ: f32 = 60.0;
    /// Nominal line angular frequency [rad/s]
    pub const DEFAULT_LINE_OMEGA: f32 = TAU * NOMINAL_LINE_HZ;
}

/// Output inverter
pub mod inv {
    /// Output angle accumulator rate [rad/s]
    pub const DEFAULT_OMEGA: f32 = 377.0;
    pub const DEFAULT_VOLTAGE_KP: f32 = 0.1;
    pub const DEFAULT_VOLTAGE_KI: f32 = 10.0;
    /// d-axis voltage target [V peak]
    pub const DEFAULT_VD_TARGET: f32 = 170.0;
    /// d-axis reference increment per tick [V]
    pub const DEFAULT_RAMP_STEP: f32 = 0.00283;
    /// d-axis reference restored on disable [V]
    pub const DEFAULT_RAMP_RESTART: f32 = 10.0;
}

/// Modulator limits
pub mod modulator {
    /// Smallest bus voltage used as a divisor [V]
    pub const DEFAULT_MIN_BUS_VOLTAGE: f32 = 1.0;
    /// PWM carrier period in timer counts
    pub const DEFAULT_PWM_PERIOD: u16 = 4250;
}

/// ADC front-end calibration (`value = gain * (raw - offset)`)
pub mod adc {
    /// Mid-scale count of the bipolar 12-bit front-end
    pub const MID_SCALE: u16 = 2048;
    /// Phase current gain [A/count]
    pub const CURRENT_GAIN: f32 = 0.01723;
    /// DC bus gain [V/count]
    pub const BUS_VOLTAGE_GAIN: f32 = 0.2687;
    /// Phase voltage gain [V/count]
    pub const PHASE_VOLTAGE_GAIN: f32 = 0.1705;
    /// Full-scale count of the 12-bit converter
    pub const FULL_SCALE: u16 = 4096;
}

/// Analog monitor DAC
pub mod dac {
    /// Output span [V]
    pub const FULL_SCALE_VOLTS: f32 = 3.0;
    /// Largest 8-bit DAC code
    pub const MAX_CODE: u8 = 255;
    /// Monitor frames queued between the background loop and the DAC task
    pub const QUEUE_DEPTH: usize = 4;
    /// 7-bit I2C address of the quad DAC
    pub const I2C_ADDRESS: u8 = 0x0C;
    /// Internal channel address byte, DAC1..DAC4
    pub const CHANNEL_ADDRESSES: [u8; 4] = [0x01, 0x02, 0x04, 0x08];
    /// Control nibble OR-ed into the first data byte (power-down, CLR, LDAC)
    pub const CHANNEL_SETTINGS: [u8; 4] = [0x30, 0x30, 0x30, 0x20];
    /// Volts per ADC count when an input is mirrored on the DAC
    pub const VOLTS_PER_COUNT: f32 = FULL_SCALE_VOLTS / super::adc::FULL_SCALE as f32;
}

/// Tick scheduling
pub mod timing {
    /// Core clock [Hz]
    pub const CORE_CLOCK_HZ: u32 = 170_000_000;
    /// Tick period [µs], matches the 20 kHz carrier
    pub const TICK_PERIOD_US: u64 = 50;
    /// Cycle budget of one tick
    pub const DEFAULT_TICK_BUDGET_CYCLES: u32 =
        (CORE_CLOCK_HZ as u64 * TICK_PERIOD_US / 1_000_000) as u32;
}

/// Diagnostic ring buffer depth
pub const DIAGNOSTIC_CAPACITY: usize = 168;
