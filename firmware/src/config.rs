//! Board configuration
//!
//! Control parameters live in `grid_converter::config`; this module holds what
//! only the STM32 binding needs.

use embassy_time::Duration;
use grid_converter::config::{timing, Topology};
use grid_converter::ConverterConfig;

/// Converter variant this image is built for
pub const TOPOLOGY: Topology = Topology::BackToBackRack1;

/// Control parameters handed to the control task
pub const CONVERTER: ConverterConfig = ConverterConfig::default().with_topology(TOPOLOGY);

/// Control tick period
pub const TICK_PERIOD: Duration = Duration::from_micros(timing::TICK_PERIOD_US);

// Every integrator steps with `sample_period`, so it must be the Ticker period
const _: () = assert!(CONVERTER.sample_period == timing::TICK_PERIOD_US as f32 / 1.0e6);
const _: () = assert!(
    CONVERTER.tick_budget_cycles as u64
        <= timing::CORE_CLOCK_HZ as u64 * timing::TICK_PERIOD_US / 1_000_000
);

/// Background monitor pass period
pub const MONITOR_PERIOD: Duration = Duration::from_millis(5);

/// Ticks between status log lines (one second)
pub const STATUS_LOG_INTERVAL: u32 = 20_000;

/// PWM settings
pub mod pwm {
    use embassy_stm32::time::Hertz;

    /// Carrier frequency, center-aligned (4250 counts at 170 MHz)
    pub const FREQUENCY: Hertz = Hertz(20_000);

    /// Dead time in timer counts
    pub const DEAD_TIME: u16 = 170;
}

/// CAN settings
pub mod can {
    /// Bit rate of the rack bus
    pub const BITRATE: u32 = 250_000;
}

/// I2C settings for the monitor DAC
pub mod i2c {
    use embassy_stm32::time::Hertz;

    pub const FREQUENCY: Hertz = Hertz(400_000);
}
