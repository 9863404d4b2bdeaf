//! Control core of a back-to-back grid converter
//!
//! An active front-end rectifier regulates the DC bus from the grid, an
//! inverter regulates a three-phase output voltage from that bus. Both run
//! from one fixed-rate tick ([`control_task::ControlTask::tick`]); enable
//! commands and the analog monitor are handled by the
//! [`supervisor::Supervisor`] outside the tick.
#![cfg_attr(not(test), no_std)]

// must stay first so the logging macros are visible below
mod fmt;

pub mod can_protocol;
pub mod config;
pub mod control;
pub mod control_task;
pub mod diagnostics;
pub mod hardware;
pub mod monitor;
pub mod sampler;
pub mod state;
pub mod supervisor;

pub use config::{ConfigError, ConverterConfig, Topology};
pub use control_task::{ControlTask, TickReport};
pub use hardware::{ConverterHardware, Phase, PwmLeg, Stage};
pub use state::{Fault, FaultStatus, SharedState};
pub use supervisor::Supervisor;
