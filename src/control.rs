// Per-tick control algorithms
// Grid PLL, rectifier and inverter loops, shared transforms and duty synthesis

pub mod inverter;
pub mod mode;
pub mod modulator;
pub mod pi_controller;
pub mod pll;
pub mod ramp;
pub mod rectifier;
pub mod transforms;

// Re-export main types for easier access
pub use inverter::{InverterController, InverterOutput};
pub use mode::{ModeTracker, StageMode, Transition};
pub use modulator::{duty_to_compare, DutyCycles, Modulation, Modulator};
pub use pi_controller::PiController;
pub use pll::{GridPll, PllOutput};
pub use ramp::Ramp;
pub use rectifier::{RectifierController, RectifierOutput};
pub use transforms::{abc_to_dq, advance_angle, dq_to_abc, Abc, Dq, PhaseAngles};
