//! Task module
//!
//! One file per embassy task.

pub mod can;
pub mod control;
pub mod monitor;
pub mod supervisor;

pub use can::can_task;
pub use control::control_task;
pub use monitor::monitor_task;
pub use supervisor::supervisor_task;
