//! Global shared state
//!
//! Statics shared between the control tick and the background tasks.

use grid_converter::monitor::MonitorQueue;
use grid_converter::{SharedState, Supervisor};

use crate::config::TOPOLOGY;

/// Enable flags, fault indicator and sample mailbox
pub static SHARED: SharedState = SharedState::new();

/// Frames waiting for the DAC task
pub static MONITOR_QUEUE: MonitorQueue = MonitorQueue::new();

/// Command and monitor handling outside the tick
pub static SUPERVISOR: Supervisor<'static> = Supervisor::new(TOPOLOGY, &SHARED, &MONITOR_QUEUE);
