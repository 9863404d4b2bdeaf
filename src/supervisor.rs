//! Background supervisor
//!
//! Runs outside the tick: applies enable commands and feeds the analog
//! monitor queue. Nothing here blocks.

use embedded_can::Id;

use crate::can_protocol::{decode_enable_frame, CommandError, EnableCommand};
use crate::config::Topology;
use crate::hardware::Stage;
use crate::monitor::{monitor_frames, MonitorQueue};
use crate::state::{Fault, SharedState};

/// Outcome of one monitor pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorPass {
    /// No tick has published samples yet
    NoSamples,
    /// Frames queued and dropped this pass
    Published { queued: u8, dropped: u8 },
}

pub struct Supervisor<'a> {
    topology: Topology,
    shared: &'a SharedState,
    queue: &'a MonitorQueue,
}

impl<'a> Supervisor<'a> {
    pub const fn new(topology: Topology, shared: &'a SharedState, queue: &'a MonitorQueue) -> Self {
        Self {
            topology,
            shared,
            queue,
        }
    }

    /// Set a stage enable directly (the only path on topologies without CAN enables)
    pub fn command(&self, stage: Stage, enabled: bool) {
        let previous = self.shared.commands.mode(stage).is_enabled();
        self.shared.commands.set(stage, enabled);
        if previous != enabled {
            info!("{} enable -> {}", stage, enabled);
        }
    }

    /// Apply a received CAN frame if it is an enable command for this topology
    pub fn handle_frame(&self, id: Id, data: &[u8]) -> Result<EnableCommand, CommandError> {
        match decode_enable_frame(self.topology, id, data) {
            Ok(cmd) => {
                self.command(cmd.stage, cmd.enabled);
                Ok(cmd)
            }
            Err(CommandError::UnknownId) => Err(CommandError::UnknownId),
            Err(e) => {
                warn!("Enable frame ignored: {}", e);
                Err(e)
            }
        }
    }

    /// Queue both monitor frames built from the latest samples
    ///
    /// A full queue drops the frame and raises [`Fault::MonitorBackpressure`].
    pub fn publish_monitor(&self) -> MonitorPass {
        let Some(raw) = self.shared.samples.latest() else {
            return MonitorPass::NoSamples;
        };

        let mut queued = 0;
        let mut dropped = 0;
        for frame in monitor_frames(self.topology, &raw) {
            if self.queue.try_send(frame).is_ok() {
                queued += 1;
            } else {
                dropped += 1;
                if self.shared.faults.raise(Fault::MonitorBackpressure) {
                    warn!("Monitor queue full, dropping frames");
                }
            }
        }
        MonitorPass::Published { queued, dropped }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }
}
