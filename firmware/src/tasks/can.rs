//! CAN task
//!
//! Receives stage enable frames and hands them to the supervisor.

use embassy_stm32::can;
use grid_converter::can_protocol::enable_filter_ids;

use crate::config::TOPOLOGY;
use crate::state::SUPERVISOR;

#[embassy_executor::task]
pub async fn can_task(can: can::Can<'static>) {
    let (_tx, mut rx, _properties) = can.split();

    match enable_filter_ids(TOPOLOGY) {
        Some([afe, inv]) => info!(
            "CAN task started: AFE enable {:x}, INV enable {:x}",
            afe.as_raw(),
            inv.as_raw()
        ),
        None => info!("CAN task started: topology takes no CAN enables"),
    }

    loop {
        match rx.read().await {
            Ok(envelope) => {
                let frame = envelope.frame;
                // rejected frames are logged by the supervisor
                if let Ok(cmd) = SUPERVISOR.handle_frame(*frame.header().id(), frame.data()) {
                    debug!("Enable frame: {}", cmd);
                }
            }
            Err(e) => {
                error!("CAN receive error: {:?}", e);
            }
        }
    }
}
