//! Background supervisor task
//!
//! Turns the latest samples into monitor frames at a fixed pace.

use embassy_time::Ticker;
use grid_converter::supervisor::MonitorPass;

use crate::config::MONITOR_PERIOD;
use crate::state::SUPERVISOR;

#[embassy_executor::task]
pub async fn supervisor_task() {
    info!("Supervisor task started ({})", SUPERVISOR.topology());

    let mut ticker = Ticker::every(MONITOR_PERIOD);
    loop {
        ticker.next().await;
        if let MonitorPass::Published { dropped, .. } = SUPERVISOR.publish_monitor() {
            if dropped > 0 {
                trace!("Monitor frames dropped: {}", dropped);
            }
        }
    }
}
