//! Analog monitor task
//!
//! Drains the monitor queue into the I2C DAC. The only place that blocks on
//! the bus.

use grid_converter::monitor::write_frame;

use crate::hardware::I2cDac;
use crate::state::MONITOR_QUEUE;

#[embassy_executor::task]
pub async fn monitor_task(mut dac: I2cDac) {
    info!("Monitor DAC task started");

    let mut errors = 0u32;
    loop {
        let frame = MONITOR_QUEUE.receive().await;
        if let Err(e) = write_frame(&mut dac, &frame) {
            errors = errors.wrapping_add(1);
            if errors == 1 {
                error!("DAC write failed: {:?}", e);
            }
        }
    }
}
