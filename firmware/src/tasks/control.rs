//! Control tick task
//!
//! Runs on the high-priority interrupt executor, one tick per period.

use embassy_time::Ticker;
use grid_converter::ControlTask;

use crate::config::{CONVERTER, STATUS_LOG_INTERVAL, TICK_PERIOD};
use crate::hardware::Board;
use crate::state::SHARED;

#[embassy_executor::task]
pub async fn control_task(mut board: Board) {
    let mut control = match ControlTask::new(CONVERTER, &SHARED) {
        Ok(control) => control,
        Err(e) => {
            error!("Invalid converter configuration: {}", e);
            return;
        }
    };

    info!("Control task started");

    let mut ticker = Ticker::every(TICK_PERIOD);
    let mut ticks = 0u32;

    loop {
        ticker.next().await;
        let report = control.tick(&mut board);

        ticks = ticks.wrapping_add(1);
        if ticks % STATUS_LOG_INTERVAL == 0 {
            debug!(
                "theta={} omega={} cycles={} faults={}",
                report.theta_grid,
                report.omega,
                report.elapsed_cycles,
                SHARED.faults.latched()
            );
        }
    }
}
