#![no_std]
#![no_main]

mod fmt;

mod config;
mod hardware;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_time::{Duration, Timer};

use hardware::Board;
use tasks::{can_task, control_task, monitor_task, supervisor_task};

/// Executor for the control tick, preempts every thread-mode task
static EXECUTOR_CONTROL: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_CONTROL.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(hardware::create_clock_config());

    info!("Grid converter controller, STM32G431VB @ 170MHz");
    info!(
        "Topology: {}, Vdc ref {}V, T={}s",
        config::TOPOLOGY,
        config::CONVERTER.rectifier.vdc_ref,
        config::CONVERTER.sample_period
    );

    unsafe {
        hardware::enable_cycle_counter();
    }

    let (board, background) = Board::init(p);

    // CAN: enable frames use extended identifiers
    let mut can_configurator = background.can;
    can_configurator.properties().set_extended_filter(
        embassy_stm32::can::filter::ExtendedFilterSlot::_0,
        embassy_stm32::can::filter::ExtendedFilter::accept_all_into_fifo1(),
    );
    can_configurator.set_bitrate(config::can::BITRATE);
    let can = can_configurator.start(embassy_stm32::can::OperatingMode::NormalOperationMode);
    spawner.spawn(can_task(can)).unwrap();

    spawner
        .spawn(monitor_task(hardware::I2cDac::new(background.i2c)))
        .unwrap();
    spawner.spawn(supervisor_task()).unwrap();

    // Control tick on the interrupt executor
    interrupt::UART4.set_priority(Priority::P6);
    let control_spawner = EXECUTOR_CONTROL.start(interrupt::UART4);
    control_spawner.spawn(control_task(board)).unwrap();

    info!("Converter control running");

    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
