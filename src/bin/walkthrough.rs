//! Lab 1: one pass through Run, Stop, Sleep and Standby.
//!
//! - **Run** (both LEDs): press and release the user button.
//! - **Stop** (green): the RTC alarm wakes the core after about 5 seconds.
//! - **Sleep** (blue): press and release the user button.
//! - **Standby** (off): press the button again (WKUP1) to reset and start
//!   over.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, block_for};
use lowpower_lab::{
    board::{self, Board, EVENTS},
    config::{ControllerConfig, HALT_BLINK_MS},
    controller::walkthrough::Walkthrough,
    indicator::halt_loop,
    power::PowerControl,
};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(board::config());
    let core = cortex_m::Peripherals::take().expect("core peripherals taken once");

    #[cfg(feature = "debug-mode")]
    {
        defmt::info!(
            "Waiting {} seconds for debugger connection...",
            lowpower_lab::config::DEBUGGER_ATTACH_SECS
        );
        embassy_time::Timer::after_secs(lowpower_lab::config::DEBUGGER_ATTACH_SECS).await;
    }

    let mut board = Board::new(p, core.SCB);
    board.drivers.power.reset_cause();

    let mut walkthrough = Walkthrough::new(&EVENTS, board.drivers, ControllerConfig::default());
    match walkthrough.run().await {
        Ok(reset) => reset.park(cortex_m::asm::wfi),
        Err(halt) => {
            defmt::error!("walkthrough halted in {}: {}", halt.state, halt.error);
            halt_loop(walkthrough.leds_mut(), || {
                block_for(Duration::from_millis(u64::from(HALT_BLINK_MS)))
            })
        }
    }
}
