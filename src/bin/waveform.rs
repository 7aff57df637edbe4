//! Lab 2: waveform playback resumed across Standby.
//!
//! Each boot plays the waveform stored in the backup register (the first
//! one after power-on) on PA4. After one full cycle the next index is
//! stored and the core enters Standby; the RTC alarm resets it about
//! 8 seconds later. The user button skips to the next waveform.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, block_for};
use lowpower_lab::{
    board::{self, Board, DacOutput, EVENTS, transfer_monitor},
    config::{ControllerConfig, HALT_BLINK_MS},
    controller::restore::RestoreLoop,
    indicator::halt_loop,
    power::PowerControl,
    store::PersistentStateStore,
};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
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
    let cause = board.drivers.power.reset_cause();
    let store = PersistentStateStore::boot(board.backup, cause);
    let output = DacOutput::new(board.dac_pin);

    spawner.spawn(transfer_monitor()).unwrap();

    let mut restore = RestoreLoop::new(
        &EVENTS,
        board.drivers,
        store,
        output,
        ControllerConfig::default(),
    );
    match restore.run().await {
        Ok(reset) => reset.park(cortex_m::asm::wfi),
        Err(halt) => {
            defmt::error!("restore loop halted in {}: {}", halt.state, halt.error);
            halt_loop(restore.leds_mut(), || {
                block_for(Duration::from_millis(u64::from(HALT_BLINK_MS)))
            })
        }
    }
}
