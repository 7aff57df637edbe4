//! STM32F0 Discovery (STM32F051R8) drivers.
//!
//! # Pin Assignments
//!
//! - **PA0**: User button B1, active high. EXTI line 0 while running, WKUP1
//!   in Standby.
//! - **PC9**: Green LED LD3
//! - **PC8**: Blue LED LD4
//! - **PA4**: DAC_OUT1
//!
//! # Peripherals
//!
//! - **RTC**: clocked from LSI, alarm A routed to EXTI line 17
//! - **TIM2**: sample trigger, TRGO on update
//! - **DAC channel 1**: triggered by TIM2 TRGO
//! - **DMA1 channel 3**: DAC channel 1 request, circular mode
//! - **RTC_BKP0R**: persisted waveform index
//!
//! `embassy-stm32` owns the clock tree, GPIO, the TIM3 time driver and the
//! DMA interrupt vectors. Everything else here goes through the PAC
//! directly. Register bits are named after RM0091.

mod backup;
mod dac;
mod pwr;
mod rtc;
mod wake;

pub use backup::BackupRegister;
pub use dac::{DacOutput, transfer_monitor};
pub use pwr::PowerBoard;
pub use rtc::LsiRtc;
pub use wake::ExtiWakeSources;

use cortex_m::peripheral::SCB;
use embassy_stm32::{
    Config, Peri,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals::PA4,
    rcc::{LsConfig, RtcClockSource},
};

use crate::controller::Drivers;
use crate::event::EventFlags;
use crate::indicator::Leds;

/// Edges recorded by the interrupt handlers in [`wake`] and by
/// [`transfer_monitor`].
pub static EVENTS: EventFlags = EventFlags::new();

pub type BoardLeds = Leds<Output<'static>, Output<'static>>;

pub type BoardDrivers = Drivers<ExtiWakeSources, LsiRtc, PowerBoard, BoardLeds>;

/// Clock configuration for both firmware images.
///
/// The RTC source matches what [`LsiRtc`] selects, so `embassy_stm32::init`
/// never sees a mismatch and never resets the backup domain on its own.
pub fn config() -> Config {
    let mut config = Config::default();
    config.rcc.ls = LsConfig {
        rtc: RtcClockSource::LSI,
        lsi: true,
        lse: None,
    };
    config
}

pub struct Board {
    pub drivers: BoardDrivers,
    pub backup: BackupRegister,
    /// Reserved for the DAC output, see [`DacOutput::new`].
    pub dac_pin: Peri<'static, PA4>,
}

impl Board {
    /// Takes the peripherals used by either firmware image.
    ///
    /// # Initial GPIO States
    ///
    /// - PC9 (LD3), PC8 (LD4): Low
    /// - PA0 (B1): Input, no pull (external pull-down on the board)
    pub fn new(p: embassy_stm32::Peripherals, scb: SCB) -> Self {
        #[cfg(feature = "debug-mode")]
        pwr::keep_debugger_attached();

        let button = Input::new(p.PA0, Pull::None);
        let leds = Leds::new(
            Output::new(p.PC9, Level::Low, Speed::Low),
            Output::new(p.PC8, Level::Low, Speed::Low),
        );

        Self {
            drivers: Drivers {
                sources: ExtiWakeSources::new(button),
                rtc: LsiRtc::new(),
                power: PowerBoard::new(scb),
                leds,
            },
            backup: BackupRegister::new(),
            dac_pin: p.PA4,
        }
    }
}
