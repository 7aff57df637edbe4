//! Compile-time configuration for both lab scenarios.
//!
//! The RTC runs from the LSI (~40 kHz). With the prescalers below the
//! calendar ticks at roughly 1 Hz; the exact rate drifts with LSI dispersion,
//! which is why these timeouts are approximate.

use core::time::Duration;

/// Time spent in Stop before the RTC alarm wakes the device (Lab 1).
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Time spent in Standby before the RTC alarm resets the device (Lab 2).
pub const STANDBY_RESTORE_TIMEOUT: Duration = Duration::from_secs(8);

/// RTC asynchronous prescaler (`PREDIV_A`).
pub const RTC_ASYNC_PREDIV: u8 = 0x7F;

/// RTC synchronous prescaler (`PREDIV_S`).
pub const RTC_SYNC_PREDIV: u16 = 0x0138;

/// Iterations to spin on an RTC/LSI readiness flag before giving up.
pub const RTC_READY_SPIN_LIMIT: u32 = 0x0010_0000;

/// Sample trigger timer prescaler (TIM2 `PSC`).
pub const SAMPLE_TIMER_PRESCALER: u16 = 0x3;

/// Sample trigger timer auto-reload (TIM2 `ARR`, 32-bit counter).
pub const SAMPLE_TIMER_PERIOD: u32 = 0x000E_4EB2;

/// How often the board samples the DMA transfer-complete flag.
pub const TRANSFER_POLL_INTERVAL_MS: u64 = 10;

/// Delay after boot so a debug probe can attach before the first suspend.
pub const DEBUGGER_ATTACH_SECS: u64 = 3;

/// Halt loop toggle period.
pub const HALT_BLINK_MS: u32 = 250;

/// Timing consumed by the power-mode controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Relative alarm offset armed on Stop entry.
    pub stop_timeout: Duration,
    /// Relative alarm offset armed on StandbyRestore entry.
    pub restore_timeout: Duration,
    /// RTC prescalers applied by each RTC (re)initialization.
    pub rtc: RtcConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            stop_timeout: STOP_TIMEOUT,
            restore_timeout: STANDBY_RESTORE_TIMEOUT,
            rtc: RtcConfig::default(),
        }
    }
}

/// RTC prescaler pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcConfig {
    pub async_prediv: u8,
    pub sync_prediv: u16,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            async_prediv: RTC_ASYNC_PREDIV,
            sync_prediv: RTC_SYNC_PREDIV,
        }
    }
}
