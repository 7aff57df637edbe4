//! PWR low-power primitives and reset cause.

use cortex_m::{asm, peripheral::SCB};
use embassy_stm32::pac;
use pac::pwr::vals::Pdds;

use crate::power::{PowerControl, ResetCause};

pub struct PowerBoard {
    scb: SCB,
}

impl PowerBoard {
    pub fn new(scb: SCB) -> Self {
        pac::RCC.apb1enr().modify(|w| w.set_pwren(true));
        Self { scb }
    }

    fn deep_sleep(&mut self) {
        self.scb.set_sleepdeep();
        asm::dsb();
        asm::wfi();
        self.scb.clear_sleepdeep();
    }
}

impl PowerControl for PowerBoard {
    fn reset_cause(&mut self) -> ResetCause {
        let pwr = pac::PWR;
        let rcc = pac::RCC;

        let cause = if pwr.csr().read().sbf() {
            ResetCause::StandbyWake
        } else if rcc.csr().read().porrstf() {
            ResetCause::PowerOn
        } else {
            ResetCause::Other
        };

        pwr.cr().modify(|w| {
            w.set_csbf(true);
            w.set_cwuf(true);
        });
        rcc.csr().modify(|w| w.set_rmvf(true));
        info!("reset cause: {}", cause);
        cause
    }

    fn clear_wake_flags(&mut self) {
        clear_wakeup_flag();
    }

    fn enter_stop(&mut self) {
        pac::PWR.cr().modify(|w| {
            w.set_pdds(Pdds::STOP_MODE);
            w.set_lpds(true);
        });
        self.deep_sleep();
        // Wakes on HSI, the same clock `embassy_stm32::init` runs the
        // core from.
    }

    fn enter_sleep(&mut self) {
        self.scb.clear_sleepdeep();
        asm::dsb();
        asm::wfi();
    }

    fn enter_standby(&mut self) {
        pac::PWR.cr().modify(|w| {
            w.set_pdds(Pdds::STANDBY_MODE);
            w.set_cwuf(true);
        });
        self.deep_sleep();
    }
}

/// Clears WUF, which would otherwise end the next Standby at once.
pub(super) fn clear_wakeup_flag() {
    pac::PWR.cr().modify(|w| w.set_cwuf(true));
}

/// Enables or disables the WKUP1 (PA0) Standby wake-up pin.
pub(super) fn set_wakeup_pin(enabled: bool) {
    pac::PWR.csr().modify(|w| w.set_ewup(0, enabled));
}

/// Keeps the debug port clocked through Stop and Standby.
#[cfg(feature = "debug-mode")]
pub(super) fn keep_debugger_attached() {
    pac::RCC.apb2enr().modify(|w| w.set_dbgmcuen(true));
    pac::DBGMCU.cr().modify(|w| {
        w.set_dbg_stop(true);
        w.set_dbg_standby(true);
    });
}
