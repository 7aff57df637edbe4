//! Wake source routing: EXTI lines, NVIC and the WKUP1 pin.
//!
//! The interrupt handlers here only acknowledge the hardware and record an
//! edge into [`EVENTS`]; whether the edge counts is decided by the armed
//! mask in the flags.

use cortex_m::peripheral::NVIC;
use embassy_stm32::{gpio::Input, interrupt as irq, pac};
use pac::gpio::vals::Idr;
use pac::interrupt;

use super::pwr::{clear_wakeup_flag, set_wakeup_pin};
use super::{EVENTS, dac, rtc};
use crate::event::{Edge, WakeKind};
use crate::wake::WakeSources;

/// EXTI line of PA0, also its pin number.
const BUTTON_EXTI_LINE: usize = 0;

/// EXTI line of the RTC alarm (fixed at line 17 on STM32F0).
const ALARM_EXTI_LINE: usize = 17;

/// IMR register index for lines 0-31
const IMR1_REG_IDX: usize = 0;

pub struct ExtiWakeSources {
    button: Input<'static>,
}

impl ExtiWakeSources {
    /// Routes PA0 and the RTC alarm to their EXTI lines, all masked.
    ///
    /// PA0 is EXTI line 0's reset selection in SYSCFG_EXTICR1, so only the
    /// edge triggers are set up here.
    pub fn new(button: Input<'static>) -> Self {
        let exti = pac::EXTI;
        exti.rtsr(IMR1_REG_IDX).modify(|w| {
            w.set_line(BUTTON_EXTI_LINE, true);
            w.set_line(ALARM_EXTI_LINE, true);
        });
        exti.ftsr(IMR1_REG_IDX)
            .modify(|w| w.set_line(BUTTON_EXTI_LINE, true));

        // Lines are gated at the EXTI mask from here on; the NVIC stays open.
        unsafe {
            NVIC::unmask(irq::EXTI0_1);
            NVIC::unmask(irq::RTC);
        }

        Self { button }
    }

    fn set_exti_mask(line: usize, enabled: bool) {
        pac::EXTI
            .imr(IMR1_REG_IDX)
            .modify(|w| w.set_line(line, enabled));
    }

    fn clear_exti_pending(line: usize) {
        pac::EXTI
            .pr(IMR1_REG_IDX)
            .write(|w| w.set_line(line, true));
    }
}

impl WakeSources for ExtiWakeSources {
    fn clear_pending(&mut self, kind: WakeKind) {
        match kind {
            WakeKind::Button => {
                Self::clear_exti_pending(BUTTON_EXTI_LINE);
                NVIC::unpend(irq::EXTI0_1);
            }
            WakeKind::Alarm => {
                rtc::clear_alarm_flag();
                Self::clear_exti_pending(ALARM_EXTI_LINE);
                NVIC::unpend(irq::RTC);
            }
            WakeKind::TransferComplete => dac::clear_transfer_complete(),
            WakeKind::WakeupPin => clear_wakeup_flag(),
        }
    }

    fn enable(&mut self, kind: WakeKind) {
        match kind {
            WakeKind::Button => Self::set_exti_mask(BUTTON_EXTI_LINE, true),
            WakeKind::Alarm => Self::set_exti_mask(ALARM_EXTI_LINE, true),
            WakeKind::TransferComplete => dac::set_monitoring(true),
            WakeKind::WakeupPin => set_wakeup_pin(true),
        }
    }

    fn disable(&mut self, kind: WakeKind) {
        match kind {
            WakeKind::Button => Self::set_exti_mask(BUTTON_EXTI_LINE, false),
            WakeKind::Alarm => Self::set_exti_mask(ALARM_EXTI_LINE, false),
            WakeKind::TransferComplete => dac::set_monitoring(false),
            WakeKind::WakeupPin => set_wakeup_pin(false),
        }
    }

    fn button_held(&self) -> bool {
        self.button.is_high()
    }
}

/// Button interrupt handler (EXTI lines 0 and 1).
///
/// Both edges are triggered; the pin level after the edge tells which one
/// it was.
#[interrupt]
fn EXTI0_1() {
    ExtiWakeSources::clear_exti_pending(BUTTON_EXTI_LINE);

    let held = pac::GPIOA.idr().read().idr(BUTTON_EXTI_LINE) == Idr::HIGH;
    EVENTS.record(if held {
        Edge::ButtonPressed
    } else {
        Edge::ButtonReleased
    });
}

/// RTC alarm interrupt handler (EXTI line 17).
#[interrupt]
fn RTC() {
    rtc::clear_alarm_flag();
    ExtiWakeSources::clear_exti_pending(ALARM_EXTI_LINE);
    EVENTS.record(Edge::AlarmMatched);
}
