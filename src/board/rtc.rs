//! RTC on the LSI oscillator.
//!
//! Every alarm write goes through the write-protection key sequence, and
//! prescaler writes also go through init mode. Readiness flags are polled
//! with a bounded spin so a dead oscillator turns into an [`RtcError`]
//! instead of a hang.

use embassy_stm32::pac;
use pac::rcc::vals::Rtcsel;
use pac::rtc::vals::AlrmrMsk;

use super::backup::enable_backup_access;
use crate::config::{RTC_READY_SPIN_LIMIT, RtcConfig};
use crate::error::RtcError;
use crate::rtc::{AlarmMask, AlarmSchedule, RealTimeClock, TimeOfDay};

/// RTC has a single alarm (A) on STM32F0.
const ALARM_A: usize = 0;

fn spin_until(ready: impl Fn() -> bool, error: RtcError) -> Result<(), RtcError> {
    for _ in 0..RTC_READY_SPIN_LIMIT {
        if ready() {
            return Ok(());
        }
    }
    Err(error)
}

/// Splits a BCD byte into its tens and units digits.
const fn digits(bcd: u8) -> (u8, u8) {
    (bcd >> 4, bcd & 0x0F)
}

/// Runs `f` with RTC write protection lifted, restoring it afterwards.
fn unlocked<T>(f: impl FnOnce() -> T) -> T {
    let rtc = pac::RTC;
    rtc.wpr().write(|w| w.set_key(0xCA));
    rtc.wpr().write(|w| w.set_key(0x53));
    let result = f();
    rtc.wpr().write(|w| w.set_key(0xFF));
    result
}

/// Runs `f` in calendar init mode.
fn in_init_mode(f: impl FnOnce()) -> Result<(), RtcError> {
    let rtc = pac::RTC;
    unlocked(|| {
        rtc.isr().modify(|w| w.set_init(true));
        if let Err(e) = spin_until(|| rtc.isr().read().initf(), RtcError::InitModeTimeout) {
            rtc.isr().modify(|w| w.set_init(false));
            return Err(e);
        }
        f();
        rtc.isr().modify(|w| w.set_init(false));
        Ok(())
    })?;

    // Shadow registers are stale until the next resynchronisation.
    rtc.isr().modify(|w| w.set_rsf(false));
    spin_until(|| rtc.isr().read().rsf(), RtcError::SyncTimeout)
}

pub struct LsiRtc {
    _private: (),
}

impl LsiRtc {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl RealTimeClock for LsiRtc {
    fn init(&mut self, config: &RtcConfig) -> Result<(), RtcError> {
        let rcc = pac::RCC;
        enable_backup_access();

        rcc.csr().modify(|w| w.set_lsion(true));
        spin_until(|| rcc.csr().read().lsirdy(), RtcError::LsiNotReady)?;

        let bdcr = rcc.bdcr().read();
        if bdcr.rtcsel() != Rtcsel::LSI || !bdcr.rtcen() {
            rcc.bdcr().modify(|w| {
                w.set_rtcsel(Rtcsel::LSI);
                w.set_rtcen(true);
            });
        }

        in_init_mode(|| {
            // Synchronous part first, then the asynchronous one (RM0091 27.3.7).
            let rtc = pac::RTC;
            rtc.prer().write(|w| w.set_prediv_s(config.sync_prediv));
            rtc.prer().write(|w| {
                w.set_prediv_s(config.sync_prediv);
                w.set_prediv_a(config.async_prediv);
            });
        })?;

        debug!("rtc running on LSI, prescalers {=u8:#x}/{=u16:#x}", config.async_prediv, config.sync_prediv);
        Ok(())
    }

    fn clock_ready(&self) -> bool {
        let rcc = pac::RCC;
        rcc.csr().read().lsirdy() && rcc.bdcr().read().rtcen()
    }

    fn time(&self) -> TimeOfDay {
        let tr = pac::RTC.tr().read();
        // Reading TR freezes the shadow date until DR is read.
        let _ = pac::RTC.dr().read();
        let bcd = |tens: u8, units: u8| tens << 4 | units;
        match TimeOfDay::from_bcd(bcd(tr.ht(), tr.hu()), bcd(tr.mnt(), tr.mnu()), bcd(tr.st(), tr.su())) {
            Ok(time) => time,
            Err(_) => {
                warn!("rtc holds invalid time {=u32:#x}", tr.0);
                TimeOfDay::MIDNIGHT
            }
        }
    }

    fn set_alarm(&mut self, alarm: &AlarmSchedule) -> Result<(), RtcError> {
        let rtc = pac::RTC;
        let [hours, minutes, seconds] = alarm.at.to_bcd();
        let hours_mask = match alarm.mask {
            AlarmMask::DateWeekDay => AlrmrMsk::TO_MATCH,
            AlarmMask::DateWeekDayHours => AlrmrMsk::NOT_MATCH,
        };

        unlocked(|| {
            rtc.cr().modify(|w| {
                w.set_alre(ALARM_A, false);
                w.set_alrie(ALARM_A, false);
            });
            spin_until(|| rtc.isr().read().alrwf(ALARM_A), RtcError::InitModeTimeout)?;
            rtc.alrmr(ALARM_A).write(|w| {
                let (tens, units) = digits(hours);
                w.set_ht(tens);
                w.set_hu(units);
                let (tens, units) = digits(minutes);
                w.set_mnt(tens);
                w.set_mnu(units);
                let (tens, units) = digits(seconds);
                w.set_st(tens);
                w.set_su(units);
                w.set_msk1(AlrmrMsk::TO_MATCH);
                w.set_msk2(AlrmrMsk::TO_MATCH);
                w.set_msk3(hours_mask);
                w.set_msk4(AlrmrMsk::NOT_MATCH);
            });
            rtc.isr().modify(|w| w.set_alrf(ALARM_A, false));
            rtc.cr().modify(|w| {
                w.set_alre(ALARM_A, true);
                w.set_alrie(ALARM_A, true);
            });
            Ok(())
        })
    }

    fn clear_alarm(&mut self) {
        let rtc = pac::RTC;
        unlocked(|| {
            rtc.cr().modify(|w| {
                w.set_alre(ALARM_A, false);
                w.set_alrie(ALARM_A, false);
            });
            rtc.isr().modify(|w| w.set_alrf(ALARM_A, false));
        });
    }
}

/// Clears ALRAF. Callable from the RTC interrupt.
pub(super) fn clear_alarm_flag() {
    pac::RTC.isr().modify(|w| w.set_alrf(ALARM_A, false));
}
