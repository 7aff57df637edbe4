//! Power-mode state machines.
//!
//! - [`walkthrough`]: Run → Stop → Sleep → Standby, driven by the button and
//!   an RTC timeout (Lab 1).
//! - [`restore`]: Run → StandbyRestore, persisting the next waveform index so
//!   playback resumes after the Standby reset (Lab 2).
//!
//! Both run in the foreground context only. They are the single writer of
//! power state and of the persistent store.

pub mod restore;
pub mod walkthrough;

use core::time::Duration;

use crate::config::RtcConfig;
use crate::error::{Error, RtcError};
use crate::event::EventFlags;
use crate::rtc::{AlarmSchedule, RealTimeClock};
use crate::wake::{WakeSourceManager, WakeSources};

/// Board drivers shared by both controllers.
pub struct Drivers<W, R, P, L> {
    pub sources: W,
    pub rtc: R,
    pub power: P,
    pub leds: L,
}

/// Split [`Drivers`] with the wake sources already under a manager.
pub(crate) struct Parts<'a, W, R, P, L> {
    pub wake: WakeSourceManager<'a, W>,
    pub rtc: R,
    pub power: P,
    pub leds: L,
}

impl<W: WakeSources, R, P, L> Drivers<W, R, P, L> {
    pub(crate) fn into_parts<'a>(self, flags: &'a EventFlags) -> Parts<'a, W, R, P, L> {
        Parts {
            wake: WakeSourceManager::new(flags, self.sources),
            rtc: self.rtc,
            power: self.power,
            leds: self.leds,
        }
    }
}

/// Brings the RTC up and arms its alarm as the sole wake source, `offset`
/// from now.
///
/// Run on every entry into a state that relies on the alarm for forward
/// progress; a failure here is unrecoverable.
pub(crate) fn arm_relative_alarm<W: WakeSources, R: RealTimeClock>(
    wake: &mut WakeSourceManager<'_, W>,
    rtc: &mut R,
    config: &RtcConfig,
    offset: Duration,
) -> Result<AlarmSchedule, Error> {
    rtc.init(config)?;
    if !rtc.clock_ready() {
        return Err(RtcError::LsiNotReady.into());
    }
    let now = rtc.time();
    let schedule = AlarmSchedule::after(now, offset);
    rtc.set_alarm(&schedule)?;
    wake.arm_timeout(offset);
    debug!("alarm armed for {} (now {})", schedule.at, now);
    Ok(schedule)
}
