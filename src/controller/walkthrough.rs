//! Manual walk through every low-power state (Lab 1).
//!
//! ```text
//! Run     --(button press + release)-->  Stop
//! Stop    --(RTC alarm, ~5 s)-------->  Sleep
//! Sleep   --(button press + release)-->  Standby
//! Standby --(wake-up pin)------------>  [reset]
//! ```
//!
//! The path is strictly ordered and never revisits a state. Each state
//! waits for the button to be released before it starts listening, so the
//! press that led into it can't also lead out of it.

use heapless::Vec;

use super::{Drivers, Parts, arm_relative_alarm};
use crate::config::ControllerConfig;
use crate::error::{Error, Halt};
use crate::event::{EventFlags, WakeKind};
use crate::indicator::{LedPattern, StatusLeds};
use crate::power::{PowerControl, ResetPending};
use crate::rtc::RealTimeClock;
use crate::wake::{WakeSourceManager, WakeSources};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Run,
    Stop,
    Sleep,
    /// Terminal: left only through a device reset.
    Standby,
}

impl PowerState {
    pub const COUNT: usize = 4;

    /// LEDs shown while the state is active.
    pub const fn pattern(self) -> LedPattern {
        match self {
            PowerState::Run => LedPattern::Both,
            PowerState::Stop => LedPattern::Green,
            PowerState::Sleep => LedPattern::Blue,
            PowerState::Standby => LedPattern::Off,
        }
    }
}

pub struct Walkthrough<'a, W, R, P, L> {
    wake: WakeSourceManager<'a, W>,
    rtc: R,
    power: P,
    leds: L,
    config: ControllerConfig,
    state: PowerState,
    path: Vec<PowerState, { PowerState::COUNT }>,
}

impl<'a, W, R, P, L> Walkthrough<'a, W, R, P, L>
where
    W: WakeSources,
    R: RealTimeClock,
    P: PowerControl,
    L: StatusLeds,
{
    pub fn new(flags: &'a EventFlags, drivers: Drivers<W, R, P, L>, config: ControllerConfig) -> Self {
        let Parts {
            wake,
            rtc,
            power,
            mut leds,
        } = drivers.into_parts(flags);
        leds.show(PowerState::Run.pattern());
        let mut path = Vec::new();
        let _ = path.push(PowerState::Run);
        info!("walkthrough starting in {}", PowerState::Run);
        Self {
            wake,
            rtc,
            power,
            leds,
            config,
            state: PowerState::Run,
            path,
        }
    }

    /// Status LEDs, for the halt loop once the controller has stopped.
    pub fn leds_mut(&mut self) -> &mut L {
        &mut self.leds
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn path(&self) -> &[PowerState] {
        &self.path
    }

    /// Drives the whole walkthrough. Call once.
    ///
    /// Returns once Standby has been requested, or with the state that was
    /// active when an unrecoverable fault stopped progress.
    pub async fn run(&mut self) -> Result<ResetPending, Halt<PowerState>> {
        debug_assert_eq!(self.state, PowerState::Run, "walkthrough already ran");

        self.wait_for_tap().await;
        self.enter(PowerState::Stop);

        if let Err(error) = self.stop().await {
            return Err(self.halt(error));
        }
        self.enter(PowerState::Sleep);

        self.sleep().await;
        self.enter(PowerState::Standby);

        Ok(self.standby())
    }

    async fn wait_for_tap(&mut self) {
        self.wake.wait_for_release().await;
        self.wake.wait_for_press().await;
        self.wake.wait_for_release().await;
    }

    async fn stop(&mut self) -> Result<(), Error> {
        arm_relative_alarm(
            &mut self.wake,
            &mut self.rtc,
            &self.config.rtc,
            self.config.stop_timeout,
        )?;

        let power = &mut self.power;
        self.wake.suspend(WakeKind::Alarm, || power.enter_stop());

        let event = self.wake.wait_for(WakeKind::Alarm).await;
        self.rtc.clear_alarm();
        debug!("left stop on {}", event);
        Ok(())
    }

    async fn sleep(&mut self) {
        self.wake.wait_for_release().await;
        self.wake.arm_exclusive(WakeKind::Button);

        let power = &mut self.power;
        self.wake.suspend(WakeKind::Button, || power.enter_sleep());

        self.wake.wait_for_press().await;
        self.wake.wait_for_release().await;
    }

    fn standby(&mut self) -> ResetPending {
        self.wake.arm_exclusive(WakeKind::WakeupPin);
        self.power.clear_wake_flags();
        self.power.enter_standby();
        ResetPending::new()
    }

    fn enter(&mut self, next: PowerState) {
        debug_assert!(next > self.state, "{:?} -> {:?} goes backwards", self.state, next);
        info!("{} -> {}", self.state, next);
        self.state = next;
        self.leds.show(next.pattern());
        let _ = self.path.push(next);
    }

    fn halt(&mut self, error: Error) -> Halt<PowerState> {
        error!("halting in {}: {}", self.state, error);
        Halt {
            error,
            state: self.state,
        }
    }
}
