//! Waveform playback that survives Standby (Lab 2).
//!
//! ```text
//! [boot] -> Run --(DMA transfer complete)--> StandbyRestore --(RTC alarm)--> [reset]
//!            ^ |
//!            +-+ button press: next waveform
//! ```
//!
//! The index of the waveform to play after the reset is written to the
//! backup register as the very last step before Standby, so an interrupt
//! taken while the transition is being set up can't leave a stale value.

use super::{Drivers, Parts, arm_relative_alarm};
use crate::config::ControllerConfig;
use crate::error::Halt;
use crate::event::{EventFlags, WakeEvent, WakeKind};
use crate::indicator::StatusLeds;
use crate::power::{PowerControl, ResetPending};
use crate::rtc::RealTimeClock;
use crate::store::{BackupDomain, PersistentStateStore};
use crate::waveform::{SampleOutput, WaveformIndex, WaveformSequencer};
use crate::wake::{WakeSourceManager, WakeSources};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Run,
    /// Terminal: the RTC alarm resets the device out of Standby.
    StandbyRestore,
}

pub struct RestoreLoop<'a, W, R, P, L, B, O> {
    wake: WakeSourceManager<'a, W>,
    rtc: R,
    power: P,
    leds: L,
    store: PersistentStateStore<B>,
    sequencer: WaveformSequencer<O>,
    config: ControllerConfig,
    state: PowerState,
    index: WaveformIndex,
}

impl<'a, W, R, P, L, B, O> RestoreLoop<'a, W, R, P, L, B, O>
where
    W: WakeSources,
    R: RealTimeClock,
    P: PowerControl,
    L: StatusLeds,
    B: BackupDomain,
    O: SampleOutput,
{
    /// Picks up the index left by the previous run. Nothing plays until
    /// [`run`](Self::run).
    pub fn new(
        flags: &'a EventFlags,
        drivers: Drivers<W, R, P, L>,
        store: PersistentStateStore<B>,
        output: O,
        config: ControllerConfig,
    ) -> Self {
        let Parts {
            wake,
            rtc,
            power,
            leds,
        } = drivers.into_parts(flags);
        let index = store.restore_index();
        Self {
            wake,
            rtc,
            power,
            leds,
            store,
            sequencer: WaveformSequencer::new(output),
            config,
            state: PowerState::Run,
            index,
        }
    }

    /// Status LEDs, for the halt loop once the controller has stopped.
    pub fn leds_mut(&mut self) -> &mut L {
        &mut self.leds
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Waveform playing now, or the one persisted for the next boot once
    /// Standby has been requested.
    pub fn index(&self) -> WaveformIndex {
        self.index
    }

    /// Plays until a full cycle of the current waveform completes, then
    /// persists the successor and requests Standby. Call once.
    pub async fn run(&mut self) -> Result<ResetPending, Halt<PowerState>> {
        debug_assert_eq!(self.state, PowerState::Run, "restore loop already ran");

        self.play(self.index);
        self.wake.arm(WakeKind::Button);
        loop {
            let event = self
                .wake
                .wait_any(&[WakeKind::Button, WakeKind::TransferComplete])
                .await;
            match event {
                WakeEvent::TransferComplete => break,
                WakeEvent::ButtonPressed => {
                    self.index = self.index.next();
                    info!("button: switching to waveform {}", self.index.get());
                    self.play(self.index);
                    self.wake.arm(WakeKind::Button);
                }
                _ => self.wake.arm(WakeKind::Button),
            }
        }

        self.index = self.index.next();
        self.standby_restore()
    }

    fn play(&mut self, index: WaveformIndex) {
        self.wake.disarm(WakeKind::TransferComplete);
        self.sequencer.select(index);
        self.wake.arm(WakeKind::TransferComplete);
        self.leds.show(index.pattern());
    }

    fn standby_restore(&mut self) -> Result<ResetPending, Halt<PowerState>> {
        info!("{} -> {}", self.state, PowerState::StandbyRestore);
        self.state = PowerState::StandbyRestore;
        self.sequencer.stop();

        if let Err(error) = arm_relative_alarm(
            &mut self.wake,
            &mut self.rtc,
            &self.config.rtc,
            self.config.restore_timeout,
        ) {
            error!("halting in {}: {}", self.state, error);
            return Err(Halt {
                error,
                state: self.state,
            });
        }

        self.power.clear_wake_flags();
        // Nothing may run between this write and the suspend.
        self.store.persist_index(self.index);
        self.power.enter_standby();
        Ok(ResetPending::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RtcError};
    use crate::indicator::LedPattern;
    use crate::mock::{
        Bench, MockBackup, MockLeds, MockOutput, MockPower, MockRtc, MockSources, Op, drive, tap,
    };
    use crate::power::ResetCause;

    type BenchLoop<'a> =
        RestoreLoop<'a, MockSources<'a>, MockRtc<'a>, MockPower<'a>, MockLeds<'a>, MockBackup<'a>, MockOutput<'a>>;

    fn boot(bench: &Bench, cause: ResetCause) -> BenchLoop<'_> {
        let store = PersistentStateStore::boot(bench.backup(), cause);
        RestoreLoop::new(
            &bench.flags,
            bench.drivers(),
            store,
            bench.output(),
            ControllerConfig::default(),
        )
    }

    #[test]
    fn cold_boot_plays_first_waveform_and_persists_the_second() {
        let bench = Bench::new();
        bench.set_backup(0xDEAD_BEEF);
        let mut controller = boot(&bench, ResetCause::PowerOn);

        let result = drive(controller.run(), bench.complete_cycle());

        assert!(result.is_ok());
        assert_eq!(controller.state(), PowerState::StandbyRestore);
        assert_eq!(bench.backup_value(), 1);
        let log = bench.log();
        assert!(log.contains(&Op::StartOutput("sine")));
        assert_eq!(
            log[log.len() - 2..],
            [Op::BackupWrite(1), Op::EnterStandby]
        );
    }

    #[test]
    fn last_waveform_wraps_to_first_after_standby_wake() {
        let bench = Bench::new();
        bench.set_backup(3);
        let mut controller = boot(&bench, ResetCause::StandbyWake);
        assert_eq!(controller.index().get(), 3);

        let result = drive(controller.run(), bench.complete_cycle());

        assert!(result.is_ok());
        assert!(bench.log().contains(&Op::StartOutput("triangle")));
        assert!(!bench.log().contains(&Op::BackupReset));
        assert_eq!(bench.backup_value(), 0);
    }

    #[test]
    fn sequence_resumes_across_repeated_resets() {
        let bench = Bench::new();
        let mut cause = ResetCause::PowerOn;
        let mut played = std::vec::Vec::new();

        for _ in 0..5 {
            let mut controller = boot(&bench, cause);
            played.push(controller.index().get());
            let result = drive(controller.run(), bench.complete_cycle());
            assert!(result.is_ok());
            drop(controller);
            bench.reset_device();
            cause = ResetCause::StandbyWake;
        }

        assert_eq!(played, [0, 1, 2, 3, 0]);
    }

    #[test]
    fn button_press_switches_waveform_and_last_write_wins() {
        let bench = Bench::new();
        let mut controller = boot(&bench, ResetCause::PowerOn);

        let result = drive(controller.run(), async {
            tap(&bench).await;
            bench.complete_cycle().await;
        });

        assert!(result.is_ok());
        let starts: std::vec::Vec<_> = bench
            .log()
            .into_iter()
            .filter(|op| matches!(op, Op::StartOutput(_)))
            .collect();
        assert_eq!(starts, [Op::StartOutput("sine"), Op::StartOutput("escalator")]);
        assert_eq!(bench.count_writes(), 1);
        assert_eq!(bench.backup_value(), 2);
    }

    #[test]
    fn leds_follow_the_waveform() {
        let bench = Bench::new();
        bench.set_backup(1);
        let mut controller = boot(&bench, ResetCause::StandbyWake);

        let _ = drive(controller.run(), async {
            tap(&bench).await;
            tap(&bench).await;
            bench.complete_cycle().await;
        });

        let shown: std::vec::Vec<_> = bench
            .log()
            .into_iter()
            .filter_map(|op| match op {
                Op::Show(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(shown, [LedPattern::Blue, LedPattern::Green, LedPattern::Both]);
    }

    #[test]
    fn standby_restore_tears_down_playback_and_arms_only_the_alarm() {
        let bench = Bench::new();
        let mut controller = boot(&bench, ResetCause::PowerOn);

        let _ = drive(controller.run(), bench.complete_cycle());

        for kind in WakeKind::ALL {
            assert_eq!(bench.flags.is_armed(kind), kind == WakeKind::Alarm);
        }
        let log = bench.log();
        let stop = log.iter().rposition(|op| *op == Op::StopOutput).unwrap();
        let alarm = log
            .iter()
            .position(|op| matches!(op, Op::SetAlarm(_)))
            .unwrap();
        assert!(stop < alarm);
        assert!(!log[stop..].iter().any(|op| matches!(op, Op::StartOutput(_))));
    }

    #[test]
    fn rtc_failure_halts_without_touching_the_store() {
        let bench = Bench::new();
        bench.set_backup(2);
        let mut controller = boot(&bench, ResetCause::StandbyWake);
        bench.fail_rtc(RtcError::InitModeTimeout);

        let result = drive(controller.run(), bench.complete_cycle());

        assert_eq!(
            result.unwrap_err(),
            Halt {
                error: Error::Rtc(RtcError::InitModeTimeout),
                state: PowerState::StandbyRestore,
            }
        );
        assert_eq!(bench.backup_value(), 2);
        assert_eq!(bench.count_writes(), 0);
        assert!(!bench.log().contains(&Op::EnterStandby));
    }
}
