//! Host-side test bench.
//!
//! Every mock driver borrows one [`Bench`] and appends to its shared
//! operation log, so tests assert on the order in which the controllers
//! touch the hardware. Interrupts are simulated by recording edges into
//! the bench's [`EventFlags`] from a script future polled alongside the
//! controller.

use core::cell::{Cell, RefCell};
use core::future::Future;

use embassy_futures::{block_on, join::join, yield_now};

use crate::config::RtcConfig;
use crate::controller::Drivers;
use crate::error::RtcError;
use crate::event::{Edge, EventFlags, WakeKind};
use crate::indicator::{LedPattern, StatusLeds};
use crate::power::{PowerControl, ResetCause};
use crate::rtc::{AlarmSchedule, RealTimeClock, TimeOfDay};
use crate::store::BackupDomain;
use crate::waveform::{SampleOutput, Waveform};
use crate::wake::WakeSources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Enable(WakeKind),
    Disable(WakeKind),
    ClearPending(WakeKind),
    RtcInit,
    SetAlarm(AlarmSchedule),
    ClearAlarm,
    ClearWakeFlags,
    EnterStop,
    EnterSleep,
    EnterStandby,
    BackupWrite(u32),
    BackupReset,
    StopOutput,
    StartOutput(&'static str),
    Show(LedPattern),
}

pub struct Bench {
    pub flags: EventFlags,
    log: RefCell<Vec<Op>>,
    button: Cell<bool>,
    backup: Cell<u32>,
    reset_cause: Cell<ResetCause>,
    rtc_fault: Cell<Option<RtcError>>,
    clock_stalled: Cell<bool>,
    clock: Cell<TimeOfDay>,
    alarm: Cell<Option<AlarmSchedule>>,
    alarms_fired: Cell<u32>,
    stray_wakes: RefCell<Vec<Op>>,
}

impl Bench {
    pub fn new() -> Self {
        Self {
            flags: EventFlags::new(),
            log: RefCell::new(Vec::new()),
            button: Cell::new(false),
            backup: Cell::new(0),
            reset_cause: Cell::new(ResetCause::PowerOn),
            rtc_fault: Cell::new(None),
            clock_stalled: Cell::new(false),
            clock: Cell::new(TimeOfDay::MIDNIGHT),
            alarm: Cell::new(None),
            alarms_fired: Cell::new(0),
            stray_wakes: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, op: Op) {
        self.log.borrow_mut().push(op);
    }

    pub fn log(&self) -> Vec<Op> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn position(&self, op: Op) -> Option<usize> {
        self.log.borrow().iter().position(|logged| *logged == op)
    }

    pub fn count(&self, op: Op) -> usize {
        self.log.borrow().iter().filter(|logged| **logged == op).count()
    }

    pub fn count_writes(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::BackupWrite(_)))
            .count()
    }

    pub fn sources(&self) -> MockSources<'_> {
        MockSources { bench: self }
    }

    pub fn rtc(&self) -> MockRtc<'_> {
        MockRtc { bench: self }
    }

    pub fn power(&self) -> MockPower<'_> {
        MockPower { bench: self }
    }

    pub fn leds(&self) -> MockLeds<'_> {
        MockLeds {
            bench: self,
            pattern: LedPattern::Off,
        }
    }

    pub fn backup(&self) -> MockBackup<'_> {
        MockBackup { bench: self }
    }

    pub fn output(&self) -> MockOutput<'_> {
        MockOutput { bench: self }
    }

    pub fn drivers(&self) -> Drivers<MockSources<'_>, MockRtc<'_>, MockPower<'_>, MockLeds<'_>> {
        Drivers {
            sources: self.sources(),
            rtc: self.rtc(),
            power: self.power(),
            leds: self.leds(),
        }
    }

    /// Button down, raising the press edge.
    pub fn press(&self) {
        self.button.set(true);
        self.flags.record(Edge::ButtonPressed);
    }

    /// Button up, raising the release edge.
    pub fn release(&self) {
        self.button.set(false);
        self.flags.record(Edge::ButtonReleased);
    }

    /// Sets the button level without an edge.
    pub fn hold_button(&self, held: bool) {
        self.button.set(held);
    }

    pub fn set_backup(&self, value: u32) {
        self.backup.set(value);
    }

    pub fn backup_value(&self) -> u32 {
        self.backup.get()
    }

    pub fn fail_rtc(&self, fault: RtcError) {
        self.rtc_fault.set(Some(fault));
    }

    /// The RTC accepts its configuration but its clock never starts.
    pub fn stall_rtc_clock(&self) {
        self.clock_stalled.set(true);
    }

    pub fn rtc_alarm(&self) -> Option<AlarmSchedule> {
        self.alarm.get()
    }

    /// Alarms fired from Stop so far.
    pub fn alarms_fired(&self) -> u32 {
        self.alarms_fired.get()
    }

    /// Makes the next `suspend` (`Op::EnterStop` or `Op::EnterSleep`) return
    /// on an interrupt that is not a wake source.
    pub fn stray_wake(&self, suspend: Op) {
        self.stray_wakes.borrow_mut().push(suspend);
    }

    fn take_stray_wake(&self, suspend: Op) -> bool {
        let mut stray = self.stray_wakes.borrow_mut();
        match stray.iter().position(|op| *op == suspend) {
            Some(at) => {
                stray.remove(at);
                true
            }
            None => false,
        }
    }

    /// Everything but the backup domain and the RTC calendar goes back to
    /// its reset state.
    pub fn reset_device(&self) {
        self.clear_log();
        self.flags.reset();
        self.button.set(false);
        self.alarm.set(None);
        self.stray_wakes.borrow_mut().clear();
        self.reset_cause.set(ResetCause::StandbyWake);
    }

    pub async fn until(&self, condition: impl Fn() -> bool) {
        while !condition() {
            yield_now().await;
        }
    }

    /// Waits until the controller listens for the button with nothing
    /// pending.
    pub async fn button_listening(&self) {
        self.until(|| self.flags.is_armed(WakeKind::Button) && !self.flags.is_pending(WakeKind::Button))
            .await;
    }

    pub async fn release_when_armed(&self) {
        self.button_listening().await;
        self.release();
    }

    /// Ends one full pass through the sample buffer.
    pub async fn complete_cycle(&self) {
        self.until(|| {
            self.flags.is_armed(WakeKind::TransferComplete)
                && !self.flags.is_pending(WakeKind::TransferComplete)
        })
        .await;
        self.flags.record(Edge::TransferComplete);
    }
}

/// Presses and releases the button, each edge once the controller is ready
/// for it.
pub async fn tap(bench: &Bench) {
    bench.button_listening().await;
    bench.press();
    bench.until(|| !bench.flags.is_pending(WakeKind::Button)).await;
    bench.release();
}

/// Polls `controller` and `script` together until both finish.
pub fn drive<T>(controller: impl Future<Output = T>, script: impl Future<Output = ()>) -> T {
    block_on(join(controller, script)).0
}

pub struct MockSources<'a> {
    bench: &'a Bench,
}

impl WakeSources for MockSources<'_> {
    fn clear_pending(&mut self, kind: WakeKind) {
        self.bench.push(Op::ClearPending(kind));
    }

    fn enable(&mut self, kind: WakeKind) {
        self.bench.push(Op::Enable(kind));
    }

    fn disable(&mut self, kind: WakeKind) {
        self.bench.push(Op::Disable(kind));
    }

    fn button_held(&self) -> bool {
        self.bench.button.get()
    }
}

pub struct MockRtc<'a> {
    bench: &'a Bench,
}

impl RealTimeClock for MockRtc<'_> {
    fn init(&mut self, _config: &RtcConfig) -> Result<(), RtcError> {
        self.bench.push(Op::RtcInit);
        match self.bench.rtc_fault.get() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn clock_ready(&self) -> bool {
        self.bench.rtc_fault.get().is_none() && !self.bench.clock_stalled.get()
    }

    fn time(&self) -> TimeOfDay {
        self.bench.clock.get()
    }

    fn set_alarm(&mut self, alarm: &AlarmSchedule) -> Result<(), RtcError> {
        self.bench.push(Op::SetAlarm(*alarm));
        self.bench.alarm.set(Some(*alarm));
        Ok(())
    }

    fn clear_alarm(&mut self) {
        self.bench.push(Op::ClearAlarm);
        self.bench.alarm.set(None);
    }
}

pub struct MockPower<'a> {
    bench: &'a Bench,
}

impl PowerControl for MockPower<'_> {
    fn reset_cause(&mut self) -> ResetCause {
        self.bench.reset_cause.get()
    }

    fn clear_wake_flags(&mut self) {
        self.bench.push(Op::ClearWakeFlags);
    }

    /// Time runs forward to the programmed alarm, which then fires.
    fn enter_stop(&mut self) {
        self.bench.push(Op::EnterStop);
        let bench = self.bench;
        if bench.take_stray_wake(Op::EnterStop) {
            return;
        }
        if let Some(alarm) = bench.alarm.get() {
            bench.clock.set(alarm.at);
            if bench.flags.record(Edge::AlarmMatched) {
                bench.alarms_fired.set(bench.alarms_fired.get() + 1);
            }
        }
    }

    /// The user presses the button while the core sleeps.
    fn enter_sleep(&mut self) {
        self.bench.push(Op::EnterSleep);
        if !self.bench.take_stray_wake(Op::EnterSleep) {
            self.bench.press();
        }
    }

    fn enter_standby(&mut self) {
        self.bench.push(Op::EnterStandby);
    }
}

pub struct MockLeds<'a> {
    bench: &'a Bench,
    pattern: LedPattern,
}

impl StatusLeds for MockLeds<'_> {
    fn show(&mut self, pattern: LedPattern) {
        self.bench.push(Op::Show(pattern));
        self.pattern = pattern;
    }

    fn pattern(&self) -> LedPattern {
        self.pattern
    }
}

pub struct MockBackup<'a> {
    bench: &'a Bench,
}

impl BackupDomain for MockBackup<'_> {
    fn read(&self) -> u32 {
        self.bench.backup.get()
    }

    fn write(&mut self, value: u32) {
        self.bench.push(Op::BackupWrite(value));
        self.bench.backup.set(value);
    }

    fn reset(&mut self) {
        self.bench.push(Op::BackupReset);
        self.bench.backup.set(0);
    }
}

pub struct MockOutput<'a> {
    bench: &'a Bench,
}

impl SampleOutput for MockOutput<'_> {
    fn stop(&mut self) {
        self.bench.push(Op::StopOutput);
    }

    fn start(&mut self, waveform: &'static Waveform) {
        self.bench.push(Op::StartOutput(waveform.name));
    }
}
