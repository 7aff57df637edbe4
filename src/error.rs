//! Fault taxonomy for the power-mode core.
//!
//! Only configuration faults are represented here. Spurious or duplicate wake
//! events are not errors: they are dropped at the event flags, and an
//! out-of-range persisted index is clamped by the store.

/// RTC bring-up failures.
///
/// Every variant means the alarm cannot be relied on, so the device would
/// have no way out of a suspended state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcError {
    /// The low-speed internal oscillator never reported ready.
    LsiNotReady,
    /// The calendar did not acknowledge the request to enter init mode.
    InitModeTimeout,
    /// Shadow registers never resynchronised after leaving init mode.
    SyncTimeout,
    /// A time of day outside `00:00:00..=23:59:59` was supplied.
    InvalidTime,
}

/// Unrecoverable configuration fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// RTC initialization or alarm programming failed.
    Rtc(RtcError),
}

impl From<RtcError> for Error {
    fn from(err: RtcError) -> Self {
        Error::Rtc(err)
    }
}

/// A controller stopped on an unrecoverable fault.
///
/// Carries the state that was active when the fault was raised. No transition
/// happens after a halt; the firmware image parks in the halt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Halt<S> {
    pub error: Error,
    pub state: S,
}
