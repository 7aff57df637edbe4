//! Power controller primitives and the reset-only terminal state.
//!
//! Stop and Sleep return once a wake source fires. Standby does not: on
//! real hardware the next instruction executed after entering it is the
//! reset vector. Controllers model that by handing back a [`ResetPending`]
//! token, which can only park the core.

/// Why the device is running, sampled once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    /// Power-on or brown-out: the backup domain content is undefined.
    PowerOn,
    /// A wake source ended Standby.
    StandbyWake,
    /// Pin, watchdog or software reset.
    Other,
}

impl ResetCause {
    pub const fn is_cold_start(self) -> bool {
        matches!(self, ResetCause::PowerOn)
    }
}

/// Power controller capabilities consumed by the controllers.
pub trait PowerControl {
    /// Reads and clears the reset flags. Call once, at boot.
    fn reset_cause(&mut self) -> ResetCause;

    /// Clears the wake-up flag so Standby isn't exited immediately.
    fn clear_wake_flags(&mut self);

    /// Stop mode with the regulator in low-power mode. Returns on wake.
    fn enter_stop(&mut self);

    /// Sleep mode, core clock gated. Returns on the next interrupt.
    fn enter_sleep(&mut self);

    /// Standby mode. On hardware the device resets instead of returning.
    fn enter_standby(&mut self);
}

/// Proof that Standby has been requested.
///
/// There is no way back to a running state from here; the only operation
/// is to park until the reset takes effect.
#[must_use = "the device is about to reset; park the core"]
#[derive(Debug)]
pub struct ResetPending {
    _private: (),
}

impl ResetPending {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Spins `idle` forever. `idle` should wait for an interrupt.
    pub fn park(self, mut idle: impl FnMut()) -> ! {
        loop {
            idle();
        }
    }
}
