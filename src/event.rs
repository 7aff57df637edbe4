//! Wake events and the interrupt-to-foreground hand-off.
//!
//! Interrupt handlers never touch power state or the persistent store. They
//! record an [`Edge`] into a shared [`EventFlags`] and return; the foreground
//! consumes each recorded edge exactly once through the wake manager.

use core::time::Duration;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use portable_atomic::{AtomicU8, Ordering};

const BUTTON_PRESSED: u8 = 1 << 0;
const BUTTON_RELEASED: u8 = 1 << 1;
const ALARM: u8 = 1 << 2;
const TRANSFER_COMPLETE: u8 = 1 << 3;
const WAKEUP_PIN: u8 = 1 << 4;

/// A hardware source able to end a wait or a suspended state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeKind {
    /// User button edge (EXTI line 0), both directions.
    Button,
    /// RTC alarm A match (EXTI line 17).
    Alarm,
    /// DMA full pass through the sample buffer.
    TransferComplete,
    /// Dedicated standby wake-up pin. Asserting it resets the device, so it
    /// never produces an [`Edge`].
    WakeupPin,
}

impl WakeKind {
    pub const ALL: [WakeKind; 4] = [
        WakeKind::Button,
        WakeKind::Alarm,
        WakeKind::TransferComplete,
        WakeKind::WakeupPin,
    ];

    pub(crate) const fn mask(self) -> u8 {
        match self {
            WakeKind::Button => BUTTON_PRESSED | BUTTON_RELEASED,
            WakeKind::Alarm => ALARM,
            WakeKind::TransferComplete => TRANSFER_COMPLETE,
            WakeKind::WakeupPin => WAKEUP_PIN,
        }
    }
}

/// Raw edge reported by an interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    ButtonPressed,
    ButtonReleased,
    AlarmMatched,
    TransferComplete,
}

impl Edge {
    // Lowest bit wins when several edges are pending, so a press is always
    // consumed before the release that follows it.
    const BY_PRIORITY: [Edge; 4] = [
        Edge::ButtonPressed,
        Edge::ButtonReleased,
        Edge::AlarmMatched,
        Edge::TransferComplete,
    ];

    const fn bit(self) -> u8 {
        match self {
            Edge::ButtonPressed => BUTTON_PRESSED,
            Edge::ButtonReleased => BUTTON_RELEASED,
            Edge::AlarmMatched => ALARM,
            Edge::TransferComplete => TRANSFER_COMPLETE,
        }
    }

    pub const fn kind(self) -> WakeKind {
        match self {
            Edge::ButtonPressed | Edge::ButtonReleased => WakeKind::Button,
            Edge::AlarmMatched => WakeKind::Alarm,
            Edge::TransferComplete => WakeKind::TransferComplete,
        }
    }
}

/// Event delivered to a controller, consumed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeEvent {
    ButtonPressed,
    ButtonReleased,
    /// The RTC alarm matched an absolute schedule.
    AlarmFired,
    TransferComplete,
    /// The RTC alarm armed as a relative timeout of the given length expired.
    Timeout(Duration),
}

#[cfg(feature = "defmt")]
impl defmt::Format for WakeEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            WakeEvent::ButtonPressed => defmt::write!(f, "ButtonPressed"),
            WakeEvent::ButtonReleased => defmt::write!(f, "ButtonReleased"),
            WakeEvent::AlarmFired => defmt::write!(f, "AlarmFired"),
            WakeEvent::TransferComplete => defmt::write!(f, "TransferComplete"),
            WakeEvent::Timeout(d) => defmt::write!(f, "Timeout({=u64}ms)", d.as_millis() as u64),
        }
    }
}

/// One-shot event flags shared between interrupt handlers and the foreground.
///
/// Each source has an armed bit and a pending bit. Handlers may only set
/// pending bits, and only for armed sources; the foreground is the single
/// writer of the armed mask and the single reader of pending bits.
pub struct EventFlags {
    armed: AtomicU8,
    pending: AtomicU8,
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl EventFlags {
    /// Flags with nothing armed and nothing pending, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            armed: AtomicU8::new(0),
            pending: AtomicU8::new(0),
            signal: Signal::new(),
        }
    }

    /// Records an edge from interrupt context.
    ///
    /// Returns `false` when the edge was dropped, either because its source
    /// is not armed or because the same edge is already waiting to be
    /// consumed. Callers must clear the hardware pending bit either way.
    pub fn record(&self, edge: Edge) -> bool {
        let bit = edge.bit();
        if self.armed.load(Ordering::Acquire) & bit == 0 {
            trace!("dropping {} from unarmed source", edge);
            return false;
        }
        if self.pending.fetch_or(bit, Ordering::AcqRel) & bit != 0 {
            trace!("dropping duplicate {}", edge);
            return false;
        }
        self.signal.signal(());
        true
    }

    /// Whether edges of `kind` are currently accepted.
    pub fn is_armed(&self, kind: WakeKind) -> bool {
        self.armed.load(Ordering::Acquire) & kind.mask() != 0
    }

    /// Whether an edge of `kind` has been recorded and not yet taken.
    pub fn is_pending(&self, kind: WakeKind) -> bool {
        self.pending.load(Ordering::Acquire) & kind.mask() != 0
    }

    /// Disarms every source and drops anything pending.
    pub fn reset(&self) {
        self.armed.store(0, Ordering::Release);
        self.pending.store(0, Ordering::Release);
        self.signal.reset();
    }

    pub(crate) fn armed_mask(&self) -> u8 {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn set_armed(&self, kind: WakeKind, armed: bool) {
        if armed {
            self.armed.fetch_or(kind.mask(), Ordering::AcqRel);
        } else {
            self.armed.fetch_and(!kind.mask(), Ordering::AcqRel);
        }
    }

    pub(crate) fn clear_pending(&self, kind: WakeKind) {
        self.pending.fetch_and(!kind.mask(), Ordering::AcqRel);
    }

    /// Atomically takes the highest-priority pending edge within `mask`.
    pub(crate) fn take(&self, mask: u8) -> Option<Edge> {
        let edge = Edge::BY_PRIORITY
            .into_iter()
            .find(|edge| self.pending.load(Ordering::Acquire) & mask & edge.bit() != 0)?;
        let previous = self.pending.fetch_and(!edge.bit(), Ordering::AcqRel);
        (previous & edge.bit() != 0).then_some(edge)
    }

    pub(crate) async fn wait(&self) {
        self.signal.wait().await
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_edges_are_dropped() {
        let flags = EventFlags::new();
        assert!(!flags.record(Edge::AlarmMatched));
        assert!(!flags.is_pending(WakeKind::Alarm));
    }

    #[test]
    fn second_edge_before_consumption_is_a_duplicate() {
        let flags = EventFlags::new();
        flags.set_armed(WakeKind::TransferComplete, true);
        assert!(flags.record(Edge::TransferComplete));
        assert!(!flags.record(Edge::TransferComplete));
        assert_eq!(flags.take(TRANSFER_COMPLETE), Some(Edge::TransferComplete));
        assert_eq!(flags.take(TRANSFER_COMPLETE), None);
    }

    #[test]
    fn press_is_taken_before_release() {
        let flags = EventFlags::new();
        flags.set_armed(WakeKind::Button, true);
        flags.record(Edge::ButtonReleased);
        flags.record(Edge::ButtonPressed);
        let mask = WakeKind::Button.mask();
        assert_eq!(flags.take(mask), Some(Edge::ButtonPressed));
        assert_eq!(flags.take(mask), Some(Edge::ButtonReleased));
    }

    #[test]
    fn take_only_looks_inside_mask() {
        let flags = EventFlags::new();
        flags.set_armed(WakeKind::Alarm, true);
        flags.set_armed(WakeKind::Button, true);
        flags.record(Edge::AlarmMatched);
        assert_eq!(flags.take(WakeKind::Button.mask()), None);
        assert!(flags.is_pending(WakeKind::Alarm));
    }

    #[test]
    fn reset_disarms_everything() {
        let flags = EventFlags::new();
        flags.set_armed(WakeKind::Button, true);
        flags.record(Edge::ButtonPressed);
        flags.reset();
        assert!(!flags.is_armed(WakeKind::Button));
        assert!(!flags.is_pending(WakeKind::Button));
    }
}
