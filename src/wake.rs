//! Wake source arbitration.
//!
//! [`WakeSourceManager`] owns the hardware side of every wake source through
//! the [`WakeSources`] trait and the foreground side of the shared
//! [`EventFlags`]. Arming is always clear-then-enable so a stale pending bit
//! can't cause an immediate wake, and every wait is single-shot: the source
//! that satisfied it is disarmed before the event is returned.

use core::time::Duration;

use crate::event::{Edge, EventFlags, WakeEvent, WakeKind};

/// Hardware control of the wake sources, implemented by the board layer.
pub trait WakeSources {
    /// Clears the peripheral and interrupt-controller pending bits of `kind`.
    fn clear_pending(&mut self, kind: WakeKind);

    /// Unmasks `kind` so it raises an interrupt or wake signal.
    fn enable(&mut self, kind: WakeKind);

    /// Masks `kind`.
    fn disable(&mut self, kind: WakeKind);

    /// Returns `true` while the user button is held down.
    fn button_held(&self) -> bool;
}

/// Foreground owner of every wake source.
///
/// All arming, disarming and waiting goes through here; interrupt handlers
/// only reach the shared [`EventFlags`].
pub struct WakeSourceManager<'a, W> {
    flags: &'a EventFlags,
    sources: W,
    timeout: Option<Duration>,
}

impl<'a, W: WakeSources> WakeSourceManager<'a, W> {
    /// Takes over `sources`, starting with every source disarmed.
    ///
    /// # Arguments
    ///
    /// * `flags` - Flags the interrupt handlers of `sources` record into
    /// * `sources` - Hardware side of the wake sources
    pub fn new(flags: &'a EventFlags, mut sources: W) -> Self {
        flags.reset();
        for kind in WakeKind::ALL {
            sources.disable(kind);
            sources.clear_pending(kind);
        }
        Self {
            flags,
            sources,
            timeout: None,
        }
    }

    /// Whether an edge from `kind` would currently be recorded.
    pub fn is_armed(&self, kind: WakeKind) -> bool {
        self.flags.is_armed(kind)
    }

    /// Current button level, independent of arming.
    pub fn button_held(&self) -> bool {
        self.sources.button_held()
    }

    /// Arms `kind` alongside whatever is already armed.
    ///
    /// Only valid while running; suspended states go through
    /// [`arm_exclusive`](Self::arm_exclusive).
    pub fn arm(&mut self, kind: WakeKind) {
        self.sources.clear_pending(kind);
        self.flags.clear_pending(kind);
        if kind == WakeKind::Alarm {
            self.timeout = None;
        }
        self.flags.set_armed(kind, true);
        self.sources.enable(kind);
        trace!("armed {}", kind);
    }

    /// Arms `kind` as the only wake source.
    pub fn arm_exclusive(&mut self, kind: WakeKind) {
        for other in WakeKind::ALL {
            if other != kind && self.flags.is_armed(other) {
                self.disarm(other);
            }
        }
        self.arm(kind);
    }

    /// Arms the RTC alarm as the only wake source, reporting it as
    /// [`WakeEvent::Timeout`] when it fires.
    ///
    /// The alarm itself must already be programmed for `after` from now.
    pub fn arm_timeout(&mut self, after: Duration) {
        self.arm_exclusive(WakeKind::Alarm);
        self.timeout = Some(after);
    }

    /// Masks `kind` and drops anything it left pending, in hardware and in
    /// the flags.
    ///
    /// The armed bit is cleared before the pending bits, so no edge recorded
    /// during the call survives it.
    pub fn disarm(&mut self, kind: WakeKind) {
        self.flags.set_armed(kind, false);
        self.sources.disable(kind);
        self.sources.clear_pending(kind);
        self.flags.clear_pending(kind);
        if kind == WakeKind::Alarm {
            self.timeout = None;
        }
        trace!("disarmed {}", kind);
    }

    /// Waits for the next event of an armed `kind`.
    pub async fn wait_for(&mut self, kind: WakeKind) -> WakeEvent {
        self.wait_any(&[kind]).await
    }

    /// Waits for the first event among `kinds`, all of which must be armed.
    ///
    /// Only the source that produced the event is disarmed; the others stay
    /// armed with their pending state untouched.
    pub async fn wait_any(&mut self, kinds: &[WakeKind]) -> WakeEvent {
        let mask = kinds.iter().fold(0, |mask, kind| mask | kind.mask());
        debug_assert!(
            self.flags.armed_mask() & mask != 0,
            "waiting on sources that are not armed"
        );
        loop {
            if let Some(edge) = self.flags.take(mask) {
                let event = self.event_for(edge);
                self.disarm(edge.kind());
                debug!("wake event {}", event);
                return event;
            }
            self.flags.wait().await;
        }
    }

    /// Waits until the button is down.
    ///
    /// Keeps a press that is already pending if the button is armed. The
    /// level is sampled after arming, so a press landing between the two is
    /// not lost.
    pub async fn wait_for_press(&mut self) -> WakeEvent {
        if !self.flags.is_armed(WakeKind::Button) {
            self.arm(WakeKind::Button);
        }
        loop {
            if !self.flags.is_pending(WakeKind::Button) && self.sources.button_held() {
                self.disarm(WakeKind::Button);
                return WakeEvent::ButtonPressed;
            }
            match self.wait_for(WakeKind::Button).await {
                WakeEvent::ButtonPressed => return WakeEvent::ButtonPressed,
                _ => self.arm(WakeKind::Button),
            }
        }
    }

    /// Waits until the button is up, returning at once if it already is.
    ///
    /// Run at every state entry so the input that caused the transition
    /// can't re-trigger the state it led to.
    pub async fn wait_for_release(&mut self) -> WakeEvent {
        if !self.flags.is_armed(WakeKind::Button) {
            self.arm(WakeKind::Button);
        }
        loop {
            if !self.flags.is_pending(WakeKind::Button) && !self.sources.button_held() {
                self.disarm(WakeKind::Button);
                return WakeEvent::ButtonReleased;
            }
            match self.wait_for(WakeKind::Button).await {
                WakeEvent::ButtonReleased => return WakeEvent::ButtonReleased,
                _ => self.arm(WakeKind::Button),
            }
        }
    }

    /// Suspends through `enter` until `kind` fires.
    ///
    /// Each check and suspend happens with interrupts masked: a wake
    /// interrupt arriving in between stays pending in the NVIC, ends the
    /// suspend immediately, and is handled once the critical section ends.
    /// Any other interrupt that ends the suspend is serviced and the
    /// primitive is entered again.
    ///
    /// # Arguments
    ///
    /// * `kind` - The only armed source, the one allowed to end the suspend
    /// * `enter` - Low-power entry, returning when the core wakes up
    pub fn suspend<F: FnMut()>(&mut self, kind: WakeKind, mut enter: F) {
        debug_assert_eq!(
            self.flags.armed_mask(),
            kind.mask(),
            "suspending with other wake sources armed"
        );
        let mut entries = 0u32;
        loop {
            let fired = critical_section::with(|_| {
                let fired = self.flags.is_pending(kind);
                if !fired {
                    if entries > 0 {
                        trace!("woke without {}, suspending again", kind);
                    }
                    enter();
                }
                fired
            });
            if fired {
                break;
            }
            entries += 1;
        }
        if entries == 0 {
            trace!("{} already fired, not suspending", kind);
        }
    }

    fn event_for(&mut self, edge: Edge) -> WakeEvent {
        match edge {
            Edge::ButtonPressed => WakeEvent::ButtonPressed,
            Edge::ButtonReleased => WakeEvent::ButtonReleased,
            Edge::AlarmMatched => match self.timeout.take() {
                Some(after) => WakeEvent::Timeout(after),
                None => WakeEvent::AlarmFired,
            },
            Edge::TransferComplete => WakeEvent::TransferComplete,
        }
    }
}
