//! Status LEDs.
//!
//! The green (LD3) and blue (LD4) LEDs are the only observability channel
//! on the board: they show the current power state or waveform, and blink
//! together when a controller halts.

use embedded_hal::digital::v2::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedPattern {
    #[default]
    Off,
    Green,
    Blue,
    Both,
}

impl LedPattern {
    pub const fn green(self) -> bool {
        matches!(self, LedPattern::Green | LedPattern::Both)
    }

    pub const fn blue(self) -> bool {
        matches!(self, LedPattern::Blue | LedPattern::Both)
    }

    /// Every LED flipped.
    pub const fn inverted(self) -> Self {
        match self {
            LedPattern::Off => LedPattern::Both,
            LedPattern::Green => LedPattern::Blue,
            LedPattern::Blue => LedPattern::Green,
            LedPattern::Both => LedPattern::Off,
        }
    }
}

pub trait StatusLeds {
    fn show(&mut self, pattern: LedPattern);

    fn pattern(&self) -> LedPattern;

    fn toggle(&mut self) {
        let next = self.pattern().inverted();
        self.show(next);
    }
}

/// Two active-high LEDs on push-pull outputs.
pub struct Leds<G, B> {
    green: G,
    blue: B,
    pattern: LedPattern,
}

impl<G: OutputPin, B: OutputPin> Leds<G, B> {
    /// Takes both pins and switches the LEDs off.
    pub fn new(green: G, blue: B) -> Self {
        let mut leds = Self {
            green,
            blue,
            pattern: LedPattern::Off,
        };
        leds.show(LedPattern::Off);
        leds
    }
}

impl<G: OutputPin, B: OutputPin> StatusLeds for Leds<G, B> {
    fn show(&mut self, pattern: LedPattern) {
        // GPIO writes on this part can't fail.
        let _ = if pattern.green() {
            self.green.set_high()
        } else {
            self.green.set_low()
        };
        let _ = if pattern.blue() {
            self.blue.set_high()
        } else {
            self.blue.set_low()
        };
        self.pattern = pattern;
    }

    fn pattern(&self) -> LedPattern {
        self.pattern
    }
}

/// Observable halt: both LEDs blink together forever.
///
/// `wait` sets the blink period.
pub fn halt_loop<L: StatusLeds>(leds: &mut L, mut wait: impl FnMut()) -> ! {
    leds.show(LedPattern::Both);
    loop {
        wait();
        leds.toggle();
    }
}
