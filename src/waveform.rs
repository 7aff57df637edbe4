//! Waveform selection and DMA-driven playback.
//!
//! Each waveform is streamed from flash to the DAC by DMA on every tick of
//! the sample timer, in circular mode, so the CPU is not involved per sample.
//! The DMA transfer-complete flag marks one full pass through the buffer; it
//! reaches the controllers as [`WakeKind::TransferComplete`].
//!
//! [`WakeKind::TransferComplete`]: crate::event::WakeKind::TransferComplete

use crate::indicator::LedPattern;

/// Number of configured waveforms.
pub const WAVEFORM_COUNT: u8 = 4;

pub static SINE_12BIT: [u16; 32] = [
    2047, 2447, 2831, 3185, 3498, 3750, 3939, 4056, 4095, 4056, 3939, 3750, 3495, 3185, 2831, 2447,
    2047, 1647, 1263, 909, 599, 344, 155, 38, 0, 38, 155, 344, 599, 909, 1263, 1647,
];

pub static ESCALATOR_8BIT: [u8; 6] = [0x00, 0x33, 0x66, 0x99, 0xCC, 0xFF];

pub static SQUARE_8BIT: [u8; 6] = [0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF];

pub static TRIANGLE_16BIT: [u16; 31] = [
    0x0000, 0x1111, 0x2222, 0x3333, 0x4444, 0x5555, 0x6666, 0x7777, 0x8888, 0x9999, 0xAAAA,
    0xBBBB, 0xCCCC, 0xDDDD, 0xEEEE, 0xFFFF, 0xEEEE, 0xDDDD, 0xCCCC, 0xBBBB, 0xAAAA, 0x9999,
    0x8888, 0x7777, 0x6666, 0x5555, 0x4444, 0x3333, 0x2222, 0x1111, 0x0000,
];

pub static WAVEFORMS: [Waveform; WAVEFORM_COUNT as usize] = [
    Waveform {
        name: "sine",
        samples: Samples::Bits16(&SINE_12BIT),
        register: DataRegister::Right12,
    },
    Waveform {
        name: "escalator",
        samples: Samples::Bits8(&ESCALATOR_8BIT),
        register: DataRegister::Right8,
    },
    Waveform {
        name: "square",
        samples: Samples::Bits8(&SQUARE_8BIT),
        register: DataRegister::Right8,
    },
    Waveform {
        name: "triangle",
        samples: Samples::Bits16(&TRIANGLE_16BIT),
        register: DataRegister::Right12,
    },
];

/// Position in [`WAVEFORMS`], always below [`WAVEFORM_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveformIndex(u8);

impl WaveformIndex {
    pub const FIRST: WaveformIndex = WaveformIndex(0);

    /// # Returns
    ///
    /// `None` when `raw` is not below [`WAVEFORM_COUNT`].
    pub const fn new(raw: u8) -> Option<Self> {
        if raw < WAVEFORM_COUNT {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Raw index, as stored in the backup register.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Successor, wrapping from the last waveform back to the first.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % WAVEFORM_COUNT)
    }

    pub fn waveform(self) -> &'static Waveform {
        &WAVEFORMS[self.0 as usize]
    }

    /// LED pattern shown while this waveform plays.
    pub const fn pattern(self) -> LedPattern {
        match self.0 {
            0 => LedPattern::Green,
            1 => LedPattern::Blue,
            2 => LedPattern::Green,
            _ => LedPattern::Both,
        }
    }
}

/// Sample buffer and its element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Samples {
    Bits8(&'static [u8]),
    Bits16(&'static [u16]),
}

impl Samples {
    pub const fn len(&self) -> usize {
        match self {
            Samples::Bits8(s) => s.len(),
            Samples::Bits16(s) => s.len(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn element_bytes(&self) -> usize {
        match self {
            Samples::Bits8(_) => 1,
            Samples::Bits16(_) => 2,
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Samples::Bits8(s) => s.as_ptr(),
            Samples::Bits16(s) => s.as_ptr().cast(),
        }
    }
}

/// DAC holding register the samples are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRegister {
    /// 8-bit right aligned (`DHR8R1`).
    Right8,
    /// 12-bit right aligned (`DHR12R1`).
    Right12,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Waveform {
    pub name: &'static str,
    pub samples: Samples,
    pub register: DataRegister,
}

/// DAC + DMA + trigger timer, implemented by the board layer.
pub trait SampleOutput {
    /// Tears the stream down completely: DAC, DMA channel and its flags.
    fn stop(&mut self);

    /// Starts circular playback of `waveform` from its first sample.
    fn start(&mut self, waveform: &'static Waveform);
}

pub struct WaveformSequencer<O> {
    output: O,
    current: Option<WaveformIndex>,
}

impl<O: SampleOutput> WaveformSequencer<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            current: None,
        }
    }

    /// Reconfigures the stream for `index` and starts it.
    pub fn select(&mut self, index: WaveformIndex) {
        self.output.stop();
        let waveform = index.waveform();
        self.output.start(waveform);
        self.current = Some(index);
        info!(
            "playing waveform {} ({}, {} samples)",
            index.get(),
            waveform.name,
            waveform.samples.len()
        );
    }

    pub fn stop(&mut self) {
        self.output.stop();
        self.current = None;
    }

    /// Index being played, if any.
    pub fn current(&self) -> Option<WaveformIndex> {
        self.current
    }
}
