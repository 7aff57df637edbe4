//! DAC channel 1 streamed by DMA1 channel 3, paced by TIM2.
//!
//! Playback runs without the CPU. The only foreground involvement is
//! [`transfer_monitor`], which samples the transfer-complete flag because
//! the DMA1 channel 2/3 vector belongs to `embassy-stm32` and its handler
//! would swallow a TCIF we enabled an interrupt for. The cost is one timer
//! wake-up every [`TRANSFER_POLL_INTERVAL_MS`] while a transfer is watched;
//! with monitoring off the task parks and the core is not woken at all.

use embassy_stm32::{Peri, pac, peripherals::PA4};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Timer;
use pac::bdma::vals::{Dir, Size};
use pac::gpio::vals::Moder;
use pac::timer::vals::Mms;
use portable_atomic::{AtomicBool, Ordering};

use super::EVENTS;
use crate::config::{SAMPLE_TIMER_PERIOD, SAMPLE_TIMER_PRESCALER, TRANSFER_POLL_INTERVAL_MS};
use crate::event::Edge;
use crate::waveform::{DataRegister, SampleOutput, Waveform};

/// DAC channel 1.
const DAC_CHANNEL: usize = 0;
/// TSEL1 value selecting the TIM2 TRGO event.
const TSEL_TIM2_TRGO: u8 = 0b100;
/// PA4 carries DAC_OUT1.
const DAC_PIN: usize = 4;

/// Zero-based index of DMA1 channel 3.
const DMA_CHANNEL: usize = 2;

static MONITORING: AtomicBool = AtomicBool::new(false);
static MONITORING_STARTED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub(super) fn set_monitoring(enabled: bool) {
    MONITORING.store(enabled, Ordering::Release);
    if enabled {
        MONITORING_STARTED.signal(());
    }
}

pub(super) fn clear_transfer_complete() {
    pac::DMA1.ifcr().write(|w| w.set_tcif(DMA_CHANNEL, true));
}

/// Records a transfer-complete edge each time DMA finishes a full pass
/// through the buffer while the source is enabled.
#[embassy_executor::task]
pub async fn transfer_monitor() {
    loop {
        if !MONITORING.load(Ordering::Acquire) {
            MONITORING_STARTED.wait().await;
            continue;
        }
        Timer::after_millis(TRANSFER_POLL_INTERVAL_MS).await;
        if MONITORING.load(Ordering::Acquire) && pac::DMA1.isr().read().tcif(DMA_CHANNEL) {
            clear_transfer_complete();
            EVENTS.record(Edge::TransferComplete);
        }
    }
}

/// The sample trigger timer, DAC and DMA channel as one [`SampleOutput`].
pub struct DacOutput {
    _pin: Peri<'static, PA4>,
}

impl DacOutput {
    /// Puts PA4 in analog mode and starts TIM2. The DAC stays off until the
    /// first [`start`](SampleOutput::start).
    ///
    /// # Arguments
    ///
    /// * `pin` - PA4, held for as long as the output exists
    pub fn new(pin: Peri<'static, PA4>) -> Self {
        let rcc = pac::RCC;
        rcc.ahbenr().modify(|w| w.set_dmaen(true));
        rcc.apb1enr().modify(|w| {
            w.set_tim2en(true);
            w.set_dacen(true);
        });

        pac::GPIOA
            .moder()
            .modify(|w| w.set_moder(DAC_PIN, Moder::ANALOG));

        let tim = pac::TIM2;
        tim.psc().write_value(SAMPLE_TIMER_PRESCALER);
        tim.arr().write_value(SAMPLE_TIMER_PERIOD);
        tim.cr2().modify(|w| w.set_mms(Mms::UPDATE));
        tim.egr().write(|w| w.set_ug(true));
        tim.cr1().modify(|w| w.set_cen(true));

        debug!(
            "sample timer running, psc {=u16} arr {=u32:#x}",
            SAMPLE_TIMER_PRESCALER, SAMPLE_TIMER_PERIOD
        );
        Self { _pin: pin }
    }
}

impl SampleOutput for DacOutput {
    fn stop(&mut self) {
        pac::DAC.cr().modify(|w| {
            w.set_en(DAC_CHANNEL, false);
            w.set_ten(DAC_CHANNEL, false);
            w.set_dmaen(DAC_CHANNEL, false);
        });
        pac::DMA1.ch(DMA_CHANNEL).cr().modify(|w| w.set_en(false));
        pac::DMA1.ifcr().write(|w| w.set_gif(DMA_CHANNEL, true));
    }

    fn start(&mut self, waveform: &'static Waveform) {
        let dac = pac::DAC;
        let target = match waveform.register {
            DataRegister::Right8 => dac.dhr8r(DAC_CHANNEL).as_ptr() as u32,
            DataRegister::Right12 => dac.dhr12r(DAC_CHANNEL).as_ptr() as u32,
        };
        // DAC registers take word accesses only; the channel zero-extends
        // each sample to 32 bits.
        let msize = match waveform.samples.element_bytes() {
            1 => Size::BITS8,
            _ => Size::BITS16,
        };

        let ch = pac::DMA1.ch(DMA_CHANNEL);
        ch.par().write_value(target);
        ch.mar().write_value(waveform.samples.as_ptr() as u32);
        ch.ndtr().write(|w| w.set_ndt(waveform.samples.len() as u16));
        ch.cr().write(|w| {
            w.set_dir(Dir::FROM_MEMORY);
            w.set_circ(true);
            w.set_minc(true);
            w.set_psize(Size::BITS32);
            w.set_msize(msize);
            w.set_en(true);
        });

        dac.cr().modify(|w| {
            w.set_tsel(DAC_CHANNEL, TSEL_TIM2_TRGO);
            w.set_ten(DAC_CHANNEL, true);
            w.set_dmaen(DAC_CHANNEL, true);
            w.set_en(DAC_CHANNEL, true);
        });
    }
}
