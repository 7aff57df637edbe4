//! Waveform index persistence across Standby resets.
//!
//! The store is a single backup-domain register. It keeps its content through
//! Stop, Standby and system resets, and is zeroed only by an explicit
//! backup-domain reset, issued on cold start and never on a wake.

use crate::power::ResetCause;
use crate::waveform::{WAVEFORM_COUNT, WaveformIndex};

/// Backup-domain register access, implemented by the board layer.
pub trait BackupDomain {
    /// Raw register content.
    fn read(&self) -> u32;

    fn write(&mut self, value: u32);

    /// Resets the whole backup domain, zeroing the register and stopping
    /// the RTC clock.
    fn reset(&mut self);
}

/// The waveform index kept across Standby resets.
///
/// Holds the only handle to the backup register, so the controller that
/// owns the store is its only writer.
pub struct PersistentStateStore<B> {
    backup: B,
}

impl<B: BackupDomain> PersistentStateStore<B> {
    /// Opens the store for this boot, resetting the backup domain only if
    /// `cause` is a cold start.
    ///
    /// # Arguments
    ///
    /// * `backup` - Backup-domain register driver
    /// * `cause` - Why the device last reset, read once at boot
    pub fn boot(mut backup: B, cause: ResetCause) -> Self {
        if cause.is_cold_start() {
            info!("cold start, resetting backup domain");
            backup.reset();
        }
        Self { backup }
    }

    /// Low byte of the register, unvalidated.
    pub fn read(&self) -> u8 {
        self.backup.read() as u8
    }

    /// Stores `value` and reads it back.
    ///
    /// The read-back forces the write through the bus before the caller
    /// suspends.
    pub fn write(&mut self, value: u8) {
        self.backup.write(u32::from(value));
        let stored = self.backup.read();
        if stored != u32::from(value) {
            warn!("backup register holds {} after writing {}", stored, value);
        }
    }

    /// Reads the waveform index left by the previous run.
    ///
    /// A value outside `0..WAVEFORM_COUNT` is never written by this firmware;
    /// if one shows up anyway it is logged and treated as index 0.
    pub fn restore_index(&self) -> WaveformIndex {
        let raw = self.backup.read();
        match u8::try_from(raw).ok().and_then(WaveformIndex::new) {
            Some(index) => {
                info!("restored waveform index {}", index.get());
                index
            }
            None => {
                warn!(
                    "persisted value {} outside 0..{}, restarting at 0",
                    raw, WAVEFORM_COUNT
                );
                WaveformIndex::FIRST
            }
        }
    }

    /// Stores `index` for the next boot. Call as the last step before
    /// Standby.
    pub fn persist_index(&mut self, index: WaveformIndex) {
        debug!("persisting waveform index {}", index.get());
        self.write(index.get());
    }
}
