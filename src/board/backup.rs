//! Backup-domain access: RTC_BKP0R and the domain reset.

use embassy_stm32::pac;

use crate::store::BackupDomain;

/// Index of the register holding the waveform index.
const INDEX_REGISTER: usize = 0;

/// Lifts backup-domain write protection. Stays lifted until the next reset.
pub(super) fn enable_backup_access() {
    pac::RCC.apb1enr().modify(|w| w.set_pwren(true));
    pac::PWR.cr().modify(|w| w.set_dbp(true));
    while !pac::PWR.cr().read().dbp() {}
}

pub struct BackupRegister {
    _private: (),
}

impl BackupRegister {
    pub fn new() -> Self {
        enable_backup_access();
        Self { _private: () }
    }
}

impl BackupDomain for BackupRegister {
    fn read(&self) -> u32 {
        pac::RTC.bkpr(INDEX_REGISTER).read().bkp()
    }

    fn write(&mut self, value: u32) {
        pac::RTC.bkpr(INDEX_REGISTER).write(|w| w.set_bkp(value));
    }

    /// Also stops the RTC and clears its clock selection; [`LsiRtc`] brings
    /// both back on its next init.
    ///
    /// [`LsiRtc`]: super::LsiRtc
    fn reset(&mut self) {
        pac::RCC.bdcr().modify(|w| w.set_bdrst(true));
        pac::RCC.bdcr().modify(|w| w.set_bdrst(false));
    }
}
