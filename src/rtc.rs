//! Real-time clock model: time of day, alarm schedules and the driver trait.
//!
//! The calendar registers hold time as binary coded decimal. The helpers here
//! convert in both directions and validate digits, so the board driver only
//! moves nibbles in and out of registers.

use core::time::Duration;

use crate::config::RtcConfig;
use crate::error::RtcError;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Time of day on the 24-hour RTC calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Result<Self, RtcError> {
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(RtcError::InvalidTime);
        }
        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub const fn hours(self) -> u8 {
        self.hours
    }

    pub const fn minutes(self) -> u8 {
        self.minutes
    }

    pub const fn seconds(self) -> u8 {
        self.seconds
    }

    pub const fn seconds_since_midnight(self) -> u32 {
        self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }

    /// Wraps around midnight.
    pub const fn from_seconds_since_midnight(secs: u32) -> Self {
        let secs = secs % SECONDS_PER_DAY;
        Self {
            hours: (secs / 3600) as u8,
            minutes: (secs / 60 % 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }

    /// Adds `offset`, wrapping around midnight. Sub-second parts are dropped.
    pub fn wrapping_add(self, offset: Duration) -> Self {
        let offset = (offset.as_secs() % u64::from(SECONDS_PER_DAY)) as u32;
        Self::from_seconds_since_midnight(self.seconds_since_midnight() + offset)
    }

    /// Decodes BCD hour, minute and second fields.
    pub fn from_bcd(hours: u8, minutes: u8, seconds: u8) -> Result<Self, RtcError> {
        Self::new(bcd_decode(hours)?, bcd_decode(minutes)?, bcd_decode(seconds)?)
    }

    /// BCD `[hours, minutes, seconds]`.
    pub const fn to_bcd(self) -> [u8; 3] {
        [
            bcd_encode(self.hours),
            bcd_encode(self.minutes),
            bcd_encode(self.seconds),
        ]
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self::MIDNIGHT
    }
}

/// Packs a value below 100 into two BCD digits.
pub const fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

pub const fn bcd_decode(bcd: u8) -> Result<u8, RtcError> {
    let tens = bcd >> 4;
    let units = bcd & 0x0F;
    if tens > 9 || units > 9 {
        return Err(RtcError::InvalidTime);
    }
    Ok(tens * 10 + units)
}

/// Which calendar fields the alarm ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmMask {
    /// Date and weekday ignored: matches hours, minutes and seconds daily.
    DateWeekDay,
    /// Date, weekday and hours ignored: matches minutes and seconds hourly.
    DateWeekDayHours,
}

/// A single alarm: when it fires and how it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSchedule {
    pub at: TimeOfDay,
    pub mask: AlarmMask,
}

impl AlarmSchedule {
    /// Alarm firing `offset` after `now`.
    pub fn after(now: TimeOfDay, offset: Duration) -> Self {
        Self {
            at: now.wrapping_add(offset),
            mask: AlarmMask::DateWeekDay,
        }
    }
}

/// RTC capabilities consumed by the controllers.
pub trait RealTimeClock {
    /// Starts the RTC clock source and applies the prescalers.
    ///
    /// Safe to repeat on every state entry. Leaves the current time alone.
    fn init(&mut self, config: &RtcConfig) -> Result<(), RtcError>;

    /// Whether the RTC clock source is running.
    fn clock_ready(&self) -> bool;

    /// Current time of day from the calendar shadow registers.
    fn time(&self) -> TimeOfDay;

    /// Programs and enables the single alarm, replacing any previous one.
    fn set_alarm(&mut self, alarm: &AlarmSchedule) -> Result<(), RtcError>;

    /// Disables the alarm.
    fn clear_alarm(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_encodes_each_decimal_digit_in_a_nibble() {
        assert_eq!(bcd_encode(0), 0x00);
        assert_eq!(bcd_encode(5), 0x05);
        assert_eq!(bcd_encode(59), 0x59);
        assert_eq!(bcd_decode(0x23), Ok(23));
        assert_eq!(bcd_decode(0x1A), Err(RtcError::InvalidTime));
    }

    #[test]
    fn time_rejects_out_of_range_fields() {
        assert_eq!(TimeOfDay::new(24, 0, 0), Err(RtcError::InvalidTime));
        assert_eq!(TimeOfDay::new(0, 60, 0), Err(RtcError::InvalidTime));
        assert_eq!(TimeOfDay::from_bcd(0x01, 0x00, 0x60), Err(RtcError::InvalidTime));
        assert!(TimeOfDay::new(23, 59, 59).is_ok());
    }

    #[test]
    fn relative_alarm_matches_the_stop_timeout() {
        let now = TimeOfDay::new(1, 0, 0).unwrap();
        let alarm = AlarmSchedule::after(now, Duration::from_secs(5));
        assert_eq!(alarm.at, TimeOfDay::new(1, 0, 5).unwrap());
        assert_eq!(alarm.at.to_bcd(), [0x01, 0x00, 0x05]);
        assert_eq!(alarm.mask, AlarmMask::DateWeekDay);
    }

    #[test]
    fn relative_alarm_wraps_past_midnight() {
        let now = TimeOfDay::new(23, 59, 57).unwrap();
        let alarm = AlarmSchedule::after(now, Duration::from_secs(8));
        assert_eq!(alarm.at, TimeOfDay::new(0, 0, 5).unwrap());
    }

    #[test]
    fn bcd_round_trips_through_registers() {
        let time = TimeOfDay::new(12, 34, 56).unwrap();
        let [h, m, s] = time.to_bcd();
        assert_eq!(TimeOfDay::from_bcd(h, m, s), Ok(time));
    }
}
