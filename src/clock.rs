//! Time helpers: wraparound-safe deadlines and the local wall clock.
//!
//! The monotonic millisecond counter is a `u32` and wraps after ~49 days.
//! Deadlines are compared through the signed difference so one wrap does
//! not flip the result.
//!
//! Wall-clock time is derived from a unix-time base captured at some boot
//! instant plus the monotonic time elapsed since then, converted to local
//! calendar fields with a fixed UTC offset.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// `true` once `now_ms` has reached `deadline_ms`.
pub const fn deadline_reached(deadline_ms: u32, now_ms: u32) -> bool {
    (deadline_ms.wrapping_sub(now_ms) as i32) <= 0
}

/// Anything earlier than 2023-11-14 means the clock was never set.
pub const MIN_PLAUSIBLE_UNIX_SECS: u64 = 1_700_000_000;

/// Local calendar time at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WallClockSnapshot {
    pub valid: bool,
    pub unix_ms: u64,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    pub seconds_of_day: u32,
    /// `YYYYMMDD`, 0 when invalid.
    pub date_key: u32,
}

impl WallClockSnapshot {
    pub const fn invalid() -> Self {
        Self {
            valid: false,
            unix_ms: 0,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            weekday: 0,
            seconds_of_day: 0,
            date_key: 0,
        }
    }

    /// Build a valid snapshot from local fields, e.g. for tests or an RTC.
    pub fn from_local(date_key: u32, weekday: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            valid: true,
            unix_ms: 0,
            year: (date_key / 10_000) as u16,
            month: (date_key / 100 % 100) as u8,
            day: (date_key % 100) as u8,
            hour,
            minute,
            second,
            weekday: weekday % 7,
            seconds_of_day: u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second),
            date_key,
        }
    }

    /// Usable for calendar scheduling.
    pub const fn is_usable(&self) -> bool {
        self.valid && self.date_key != 0
    }

    fn from_local_datetime(unix_ms: u64, local: &DateTime<FixedOffset>) -> Self {
        let (year, month, day) = (local.year(), local.month(), local.day());
        Self {
            valid: true,
            unix_ms,
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: local.hour() as u8,
            minute: local.minute() as u8,
            second: local.second() as u8,
            weekday: local.weekday().num_days_from_sunday() as u8,
            seconds_of_day: local.num_seconds_from_midnight(),
            date_key: year as u32 * 10_000 + month * 100 + day,
        }
    }
}

/// Unix-time base plus monotonic elapsed time.
#[derive(Debug, Clone)]
pub struct WallClock {
    offset: FixedOffset,
    base: Option<ClockBase>,
}

#[derive(Debug, Clone, Copy)]
struct ClockBase {
    unix_ms: u64,
    boot_ms: u32,
}

impl WallClock {
    /// `utc_offset_secs` east of UTC; out-of-range offsets fall back to UTC.
    pub fn new(utc_offset_secs: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or(Utc.fix());
        Self { offset, base: None }
    }

    pub fn is_valid(&self) -> bool {
        self.base.is_some()
    }

    /// Anchor the clock: `unix_ms` is the time at monotonic `now_ms`.
    /// Implausible times are rejected and leave the clock unchanged.
    pub fn set_unix_time_ms(&mut self, unix_ms: u64, now_ms: u32) -> bool {
        if unix_ms / 1000 < MIN_PLAUSIBLE_UNIX_SECS {
            return false;
        }
        self.base = Some(ClockBase { unix_ms, boot_ms: now_ms });
        true
    }

    /// Adopt the system clock once something (SNTP) has set it.
    pub fn refresh_from_system_time(&mut self, now_ms: u32) -> bool {
        match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(since_epoch) => self.set_unix_time_ms(since_epoch.as_millis() as u64, now_ms),
            Err(_) => false,
        }
    }

    pub fn now(&self, now_ms: u32) -> WallClockSnapshot {
        let Some(base) = self.base else {
            return WallClockSnapshot::invalid();
        };
        let unix_ms = base.unix_ms + u64::from(now_ms.wrapping_sub(base.boot_ms));
        let secs = (unix_ms / 1000) as i64;
        let nanos = (unix_ms % 1000) as u32 * 1_000_000;
        match DateTime::<Utc>::from_timestamp(secs, nanos) {
            Some(utc) => WallClockSnapshot::from_local_datetime(unix_ms, &utc.with_timezone(&self.offset)),
            None => WallClockSnapshot::invalid(),
        }
    }
}
