//! Time reconstruction
//!
//! Sensor tables index samples from the start of the recording. This module
//! turns those indices into wall-clock timestamps and hour-of-day buckets.

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Timelike, Utc};

/// Clock used to read hour-of-day from a reconstructed instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockZone {
    /// The host's local clock
    Local,
    /// A fixed UTC offset
    Fixed(FixedOffset),
}

impl ClockZone {
    fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            ClockZone::Local => {
                let offset = Local.offset_from_utc_datetime(&instant.naive_utc()).fix();
                instant.with_timezone(&offset)
            }
            ClockZone::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

/// Converts sample indices of one session into absolute timestamps
#[derive(Debug, Clone, Copy)]
pub struct TimeReconstructor {
    /// Session origin (epoch milliseconds)
    origin_ms: i64,
    sample_rate_hz: f64,
    clock: ClockZone,
}

impl TimeReconstructor {
    pub fn new(origin_ms: i64, sample_rate_hz: f64, clock: ClockZone) -> Self {
        Self {
            origin_ms,
            sample_rate_hz,
            clock,
        }
    }

    /// Seconds since the session origin for a sample index
    pub fn seconds_offset(&self, sample_index: i64) -> f64 {
        sample_index as f64 / self.sample_rate_hz
    }

    /// Absolute epoch seconds for a sample index
    pub fn epoch_seconds(&self, sample_index: i64) -> f64 {
        self.origin_ms as f64 / 1000.0 + self.seconds_offset(sample_index)
    }

    /// Wall-clock instant for a sample index, `None` if it falls outside the
    /// representable date range
    pub fn timestamp(&self, sample_index: i64) -> Option<DateTime<FixedOffset>> {
        let origin = DateTime::<Utc>::from_timestamp_millis(self.origin_ms)?;
        let offset_nanos = (self.seconds_offset(sample_index) * 1e9).round();
        if !offset_nanos.is_finite() || offset_nanos.abs() > i64::MAX as f64 {
            return None;
        }
        let instant = origin.checked_add_signed(chrono::Duration::nanoseconds(offset_nanos as i64))?;
        Some(self.clock.localize(instant))
    }

    /// Hour of day (0-23) on the configured clock
    pub fn hour_of_day(timestamp: &DateTime<FixedOffset>) -> u8 {
        timestamp.hour() as u8
    }
}
