use time::{Date, UtcOffset};

use super::*;

/// Builder for constructing a BSON [`DateTime`] from calendar components.
///
/// The year, month and day must be supplied before [`DateTimeBuilder::build`] becomes available;
/// the clock fields default to zero and the offset defaults to UTC.
pub struct DateTimeBuilder<Y = NoYear, M = NoMonth, D = NoDay> {
    year: Y,
    month: M,
    day: D,
    clock: Clock,
}

#[derive(Default, Clone, Copy)]
struct Clock {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
    offset: Option<UtcOffset>,
}

impl Default for DateTimeBuilder {
    fn default() -> Self {
        Self {
            year: NoYear,
            month: NoMonth,
            day: NoDay,
            clock: Clock::default(),
        }
    }
}

pub struct Year(i32);
pub struct NoYear;

pub struct Month(u8);
pub struct NoMonth;

pub struct Day(u8);
pub struct NoDay;

impl<Y, M, D> DateTimeBuilder<Y, M, D> {
    /// Sets the hour (24-hour clock, `0..=23`).
    pub fn hour(mut self, hour: u8) -> Self {
        self.clock.hour = hour;
        self
    }

    /// Sets the minute (`0..=59`).
    pub fn minute(mut self, minute: u8) -> Self {
        self.clock.minute = minute;
        self
    }

    /// Sets the second (`0..=59`).
    pub fn second(mut self, second: u8) -> Self {
        self.clock.second = second;
        self
    }

    /// Sets the millisecond (`0..=999`).
    pub fn millisecond(mut self, millisecond: u16) -> Self {
        self.clock.millisecond = millisecond;
        self
    }

    /// Sets the offset the components are expressed in. The built value is normalized to UTC.
    pub fn offset(mut self, offset: UtcOffset) -> Self {
        self.clock.offset = Some(offset);
        self
    }
}

impl<M, D> DateTimeBuilder<NoYear, M, D> {
    /// Sets the year. Years between ±9999 inclusive are valid.
    pub fn year(self, y: i32) -> DateTimeBuilder<Year, M, D> {
        DateTimeBuilder {
            year: Year(y),
            month: self.month,
            day: self.day,
            clock: self.clock,
        }
    }
}

impl<Y, D> DateTimeBuilder<Y, NoMonth, D> {
    /// Sets the month, 1 for January through 12 for December.
    pub fn month(self, m: u8) -> DateTimeBuilder<Y, Month, D> {
        DateTimeBuilder {
            year: self.year,
            month: Month(m),
            day: self.day,
            clock: self.clock,
        }
    }
}

impl<Y, M> DateTimeBuilder<Y, M, NoDay> {
    /// Sets the day of the month, `1..=31`.
    pub fn day(self, d: u8) -> DateTimeBuilder<Y, M, Day> {
        DateTimeBuilder {
            year: self.year,
            month: self.month,
            day: Day(d),
            clock: self.clock,
        }
    }
}

impl DateTimeBuilder<Year, Month, Day> {
    /// Convert the components to a [`DateTime`]. Fails if any component is out of range or the
    /// day does not exist in the given month.
    pub fn build(self) -> Result<DateTime> {
        let err = |e: time::error::ComponentRange| Error::invalid_datetime(e);
        let month = time::Month::try_from(self.month.0).map_err(err)?;
        let clock = self.clock;
        let dt = Date::from_calendar_date(self.year.0, month, self.day.0)
            .map_err(err)?
            .with_hms_milli(clock.hour, clock.minute, clock.second, clock.millisecond)
            .map_err(err)?;
        let offset = clock.offset.unwrap_or(UtcOffset::UTC);
        Ok(DateTime::from_offset_datetime(dt.assume_offset(offset)))
    }
}
