//! Module containing functionality related to BSON DateTimes.
//! For more information, see the documentation for the [`DateTime`] type.
pub(crate) mod builder;

use std::{
    fmt::{self, Display},
    time::{Duration, SystemTime},
};

#[cfg(feature = "chrono-0_4")]
use chrono::{LocalResult, TimeZone, Utc};
use time::{format_description::well_known::Rfc3339, macros::format_description};

pub use crate::datetime::builder::DateTimeBuilder;
use crate::error::{Error, Result};

/// Struct representing a BSON datetime.
/// Note: BSON datetimes have millisecond precision and are always in UTC.
///
/// A datetime can be built from calendar components with [`DateTime::builder`]:
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dt = bson_mapping::DateTime::builder().year(1998).month(2).day(12).minute(1).millisecond(23).build()?;
/// let expected = bson_mapping::DateTime::parse_rfc3339_str("1998-02-12T00:01:00.023Z")?;
/// assert_eq!(dt, expected);
/// # Ok(())
/// # }
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone, Default)]
pub struct DateTime(i64);

impl crate::DateTime {
    /// The latest possible date that can be represented in BSON.
    pub const MAX: Self = Self::from_millis(i64::MAX);

    /// The earliest possible date that can be represented in BSON.
    pub const MIN: Self = Self::from_millis(i64::MIN);

    /// The Unix epoch.
    pub const UNIX_EPOCH: Self = Self::from_millis(0);

    /// Makes a new [`DateTime`] from the number of non-leap milliseconds since
    /// January 1, 1970 0:00:00 UTC (aka "UNIX timestamp").
    pub const fn from_millis(date: i64) -> Self {
        Self(date)
    }

    /// Returns a [`DateTime`] which corresponds to the current date and time.
    pub fn now() -> DateTime {
        Self::from_system_time(SystemTime::now())
    }

    /// Returns a builder used to construct a [`DateTime`] from calendar components.
    pub fn builder() -> DateTimeBuilder {
        DateTimeBuilder::default()
    }

    #[cfg(feature = "chrono-0_4")]
    pub fn from_chrono<T: chrono::TimeZone>(dt: chrono::DateTime<T>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }

    #[cfg(feature = "chrono-0_4")]
    pub fn to_chrono(self) -> chrono::DateTime<Utc> {
        match Utc.timestamp_millis_opt(self.0) {
            LocalResult::Single(dt) => dt,
            _ => {
                if self.0 < 0 {
                    chrono::DateTime::<Utc>::MIN_UTC
                } else {
                    chrono::DateTime::<Utc>::MAX_UTC
                }
            }
        }
    }

    pub(crate) fn from_offset_datetime(dt: time::OffsetDateTime) -> Self {
        let millis = dt.unix_timestamp_nanos() / 1_000_000;
        match i64::try_from(millis) {
            Ok(ts) => Self::from_millis(ts),
            _ => {
                if millis > 0 {
                    Self::MAX
                } else {
                    Self::MIN
                }
            }
        }
    }

    #[cfg(feature = "time-0_3")]
    pub fn from_time_0_3(dt: time::OffsetDateTime) -> Self {
        Self::from_offset_datetime(dt)
    }

    #[cfg(feature = "time-0_3")]
    pub fn to_time_0_3(self) -> time::OffsetDateTime {
        match self.to_time_opt() {
            Some(dt) => dt,
            None => if self.0 < 0 {
                time::PrimitiveDateTime::MIN
            } else {
                time::PrimitiveDateTime::MAX
            }
            .assume_utc(),
        }
    }

    pub(crate) fn to_time_opt(self) -> Option<time::OffsetDateTime> {
        time::OffsetDateTime::UNIX_EPOCH.checked_add(time::Duration::milliseconds(self.0))
    }

    pub fn from_system_time(st: SystemTime) -> Self {
        match st.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(d) => {
                if d.as_millis() <= i64::MAX as u128 {
                    Self::from_millis(d.as_millis() as i64)
                } else {
                    Self::MAX
                }
            }
            // handle SystemTime from before the Unix Epoch
            Err(e) => {
                let millis = e.duration().as_millis();
                if millis > i64::MAX as u128 {
                    Self::MIN
                } else {
                    Self::from_millis(-(millis as i64))
                }
            }
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        if self.0 >= 0 {
            SystemTime::UNIX_EPOCH + Duration::from_millis(self.0 as u64)
        } else {
            // i64::MIN.abs() overflows, so widen first
            SystemTime::UNIX_EPOCH - Duration::from_millis((self.0 as i128).unsigned_abs() as u64)
        }
    }

    /// Returns the number of non-leap-milliseconds since January 1, 1970 UTC.
    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    pub const fn saturating_add_millis(self, millis: i64) -> Self {
        Self::from_millis(self.0.saturating_add(millis))
    }

    /// Convert this [`DateTime`] to an RFC 3339 formatted string.
    pub fn try_to_rfc3339_string(self) -> Result<String> {
        let dt = self
            .to_time_opt()
            .ok_or_else(|| Error::cannot_format_datetime(format!("{} is out of range", self.0)))?;
        dt.format(&Rfc3339).map_err(Error::cannot_format_datetime)
    }

    /// Formats this [`DateTime`] as `yyyy-MM-ddTHH:mm:ss.fffZ`, the form used by the shell's
    /// `ISODate` constructor. Returns `None` if the date is outside of the supported range.
    pub fn to_iso_string(self) -> Option<String> {
        let format = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        );
        let dt = self.to_time_opt()?;
        if !(0..=9999).contains(&dt.year()) {
            return None;
        }
        dt.format(&format).ok()
    }

    /// Formats this [`DateTime`] the way the shell's `Date()` function does, e.g.
    /// `Thu Jan 01 1970 00:00:00 UTC`.
    pub(crate) fn to_shell_date_string(self) -> Option<String> {
        let format = format_description!(
            "[weekday repr:short] [month repr:short] [day] [year] [hour]:[minute]:[second] UTC"
        );
        self.to_time_opt()?.format(&format).ok()
    }

    /// Convert the given RFC 3339 formatted string to a [`DateTime`], truncating it to millisecond
    /// precision.
    pub fn parse_rfc3339_str(s: impl AsRef<str>) -> Result<Self> {
        let odt =
            time::OffsetDateTime::parse(s.as_ref(), &Rfc3339).map_err(Error::invalid_datetime)?;
        Ok(Self::from_offset_datetime(odt))
    }

    /// Parses the ISO 8601 forms accepted by the shell's `ISODate` constructor. The date may be
    /// `yyyy`, `yyyy-MM`, `yyyy-MM-dd` or the compact `yyyyMM` / `yyyyMMdd`; it may be followed by
    /// `T` and a time of `HH`, `HH:mm`, `HH:mm:ss` or the compact `HHmm` / `HHmmss`, with an
    /// optional fraction and an optional `Z`, `±HH`, `±HH:mm` or `±HHmm` offset. A missing offset
    /// means UTC.
    ///
    /// ```
    /// use bson_mapping::DateTime;
    ///
    /// let dt = DateTime::parse_iso8601("19700102T0001+00:00")?;
    /// assert_eq!(dt.timestamp_millis(), 86_460_000);
    /// # Ok::<(), bson_mapping::error::Error>(())
    /// ```
    pub fn parse_iso8601(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref();
        let invalid = || Error::invalid_datetime(format!("invalid ISO 8601 date {s:?}"));

        let (date_part, time_part) = match s.split_once(['T', 't']) {
            Some((date, time)) => (date, Some(time)),
            None => (s, None),
        };
        let [year, month, day] = split_fields(date_part, &[4, 2, 2], '-').ok_or_else(invalid)?;
        let year: i32 = parse_digits(year, 4).ok_or_else(invalid)?;
        let month: u8 = month.map_or(Some(1), |m| parse_digits(Some(m), 2)).ok_or_else(invalid)?;
        let day: u8 = day.map_or(Some(1), |d| parse_digits(Some(d), 2)).ok_or_else(invalid)?;

        let mut builder = Self::builder().year(year).month(month).day(day);
        let mut offset = time::UtcOffset::UTC;

        if let Some(time_part) = time_part {
            let zone_start = time_part.find(['Z', 'z', '+', '-']).unwrap_or(time_part.len());
            let (clock, zone) = time_part.split_at(zone_start);
            offset = match zone {
                "" | "Z" | "z" => time::UtcOffset::UTC,
                zone => parse_offset(zone).ok_or_else(invalid)?,
            };

            let (hms, fraction) = match clock.split_once('.') {
                Some((hms, fraction)) => (hms, Some(fraction)),
                None => (clock, None),
            };
            let [hour, minute, second] = split_fields(hms, &[2, 2, 2], ':').ok_or_else(invalid)?;
            builder = builder.hour(parse_digits(hour, 2).ok_or_else(invalid)?);
            if let Some(minute) = minute {
                builder = builder.minute(parse_digits(Some(minute), 2).ok_or_else(invalid)?);
            }
            if let Some(second) = second {
                builder = builder.second(parse_digits(Some(second), 2).ok_or_else(invalid)?);
            }
            if let Some(fraction) = fraction {
                if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                // truncate to millisecond precision
                let millis: String = fraction.chars().chain("00".chars()).take(3).collect();
                builder = builder.millisecond(millis.parse().map_err(|_| invalid())?);
            }
        }

        builder.offset(offset).build()
    }
}

// Splits `s` into up to three fields, either separated by `separator` or packed together with the
// given widths.
fn split_fields<'a>(s: &'a str, widths: &[usize; 3], separator: char) -> Option<[Option<&'a str>; 3]> {
    let mut fields = [None; 3];
    if s.contains(separator) {
        let mut parts = s.split(separator);
        for field in fields.iter_mut() {
            *field = parts.next();
        }
        if parts.next().is_some() {
            return None;
        }
    } else {
        let mut rest = s;
        for (field, width) in fields.iter_mut().zip(widths) {
            if rest.is_empty() {
                break;
            }
            if rest.len() < *width || !rest.is_char_boundary(*width) {
                return None;
            }
            let (head, tail) = rest.split_at(*width);
            *field = Some(head);
            rest = tail;
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(fields)
}

fn parse_digits<T: std::str::FromStr>(s: Option<&str>, width: usize) -> Option<T> {
    let s = s?;
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_offset(zone: &str) -> Option<time::UtcOffset> {
    let sign: i8 = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
    let hours: i8 = parse_digits(digits.get(..2), 2)?;
    let minutes: i8 = match digits.get(2..) {
        Some("") | None => 0,
        rest => parse_digits(rest, 2)?,
    };
    time::UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

impl fmt::Debug for crate::DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tup = f.debug_tuple("DateTime");
        match self.to_iso_string() {
            Some(dt) => tup.field(&dt),
            _ => tup.field(&self.0),
        };
        tup.finish()
    }
}

impl Display for crate::DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso_string() {
            Some(dt) => f.write_str(&dt),
            _ => Display::fmt(&self.0, f),
        }
    }
}

impl From<SystemTime> for crate::DateTime {
    fn from(st: SystemTime) -> Self {
        Self::from_system_time(st)
    }
}

impl From<crate::DateTime> for SystemTime {
    fn from(dt: crate::DateTime) -> Self {
        dt.to_system_time()
    }
}

#[cfg(feature = "chrono-0_4")]
impl From<crate::DateTime> for chrono::DateTime<Utc> {
    fn from(bson_dt: DateTime) -> Self {
        bson_dt.to_chrono()
    }
}

#[cfg(feature = "chrono-0_4")]
impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for crate::DateTime {
    fn from(x: chrono::DateTime<T>) -> Self {
        Self::from_chrono(x)
    }
}

#[cfg(feature = "time-0_3")]
impl From<crate::DateTime> for time::OffsetDateTime {
    fn from(bson_dt: DateTime) -> Self {
        bson_dt.to_time_0_3()
    }
}

#[cfg(feature = "time-0_3")]
impl From<time::OffsetDateTime> for crate::DateTime {
    fn from(x: time::OffsetDateTime) -> Self {
        Self::from_time_0_3(x)
    }
}
