//-
// Copyright (c) 2026, Clientzone contributors
//
// This file is part of Clientzone.
//
// Clientzone is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Clientzone is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Clientzone. If not, see <http://www.gnu.org/licenses/>.

//! Helpers for going between UNIX timestamps and chrono's types without the
//! `Option`/`LocalResult` noise at every call site.

use std::convert::TryFrom;

use chrono::prelude::*;
use chrono::Duration;

/// Convert a UNIX timestamp (seconds) to a UTC date-time, if it is
/// representable.
pub fn utc_from_unix(timestamp: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(timestamp, 0).single()
}

/// Convert broken-down UTC calendar fields to a UNIX timestamp.
///
/// Out-of-range fields carry over into the next larger unit, the way C's
/// `mktime` treats them: month 13 is January of the following year, day 0 is
/// the last day of the previous month, hour 24 is midnight of the next day.
/// Returns `None` only if the result is beyond what chrono can represent.
pub fn unix_from_utc_fields(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32,
    s: u32,
) -> Option<i64> {
    let months = i64::from(y) * 12 + i64::from(m) - 1;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = months.rem_euclid(12) as u32 + 1;

    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(i64::from(d) - 1))?
        .checked_add_signed(Duration::hours(i64::from(h)))?
        .checked_add_signed(Duration::minutes(i64::from(min)))?
        .checked_add_signed(Duration::seconds(i64::from(s)))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
}

#[cfg(test)]
pub trait OffsetX {
    type DateTime;

    fn ymd_hmsx(
        &self,
        y: i32,
        m: u32,
        d: u32,
        h: u32,
        min: u32,
        s: u32,
    ) -> Self::DateTime;
}

#[cfg(test)]
impl<T: chrono::TimeZone + chrono::Offset> OffsetX for T {
    type DateTime = DateTime<T>;

    fn ymd_hmsx(
        &self,
        y: i32,
        m: u32,
        d: u32,
        h: u32,
        min: u32,
        s: u32,
    ) -> Self::DateTime {
        self.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }
}
