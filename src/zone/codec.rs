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

//! Encoding of message metadata into file names.
//!
//! A message file is named
//!
//! ```text
//! YYYYMMDDHHMMSS-OK-NNN_msg.txt
//! ```
//!
//! where the first 14 digits are the UTC time of upload, `O` is the origin
//! (`A` for admin, `P` for the client, "public"), `K` is the kind (`M` for a
//! text message, `F` for a file), and `NNN` is a random number. New names
//! always use 100 to 999; any three digits are accepted when reading.
//! Everything after the first `_` is the payload label, which for text
//! messages is always `msg.txt`.
//!
//! Validity is purely a matter of shape. Date fields out of their usual range
//! carry over like C's `mktime` does, so `20201301000000` is read as January
//! 2021.
//!
//! Because the timestamp is fixed-width and comes first, comparing names as
//! strings orders them chronologically. The random part only separates
//! messages uploaded within the same second, in no meaningful order.
//!
//! Any further flags must go between `K` and the second `-`, so that the
//! timestamp, origin and kind keep their offsets. Readers never assume where
//! the tiebreak or payload start; they find them relative to the first `_`.

use chrono::Datelike;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

use super::model::{Kind, Party, Timestamp};
use crate::support::chronox;
use crate::support::error::Error;

/// The payload label of every text message.
pub const MESSAGE_LABEL: &str = "msg.txt";

lazy_static! {
    static ref MESSAGE_NAME: Regex =
        Regex::new(r"^[0-9]{14}-[AP][MF]-[0-9]{3}_msg\.txt").unwrap();
}

/// The random component of a message name.
///
/// `new` and `random` only produce 100 to 999; names read back may carry
/// anything from 000 up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tiebreak(u16);

impl Tiebreak {
    pub const MIN: u16 = 100;
    pub const MAX: u16 = 999;

    pub fn new(value: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Tiebreak(value))
        } else {
            None
        }
    }

    /// Choose a tiebreak uniformly at random.
    pub fn random() -> Self {
        Tiebreak(rand::thread_rng().gen_range(Self::MIN, Self::MAX + 1))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

/// The metadata recovered from a valid message name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedName<'a> {
    pub timestamp: Timestamp,
    pub origin: Party,
    pub kind: Kind,
    pub tiebreak: Tiebreak,
    pub label: &'a str,
}

/// Whether `name` looks like a message file at all.
///
/// Hidden files, directories' names, and anything else sharing the
/// conversation directory fail this check.
pub fn is_message_name(name: &str) -> bool {
    MESSAGE_NAME.is_match(name)
}

/// Produce the name for a new message.
///
/// Fails if `timestamp` falls outside years 0 to 9999, which cannot be written
/// in 14 digits.
pub fn encode(
    origin: Party,
    kind: Kind,
    timestamp: Timestamp,
    tiebreak: Tiebreak,
) -> Result<String, Error> {
    let datetime = chronox::utc_from_unix(timestamp)
        .filter(|dt| (0..=9999).contains(&dt.year()))
        .ok_or(Error::TimestampOutOfRange(timestamp))?;

    Ok(format!(
        "{}-{}{}-{:03}_{}",
        datetime.format("%Y%m%d%H%M%S"),
        origin_flag(origin),
        kind_flag(kind),
        tiebreak.get(),
        MESSAGE_LABEL,
    ))
}

/// Recover the metadata from `name`, or `None` if it is not a valid message
/// name.
pub fn decode(name: &str) -> Option<DecodedName<'_>> {
    if !is_message_name(name) {
        return None;
    }

    // The pattern guarantees the prefix is ASCII, so byte offsets are safe.
    let digits = |start: usize, len: usize| -> Option<u32> {
        name[start..start + len].parse().ok()
    };

    let timestamp = chronox::unix_from_utc_fields(
        digits(0, 4)? as i32,
        digits(4, 2)?,
        digits(6, 2)?,
        digits(8, 2)?,
        digits(10, 2)?,
        digits(12, 2)?,
    )?;

    let bytes = name.as_bytes();
    let origin = match bytes[15] {
        b'A' => Party::Admin,
        _ => Party::Client,
    };
    let kind = match bytes[16] {
        b'M' => Kind::Message,
        _ => Kind::File,
    };

    let payload_start = name.find('_')?;
    let tiebreak =
        Tiebreak(name[payload_start - 3..payload_start].parse().ok()?);

    Some(DecodedName {
        timestamp,
        origin,
        kind,
        tiebreak,
        label: &name[payload_start + 1..],
    })
}

fn origin_flag(origin: Party) -> char {
    match origin {
        Party::Admin => 'A',
        Party::Client => 'P',
    }
}

fn kind_flag(kind: Kind) -> char {
    match kind {
        Kind::Message => 'M',
        Kind::File => 'F',
    }
}

#[cfg(test)]
mod test {
    use chrono::prelude::*;
    use proptest::prelude::*;

    use super::*;
    use crate::support::chronox::OffsetX;

    fn tb(v: u16) -> Tiebreak {
        Tiebreak::new(v).unwrap()
    }

    #[test]
    fn encode_layout() {
        let ts = Utc.ymd_hmsx(2017, 6, 5, 4, 3, 2).timestamp();
        assert_eq!(
            "20170605040302-AM-123_msg.txt",
            encode(Party::Admin, Kind::Message, ts, tb(123)).unwrap()
        );
        assert_eq!(
            "20170605040302-PF-999_msg.txt",
            encode(Party::Client, Kind::File, ts, tb(999)).unwrap()
        );
    }

    #[test]
    fn encode_rejects_unrepresentable_times() {
        assert_matches!(
            Err(Error::TimestampOutOfRange(..)),
            encode(Party::Admin, Kind::Message, 300_000_000_000, tb(100))
        );
        assert_matches!(
            Err(Error::TimestampOutOfRange(..)),
            encode(Party::Admin, Kind::Message, -70_000_000_000, tb(100))
        );
    }

    #[test]
    fn tiebreak_range() {
        assert_eq!(None, Tiebreak::new(99));
        assert_eq!(None, Tiebreak::new(1000));
        assert_eq!(Some(100), Tiebreak::new(100).map(Tiebreak::get));
        for _ in 0..1000 {
            let t = Tiebreak::random().get();
            assert!(t >= 100 && t <= 999, "bad tiebreak {}", t);
        }
    }

    #[test]
    fn decode_valid_names() {
        let decoded = decode("20200229235959-PM-555_msg.txt").unwrap();
        assert_eq!(
            Utc.ymd_hmsx(2020, 2, 29, 23, 59, 59).timestamp(),
            decoded.timestamp
        );
        assert_eq!(Party::Client, decoded.origin);
        assert_eq!(Kind::Message, decoded.kind);
        assert_eq!(555, decoded.tiebreak.get());
        assert_eq!("msg.txt", decoded.label);

        let decoded = decode("19991231000000-AF-100_msg.txt").unwrap();
        assert_eq!(Party::Admin, decoded.origin);
        assert_eq!(Kind::File, decoded.kind);
    }

    #[test]
    fn foreign_names_are_ignored() {
        assert!(decode(".admin_lastaccess").is_none());
        assert!(decode(".client_lastaccess").is_none());
        assert!(decode(".wooclientzone_status").is_none());
        assert!(decode(".tmpAbCdEf").is_none());
        assert!(decode("Common").is_none());
        assert!(decode("Order ID 12").is_none());
        assert!(decode("notes.txt").is_none());
        assert!(decode("2020022923595-PM-555_msg.txt").is_none());
        assert!(decode("20200229235959-XM-555_msg.txt").is_none());
        assert!(decode("20200229235959-PX-555_msg.txt").is_none());
        assert!(decode("20200229235959-PM-55_msg.txt").is_none());
        assert!(decode("20200229235959-PM-555_invoice.pdf").is_none());
        assert!(decode("20200229235959-PM-555-msg.txt").is_none());
        assert!(decode("20200229235959-PM-555_msgxtxt").is_none());
        assert!(!is_message_name("x20200229235959-PM-555_msg.txt"));
    }

    #[test]
    fn out_of_range_dates_carry_over() {
        let jan_2021 = Utc.ymd_hmsx(2021, 1, 1, 0, 0, 0).timestamp();
        assert_eq!(
            jan_2021,
            decode("20201301000000-PM-555_msg.txt").unwrap().timestamp
        );
        assert_eq!(
            Utc.ymd_hmsx(2021, 3, 1, 0, 0, 0).timestamp(),
            decode("20210229000000-PM-555_msg.txt").unwrap().timestamp
        );
        assert_eq!(
            jan_2021 + 3600,
            decode("20201231250000-AM-555_msg.txt").unwrap().timestamp
        );
    }

    #[test]
    fn any_three_digit_tiebreak_is_read() {
        let decoded = decode("20200101000000-PM-042_msg.txt").unwrap();
        assert_eq!(42, decoded.tiebreak.get());
        let decoded = decode("20200101000000-AM-000_msg.txt").unwrap();
        assert_eq!(0, decoded.tiebreak.get());
    }

    #[test]
    fn decode_tolerates_trailing_text() {
        let decoded = decode("20200101000000-AM-321_msg.txt.orig").unwrap();
        assert_eq!("msg.txt.orig", decoded.label);
        assert_eq!(321, decoded.tiebreak.get());
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            timestamp in 0i64..253_402_300_800,
            admin in any::<bool>(),
            message in any::<bool>(),
            tiebreak in 100u16..=999,
        ) {
            let origin = if admin { Party::Admin } else { Party::Client };
            let kind = if message { Kind::Message } else { Kind::File };
            let name = encode(origin, kind, timestamp, tb(tiebreak)).unwrap();
            let decoded = decode(&name).unwrap();
            prop_assert_eq!(timestamp, decoded.timestamp);
            prop_assert_eq!(origin, decoded.origin);
            prop_assert_eq!(kind, decoded.kind);
            prop_assert_eq!(tiebreak, decoded.tiebreak.get());
            prop_assert_eq!(MESSAGE_LABEL, decoded.label);
        }

        #[test]
        fn name_order_is_chronological(
            t1 in 0i64..253_402_300_799,
            delta in 1i64..100_000_000,
            admin1 in any::<bool>(),
            admin2 in any::<bool>(),
            tiebreak1 in 100u16..=999,
            tiebreak2 in 100u16..=999,
        ) {
            let t2 = (t1 + delta).min(253_402_300_799);
            prop_assume!(t1 < t2);
            let o1 = if admin1 { Party::Admin } else { Party::Client };
            let o2 = if admin2 { Party::Admin } else { Party::Client };
            let n1 = encode(o1, Kind::Message, t1, tb(tiebreak1)).unwrap();
            let n2 = encode(o2, Kind::Message, t2, tb(tiebreak2)).unwrap();
            prop_assert!(n1 < n2, "{} >= {}", n1, n2);
        }
    }
}
