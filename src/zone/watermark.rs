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

//! Per-party "last looked at" timestamps.
//!
//! Each party has one hidden file per conversation containing nothing but a
//! decimal UNIX timestamp. The file is replaced wholesale on every update, so
//! concurrent updates by the same party simply race to write "now"; whoever
//! is last wins, which is fine since they all wrote roughly the same value.

use super::model::{Party, Timestamp};
use super::zone_path::ZonePath;
use crate::support::error::Error;
use crate::support::file_ops;

const WATERMARK_MODE: u32 = 0o644;

pub struct WatermarkTracker<'a> {
    zone: &'a ZonePath,
}

impl<'a> WatermarkTracker<'a> {
    pub fn new(zone: &'a ZonePath) -> Self {
        WatermarkTracker { zone }
    }

    /// Return when `party` last read the conversation, or `None` if they
    /// never have.
    ///
    /// A missing file, one that cannot be parsed, and one holding 0 all mean
    /// never.
    pub fn recorded(&self, party: Party) -> Result<Option<Timestamp>, Error> {
        Ok(file_ops::slurp_opt(self.zone.watermark_path(party))?
            .and_then(|s| s.trim().parse::<Timestamp>().ok())
            .filter(|&t| 0 != t))
    }

    /// Like `recorded`, but with 0 for never.
    pub fn get(&self, party: Party) -> Result<Timestamp, Error> {
        Ok(self.recorded(party)?.unwrap_or(0))
    }

    /// Record that `party` read the conversation at `timestamp`.
    ///
    /// The conversation directory is created if needed, since reading an area
    /// that has never had a message still counts as a visit.
    pub fn set(&self, party: Party, timestamp: Timestamp) -> Result<(), Error> {
        self.zone.create_if_nx()?;
        file_ops::spit(
            self.zone.path(),
            self.zone.watermark_path(party),
            true,
            WATERMARK_MODE,
            timestamp.to_string().as_bytes(),
        )?;
        Ok(())
    }
}
