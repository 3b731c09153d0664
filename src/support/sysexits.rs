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

//! Constants from `sysexits.h`
//!
//! The command-line front-end is normally driven by another program (a web
//! application's request handler, a cron job), so it reports failures with the
//! conventional codes rather than a bare 1.

use crate::support::error::{Error, FailureClass};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_NOINPUT: Sysexit = Sysexit(66);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_TEMPFAIL: Sysexit = Sysexit(75);
pub const EX_NOPERM: Sysexit = Sysexit(77);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }

    /// Choose the exit code that best describes a failure of `class`.
    pub fn for_class(class: FailureClass) -> Self {
        match class {
            FailureClass::Configuration => EX_CONFIG,
            FailureClass::Security => EX_NOPERM,
            FailureClass::Refused => EX_DATAERR,
            FailureClass::NotFound => EX_NOINPUT,
            FailureClass::Partial => EX_TEMPFAIL,
            FailureClass::Internal => EX_SOFTWARE,
            FailureClass::Io => EX_IOERR,
        }
    }

    pub fn for_error(error: &Error) -> Self {
        Self::for_class(error.class())
    }
}
