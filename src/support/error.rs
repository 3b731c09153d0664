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

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The storage root folder is not configured")]
    RootNotConfigured,
    #[error("The storage root folder contains illegal characters")]
    UnsafeRoot,
    #[error("Security check failed or timeout")]
    SecurityCheckFailed,
    #[error("Operation not permitted for this party")]
    NotPermitted,
    #[error("No user ID found")]
    NoUser,
    #[error("No message found")]
    EmptyMessage,
    #[error("Messaging is disabled for this communications area")]
    MessagingDisabled,
    #[error("Timestamp {0} cannot be encoded into a message name")]
    TimestampOutOfRange(i64),
    #[error("Could not find a free name for the new message")]
    NameCollision,
    #[error("Nothing to move!")]
    NothingToMove,
    #[error("Source and target communications areas are the same")]
    SameConversation,
    #[error("{remaining} files could not be moved")]
    PartialMove { moved: usize, remaining: usize },
    #[error("Cannot scan {}: {}", path.display(), source)]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How loudly a condition should be reported to whoever is on the other end.
///
/// The store only ever classifies; deciding what to log or show is up to the
/// caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Not reported at all; the caller simply tries again later.
    Silent,
    Info,
    Warning,
    Error,
}

/// The broad kind of a failure, for callers that need to react differently
/// to each (exit codes, retry decisions) without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The store is not usable as configured.
    Configuration,
    /// The caller failed the security check or may not do this.
    Security,
    /// The request itself was unacceptable.
    Refused,
    /// There was nothing to operate on.
    NotFound,
    /// Some of the work was done; trying again later may finish it.
    Partial,
    /// An internal invariant did not hold.
    Internal,
    Io,
}

impl Error {
    pub fn class(&self) -> FailureClass {
        match *self {
            Error::RootNotConfigured | Error::UnsafeRoot => {
                FailureClass::Configuration
            }
            Error::SecurityCheckFailed | Error::NotPermitted | Error::NoUser => {
                FailureClass::Security
            }
            Error::EmptyMessage
            | Error::MessagingDisabled
            | Error::SameConversation => FailureClass::Refused,
            Error::NothingToMove => FailureClass::NotFound,
            Error::PartialMove { .. } | Error::NameCollision => {
                FailureClass::Partial
            }
            Error::TimestampOutOfRange(..) => FailureClass::Internal,
            Error::Scan { .. } | Error::Io(..) => FailureClass::Io,
        }
    }

    pub fn severity(&self) -> Severity {
        match *self {
            Error::SecurityCheckFailed
            | Error::NotPermitted
            | Error::NoUser
            | Error::EmptyMessage
            | Error::MessagingDisabled
            | Error::SameConversation => Severity::Warning,

            Error::RootNotConfigured
            | Error::UnsafeRoot
            | Error::TimestampOutOfRange(..)
            | Error::NameCollision
            | Error::NothingToMove
            | Error::PartialMove { .. }
            | Error::Scan { .. }
            | Error::Io(..) => Severity::Error,
        }
    }

    /// Whether this error stems from bad configuration rather than the state
    /// of the store.
    pub fn is_configuration(&self) -> bool {
        FailureClass::Configuration == self.class()
    }
}
