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

//! Implements the message store of a single conversation.
//!
//! Messages are immutable files directly inside the conversation directory,
//! named as described in `codec`. There is no index: every listing reads the
//! directory afresh and orders the names as strings, which is the same as
//! ordering by upload time. A message written while a listing is in progress
//! may or may not be seen by it.
//!
//! # Delivery of new messages
//!
//! The body is first written to a hidden temporary file in the conversation
//! directory and then linked into place under its final name without
//! clobbering. Readers therefore never observe a half-written message. If the
//! name is already taken (same second, same origin, same random tiebreak), a
//! new tiebreak is drawn and the link retried.
//!
//! # Pagination
//!
//! User interfaces display a window of the most recent messages and poll for
//! anything newer. Three kinds of request exist:
//!
//! - Initial: the last `max_page_size` messages.
//! - Refresh: everything after the requester's watermark, never truncated.
//! - Previous: the last `max_page_size` messages before the earliest one
//!   currently displayed.

use std::fs;
use std::io;

use super::codec::{self, Tiebreak};
use super::model::{Kind, Message, Party, Timestamp, SENTINEL_EMPTY};
use super::zone_path::ZonePath;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};

const MESSAGE_MODE: u32 = 0o644;
const MAX_NAME_ATTEMPTS: u32 = 32;

/// Restricts which messages a listing returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Every message.
    Full,
    /// Only messages uploaded strictly after the given time.
    SinceWatermark(Timestamp),
    /// Only messages uploaded strictly before the given time.
    BeforeCursor(Timestamp),
}

impl Filter {
    fn admits(self, timestamp: Timestamp) -> bool {
        match self {
            Filter::Full => true,
            Filter::SinceWatermark(t) => timestamp > t,
            Filter::BeforeCursor(t) => timestamp < t,
        }
    }
}

/// What a user interface is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageRequest {
    /// First load of the conversation.
    Initial,
    /// Poll for anything the requester has not fetched yet.
    ///
    /// `since` is the requester's own watermark; `earliest_displayed` is the
    /// timestamp of the oldest message on screen, or `SENTINEL_EMPTY`.
    Refresh {
        since: Timestamp,
        earliest_displayed: Timestamp,
    },
    /// Fetch the page before the oldest message on screen.
    Previous { before: Timestamp },
}

/// The result of a paginated read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Page {
    /// At least one message matched, in chronological order.
    Messages {
        messages: Vec<Message>,
        more_available: bool,
    },
    /// Nothing matched, or the conversation does not exist yet.
    Empty { more_available: bool },
}

impl Page {
    pub fn more_available(&self) -> bool {
        match *self {
            Page::Messages { more_available, .. }
            | Page::Empty { more_available } => more_available,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(*self, Page::Empty { .. })
    }

    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Page::Messages { messages, .. } => messages,
            Page::Empty { .. } => Vec::new(),
        }
    }
}

/// The metadata of a message, without its content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub name: String,
    pub origin: Party,
    pub kind: Kind,
    pub timestamp: Timestamp,
}

/// The result of a filtered scan.
#[derive(Clone, Debug, Default)]
struct Scan {
    /// Matching messages, in name order.
    refs: Vec<MessageRef>,
    /// The earliest upload time among *all* valid messages, filtered or not.
    earliest: Option<Timestamp>,
}

/// The message store of one conversation.
#[derive(Clone, Debug)]
pub struct MessageStore {
    zone: ZonePath,
}

impl MessageStore {
    pub fn new(zone: ZonePath) -> Self {
        MessageStore { zone }
    }

    pub fn zone(&self) -> &ZonePath {
        &self.zone
    }

    /// Add a new text message from `origin`, uploaded at `now`.
    ///
    /// `body` is stored verbatim. It must contain something other than
    /// whitespace.
    pub fn append(
        &self,
        origin: Party,
        body: &str,
        now: Timestamp,
    ) -> Result<Message, Error> {
        if body.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        self.zone.create_if_nx()?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name =
                codec::encode(origin, Kind::Message, now, Tiebreak::random())?;
            match file_ops::spit(
                self.zone.path(),
                self.zone.path().join(&name),
                false,
                MESSAGE_MODE,
                body.as_bytes(),
            ) {
                Ok(()) => {
                    return Ok(Message {
                        name,
                        origin,
                        kind: Kind::Message,
                        timestamp: now,
                        body: body.to_owned(),
                    })
                }
                Err(e) if io::ErrorKind::AlreadyExists == e.kind() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::NameCollision)
    }

    /// List the messages admitted by `filter`, oldest first.
    ///
    /// A conversation that does not exist yet simply has no messages.
    pub fn list(&self, filter: Filter) -> Result<Vec<Message>, Error> {
        let scan = self.scan(filter)?;
        self.load(scan.refs)
    }

    /// Perform a paginated read.
    ///
    /// `max_page_size` of 0 disables truncation.
    pub fn page(
        &self,
        request: PageRequest,
        max_page_size: usize,
    ) -> Result<Page, Error> {
        let (filter, truncate) = match request {
            PageRequest::Initial => (Filter::Full, true),
            // Never having looked is the same as looking for the first time
            PageRequest::Refresh { since, .. } if since <= 0 => {
                (Filter::Full, true)
            }
            PageRequest::Refresh { since, .. } => {
                (Filter::SinceWatermark(since), false)
            }
            PageRequest::Previous { before } => {
                (Filter::BeforeCursor(before), true)
            }
        };

        let Scan { mut refs, earliest } = self.scan(filter)?;

        let more_available = if truncate {
            if max_page_size > 0 && refs.len() > max_page_size {
                refs.drain(..refs.len() - max_page_size);
                true
            } else {
                false
            }
        } else {
            match request {
                PageRequest::Refresh {
                    earliest_displayed, ..
                } => {
                    SENTINEL_EMPTY != earliest_displayed
                        && earliest.map_or(false, |e| e < earliest_displayed)
                }
                _ => false,
            }
        };

        let messages = self.load(refs)?;
        if messages.is_empty() {
            Ok(Page::Empty { more_available })
        } else {
            Ok(Page::Messages {
                messages,
                more_available,
            })
        }
    }

    /// Return the most recent valid message, if there is any.
    pub fn latest(&self) -> Result<Option<MessageRef>, Error> {
        Ok(self.scan(Filter::Full)?.refs.pop())
    }

    fn scan(&self, filter: Filter) -> Result<Scan, Error> {
        let entries = match fs::read_dir(self.zone.path())
            .map(Some)
            .ignore_not_found()?
        {
            Some(entries) => entries,
            None => return Ok(Scan::default()),
        };

        let mut scan = Scan::default();
        for entry in entries {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };

            if name.starts_with('.') {
                continue;
            }

            let decoded = match codec::decode(&name) {
                Some(decoded) => decoded,
                None => continue,
            };

            if entry.file_type()?.is_dir() {
                continue;
            }

            scan.earliest = Some(
                scan.earliest
                    .map_or(decoded.timestamp, |e| e.min(decoded.timestamp)),
            );

            if !filter.admits(decoded.timestamp) {
                continue;
            }

            scan.refs.push(MessageRef {
                origin: decoded.origin,
                kind: decoded.kind,
                timestamp: decoded.timestamp,
                name,
            });
        }

        scan.refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scan)
    }

    fn load(&self, refs: Vec<MessageRef>) -> Result<Vec<Message>, Error> {
        let mut messages = Vec::with_capacity(refs.len());
        for r in refs {
            let body = if Kind::Message == r.kind {
                match fs::read(self.zone.path().join(&r.name))
                    .map(Some)
                    .ignore_not_found()?
                {
                    Some(data) => String::from_utf8_lossy(&data).into_owned(),
                    // Moved away since the directory was read
                    None => continue,
                }
            } else {
                String::new()
            };

            messages.push(Message {
                name: r.name,
                origin: r.origin,
                kind: r.kind,
                timestamp: r.timestamp,
                body,
            });
        }

        Ok(messages)
    }
}
