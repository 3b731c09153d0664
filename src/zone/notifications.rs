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

//! Derivation of "who has unread messages where" by walking the store.
//!
//! Nothing is precomputed. Each scan visits every conversation in scope and
//! finds its newest message. A party that has never opened a conversation
//! with messages in it has missed something; otherwise the message's time is
//! compared against the watermark of whoever did *not* write it. Any I/O
//! failure aborts the whole scan, since an incomplete summary would silently
//! under-report.

use std::fs;
use std::io;
use std::path::Path;

use super::message_store::{MessageRef, MessageStore};
use super::model::{ConversationId, NotificationRecord, Party, Timestamp};
use super::watermark::WatermarkTracker;
use super::zone_path::{parse_order_dir, parse_user_dir, ZoneRoot, COMMON_DIR};
use crate::support::error::Error;
use crate::support::system_config::ZonesConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    AllUsers,
    SingleUser(u64),
}

/// Which kinds of conversation directories are looked at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneFeatures {
    pub user_zones: bool,
    pub order_zones: bool,
}

impl ZoneFeatures {
    pub fn from_config(config: &ZonesConfig) -> Self {
        ZoneFeatures {
            user_zones: config.use_userzones,
            order_zones: config.orderzones_enabled(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// At least one conversation has something unseen. Records are ordered
    /// by user, then with the common area before order areas by order id.
    Unseen(Vec<NotificationRecord>),
    /// The scan completed and everything has been seen.
    NothingUnseen,
    /// The store has not been created yet.
    RootMissing,
}

/// Decide whether anyone has missed the newest message of `conversation`.
///
/// `admin_seen` and `client_seen` are the parties' watermarks, `None` if the
/// party never looked. A client who never looked is flagged first, then an
/// admin who never looked. Once both have looked, only the party that did
/// not write the message can have missed it, and they have if it arrived
/// after they last looked.
pub fn classify(
    conversation: ConversationId,
    latest: &MessageRef,
    admin_seen: Option<Timestamp>,
    client_seen: Option<Timestamp>,
) -> Option<NotificationRecord> {
    let reader = match (admin_seen, client_seen) {
        (_, None) => Party::Client,
        (None, Some(_)) => Party::Admin,
        (Some(admin_seen), Some(client_seen)) => {
            let reader = latest.origin.other();
            let seen = match reader {
                Party::Admin => admin_seen,
                Party::Client => client_seen,
            };
            if latest.timestamp <= seen {
                return None;
            }
            reader
        }
    };

    let mut record = NotificationRecord {
        user_id: conversation.user_id,
        order_id: conversation.order_id,
        admin_unseen: false,
        client_unseen: false,
    };
    match reader {
        Party::Admin => record.admin_unseen = true,
        Party::Client => record.client_unseen = true,
    }

    Some(record)
}

pub fn scan(
    root: &ZoneRoot,
    scope: Scope,
    features: ZoneFeatures,
) -> Result<ScanOutcome, Error> {
    if !root.exists() {
        return Ok(ScanOutcome::RootMissing);
    }

    let users = match scope {
        Scope::AllUsers => list_users(root.path())?,
        Scope::SingleUser(user_id) => {
            if root.user_dir(user_id).is_dir() {
                vec![user_id]
            } else {
                vec![]
            }
        }
    };

    let mut records = Vec::new();
    for user_id in users {
        for conversation in
            list_conversations(&root.user_dir(user_id), user_id, features)?
        {
            if let Some(record) = scan_conversation(root, conversation)? {
                records.push(record);
            }
        }
    }

    if records.is_empty() {
        return Ok(ScanOutcome::NothingUnseen);
    }

    records.sort_by_key(NotificationRecord::conversation);
    Ok(ScanOutcome::Unseen(records))
}

fn list_users(root: &Path) -> Result<Vec<u64>, Error> {
    let mut users = Vec::new();
    for entry in fs::read_dir(root).map_err(scan_error(root))? {
        let entry = entry.map_err(scan_error(root))?;
        if !entry.file_type().map_err(scan_error(root))?.is_dir() {
            continue;
        }

        if let Some(user_id) =
            entry.file_name().to_str().and_then(parse_user_dir)
        {
            users.push(user_id);
        }
    }

    Ok(users)
}

fn list_conversations(
    user_dir: &Path,
    user_id: u64,
    features: ZoneFeatures,
) -> Result<Vec<ConversationId>, Error> {
    let mut conversations = Vec::new();
    for entry in fs::read_dir(user_dir).map_err(scan_error(user_dir))? {
        let entry = entry.map_err(scan_error(user_dir))?;
        if !entry.file_type().map_err(scan_error(user_dir))?.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };

        if COMMON_DIR == name {
            if features.user_zones {
                conversations.push(ConversationId::common(user_id));
            }
        } else if let Some(order_id) = parse_order_dir(name) {
            if features.order_zones {
                conversations.push(ConversationId::order(user_id, order_id));
            }
        }
    }

    Ok(conversations)
}

fn scan_conversation(
    root: &ZoneRoot,
    conversation: ConversationId,
) -> Result<Option<NotificationRecord>, Error> {
    let zone = root.locate(conversation);
    let with_context = |e: Error| match e {
        Error::Io(source) => Error::Scan {
            path: zone.path().to_owned(),
            source,
        },
        e => e,
    };

    let latest = match MessageStore::new(zone.clone())
        .latest()
        .map_err(with_context)?
    {
        Some(latest) => latest,
        None => return Ok(None),
    };

    let watermarks = WatermarkTracker::new(&zone);
    let client_seen =
        watermarks.recorded(Party::Client).map_err(with_context)?;
    let admin_seen = watermarks.recorded(Party::Admin).map_err(with_context)?;
    Ok(classify(conversation, &latest, admin_seen, client_seen))
}

fn scan_error(path: &Path) -> impl Fn(io::Error) -> Error + '_ {
    move |source| Error::Scan {
        path: path.to_owned(),
        source,
    }
}
