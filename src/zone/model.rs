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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A UNIX timestamp, in seconds.
pub type Timestamp = i64;

/// The "earliest displayed message" a user interface reports when it is not
/// displaying anything yet.
///
/// It is later than any timestamp the message name encoding can express, so
/// it also works as an ordinary "before" cursor.
pub const SENTINEL_EMPTY: Timestamp = 9_999_999_999;

/// One of the two sides of every conversation.
///
/// This is both the author of a message and the owner of a watermark.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    /// The merchant.
    Admin,
    /// The customer. Encoded as `P` ("public") in message names.
    Client,
}

impl Party {
    pub fn other(self) -> Self {
        match self {
            Party::Admin => Party::Client,
            Party::Client => Party::Admin,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Party::Admin => write!(f, "admin"),
            Party::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Party {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "admin" => Ok(Party::Admin),
            "client" => Ok(Party::Client),
            _ => Err(format!("Unknown party '{}'; use admin or client", s)),
        }
    }
}

/// What a message file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// A text message.
    Message,
    /// An attachment. Never created here, but the name encoding reserves it
    /// so that stores shared with attachment-capable front-ends still parse.
    File,
}

/// Identifies one conversation ("communications area").
///
/// `order_id` of `None` is the user's common area.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ConversationId {
    pub user_id: u64,
    pub order_id: Option<u64>,
}

impl ConversationId {
    pub fn common(user_id: u64) -> Self {
        ConversationId {
            user_id,
            order_id: None,
        }
    }

    pub fn order(user_id: u64, order_id: u64) -> Self {
        ConversationId {
            user_id,
            order_id: Some(order_id),
        }
    }

    pub fn is_common(&self) -> bool {
        self.order_id.is_none()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.order_id {
            None => write!(f, "user #{} common area", self.user_id),
            Some(order_id) => {
                write!(f, "user #{} order #{} area", self.user_id, order_id)
            }
        }
    }
}

/// A message as read back from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    /// The full file name, which also defines the message's position in the
    /// conversation.
    pub name: String,
    pub origin: Party,
    pub kind: Kind,
    pub timestamp: Timestamp,
    /// The message text. Empty for `Kind::File`.
    pub body: String,
}

/// Derived summary of who has not yet seen the newest message of a
/// conversation. At most one flag is ever set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NotificationRecord {
    pub user_id: u64,
    pub order_id: Option<u64>,
    pub admin_unseen: bool,
    pub client_unseen: bool,
}

impl NotificationRecord {
    pub fn conversation(&self) -> ConversationId {
        ConversationId {
            user_id: self.user_id,
            order_id: self.order_id,
        }
    }

    pub fn unseen_by(&self, party: Party) -> bool {
        match party {
            Party::Admin => self.admin_unseen,
            Party::Client => self.client_unseen,
        }
    }
}
