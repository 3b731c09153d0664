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

//! Mapping of conversations onto directories.
//!
//! The store is laid out as
//!
//! ```text
//! <root>/User ID <user>/Common/
//! <root>/User ID <user>/Order ID <order>/
//! ```
//!
//! Each conversation directory holds the message files (see `codec`), plus
//! the hidden files `.admin_lastaccess` and `.client_lastaccess` (see
//! `watermark`) and optionally `.wooclientzone_status`, a marker owned by the
//! storefront recording per-area client permissions. Nothing else in the
//! directory is significant.

use std::fs;
use std::path::{Path, PathBuf};

use super::model::{ConversationId, Party};
use crate::support::error::Error;
use crate::support::safe_name::is_safe_root;

pub const USER_DIR_PREFIX: &str = "User ID ";
pub const ORDER_DIR_PREFIX: &str = "Order ID ";
pub const COMMON_DIR: &str = "Common";

pub const ADMIN_WATERMARK_FILE: &str = ".admin_lastaccess";
pub const CLIENT_WATERMARK_FILE: &str = ".client_lastaccess";
pub const STATUS_MARKER_FILE: &str = ".wooclientzone_status";

/// The validated root of the store.
#[derive(Clone, Debug)]
pub struct ZoneRoot {
    root: PathBuf,
}

impl ZoneRoot {
    /// Validate the configured root.
    ///
    /// The root need not exist yet; it is created along with the first
    /// conversation.
    pub fn new(configured: Option<&Path>) -> Result<Self, Error> {
        let configured = configured.ok_or(Error::RootNotConfigured)?;
        let text = configured.to_str().ok_or(Error::UnsafeRoot)?.trim();
        if text.is_empty() {
            return Err(Error::RootNotConfigured);
        }
        if !is_safe_root(text) {
            return Err(Error::UnsafeRoot);
        }

        // Strip trailing separators, but never reduce "/" to nothing
        let trimmed = text.trim_end_matches('/');
        let root = if trimmed.is_empty() { "/" } else { trimmed };

        Ok(ZoneRoot { root: root.into() })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn user_dir(&self, user_id: u64) -> PathBuf {
        self.root.join(format!("{}{}", USER_DIR_PREFIX, user_id))
    }

    /// Return the location of `conversation`, regardless of whether it
    /// exists.
    pub fn locate(&self, conversation: ConversationId) -> ZonePath {
        let user_dir = self.user_dir(conversation.user_id);
        let path = match conversation.order_id {
            None => user_dir.join(COMMON_DIR),
            Some(order_id) => {
                user_dir.join(format!("{}{}", ORDER_DIR_PREFIX, order_id))
            }
        };

        ZonePath { conversation, path }
    }
}

/// A lightweight reference to one conversation's directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZonePath {
    conversation: ConversationId,
    path: PathBuf,
}

impl ZonePath {
    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Create the directory (and any missing parents) if it does not exist
    /// yet. Creating one that already exists succeeds.
    pub fn create_if_nx(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    pub fn watermark_path(&self, party: Party) -> PathBuf {
        self.path.join(match party {
            Party::Admin => ADMIN_WATERMARK_FILE,
            Party::Client => CLIENT_WATERMARK_FILE,
        })
    }

    pub fn status_marker_path(&self) -> PathBuf {
        self.path.join(STATUS_MARKER_FILE)
    }
}

/// Extract the user id from a top-level directory name.
///
/// The name must be exactly the prefix followed by a decimal id in its
/// canonical form, so things like `User ID 7.backup`, `Old User ID 7` or
/// `User ID 007` are not users. Only canonical names round-trip through
/// `ZoneRoot::user_dir`.
pub fn parse_user_dir(name: &str) -> Option<u64> {
    parse_prefixed_id(name, USER_DIR_PREFIX)
}

/// Extract the order id from a directory name within a user directory.
pub fn parse_order_dir(name: &str) -> Option<u64> {
    parse_prefixed_id(name, ORDER_DIR_PREFIX)
}

fn parse_prefixed_id(name: &str, prefix: &str) -> Option<u64> {
    if !name.starts_with(prefix) {
        return None;
    }

    let id = &name[prefix.len()..];
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    id.parse::<u64>()
        .ok()
        .filter(|parsed| id == parsed.to_string())
}
