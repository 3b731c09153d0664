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

use crate::zone::model::{ConversationId, Party};

/// Tracks text that should be included in at the start of every log statement
/// made on behalf of one request.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    actor: String,
    user: Option<u64>,
    order: Option<u64>,
}

impl LogPrefix {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: sanitise(actor.into()),
            user: None,
            order: None,
        }
    }

    pub fn for_party(party: Party) -> Self {
        Self::new(party.to_string())
    }

    pub fn set_user(&mut self, user: u64) {
        self.user = Some(user);
    }

    pub fn set_conversation(&mut self, conversation: ConversationId) {
        self.user = Some(conversation.user_id);
        self.order = conversation.order_id;
    }

    /// Return a copy of this prefix narrowed to `conversation`.
    pub fn with_conversation(&self, conversation: ConversationId) -> Self {
        let mut narrowed = self.clone();
        narrowed.set_conversation(conversation);
        narrowed
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.actor)?;
        match (self.user, self.order) {
            (None, None) => Ok(()),
            (Some(user), None) => write!(f, "[user={}]", user),
            (None, Some(order)) => write!(f, "[order={}]", order),
            (Some(user), Some(order)) => {
                write!(f, "[user={} order={}]", user, order)
            }
        }
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
