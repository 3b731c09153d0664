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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::zone::model::Party;

/// The system-wide configuration for Clientzone.
///
/// This is stored in a file named `clientzone.toml`, which is typically in
/// `/usr/local/etc/clientzone` or `/etc/clientzone`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Where the communications areas live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Which kinds of communications areas exist and what clients may do
    /// in them.
    #[serde(default)]
    pub zones: ZonesConfig,

    /// Options relating to how communications are presented.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Upload limits handed to the user interface.
    ///
    /// Clientzone itself only stores text messages; these are passed through
    /// unchanged.
    #[serde(default)]
    pub uploads: UploadsConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// The root folder of the store.
    ///
    /// A relative path is interpreted relative to the directory containing
    /// the configuration file. There is deliberately no default; an unset
    /// root is a configuration error.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderZones {
    /// No order-linked communications areas at all.
    Never,
    /// Only orders containing eligible products get an area. Eligibility is
    /// decided by the storefront.
    Products,
    /// Every order gets an area.
    Always,
}

impl Default for OrderZones {
    fn default() -> Self {
        OrderZones::Products
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Whether each user has a common area not linked to any order.
    pub use_userzones: bool,
    /// Whether, and for which orders, order-linked areas exist.
    pub use_orderzones: OrderZones,
    /// If true, a user's common area is moved into the area of an order as
    /// soon as that order is placed.
    pub automove_to_orderzone: bool,
    /// Whether clients may post messages in their common area.
    pub client_message_userzones: bool,
    /// Whether clients may post messages in order-linked areas.
    pub client_message_orderzones: bool,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        ZonesConfig {
            use_userzones: true,
            use_orderzones: OrderZones::default(),
            automove_to_orderzone: false,
            client_message_userzones: true,
            client_message_orderzones: true,
        }
    }
}

impl ZonesConfig {
    pub fn orderzones_enabled(&self) -> bool {
        OrderZones::Never != self.use_orderzones
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// The maximum number of messages returned by an initial load or a load
    /// of previous messages. 0 means no limit.
    pub items_loaded: usize,
    /// The chrono `strftime` pattern used to render message dates.
    pub date_format: String,
    /// How often user interfaces should poll for new messages, in
    /// milliseconds.
    pub refresh_rate_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            items_loaded: 20,
            date_format: "%-d %b %Y, %H:%M".to_owned(),
            refresh_rate_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub admin: UploadLimits,
    pub client: UploadLimits,
}

impl UploadsConfig {
    pub fn for_party(&self, party: Party) -> &UploadLimits {
        match party {
            Party::Admin => &self.admin,
            Party::Client => &self.client,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Comma-separated list of accepted file extensions or MIME types.
    pub accepted_files: String,
    pub max_filesize_mb: u32,
}

impl Default for UploadLimits {
    fn default() -> Self {
        UploadLimits {
            accepted_files: String::new(),
            max_filesize_mb: 2,
        }
    }
}

impl SystemConfig {
    /// Make a relative storage root absolute with respect to `base`, which
    /// should be the directory holding the configuration file.
    pub fn resolve_relative_root(&mut self, base: &Path) {
        if let Some(ref mut root) = self.storage.root {
            if root.is_relative() && !root.as_os_str().is_empty() {
                *root = base.join(&*root);
            }
        }
    }
}
