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

//! A hint that a submit-then-reload sequence is in flight.
//!
//! Background refresh polls look at the gate and skip their cycle while it is
//! held, so they do not race the submitter's own confirmatory reload. This is
//! not a lock: nothing waits on it, and it says nothing about other
//! processes.

use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;

/// The gate itself. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct BusyGate {
    holders: Arc<AtomicUsize>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the gate busy until the returned lease is dropped.
    ///
    /// Leases may overlap; the gate is busy while any of them is alive.
    #[must_use]
    pub fn acquire(&self) -> BusyLease {
        self.holders.fetch_add(1, SeqCst);
        BusyLease {
            holders: Arc::clone(&self.holders),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.holders.load(SeqCst) > 0
    }
}

/// Keeps a `BusyGate` busy. Released on drop, including on early return and
/// unwinding.
#[derive(Debug)]
pub struct BusyLease {
    holders: Arc<AtomicUsize>,
}

impl Drop for BusyLease {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, SeqCst);
    }
}
