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

//! Bulk relocation of one conversation's files into another conversation of
//! the same user.
//!
//! Every file is copied and only then unlinked from the source, so a file
//! whose copy fails stays where it was. The move is best-effort rather than
//! transactional: whatever could be moved is moved, and the rest is reported
//! as a count.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use super::model::ConversationId;
use super::zone_path::{ZoneRoot, STATUS_MARKER_FILE};
use crate::support::error::Error;
use crate::support::file_ops::ErrorTransforms;

/// The primitive file operations the mover is built on.
pub trait Transfer: Send + Sync {
    /// Copy the regular file `from` to `to`, replacing anything there.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Remove the regular file at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// `Transfer` on the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsTransfer;

impl Transfer for FsTransfer {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub moved: usize,
    pub failed: usize,
}

/// Move everything in `source` into `destination`.
///
/// The status marker is moved like any other file if `carry_status_marker`
/// is set, and otherwise simply deleted (it is not counted either way).
/// Hidden watermark files are ordinary files for this purpose, so the
/// destination inherits them, replacing its own.
///
/// A source that does not exist or has nothing in it fails with
/// `NothingToMove`; if anything could not be moved, the result is
/// `PartialMove`, even though everything else *was* moved. After a complete
/// move, the source directory is removed.
pub fn move_conversation(
    root: &ZoneRoot,
    source: ConversationId,
    destination: ConversationId,
    carry_status_marker: bool,
    transfer: &dyn Transfer,
) -> Result<MoveReport, Error> {
    if source == destination {
        return Err(Error::SameConversation);
    }

    let src = root.locate(source);
    if !src.exists() {
        return Err(Error::NothingToMove);
    }

    let dst = root.locate(destination);
    dst.create_if_nx()?;

    let mut report = MoveReport::default();
    for entry in fs::read_dir(src.path()).on_not_found(Error::NothingToMove)? {
        let entry = entry?;
        let name = entry.file_name();
        let from = entry.path();

        if !carry_status_marker && STATUS_MARKER_FILE == name {
            // The destination keeps its own permissions, if any
            let _ = transfer.remove(&from);
            continue;
        }

        let to = dst.path().join(&name);
        let existed = to.exists();
        if transfer.copy(&from, &to).is_err() {
            // Don't leave a truncated copy behind, but never remove
            // something the destination already had.
            if !existed {
                let _ = transfer.remove(&to);
            }
            report.failed += 1;
            continue;
        }

        match transfer.remove(&from) {
            Ok(()) => report.moved += 1,
            // Already gone; the copy is all that's left
            Err(e) if io::ErrorKind::NotFound == e.kind() => report.moved += 1,
            Err(_) => report.failed += 1,
        }
    }

    if 0 == report.moved + report.failed {
        return Err(Error::NothingToMove);
    }

    if report.failed > 0 {
        return Err(Error::PartialMove {
            moved: report.moved,
            remaining: report.failed,
        });
    }

    // Only succeeds if the source really is empty now, which is exactly when
    // it should go away.
    let _ = fs::remove_dir(src.path());

    Ok(report)
}

#[cfg(test)]
mod test {
    use std::ffi::OsStr;

    use tempfile::TempDir;

    use super::*;
    use crate::zone::message_store::{Filter, MessageStore};
    use crate::zone::model::Party;

    struct Setup {
        _dir: TempDir,
        root: ZoneRoot,
    }

    fn set_up() -> Setup {
        let dir = TempDir::new().unwrap();
        let root = ZoneRoot::new(Some(dir.path())).unwrap();
        Setup { _dir: dir, root }
    }

    impl Setup {
        fn store(&self, conversation: ConversationId) -> MessageStore {
            MessageStore::new(self.root.locate(conversation))
        }

        fn write(&self, conversation: ConversationId, bodies: &[&str]) {
            let store = self.store(conversation);
            for (ix, body) in bodies.iter().enumerate() {
                store.append(Party::Client, body, 1000 + ix as i64).unwrap();
            }
        }

        fn bodies(&self, conversation: ConversationId) -> Vec<String> {
            self.store(conversation)
                .list(Filter::Full)
                .unwrap()
                .into_iter()
                .map(|m| m.body)
                .collect()
        }
    }

    /// Fails to copy any file whose body is `poison`.
    struct PoisonedTransfer {
        poison: &'static str,
    }

    impl Transfer for PoisonedTransfer {
        fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.poison.as_bytes() == &fs::read(from)?[..] {
                // Leave a partial copy like a real failure might
                fs::write(to, &self.poison.as_bytes()[..1])?;
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            FsTransfer.copy(from, to)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            FsTransfer.remove(path)
        }
    }

    const COMMON: ConversationId = ConversationId {
        user_id: 7,
        order_id: None,
    };
    const ORDER: ConversationId = ConversationId {
        user_id: 7,
        order_id: Some(12),
    };

    #[test]
    fn move_everything() {
        let setup = set_up();
        setup.write(COMMON, &["one", "two", "three"]);
        fs::write(setup.root.locate(COMMON).status_marker_path(), "perm")
            .unwrap();

        let report =
            move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
                .unwrap();
        assert_eq!(
            MoveReport {
                moved: 3,
                failed: 0
            },
            report
        );
        assert_eq!(vec!["one", "two", "three"], setup.bodies(ORDER));
        assert!(!setup.root.locate(COMMON).exists());
        assert!(!setup.root.locate(ORDER).status_marker_path().exists());
    }

    #[test]
    fn carry_status_marker_and_watermarks() {
        let setup = set_up();
        setup.write(COMMON, &["one"]);
        let common = setup.root.locate(COMMON);
        fs::write(common.status_marker_path(), "perm").unwrap();
        fs::write(common.watermark_path(Party::Admin), "1500").unwrap();

        let report =
            move_conversation(&setup.root, COMMON, ORDER, true, &FsTransfer)
                .unwrap();
        assert_eq!(3, report.moved);

        let order = setup.root.locate(ORDER);
        assert_eq!(
            "perm",
            fs::read_to_string(order.status_marker_path()).unwrap()
        );
        assert_eq!(
            "1500",
            fs::read_to_string(order.watermark_path(Party::Admin)).unwrap()
        );
    }

    #[test]
    fn merge_into_existing_conversation() {
        let setup = set_up();
        setup.write(ORDER, &["already here"]);
        setup.store(COMMON).append(Party::Admin, "moved", 5000).unwrap();

        move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
            .unwrap();
        assert_eq!(vec!["already here", "moved"], setup.bodies(ORDER));
    }

    #[test]
    fn nothing_to_move() {
        let setup = set_up();
        assert_matches!(
            Err(Error::NothingToMove),
            move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
        );

        let common = setup.root.locate(COMMON);
        common.create_if_nx().unwrap();
        assert_matches!(
            Err(Error::NothingToMove),
            move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
        );

        // A lone status marker is discarded, not moved
        fs::write(common.status_marker_path(), "perm").unwrap();
        assert_matches!(
            Err(Error::NothingToMove),
            move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
        );
        assert!(!common.status_marker_path().exists());
    }

    #[test]
    fn refuse_moving_onto_self() {
        let setup = set_up();
        setup.write(ORDER, &["stay"]);
        assert_matches!(
            Err(Error::SameConversation),
            move_conversation(&setup.root, ORDER, ORDER, false, &FsTransfer)
        );
        assert_eq!(vec!["stay"], setup.bodies(ORDER));
    }

    #[test]
    fn partial_failure_leaves_stragglers_in_place() {
        let setup = set_up();
        setup.write(COMMON, &["one", "bad", "three"]);

        assert_matches!(
            Err(Error::PartialMove {
                moved: 2,
                remaining: 1
            }),
            move_conversation(
                &setup.root,
                COMMON,
                ORDER,
                false,
                &PoisonedTransfer { poison: "bad" }
            )
        );

        assert_eq!(vec!["bad"], setup.bodies(COMMON));
        assert_eq!(vec!["one", "three"], setup.bodies(ORDER));
        assert!(setup.root.locate(COMMON).exists());
    }

    #[test]
    fn subdirectories_count_as_failures() {
        let setup = set_up();
        setup.write(COMMON, &["one"]);
        let nested = setup.root.locate(COMMON).path().join("stray");
        fs::create_dir(&nested).unwrap();

        assert_matches!(
            Err(Error::PartialMove {
                moved: 1,
                remaining: 1
            }),
            move_conversation(&setup.root, COMMON, ORDER, false, &FsTransfer)
        );
        assert!(nested.is_dir());
        assert!(!setup
            .root
            .locate(ORDER)
            .path()
            .join(OsStr::new("stray"))
            .exists());
    }
}
