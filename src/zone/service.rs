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

//! The operations offered to user interfaces and automation hooks.
//!
//! Everything below this layer returns plain `Result`s. Here, each operation
//! checks who is asking, runs, and turns the outcome into a `Reply`, logging
//! failures at the level their severity calls for. Nothing here panics or
//! exits on a bad request or a broken store; the caller gets a `Reply` no
//! matter what.

use std::fmt::Write as _;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use super::busy_gate::BusyGate;
use super::clock::{Clock, SystemClock};
use super::message_store::{MessageStore, PageRequest};
use super::model::{
    ConversationId, Message, NotificationRecord, Party, Timestamp,
    SENTINEL_EMPTY,
};
use super::mover::{self, FsTransfer, MoveReport, Transfer};
use super::notifications::{self, ScanOutcome, Scope, ZoneFeatures};
use super::watermark::WatermarkTracker;
use super::zone_path::ZoneRoot;
use crate::support::chronox;
use crate::support::error::{Error, FailureClass, Severity};
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::{OrderZones, SystemConfig};

const EMPTY_CONVERSATION: &str = "This communications area is currently empty";
const NOTHING_UNSEEN: &str = "No unseen communications to report";

/// The outcome of one operation, as reported to whoever asked.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply<T> {
    /// The operation succeeded and produced `data`.
    Done { data: T },
    /// The operation succeeded but there was nothing there. `data` is still
    /// meaningful (e.g. the other party's watermark).
    Empty {
        severity: Severity,
        reason: String,
        data: T,
    },
    Failed {
        severity: Severity,
        class: FailureClass,
        reason: String,
        /// For partial moves, how many files were left behind.
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining: Option<usize>,
    },
    /// The request was skipped; the caller should just try again on its next
    /// cycle.
    Silent,
}

impl<T> Reply<T> {
    fn empty(severity: Severity, reason: &str, data: T) -> Self {
        Reply::Empty {
            severity,
            reason: reason.to_owned(),
            data,
        }
    }

    fn failed(log_prefix: &LogPrefix, what: &str, e: Error) -> Self {
        let severity = e.severity();
        match severity {
            Severity::Silent => (),
            Severity::Info => info!("{} {}: {}", log_prefix, what, e),
            Severity::Warning => warn!("{} {}: {}", log_prefix, what, e),
            Severity::Error => error!("{} {}: {}", log_prefix, what, e),
        }

        let remaining = match e {
            Error::PartialMove { remaining, .. } => Some(remaining),
            _ => None,
        };

        Reply::Failed {
            severity,
            class: e.class(),
            reason: e.to_string(),
            remaining,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(*self, Reply::Done { .. })
    }

    /// Return the data of a successful reply, empty or not.
    pub fn data(&self) -> Option<&T> {
        match *self {
            Reply::Done { ref data } | Reply::Empty { ref data, .. } => {
                Some(data)
            }
            Reply::Failed { .. } | Reply::Silent => None,
        }
    }
}

/// Who is asking, as established by the (external) identity layer.
#[derive(Clone, Debug)]
pub struct Caller {
    pub party: Party,
    /// The user the caller is signed in as. Clients may only touch their own
    /// conversations; for admins this is informational.
    pub user_id: Option<u64>,
    /// Whether the transport-level security check passed.
    pub authorized: bool,
}

impl Caller {
    pub fn admin(authorized: bool) -> Self {
        Caller {
            party: Party::Admin,
            user_id: None,
            authorized,
        }
    }

    pub fn client(user_id: Option<u64>, authorized: bool) -> Self {
        Caller {
            party: Party::Client,
            user_id,
            authorized,
        }
    }

    fn log_prefix(&self) -> LogPrefix {
        let mut prefix = LogPrefix::for_party(self.party);
        if let Some(user_id) = self.user_id {
            prefix.set_user(user_id);
        }
        prefix
    }

    fn admit(&self, conversation: ConversationId) -> Result<(), Error> {
        if !self.authorized {
            return Err(Error::SecurityCheckFailed);
        }

        if 0 == conversation.user_id {
            return Err(Error::NoUser);
        }

        if Party::Client == self.party {
            match self.user_id {
                None | Some(0) => return Err(Error::NoUser),
                Some(user_id) if user_id != conversation.user_id => {
                    return Err(Error::NotPermitted)
                }
                Some(_) => (),
            }
        }

        Ok(())
    }

    fn admit_admin(&self) -> Result<(), Error> {
        if !self.authorized {
            return Err(Error::SecurityCheckFailed);
        }

        if Party::Admin != self.party {
            return Err(Error::NotPermitted);
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadMode {
    /// First load when a conversation is opened.
    Initial,
    /// Periodic poll for anything new.
    Refresh,
    /// The page before what is already displayed.
    Previous,
}

/// A message together with its rendered upload date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub upload_date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Communications {
    pub messages: Vec<MessageView>,
    /// Whether there are older messages than those loaded so far.
    pub more_available: bool,
    /// When the other party last looked, used by interfaces to mark messages
    /// as seen.
    pub other_watermark: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ClientPermissions {
    pub message_enabled: bool,
    /// Attachments are not supported, so this is always false.
    pub upload_enabled: bool,
}

/// What a polling user interface needs to know up front.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UiOptions {
    pub refresh_rate_ms: u64,
    pub items_loaded: usize,
    pub accepted_files: String,
    pub max_filesize_mb: u32,
    pub user_zones: bool,
    pub order_zones: bool,
}

pub struct ClientZone {
    config: SystemConfig,
    clock: Arc<dyn Clock>,
    transfer: Arc<dyn Transfer>,
    gate: BusyGate,
}

impl ClientZone {
    pub fn new(config: SystemConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(FsTransfer))
    }

    pub fn with_parts(
        config: SystemConfig,
        clock: Arc<dyn Clock>,
        transfer: Arc<dyn Transfer>,
    ) -> Self {
        ClientZone {
            config,
            clock,
            transfer,
            gate: BusyGate::new(),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn busy_gate(&self) -> &BusyGate {
        &self.gate
    }

    fn root(&self) -> Result<ZoneRoot, Error> {
        ZoneRoot::new(self.config.storage.root.as_deref())
    }

    /// Post a new message from `caller` and return everything the caller has
    /// not seen yet, including the new message.
    ///
    /// Background refreshes are held off until the returned data has been
    /// read.
    pub fn submit_message(
        &self,
        caller: &Caller,
        conversation: ConversationId,
        body: &str,
    ) -> Reply<Communications> {
        let log_prefix = caller.log_prefix().with_conversation(conversation);
        match self.try_submit_message(&log_prefix, caller, conversation, body)
        {
            Ok(reply) => reply,
            Err(e) => Reply::failed(&log_prefix, "Submitting message", e),
        }
    }

    fn try_submit_message(
        &self,
        log_prefix: &LogPrefix,
        caller: &Caller,
        conversation: ConversationId,
        body: &str,
    ) -> Result<Reply<Communications>, Error> {
        caller.admit(conversation)?;
        if Party::Client == caller.party
            && !self.client_permissions(conversation).message_enabled
        {
            return Err(Error::MessagingDisabled);
        }

        let root = self.root()?;
        let _lease = self.gate.acquire();

        let store = MessageStore::new(root.locate(conversation));
        let message = store.append(caller.party, body, self.clock.now())?;
        info!("{} Submitted message {}", log_prefix, message.name);

        let since = WatermarkTracker::new(store.zone()).get(caller.party)?;
        self.load(
            caller.party,
            &store,
            PageRequest::Refresh {
                since,
                earliest_displayed: SENTINEL_EMPTY,
            },
        )
    }

    /// Load messages for display to `caller`, and record that `caller` has
    /// now looked at the conversation.
    ///
    /// `cursor` is the timestamp of the earliest message currently displayed,
    /// or `SENTINEL_EMPTY` if none is; it is ignored for `Initial`.
    pub fn load_communications(
        &self,
        caller: &Caller,
        conversation: ConversationId,
        mode: LoadMode,
        cursor: Timestamp,
    ) -> Reply<Communications> {
        let log_prefix = caller.log_prefix().with_conversation(conversation);
        match self.try_load_communications(caller, conversation, mode, cursor)
        {
            Ok(reply) => reply,
            Err(e) => Reply::failed(&log_prefix, "Loading communications", e),
        }
    }

    fn try_load_communications(
        &self,
        caller: &Caller,
        conversation: ConversationId,
        mode: LoadMode,
        cursor: Timestamp,
    ) -> Result<Reply<Communications>, Error> {
        caller.admit(conversation)?;

        if LoadMode::Refresh == mode && self.gate.is_busy() {
            return Ok(Reply::Silent);
        }

        let root = self.root()?;
        let store = MessageStore::new(root.locate(conversation));
        let request = match mode {
            LoadMode::Initial => PageRequest::Initial,
            LoadMode::Refresh => PageRequest::Refresh {
                since: WatermarkTracker::new(store.zone()).get(caller.party)?,
                earliest_displayed: cursor,
            },
            LoadMode::Previous => PageRequest::Previous { before: cursor },
        };

        self.load(caller.party, &store, request)
    }

    fn load(
        &self,
        party: Party,
        store: &MessageStore,
        request: PageRequest,
    ) -> Result<Reply<Communications>, Error> {
        let watermarks = WatermarkTracker::new(store.zone());
        let other_watermark = watermarks.get(party.other())?;
        let page = store.page(request, self.config.display.items_loaded)?;
        // Seen as of when the listing completed
        watermarks.set(party, self.clock.now())?;

        let more_available = page.more_available();
        let messages = page
            .into_messages()
            .into_iter()
            .map(|message| MessageView {
                upload_date: self.format_date(message.timestamp),
                message,
            })
            .collect::<Vec<_>>();

        debug!(
            "{} Loaded {} messages from {}",
            party,
            messages.len(),
            store.zone().conversation()
        );

        let communications = Communications {
            messages,
            more_available,
            other_watermark,
        };

        if communications.messages.is_empty() {
            // Only worth showing to someone who just opened the conversation
            let severity = match request {
                PageRequest::Initial => Severity::Info,
                _ => Severity::Silent,
            };
            Ok(Reply::empty(severity, EMPTY_CONVERSATION, communications))
        } else {
            Ok(Reply::Done {
                data: communications,
            })
        }
    }

    fn format_date(&self, timestamp: Timestamp) -> String {
        let datetime = match chronox::utc_from_unix(timestamp) {
            Some(dt) => dt,
            None => return String::new(),
        };

        let pattern = &self.config.display.date_format;
        let mut formatted = String::new();
        if write!(formatted, "{}", datetime.format(pattern)).is_err() {
            // Bad pattern in the configuration
            formatted = datetime.to_rfc3339();
        }
        formatted
    }

    /// Move one of a user's conversations into another of that user's
    /// conversations. Admin only.
    pub fn move_conversation(
        &self,
        caller: &Caller,
        user_id: u64,
        from_order: Option<u64>,
        to_order: Option<u64>,
        carry_status_marker: bool,
    ) -> Reply<MoveReport> {
        let source = ConversationId {
            user_id,
            order_id: from_order,
        };
        let destination = ConversationId {
            user_id,
            order_id: to_order,
        };
        let log_prefix = caller.log_prefix().with_conversation(source);

        let result = caller
            .admit_admin()
            .and_then(|()| caller.admit(source))
            .and_then(|()| self.root())
            .and_then(|root| {
                mover::move_conversation(
                    &root,
                    source,
                    destination,
                    carry_status_marker,
                    &*self.transfer,
                )
            });

        match result {
            Ok(report) => {
                info!(
                    "{} Moved {} files to {}",
                    log_prefix, report.moved, destination
                );
                Reply::Done { data: report }
            }
            Err(e) => Reply::failed(&log_prefix, "Moving communications", e),
        }
    }

    /// Relocate a user's common conversation into the conversation of an
    /// order they just placed, if so configured.
    ///
    /// `order_is_eligible` is the storefront's verdict on whether the order
    /// should have a conversation at all; it is moot if every order does.
    pub fn automove_to_orderzone(
        &self,
        user_id: u64,
        order_id: u64,
        order_is_eligible: bool,
    ) -> Reply<MoveReport> {
        let destination = ConversationId::order(user_id, order_id);
        let mut log_prefix = LogPrefix::new("automove");
        log_prefix.set_conversation(destination);

        let zones = &self.config.zones;
        let eligible = order_is_eligible
            || OrderZones::Always == zones.use_orderzones;
        if !zones.automove_to_orderzone
            || !zones.orderzones_enabled()
            || !eligible
        {
            return Reply::empty(
                Severity::Info,
                "Automatic move not applicable to this order",
                MoveReport::default(),
            );
        }

        if 0 == user_id {
            return Reply::failed(&log_prefix, "Automatic move", Error::NoUser);
        }

        let root = match self.root() {
            Ok(root) => root,
            Err(e) => return Reply::failed(&log_prefix, "Automatic move", e),
        };

        let source = ConversationId::common(user_id);
        if !root.locate(source).exists() {
            return Reply::empty(
                Severity::Info,
                "No common communications area to move",
                MoveReport::default(),
            );
        }

        match mover::move_conversation(
            &root,
            source,
            destination,
            true,
            &*self.transfer,
        ) {
            Ok(report) => {
                info!(
                    "{} Moved {} files from the common area",
                    log_prefix, report.moved
                );
                Reply::Done { data: report }
            }
            Err(e) => Reply::failed(&log_prefix, "Automatic move", e),
        }
    }

    /// Report conversations with unseen messages.
    ///
    /// Admins may scan everything or one user and see both kinds of flag.
    /// Clients always get their own conversations only, and only where they
    /// themselves have something unseen.
    pub fn get_notifications(
        &self,
        caller: &Caller,
        scope: Scope,
    ) -> Reply<Vec<NotificationRecord>> {
        let log_prefix = caller.log_prefix();
        match self.try_get_notifications(caller, scope) {
            Ok(reply) => reply,
            Err(e) => Reply::failed(&log_prefix, "Scanning notifications", e),
        }
    }

    fn try_get_notifications(
        &self,
        caller: &Caller,
        scope: Scope,
    ) -> Result<Reply<Vec<NotificationRecord>>, Error> {
        if !caller.authorized {
            return Err(Error::SecurityCheckFailed);
        }

        let scope = match caller.party {
            Party::Admin => scope,
            Party::Client => match caller.user_id {
                None | Some(0) => return Err(Error::NoUser),
                Some(user_id) => Scope::SingleUser(user_id),
            },
        };

        let root = self.root()?;
        let features = ZoneFeatures::from_config(&self.config.zones);
        let records = match notifications::scan(&root, scope, features)? {
            ScanOutcome::Unseen(records) => records,
            ScanOutcome::NothingUnseen | ScanOutcome::RootMissing => vec![],
        };

        let records = match caller.party {
            Party::Admin => records,
            Party::Client => records
                .into_iter()
                .filter(|r| r.unseen_by(Party::Client))
                .collect(),
        };

        if records.is_empty() {
            Ok(Reply::empty(Severity::Info, NOTHING_UNSEEN, records))
        } else {
            Ok(Reply::Done { data: records })
        }
    }

    /// What the client may do in `conversation`.
    pub fn client_permissions(
        &self,
        conversation: ConversationId,
    ) -> ClientPermissions {
        let zones = &self.config.zones;
        ClientPermissions {
            message_enabled: if conversation.is_common() {
                zones.client_message_userzones
            } else {
                zones.client_message_orderzones
            },
            upload_enabled: false,
        }
    }

    pub fn exists(&self, conversation: ConversationId) -> Result<bool, Error> {
        Ok(self.root()?.locate(conversation).exists())
    }

    pub fn ui_options(&self, party: Party) -> UiOptions {
        let limits = self.config.uploads.for_party(party);
        UiOptions {
            refresh_rate_ms: self.config.display.refresh_rate_ms,
            items_loaded: self.config.display.items_loaded,
            accepted_files: limits.accepted_files.clone(),
            max_filesize_mb: limits.max_filesize_mb,
            user_zones: self.config.zones.use_userzones,
            order_zones: self.config.zones.orderzones_enabled(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

    use tempfile::TempDir;

    use super::*;
    use crate::zone::clock::FixedClock;
    use crate::zone::codec::{self, Tiebreak};
    use crate::zone::message_store::Filter;
    use crate::zone::model::Kind;

    struct Setup {
        _dir: TempDir,
        root: ZoneRoot,
        clock: FixedClock,
        zone: ClientZone,
    }

    fn set_up_with(adjust: impl FnOnce(&mut SystemConfig)) -> Setup {
        crate::init_test_log();

        let dir = TempDir::new().unwrap();
        let mut config = SystemConfig::default();
        config.storage.root = Some(dir.path().join("repo"));
        adjust(&mut config);

        let root =
            ZoneRoot::new(Some(dir.path().join("repo").as_path())).unwrap();
        let clock = FixedClock::at(1000);
        let zone = ClientZone::with_parts(
            config,
            Arc::new(clock.clone()),
            Arc::new(FsTransfer),
        );
        Setup {
            _dir: dir,
            root,
            clock,
            zone,
        }
    }

    fn set_up() -> Setup {
        set_up_with(|_| ())
    }

    const COMMON_7: ConversationId = ConversationId {
        user_id: 7,
        order_id: None,
    };
    const ORDER_7_12: ConversationId = ConversationId {
        user_id: 7,
        order_id: Some(12),
    };

    fn client_7() -> Caller {
        Caller::client(Some(7), true)
    }

    fn admin() -> Caller {
        Caller::admin(true)
    }

    fn bodies(reply: &Reply<Communications>) -> Vec<&str> {
        reply
            .data()
            .unwrap()
            .messages
            .iter()
            .map(|m| &m.message.body as &str)
            .collect()
    }

    impl Setup {
        fn watermark(
            &self,
            conversation: ConversationId,
            party: Party,
        ) -> Timestamp {
            WatermarkTracker::new(&self.root.locate(conversation))
                .get(party)
                .unwrap()
        }
    }

    #[test]
    fn hello_scenario() {
        let setup = set_up();

        let reply = setup.zone.submit_message(&client_7(), COMMON_7, "Hello");
        assert!(reply.is_done(), "Unexpected reply: {:?}", reply);
        assert_eq!(vec!["Hello"], bodies(&reply));

        let store = MessageStore::new(setup.root.locate(COMMON_7));
        let listed = store.list(Filter::Full).unwrap();
        assert_eq!(1, listed.len());
        assert_eq!(Party::Client, listed[0].origin);
        assert_eq!("Hello", listed[0].body);
        assert_eq!(1000, listed[0].timestamp);

        assert_eq!(
            Reply::Done {
                data: vec![NotificationRecord {
                    user_id: 7,
                    order_id: None,
                    admin_unseen: true,
                    client_unseen: false,
                }]
            },
            setup.zone.get_notifications(&admin(), Scope::AllUsers)
        );

        setup.clock.advance(5);
        let reply = setup.zone.load_communications(
            &admin(),
            COMMON_7,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        );
        assert_eq!(vec!["Hello"], bodies(&reply));
        assert_eq!(1000, reply.data().unwrap().other_watermark);
        assert_eq!(1005, setup.watermark(COMMON_7, Party::Admin));

        assert_matches!(
            Reply::Empty { .. },
            setup.zone.get_notifications(&admin(), Scope::AllUsers)
        );
    }

    #[test]
    fn submit_returns_unseen_messages_and_releases_gate() {
        let setup = set_up();
        setup
            .zone
            .submit_message(&admin(), COMMON_7, "Welcome")
            .data()
            .unwrap();

        setup.clock.advance(10);
        let reply = setup.zone.submit_message(&client_7(), COMMON_7, "Thanks");
        assert_eq!(vec!["Welcome", "Thanks"], bodies(&reply));
        assert!(!setup.zone.busy_gate().is_busy());

        setup.clock.advance(10);
        let reply = setup.zone.submit_message(&client_7(), COMMON_7, "Bye");
        assert_eq!(vec!["Bye"], bodies(&reply));
        assert_eq!(1000, reply.data().unwrap().other_watermark);
    }

    #[test]
    fn refresh_is_silent_while_busy() {
        let setup = set_up();
        setup.zone.submit_message(&client_7(), COMMON_7, "Hello");

        let lease = setup.zone.busy_gate().acquire();
        assert_eq!(
            Reply::Silent,
            setup.zone.load_communications(
                &admin(),
                COMMON_7,
                LoadMode::Refresh,
                SENTINEL_EMPTY
            )
        );
        // Only polls are skipped
        assert!(setup
            .zone
            .load_communications(
                &admin(),
                COMMON_7,
                LoadMode::Initial,
                SENTINEL_EMPTY
            )
            .is_done());
        drop(lease);

        setup.clock.advance(1);
        setup.zone.submit_message(&client_7(), COMMON_7, "Again");
        let reply = setup.zone.load_communications(
            &admin(),
            COMMON_7,
            LoadMode::Refresh,
            1000,
        );
        assert_eq!(vec!["Again"], bodies(&reply));
    }

    #[test]
    fn load_empty_conversation_still_sets_watermark() {
        let setup = set_up();
        setup.clock.set(4242);

        let reply = setup.zone.load_communications(
            &client_7(),
            ORDER_7_12,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        );
        assert_matches!(
            Reply::Empty {
                severity: Severity::Info,
                ..
            },
            reply
        );
        assert_eq!(4242, setup.watermark(ORDER_7_12, Party::Client));
        assert_eq!(0, setup.watermark(ORDER_7_12, Party::Admin));

        assert_matches!(
            Reply::Empty {
                severity: Severity::Silent,
                ..
            },
            setup.zone.load_communications(
                &client_7(),
                ORDER_7_12,
                LoadMode::Refresh,
                SENTINEL_EMPTY,
            )
        );
    }

    /// A clock that, the first time it is read, drops a message into a
    /// conversation as if another request had just written it.
    struct InterleavingClock {
        now: Timestamp,
        zone: PathBuf,
        pending: AtomicBool,
    }

    impl Clock for InterleavingClock {
        fn now(&self) -> Timestamp {
            if self.pending.swap(false, SeqCst) {
                let name = codec::encode(
                    Party::Admin,
                    Kind::Message,
                    self.now,
                    Tiebreak::new(777).unwrap(),
                )
                .unwrap();
                fs::write(self.zone.join(name), "late").unwrap();
            }
            self.now
        }
    }

    #[test]
    fn watermark_is_taken_when_listing_completes() {
        let setup = set_up();
        let zone = setup.root.locate(COMMON_7);
        MessageStore::new(zone.clone())
            .append(Party::Admin, "early", 900)
            .unwrap();

        let client_zone = ClientZone::with_parts(
            setup.zone.config().clone(),
            Arc::new(InterleavingClock {
                now: 2000,
                zone: zone.path().to_owned(),
                pending: AtomicBool::new(true),
            }),
            Arc::new(FsTransfer),
        );

        let reply = client_zone.load_communications(
            &client_7(),
            COMMON_7,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        );
        // The message written while the time was being taken was not part
        // of the listing.
        assert_eq!(vec!["early"], bodies(&reply));
        assert_eq!(2000, setup.watermark(COMMON_7, Party::Client));
        assert_eq!(
            2,
            MessageStore::new(zone).list(Filter::Full).unwrap().len()
        );
    }

    #[test]
    fn paginated_loading() {
        let setup = set_up();
        for i in 0..25 {
            setup.clock.set(1000 + i);
            setup
                .zone
                .submit_message(&admin(), COMMON_7, &format!("m{}", i));
        }

        let reply = setup.zone.load_communications(
            &client_7(),
            COMMON_7,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        );
        let data = reply.data().unwrap();
        assert!(data.more_available);
        assert_eq!(20, data.messages.len());
        assert_eq!("m5", data.messages[0].message.body);

        let reply = setup.zone.load_communications(
            &client_7(),
            COMMON_7,
            LoadMode::Previous,
            data.messages[0].message.timestamp,
        );
        assert_eq!(vec!["m0", "m1", "m2", "m3", "m4"], bodies(&reply));
        assert!(!reply.data().unwrap().more_available);
    }

    #[test]
    fn upload_date_follows_configured_format() {
        let setup = set_up();
        let reply = setup.zone.submit_message(&client_7(), COMMON_7, "Hi");
        assert_eq!(
            "1 Jan 1970, 00:16",
            reply.data().unwrap().messages[0].upload_date
        );

        let setup = set_up_with(|c| c.display.date_format = "%Y-%m-%d".to_owned());
        let reply = setup.zone.submit_message(&client_7(), COMMON_7, "Hi");
        assert_eq!(
            "1970-01-01",
            reply.data().unwrap().messages[0].upload_date
        );
    }

    #[test]
    fn refused_submissions() {
        let setup = set_up_with(|c| c.zones.client_message_orderzones = false);

        let failure_class = |reply: Reply<Communications>| match reply {
            Reply::Failed { class, .. } => class,
            r => panic!("Unexpected reply: {:?}", r),
        };

        assert_eq!(
            FailureClass::Security,
            failure_class(setup.zone.submit_message(
                &Caller::client(Some(7), false),
                COMMON_7,
                "x"
            ))
        );
        assert_matches!(
            Reply::Failed {
                severity: Severity::Warning,
                ..
            },
            setup
                .zone
                .submit_message(&Caller::client(None, true), COMMON_7, "x")
        );
        assert_eq!(
            FailureClass::Security,
            failure_class(setup.zone.submit_message(
                &Caller::client(Some(8), true),
                COMMON_7,
                "x"
            ))
        );
        assert_eq!(
            FailureClass::Refused,
            failure_class(setup.zone.submit_message(
                &client_7(),
                ORDER_7_12,
                "x"
            ))
        );
        assert_eq!(
            FailureClass::Refused,
            failure_class(setup.zone.submit_message(&client_7(), COMMON_7, "  "))
        );

        assert!(!setup.root.exists());
        assert!(!setup.zone.busy_gate().is_busy());

        // The admin is not bound by client permissions
        assert!(setup
            .zone
            .submit_message(&admin(), ORDER_7_12, "x")
            .is_done());
        assert_eq!(
            ClientPermissions {
                message_enabled: false,
                upload_enabled: false,
            },
            setup.zone.client_permissions(ORDER_7_12)
        );
        assert!(setup.zone.client_permissions(COMMON_7).message_enabled);
    }

    #[test]
    fn unconfigured_root_fails_gracefully() {
        let setup = set_up_with(|c| c.storage.root = None);
        match setup.zone.load_communications(
            &client_7(),
            COMMON_7,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        ) {
            Reply::Failed {
                class, severity, ..
            } => {
                assert_eq!(FailureClass::Configuration, class);
                assert_eq!(Severity::Error, severity);
            }
            r => panic!("Unexpected reply: {:?}", r),
        }
        assert_matches!(Err(Error::RootNotConfigured), setup.zone.exists(COMMON_7));

        let setup =
            set_up_with(|c| c.storage.root = Some("/srv/../etc".into()));
        assert_matches!(
            Reply::Failed {
                class: FailureClass::Configuration,
                ..
            },
            setup.zone.get_notifications(&admin(), Scope::AllUsers)
        );
    }

    #[test]
    fn admin_move() {
        let setup = set_up();
        setup.zone.submit_message(&client_7(), COMMON_7, "Hello");
        assert!(setup.zone.exists(COMMON_7).unwrap());

        assert_matches!(
            Reply::Failed {
                class: FailureClass::Security,
                ..
            },
            setup
                .zone
                .move_conversation(&client_7(), 7, None, Some(12), false)
        );

        let reply = setup.zone.move_conversation(&admin(), 7, None, Some(12), false);
        // The message and the client's watermark
        assert_eq!(
            Reply::Done {
                data: MoveReport {
                    moved: 2,
                    failed: 0
                }
            },
            reply
        );
        assert!(!setup.zone.exists(COMMON_7).unwrap());
        assert!(setup.zone.exists(ORDER_7_12).unwrap());

        assert_matches!(
            Reply::Failed {
                class: FailureClass::NotFound,
                ..
            },
            setup.zone.move_conversation(&admin(), 7, None, Some(12), false)
        );
    }

    struct BrokenTransfer;

    impl Transfer for BrokenTransfer {
        fn copy(&self, _: &Path, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            fs::remove_file(path)
        }
    }

    #[test]
    fn partial_move_reports_remaining() {
        let setup = set_up();
        setup.zone.submit_message(&admin(), COMMON_7, "Hello");

        let broken = ClientZone::with_parts(
            setup.zone.config().clone(),
            Arc::new(setup.clock.clone()),
            Arc::new(BrokenTransfer),
        );
        match broken.move_conversation(&admin(), 7, None, Some(12), false) {
            Reply::Failed {
                class,
                remaining,
                reason,
                ..
            } => {
                assert_eq!(FailureClass::Partial, class);
                assert_eq!(Some(2), remaining);
                assert_eq!("2 files could not be moved", reason);
            }
            r => panic!("Unexpected reply: {:?}", r),
        }
        assert!(setup.zone.exists(COMMON_7).unwrap());
    }

    #[test]
    fn automove() {
        let setup = set_up_with(|c| c.zones.automove_to_orderzone = true);

        // Nothing to move yet
        assert_matches!(
            Reply::Empty { .. },
            setup.zone.automove_to_orderzone(7, 12, true)
        );

        setup.zone.submit_message(&client_7(), COMMON_7, "Before purchase");
        fs::write(setup.root.locate(COMMON_7).status_marker_path(), "perm")
            .unwrap();

        assert_matches!(
            Reply::Empty { .. },
            setup.zone.automove_to_orderzone(7, 12, false)
        );
        assert!(setup.zone.exists(COMMON_7).unwrap());

        assert_matches!(
            Reply::Done {
                data: MoveReport {
                    moved: 3,
                    failed: 0
                }
            },
            setup.zone.automove_to_orderzone(7, 12, true)
        );
        assert!(!setup.zone.exists(COMMON_7).unwrap());
        assert!(setup.root.locate(ORDER_7_12).status_marker_path().exists());

        let reply = setup.zone.load_communications(
            &client_7(),
            ORDER_7_12,
            LoadMode::Initial,
            SENTINEL_EMPTY,
        );
        assert_eq!(vec!["Before purchase"], bodies(&reply));
    }

    #[test]
    fn automove_configuration() {
        let setup = set_up();
        setup.zone.submit_message(&client_7(), COMMON_7, "Hello");
        assert_matches!(
            Reply::Empty { .. },
            setup.zone.automove_to_orderzone(7, 12, true)
        );

        let setup = set_up_with(|c| {
            c.zones.automove_to_orderzone = true;
            c.zones.use_orderzones = OrderZones::Never;
        });
        setup.zone.submit_message(&client_7(), COMMON_7, "Hello");
        assert_matches!(
            Reply::Empty { .. },
            setup.zone.automove_to_orderzone(7, 12, true)
        );

        let setup = set_up_with(|c| {
            c.zones.automove_to_orderzone = true;
            c.zones.use_orderzones = OrderZones::Always;
        });
        setup.zone.submit_message(&client_7(), COMMON_7, "Hello");
        assert!(setup.zone.automove_to_orderzone(7, 12, false).is_done());
    }

    #[test]
    fn client_notifications_are_own_and_client_unseen_only() {
        let setup = set_up();
        setup.zone.submit_message(&admin(), COMMON_7, "For seven");
        setup.zone.submit_message(&client_7(), ORDER_7_12, "From seven");
        setup.zone.submit_message(
            &admin(),
            ConversationId::common(8),
            "For eight",
        );

        assert_eq!(
            Reply::Done {
                data: vec![NotificationRecord {
                    user_id: 7,
                    order_id: None,
                    admin_unseen: false,
                    client_unseen: true,
                }]
            },
            setup.zone.get_notifications(&client_7(), Scope::AllUsers)
        );

        match setup.zone.get_notifications(&admin(), Scope::AllUsers) {
            Reply::Done { data } => assert_eq!(3, data.len()),
            r => panic!("Unexpected reply: {:?}", r),
        }
        match setup.zone.get_notifications(&admin(), Scope::SingleUser(8)) {
            Reply::Done { data } => assert_eq!(
                vec![ConversationId::common(8)],
                data.iter().map(|r| r.conversation()).collect::<Vec<_>>()
            ),
            r => panic!("Unexpected reply: {:?}", r),
        }

        assert_matches!(
            Reply::Failed {
                class: FailureClass::Security,
                ..
            },
            setup
                .zone
                .get_notifications(&Caller::client(None, true), Scope::AllUsers)
        );
    }

    #[test]
    fn notifications_before_anything_exists() {
        let setup = set_up();
        assert_eq!(
            Reply::Empty {
                severity: Severity::Info,
                reason: NOTHING_UNSEEN.to_owned(),
                data: vec![],
            },
            setup.zone.get_notifications(&admin(), Scope::AllUsers)
        );
    }

    #[test]
    fn ui_options() {
        let setup = set_up_with(|c| {
            c.uploads.client.accepted_files = ".pdf".to_owned();
            c.zones.use_orderzones = OrderZones::Never;
        });
        assert_eq!(
            UiOptions {
                refresh_rate_ms: 5000,
                items_loaded: 20,
                accepted_files: ".pdf".to_owned(),
                max_filesize_mb: 2,
                user_zones: true,
                order_zones: false,
            },
            setup.zone.ui_options(Party::Client)
        );
        assert_eq!("", setup.zone.ui_options(Party::Admin).accepted_files);
    }

    #[test]
    fn reply_serialisation() {
        let reply: Reply<MoveReport> = Reply::Failed {
            severity: Severity::Error,
            class: FailureClass::Partial,
            reason: "1 files could not be moved".to_owned(),
            remaining: Some(1),
        };
        assert_eq!(
            r#"{"status":"failed","severity":"error","class":"partial","reason":"1 files could not be moved","remaining":1}"#,
            serde_json::to_string(&reply).unwrap()
        );

        let reply: Reply<MoveReport> = Reply::Silent;
        assert_eq!(
            r#"{"status":"silent"}"#,
            serde_json::to_string(&reply).unwrap()
        );
    }
}
