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

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;
use crate::zone::model::{ConversationId, Party, Timestamp};
use crate::zone::service::{ClientZone, LoadMode};

const CONFIG_FILE: &str = "clientzone.toml";
const LOGGING_FILE: &str = "logging.toml";

/// Operate on a Clientzone message store.
///
/// Every command prints its outcome as a JSON object on standard output. The
/// exit status is 0 unless the outcome is a failure, in which case a
/// `sysexits.h` code describing the kind of failure is used.
///
/// Commands run as a trusted local operator: the caller given with `--as` is
/// taken to have passed whatever security check the web front-end would
/// normally perform.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// The configuration file
    /// [default: /etc/clientzone/clientzone.toml or
    /// /usr/local/etc/clientzone/clientzone.toml]
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub(super) enum Command {
    Submit(SubmitSubcommand),
    Load(LoadSubcommand),
    /// Move a conversation into another conversation of the same user.
    ///
    /// All files are copied into the destination and then removed from the
    /// source. Files that cannot be copied are left in place and counted.
    Move(MoveSubcommand),
    /// Move a user's common conversation into the conversation of a newly
    /// placed order, if the configuration calls for that.
    Automove(AutomoveSubcommand),
    /// List conversations with messages one of the parties has not seen.
    Notifications(NotificationsSubcommand),
    /// Show what the client may do in a conversation.
    Permissions(ConversationOptions),
    /// Show whether a conversation exists.
    Exists(ConversationOptions),
    /// Show the options a user interface needs.
    Options(PartyOptions),
}

#[derive(StructOpt)]
pub(super) struct ConversationOptions {
    /// The user owning the conversation.
    #[structopt(long)]
    pub(super) user: u64,

    /// The order the conversation is linked to. Without this, the user's
    /// common conversation is meant.
    #[structopt(long)]
    pub(super) order: Option<u64>,
}

impl ConversationOptions {
    pub(super) fn conversation(&self) -> ConversationId {
        ConversationId {
            user_id: self.user,
            order_id: self.order,
        }
    }
}

#[derive(StructOpt)]
pub(super) struct PartyOptions {
    /// Act as this party (admin or client).
    #[structopt(long = "as", default_value = "admin")]
    pub(super) party: Party,
}

/// Post a message.
///
/// The output contains every message the poster had not yet seen, including
/// the new one.
#[derive(StructOpt)]
pub(super) struct SubmitSubcommand {
    #[structopt(flatten)]
    pub(super) party: PartyOptions,

    #[structopt(flatten)]
    pub(super) conversation: ConversationOptions,

    /// The message text. "-" reads it from standard input.
    #[structopt(default_value = "-")]
    pub(super) body: String,
}

/// Load messages for display, recording that the party has looked.
#[derive(StructOpt)]
pub(super) struct LoadSubcommand {
    #[structopt(flatten)]
    pub(super) party: PartyOptions,

    #[structopt(flatten)]
    pub(super) conversation: ConversationOptions,

    /// What to load: initial, refresh, or previous.
    #[structopt(long, default_value = "initial", parse(try_from_str = parse_load_mode))]
    pub(super) mode: LoadMode,

    /// The timestamp of the earliest message already displayed, if any.
    #[structopt(long)]
    pub(super) cursor: Option<Timestamp>,
}

#[derive(StructOpt)]
pub(super) struct MoveSubcommand {
    /// The user owning both conversations.
    #[structopt(long)]
    pub(super) user: u64,

    /// The order of the source conversation. Without this, the common
    /// conversation is moved.
    #[structopt(long)]
    pub(super) from: Option<u64>,

    /// The order of the destination conversation. Without this, the files go
    /// into the common conversation.
    #[structopt(long)]
    pub(super) to: Option<u64>,

    /// Also move the client permission marker instead of discarding it.
    #[structopt(long)]
    pub(super) carry_status: bool,
}

#[derive(StructOpt)]
pub(super) struct AutomoveSubcommand {
    #[structopt(long)]
    pub(super) user: u64,

    #[structopt(long)]
    pub(super) order: u64,

    /// The order does not contain any product that warrants a conversation.
    #[structopt(long)]
    pub(super) ineligible: bool,
}

#[derive(StructOpt)]
pub(super) struct NotificationsSubcommand {
    #[structopt(flatten)]
    pub(super) party: PartyOptions,

    /// Only look at this user. Required when acting as the client.
    #[structopt(long)]
    pub(super) user: Option<u64>,
}

fn parse_load_mode(s: &str) -> Result<LoadMode, String> {
    match s {
        "initial" => Ok(LoadMode::Initial),
        "refresh" => Ok(LoadMode::Refresh),
        "previous" => Ok(LoadMode::Previous),
        _ => Err(format!(
            "Unknown mode '{}'; use initial, refresh, or previous",
            s
        )),
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let config_path = options.config.unwrap_or_else(|| {
        let etc = Path::new("/etc/clientzone").join(CONFIG_FILE);
        let local_etc = Path::new("/usr/local/etc/clientzone").join(CONFIG_FILE);
        if etc.is_file() {
            etc
        } else if local_etc.is_file() {
            local_etc
        } else {
            die!(
                EX_CONFIG,
                "Neither /etc/clientzone nor /usr/local/etc/clientzone has\n\
                 a {}; use --config=/path/to/{} if your\n\
                 installation is elsewhere.",
                CONFIG_FILE,
                CONFIG_FILE
            )
        }
    });

    let config_dir = config_path
        .parent()
        .map(Path::to_owned)
        .unwrap_or_else(|| PathBuf::from("."));
    let system_config = load_system_config(&config_path, &config_dir);
    init_logging(&config_dir);

    super::commands::run(ClientZone::new(system_config), options.command);
}

fn load_system_config(path: &Path, config_dir: &Path) -> SystemConfig {
    let mut system_config_toml = Vec::new();
    if let Err(e) = fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut system_config_toml))
    {
        die!(EX_CONFIG, "Error reading '{}': {}", path.display(), e);
    }

    let mut system_config: SystemConfig =
        match toml::from_slice(&system_config_toml) {
            Ok(config) => config,
            Err(e) => die!(
                EX_CONFIG,
                "Error in config file at '{}': {}",
                path.display(),
                e
            ),
        };

    system_config.resolve_relative_root(config_dir);
    system_config
}

fn init_logging(config_dir: &Path) {
    let log_config_file = config_dir.join(LOGGING_FILE);
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            die!(
                EX_CONFIG,
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
        }
    } else if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; just write to stderr.
        if let Err(e) = crate::init_simple_log() {
            die!(EX_SOFTWARE, "Failed to initialise logging: {}", e);
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        // Whoever runs us without a terminal may well not care about
        // logs at all, so a missing syslog is not fatal.
        match syslog::unix(formatter) {
            Ok(logger) => {
                let _ = log::set_boxed_logger(Box::new(
                    syslog::BasicLogger::new(logger),
                ))
                .map(|_| log::set_max_level(log::LevelFilter::Info));
            }
            Err(e) => eprintln!("Failed to connect to syslog: {}", e),
        }
    }
}
