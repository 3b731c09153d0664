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

use std::io::{self, Read};

use serde::Serialize;

use super::main::*;
use crate::support::sysexits::*;
use crate::zone::model::{Party, SENTINEL_EMPTY};
use crate::zone::notifications::Scope;
use crate::zone::service::{Caller, ClientZone, Reply};

#[derive(Serialize)]
struct Existence {
    exists: bool,
}

pub(super) fn run(zone: ClientZone, command: Command) {
    match command {
        Command::Submit(cmd) => {
            let body = if "-" == cmd.body {
                read_body()
            } else {
                cmd.body
            };
            let conversation = cmd.conversation.conversation();
            let caller = caller(cmd.party.party, Some(conversation.user_id));
            emit(zone.submit_message(&caller, conversation, &body));
        }

        Command::Load(cmd) => {
            let conversation = cmd.conversation.conversation();
            let caller = caller(cmd.party.party, Some(conversation.user_id));
            emit(zone.load_communications(
                &caller,
                conversation,
                cmd.mode,
                cmd.cursor.unwrap_or(SENTINEL_EMPTY),
            ));
        }

        Command::Move(cmd) => emit(zone.move_conversation(
            &Caller::admin(true),
            cmd.user,
            cmd.from,
            cmd.to,
            cmd.carry_status,
        )),

        Command::Automove(cmd) => emit(zone.automove_to_orderzone(
            cmd.user,
            cmd.order,
            !cmd.ineligible,
        )),

        Command::Notifications(cmd) => {
            let scope = match (cmd.party.party, cmd.user) {
                (Party::Client, None) => die!(
                    EX_USAGE,
                    "--user is required when acting as the client"
                ),
                (_, Some(user_id)) => Scope::SingleUser(user_id),
                (Party::Admin, None) => Scope::AllUsers,
            };
            let caller = caller(cmd.party.party, cmd.user);
            emit(zone.get_notifications(&caller, scope));
        }

        Command::Permissions(conversation) => print_json(
            &zone.client_permissions(conversation.conversation()),
        ),

        Command::Exists(conversation) => {
            match zone.exists(conversation.conversation()) {
                Ok(exists) => print_json(&Existence { exists }),
                Err(e) => {
                    eprintln!("{}", e);
                    Sysexit::for_error(&e).exit()
                }
            }
        }

        Command::Options(cmd) => print_json(&zone.ui_options(cmd.party)),
    }
}

fn caller(party: Party, user_id: Option<u64>) -> Caller {
    match party {
        Party::Admin => Caller {
            user_id,
            ..Caller::admin(true)
        },
        Party::Client => Caller::client(user_id, true),
    }
}

fn read_body() -> String {
    let mut body = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut body) {
        die!(EX_NOINPUT, "Failed to read message from stdin: {}", e);
    }
    body
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => die!(EX_SOFTWARE, "Failed to format output: {}", e),
    }
}

fn emit<T: Serialize>(reply: Reply<T>) {
    print_json(&reply);
    if let Reply::Failed { class, .. } = reply {
        Sysexit::for_class(class).exit();
    }
}
