//! Maps incoming protocol messages to their handlers.
//!
//! Every handler runs on the simulation loop with exclusive access to the
//! [`World`] and the [`SessionRegistry`], so handlers never race each other.

use crate::config::Account;
use crate::game::{Profile, World};
use crate::registry::{ConnectionId, SessionRegistry};
use log::{debug, info, warn};
use shared::Message;
use uuid::Uuid;

const LOGIN_FAILED: &str = "账号或密码错误";
const ALREADY_LOGGED_IN: &str = "already logged in";

pub struct Dispatcher {
    accounts: Vec<Account>,
}

impl Dispatcher {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Applies one client message.
    ///
    /// Unknown tags and server-only tags are ignored. Everything except
    /// `cli_login` is dropped until the session has logged in.
    pub fn dispatch(
        &self,
        world: &mut World,
        registry: &mut SessionRegistry,
        id: ConnectionId,
        message: Message,
    ) {
        world.touch(id);

        match message {
            Message::CliLogin { username, password } => {
                self.handle_login(world, registry, id, &username, &password)
            }
            Message::CliMove { x, y } => self.handle_move(world, registry, id, x, y),
            Message::CliChat { text } => self.handle_chat(world, registry, id, text),
            Message::Unknown => debug!("Connection {}: ignoring unknown protocol", id),
            other => warn!(
                "Connection {}: ignoring server-side message {}",
                id,
                other.tag()
            ),
        }
    }

    fn find_account(&self, username: &str, password: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|account| account.username == username && account.password == password)
    }

    fn handle_login(
        &self,
        world: &mut World,
        registry: &mut SessionRegistry,
        id: ConnectionId,
        username: &str,
        password: &str,
    ) {
        if world.session(id).is_some_and(|s| s.is_authenticated()) {
            registry.send_to(id, Message::login_failed(ALREADY_LOGGED_IN));
            return;
        }

        let Some(account) = self.find_account(username, password) else {
            info!("Connection {}: rejected login for {:?}", id, username);
            registry.send_to(id, Message::login_failed(LOGIN_FAILED));
            return;
        };

        let profile = Profile {
            uuid: Uuid::new_v4().simple().to_string(),
            nickname: account.nickname.clone(),
            role_id: account.role_id,
        };
        let Some(player_data) = world.login(id, profile) else {
            return;
        };
        registry.authenticate(id);

        registry.send_to(id, Message::login_ok(player_data.clone()));
        registry.broadcast_except(Message::SerOnline { player_data }, id);
        registry.send_to(
            id,
            Message::SerPlayerList {
                player_list: world.roster_except(id),
            },
        );
    }

    fn handle_move(
        &self,
        world: &mut World,
        registry: &mut SessionRegistry,
        id: ConnectionId,
        x: i32,
        y: i32,
    ) {
        if !registry.is_authenticated(id) {
            return;
        }
        // Unreachable goals leave the current route alone and are not echoed.
        if let Some(player_data) = world.request_move(id, (x, y)) {
            registry.broadcast(Message::SerMove { player_data });
        }
    }

    fn handle_chat(
        &self,
        world: &mut World,
        registry: &mut SessionRegistry,
        id: ConnectionId,
        text: String,
    ) {
        let Some(profile) = world.session(id).and_then(|s| s.profile()) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        registry.broadcast(Message::SerChat {
            nickname: profile.nickname.clone(),
            text,
        });
    }
}
