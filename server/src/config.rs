//! Server settings and the static account table.

use shared::GridMap;
pub use shared::DEFAULT_GRID_SIZE;
use std::time::Duration;

/// A login the server accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub role_id: u32,
}

impl Account {
    pub fn new(username: &str, password: &str, nickname: &str, role_id: u32) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
            role_id,
        }
    }
}

/// The built-in accounts. There is no account storage, so these are the only logins.
pub fn default_accounts() -> Vec<Account> {
    vec![
        Account::new("admin01", "123456", "玩家昵称1", 0),
        Account::new("admin02", "123456", "玩家昵称2", 1),
        Account::new("admin03", "123456", "玩家昵称3", 2),
    ]
}

/// Everything needed to start a [`crate::network::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:6666`.
    pub addr: String,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Disconnect sessions that stay silent this long. `None` disables the check.
    pub idle_timeout: Option<Duration>,
    pub accounts: Vec<Account>,
    pub grid: GridMap,
}

impl ServerConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6666".to_string(),
            tick_rate: shared::TICK_RATE,
            idle_timeout: None,
            accounts: default_accounts(),
            grid: GridMap::open(DEFAULT_GRID_SIZE.0, DEFAULT_GRID_SIZE.1),
        }
    }
}
