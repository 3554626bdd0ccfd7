use serde::{Deserialize, Serialize};

/// Public view of a logged-in player, as carried in `player_data` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    pub uuid: String,
    pub nickname: String,
    /// Grid cell.
    pub x: i32,
    pub y: i32,
    /// Character sprite index.
    #[serde(default)]
    pub role_id: u32,
}

/// One frame of the wire protocol, tagged by its `protocol` field.
///
/// `cli_*` messages flow from client to server, `ser_*` from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum Message {
    CliLogin {
        username: String,
        password: String,
    },
    SerLogin {
        result: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_data: Option<PlayerData>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    SerPlayerList {
        player_list: Vec<PlayerData>,
    },
    CliMove {
        x: i32,
        y: i32,
    },
    SerMove {
        player_data: PlayerData,
    },
    SerOnline {
        player_data: PlayerData,
    },
    SerOffline {
        uuid: String,
    },
    CliChat {
        text: String,
    },
    SerChat {
        nickname: String,
        text: String,
    },
    /// Any tag this build does not know. Never sent.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl Message {
    pub fn login_ok(player_data: PlayerData) -> Self {
        Message::SerLogin {
            result: true,
            player_data: Some(player_data),
            msg: None,
        }
    }

    pub fn login_failed(msg: impl Into<String>) -> Self {
        Message::SerLogin {
            result: false,
            player_data: None,
            msg: Some(msg.into()),
        }
    }

    /// The `protocol` tag as it appears on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::CliLogin { .. } => "cli_login",
            Message::SerLogin { .. } => "ser_login",
            Message::SerPlayerList { .. } => "ser_player_list",
            Message::CliMove { .. } => "cli_move",
            Message::SerMove { .. } => "ser_move",
            Message::SerOnline { .. } => "ser_online",
            Message::SerOffline { .. } => "ser_offline",
            Message::CliChat { .. } => "cli_chat",
            Message::SerChat { .. } => "ser_chat",
            Message::Unknown => "unknown",
        }
    }
}
