use log::{debug, info, warn};
use shared::{Cell, GridMap, Message, MovementState, PlayerData};
use std::collections::{HashMap, VecDeque};

/// Chat lines kept for display, newest first.
pub const CHAT_HISTORY_LEN: usize = 5;

/// A player mirrored from server broadcasts.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub data: PlayerData,
    pub movement: MovementState,
}

impl RemotePlayer {
    fn new(data: PlayerData) -> Self {
        let movement = MovementState::new((data.x, data.y));
        Self { data, movement }
    }
}

/// Everything the client knows about the world, rebuilt from server messages.
///
/// `ser_move` only carries the goal cell, so the client routes each walk over
/// its own copy of the walk map, the same way the server does.
#[derive(Debug)]
pub struct ClientGameState {
    pub local: Option<RemotePlayer>,
    pub players: HashMap<String, RemotePlayer>,
    pub chat_history: VecDeque<String>,
    pub login_error: Option<String>,
    grid: GridMap,
}

impl ClientGameState {
    pub fn new(grid: GridMap) -> Self {
        Self {
            local: None,
            players: HashMap::new(),
            chat_history: VecDeque::new(),
            login_error: None,
            grid,
        }
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn is_logged_in(&self) -> bool {
        self.local.is_some()
    }

    pub fn local_uuid(&self) -> Option<&str> {
        self.local.as_ref().map(|player| player.data.uuid.as_str())
    }

    /// Applies one server message.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::SerLogin {
                result: true,
                player_data: Some(data),
                ..
            } => {
                info!("Logged in as {} ({})", data.nickname, data.uuid);
                self.login_error = None;
                self.local = Some(RemotePlayer::new(data));
            }
            Message::SerLogin { msg, .. } => {
                let reason = msg.unwrap_or_default();
                warn!("Login failed: {}", reason);
                self.login_error = Some(reason);
            }
            Message::SerPlayerList { player_list } => {
                for data in player_list {
                    self.add_player(data);
                }
            }
            Message::SerOnline { player_data } => {
                info!("{} came online", player_data.nickname);
                self.add_player(player_data);
            }
            Message::SerMove { player_data } => {
                let target = (player_data.x, player_data.y);
                let is_local = self.local_uuid() == Some(player_data.uuid.as_str());
                let mover = if is_local {
                    self.local.as_mut()
                } else {
                    self.players.get_mut(&player_data.uuid)
                };
                match mover {
                    Some(player) => walk_to(&mut player.movement, &self.grid, target),
                    None => debug!("Move for unknown player {}", player_data.uuid),
                }
            }
            Message::SerOffline { uuid } => {
                if let Some(player) = self.players.remove(&uuid) {
                    info!("{} went offline", player.data.nickname);
                }
            }
            Message::SerChat { nickname, text } => {
                self.chat_history.push_front(format!("{nickname}: {text}"));
                self.chat_history.truncate(CHAT_HISTORY_LEN);
            }
            other => debug!("Ignoring {}", other.tag()),
        }
    }

    fn add_player(&mut self, data: PlayerData) {
        if self.local_uuid() == Some(data.uuid.as_str()) {
            return;
        }
        self.players
            .insert(data.uuid.clone(), RemotePlayer::new(data));
    }

    /// Every mirrored character, the local player first.
    pub fn all_players(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.local.iter().chain(self.players.values())
    }

    /// Advances every mirrored character by one tick.
    pub fn tick(&mut self) {
        if let Some(local) = self.local.as_mut() {
            local.movement.tick();
        }
        for player in self.players.values_mut() {
            player.movement.tick();
        }
    }
}

/// Routes a mirrored character to `target` over the local walk map.
fn walk_to(movement: &mut MovementState, grid: &GridMap, target: Cell) {
    if !movement.find_path(grid, target) {
        // The server already accepted this move, so its map disagrees with ours.
        warn!("No local route to {:?}, heading there directly", target);
        movement.follow(vec![target]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{find_path, CELL_SIZE, STEP_PER_TICK};

    /// 8x8 with a wall down column 3 that is open only at row 6.
    fn walled_grid() -> GridMap {
        GridMap::from_rows(&[
            "...#....",
            "...#....",
            "...#....",
            "...#....",
            "...#....",
            "...#....",
            "........",
            "...#....",
        ])
    }

    fn data(uuid: &str, x: i32, y: i32) -> PlayerData {
        PlayerData {
            uuid: uuid.to_string(),
            nickname: format!("nick-{uuid}"),
            x,
            y,
            role_id: 0,
        }
    }

    fn logged_in() -> ClientGameState {
        let mut state = ClientGameState::new(GridMap::open(8, 8));
        state.apply(Message::login_ok(data("me", 5, 5)));
        state
    }

    #[test]
    fn test_login_success_and_failure() {
        let mut state = ClientGameState::new(GridMap::open(8, 8));
        state.apply(Message::login_failed("nope"));
        assert!(!state.is_logged_in());
        assert_eq!(state.login_error.as_deref(), Some("nope"));

        state.apply(Message::login_ok(data("me", 5, 5)));
        assert!(state.is_logged_in());
        assert_eq!(state.local_uuid(), Some("me"));
        assert!(state.login_error.is_none());
    }

    #[test]
    fn test_roster_and_offline() {
        let mut state = logged_in();
        state.apply(Message::SerPlayerList {
            player_list: vec![data("a", 1, 1), data("b", 2, 2)],
        });
        state.apply(Message::SerOnline {
            player_data: data("c", 3, 3),
        });
        assert_eq!(state.players.len(), 3);

        state.apply(Message::SerOffline {
            uuid: "b".to_string(),
        });
        assert_eq!(state.players.len(), 2);
        assert!(!state.players.contains_key("b"));

        // Unknown uuid is harmless.
        state.apply(Message::SerOffline {
            uuid: "zzz".to_string(),
        });
        assert_eq!(state.players.len(), 2);
    }

    #[test]
    fn test_self_is_not_listed_as_remote() {
        let mut state = logged_in();
        state.apply(Message::SerOnline {
            player_data: data("me", 5, 5),
        });
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_move_animates_remote_player() {
        let mut state = logged_in();
        state.apply(Message::SerOnline {
            player_data: data("a", 1, 1),
        });
        state.apply(Message::SerMove {
            player_data: data("a", 2, 1),
        });

        // One tick to pick up the route, then one step per tick.
        let ticks = 1 + CELL_SIZE / STEP_PER_TICK;
        for _ in 0..ticks {
            state.tick();
        }
        let player = &state.players["a"];
        assert_eq!(player.movement.cell(), (2, 1));
        assert!(!player.movement.is_walking());
    }

    #[test]
    fn test_move_for_local_player() {
        let mut state = logged_in();
        state.apply(Message::SerMove {
            player_data: data("me", 5, 6),
        });
        state.tick();
        let local = state.local.as_ref().unwrap();
        assert!(local.movement.is_walking());
        assert_eq!(local.movement.target(), (5, 6));
    }

    #[test]
    fn test_mirrored_walk_follows_route_around_walls() {
        let grid = walled_grid();
        let mut state = ClientGameState::new(grid.clone());
        state.apply(Message::login_ok(data("me", 5, 5)));
        state.apply(Message::SerOnline {
            player_data: data("a", 1, 1),
        });
        state.apply(Message::SerMove {
            player_data: data("a", 5, 1),
        });

        let route = find_path(&grid, (1, 1), (5, 1)).unwrap();
        let ticks_per_cell = (CELL_SIZE / STEP_PER_TICK) as usize;
        let mut visited = Vec::new();
        for _ in 0..=route.len() * ticks_per_cell {
            state.tick();
            let cell = state.players["a"].movement.cell();
            assert!(grid.is_walkable(cell.0, cell.1), "stood on {cell:?}");
            if visited.last() != Some(&cell) {
                visited.push(cell);
            }
        }

        let player = &state.players["a"];
        assert_eq!(player.movement.cell(), (5, 1));
        assert!(!player.movement.is_walking());
        assert!(visited.contains(&(3, 6)), "went through the gap");
        assert!(visited.iter().all(|cell| route.contains(cell) || *cell == (1, 1)));
    }

    #[test]
    fn test_move_without_local_route_still_heads_to_target() {
        let mut state = ClientGameState::new(walled_grid());
        state.apply(Message::login_ok(data("me", 5, 5)));
        state.apply(Message::SerOnline {
            player_data: data("a", 1, 1),
        });
        // Blocked on this map, but the server is authoritative.
        state.apply(Message::SerMove {
            player_data: data("a", 3, 1),
        });
        state.tick();
        let player = &state.players["a"];
        assert!(player.movement.is_walking());
        assert_eq!(player.movement.target(), (3, 1));
    }

    #[test]
    fn test_chat_history_is_capped() {
        let mut state = logged_in();
        for i in 0..7 {
            state.apply(Message::SerChat {
                nickname: "n".to_string(),
                text: format!("line {i}"),
            });
        }
        assert_eq!(state.chat_history.len(), CHAT_HISTORY_LEN);
        assert_eq!(state.chat_history[0], "n: line 6");
        assert_eq!(state.chat_history[4], "n: line 2");
    }
}
