use crate::registry::ConnectionId;
use log::{debug, info};
use shared::{Cell, GridMap, MovementState, PlayerData, SPAWN_CELL};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identity handed out at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub uuid: String,
    pub nickname: String,
    pub role_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Unauthenticated,
    Authenticated(Profile),
}

/// Authoritative state of one connected client.
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub login: LoginState,
    pub movement: MovementState,
    pub last_seen: Instant,
}

impl Session {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            login: LoginState::Unauthenticated,
            movement: MovementState::new(SPAWN_CELL),
            last_seen: Instant::now(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.login, LoginState::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.login {
            LoginState::Authenticated(profile) => Some(profile),
            LoginState::Unauthenticated => None,
        }
    }

    /// Public view at the cell the character currently stands on.
    pub fn player_data(&self) -> Option<PlayerData> {
        let cell = self.movement.cell();
        self.player_data_at(cell)
    }

    pub fn player_data_at(&self, cell: Cell) -> Option<PlayerData> {
        self.profile().map(|profile| PlayerData {
            uuid: profile.uuid.clone(),
            nickname: profile.nickname.clone(),
            x: cell.0,
            y: cell.1,
            role_id: profile.role_id,
        })
    }
}

/// All sessions plus the map they walk on.
///
/// Owned by the simulation loop, which is the only writer.
#[derive(Debug)]
pub struct World {
    pub tick: u64,
    grid: Arc<GridMap>,
    sessions: HashMap<ConnectionId, Session>,
}

impl World {
    pub fn new(grid: Arc<GridMap>) -> Self {
        Self {
            tick: 0,
            grid,
            sessions: HashMap::new(),
        }
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn add_session(&mut self, id: ConnectionId, addr: SocketAddr) {
        debug!("Session {} created for {}", id, addr);
        self.sessions.insert(id, Session::new(id, addr));
    }

    pub fn remove_session(&mut self, id: ConnectionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Records activity for the idle timeout.
    pub fn touch(&mut self, id: ConnectionId) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.last_seen = Instant::now();
        }
    }

    /// Logs a session in and places it on the spawn cell.
    pub fn login(&mut self, id: ConnectionId, profile: Profile) -> Option<PlayerData> {
        let session = self.sessions.get_mut(&id)?;
        info!(
            "Session {} logged in as {} ({})",
            id, profile.nickname, profile.uuid
        );
        session.login = LoginState::Authenticated(profile);
        session.movement = MovementState::new(SPAWN_CELL);
        session.player_data()
    }

    /// Routes a logged-in session towards `goal`.
    ///
    /// Returns the player data addressed at the goal when a route exists. Requests
    /// from unknown or logged-out sessions, and unreachable goals, change nothing.
    pub fn request_move(&mut self, id: ConnectionId, goal: Cell) -> Option<PlayerData> {
        let session = self.sessions.get_mut(&id)?;
        if !session.is_authenticated() {
            return None;
        }
        if !session.movement.find_path(&self.grid, goal) {
            debug!(
                "Session {}: no route from {:?} to {:?}",
                id,
                session.movement.cell(),
                goal
            );
            return None;
        }
        session.player_data_at(goal)
    }

    /// Logged-in players other than `exclude`, ordered by connection id.
    pub fn roster_except(&self, exclude: ConnectionId) -> Vec<PlayerData> {
        let mut ids: Vec<&ConnectionId> = self.sessions.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter(|&&id| id != exclude)
            .filter_map(|id| self.sessions[id].player_data())
            .collect()
    }

    /// Sessions that have not sent anything for longer than `timeout`.
    pub fn idle_sessions(&self, timeout: Duration) -> Vec<ConnectionId> {
        let mut idle: Vec<ConnectionId> = self
            .sessions
            .values()
            .filter(|session| session.last_seen.elapsed() > timeout)
            .map(|session| session.id)
            .collect();
        idle.sort();
        idle
    }

    /// Advances every character by one simulation step.
    pub fn update(&mut self) {
        self.tick += 1;
        for session in self.sessions.values_mut() {
            session.movement.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:6666".parse().unwrap()
    }

    fn profile(name: &str) -> Profile {
        Profile {
            uuid: format!("uuid-{name}"),
            nickname: name.to_string(),
            role_id: 0,
        }
    }

    fn world() -> World {
        World::new(Arc::new(GridMap::from_rows(&[
            "........",
            "........",
            "........",
            "........",
            "........",
            "......#.",
            "........",
        ])))
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let mut world = world();
        world.add_session(1, test_addr());
        let session = world.session(1).unwrap();
        assert!(!session.is_authenticated());
        assert!(session.player_data().is_none());
        assert_eq!(session.movement.cell(), SPAWN_CELL);
    }

    #[test]
    fn test_login_places_player_on_spawn() {
        let mut world = world();
        world.add_session(1, test_addr());
        let data = world.login(1, profile("a")).unwrap();
        assert_eq!((data.x, data.y), SPAWN_CELL);
        assert_eq!(data.nickname, "a");
        assert!(world.session(1).unwrap().is_authenticated());
    }

    #[test]
    fn test_login_unknown_session() {
        let mut world = world();
        assert!(world.login(7, profile("ghost")).is_none());
    }

    #[test]
    fn test_move_requires_login() {
        let mut world = world();
        world.add_session(1, test_addr());
        assert!(world.request_move(1, (6, 5)).is_none());
        assert!(world.session(1).unwrap().movement.path().is_empty());
    }

    #[test]
    fn test_move_to_blocked_cell_is_dropped() {
        let mut world = world();
        world.add_session(1, test_addr());
        world.login(1, profile("a"));
        assert!(world.request_move(1, (6, 5)).is_none());
        assert!(world.request_move(1, (99, 0)).is_none());
        assert!(world.session(1).unwrap().movement.path().is_empty());

        // Already there: accepted with nothing to walk.
        assert!(world.request_move(1, SPAWN_CELL).is_some());
    }

    #[test]
    fn test_move_then_update_walks() {
        let mut world = world();
        world.add_session(1, test_addr());
        world.login(1, profile("a"));

        let data = world.request_move(1, (7, 5)).unwrap();
        assert_eq!((data.x, data.y), (7, 5));

        for _ in 0..500 {
            world.update();
        }
        assert_eq!(world.session(1).unwrap().movement.cell(), (7, 5));
        assert_eq!(world.tick, 500);
    }

    #[test]
    fn test_roster_excludes_self_and_guests() {
        let mut world = world();
        for id in 1..=4 {
            world.add_session(id, test_addr());
        }
        world.login(1, profile("a"));
        world.login(2, profile("b"));
        world.login(4, profile("d"));

        let roster = world.roster_except(2);
        let names: Vec<&str> = roster.iter().map(|p| p.nickname.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[test]
    fn test_idle_sessions() {
        let mut world = world();
        world.add_session(1, test_addr());
        world.add_session(2, test_addr());
        world.session_mut(1).unwrap().last_seen = Instant::now() - Duration::from_secs(10);

        assert_eq!(world.idle_sessions(Duration::from_secs(5)), vec![1]);
        world.touch(1);
        assert!(world.idle_sessions(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_remove_session() {
        let mut world = world();
        world.add_session(1, test_addr());
        assert!(world.remove_session(1).is_some());
        assert!(world.remove_session(1).is_none());
        assert!(world.is_empty());
    }
}
