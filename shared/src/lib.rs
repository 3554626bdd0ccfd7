pub mod codec;
pub mod grid;
pub mod movement;
pub mod pathfinding;
pub mod protocol;

pub use codec::{CodecError, FrameCodec, DELIMITER};
pub use grid::{Cell, GridError, GridMap};
pub use movement::{Direction, MotionPhase, MovementState};
pub use pathfinding::find_path;
pub use protocol::{Message, PlayerData};

/// Side length of a map cell in pixels.
pub const CELL_SIZE: i32 = 32;
/// Pixels a walking character covers per simulation tick, on each axis.
pub const STEP_PER_TICK: i32 = 2;
/// Simulation ticks per second, shared by server and client so both animate alike.
pub const TICK_RATE: u32 = 60;
/// Cell every player starts on after logging in.
pub const SPAWN_CELL: Cell = (5, 5);
/// Map size used when no walk file is given, in cells.
pub const DEFAULT_GRID_SIZE: (usize, usize) = (41, 31);

/// Converts a pixel coordinate to the cell containing it.
pub fn pixel_to_cell(x: i32, y: i32) -> Cell {
    (x.div_euclid(CELL_SIZE), y.div_euclid(CELL_SIZE))
}
