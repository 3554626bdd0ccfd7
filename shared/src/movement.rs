use crate::grid::{Cell, GridMap};
use crate::pathfinding::find_path;
use crate::{pixel_to_cell, CELL_SIZE, STEP_PER_TICK};
use serde::{Deserialize, Serialize};

/// Facing of a character, in sprite-sheet row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Down,
    Left,
    Right,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Walking,
}

/// Per-character movement: turns a path of cells into pixel motion.
///
/// The pixel position is the only positional state. The cell a character stands on is
/// always derived from it, never stored separately.
#[derive(Debug, Clone)]
pub struct MovementState {
    x: i32,
    y: i32,
    target: Cell,
    phase: MotionPhase,
    direction: Direction,
    path: Vec<Cell>,
    path_cursor: usize,
    step: i32,
}

impl MovementState {
    /// Places a character at the top-left pixel of `cell`, idle and facing down.
    pub fn new(cell: Cell) -> Self {
        Self::with_step(cell, STEP_PER_TICK)
    }

    pub fn with_step(cell: Cell, step: i32) -> Self {
        Self {
            x: cell.0 * CELL_SIZE,
            y: cell.1 * CELL_SIZE,
            target: cell,
            phase: MotionPhase::Idle,
            direction: Direction::Down,
            path: Vec::new(),
            path_cursor: 0,
            step: step.max(1),
        }
    }

    pub fn pixel(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Cell under the character's top-left pixel.
    pub fn cell(&self) -> Cell {
        pixel_to_cell(self.x, self.y)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn is_walking(&self) -> bool {
        self.phase == MotionPhase::Walking
    }

    /// Cell the character is currently stepping towards.
    pub fn target(&self) -> Cell {
        self.target
    }

    pub fn path(&self) -> &[Cell] {
        &self.path
    }

    pub fn path_cursor(&self) -> usize {
        self.path_cursor
    }

    /// Starts walking towards a single cell.
    ///
    /// Facing is taken from the horizontal delta first and then overridden by the
    /// vertical delta, so a diagonal target ends up facing up or down.
    pub fn goto(&mut self, target: Cell) {
        let (mx, my) = self.cell();
        if target.0 > mx {
            self.direction = Direction::Right;
        } else if target.0 < mx {
            self.direction = Direction::Left;
        }
        if target.1 > my {
            self.direction = Direction::Down;
        } else if target.1 < my {
            self.direction = Direction::Up;
        }

        self.target = target;
        self.phase = MotionPhase::Walking;
    }

    /// Replaces any in-progress path.
    ///
    /// A character caught mid-step turns towards the first cell of the new path right
    /// away, starting from its current pixel position.
    pub fn follow(&mut self, path: Vec<Cell>) {
        self.path = path;
        self.path_cursor = 0;

        if self.is_walking() {
            let next = match self.path.first() {
                Some(&cell) => {
                    self.path_cursor = 1;
                    cell
                }
                None => self.cell(),
            };
            self.goto(next);
        }
    }

    /// Plans a route to `goal` from the current cell and follows it.
    ///
    /// Returns `false` and leaves the current path untouched when no route exists.
    pub fn find_path(&mut self, grid: &GridMap, goal: Cell) -> bool {
        match find_path(grid, self.cell(), goal) {
            Some(path) => {
                self.follow(path);
                true
            }
            None => false,
        }
    }

    /// Advances one simulation tick: move towards the target, then pick the next path
    /// cell once idle.
    pub fn tick(&mut self) {
        self.advance();

        if self.is_walking() {
            return;
        }

        if self.path_cursor >= self.path.len() {
            self.path.clear();
            self.path_cursor = 0;
        } else {
            let next = self.path[self.path_cursor];
            self.path_cursor += 1;
            self.goto(next);
        }
    }

    fn advance(&mut self) {
        if !self.is_walking() {
            return;
        }

        let dest_x = self.target.0 * CELL_SIZE;
        let dest_y = self.target.1 * CELL_SIZE;
        self.x = approach(self.x, dest_x, self.step);
        self.y = approach(self.y, dest_y, self.step);

        if self.x == dest_x && self.y == dest_y {
            self.phase = MotionPhase::Idle;
        }
    }
}

/// Moves `from` towards `to` by at most `step` without overshooting.
fn approach(from: i32, to: i32, step: i32) -> i32 {
    if from < to {
        (from + step).min(to)
    } else if from > to {
        (from - step).max(to)
    } else {
        from
    }
}
