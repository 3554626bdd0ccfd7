//! A* search over a [`GridMap`].
//!
//! Movement is 4-directional with unit cost per step and a Manhattan heuristic, which
//! matches how [`crate::MovementState`] walks: one orthogonal cell at a time.

use crate::grid::{Cell, GridMap};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Neighbour expansion order: up, right, down, left.
const NEIGHBOURS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

fn manhattan(a: Cell, b: Cell) -> u32 {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// Finds a shortest path from `start` to `goal`.
///
/// The returned path excludes `start` and ends with `goal`, so its length is the number
/// of steps to walk. Returns `Some(vec![])` when already at the goal and `None` when the
/// goal is blocked, out of bounds or unreachable.
///
/// Frontier ties on f-score go to the node with the lower heuristic, then to the one
/// pushed first, so identical inputs always produce the identical path.
pub fn find_path(grid: &GridMap, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    if !grid.is_walkable(goal.0, goal.1) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    // (f, h, insertion order, cell)
    let mut open: BinaryHeap<Reverse<(u32, u32, u64, Cell)>> = BinaryHeap::new();
    let mut best_cost: HashMap<Cell, u32> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut pushed: u64 = 0;

    let h = manhattan(start, goal);
    best_cost.insert(start, 0);
    open.push(Reverse((h, h, pushed, start)));

    while let Some(Reverse((_, _, _, current))) = open.pop() {
        if current == goal {
            return Some(reconstruct(&came_from, start, goal));
        }
        if !closed.insert(current) {
            continue;
        }

        let cost = best_cost.get(&current).copied().unwrap_or(0);
        for (dx, dy) in NEIGHBOURS {
            let next = (current.0 + dx, current.1 + dy);
            if closed.contains(&next) || !grid.is_walkable(next.0, next.1) {
                continue;
            }

            let next_cost = cost + 1;
            if best_cost.get(&next).is_some_and(|&known| known <= next_cost) {
                continue;
            }

            best_cost.insert(next, next_cost);
            came_from.insert(next, current);
            let h = manhattan(next, goal);
            pushed += 1;
            open.push(Reverse((next_cost + h, h, pushed, next)));
        }
    }

    None
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        if previous == start {
            break;
        }
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
