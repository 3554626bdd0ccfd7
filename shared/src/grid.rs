//! Walkability grid for a tile map.
//!
//! The grid is loaded once at startup and never resized afterwards, so it can be
//! shared between every session behind an `Arc` without any locking.

use crate::CELL_SIZE;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A grid cell coordinate (column, row).
pub type Cell = (i32, i32);

#[derive(Debug, Error)]
pub enum GridError {
    #[error("failed to read walk file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected an integer, found {value:?}")]
    InvalidValue { line: usize, value: String },
    #[error("walk file ended after {found} of {expected} cells")]
    TooShort { expected: usize, found: usize },
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    Empty { width: usize, height: usize },
    #[error("grid dimensions {width}x{height} are too large")]
    TooLarge { width: usize, height: usize },
}

/// Binary walkability flags for a `width` x `height` grid of 32px cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    width: usize,
    height: usize,
    /// Stored column-major, matching the walk file: index = x * height + y.
    walkable: Vec<bool>,
}

impl GridMap {
    /// Creates a grid where every cell is walkable.
    pub fn open(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            walkable: vec![true; width * height],
        }
    }

    /// Builds a grid from rows of text, `#` marking an obstacle and anything else
    /// being walkable. All rows must have the same length.
    ///
    /// Mostly useful for tests, where a picture of the map reads better than
    /// a list of coordinates.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        let mut grid = Self::open(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate().take(width) {
                if ch == '#' {
                    grid.walkable[x * height + y] = false;
                }
            }
        }
        grid
    }

    /// Number of cells a map image of the given pixel size is divided into.
    pub fn cells_for_pixels(pixel_width: u32, pixel_height: u32) -> (usize, usize) {
        (
            (pixel_width / CELL_SIZE as u32) as usize + 1,
            (pixel_height / CELL_SIZE as u32) as usize + 1,
        )
    }

    /// Parses a walk file: one integer per line, x outer and y inner,
    /// `0` meaning walkable and anything else an obstacle.
    ///
    /// Lines past `width * height` are ignored.
    pub fn parse(text: &str, width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty { width, height });
        }

        let expected = width
            .checked_mul(height)
            .ok_or(GridError::TooLarge { width, height })?;
        // Every cell needs at least one byte of input, so the file bounds the allocation.
        let mut walkable = Vec::with_capacity(expected.min(text.len()));
        for (index, line) in text.lines().take(expected).enumerate() {
            let trimmed = line.trim();
            let value: i64 = trimmed.parse().map_err(|_| GridError::InvalidValue {
                line: index + 1,
                value: trimmed.to_string(),
            })?;
            walkable.push(value == 0);
        }

        if walkable.len() < expected {
            return Err(GridError::TooShort {
                expected,
                found: walkable.len(),
            });
        }

        Ok(Self {
            width,
            height,
            walkable,
        })
    }

    /// Reads and parses a walk file from disk.
    pub fn load(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self, GridError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Whether a character may stand on `(x, y)`. Out-of-bounds cells are never walkable.
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        self.walkable[x as usize * self.height + y as usize]
    }
}
