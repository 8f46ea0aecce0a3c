// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense cell grid used by the exact rect merge.

use alloc::vec;
use alloc::vec::Vec;

/// A rectangle of grid cells, in cell units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    /// Leftmost column.
    pub x: usize,
    /// Topmost row.
    pub y: usize,
    /// Number of columns.
    pub w: usize,
    /// Number of rows.
    pub h: usize,
}

impl CellRect {
    /// Whether `self` and `other` share a full edge: same width and column
    /// when stacked vertically, same height and row when side by side.
    #[must_use]
    pub fn is_perfect_neighbor(&self, other: &Self) -> bool {
        let same_column = self.w == other.w && self.x == other.x;
        let same_row = self.h == other.h && self.y == other.y;
        (same_column && (other.y + other.h == self.y || self.y + self.h == other.y))
            || (same_row && (self.x + self.w == other.x || other.x + other.w == self.x))
    }
}

/// A row-major `width × height` grid of values.
#[derive(Clone, Debug)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + PartialEq> Grid<T> {
    /// Creates a grid filled with `default`.
    #[must_use]
    pub fn new(width: usize, height: usize, default: T) -> Self {
        Self {
            width,
            height,
            data: vec![default; width * height],
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cells in row-major order.
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the value at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x)
    }

    /// Sets the value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the grid.
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) outside {}×{} grid",
            self.width,
            self.height
        );
        self.data[y * self.width + x] = value;
    }

    /// Sets every cell of `rect` to `value`.
    pub fn set_rect(&mut self, rect: CellRect, value: &T) {
        for x in rect.x..rect.x + rect.w {
            for y in rect.y..rect.y + rect.h {
                self.set(x, y, value.clone());
            }
        }
    }

    /// Measures the run of cells equal to the one at `(x, y)`, scanning right
    /// along row `y` and down along column `x`.
    ///
    /// Returns `None` when `(x, y)` is outside the grid.
    #[must_use]
    pub fn find_rect(&self, x: usize, y: usize) -> Option<CellRect> {
        let value = self.get(x, y)?;
        let w = (x..self.width)
            .take_while(|&xi| self.get(xi, y) == Some(value))
            .count();
        let h = (y..self.height)
            .take_while(|&yi| self.get(x, yi) == Some(value))
            .count();
        Some(CellRect { x, y, w, h })
    }

    /// Converts a row-major index to `(x, y)`.
    #[must_use]
    pub fn coords_from_index(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_outside_is_none() {
        let grid = Grid::new(2, 3, 0_u8);
        assert_eq!(grid.get(1, 2), Some(&0));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, 3), None);
    }

    #[test]
    fn find_rect_scans_row_and_column() {
        let mut grid = Grid::new(4, 4, 0_u8);
        grid.set_rect(
            CellRect {
                x: 1,
                y: 1,
                w: 2,
                h: 3,
            },
            &7,
        );
        assert_eq!(
            grid.find_rect(1, 1),
            Some(CellRect {
                x: 1,
                y: 1,
                w: 2,
                h: 3
            })
        );
        // Starting mid-region only sees the remaining part.
        assert_eq!(
            grid.find_rect(2, 2),
            Some(CellRect {
                x: 2,
                y: 2,
                w: 1,
                h: 2
            })
        );
        assert_eq!(grid.coords_from_index(9), (1, 2));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn set_outside_panics() {
        let mut grid = Grid::new(1, 1, 0_u8);
        grid.set(1, 0, 1);
    }

    #[test]
    fn perfect_neighbors() {
        let a = CellRect {
            x: 0,
            y: 0,
            w: 2,
            h: 1,
        };
        let below = CellRect {
            x: 0,
            y: 1,
            w: 2,
            h: 4,
        };
        let right = CellRect {
            x: 2,
            y: 0,
            w: 5,
            h: 1,
        };
        let offset = CellRect {
            x: 1,
            y: 1,
            w: 2,
            h: 1,
        };
        assert!(a.is_perfect_neighbor(&below), "stacked");
        assert!(below.is_perfect_neighbor(&a), "stacked, reversed");
        assert!(a.is_perfect_neighbor(&right), "side by side");
        assert!(right.is_perfect_neighbor(&a), "side by side, reversed");
        assert!(!a.is_perfect_neighbor(&offset), "shifted column");
    }
}
