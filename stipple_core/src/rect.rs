// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned rectangle algebra for damage tracking.
//!
//! Rects are plain [`kurbo::Rect`] values. Nothing here normalizes its
//! inputs: [`intersect`] of two disjoint rects yields a rect with a
//! non-positive extent, and [`clip`] is the function that turns that into
//! `None`.
//!
//! Two merges are provided. [`merge_intersecting_rects`] is cheap and loose:
//! anything that intersects is replaced by its bounding box.
//! [`merge_overlapping_rects`] is exact: it returns a disjoint cover of the
//! same area, built on a grid of all the input edges.

use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use crate::grid::{CellRect, Grid};

/// Creates a rect from origin and size.
#[inline]
#[must_use]
pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect::new(x, y, x + width, y + height)
}

/// Whether `a` and `b` overlap with a positive area.
///
/// Touching edges do not count.
#[inline]
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    b.x1 > a.x0 && b.y1 > a.y0 && b.x0 < a.x1 && b.y0 < a.y1
}

/// The overlap of `a` and `b`, which may have a zero or negative extent.
#[inline]
#[must_use]
pub fn intersect(a: Rect, b: Rect) -> Rect {
    Rect::new(
        a.x0.max(b.x0),
        a.y0.max(b.y0),
        a.x1.min(b.x1),
        a.y1.min(b.y1),
    )
}

/// Clips `rect` to `clip`.
///
/// Returns `None` when nothing is left, and `rect` itself when it already
/// lies inside `clip`.
#[must_use]
pub fn clip(rect: Rect, clip: Rect) -> Option<Rect> {
    let inter = intersect(rect, clip);
    if inter.width() <= 0.0 || inter.height() <= 0.0 {
        return None;
    }
    if inter == rect {
        return Some(rect);
    }
    Some(inter)
}

/// The bounding box of `a` and `b`.
#[inline]
#[must_use]
pub fn union(a: Rect, b: Rect) -> Rect {
    Rect::new(
        a.x0.min(b.x0),
        a.y0.min(b.y0),
        a.x1.max(b.x1),
        a.y1.max(b.y1),
    )
}

/// Moves `rect` by `(dx, dy)`.
#[inline]
#[must_use]
pub fn offset(rect: Rect, dx: f64, dy: f64) -> Rect {
    rect + Vec2::new(dx, dy)
}

/// Scales origin and size of `rect` by `factor`.
#[inline]
#[must_use]
pub fn scale(rect: Rect, factor: f64) -> Rect {
    rect.scale_from_origin(factor)
}

/// Grows `rect` by `margin` on every side.
#[inline]
#[must_use]
pub fn expand(rect: Rect, margin: f64) -> Rect {
    Rect::new(
        rect.x0 - margin,
        rect.y0 - margin,
        rect.x1 + margin,
        rect.y1 + margin,
    )
}

/// Snaps every edge of `rect` to the nearest integer.
#[inline]
#[must_use]
pub fn round(rect: Rect) -> Rect {
    rect.round()
}

/// Whether `a` and `b` share a full edge.
///
/// That is: same width and column with one directly above the other, or same
/// height and row with one directly beside the other.
#[must_use]
pub fn are_perfect_neighbors(a: Rect, b: Rect) -> bool {
    let same_column = a.width() == b.width() && a.x0 == b.x0;
    let same_row = a.height() == b.height() && a.y0 == b.y0;
    (same_column && (a.y1 == b.y0 || b.y1 == a.y0))
        || (same_row && (a.x1 == b.x0 || b.x1 == a.x0))
}

/// Merges rects until no two in the result intersect.
///
/// Each input is taken in turn; if it intersects accepted rects, they are
/// all replaced by their bounding box, which goes back into the queue along
/// with the untouched accepted rects. Quadratic in the worst case, meant for
/// short damage lists.
#[must_use]
pub fn merge_intersecting_rects(rects: &[Rect]) -> Vec<Rect> {
    let mut queue: VecDeque<Rect> = rects.iter().copied().collect();
    let mut result: Vec<Rect> = Vec::new();
    while let Some(rect) = queue.pop_front() {
        if !result.iter().any(|r| intersects(*r, rect)) {
            result.push(rect);
            continue;
        }
        let (hit, rest): (Vec<Rect>, Vec<Rect>) =
            result.drain(..).partition(|r| intersects(*r, rect));
        let merged = hit.into_iter().fold(rect, union);
        queue.push_back(merged);
        queue.extend(rest);
    }
    result
}

/// Computes an exact disjoint cover of the area of `rects`.
///
/// Rects with a non-positive width or height are ignored. All distinct
/// vertical and horizontal edges define a grid; every covered cell receives
/// its own id, then neighboring cell blocks with matching extents are fused,
/// first horizontally until nothing changes, then vertically until nothing
/// changes. The surviving blocks are mapped back to coordinates.
#[must_use]
pub fn merge_overlapping_rects(rects: &[Rect]) -> Vec<Rect> {
    let boxes: Vec<Rect> = rects
        .iter()
        .copied()
        .filter(|r| r.width() > 0.0 && r.height() > 0.0)
        .collect();
    if boxes.is_empty() {
        return Vec::new();
    }

    let xs = sorted_edges(boxes.iter().flat_map(|r| [r.x0, r.x1]));
    let ys = sorted_edges(boxes.iter().flat_map(|r| [r.y0, r.y1]));
    let mut grid: Grid<Option<u32>> = Grid::new(xs.len() - 1, ys.len() - 1, None);

    let mut next_id = 0_u32;
    for b in &boxes {
        let (Some(left), Some(right), Some(top), Some(bottom)) = (
            edge_index(&xs, b.x0),
            edge_index(&xs, b.x1),
            edge_index(&ys, b.y0),
            edge_index(&ys, b.y1),
        ) else {
            continue;
        };
        for xi in left..right {
            for yi in top..bottom {
                if grid.get(xi, yi) == Some(&None) {
                    grid.set(xi, yi, Some(next_id));
                    next_id += 1;
                }
            }
        }
    }

    while expand_cells(&mut grid, Direction::Horizontal) {}
    while expand_cells(&mut grid, Direction::Vertical) {}

    cell_blocks(&grid)
        .into_iter()
        .map(|c| Rect::new(xs[c.x], ys[c.y], xs[c.x + c.w], ys[c.y + c.h]))
        .collect()
}

#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
}

fn sorted_edges(edges: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut edges: Vec<f64> = edges.collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    edges
}

fn edge_index(edges: &[f64], value: f64) -> Option<usize> {
    edges.binary_search_by(|e| e.total_cmp(&value)).ok()
}

/// Yields one block per distinct id, in row-major order of first appearance.
fn cell_blocks(grid: &Grid<Option<u32>>) -> Vec<CellRect> {
    let mut seen = BTreeSet::new();
    let mut blocks = Vec::new();
    for (i, cell) in grid.data().iter().enumerate() {
        let Some(id) = *cell else { continue };
        if !seen.insert(id) {
            continue;
        }
        let (x, y) = grid.coords_from_index(i);
        if let Some(block) = grid.find_rect(x, y) {
            blocks.push(block);
        }
    }
    blocks
}

/// Performs at most one fusion; returns whether the grid changed.
fn expand_cells(grid: &mut Grid<Option<u32>>, direction: Direction) -> bool {
    for block in cell_blocks(grid) {
        let Some(id) = grid.get(block.x, block.y).copied().flatten() else {
            continue;
        };
        let (nx, ny) = match direction {
            Direction::Horizontal => (block.x + block.w, block.y),
            Direction::Vertical => (block.x, block.y + block.h),
        };
        if grid.get(nx, ny).copied().flatten().is_none() {
            continue;
        }
        let Some(neighbor) = grid.find_rect(nx, ny) else {
            continue;
        };
        if block.is_perfect_neighbor(&neighbor) {
            grid.set_rect(neighbor, &Some(id));
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::vec;

    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn r(x: f64, y: f64, w: f64, h: f64) -> Rect {
        from_xywh(x, y, w, h)
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        assert!(!intersects(r(0., 0., 10., 10.), r(10., 0., 10., 10.)));
        assert!(intersects(r(0., 0., 10., 10.), r(9., 9., 10., 10.)));
    }

    #[test]
    fn intersect_may_be_negative() {
        let i = intersect(r(0., 0., 10., 10.), r(20., 20., 5., 5.));
        assert_eq!(i, Rect::new(20., 20., 10., 10.));
        assert!(i.width() < 0.0, "disjoint rects yield a negative width");
    }

    #[test]
    fn clip_cases() {
        let view = r(0., 0., 100., 100.);
        assert_eq!(clip(r(10., 10., 20., 20.), view), Some(r(10., 10., 20., 20.)));
        assert_eq!(clip(r(90., 90., 20., 20.), view), Some(r(90., 90., 10., 10.)));
        assert_eq!(clip(r(100., 0., 20., 20.), view), None);
        assert_eq!(clip(r(200., 200., 20., 20.), view), None);
    }

    #[test]
    fn helpers() {
        assert_eq!(union(r(0., 0., 1., 1.), r(5., 5., 1., 1.)), r(0., 0., 6., 6.));
        assert_eq!(offset(r(1., 2., 3., 4.), 10., 20.), r(11., 22., 3., 4.));
        assert_eq!(scale(r(1., 2., 3., 4.), 2.), r(2., 4., 6., 8.));
        assert_eq!(expand(r(10., 10., 5., 5.), 2.), r(8., 8., 9., 9.));
        assert_eq!(round(Rect::new(0.4, 0.6, 9.5, 10.2)), Rect::new(0., 1., 10., 10.));
    }

    #[test]
    fn perfect_neighbor_cases() {
        let a = r(0., 0., 10., 5.);
        assert!(are_perfect_neighbors(a, r(0., 5., 10., 20.)), "below");
        assert!(are_perfect_neighbors(a, r(0., -3., 10., 3.)), "above");
        assert!(are_perfect_neighbors(a, r(10., 0., 1., 5.)), "right");
        assert!(are_perfect_neighbors(a, r(-4., 0., 4., 5.)), "left");
        assert!(!are_perfect_neighbors(a, r(0., 5., 9., 20.)), "width differs");
        assert!(!are_perfect_neighbors(a, r(11., 0., 1., 5.)), "gap");
    }

    #[test]
    fn merge_intersecting_chains() {
        // a and c are disjoint but both touch b, so all three collapse.
        let merged = merge_intersecting_rects(&[
            r(0., 0., 10., 10.),
            r(20., 20., 10., 10.),
            r(5., 5., 20., 20.),
        ]);
        assert_eq!(merged, vec![r(0., 0., 30., 30.)]);
    }

    #[test]
    fn merge_intersecting_keeps_disjoint() {
        let input = [r(0., 0., 10., 10.), r(10., 0., 10., 10.)];
        assert_eq!(merge_intersecting_rects(&input), input.to_vec());
        assert!(merge_intersecting_rects(&[]).is_empty());
    }

    #[test]
    fn merge_overlapping_fuses_cross() {
        // A horizontal bar over a vertical bar.
        let merged = merge_overlapping_rects(&[r(0., 10., 30., 10.), r(10., 0., 10., 30.)]);
        assert_eq!(
            merged,
            vec![r(10., 0., 10., 10.), r(0., 10., 30., 10.), r(10., 20., 10., 10.)]
        );
    }

    #[test]
    fn merge_overlapping_collapses_adjacent() {
        let merged = merge_overlapping_rects(&[r(0., 0., 10., 10.), r(10., 0., 10., 10.)]);
        assert_eq!(merged, vec![r(0., 0., 20., 10.)]);
    }

    #[test]
    fn merge_overlapping_drops_empty() {
        assert!(merge_overlapping_rects(&[r(0., 0., 0., 10.), r(5., 5., 3., -1.)]).is_empty());
        assert!(merge_overlapping_rects(&[]).is_empty());
    }

    #[test]
    fn merge_overlapping_handles_long_staircase() {
        // Each square adds an L-shaped strip of 10 + 9 unit cells.
        let stairs: Vec<Rect> = (0..48).map(|i| r(f64::from(i), f64::from(i), 10., 10.)).collect();
        let merged = merge_overlapping_rects(&stairs);
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                assert!(!intersects(*a, *b), "{a:?} overlaps {b:?}");
            }
        }
        let area: f64 = merged.iter().map(Rect::area).sum();
        assert_eq!(area, 100. + 47. * 19.);
    }

    fn rects_from(raw: &[(u8, u8, u8, u8)]) -> Vec<Rect> {
        raw.iter()
            .map(|&(x, y, w, h)| {
                r(
                    f64::from(x % 16),
                    f64::from(y % 16),
                    f64::from(w % 8),
                    f64::from(h % 8),
                )
            })
            .collect()
    }

    fn covered_cells(rects: &[Rect]) -> Vec<(u32, u32)> {
        let mut cells = Vec::new();
        for x in 0..24_u32 {
            for y in 0..24_u32 {
                let probe = r(f64::from(x), f64::from(y), 1., 1.);
                if rects
                    .iter()
                    .any(|rect| rect.width() > 0.0 && rect.height() > 0.0 && intersects(*rect, probe))
                {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    #[quickcheck]
    fn exact_merge_is_disjoint_cover(raw: Vec<(u8, u8, u8, u8)>) -> TestResult {
        if raw.len() > 12 {
            return TestResult::discard();
        }
        let input = rects_from(&raw);
        let merged = merge_overlapping_rects(&input);
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                if intersects(*a, *b) {
                    return TestResult::failed();
                }
            }
        }
        let input_area = covered_cells(&input).len();
        let merged_area: f64 = merged.iter().map(Rect::area).sum();
        TestResult::from_bool(
            covered_cells(&merged) == covered_cells(&input)
                && (merged_area - input_area as f64).abs() < 1e-9,
        )
    }

    #[quickcheck]
    fn loose_merge_is_disjoint_superset(raw: Vec<(u8, u8, u8, u8)>) -> TestResult {
        if raw.len() > 12 {
            return TestResult::discard();
        }
        let input: Vec<Rect> = rects_from(&raw)
            .into_iter()
            .filter(|r| r.width() > 0.0 && r.height() > 0.0)
            .collect();
        let merged = merge_intersecting_rects(&input);
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                if intersects(*a, *b) {
                    return TestResult::failed();
                }
            }
        }
        let covered = input
            .iter()
            .all(|rect| merged.iter().any(|m| clip(*rect, *m) == Some(*rect)));
        TestResult::from_bool(covered)
    }
}
