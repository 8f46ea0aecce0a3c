// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame damage for partial re-rendering.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Rect;

/// A region of the frame that needs re-rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// The entire view needs redrawing.
    #[default]
    Full,
    /// A list of rectangles in device pixels that need redrawing.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame can be reused.
    None,
}

impl DamageRegion {
    /// Wraps the result of a layer update: `None` or an empty list means
    /// nothing to redraw.
    #[must_use]
    pub fn from_update(rects: Option<Vec<Rect>>) -> Self {
        match rects {
            Some(rects) if !rects.is_empty() => Self::Rects(rects),
            _ => Self::None,
        }
    }

    /// Returns `true` if no region needs redrawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Rects(a), Self::Rects(b)) => {
                let mut merged = a.clone();
                merged.extend_from_slice(b);
                *self = Self::Rects(merged);
            }
        }
    }

    /// The rects to draw for a frame whose drawable area is `view`.
    #[must_use]
    pub fn to_rects(&self, view: Rect) -> Vec<Rect> {
        match self {
            Self::Full => vec![view],
            Self::Rects(rects) => rects.clone(),
            Self::None => Vec::new(),
        }
    }
}
