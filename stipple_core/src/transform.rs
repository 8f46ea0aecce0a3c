// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable translate / scale stacks for mapping rects between subtrees.
//!
//! A [`Transform`] is an ordered list of [`TransformOp`]s applied left to
//! right. Translation moves a rect's origin; scaling multiplies its extent and
//! leaves the origin where it is. Origin and extent are therefore transformed
//! independently, which keeps [`Transform::inverse`] exact.
//!
//! Builders never mutate: `translate` and `scale` return a new transform and
//! the old one stays valid. Clones share storage.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::OnceCell;
use core::fmt;

use kurbo::{Rect, Vec2};

/// One step of a [`Transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformOp {
    /// Offsets the rect origin.
    Translate {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// Multiplies the rect width and height.
    Scale {
        /// Horizontal factor.
        x: f64,
        /// Vertical factor.
        y: f64,
    },
}

impl TransformOp {
    /// Applies this op to `rect`.
    #[inline]
    #[must_use]
    pub fn apply(self, rect: Rect) -> Rect {
        match self {
            Self::Translate { x, y } => rect + Vec2::new(x, y),
            Self::Scale { x, y } => Rect::new(
                rect.x0,
                rect.y0,
                rect.x0 + rect.width() * x,
                rect.y0 + rect.height() * y,
            ),
        }
    }

    /// The op that undoes this one.
    ///
    /// # Panics
    ///
    /// Panics on a zero scale factor.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Translate { x, y } => Self::Translate { x: -x, y: -y },
            Self::Scale { x, y } => {
                assert!(
                    x != 0.0 && y != 0.0,
                    "cannot invert a zero scale ({x}, {y})"
                );
                Self::Scale {
                    x: 1.0 / x,
                    y: 1.0 / y,
                }
            }
        }
    }
}

struct Inner {
    ops: Vec<TransformOp>,
    inverse: OnceCell<Transform>,
}

/// An immutable, cheaply clonable list of [`TransformOp`]s.
#[derive(Clone)]
pub struct Transform(Rc<Inner>);

impl Transform {
    /// The empty transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::from_ops(Vec::new())
    }

    /// A transform holding exactly `ops`.
    #[must_use]
    pub fn from_ops(ops: Vec<TransformOp>) -> Self {
        Self(Rc::new(Inner {
            ops,
            inverse: OnceCell::new(),
        }))
    }

    /// A single translation.
    #[must_use]
    pub fn translation(x: f64, y: f64) -> Self {
        Self::identity().translate(x, y)
    }

    /// A single scale.
    #[must_use]
    pub fn scaling(x: f64, y: f64) -> Self {
        Self::identity().scale(x, y)
    }

    /// Returns a new transform with a translation appended.
    #[must_use]
    pub fn translate(&self, x: f64, y: f64) -> Self {
        self.push(TransformOp::Translate { x, y })
    }

    /// Returns a new transform with a scale appended.
    #[must_use]
    pub fn scale(&self, x: f64, y: f64) -> Self {
        self.push(TransformOp::Scale { x, y })
    }

    /// Returns `self` followed by `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        let mut ops = self.0.ops.clone();
        ops.extend_from_slice(&next.0.ops);
        Self::from_ops(ops)
    }

    fn push(&self, op: TransformOp) -> Self {
        let mut ops = Vec::with_capacity(self.0.ops.len() + 1);
        ops.extend_from_slice(&self.0.ops);
        ops.push(op);
        Self::from_ops(ops)
    }

    /// The ops, in application order.
    #[must_use]
    pub fn ops(&self) -> &[TransformOp] {
        &self.0.ops
    }

    /// Whether this transform has no ops.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.ops.is_empty()
    }

    /// The transform that undoes `self`: the ops reversed, each inverted.
    ///
    /// Computed on first use, then cached and shared by clones.
    ///
    /// # Panics
    ///
    /// Panics if any scale factor is zero.
    #[must_use]
    pub fn inverse(&self) -> &Self {
        self.0.inverse.get_or_init(|| {
            Self::from_ops(self.0.ops.iter().rev().map(|op| op.inverse()).collect())
        })
    }

    /// Maps `rect` through every op in order.
    #[must_use]
    pub fn apply(&self, rect: Rect) -> Rect {
        self.0.ops.iter().fold(rect, |r, op| op.apply(r))
    }

    /// Maps each rect of `rects`.
    #[must_use]
    pub fn apply_all(&self, rects: &[Rect]) -> Vec<Rect> {
        rects.iter().map(|r| self.apply(*r)).collect()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.0.ops == other.0.ops
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").field(&self.0.ops).finish()
    }
}
