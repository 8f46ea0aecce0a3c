// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer and input event model.
//!
//! Layers see input in two shapes. [`Pointer`] is the current position of
//! every active pointer, refreshed each frame and passed through the layer
//! stack as a pipeline. [`Event`] is a discrete transition (down, up, wheel,
//! ...) dispatched top-most layer first until one handles it.
//!
//! [`PointerCaptures`] records which target owns a pointer between a down
//! and the matching up.

use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::fmt;

/// Identifier of a pointer (mouse, pen, touch contact) as reported by the
/// platform.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointerId(pub u32);

impl fmt::Debug for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointerId({})", self.0)
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pointer position for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    /// Which pointer.
    pub pointer_id: PointerId,
    /// Horizontal position in frame coordinates.
    pub x: f64,
    /// Vertical position in frame coordinates.
    pub y: f64,
    /// Whether this is the primary pointer of its kind.
    pub primary: bool,
}

/// A discrete input event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// A pointer entered the surface.
    PointerEnter {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// A button was pressed or a contact started.
    PointerDown {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// A button was released or a contact ended.
    PointerUp {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// A pointer moved.
    PointerMove {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// The platform cancelled a pointer.
    PointerCancel {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// A pointer left the surface.
    PointerLeave {
        /// Which pointer.
        pointer_id: PointerId,
    },
    /// A scroll wheel or trackpad scroll.
    Wheel {
        /// Horizontal delta.
        delta_x: f64,
        /// Vertical delta.
        delta_y: f64,
    },
}

impl Event {
    /// The pointer this event is about, if any.
    #[must_use]
    pub fn pointer_id(&self) -> Option<PointerId> {
        match *self {
            Self::PointerEnter { pointer_id }
            | Self::PointerDown { pointer_id }
            | Self::PointerUp { pointer_id }
            | Self::PointerMove { pointer_id }
            | Self::PointerCancel { pointer_id }
            | Self::PointerLeave { pointer_id } => Some(pointer_id),
            Self::Wheel { .. } => None,
        }
    }
}

/// Pointer ownership table.
///
/// Cloning shares the table.
pub struct PointerCaptures<T> {
    captures: Rc<RefCell<BTreeMap<PointerId, T>>>,
}

impl<T> Clone for PointerCaptures<T> {
    fn clone(&self) -> Self {
        Self {
            captures: self.captures.clone(),
        }
    }
}

impl<T> Default for PointerCaptures<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PointerCaptures<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.captures.borrow().keys())
            .finish()
    }
}

impl<T> PointerCaptures<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            captures: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    /// Gives `pointer_id` to `target` until the returned [`Capture`] is
    /// released.
    ///
    /// # Panics
    ///
    /// Panics if the pointer is already captured.
    pub fn capture(&self, target: T, pointer_id: PointerId) -> Capture<T> {
        let mut captures = self.captures.borrow_mut();
        assert!(
            !captures.contains_key(&pointer_id),
            "Pointer {pointer_id} already captured"
        );
        captures.insert(pointer_id, target);
        Capture {
            captures: Rc::downgrade(&self.captures),
            pointer_id,
        }
    }

    /// Whether `pointer_id` is captured.
    #[must_use]
    pub fn has_capture(&self, pointer_id: PointerId) -> bool {
        self.captures.borrow().contains_key(&pointer_id)
    }

    /// The target holding `pointer_id`.
    #[must_use]
    pub fn get(&self, pointer_id: PointerId) -> Option<T>
    where
        T: Clone,
    {
        self.captures.borrow().get(&pointer_id).cloned()
    }
}

/// A held pointer capture.
#[must_use = "dropping a Capture keeps the pointer captured; call `release`"]
pub struct Capture<T> {
    captures: Weak<RefCell<BTreeMap<PointerId, T>>>,
    pointer_id: PointerId,
}

impl<T> fmt::Debug for Capture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("pointer_id", &self.pointer_id)
            .finish_non_exhaustive()
    }
}

impl<T> Capture<T> {
    /// The captured pointer.
    #[must_use]
    pub fn pointer_id(&self) -> PointerId {
        self.pointer_id
    }

    /// Frees the pointer.
    pub fn release(self) {
        let Some(captures) = self.captures.upgrade() else {
            return;
        };
        if captures.borrow_mut().remove(&self.pointer_id).is_none() {
            log::warn!("releasing pointer {} which is not captured", self.pointer_id);
        }
    }
}
