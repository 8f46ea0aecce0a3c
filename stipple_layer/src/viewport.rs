// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observable host window size.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use kurbo::{Point, Rect, Size};
use stipple_core::subscriber::{SubscriberList, Subscription};

struct Inner {
    size: Cell<Size>,
    torn_down: Cell<bool>,
    listeners: SubscriberList<Rect>,
}

/// The size of the host window, shared by everything that lays out against
/// it.
///
/// Created once by the application and handed to layers through
/// [`Tools::with_viewport`](crate::Tools::with_viewport). The platform glue
/// calls [`resize`](Self::resize); layers read [`rect`](Self::rect) or
/// [`subscribe`](Self::subscribe) to changes.
///
/// Cloning shares the viewport.
#[derive(Clone)]
pub struct Viewport(Rc<Inner>);

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("size", &self.0.size.get())
            .field("torn_down", &self.0.torn_down.get())
            .field("listeners", &self.0.listeners.len())
            .finish()
    }
}

impl Viewport {
    /// Creates a viewport of the given size.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self(Rc::new(Inner {
            size: Cell::new(size),
            torn_down: Cell::new(false),
            listeners: SubscriberList::new(),
        }))
    }

    /// Current size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.0.size.get()
    }

    /// Current width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.size().width
    }

    /// Current height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.size().height
    }

    /// The viewport as a rect at the origin.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.size())
    }

    /// Records a new size and notifies subscribers when it changed.
    ///
    /// Ignored after [`teardown`](Self::teardown).
    pub fn resize(&self, size: Size) {
        if self.0.torn_down.get() {
            log::warn!("viewport resized after teardown");
            return;
        }
        if self.0.size.replace(size) != size {
            self.0.listeners.emit(&self.rect());
        }
    }

    /// Calls `callback` with the new rect after every size change.
    pub fn subscribe(&self, callback: impl Fn(&Rect) + 'static) -> Subscription {
        self.0.listeners.subscribe(callback)
    }

    /// Drops every subscriber and stops accepting resizes.
    pub fn teardown(&self) {
        self.0.torn_down.set(true);
        self.0.listeners.clear();
    }

    /// Whether [`teardown`](Self::teardown) was called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.0.torn_down.get()
    }
}
