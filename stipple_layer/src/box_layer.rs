// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Positions a child layer inside a sub-view.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::Rect;
use stipple_core::rect::from_xywh;
use stipple_core::staged::Staged;

use crate::lifecycle::{DrawParams, Layer, LayerLifecycles, UpdateParams};
use crate::tools::Tools;

/// Position and size of a [`BoxLayer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxCoords {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl BoxCoords {
    /// The coordinates as a rect.
    #[must_use]
    pub fn rect(&self) -> Rect {
        from_xywh(self.x, self.y, self.width, self.height)
    }
}

impl Default for BoxCoords {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

/// Gives its child a view of its own.
///
/// Setters stage new coordinates; the next update commits them. When the
/// committed coordinates changed, the whole parent view is reported damaged
/// along with whatever the child reports, so the old and new positions both
/// get repainted.
///
/// Cloning shares the box.
pub struct BoxLayer<C: ?Sized> {
    child: Rc<C>,
    coords: Rc<RefCell<Staged<BoxCoords>>>,
}

impl<C: ?Sized> Clone for BoxLayer<C> {
    fn clone(&self) -> Self {
        Self {
            child: self.child.clone(),
            coords: self.coords.clone(),
        }
    }
}

impl<C: ?Sized> fmt::Debug for BoxLayer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxLayer")
            .field("coords", &self.coords.borrow())
            .finish_non_exhaustive()
    }
}

impl<C: Layer + ?Sized + 'static> BoxLayer<C> {
    /// Wraps `child` at the default coordinates, a 100×100 box at the origin.
    #[must_use]
    pub fn new(child: Rc<C>) -> Self {
        Self::with_coords(child, BoxCoords::default())
    }

    /// Wraps `child` at `coords`.
    #[must_use]
    pub fn with_coords(child: Rc<C>, coords: BoxCoords) -> Self {
        Self {
            child,
            coords: Rc::new(RefCell::new(Staged::new(coords))),
        }
    }

    /// The wrapped layer.
    #[must_use]
    pub fn child(&self) -> &Rc<C> {
        &self.child
    }

    /// The staged coordinates.
    #[must_use]
    pub fn coords(&self) -> BoxCoords {
        *self.coords.borrow().get()
    }

    /// Stages new coordinates.
    pub fn set_coords(&self, coords: BoxCoords) {
        self.coords.borrow_mut().set(coords);
    }

    /// Stages a new left edge.
    pub fn set_x(&self, x: f64) {
        self.coords.borrow_mut().update(|c| c.x = x);
    }

    /// Stages a new top edge.
    pub fn set_y(&self, y: f64) {
        self.coords.borrow_mut().update(|c| c.y = y);
    }

    /// Stages a new width.
    pub fn set_width(&self, width: f64) {
        self.coords.borrow_mut().update(|c| c.width = width);
    }

    /// Stages a new height.
    pub fn set_height(&self, height: f64) {
        self.coords.borrow_mut().update(|c| c.height = height);
    }
}

impl<C: Layer + ?Sized + 'static> Layer for BoxLayer<C> {
    fn mount(&self, tools: &Tools) -> LayerLifecycles {
        let child = self.child.mount(tools);
        let update_child = child.clone();
        let draw_child = child.clone();
        let update_coords = self.coords.clone();
        let draw_coords = self.coords.clone();

        LayerLifecycles {
            update: Some(Rc::new(move |params: &UpdateParams| -> Option<Vec<Rect>> {
                let (changed, sub_view) = {
                    let mut coords = update_coords.borrow_mut();
                    (coords.commit(), coords.committed().rect())
                };
                let child_rects = update_child.run_update(&UpdateParams {
                    t: params.t,
                    view: sub_view,
                });
                if !changed {
                    return child_rects;
                }
                let mut rects = vec![params.view];
                rects.extend(child_rects.into_iter().flatten());
                Some(rects)
            })),
            draw: Some(Rc::new(move |params: &mut DrawParams<'_>| {
                let sub_view = draw_coords.borrow().committed().rect();
                draw_child.run_draw(&mut DrawParams {
                    t: params.t,
                    view: sub_view,
                    rect: params.rect,
                    ctx: &mut *params.ctx,
                });
            })),
            ..child
        }
    }
}
