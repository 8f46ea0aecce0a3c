// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lets a child work in logical pixels on a device-pixel frame.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use stipple_core::rect;
#[cfg(test)]
use stipple_render::Frame;

use crate::lifecycle::{DrawParams, Layer, LayerLifecycles, UpdateParams};
use crate::tools::Tools;

/// Scales its child's view down by the frame's pixel ratio, and its drawing
/// back up.
///
/// The ratio is read from the frame on every update and draw, so the child
/// follows when the frame moves between displays. Damage the child reports
/// is scaled back up to device pixels.
pub struct PixelRatio<C: ?Sized> {
    child: Rc<C>,
}

impl<C: ?Sized> Clone for PixelRatio<C> {
    fn clone(&self) -> Self {
        Self {
            child: self.child.clone(),
        }
    }
}

impl<C: ?Sized> fmt::Debug for PixelRatio<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelRatio").finish_non_exhaustive()
    }
}

impl<C: Layer + ?Sized + 'static> PixelRatio<C> {
    /// Wraps `child`.
    #[must_use]
    pub fn new(child: Rc<C>) -> Self {
        Self { child }
    }

    /// The wrapped layer.
    #[must_use]
    pub fn child(&self) -> &Rc<C> {
        &self.child
    }
}

impl<C: Layer + ?Sized + 'static> Layer for PixelRatio<C> {
    /// # Panics
    ///
    /// Panics if `tools` has no frame.
    fn mount(&self, tools: &Tools) -> LayerLifecycles {
        let update_frame = tools.frame();
        let draw_frame = update_frame.clone();
        let child = self.child.mount(tools);
        let update_child = child.clone();
        let draw_child = child.clone();

        LayerLifecycles {
            update: Some(Rc::new(move |params: &UpdateParams| -> Option<Vec<Rect>> {
                let r = update_frame.borrow().pixel_ratio();
                let rects = update_child.run_update(&UpdateParams {
                    t: params.t,
                    view: rect::scale(params.view, 1.0 / r),
                })?;
                Some(rects.into_iter().map(|x| rect::scale(x, r)).collect())
            })),
            draw: Some(Rc::new(move |params: &mut DrawParams<'_>| {
                let r = draw_frame.borrow().pixel_ratio();
                params.ctx.save();
                params.ctx.scale(r, r);
                draw_child.run_draw(&mut DrawParams {
                    t: params.t,
                    view: rect::scale(params.view, 1.0 / r),
                    rect: rect::scale(params.rect, 1.0 / r),
                    ctx: &mut *params.ctx,
                });
                params.ctx.restore();
            })),
            ..child
        }
    }
}
