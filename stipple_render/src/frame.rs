// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable surfaces synchronized to a host element.

use alloc::rc::Rc;
use core::cell::{Ref, RefCell};

use kurbo::{Point, Rect, Size};
use stipple_core::staged::Staged;

use crate::context::DrawContext;
use crate::surface::PixelSurface;

/// A drawable surface owned by a renderer.
///
/// The host element (a window, a canvas, an offscreen target) may change
/// size or pixel ratio at any time; [`update`](Self::update) applies such
/// changes once per frame and reports whether one happened.
pub trait Frame {
    /// The drawable rect in device pixels. The origin is always `(0, 0)`.
    fn view(&self) -> Rect;

    /// Device pixels per logical pixel.
    fn pixel_ratio(&self) -> f64;

    /// The drawing context for this frame's pixels.
    ///
    /// The context is shared separately from the frame, so drawing code may
    /// still borrow the frame to read its view or pixel ratio.
    fn context(&self) -> Rc<RefCell<dyn DrawContext>>;

    /// Applies pending size and ratio changes. Returns `true` if the view
    /// changed.
    fn update(&mut self) -> bool;

    /// Releases the surface. The frame is not drawn to afterwards.
    fn destroy(&mut self);
}

/// Logical size and pixel ratio of a frame's host element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameMetrics {
    /// Element size in logical pixels.
    pub size: Size,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f64,
}

/// A [`Frame`] backed by a [`PixelSurface`].
///
/// [`resize`](Self::resize) stages new metrics; the next
/// [`update`](Frame::update) commits them and reallocates the surface. A new
/// frame starts with its metrics staged, so the first update reports a
/// change and the whole view gets drawn.
#[derive(Debug)]
pub struct SoftwareFrame {
    name: Option<&'static str>,
    metrics: Staged<FrameMetrics>,
    outer_size: Size,
    view: Rect,
    surface: Rc<RefCell<PixelSurface>>,
    destroyed: bool,
}

impl SoftwareFrame {
    /// Creates a frame for an element of `size` logical pixels.
    #[must_use]
    pub fn new(size: Size, pixel_ratio: f64) -> Self {
        let mut metrics = Staged::new(FrameMetrics {
            size: Size::ZERO,
            pixel_ratio: 1.0,
        });
        metrics.set(FrameMetrics { size, pixel_ratio });
        Self {
            name: None,
            metrics,
            outer_size: Size::ZERO,
            view: Rect::ZERO,
            surface: Rc::new(RefCell::new(PixelSurface::new(0, 0))),
            destroyed: false,
        }
    }

    /// Attaches a debug name.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// The debug name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Stages a new element size and pixel ratio.
    pub fn resize(&mut self, size: Size, pixel_ratio: f64) {
        self.metrics.set(FrameMetrics { size, pixel_ratio });
    }

    /// The committed metrics.
    #[must_use]
    pub fn metrics(&self) -> FrameMetrics {
        *self.metrics.committed()
    }

    /// Logical size matching the device-pixel view exactly.
    #[must_use]
    pub fn outer_size(&self) -> Size {
        self.outer_size
    }

    /// The pixels.
    ///
    /// # Panics
    ///
    /// Panics if the surface is being drawn to.
    #[must_use]
    pub fn surface(&self) -> Ref<'_, PixelSurface> {
        self.surface.borrow()
    }

    /// Whether [`destroy`](Frame::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Frame for SoftwareFrame {
    fn view(&self) -> Rect {
        self.view
    }

    fn pixel_ratio(&self) -> f64 {
        self.metrics.committed().pixel_ratio
    }

    fn context(&self) -> Rc<RefCell<dyn DrawContext>> {
        self.surface.clone()
    }

    fn update(&mut self) -> bool {
        if self.destroyed || !self.metrics.commit() {
            return false;
        }
        let FrameMetrics { size, pixel_ratio } = *self.metrics.committed();
        let inner = (size * pixel_ratio).round();
        self.outer_size = inner / pixel_ratio;
        self.view = Rect::from_origin_size(Point::ORIGIN, inner);
        self.surface
            .borrow_mut()
            .resize(pixel_len(inner.width), pixel_len(inner.height));
        log::debug!(
            "frame {} resized to {}x{} device pixels (ratio {pixel_ratio})",
            self.name.unwrap_or("<unnamed>"),
            inner.width,
            inner.height
        );
        true
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.surface.borrow_mut().resize(0, 0);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "frame sizes are rounded and far below u32::MAX"
)]
fn pixel_len(v: f64) -> u32 {
    v.max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_reports_change() {
        let mut frame = SoftwareFrame::new(Size::new(100.0, 50.0), 2.0);
        assert_eq!(frame.view(), Rect::ZERO);
        assert!(frame.update());
        assert_eq!(frame.view(), Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(frame.surface().width(), 200);
        assert!(!frame.update(), "no change staged");
    }

    #[test]
    fn resize_rounds_inner_size() {
        let mut frame = SoftwareFrame::new(Size::new(10.0, 10.0), 1.0);
        frame.update();
        frame.resize(Size::new(10.3, 7.0), 1.5);
        assert_eq!(frame.pixel_ratio(), 1.0, "staged only");
        assert!(frame.update());
        assert_eq!(frame.view(), Rect::new(0.0, 0.0, 15.0, 11.0));
        assert_eq!(frame.pixel_ratio(), 1.5);
        assert_eq!(frame.outer_size(), Size::new(10.0, 11.0 / 1.5));
    }

    #[test]
    fn context_draws_into_surface_while_frame_is_borrowed() {
        use crate::context::Color;

        let mut frame = SoftwareFrame::new(Size::new(4.0, 4.0), 1.0);
        frame.update();
        let ctx = frame.context();
        let frame = &frame;
        let mut ctx = ctx.borrow_mut();
        ctx.set_fill(Color::WHITE);
        ctx.fill_rect(frame.view());
        drop(ctx);
        assert_eq!(frame.surface().pixel(3, 3), Some(Color::WHITE));
    }

    #[test]
    fn destroyed_frame_never_updates() {
        let mut frame = SoftwareFrame::new(Size::new(10.0, 10.0), 1.0).with_name("main");
        frame.destroy();
        assert!(frame.is_destroyed());
        assert!(!frame.update());
        assert_eq!(frame.name(), Some("main"));
    }
}
