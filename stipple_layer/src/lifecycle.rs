// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers and their per-frame lifecycle callbacks.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use stipple_core::pointer::{Event, Pointer};
use stipple_render::DrawContext;

use crate::tools::Tools;

/// Something that can be mounted into a renderer.
///
/// Mounting hands the layer a [`Tools`] context and returns the callbacks the
/// renderer drives every frame.
pub trait Layer {
    /// Mounts the layer.
    fn mount(&self, tools: &Tools) -> LayerLifecycles;
}

impl<L: Layer + ?Sized> Layer for Rc<L> {
    fn mount(&self, tools: &Tools) -> LayerLifecycles {
        (**self).mount(tools)
    }
}

/// Inputs of the update callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateParams {
    /// Frame time in milliseconds.
    pub t: f64,
    /// The area this layer occupies.
    pub view: Rect,
}

/// Inputs of the draw callback.
pub struct DrawParams<'a> {
    /// Frame time in milliseconds.
    pub t: f64,
    /// The area this layer occupies.
    pub view: Rect,
    /// The damaged area being redrawn. Drawing outside of it is allowed but
    /// wasted.
    pub rect: Rect,
    /// Where to draw.
    pub ctx: &'a mut dyn DrawContext,
}

impl fmt::Debug for DrawParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawParams")
            .field("t", &self.t)
            .field("view", &self.view)
            .field("rect", &self.rect)
            .finish_non_exhaustive()
    }
}

/// Receives this frame's pointers and returns the ones later layers see.
pub type PointersFn = dyn Fn(Vec<Pointer>) -> Vec<Pointer>;
/// Handles a discrete event; `true` stops propagation.
pub type EventFn = dyn Fn(&Event) -> bool;
/// Advances state and reports the rects to redraw, if any.
pub type UpdateFn = dyn Fn(&UpdateParams) -> Option<Vec<Rect>>;
/// Paints one damaged rect.
pub type DrawFn = dyn Fn(&mut DrawParams<'_>);
/// Releases whatever `mount` acquired.
pub type CleanupFn = dyn Fn();

/// The callbacks of one mounted layer. Every callback is optional.
///
/// Cloning is cheap and shares the callbacks.
#[derive(Clone, Default)]
pub struct LayerLifecycles {
    /// Pointer pipeline stage.
    pub pointers: Option<Rc<PointersFn>>,
    /// Event handler.
    pub event: Option<Rc<EventFn>>,
    /// Per-frame update.
    pub update: Option<Rc<UpdateFn>>,
    /// Per-rect draw.
    pub draw: Option<Rc<DrawFn>>,
    /// Unmount.
    pub cleanup: Option<Rc<CleanupFn>>,
}

impl fmt::Debug for LayerLifecycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerLifecycles")
            .field("pointers", &self.pointers.is_some())
            .field("event", &self.event.is_some())
            .field("update", &self.update.is_some())
            .field("draw", &self.draw.is_some())
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

impl LayerLifecycles {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pointer pipeline stage.
    #[must_use]
    pub fn with_pointers(mut self, f: impl Fn(Vec<Pointer>) -> Vec<Pointer> + 'static) -> Self {
        self.pointers = Some(Rc::new(f));
        self
    }

    /// Sets the event handler.
    #[must_use]
    pub fn with_event(mut self, f: impl Fn(&Event) -> bool + 'static) -> Self {
        self.event = Some(Rc::new(f));
        self
    }

    /// Sets the update callback.
    #[must_use]
    pub fn with_update(
        mut self,
        f: impl Fn(&UpdateParams) -> Option<Vec<Rect>> + 'static,
    ) -> Self {
        self.update = Some(Rc::new(f));
        self
    }

    /// Sets the draw callback.
    #[must_use]
    pub fn with_draw(mut self, f: impl Fn(&mut DrawParams<'_>) + 'static) -> Self {
        self.draw = Some(Rc::new(f));
        self
    }

    /// Sets the cleanup callback.
    #[must_use]
    pub fn with_cleanup(mut self, f: impl Fn() + 'static) -> Self {
        self.cleanup = Some(Rc::new(f));
        self
    }

    /// Runs the pointer stage, passing `pointers` through when there is none.
    pub fn dispatch_pointers(&self, pointers: Vec<Pointer>) -> Vec<Pointer> {
        match &self.pointers {
            Some(f) => f(pointers),
            None => pointers,
        }
    }

    /// Runs the event handler. Unhandled without one.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        self.event.as_ref().is_some_and(|f| f(event))
    }

    /// Runs the update callback.
    pub fn run_update(&self, params: &UpdateParams) -> Option<Vec<Rect>> {
        self.update.as_ref().and_then(|f| f(params))
    }

    /// Runs the draw callback.
    pub fn run_draw(&self, params: &mut DrawParams<'_>) {
        if let Some(f) = &self.draw {
            f(params);
        }
    }

    /// Runs the cleanup callback.
    pub fn run_cleanup(&self) {
        if let Some(f) = &self.cleanup {
            f();
        }
    }

    /// Combines the callbacks of sibling layers, first is bottom-most.
    ///
    /// - events go to the top-most layer first and stop at the first one
    ///   that handles them;
    /// - pointers flow through every stage in order, each stage seeing what
    ///   the previous one returned;
    /// - updates all run and their rects are concatenated, `None` when there
    ///   are none;
    /// - draws run in order, so later layers paint on top;
    /// - cleanups all run.
    ///
    /// A callback is present in the result only when at least one input has
    /// it.
    #[must_use]
    pub fn merge(layers: Vec<Self>) -> Self {
        let mut merged = Self::default();

        let pointers: Vec<Rc<PointersFn>> =
            layers.iter().filter_map(|l| l.pointers.clone()).collect();
        if !pointers.is_empty() {
            merged.pointers = Some(Rc::new(move |list: Vec<Pointer>| {
                pointers.iter().fold(list, |list, stage| stage(list))
            }));
        }

        let events: Vec<Rc<EventFn>> = layers.iter().filter_map(|l| l.event.clone()).collect();
        if !events.is_empty() {
            merged.event = Some(Rc::new(move |event: &Event| {
                events.iter().rev().any(|handler| handler(event))
            }));
        }

        let updates: Vec<Rc<UpdateFn>> = layers.iter().filter_map(|l| l.update.clone()).collect();
        if !updates.is_empty() {
            merged.update = Some(Rc::new(move |params: &UpdateParams| {
                let mut rects = Vec::new();
                for update in &updates {
                    if let Some(r) = update(params) {
                        rects.extend(r);
                    }
                }
                (!rects.is_empty()).then_some(rects)
            }));
        }

        let draws: Vec<Rc<DrawFn>> = layers.iter().filter_map(|l| l.draw.clone()).collect();
        if !draws.is_empty() {
            merged.draw = Some(Rc::new(move |params: &mut DrawParams<'_>| {
                for draw in &draws {
                    draw(params);
                }
            }));
        }

        let cleanups: Vec<Rc<CleanupFn>> =
            layers.iter().filter_map(|l| l.cleanup.clone()).collect();
        if !cleanups.is_empty() {
            merged.cleanup = Some(Rc::new(move || {
                for cleanup in &cleanups {
                    cleanup();
                }
            }));
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::RefCell;

    use quickcheck_macros::quickcheck;
    use stipple_core::pointer::PointerId;
    use stipple_render::PixelSurface;

    fn pointer(id: u32) -> Pointer {
        Pointer {
            pointer_id: PointerId(id),
            x: 0.0,
            y: 0.0,
            primary: id == 0,
        }
    }

    #[test]
    fn events_go_top_down_and_stop_when_handled() {
        let log = Rc::new(RefCell::new(String::new()));
        let layer = |name: char, handled: bool| {
            let log = log.clone();
            LayerLifecycles::new().with_event(move |_| {
                log.borrow_mut().push(name);
                handled
            })
        };
        let merged = LayerLifecycles::merge(vec![
            layer('A', false),
            layer('B', true),
            layer('C', false),
        ]);
        let handled = merged.dispatch_event(&Event::PointerDown {
            pointer_id: PointerId(0),
        });
        assert!(handled, "B handles the event");
        assert_eq!(*log.borrow(), "CB");
    }

    #[test]
    fn pointers_pipeline_in_original_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let stage = |name: u32, drop_id: u32| {
            let order = order.clone();
            LayerLifecycles::new().with_pointers(move |list: Vec<Pointer>| {
                order.borrow_mut().push((name, list.len()));
                list.into_iter()
                    .filter(|p| p.pointer_id != PointerId(drop_id))
                    .collect()
            })
        };
        let merged = LayerLifecycles::merge(vec![stage(0, 1), LayerLifecycles::new(), stage(1, 2)]);
        let out = merged.dispatch_pointers(vec![pointer(1), pointer(2), pointer(3)]);
        assert_eq!(out, vec![pointer(3)]);
        assert_eq!(*order.borrow(), vec![(0, 3), (1, 2)]);
    }

    #[test]
    fn update_flattens_and_empty_is_none() {
        let r = Rect::new(0.0, 0.0, 1.0, 1.0);
        let params = UpdateParams { t: 0.0, view: r };
        let merged = LayerLifecycles::merge(vec![
            LayerLifecycles::new().with_update(|_| None),
            LayerLifecycles::new().with_update(|_| Some(Vec::new())),
        ]);
        assert_eq!(merged.run_update(&params), None);

        let merged = LayerLifecycles::merge(vec![
            LayerLifecycles::new().with_update(move |_| Some(vec![r])),
            LayerLifecycles::new().with_update(|_| None),
            LayerLifecycles::new().with_update(move |_| Some(vec![r, r])),
        ]);
        assert_eq!(merged.run_update(&params), Some(vec![r, r, r]));
    }

    #[test]
    fn draw_in_order_and_cleanup_once() {
        let log = Rc::new(RefCell::new(String::new()));
        let layer = |name: char| {
            let draw_log = log.clone();
            let cleanup_log = log.clone();
            LayerLifecycles::new()
                .with_draw(move |_| draw_log.borrow_mut().push(name))
                .with_cleanup(move || cleanup_log.borrow_mut().push(name.to_ascii_lowercase()))
        };
        let merged = LayerLifecycles::merge(vec![layer('A'), layer('B')]);
        let mut surface = PixelSurface::new(1, 1);
        merged.run_draw(&mut DrawParams {
            t: 0.0,
            view: Rect::ZERO,
            rect: Rect::ZERO,
            ctx: &mut surface,
        });
        merged.run_cleanup();
        assert_eq!(*log.borrow(), "ABab");
    }

    #[test]
    fn only_present_callbacks_survive() {
        let merged = LayerLifecycles::merge(vec![
            LayerLifecycles::new().with_draw(|_| {}),
            LayerLifecycles::new(),
        ]);
        assert!(merged.draw.is_some());
        assert!(merged.pointers.is_none());
        assert!(merged.event.is_none());
        assert!(merged.update.is_none());
        assert!(merged.cleanup.is_none());
        assert!(!merged.dispatch_event(&Event::Wheel {
            delta_x: 0.0,
            delta_y: 1.0
        }));
    }

    #[quickcheck]
    fn merged_update_concatenates(counts: Vec<u8>) -> bool {
        let layers = counts
            .iter()
            .map(|&n| {
                LayerLifecycles::new().with_update(move |p: &UpdateParams| {
                    (n > 0).then(|| vec![p.view; usize::from(n % 4)])
                })
            })
            .collect();
        let params = UpdateParams {
            t: 1.0,
            view: Rect::new(0.0, 0.0, 2.0, 2.0),
        };
        let expected: usize = counts.iter().map(|&n| usize::from(n % 4) * usize::from(n > 0)).sum();
        let got = LayerLifecycles::merge(layers).run_update(&params);
        match got {
            None => expected == 0,
            Some(rects) => rects.len() == expected && expected > 0,
        }
    }
}
