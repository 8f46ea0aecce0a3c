// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A layer that claims the pointers over a shape and reports hover changes.

use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;
use stipple_core::pointer::{Event, Pointer, PointerId};
use stipple_core::scheduler::FrameClock;
use stipple_core::subscriber::{SubscriberList, Subscription};
use stipple_render::{DrawContext, HitColor, HitEngine, HitObject, Registration};

use crate::lifecycle::{Layer, LayerLifecycles};
use crate::tools::Tools;

/// Paints a responder's hit shape with the current fill.
///
/// Receives the probe context and the 1×1 area being tested, in frame
/// coordinates. It must not change the fill.
pub type HitShape = dyn Fn(&mut dyn DrawContext, Rect);

struct Inner {
    engine: HitEngine<()>,
    object: HitObject<()>,
    registration: RefCell<Option<Registration>>,
    shape: RefCell<Option<Rc<HitShape>>>,
    hovered: RefCell<BTreeSet<PointerId>>,
    clock: RefCell<Option<FrameClock>>,
    frame: Cell<u64>,
    enter: SubscriberList<PointerId>,
    leave: SubscriberList<PointerId>,
    moved: SubscriberList<PointerId>,
}

enum Transition {
    Enter(PointerId),
    Leave(PointerId),
}

impl Inner {
    fn hits(&self, shape: &HitShape, time: f64, pointer: &Pointer) -> bool {
        let fill = self.object.color().to_color();
        let mut draw = |ctx: &mut dyn DrawContext, _t: f64, area: Rect| {
            ctx.set_fill(fill);
            shape(ctx, area);
        };
        self.engine
            .hit(&mut draw, time, pointer.pointer_id, pointer.x, pointer.y)
            .is_some_and(|values| !values.is_empty())
    }

    fn pointers(&self, pointers: Vec<Pointer>) -> Vec<Pointer> {
        let shape = self.shape.borrow().clone();
        let Some(shape) = shape else {
            return pointers;
        };
        let time = self.frame_time();

        let mut transitions = Vec::new();
        let mut remaining = Vec::with_capacity(pointers.len());
        {
            let mut hovered = self.hovered.borrow_mut();
            let mut stale = hovered.clone();
            for pointer in pointers {
                let id = pointer.pointer_id;
                stale.remove(&id);
                let was_hit = hovered.contains(&id);
                let hit = self.hits(&*shape, time, &pointer);
                if hit && !was_hit {
                    hovered.insert(id);
                    transitions.push(Transition::Enter(id));
                } else if !hit && was_hit {
                    hovered.remove(&id);
                    transitions.push(Transition::Leave(id));
                }
                if !hit {
                    remaining.push(pointer);
                }
            }
            for id in stale {
                hovered.remove(&id);
                transitions.push(Transition::Leave(id));
            }
        }

        for transition in transitions {
            match transition {
                Transition::Enter(id) => self.enter.emit(&id),
                Transition::Leave(id) => self.leave.emit(&id),
            }
        }
        remaining
    }

    /// The hit cache key: the frame clock if mounted with one, otherwise a
    /// count of pointer updates.
    fn frame_time(&self) -> f64 {
        if let Some(clock) = &*self.clock.borrow() {
            return clock.now();
        }
        let frame = self.frame.get() + 1;
        self.frame.set(frame);
        frame as f64
    }

    fn event(&self, event: &Event) -> bool {
        if let Event::PointerMove { pointer_id } = event {
            let hovered = self.hovered.borrow().contains(pointer_id);
            if hovered {
                self.moved.emit(pointer_id);
            }
        }
        false
    }
}

/// Invisible layer tracking which pointers are over a shape.
///
/// Every frame each incoming pointer is probed against the shape set with
/// [`set_draw`](Self::set_draw). A pointer that starts hitting fires
/// [`on_pointer_enter`](Self::on_pointer_enter) once, one that stops hitting
/// or disappears from the list fires
/// [`on_pointer_leave`](Self::on_pointer_leave) once. Pointers over the shape
/// are claimed: layers later in the pipeline do not see them.
///
/// Cloning shares the responder.
#[derive(Clone)]
pub struct HitResponder(Rc<Inner>);

impl fmt::Debug for HitResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitResponder")
            .field("color", &self.0.object.color())
            .field("hovered", &self.0.hovered.borrow())
            .field("has_shape", &self.0.shape.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for HitResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl HitResponder {
    /// A responder with no shape; it lets every pointer through until
    /// [`set_draw`](Self::set_draw) is called.
    #[must_use]
    pub fn new() -> Self {
        let engine = HitEngine::new();
        let object = engine.create();
        Self(Rc::new(Inner {
            engine,
            object,
            registration: RefCell::new(None),
            shape: RefCell::new(None),
            hovered: RefCell::new(BTreeSet::new()),
            clock: RefCell::new(None),
            frame: Cell::new(0),
            enter: SubscriberList::new(),
            leave: SubscriberList::new(),
            moved: SubscriberList::new(),
        }))
    }

    /// Sets the hit shape.
    pub fn set_draw(&self, shape: impl Fn(&mut dyn DrawContext, Rect) + 'static) {
        *self.0.shape.borrow_mut() = Some(Rc::new(shape));
    }

    /// The color the hit shape is probed with.
    #[must_use]
    pub fn color(&self) -> HitColor {
        self.0.object.color()
    }

    /// Whether `pointer_id` was over the shape at the last pointer update.
    #[must_use]
    pub fn is_hovered(&self, pointer_id: PointerId) -> bool {
        self.0.hovered.borrow().contains(&pointer_id)
    }

    /// Pointers over the shape at the last pointer update.
    #[must_use]
    pub fn hovered(&self) -> Vec<PointerId> {
        self.0.hovered.borrow().iter().copied().collect()
    }

    /// Called once when a pointer starts hitting the shape.
    pub fn on_pointer_enter(&self, callback: impl Fn(&PointerId) + 'static) -> Subscription {
        self.0.enter.subscribe(callback)
    }

    /// Called once when a pointer stops hitting the shape or goes away.
    pub fn on_pointer_leave(&self, callback: impl Fn(&PointerId) + 'static) -> Subscription {
        self.0.leave.subscribe(callback)
    }

    /// Called on move events of pointers over the shape.
    pub fn on_pointer_move(&self, callback: impl Fn(&PointerId) + 'static) -> Subscription {
        self.0.moved.subscribe(callback)
    }
}

impl Layer for HitResponder {
    fn mount(&self, tools: &Tools) -> LayerLifecycles {
        *self.0.clock.borrow_mut() = tools.try_clock().ok();
        let registration = self.0.object.register(());
        if let Some(previous) = self.0.registration.replace(Some(registration)) {
            previous.unregister();
        }
        let pointers = self.0.clone();
        let event = self.0.clone();
        let cleanup = self.0.clone();
        LayerLifecycles::new()
            .with_pointers(move |list| pointers.pointers(list))
            .with_event(move |e| event.event(e))
            .with_cleanup(move || {
                if let Some(registration) = cleanup.registration.take() {
                    registration.unregister();
                }
                cleanup.hovered.borrow_mut().clear();
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use stipple_core::scheduler::{RootOptions, RootScheduler};

    fn at(id: u32, x: f64, y: f64) -> Pointer {
        Pointer {
            pointer_id: PointerId(id),
            x,
            y,
            primary: true,
        }
    }

    fn square() -> HitResponder {
        let responder = HitResponder::new();
        responder.set_draw(|ctx, _| ctx.fill_rect(Rect::new(10.0, 10.0, 20.0, 20.0)));
        responder
    }

    fn counter(
        subscribe: impl FnOnce(Rc<RefCell<Vec<PointerId>>>) -> Subscription,
    ) -> (Rc<RefCell<Vec<PointerId>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = subscribe(seen.clone());
        (seen, sub)
    }

    #[test]
    fn enter_claims_and_leave_on_removal() {
        let responder = square();
        let (entered, _e) = counter(|s| responder.on_pointer_enter(move |id| s.borrow_mut().push(*id)));
        let (left, _l) = counter(|s| responder.on_pointer_leave(move |id| s.borrow_mut().push(*id)));
        let lifecycles = responder.mount(&Tools::new());

        let out = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0), at(2, 50.0, 50.0)]);
        assert_eq!(out, vec![at(2, 50.0, 50.0)], "hit pointer is claimed");
        assert_eq!(*entered.borrow(), vec![PointerId(1)]);
        assert!(responder.is_hovered(PointerId(1)));

        let out = lifecycles.dispatch_pointers(vec![at(1, 16.0, 16.0), at(2, 50.0, 50.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(entered.borrow().len(), 1, "no second enter while inside");

        let _ = lifecycles.dispatch_pointers(vec![at(2, 50.0, 50.0)]);
        assert_eq!(*left.borrow(), vec![PointerId(1)]);
        let _ = lifecycles.dispatch_pointers(vec![at(2, 50.0, 50.0)]);
        assert_eq!(left.borrow().len(), 1, "leave fires once");
        assert!(responder.hovered().is_empty());
    }

    #[test]
    fn moving_out_emits_leave() {
        let responder = square();
        let (left, _l) = counter(|s| responder.on_pointer_leave(move |id| s.borrow_mut().push(*id)));
        let lifecycles = responder.mount(&Tools::new());
        let _ = lifecycles.dispatch_pointers(vec![at(3, 12.0, 12.0)]);
        let out = lifecycles.dispatch_pointers(vec![at(3, 40.0, 12.0)]);
        assert_eq!(out, vec![at(3, 40.0, 12.0)]);
        assert_eq!(*left.borrow(), vec![PointerId(3)]);
    }

    #[test]
    fn no_shape_passes_everything() {
        let responder = HitResponder::new();
        let lifecycles = responder.mount(&Tools::new());
        let list = vec![at(1, 15.0, 15.0)];
        assert_eq!(lifecycles.dispatch_pointers(list.clone()), list);
    }

    #[test]
    fn move_events_only_for_hovered_pointers() {
        let responder = square();
        let (moved, _m) = counter(|s| responder.on_pointer_move(move |id| s.borrow_mut().push(*id)));
        let lifecycles = responder.mount(&Tools::new());
        let _ = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0), at(2, 0.0, 0.0)]);
        for id in [1, 2] {
            let handled = lifecycles.dispatch_event(&Event::PointerMove {
                pointer_id: PointerId(id),
            });
            assert!(!handled, "responders never consume events");
        }
        assert_eq!(*moved.borrow(), vec![PointerId(1)]);
    }

    #[test]
    fn shape_is_tested_once_per_frame_time() {
        let root = RootScheduler::new(RootOptions {
            auto_start: false,
            ..RootOptions::default()
        });
        let draws = Rc::new(Cell::new(0_u32));
        let responder = HitResponder::new();
        let counted = draws.clone();
        responder.set_draw(move |ctx, _| {
            counted.set(counted.get() + 1);
            ctx.fill_rect(Rect::new(10.0, 10.0, 20.0, 20.0));
        });
        let lifecycles = responder.mount(&Tools::new().with_clock(root.clock()));

        root.run_frame(0.0);
        let _ = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0)]);
        let _ = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0)]);
        assert_eq!(draws.get(), 1, "same frame, same position");

        root.run_frame(16.0);
        let out = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0)]);
        assert_eq!(draws.get(), 2, "a new frame tests again");
        assert!(out.is_empty());
    }

    #[test]
    fn cleanup_stops_responding() {
        let responder = square();
        let lifecycles = responder.mount(&Tools::new());
        let _ = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0)]);
        lifecycles.run_cleanup();
        assert!(!responder.is_hovered(PointerId(1)));
        let out = lifecycles.dispatch_pointers(vec![at(1, 15.0, 15.0)]);
        assert_eq!(out.len(), 1, "unregistered responders claim nothing");
    }
}
