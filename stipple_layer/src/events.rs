// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Where a renderer gets its pointers and events from.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::mem;

use stipple_core::pointer::{Event, Pointer, PointerId};

/// The platform input collaborator of a renderer.
///
/// Once per frame the renderer reads the current pointers, then drains the
/// discrete events queued since the previous frame.
pub trait EventSource {
    /// Pointers currently over the surface.
    fn pointers(&mut self) -> Vec<Pointer>;

    /// Takes every event queued since the last call.
    fn flush_events(&mut self) -> Vec<Event>;
}

#[derive(Default)]
struct QueueState {
    pointers: Vec<Pointer>,
    events: Vec<Event>,
}

impl QueueState {
    fn upsert(&mut self, pointer: Pointer) {
        match self
            .pointers
            .iter_mut()
            .find(|p| p.pointer_id == pointer.pointer_id)
        {
            Some(existing) => {
                existing.x = pointer.x;
                existing.y = pointer.y;
            }
            None => self.pointers.push(pointer),
        }
    }

    fn take(&mut self, pointer_id: PointerId) -> Option<Pointer> {
        let index = self.pointers.iter().position(|p| p.pointer_id == pointer_id)?;
        Some(self.pointers.remove(index))
    }
}

/// An in-memory [`EventSource`] fed by platform glue or tests.
///
/// The feeding methods mirror DOM pointer events: they keep the pointer
/// list current and queue the matching [`Event`]. Cloning shares the queue,
/// so the platform side can keep a handle after giving one to the renderer.
#[derive(Clone, Default)]
pub struct EventQueue(Rc<RefCell<QueueState>>);

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("EventQueue")
            .field("pointers", &state.pointers)
            .field("queued", &state.events.len())
            .finish()
    }
}

impl EventQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A pointer entered the surface.
    pub fn pointer_enter(&self, pointer: Pointer) {
        let mut state = self.0.borrow_mut();
        state.upsert(pointer);
        state.events.push(Event::PointerEnter {
            pointer_id: pointer.pointer_id,
        });
    }

    /// A button was pressed. Unknown pointers are added.
    pub fn pointer_down(&self, pointer: Pointer) {
        let mut state = self.0.borrow_mut();
        state.upsert(pointer);
        state.events.push(Event::PointerDown {
            pointer_id: pointer.pointer_id,
        });
    }

    /// A button was released. Unknown pointers are added.
    pub fn pointer_up(&self, pointer: Pointer) {
        let mut state = self.0.borrow_mut();
        state.upsert(pointer);
        state.events.push(Event::PointerUp {
            pointer_id: pointer.pointer_id,
        });
    }

    /// A pointer moved. Unknown pointers are added.
    pub fn pointer_move(&self, pointer: Pointer) {
        let mut state = self.0.borrow_mut();
        state.upsert(pointer);
        state.events.push(Event::PointerMove {
            pointer_id: pointer.pointer_id,
        });
    }

    /// The platform cancelled a pointer.
    pub fn pointer_cancel(&self, pointer_id: PointerId) {
        let mut state = self.0.borrow_mut();
        if state.take(pointer_id).is_some() {
            state.events.push(Event::PointerCancel { pointer_id });
        } else {
            log::warn!("cancel for unknown pointer {pointer_id}");
        }
    }

    /// A pointer left the surface.
    pub fn pointer_leave(&self, pointer_id: PointerId) {
        let mut state = self.0.borrow_mut();
        if state.take(pointer_id).is_some() {
            state.events.push(Event::PointerLeave { pointer_id });
        } else {
            log::warn!("leave for unknown pointer {pointer_id}");
        }
    }

    /// A wheel turned.
    pub fn wheel(&self, delta_x: f64, delta_y: f64) {
        self.0
            .borrow_mut()
            .events
            .push(Event::Wheel { delta_x, delta_y });
    }

    /// Number of events waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.0.borrow().events.len()
    }
}

impl EventSource for EventQueue {
    fn pointers(&mut self) -> Vec<Pointer> {
        self.0.borrow().pointers.clone()
    }

    fn flush_events(&mut self) -> Vec<Event> {
        mem::take(&mut self.0.borrow_mut().events)
    }
}
