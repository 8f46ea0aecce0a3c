// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lists of callbacks with removal tokens.
//!
//! Adding a callback returns a [`Subscription`]; calling
//! [`Subscription::unsubscribe`] removes it. Dropping the token keeps the
//! callback registered for the lifetime of the list.
//!
//! [`SubscriberList::emit`] snapshots the list before calling anything, so
//! callbacks may subscribe or unsubscribe freely. Such changes apply to the
//! next emit.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Entries<T: ?Sized> {
    next_id: Cell<u64>,
    items: RefCell<Vec<(u64, Callback<T>)>>,
}

/// A list of `Fn(&T)` callbacks.
pub struct SubscriberList<T: ?Sized> {
    entries: Rc<Entries<T>>,
}

impl<T: ?Sized> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for SubscriberList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: ?Sized> SubscriberList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Rc::new(Entries {
                next_id: Cell::new(0),
                items: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.items.borrow().len()
    }

    /// Whether no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every registered callback with `value`, in registration order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .items
            .borrow()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in snapshot {
            cb(value);
        }
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.entries.items.borrow_mut().clear();
    }
}

impl<T: ?Sized + 'static> SubscriberList<T> {
    /// Registers `callback`.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.entries.next_id.get();
        self.entries.next_id.set(id + 1);
        self.entries
            .items
            .borrow_mut()
            .push((id, Rc::new(callback)));
        let entries: Weak<Entries<T>> = Rc::downgrade(&self.entries);
        Subscription {
            remove: Some(Box::new(move || {
                let Some(entries) = entries.upgrade() else {
                    return false;
                };
                let mut items = entries.items.borrow_mut();
                let before = items.len();
                items.retain(|(i, _)| *i != id);
                items.len() != before
            })),
        }
    }
}

/// Token for one callback in a [`SubscriberList`].
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() -> bool>>,
}

impl Subscription {
    /// A token that refers to nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self { remove: None }
    }

    /// Removes the callback.
    ///
    /// Returns `false` if it was already gone or the list was dropped.
    pub fn unsubscribe(mut self) -> bool {
        self.remove.take().is_some_and(|remove| remove())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.remove.is_some())
            .finish()
    }
}
