// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A dynamic list of sibling layers.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::Rect;
use stipple_core::pointer::{Event, Pointer};

use crate::lifecycle::{DrawParams, Layer, LayerLifecycles, UpdateParams};
use crate::tools::Tools;

struct Mounted<C: ?Sized> {
    child: Rc<C>,
    lifecycles: LayerLifecycles,
}

struct Inner<C: ?Sized> {
    children: RefCell<Vec<Rc<C>>>,
    tools: RefCell<Option<Tools>>,
    mounted: RefCell<Vec<Mounted<C>>>,
    merged: RefCell<LayerLifecycles>,
}

impl<C: Layer + ?Sized> Inner<C> {
    fn mount_child(&self, child: &Rc<C>, tools: &Tools) {
        let lifecycles = child.mount(tools);
        self.mounted.borrow_mut().push(Mounted {
            child: child.clone(),
            lifecycles,
        });
    }

    fn unmount_child(&self, child: &Rc<C>) {
        let removed = {
            let mut mounted = self.mounted.borrow_mut();
            mounted
                .iter()
                .position(|m| Rc::ptr_eq(&m.child, child))
                .map(|i| mounted.remove(i))
        };
        if let Some(m) = removed {
            m.lifecycles.run_cleanup();
        }
    }

    /// Rebuilds the merged callbacks in child order.
    fn remerge(&self) {
        let merged = {
            let children = self.children.borrow();
            let mounted = self.mounted.borrow();
            let ordered = children
                .iter()
                .filter_map(|child| {
                    mounted
                        .iter()
                        .find(|m| Rc::ptr_eq(&m.child, child))
                        .map(|m| m.lifecycles.clone())
                })
                .collect();
            LayerLifecycles::merge(ordered)
        };
        *self.merged.borrow_mut() = merged;
    }

    fn current(&self) -> LayerLifecycles {
        self.merged.borrow().clone()
    }
}

/// Layers rendered as siblings, first child at the bottom.
///
/// Children can be appended and removed at any time. While the group is
/// mounted, appended children are mounted right away and removed ones are
/// cleaned up; the change takes effect from the next callback on.
///
/// Cloning shares the group.
pub struct Group<C: ?Sized = dyn Layer>(Rc<Inner<C>>);

impl<C: ?Sized> Clone for Group<C> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<C: ?Sized> fmt::Debug for Group<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("children", &self.0.children.borrow().len())
            .field("mounted", &self.0.tools.borrow().is_some())
            .finish()
    }
}

impl<C: Layer + ?Sized + 'static> Default for Group<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Layer + ?Sized + 'static> Group<C> {
    /// An empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::with_children(Vec::new())
    }

    /// A group starting with `children`.
    #[must_use]
    pub fn with_children(children: Vec<Rc<C>>) -> Self {
        Self(Rc::new(Inner {
            children: RefCell::new(children),
            tools: RefCell::new(None),
            mounted: RefCell::new(Vec::new()),
            merged: RefCell::new(LayerLifecycles::default()),
        }))
    }

    /// The current children, bottom first.
    #[must_use]
    pub fn children(&self) -> Vec<Rc<C>> {
        self.0.children.borrow().clone()
    }

    /// Adds `child` on top.
    pub fn append_child(&self, child: Rc<C>) {
        self.0.children.borrow_mut().push(child.clone());
        let tools = self.0.tools.borrow().clone();
        if let Some(tools) = tools {
            self.0.mount_child(&child, &tools);
        }
        self.0.remerge();
    }

    /// Removes `child`, cleaning it up when mounted. Returns whether it was
    /// a child.
    pub fn remove_child(&self, child: &Rc<C>) -> bool {
        let removed = {
            let mut children = self.0.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                Some(i) => {
                    children.remove(i);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.0.unmount_child(child);
            self.0.remerge();
        }
        removed
    }

    /// Whether `child` is one of the children.
    #[must_use]
    pub fn has_child(&self, child: &Rc<C>) -> bool {
        self.0.children.borrow().iter().any(|c| Rc::ptr_eq(c, child))
    }

    /// Whether the group is currently mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.0.tools.borrow().is_some()
    }
}

impl<C: Layer + ?Sized + 'static> Layer for Group<C> {
    /// # Panics
    ///
    /// Panics if the group is already mounted.
    fn mount(&self, tools: &Tools) -> LayerLifecycles {
        assert!(
            self.0.tools.borrow().is_none(),
            "Group already mounted"
        );
        *self.0.tools.borrow_mut() = Some(tools.clone());
        for child in self.children() {
            self.0.mount_child(&child, tools);
        }
        self.0.remerge();
        log::debug!("group mounted with {} children", self.0.children.borrow().len());

        let pointers = self.0.clone();
        let event = self.0.clone();
        let update = self.0.clone();
        let draw = self.0.clone();
        let cleanup = self.0.clone();
        LayerLifecycles::new()
            .with_pointers(move |list: Vec<Pointer>| pointers.current().dispatch_pointers(list))
            .with_event(move |e: &Event| event.current().dispatch_event(e))
            .with_update(move |p: &UpdateParams| -> Option<Vec<Rect>> {
                update.current().run_update(p)
            })
            .with_draw(move |p: &mut DrawParams<'_>| draw.current().run_draw(p))
            .with_cleanup(move || {
                let lifecycles = cleanup.current();
                lifecycles.run_cleanup();
                cleanup.mounted.borrow_mut().clear();
                *cleanup.merged.borrow_mut() = LayerLifecycles::default();
                *cleanup.tools.borrow_mut() = None;
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;

    /// Records mounts, draws and cleanups under a one-letter name.
    struct Probe {
        name: char,
        log: Rc<RefCell<String>>,
        damage: Option<Rect>,
    }

    impl Layer for Probe {
        fn mount(&self, _tools: &Tools) -> LayerLifecycles {
            self.log.borrow_mut().push(self.name);
            let (name, draw_log, cleanup_log) = (self.name, self.log.clone(), self.log.clone());
            let damage = self.damage;
            LayerLifecycles::new()
                .with_update(move |_| damage.map(|r| vec![r]))
                .with_draw(move |_| draw_log.borrow_mut().push(name))
                .with_cleanup(move || cleanup_log.borrow_mut().push(name.to_ascii_lowercase()))
        }
    }

    fn probe(name: char, log: &Rc<RefCell<String>>) -> Rc<Probe> {
        Rc::new(Probe {
            name,
            log: log.clone(),
            damage: None,
        })
    }

    fn draw(lifecycles: &LayerLifecycles) {
        let mut surface = stipple_render::PixelSurface::new(1, 1);
        lifecycles.run_draw(&mut DrawParams {
            t: 0.0,
            view: Rect::ZERO,
            rect: Rect::ZERO,
            ctx: &mut surface,
        });
    }

    #[test]
    fn mounts_children_and_tracks_changes() {
        let log = Rc::new(RefCell::new(String::new()));
        let a = probe('A', &log);
        let b = probe('B', &log);
        let group: Group<Probe> = Group::with_children(vec![a.clone()]);
        let lifecycles = group.mount(&Tools::new());
        assert_eq!(*log.borrow(), "A");

        group.append_child(b.clone());
        assert_eq!(*log.borrow(), "AB", "mounted on append");
        draw(&lifecycles);
        assert_eq!(*log.borrow(), "ABAB");

        assert!(group.remove_child(&a));
        assert!(!group.remove_child(&a));
        assert_eq!(*log.borrow(), "ABABa", "cleaned up on removal");
        assert!(!group.has_child(&a));
        assert!(group.has_child(&b));
        draw(&lifecycles);
        assert_eq!(*log.borrow(), "ABABaB");

        lifecycles.run_cleanup();
        assert_eq!(*log.borrow(), "ABABaBb");
        assert!(!group.is_mounted());
    }

    #[test]
    fn appending_before_mount_defers_mounting() {
        let log = Rc::new(RefCell::new(String::new()));
        let group: Group = Group::new();
        let a: Rc<dyn Layer> = probe('A', &log);
        group.append_child(a.clone());
        assert_eq!(*log.borrow(), "");
        let _lifecycles = group.mount(&Tools::new());
        assert_eq!(*log.borrow(), "A");
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn update_merges_child_damage() {
        let log = Rc::new(RefCell::new(String::new()));
        let r = Rect::new(0.0, 0.0, 5.0, 5.0);
        let group: Group<Probe> = Group::with_children(vec![
            Rc::new(Probe {
                name: 'A',
                log: log.clone(),
                damage: Some(r),
            }),
            probe('B', &log),
        ]);
        let lifecycles = group.mount(&Tools::new());
        let params = UpdateParams { t: 0.0, view: r };
        assert_eq!(lifecycles.run_update(&params), Some(vec![r]));
        // Pointers pass through untouched when no child has a stage.
        assert!(lifecycles.dispatch_pointers(Vec::new()).is_empty());
    }

    #[test]
    #[should_panic(expected = "Group already mounted")]
    fn mounting_twice_panics() {
        let group: Group = Group::new();
        let _first = group.mount(&Tools::new());
        let _second = group.mount(&Tools::new());
    }

    #[test]
    fn child_appended_from_a_callback_joins_next_frame() {
        let group: Group = Group::new();
        let calls = Rc::new(Cell::new(0));
        let lifecycles = group.mount(&Tools::new());

        struct Counter(Rc<Cell<u32>>);
        impl Layer for Counter {
            fn mount(&self, _tools: &Tools) -> LayerLifecycles {
                let calls = self.0.clone();
                LayerLifecycles::new().with_update(move |_| {
                    calls.set(calls.get() + 1);
                    None
                })
            }
        }
        struct Spawner(Group, Rc<Cell<u32>>);
        impl Layer for Spawner {
            fn mount(&self, _tools: &Tools) -> LayerLifecycles {
                let (group, calls) = (self.0.clone(), self.1.clone());
                LayerLifecycles::new().with_update(move |_| {
                    group.append_child(Rc::new(Counter(calls.clone())));
                    None
                })
            }
        }

        group.append_child(Rc::new(Spawner(group.clone(), calls.clone())));
        let params = UpdateParams {
            t: 0.0,
            view: Rect::ZERO,
        };
        let _ = lifecycles.run_update(&params);
        assert_eq!(calls.get(), 0, "the new child waits for the next update");
        let _ = lifecycles.run_update(&params);
        assert_eq!(calls.get(), 1);
    }
}
