// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler tree nodes.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;

use crate::subscriber::{SubscriberList, Subscription};
use crate::transform::Transform;

/// Payload of update and post-update notifications.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateData {
    /// Frame time in milliseconds.
    pub t: f64,
}

/// Payload of render notifications.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderData {
    /// Frame time in milliseconds.
    pub t: f64,
    /// Damaged rects in this node's coordinate space.
    pub rects: Vec<Rect>,
}

/// Per-frame hooks a node exposes to its parent.
///
/// Parents only ever see their children through this trait; the public
/// [`Scheduler`] handle has no way to drive a frame.
pub(crate) trait FrameNode {
    /// Marks the node as owned by a parent.
    fn attach(&self);

    /// Releases the node from its parent.
    fn detach(&self);

    /// Whether `target` is this node or one of its descendants.
    fn contains(&self, target: *const ()) -> bool;

    fn on_frame_update(&self, t: f64);

    fn on_frame_post_update(&self, t: f64);

    /// Runs the render phase for this subtree and returns the rects it is
    /// responsible for, in the parent's coordinate space.
    fn on_frame_render(&self, t: f64, parent_rects: &[Rect]) -> Vec<Rect>;
}

pub(crate) struct NodeInner {
    transform: Transform,
    is_root: bool,
    attached: Cell<bool>,
    rendering: Cell<bool>,
    pending: RefCell<Vec<Rect>>,
    children: RefCell<Vec<Rc<dyn FrameNode>>>,
    update_subs: SubscriberList<UpdateData>,
    post_update_subs: SubscriberList<UpdateData>,
    render_subs: SubscriberList<RenderData>,
}

/// Sets a flag for as long as it lives, clearing it again on drop, so a
/// panicking callback cannot leave the flag stuck.
pub(crate) struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    /// Raises `flag`.
    pub(crate) fn hold(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }

    /// Raises `flag`. Returns `None` if it was already raised.
    pub(crate) fn raise(flag: &'a Cell<bool>) -> Option<Self> {
        (!flag.replace(true)).then_some(Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// What one render pass of a node produced.
pub(crate) struct RenderOutcome {
    /// Everything this node's subscribers were told about.
    pub(crate) emitted: Vec<Rect>,
    /// Local and child rects mapped for the parent.
    pub(crate) returned: Vec<Rect>,
}

impl NodeInner {
    fn new(transform: Transform, is_root: bool) -> Self {
        Self {
            transform,
            is_root,
            attached: Cell::new(false),
            rendering: Cell::new(false),
            pending: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            update_subs: SubscriberList::new(),
            post_update_subs: SubscriberList::new(),
            render_subs: SubscriberList::new(),
        }
    }

    fn children_snapshot(&self) -> Vec<Rc<dyn FrameNode>> {
        self.children.borrow().clone()
    }

    pub(crate) fn render(&self, t: f64, parent_rects: &[Rect]) -> RenderOutcome {
        let local = core::mem::take(&mut *self.pending.borrow_mut());
        let rendering = FlagGuard::hold(&self.rendering);

        let mut parent_and_local = self.transform.apply_all(parent_rects);
        parent_and_local.extend_from_slice(&local);

        let mut child_rendered = Vec::new();
        for child in self.children_snapshot() {
            child_rendered.extend(child.on_frame_render(t, &parent_and_local));
        }

        let mut all = parent_and_local;
        all.extend_from_slice(&child_rendered);
        if !all.is_empty() {
            self.render_subs.emit(&RenderData {
                t,
                rects: all.clone(),
            });
        }
        drop(rendering);

        let mut own = local;
        own.extend(child_rendered);
        RenderOutcome {
            emitted: all,
            returned: self.transform.apply_all(&own),
        }
    }
}

impl FrameNode for NodeInner {
    fn attach(&self) {
        assert!(!self.is_root, "cannot attach a root scheduler");
        assert!(!self.attached.get(), "child already has a parent");
        self.attached.set(true);
    }

    fn detach(&self) {
        self.attached.set(false);
    }

    fn contains(&self, target: *const ()) -> bool {
        core::ptr::addr_eq(self as *const Self, target)
            || self
                .children
                .borrow()
                .iter()
                .any(|child| child.contains(target))
    }

    fn on_frame_update(&self, t: f64) {
        for child in self.children_snapshot() {
            child.on_frame_update(t);
        }
        self.update_subs.emit(&UpdateData { t });
    }

    fn on_frame_post_update(&self, t: f64) {
        for child in self.children_snapshot() {
            child.on_frame_post_update(t);
        }
        self.post_update_subs.emit(&UpdateData { t });
    }

    fn on_frame_render(&self, t: f64, parent_rects: &[Rect]) -> Vec<Rect> {
        self.render(t, parent_rects).returned
    }
}

/// Handle to one node of the scheduler tree.
///
/// Cloning returns another handle to the same node.
///
/// A node collects damage rects through
/// [`request_frame_render`](Self::request_frame_render) and, once attached
/// under a [`RootScheduler`](super::RootScheduler), takes part in every frame:
///
/// - **update** and **post-update** visit children first, then notify this
///   node's subscribers;
/// - **render** maps the parent's rects into this node's space with its
///   transform, adds the node's own pending rects, renders children with the
///   result, then notifies subscribers with everything seen. The node's own
///   and its children's rects are mapped through the transform again and
///   handed back up, so every ancestor learns about damage below it.
#[derive(Clone)]
pub struct Scheduler(pub(crate) Rc<NodeInner>);

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("transform", &self.0.transform)
            .field("is_root", &self.0.is_root)
            .field("attached", &self.0.attached.get())
            .field("pending", &self.0.pending.borrow().len())
            .field("children", &self.children_len())
            .finish()
    }
}

impl PartialEq for Scheduler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Scheduler {
    /// Creates a detached node with the identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transform(Transform::identity())
    }

    /// Creates a detached node whose space is mapped through `transform`.
    #[must_use]
    pub fn with_transform(transform: Transform) -> Self {
        Self(Rc::new(NodeInner::new(transform, false)))
    }

    pub(crate) fn new_root() -> Self {
        Self(Rc::new(NodeInner::new(Transform::identity(), true)))
    }

    /// Queues `rect` for the next render pass. `None` is ignored.
    ///
    /// Requests made while this node is rendering are kept for the next
    /// frame and logged.
    pub fn request_frame_render(&self, rect: impl Into<Option<Rect>>) {
        let Some(rect) = rect.into() else {
            return;
        };
        if self.0.rendering.get() {
            log::warn!("frame render requested while rendering, deferred to next frame: {rect:?}");
        }
        self.0.pending.borrow_mut().push(rect);
    }

    /// Adds `child` to this node. Adding a child that is already here is a
    /// no-op.
    ///
    /// # Panics
    ///
    /// Panics if `child` is this node, an ancestor of this node, a root, or
    /// already attached to another parent.
    pub fn add_child(&self, child: &Self) {
        assert!(!Rc::ptr_eq(&self.0, &child.0), "cannot add a scheduler to itself");
        if self.has_child(child) {
            return;
        }
        assert!(
            !child.0.contains(Rc::as_ptr(&self.0).cast()),
            "cannot add an ancestor as a child"
        );
        child.0.attach();
        let node: Rc<dyn FrameNode> = child.0.clone();
        self.0.children.borrow_mut().push(node);
    }

    /// Removes `child` and detaches it so it can be added elsewhere. Does
    /// nothing if `child` is not a child of this node.
    pub fn remove_child(&self, child: &Self) {
        let target: *const () = Rc::as_ptr(&child.0).cast();
        let removed = {
            let mut children = self.0.children.borrow_mut();
            let before = children.len();
            children.retain(|c| !core::ptr::addr_eq(Rc::as_ptr(c), target));
            children.len() != before
        };
        if removed {
            child.0.detach();
        }
    }

    /// Whether `child` is a direct child of this node.
    #[must_use]
    pub fn has_child(&self, child: &Self) -> bool {
        let target: *const () = Rc::as_ptr(&child.0).cast();
        self.0
            .children
            .borrow()
            .iter()
            .any(|c| core::ptr::addr_eq(Rc::as_ptr(c), target))
    }

    /// Number of direct children.
    #[must_use]
    pub fn children_len(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// Whether this node currently has a parent.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.0.attached.get()
    }

    /// This node's transform.
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.0.transform
    }

    /// Whether this node is inside its render pass.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.0.rendering.get()
    }

    /// A handle that does not keep the node alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler(Rc::downgrade(&self.0))
    }

    /// Subscribes to the update phase.
    pub fn on_update(&self, callback: impl Fn(&UpdateData) + 'static) -> Subscription {
        self.0.update_subs.subscribe(callback)
    }

    /// Subscribes to the post-update phase.
    pub fn on_post_update(&self, callback: impl Fn(&UpdateData) + 'static) -> Subscription {
        self.0.post_update_subs.subscribe(callback)
    }

    /// Subscribes to render notifications. Called only on frames where this
    /// node saw at least one rect.
    pub fn on_render(&self, callback: impl Fn(&RenderData) + 'static) -> Subscription {
        self.0.render_subs.subscribe(callback)
    }
}

/// Non-owning handle to a scheduler node, for use in the node's own
/// subscribers.
#[derive(Clone)]
pub struct WeakScheduler(Weak<NodeInner>);

impl fmt::Debug for WeakScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakScheduler")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

impl WeakScheduler {
    /// The node, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.0.upgrade().map(Scheduler)
    }
}
