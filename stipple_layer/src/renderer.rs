// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connects a root layer, a frame, an event source and a root scheduler.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;
use stipple_core::rect::{merge_intersecting_rects, merge_overlapping_rects};
use stipple_core::scheduler::{RenderData, RootOptions, RootScheduler, UpdateData, WeakScheduler};
use stipple_core::subscriber::Subscription;
use stipple_core::time::{HostTime, Timebase};
use stipple_core::trace::TraceSink;
use stipple_render::DamageRegion;
#[cfg(test)]
use stipple_render::Frame;

use crate::events::EventSource;
use crate::lifecycle::{DrawParams, Layer, LayerLifecycles, UpdateParams};
use crate::tools::{SharedFrame, Tools};
use crate::viewport::Viewport;

/// How a frame's damage rects are combined before drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DamageMerge {
    /// Draw once per reported rect, overlaps and duplicates included.
    #[default]
    None,
    /// Replace intersecting rects by their bounding box.
    Intersecting,
    /// Replace the rects by an exact disjoint cover.
    Exact,
}

impl DamageMerge {
    fn apply(self, rects: &[Rect]) -> Vec<Rect> {
        match self {
            Self::None => rects.to_vec(),
            Self::Intersecting => merge_intersecting_rects(rects),
            Self::Exact => merge_overlapping_rects(rects),
        }
    }
}

/// Construction options for [`Renderer`].
pub struct RendererOptions<L> {
    /// The root layer.
    pub layer: L,
    /// Where to draw.
    pub frame: SharedFrame,
    /// Pointer and event input. Without one the layer sees no input.
    pub events: Option<Box<dyn EventSource>>,
    /// Debug name used in logs.
    pub name: Option<&'static str>,
    /// Start the frame loop right away. Defaults to `true`.
    pub auto_start: bool,
    /// Timebase of the [`HostTime`] values passed to [`Renderer::tick`].
    pub timebase: Timebase,
    /// Damage rect merging before draw.
    pub damage_merge: DamageMerge,
    /// Viewport handed to layers through [`Tools`].
    pub viewport: Option<Viewport>,
}

impl<L> fmt::Debug for RendererOptions<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererOptions")
            .field("name", &self.name)
            .field("has_events", &self.events.is_some())
            .field("auto_start", &self.auto_start)
            .field("timebase", &self.timebase)
            .field("damage_merge", &self.damage_merge)
            .finish_non_exhaustive()
    }
}

impl<L> RendererOptions<L> {
    /// Options with every optional setting at its default.
    #[must_use]
    pub fn new(layer: L, frame: SharedFrame) -> Self {
        Self {
            layer,
            frame,
            events: None,
            name: None,
            auto_start: true,
            timebase: Timebase::default(),
            damage_merge: DamageMerge::None,
            viewport: None,
        }
    }
}

/// State shared by the update and render subscribers.
struct FrameDriver {
    name: &'static str,
    lifecycles: LayerLifecycles,
    frame: SharedFrame,
    events: RefCell<Option<Box<dyn EventSource>>>,
    node: WeakScheduler,
    view: Cell<Rect>,
    damage_merge: DamageMerge,
}

impl FrameDriver {
    /// Input, frame sync and layer update. Queues the rects to draw on the
    /// root node.
    fn update(&self, t: f64) {
        let input = {
            let mut events = self.events.borrow_mut();
            events
                .as_mut()
                .map(|source| (source.pointers(), source.flush_events()))
        };
        if let Some((pointers, events)) = input {
            let _ = self.lifecycles.dispatch_pointers(pointers);
            for event in &events {
                let _ = self.lifecycles.dispatch_event(event);
            }
        }

        let resized = self.frame.borrow_mut().update();
        let view = self.frame.borrow().view();
        self.view.set(view);

        let rects = self.lifecycles.run_update(&UpdateParams { t, view });
        let damage = if resized {
            log::debug!("renderer {}: frame resized to {view:?}", self.name);
            DamageRegion::Full
        } else {
            DamageRegion::from_update(rects)
        };
        let Some(node) = self.node.upgrade() else {
            return;
        };
        for rect in damage.to_rects(view) {
            node.request_frame_render(rect);
        }
    }

    /// Draws every rect the root saw this frame.
    fn render(&self, data: &RenderData) {
        let view = self.view.get();
        let rects = self.damage_merge.apply(&data.rects);
        // Layers may borrow the frame while drawing; only the context is held.
        let ctx = self.frame.borrow().context();
        let mut ctx = ctx.borrow_mut();
        for rect in rects {
            self.lifecycles.run_draw(&mut DrawParams {
                t: data.t,
                view,
                rect,
                ctx: &mut *ctx,
            });
        }
    }
}

/// Drives a root layer every frame.
///
/// Each frame, in the root scheduler's update phase:
///
/// 1. the current pointers go through the layer's pointer pipeline, then
///    every queued event through its event handler;
/// 2. the frame applies pending size changes;
/// 3. the layer's update reports damage; a resize replaces it by the whole
///    view;
/// 4. the damage is requested on the root scheduler node.
///
/// In the render phase every rect the root node saw, including damage from
/// scheduler nodes layers attached under it, is drawn with the layer's draw
/// callback.
pub struct Renderer<L> {
    layer: L,
    root: RootScheduler,
    driver: Rc<FrameDriver>,
    subscriptions: RefCell<Vec<Subscription>>,
    destroyed: Cell<bool>,
}

impl<L> fmt::Debug for Renderer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("name", &self.driver.name)
            .field("root", &self.root)
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl<L: Layer> Renderer<L> {
    /// Mounts `options.layer` and wires it to a new root scheduler.
    pub fn new(options: RendererOptions<L>) -> Self {
        let RendererOptions {
            layer,
            frame,
            events,
            name,
            auto_start,
            timebase,
            damage_merge,
            viewport,
        } = options;
        let name = name.unwrap_or("<unnamed>");

        // Start only once everything is wired.
        let root = RootScheduler::new(RootOptions {
            auto_start: false,
            timebase,
        });
        let mut tools = Tools::new()
            .with_frame(frame.clone())
            .with_scheduler(root.node().clone())
            .with_clock(root.clock());
        if let Some(viewport) = viewport {
            tools = tools.with_viewport(viewport);
        }
        let lifecycles = layer.mount(&tools);
        log::debug!("renderer {name}: mounted {lifecycles:?}");

        let driver = Rc::new(FrameDriver {
            name,
            lifecycles,
            frame,
            events: RefCell::new(events),
            node: root.node().downgrade(),
            view: Cell::new(Rect::ZERO),
            damage_merge,
        });
        let update = driver.clone();
        let render = driver.clone();
        let subscriptions = alloc::vec![
            root.on_update(move |data: &UpdateData| update.update(data.t)),
            root.on_render(move |data: &RenderData| render.render(data)),
        ];

        if auto_start {
            root.start();
        }
        Self {
            layer,
            root,
            driver,
            subscriptions: RefCell::new(subscriptions),
            destroyed: Cell::new(false),
        }
    }
}

impl<L> Renderer<L> {
    /// The root layer.
    #[must_use]
    pub fn layer(&self) -> &L {
        &self.layer
    }

    /// The root scheduler. Layers and the application attach nodes to
    /// [`RootScheduler::node`].
    #[must_use]
    pub fn scheduler(&self) -> &RootScheduler {
        &self.root
    }

    /// The frame drawn into.
    #[must_use]
    pub fn frame(&self) -> &SharedFrame {
        &self.driver.frame
    }

    /// Feeds one display tick. Returns whether a frame ran.
    pub fn tick(&self, now: HostTime) -> bool {
        !self.destroyed.get() && self.root.tick(now)
    }

    /// Runs one frame at `t` milliseconds, running or not.
    pub fn run_frame(&self, t: f64) {
        if self.destroyed.get() {
            log::warn!("renderer {}: run_frame after destroy", self.driver.name);
            return;
        }
        self.root.run_frame(t);
    }

    /// Installs a trace sink on the root scheduler.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        self.root.set_trace_sink(sink);
    }

    /// Stops the frame loop, cleans up the layer and destroys the frame.
    /// Later calls do nothing.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.root.stop();
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            let _ = subscription.unsubscribe();
        }
        self.driver.lifecycles.run_cleanup();
        self.driver.frame.borrow_mut().destroy();
        self.driver.events.borrow_mut().take();
        log::debug!("renderer {}: destroyed", self.driver.name);
    }

    /// Whether [`destroy`](Self::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kurbo::Size;
    use stipple_core::pointer::{Event, Pointer, PointerId};
    use stipple_core::scheduler::Scheduler;
    use stipple_core::transform::Transform;
    use stipple_render::{Color, SoftwareFrame};

    use crate::events::EventQueue;
    use crate::pixel_ratio::PixelRatio;

    #[derive(Default)]
    struct Log {
        pointers: Vec<Vec<Pointer>>,
        events: Vec<Event>,
        draws: Vec<Rect>,
        cleanups: u32,
    }

    /// Reports `damage` on every update and paints every drawn rect white.
    struct Recorder {
        log: Rc<RefCell<Log>>,
        damage: Rc<RefCell<Vec<Rect>>>,
    }

    impl Layer for Recorder {
        fn mount(&self, _tools: &Tools) -> LayerLifecycles {
            let (p, e, d, c) = (
                self.log.clone(),
                self.log.clone(),
                self.log.clone(),
                self.log.clone(),
            );
            let damage = self.damage.clone();
            LayerLifecycles::new()
                .with_pointers(move |list| {
                    p.borrow_mut().pointers.push(list.clone());
                    list
                })
                .with_event(move |event| {
                    e.borrow_mut().events.push(*event);
                    false
                })
                .with_update(move |_| {
                    let rects = core::mem::take(&mut *damage.borrow_mut());
                    (!rects.is_empty()).then_some(rects)
                })
                .with_draw(move |params| {
                    d.borrow_mut().draws.push(params.rect);
                    params.ctx.set_fill(Color::WHITE);
                    params.ctx.fill_rect(params.rect);
                })
                .with_cleanup(move || c.borrow_mut().cleanups += 1)
        }
    }

    struct Fixture {
        renderer: Renderer<Recorder>,
        log: Rc<RefCell<Log>>,
        damage: Rc<RefCell<Vec<Rect>>>,
        frame: Rc<RefCell<SoftwareFrame>>,
        queue: EventQueue,
    }

    fn fixture(merge: DamageMerge) -> Fixture {
        let log = Rc::new(RefCell::new(Log::default()));
        let damage = Rc::new(RefCell::new(Vec::new()));
        let frame = Rc::new(RefCell::new(SoftwareFrame::new(Size::new(40.0, 30.0), 1.0)));
        let queue = EventQueue::new();
        let mut options = RendererOptions::new(
            Recorder {
                log: log.clone(),
                damage: damage.clone(),
            },
            frame.clone(),
        );
        options.events = Some(Box::new(queue.clone()));
        options.name = Some("test");
        options.auto_start = false;
        options.damage_merge = merge;
        Fixture {
            renderer: Renderer::new(options),
            log,
            damage,
            frame,
            queue,
        }
    }

    #[test]
    fn first_frame_draws_the_whole_view() {
        let f = fixture(DamageMerge::None);
        f.damage.borrow_mut().push(Rect::new(0.0, 0.0, 1.0, 1.0));
        f.renderer.run_frame(0.0);
        assert_eq!(
            f.log.borrow().draws,
            vec![Rect::new(0.0, 0.0, 40.0, 30.0)],
            "resize replaces layer damage"
        );
        assert_eq!(f.frame.borrow().surface().pixel(39, 29), Some(Color::WHITE));
    }

    #[test]
    fn later_frames_draw_reported_damage() {
        let f = fixture(DamageMerge::None);
        f.renderer.run_frame(0.0);
        f.log.borrow_mut().draws.clear();

        f.renderer.run_frame(16.0);
        assert!(f.log.borrow().draws.is_empty(), "no damage, no draw");

        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 15.0, 15.0);
        f.damage.borrow_mut().extend([a, b]);
        f.renderer.run_frame(32.0);
        assert_eq!(f.log.borrow().draws, vec![a, b]);
    }

    #[test]
    fn merge_option_combines_rects() {
        let f = fixture(DamageMerge::Intersecting);
        f.renderer.run_frame(0.0);
        f.log.borrow_mut().draws.clear();
        f.damage.borrow_mut().extend([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, 15.0, 15.0),
        ]);
        f.renderer.run_frame(16.0);
        assert_eq!(f.log.borrow().draws, vec![Rect::new(0.0, 0.0, 15.0, 15.0)]);
    }

    #[test]
    fn input_reaches_the_layer() {
        let f = fixture(DamageMerge::None);
        let pointer = Pointer {
            pointer_id: PointerId(1),
            x: 3.0,
            y: 4.0,
            primary: true,
        };
        f.queue.pointer_enter(pointer);
        f.queue.wheel(0.0, 1.0);
        f.renderer.run_frame(0.0);
        let log = f.log.borrow();
        assert_eq!(log.pointers, vec![vec![pointer]]);
        assert_eq!(
            log.events,
            vec![
                Event::PointerEnter { pointer_id: PointerId(1) },
                Event::Wheel { delta_x: 0.0, delta_y: 1.0 },
            ]
        );
    }

    #[test]
    fn child_scheduler_damage_is_drawn_in_root_space() {
        let f = fixture(DamageMerge::None);
        f.renderer.run_frame(0.0);
        f.log.borrow_mut().draws.clear();

        let child = Scheduler::with_transform(Transform::translation(10.0, 10.0));
        f.renderer.scheduler().add_child(&child);
        child.request_frame_render(Rect::new(0.0, 0.0, 5.0, 5.0));
        f.renderer.run_frame(16.0);
        assert_eq!(f.log.borrow().draws, vec![Rect::new(10.0, 10.0, 15.0, 15.0)]);
    }

    /// Records the frame's pixel ratio from inside draw.
    struct RatioReader(Rc<RefCell<Vec<f64>>>);

    impl Layer for RatioReader {
        fn mount(&self, tools: &Tools) -> LayerLifecycles {
            let frame = tools.frame();
            let seen = self.0.clone();
            LayerLifecycles::new().with_draw(move |params| {
                seen.borrow_mut().push(frame.borrow().pixel_ratio());
                params.ctx.set_fill(Color::WHITE);
                params.ctx.fill_rect(frame.borrow().view());
            })
        }
    }

    #[test]
    fn draw_may_read_the_frame() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let frame = Rc::new(RefCell::new(SoftwareFrame::new(Size::new(8.0, 8.0), 1.5)));
        let mut options = RendererOptions::new(RatioReader(seen.clone()), frame.clone());
        options.auto_start = false;
        let renderer = Renderer::new(options);
        renderer.run_frame(0.0);
        assert_eq!(*seen.borrow(), vec![1.5]);
        assert_eq!(frame.borrow().surface().pixel(11, 11), Some(Color::WHITE));
    }

    #[test]
    fn scaled_child_is_drawn_where_it_reported_damage() {
        let log = Rc::new(RefCell::new(Log::default()));
        let damage = Rc::new(RefCell::new(Vec::new()));
        let frame = Rc::new(RefCell::new(SoftwareFrame::new(Size::new(40.0, 30.0), 2.0)));
        let child = Recorder {
            log: log.clone(),
            damage: damage.clone(),
        };
        let mut options = RendererOptions::new(PixelRatio::new(Rc::new(child)), frame.clone());
        options.auto_start = false;
        let renderer = Renderer::new(options);

        renderer.run_frame(0.0);
        assert_eq!(log.borrow().draws, vec![Rect::new(0.0, 0.0, 40.0, 30.0)]);
        log.borrow_mut().draws.clear();

        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        damage.borrow_mut().push(rect);
        renderer.run_frame(16.0);
        assert_eq!(log.borrow().draws, vec![rect]);
    }

    #[test]
    fn destroy_stops_everything_once() {
        let f = fixture(DamageMerge::None);
        f.renderer.scheduler().start();
        assert!(f.renderer.tick(HostTime(0)));
        f.renderer.destroy();
        f.renderer.destroy();
        assert!(f.renderer.is_destroyed());
        assert_eq!(f.log.borrow().cleanups, 1);
        assert!(f.frame.borrow().is_destroyed());
        assert!(!f.renderer.tick(HostTime(1_000_000)));
        assert!(!f.frame.borrow_mut().update());
    }
}
