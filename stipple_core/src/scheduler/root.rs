// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The root of a scheduler tree and its frame clock.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;

use super::node::{FlagGuard, FrameNode, RenderData, Scheduler, UpdateData};
use crate::subscriber::Subscription;
use crate::time::{HostTime, Timebase};
use crate::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, Tracer,
};

/// Construction options for [`RootScheduler`].
#[derive(Clone, Copy, Debug)]
pub struct RootOptions {
    /// Start running immediately. Defaults to `true`.
    pub auto_start: bool,
    /// Conversion from the tick source's [`HostTime`] to nanoseconds.
    pub timebase: Timebase,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            auto_start: true,
            timebase: Timebase::NANOS,
        }
    }
}

/// Read-only view of a root scheduler's current frame time.
///
/// Cloning shares the same clock.
#[derive(Clone, Debug, Default)]
pub struct FrameClock(Rc<Cell<f64>>);

impl FrameClock {
    /// Milliseconds since the scheduler started, as of the current or last
    /// frame.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.0.get()
    }
}

/// Owns the root node of a scheduler tree and runs its frames.
///
/// A tick source calls [`tick`](Self::tick) once per display refresh. While
/// the scheduler is running each tick runs one complete frame: update, then
/// post-update, then render. A frame is never partially delivered.
///
/// The first tick after [`start`](Self::start) is frame time zero; later
/// ticks report the elapsed milliseconds.
pub struct RootScheduler {
    node: Scheduler,
    clock: FrameClock,
    timebase: Timebase,
    running: Cell<bool>,
    start_time: Cell<Option<HostTime>>,
    in_frame: Cell<bool>,
    frame_index: Cell<u64>,
    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

impl fmt::Debug for RootScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootScheduler")
            .field("node", &self.node)
            .field("time", &self.clock.now())
            .field("timebase", &self.timebase)
            .field("running", &self.running.get())
            .field("frame_index", &self.frame_index.get())
            .finish_non_exhaustive()
    }
}

impl Default for RootScheduler {
    fn default() -> Self {
        Self::new(RootOptions::default())
    }
}

impl RootScheduler {
    /// Creates a root scheduler.
    #[must_use]
    pub fn new(options: RootOptions) -> Self {
        let root = Self {
            node: Scheduler::new_root(),
            clock: FrameClock::default(),
            timebase: options.timebase,
            running: Cell::new(false),
            start_time: Cell::new(None),
            in_frame: Cell::new(false),
            frame_index: Cell::new(0),
            sink: RefCell::new(None),
        };
        if options.auto_start {
            root.start();
        }
        root
    }

    /// Starts the frame loop and resets the time origin. Does nothing if
    /// already running.
    pub fn start(&self) {
        if self.running.get() {
            return;
        }
        self.start_time.set(None);
        self.running.set(true);
    }

    /// Stops the frame loop. Further ticks are ignored until the next
    /// [`start`](Self::start).
    pub fn stop(&self) {
        self.running.set(false);
    }

    /// Whether ticks currently run frames.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Feeds one tick from the tick source. Runs a frame and returns `true`
    /// if the scheduler is running.
    pub fn tick(&self, now: HostTime) -> bool {
        if !self.running.get() {
            return false;
        }
        let start = match self.start_time.get() {
            Some(start) => start,
            None => {
                self.start_time.set(Some(now));
                now
            }
        };
        let t = now
            .saturating_duration_since(start)
            .as_millis_f64(self.timebase);
        self.run_frame(t);
        true
    }

    /// Runs one full frame at time `t` (milliseconds), regardless of the
    /// running state.
    ///
    /// Calls from inside a frame are ignored with a warning. A frame that
    /// unwinds does not block later frames.
    pub fn run_frame(&self, t: f64) {
        let Some(_in_frame) = FlagGuard::raise(&self.in_frame) else {
            log::warn!("run_frame called from inside a frame, ignored");
            return;
        };
        self.clock.0.set(t);
        let frame_index = self.frame_index.get();
        self.frame_index.set(frame_index + 1);

        let mut sink = self.sink.borrow_mut().take();
        let mut tracer = match sink.as_deref_mut() {
            Some(s) => Tracer::new(s),
            None => Tracer::none(),
        };

        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            time: t,
        });

        let node: &dyn FrameNode = &*self.node.0;
        phase(&mut tracer, frame_index, PhaseKind::Update, || {
            node.on_frame_update(t);
        });
        phase(&mut tracer, frame_index, PhaseKind::PostUpdate, || {
            node.on_frame_post_update(t);
        });
        let outcome = phase(&mut tracer, frame_index, PhaseKind::Render, || {
            self.node.0.render(t, &[])
        });

        tracer.damage_rects(frame_index, &outcome.emitted);
        tracer.frame_summary(&FrameSummary {
            frame_index,
            time: t,
            damage_rects: outcome.emitted.len(),
        });
        drop(tracer);

        // A sink installed during the frame wins over the one taken out.
        let mut slot = self.sink.borrow_mut();
        if slot.is_none() {
            *slot = sink;
        }
    }

    /// Frame time of the current or last frame, in milliseconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// A shareable handle to the frame time.
    #[must_use]
    pub fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_index.get()
    }

    /// The root node. Children are attached to it.
    #[must_use]
    pub fn node(&self) -> &Scheduler {
        &self.node
    }

    /// Installs a sink for frame trace events, replacing any previous one.
    ///
    /// Events are only dispatched with the `trace` feature enabled.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }

    /// Removes and returns the trace sink.
    pub fn take_trace_sink(&self) -> Option<Box<dyn TraceSink>> {
        self.sink.borrow_mut().take()
    }

    /// See [`Scheduler::request_frame_render`].
    pub fn request_frame_render(&self, rect: impl Into<Option<Rect>>) {
        self.node.request_frame_render(rect);
    }

    /// See [`Scheduler::add_child`].
    pub fn add_child(&self, child: &Scheduler) {
        self.node.add_child(child);
    }

    /// See [`Scheduler::remove_child`].
    pub fn remove_child(&self, child: &Scheduler) {
        self.node.remove_child(child);
    }

    /// See [`Scheduler::has_child`].
    #[must_use]
    pub fn has_child(&self, child: &Scheduler) -> bool {
        self.node.has_child(child)
    }

    /// See [`Scheduler::is_rendering`].
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.node.is_rendering()
    }

    /// See [`Scheduler::on_update`].
    pub fn on_update(&self, callback: impl Fn(&UpdateData) + 'static) -> Subscription {
        self.node.on_update(callback)
    }

    /// See [`Scheduler::on_post_update`].
    pub fn on_post_update(&self, callback: impl Fn(&UpdateData) + 'static) -> Subscription {
        self.node.on_post_update(callback)
    }

    /// See [`Scheduler::on_render`].
    pub fn on_render(&self, callback: impl Fn(&RenderData) + 'static) -> Subscription {
        self.node.on_render(callback)
    }
}

fn phase<R>(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind, f: impl FnOnce() -> R) -> R {
    tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
    let out = f();
    tracer.phase_end(&PhaseEndEvent { frame_index, phase });
    out
}
