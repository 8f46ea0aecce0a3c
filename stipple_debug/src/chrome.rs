// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`ChromeTraceSink`] collects frame and phase events as they happen,
//! stamped with wall-clock offsets from the sink's creation, and writes them
//! as [Chrome Trace Event Format][format] JSON.
//!
//! The sink is a cheap handle: install one clone on the root scheduler and
//! keep another to export once the run is over.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

use kurbo::Rect;
use serde_json::{Value, json};

use stipple_core::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

#[derive(Debug)]
struct State {
    origin: Instant,
    events: Vec<Value>,
}

/// Collects trace events for `chrome://tracing` or
/// [Perfetto](https://ui.perfetto.dev/).
#[derive(Clone, Debug)]
pub struct ChromeTraceSink(Rc<RefCell<State>>);

impl Default for ChromeTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromeTraceSink {
    /// Creates an empty sink. Timestamps are measured from now.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(State {
            origin: Instant::now(),
            events: Vec::new(),
        })))
    }

    /// Number of events collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().events.len()
    }

    /// Returns `true` if nothing was collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().events.is_empty()
    }

    /// A copy of the collected trace event objects.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.0.borrow().events.clone()
    }

    /// Writes the collected events as a JSON array.
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        let state = self.0.borrow();
        serde_json::to_writer_pretty(&mut *writer, &state.events)?;
        writeln!(writer)
    }

    fn push(&self, make: impl FnOnce(f64) -> Value) {
        let mut state = self.0.borrow_mut();
        let ts = state.origin.elapsed().as_secs_f64() * 1_000_000.0;
        let event = make(ts);
        state.events.push(event);
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.push(|ts| {
            json!({
                "ph": "i",
                "name": "FrameBegin",
                "cat": "Scheduler",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": e.frame_index,
                    "time_ms": e.time,
                }
            })
        });
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.push(|ts| {
            json!({
                "ph": "B",
                "name": e.phase.name(),
                "cat": "Frame",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            })
        });
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.push(|ts| {
            json!({
                "ph": "E",
                "name": e.phase.name(),
                "cat": "Frame",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            })
        });
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        let rects: Vec<[f64; 4]> = rects
            .iter()
            .map(|r| [r.x0, r.y0, r.width(), r.height()])
            .collect();
        self.push(|ts| {
            json!({
                "ph": "i",
                "name": "Damage",
                "cat": "Rich",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame_index": frame_index,
                    "rects": rects,
                }
            })
        });
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.push(|ts| {
            json!({
                "ph": "i",
                "name": "FrameSummary",
                "cat": "Summary",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": s.frame_index,
                    "time_ms": s.time,
                    "damage_rects": s.damage_rects,
                }
            })
        });
    }
}
