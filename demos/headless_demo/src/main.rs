// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless frame loop that exercises layers, hit testing and tracing.
//!
//! Mounts a background, a draggable box and a [`HitResponder`] over the box
//! into a [`Renderer`] drawing into a 320x240 [`SoftwareFrame`]. A scripted
//! pointer enters, grabs the box, drags it to the right and leaves. Every
//! frame is reported to a [`PrettyPrintSink`] and collected by a
//! [`ChromeTraceSink`], which is written to `stipple-trace.json` at the end.
//!
//! Set `RUST_LOG=debug` to see the renderer's own logging.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Rect, Size};
use stipple_core::pointer::{Capture, Pointer, PointerCaptures, PointerId};
use stipple_core::time::{HostTime, Timebase};
use stipple_core::trace::{
    FrameBeginEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};
use stipple_debug::chrome::ChromeTraceSink;
use stipple_debug::pretty::PrettyPrintSink;
use stipple_layer::{
    BoxCoords, BoxLayer, DrawParams, EventQueue, Group, HitResponder, Layer, LayerLifecycles,
    Renderer, RendererOptions, SharedFrame, Tools,
};
use stipple_render::{Color, SoftwareFrame};

const FRAME_COUNT: u64 = 60;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
const DRAG_STEP: f64 = 3.0;

/// Fills whatever view it is given with one color.
#[derive(Debug)]
struct Fill(Color);

impl Layer for Fill {
    fn mount(&self, _tools: &Tools) -> LayerLifecycles {
        let color = self.0;
        LayerLifecycles::new().with_draw(move |p: &mut DrawParams<'_>| {
            let area = p.view.intersect(p.rect);
            if area.is_zero_area() {
                return;
            }
            p.ctx.save();
            p.ctx.clip_rect(p.rect);
            p.ctx.set_fill(color);
            p.ctx.fill_rect(area);
            p.ctx.restore();
        })
    }
}

/// Forwards every event to several sinks.
struct Tee(Vec<Box<dyn TraceSink>>);

impl TraceSink for Tee {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.0.iter_mut().for_each(|s| s.on_frame_begin(e));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.0.iter_mut().for_each(|s| s.on_phase_begin(e));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.0.iter_mut().for_each(|s| s.on_phase_end(e));
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        self.0
            .iter_mut()
            .for_each(|s| s.on_damage_rects(frame_index, rects));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.0.iter_mut().for_each(|sink| sink.on_frame_summary(s));
    }
}

fn pointer(x: f64, y: f64) -> Pointer {
    Pointer {
        pointer_id: PointerId(1),
        x,
        y,
        primary: true,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the box stays inside the 320x240 frame"
)]
fn centre_pixel(frame: &SoftwareFrame, rect: Rect) -> Option<Color> {
    let centre = rect.center();
    frame.surface().pixel(centre.x as u32, centre.y as u32)
}

fn main() {
    env_logger::init();

    // -- scene -------------------------------------------------------------
    let frame = Rc::new(RefCell::new(
        SoftwareFrame::new(Size::new(320.0, 240.0), 1.0).with_name("headless"),
    ));
    let shared: SharedFrame = frame.clone();

    let boxed = BoxLayer::with_coords(
        Rc::new(Fill(Color::rgb(0xe0, 0x60, 0x30))),
        BoxCoords {
            x: 100.0,
            y: 70.0,
            width: 80.0,
            height: 60.0,
        },
    );
    let responder = HitResponder::new();
    let shape_box = boxed.clone();
    responder.set_draw(move |ctx, _| ctx.fill_rect(shape_box.coords().rect()));
    let _enter = responder.on_pointer_enter(|id| log::info!("pointer {id} is over the box"));
    let _leave = responder.on_pointer_leave(|id| log::info!("pointer {id} left the box"));

    let scene: Group = Group::with_children(vec![
        Rc::new(Fill(Color::rgb(0x20, 0x24, 0x30))) as Rc<dyn Layer>,
        Rc::new(boxed.clone()),
        Rc::new(responder.clone()),
    ]);

    // -- renderer ----------------------------------------------------------
    let queue = EventQueue::new();
    let mut options = RendererOptions::new(scene, shared);
    options.events = Some(Box::new(queue.clone()));
    options.name = Some("headless");
    options.timebase = Timebase::NANOS;
    let renderer = Renderer::new(options);

    let chrome = ChromeTraceSink::new();
    let pretty = PrettyPrintSink::with_writer(std::io::stdout()).with_rects(true);
    renderer.set_trace_sink(Box::new(Tee(vec![
        Box::new(pretty) as Box<dyn TraceSink>,
        Box::new(chrome.clone()),
    ])));

    // -- scripted input ----------------------------------------------------
    let captures: PointerCaptures<&'static str> = PointerCaptures::new();
    let mut grab: Option<Capture<&'static str>> = None;
    let (mut px, py) = (40.0, 100.0);
    let mut now_ticks: u64 = 1_000_000_000; // start at 1s

    for frame_index in 0..FRAME_COUNT {
        match frame_index {
            10 => queue.pointer_enter(pointer(px, py)),
            15 => {
                px = 130.0;
                queue.pointer_move(pointer(px, py));
            }
            20 => {
                queue.pointer_down(pointer(px, py));
                if responder.is_hovered(PointerId(1)) {
                    grab = Some(captures.capture("box", PointerId(1)));
                }
            }
            21..40 => {
                px += DRAG_STEP;
                queue.pointer_move(pointer(px, py));
                if captures.get(PointerId(1)) == Some("box") {
                    boxed.set_x(boxed.coords().x + DRAG_STEP);
                }
            }
            40 => {
                queue.pointer_up(pointer(px, py));
                if let Some(capture) = grab.take() {
                    capture.release();
                }
            }
            50 => queue.pointer_leave(PointerId(1)),
            _ => {}
        }

        if !renderer.tick(HostTime(now_ticks)) {
            log::warn!("frame {frame_index} did not run");
        }
        now_ticks += REFRESH_INTERVAL_NS;
    }

    let coords = boxed.coords();
    let centre = centre_pixel(&frame.borrow(), coords.rect());
    println!(
        "box ended at x={} ({centre:?} at its centre), {} pointers over it",
        coords.x,
        responder.hovered().len(),
    );
    renderer.destroy();

    // -- export ------------------------------------------------------------
    let path = "stipple-trace.json";
    match File::create(path) {
        Ok(file) => {
            let mut writer = BufWriter::new(file);
            match chrome.write_to(&mut writer) {
                Ok(()) => eprintln!("wrote {} trace events to {path}", chrome.len()),
                Err(e) => eprintln!("failed to write {path}: {e}"),
            }
        }
        Err(e) => eprintln!("failed to create {path}: {e}"),
    }
}
