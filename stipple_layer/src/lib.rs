// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mountable layers and the renderer that drives them.
//!
//! A [`Layer`] is mounted once with a [`Tools`] context and returns its
//! [`LayerLifecycles`]: optional pointer, event, update, draw and cleanup
//! callbacks. Layers compose by merging their lifecycles
//! ([`LayerLifecycles::merge`], [`Group`]) or by wrapping one another
//! ([`BoxLayer`], [`PixelRatio`]).
//!
//! ```text
//!  EventSource ──► pointers / events ─┐
//!                                     ▼
//!  RootScheduler ── update ──► root layer update ──► damage rects
//!        │                                               │
//!        └──── render ◄── request_frame_render ◄─────────┘
//!                 │
//!                 └──► root layer draw, once per rect, into the Frame
//! ```
//!
//! [`HitResponder`] is a ready-made layer that claims the pointers over a
//! shape using color-coded hit testing.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod box_layer;
mod events;
mod group;
mod hit_responder;
mod lifecycle;
mod pixel_ratio;
mod renderer;
mod tools;
mod viewport;

pub use box_layer::{BoxCoords, BoxLayer};
pub use events::{EventQueue, EventSource};
pub use group::Group;
pub use hit_responder::{HitResponder, HitShape};
pub use lifecycle::{
    CleanupFn, DrawFn, DrawParams, EventFn, Layer, LayerLifecycles, PointersFn, UpdateFn,
    UpdateParams,
};
pub use pixel_ratio::PixelRatio;
pub use renderer::{DamageMerge, Renderer, RendererOptions};
pub use tools::{SharedFrame, Tools, ToolsError};
pub use viewport::Viewport;
