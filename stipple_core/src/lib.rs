// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage-tracking scheduler tree and input model for retained 2D scenes.
//!
//! `stipple_core` is the platform-independent heart of Stipple. It is
//! `no_std` compatible (with `alloc`) and single-threaded: shared state lives
//! in `Rc`, `Cell` and `RefCell`.
//!
//! # Architecture
//!
//! ```text
//!   tick source ──► RootScheduler::tick(HostTime)
//!                        │
//!                        ▼
//!            update ─► post-update ─► render
//!                                       │
//!             Scheduler nodes ◄─────────┘  damage rects flow down
//!             (one per subtree)            (mapped by Transform) and
//!                                          back up to every ancestor
//! ```
//!
//! **[`scheduler`]**: the [`RootScheduler`](scheduler::RootScheduler) frame
//! loop and the [`Scheduler`](scheduler::Scheduler) tree through which damage
//! rects propagate.
//!
//! **[`rect`]**: rect intersection, clipping and the two damage merges,
//! with [`grid`] holding the cell grid behind the exact merge.
//!
//! **[`transform`]**: translate / scale stacks with cached inverses.
//!
//! **[`pointer`]**: pointer snapshots, input events and pointer captures.
//!
//! **[`staged`]**: stage-then-commit values for per-frame publication.
//!
//! **[`subscriber`]**: callback lists with unsubscribe tokens.
//!
//! **[`time`]**: host time and timebase conversion.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod grid;
pub mod pointer;
pub mod rect;
pub mod scheduler;
pub mod staged;
pub mod subscriber;
pub mod time;
pub mod trace;
pub mod transform;
