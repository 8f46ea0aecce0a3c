// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage-propagating scheduler tree.
//!
//! A [`RootScheduler`] owns the frame loop. Any number of [`Scheduler`]
//! nodes hang below it, each optionally carrying a
//! [`Transform`](crate::transform::Transform) from its parent's space into its
//! own. Every frame the root drives three phases down the tree:
//!
//! ```text
//!   tick ──► update ──► post-update ──► render(t, [])
//!                                          │
//!             parent rects, mapped down ◄──┤
//!             child rects, mapped up   ──►─┘
//! ```
//!
//! Damage requested anywhere is seen by the requesting node, by every
//! descendant (mapped into their space) and by every ancestor.

mod node;
mod root;

pub use node::{RenderData, Scheduler, UpdateData, WeakScheduler};
pub use root::{FrameClock, RootOptions, RootScheduler};
