// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surfaces, damage tracking and color-coded hit testing for stipple.
//!
//! This crate sits between [`stipple_core`]'s frame scheduling and whatever
//! ends up showing pixels. It defines:
//!
//! - [`DrawContext`]: the immediate-mode 2D interface layers paint through
//! - [`PixelSurface`]: a CPU RGBA buffer implementing it
//! - [`Frame`] and [`SoftwareFrame`]: a drawable surface tracking its host
//!   element's size and pixel ratio
//! - [`DamageRegion`]: what part of a frame needs redrawing
//! - [`HitEngine`]: maps unique paint colors back to the objects that
//!   painted them

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod context;
mod damage;
mod frame;
mod hit;
mod surface;

pub use context::{Color, DrawContext};
pub use damage::DamageRegion;
pub use frame::{Frame, FrameMetrics, SoftwareFrame};
pub use hit::{HitColor, HitDraw, HitEngine, HitObject, Registration, UniqueColors};
pub use surface::PixelSurface;
