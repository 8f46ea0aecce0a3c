// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The 2D drawing interface layers paint through.

use core::fmt;

use kurbo::{BezPath, Rect};

/// An 8-bit-per-channel RGBA color with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 0 is fully transparent.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// A color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns this color with its alpha replaced.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// The channels as `[r, g, b, a]`.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// An immediate-mode 2D drawing target.
///
/// The current transform, fill color and clip form a state that
/// [`save`](Self::save) pushes and [`restore`](Self::restore) pops. Transforms
/// compose: each `translate` or `scale` applies in the coordinate space set
/// up by the previous ones.
pub trait DrawContext {
    /// Pushes the current state.
    fn save(&mut self);

    /// Pops the last saved state. Does nothing if nothing was saved.
    fn restore(&mut self);

    /// Resets the transform to identity.
    fn reset_transform(&mut self);

    /// Moves the origin.
    fn translate(&mut self, x: f64, y: f64);

    /// Scales the axes.
    fn scale(&mut self, x: f64, y: f64);

    /// Sets the color used by fills.
    fn set_fill(&mut self, color: Color);

    /// Fills `rect` with the current fill color.
    fn fill_rect(&mut self, rect: Rect);

    /// Fills `path` using the nonzero winding rule.
    fn fill_path(&mut self, path: &BezPath);

    /// Sets every pixel of `rect` to transparent.
    fn clear_rect(&mut self, rect: Rect);

    /// Narrows the clip to `rect`.
    fn clip_rect(&mut self, rect: Rect);
}
