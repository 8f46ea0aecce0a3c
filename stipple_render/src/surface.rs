// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A CPU pixel buffer implementing [`DrawContext`].
//!
//! Coverage is point-sampled: a pixel is painted when its center lies inside
//! the shape. There is no antialiasing, so every painted pixel carries the
//! exact fill color. The hit engine relies on that to decode colors.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};

use crate::context::{Color, DrawContext};

#[derive(Clone, Copy, Debug)]
struct State {
    transform: Affine,
    fill: Color,
    /// Device-space clip; `None` is the whole surface.
    clip: Option<Rect>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Color::BLACK,
            clip: None,
        }
    }
}

/// A `width × height` RGBA8 buffer, row-major, straight alpha.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    data: Vec<u8>,
    state: State,
    stack: Vec<State>,
}

impl PixelSurface {
    /// Creates a transparent surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; buffer_len(width, height)],
            state: State::default(),
            stack: Vec::new(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reallocates to a new size. Contents and drawing state are reset.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data = vec![0; buffer_len(width, height)];
        self.state = State::default();
        self.stack.clear();
    }

    /// Reads one pixel, or `None` outside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.data.get(i..i + 4)?;
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// The device rect in which painting may happen, as pixel index ranges.
    fn pixel_span(&self, device: Rect) -> Option<(u32, u32, u32, u32)> {
        let mut bounds = Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height));
        if let Some(clip) = self.state.clip {
            bounds = bounds.intersect(clip);
        }
        let area = device.intersect(bounds).expand();
        if area.width() <= 0.0 || area.height() <= 0.0 {
            return None;
        }
        Some((
            to_index(area.x0),
            to_index(area.y0),
            to_index(area.x1),
            to_index(area.y1),
        ))
    }

    fn clip_allows(&self, center: Point) -> bool {
        self.state.clip.is_none_or(|clip| clip.contains(center))
    }

    fn paint(&mut self, device_bbox: Rect, covers: impl Fn(Point) -> bool, color: Option<Color>) {
        let Some((x0, y0, x1, y1)) = self.pixel_span(device_bbox) else {
            return;
        };
        let width = self.width as usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if !self.clip_allows(center) || !covers(center) {
                    continue;
                }
                let i = (y as usize * width + x as usize) * 4;
                let Some(px) = self.data.get_mut(i..i + 4) else {
                    continue;
                };
                match color {
                    Some(color) => blend(px, color),
                    None => px.fill(0),
                }
            }
        }
    }
}

fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "callers pass values already clamped to the surface size"
)]
fn to_index(v: f64) -> u32 {
    v.max(0.0) as u32
}

/// Source-over blend of `src` onto the straight-alpha pixel `dst`.
fn blend(dst: &mut [u8], src: Color) {
    let sa = u32::from(src.a);
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.copy_from_slice(&src.to_array());
        return;
    }
    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    let out_a = sa + da * inv / 255;
    let src_rgb = [src.r, src.g, src.b];
    for (d, s) in dst.iter_mut().zip(src_rgb) {
        let c = (u32::from(s) * sa + u32::from(*d) * da * inv / 255) / out_a;
        *d = u8::try_from(c).unwrap_or(u8::MAX);
    }
    dst[3] = u8::try_from(out_a).unwrap_or(u8::MAX);
}

impl DrawContext for PixelSurface {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform *= Affine::translate(Vec2::new(x, y));
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.state.transform *= Affine::scale_non_uniform(x, y);
    }

    fn set_fill(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn fill_rect(&mut self, rect: Rect) {
        let device = self.state.transform.transform_rect_bbox(rect);
        let color = self.state.fill;
        self.paint(device, |p| device.contains(p), Some(color));
    }

    fn fill_path(&mut self, path: &BezPath) {
        let device = self.state.transform * path.clone();
        let bbox = device.bounding_box();
        let color = self.state.fill;
        self.paint(bbox, |p| device.winding(p) != 0, Some(color));
    }

    fn clear_rect(&mut self, rect: Rect) {
        let device = self.state.transform.transform_rect_bbox(rect);
        self.paint(device, |p| device.contains(p), None);
    }

    fn clip_rect(&mut self, rect: Rect) {
        let device = self.state.transform.transform_rect_bbox(rect);
        self.state.clip = Some(match self.state.clip {
            Some(clip) => clip.intersect(device),
            None => device,
        });
    }
}
