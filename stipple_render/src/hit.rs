// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Color-coded hit testing.
//!
//! Every hittable object gets a unique opaque color. To find what lies under
//! a pointer, the engine repaints the candidate geometry into a 1×1 probe
//! surface positioned so that the pointer's pixel is the probe's only pixel,
//! using each object's color instead of its real paint. The color that ends
//! up in the probe names the object.
//!
//! This reuses the exact paint geometry of each object, so arbitrary shapes
//! hit-test correctly without per-shape geometry code. The cost is one draw
//! callback per pointer per frame; results are cached per pointer until the
//! frame time or the pointer position changes.

use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;
use stipple_core::pointer::PointerId;

use crate::context::{Color, DrawContext};
use crate::surface::PixelSurface;

/// A 24-bit opaque color identifying one hit object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitColor(u32);

impl HitColor {
    /// Packs opaque RGB channels.
    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// The `0xRRGGBB` value.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// The opaque paint color to draw this object with.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "each channel is masked to 8 bits")]
    pub const fn to_color(self) -> Color {
        Color::rgb(
            (self.0 >> 16) as u8 & 0xff,
            (self.0 >> 8) as u8 & 0xff,
            self.0 as u8 & 0xff,
        )
    }
}

impl fmt::Display for HitColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl fmt::Debug for HitColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HitColor({self})")
    }
}

const COLOR_SPACE: u32 = 1 << 24;
const COLOR_MASK: u32 = COLOR_SPACE - 1;
const PRIME: u64 = 16_777_199;
const HALF_PRIME: u64 = 8_388_599;

/// Quadratic-residue permutation of `[0, 2^24)`. The 17 values at or above
/// the prime map to themselves.
fn permute(x: u32) -> u32 {
    let x = u64::from(x);
    if x >= PRIME {
        return u32::try_from(x).unwrap_or(0);
    }
    let residue = x * x % PRIME;
    let out = if x <= HALF_PRIME { residue } else { PRIME - residue };
    u32::try_from(out).unwrap_or(0)
}

/// Pseudo-random sequence of distinct 24-bit colors.
///
/// Built from two rounds of a prime quadratic-residue permutation around an
/// offset (the seed), walked with an incrementing index. Each index in the
/// 24-bit space is used at most once, so colors never repeat within one
/// sequence. Black is skipped.
#[derive(Clone, Debug)]
pub struct UniqueColors {
    offset: u32,
    index: u32,
    consumed: u32,
}

impl UniqueColors {
    /// Starts a sequence with an explicit seed.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self {
            offset: seed,
            index: permute((permute(1) + 0x0068_2f01) & COLOR_MASK),
            consumed: 0,
        }
    }

    /// Starts a sequence with the default seed.
    ///
    /// Sequences with different seeds are different orderings of the same
    /// space; two sequences can still hand out the same color.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(Self::DEFAULT_SEED)
    }

    /// Seed used by [`new`](Self::new).
    pub const DEFAULT_SEED: u32 = 0;

    /// The seed this sequence was started with.
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.offset
    }

    fn nth(&self, n: u32) -> u32 {
        permute(((permute(n).wrapping_add(self.offset)) & COLOR_MASK) ^ 0x005b_f036)
    }

    /// Number of colors left.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        COLOR_SPACE - self.consumed
    }

    /// The next color.
    ///
    /// # Panics
    ///
    /// Panics once all 2^24 indices have been consumed.
    pub fn next_color(&mut self) -> HitColor {
        loop {
            assert!(self.consumed < COLOR_SPACE, "hit color space exhausted");
            let n = self.index;
            self.index = (self.index + 1) & COLOR_MASK;
            self.consumed += 1;
            let value = self.nth(n);
            if value != 0 {
                return HitColor(value);
            }
        }
    }
}

impl Default for UniqueColors {
    fn default() -> Self {
        Self::new()
    }
}

type Bucket<T> = Rc<RefCell<Vec<(u64, T)>>>;

#[derive(Clone, Copy)]
struct CachedHit {
    x: f64,
    y: f64,
    color: Option<HitColor>,
}

struct EngineInner<T> {
    colors: RefCell<UniqueColors>,
    probe: RefCell<PixelSurface>,
    time: Cell<f64>,
    cache: RefCell<BTreeMap<PointerId, CachedHit>>,
    buckets: RefCell<BTreeMap<HitColor, Bucket<T>>>,
}

/// Draw callback handed to [`HitEngine::hit`]: paints candidate geometry
/// with hit colors at frame time `t`, restricted to `rect`.
pub type HitDraw<'a> = dyn FnMut(&mut dyn DrawContext, f64, Rect) + 'a;

/// Allocates hit colors and decodes probe pixels back to values.
///
/// Cloning shares the engine.
pub struct HitEngine<T> {
    inner: Rc<EngineInner<T>>,
}

impl<T> Clone for HitEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for HitEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitEngine")
            .field("objects", &self.inner.buckets.borrow().len())
            .field("remaining_colors", &self.inner.colors.borrow().remaining())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Default for HitEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> HitEngine<T> {
    /// Creates an engine with the default color seed.
    ///
    /// The colors an engine hands out depend only on its seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_colors(UniqueColors::new())
    }

    /// Creates an engine with a fixed color seed.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::with_colors(UniqueColors::with_seed(seed))
    }

    fn with_colors(colors: UniqueColors) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                colors: RefCell::new(colors),
                probe: RefCell::new(PixelSurface::new(1, 1)),
                time: Cell::new(f64::NAN),
                cache: RefCell::new(BTreeMap::new()),
                buckets: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Allocates a new color with an empty responder set.
    ///
    /// # Panics
    ///
    /// Panics if the engine's color space is exhausted.
    #[must_use]
    pub fn create(&self) -> HitObject<T> {
        let color = self.inner.colors.borrow_mut().next_color();
        let responders: Bucket<T> = Rc::default();
        self.inner
            .buckets
            .borrow_mut()
            .insert(color, responders.clone());
        HitObject {
            color,
            responders,
            next_key: Cell::new(0),
            engine: Rc::downgrade(&self.inner),
        }
    }

    /// The seed of this engine's color sequence.
    #[must_use]
    pub fn seed(&self) -> u32 {
        self.inner.colors.borrow().seed()
    }

    /// Number of live hit objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.buckets.borrow().len()
    }

    /// Whether the engine has no live hit objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the values registered under the object painted at `(x, y)`.
    ///
    /// `draw` is called with the probe context already set up so that
    /// drawing in frame coordinates lands the pixel `(x, y)` on the probe.
    /// It must paint each candidate with its [`HitObject::color`], fully
    /// opaque. It is skipped when `pointer_id` was already probed at the same
    /// position during the same frame `time`.
    ///
    /// Returns `None` when nothing was painted there or the color belongs to
    /// no live object.
    pub fn hit(
        &self,
        draw: &mut HitDraw<'_>,
        time: f64,
        pointer_id: PointerId,
        x: f64,
        y: f64,
    ) -> Option<Vec<T>> {
        if self.inner.time.get().to_bits() != time.to_bits() {
            self.inner.time.set(time);
            self.inner.cache.borrow_mut().clear();
        }
        let color = self.hit_color(draw, time, pointer_id, x, y)?;
        let bucket = self.inner.buckets.borrow().get(&color).cloned()?;
        let values = bucket.borrow().iter().map(|(_, v)| v.clone()).collect();
        Some(values)
    }

    fn hit_color(
        &self,
        draw: &mut HitDraw<'_>,
        time: f64,
        pointer_id: PointerId,
        x: f64,
        y: f64,
    ) -> Option<HitColor> {
        if let Some(cached) = self.inner.cache.borrow().get(&pointer_id)
            && cached.x == x
            && cached.y == y
        {
            return cached.color;
        }
        let color = {
            let mut probe = self.inner.probe.borrow_mut();
            probe.save();
            probe.reset_transform();
            probe.clear_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
            probe.translate(-x, -y);
            draw(&mut *probe, time, Rect::new(x, y, x + 1.0, y + 1.0));
            probe.restore();
            probe
                .pixel(0, 0)
                .filter(|px| px.a != 0)
                .map(|px| HitColor::from_rgb(px.r, px.g, px.b))
        };
        self.inner
            .cache
            .borrow_mut()
            .insert(pointer_id, CachedHit { x, y, color });
        color
    }
}

/// One color bucket in a [`HitEngine`].
///
/// Dropping it frees the bucket; its color then decodes to nothing.
pub struct HitObject<T> {
    color: HitColor,
    responders: Bucket<T>,
    next_key: Cell<u64>,
    engine: Weak<EngineInner<T>>,
}

impl<T> fmt::Debug for HitObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitObject")
            .field("color", &self.color)
            .field("responders", &self.responders.borrow().len())
            .finish()
    }
}

impl<T: 'static> HitObject<T> {
    /// The color to paint this object's geometry with during hit draws.
    #[must_use]
    pub fn color(&self) -> HitColor {
        self.color
    }

    /// Adds `value` to this object's responders.
    pub fn register(&self, value: T) -> Registration {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        self.responders.borrow_mut().push((key, value));
        let bucket = Rc::downgrade(&self.responders);
        Registration {
            remove: Some(alloc::boxed::Box::new(move || {
                if let Some(bucket) = bucket.upgrade() {
                    bucket.borrow_mut().retain(|(k, _)| *k != key);
                }
            })),
        }
    }

    /// Number of registered responders.
    #[must_use]
    pub fn responders_len(&self) -> usize {
        self.responders.borrow().len()
    }
}

impl<T> Drop for HitObject<T> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.buckets.borrow_mut().remove(&self.color);
        }
    }
}

/// Handle returned by [`HitObject::register`].
pub struct Registration {
    remove: Option<alloc::boxed::Box<dyn FnOnce()>>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}

impl Registration {
    /// Removes the registered value.
    pub fn unregister(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use alloc::vec;

    #[test]
    fn colors_are_distinct_and_never_black() {
        let mut colors = UniqueColors::with_seed(42);
        let mut seen = BTreeSet::new();
        for _ in 0..5000 {
            let c = colors.next_color();
            assert_ne!(c.to_u32(), 0);
            assert!(c.to_u32() < COLOR_SPACE);
            assert!(seen.insert(c), "duplicate color {c}");
        }
    }

    #[test]
    fn engines_with_the_same_seed_agree() {
        let first = HitEngine::<u8>::new();
        let _other = HitEngine::<u8>::with_seed(99).create();
        let second = HitEngine::<u8>::new();
        assert_eq!(first.seed(), UniqueColors::DEFAULT_SEED);
        assert_eq!(first.create().color(), second.create().color());
    }

    #[test]
    fn seeds_change_the_order() {
        let a = UniqueColors::with_seed(1).next_color();
        let b = UniqueColors::with_seed(2).next_color();
        assert_ne!(a, b);
    }

    #[test]
    fn permute_is_a_bijection_near_the_edges() {
        let mut seen = BTreeSet::new();
        for x in (0..1000).chain(COLOR_SPACE - 1000..COLOR_SPACE) {
            assert!(seen.insert(permute(x)), "collision at {x}");
        }
    }

    #[test]
    #[should_panic(expected = "hit color space exhausted")]
    fn exhausted_space_panics() {
        let mut colors = UniqueColors::with_seed(0);
        colors.consumed = COLOR_SPACE - 1;
        let _ = colors.next_color();
        let _ = colors.next_color();
    }

    #[test]
    fn color_formatting() {
        let c = HitColor::from_rgb(0x01, 0xab, 0xff);
        assert_eq!(alloc::format!("{c}"), "#01abff");
        assert_eq!(c.to_color(), Color::rgb(0x01, 0xab, 0xff));
    }

    fn square_draw(
        color: HitColor,
        calls: Rc<Cell<u32>>,
    ) -> impl FnMut(&mut dyn DrawContext, f64, Rect) {
        move |ctx, _t, _rect| {
            calls.set(calls.get() + 1);
            ctx.set_fill(color.to_color());
            ctx.fill_rect(Rect::new(10.0, 10.0, 20.0, 20.0));
        }
    }

    #[test]
    fn hit_decodes_registered_values() {
        let engine = HitEngine::<&'static str>::with_seed(7);
        let object = engine.create();
        let _reg = object.register("square");
        let calls = Rc::new(Cell::new(0));
        let mut draw = square_draw(object.color(), calls.clone());

        assert_eq!(
            engine.hit(&mut draw, 0.0, PointerId(1), 15.0, 15.0),
            Some(vec!["square"])
        );
        assert_eq!(engine.hit(&mut draw, 0.0, PointerId(1), 5.0, 5.0), None);
        assert_eq!(engine.hit(&mut draw, 0.0, PointerId(1), 19.0, 10.0), Some(vec!["square"]));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn hit_is_cached_per_pointer_and_frame() {
        let engine = HitEngine::<u8>::with_seed(7);
        let object = engine.create();
        let _reg = object.register(1);
        let calls = Rc::new(Cell::new(0));
        let mut draw = square_draw(object.color(), calls.clone());

        let _ = engine.hit(&mut draw, 16.0, PointerId(1), 15.0, 15.0);
        let _ = engine.hit(&mut draw, 16.0, PointerId(1), 15.0, 15.0);
        assert_eq!(calls.get(), 1, "same pointer, position and time");
        let _ = engine.hit(&mut draw, 16.0, PointerId(2), 15.0, 15.0);
        assert_eq!(calls.get(), 2, "other pointer");
        let _ = engine.hit(&mut draw, 32.0, PointerId(1), 15.0, 15.0);
        assert_eq!(calls.get(), 3, "new frame");
    }

    #[test]
    fn unregister_and_drop() {
        let engine = HitEngine::<u8>::with_seed(3);
        let object = engine.create();
        let a = object.register(1);
        let _b = object.register(2);
        a.unregister();
        assert_eq!(object.responders_len(), 1);

        let calls = Rc::new(Cell::new(0));
        let mut draw = square_draw(object.color(), calls);
        assert_eq!(engine.hit(&mut draw, 0.0, PointerId(1), 12.0, 12.0), Some(vec![2]));
        drop(object);
        assert!(engine.is_empty());
        assert_eq!(engine.hit(&mut draw, 1.0, PointerId(1), 12.0, 12.0), None);
    }
}
