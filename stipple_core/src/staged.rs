// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Values written at any time and published once per frame.

/// A value with a staged copy and a committed copy.
///
/// Writers call [`set`](Self::set) whenever they like; readers on the draw path
/// use [`committed`](Self::committed). The owner calls
/// [`commit`](Self::commit) during update to publish the staged value.
#[derive(Clone, Debug, Default)]
pub struct Staged<T> {
    staged: T,
    committed: T,
}

impl<T: Clone + PartialEq> Staged<T> {
    /// Creates a value whose staged and committed copies are both `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            staged: value.clone(),
            committed: value,
        }
    }

    /// The staged value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.staged
    }

    /// Replaces the staged value.
    pub fn set(&mut self, value: T) {
        self.staged = value;
    }

    /// Edits the staged value in place.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.staged);
    }

    /// The last committed value.
    #[must_use]
    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Publishes the staged value. Returns `true` if the committed value
    /// changed.
    pub fn commit(&mut self) -> bool {
        if self.staged == self.committed {
            return false;
        }
        self.committed = self.staged.clone();
        true
    }
}
