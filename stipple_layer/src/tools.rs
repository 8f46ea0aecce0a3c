// Copyright 2026 the Stipple Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The context handed to layers when they mount.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use stipple_core::scheduler::{FrameClock, Scheduler};
use stipple_render::Frame;

use crate::viewport::Viewport;

/// A frame shared between the renderer and the layers drawing into it.
pub type SharedFrame = Rc<RefCell<dyn Frame>>;

/// A dependency was requested from a [`Tools`] that was never given one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolsError {
    /// No frame was provided.
    MissingFrame,
    /// No scheduler was provided.
    MissingScheduler,
    /// No frame clock was provided.
    MissingClock,
    /// No viewport was provided.
    MissingViewport,
}

impl fmt::Display for ToolsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::MissingFrame => "frame",
            Self::MissingScheduler => "scheduler",
            Self::MissingClock => "frame clock",
            Self::MissingViewport => "viewport",
        };
        write!(f, "no {what} was provided to these tools")
    }
}

impl core::error::Error for ToolsError {}

/// Dependencies available to a mounting layer.
///
/// Built with the `with_*` methods, each returning a new context, so a layer
/// can extend what it passes down to its children without affecting its
/// siblings. Cloning is cheap.
#[derive(Clone, Default)]
pub struct Tools {
    frame: Option<SharedFrame>,
    scheduler: Option<Scheduler>,
    clock: Option<FrameClock>,
    viewport: Option<Viewport>,
}

impl fmt::Debug for Tools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tools")
            .field("frame", &self.frame.is_some())
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Tools {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the frame.
    #[must_use]
    pub fn with_frame(mut self, frame: SharedFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Provides the scheduler layers attach their own nodes under.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Provides the frame clock.
    #[must_use]
    pub fn with_clock(mut self, clock: FrameClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Provides the viewport.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// The frame, if provided.
    pub fn try_frame(&self) -> Result<SharedFrame, ToolsError> {
        self.frame.clone().ok_or(ToolsError::MissingFrame)
    }

    /// The scheduler, if provided.
    pub fn try_scheduler(&self) -> Result<Scheduler, ToolsError> {
        self.scheduler.clone().ok_or(ToolsError::MissingScheduler)
    }

    /// The frame clock, if provided.
    pub fn try_clock(&self) -> Result<FrameClock, ToolsError> {
        self.clock.clone().ok_or(ToolsError::MissingClock)
    }

    /// The viewport, if provided.
    pub fn try_viewport(&self) -> Result<Viewport, ToolsError> {
        self.viewport.clone().ok_or(ToolsError::MissingViewport)
    }

    /// The frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame was provided.
    #[must_use]
    pub fn frame(&self) -> SharedFrame {
        self.try_frame().unwrap_or_else(|e| panic!("{e}"))
    }

    /// The scheduler.
    ///
    /// # Panics
    ///
    /// Panics if no scheduler was provided.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.try_scheduler().unwrap_or_else(|e| panic!("{e}"))
    }

    /// The frame clock.
    ///
    /// # Panics
    ///
    /// Panics if no clock was provided.
    #[must_use]
    pub fn clock(&self) -> FrameClock {
        self.try_clock().unwrap_or_else(|e| panic!("{e}"))
    }

    /// The viewport.
    ///
    /// # Panics
    ///
    /// Panics if no viewport was provided.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.try_viewport().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Current frame time in milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if no clock was provided.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock().now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use kurbo::Size;
    use stipple_render::SoftwareFrame;

    #[test]
    fn try_getters_report_missing() {
        let tools = Tools::new();
        assert_eq!(tools.try_frame().err(), Some(ToolsError::MissingFrame));
        assert_eq!(tools.try_scheduler().err(), Some(ToolsError::MissingScheduler));
        assert_eq!(tools.try_clock().err(), Some(ToolsError::MissingClock));
        assert_eq!(
            ToolsError::MissingViewport.to_string(),
            "no viewport was provided to these tools"
        );
    }

    #[test]
    fn with_extends_without_touching_the_original() {
        let base = Tools::new().with_scheduler(Scheduler::new());
        let frame: SharedFrame = Rc::new(RefCell::new(SoftwareFrame::new(Size::new(4.0, 4.0), 1.0)));
        let extended = base.clone().with_frame(frame);
        assert!(extended.try_frame().is_ok());
        assert!(base.try_frame().is_err());
        assert!(extended.try_scheduler().is_ok());
    }

    #[test]
    #[should_panic(expected = "no frame clock was provided")]
    fn getter_panics_when_missing() {
        let _ = Tools::new().time();
    }
}
