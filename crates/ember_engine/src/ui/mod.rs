//! # UI System
//!
//! Retained-mode widgets drawn with the engine's own primitives.
//!
//! A widget keeps its placement in a [`WidgetState`]. Setters only mark the
//! state dirty; [`Widget::update`] rebuilds the child geometry (background
//! shape, label layout) once, however many setters ran before it. Drawing
//! calls `update` first, so a widget is never drawn with stale geometry.
//!
//! Input arrives as window [`Event`]s through [`Widget::handle_event`],
//! which reports whether the widget consumed the event.

mod button;
mod panel;

pub use button::{Button, ButtonState, ButtonStyle};
pub use panel::Panel;

use crate::foundation::math::{FloatRect, Vec2};
use crate::render::renderer::Drawable;
use crate::window::Event;

/// Interactive element of a user interface
pub trait Widget: Drawable {
    /// Screen-space box the widget occupies
    fn bounds(&self) -> FloatRect;

    /// React to an event; `true` when the event was consumed
    fn handle_event(&mut self, event: &Event) -> bool;

    /// Rebuild child geometry if the layout changed
    fn update(&mut self);
}

/// Position, size and layout cache state shared by all widgets
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    position: Vec2,
    size: Vec2,
    visible: bool,
    dirty: bool,
}

impl WidgetState {
    /// State at `position` with `size`; starts dirty
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            visible: true,
            dirty: true,
        }
    }

    /// Top-left corner
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Move the widget
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.dirty = true;
    }

    /// Width and height
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Resize the widget
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.dirty = true;
    }

    /// Whether the widget is drawn and receives input
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the widget
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Box from position and size
    pub fn bounds(&self) -> FloatRect {
        FloatRect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    /// Whether child geometry must be rebuilt
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a rebuild on the next update
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_mark_dirty_and_take_clears() {
        let mut state = WidgetState::new(Vec2::zeros(), Vec2::new(10.0, 10.0));
        assert!(state.take_dirty());
        assert!(!state.take_dirty());

        state.set_position(Vec2::new(5.0, 5.0));
        state.set_size(Vec2::new(20.0, 8.0));
        assert!(state.is_dirty());
        assert!(state.take_dirty());
        assert!(!state.is_dirty());
        assert_eq!(state.bounds(), FloatRect::new(5.0, 5.0, 20.0, 8.0));
    }

    #[test]
    fn test_visibility_does_not_touch_layout() {
        let mut state = WidgetState::new(Vec2::zeros(), Vec2::new(1.0, 1.0));
        state.take_dirty();
        state.set_visible(false);
        assert!(!state.is_visible());
        assert!(!state.is_dirty());
    }
}
