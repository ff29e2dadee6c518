//! Panel widget - rectangular background container

use super::{Widget, WidgetState};
use crate::foundation::math::{Color, FloatRect, Vec2};
use crate::render::renderer::{Drawable, Renderer};
use crate::render::shapes::{Shape, ShapeKind};
use crate::render::states::RenderStates;
use crate::window::Event;

/// Filled rectangle, optionally with rounded corners
#[derive(Debug)]
pub struct Panel {
    state: WidgetState,
    color: Color,
    corner_radius: f32,
    background: Shape<'static>,
}

/// Points per rounded corner
const CORNER_POINTS: usize = 6;

impl Panel {
    /// Panel covering `position .. position + size`
    pub fn new(position: Vec2, size: Vec2) -> Self {
        let mut panel = Self {
            state: WidgetState::new(position, size),
            color: Color::rgba(51, 51, 51, 204),
            corner_radius: 0.0,
            background: Shape::rectangle(size),
        };
        panel.background.set_fill_color(panel.color);
        panel.update();
        panel
    }

    /// Placement and layout state
    pub const fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Placement and layout state, for mutation
    pub fn state_mut(&mut self) -> &mut WidgetState {
        &mut self.state
    }

    /// Background color
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Change the background color
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.background.set_fill_color(color);
    }

    /// Corner rounding radius, 0 for sharp corners
    pub const fn corner_radius(&self) -> f32 {
        self.corner_radius
    }

    /// Change the corner rounding
    pub fn set_corner_radius(&mut self, radius: f32) {
        self.corner_radius = radius.max(0.0);
        self.state.invalidate();
    }

    /// Background shape
    pub const fn background(&self) -> &Shape<'static> {
        &self.background
    }
}

impl Widget for Panel {
    fn bounds(&self) -> FloatRect {
        self.state.bounds()
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        // Swallow clicks so widgets underneath do not see them
        match event {
            Event::MouseButtonPressed { position, .. } | Event::MouseButtonReleased { position, .. } => {
                self.state.is_visible() && self.bounds().contains(*position)
            }
            _ => false,
        }
    }

    fn update(&mut self) {
        if !self.state.take_dirty() {
            return;
        }
        let size = self.state.size();
        let kind = if self.corner_radius > 0.0 {
            ShapeKind::RoundedRect {
                size,
                corner_radius: self.corner_radius,
                corner_point_count: CORNER_POINTS,
            }
        } else {
            ShapeKind::Rectangle { size }
        };
        self.background.set_kind(kind);
        self.background.set_position(self.state.position());
    }
}

impl Drawable for Panel {
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>) {
        if !self.state.is_visible() {
            return;
        }
        self.update();
        self.background.draw(renderer, states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::MouseButton;

    #[test]
    fn test_layout_follows_state_after_update() {
        let mut panel = Panel::new(Vec2::new(10.0, 10.0), Vec2::new(100.0, 50.0));
        panel.state_mut().set_position(Vec2::new(20.0, 30.0));
        panel.state_mut().set_size(Vec2::new(40.0, 40.0));
        panel.update();

        assert!(!panel.state().is_dirty());
        assert_eq!(panel.background().global_bounds(), FloatRect::new(20.0, 30.0, 40.0, 40.0));
    }

    #[test]
    fn test_rounded_corners_switch_shape_kind() {
        let mut panel = Panel::new(Vec2::zeros(), Vec2::new(100.0, 50.0));
        panel.set_corner_radius(8.0);
        panel.update();
        assert!(matches!(panel.background().kind(), ShapeKind::RoundedRect { .. }));
    }

    #[test]
    fn test_clicks_inside_are_consumed() {
        let mut panel = Panel::new(Vec2::zeros(), Vec2::new(100.0, 50.0));
        let inside = Event::MouseButtonPressed {
            button: MouseButton::Left,
            position: Vec2::new(10.0, 10.0),
        };
        let outside = Event::MouseButtonPressed {
            button: MouseButton::Left,
            position: Vec2::new(200.0, 10.0),
        };
        assert!(panel.handle_event(&inside));
        assert!(!panel.handle_event(&outside));

        panel.state_mut().set_visible(false);
        assert!(!panel.handle_event(&inside));
    }
}
