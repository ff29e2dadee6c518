//! Button widget - interactive clickable buttons

use super::{Widget, WidgetState};
use crate::foundation::math::{Color, FloatRect, Vec2};
use crate::render::renderer::{Drawable, Renderer};
use crate::render::shapes::{Shape, ShapeKind};
use crate::render::states::RenderStates;
use crate::render::text::{GlyphSource, Text};
use crate::window::{Event, MouseButton};

/// Button state for visual feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Normal resting state
    Idle,
    /// Mouse is hovering over button
    Hovered,
    /// Button is being pressed
    Pressed,
}

/// Colors and corner shape of a button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonStyle {
    /// Background while idle
    pub idle_color: Color,
    /// Background while hovered
    pub hover_color: Color,
    /// Background while pressed
    pub pressed_color: Color,
    /// Label color
    pub label_color: Color,
    /// Corner rounding radius
    pub corner_radius: f32,
    /// Points per rounded corner
    pub corner_point_count: usize,
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Self {
            idle_color: Color::rgba(77, 77, 77, 230),
            hover_color: Color::rgb(102, 102, 128),
            pressed_color: Color::rgb(128, 128, 153),
            label_color: Color::WHITE,
            corner_radius: 6.0,
            corner_point_count: 6,
        }
    }
}

/// Rounded rectangle with a centered label
///
/// A click is a left press followed by a left release, both inside the
/// button. Releasing outside cancels it.
#[derive(Debug)]
pub struct Button<'f> {
    state: WidgetState,
    style: ButtonStyle,
    interaction: ButtonState,
    armed: bool,
    clicked: bool,
    background: Shape<'static>,
    label: Text<'f>,
}

impl<'f> Button<'f> {
    /// Button at `position` with `size`, labelled with glyphs from `font`
    pub fn new(label: &str, font: &'f dyn GlyphSource, position: Vec2, size: Vec2) -> Self {
        let style = ButtonStyle::default();
        let mut button = Self {
            state: WidgetState::new(position, size),
            style,
            interaction: ButtonState::Idle,
            armed: false,
            clicked: false,
            background: Shape::rectangle(size),
            label: Text::new(label, font),
        };
        button.label.set_color(style.label_color);
        button.apply_color();
        button.update();
        button
    }

    /// Placement and layout state
    pub const fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Placement and layout state, for mutation
    pub fn state_mut(&mut self) -> &mut WidgetState {
        &mut self.state
    }

    /// Current interaction state
    pub const fn interaction(&self) -> ButtonState {
        self.interaction
    }

    /// Colors and corners
    pub const fn style(&self) -> &ButtonStyle {
        &self.style
    }

    /// Replace colors and corners
    pub fn set_style(&mut self, style: ButtonStyle) {
        self.style = style;
        self.label.set_color(style.label_color);
        self.apply_color();
        self.state.invalidate();
    }

    /// Label text
    pub fn label(&self) -> &str {
        self.label.string()
    }

    /// Change the label; it is re-centered on the next update
    pub fn set_label(&mut self, label: &str) {
        self.label.set_string(label);
        self.state.invalidate();
    }

    /// Whether a click completed since the last call
    pub fn take_clicked(&mut self) -> bool {
        std::mem::take(&mut self.clicked)
    }

    /// Background shape
    pub const fn background(&self) -> &Shape<'static> {
        &self.background
    }

    /// Label primitive
    pub const fn label_text(&self) -> &Text<'f> {
        &self.label
    }

    fn set_interaction(&mut self, interaction: ButtonState) {
        if interaction != self.interaction {
            self.interaction = interaction;
            self.apply_color();
        }
    }

    fn apply_color(&mut self) {
        let color = match self.interaction {
            ButtonState::Idle => self.style.idle_color,
            ButtonState::Hovered => self.style.hover_color,
            ButtonState::Pressed => self.style.pressed_color,
        };
        self.background.set_fill_color(color);
    }
}

impl Widget for Button<'_> {
    fn bounds(&self) -> FloatRect {
        self.state.bounds()
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        if !self.state.is_visible() {
            return false;
        }
        match *event {
            Event::MouseMoved { position } => {
                let inside = self.bounds().contains(position);
                let next = match (inside, self.armed) {
                    (true, true) => ButtonState::Pressed,
                    (true, false) => ButtonState::Hovered,
                    (false, _) => ButtonState::Idle,
                };
                self.set_interaction(next);
                false
            }
            Event::MouseButtonPressed {
                button: MouseButton::Left,
                position,
            } => {
                if !self.bounds().contains(position) {
                    return false;
                }
                self.armed = true;
                self.set_interaction(ButtonState::Pressed);
                true
            }
            Event::MouseButtonReleased {
                button: MouseButton::Left,
                position,
            } => {
                let inside = self.bounds().contains(position);
                let was_armed = std::mem::take(&mut self.armed);
                if was_armed && inside {
                    self.clicked = true;
                    log::debug!("Button \"{}\" clicked", self.label.string());
                }
                self.set_interaction(if inside { ButtonState::Hovered } else { ButtonState::Idle });
                was_armed || inside
            }
            Event::MouseLeft | Event::FocusLost => {
                self.armed = false;
                self.set_interaction(ButtonState::Idle);
                false
            }
            _ => false,
        }
    }

    fn update(&mut self) {
        if !self.state.take_dirty() {
            return;
        }
        let (position, size) = (self.state.position(), self.state.size());
        self.background.set_kind(ShapeKind::RoundedRect {
            size,
            corner_radius: self.style.corner_radius,
            corner_point_count: self.style.corner_point_count,
        });
        self.background.set_position(position);

        let label = self.label.local_bounds();
        let offset = (size - Vec2::new(label.width, label.height)) / 2.0;
        let origin = Vec2::new(label.left, label.top);
        self.label
            .transformable_mut()
            .set_position(position + offset - origin);
    }
}

impl Drawable for Button<'_> {
    fn draw(&mut self, renderer: &mut Renderer, states: &RenderStates<'_>) {
        if !self.state.is_visible() {
            return;
        }
        self.update();
        self.background.draw(renderer, states);
        self.label.draw(renderer, states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::IntRect;
    use crate::render::text::Glyph;
    use crate::render::texture::Texture;
    use approx::assert_relative_eq;

    struct BoxGlyphs;

    impl GlyphSource for BoxGlyphs {
        fn glyph(&self, _ch: char) -> Option<Glyph> {
            Some(Glyph {
                texture_rect: IntRect::new(0, 0, 10, 10),
                bearing: Vec2::new(0.0, -10.0),
                size: Vec2::new(10.0, 10.0),
                advance: 10.0,
            })
        }

        fn line_spacing(&self) -> f32 {
            12.0
        }

        fn ascent(&self) -> f32 {
            10.0
        }

        fn texture(&self) -> Option<&Texture> {
            None
        }
    }

    fn press(x: f32, y: f32) -> Event {
        Event::MouseButtonPressed {
            button: MouseButton::Left,
            position: Vec2::new(x, y),
        }
    }

    fn release(x: f32, y: f32) -> Event {
        Event::MouseButtonReleased {
            button: MouseButton::Left,
            position: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_press_and_release_inside_clicks() {
        let font = BoxGlyphs;
        let mut button = Button::new("ok", &font, Vec2::new(10.0, 10.0), Vec2::new(100.0, 40.0));

        assert!(button.handle_event(&press(20.0, 20.0)));
        assert_eq!(button.interaction(), ButtonState::Pressed);
        assert_eq!(button.background().fill_color(), button.style().pressed_color);
        assert!(!button.take_clicked());

        assert!(button.handle_event(&release(30.0, 25.0)));
        assert!(button.take_clicked());
        assert!(!button.take_clicked());
        assert_eq!(button.interaction(), ButtonState::Hovered);
    }

    #[test]
    fn test_release_outside_cancels_click() {
        let font = BoxGlyphs;
        let mut button = Button::new("ok", &font, Vec2::zeros(), Vec2::new(100.0, 40.0));
        button.handle_event(&press(5.0, 5.0));
        button.handle_event(&release(500.0, 5.0));
        assert!(!button.take_clicked());
        assert_eq!(button.interaction(), ButtonState::Idle);

        // A press that started outside never clicks
        assert!(!button.handle_event(&press(500.0, 5.0)));
        button.handle_event(&release(5.0, 5.0));
        assert!(!button.take_clicked());
    }

    #[test]
    fn test_hover_follows_cursor() {
        let font = BoxGlyphs;
        let mut button = Button::new("ok", &font, Vec2::zeros(), Vec2::new(100.0, 40.0));
        let moved = |x, y| Event::MouseMoved { position: Vec2::new(x, y) };

        assert!(!button.handle_event(&moved(50.0, 20.0)));
        assert_eq!(button.interaction(), ButtonState::Hovered);
        assert_eq!(button.background().fill_color(), button.style().hover_color);
        button.handle_event(&moved(150.0, 20.0));
        assert_eq!(button.interaction(), ButtonState::Idle);
    }

    #[test]
    fn test_update_centers_label_once() {
        let font = BoxGlyphs;
        let mut button = Button::new("ab", &font, Vec2::zeros(), Vec2::new(100.0, 40.0));
        button.state_mut().set_position(Vec2::new(50.0, 50.0));
        button.set_label("abcd");
        assert!(button.state().is_dirty());

        button.update();
        assert!(!button.state().is_dirty());
        let label = button.label_text().global_bounds();
        assert_relative_eq!(label.left, 80.0);
        assert_relative_eq!(label.top, 65.0);
        let background = button.background().global_bounds();
        assert_relative_eq!(background.left, 50.0, epsilon = 1e-4);
        assert_relative_eq!(background.top, 50.0, epsilon = 1e-4);
        assert_relative_eq!(background.width, 100.0, epsilon = 1e-4);
        assert_relative_eq!(background.height, 40.0, epsilon = 1e-4);
    }
}
