//! Engine events and their translation from GLFW

use crate::foundation::math::Vec2;

/// Keyboard keys the engine distinguishes
#[allow(missing_docs)]
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    /// Any key without a dedicated variant
    Unknown,
}

impl From<glfw::Key> for Key {
    #[rustfmt::skip]
    fn from(key: glfw::Key) -> Self {
        use glfw::Key as G;
        match key {
            G::A => Self::A, G::B => Self::B, G::C => Self::C, G::D => Self::D,
            G::E => Self::E, G::F => Self::F, G::G => Self::G, G::H => Self::H,
            G::I => Self::I, G::J => Self::J, G::K => Self::K, G::L => Self::L,
            G::M => Self::M, G::N => Self::N, G::O => Self::O, G::P => Self::P,
            G::Q => Self::Q, G::R => Self::R, G::S => Self::S, G::T => Self::T,
            G::U => Self::U, G::V => Self::V, G::W => Self::W, G::X => Self::X,
            G::Y => Self::Y, G::Z => Self::Z,
            G::Num0 => Self::Num0, G::Num1 => Self::Num1, G::Num2 => Self::Num2,
            G::Num3 => Self::Num3, G::Num4 => Self::Num4, G::Num5 => Self::Num5,
            G::Num6 => Self::Num6, G::Num7 => Self::Num7, G::Num8 => Self::Num8,
            G::Num9 => Self::Num9,
            G::Escape => Self::Escape,
            G::Enter | G::KpEnter => Self::Enter,
            G::Space => Self::Space,
            G::Tab => Self::Tab,
            G::Backspace => Self::Backspace,
            G::Delete => Self::Delete,
            G::Left => Self::Left,
            G::Right => Self::Right,
            G::Up => Self::Up,
            G::Down => Self::Down,
            G::LeftShift => Self::LeftShift,
            G::RightShift => Self::RightShift,
            G::LeftControl => Self::LeftControl,
            G::RightControl => Self::RightControl,
            G::LeftAlt => Self::LeftAlt,
            G::RightAlt => Self::RightAlt,
            _ => Self::Unknown,
        }
    }
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button
    Left,
    /// Secondary button
    Right,
    /// Wheel button
    Middle,
    /// Extra buttons, numbered from 4
    Other(u8),
}

impl From<glfw::MouseButton> for MouseButton {
    fn from(button: glfw::MouseButton) -> Self {
        match button {
            glfw::MouseButton::Button1 => Self::Left,
            glfw::MouseButton::Button2 => Self::Right,
            glfw::MouseButton::Button3 => Self::Middle,
            glfw::MouseButton::Button4 => Self::Other(4),
            glfw::MouseButton::Button5 => Self::Other(5),
            glfw::MouseButton::Button6 => Self::Other(6),
            glfw::MouseButton::Button7 => Self::Other(7),
            glfw::MouseButton::Button8 => Self::Other(8),
        }
    }
}

/// Modifier keys held during a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    /// Either shift key
    pub shift: bool,
    /// Either control key
    pub control: bool,
    /// Either alt key
    pub alt: bool,
}

impl From<glfw::Modifiers> for Modifiers {
    fn from(modifiers: glfw::Modifiers) -> Self {
        Self {
            shift: modifiers.contains(glfw::Modifiers::Shift),
            control: modifiers.contains(glfw::Modifiers::Control),
            alt: modifiers.contains(glfw::Modifiers::Alt),
        }
    }
}

/// Window and input events in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user asked to close the window
    Closed,
    /// Window size in screen coordinates changed
    Resized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// Framebuffer size in pixels changed
    FramebufferResized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// The window gained input focus
    FocusGained,
    /// The window lost input focus
    FocusLost,
    /// A key went down or auto-repeated
    KeyPressed {
        /// Key
        key: Key,
        /// Held modifiers
        modifiers: Modifiers,
        /// Whether this is an auto-repeat
        repeat: bool,
    },
    /// A key went up
    KeyReleased {
        /// Key
        key: Key,
        /// Held modifiers
        modifiers: Modifiers,
    },
    /// Text input
    TextEntered(char),
    /// The cursor moved, in window pixels from the top-left
    MouseMoved {
        /// Cursor position
        position: Vec2,
    },
    /// A mouse button went down at the cursor position
    MouseButtonPressed {
        /// Button
        button: MouseButton,
        /// Cursor position
        position: Vec2,
    },
    /// A mouse button went up at the cursor position
    MouseButtonReleased {
        /// Button
        button: MouseButton,
        /// Cursor position
        position: Vec2,
    },
    /// Scroll wheel or touchpad scroll
    MouseWheelScrolled {
        /// Horizontal offset
        dx: f32,
        /// Vertical offset
        dy: f32,
    },
    /// The cursor entered the window
    MouseEntered,
    /// The cursor left the window
    MouseLeft,
}

impl Event {
    /// Cursor position carried by mouse events
    pub fn position(&self) -> Option<Vec2> {
        match self {
            Self::MouseMoved { position }
            | Self::MouseButtonPressed { position, .. }
            | Self::MouseButtonReleased { position, .. } => Some(*position),
            _ => None,
        }
    }
}

fn dimension(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Translate one GLFW event, tracking the cursor for button events
///
/// Returns `None` for events the engine does not expose.
pub(crate) fn from_glfw(event: glfw::WindowEvent, cursor: &mut Vec2) -> Option<Event> {
    use glfw::{Action, WindowEvent};

    let event = match event {
        WindowEvent::Close => Event::Closed,
        WindowEvent::Size(w, h) => Event::Resized {
            width: dimension(w),
            height: dimension(h),
        },
        WindowEvent::FramebufferSize(w, h) => Event::FramebufferResized {
            width: dimension(w),
            height: dimension(h),
        },
        WindowEvent::Focus(true) => Event::FocusGained,
        WindowEvent::Focus(false) => Event::FocusLost,
        WindowEvent::Key(key, _, Action::Release, modifiers) => Event::KeyReleased {
            key: key.into(),
            modifiers: modifiers.into(),
        },
        WindowEvent::Key(key, _, action, modifiers) => Event::KeyPressed {
            key: key.into(),
            modifiers: modifiers.into(),
            repeat: action == Action::Repeat,
        },
        WindowEvent::Char(ch) => Event::TextEntered(ch),
        WindowEvent::CursorPos(x, y) => {
            *cursor = Vec2::new(x as f32, y as f32);
            Event::MouseMoved { position: *cursor }
        }
        WindowEvent::MouseButton(button, Action::Release, _) => Event::MouseButtonReleased {
            button: button.into(),
            position: *cursor,
        },
        WindowEvent::MouseButton(button, _, _) => Event::MouseButtonPressed {
            button: button.into(),
            position: *cursor,
        },
        WindowEvent::Scroll(dx, dy) => Event::MouseWheelScrolled {
            dx: dx as f32,
            dy: dy as f32,
        },
        WindowEvent::CursorEnter(true) => Event::MouseEntered,
        WindowEvent::CursorEnter(false) => Event::MouseLeft,
        _ => return None,
    };
    Some(event)
}
