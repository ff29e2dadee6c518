//! # Window Management
//!
//! A GLFW window owning an OpenGL 3.3 core context, and the engine's event
//! types. GLFW events are translated into [`Event`]s on every
//! [`Window::poll_events`] and wait in the window's [`EventQueue`] until the
//! application drains them with [`Window::poll_event`].

#![allow(unsafe_code)]

mod event;
mod event_queue;

pub use event::{Event, Key, Modifiers, MouseButton};
pub use event_queue::EventQueue;

use std::rc::Rc;

use glfw::Context as _;
use thiserror::Error;

use crate::config::WindowConfig;
use crate::foundation::math::{UVec2, Vec2};
use crate::render::camera::RenderTarget;
use crate::render::gpu::{GlowDevice, GraphicsDevice};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The window or its context could not be created
    #[error("window creation failed for {width}x{height} \"{title}\"")]
    CreationFailed {
        /// Requested title
        title: String,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window with a current OpenGL context
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    queue: EventQueue,
    cursor: Vec2,
    title: String,
}

impl Window {
    /// Open a window as described by `config` and make its context current
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|e| WindowError::InitializationFailed(e.to_string()))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| WindowError::CreationFailed {
                title: config.title.clone(),
                width: config.width,
                height: config.height,
            })?;

        window.make_current();
        window.set_all_polling(true);
        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        log::info!(
            "Window \"{}\" opened at {}x{} (vsync: {})",
            config.title,
            config.width,
            config.height,
            config.vsync
        );

        Ok(Self {
            glfw,
            window,
            events,
            queue: EventQueue::new(),
            cursor: Vec2::zeros(),
            title: config.title.clone(),
        })
    }

    /// Load OpenGL through this window's context
    ///
    /// `diagnostics` enables an error check after every device call.
    pub fn create_device(&mut self, diagnostics: bool) -> Rc<dyn GraphicsDevice> {
        // SAFETY: the context is current on this thread and outlives the loader calls
        let gl = unsafe { glow::Context::from_loader_function(|name| self.window.get_proc_address(name) as *const _) };
        Rc::new(GlowDevice::new(gl, diagnostics))
    }

    /// Whether the window is still open
    pub fn is_open(&self) -> bool {
        !self.window.should_close()
    }

    /// Ask the window to close after this frame
    pub fn close(&mut self) {
        self.window.set_should_close(true);
    }

    /// Pump the platform event loop into the event queue
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            if let Some(event) = event::from_glfw(event, &mut self.cursor) {
                self.queue.push(event);
            }
        }
    }

    /// Take the oldest pending event without blocking
    pub fn poll_event(&mut self) -> Option<Event> {
        self.queue.poll_event()
    }

    /// Pending events
    pub fn events(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    /// Present the back buffer
    pub fn display(&mut self) {
        self.window.swap_buffers();
    }

    /// Window size in screen coordinates
    pub fn size(&self) -> UVec2 {
        let (width, height) = self.window.get_size();
        UVec2::new(u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }

    /// Resize the client area
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.window
            .set_size(i32::try_from(width).unwrap_or(i32::MAX), i32::try_from(height).unwrap_or(i32::MAX));
    }

    /// Window title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Change the window title
    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
        self.title = title.to_owned();
    }

    /// Last known cursor position in window pixels
    pub const fn cursor_position(&self) -> Vec2 {
        self.cursor
    }

    /// Seconds since GLFW was initialized
    pub fn time(&self) -> f64 {
        self.glfw.get_time()
    }
}

impl RenderTarget for Window {
    fn framebuffer_size(&self) -> UVec2 {
        let (width, height) = self.window.get_framebuffer_size();
        UVec2::new(u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("title", &self.title)
            .field("pending_events", &self.queue.len())
            .finish_non_exhaustive()
    }
}
