//! # Ember Engine
//!
//! A 2D/3D rendering and windowing engine built around an OpenGL resource core.
//!
//! ## Features
//!
//! - **GPU Resource Core**: move-only handles, typed buffers with vertex layouts,
//!   geometry uploaded lazily when it changes
//! - **Render States**: blend mode, transform, texture and shader per draw,
//!   re-applied only when they change
//! - **Cameras**: 2D, 3D and first-person cameras whose projections are cached
//!   until the framebuffer or lens parameters change
//! - **Primitives**: shapes, sprites and text
//! - **Windowing**: GLFW windows with an event queue
//! - **UI**: buttons and panels drawn with the same primitives
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let mut renderer = Renderer::new(window.create_device(config.renderer.diagnostics));
//!     let mut camera = Camera2D::for_framebuffer(window.framebuffer_size());
//!     let mut circle = Shape::circle(50.0, 32);
//!
//!     while window.is_open() {
//!         window.poll_events();
//!         while let Some(event) = window.poll_event() {
//!             if event == Event::Closed {
//!                 window.close();
//!             }
//!         }
//!         renderer.begin_frame(config.renderer.clear_color, &window);
//!         renderer.set_camera(&mut camera, &window);
//!         renderer.draw(&mut circle);
//!         window.display();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod ui;
pub mod window;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, LoggingConfig, RendererConfig, WindowConfig},
        foundation::math::{Color, FloatRect, IntRect, Mat4, UVec2, Vec2, Vec3},
        render::{
            BlendMode, Camera, Camera2D, Camera3D, CameraFps, Drawable, FontAtlas, FontManager, GeometryProvider,
            GraphicsDevice, RenderStates, RenderTarget, Renderer, Shape, ShapeKind, Sprite, Text, Texture,
            Transformable,
        },
        ui::{Button, Panel, Widget},
        window::{Event, Key, MouseButton, Window},
    };
}
