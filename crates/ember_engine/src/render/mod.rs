//! # Rendering System
//!
//! The GPU resource and render-state core of the engine.
//!
//! ## Architecture
//!
//! - **Device**: [`gpu::GraphicsDevice`] is the seam to the driver; resources
//!   own their handles through [`gpu::GpuResource`]
//! - **Buffers**: vertex/index buffers and vertex arrays described by a [`buffer::Layout`]
//! - **Geometry**: CPU-side vertices and indices with a cache state, uploaded
//!   lazily by [`geometry::RenderMesh`]
//! - **States**: blend mode, transform, texture and shader per draw
//! - **Cameras**: 2D, 3D and first-person cameras with cached projections
//! - **Primitives**: shapes, sprites and text built on the pieces above
//! - **Renderer**: draw dispatch and per-frame statistics
//!
//! Everything here runs on the thread owning the graphics context.

pub mod buffer;
pub mod camera;
pub mod font;
pub mod geometry;
pub mod gpu;
pub mod renderer;
pub mod shader;
pub mod shapes;
pub mod sprite;
pub mod states;
pub mod text;
pub mod texture;
pub mod transformable;

pub use buffer::{IndexBuffer, Layout, VertexArray, VertexBuffer};
pub use camera::{Camera, Camera2D, Camera3D, CameraFps, OffscreenTarget, RenderTarget};
pub use font::{FontAtlas, FontError, FontManager};
pub use geometry::{CacheState, Geometry, RenderMesh, Vertex2D, Vertex3D, VertexFormat};
pub use gpu::{GlowDevice, GpuError, GpuResult, GraphicsDevice, HeadlessDevice};
pub use renderer::{DrawStats, Drawable, Renderer};
pub use shader::Shader;
pub use shapes::{GeometryProvider, Shape, ShapeKind};
pub use sprite::Sprite;
pub use states::{BlendEquation, BlendFactor, BlendMode, RenderStates};
pub use text::{Glyph, GlyphSource, Text};
pub use texture::{ImageData, Texture, TextureError};
pub use transformable::Transformable;
