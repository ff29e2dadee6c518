//! # Renderable Geometry
//!
//! CPU-side vertex and index arrays plus the cache-state tag telling the
//! renderer whether the GPU copy is stale.
//!
//! ## Cache protocol
//!
//! - Every mutable accessor marks the geometry [`CacheState::Stale`]
//! - Reading never changes the state
//! - Only the draw dispatch marks it [`CacheState::Synced`], right after the
//!   GPU buffers received the current contents
//!
//! So the GPU copy equals the CPU arrays whenever the geometry is synced, and
//! a stale interval costs at most one upload however often it is read.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Color, Vec2, Vec3};
use crate::render::buffer::{IndexBuffer, Layout, VertexArray, VertexBuffer};
use crate::render::gpu::{BufferUsage, ElementType, GpuError, GpuResult, GraphicsDevice, PrimitiveType, ResourceKind};

/// A vertex type that can be uploaded as raw bytes
pub trait VertexFormat: Pod {
    /// Attribute layout matching the struct fields in declaration order
    fn layout() -> Layout;
}

/// 2D vertex: position, texture coordinates in pixels, color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex2D {
    /// Position in local units
    pub position: [f32; 2],
    /// Texture coordinates in texels
    pub tex_coords: [f32; 2],
    /// RGBA color
    pub color: [u8; 4],
}

impl Vertex2D {
    /// Vertex from math types
    pub fn new(position: Vec2, tex_coords: Vec2, color: Color) -> Self {
        Self {
            position: [position.x, position.y],
            tex_coords: [tex_coords.x, tex_coords.y],
            color: color.to_array(),
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[1])
    }
}

impl VertexFormat for Vertex2D {
    fn layout() -> Layout {
        Layout::new()
            .with_element(ElementType::Float, 2, false)
            .with_element(ElementType::Float, 2, false)
            .with_element(ElementType::UnsignedByte, 4, true)
    }
}

/// 3D vertex: position, texture coordinates, color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex3D {
    /// Position in model space
    pub position: [f32; 3],
    /// Texture coordinates in texels
    pub tex_coords: [f32; 2],
    /// RGBA color
    pub color: [u8; 4],
}

impl Vertex3D {
    /// Vertex from math types
    pub fn new(position: Vec3, tex_coords: Vec2, color: Color) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            tex_coords: [tex_coords.x, tex_coords.y],
            color: color.to_array(),
        }
    }
}

impl VertexFormat for Vertex3D {
    fn layout() -> Layout {
        Layout::new()
            .with_element(ElementType::Float, 3, false)
            .with_element(ElementType::Float, 2, false)
            .with_element(ElementType::UnsignedByte, 4, true)
    }
}

/// Whether the GPU copy of a geometry is current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// The CPU arrays changed since the last upload
    Stale,
    /// The GPU buffers hold the CPU arrays
    Synced,
}

/// CPU truth of a drawable's vertices and indices
#[derive(Debug, Clone)]
pub struct Geometry<V> {
    vertices: Vec<V>,
    indices: Vec<u32>,
    primitive: PrimitiveType,
    state: CacheState,
}

impl<V> Default for Geometry<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            primitive: PrimitiveType::Triangles,
            state: CacheState::Stale,
        }
    }
}

impl<V: VertexFormat> Geometry<V> {
    /// Empty triangle-list geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry from existing arrays
    pub fn from_parts(vertices: Vec<V>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            ..Self::default()
        }
    }

    /// Vertices, read-only
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// Indices, read-only
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertices for mutation; marks the geometry stale
    pub fn vertices_mut(&mut self) -> &mut Vec<V> {
        self.invalidate();
        &mut self.vertices
    }

    /// Indices for mutation; marks the geometry stale
    pub fn indices_mut(&mut self) -> &mut Vec<u32> {
        self.invalidate();
        &mut self.indices
    }

    /// Replace both arrays
    pub fn set(&mut self, vertices: Vec<V>, indices: Vec<u32>) {
        self.vertices = vertices;
        self.indices = indices;
        self.invalidate();
    }

    /// Remove all vertices and indices
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.invalidate();
    }

    /// Primitive assembly mode
    pub const fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    /// Change the primitive assembly mode
    pub fn set_primitive_type(&mut self, primitive: PrimitiveType) {
        self.primitive = primitive;
        self.invalidate();
    }

    /// Whether the GPU copy is out of date
    pub fn is_dirty(&self) -> bool {
        self.state == CacheState::Stale
    }

    /// Current cache state
    pub const fn cache_state(&self) -> CacheState {
        self.state
    }

    /// Mark the GPU copy out of date
    pub fn invalidate(&mut self) {
        self.state = CacheState::Stale;
    }

    pub(crate) fn mark_synced(&mut self) {
        self.state = CacheState::Synced;
    }
}

/// GPU objects holding one geometry
#[derive(Debug)]
pub struct GpuMesh {
    vertex_array: VertexArray,
    vertices: VertexBuffer,
    indices: IndexBuffer,
    attached: bool,
}

impl GpuMesh {
    fn new<V: VertexFormat>(device: &Rc<dyn GraphicsDevice>) -> GpuResult<Self> {
        let mesh = Self {
            vertex_array: VertexArray::new(device),
            vertices: VertexBuffer::new(device, BufferUsage::Dynamic, V::layout()),
            indices: IndexBuffer::new(device, BufferUsage::Dynamic),
            attached: false,
        };
        if !mesh.vertex_array.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::VertexArray));
        }
        if !mesh.vertices.is_valid() || !mesh.indices.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::Buffer));
        }
        Ok(mesh)
    }

    fn upload<V: VertexFormat>(&mut self, geometry: &Geometry<V>) -> GpuResult<()> {
        self.vertex_array.bind();
        let uploaded = self
            .vertices
            .set_data(bytemuck::cast_slice(geometry.vertices()))
            .and_then(|()| self.indices.set_data(geometry.indices()));
        self.vertex_array.unbind();
        uploaded?;
        if !self.attached {
            self.vertex_array.attach(&self.vertices, &self.indices)?;
            self.attached = true;
        }
        Ok(())
    }

    /// Vertex array to bind for drawing
    pub const fn vertex_array(&self) -> &VertexArray {
        &self.vertex_array
    }

    /// Vertex storage
    pub const fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// Index storage; its count sizes the draw call
    pub const fn index_buffer(&self) -> &IndexBuffer {
        &self.indices
    }
}

/// A geometry together with its lazily created GPU copy
#[derive(Debug)]
pub struct RenderMesh<V> {
    geometry: Geometry<V>,
    gpu: Option<GpuMesh>,
}

impl<V: VertexFormat> Default for RenderMesh<V> {
    fn default() -> Self {
        Self::new(Geometry::new())
    }
}

impl<V: VertexFormat> RenderMesh<V> {
    /// Wrap a geometry; GPU objects are created on first draw
    pub const fn new(geometry: Geometry<V>) -> Self {
        Self { geometry, gpu: None }
    }

    /// CPU geometry
    pub const fn geometry(&self) -> &Geometry<V> {
        &self.geometry
    }

    /// CPU geometry for mutation
    pub fn geometry_mut(&mut self) -> &mut Geometry<V> {
        &mut self.geometry
    }

    /// GPU copy, if it was created
    pub const fn gpu(&self) -> Option<&GpuMesh> {
        self.gpu.as_ref()
    }

    /// Make the GPU copy current
    ///
    /// Creates the GPU objects on first use and uploads only when the
    /// geometry is stale. Returns whether an upload happened. On failure the
    /// GPU objects are dropped so the next call starts over, and the geometry
    /// stays stale.
    pub(crate) fn prepare(&mut self, device: &Rc<dyn GraphicsDevice>) -> GpuResult<bool> {
        if self.gpu.is_none() {
            self.gpu = Some(GpuMesh::new::<V>(device)?);
            self.geometry.invalidate();
        }
        if !self.geometry.is_dirty() {
            return Ok(false);
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(false);
        };
        if let Err(e) = gpu.upload(&self.geometry) {
            self.gpu = None;
            return Err(e);
        }
        self.geometry.mark_synced();
        Ok(true)
    }
}
