//! # GPU Buffers
//!
//! Vertex buffers with an attribute [`Layout`], index buffers with an element
//! count, and the vertex array object tying both together for a draw call.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut layout = Layout::new();
//! layout
//!     .add_element(ElementType::Float, 2, false)
//!     .add_element(ElementType::UnsignedByte, 4, true);
//!
//! let mut vertices = VertexBuffer::new(&device, BufferUsage::Dynamic, layout);
//! vertices.set_data(bytemuck::cast_slice(&data))?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::gpu_check;
use crate::render::gpu::{
    BufferTarget, BufferUsage, ElementType, GpuError, GpuResource, GpuResult, GraphicsDevice,
    LayoutElement, MapAccess, ResourceKind,
};

/// Description of how raw vertex bytes map to typed attributes
///
/// Elements are laid out back to back in insertion order; attribute
/// locations follow the same order starting at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    elements: Vec<LayoutElement>,
    stride: usize,
}

impl Layout {
    /// Empty layout with a stride of 0
    pub const fn new() -> Self {
        Self {
            elements: Vec::new(),
            stride: 0,
        }
    }

    /// Append an attribute at the current stride and advance the stride
    pub fn add_element(&mut self, element_type: ElementType, count: usize, normalized: bool) -> &mut Self {
        debug_assert!((1..=4).contains(&count), "attribute component count must be 1-4");
        self.elements.push(LayoutElement {
            element_type,
            count,
            offset: self.stride,
            normalized,
        });
        self.stride += element_type.byte_size() * count;
        self
    }

    /// Builder form of [`Layout::add_element`]
    #[must_use]
    pub fn with_element(mut self, element_type: ElementType, count: usize, normalized: bool) -> Self {
        self.add_element(element_type, count, normalized);
        self
    }

    /// Attributes in location order
    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }

    /// Size of one vertex in bytes
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Whether no attribute was added yet
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// GPU storage for vertex attributes
pub struct VertexBuffer {
    resource: GpuResource,
    usage: BufferUsage,
    layout: Layout,
    size: usize,
}

impl VertexBuffer {
    /// Allocate an empty vertex buffer
    ///
    /// A refused allocation is logged and leaves the buffer invalid; uploads
    /// to it fail with [`GpuError::NullHandle`].
    pub fn new(device: &Rc<dyn GraphicsDevice>, usage: BufferUsage, layout: Layout) -> Self {
        Self {
            resource: GpuResource::create(device, ResourceKind::Buffer),
            usage,
            layout,
            size: 0,
        }
    }

    /// Whether the driver object exists
    pub const fn is_valid(&self) -> bool {
        self.resource.is_valid()
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.resource.id()
    }

    /// Usage hint chosen at construction
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Attribute layout
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Replace the attribute layout; vertex arrays must be re-attached
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    /// Allocated size in bytes
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of whole vertices stored, according to the layout stride
    pub const fn vertex_count(&self) -> usize {
        if self.layout.stride == 0 {
            0
        } else {
            self.size / self.layout.stride
        }
    }

    /// Replace the entire contents
    pub fn set_data(&mut self, data: &[u8]) -> GpuResult<()> {
        self.require_valid()?;
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Vertex, self.resource.id()));
        gpu_check!(device, device.buffer_data(BufferTarget::Vertex, data, self.usage));
        self.size = data.len();
        Ok(())
    }

    /// Overwrite `data.len()` bytes starting at `offset`
    ///
    /// The range must lie inside the size allocated by the last
    /// [`VertexBuffer::set_data`].
    pub fn set_sub_data(&mut self, offset: usize, data: &[u8]) -> GpuResult<()> {
        self.require_valid()?;
        let end = offset + data.len();
        debug_assert!(end <= self.size, "sub-data range {offset}..{end} exceeds buffer size {}", self.size);
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Vertex, self.resource.id()));
        gpu_check!(device, device.buffer_sub_data(BufferTarget::Vertex, offset, data));
        Ok(())
    }

    /// Map the whole buffer
    pub fn map(&mut self, access: MapAccess) -> GpuResult<BufferMapping<'_>> {
        let size = self.size;
        self.map_range(0, size, access)
    }

    /// Map `length` bytes starting at `offset`
    ///
    /// The mapping is released when the returned guard is dropped, on every
    /// exit path. The buffer cannot be used while it is mapped.
    pub fn map_range(&mut self, offset: usize, length: usize, access: MapAccess) -> GpuResult<BufferMapping<'_>> {
        self.require_valid()?;
        let end = offset + length;
        if end > self.size || length == 0 {
            log::error!("Cannot map vertex buffer range {offset}..{end}, size is {}", self.size);
            return Err(GpuError::MapFailed { offset, end });
        }
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Vertex, self.resource.id()));
        let ptr = gpu_check!(device, device.map_buffer_range(BufferTarget::Vertex, offset, length, access))
            .ok_or(GpuError::MapFailed { offset, end })?;
        Ok(BufferMapping {
            device,
            buffer: self.resource.id(),
            ptr,
            len: length,
            _buffer: PhantomData,
        })
    }

    /// Activate this buffer for the current draw
    pub fn bind(&self) {
        debug_assert!(self.is_valid(), "binding an empty vertex buffer");
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Vertex, self.resource.id()));
    }

    /// Deactivate any vertex buffer
    pub fn unbind(&self) {
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Vertex, 0));
    }

    fn require_valid(&self) -> GpuResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GpuError::NullHandle(ResourceKind::Buffer))
        }
    }
}

impl fmt::Debug for VertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexBuffer")
            .field("id", &self.id())
            .field("usage", &self.usage)
            .field("size", &self.size)
            .field("stride", &self.layout.stride)
            .finish()
    }
}

/// Scoped access to mapped buffer memory
///
/// Borrows the buffer mutably for its whole life and unmaps it on drop, so
/// the pointer can never outlive the mapping.
pub struct BufferMapping<'a> {
    device: &'a Rc<dyn GraphicsDevice>,
    buffer: u32,
    ptr: NonNull<u8>,
    len: usize,
    _buffer: PhantomData<&'a mut [u8]>,
}

#[allow(unsafe_code)]
impl BufferMapping<'_> {
    /// Mapped bytes
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the driver guarantees `len` bytes at `ptr` until unmap, which
        // only happens in `drop`
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mapped bytes, writable
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_slice`; `&mut self` makes the access exclusive
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Length of the mapped range in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapped range is empty
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for BufferMapping<'_> {
    fn drop(&mut self) {
        gpu_check!(self.device, self.device.bind_buffer(BufferTarget::Vertex, self.buffer));
        if !gpu_check!(self.device, self.device.unmap_buffer(BufferTarget::Vertex)) {
            log::warn!("Buffer {} contents were lost while mapped", self.buffer);
        }
    }
}

/// GPU storage for `u32` element indices
pub struct IndexBuffer {
    resource: GpuResource,
    usage: BufferUsage,
    count: usize,
}

impl IndexBuffer {
    /// Allocate an empty index buffer
    pub fn new(device: &Rc<dyn GraphicsDevice>, usage: BufferUsage) -> Self {
        Self {
            resource: GpuResource::create(device, ResourceKind::Buffer),
            usage,
            count: 0,
        }
    }

    /// Whether the driver object exists
    pub const fn is_valid(&self) -> bool {
        self.resource.is_valid()
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.resource.id()
    }

    /// Number of indices, used to size draw calls
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Replace the entire contents
    pub fn set_data(&mut self, indices: &[u32]) -> GpuResult<()> {
        if !self.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::Buffer));
        }
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Index, self.resource.id()));
        gpu_check!(device, device.buffer_data(BufferTarget::Index, bytes, self.usage));
        self.count = bytes.len() / std::mem::size_of::<u32>();
        Ok(())
    }

    /// Activate this buffer for the current draw
    pub fn bind(&self) {
        debug_assert!(self.is_valid(), "binding an empty index buffer");
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Index, self.resource.id()));
    }

    /// Deactivate any index buffer
    pub fn unbind(&self) {
        let device = self.resource.device();
        gpu_check!(device, device.bind_buffer(BufferTarget::Index, 0));
    }
}

impl fmt::Debug for IndexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBuffer")
            .field("id", &self.id())
            .field("usage", &self.usage)
            .field("count", &self.count)
            .finish()
    }
}

/// Vertex array object recording attribute bindings and the index buffer
pub struct VertexArray {
    resource: GpuResource,
}

impl VertexArray {
    /// Allocate an empty vertex array
    pub fn new(device: &Rc<dyn GraphicsDevice>) -> Self {
        Self {
            resource: GpuResource::create(device, ResourceKind::VertexArray),
        }
    }

    /// Whether the driver object exists
    pub const fn is_valid(&self) -> bool {
        self.resource.is_valid()
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.resource.id()
    }

    /// Record the attribute layout of `vertices` and the `indices` binding
    pub fn attach(&self, vertices: &VertexBuffer, indices: &IndexBuffer) -> GpuResult<()> {
        if !self.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::VertexArray));
        }
        if !vertices.is_valid() || !indices.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::Buffer));
        }
        let device = self.resource.device();
        let layout = vertices.layout();
        gpu_check!(device, device.bind_vertex_array(self.resource.id()));
        vertices.bind();
        for (location, element) in (0u32..).zip(layout.elements()) {
            gpu_check!(device, device.set_vertex_attribute(location, element, layout.stride()));
        }
        indices.bind();
        gpu_check!(device, device.bind_vertex_array(0));
        Ok(())
    }

    /// Activate this vertex array for the current draw
    pub fn bind(&self) {
        debug_assert!(self.is_valid(), "binding an empty vertex array");
        let device = self.resource.device();
        gpu_check!(device, device.bind_vertex_array(self.resource.id()));
    }

    /// Deactivate any vertex array
    pub fn unbind(&self) {
        let device = self.resource.device();
        gpu_check!(device, device.bind_vertex_array(0));
    }
}

impl fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexArray").field("id", &self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::HeadlessDevice;

    fn headless() -> (Rc<HeadlessDevice>, Rc<dyn GraphicsDevice>) {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        (device, dyn_device)
    }

    fn position_color_layout() -> Layout {
        Layout::new()
            .with_element(ElementType::Float, 3, false)
            .with_element(ElementType::UnsignedByte, 4, true)
    }

    #[test]
    fn test_layout_stride_accumulation() {
        let layout = position_color_layout();
        assert_eq!(layout.stride(), 16);
        assert_eq!(layout.elements()[0].offset, 0);
        assert_eq!(layout.elements()[1].offset, 12);
        assert!(layout.elements()[1].normalized);
    }

    #[test]
    fn test_set_data_and_sub_data() {
        let (device, dyn_device) = headless();
        let mut buffer = VertexBuffer::new(&dyn_device, BufferUsage::Static, position_color_layout());
        buffer.set_data(&[0u8; 32]).unwrap();
        assert_eq!(buffer.size(), 32);
        assert_eq!(buffer.vertex_count(), 2);
        assert_eq!(device.buffer_usage(buffer.id()), Some(BufferUsage::Static));

        buffer.set_sub_data(16, &[7u8; 4]).unwrap();
        let contents = device.buffer_contents(buffer.id()).unwrap();
        assert_eq!(&contents[16..20], &[7, 7, 7, 7]);
        assert_eq!(contents[20], 0);
    }

    #[test]
    fn test_index_count_derived_from_bytes() {
        let (_device, dyn_device) = headless();
        let mut indices = IndexBuffer::new(&dyn_device, BufferUsage::Dynamic);
        indices.set_data(&[0, 1, 2, 0, 2, 3]).unwrap();
        assert_eq!(indices.count(), 6);
    }

    #[test]
    fn test_mapping_writes_through_and_unmaps_on_drop() {
        let (device, dyn_device) = headless();
        let mut buffer = VertexBuffer::new(&dyn_device, BufferUsage::Dynamic, position_color_layout());
        buffer.set_data(&[0u8; 16]).unwrap();
        {
            let mut mapping = buffer.map_range(4, 4, MapAccess::WRITE).unwrap();
            mapping.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        }
        assert_eq!(&device.buffer_contents(buffer.id()).unwrap()[4..8], &[1, 2, 3, 4]);

        // A second mapping succeeds only if the first one was released
        let mapping = buffer.map(MapAccess::READ).unwrap();
        assert_eq!(mapping.len(), 16);
    }

    #[test]
    fn test_map_out_of_range_fails() {
        let (_device, dyn_device) = headless();
        let mut buffer = VertexBuffer::new(&dyn_device, BufferUsage::Dynamic, position_color_layout());
        buffer.set_data(&[0u8; 16]).unwrap();
        assert!(matches!(
            buffer.map_range(8, 16, MapAccess::WRITE),
            Err(GpuError::MapFailed { offset: 8, end: 24 })
        ));
    }

    #[test]
    fn test_upload_to_failed_buffer_reports_null_handle() {
        let (device, dyn_device) = headless();
        device.fail_next_allocation();
        let mut buffer = VertexBuffer::new(&dyn_device, BufferUsage::Dynamic, position_color_layout());
        assert!(!buffer.is_valid());
        assert_eq!(buffer.set_data(&[0u8; 16]), Err(GpuError::NullHandle(ResourceKind::Buffer)));
    }

    #[test]
    fn test_vertex_array_records_layout() {
        let (device, dyn_device) = headless();
        let mut vertices = VertexBuffer::new(&dyn_device, BufferUsage::Dynamic, position_color_layout());
        let mut indices = IndexBuffer::new(&dyn_device, BufferUsage::Dynamic);
        vertices.set_data(&[0u8; 48]).unwrap();
        indices.set_data(&[0, 1, 2]).unwrap();

        let vao = VertexArray::new(&dyn_device);
        vao.attach(&vertices, &indices).unwrap();

        let attributes = device.vertex_attributes(vao.id());
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[1].0, 1);
        assert_eq!(attributes[1].1.offset, 12);
        assert_eq!(attributes[1].2, 16);
    }
}
