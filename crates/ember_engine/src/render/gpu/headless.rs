//! Recording device without a GPU
//!
//! Keeps every object the engine creates in plain memory and reports misuse
//! the way a GL driver would, through the pending error queue. Tests use the
//! inspection methods to check what reached the "GPU".

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::ptr::NonNull;

use super::{
    BufferTarget, BufferUsage, DeviceErrorKind, GpuError, GpuResult, GraphicsDevice,
    LayoutElement, MapAccess, PrimitiveType, ResourceKind, ShaderStage,
};
use crate::render::states::BlendMode;

/// One recorded indexed draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Primitive mode
    pub primitive: PrimitiveType,
    /// Number of indices drawn
    pub count: usize,
    /// Vertex array bound at draw time
    pub vertex_array: u32,
    /// Index buffer bound at draw time
    pub index_buffer: u32,
    /// Program in use at draw time
    pub program: u32,
    /// Texture bound to unit 0 at draw time
    pub texture: u32,
    /// Blend mode at draw time
    pub blend_mode: BlendMode,
}

struct BufferStore {
    data: Vec<u8>,
    usage: BufferUsage,
    mapped: bool,
}

#[derive(Default)]
struct VertexArrayStore {
    attributes: Vec<(u32, LayoutElement, usize)>,
    vertex_buffer: u32,
    index_buffer: u32,
}

struct TextureStore {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    smooth: bool,
    repeated: bool,
}

#[derive(Default)]
struct ProgramStore {
    uniforms: HashMap<String, u32>,
}

#[derive(Default)]
struct HeadlessState {
    live: HashMap<u32, ResourceKind>,
    destroyed: HashMap<u32, usize>,
    buffers: HashMap<u32, BufferStore>,
    vertex_arrays: HashMap<u32, VertexArrayStore>,
    textures: HashMap<u32, TextureStore>,
    programs: HashMap<u32, ProgramStore>,
    bound_vertex_buffer: u32,
    bound_index_buffer: u32,
    bound_vertex_array: u32,
    bound_textures: HashMap<u32, u32>,
    current_program: u32,
    uniform_values: HashMap<(u32, u32), UniformValue>,
    blend_mode: BlendMode,
    viewport: (i32, i32, u32, u32),
    clear_count: usize,
    upload_count: usize,
    draw_calls: Vec<DrawCall>,
    pending_errors: VecDeque<DeviceErrorKind>,
    fail_allocations: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum UniformValue {
    Mat4([f32; 16]),
    Int(i32),
}

/// In-memory [`GraphicsDevice`] that records what the engine asks of it
pub struct HeadlessDevice {
    diagnostics: bool,
    next_id: Cell<u32>,
    state: RefCell<HeadlessState>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Create a device with diagnostics enabled
    pub fn new() -> Self {
        Self {
            diagnostics: true,
            next_id: Cell::new(1),
            state: RefCell::new(HeadlessState {
                blend_mode: BlendMode::ALPHA,
                ..HeadlessState::default()
            }),
        }
    }

    /// Enable or disable error checks after device calls
    #[must_use]
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Make the next resource or program creation fail
    pub fn fail_next_allocation(&self) {
        self.state.borrow_mut().fail_allocations += 1;
    }

    /// Queue a driver error, as if the last call had failed
    pub fn push_error(&self, error: DeviceErrorKind) {
        self.state.borrow_mut().pending_errors.push_back(error);
    }

    /// Number of live objects of a kind
    pub fn live_resource_count(&self, kind: ResourceKind) -> usize {
        self.state.borrow().live.values().filter(|k| **k == kind).count()
    }

    /// How many times an id was destroyed
    pub fn destroy_count(&self, id: u32) -> usize {
        self.state.borrow().destroyed.get(&id).copied().unwrap_or(0)
    }

    /// Current contents of a buffer
    pub fn buffer_contents(&self, id: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&id).map(|b| b.data.clone())
    }

    /// Usage hint a buffer was last filled with
    pub fn buffer_usage(&self, id: u32) -> Option<BufferUsage> {
        self.state.borrow().buffers.get(&id).map(|b| b.usage)
    }

    /// Number of whole-buffer uploads (`buffer_data` calls)
    pub fn upload_count(&self) -> usize {
        self.state.borrow().upload_count
    }

    /// Every draw recorded so far
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draw_calls.clone()
    }

    /// Attributes declared on a vertex array: (location, element, stride)
    pub fn vertex_attributes(&self, vertex_array: u32) -> Vec<(u32, LayoutElement, usize)> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|v| v.attributes.clone())
            .unwrap_or_default()
    }

    /// Size of a texture
    pub fn texture_size(&self, id: u32) -> Option<(u32, u32)> {
        self.state.borrow().textures.get(&id).map(|t| (t.width, t.height))
    }

    /// Pixels of a texture
    pub fn texture_pixels(&self, id: u32) -> Option<Vec<u8>> {
        self.state.borrow().textures.get(&id).map(|t| t.pixels.clone())
    }

    /// Filtering and wrapping flags of a texture: (smooth, repeated)
    pub fn texture_flags(&self, id: u32) -> Option<(bool, bool)> {
        self.state.borrow().textures.get(&id).map(|t| (t.smooth, t.repeated))
    }

    /// Last matrix uploaded to a named uniform of a program
    pub fn uniform_mat4(&self, program: u32, name: &str) -> Option<[f32; 16]> {
        let state = self.state.borrow();
        let location = *state.programs.get(&program)?.uniforms.get(name)?;
        match state.uniform_values.get(&(program, location)) {
            Some(UniformValue::Mat4(m)) => Some(*m),
            _ => None,
        }
    }

    /// Last integer uploaded to a named uniform of a program
    pub fn uniform_i32(&self, program: u32, name: &str) -> Option<i32> {
        let state = self.state.borrow();
        let location = *state.programs.get(&program)?.uniforms.get(name)?;
        match state.uniform_values.get(&(program, location)) {
            Some(UniformValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Program currently in use
    pub fn current_program(&self) -> u32 {
        self.state.borrow().current_program
    }

    /// Texture bound to a unit
    pub fn bound_texture(&self, unit: u32) -> u32 {
        self.state.borrow().bound_textures.get(&unit).copied().unwrap_or(0)
    }

    /// Current blend mode
    pub fn blend_mode(&self) -> BlendMode {
        self.state.borrow().blend_mode
    }

    /// Current viewport: (x, y, width, height)
    pub fn viewport(&self) -> (i32, i32, u32, u32) {
        self.state.borrow().viewport
    }

    /// Number of clears
    pub fn clear_count(&self) -> usize {
        self.state.borrow().clear_count
    }

    fn allocate(&self, kind: ResourceKind) -> GpuResult<u32> {
        let mut state = self.state.borrow_mut();
        if state.fail_allocations > 0 {
            state.fail_allocations -= 1;
            return Err(GpuError::AllocationFailed {
                kind,
                reason: "allocation refused by headless device".to_string(),
            });
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        state.live.insert(id, kind);
        Ok(id)
    }

    fn bound_buffer(state: &HeadlessState, target: BufferTarget) -> u32 {
        match target {
            BufferTarget::Vertex => state.bound_vertex_buffer,
            BufferTarget::Index => state.bound_index_buffer,
        }
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn diagnostics_enabled(&self) -> bool {
        self.diagnostics
    }

    fn last_error(&self) -> Option<DeviceErrorKind> {
        self.state.borrow_mut().pending_errors.pop_front()
    }

    fn create_resource(&self, kind: ResourceKind) -> GpuResult<u32> {
        let id = self.allocate(kind)?;
        let mut state = self.state.borrow_mut();
        match kind {
            ResourceKind::Buffer => {
                state.buffers.insert(
                    id,
                    BufferStore {
                        data: Vec::new(),
                        usage: BufferUsage::default(),
                        mapped: false,
                    },
                );
            }
            ResourceKind::VertexArray => {
                state.vertex_arrays.insert(id, VertexArrayStore::default());
            }
            ResourceKind::Texture => {
                state.textures.insert(
                    id,
                    TextureStore {
                        width: 0,
                        height: 0,
                        pixels: Vec::new(),
                        smooth: false,
                        repeated: false,
                    },
                );
            }
            ResourceKind::Program => {
                state.programs.insert(id, ProgramStore::default());
            }
        }
        Ok(id)
    }

    fn destroy_resource(&self, kind: ResourceKind, id: u32) {
        let mut state = self.state.borrow_mut();
        *state.destroyed.entry(id).or_insert(0) += 1;
        if state.live.remove(&id) != Some(kind) {
            state.pending_errors.push_back(DeviceErrorKind::InvalidValue);
            return;
        }
        match kind {
            ResourceKind::Buffer => {
                state.buffers.remove(&id);
            }
            ResourceKind::VertexArray => {
                state.vertex_arrays.remove(&id);
            }
            ResourceKind::Texture => {
                state.textures.remove(&id);
            }
            ResourceKind::Program => {
                state.programs.remove(&id);
            }
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        let mut state = self.state.borrow_mut();
        if id != 0 && !state.buffers.contains_key(&id) {
            state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
            return;
        }
        let vertex_array = state.bound_vertex_array;
        match target {
            BufferTarget::Vertex => state.bound_vertex_buffer = id,
            BufferTarget::Index => {
                state.bound_index_buffer = id;
                if let Some(vao) = state.vertex_arrays.get_mut(&vertex_array) {
                    vao.index_buffer = id;
                }
            }
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        match state.buffers.get_mut(&id) {
            Some(buffer) => {
                buffer.data = data.to_vec();
                buffer.usage = usage;
                buffer.mapped = false;
                state.upload_count += 1;
            }
            None => state.pending_errors.push_back(DeviceErrorKind::InvalidOperation),
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        let error = match state.buffers.get_mut(&id) {
            Some(buffer) if offset + data.len() <= buffer.data.len() => {
                buffer.data[offset..offset + data.len()].copy_from_slice(data);
                None
            }
            Some(_) => Some(DeviceErrorKind::InvalidValue),
            None => Some(DeviceErrorKind::InvalidOperation),
        };
        if let Some(error) = error {
            state.pending_errors.push_back(error);
        }
    }

    fn map_buffer_range(
        &self,
        target: BufferTarget,
        offset: usize,
        length: usize,
        access: MapAccess,
    ) -> Option<NonNull<u8>> {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        let result = match state.buffers.get_mut(&id) {
            None => Err(DeviceErrorKind::InvalidOperation),
            Some(buffer) if buffer.mapped => Err(DeviceErrorKind::InvalidOperation),
            Some(_) if !access.intersects(MapAccess::READ | MapAccess::WRITE) => {
                Err(DeviceErrorKind::InvalidOperation)
            }
            Some(buffer) if length == 0 || offset + length > buffer.data.len() => {
                Err(DeviceErrorKind::InvalidValue)
            }
            Some(buffer) => {
                buffer.mapped = true;
                Ok(NonNull::new(buffer.data[offset..].as_mut_ptr()))
            }
        };
        match result {
            Ok(ptr) => ptr,
            Err(error) => {
                state.pending_errors.push_back(error);
                None
            }
        }
    }

    fn unmap_buffer(&self, target: BufferTarget) -> bool {
        let mut state = self.state.borrow_mut();
        let id = Self::bound_buffer(&state, target);
        match state.buffers.get_mut(&id) {
            Some(buffer) if buffer.mapped => {
                buffer.mapped = false;
                true
            }
            _ => {
                state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
                false
            }
        }
    }

    fn bind_vertex_array(&self, id: u32) {
        let mut state = self.state.borrow_mut();
        if id != 0 && !state.vertex_arrays.contains_key(&id) {
            state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
            return;
        }
        state.bound_vertex_array = id;
        state.bound_index_buffer = state.vertex_arrays.get(&id).map_or(0, |v| v.index_buffer);
    }

    fn set_vertex_attribute(&self, location: u32, element: &LayoutElement, stride: usize) {
        let mut state = self.state.borrow_mut();
        let vertex_array = state.bound_vertex_array;
        let vertex_buffer = state.bound_vertex_buffer;
        match state.vertex_arrays.get_mut(&vertex_array) {
            Some(vao) if vertex_buffer != 0 => {
                vao.attributes.retain(|(loc, _, _)| *loc != location);
                vao.attributes.push((location, *element, stride));
                vao.vertex_buffer = vertex_buffer;
            }
            _ => state.pending_errors.push_back(DeviceErrorKind::InvalidOperation),
        }
    }

    fn texture_image(&self, id: u32, width: u32, height: u32, pixels: Option<&[u8]>) {
        let mut state = self.state.borrow_mut();
        let size = (width as usize) * (height as usize) * 4;
        let error = match state.textures.get_mut(&id) {
            Some(_) if pixels.is_some_and(|p| p.len() < size) => Some(DeviceErrorKind::InvalidValue),
            Some(texture) => {
                texture.width = width;
                texture.height = height;
                texture.pixels = pixels.map_or_else(|| vec![0; size], |p| p[..size].to_vec());
                None
            }
            None => Some(DeviceErrorKind::InvalidOperation),
        };
        if let Some(error) = error {
            state.pending_errors.push_back(error);
        }
    }

    fn texture_sub_image(&self, id: u32, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        let mut state = self.state.borrow_mut();
        let error = match state.textures.get_mut(&id) {
            Some(texture)
                if x + width <= texture.width
                    && y + height <= texture.height
                    && pixels.len() >= (width as usize) * (height as usize) * 4 =>
            {
                let row_bytes = width as usize * 4;
                for row in 0..height as usize {
                    let dst = ((y as usize + row) * texture.width as usize + x as usize) * 4;
                    let src = row * row_bytes;
                    texture.pixels[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
                }
                None
            }
            Some(_) => Some(DeviceErrorKind::InvalidValue),
            None => Some(DeviceErrorKind::InvalidOperation),
        };
        if let Some(error) = error {
            state.pending_errors.push_back(error);
        }
    }

    fn texture_parameters(&self, id: u32, smooth: bool, repeated: bool) {
        let mut state = self.state.borrow_mut();
        match state.textures.get_mut(&id) {
            Some(texture) => {
                texture.smooth = smooth;
                texture.repeated = repeated;
            }
            None => state.pending_errors.push_back(DeviceErrorKind::InvalidOperation),
        }
    }

    fn bind_texture(&self, unit: u32, id: u32) {
        let mut state = self.state.borrow_mut();
        if id != 0 && !state.textures.contains_key(&id) {
            state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
            return;
        }
        state.bound_textures.insert(unit, id);
    }

    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> GpuResult<u32> {
        if vertex_source.trim().is_empty() {
            return Err(GpuError::ShaderCompile {
                stage: ShaderStage::Vertex,
                log: "empty source".to_string(),
            });
        }
        if fragment_source.trim().is_empty() {
            return Err(GpuError::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: "empty source".to_string(),
            });
        }
        self.create_resource(ResourceKind::Program)
    }

    fn use_program(&self, id: u32) {
        let mut state = self.state.borrow_mut();
        if id != 0 && !state.programs.contains_key(&id) {
            state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
            return;
        }
        state.current_program = id;
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let store = state.programs.get_mut(&program)?;
        let next = u32::try_from(store.uniforms.len()).unwrap_or(u32::MAX);
        Some(*store.uniforms.entry(name.to_string()).or_insert(next))
    }

    fn set_uniform_mat4(&self, location: u32, value: &[f32; 16]) {
        let mut state = self.state.borrow_mut();
        match state.current_program {
            0 => state.pending_errors.push_back(DeviceErrorKind::InvalidOperation),
            program => {
                state.uniform_values.insert((program, location), UniformValue::Mat4(*value));
            }
        }
    }

    fn set_uniform_i32(&self, location: u32, value: i32) {
        let mut state = self.state.borrow_mut();
        match state.current_program {
            0 => state.pending_errors.push_back(DeviceErrorKind::InvalidOperation),
            program => {
                state.uniform_values.insert((program, location), UniformValue::Int(value));
            }
        }
    }

    fn set_blend_mode(&self, mode: &BlendMode) {
        self.state.borrow_mut().blend_mode = *mode;
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (x, y, width, height);
    }

    fn clear(&self, _color: [f32; 4]) {
        self.state.borrow_mut().clear_count += 1;
    }

    fn draw_indexed(&self, primitive: PrimitiveType, count: usize) {
        let mut state = self.state.borrow_mut();
        let vertex_array = state.bound_vertex_array;
        let index_buffer = state
            .vertex_arrays
            .get(&vertex_array)
            .map_or(0, |v| v.index_buffer);
        let index_bytes = state.buffers.get(&index_buffer).map_or(0, |b| b.data.len());
        if vertex_array == 0 || index_buffer == 0 || state.current_program == 0 {
            state.pending_errors.push_back(DeviceErrorKind::InvalidOperation);
            return;
        }
        if count * std::mem::size_of::<u32>() > index_bytes {
            state.pending_errors.push_back(DeviceErrorKind::InvalidValue);
            return;
        }
        let call = DrawCall {
            primitive,
            count,
            vertex_array,
            index_buffer,
            program: state.current_program,
            texture: state.bound_textures.get(&0).copied().unwrap_or(0),
            blend_mode: state.blend_mode,
        };
        state.draw_calls.push(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_upload_and_sub_data() {
        let device = HeadlessDevice::new();
        let id = device.create_resource(ResourceKind::Buffer).unwrap();
        device.bind_buffer(BufferTarget::Vertex, id);
        device.buffer_data(BufferTarget::Vertex, &[1, 2, 3, 4], BufferUsage::Static);
        device.buffer_sub_data(BufferTarget::Vertex, 2, &[9, 9]);

        assert_eq!(device.buffer_contents(id), Some(vec![1, 2, 9, 9]));
        assert_eq!(device.buffer_usage(id), Some(BufferUsage::Static));
        assert_eq!(device.last_error(), None);

        device.buffer_sub_data(BufferTarget::Vertex, 3, &[0, 0]);
        assert_eq!(device.last_error(), Some(DeviceErrorKind::InvalidValue));
    }

    #[test]
    fn test_double_map_is_invalid() {
        let device = HeadlessDevice::new();
        let id = device.create_resource(ResourceKind::Buffer).unwrap();
        device.bind_buffer(BufferTarget::Index, id);
        device.buffer_data(BufferTarget::Index, &[0; 8], BufferUsage::Dynamic);

        assert!(device.map_buffer_range(BufferTarget::Index, 0, 8, MapAccess::WRITE).is_some());
        assert!(device.map_buffer_range(BufferTarget::Index, 0, 8, MapAccess::WRITE).is_none());
        assert_eq!(device.last_error(), Some(DeviceErrorKind::InvalidOperation));
        assert!(device.unmap_buffer(BufferTarget::Index));
        assert!(!device.unmap_buffer(BufferTarget::Index));
    }

    #[test]
    fn test_draw_without_program_is_rejected() {
        let device = HeadlessDevice::new();
        device.draw_indexed(PrimitiveType::Triangles, 3);
        assert!(device.draw_calls().is_empty());
        assert_eq!(device.last_error(), Some(DeviceErrorKind::InvalidOperation));
    }

    #[test]
    fn test_texture_sub_image_writes_rows() {
        let device = HeadlessDevice::new();
        let id = device.create_resource(ResourceKind::Texture).unwrap();
        device.texture_image(id, 2, 2, None);
        device.texture_sub_image(id, 1, 1, 1, 1, &[1, 2, 3, 4]);
        let pixels = device.texture_pixels(id).unwrap();
        assert_eq!(&pixels[12..16], &[1, 2, 3, 4]);
        assert_eq!(&pixels[0..4], &[0, 0, 0, 0]);
    }
}
