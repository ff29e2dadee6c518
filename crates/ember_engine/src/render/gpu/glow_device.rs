//! OpenGL 3.3 core device through `glow`
//!
//! Every method issues raw GL calls and therefore requires the context the
//! device was created from to be current on the calling thread.

#![allow(unsafe_code)]

use std::num::NonZeroU32;
use std::ptr::NonNull;

use glow::HasContext;

use super::{
    BufferTarget, BufferUsage, DeviceErrorKind, GpuError, GpuResult, GraphicsDevice,
    LayoutElement, MapAccess, PrimitiveType, ResourceKind, ShaderStage, ElementType,
};
use crate::render::states::{BlendEquation, BlendFactor, BlendMode};

/// [`GraphicsDevice`] backed by a live OpenGL context
pub struct GlowDevice {
    gl: glow::Context,
    diagnostics: bool,
    version: String,
}

impl GlowDevice {
    /// Wrap a loaded `glow` context
    pub fn new(gl: glow::Context, diagnostics: bool) -> Self {
        let version = unsafe { gl.get_parameter_string(glow::VERSION) };
        log::info!("OpenGL device ready: {version}");
        Self {
            gl,
            diagnostics,
            version,
        }
    }

    /// Driver version string
    pub fn version(&self) -> &str {
        &self.version
    }
}

const fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

const fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
    }
}

const fn element_type(element_type: ElementType) -> u32 {
    match element_type {
        ElementType::Float => glow::FLOAT,
        ElementType::Byte => glow::BYTE,
        ElementType::UnsignedByte => glow::UNSIGNED_BYTE,
        ElementType::Short => glow::SHORT,
        ElementType::UnsignedShort => glow::UNSIGNED_SHORT,
        ElementType::Int => glow::INT,
        ElementType::UnsignedInt => glow::UNSIGNED_INT,
    }
}

const fn primitive_mode(primitive: PrimitiveType) -> u32 {
    match primitive {
        PrimitiveType::Points => glow::POINTS,
        PrimitiveType::Lines => glow::LINES,
        PrimitiveType::LineStrip => glow::LINE_STRIP,
        PrimitiveType::Triangles => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveType::TriangleFan => glow::TRIANGLE_FAN,
    }
}

const fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

const fn blend_equation(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
    }
}

const fn device_error(code: u32) -> DeviceErrorKind {
    match code {
        glow::INVALID_ENUM => DeviceErrorKind::InvalidEnum,
        glow::INVALID_VALUE => DeviceErrorKind::InvalidValue,
        glow::INVALID_OPERATION => DeviceErrorKind::InvalidOperation,
        glow::OUT_OF_MEMORY => DeviceErrorKind::OutOfMemory,
        glow::INVALID_FRAMEBUFFER_OPERATION => DeviceErrorKind::InvalidFramebufferOperation,
        other => DeviceErrorKind::Other(other),
    }
}

fn native_buffer(id: u32) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(id).map(glow::NativeBuffer)
}

fn native_vertex_array(id: u32) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(id).map(glow::NativeVertexArray)
}

fn native_texture(id: u32) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id).map(glow::NativeTexture)
}

fn native_program(id: u32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id).map(glow::NativeProgram)
}

fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn gl_offset(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl GlowDevice {
    fn compile_stage(&self, stage: ShaderStage, source: &str) -> GpuResult<glow::NativeShader> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind).map_err(|reason| GpuError::AllocationFailed {
                kind: ResourceKind::Program,
                reason,
            })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(GpuError::ShaderCompile { stage, log })
            }
        }
    }
}

impl GraphicsDevice for GlowDevice {
    fn name(&self) -> &str {
        "opengl"
    }

    fn diagnostics_enabled(&self) -> bool {
        self.diagnostics
    }

    fn last_error(&self) -> Option<DeviceErrorKind> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(device_error(code)),
        }
    }

    fn create_resource(&self, kind: ResourceKind) -> GpuResult<u32> {
        let created = unsafe {
            match kind {
                ResourceKind::Buffer => self.gl.create_buffer().map(|b| b.0.get()),
                ResourceKind::VertexArray => self.gl.create_vertex_array().map(|v| v.0.get()),
                ResourceKind::Texture => self.gl.create_texture().map(|t| t.0.get()),
                ResourceKind::Program => self.gl.create_program().map(|p| p.0.get()),
            }
        };
        created.map_err(|reason| GpuError::AllocationFailed { kind, reason })
    }

    fn destroy_resource(&self, kind: ResourceKind, id: u32) {
        unsafe {
            match kind {
                ResourceKind::Buffer => {
                    if let Some(buffer) = native_buffer(id) {
                        self.gl.delete_buffer(buffer);
                    }
                }
                ResourceKind::VertexArray => {
                    if let Some(vao) = native_vertex_array(id) {
                        self.gl.delete_vertex_array(vao);
                    }
                }
                ResourceKind::Texture => {
                    if let Some(texture) = native_texture(id) {
                        self.gl.delete_texture(texture);
                    }
                }
                ResourceKind::Program => {
                    if let Some(program) = native_program(id) {
                        self.gl.delete_program(program);
                    }
                }
            }
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        unsafe { self.gl.bind_buffer(buffer_target(target), native_buffer(id)) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage));
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(buffer_target(target), gl_offset(offset), data);
        }
    }

    fn map_buffer_range(
        &self,
        target: BufferTarget,
        offset: usize,
        length: usize,
        access: MapAccess,
    ) -> Option<NonNull<u8>> {
        let ptr = unsafe {
            self.gl.map_buffer_range(
                buffer_target(target),
                gl_offset(offset),
                gl_offset(length),
                access.bits(),
            )
        };
        NonNull::new(ptr)
    }

    fn unmap_buffer(&self, target: BufferTarget) -> bool {
        unsafe { self.gl.unmap_buffer(buffer_target(target)) };
        true
    }

    fn bind_vertex_array(&self, id: u32) {
        unsafe { self.gl.bind_vertex_array(native_vertex_array(id)) }
    }

    fn set_vertex_attribute(&self, location: u32, element: &LayoutElement, stride: usize) {
        unsafe {
            self.gl.enable_vertex_attrib_array(location);
            self.gl.vertex_attrib_pointer_f32(
                location,
                gl_offset(element.count),
                element_type(element.element_type),
                element.normalized,
                gl_offset(stride),
                gl_offset(element.offset),
            );
        }
    }

    fn texture_image(&self, id: u32, width: u32, height: u32, pixels: Option<&[u8]>) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(id));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                gl_size(width),
                gl_size(height),
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                pixels,
            );
        }
    }

    fn texture_sub_image(&self, id: u32, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(id));
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                gl_size(x),
                gl_size(y),
                gl_size(width),
                gl_size(height),
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn texture_parameters(&self, id: u32, smooth: bool, repeated: bool) {
        let filter = if smooth { glow::LINEAR } else { glow::NEAREST } as i32;
        let wrap = if repeated { glow::REPEAT } else { glow::CLAMP_TO_EDGE } as i32;
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(id));
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
        }
    }

    fn bind_texture(&self, unit: u32, id: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(id));
        }
    }

    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> GpuResult<u32> {
        let vertex = self.compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = match self.compile_stage(ShaderStage::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(e);
            }
        };
        unsafe {
            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(reason) => {
                    self.gl.delete_shader(vertex);
                    self.gl.delete_shader(fragment);
                    return Err(GpuError::AllocationFailed {
                        kind: ResourceKind::Program,
                        reason,
                    });
                }
            };
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
            self.gl.delete_shader(vertex);
            self.gl.delete_shader(fragment);
            if linked {
                Ok(program.0.get())
            } else {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                Err(GpuError::ProgramLink(log))
            }
        }
    }

    fn use_program(&self, id: u32) {
        unsafe { self.gl.use_program(native_program(id)) }
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let program = native_program(program)?;
        unsafe { self.gl.get_uniform_location(program, name) }.map(|location| location.0)
    }

    fn set_uniform_mat4(&self, location: u32, value: &[f32; 16]) {
        let location = glow::NativeUniformLocation(location);
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&location), false, value) }
    }

    fn set_uniform_i32(&self, location: u32, value: i32) {
        let location = glow::NativeUniformLocation(location);
        unsafe { self.gl.uniform_1_i32(Some(&location), value) }
    }

    fn set_blend_mode(&self, mode: &BlendMode) {
        unsafe {
            if *mode == BlendMode::NONE {
                self.gl.disable(glow::BLEND);
                return;
            }
            self.gl.enable(glow::BLEND);
            self.gl.blend_func_separate(
                blend_factor(mode.color_src_factor),
                blend_factor(mode.color_dst_factor),
                blend_factor(mode.alpha_src_factor),
                blend_factor(mode.alpha_dst_factor),
            );
            self.gl.blend_equation_separate(
                blend_equation(mode.color_equation),
                blend_equation(mode.alpha_equation),
            );
        }
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, gl_size(width), gl_size(height)) }
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_indexed(&self, primitive: PrimitiveType, count: usize) {
        unsafe {
            self.gl
                .draw_elements(primitive_mode(primitive), gl_offset(count), glow::UNSIGNED_INT, 0);
        }
    }
}
