//! # GPU Resource Layer
//!
//! Everything that touches the graphics driver goes through the
//! [`GraphicsDevice`] trait. Driver objects are identified by raw `u32` ids
//! at the trait boundary (`0` means "no object"), and owned on the engine
//! side by [`GpuResource`], which destroys its handle exactly once.
//!
//! ## Implementations
//!
//! - [`GlowDevice`]: OpenGL 3.3 core through `glow`, created from a window context
//! - [`HeadlessDevice`]: records every call and keeps buffer contents in memory,
//!   used for tests and off-screen tooling
//!
//! ## Diagnostics
//!
//! The [`gpu_check!`](crate::gpu_check) macro wraps a device call. When the
//! device has diagnostics enabled it queries the driver error state right
//! after the call and logs every pending error together with the statement
//! text and call site. Errors are reported, never raised.

mod glow_device;
mod headless;

use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use bitflags::bitflags;
use thiserror::Error;

use crate::render::states::BlendMode;

pub use glow_device::GlowDevice;
pub use headless::{DrawCall, HeadlessDevice};

/// Kind of driver object behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex or index storage
    Buffer,
    /// Vertex attribute binding state
    VertexArray,
    /// 2D texture
    Texture,
    /// Linked shader program
    Program,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::VertexArray => "vertex array",
            Self::Texture => "texture",
            Self::Program => "program",
        };
        f.write_str(name)
    }
}

/// Binding point of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Vertex,
    /// Element indices
    Index,
}

/// Driver placement hint chosen when a buffer is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times
    Static,
    /// Updated often, drawn many times
    #[default]
    Dynamic,
    /// Updated every frame, drawn a few times
    Stream,
}

bitflags! {
    /// Access flags for mapping buffer memory (values match the GL bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapAccess: u32 {
        /// Mapped memory may be read
        const READ = 0x0001;
        /// Mapped memory may be written
        const WRITE = 0x0002;
        /// Previous contents of the range may be discarded
        const INVALIDATE_RANGE = 0x0004;
        /// Previous contents of the whole buffer may be discarded
        const INVALIDATE_BUFFER = 0x0008;
        /// Do not synchronize with pending draws
        const UNSYNCHRONIZED = 0x0020;
    }
}

/// Scalar type of a vertex attribute component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 32-bit float
    Float,
    /// Signed byte
    Byte,
    /// Unsigned byte
    UnsignedByte,
    /// Signed 16-bit integer
    Short,
    /// Unsigned 16-bit integer
    UnsignedShort,
    /// Signed 32-bit integer
    Int,
    /// Unsigned 32-bit integer
    UnsignedInt,
}

impl ElementType {
    /// Size of one component in bytes
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Float | Self::Int | Self::UnsignedInt => 4,
        }
    }
}

/// Primitive assembly mode of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    /// Isolated points
    Points,
    /// Isolated line segments
    Lines,
    /// Connected line segments
    LineStrip,
    /// Isolated triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

/// Shader stage, for compile diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Error state reported by the driver after a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorKind {
    /// An enum argument was out of range
    InvalidEnum,
    /// A numeric argument was out of range
    InvalidValue,
    /// The operation is not allowed in the current state
    InvalidOperation,
    /// Not enough memory left to execute the command
    OutOfMemory,
    /// The bound framebuffer is not complete
    InvalidFramebufferOperation,
    /// Driver-specific code
    Other(u32),
}

impl fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnum => f.write_str("GL_INVALID_ENUM"),
            Self::InvalidValue => f.write_str("GL_INVALID_VALUE"),
            Self::InvalidOperation => f.write_str("GL_INVALID_OPERATION"),
            Self::OutOfMemory => f.write_str("GL_OUT_OF_MEMORY"),
            Self::InvalidFramebufferOperation => f.write_str("GL_INVALID_FRAMEBUFFER_OPERATION"),
            Self::Other(code) => write!(f, "unknown error 0x{code:04X}"),
        }
    }
}

/// GPU resource errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The driver refused to create an object
    #[error("failed to allocate {kind}: {reason}")]
    AllocationFailed {
        /// Kind of object requested
        kind: ResourceKind,
        /// Driver message
        reason: String,
    },

    /// A shader stage failed to compile
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompile {
        /// Failing stage
        stage: ShaderStage,
        /// Driver info log
        log: String,
    },

    /// The program failed to link
    #[error("shader program link failed: {0}")]
    ProgramLink(String),

    /// An operation required a live handle
    #[error("{0} handle is empty")]
    NullHandle(ResourceKind),

    /// Mapping buffer memory failed
    #[error("failed to map buffer range {offset}..{end}")]
    MapFailed {
        /// Start of the requested range
        offset: usize,
        /// End of the requested range
        end: usize,
    },

    /// The driver reported an error state
    #[error("device error: {0}")]
    Device(DeviceErrorKind),
}

/// Result type for GPU operations
pub type GpuResult<T> = Result<T, GpuError>;

/// One vertex attribute of a buffer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutElement {
    /// Component type
    pub element_type: ElementType,
    /// Components per vertex (1-4)
    pub count: usize,
    /// Byte offset from the start of the vertex
    pub offset: usize,
    /// Integer components are mapped to 0.0-1.0 (or -1.0-1.0)
    pub normalized: bool,
}

/// The operations the engine core needs from a graphics driver
///
/// All calls happen on the thread owning the graphics context. Methods take
/// `&self`; implementations keep driver-side state behind interior
/// mutability the way a GL context does.
pub trait GraphicsDevice {
    /// Human readable backend name
    fn name(&self) -> &str;

    /// Whether [`gpu_check!`](crate::gpu_check) should query errors after calls
    fn diagnostics_enabled(&self) -> bool;

    /// Pop the oldest pending driver error, if any
    fn last_error(&self) -> Option<DeviceErrorKind>;

    /// Create a buffer, vertex array or texture object
    ///
    /// Programs are created with [`GraphicsDevice::create_program`].
    fn create_resource(&self, kind: ResourceKind) -> GpuResult<u32>;

    /// Destroy an object previously created by this device
    fn destroy_resource(&self, kind: ResourceKind, id: u32);

    /// Bind a buffer to a target; `0` unbinds
    fn bind_buffer(&self, target: BufferTarget, id: u32);

    /// Replace the contents of the buffer bound to `target`
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Overwrite part of the buffer bound to `target`
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);

    /// Map a byte range of the buffer bound to `target`
    fn map_buffer_range(
        &self,
        target: BufferTarget,
        offset: usize,
        length: usize,
        access: MapAccess,
    ) -> Option<NonNull<u8>>;

    /// Release the mapping of the buffer bound to `target`
    ///
    /// Returns `false` when the driver reports the contents were lost.
    fn unmap_buffer(&self, target: BufferTarget) -> bool;

    /// Bind a vertex array; `0` unbinds
    fn bind_vertex_array(&self, id: u32);

    /// Describe and enable one attribute of the bound vertex array
    fn set_vertex_attribute(&self, location: u32, element: &LayoutElement, stride: usize);

    /// Allocate texture storage, optionally filled with RGBA8 pixels
    fn texture_image(&self, id: u32, width: u32, height: u32, pixels: Option<&[u8]>);

    /// Overwrite a region of a texture with RGBA8 pixels
    fn texture_sub_image(&self, id: u32, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]);

    /// Set filtering and wrapping of a texture
    fn texture_parameters(&self, id: u32, smooth: bool, repeated: bool);

    /// Bind a texture to a texture unit; `0` unbinds
    fn bind_texture(&self, unit: u32, id: u32);

    /// Compile and link a program from GLSL sources
    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> GpuResult<u32>;

    /// Make a program current; `0` unbinds
    fn use_program(&self, id: u32);

    /// Location of a uniform in a linked program
    fn uniform_location(&self, program: u32, name: &str) -> Option<u32>;

    /// Upload a column-major 4x4 matrix to a uniform of the current program
    fn set_uniform_mat4(&self, location: u32, value: &[f32; 16]);

    /// Upload an integer (or sampler unit) to a uniform of the current program
    fn set_uniform_i32(&self, location: u32, value: i32);

    /// Configure color blending
    fn set_blend_mode(&self, mode: &BlendMode);

    /// Set the viewport rectangle in framebuffer pixels
    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32);

    /// Clear the color buffer
    fn clear(&self, color: [f32; 4]);

    /// Draw `count` indices (u32) of the bound vertex array
    fn draw_indexed(&self, primitive: PrimitiveType, count: usize);

    /// Drain and log pending driver errors when diagnostics are enabled
    ///
    /// Returns the number of errors found.
    fn check_error(&self, statement: &str, file: &str, line: u32) -> usize {
        if !self.diagnostics_enabled() {
            return 0;
        }
        let mut found = 0;
        // A lost context can report errors forever
        while found < 16 {
            let Some(error) = self.last_error() else {
                break;
            };
            log::error!(
                "GPU error {error} ({}) in `{statement}` at {file}:{line}",
                describe_error(error)
            );
            found += 1;
        }
        found
    }
}

/// Wrap a device call with a driver error check
///
/// `$device` is anything a [`GraphicsDevice`] method can be called on.
/// Returns the value of `$call`.
#[macro_export]
macro_rules! gpu_check {
    ($device:expr, $call:expr) => {{
        use $crate::render::gpu::GraphicsDevice as _;
        let result = $call;
        $device.check_error(stringify!($call), file!(), line!());
        result
    }};
}

fn describe_error(error: DeviceErrorKind) -> &'static str {
    match error {
        DeviceErrorKind::InvalidEnum => "an unacceptable value was specified for an enumerated argument",
        DeviceErrorKind::InvalidValue => "a numeric argument is out of range",
        DeviceErrorKind::InvalidOperation => "the specified operation is not allowed in the current state",
        DeviceErrorKind::OutOfMemory => "there is not enough memory left to execute the command",
        DeviceErrorKind::InvalidFramebufferOperation => "the framebuffer object is not complete",
        DeviceErrorKind::Other(_) => "unrecognized driver error",
    }
}

/// Opaque id of a driver object
///
/// Move-only: there is no `Clone` or `Copy`, so a handle cannot be destroyed
/// twice through two copies. `0` is the empty handle.
#[derive(Debug, Default, PartialEq, Eq, Hash)]
pub struct GpuHandle(u32);

impl GpuHandle {
    /// The empty handle
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap a raw driver id
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.0
    }

    /// Whether this handle refers to no object
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Move the id out, leaving this handle empty
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Owner of exactly one driver object
///
/// Created with [`GpuResource::create`]; destroyed on drop or by an explicit
/// [`GpuResource::destroy`]. Creation failures are logged and leave the
/// resource empty, so callers can keep going and skip work that needs it.
pub struct GpuResource {
    handle: GpuHandle,
    kind: ResourceKind,
    device: Rc<dyn GraphicsDevice>,
}

impl GpuResource {
    /// Allocate a new driver object of `kind`
    pub fn create(device: &Rc<dyn GraphicsDevice>, kind: ResourceKind) -> Self {
        let handle = match gpu_check!(device, device.create_resource(kind)) {
            Ok(id) => GpuHandle::from_raw(id),
            Err(e) => {
                log::error!("GPU resource creation failed on {}: {e}", device.name());
                GpuHandle::empty()
            }
        };
        Self {
            handle,
            kind,
            device: Rc::clone(device),
        }
    }

    /// Take ownership of an id created elsewhere on `device` (e.g. a linked program)
    pub fn from_raw(device: &Rc<dyn GraphicsDevice>, kind: ResourceKind, id: u32) -> Self {
        Self {
            handle: GpuHandle::from_raw(id),
            kind,
            device: Rc::clone(device),
        }
    }

    /// The owned handle
    pub const fn handle(&self) -> &GpuHandle {
        &self.handle
    }

    /// Raw id of the owned handle
    pub const fn id(&self) -> u32 {
        self.handle.id()
    }

    /// Kind of the owned object
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Whether creation succeeded and the object was not destroyed yet
    pub const fn is_valid(&self) -> bool {
        !self.handle.is_empty()
    }

    /// Device the object lives on
    pub fn device(&self) -> &Rc<dyn GraphicsDevice> {
        &self.device
    }

    /// Release the driver object now
    ///
    /// Destroying an empty resource is a programmer error.
    pub fn destroy(&mut self) {
        debug_assert!(self.is_valid(), "destroying an empty {} handle", self.kind);
        let handle = self.handle.take();
        if !handle.is_empty() {
            gpu_check!(self.device, self.device.destroy_resource(self.kind, handle.id()));
        }
    }
}

impl fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("device", &self.device.name())
            .finish()
    }
}

impl Drop for GpuResource {
    fn drop(&mut self) {
        if self.is_valid() {
            self.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless() -> (Rc<HeadlessDevice>, Rc<dyn GraphicsDevice>) {
        let device = Rc::new(HeadlessDevice::new());
        let dyn_device: Rc<dyn GraphicsDevice> = device.clone();
        (device, dyn_device)
    }

    #[test]
    fn test_handle_take_leaves_source_empty() {
        let mut handle = GpuHandle::from_raw(7);
        let moved = handle.take();
        assert_eq!(moved.id(), 7);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_resource_destroyed_exactly_once() {
        let (device, dyn_device) = headless();
        let mut resource = GpuResource::create(&dyn_device, ResourceKind::Buffer);
        let id = resource.id();
        assert!(resource.is_valid());

        resource.destroy();
        assert!(!resource.is_valid());
        drop(resource);

        assert_eq!(device.destroy_count(id), 1);
        assert_eq!(device.live_resource_count(ResourceKind::Buffer), 0);
    }

    #[test]
    fn test_moved_resource_is_destroyed_by_new_owner() {
        let (device, dyn_device) = headless();
        let resource = GpuResource::create(&dyn_device, ResourceKind::Texture);
        let id = resource.id();
        let holder = vec![resource];
        assert_eq!(device.destroy_count(id), 0);
        drop(holder);
        assert_eq!(device.destroy_count(id), 1);
    }

    #[test]
    fn test_failed_creation_leaves_empty_handle() {
        let (device, dyn_device) = headless();
        device.fail_next_allocation();
        let resource = GpuResource::create(&dyn_device, ResourceKind::Buffer);
        assert!(!resource.is_valid());
        // Dropping an empty resource must not touch the device
        drop(resource);
        assert_eq!(device.live_resource_count(ResourceKind::Buffer), 0);
    }

    #[test]
    fn test_check_reports_pending_errors_only_with_diagnostics() {
        let device = HeadlessDevice::new().with_diagnostics(false);
        device.push_error(DeviceErrorKind::InvalidValue);
        assert_eq!(device.check_error("noop()", file!(), line!()), 0);

        let device = HeadlessDevice::new().with_diagnostics(true);
        device.push_error(DeviceErrorKind::InvalidValue);
        device.push_error(DeviceErrorKind::OutOfMemory);
        assert_eq!(device.check_error("noop()", file!(), line!()), 2);
        assert_eq!(device.last_error(), None);
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(ElementType::Float.byte_size(), 4);
        assert_eq!(ElementType::UnsignedByte.byte_size(), 1);
        assert_eq!(ElementType::Short.byte_size(), 2);
    }
}
