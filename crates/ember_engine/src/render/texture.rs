//! # Textures
//!
//! RGBA8 2D textures. Pixel data comes from decoded image files, memory, or
//! is generated (the 1x1 white texture used when a draw has no texture).

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::foundation::math::{Color, UVec2};
use crate::gpu_check;
use crate::render::gpu::{GpuError, GpuResource, GraphicsDevice, ResourceKind};

/// Texture creation errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// The device refused the texture
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// Decoding an image failed
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    /// Zero width or height
    #[error("invalid texture size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Pixel buffer does not match the region size
    #[error("expected {expected} bytes of RGBA pixels, got {actual}")]
    PixelCount {
        /// Bytes needed
        expected: usize,
        /// Bytes given
        actual: usize,
    },
}

/// Result type for texture operations
pub type TextureResult<T> = Result<T, TextureError>;

/// Decoded RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Row-major RGBA pixels
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image file
    pub fn from_file(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("Loaded image {width}x{height} from {}", path.display());
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Decode an encoded image held in memory
    pub fn from_bytes(bytes: &[u8]) -> TextureResult<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("Loaded image {width}x{height} from memory");
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Image filled with one color
    pub fn solid_color(width: u32, height: u32, color: Color) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.to_array().repeat(pixel_count),
            width,
            height,
        }
    }
}

fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// RGBA8 texture living on a device
pub struct Texture {
    resource: GpuResource,
    size: UVec2,
    smooth: bool,
    repeated: bool,
}

impl Texture {
    /// Allocate an uninitialized texture
    pub fn new(device: &Rc<dyn GraphicsDevice>, width: u32, height: u32) -> TextureResult<Self> {
        Self::create(device, width, height, None)
    }

    /// Texture filled from row-major RGBA pixels
    pub fn from_rgba(device: &Rc<dyn GraphicsDevice>, width: u32, height: u32, pixels: &[u8]) -> TextureResult<Self> {
        Self::create(device, width, height, Some(pixels))
    }

    /// Texture from decoded image data
    pub fn from_image(device: &Rc<dyn GraphicsDevice>, image: &ImageData) -> TextureResult<Self> {
        Self::from_rgba(device, image.width, image.height, &image.data)
    }

    /// Texture from an image file
    pub fn from_image_file(device: &Rc<dyn GraphicsDevice>, path: impl AsRef<Path>) -> TextureResult<Self> {
        Self::from_image(device, &ImageData::from_file(path)?)
    }

    /// Single opaque white texel, sampled by untextured draws
    pub fn white(device: &Rc<dyn GraphicsDevice>) -> TextureResult<Self> {
        Self::from_image(device, &ImageData::solid_color(1, 1, Color::WHITE))
    }

    fn create(
        device: &Rc<dyn GraphicsDevice>,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidSize { width, height });
        }
        let expected = rgba_len(width, height);
        if let Some(pixels) = pixels.filter(|p| p.len() != expected) {
            return Err(TextureError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        let resource = GpuResource::create(device, ResourceKind::Texture);
        if !resource.is_valid() {
            return Err(GpuError::NullHandle(ResourceKind::Texture).into());
        }
        gpu_check!(device, device.texture_image(resource.id(), width, height, pixels));
        let texture = Self {
            resource,
            size: UVec2::new(width, height),
            smooth: false,
            repeated: false,
        };
        texture.apply_parameters();
        Ok(texture)
    }

    /// Raw driver id
    pub const fn id(&self) -> u32 {
        self.resource.id()
    }

    /// Size in pixels
    pub const fn size(&self) -> UVec2 {
        self.size
    }

    /// Overwrite a region with RGBA pixels
    pub fn update(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> TextureResult<()> {
        if x + width > self.size.x || y + height > self.size.y {
            return Err(TextureError::InvalidSize { width, height });
        }
        let expected = rgba_len(width, height);
        if pixels.len() != expected {
            return Err(TextureError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        let device = self.resource.device();
        gpu_check!(device, device.texture_sub_image(self.resource.id(), x, y, width, height, pixels));
        Ok(())
    }

    /// Linear filtering instead of nearest texel
    pub fn set_smooth(&mut self, smooth: bool) {
        if self.smooth != smooth {
            self.smooth = smooth;
            self.apply_parameters();
        }
    }

    /// Whether linear filtering is on
    pub const fn is_smooth(&self) -> bool {
        self.smooth
    }

    /// Repeat instead of clamping coordinates outside the texture
    pub fn set_repeated(&mut self, repeated: bool) {
        if self.repeated != repeated {
            self.repeated = repeated;
            self.apply_parameters();
        }
    }

    /// Whether coordinates wrap around
    pub const fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// Bind to a texture unit
    pub fn bind(&self, unit: u32) {
        let device = self.resource.device();
        gpu_check!(device, device.bind_texture(unit, self.resource.id()));
    }

    fn apply_parameters(&self) {
        let device = self.resource.device();
        gpu_check!(device, device.texture_parameters(self.resource.id(), self.smooth, self.repeated));
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id())
            .field("size", &(self.size.x, self.size.y))
            .field("smooth", &self.smooth)
            .field("repeated", &self.repeated)
            .finish()
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

    #[test]
    fn test_white_texture() {
        let (device, dyn_device) = headless();
        let texture = Texture::white(&dyn_device).unwrap();
        assert_eq!(texture.size(), UVec2::new(1, 1));
        assert_eq!(device.texture_pixels(texture.id()).unwrap(), vec![255; 4]);
    }

    #[test]
    fn test_update_region() {
        let (device, dyn_device) = headless();
        let mut texture = Texture::new(&dyn_device, 2, 2).unwrap();
        texture.update(1, 1, 1, 1, &[9, 8, 7, 6]).unwrap();
        let pixels = device.texture_pixels(texture.id()).unwrap();
        assert_eq!(&pixels[12..16], &[9, 8, 7, 6]);

        assert!(matches!(
            texture.update(1, 1, 2, 2, &[0; 16]),
            Err(TextureError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_pixels() {
        let (_device, dyn_device) = headless();
        assert!(matches!(
            Texture::from_rgba(&dyn_device, 2, 2, &[0; 8]),
            Err(TextureError::PixelCount { expected: 16, actual: 8 })
        ));
        assert!(matches!(
            Texture::new(&dyn_device, 0, 4),
            Err(TextureError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_parameters_reach_device() {
        let (device, dyn_device) = headless();
        let mut texture = Texture::new(&dyn_device, 4, 4).unwrap();
        texture.set_smooth(true);
        texture.set_repeated(true);
        assert_eq!(device.texture_flags(texture.id()), Some((true, true)));
    }

    #[test]
    fn test_image_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let image = image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        image.save(&path).unwrap();

        let (device, dyn_device) = headless();
        let texture = Texture::from_image_file(&dyn_device, &path).unwrap();
        assert_eq!(texture.size(), UVec2::new(2, 1));
        assert_eq!(
            device.texture_pixels(texture.id()).unwrap(),
            vec![255, 0, 0, 255, 0, 0, 255, 255]
        );
    }
}
