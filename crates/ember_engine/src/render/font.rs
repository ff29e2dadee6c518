//! # Fonts
//!
//! [`FontAtlas`] rasterizes a character set with `fontdue` at one pixel size
//! and packs the coverage bitmaps into a single RGBA texture (white, with
//! coverage in alpha). [`FontManager`] caches atlases by file and size.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fontdue::{Font, FontSettings};
use thiserror::Error;

use crate::foundation::math::{IntRect, Vec2};
use crate::render::gpu::GraphicsDevice;
use crate::render::text::{Glyph, GlyphSource};
use crate::render::texture::{Texture, TextureError};

/// Width of every atlas texture in pixels
const ATLAS_WIDTH: u32 = 512;

/// Empty pixels around each packed glyph
const GLYPH_PADDING: u32 = 1;

/// Font loading and atlas creation errors
#[derive(Error, Debug)]
pub enum FontError {
    /// Reading the font file failed
    #[error("failed to read font {path}: {source}")]
    Io {
        /// Font file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The font data could not be parsed
    #[error("failed to parse font: {0}")]
    Load(String),

    /// A glyph bitmap is wider than the atlas
    #[error("glyph {ch:?} is {width}px wide, the atlas is {ATLAS_WIDTH}px")]
    GlyphTooLarge {
        /// Offending character
        ch: char,
        /// Bitmap width
        width: u32,
    },

    /// A pixel size of zero was requested
    #[error("invalid font pixel size {0}")]
    InvalidSize(u32),

    /// Uploading the atlas texture failed
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;

/// Printable ASCII, the default character set
pub fn ascii_charset() -> impl Iterator<Item = char> {
    ' '..='~'
}

/// One rasterized coverage bitmap with its metrics
#[derive(Debug, Clone)]
pub(crate) struct RasterGlyph {
    pub ch: char,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
    /// Left edge relative to the pen
    pub xmin: f32,
    /// Bottom edge relative to the baseline, y up
    pub ymin: f32,
    pub advance: f32,
}

/// Packed RGBA atlas image and the glyph table pointing into it
#[derive(Debug)]
pub(crate) struct PackedAtlas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub glyphs: HashMap<char, Glyph>,
}

/// Shelf-pack coverage bitmaps left to right, top to bottom
pub(crate) fn pack_glyphs(raster: &[RasterGlyph]) -> FontResult<PackedAtlas> {
    let mut placements = Vec::with_capacity(raster.len());
    let (mut x, mut y, mut row_height) = (GLYPH_PADDING, GLYPH_PADDING, 0);
    for glyph in raster {
        if glyph.width + 2 * GLYPH_PADDING > ATLAS_WIDTH {
            return Err(FontError::GlyphTooLarge {
                ch: glyph.ch,
                width: glyph.width,
            });
        }
        if x + glyph.width + GLYPH_PADDING > ATLAS_WIDTH {
            x = GLYPH_PADDING;
            y += row_height + GLYPH_PADDING;
            row_height = 0;
        }
        placements.push((x, y));
        x += glyph.width + GLYPH_PADDING;
        row_height = row_height.max(glyph.height);
    }
    let height = (y + row_height + GLYPH_PADDING).max(1);

    let mut pixels = vec![0u8; (ATLAS_WIDTH * height * 4) as usize];
    for texel in pixels.chunks_exact_mut(4) {
        texel[..3].fill(255);
    }
    let mut glyphs = HashMap::with_capacity(raster.len());
    for (glyph, &(left, top)) in raster.iter().zip(&placements) {
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let src = (row * glyph.width + col) as usize;
                let dst = (((top + row) * ATLAS_WIDTH + left + col) * 4 + 3) as usize;
                pixels[dst] = glyph.coverage.get(src).copied().unwrap_or(0);
            }
        }
        glyphs.insert(
            glyph.ch,
            Glyph {
                texture_rect: IntRect::new(left as i32, top as i32, glyph.width as i32, glyph.height as i32),
                bearing: Vec2::new(glyph.xmin, -(glyph.ymin + glyph.height as f32)),
                size: Vec2::new(glyph.width as f32, glyph.height as f32),
                advance: glyph.advance,
            },
        );
    }

    Ok(PackedAtlas {
        width: ATLAS_WIDTH,
        height,
        pixels,
        glyphs,
    })
}

/// Glyphs of one font at one pixel size, packed into a texture
pub struct FontAtlas {
    texture: Texture,
    glyphs: HashMap<char, Glyph>,
    pixel_size: u32,
    ascent: f32,
    line_spacing: f32,
}

impl FontAtlas {
    /// Rasterize printable ASCII from a font file
    pub fn from_file(device: &Rc<dyn GraphicsDevice>, path: impl AsRef<Path>, pixel_size: u32) -> FontResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading font {} at {pixel_size}px", path.display());
        Self::from_bytes(device, &bytes, pixel_size)
    }

    /// Rasterize printable ASCII from font data in memory
    pub fn from_bytes(device: &Rc<dyn GraphicsDevice>, bytes: &[u8], pixel_size: u32) -> FontResult<Self> {
        Self::with_charset(device, bytes, pixel_size, ascii_charset())
    }

    /// Rasterize an explicit character set
    pub fn with_charset(
        device: &Rc<dyn GraphicsDevice>,
        bytes: &[u8],
        pixel_size: u32,
        charset: impl IntoIterator<Item = char>,
    ) -> FontResult<Self> {
        if pixel_size == 0 {
            return Err(FontError::InvalidSize(pixel_size));
        }
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| FontError::Load(e.to_string()))?;
        let px = pixel_size as f32;

        let raster: Vec<RasterGlyph> = charset
            .into_iter()
            .map(|ch| {
                let (metrics, coverage) = font.rasterize(ch, px);
                RasterGlyph {
                    ch,
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    coverage,
                    xmin: metrics.xmin as f32,
                    ymin: metrics.ymin as f32,
                    advance: metrics.advance_width,
                }
            })
            .collect();
        let packed = pack_glyphs(&raster)?;
        let texture = Texture::from_rgba(device, packed.width, packed.height, &packed.pixels)?;

        let (ascent, line_spacing) = font
            .horizontal_line_metrics(px)
            .map_or((px * 0.8, px * 1.2), |m| (m.ascent, m.new_line_size));
        log::info!(
            "Font atlas packed: {}x{}, {} glyphs",
            packed.width,
            packed.height,
            packed.glyphs.len()
        );

        Ok(Self {
            texture,
            glyphs: packed.glyphs,
            pixel_size,
            ascent,
            line_spacing,
        })
    }

    /// Pixel size the glyphs were rasterized at
    pub const fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Atlas texture
    pub const fn atlas(&self) -> &Texture {
        &self.texture
    }

    /// Number of glyphs in the atlas
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl GlyphSource for FontAtlas {
    fn glyph(&self, ch: char) -> Option<Glyph> {
        self.glyphs.get(&ch).copied()
    }

    fn line_spacing(&self) -> f32 {
        self.line_spacing
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn texture(&self) -> Option<&Texture> {
        Some(&self.texture)
    }
}

impl fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAtlas")
            .field("pixel_size", &self.pixel_size)
            .field("glyphs", &self.glyphs.len())
            .field("texture", &self.texture)
            .finish_non_exhaustive()
    }
}

/// Cache of font atlases keyed by file and pixel size
///
/// Construct one per device and pass it to whatever lays out text. Dropping
/// the manager releases every atlas texture.
pub struct FontManager {
    device: Rc<dyn GraphicsDevice>,
    atlases: HashMap<(PathBuf, u32), FontAtlas>,
}

impl FontManager {
    /// Empty cache creating atlases on `device`
    pub fn new(device: Rc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            atlases: HashMap::new(),
        }
    }

    /// Atlas for `path` at `pixel_size`, loading it on first use
    pub fn load(&mut self, path: impl AsRef<Path>, pixel_size: u32) -> FontResult<&FontAtlas> {
        match self.atlases.entry((path.as_ref().to_path_buf(), pixel_size)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = &entry.key().0;
                let atlas = FontAtlas::from_file(&self.device, path, pixel_size).map_err(|e| {
                    log::error!("Font {} at {pixel_size}px unavailable: {e}", path.display());
                    e
                })?;
                Ok(entry.insert(atlas))
            }
        }
    }

    /// Previously loaded atlas
    pub fn get(&self, path: impl AsRef<Path>, pixel_size: u32) -> Option<&FontAtlas> {
        self.atlases.get(&(path.as_ref().to_path_buf(), pixel_size))
    }

    /// Number of cached atlases
    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    /// Release every cached atlas
    pub fn clear(&mut self) {
        log::debug!("Releasing {} font atlases", self.atlases.len());
        self.atlases.clear();
    }
}

impl fmt::Debug for FontManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontManager")
            .field("atlases", &self.atlases.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    use crate::render::gpu::HeadlessDevice;

    fn raster(ch: char, width: u32, height: u32) -> RasterGlyph {
        RasterGlyph {
            ch,
            width,
            height,
            coverage: vec![200; (width * height) as usize],
            xmin: 1.0,
            ymin: -2.0,
            advance: width as f32 + 2.0,
        }
    }

    #[test]
    fn test_pack_places_glyphs_on_shelves() {
        let glyphs: Vec<_> = (0..3).map(|i| raster(char::from(b'a' + i), 200, 10)).collect();
        let packed = pack_glyphs(&glyphs).unwrap();

        assert_eq!(packed.width, ATLAS_WIDTH);
        assert_eq!(packed.glyphs[&'a'].texture_rect, IntRect::new(1, 1, 200, 10));
        assert_eq!(packed.glyphs[&'b'].texture_rect, IntRect::new(202, 1, 200, 10));
        // Third glyph does not fit on the first shelf
        assert_eq!(packed.glyphs[&'c'].texture_rect, IntRect::new(1, 12, 200, 10));
        assert_eq!(packed.height, 23);
        assert_eq!(packed.pixels.len(), (ATLAS_WIDTH * 23 * 4) as usize);
    }

    #[test]
    fn test_pack_writes_coverage_into_alpha() {
        let packed = pack_glyphs(&[raster('x', 2, 2)]).unwrap();
        let texel = |x: u32, y: u32| {
            let i = ((y * ATLAS_WIDTH + x) * 4) as usize;
            &packed.pixels[i..i + 4]
        };
        assert_eq!(texel(1, 1), &[255, 255, 255, 200]);
        assert_eq!(texel(0, 0), &[255, 255, 255, 0]);
    }

    #[test]
    fn test_bearing_is_measured_from_baseline_downwards() {
        let packed = pack_glyphs(&[raster('g', 6, 12)]).unwrap();
        let glyph = packed.glyphs[&'g'];
        assert_relative_eq!(glyph.bearing.x, 1.0);
        // Bitmap top is ymin + height above the baseline
        assert_relative_eq!(glyph.bearing.y, -10.0);
        assert_relative_eq!(glyph.advance, 8.0);
    }

    #[test]
    fn test_oversized_glyph_is_rejected() {
        let result = pack_glyphs(&[raster('W', ATLAS_WIDTH, 4)]);
        assert!(matches!(result, Err(FontError::GlyphTooLarge { ch: 'W', .. })));
    }

    #[test]
    fn test_invalid_font_data_is_an_error() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        assert!(matches!(
            FontAtlas::from_bytes(&device, b"not a font", 16),
            Err(FontError::Load(_))
        ));
        assert!(matches!(
            FontAtlas::from_bytes(&device, b"not a font", 0),
            Err(FontError::InvalidSize(0))
        ));
    }

    #[test]
    fn test_manager_does_not_cache_failures() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let mut manager = FontManager::new(device);
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.ttf");
        assert!(matches!(manager.load(&missing, 16), Err(FontError::Io { .. })));

        let garbage = dir.path().join("garbage.ttf");
        std::fs::File::create(&garbage).unwrap().write_all(b"garbage").unwrap();
        assert!(matches!(manager.load(&garbage, 16), Err(FontError::Load(_))));

        assert!(manager.is_empty());
        assert!(manager.get(&garbage, 16).is_none());
    }
}
