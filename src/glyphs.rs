//! Glyph cache: one GL texture per cached character.
//!
//! At startup every character code in `0..glyph_range_end` is rasterized at
//! a fixed pixel size and uploaded as a single-channel texture. Text layout
//! then places one quad per character using the glyph metrics, with the
//! bearing of `'H'` as the shared baseline.

use std::collections::HashMap;
use std::path::Path;

use glam::{IVec2, UVec2, Vec2};
use log::{debug, info};

use crate::{
    assets::upload_texture,
    backend::GlBackend,
    config::RenderConfig,
    context::GlContext,
    error::{RenderError, Result},
    state::BlendMode,
    types::QuadVertex,
};

/// A rasterized glyph bitmap with FreeType-style metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Bitmap size in pixels.
    pub size: UVec2,
    /// Offset from the pen position to the bitmap's left edge (`x`) and
    /// from the baseline up to its top edge (`y`).
    pub bearing: IVec2,
    /// Horizontal advance in 1/64 pixel units.
    pub advance: u32,
    /// Row-major coverage, one byte per pixel, `size.x * size.y` bytes.
    pub coverage: Vec<u8>,
}

/// Something that can turn characters into coverage bitmaps.
pub trait GlyphRasterizer {
    /// Rasterize `ch` at `pixel_size`. `None` when the face has no glyph
    /// for it.
    fn rasterize_glyph(&self, ch: char, pixel_size: f32) -> Option<RasterizedGlyph>;
}

impl GlyphRasterizer for fontdue::Font {
    fn rasterize_glyph(&self, ch: char, pixel_size: f32) -> Option<RasterizedGlyph> {
        if self.lookup_glyph_index(ch) == 0 {
            return None;
        }
        let (metrics, coverage) = self.rasterize(ch, pixel_size);
        let width = u32::try_from(metrics.width).ok()?;
        let height = u32::try_from(metrics.height).ok()?;
        let top = metrics.ymin + i32::try_from(height).ok()?;

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let advance = (metrics.advance_width.max(0.0) * 64.0).round() as u32;

        Some(RasterizedGlyph {
            size: UVec2::new(width, height),
            bearing: IVec2::new(metrics.xmin, top),
            advance,
            coverage,
        })
    }
}

/// A cached glyph.
pub struct Character<G: GlBackend> {
    /// Single-channel coverage texture.
    pub texture: G::Texture,
    /// Bitmap size in pixels.
    pub size: UVec2,
    /// Left and top bearing in pixels.
    pub bearing: IVec2,
    /// Horizontal advance in 1/64 pixel units.
    pub advance: u32,
}

impl<G: GlBackend> Clone for Character<G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: GlBackend> Copy for Character<G> {}

impl<G: GlBackend> std::fmt::Debug for Character<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Character")
            .field("texture", &self.texture)
            .field("size", &self.size)
            .field("bearing", &self.bearing)
            .field("advance", &self.advance)
            .finish()
    }
}

/// One positioned glyph quad, ready to upload.
pub struct GlyphQuad<G: GlBackend> {
    /// Texture to sample.
    pub texture: G::Texture,
    /// Two triangles: position in `xy`, texture coordinate in `zw`.
    pub vertices: [QuadVertex; 6],
}

/// The result of laying out a string.
pub struct TextLayout<G: GlBackend> {
    /// One quad per character, in string order.
    pub quads: Vec<GlyphQuad<G>>,
    /// Pen position after the last character.
    pub cursor: f32,
}

/// Character textures and metrics for one font at one pixel size.
pub struct GlyphCache<G: GlBackend> {
    characters: HashMap<char, Character<G>>,
    pixel_size: f32,
}

impl<G: GlBackend> GlyphCache<G> {
    /// Parse a TrueType/OpenType face from memory and cache its glyphs.
    ///
    /// # Errors
    ///
    /// [`RenderError::FontLoad`] if the face cannot be parsed, or a backend
    /// error if a texture cannot be created.
    pub fn from_font_bytes(
        ctx: &mut GlContext<G>,
        bytes: &[u8],
        config: &RenderConfig,
    ) -> Result<Self> {
        let settings = fontdue::FontSettings {
            scale: config.font_pixel_size,
            ..fontdue::FontSettings::default()
        };
        let font = fontdue::Font::from_bytes(bytes, settings).map_err(RenderError::font_load)?;
        Self::build(ctx, &font, config)
    }

    /// Read a font file and cache its glyphs.
    pub fn from_font_file(
        ctx: &mut GlContext<G>,
        path: impl AsRef<Path>,
        config: &RenderConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| RenderError::font_load(format!("{}: {e}", path.display())))?;
        info!("loading font {}", path.display());
        Self::from_font_bytes(ctx, &bytes, config)
    }

    /// Rasterize and upload every character in `0..config.glyph_range_end`.
    ///
    /// Characters the rasterizer has no glyph for are left out of the cache.
    pub fn build(
        ctx: &mut GlContext<G>,
        rasterizer: &impl GlyphRasterizer,
        config: &RenderConfig,
    ) -> Result<Self> {
        let pixel_size = config.font_pixel_size;
        let range_end = config.glyph_range_end.min(128);

        ctx.face_culling(true);
        ctx.blending(true, BlendMode::Text);

        let mut characters = HashMap::new();
        for code in 0..range_end {
            let ch = char::from(code);
            let Some(glyph) = rasterizer.rasterize_glyph(ch, pixel_size) else {
                debug!("no glyph for {ch:?}, skipping");
                continue;
            };
            let texture = upload_texture(
                ctx,
                glyph.size.x,
                glyph.size.y,
                glow::R8,
                glow::RED,
                &glyph.coverage,
                glow::CLAMP_TO_EDGE,
                glow::LINEAR,
            )?;
            characters.insert(
                ch,
                Character {
                    texture: texture.id,
                    size: glyph.size,
                    bearing: glyph.bearing,
                    advance: glyph.advance,
                },
            );
        }

        ctx.face_culling(false);
        info!(
            "cached {} glyphs at {pixel_size}px",
            characters.len()
        );

        Ok(Self {
            characters,
            pixel_size,
        })
    }

    /// The cached glyph for `ch`.
    pub fn get(&self, ch: char) -> Option<&Character<G>> {
        self.characters.get(&ch)
    }

    /// Number of cached glyphs.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Rasterization size in pixels.
    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    /// Place `text` with its pen starting at `origin`, scaled by `scale`.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingGlyph`] for the first character with no cached
    /// glyph. Nothing is returned for the rest of the string.
    #[expect(clippy::cast_precision_loss)]
    pub fn layout(&self, text: &str, origin: Vec2, scale: f32) -> Result<TextLayout<G>> {
        let baseline = self.characters.get(&'H').map_or(0, |h| h.bearing.y);
        let mut cursor = origin.x;
        let mut quads = Vec::with_capacity(text.len());

        for ch in text.chars() {
            let glyph = self.characters.get(&ch).ok_or(RenderError::MissingGlyph(ch))?;

            let x = cursor + glyph.bearing.x as f32 * scale;
            let y = origin.y + (baseline - glyph.bearing.y) as f32 * scale;
            let w = glyph.size.x as f32 * scale;
            let h = glyph.size.y as f32 * scale;

            quads.push(GlyphQuad {
                texture: glyph.texture,
                vertices: [
                    QuadVertex::new(x, y + h, 0.0, 1.0),
                    QuadVertex::new(x + w, y, 1.0, 0.0),
                    QuadVertex::new(x, y, 0.0, 0.0),
                    QuadVertex::new(x, y + h, 0.0, 1.0),
                    QuadVertex::new(x + w, y + h, 1.0, 1.0),
                    QuadVertex::new(x + w, y, 1.0, 0.0),
                ],
            });

            cursor += (glyph.advance >> 6) as f32 * scale;
        }

        Ok(TextLayout { quads, cursor })
    }

    /// Delete every glyph texture.
    pub fn destroy(&mut self, ctx: &mut GlContext<G>) {
        for (_, character) in self.characters.drain() {
            ctx.delete_texture(character.texture);
        }
    }
}
