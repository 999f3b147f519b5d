//! Value types shared by the renderer, the asset store and user draw objects.
//!
//! [`Shader`] and [`Texture`] are plain copies of GL handles plus metadata.
//! They never own the GPU object: the [`AssetStore`](crate::AssetStore) (or
//! the glyph cache, for glyph textures) deletes it.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{backend::GlBackend, context::GlContext};

/// Straight-alpha RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    #[allow(missing_docs)]
    pub r: f32,
    #[allow(missing_docs)]
    pub g: f32,
    #[allow(missing_docs)]
    pub b: f32,
    #[allow(missing_docs)]
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    #[allow(missing_docs)]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    #[allow(missing_docs)]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Vec4> for Color {
    fn from(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<Color> for Vec4 {
    fn from(c: Color) -> Self {
        Vec4::new(c.r, c.g, c.b, c.a)
    }
}

/// What a shader program is written to draw.
///
/// The primitive renderer only uses a per-object shader whose kind matches
/// the primitive; anything else falls back to the renderer's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShaderKind {
    /// Single points.
    Pixel,
    /// Single line segments.
    Line,
    /// Textured quads.
    Sprite,
    /// Glyph quads sampling a single-channel texture.
    Text,
    /// Instanced points.
    PixelBatch,
    /// Instanced line segments.
    LineBatch,
    /// Instanced textured quads.
    SpriteBatch,
    /// Raw particle quads.
    Particle,
}

/// Per-frame values fed to shaders alongside the object uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderDetails {
    /// Seconds elapsed, uploaded as `u_time`.
    pub elapsed: f32,
}

/// A linked program tagged with what it draws.
pub struct Shader<G: GlBackend> {
    /// The linked program.
    pub program: G::Program,
    #[allow(missing_docs)]
    pub kind: ShaderKind,
    #[allow(missing_docs)]
    pub details: RenderDetails,
}

impl<G: GlBackend> Clone for Shader<G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: GlBackend> Copy for Shader<G> {}

impl<G: GlBackend> PartialEq for Shader<G> {
    fn eq(&self, other: &Self) -> bool {
        self.program == other.program && self.kind == other.kind
    }
}

impl<G: GlBackend> fmt::Debug for Shader<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("kind", &self.kind)
            .field("details", &self.details)
            .finish()
    }
}

impl<G: GlBackend> Shader<G> {
    /// Wrap an already linked program.
    pub fn new(program: G::Program, kind: ShaderKind) -> Self {
        Self {
            program,
            kind,
            details: RenderDetails::default(),
        }
    }

    /// Make this program current.
    pub fn use_program(&self, ctx: &mut GlContext<G>) {
        ctx.use_program(Some(self.program));
    }

    /// Make no program current.
    pub fn unbind(&self, ctx: &mut GlContext<G>) {
        ctx.use_program(None);
    }

    // The setters below write to the program currently in use. Uniforms the
    // program does not declare (or the driver optimized out) are skipped.

    #[allow(missing_docs)]
    pub fn set_float(&self, ctx: &mut GlContext<G>, name: &str, value: f32) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_1_f32(&location, value);
        }
    }

    #[allow(missing_docs)]
    pub fn set_int(&self, ctx: &mut GlContext<G>, name: &str, value: i32) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_1_i32(&location, value);
        }
    }

    #[allow(missing_docs)]
    pub fn set_vec2(&self, ctx: &mut GlContext<G>, name: &str, value: Vec2) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_2_f32(&location, value.to_array());
        }
    }

    #[allow(missing_docs)]
    pub fn set_vec3(&self, ctx: &mut GlContext<G>, name: &str, value: Vec3) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_3_f32(&location, value.to_array());
        }
    }

    #[allow(missing_docs)]
    pub fn set_vec4(&self, ctx: &mut GlContext<G>, name: &str, value: Vec4) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_4_f32(&location, value.to_array());
        }
    }

    /// Upload `color` as a `vec4`.
    pub fn set_color(&self, ctx: &mut GlContext<G>, name: &str, color: Color) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_4_f32(&location, color.to_array());
        }
    }

    #[allow(missing_docs)]
    pub fn set_mat4(&self, ctx: &mut GlContext<G>, name: &str, value: &Mat4) {
        if let Some(location) = self.location(ctx, name) {
            ctx.uniform_matrix_4_f32(&location, &value.to_cols_array());
        }
    }

    fn location(&self, ctx: &mut GlContext<G>, name: &str) -> Option<G::UniformLocation> {
        let location = ctx.uniform_location(self.program, name);
        if location.is_none() {
            trace!("uniform '{name}' is not active in {:?}", self.program);
        }
        location
    }
}

/// A 2D texture and the parameters it was created with.
pub struct Texture<G: GlBackend> {
    #[allow(missing_docs)]
    pub id: G::Texture,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// GL internal format (`RGBA`, `RGB`, `R8`).
    pub internal_format: u32,
    /// Format of the uploaded pixel data.
    pub image_format: u32,
    /// `TEXTURE_WRAP_S` / `TEXTURE_WRAP_T`.
    pub wrap: u32,
    /// `TEXTURE_MIN_FILTER` / `TEXTURE_MAG_FILTER`.
    pub filter: u32,
}

impl<G: GlBackend> Clone for Texture<G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G: GlBackend> Copy for Texture<G> {}

impl<G: GlBackend> PartialEq for Texture<G> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.width == other.width && self.height == other.height
    }
}

impl<G: GlBackend> fmt::Debug for Texture<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl<G: GlBackend> Texture<G> {
    /// Bind to `TEXTURE_2D` on the active unit.
    pub fn bind(&self, ctx: &mut GlContext<G>) {
        ctx.bind_texture(Some(self.id));
    }

    /// Unbind whatever texture is bound on the active unit.
    pub fn unbind(&self, ctx: &mut GlContext<G>) {
        ctx.bind_texture(None);
    }

    /// Texture size as a vector.
    #[expect(clippy::cast_precision_loss)]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Bytes of GPU storage the pixel data occupies.
    pub fn byte_size(&self) -> u64 {
        let channels: u64 = match self.internal_format {
            glow::RGBA | glow::RGBA8 => 4,
            glow::RGB | glow::RGB8 => 3,
            _ => 1,
        };
        u64::from(self.width) * u64::from(self.height) * channels
    }
}

/// A quad vertex: position and texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    #[allow(missing_docs)]
    pub position: [f32; 2],
    #[allow(missing_docs)]
    pub uv: [f32; 2],
}

impl QuadVertex {
    #[allow(missing_docs)]
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }
}

/// Two triangles covering the unit square, in the winding every quad in
/// this crate uses.
pub const UNIT_QUAD: [QuadVertex; 6] = [
    QuadVertex::new(0.0, 1.0, 0.0, 1.0),
    QuadVertex::new(1.0, 0.0, 1.0, 0.0),
    QuadVertex::new(0.0, 0.0, 0.0, 0.0),
    QuadVertex::new(0.0, 1.0, 0.0, 1.0),
    QuadVertex::new(1.0, 1.0, 1.0, 1.0),
    QuadVertex::new(1.0, 0.0, 1.0, 0.0),
];

/// Per-instance entry of the sprite batch: a column-major model matrix.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SpriteInstance {
    #[allow(missing_docs)]
    pub model: [[f32; 4]; 4],
}

impl From<Mat4> for SpriteInstance {
    fn from(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// Per-instance entry of the pixel batch: an offset added to the pixel.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PixelInstance {
    #[allow(missing_docs)]
    pub offset: [f32; 2],
}

impl From<Vec2> for PixelInstance {
    fn from(offset: Vec2) -> Self {
        Self {
            offset: offset.to_array(),
        }
    }
}

/// Per-instance entry of the line batch: both endpoints as `(ax, ay, bx, by)`.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LineInstance {
    #[allow(missing_docs)]
    pub endpoints: [f32; 4],
}

impl From<(Vec2, Vec2)> for LineInstance {
    fn from((a, b): (Vec2, Vec2)) -> Self {
        Self {
            endpoints: [a.x, a.y, b.x, b.y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{RecordingGl, UniformValue};
    use crate::config::RenderConfig;

    #[test]
    fn instance_types_have_gpu_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 64);
        assert_eq!(std::mem::size_of::<PixelInstance>(), 8);
        assert_eq!(std::mem::size_of::<LineInstance>(), 16);
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
    }

    #[test]
    fn shader_setters_upload_through_the_context() {
        let mut ctx = GlContext::new(RecordingGl::new(), &RenderConfig::default());
        let shader: Shader<RecordingGl> = Shader::new(5, ShaderKind::Sprite);
        shader.use_program(&mut ctx);
        shader.set_color(&mut ctx, "u_color", Color::new(1.0, 0.5, 0.25, 1.0));
        shader.set_mat4(&mut ctx, "u_model", &Mat4::IDENTITY);

        assert_eq!(ctx.bound_program(), Some(5));
        assert_eq!(
            ctx.backend().last_uniform("u_color"),
            Some(&UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
        );
        assert_eq!(
            ctx.backend().last_uniform("u_model"),
            Some(&UniformValue::Mat4(Mat4::IDENTITY.to_cols_array()))
        );

        shader.unbind(&mut ctx);
        assert_eq!(ctx.bound_program(), None);
    }

    #[test]
    fn texture_byte_size_follows_format() {
        let texture: Texture<RecordingGl> = Texture {
            id: 1,
            width: 4,
            height: 2,
            internal_format: glow::RGBA,
            image_format: glow::RGBA,
            wrap: glow::CLAMP_TO_EDGE,
            filter: glow::LINEAR,
        };
        assert_eq!(texture.byte_size(), 32);
        assert_eq!(
            Texture::<RecordingGl> {
                internal_format: glow::R8,
                ..texture
            }
            .byte_size(),
            8
        );
    }

    #[test]
    fn color_from_rgb8_is_opaque() {
        let color = Color::from_rgb8(255, 0, 51);
        assert_eq!(color.to_array(), [1.0, 0.0, 0.2, 1.0]);
    }
}
