//! The primitive and batch renderer.
//!
//! [`Renderer`] owns the default shader programs, the glyph cache and the
//! CPU side of the three instance batches. Every GPU buffer it draws from
//! lives in the [`GlContext`] registry under the names in [`names`], created
//! once by [`Renderer::new`] and sized up front: draws only ever update
//! buffers in place.

mod batch;
mod primitive;
pub mod transform;

use std::path::Path;

use glam::Mat4;
use log::{debug, info, warn};

pub use batch::InstanceBatch;
pub use primitive::DrawMode;
use primitive::Pass;

use crate::{
    backend::GlBackend,
    config::RenderConfig,
    context::GlContext,
    error::{RenderError, ResourceKind, Result},
    glyphs::GlyphCache,
    shaders::RendererShaders,
    state::BlendMode,
    types::{LineInstance, PixelInstance, Shader, SpriteInstance, UNIT_QUAD},
};

/// Registry names of the renderer's vertex arrays and buffers.
pub mod names {
    #![allow(missing_docs)]

    pub const POINT_VAO: &str = "renderer_point_vao";
    pub const POINT_VBO: &str = "renderer_point_vbo";
    pub const LINE_VAO: &str = "renderer_line_vao";
    pub const LINE_VBO: &str = "renderer_line_vbo";
    pub const SPRITE_VAO: &str = "renderer_sprite_vao";
    pub const SPRITE_VBO: &str = "renderer_sprite_vbo";
    /// Texture coordinates, shared by the sprite and sprite batch arrays.
    pub const SPRITE_UV_VBO: &str = "renderer_sprite_uv_vbo";
    pub const TEXT_VAO: &str = "renderer_text_vao";
    pub const TEXT_VBO: &str = "renderer_text_vbo";
    pub const PIXEL_BATCH_VAO: &str = "renderer_pixel_batch_vao";
    pub const PIXEL_BATCH_VBO: &str = "renderer_pixel_batch_vbo";
    pub const PIXEL_BATCH_INSTANCES: &str = "renderer_pixel_batch_instances";
    pub const LINE_BATCH_VAO: &str = "renderer_line_batch_vao";
    pub const LINE_BATCH_VBO: &str = "renderer_line_batch_vbo";
    pub const LINE_BATCH_INSTANCES: &str = "renderer_line_batch_instances";
    pub const SPRITE_BATCH_VAO: &str = "renderer_sprite_batch_vao";
    pub const SPRITE_BATCH_VBO: &str = "renderer_sprite_batch_vbo";
    pub const SPRITE_BATCH_INSTANCES: &str = "renderer_sprite_batch_instances";

    pub(super) const VERTEX_ARRAYS: [&str; 7] = [
        POINT_VAO,
        LINE_VAO,
        SPRITE_VAO,
        TEXT_VAO,
        PIXEL_BATCH_VAO,
        LINE_BATCH_VAO,
        SPRITE_BATCH_VAO,
    ];

    pub(super) const BUFFERS: [&str; 11] = [
        POINT_VBO,
        LINE_VBO,
        SPRITE_VBO,
        SPRITE_UV_VBO,
        TEXT_VBO,
        PIXEL_BATCH_VBO,
        PIXEL_BATCH_INSTANCES,
        LINE_BATCH_VBO,
        LINE_BATCH_INSTANCES,
        SPRITE_BATCH_VBO,
        SPRITE_BATCH_INSTANCES,
    ];
}

const F32: usize = std::mem::size_of::<f32>();

/// Draws pixels, lines, sprites and text, singly or in instanced batches.
///
/// All drawing methods take the [`GlContext`] the renderer was created
/// with.
pub struct Renderer<G: GlBackend> {
    shaders: RendererShaders<G>,
    glyphs: Option<GlyphCache<G>>,
    pixel_batch: InstanceBatch<PixelInstance>,
    line_batch: InstanceBatch<LineInstance>,
    sprite_batch: InstanceBatch<SpriteInstance>,
    projection: Mat4,
    elapsed: f32,
    config: RenderConfig,
}

impl<G: GlBackend> Renderer<G> {
    /// Compile the default shaders and create every vertex array and buffer.
    ///
    /// The projection starts as the identity; call
    /// [`set_projection`](Self::set_projection) before drawing in pixel
    /// coordinates. No font is loaded.
    ///
    /// # Errors
    ///
    /// Shader compile or link failures, a backend failure, or a
    /// [`DuplicateResource`](crate::RenderError::DuplicateResource) error if
    /// another renderer already lives in `ctx`.
    pub fn new(ctx: &mut GlContext<G>, config: &RenderConfig) -> Result<Self> {
        let shaders = RendererShaders::compile_defaults(ctx)?;
        Self::with_shaders(ctx, shaders, config)
    }

    /// Like [`new`](Self::new) with already compiled default programs.
    ///
    /// On failure the programs and every object created so far are deleted.
    pub fn with_shaders(
        ctx: &mut GlContext<G>,
        shaders: RendererShaders<G>,
        config: &RenderConfig,
    ) -> Result<Self> {
        let renderer = Self {
            shaders,
            glyphs: None,
            pixel_batch: InstanceBatch::new(
                "pixel",
                config.pixel_batch_capacity,
                config.batch_overflow,
                config.zero_unused_instances,
            ),
            line_batch: InstanceBatch::new(
                "line",
                config.line_batch_capacity,
                config.batch_overflow,
                config.zero_unused_instances,
            ),
            sprite_batch: InstanceBatch::new(
                "sprite",
                config.sprite_batch_capacity,
                config.batch_overflow,
                config.zero_unused_instances,
            ),
            projection: Mat4::IDENTITY,
            elapsed: 0.0,
            config: config.clone(),
        };

        if let Err(err) = Self::ensure_names_vacant(ctx) {
            renderer.shaders.destroy(ctx);
            return Err(err);
        }
        if let Err(err) = renderer.load_buffers(ctx) {
            renderer.discard(ctx);
            return Err(err);
        }
        ctx.blending(true, BlendMode::Default);

        info!(
            "renderer ready: batches of {} sprites, {} pixels, {} lines",
            renderer.sprite_batch.capacity(),
            renderer.pixel_batch.capacity(),
            renderer.line_batch.capacity()
        );
        Ok(renderer)
    }

    fn ensure_names_vacant(ctx: &GlContext<G>) -> Result<()> {
        let taken = |kind, name: &str| RenderError::DuplicateResource {
            kind,
            name: name.to_owned(),
        };
        if let Some(vao) = names::VERTEX_ARRAYS.into_iter().find(|vao| ctx.vao(vao).is_some()) {
            return Err(taken(ResourceKind::Vao, vao));
        }
        if let Some(vbo) = names::BUFFERS.into_iter().find(|vbo| ctx.vbo(vbo).is_some()) {
            return Err(taken(ResourceKind::Vbo, vbo));
        }
        Ok(())
    }

    fn load_buffers(&self, ctx: &mut GlContext<G>) -> Result<()> {
        Self::load_point_buffers(ctx)?;
        Self::load_sprite_buffers(ctx)?;
        Self::load_text_buffers(ctx)?;
        self.load_batch_buffers(ctx)
    }

    /// Undo a partial construction. Every registered name was created by
    /// this renderer, as `ensure_names_vacant` ran first.
    fn discard(&self, ctx: &mut GlContext<G>) {
        ctx.unbind_vao();
        ctx.unbind_vbo();
        self.shaders.destroy(ctx);
        for vao in names::VERTEX_ARRAYS {
            if ctx.vao(vao).is_some() {
                ctx.delete_vao(vao).ok();
            }
        }
        for vbo in names::BUFFERS {
            if ctx.vbo(vbo).is_some() {
                ctx.delete_vbo(vbo).ok();
            }
        }
        warn!("renderer construction failed; created objects released");
    }

    fn load_point_buffers(ctx: &mut GlContext<G>) -> Result<()> {
        let layouts = [
            (names::POINT_VAO, names::POINT_VBO, 1),
            (names::LINE_VAO, names::LINE_VBO, 2),
        ];
        for (vao, vbo, vertices) in layouts {
            ctx.create_vao(vao)?;
            ctx.create_vbo(vbo)?;
            ctx.bind_vao(vao)?;
            ctx.bind_vbo(vbo)?;
            ctx.buffer_data_size(glow::ARRAY_BUFFER, 2 * F32 * vertices, glow::DYNAMIC_DRAW);
            attribute(ctx, 0, 2, 2 * F32, 0);
            ctx.unbind_vao();
            ctx.unbind_vbo();
        }
        Ok(())
    }

    fn load_sprite_buffers(ctx: &mut GlContext<G>) -> Result<()> {
        let positions: Vec<[f32; 2]> = UNIT_QUAD.iter().map(|v| v.position).collect();
        let uvs: Vec<[f32; 2]> = UNIT_QUAD.iter().map(|v| v.uv).collect();

        ctx.create_vao(names::SPRITE_VAO)?;
        ctx.create_vbo(names::SPRITE_VBO)?;
        ctx.create_vbo(names::SPRITE_UV_VBO)?;
        ctx.bind_vao(names::SPRITE_VAO)?;

        ctx.bind_vbo(names::SPRITE_VBO)?;
        ctx.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(&positions), glow::STATIC_DRAW);
        attribute(ctx, 0, 2, 2 * F32, 0);

        ctx.bind_vbo(names::SPRITE_UV_VBO)?;
        ctx.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(&uvs), glow::DYNAMIC_DRAW);
        attribute(ctx, 1, 2, 2 * F32, 0);

        ctx.unbind_vao();
        ctx.unbind_vbo();
        Ok(())
    }

    fn load_text_buffers(ctx: &mut GlContext<G>) -> Result<()> {
        ctx.create_vao(names::TEXT_VAO)?;
        ctx.create_vbo(names::TEXT_VBO)?;
        ctx.bind_vao(names::TEXT_VAO)?;
        ctx.bind_vbo(names::TEXT_VBO)?;
        ctx.buffer_data_size(glow::ARRAY_BUFFER, 6 * 4 * F32, glow::DYNAMIC_DRAW);
        attribute(ctx, 0, 4, 4 * F32, 0);
        ctx.unbind_vao();
        ctx.unbind_vbo();
        Ok(())
    }

    fn load_batch_buffers(&self, ctx: &mut GlContext<G>) -> Result<()> {
        // Pixels: one base point, offset per instance.
        ctx.create_vao(names::PIXEL_BATCH_VAO)?;
        ctx.create_vbo(names::PIXEL_BATCH_VBO)?;
        ctx.create_vbo(names::PIXEL_BATCH_INSTANCES)?;
        ctx.bind_vao(names::PIXEL_BATCH_VAO)?;
        ctx.bind_vbo(names::PIXEL_BATCH_VBO)?;
        ctx.buffer_data_size(glow::ARRAY_BUFFER, 2 * F32, glow::DYNAMIC_DRAW);
        attribute(ctx, 0, 2, 2 * F32, 0);
        ctx.bind_vbo(names::PIXEL_BATCH_INSTANCES)?;
        ctx.buffer_data_size(glow::ARRAY_BUFFER, self.pixel_batch.byte_size(), glow::DYNAMIC_DRAW);
        attribute(ctx, 3, 2, 2 * F32, 0);
        ctx.vertex_attrib_divisor(3, 1);
        ctx.unbind_vao();
        ctx.unbind_vbo();

        // Lines: endpoint weights, segment per instance.
        let weights: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
        ctx.create_vao(names::LINE_BATCH_VAO)?;
        ctx.create_vbo(names::LINE_BATCH_VBO)?;
        ctx.create_vbo(names::LINE_BATCH_INSTANCES)?;
        ctx.bind_vao(names::LINE_BATCH_VAO)?;
        ctx.bind_vbo(names::LINE_BATCH_VBO)?;
        ctx.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(&weights), glow::STATIC_DRAW);
        attribute(ctx, 0, 2, 2 * F32, 0);
        ctx.bind_vbo(names::LINE_BATCH_INSTANCES)?;
        ctx.buffer_data_size(glow::ARRAY_BUFFER, self.line_batch.byte_size(), glow::DYNAMIC_DRAW);
        attribute(ctx, 3, 4, 4 * F32, 0);
        ctx.vertex_attrib_divisor(3, 1);
        ctx.unbind_vao();
        ctx.unbind_vbo();

        // Sprites: unit quad and shared UVs, model matrix per instance.
        let positions: Vec<[f32; 2]> = UNIT_QUAD.iter().map(|v| v.position).collect();
        ctx.create_vao(names::SPRITE_BATCH_VAO)?;
        ctx.create_vbo(names::SPRITE_BATCH_VBO)?;
        ctx.create_vbo(names::SPRITE_BATCH_INSTANCES)?;
        ctx.bind_vao(names::SPRITE_BATCH_VAO)?;
        ctx.bind_vbo(names::SPRITE_BATCH_VBO)?;
        ctx.buffer_data(glow::ARRAY_BUFFER, bytemuck::cast_slice(&positions), glow::STATIC_DRAW);
        attribute(ctx, 0, 2, 2 * F32, 0);
        ctx.bind_vbo(names::SPRITE_UV_VBO)?;
        attribute(ctx, 1, 2, 2 * F32, 0);
        ctx.bind_vbo(names::SPRITE_BATCH_INSTANCES)?;
        ctx.buffer_data_size(glow::ARRAY_BUFFER, self.sprite_batch.byte_size(), glow::DYNAMIC_DRAW);
        // A mat4 attribute takes four consecutive vec4 slots.
        let stride = std::mem::size_of::<SpriteInstance>();
        for (column, index) in (3..7).enumerate() {
            attribute(ctx, index, 4, stride, column * 4 * F32);
            ctx.vertex_attrib_divisor(index, 1);
        }
        ctx.unbind_vao();
        ctx.unbind_vbo();

        debug!("batch buffers created");
        Ok(())
    }

    /// Load a font from disk and cache its glyphs, replacing any previous
    /// cache (whose textures are deleted).
    ///
    /// # Errors
    ///
    /// [`RenderError::FontLoad`](crate::RenderError::FontLoad) if the file
    /// cannot be read or parsed.
    pub fn load_font(&mut self, ctx: &mut GlContext<G>, path: impl AsRef<Path>) -> Result<()> {
        let glyphs = GlyphCache::from_font_file(ctx, path, &self.config)?;
        self.install_glyphs(ctx, glyphs);
        Ok(())
    }

    /// [`load_font`](Self::load_font) from an in-memory font file.
    pub fn load_font_bytes(&mut self, ctx: &mut GlContext<G>, bytes: &[u8]) -> Result<()> {
        let glyphs = GlyphCache::from_font_bytes(ctx, bytes, &self.config)?;
        self.install_glyphs(ctx, glyphs);
        Ok(())
    }

    fn install_glyphs(&mut self, ctx: &mut GlContext<G>, glyphs: GlyphCache<G>) {
        if let Some(mut old) = self.glyphs.replace(glyphs) {
            old.destroy(ctx);
        }
        ctx.blending(true, BlendMode::Default);
    }

    /// Use an already built glyph cache. The previous one, if any, is handed
    /// back to the caller.
    pub fn set_glyphs(&mut self, glyphs: GlyphCache<G>) -> Option<GlyphCache<G>> {
        self.glyphs.replace(glyphs)
    }

    /// The loaded glyph cache.
    pub fn glyphs(&self) -> Option<&GlyphCache<G>> {
        self.glyphs.as_ref()
    }

    /// The default programs.
    pub fn shaders(&self) -> &RendererShaders<G> {
        &self.shaders
    }

    /// Upload `projection` to every default program.
    ///
    /// Custom shaders receive the same matrix at the start of each draw.
    pub fn set_projection(&mut self, ctx: &mut GlContext<G>, projection: &Mat4) {
        self.projection = *projection;
        for shader in self.shaders.all() {
            shader.use_program(ctx);
            shader.set_mat4(ctx, "u_projection", projection);
        }
        ctx.use_program(None);
    }

    /// The projection last set.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Upload the current projection to a program of the caller's, such as
    /// one drawn outside the renderer. Leaves `shader` in use.
    pub fn upload_projection(&self, ctx: &mut GlContext<G>, shader: &Shader<G>) {
        shader.use_program(ctx);
        shader.set_mat4(ctx, "u_projection", &self.projection);
    }

    /// Seconds since start, uploaded as `u_time` with every draw.
    pub fn set_elapsed_time(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
        for shader in self.shaders.all_mut() {
            shader.details.elapsed = elapsed;
        }
    }

    /// The configuration the renderer was created with.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Delete the default programs, glyph textures and every vertex array
    /// and buffer the renderer created.
    pub fn destroy(&mut self, ctx: &mut GlContext<G>) -> Result<()> {
        self.shaders.destroy(ctx);
        if let Some(mut glyphs) = self.glyphs.take() {
            glyphs.destroy(ctx);
        }
        for vao in names::VERTEX_ARRAYS {
            ctx.delete_vao(vao)?;
        }
        for vbo in names::BUFFERS {
            ctx.delete_vbo(vbo)?;
        }
        debug!("renderer destroyed");
        Ok(())
    }
}

/// Enable float attribute `index` reading from the bound `ARRAY_BUFFER`.
fn attribute<G: GlBackend>(ctx: &mut GlContext<G>, index: u32, size: i32, stride: usize, offset: usize) {
    ctx.enable_vertex_attrib_array(index);
    ctx.vertex_attrib_pointer(index, size, stride, offset);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::recording::{GlCall, RecordingGl, UniformValue};
    use crate::types::{Color, Texture};
    use pretty_assertions::assert_eq;

    pub(crate) fn renderer_with(
        config: &RenderConfig,
    ) -> (GlContext<RecordingGl>, Renderer<RecordingGl>) {
        let mut ctx = GlContext::new(RecordingGl::new(), config);
        let renderer = Renderer::new(&mut ctx, config).unwrap();
        (ctx, renderer)
    }

    /// A 64x32 RGBA texture that was never uploaded.
    pub(crate) fn texture() -> Texture<RecordingGl> {
        Texture {
            id: 99,
            width: 64,
            height: 32,
            internal_format: glow::RGBA,
            image_format: glow::RGBA,
            wrap: glow::CLAMP_TO_EDGE,
            filter: glow::LINEAR,
        }
    }

    #[test]
    fn new_creates_every_buffer_and_leaves_nothing_bound() {
        let (ctx, _renderer) = renderer_with(&RenderConfig::default());
        assert_eq!(ctx.total_vao(), 7);
        assert_eq!(ctx.total_vbo(), 11);
        assert_eq!(ctx.bound_vao(), None);
        assert_eq!(ctx.bound_vbo(), None);
        assert_eq!(ctx.blend_mode(), Some(BlendMode::Default));
    }

    #[test]
    fn instance_buffers_are_sized_for_full_capacity() {
        let config = RenderConfig::default().with_batch_capacities(10, 20, 30);
        let (ctx, _renderer) = renderer_with(&config);
        let size = |name| ctx.backend().buffer_contents(ctx.vbo(name).unwrap()).len();
        assert_eq!(size(names::SPRITE_BATCH_INSTANCES), 10 * 64);
        assert_eq!(size(names::PIXEL_BATCH_INSTANCES), 20 * 8);
        assert_eq!(size(names::LINE_BATCH_INSTANCES), 30 * 16);
        assert_eq!(size(names::TEXT_VBO), 96);
        assert_eq!(size(names::POINT_VBO), 8);
    }

    #[test]
    fn sprite_batch_matrix_spans_four_instanced_slots() {
        let (ctx, _renderer) = renderer_with(&RenderConfig::default());
        let gl = ctx.backend();
        for (column, index) in (3..7).enumerate() {
            let offset = i32::try_from(column * 16).unwrap();
            assert_eq!(
                gl.count(|call| *call
                    == GlCall::AttribPointer {
                        index,
                        size: 4,
                        stride: 64,
                        offset,
                    }),
                1
            );
        }
        // slot 3 once each for pixels and lines, slots 3..7 for sprites
        assert_eq!(
            gl.count(|call| matches!(call, GlCall::AttribDivisor { divisor: 1, .. })),
            6
        );
    }

    #[test]
    fn second_renderer_in_one_context_is_rejected() {
        let config = RenderConfig::default();
        let (mut ctx, first) = renderer_with(&config);
        ctx.backend_mut().clear_calls();

        let err = Renderer::new(&mut ctx, &config).err().unwrap();
        assert!(matches!(
            err,
            RenderError::DuplicateResource {
                kind: ResourceKind::Vao,
                ..
            }
        ));
        let gl = ctx.backend();
        assert_eq!(gl.count(|call| matches!(call, GlCall::CreateProgram(_))), 8);
        assert_eq!(gl.count(|call| matches!(call, GlCall::DeleteProgram(_))), 8);
        assert_eq!(gl.count(|call| matches!(call, GlCall::CreateVertexArray(_))), 0);
        assert_eq!((ctx.total_vao(), ctx.total_vbo()), (7, 11));

        first
            .render_pixel_at(&mut ctx, glam::Vec2::ZERO, Color::WHITE)
            .unwrap();
    }

    #[test]
    fn failed_construction_releases_what_it_created() {
        let config = RenderConfig::default();
        let mut ctx = GlContext::new(RecordingGl::new(), &config);
        ctx.backend_mut().fail_buffers_after(3);

        let err = Renderer::new(&mut ctx, &config).err().unwrap();
        assert!(matches!(err, RenderError::Backend(_)));
        assert_eq!((ctx.total_vao(), ctx.total_vbo()), (0, 0));
        assert_eq!((ctx.bound_vao(), ctx.bound_vbo()), (None, None));
        assert_eq!(
            ctx.backend()
                .count(|call| matches!(call, GlCall::DeleteProgram(_))),
            8
        );

        ctx.backend_mut().fail_buffers_after(usize::MAX);
        assert!(Renderer::new(&mut ctx, &config).is_ok());
    }

    #[test]
    fn projection_reaches_every_default_program() {
        let (mut ctx, mut renderer) = renderer_with(&RenderConfig::default());
        ctx.backend_mut().clear_calls();
        let projection = transform::screen_projection(800.0, 600.0);
        renderer.set_projection(&mut ctx, &projection);

        let expected = UniformValue::Mat4(projection.to_cols_array());
        assert_eq!(
            ctx.backend().count(|call| matches!(
                call,
                GlCall::Uniform { name, value } if name == "u_projection" && *value == expected
            )),
            8
        );
        for shader in renderer.shaders().all() {
            assert_eq!(
                ctx.backend()
                    .count(|call| *call == GlCall::UseProgram(Some(shader.program))),
                1
            );
        }
        assert_eq!(ctx.bound_program(), None);
        assert_eq!(renderer.projection(), projection);
    }

    #[test]
    fn elapsed_time_reaches_shader_details() {
        let (_ctx, mut renderer) = renderer_with(&RenderConfig::default());
        renderer.set_elapsed_time(2.5);
        assert!(renderer
            .shaders()
            .all()
            .iter()
            .all(|shader| (shader.details.elapsed - 2.5).abs() < f32::EPSILON));
    }

    #[test]
    fn destroy_releases_everything() {
        let (mut ctx, mut renderer) = renderer_with(&RenderConfig::default());
        let glyphs = crate::glyphs::tests::cache(&mut ctx);
        renderer.set_glyphs(glyphs);
        ctx.backend_mut().clear_calls();

        renderer.destroy(&mut ctx).unwrap();

        assert_eq!(ctx.total_vao(), 0);
        assert_eq!(ctx.total_vbo(), 0);
        let gl = ctx.backend();
        assert_eq!(gl.count(|call| matches!(call, GlCall::DeleteProgram(_))), 8);
        assert_eq!(gl.count(|call| matches!(call, GlCall::DeleteTexture(_))), 3);
        assert!(renderer.glyphs().is_none());
    }
}
