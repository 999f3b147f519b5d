//! Single-primitive draws and the pass routine shared with the batches.

use glam::Vec2;
use log::{debug, trace};

use super::{names, transform::sprite_model, Renderer};
use crate::{
    backend::GlBackend,
    context::GlContext,
    error::{RenderError, Result},
    primitives::{Line, Pixel, Sprite, Text},
    state::BlendMode,
    types::{Color, Shader, Texture},
};

/// How a pass issues its draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// One `draw_arrays` call.
    Single,
    /// One `draw_arrays_instanced` call over every slot of a batch.
    Instanced {
        /// Instance count, always the batch capacity.
        instances: usize,
    },
}

/// Everything a pass binds, uploads and draws.
pub(super) struct Pass<'a, G: GlBackend> {
    pub vao: &'static str,
    /// Buffer that receives `vertices`.
    pub vbo: &'static str,
    pub shader: Shader<G>,
    /// The shader is user supplied and needs the projection uploaded.
    pub custom: bool,
    /// Skipped when empty.
    pub vertices: &'a [u8],
    pub primitive: u32,
    pub vertex_count: usize,
    /// Bound to unit 0 and exposed as `u_texture`.
    pub texture: Option<Texture<G>>,
}

impl<G: GlBackend> Renderer<G> {
    /// bind, use, upload, set uniforms, draw, unbind.
    ///
    /// `uniforms` runs with the pass shader in use, after `u_time` is set.
    pub(super) fn run_pass(
        &self,
        ctx: &mut GlContext<G>,
        pass: Pass<'_, G>,
        mode: DrawMode,
        uniforms: impl FnOnce(&mut GlContext<G>, &Shader<G>),
    ) -> Result<()> {
        let shader = pass.shader;
        bind_buffers(ctx, pass.vao, pass.vbo)?;
        shader.use_program(ctx);

        if !pass.vertices.is_empty() {
            ctx.buffer_sub_data(glow::ARRAY_BUFFER, 0, pass.vertices);
        }

        shader.set_float(ctx, "u_time", self.elapsed);
        if pass.custom {
            shader.set_mat4(ctx, "u_projection", &self.projection);
        }
        uniforms(ctx, &shader);

        if let Some(texture) = pass.texture {
            ctx.active_texture(glow::TEXTURE0);
            texture.bind(ctx);
            shader.set_int(ctx, "u_texture", 0);
        }

        match mode {
            DrawMode::Single => ctx.draw_arrays(pass.primitive, 0, pass.vertex_count),
            DrawMode::Instanced { instances } => {
                ctx.draw_arrays_instanced(pass.primitive, 0, pass.vertex_count, instances);
            }
        }
        trace!("{} x{} via '{}' ({mode:?})", pass.primitive, pass.vertex_count, pass.vao);

        ctx.unbind_vao();
        ctx.unbind_vbo();
        shader.unbind(ctx);
        if let Some(texture) = pass.texture {
            texture.unbind(ctx);
        }
        Ok(())
    }

    /// The object's shader when it was written for `default`'s kind,
    /// otherwise `default`. The flag is set for the object's shader.
    fn select(custom: Option<Shader<G>>, default: Shader<G>) -> (Shader<G>, bool) {
        match custom {
            Some(shader) if shader.kind == default.kind => (shader, true),
            Some(shader) => {
                debug!(
                    "{:?} shader ignored for a {:?} draw",
                    shader.kind, default.kind
                );
                (default, false)
            }
            None => (default, false),
        }
    }

    /// Draw a single point.
    pub fn render_pixel(&self, ctx: &mut GlContext<G>, pixel: &Pixel<G>) -> Result<()> {
        let (shader, custom) = Self::select(pixel.shader, self.shaders.pixel);
        let color = pixel.color;
        self.run_pass(
            ctx,
            Pass {
                vao: names::POINT_VAO,
                vbo: names::POINT_VBO,
                shader,
                custom,
                vertices: bytemuck::cast_slice(&pixel.position.to_array()),
                primitive: glow::POINTS,
                vertex_count: 1,
                texture: None,
            },
            DrawMode::Single,
            |ctx, shader| shader.set_color(ctx, "u_color", color),
        )
    }

    /// [`render_pixel`](Self::render_pixel) with the default shader.
    pub fn render_pixel_at(&self, ctx: &mut GlContext<G>, position: Vec2, color: Color) -> Result<()> {
        self.render_pixel(ctx, &Pixel::new(position, color))
    }

    /// Draw a single line segment.
    pub fn render_line(&self, ctx: &mut GlContext<G>, line: &Line<G>) -> Result<()> {
        let (shader, custom) = Self::select(line.shader, self.shaders.line);
        let color = line.color;
        let endpoints = [line.a.x, line.a.y, line.b.x, line.b.y];
        self.run_pass(
            ctx,
            Pass {
                vao: names::LINE_VAO,
                vbo: names::LINE_VBO,
                shader,
                custom,
                vertices: bytemuck::cast_slice(&endpoints),
                primitive: glow::LINES,
                vertex_count: 2,
                texture: None,
            },
            DrawMode::Single,
            |ctx, shader| shader.set_color(ctx, "u_color", color),
        )
    }

    /// [`render_line`](Self::render_line) with the default shader.
    pub fn render_line_between(
        &self,
        ctx: &mut GlContext<G>,
        a: Vec2,
        b: Vec2,
        color: Color,
    ) -> Result<()> {
        self.render_line(ctx, &Line::new(a, b, color))
    }

    /// Draw a textured quad.
    ///
    /// The sprite's blend mode (or the default one) is selected for the draw
    /// and the default mode is selected again afterwards.
    pub fn render_sprite(&self, ctx: &mut GlContext<G>, sprite: &Sprite<G>) -> Result<()> {
        let (shader, custom) = Self::select(sprite.shader, self.shaders.sprite);
        self.sprite_pass(ctx, sprite, names::SPRITE_VAO, shader, custom, DrawMode::Single)
    }

    /// Shared by [`render_sprite`](Self::render_sprite) and the sprite batch.
    /// The model matrix uniform is only set for single draws; batches carry
    /// one per instance.
    pub(super) fn sprite_pass(
        &self,
        ctx: &mut GlContext<G>,
        sprite: &Sprite<G>,
        vao: &'static str,
        shader: Shader<G>,
        custom: bool,
        mode: DrawMode,
    ) -> Result<()> {
        let uvs = sprite.uv.normalized(sprite.texture.size());
        let model = matches!(mode, DrawMode::Single).then(|| {
            sprite_model(
                sprite.position,
                sprite.size,
                sprite.rotation,
                sprite.rotation_origin,
            )
        });
        let (color, size) = (sprite.color, sprite.size);

        ctx.blending(true, sprite.blend.unwrap_or_default());
        let drawn = self.run_pass(
            ctx,
            Pass {
                vao,
                vbo: names::SPRITE_UV_VBO,
                shader,
                custom,
                vertices: bytemuck::cast_slice(&uvs),
                primitive: glow::TRIANGLES,
                vertex_count: 6,
                texture: Some(sprite.texture),
            },
            mode,
            |ctx, shader| {
                if let Some(model) = model {
                    shader.set_mat4(ctx, "u_model", &model);
                }
                shader.set_color(ctx, "u_color", color);
                shader.set_vec2(ctx, "u_sprite_size", size);
            },
        );
        ctx.blending(true, BlendMode::Default);
        drawn
    }

    /// Draw a string with the loaded glyph cache, one quad per character.
    ///
    /// Returns the pen position after the last character.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoFont`] without a glyph cache and
    /// [`RenderError::MissingGlyph`] for an uncached character. Nothing is
    /// drawn in either case.
    pub fn render_text(&self, ctx: &mut GlContext<G>, text: &Text<G>) -> Result<f32> {
        let glyphs = self.glyphs.as_ref().ok_or(RenderError::NoFont)?;
        let layout = glyphs.layout(&text.message, text.position, text.scale)?;
        let (shader, custom) = Self::select(text.shader, self.shaders.text);

        bind_buffers(ctx, names::TEXT_VAO, names::TEXT_VBO)?;
        ctx.face_culling(true);
        shader.use_program(ctx);
        shader.set_color(ctx, "u_color", text.color);
        shader.set_float(ctx, "u_time", self.elapsed);
        if custom {
            shader.set_mat4(ctx, "u_projection", &self.projection);
        }
        ctx.active_texture(glow::TEXTURE0);
        shader.set_int(ctx, "u_texture", 0);

        for quad in &layout.quads {
            ctx.bind_texture(Some(quad.texture));
            ctx.buffer_sub_data(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice(&quad.vertices));
            ctx.draw_arrays(glow::TRIANGLES, 0, 6);
        }
        trace!("drew {} glyphs of {:?}", layout.quads.len(), text.message);

        ctx.unbind_vao();
        ctx.unbind_vbo();
        shader.unbind(ctx);
        ctx.bind_texture(None);
        ctx.face_culling(false);
        Ok(layout.cursor)
    }

    /// [`render_text`](Self::render_text) with the default shader.
    pub fn render_text_at(
        &self,
        ctx: &mut GlContext<G>,
        message: &str,
        position: Vec2,
        scale: f32,
        color: Color,
    ) -> Result<f32> {
        self.render_text(ctx, &Text::new(message, position, scale, color))
    }
}

/// Bind a vertex array and its buffer, or neither.
fn bind_buffers<G: GlBackend>(ctx: &mut GlContext<G>, vao: &str, vbo: &str) -> Result<()> {
    ctx.bind_vao(vao)?;
    if let Err(err) = ctx.bind_vbo(vbo) {
        ctx.unbind_vao();
        return Err(err);
    }
    Ok(())
}
