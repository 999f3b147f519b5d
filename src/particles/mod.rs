//! Particle generators.
//!
//! A [`ParticleGenerator`] pairs a [`ParticlePool`] with the GL objects
//! needed to draw it. Particles can be drawn two ways:
//!
//! - [`draw`](ParticleGenerator::draw): raw quads through a particle shader
//!   with additive "shiny" blending.
//! - [`render`](ParticleGenerator::render): one sprite per particle through
//!   the [`Renderer`], keeping the texture's normal blending.

mod pool;
mod rng;

use glam::Vec2;
use log::debug;

pub use pool::{Emission, Particle, ParticlePool};
pub use rng::ParticleRng;

use crate::{
    backend::GlBackend,
    config::RenderConfig,
    context::GlContext,
    error::Result,
    primitives::Sprite,
    renderer::Renderer,
    state::BlendMode,
    types::{Color, QuadVertex, Shader, Texture, UNIT_QUAD},
};

/// A named particle emitter with its own vertex array.
pub struct ParticleGenerator<G: GlBackend> {
    name: String,
    vao: String,
    vbo: String,
    shader: Shader<G>,
    texture: Texture<G>,
    pool: ParticlePool,
}

impl<G: GlBackend> ParticleGenerator<G> {
    /// Create the generator's quad buffers and a pool of `amount` particles.
    ///
    /// The vertex array and buffer are registered as `{name}_particle_vao`
    /// and `{name}_particle_vbo`, so generator names must be unique per
    /// context.
    pub fn new(
        ctx: &mut GlContext<G>,
        name: &str,
        shader: Shader<G>,
        texture: Texture<G>,
        amount: usize,
        config: &RenderConfig,
    ) -> Result<Self> {
        let generator = Self {
            name: name.to_owned(),
            vao: format!("{name}_particle_vao"),
            vbo: format!("{name}_particle_vbo"),
            shader,
            texture,
            pool: ParticlePool::new(amount, config),
        };

        ctx.create_vao(&generator.vao)?;
        if let Err(err) = ctx.create_vbo(&generator.vbo) {
            ctx.delete_vao(&generator.vao)?;
            return Err(err);
        }
        ctx.bind_vao(&generator.vao)?;
        ctx.bind_vbo(&generator.vbo)?;
        ctx.buffer_data(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&UNIT_QUAD),
            glow::STATIC_DRAW,
        );
        ctx.enable_vertex_attrib_array(0);
        ctx.vertex_attrib_pointer(0, 4, std::mem::size_of::<QuadVertex>(), 0);
        ctx.unbind_vao();
        ctx.unbind_vbo();

        debug!("particle generator '{name}' with {amount} particles");
        Ok(generator)
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn and advance particles. See [`ParticlePool::update`].
    pub fn update(&mut self, dt: f32, emission: &Emission) {
        self.pool.update(dt, emission);
    }

    #[allow(missing_docs)]
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// For toggling dispersion and rotation, or respawning by hand.
    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut self.pool
    }

    /// Draw every live particle as a raw quad with the generator's shader.
    ///
    /// The shader needs `u_projection` set beforehand, either by
    /// [`Renderer::set_projection`] for the built-in particle program or by
    /// [`Renderer::upload_projection`] for a custom one.
    pub fn draw(&self, ctx: &mut GlContext<G>) -> Result<()> {
        ctx.bind_vao(&self.vao)?;
        ctx.blending(true, BlendMode::Particle);
        self.shader.use_program(ctx);
        self.shader.set_int(ctx, "u_texture", 0);
        ctx.active_texture(glow::TEXTURE0);
        self.texture.bind(ctx);

        for particle in self.pool.live() {
            self.shader.set_vec2(ctx, "u_offset", particle.position);
            self.shader.set_vec4(ctx, "u_color", particle.color);
            self.shader.set_float(ctx, "u_size", particle.size);
            ctx.draw_arrays(glow::TRIANGLES, 0, 6);
        }

        ctx.unbind_vao();
        self.texture.unbind(ctx);
        self.shader.unbind(ctx);
        ctx.blending(true, BlendMode::Default);
        Ok(())
    }

    /// Draw every live particle as a sprite, rotated around its center.
    pub fn render(&self, ctx: &mut GlContext<G>, renderer: &Renderer<G>) -> Result<()> {
        for particle in self.pool.live() {
            let size = Vec2::splat(particle.size);
            let sprite = Sprite::new(self.texture, particle.position)
                .with_size(size)
                .with_color(Color::from(particle.color))
                .with_rotation(particle.rotation.to_radians(), size / 2.0);
            renderer.render_sprite(ctx, &sprite)?;
        }
        Ok(())
    }

    /// Release the generator's vertex array and buffer.
    pub fn destroy(&mut self, ctx: &mut GlContext<G>) -> Result<()> {
        ctx.delete_vao(&self.vao)?;
        ctx.delete_vbo(&self.vbo)?;
        debug!("particle generator '{}' destroyed", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{GlCall, RecordingGl};
    use crate::error::{RenderError, ResourceKind};
    use crate::renderer::tests::{renderer_with, texture};
    use crate::types::ShaderKind;
    use pretty_assertions::assert_eq;

    fn generator(ctx: &mut GlContext<RecordingGl>, amount: usize) -> ParticleGenerator<RecordingGl> {
        let shader = Shader::new(700, ShaderKind::Particle);
        ParticleGenerator::new(ctx, "sparks", shader, texture(), amount, &RenderConfig::default())
            .unwrap()
    }

    fn spawn(generator: &mut ParticleGenerator<RecordingGl>, count: u32) {
        generator.update(
            0.01,
            &Emission {
                count,
                decay: 1.0,
                ..Emission::default()
            },
        );
    }

    #[test]
    fn new_uploads_the_quad_under_derived_names() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        let generator = generator(&mut ctx, 4);

        let vbo = ctx.vbo("sparks_particle_vbo").unwrap();
        assert!(ctx.vao("sparks_particle_vao").is_some());
        assert_eq!(ctx.backend().buffer_contents(vbo).len(), 6 * 16);
        assert_eq!(generator.pool().capacity(), 4);
        assert_eq!(ctx.bound_vao(), None);

        let err = ParticleGenerator::new(
            &mut ctx,
            "sparks",
            Shader::new(701, ShaderKind::Particle),
            texture(),
            1,
            &RenderConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            RenderError::DuplicateResource {
                kind: ResourceKind::Vao,
                ..
            }
        ));
    }

    #[test]
    fn draw_emits_one_quad_per_live_particle() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        let mut generator = generator(&mut ctx, 5);
        spawn(&mut generator, 3);
        ctx.backend_mut().clear_calls();
        let lookups = ctx.backend().uniform_lookups();

        generator.draw(&mut ctx).unwrap();

        let gl = ctx.backend();
        assert_eq!(
            gl.count(|call| *call
                == GlCall::DrawArrays {
                    mode: glow::TRIANGLES,
                    first: 0,
                    count: 6,
                }),
            3
        );
        assert_eq!(
            gl.count(|call| matches!(call, GlCall::Uniform { name, .. } if name == "u_offset")),
            3
        );
        assert_eq!(
            gl.count(|call| *call
                == GlCall::BlendFunc {
                    src: glow::SRC_ALPHA,
                    dst: glow::ONE,
                }),
            1
        );
        // u_texture plus three per-particle uniforms, each resolved once
        assert_eq!(gl.uniform_lookups() - lookups, 4);
        assert_eq!(ctx.blend_mode(), Some(BlendMode::Default));
        assert_eq!(ctx.bound_program(), None);
        assert_eq!(ctx.bound_vao(), None);
    }

    #[test]
    fn draw_after_destroy_leaves_state_untouched() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        let mut generator = generator(&mut ctx, 2);
        spawn(&mut generator, 2);
        generator.destroy(&mut ctx).unwrap();
        ctx.backend_mut().clear_calls();

        let err = generator.draw(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnknownResource {
                kind: ResourceKind::Vao,
                ..
            }
        ));
        assert_eq!(ctx.blend_mode(), Some(BlendMode::Default));
        assert_eq!(ctx.bound_program(), None);
        assert!(ctx.backend().calls().is_empty());
    }

    #[test]
    fn name_conflict_on_the_buffer_rolls_back_the_vertex_array() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        ctx.create_vbo("x_particle_vbo").unwrap();
        let vaos = ctx.total_vao();
        let create = |ctx: &mut GlContext<RecordingGl>| {
            ParticleGenerator::new(
                ctx,
                "x",
                Shader::new(700, ShaderKind::Particle),
                texture(),
                1,
                &RenderConfig::default(),
            )
        };

        let err = create(&mut ctx).err().unwrap();
        assert!(matches!(
            err,
            RenderError::DuplicateResource {
                kind: ResourceKind::Vbo,
                ..
            }
        ));
        assert_eq!(ctx.total_vao(), vaos);
        assert!(ctx.vao("x_particle_vao").is_none());

        ctx.delete_vbo("x_particle_vbo").unwrap();
        assert!(create(&mut ctx).is_ok());
    }

    #[test]
    fn render_goes_through_the_sprite_path() {
        let (mut ctx, renderer) = renderer_with(&RenderConfig::default());
        let mut generator = generator(&mut ctx, 5);
        spawn(&mut generator, 2);
        ctx.backend_mut().clear_calls();

        generator.render(&mut ctx, &renderer).unwrap();

        let sprite_program = renderer.shaders().sprite.program;
        assert_eq!(
            ctx.backend()
                .count(|call| *call == GlCall::UseProgram(Some(sprite_program))),
            2
        );
    }

    #[test]
    fn dead_particles_are_not_drawn() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        let mut generator = generator(&mut ctx, 2);
        spawn(&mut generator, 2);
        generator.update(
            2.0,
            &Emission {
                decay: 1.0,
                ..Emission::default()
            },
        );
        ctx.backend_mut().clear_calls();

        generator.draw(&mut ctx).unwrap();
        assert_eq!(
            ctx.backend()
                .count(|call| matches!(call, GlCall::DrawArrays { .. })),
            0
        );
    }

    #[test]
    fn destroy_releases_buffers() {
        let (mut ctx, _renderer) = renderer_with(&RenderConfig::default());
        let mut generator = generator(&mut ctx, 1);
        let before = ctx.total_vao();
        generator.destroy(&mut ctx).unwrap();
        assert_eq!(ctx.total_vao(), before - 1);
        assert!(ctx.vbo("sparks_particle_vbo").is_none());
    }
}
