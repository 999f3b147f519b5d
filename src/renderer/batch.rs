//! Instanced rendering of pixels, lines and sprites.
//!
//! Each batch owns a fixed-capacity CPU array mirroring its instance
//! buffer. Every call writes the supplied entries to the front of the
//! array, uploads the whole array and draws `capacity` instances, so the
//! GPU-side size never changes after setup.

use glam::Vec2;
use log::warn;

use bytemuck::Pod;

use super::{names, DrawMode, Pass, Renderer};
use crate::{
    backend::GlBackend,
    config::OverflowPolicy,
    context::GlContext,
    error::{RenderError, Result},
    primitives::{Line, Pixel, Sprite},
    types::{LineInstance, PixelInstance, SpriteInstance},
};

/// Fixed-capacity instance array.
#[derive(Debug, Clone)]
pub struct InstanceBatch<T: Pod> {
    kind: &'static str,
    entries: Vec<T>,
    policy: OverflowPolicy,
    zero_unused: bool,
}

impl<T: Pod> InstanceBatch<T> {
    /// A zero-filled batch of `capacity` entries. `kind` names the batch in
    /// logs and errors.
    pub fn new(kind: &'static str, capacity: usize, policy: OverflowPolicy, zero_unused: bool) -> Self {
        Self {
            kind,
            entries: vec![T::zeroed(); capacity],
            policy,
            zero_unused,
        }
    }

    /// Number of instance slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Bytes uploaded per call.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<T>() * self.entries.len()
    }

    /// Write `items` to the front of the array and return how many were
    /// written.
    ///
    /// Slots past the written ones keep their previous contents unless the
    /// batch zeroes unused slots.
    ///
    /// # Errors
    ///
    /// [`RenderError::BatchOverflow`] when there are more items than slots
    /// and the policy is [`OverflowPolicy::Reject`]. The array is left
    /// untouched in that case.
    pub fn fill(&mut self, items: impl ExactSizeIterator<Item = T>) -> Result<usize> {
        let requested = items.len();
        let capacity = self.capacity();
        if requested > capacity {
            match self.policy {
                OverflowPolicy::Reject => {
                    return Err(RenderError::BatchOverflow {
                        kind: self.kind,
                        requested,
                        capacity,
                    });
                }
                OverflowPolicy::Truncate => {
                    warn!(
                        "{} batch holds {capacity} instances, dropping {}",
                        self.kind,
                        requested - capacity
                    );
                }
            }
        }

        let mut written = 0;
        for (slot, item) in self.entries.iter_mut().zip(items) {
            *slot = item;
            written += 1;
        }
        if self.zero_unused {
            self.entries[written..].fill(T::zeroed());
        }
        Ok(written)
    }

    /// Current contents, including stale slots.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// The whole array as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }
}

/// Upload the whole batch into the instance buffer `vbo`.
fn upload<G: GlBackend, T: Pod>(ctx: &mut GlContext<G>, vbo: &str, batch: &InstanceBatch<T>) -> Result<()> {
    ctx.bind_vbo(vbo)?;
    ctx.buffer_sub_data(glow::ARRAY_BUFFER, 0, batch.as_bytes());
    ctx.unbind_vbo();
    Ok(())
}

impl<G: GlBackend> Renderer<G> {
    /// Draw `pixel` once per entry of `offsets`, each copy moved by its
    /// offset. The batch shader is always used.
    pub fn render_pixel_batch(
        &mut self,
        ctx: &mut GlContext<G>,
        pixel: &Pixel<G>,
        offsets: &[Vec2],
    ) -> Result<()> {
        self.pixel_batch
            .fill(offsets.iter().copied().map(PixelInstance::from))?;
        upload(ctx, names::PIXEL_BATCH_INSTANCES, &self.pixel_batch)?;

        let shader = self.shaders.pixel_batch;
        let color = pixel.color;
        self.run_pass(
            ctx,
            Pass {
                vao: names::PIXEL_BATCH_VAO,
                vbo: names::PIXEL_BATCH_VBO,
                shader,
                custom: false,
                vertices: bytemuck::cast_slice(&pixel.position.to_array()),
                primitive: glow::POINTS,
                vertex_count: 1,
                texture: None,
            },
            DrawMode::Instanced {
                instances: self.pixel_batch.capacity(),
            },
            |ctx, shader| shader.set_color(ctx, "u_color", color),
        )
    }

    /// Draw one segment per entry of `segments` in `line`'s color. The
    /// endpoints of `line` itself are not used.
    pub fn render_line_batch(
        &mut self,
        ctx: &mut GlContext<G>,
        line: &Line<G>,
        segments: &[(Vec2, Vec2)],
    ) -> Result<()> {
        self.line_batch
            .fill(segments.iter().copied().map(LineInstance::from))?;
        upload(ctx, names::LINE_BATCH_INSTANCES, &self.line_batch)?;

        let shader = self.shaders.line_batch;
        let color = line.color;
        self.run_pass(
            ctx,
            Pass {
                vao: names::LINE_BATCH_VAO,
                vbo: names::LINE_BATCH_VBO,
                shader,
                custom: false,
                vertices: &[],
                primitive: glow::LINES,
                vertex_count: 2,
                texture: None,
            },
            DrawMode::Instanced {
                instances: self.line_batch.capacity(),
            },
            |ctx, shader| shader.set_color(ctx, "u_color", color),
        )
    }

    /// Draw `sprite` at every entry of `positions`, sharing its size,
    /// rotation, color, texture region and blend mode.
    pub fn render_sprite_batch(
        &mut self,
        ctx: &mut GlContext<G>,
        sprite: &Sprite<G>,
        positions: &[Vec2],
    ) -> Result<()> {
        let models = positions.iter().map(|&position| {
            SpriteInstance::from(super::transform::sprite_model(
                position,
                sprite.size,
                sprite.rotation,
                sprite.rotation_origin,
            ))
        });
        self.sprite_batch.fill(models)?;
        upload(ctx, names::SPRITE_BATCH_INSTANCES, &self.sprite_batch)?;

        let instances = self.sprite_batch.capacity();
        self.sprite_pass(
            ctx,
            sprite,
            names::SPRITE_BATCH_VAO,
            self.shaders.sprite_batch,
            false,
            DrawMode::Instanced { instances },
        )
    }

    /// The pixel batch's instance array.
    pub fn pixel_batch(&self) -> &InstanceBatch<PixelInstance> {
        &self.pixel_batch
    }

    /// The line batch's instance array.
    pub fn line_batch(&self) -> &InstanceBatch<LineInstance> {
        &self.line_batch
    }

    /// The sprite batch's instance array.
    pub fn sprite_batch(&self) -> &InstanceBatch<SpriteInstance> {
        &self.sprite_batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{GlCall, RecordingGl};
    use crate::config::RenderConfig;
    use crate::renderer::tests::{renderer_with, texture};
    use crate::renderer::transform::sprite_model;
    use crate::types::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn fill_writes_front_and_keeps_stale_tail() {
        let mut batch: InstanceBatch<PixelInstance> =
            InstanceBatch::new("pixel", 4, OverflowPolicy::Truncate, false);
        batch
            .fill([Vec2::ONE, Vec2::ONE, Vec2::ONE].into_iter().map(PixelInstance::from))
            .unwrap();
        let written = batch
            .fill([Vec2::new(2.0, 2.0)].into_iter().map(PixelInstance::from))
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(batch.entries()[0].offset, [2.0, 2.0]);
        assert_eq!(batch.entries()[1].offset, [1.0, 1.0]);
        assert_eq!(batch.entries()[3].offset, [0.0, 0.0]);
    }

    #[test]
    fn fill_can_zero_unused_slots() {
        let mut batch: InstanceBatch<PixelInstance> =
            InstanceBatch::new("pixel", 3, OverflowPolicy::Truncate, true);
        batch
            .fill([Vec2::ONE; 3].into_iter().map(PixelInstance::from))
            .unwrap();
        batch
            .fill([Vec2::ONE].into_iter().map(PixelInstance::from))
            .unwrap();
        assert_eq!(batch.entries()[1].offset, [0.0, 0.0]);
        assert_eq!(batch.entries()[2].offset, [0.0, 0.0]);
    }

    #[test]
    fn overflow_truncates_or_rejects() {
        let mut truncating: InstanceBatch<PixelInstance> =
            InstanceBatch::new("pixel", 2, OverflowPolicy::Truncate, false);
        let written = truncating
            .fill([Vec2::ONE; 5].into_iter().map(PixelInstance::from))
            .unwrap();
        assert_eq!(written, 2);

        let mut rejecting: InstanceBatch<PixelInstance> =
            InstanceBatch::new("pixel", 2, OverflowPolicy::Reject, false);
        let err = rejecting
            .fill([Vec2::ONE; 5].into_iter().map(PixelInstance::from))
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::BatchOverflow {
                kind: "pixel",
                requested: 5,
                capacity: 2
            }
        ));
        assert!(rejecting.entries().iter().all(|e| e.offset == [0.0, 0.0]));
    }

    #[test]
    fn sprite_batch_uploads_composed_matrices() {
        let config = RenderConfig::default().with_batch_capacities(8, 4, 4);
        let (mut ctx, mut renderer) = renderer_with(&config);
        let sprite = Sprite::new(texture(), Vec2::ZERO)
            .with_size(Vec2::new(16.0, 16.0))
            .with_rotation(0.5, Vec2::new(8.0, 8.0));
        let positions = [Vec2::new(0.0, 0.0), Vec2::new(32.0, 0.0), Vec2::new(64.0, 8.0)];
        ctx.backend_mut().clear_calls();

        renderer
            .render_sprite_batch(&mut ctx, &sprite, &positions)
            .unwrap();

        let handle = ctx.vbo(names::SPRITE_BATCH_INSTANCES).unwrap();
        let uploaded: Vec<SpriteInstance> = ctx.backend().buffer_as(handle);
        assert_eq!(uploaded.len(), 8);
        for (entry, position) in uploaded.iter().zip(positions) {
            let expected = sprite_model(position, sprite.size, 0.5, Vec2::new(8.0, 8.0));
            assert_eq!(*entry, SpriteInstance::from(expected));
        }
        assert!(uploaded[3..].iter().all(|e| *e == SpriteInstance::from(glam::Mat4::ZERO)));

        let gl = ctx.backend();
        assert_eq!(
            gl.count(|call| *call
                == GlCall::BufferSubData {
                    target: glow::ARRAY_BUFFER,
                    offset: 0,
                    len: 8 * 64,
                }),
            1
        );
        assert_eq!(
            gl.count(|call| *call
                == GlCall::DrawArraysInstanced {
                    mode: glow::TRIANGLES,
                    first: 0,
                    count: 6,
                    instances: 8,
                }),
            1
        );
        assert_eq!(ctx.blend_mode(), Some(crate::BlendMode::Default));
    }

    #[test]
    fn sprite_batch_leaves_stale_instances_by_default() {
        let config = RenderConfig::default().with_batch_capacities(4, 4, 4);
        let (mut ctx, mut renderer) = renderer_with(&config);
        let sprite = Sprite::new(texture(), Vec2::ZERO);

        renderer
            .render_sprite_batch(&mut ctx, &sprite, &[Vec2::ONE; 4])
            .unwrap();
        renderer
            .render_sprite_batch(&mut ctx, &sprite, &[Vec2::ZERO])
            .unwrap();

        let stale = SpriteInstance::from(sprite_model(Vec2::ONE, sprite.size, 0.0, Vec2::ZERO));
        assert_eq!(renderer.sprite_batch().entries()[3], stale);
    }

    #[test]
    fn pixel_and_line_batches_draw_full_capacity() {
        let config = RenderConfig::default().with_batch_capacities(4, 3, 5);
        let (mut ctx, mut renderer) = renderer_with(&config);
        ctx.backend_mut().clear_calls();

        let pixel = Pixel::new(Vec2::new(1.0, 1.0), Color::WHITE);
        renderer
            .render_pixel_batch(&mut ctx, &pixel, &[Vec2::ZERO, Vec2::ONE])
            .unwrap();
        let line = Line::new(Vec2::ZERO, Vec2::ZERO, Color::BLACK);
        renderer
            .render_line_batch(&mut ctx, &line, &[(Vec2::ZERO, Vec2::new(10.0, 0.0))])
            .unwrap();

        let gl = ctx.backend();
        assert_eq!(
            gl.count(|call| *call
                == GlCall::DrawArraysInstanced {
                    mode: glow::POINTS,
                    first: 0,
                    count: 1,
                    instances: 3,
                }),
            1
        );
        assert_eq!(
            gl.count(|call| *call
                == GlCall::DrawArraysInstanced {
                    mode: glow::LINES,
                    first: 0,
                    count: 2,
                    instances: 5,
                }),
            1
        );

        let lines = ctx.vbo(names::LINE_BATCH_INSTANCES).unwrap();
        let uploaded: Vec<LineInstance> = ctx.backend().buffer_as(lines);
        assert_eq!(uploaded[0].endpoints, [0.0, 0.0, 10.0, 0.0]);
        assert_eq!(uploaded.len(), 5);
    }

    #[test]
    fn rejected_batches_draw_nothing() {
        let config = RenderConfig::default()
            .with_batch_capacities(4, 1, 4)
            .with_batch_overflow(OverflowPolicy::Reject);
        let (mut ctx, mut renderer) = renderer_with(&config);
        ctx.backend_mut().clear_calls();

        let pixel: Pixel<RecordingGl> = Pixel::new(Vec2::ZERO, Color::WHITE);
        let err = renderer
            .render_pixel_batch(&mut ctx, &pixel, &[Vec2::ZERO, Vec2::ONE])
            .unwrap_err();
        assert!(matches!(err, RenderError::BatchOverflow { kind: "pixel", .. }));
        assert!(ctx.backend().calls().is_empty());
    }
}
