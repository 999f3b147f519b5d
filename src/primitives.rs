//! Drawable objects handed to the [`Renderer`](crate::Renderer).
//!
//! Each primitive carries an optional custom shader. It is only used when
//! its [`ShaderKind`](crate::ShaderKind) matches the primitive; otherwise the
//! renderer's default program draws it.

use glam::Vec2;

use crate::{
    backend::GlBackend,
    state::BlendMode,
    types::{Color, Shader, Texture},
};

/// A single point.
pub struct Pixel<G: GlBackend> {
    #[allow(missing_docs)]
    pub position: Vec2,
    #[allow(missing_docs)]
    pub color: Color,
    /// Custom program, used when its kind is [`ShaderKind::Pixel`](crate::ShaderKind::Pixel).
    pub shader: Option<Shader<G>>,
}

impl<G: GlBackend> Pixel<G> {
    #[allow(missing_docs)]
    pub fn new(position: Vec2, color: Color) -> Self {
        Self {
            position,
            color,
            shader: None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_shader(mut self, shader: Shader<G>) -> Self {
        self.shader = Some(shader);
        self
    }
}

/// A line segment from `a` to `b`.
pub struct Line<G: GlBackend> {
    #[allow(missing_docs)]
    pub a: Vec2,
    #[allow(missing_docs)]
    pub b: Vec2,
    #[allow(missing_docs)]
    pub color: Color,
    /// Custom program, used when its kind is [`ShaderKind::Line`](crate::ShaderKind::Line).
    pub shader: Option<Shader<G>>,
}

impl<G: GlBackend> Line<G> {
    #[allow(missing_docs)]
    pub fn new(a: Vec2, b: Vec2, color: Color) -> Self {
        Self {
            a,
            b,
            color,
            shader: None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_shader(mut self, shader: Shader<G>) -> Self {
        self.shader = Some(shader);
        self
    }
}

/// Texture coordinates of a sprite's four corners, in texture pixels.
///
/// Corners are named after the unit quad the renderer draws: the
/// "top" corners sit at quad `y = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    #[allow(missing_docs)]
    pub top_left: Vec2,
    #[allow(missing_docs)]
    pub top_right: Vec2,
    #[allow(missing_docs)]
    pub bottom_left: Vec2,
    #[allow(missing_docs)]
    pub bottom_right: Vec2,
}

impl UvRect {
    /// The whole texture of the given size.
    pub fn full(size: Vec2) -> Self {
        Self::region(Vec2::ZERO, size)
    }

    /// A `size` region starting at `origin`, for sprite sheets.
    pub fn region(origin: Vec2, size: Vec2) -> Self {
        Self {
            top_left: Vec2::new(origin.x, origin.y + size.y),
            top_right: origin + size,
            bottom_left: origin,
            bottom_right: Vec2::new(origin.x + size.x, origin.y),
        }
    }

    /// Normalized coordinates in quad vertex order, two floats per vertex.
    ///
    /// A zero texture dimension leaves the coordinates unnormalized on that
    /// axis.
    pub fn normalized(&self, texture_size: Vec2) -> [f32; 12] {
        let scale = Vec2::new(
            if texture_size.x == 0.0 { 1.0 } else { texture_size.x },
            if texture_size.y == 0.0 { 1.0 } else { texture_size.y },
        );
        let corners = [
            self.top_left,
            self.bottom_right,
            self.bottom_left,
            self.top_left,
            self.top_right,
            self.bottom_right,
        ];
        let mut out = [0.0; 12];
        for (slot, corner) in out.chunks_exact_mut(2).zip(corners) {
            let uv = corner / scale;
            slot[0] = uv.x;
            slot[1] = uv.y;
        }
        out
    }
}

/// A textured, tinted, optionally rotated quad.
pub struct Sprite<G: GlBackend> {
    #[allow(missing_docs)]
    pub texture: Texture<G>,
    /// Position of the quad's origin corner.
    pub position: Vec2,
    /// Size in world units.
    pub size: Vec2,
    /// Rotation around `rotation_origin`, in radians.
    pub rotation: f32,
    /// Pivot relative to `position`.
    pub rotation_origin: Vec2,
    /// Multiplied with the texture color.
    pub color: Color,
    /// Texture region to show.
    pub uv: UvRect,
    /// Blend mode for this sprite; the default mode is restored after it.
    pub blend: Option<BlendMode>,
    /// Custom program, used when its kind is [`ShaderKind::Sprite`](crate::ShaderKind::Sprite).
    pub shader: Option<Shader<G>>,
}

impl<G: GlBackend> Sprite<G> {
    /// A sprite showing all of `texture` at its native size.
    pub fn new(texture: Texture<G>, position: Vec2) -> Self {
        let size = texture.size();
        Self {
            texture,
            position,
            size,
            rotation: 0.0,
            rotation_origin: Vec2::ZERO,
            color: Color::WHITE,
            uv: UvRect::full(size),
            blend: None,
            shader: None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    /// Rotate by `radians` around `origin`.
    #[must_use]
    pub fn with_rotation(mut self, radians: f32, origin: Vec2) -> Self {
        self.rotation = radians;
        self.rotation_origin = origin;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_uv(mut self, uv: UvRect) -> Self {
        self.uv = uv;
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_shader(mut self, shader: Shader<G>) -> Self {
        self.shader = Some(shader);
        self
    }
}

/// A string drawn with the renderer's glyph cache.
pub struct Text<G: GlBackend> {
    #[allow(missing_docs)]
    pub message: String,
    /// Pen start: left edge, top of the `'H'` glyph.
    pub position: Vec2,
    /// Multiplier on the cached glyph size.
    pub scale: f32,
    #[allow(missing_docs)]
    pub color: Color,
    /// Custom program, used when its kind is [`ShaderKind::Text`](crate::ShaderKind::Text).
    pub shader: Option<Shader<G>>,
}

impl<G: GlBackend> Text<G> {
    #[allow(missing_docs)]
    pub fn new(message: impl Into<String>, position: Vec2, scale: f32, color: Color) -> Self {
        Self {
            message: message.into(),
            position,
            scale,
            color,
            shader: None,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn with_shader(mut self, shader: Shader<G>) -> Self {
        self.shader = Some(shader);
        self
    }
}
