//! Mirror of the GL state machine as plain data.
//!
//! [`GlContext`](crate::GlContext) updates these records on every bind and
//! setting change and consults them to skip calls that would not change
//! anything.

use std::collections::HashMap;

/// Which side of the framebuffer binding point a bind affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramebufferMode {
    /// `GL_READ_FRAMEBUFFER`.
    Read,
    /// `GL_DRAW_FRAMEBUFFER`.
    Draw,
    /// `GL_FRAMEBUFFER`: both sides at once.
    #[default]
    ReadDraw,
}

impl FramebufferMode {
    /// The GL binding target for this mode.
    pub fn target(self) -> u32 {
        match self {
            FramebufferMode::Read => glow::READ_FRAMEBUFFER,
            FramebufferMode::Draw => glow::DRAW_FRAMEBUFFER,
            FramebufferMode::ReadDraw => glow::FRAMEBUFFER,
        }
    }

    fn reads(self) -> bool {
        matches!(self, FramebufferMode::Read | FramebufferMode::ReadDraw)
    }

    fn draws(self) -> bool {
        matches!(self, FramebufferMode::Draw | FramebufferMode::ReadDraw)
    }
}

/// Blend equations used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Straight alpha: `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    #[default]
    Default,
    /// Glyph coverage blending, same factors as [`BlendMode::Default`].
    Text,
    /// Additive glow for particles: `SRC_ALPHA, ONE`.
    Particle,
    /// Pure additive: `ONE, ONE`.
    Additive,
    /// Color multiply: `DST_COLOR, ZERO`.
    Multiply,
    /// Arbitrary source and destination factors.
    Custom {
        /// Source factor (a `glow::*` blend constant).
        src: u32,
        /// Destination factor.
        dst: u32,
    },
}

impl BlendMode {
    /// The `(src, dst)` factors passed to `glBlendFunc`.
    pub fn factors(self) -> (u32, u32) {
        match self {
            BlendMode::Default | BlendMode::Text => (glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA),
            BlendMode::Particle => (glow::SRC_ALPHA, glow::ONE),
            BlendMode::Additive => (glow::ONE, glow::ONE),
            BlendMode::Multiply => (glow::DST_COLOR, glow::ZERO),
            BlendMode::Custom { src, dst } => (src, dst),
        }
    }
}

/// Currently bound objects, by registry name where one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bindings<P, T> {
    pub vbo: Option<String>,
    pub ebo: Option<String>,
    pub vao: Option<String>,
    pub read_fbo: Option<String>,
    pub draw_fbo: Option<String>,
    pub program: Option<P>,
    /// Texture bound on each unit that has one.
    pub textures: HashMap<u32, T>,
    pub texture_unit: u32,
}

impl<P, T> Bindings<P, T> {
    pub fn new() -> Self {
        Self {
            vbo: None,
            ebo: None,
            vao: None,
            read_fbo: None,
            draw_fbo: None,
            program: None,
            textures: HashMap::new(),
            texture_unit: glow::TEXTURE0,
        }
    }

    /// Whether binding `name` with `mode` would leave the state unchanged.
    pub fn fbo_matches(&self, name: &str, mode: FramebufferMode) -> bool {
        let read_ok = !mode.reads() || self.read_fbo.as_deref() == Some(name);
        let draw_ok = !mode.draws() || self.draw_fbo.as_deref() == Some(name);
        read_ok && draw_ok
    }

    pub fn set_fbo(&mut self, name: Option<&str>, mode: FramebufferMode) {
        if mode.reads() {
            self.read_fbo = name.map(str::to_owned);
        }
        if mode.draws() {
            self.draw_fbo = name.map(str::to_owned);
        }
    }

    /// Drop every reference to the framebuffer `name`.
    pub fn forget_fbo(&mut self, name: &str) {
        if self.read_fbo.as_deref() == Some(name) {
            self.read_fbo = None;
        }
        if self.draw_fbo.as_deref() == Some(name) {
            self.draw_fbo = None;
        }
    }
}

/// Fixed-function settings last sent to GL. `None` means "never set", so
/// the first change is always issued.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Settings {
    pub clear_color: Option<[f32; 4]>,
    pub depth_test: Option<bool>,
    pub depth_mask: Option<bool>,
    pub face_culling: Option<bool>,
    pub blending: Option<bool>,
    pub blend_mode: Option<BlendMode>,
    pub viewport: Option<[i32; 4]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_draw_binds_both_sides() {
        let mut bindings: Bindings<u32, u32> = Bindings::new();
        bindings.set_fbo(Some("scene"), FramebufferMode::ReadDraw);
        assert!(bindings.fbo_matches("scene", FramebufferMode::Read));
        assert!(bindings.fbo_matches("scene", FramebufferMode::Draw));
        assert!(bindings.fbo_matches("scene", FramebufferMode::ReadDraw));
    }

    #[test]
    fn single_side_binds_do_not_match_both() {
        let mut bindings: Bindings<u32, u32> = Bindings::new();
        bindings.set_fbo(Some("scene"), FramebufferMode::Draw);
        assert!(bindings.fbo_matches("scene", FramebufferMode::Draw));
        assert!(!bindings.fbo_matches("scene", FramebufferMode::Read));
        assert!(!bindings.fbo_matches("scene", FramebufferMode::ReadDraw));
    }

    #[test]
    fn forgetting_an_fbo_clears_only_its_sides() {
        let mut bindings: Bindings<u32, u32> = Bindings::new();
        bindings.set_fbo(Some("a"), FramebufferMode::Read);
        bindings.set_fbo(Some("b"), FramebufferMode::Draw);
        bindings.forget_fbo("a");
        assert_eq!(bindings.read_fbo, None);
        assert_eq!(bindings.draw_fbo.as_deref(), Some("b"));
    }

    #[test]
    fn particle_blending_is_additive_over_alpha() {
        assert_eq!(BlendMode::Particle.factors(), (glow::SRC_ALPHA, glow::ONE));
        assert_eq!(
            BlendMode::Custom {
                src: glow::ONE,
                dst: glow::ZERO
            }
            .factors(),
            (glow::ONE, glow::ZERO)
        );
    }
}
