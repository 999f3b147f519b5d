//! Renderer configuration.
//!
//! [`RenderConfig::default`] reproduces the engine's stock setup: 48 px
//! glyphs for ASCII, 300 batched sprites, 100 batched pixels and lines,
//! 32-unit particles decaying at a rate of 10 per second.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a batch does with instances beyond its fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverflowPolicy {
    /// Draw the first `capacity` instances and log a warning.
    #[default]
    Truncate,
    /// Draw nothing and return [`RenderError::BatchOverflow`](crate::RenderError::BatchOverflow).
    Reject,
}

/// Tunables shared by the context, glyph cache, renderer and particles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Glyph rasterization height in pixels.
    pub font_pixel_size: f32,
    /// Character codes `0..glyph_range_end` are cached. At most 128.
    pub glyph_range_end: u8,
    /// Instance slots in the sprite batch.
    pub sprite_batch_capacity: usize,
    /// Instance slots in the pixel batch.
    pub pixel_batch_capacity: usize,
    /// Instance slots in the line batch.
    pub line_batch_capacity: usize,
    /// Over-capacity handling for all batches.
    pub batch_overflow: OverflowPolicy,
    /// Clear instance slots that the current call did not write. When off,
    /// slots keep whatever the previous frame left there.
    pub zero_unused_instances: bool,
    /// Particle size used when an emission requests size 0.
    pub default_particle_size: f32,
    /// Particle life lost per second when an emission requests decay 0.
    pub default_particle_decay: f32,
    /// Poll and log the GL error queue after every state-changing call.
    pub check_errors: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_pixel_size: 48.0,
            glyph_range_end: 128,
            sprite_batch_capacity: 300,
            pixel_batch_capacity: 100,
            line_batch_capacity: 100,
            batch_overflow: OverflowPolicy::Truncate,
            zero_unused_instances: false,
            default_particle_size: 32.0,
            default_particle_decay: 10.0,
            check_errors: false,
        }
    }
}

impl RenderConfig {
    /// Enable per-call GL error polling.
    #[must_use]
    pub fn with_error_checks(mut self, enabled: bool) -> Self {
        self.check_errors = enabled;
        self
    }

    /// Set the overflow policy for every batch.
    #[must_use]
    pub fn with_batch_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.batch_overflow = policy;
        self
    }

    /// Set all three batch capacities.
    #[must_use]
    pub fn with_batch_capacities(mut self, sprites: usize, pixels: usize, lines: usize) -> Self {
        self.sprite_batch_capacity = sprites;
        self.pixel_batch_capacity = pixels;
        self.line_batch_capacity = lines;
        self
    }
}
