//! A 2D rendering core for games on OpenGL 3.1+ via [glow].
//!
//! The crate draws pixels, lines, textured sprites, bitmap-font text and
//! particles, each either one at a time or in fixed-capacity instanced
//! batches. Everything goes through a [`GlContext`], which owns the GL
//! backend, keeps every buffer, vertex array and framebuffer under a string
//! name, and skips redundant binds and state changes.
//!
//! # Layout
//!
//! - [`GlContext`]: named resource registry and GL state tracker.
//! - [`Renderer`]: default shaders, single draws and instanced batches.
//! - [`GlyphCache`]: one texture per ASCII character, rasterized with
//!   [fontdue].
//! - [`ParticleGenerator`]: reusable particle pool plus its quad buffers.
//! - [`AssetStore`]: named shaders and textures decoded with [image].
//!
//! # Example
//!
//! ```no_run
//! # fn demo(gl: std::sync::Arc<glow::Context>) -> sprite_gl::Result<()> {
//! use glam::Vec2;
//! use sprite_gl::{renderer::transform, Color, GlContext, GlowBackend, RenderConfig, Renderer};
//!
//! let config = RenderConfig::default();
//! // SAFETY: `gl` is current on this thread for the lifetime of `ctx`.
//! let mut ctx = GlContext::new(unsafe { GlowBackend::new(gl) }, &config);
//! let mut renderer = Renderer::new(&mut ctx, &config)?;
//! renderer.set_projection(&mut ctx, &transform::screen_projection(800.0, 600.0));
//!
//! ctx.clear_color_buffer();
//! renderer.render_line_between(&mut ctx, Vec2::ZERO, Vec2::new(800.0, 600.0), Color::WHITE)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`RenderConfig`], [`Color`] and
//!   [`ShaderKind`].
//!
//! [glow]: https://docs.rs/glow
//! [fontdue]: https://docs.rs/fontdue
//! [image]: https://docs.rs/image

pub mod assets;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod glyphs;
pub mod logging;
pub mod particles;
pub mod primitives;
pub mod renderer;
pub mod shaders;
pub mod state;
pub mod types;

pub use assets::AssetStore;
pub use backend::{GlBackend, GlowBackend};
pub use config::{OverflowPolicy, RenderConfig};
pub use context::GlContext;
pub use error::{RenderError, ResourceKind, Result};
pub use glyphs::{GlyphCache, GlyphRasterizer};
pub use logging::{init_logging, LoggingConfig};
pub use particles::{Emission, Particle, ParticleGenerator, ParticlePool};
pub use primitives::{Line, Pixel, Sprite, Text, UvRect};
pub use renderer::{DrawMode, InstanceBatch, Renderer};
pub use shaders::RendererShaders;
pub use state::{BlendMode, FramebufferMode};
pub use types::{Color, RenderDetails, Shader, ShaderKind, Texture};
