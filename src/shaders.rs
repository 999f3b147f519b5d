//! GLSL shader sources and compilation helpers.
//!
//! All shaders target GLSL 1.40 (OpenGL 3.1) with explicit attribute
//! locations, so vertex layouts set up by the renderer line up without
//! querying the program.
//!
//! Custom shaders handed to the renderer must follow the same uniform
//! names: `u_projection`, `u_model`, `u_color`, `u_time`, `u_sprite_size`,
//! `u_offset`, `u_size` and `u_texture`.

use log::{debug, error};

use crate::{
    backend::GlBackend,
    context::GlContext,
    error::{RenderError, Result},
    types::{Shader, ShaderKind},
};

/// Vertex shader for single points and single lines.
///
/// | Location | Input        | Description       |
/// |----------|--------------|-------------------|
/// | 0        | `a_position` | World position    |
pub const POINT_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec2 a_position;

uniform mat4 u_projection;

void main() {
    gl_Position = u_projection * vec4(a_position, 0.0, 1.0);
}
";

/// Flat color fragment shader used by pixels, lines and their batches.
pub const SOLID_FRAGMENT_SRC: &str = r"#version 140

uniform vec4 u_color;
uniform float u_time;

out vec4 frag_color;

void main() {
    frag_color = u_color;
}
";

/// Vertex shader for textured quads.
///
/// The quad is the unit square; `u_model` places, rotates and scales it.
pub const SPRITE_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;

uniform mat4 u_projection;
uniform mat4 u_model;

out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = u_projection * u_model * vec4(a_position, 0.0, 1.0);
}
";

/// Fragment shader for textured quads: texture tinted by `u_color`.
pub const SPRITE_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform vec4 u_color;
uniform vec2 u_sprite_size;
uniform float u_time;

out vec4 frag_color;

void main() {
    frag_color = u_color * texture(u_texture, v_uv);
}
";

/// Vertex shader for glyph quads. Each vertex packs the position in `xy`
/// and the texture coordinate in `zw`.
pub const TEXT_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec4 a_vertex;

uniform mat4 u_projection;

out vec2 v_uv;

void main() {
    v_uv = a_vertex.zw;
    gl_Position = u_projection * vec4(a_vertex.xy, 0.0, 1.0);
}
";

/// Fragment shader for glyph quads. The glyph texture is single channel
/// coverage, used as alpha.
pub const TEXT_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform vec4 u_color;
uniform float u_time;

out vec4 frag_color;

void main() {
    float coverage = texture(u_texture, v_uv).r;
    frag_color = vec4(u_color.rgb, u_color.a * coverage);
}
";

/// Vertex shader for the pixel batch: the base point plus a per-instance
/// offset.
///
/// | Location | Input        | Divisor |
/// |----------|--------------|---------|
/// | 0        | `a_position` | 0       |
/// | 3        | `a_offset`   | 1       |
pub const PIXEL_BATCH_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec2 a_position;
layout(location = 3) in vec2 a_offset;

uniform mat4 u_projection;

void main() {
    gl_Position = u_projection * vec4(a_position + a_offset, 0.0, 1.0);
}
";

/// Vertex shader for the line batch. Vertex 0 has weight `(1, 0)` and
/// vertex 1 has `(0, 1)`, selecting one endpoint of the instance segment.
///
/// | Location | Input         | Divisor |
/// |----------|---------------|---------|
/// | 0        | `a_weight`    | 0       |
/// | 3        | `a_endpoints` | 1       |
pub const LINE_BATCH_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec2 a_weight;
layout(location = 3) in vec4 a_endpoints;

uniform mat4 u_projection;

void main() {
    vec2 position = a_weight.x * a_endpoints.xy + a_weight.y * a_endpoints.zw;
    gl_Position = u_projection * vec4(position, 0.0, 1.0);
}
";

/// Vertex shader for the sprite batch. The model matrix is a per-instance
/// attribute spanning locations 3 to 6.
pub const SPRITE_BATCH_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 3) in mat4 a_model;

uniform mat4 u_projection;

out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = u_projection * a_model * vec4(a_position, 0.0, 1.0);
}
";

/// Vertex shader for raw particle quads: the unit quad scaled by `u_size`
/// and moved to `u_offset`.
pub const PARTICLE_VERTEX_SRC: &str = r"#version 140
#extension GL_ARB_explicit_attrib_location : require

layout(location = 0) in vec4 a_vertex;

uniform mat4 u_projection;
uniform vec2 u_offset;
uniform float u_size;

out vec2 v_uv;

void main() {
    v_uv = a_vertex.zw;
    gl_Position = u_projection * vec4(a_vertex.xy * u_size + u_offset, 0.0, 1.0);
}
";

/// Fragment shader for raw particle quads.
pub const PARTICLE_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform vec4 u_color;

out vec4 frag_color;

void main() {
    frag_color = texture(u_texture, v_uv) * u_color;
}
";

/// Built-in vertex and fragment sources for `kind`.
pub fn default_sources(kind: ShaderKind) -> (&'static str, &'static str) {
    match kind {
        ShaderKind::Pixel | ShaderKind::Line => (POINT_VERTEX_SRC, SOLID_FRAGMENT_SRC),
        ShaderKind::Sprite => (SPRITE_VERTEX_SRC, SPRITE_FRAGMENT_SRC),
        ShaderKind::Text => (TEXT_VERTEX_SRC, TEXT_FRAGMENT_SRC),
        ShaderKind::PixelBatch => (PIXEL_BATCH_VERTEX_SRC, SOLID_FRAGMENT_SRC),
        ShaderKind::LineBatch => (LINE_BATCH_VERTEX_SRC, SOLID_FRAGMENT_SRC),
        ShaderKind::SpriteBatch => (SPRITE_BATCH_VERTEX_SRC, SPRITE_FRAGMENT_SRC),
        ShaderKind::Particle => (PARTICLE_VERTEX_SRC, PARTICLE_FRAGMENT_SRC),
    }
}

/// Compile and link a program from vertex, fragment and optional geometry
/// sources.
///
/// The shader objects are detached and deleted after linking, so only the
/// program handle needs to be cleaned up by the caller. On failure every
/// object created so far is deleted.
///
/// # Errors
///
/// [`RenderError::ShaderCompile`] or [`RenderError::ProgramLink`] carrying
/// the driver's info log, or [`RenderError::Backend`] if GL refuses to
/// create an object.
pub fn compile_program<G: GlBackend>(
    ctx: &mut GlContext<G>,
    vertex_src: &str,
    fragment_src: &str,
    geometry_src: Option<&str>,
) -> Result<G::Program> {
    let mut stages = vec![
        (glow::VERTEX_SHADER, "vertex", vertex_src),
        (glow::FRAGMENT_SHADER, "fragment", fragment_src),
    ];
    if let Some(source) = geometry_src {
        stages.push((glow::GEOMETRY_SHADER, "geometry", source));
    }

    let mut shaders = Vec::with_capacity(stages.len());
    for (stage, stage_name, source) in stages {
        match compile_shader(ctx, stage, stage_name, source) {
            Ok(shader) => shaders.push(shader),
            Err(err) => {
                for shader in shaders {
                    ctx.delete_shader(shader);
                }
                return Err(err);
            }
        }
    }

    let program = match ctx.create_program() {
        Ok(program) => program,
        Err(err) => {
            for shader in shaders {
                ctx.delete_shader(shader);
            }
            return Err(err);
        }
    };

    for &shader in &shaders {
        ctx.attach_shader(program, shader);
    }
    ctx.link_program(program);

    if !ctx.program_link_status(program) {
        let log = ctx.program_info_log(program);
        error!("program link failed: {log}");
        ctx.delete_program(program);
        for shader in shaders {
            ctx.delete_shader(shader);
        }
        return Err(RenderError::ProgramLink { log });
    }

    for shader in shaders {
        ctx.detach_shader(program, shader);
        ctx.delete_shader(shader);
    }

    Ok(program)
}

/// Compile a single stage from source.
fn compile_shader<G: GlBackend>(
    ctx: &mut GlContext<G>,
    stage: u32,
    stage_name: &'static str,
    source: &str,
) -> Result<G::Shader> {
    let shader = ctx.create_shader(stage)?;
    ctx.shader_source(shader, source);
    ctx.compile_shader(shader);

    if !ctx.shader_compile_status(shader) {
        let log = ctx.shader_info_log(shader);
        error!("{stage_name} shader compile failed: {log}");
        ctx.delete_shader(shader);
        return Err(RenderError::ShaderCompile {
            stage: stage_name,
            log,
        });
    }

    Ok(shader)
}

/// The renderer's fallback program for every [`ShaderKind`].
#[allow(missing_docs)]
pub struct RendererShaders<G: GlBackend> {
    pub pixel: Shader<G>,
    pub line: Shader<G>,
    pub sprite: Shader<G>,
    pub text: Shader<G>,
    pub pixel_batch: Shader<G>,
    pub line_batch: Shader<G>,
    pub sprite_batch: Shader<G>,
    pub particle: Shader<G>,
}

impl<G: GlBackend> RendererShaders<G> {
    /// Compile the built-in program for every kind.
    ///
    /// # Errors
    ///
    /// The first compile or link failure. Programs compiled before it are
    /// deleted.
    pub fn compile_defaults(ctx: &mut GlContext<G>) -> Result<Self> {
        let mut compiled: Vec<Shader<G>> = Vec::with_capacity(8);
        for kind in [
            ShaderKind::Pixel,
            ShaderKind::Line,
            ShaderKind::Sprite,
            ShaderKind::Text,
            ShaderKind::PixelBatch,
            ShaderKind::LineBatch,
            ShaderKind::SpriteBatch,
            ShaderKind::Particle,
        ] {
            let (vertex, fragment) = default_sources(kind);
            match compile_program(ctx, vertex, fragment, None) {
                Ok(program) => compiled.push(Shader::new(program, kind)),
                Err(err) => {
                    for shader in compiled {
                        ctx.delete_program(shader.program);
                    }
                    return Err(err);
                }
            }
        }
        debug!("compiled {} default shader programs", compiled.len());

        let [pixel, line, sprite, text, pixel_batch, line_batch, sprite_batch, particle] =
            <[Shader<G>; 8]>::try_from(compiled)
                .map_err(|_| RenderError::backend("default shader set is incomplete"))?;
        Ok(Self {
            pixel,
            line,
            sprite,
            text,
            pixel_batch,
            line_batch,
            sprite_batch,
            particle,
        })
    }

    /// Every program, in [`ShaderKind`] declaration order.
    pub fn all(&self) -> [Shader<G>; 8] {
        [
            self.pixel,
            self.line,
            self.sprite,
            self.text,
            self.pixel_batch,
            self.line_batch,
            self.sprite_batch,
            self.particle,
        ]
    }

    /// Mutable access to every program, for updating [`RenderDetails`](crate::RenderDetails).
    pub fn all_mut(&mut self) -> [&mut Shader<G>; 8] {
        [
            &mut self.pixel,
            &mut self.line,
            &mut self.sprite,
            &mut self.text,
            &mut self.pixel_batch,
            &mut self.line_batch,
            &mut self.sprite_batch,
            &mut self.particle,
        ]
    }

    /// Delete every program.
    pub fn destroy(&self, ctx: &mut GlContext<G>) {
        for shader in self.all() {
            ctx.delete_program(shader.program);
        }
    }
}
