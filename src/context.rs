//! The resource registry and GL state tracker.
//!
//! [`GlContext`] owns the backend and every named buffer, vertex array and
//! framebuffer. It mirrors the binding state of the underlying GL context so
//! redundant binds and setting changes are never issued, and it turns
//! registry misuse (unknown or duplicate names) into typed errors instead of
//! silent GL errors.
//!
//! Everything that touches GL goes through this type. Renderers, glyph
//! caches and particle generators hold names or raw handles and borrow the
//! context mutably for the duration of a call.

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::{
    backend::GlBackend,
    config::RenderConfig,
    error::{RenderError, ResourceKind, Result},
    state::{BlendMode, Bindings, FramebufferMode, Settings},
};

/// Upper bound on codes drained by one error check, in case a broken driver
/// never reports `NO_ERROR`.
const MAX_ERRORS_PER_CHECK: usize = 32;

/// Convert a byte count or element count to the `i32` GL expects.
///
/// Saturates at `i32::MAX`; the driver rejects such sizes with
/// `INVALID_VALUE`, which the error check then reports.
pub(crate) fn gl_int(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Human readable name of a GL error code.
pub fn gl_error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

/// Owner of all named GPU objects and of the mirrored binding state.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use sprite_gl::{GlContext, GlowBackend, RenderConfig};
/// # fn example(gl: Arc<glow::Context>) -> sprite_gl::Result<()> {
/// // SAFETY: the caller made `gl` current on this thread.
/// let backend = unsafe { GlowBackend::new(gl) };
/// let mut ctx = GlContext::new(backend, &RenderConfig::default());
///
/// ctx.create_vbo("quad")?;
/// ctx.bind_vbo("quad")?;
/// ctx.buffer_data_size(glow::ARRAY_BUFFER, 96, glow::DYNAMIC_DRAW);
/// ctx.unbind_vbo();
/// # Ok(())
/// # }
/// ```
pub struct GlContext<G: GlBackend> {
    gl: G,

    vbos: HashMap<String, G::Buffer>,
    ebos: HashMap<String, G::Buffer>,
    vaos: HashMap<String, G::VertexArray>,
    fbos: HashMap<String, G::Framebuffer>,

    bindings: Bindings<G::Program, G::Texture>,
    settings: Settings,
    /// Uniform locations per program, misses included.
    uniforms: HashMap<G::Program, HashMap<String, Option<G::UniformLocation>>>,

    /// Set until the first error check has run.
    first_error_check: bool,
    /// Poll the error queue after every state-changing call.
    check_errors: bool,
}

impl<G: GlBackend> GlContext<G> {
    /// Wrap `gl`. No GL calls are made.
    pub fn new(gl: G, config: &RenderConfig) -> Self {
        Self {
            gl,
            vbos: HashMap::new(),
            ebos: HashMap::new(),
            vaos: HashMap::new(),
            fbos: HashMap::new(),
            bindings: Bindings::new(),
            settings: Settings::default(),
            uniforms: HashMap::new(),
            first_error_check: true,
            check_errors: config.check_errors,
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &G {
        &self.gl
    }

    /// The wrapped backend, for calls this type does not cover.
    ///
    /// Binding state changed through this reference is not tracked.
    pub fn backend_mut(&mut self) -> &mut G {
        &mut self.gl
    }

    // ---- vertex buffers ---------------------------------------------------

    /// Allocate a vertex buffer under `name`.
    pub fn create_vbo(&mut self, name: &str) -> Result<()> {
        ensure_vacant(&self.vbos, ResourceKind::Vbo, name)?;
        let buffer = self.gl.create_buffer().map_err(RenderError::Backend)?;
        self.vbos.insert(name.to_owned(), buffer);
        debug!("created VBO '{name}' ({buffer:?})");
        self.after("create_vbo");
        Ok(())
    }

    /// Make `name` the active `ARRAY_BUFFER`.
    pub fn bind_vbo(&mut self, name: &str) -> Result<()> {
        let buffer = lookup(&self.vbos, ResourceKind::Vbo, name)?;
        if self.bindings.vbo.as_deref() == Some(name) {
            trace!("VBO '{name}' already bound");
            return Ok(());
        }
        self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        self.bindings.vbo = Some(name.to_owned());
        self.after("bind_vbo");
        Ok(())
    }

    /// Bind the null `ARRAY_BUFFER`. Does nothing when none is bound.
    pub fn unbind_vbo(&mut self) {
        if self.bindings.vbo.take().is_some() {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.after("unbind_vbo");
        }
    }

    /// Release the vertex buffer `name`.
    pub fn delete_vbo(&mut self, name: &str) -> Result<()> {
        let buffer = remove(&mut self.vbos, ResourceKind::Vbo, name)?;
        if self.bindings.vbo.as_deref() == Some(name) {
            self.bindings.vbo = None;
        }
        self.gl.delete_buffer(buffer);
        debug!("deleted VBO '{name}'");
        self.after("delete_vbo");
        Ok(())
    }

    // ---- element buffers --------------------------------------------------

    /// Allocate an element buffer under `name`.
    pub fn create_ebo(&mut self, name: &str) -> Result<()> {
        ensure_vacant(&self.ebos, ResourceKind::Ebo, name)?;
        let buffer = self.gl.create_buffer().map_err(RenderError::Backend)?;
        self.ebos.insert(name.to_owned(), buffer);
        debug!("created EBO '{name}' ({buffer:?})");
        self.after("create_ebo");
        Ok(())
    }

    /// Make `name` the active `ELEMENT_ARRAY_BUFFER`.
    pub fn bind_ebo(&mut self, name: &str) -> Result<()> {
        let buffer = lookup(&self.ebos, ResourceKind::Ebo, name)?;
        if self.bindings.ebo.as_deref() == Some(name) {
            trace!("EBO '{name}' already bound");
            return Ok(());
        }
        self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
        self.bindings.ebo = Some(name.to_owned());
        self.after("bind_ebo");
        Ok(())
    }

    /// Bind the null `ELEMENT_ARRAY_BUFFER`. Does nothing when none is bound.
    pub fn unbind_ebo(&mut self) {
        if self.bindings.ebo.take().is_some() {
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            self.after("unbind_ebo");
        }
    }

    /// Release the element buffer `name`.
    pub fn delete_ebo(&mut self, name: &str) -> Result<()> {
        let buffer = remove(&mut self.ebos, ResourceKind::Ebo, name)?;
        if self.bindings.ebo.as_deref() == Some(name) {
            self.bindings.ebo = None;
        }
        self.gl.delete_buffer(buffer);
        debug!("deleted EBO '{name}'");
        self.after("delete_ebo");
        Ok(())
    }

    // ---- vertex arrays ----------------------------------------------------

    /// Allocate a vertex array under `name`.
    pub fn create_vao(&mut self, name: &str) -> Result<()> {
        ensure_vacant(&self.vaos, ResourceKind::Vao, name)?;
        let vao = self
            .gl
            .create_vertex_array()
            .map_err(RenderError::Backend)?;
        self.vaos.insert(name.to_owned(), vao);
        debug!("created VAO '{name}' ({vao:?})");
        self.after("create_vao");
        Ok(())
    }

    /// Make `name` the active vertex array.
    pub fn bind_vao(&mut self, name: &str) -> Result<()> {
        let vao = lookup(&self.vaos, ResourceKind::Vao, name)?;
        if self.bindings.vao.as_deref() == Some(name) {
            trace!("VAO '{name}' already bound");
            return Ok(());
        }
        self.gl.bind_vertex_array(Some(vao));
        self.bindings.vao = Some(name.to_owned());
        // The element buffer binding is vertex array state.
        self.bindings.ebo = None;
        self.after("bind_vao");
        Ok(())
    }

    /// Bind the null vertex array. Does nothing when none is bound.
    pub fn unbind_vao(&mut self) {
        if self.bindings.vao.take().is_some() {
            self.gl.bind_vertex_array(None);
            self.bindings.ebo = None;
            self.after("unbind_vao");
        }
    }

    /// Release the vertex array `name`.
    pub fn delete_vao(&mut self, name: &str) -> Result<()> {
        let vao = remove(&mut self.vaos, ResourceKind::Vao, name)?;
        if self.bindings.vao.as_deref() == Some(name) {
            self.bindings.vao = None;
            self.bindings.ebo = None;
        }
        self.gl.delete_vertex_array(vao);
        debug!("deleted VAO '{name}'");
        self.after("delete_vao");
        Ok(())
    }

    // ---- framebuffers -----------------------------------------------------

    /// Allocate a framebuffer under `name`.
    pub fn create_fbo(&mut self, name: &str) -> Result<()> {
        ensure_vacant(&self.fbos, ResourceKind::Fbo, name)?;
        let fbo = self.gl.create_framebuffer().map_err(RenderError::Backend)?;
        self.fbos.insert(name.to_owned(), fbo);
        debug!("created FBO '{name}' ({fbo:?})");
        self.after("create_fbo");
        Ok(())
    }

    /// Bind `name` to the read side, the draw side, or both.
    pub fn bind_fbo(&mut self, name: &str, mode: FramebufferMode) -> Result<()> {
        let fbo = lookup(&self.fbos, ResourceKind::Fbo, name)?;
        if self.bindings.fbo_matches(name, mode) {
            trace!("FBO '{name}' already bound ({mode:?})");
            return Ok(());
        }
        self.gl.bind_framebuffer(mode.target(), Some(fbo));
        self.bindings.set_fbo(Some(name), mode);
        self.after("bind_fbo");
        Ok(())
    }

    /// Return both framebuffer sides to the default framebuffer. Does
    /// nothing when neither side has a named framebuffer bound.
    pub fn unbind_fbo(&mut self) {
        if self.bindings.read_fbo.is_none() && self.bindings.draw_fbo.is_none() {
            return;
        }
        self.gl
            .bind_framebuffer(FramebufferMode::ReadDraw.target(), None);
        self.bindings.set_fbo(None, FramebufferMode::ReadDraw);
        self.after("unbind_fbo");
    }

    /// Release the framebuffer `name`.
    pub fn delete_fbo(&mut self, name: &str) -> Result<()> {
        let fbo = remove(&mut self.fbos, ResourceKind::Fbo, name)?;
        self.bindings.forget_fbo(name);
        self.gl.delete_framebuffer(fbo);
        debug!("deleted FBO '{name}'");
        self.after("delete_fbo");
        Ok(())
    }

    /// Attach `texture` (level 0) to the framebuffer bound for `mode`.
    pub fn framebuffer_texture_2d(
        &mut self,
        mode: FramebufferMode,
        attachment: u32,
        texture: Option<G::Texture>,
    ) {
        self.gl
            .framebuffer_texture_2d(mode.target(), attachment, texture, 0);
        self.after("framebuffer_texture_2d");
    }

    /// Completeness status of the framebuffer bound for `mode`.
    pub fn check_framebuffer_status(&mut self, mode: FramebufferMode) -> u32 {
        let status = self.gl.check_framebuffer_status(mode.target());
        if status != glow::FRAMEBUFFER_COMPLETE {
            warn!("framebuffer incomplete: status 0x{status:04X}");
        }
        status
    }

    /// Copy a rectangle from the read framebuffer to the draw framebuffer.
    pub fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        self.gl.blit_framebuffer(src, dst, mask, filter);
        self.after("blit_framebuffer");
    }

    // ---- registry queries -------------------------------------------------

    /// Number of registered vertex buffers.
    pub fn total_vbo(&self) -> usize {
        self.vbos.len()
    }

    /// Number of registered element buffers.
    pub fn total_ebo(&self) -> usize {
        self.ebos.len()
    }

    /// Number of registered vertex arrays.
    pub fn total_vao(&self) -> usize {
        self.vaos.len()
    }

    /// Number of registered framebuffers.
    pub fn total_fbo(&self) -> usize {
        self.fbos.len()
    }

    /// Name of the active vertex buffer.
    pub fn bound_vbo(&self) -> Option<&str> {
        self.bindings.vbo.as_deref()
    }

    /// Name of the active element buffer.
    pub fn bound_ebo(&self) -> Option<&str> {
        self.bindings.ebo.as_deref()
    }

    /// Name of the active vertex array.
    pub fn bound_vao(&self) -> Option<&str> {
        self.bindings.vao.as_deref()
    }

    /// Name of the framebuffer bound for `mode`. For
    /// [`FramebufferMode::ReadDraw`] both sides must agree.
    pub fn bound_fbo(&self, mode: FramebufferMode) -> Option<&str> {
        match mode {
            FramebufferMode::Read => self.bindings.read_fbo.as_deref(),
            FramebufferMode::Draw => self.bindings.draw_fbo.as_deref(),
            FramebufferMode::ReadDraw => {
                if self.bindings.read_fbo == self.bindings.draw_fbo {
                    self.bindings.read_fbo.as_deref()
                } else {
                    None
                }
            }
        }
    }

    /// Program currently in use.
    pub fn bound_program(&self) -> Option<G::Program> {
        self.bindings.program
    }

    /// Texture bound on the active texture unit.
    pub fn bound_texture(&self) -> Option<G::Texture> {
        self.bindings
            .textures
            .get(&self.bindings.texture_unit)
            .copied()
    }

    /// Active texture unit (`glow::TEXTURE0 + n`).
    pub fn active_texture_unit(&self) -> u32 {
        self.bindings.texture_unit
    }

    /// Handle registered as vertex buffer `name`.
    pub fn vbo(&self, name: &str) -> Option<G::Buffer> {
        self.vbos.get(name).copied()
    }

    /// Handle registered as element buffer `name`.
    pub fn ebo(&self, name: &str) -> Option<G::Buffer> {
        self.ebos.get(name).copied()
    }

    /// Handle registered as vertex array `name`.
    pub fn vao(&self, name: &str) -> Option<G::VertexArray> {
        self.vaos.get(name).copied()
    }

    /// Handle registered as framebuffer `name`.
    pub fn fbo(&self, name: &str) -> Option<G::Framebuffer> {
        self.fbos.get(name).copied()
    }

    // ---- buffer contents and vertex layout --------------------------------

    /// Reallocate the buffer bound to `target` with `data`.
    pub fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.gl.buffer_data(target, data, usage);
        self.after("buffer_data");
    }

    /// Reallocate the buffer bound to `target` with `size` uninitialized bytes.
    pub fn buffer_data_size(&mut self, target: u32, size: usize, usage: u32) {
        self.gl.buffer_data_size(target, gl_int(size), usage);
        self.after("buffer_data_size");
    }

    /// Overwrite part of the buffer bound to `target`, starting at `offset`.
    pub fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        self.gl.buffer_sub_data(target, gl_int(offset), data);
        self.after("buffer_sub_data");
    }

    #[allow(missing_docs)]
    pub fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
        self.after("enable_vertex_attrib_array");
    }

    /// Describe float attribute `index`: `size` components, `stride` and
    /// `offset` in bytes.
    pub fn vertex_attrib_pointer(&mut self, index: u32, size: i32, stride: usize, offset: usize) {
        self.gl
            .vertex_attrib_pointer_f32(index, size, gl_int(stride), gl_int(offset));
        self.after("vertex_attrib_pointer");
    }

    /// Set how often attribute `index` advances (1 = once per instance).
    pub fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.gl.vertex_attrib_divisor(index, divisor);
        self.after("vertex_attrib_divisor");
    }

    // ---- shaders and programs ---------------------------------------------

    /// Create a shader object for `stage` (`glow::VERTEX_SHADER`, ...).
    pub fn create_shader(&mut self, stage: u32) -> Result<G::Shader> {
        let shader = self.gl.create_shader(stage).map_err(RenderError::Backend)?;
        self.after("create_shader");
        Ok(shader)
    }

    #[allow(missing_docs)]
    pub fn shader_source(&mut self, shader: G::Shader, source: &str) {
        self.gl.shader_source(shader, source);
    }

    #[allow(missing_docs)]
    pub fn compile_shader(&mut self, shader: G::Shader) {
        self.gl.compile_shader(shader);
        self.after("compile_shader");
    }

    #[allow(missing_docs)]
    pub fn shader_compile_status(&mut self, shader: G::Shader) -> bool {
        self.gl.shader_compile_status(shader)
    }

    #[allow(missing_docs)]
    pub fn shader_info_log(&mut self, shader: G::Shader) -> String {
        self.gl.shader_info_log(shader)
    }

    #[allow(missing_docs)]
    pub fn delete_shader(&mut self, shader: G::Shader) {
        self.gl.delete_shader(shader);
    }

    #[allow(missing_docs)]
    pub fn create_program(&mut self) -> Result<G::Program> {
        let program = self.gl.create_program().map_err(RenderError::Backend)?;
        self.after("create_program");
        Ok(program)
    }

    #[allow(missing_docs)]
    pub fn attach_shader(&mut self, program: G::Program, shader: G::Shader) {
        self.gl.attach_shader(program, shader);
    }

    #[allow(missing_docs)]
    pub fn detach_shader(&mut self, program: G::Program, shader: G::Shader) {
        self.gl.detach_shader(program, shader);
    }

    #[allow(missing_docs)]
    pub fn link_program(&mut self, program: G::Program) {
        self.gl.link_program(program);
        self.after("link_program");
    }

    #[allow(missing_docs)]
    pub fn program_link_status(&mut self, program: G::Program) -> bool {
        self.gl.program_link_status(program)
    }

    #[allow(missing_docs)]
    pub fn program_info_log(&mut self, program: G::Program) -> String {
        self.gl.program_info_log(program)
    }

    /// Delete `program`, forgetting it if it is in use.
    pub fn delete_program(&mut self, program: G::Program) {
        if self.bindings.program == Some(program) {
            self.bindings.program = None;
        }
        self.uniforms.remove(&program);
        self.gl.delete_program(program);
        self.after("delete_program");
    }

    /// Make `program` current (`None` for no program). Skipped when it
    /// already is.
    pub fn use_program(&mut self, program: Option<G::Program>) {
        if self.bindings.program == program {
            return;
        }
        self.gl.use_program(program);
        self.bindings.program = program;
        self.after("use_program");
    }

    /// Location of the uniform `name` in `program`; `None` when the program
    /// has no active uniform of that name.
    ///
    /// Each name is queried once per program and cached until the program
    /// is deleted.
    pub fn uniform_location(&mut self, program: G::Program, name: &str) -> Option<G::UniformLocation> {
        let cached = self.uniforms.entry(program).or_default();
        if let Some(location) = cached.get(name) {
            return location.clone();
        }
        let location = self.gl.uniform_location(program, name);
        cached.insert(name.to_owned(), location.clone());
        location
    }

    #[allow(missing_docs)]
    pub fn uniform_1_f32(&mut self, location: &G::UniformLocation, value: f32) {
        self.gl.uniform_1_f32(location, value);
        self.after("uniform_1_f32");
    }

    #[allow(missing_docs)]
    pub fn uniform_1_i32(&mut self, location: &G::UniformLocation, value: i32) {
        self.gl.uniform_1_i32(location, value);
        self.after("uniform_1_i32");
    }

    #[allow(missing_docs)]
    pub fn uniform_2_f32(&mut self, location: &G::UniformLocation, value: [f32; 2]) {
        self.gl.uniform_2_f32(location, value);
        self.after("uniform_2_f32");
    }

    #[allow(missing_docs)]
    pub fn uniform_3_f32(&mut self, location: &G::UniformLocation, value: [f32; 3]) {
        self.gl.uniform_3_f32(location, value);
        self.after("uniform_3_f32");
    }

    #[allow(missing_docs)]
    pub fn uniform_4_f32(&mut self, location: &G::UniformLocation, value: [f32; 4]) {
        self.gl.uniform_4_f32(location, value);
        self.after("uniform_4_f32");
    }

    /// Upload a column-major 4x4 matrix.
    pub fn uniform_matrix_4_f32(&mut self, location: &G::UniformLocation, value: &[f32; 16]) {
        self.gl.uniform_matrix_4_f32(location, value);
        self.after("uniform_matrix_4_f32");
    }

    // ---- textures ---------------------------------------------------------

    /// Create a texture object. Textures are not named; callers keep the
    /// handle.
    pub fn gen_texture(&mut self) -> Result<G::Texture> {
        let texture = self.gl.create_texture().map_err(RenderError::Backend)?;
        self.after("gen_texture");
        Ok(texture)
    }

    /// Delete `texture`, forgetting it on every unit it is bound to.
    pub fn delete_texture(&mut self, texture: G::Texture) {
        self.bindings.textures.retain(|_, bound| *bound != texture);
        self.gl.delete_texture(texture);
        self.after("delete_texture");
    }

    /// Bind `texture` to `TEXTURE_2D` on the active unit (`None` unbinds).
    /// Skipped when it is already bound there.
    pub fn bind_texture(&mut self, texture: Option<G::Texture>) {
        let unit = self.bindings.texture_unit;
        if self.bindings.textures.get(&unit).copied() == texture {
            return;
        }
        self.gl.bind_texture(glow::TEXTURE_2D, texture);
        match texture {
            Some(texture) => self.bindings.textures.insert(unit, texture),
            None => self.bindings.textures.remove(&unit),
        };
        self.after("bind_texture");
    }

    /// Select the texture unit later binds apply to (`glow::TEXTURE0 + n`).
    pub fn active_texture(&mut self, unit: u32) {
        if self.bindings.texture_unit == unit {
            return;
        }
        self.gl.active_texture(unit);
        self.bindings.texture_unit = unit;
        self.after("active_texture");
    }

    /// Upload level 0 of the bound `TEXTURE_2D` from unsigned bytes.
    pub fn tex_image_2d(
        &mut self,
        internal_format: u32,
        width: u32,
        height: u32,
        format: u32,
        pixels: Option<&[u8]>,
    ) {
        self.gl.tex_image_2d(
            glow::TEXTURE_2D,
            i32::try_from(internal_format).unwrap_or(i32::MAX),
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
            format,
            pixels,
        );
        self.after("tex_image_2d");
    }

    /// Set an integer parameter of the bound `TEXTURE_2D`.
    pub fn tex_parameter_i32(&mut self, parameter: u32, value: u32) {
        self.gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            parameter,
            i32::try_from(value).unwrap_or(i32::MAX),
        );
        self.after("tex_parameter_i32");
    }

    /// Set a float parameter of the bound `TEXTURE_2D`.
    pub fn tex_parameter_f32(&mut self, parameter: u32, value: f32) {
        self.gl.tex_parameter_f32(glow::TEXTURE_2D, parameter, value);
        self.after("tex_parameter_f32");
    }

    #[allow(missing_docs)]
    pub fn pixel_store_i32(&mut self, parameter: u32, value: i32) {
        self.gl.pixel_store_i32(parameter, value);
        self.after("pixel_store_i32");
    }

    // ---- draws ------------------------------------------------------------

    #[allow(missing_docs)]
    pub fn draw_arrays(&mut self, mode: u32, first: i32, count: usize) {
        trace!("draw_arrays mode=0x{mode:04X} count={count}");
        self.gl.draw_arrays(mode, first, gl_int(count));
        self.after("draw_arrays");
    }

    #[allow(missing_docs)]
    pub fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: usize, instances: usize) {
        trace!("draw_arrays_instanced mode=0x{mode:04X} count={count} instances={instances}");
        self.gl
            .draw_arrays_instanced(mode, first, gl_int(count), gl_int(instances));
        self.after("draw_arrays_instanced");
    }

    /// Instanced indexed draw from the bound element buffer.
    pub fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: usize,
        element_type: u32,
        offset: usize,
        instances: usize,
    ) {
        trace!("draw_elements_instanced mode=0x{mode:04X} count={count} instances={instances}");
        self.gl.draw_elements_instanced(
            mode,
            gl_int(count),
            element_type,
            gl_int(offset),
            gl_int(instances),
        );
        self.after("draw_elements_instanced");
    }

    // ---- fixed-function settings ------------------------------------------

    /// Set the color used by the clear operations.
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        if self.settings.clear_color == Some(color) {
            return;
        }
        self.gl.clear_color(color);
        self.settings.clear_color = Some(color);
        self.after("set_clear_color");
    }

    #[allow(missing_docs)]
    pub fn clear_color_buffer(&mut self) {
        self.gl.clear(glow::COLOR_BUFFER_BIT);
        self.after("clear_color_buffer");
    }

    #[allow(missing_docs)]
    pub fn clear_depth_buffer(&mut self) {
        self.gl.clear(glow::DEPTH_BUFFER_BIT);
        self.after("clear_depth_buffer");
    }

    #[allow(missing_docs)]
    pub fn clear_color_and_depth_buffers(&mut self) {
        self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        self.after("clear_color_and_depth_buffers");
    }

    /// Toggle `DEPTH_TEST`.
    pub fn depth_testing(&mut self, enabled: bool) {
        if self.settings.depth_test == Some(enabled) {
            return;
        }
        self.toggle(glow::DEPTH_TEST, enabled);
        self.settings.depth_test = Some(enabled);
        self.after("depth_testing");
    }

    /// Toggle depth buffer writes.
    pub fn depth_mask(&mut self, enabled: bool) {
        if self.settings.depth_mask == Some(enabled) {
            return;
        }
        self.gl.depth_mask(enabled);
        self.settings.depth_mask = Some(enabled);
        self.after("depth_mask");
    }

    /// Toggle `CULL_FACE`.
    pub fn face_culling(&mut self, enabled: bool) {
        if self.settings.face_culling == Some(enabled) {
            return;
        }
        self.toggle(glow::CULL_FACE, enabled);
        self.settings.face_culling = Some(enabled);
        self.after("face_culling");
    }

    /// Toggle `BLEND`, and when enabling, select the blend factors of
    /// `mode`. The factor call is skipped when the current mode already has
    /// the same factors.
    pub fn blending(&mut self, enabled: bool, mode: BlendMode) {
        if self.settings.blending != Some(enabled) {
            self.toggle(glow::BLEND, enabled);
            self.settings.blending = Some(enabled);
        }
        if enabled {
            let current = self.settings.blend_mode.map(BlendMode::factors);
            let (src, dst) = mode.factors();
            if current != Some((src, dst)) {
                self.gl.blend_func(src, dst);
            }
            self.settings.blend_mode = Some(mode);
        }
        self.after("blending");
    }

    /// Blend mode last selected with blending enabled.
    pub fn blend_mode(&self) -> Option<BlendMode> {
        self.settings.blend_mode
    }

    /// Set the viewport rectangle.
    pub fn resize_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let rect = [x, y, width, height];
        if self.settings.viewport == Some(rect) {
            return;
        }
        debug!("viewport {width}x{height} at ({x}, {y})");
        self.gl.viewport(x, y, width, height);
        self.settings.viewport = Some(rect);
        self.after("resize_viewport");
    }

    /// The viewport last set with [`resize_viewport`](Self::resize_viewport).
    pub fn viewport(&self) -> Option<[i32; 4]> {
        self.settings.viewport
    }

    fn toggle(&mut self, capability: u32, enabled: bool) {
        if enabled {
            self.gl.enable(capability);
        } else {
            self.gl.disable(capability);
        }
    }

    // ---- errors -----------------------------------------------------------

    /// Drain the GL error queue, logging each code at `warn`.
    ///
    /// Returns the reported codes. The first check after construction
    /// swallows one error, left over from context creation on some
    /// platforms; later checks report everything.
    pub fn check_for_gl_errors(&mut self) -> Vec<u32> {
        self.drain_errors("explicit check")
    }

    fn drain_errors(&mut self, after: &str) -> Vec<u32> {
        let mut swallow = std::mem::take(&mut self.first_error_check);
        let mut reported = Vec::new();
        for _ in 0..MAX_ERRORS_PER_CHECK {
            let code = self.gl.get_error();
            if code == glow::NO_ERROR {
                break;
            }
            if swallow {
                swallow = false;
                debug!("ignoring initial {} (0x{code:04X})", gl_error_name(code));
                continue;
            }
            warn!("{} (0x{code:04X}) after {after}", gl_error_name(code));
            reported.push(code);
        }
        reported
    }

    fn after(&mut self, operation: &str) {
        if self.check_errors {
            self.drain_errors(operation);
        }
    }

    // ---- teardown ---------------------------------------------------------

    /// Delete every registered buffer, vertex array and framebuffer and
    /// reset the binding records.
    pub fn destroy(&mut self) {
        let counts = (
            self.vbos.len(),
            self.ebos.len(),
            self.vaos.len(),
            self.fbos.len(),
        );
        for (_, vao) in self.vaos.drain() {
            self.gl.delete_vertex_array(vao);
        }
        for (_, buffer) in self.vbos.drain().chain(self.ebos.drain()) {
            self.gl.delete_buffer(buffer);
        }
        for (_, fbo) in self.fbos.drain() {
            self.gl.delete_framebuffer(fbo);
        }
        self.bindings.vbo = None;
        self.bindings.ebo = None;
        self.bindings.vao = None;
        self.bindings.set_fbo(None, FramebufferMode::ReadDraw);
        debug!(
            "destroyed {} VBOs, {} EBOs, {} VAOs, {} FBOs",
            counts.0, counts.1, counts.2, counts.3
        );
        self.after("destroy");
    }
}

fn ensure_vacant<H>(map: &HashMap<String, H>, kind: ResourceKind, name: &str) -> Result<()> {
    if map.contains_key(name) {
        return Err(RenderError::DuplicateResource {
            kind,
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn lookup<H: Copy>(map: &HashMap<String, H>, kind: ResourceKind, name: &str) -> Result<H> {
    map.get(name)
        .copied()
        .ok_or_else(|| RenderError::UnknownResource {
            kind,
            name: name.to_owned(),
        })
}

fn remove<H>(map: &mut HashMap<String, H>, kind: ResourceKind, name: &str) -> Result<H> {
    map.remove(name).ok_or_else(|| RenderError::UnknownResource {
        kind,
        name: name.to_owned(),
    })
}
