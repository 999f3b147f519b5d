//! [`GlBackend`] over a live [`glow::Context`].

use std::sync::Arc;

use glow::{HasContext, PixelUnpackData};

use super::GlBackend;

/// Forwards every [`GlBackend`] call to an OpenGL context through [`glow`].
///
/// The context is shared via [`Arc`] so the window layer can keep its own
/// handle for swapping buffers.
pub struct GlowBackend {
    gl: Arc<glow::Context>,
}

impl GlowBackend {
    /// Wrap a GL context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread for as long as this
    /// backend is used, and every handle passed back into it must have been
    /// created by it. The trait methods rely on this to issue raw GL calls
    /// without further checks.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    /// The wrapped context.
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

// SAFETY (all blocks below): `GlowBackend::new` requires a current context
// and backend-created handles, which is everything glow's unsafe API asks for.
impl GlBackend for GlowBackend {
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Framebuffer = glow::Framebuffer;
    type Texture = glow::Texture;
    type Program = glow::Program;
    type Shader = glow::Shader;
    type UniformLocation = glow::UniformLocation;

    fn create_buffer(&mut self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target, buffer) }
    }

    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size, usage) }
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) }
    }

    fn create_vertex_array(&mut self) -> Result<Self::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset);
        }
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) }
    }

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, String> {
        unsafe { self.gl.create_framebuffer() }
    }

    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer) {
        unsafe { self.gl.delete_framebuffer(framebuffer) }
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<Self::Framebuffer>) {
        unsafe { self.gl.bind_framebuffer(target, framebuffer) }
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture: Option<Self::Texture>,
        level: i32,
    ) {
        unsafe {
            self.gl
                .framebuffer_texture_2d(target, attachment, glow::TEXTURE_2D, texture, level);
        }
    }

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        unsafe {
            self.gl.blit_framebuffer(
                src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter,
            );
        }
    }

    fn create_shader(&mut self, stage: u32) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage) }
    }

    fn shader_source(&mut self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&mut self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&mut self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&mut self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&mut self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&mut self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&mut self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&mut self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1_f32(&mut self, location: &Self::UniformLocation, x: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), x) }
    }

    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, x: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), x) }
    }

    fn uniform_2_f32(&mut self, location: &Self::UniformLocation, v: [f32; 2]) {
        unsafe { self.gl.uniform_2_f32(Some(location), v[0], v[1]) }
    }

    fn uniform_3_f32(&mut self, location: &Self::UniformLocation, v: [f32; 3]) {
        unsafe { self.gl.uniform_3_f32(Some(location), v[0], v[1], v[2]) }
    }

    fn uniform_4_f32(&mut self, location: &Self::UniformLocation, v: [f32; 4]) {
        unsafe { self.gl.uniform_4_f32(Some(location), v[0], v[1], v[2], v[3]) }
    }

    fn uniform_matrix_4_f32(&mut self, location: &Self::UniformLocation, m: &[f32; 16]) {
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(location), false, m) }
    }

    fn create_texture(&mut self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn delete_texture(&mut self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn bind_texture(&mut self, target: u32, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(target, texture) }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn tex_parameter_f32(&mut self, target: u32, parameter: u32, value: f32) {
        unsafe { self.gl.tex_parameter_f32(target, parameter, value) }
    }

    fn pixel_store_i32(&mut self, parameter: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(parameter, value) }
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl
                .draw_elements_instanced(mode, count, element_type, offset, instances);
        }
    }

    fn enable(&mut self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn disable(&mut self, capability: u32) {
        unsafe { self.gl.disable(capability) }
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn depth_mask(&mut self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) }
    }

    fn clear(&mut self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn get_error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }
}
