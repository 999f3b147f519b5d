//! The narrow seam between the renderer and the graphics API.
//!
//! [`GlBackend`] lists exactly the OpenGL entry points this crate issues.
//! Enumerated arguments (targets, modes, formats) are raw GL constants as
//! exported by [`glow`], so call sites read like plain GL code.
//!
//! [`GlowBackend`] forwards every call to a [`glow::Context`].

use std::fmt::Debug;
use std::hash::Hash;

mod native;
#[cfg(test)]
pub(crate) mod recording;

pub use native::GlowBackend;

/// A graphics API capable of executing the calls issued by this crate.
///
/// Handles are opaque, cheap to copy, and only meaningful to the backend
/// that created them. Object creation may fail (lost context, exhausted
/// names); everything else is fire-and-forget, with failures reported
/// through [`get_error`](Self::get_error).
#[allow(missing_docs)]
pub trait GlBackend {
    /// Buffer object name (vertex, element, instance buffers).
    type Buffer: Copy + Eq + Hash + Debug;
    /// Vertex array object name.
    type VertexArray: Copy + Eq + Hash + Debug;
    /// Framebuffer object name.
    type Framebuffer: Copy + Eq + Hash + Debug;
    /// Texture object name.
    type Texture: Copy + Eq + Hash + Debug;
    /// Linked program name.
    type Program: Copy + Eq + Hash + Debug;
    /// Shader stage object name.
    type Shader: Copy + Eq + Hash + Debug;
    /// Uniform location inside a program.
    type UniformLocation: Clone + Debug;

    // Buffers, vertex arrays, framebuffers.
    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn bind_buffer(&mut self, target: u32, buffer: Option<Self::Buffer>);
    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32);
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]);

    fn create_vertex_array(&mut self) -> Result<Self::VertexArray, String>;
    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, String>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<Self::Framebuffer>);
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        texture: Option<Self::Texture>,
        level: i32,
    );
    fn check_framebuffer_status(&mut self, target: u32) -> u32;
    fn blit_framebuffer(
        &mut self,
        src: [i32; 4],
        dst: [i32; 4],
        mask: u32,
        filter: u32,
    );

    // Shaders and programs.
    fn create_shader(&mut self, stage: u32) -> Result<Self::Shader, String>;
    fn shader_source(&mut self, shader: Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: Self::Shader);
    fn shader_compile_status(&mut self, shader: Self::Shader) -> bool;
    fn shader_info_log(&mut self, shader: Self::Shader) -> String;
    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, String>;
    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn link_program(&mut self, program: Self::Program);
    fn program_link_status(&mut self, program: Self::Program) -> bool;
    fn program_info_log(&mut self, program: Self::Program) -> String;
    fn delete_program(&mut self, program: Self::Program);
    fn use_program(&mut self, program: Option<Self::Program>);

    // Uniforms, set on the program currently in use.
    fn uniform_location(
        &mut self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn uniform_1_f32(&mut self, location: &Self::UniformLocation, x: f32);
    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, x: i32);
    fn uniform_2_f32(&mut self, location: &Self::UniformLocation, v: [f32; 2]);
    fn uniform_3_f32(&mut self, location: &Self::UniformLocation, v: [f32; 3]);
    fn uniform_4_f32(&mut self, location: &Self::UniformLocation, v: [f32; 4]);
    fn uniform_matrix_4_f32(&mut self, location: &Self::UniformLocation, m: &[f32; 16]);

    // Textures.
    fn create_texture(&mut self) -> Result<Self::Texture, String>;
    fn delete_texture(&mut self, texture: Self::Texture);
    fn bind_texture(&mut self, target: u32, texture: Option<Self::Texture>);
    fn active_texture(&mut self, unit: u32);
    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        pixels: Option<&[u8]>,
    );
    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32);
    fn tex_parameter_f32(&mut self, target: u32, parameter: u32, value: f32);
    fn pixel_store_i32(&mut self, parameter: u32, value: i32);

    // Draws.
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instances: i32,
    );

    // Fixed-function state.
    fn enable(&mut self, capability: u32);
    fn disable(&mut self, capability: u32);
    fn blend_func(&mut self, src: u32, dst: u32);
    fn depth_mask(&mut self, enabled: bool);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, color: [f32; 4]);
    fn clear(&mut self, mask: u32);

    /// Pop one code off the GL error queue (`glow::NO_ERROR` when empty).
    fn get_error(&mut self) -> u32;
}
