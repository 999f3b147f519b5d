//! In-memory [`GlBackend`] that records every call, for unit tests.
//!
//! Buffer objects keep their byte contents so tests can inspect uploads;
//! writes past the end of a buffer queue `INVALID_VALUE` like a driver would.

use std::collections::{HashMap, VecDeque};

use super::GlBackend;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GlCall {
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer { target: u32, buffer: Option<u32> },
    BufferData { target: u32, size: usize, usage: u32 },
    BufferSubData { target: u32, offset: i32, len: usize },
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(Option<u32>),
    EnableAttrib(u32),
    AttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    AttribDivisor { index: u32, divisor: u32 },
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer { target: u32, framebuffer: Option<u32> },
    FramebufferTexture { attachment: u32, texture: Option<u32> },
    BlitFramebuffer,
    CreateShader { stage: u32, shader: u32 },
    ShaderSource(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    Uniform { name: String, value: UniformValue },
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture(Option<u32>),
    ActiveTexture(u32),
    TexImage2D { internal_format: i32, width: i32, height: i32, format: u32 },
    TexParameterI { parameter: u32, value: i32 },
    TexParameterF { parameter: u32, value: f32 },
    PixelStore { parameter: u32, value: i32 },
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },
    DrawElementsInstanced { mode: u32, count: i32, instances: i32 },
    Enable(u32),
    Disable(u32),
    BlendFunc { src: u32, dst: u32 },
    DepthMask(bool),
    Viewport([i32; 4]),
    ClearColor([f32; 4]),
    Clear(u32),
}

#[derive(Default)]
pub(crate) struct RecordingGl {
    calls: Vec<GlCall>,
    next_name: u32,
    buffers: HashMap<u32, Vec<u8>>,
    bound_buffers: HashMap<u32, u32>,
    errors: VecDeque<u32>,
    compile_failure: Option<String>,
    link_failure: Option<String>,
    buffer_budget: Option<usize>,
    uniform_lookups: usize,
}

impl RecordingGl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub(crate) fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub(crate) fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub(crate) fn buffer_contents(&self, buffer: u32) -> &[u8] {
        self.buffers.get(&buffer).map_or(&[], Vec::as_slice)
    }

    /// Buffer contents read back as `T` values, regardless of alignment.
    pub(crate) fn buffer_as<T: bytemuck::AnyBitPattern>(&self, buffer: u32) -> Vec<T> {
        self.buffer_contents(buffer)
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    pub(crate) fn push_error(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    /// Every shader compiled from now on fails with `log`.
    pub(crate) fn fail_compiles(&mut self, log: &str) {
        self.compile_failure = Some(log.to_owned());
    }

    /// Every program linked from now on fails with `log`.
    pub(crate) fn fail_links(&mut self, log: &str) {
        self.link_failure = Some(log.to_owned());
    }

    /// Only `remaining` more buffers can be created; later ones fail.
    pub(crate) fn fail_buffers_after(&mut self, remaining: usize) {
        self.buffer_budget = Some(remaining);
    }

    /// How many uniform locations have been queried.
    pub(crate) fn uniform_lookups(&self) -> usize {
        self.uniform_lookups
    }

    /// The last value uploaded to the uniform called `name`.
    pub(crate) fn last_uniform(&self, name: &str) -> Option<&UniformValue> {
        self.calls.iter().rev().find_map(|call| match call {
            GlCall::Uniform { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    fn allocate(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn uniform(&mut self, name: &str, value: UniformValue) {
        self.calls.push(GlCall::Uniform {
            name: name.to_owned(),
            value,
        });
    }
}

impl GlBackend for RecordingGl {
    type Buffer = u32;
    type VertexArray = u32;
    type Framebuffer = u32;
    type Texture = u32;
    type Program = u32;
    type Shader = u32;
    type UniformLocation = String;

    fn create_buffer(&mut self) -> Result<u32, String> {
        if let Some(budget) = &mut self.buffer_budget {
            if *budget == 0 {
                return Err("out of buffer names".to_owned());
            }
            *budget -= 1;
        }
        let name = self.allocate();
        self.buffers.insert(name, Vec::new());
        self.calls.push(GlCall::CreateBuffer(name));
        Ok(name)
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.buffers.remove(&buffer);
        self.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<u32>) {
        match buffer {
            Some(name) => self.bound_buffers.insert(target, name),
            None => self.bound_buffers.remove(&target),
        };
        self.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data_size(&mut self, target: u32, size: i32, usage: u32) {
        let size = usize::try_from(size).unwrap_or_default();
        if let Some(name) = self.bound_buffers.get(&target) {
            self.buffers.insert(*name, vec![0; size]);
        }
        self.calls.push(GlCall::BufferData {
            target,
            size,
            usage,
        });
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        if let Some(name) = self.bound_buffers.get(&target) {
            self.buffers.insert(*name, data.to_vec());
        }
        self.calls.push(GlCall::BufferData {
            target,
            size: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        let start = usize::try_from(offset).unwrap_or_default();
        let fits = self
            .bound_buffers
            .get(&target)
            .and_then(|name| self.buffers.get_mut(name))
            .and_then(|store| store.get_mut(start..start + data.len()))
            .map(|dst| dst.copy_from_slice(data))
            .is_some();
        if !fits {
            self.errors.push_back(glow::INVALID_VALUE);
        }
        self.calls.push(GlCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_vertex_array(&mut self) -> Result<u32, String> {
        let name = self.allocate();
        self.calls.push(GlCall::CreateVertexArray(name));
        Ok(name)
    }

    fn delete_vertex_array(&mut self, vertex_array: u32) {
        self.calls.push(GlCall::DeleteVertexArray(vertex_array));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<u32>) {
        self.calls.push(GlCall::BindVertexArray(vertex_array));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.calls.push(GlCall::EnableAttrib(index));
    }

    fn vertex_attrib_pointer_f32(&mut self, index: u32, size: i32, stride: i32, offset: i32) {
        self.calls.push(GlCall::AttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.calls.push(GlCall::AttribDivisor { index, divisor });
    }

    fn create_framebuffer(&mut self) -> Result<u32, String> {
        let name = self.allocate();
        self.calls.push(GlCall::CreateFramebuffer(name));
        Ok(name)
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        self.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<u32>) {
        self.calls
            .push(GlCall::BindFramebuffer { target, framebuffer });
    }

    fn framebuffer_texture_2d(
        &mut self,
        _target: u32,
        attachment: u32,
        texture: Option<u32>,
        _level: i32,
    ) {
        self.calls
            .push(GlCall::FramebufferTexture { attachment, texture });
    }

    fn check_framebuffer_status(&mut self, _target: u32) -> u32 {
        glow::FRAMEBUFFER_COMPLETE
    }

    fn blit_framebuffer(&mut self, _src: [i32; 4], _dst: [i32; 4], _mask: u32, _filter: u32) {
        self.calls.push(GlCall::BlitFramebuffer);
    }

    fn create_shader(&mut self, stage: u32) -> Result<u32, String> {
        let shader = self.allocate();
        self.calls.push(GlCall::CreateShader { stage, shader });
        Ok(shader)
    }

    fn shader_source(&mut self, shader: u32, _source: &str) {
        self.calls.push(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: u32) {
        self.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&mut self, _shader: u32) -> bool {
        self.compile_failure.is_none()
    }

    fn shader_info_log(&mut self, _shader: u32) -> String {
        self.compile_failure.clone().unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: u32) {
        self.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Result<u32, String> {
        let program = self.allocate();
        self.calls.push(GlCall::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        self.calls.push(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        self.calls.push(GlCall::DetachShader { program, shader });
    }

    fn link_program(&mut self, program: u32) {
        self.calls.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&mut self, _program: u32) -> bool {
        self.link_failure.is_none()
    }

    fn program_info_log(&mut self, _program: u32) -> String {
        self.link_failure.clone().unwrap_or_default()
    }

    fn delete_program(&mut self, program: u32) {
        self.calls.push(GlCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn uniform_location(&mut self, _program: u32, name: &str) -> Option<String> {
        self.uniform_lookups += 1;
        Some(name.to_owned())
    }

    fn uniform_1_f32(&mut self, location: &String, x: f32) {
        self.uniform(location, UniformValue::Float(x));
    }

    fn uniform_1_i32(&mut self, location: &String, x: i32) {
        self.uniform(location, UniformValue::Int(x));
    }

    fn uniform_2_f32(&mut self, location: &String, v: [f32; 2]) {
        self.uniform(location, UniformValue::Vec2(v));
    }

    fn uniform_3_f32(&mut self, location: &String, v: [f32; 3]) {
        self.uniform(location, UniformValue::Vec3(v));
    }

    fn uniform_4_f32(&mut self, location: &String, v: [f32; 4]) {
        self.uniform(location, UniformValue::Vec4(v));
    }

    fn uniform_matrix_4_f32(&mut self, location: &String, m: &[f32; 16]) {
        self.uniform(location, UniformValue::Mat4(*m));
    }

    fn create_texture(&mut self) -> Result<u32, String> {
        let texture = self.allocate();
        self.calls.push(GlCall::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: u32) {
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, _target: u32, texture: Option<u32>) {
        self.calls.push(GlCall::BindTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(GlCall::ActiveTexture(unit));
    }

    fn tex_image_2d(
        &mut self,
        _target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        _pixels: Option<&[u8]>,
    ) {
        self.calls.push(GlCall::TexImage2D {
            internal_format,
            width,
            height,
            format,
        });
    }

    fn tex_parameter_i32(&mut self, _target: u32, parameter: u32, value: i32) {
        self.calls.push(GlCall::TexParameterI { parameter, value });
    }

    fn tex_parameter_f32(&mut self, _target: u32, parameter: u32, value: f32) {
        self.calls.push(GlCall::TexParameterF { parameter, value });
    }

    fn pixel_store_i32(&mut self, parameter: u32, value: i32) {
        self.calls.push(GlCall::PixelStore { parameter, value });
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.calls.push(GlCall::DrawArrays { mode, first, count });
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.calls.push(GlCall::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        _element_type: u32,
        _offset: i32,
        instances: i32,
    ) {
        self.calls.push(GlCall::DrawElementsInstanced {
            mode,
            count,
            instances,
        });
    }

    fn enable(&mut self, capability: u32) {
        self.calls.push(GlCall::Enable(capability));
    }

    fn disable(&mut self, capability: u32) {
        self.calls.push(GlCall::Disable(capability));
    }

    fn blend_func(&mut self, src: u32, dst: u32) {
        self.calls.push(GlCall::BlendFunc { src, dst });
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.calls.push(GlCall::DepthMask(enabled));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(GlCall::Viewport([x, y, width, height]));
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.calls.push(GlCall::ClearColor(color));
    }

    fn clear(&mut self, mask: u32) {
        self.calls.push(GlCall::Clear(mask));
    }

    fn get_error(&mut self) -> u32 {
        self.errors.pop_front().unwrap_or(glow::NO_ERROR)
    }
}
