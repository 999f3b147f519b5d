//! Named shader and texture storage.
//!
//! [`AssetStore`] compiles shaders and decodes images (via [`image`]) into
//! GL textures, keeps them under caller-chosen names and deletes them all on
//! [`destroy`](AssetStore::destroy). Lookups hand out copies of the
//! [`Shader`] / [`Texture`] values.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::{
    backend::GlBackend,
    context::GlContext,
    error::{RenderError, Result},
    shaders::compile_program,
    types::{Shader, ShaderKind, Texture},
};

/// Create a `TEXTURE_2D`, upload `pixels` as level 0 and apply `wrap` and
/// `filter` to both axes.
///
/// Rows are read with an unpack alignment of 1, so tightly packed RGB and
/// single-channel data upload correctly. The texture is left unbound.
#[allow(clippy::too_many_arguments)]
pub(crate) fn upload_texture<G: GlBackend>(
    ctx: &mut GlContext<G>,
    width: u32,
    height: u32,
    internal_format: u32,
    image_format: u32,
    pixels: &[u8],
    wrap: u32,
    filter: u32,
) -> Result<Texture<G>> {
    let id = ctx.gen_texture()?;
    ctx.bind_texture(Some(id));
    ctx.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
    ctx.tex_image_2d(internal_format, width, height, image_format, Some(pixels));
    ctx.tex_parameter_i32(glow::TEXTURE_WRAP_S, wrap);
    ctx.tex_parameter_i32(glow::TEXTURE_WRAP_T, wrap);
    ctx.tex_parameter_i32(glow::TEXTURE_MIN_FILTER, filter);
    ctx.tex_parameter_i32(glow::TEXTURE_MAG_FILTER, filter);
    ctx.bind_texture(None);

    Ok(Texture {
        id,
        width,
        height,
        internal_format,
        image_format,
        wrap,
        filter,
    })
}

/// Shaders and textures by name.
pub struct AssetStore<G: GlBackend> {
    shaders: HashMap<String, Shader<G>>,
    textures: HashMap<String, Texture<G>>,
    /// Bytes of pixel data uploaded for the stored textures.
    texture_memory: u64,
}

impl<G: GlBackend> Default for AssetStore<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GlBackend> AssetStore<G> {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self {
            shaders: HashMap::new(),
            textures: HashMap::new(),
            texture_memory: 0,
        }
    }

    /// Compile a program from source and store it under `name`.
    ///
    /// # Errors
    ///
    /// [`RenderError::DuplicateAsset`] if `name` is taken, otherwise any
    /// error from [`compile_program`].
    pub fn load_shader(
        &mut self,
        ctx: &mut GlContext<G>,
        vertex_src: &str,
        fragment_src: &str,
        geometry_src: Option<&str>,
        name: &str,
        kind: ShaderKind,
    ) -> Result<Shader<G>> {
        if self.shaders.contains_key(name) {
            return Err(RenderError::DuplicateAsset(name.to_owned()));
        }
        let program = compile_program(ctx, vertex_src, fragment_src, geometry_src)?;
        let shader = Shader::new(program, kind);
        self.shaders.insert(name.to_owned(), shader);
        debug!("loaded {kind:?} shader '{name}'");
        Ok(shader)
    }

    /// [`load_shader`](Self::load_shader) with sources read from disk.
    pub fn load_shader_files(
        &mut self,
        ctx: &mut GlContext<G>,
        vertex_path: &Path,
        fragment_path: &Path,
        geometry_path: Option<&Path>,
        name: &str,
        kind: ShaderKind,
    ) -> Result<Shader<G>> {
        let vertex = std::fs::read_to_string(vertex_path)?;
        let fragment = std::fs::read_to_string(fragment_path)?;
        let geometry = geometry_path.map(std::fs::read_to_string).transpose()?;
        self.load_shader(ctx, &vertex, &fragment, geometry.as_deref(), name, kind)
    }

    /// The shader stored under `name`.
    pub fn get_shader(&self, name: &str) -> Result<Shader<G>> {
        self.shaders
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::UnknownAsset(name.to_owned()))
    }

    /// Every stored shader with its name.
    pub fn shaders(&self) -> impl Iterator<Item = (&str, &Shader<G>)> {
        self.shaders.iter().map(|(name, shader)| (name.as_str(), shader))
    }

    /// Decode the image at `path` and store it as texture `name`.
    ///
    /// With `has_alpha` the image is uploaded as RGBA, otherwise as RGB.
    pub fn load_texture(
        &mut self,
        ctx: &mut GlContext<G>,
        path: impl AsRef<Path>,
        has_alpha: bool,
        name: &str,
    ) -> Result<Texture<G>> {
        if self.textures.contains_key(name) {
            return Err(RenderError::DuplicateAsset(name.to_owned()));
        }
        let path = path.as_ref();
        let image = image::open(path)?;
        debug!("decoded {} ({}x{})", path.display(), image.width(), image.height());
        self.store_image(ctx, &image, has_alpha, name)
    }

    /// Decode an encoded image (PNG, JPEG) from memory and store it as
    /// texture `name`.
    pub fn load_texture_from_memory(
        &mut self,
        ctx: &mut GlContext<G>,
        bytes: &[u8],
        has_alpha: bool,
        name: &str,
    ) -> Result<Texture<G>> {
        if self.textures.contains_key(name) {
            return Err(RenderError::DuplicateAsset(name.to_owned()));
        }
        let image = image::load_from_memory(bytes)?;
        self.store_image(ctx, &image, has_alpha, name)
    }

    fn store_image(
        &mut self,
        ctx: &mut GlContext<G>,
        image: &image::DynamicImage,
        has_alpha: bool,
        name: &str,
    ) -> Result<Texture<G>> {
        let (format, pixels) = if has_alpha {
            (glow::RGBA, image.to_rgba8().into_raw())
        } else {
            (glow::RGB, image.to_rgb8().into_raw())
        };
        let texture = upload_texture(
            ctx,
            image.width(),
            image.height(),
            format,
            format,
            &pixels,
            glow::CLAMP_TO_EDGE,
            glow::LINEAR,
        )?;

        self.texture_memory += texture.byte_size();
        self.textures.insert(name.to_owned(), texture);
        info!(
            "loaded texture '{name}' ({}x{}, {} KiB on GPU in total)",
            texture.width,
            texture.height,
            self.texture_memory / 1024
        );
        Ok(texture)
    }

    /// The texture stored under `name`.
    pub fn get_texture(&self, name: &str) -> Result<Texture<G>> {
        self.textures
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::UnknownAsset(name.to_owned()))
    }

    /// Bytes of pixel data uploaded for the stored textures.
    pub fn texture_memory(&self) -> u64 {
        self.texture_memory
    }

    /// Delete every stored program and texture.
    pub fn destroy(&mut self, ctx: &mut GlContext<G>) {
        for (_, shader) in self.shaders.drain() {
            ctx.delete_program(shader.program);
        }
        for (_, texture) in self.textures.drain() {
            ctx.delete_texture(texture.id);
        }
        self.texture_memory = 0;
    }
}
