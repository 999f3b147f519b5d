//! Error types for the rendering core.

use thiserror::Error;

/// The kind of named GPU object a registry error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Vertex (array) buffer object.
    Vbo,
    /// Element (index) buffer object.
    Ebo,
    /// Vertex array object.
    Vao,
    /// Framebuffer object.
    Fbo,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::Vbo => "VBO",
            ResourceKind::Ebo => "EBO",
            ResourceKind::Vao => "VAO",
            ResourceKind::Fbo => "FBO",
        })
    }
}

/// Errors surfaced by the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The font file could not be read or the face could not be parsed.
    #[error("font load error: {0}")]
    FontLoad(String),

    /// A shader stage failed to compile; `log` is the driver's info log.
    #[error("{stage} shader compile error: {log}")]
    ShaderCompile {
        /// Stage name ("vertex", "fragment", "geometry").
        stage: &'static str,
        /// Compiler diagnostics.
        log: String,
    },

    /// A program failed to link; `log` is the driver's info log.
    #[error("program link error: {log}")]
    ProgramLink {
        /// Linker diagnostics.
        log: String,
    },

    /// A named resource was bound or deleted without being created first.
    #[error("unknown {kind} '{name}'")]
    UnknownResource {
        /// Registry the name was looked up in.
        kind: ResourceKind,
        /// The offending name.
        name: String,
    },

    /// A named resource was created twice.
    #[error("{kind} '{name}' already exists")]
    DuplicateResource {
        /// Registry the name was inserted into.
        kind: ResourceKind,
        /// The offending name.
        name: String,
    },

    /// A shader or texture was requested from the asset store but never loaded.
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    /// A shader or texture name was loaded twice.
    #[error("asset '{0}' already loaded")]
    DuplicateAsset(String),

    /// Text was drawn before a font was loaded into the renderer.
    #[error("no font loaded")]
    NoFont,

    /// Text referenced a character with no cached glyph.
    #[error("no glyph cached for {0:?}")]
    MissingGlyph(char),

    /// More batch instances were supplied than the batch can hold.
    #[error("{kind} batch overflow: {requested} instances for a capacity of {capacity}")]
    BatchOverflow {
        /// Batch name ("pixel", "line", "sprite").
        kind: &'static str,
        /// Number of instances supplied.
        requested: usize,
        /// Fixed batch capacity.
        capacity: usize,
    },

    /// The graphics API refused to create an object.
    #[error("graphics backend error: {0}")]
    Backend(String),

    /// Image decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading an asset from disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Create a backend error from a string.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a font load error from a string.
    pub fn font_load<S: Into<String>>(msg: S) -> Self {
        Self::FontLoad(msg.into())
    }
}

/// Result type alias for renderer operations.
pub type Result<T> = std::result::Result<T, RenderError>;
