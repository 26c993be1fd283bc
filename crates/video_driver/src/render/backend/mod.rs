//! Graphics backend abstraction
//!
//! A backend wraps a stateful, immediate-mode graphics API. The driver talks
//! to it exclusively through [`GraphicsBackend`] and is the only component
//! that issues state changes, so the driver's state cache always knows what
//! the backend currently has applied.
//!
//! Conventions every adapter has to follow:
//! - Matrices are passed exactly as the driver holds them. Any handedness
//!   conversion of the projection matrix is the adapter's business.
//! - Viewports are given with a top-left origin. Adapters with a bottom-left
//!   origin flip the y axis themselves.
//! - `read_pixels` returns rows bottom to top, the native order of the
//!   framebuffer. The driver flips screenshots.

pub mod capabilities;
pub mod headless;

pub use capabilities::{BackendInfo, DriverCapabilities};
pub use headless::{BackendCall, HeadlessBackend, HeadlessFactory};

use crate::foundation::color::{Color, ColorF};
use crate::foundation::math::{Dimension2, Mat4, Rect};
use crate::render::error::BackendResult;
use crate::render::lighting::{BackendLight, Fog};
use crate::render::types::{ClearFlags, PrimitiveType};
use crate::render::vertex::{ImmediateVertex, VertexStream};

/// Backend-native texture object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendTextureId(pub u32);

/// Backend-native program object name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendProgramId(pub u32);

/// Toggleable backend capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Fixed-function lighting
    Lighting,
    /// Fog
    Fog,
    /// Face culling
    CullFace,
    /// Normal renormalisation
    Normalize,
    /// Stencil testing
    StencilTest,
    /// Separate specular colour in the light model
    SeparateSpecular,
    /// One light slot
    Light(u8),
}

/// Matrix stacks of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixMode {
    /// Combined view and world matrix
    ModelView,
    /// Projection matrix
    Projection,
    /// Texture matrix of one stage
    Texture(u8),
}

/// Rasterisation fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Filled triangles
    Fill,
    /// Triangle edges
    Line,
    /// Vertices
    Point,
}

/// Colour interpolation across primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadeModel {
    /// Interpolated vertex colours
    Smooth,
    /// Colour of the provoking vertex
    Flat,
}

/// Face selected for culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    /// Front faces
    Front,
    /// Back faces
    Back,
}

/// Blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source colour
    SrcColor,
    /// 1 - source colour
    OneMinusSrcColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination colour
    DstColor,
}

/// Blending configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Blending off
    Disabled,
    /// Blending on with the given factors
    Enabled {
        /// Source factor
        src: BlendFactor,
        /// Destination factor
        dst: BlendFactor,
    },
}

impl BlendMode {
    /// Classic alpha blending
    pub const ALPHA: BlendMode = BlendMode::Enabled {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };

    /// Additive colour blending
    pub const ADD_COLOR: BlendMode = BlendMode::Enabled {
        src: BlendFactor::One,
        dst: BlendFactor::OneMinusSrcColor,
    };
}

/// Comparison functions for alpha and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    /// Always passes
    Always,
    /// Passes if the value is greater than the reference
    Greater,
    /// Passes if the value is less or equal to the reference
    LessEqual,
    /// Passes if the value differs from the reference
    NotEqual,
}

/// Alpha test configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaTest {
    /// Alpha test off
    Disabled,
    /// Alpha test on
    Enabled {
        /// Comparison against the reference
        func: CompareFunc,
        /// Reference value in 0..=1
        reference: f32,
    },
}

/// Magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
}

/// Minification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Nearest texel from the nearest mip level
    NearestMipNearest,
    /// Bilinear from the nearest mip level
    LinearMipNearest,
    /// Trilinear
    LinearMipLinear,
}

/// Sampling configuration of one texture stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureFilter {
    /// Magnification filter
    pub mag: MagFilter,
    /// Minification filter
    pub min: MinFilter,
    /// Maximum anisotropy, present only when the backend supports it
    pub anisotropy: Option<f32>,
}

impl TextureFilter {
    /// Unfiltered sampling used for 2D blits
    pub const NEAREST: TextureFilter = TextureFilter {
        mag: MagFilter::Nearest,
        min: MinFilter::Nearest,
        anisotropy: None,
    };
}

/// Texture combiner operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineOp {
    /// First argument
    Replace,
    /// Product of both arguments
    Modulate,
    /// Sum of both arguments
    Add,
    /// Sum of both arguments minus 0.5
    AddSigned,
    /// Mix of both arguments weighted by the alpha of `interpolant`
    Interpolate,
}

/// Texture combiner argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineSource {
    /// Texel of this stage
    Texture,
    /// Result of the previous stage
    Previous,
    /// Interpolated vertex colour
    PrimaryColor,
}

/// Texture environment of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureCombine {
    /// Colour operation
    pub rgb_op: CombineOp,
    /// Colour operation arguments
    pub rgb_args: [CombineSource; 2],
    /// Alpha operation
    pub alpha_op: CombineOp,
    /// Alpha operation arguments
    pub alpha_args: [CombineSource; 2],
    /// Weight source of `Interpolate`
    pub interpolant: CombineSource,
    /// Colour scale (1, 2 or 4)
    pub rgb_scale: u8,
}

impl TextureCombine {
    /// Texture modulated by the previous stage, the fixed-function default
    pub const MODULATE: TextureCombine = TextureCombine {
        rgb_op: CombineOp::Modulate,
        rgb_args: [CombineSource::Texture, CombineSource::Previous],
        alpha_op: CombineOp::Modulate,
        alpha_args: [CombineSource::Texture, CombineSource::Previous],
        interpolant: CombineSource::PrimaryColor,
        rgb_scale: 1,
    };

    /// Colour operation with default alpha handling
    pub const fn rgb(op: CombineOp, args: [CombineSource; 2]) -> Self {
        Self {
            rgb_op: op,
            rgb_args: args,
            ..Self::MODULATE
        }
    }

    /// Builder-style colour scale
    pub const fn with_scale(mut self, scale: u8) -> Self {
        self.rgb_scale = scale;
        self
    }

    /// Builder-style alpha operation
    pub const fn with_alpha(mut self, op: CombineOp, args: [CombineSource; 2]) -> Self {
        self.alpha_op = op;
        self.alpha_args = args;
        self
    }

    /// Builder-style interpolation weight source
    pub const fn with_interpolant(mut self, source: CombineSource) -> Self {
        self.interpolant = source;
        self
    }
}

/// Texture coordinate generation of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexGen {
    /// Use vertex texture coordinates
    Off,
    /// Sphere environment mapping
    SphereMap,
}

/// Stencil operations for stencil fail, depth fail and depth pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep the stored value
    Keep,
    /// Increment the stored value
    Increment,
    /// Decrement the stored value
    Decrement,
}

/// Full stencil configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// Comparison function
    pub func: CompareFunc,
    /// Reference value
    pub reference: i32,
    /// Operations on stencil fail, depth fail and depth pass
    pub ops: [StencilOp; 3],
}

/// Lighting colours of a material, already in float form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialColors {
    /// Ambient RGBA
    pub ambient: [f32; 4],
    /// Diffuse RGBA
    pub diffuse: [f32; 4],
    /// Specular RGBA
    pub specular: [f32; 4],
    /// Emissive RGBA
    pub emissive: [f32; 4],
    /// Specular exponent
    pub shininess: f32,
}

/// Pipeline stage of an assembly program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    /// Vertex program
    Vertex,
    /// Fragment program
    Fragment,
}

/// Texture data for `GraphicsBackend::create_texture`
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    /// Size of level 0
    pub size: Dimension2,
    /// Mip levels, level 0 first; texels are packed ARGB rows top to bottom
    pub levels: Vec<Vec<Color>>,
}

/// Settings for creating a rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRequest {
    /// Initial drawable size
    pub size: Dimension2,
    /// Request a stencil buffer
    pub stencil_buffer: bool,
    /// Synchronise presentation with the display refresh
    pub vsync: bool,
    /// Request a multisampled drawable
    pub anti_alias: bool,
}

/// Creates backends for the driver
///
/// The driver asks for a context with the configured settings and retries
/// without a stencil buffer when that fails.
pub trait BackendFactory {
    /// Create a backend with a current context
    fn create(&mut self, request: &ContextRequest) -> BackendResult<Box<dyn GraphicsBackend>>;
}

/// Stateful graphics API seen by the driver
pub trait GraphicsBackend {
    /// Probed implementation strings, extensions and limits
    fn info(&self) -> &BackendInfo;

    /// Make the context current on the calling thread
    fn make_current(&mut self) -> BackendResult<()>;

    /// Release the context from the calling thread
    fn release_current(&mut self);

    /// Present the back buffer
    fn present(&mut self) -> BackendResult<()>;

    /// Set the viewport, top-left origin
    fn set_viewport(&mut self, area: Rect);

    /// Clear the selected buffers; colour buffers are cleared to `color`
    fn clear(&mut self, buffers: ClearFlags, color: Color);

    /// Read the colour buffer, rows bottom to top
    fn read_pixels(&mut self, size: Dimension2) -> BackendResult<Vec<Color>>;

    /// Copy the lower-left `size` pixels of the framebuffer into level 0 of a texture
    fn copy_framebuffer_to_texture(&mut self, texture: BackendTextureId, size: Dimension2);

    /// Enable or disable a capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Replace the matrix of one stack
    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Mat4);

    /// Set the material colours of the lighting equation
    fn set_material_colors(&mut self, colors: &MaterialColors);

    /// Set the fill mode
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Set the shade model
    fn set_shade_model(&mut self, model: ShadeModel);

    /// Enable or disable depth writes
    fn set_depth_mask(&mut self, enabled: bool);

    /// Enable or disable colour writes
    fn set_color_mask(&mut self, enabled: bool);

    /// Select the culled face
    fn set_cull_face(&mut self, face: CullFace);

    /// Set blending
    fn set_blend(&mut self, mode: BlendMode);

    /// Set the alpha test
    fn set_alpha_test(&mut self, test: AlphaTest);

    /// Set the stencil function and operations
    fn set_stencil(&mut self, state: StencilState);

    /// Bind a texture to a stage, `None` disables texturing on the stage
    fn bind_texture(&mut self, stage: usize, texture: Option<BackendTextureId>);

    /// Set the sampling parameters of the texture bound to a stage
    fn set_texture_filter(&mut self, stage: usize, filter: TextureFilter);

    /// Set the texture environment of a stage
    fn set_texture_combine(&mut self, stage: usize, combine: TextureCombine);

    /// Set texture coordinate generation of a stage
    fn set_texgen(&mut self, stage: usize, mode: TexGen);

    /// Configure a light slot
    fn set_light(&mut self, slot: usize, light: &BackendLight);

    /// Set the global ambient light
    fn set_ambient_light(&mut self, color: ColorF);

    /// Set fog parameters
    fn set_fog(&mut self, fog: &Fog);

    /// Save all fixed-function state and matrices
    fn push_state(&mut self);

    /// Restore state saved by `push_state`
    fn pop_state(&mut self);

    /// Create a texture from prepared mip levels
    fn create_texture(&mut self, upload: &TextureUpload) -> BackendResult<BackendTextureId>;

    /// Delete a texture
    fn delete_texture(&mut self, texture: BackendTextureId);

    /// Compile an assembly program
    fn create_assembly_program(&mut self, stage: ProgramStage, source: &str) -> BackendResult<BackendProgramId>;

    /// Bind an assembly program, `None` returns the stage to fixed function
    fn bind_assembly_program(&mut self, stage: ProgramStage, program: Option<BackendProgramId>);

    /// Set one four-component local parameter of the bound program of a stage
    fn set_program_parameter(&mut self, stage: ProgramStage, index: u32, value: [f32; 4]);

    /// Compile and link a high-level program from optional vertex and pixel sources
    fn create_high_level_program(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
    ) -> BackendResult<BackendProgramId>;

    /// Use a high-level program, `None` returns to fixed function
    fn use_high_level_program(&mut self, program: Option<BackendProgramId>);

    /// Set a uniform of a high-level program by name; false if it does not exist
    fn set_uniform(&mut self, program: BackendProgramId, name: &str, values: &[f32]) -> bool;

    /// Delete a program of either kind
    fn delete_program(&mut self, program: BackendProgramId);

    /// Draw indexed primitives from a vertex stream
    fn draw_indexed(&mut self, stream: &VertexStream<'_>, primitive: PrimitiveType, indices: &[u16]);

    /// Draw non-indexed primitives from immediate vertices
    fn draw_immediate(&mut self, primitive: PrimitiveType, vertices: &[ImmediateVertex]);

    /// Downcast support for tests and tools
    fn as_any(&self) -> &dyn std::any::Any;

    /// Mutable downcast support for tests and tools
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
