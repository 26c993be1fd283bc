//! Material renderers
//!
//! A material renderer is a strategy object that configures the backend for
//! one or more material type ids. The driver invokes its hooks around every
//! draw that uses one of those ids:
//!
//! - `on_set_material` when the material (or its type) becomes active, after
//!   the driver applied the basic fixed-function states
//! - `on_render` right before the backend draw call
//! - `on_unset_material` when the driver switches away from the renderer
//!
//! Renderers reach the backend only through [`MaterialRendererServices`], so
//! every change they make goes through the driver's state cache.

pub mod builtin_ids;
pub mod fixed_function;
pub mod normal_map;
pub mod registry;
pub mod shader_renderer;

pub use builtin_ids::BuiltinMaterial;
pub use registry::MaterialRendererRegistry;
pub use shader_renderer::{HighLevelShaderRenderer, ShaderConstantSetCallback, ShaderRenderer};

use crate::foundation::math::Mat4;
use crate::render::backend::{AlphaTest, BlendMode, ProgramStage, TexGen, TextureCombine};
use crate::render::error::DriverResult;
use crate::render::lighting::Light;
use crate::render::material::Material;
use crate::render::resources::ProgramHandle;
use crate::render::types::{TransformSlot, VertexType, VideoDriverFeature};

/// Driver functionality available to material renderers
pub trait MaterialRendererServices {
    /// Set the texture environment of a stage
    fn set_texture_combine(&mut self, stage: usize, combine: TextureCombine);

    /// Set blending
    fn set_blend(&mut self, mode: BlendMode);

    /// Set the alpha test
    fn set_alpha_test(&mut self, test: AlphaTest);

    /// Set texture coordinate generation of a stage
    fn set_texgen(&mut self, stage: usize, mode: TexGen);

    /// Answer a capability query
    fn query_feature(&self, feature: VideoDriverFeature) -> bool;

    /// Number of texture stages the driver drives
    fn texture_stage_count(&self) -> usize;

    /// Compile an assembly program owned by the driver
    ///
    /// # Errors
    /// `FeatureUnavailable` without support for the stage, `ShaderCompilation`
    /// when the backend rejects the source.
    fn compile_assembly_program(&mut self, stage: ProgramStage, source: &str) -> DriverResult<ProgramHandle>;

    /// Compile and link a high-level program owned by the driver
    ///
    /// # Errors
    /// `FeatureUnavailable` without high-level shader support,
    /// `ShaderCompilation` or `ShaderLink` when the backend rejects the sources.
    fn compile_high_level_program(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
    ) -> DriverResult<ProgramHandle>;

    /// Delete a program compiled through these services
    ///
    /// Unknown handles are ignored.
    fn delete_program(&mut self, program: ProgramHandle);

    /// Bind an assembly program, `None` returns the stage to fixed function
    fn bind_assembly_program(&mut self, stage: ProgramStage, program: Option<ProgramHandle>);

    /// Use a high-level program, `None` returns to fixed function
    fn use_high_level_program(&mut self, program: Option<ProgramHandle>);

    /// Set vertex program registers starting at `start_register`, four floats each
    fn set_vertex_shader_constant(&mut self, start_register: u32, data: &[f32]);

    /// Set fragment program registers starting at `start_register`, four floats each
    fn set_pixel_shader_constant(&mut self, start_register: u32, data: &[f32]);

    /// Set a named constant of the active high-level program; false if it does not exist
    fn set_shader_constant_by_name(&mut self, name: &str, data: &[f32]) -> bool;

    /// Current matrix of a slot
    fn transform(&self, slot: TransformSlot) -> Mat4;

    /// Number of active dynamic lights
    fn dynamic_light_count(&self) -> usize;

    /// Active dynamic light by slot
    fn dynamic_light(&self, index: usize) -> Option<Light>;
}

/// Strategy configuring the backend for a material type
pub trait MaterialRenderer {
    /// Material becomes active
    ///
    /// # Arguments
    /// * `material` - Material being applied
    /// * `last` - Material applied before
    /// * `reset_all` - The backend state was reset and must be set up completely
    /// * `services` - Driver access
    fn on_set_material(
        &self,
        material: &Material,
        last: &Material,
        reset_all: bool,
        services: &mut dyn MaterialRendererServices,
    );

    /// Called before every draw; returning false skips the draw
    fn on_render(&self, _services: &mut dyn MaterialRendererServices, _vertex_type: VertexType) -> bool {
        true
    }

    /// Material stops being active
    fn on_unset_material(&self, _services: &mut dyn MaterialRendererServices) {}

    /// Whether geometry drawn with this renderer is blended
    fn is_transparent(&self) -> bool {
        false
    }

    /// Name for logging
    fn name(&self) -> &str;
}
