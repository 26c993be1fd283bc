//! Material renderer registration

use std::rc::Rc;

use crate::render::error::DriverResult;
use crate::render::material::MaterialTypeId;
use crate::render::materials::{
    HighLevelShaderRenderer, MaterialRenderer, ShaderConstantSetCallback, ShaderRenderer,
};

use super::VideoDriver;

impl VideoDriver {
    /// Register a custom material renderer and return its material type id
    ///
    /// # Errors
    /// `MaterialTypeIdsExhausted` when no id is left above the base.
    pub fn add_material_renderer(&mut self, renderer: Rc<dyn MaterialRenderer>) -> DriverResult<MaterialTypeId> {
        let name = renderer.name().to_string();
        self.renderers.register(renderer).map_err(|err| {
            log::error!("Could not register material renderer '{name}': {err}");
            err
        })
    }

    /// Register a material drawn with assembly vertex and fragment programs
    ///
    /// # Arguments
    /// * `vertex_source` - Vertex program, `None` keeps fixed-function transform
    /// * `pixel_source` - Fragment program, `None` keeps fixed-function texturing
    /// * `callback` - Sets program constants before every draw
    /// * `base_material` - Material type whose renderer provides blending
    /// * `user_data` - Passed to the callback
    ///
    /// # Errors
    /// `MaterialTypeIdsExhausted`, `FeatureUnavailable` or `ShaderCompilation`;
    /// nothing is registered or left compiled then.
    pub fn add_shader_material(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
        callback: Option<Rc<dyn ShaderConstantSetCallback>>,
        base_material: MaterialTypeId,
        user_data: i32,
    ) -> DriverResult<MaterialTypeId> {
        self.renderers.next_id()?;
        let base = self.renderers.get(base_material);
        let renderer = ShaderRenderer::new(self, vertex_source, pixel_source, callback, base, user_data)
            .map_err(|err| {
                log::error!("Could not create shader material: {err}");
                err
            })?;
        self.renderers.register(Rc::new(renderer))
    }

    /// Register a material drawn with a high-level shader program
    ///
    /// Arguments as for [`VideoDriver::add_shader_material`].
    ///
    /// # Errors
    /// `MaterialTypeIdsExhausted`, `FeatureUnavailable`, `ShaderCompilation` or
    /// `ShaderLink`; nothing is registered or left compiled then.
    pub fn add_high_level_shader_material(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
        callback: Option<Rc<dyn ShaderConstantSetCallback>>,
        base_material: MaterialTypeId,
        user_data: i32,
    ) -> DriverResult<MaterialTypeId> {
        self.renderers.next_id()?;
        let base = self.renderers.get(base_material);
        let renderer = HighLevelShaderRenderer::new(self, vertex_source, pixel_source, callback, base, user_data)
            .map_err(|err| {
                log::error!("Could not create high-level shader material: {err}");
                err
            })?;
        self.renderers.register(Rc::new(renderer))
    }

    /// Number of registered material types
    pub fn material_renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// Renderer registered for a material type
    pub fn material_renderer(&self, id: MaterialTypeId) -> Option<Rc<dyn MaterialRenderer>> {
        self.renderers.get(id)
    }
}
