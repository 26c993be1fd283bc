//! Shader material renderers
//!
//! [`ShaderRenderer`] drives assembly vertex/fragment programs and
//! [`HighLevelShaderRenderer`] a linked high-level program. Both leave
//! blending to a base renderer and hand constant setting to a user callback
//! before every draw.

use std::rc::Rc;

use crate::render::backend::ProgramStage;
use crate::render::error::DriverResult;
use crate::render::material::Material;
use crate::render::resources::ProgramHandle;
use crate::render::types::VertexType;

use super::{MaterialRenderer, MaterialRendererServices};

/// Sets shader constants before each draw
pub trait ShaderConstantSetCallback {
    /// Called from `on_render` while the renderer's programs are bound
    fn on_set_constants(&self, services: &mut dyn MaterialRendererServices, user_data: i32);
}

/// Renderer for assembly programs
pub struct ShaderRenderer {
    vertex_program: Option<ProgramHandle>,
    pixel_program: Option<ProgramHandle>,
    callback: Option<Rc<dyn ShaderConstantSetCallback>>,
    base: Option<Rc<dyn MaterialRenderer>>,
    user_data: i32,
}

impl ShaderRenderer {
    /// Compile the given sources into a new renderer
    ///
    /// # Arguments
    /// * `services` - Driver that compiles and owns the programs
    /// * `vertex_source` - Vertex program, `None` keeps fixed-function transform
    /// * `pixel_source` - Fragment program, `None` keeps fixed-function texturing
    /// * `callback` - Constant setter invoked before every draw
    /// * `base` - Renderer providing blending
    /// * `user_data` - Passed to the callback
    ///
    /// # Errors
    /// Any compilation failure.
    pub fn new(
        services: &mut dyn MaterialRendererServices,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
        callback: Option<Rc<dyn ShaderConstantSetCallback>>,
        base: Option<Rc<dyn MaterialRenderer>>,
        user_data: i32,
    ) -> DriverResult<Self> {
        let vertex_program = vertex_source
            .map(|source| services.compile_assembly_program(ProgramStage::Vertex, source))
            .transpose()?;
        let pixel_program = match pixel_source
            .map(|source| services.compile_assembly_program(ProgramStage::Fragment, source))
            .transpose()
        {
            Ok(program) => program,
            Err(err) => {
                if let Some(program) = vertex_program {
                    services.delete_program(program);
                }
                return Err(err);
            }
        };

        Ok(Self {
            vertex_program,
            pixel_program,
            callback,
            base,
            user_data,
        })
    }
}

impl MaterialRenderer for ShaderRenderer {
    fn on_set_material(
        &self,
        material: &Material,
        last: &Material,
        reset_all: bool,
        services: &mut dyn MaterialRendererServices,
    ) {
        if self.vertex_program.is_some() {
            services.bind_assembly_program(ProgramStage::Vertex, self.vertex_program);
        }
        if self.pixel_program.is_some() {
            services.bind_assembly_program(ProgramStage::Fragment, self.pixel_program);
        }
        if let Some(base) = &self.base {
            base.on_set_material(material, last, reset_all, services);
        }
    }

    fn on_render(&self, services: &mut dyn MaterialRendererServices, _vertex_type: VertexType) -> bool {
        if let Some(callback) = &self.callback {
            callback.on_set_constants(services, self.user_data);
        }
        true
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        if self.vertex_program.is_some() {
            services.bind_assembly_program(ProgramStage::Vertex, None);
        }
        if self.pixel_program.is_some() {
            services.bind_assembly_program(ProgramStage::Fragment, None);
        }
        if let Some(base) = &self.base {
            base.on_unset_material(services);
        }
    }

    fn is_transparent(&self) -> bool {
        self.base.as_ref().is_some_and(|base| base.is_transparent())
    }

    fn name(&self) -> &str {
        "shader"
    }
}

/// Renderer for a linked high-level program
pub struct HighLevelShaderRenderer {
    program: ProgramHandle,
    callback: Option<Rc<dyn ShaderConstantSetCallback>>,
    base: Option<Rc<dyn MaterialRenderer>>,
    user_data: i32,
}

impl HighLevelShaderRenderer {
    /// Compile and link the given sources into a new renderer
    ///
    /// # Errors
    /// Any compilation or link failure.
    pub fn new(
        services: &mut dyn MaterialRendererServices,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
        callback: Option<Rc<dyn ShaderConstantSetCallback>>,
        base: Option<Rc<dyn MaterialRenderer>>,
        user_data: i32,
    ) -> DriverResult<Self> {
        let program = services.compile_high_level_program(vertex_source, pixel_source)?;
        Ok(Self {
            program,
            callback,
            base,
            user_data,
        })
    }
}

impl MaterialRenderer for HighLevelShaderRenderer {
    fn on_set_material(
        &self,
        material: &Material,
        last: &Material,
        reset_all: bool,
        services: &mut dyn MaterialRendererServices,
    ) {
        services.use_high_level_program(Some(self.program));
        if let Some(base) = &self.base {
            base.on_set_material(material, last, reset_all, services);
        }
    }

    fn on_render(&self, services: &mut dyn MaterialRendererServices, _vertex_type: VertexType) -> bool {
        if let Some(callback) = &self.callback {
            callback.on_set_constants(services, self.user_data);
        }
        true
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.use_high_level_program(None);
        if let Some(base) = &self.base {
            base.on_unset_material(services);
        }
    }

    fn is_transparent(&self) -> bool {
        self.base.as_ref().is_some_and(|base| base.is_transparent())
    }

    fn name(&self) -> &str {
        "high_level_shader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::render::materials::fixed_function::TransparentAddColorRenderer;
    use crate::render::materials::test_support::{RecordingServices, ServiceCall};

    struct CountingCallback {
        calls: Cell<u32>,
        last_user_data: Cell<i32>,
    }

    impl ShaderConstantSetCallback for CountingCallback {
        fn on_set_constants(&self, services: &mut dyn MaterialRendererServices, user_data: i32) {
            self.calls.set(self.calls.get() + 1);
            self.last_user_data.set(user_data);
            services.set_vertex_shader_constant(0, &[1.0, 2.0, 3.0, 4.0]);
        }
    }

    #[test]
    fn test_callback_runs_on_every_render() {
        let mut services = RecordingServices::with_shaders();
        let callback = Rc::new(CountingCallback {
            calls: Cell::new(0),
            last_user_data: Cell::new(0),
        });
        let renderer = ShaderRenderer::new(
            &mut services,
            Some("!!ARBvp1.0\nEND"),
            None,
            Some(callback.clone()),
            None,
            42,
        )
        .unwrap();

        assert!(renderer.on_render(&mut services, VertexType::Standard));
        assert!(renderer.on_render(&mut services, VertexType::Standard));
        assert_eq!(callback.calls.get(), 2);
        assert_eq!(callback.last_user_data.get(), 42);
    }

    #[test]
    fn test_base_renderer_provides_blending() {
        let mut services = RecordingServices::with_shaders();
        let renderer = HighLevelShaderRenderer::new(
            &mut services,
            Some("void main() {}"),
            None,
            None,
            Some(Rc::new(TransparentAddColorRenderer)),
            0,
        )
        .unwrap();

        renderer.on_set_material(&Material::default(), &Material::default(), true, &mut services);
        renderer.on_unset_material(&mut services);

        assert!(renderer.is_transparent());
        assert!(matches!(services.calls[0], ServiceCall::UseHighLevel(Some(_))));
        assert!(services.calls.contains(&ServiceCall::UseHighLevel(None)));
    }

    #[test]
    fn test_rejected_pixel_program_frees_vertex_program() {
        let mut services = RecordingServices::with_shaders();
        services.rejected_stage = Some(ProgramStage::Fragment);

        let result = ShaderRenderer::new(&mut services, Some("!!ARBvp1.0\nEND"), Some("!!ARBfp1.0\nEND"), None, None, 0);

        assert!(result.is_err());
        assert!(services.programs.is_empty());
    }

    #[test]
    fn test_creation_fails_without_support() {
        let mut services = RecordingServices::default();

        let result = ShaderRenderer::new(&mut services, Some("!!ARBvp1.0\nEND"), None, None, None, 0);

        assert!(result.is_err());
    }
}
