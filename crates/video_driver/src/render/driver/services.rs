//! Driver functionality seen by material renderers
//!
//! Fixed-function changes go through the state cache like every other state
//! change. Programs compiled here are owned by the driver.

use crate::foundation::math::Mat4;
use crate::render::backend::{AlphaTest, BackendProgramId, BlendMode, ProgramStage, TexGen, TextureCombine};
use crate::render::error::{BackendError, DriverError, DriverResult};
use crate::render::lighting::Light;
use crate::render::materials::MaterialRendererServices;
use crate::render::resources::{ProgramEntry, ProgramHandle, ProgramKind};
use crate::render::types::{TransformSlot, VideoDriverFeature};

use super::VideoDriver;

fn program_error(err: BackendError) -> DriverError {
    match err {
        BackendError::Compile(message) => DriverError::ShaderCompilation(message),
        BackendError::Link(message) => DriverError::ShaderLink(message),
        other => DriverError::Backend(other),
    }
}

impl VideoDriver {
    fn program_id(&self, handle: ProgramHandle) -> Option<BackendProgramId> {
        let entry = self.programs.get(handle);
        if entry.is_none() {
            log::warn!("Unknown shader program, using fixed function");
        }
        entry.map(|entry| entry.backend_id)
    }

    fn set_program_constants(&mut self, stage: ProgramStage, start_register: u32, data: &[f32]) {
        for (register, chunk) in (start_register..).zip(data.chunks(4)) {
            let mut value = [0.0; 4];
            value[..chunk.len()].copy_from_slice(chunk);
            self.backend.set_program_parameter(stage, register, value);
        }
    }
}

impl MaterialRendererServices for VideoDriver {
    fn set_texture_combine(&mut self, stage: usize, combine: TextureCombine) {
        if stage < VideoDriver::texture_stage_count(self) {
            self.cache.set_combine(self.backend.as_mut(), stage, combine);
        }
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.cache.set_blend(self.backend.as_mut(), mode);
    }

    fn set_alpha_test(&mut self, test: AlphaTest) {
        self.cache.set_alpha_test(self.backend.as_mut(), test);
    }

    fn set_texgen(&mut self, stage: usize, mode: TexGen) {
        if stage < VideoDriver::texture_stage_count(self) {
            self.cache.set_texgen(self.backend.as_mut(), stage, mode);
        }
    }

    fn query_feature(&self, feature: VideoDriverFeature) -> bool {
        self.caps.supports(feature)
    }

    fn texture_stage_count(&self) -> usize {
        VideoDriver::texture_stage_count(self)
    }

    fn compile_assembly_program(&mut self, stage: ProgramStage, source: &str) -> DriverResult<ProgramHandle> {
        let (supported, feature) = match stage {
            ProgramStage::Vertex => (self.caps.vertex_program, "vertex programs"),
            ProgramStage::Fragment => (self.caps.fragment_program, "fragment programs"),
        };
        if !supported {
            log::warn!("Cannot compile program, the backend has no {feature}");
            return Err(DriverError::FeatureUnavailable(feature.to_string()));
        }

        let backend_id = self.backend.create_assembly_program(stage, source).map_err(|err| {
            log::error!("{stage:?} program rejected: {err}");
            program_error(err)
        })?;
        Ok(self.programs.insert(ProgramEntry {
            backend_id,
            kind: ProgramKind::Assembly(stage),
        }))
    }

    fn compile_high_level_program(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
    ) -> DriverResult<ProgramHandle> {
        if !self.caps.high_level_shaders {
            log::warn!("Cannot compile program, the backend has no high-level shaders");
            return Err(DriverError::FeatureUnavailable("high-level shaders".to_string()));
        }

        let backend_id = self
            .backend
            .create_high_level_program(vertex_source, pixel_source)
            .map_err(|err| {
                log::error!("High-level program rejected: {err}");
                program_error(err)
            })?;
        Ok(self.programs.insert(ProgramEntry {
            backend_id,
            kind: ProgramKind::HighLevel,
        }))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let Some(entry) = self.programs.remove(program) else {
            log::debug!("Program already deleted");
            return;
        };
        if self.active_high_level == Some(entry.backend_id) {
            self.active_high_level = None;
        }
        self.backend.delete_program(entry.backend_id);
    }

    fn bind_assembly_program(&mut self, stage: ProgramStage, program: Option<ProgramHandle>) {
        let id = program.and_then(|handle| self.program_id(handle));
        self.backend.bind_assembly_program(stage, id);
    }

    fn use_high_level_program(&mut self, program: Option<ProgramHandle>) {
        let id = program.and_then(|handle| self.program_id(handle));
        self.active_high_level = id;
        self.backend.use_high_level_program(id);
    }

    fn set_vertex_shader_constant(&mut self, start_register: u32, data: &[f32]) {
        self.set_program_constants(ProgramStage::Vertex, start_register, data);
    }

    fn set_pixel_shader_constant(&mut self, start_register: u32, data: &[f32]) {
        self.set_program_constants(ProgramStage::Fragment, start_register, data);
    }

    fn set_shader_constant_by_name(&mut self, name: &str, data: &[f32]) -> bool {
        let Some(program) = self.active_high_level else {
            log::warn!("No high-level program in use, cannot set '{name}'");
            return false;
        };
        let found = self.backend.set_uniform(program, name, data);
        if !found {
            log::warn!("Shader constant '{name}' does not exist");
        }
        found
    }

    fn transform(&self, slot: TransformSlot) -> Mat4 {
        *VideoDriver::transform(self, slot)
    }

    fn dynamic_light_count(&self) -> usize {
        VideoDriver::dynamic_light_count(self)
    }

    fn dynamic_light(&self, index: usize) -> Option<Light> {
        VideoDriver::dynamic_light(self, index).cloned()
    }
}
