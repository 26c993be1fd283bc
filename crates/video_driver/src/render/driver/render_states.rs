//! Transforms, materials and the render mode switch

use crate::foundation::math::{Dimension2, Mat4};
use crate::render::backend::{
    AlphaTest, BackendTextureId, BlendMode, Capability, CullFace, MatrixMode, PolygonMode, TexGen, TextureCombine,
};
use crate::render::error::{DriverError, DriverResult};
use crate::render::material::{Material, MATERIAL_MAX_TEXTURES};
use crate::render::resources::TextureHandle;
use crate::render::state::StageTexture;
use crate::render::types::{RenderMode, TransformSlot, VertexType};

use super::VideoDriver;

impl VideoDriver {
    /// Set a transformation matrix
    ///
    /// World, view and projection changes are uploaded right away while 3D
    /// mode is active; texture matrices are uploaded at the next 3D draw.
    pub fn set_transform(&mut self, slot: TransformSlot, matrix: Mat4) {
        let reload = self.cache.transforms_mut().set(slot, matrix);
        if let Some(mode) = reload {
            if self.cache.mode() == RenderMode::Mode3D {
                let matrix = *self.cache.transforms().for_mode(mode);
                self.backend.load_matrix(mode, &matrix);
            }
        }
    }

    /// Matrix stored in a slot
    pub fn transform(&self, slot: TransformSlot) -> &Mat4 {
        self.cache.transforms().get(slot)
    }

    /// View times world, the matrix the backend transforms vertices with
    pub fn model_view(&self) -> &Mat4 {
        self.cache.transforms().model_view()
    }

    /// Material used by the following 3D draws
    ///
    /// Nothing is emitted until the next draw; only the groups that differ
    /// from the applied material are sent then.
    pub fn set_material(&mut self, material: &Material) {
        if self.cache.current() != material {
            *self.cache.current_mut() = material.clone();
        }
    }

    /// Material set by the last `set_material` or `set_texture`
    pub fn material(&self) -> &Material {
        self.cache.current()
    }

    /// Replace one texture of the current material
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for textures this driver
    /// cannot use; the material is left unchanged.
    pub fn set_texture(&mut self, stage: usize, texture: Option<TextureHandle>) -> DriverResult<()> {
        if stage >= MATERIAL_MAX_TEXTURES {
            log::debug!("Texture stage {stage} does not exist, ignoring");
            return Ok(());
        }
        if let Some(handle) = texture {
            self.textures.resolve(handle)?;
        }
        self.cache.current_mut().textures[stage] = texture;
        Ok(())
    }

    /// Forget everything the cache knows about the backend state
    ///
    /// Needed after state was changed through [`VideoDriver::backend_mut`].
    pub fn reset_render_states(&mut self) {
        self.cache.invalidate_fixed_function();
        self.cache.request_reset();
    }

    pub(super) fn stage_textures(&self) -> Vec<Option<StageTexture>> {
        let material = self.cache.current();
        (0..self.texture_stage_count())
            .map(|stage| {
                let handle = material.textures[stage]?;
                match self.textures.resolve(handle) {
                    Ok(entry) => Some(StageTexture {
                        id: entry.backend_id,
                        has_mip_maps: entry.has_mip_maps,
                    }),
                    Err(err) => {
                        log::warn!("Texture on stage {stage} is not usable, drawing without it: {err}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Call `on_unset_material` of the renderer that was set last
    pub(super) fn unset_active_renderer(&mut self) {
        let Some(id) = self.active_renderer.take() else { return };
        if let Some(renderer) = self.renderers.get(id) {
            renderer.on_unset_material(self);
        }
    }

    /// Configure the backend for 3D drawing with the current material
    pub(super) fn apply_3d_states(&mut self) {
        if self.cache.mode() != RenderMode::Mode3D {
            self.cache.invalidate_fixed_function();
            self.cache.set_combine(self.backend.as_mut(), 0, TextureCombine::MODULATE);
            self.cache.set_blend(self.backend.as_mut(), BlendMode::Disabled);

            let model_view = *self.cache.transforms().model_view();
            let projection = *self.cache.transforms().get(TransformSlot::Projection);
            self.backend.load_matrix(MatrixMode::ModelView, &model_view);
            self.backend.load_matrix(MatrixMode::Projection, &projection);

            self.cache.request_reset();
            self.cache.set_mode(RenderMode::Mode3D);
        }

        let textures = self.stage_textures();
        let max_anisotropy = self.max_anisotropy();

        if self.cache.reset_all() || self.cache.material_changed() {
            self.unset_active_renderer();

            let material = self.cache.current().clone();
            let last = self.cache.last_applied().clone();
            let reset_all = self.cache.reset_all();

            self.cache
                .apply_basic_states(self.backend.as_mut(), &material, &last, reset_all, &textures, max_anisotropy);

            if let Some(renderer) = self.renderers.get(material.material_type) {
                renderer.on_set_material(&material, &last, reset_all, self);
                self.active_renderer = Some(material.material_type);
            } else {
                log::trace!("No renderer for material type {}, using basic states", material.material_type.0);
            }
            self.cache.commit_material();
        } else {
            let material = self.cache.current().clone();
            self.cache
                .apply_texture_stages(self.backend.as_mut(), &material, &textures, max_anisotropy);
        }

        let stage_count = self.texture_stage_count();
        let dirty: Vec<usize> = self.cache.transforms_mut().take_dirty_texture_stages().collect();
        for stage in dirty.into_iter().filter(|&stage| stage < stage_count) {
            let Ok(stage) = u8::try_from(stage) else { continue };
            let mode = MatrixMode::Texture(stage);
            let matrix = *self.cache.transforms().for_mode(mode);
            self.backend.load_matrix(mode, &matrix);
        }
    }

    /// Configure 3D drawing and run the renderer's per-draw hook
    ///
    /// Returns false when the renderer vetoed the draw.
    pub(super) fn prepare_3d(&mut self, vertex_type: VertexType) -> bool {
        self.apply_3d_states();
        match self.active_renderer.and_then(|id| self.renderers.get(id)) {
            Some(renderer) => renderer.on_render(self, vertex_type),
            None => true,
        }
    }

    /// Configure the backend for 2D drawing
    ///
    /// # Arguments
    /// * `texture` - Texture drawn on stage 0, `None` for untextured shapes
    /// * `alpha` - Blend by vertex alpha
    /// * `alpha_channel` - Blend by texture alpha
    pub(super) fn prepare_2d(&mut self, texture: Option<BackendTextureId>, alpha: bool, alpha_channel: bool) {
        let mode = self.cache.mode();
        if mode != RenderMode::Mode2D || self.cache.transforms().changed_3d() {
            self.unset_active_renderer();
            if mode != RenderMode::Mode2D {
                self.cache.invalidate_fixed_function();
            }

            let identity = Mat4::identity();
            self.backend.load_matrix(MatrixMode::Projection, &identity);
            self.backend.load_matrix(MatrixMode::ModelView, &identity);
            self.cache.transforms_mut().clear_changed_3d();

            self.backend.set_capability(Capability::DepthTest, false);
            self.backend.set_capability(Capability::Fog, false);
            self.backend.set_capability(Capability::Lighting, false);
            self.backend.set_capability(Capability::CullFace, false);
            self.backend.set_cull_face(CullFace::Back);
            self.backend.set_polygon_mode(PolygonMode::Fill);

            for stage in 1..self.texture_stage_count() {
                self.cache.bind_texture(self.backend.as_mut(), stage, None);
            }
            self.cache.set_texgen(self.backend.as_mut(), 0, TexGen::Off);
            self.cache.set_alpha_test(self.backend.as_mut(), AlphaTest::Disabled);

            // the 3D material has to be applied in full when 3D drawing resumes
            self.cache.request_reset();
            self.cache.set_mode(RenderMode::Mode2D);
        }

        self.cache.set_2d_config(self.backend.as_mut(), texture, alpha, alpha_channel);
    }

    /// Backend texture of a handle for drawing
    ///
    /// # Errors
    /// As [`crate::render::resources::TextureTable::resolve`].
    pub(super) fn texture_for_draw(&self, handle: TextureHandle) -> DriverResult<(BackendTextureId, Dimension2)> {
        let entry = self.textures.resolve(handle).map_err(|err| {
            if err == DriverError::InvalidHandle {
                log::error!("Tried to draw with a destroyed texture");
            }
            err
        })?;
        Ok((entry.backend_id, entry.original_size))
    }
}
