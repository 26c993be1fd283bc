//! Render state cache
//!
//! The cache is the only writer of cached backend state. It keeps the
//! material the client asked for, the material last pushed to the backend,
//! and the per-stage fixed-function state touched by material renderers.
//! Every setter compares against what the backend already has and emits
//! nothing when the value is unchanged.

use crate::foundation::color::ColorF;
use crate::render::backend::{
    AlphaTest, BackendTextureId, BlendMode, Capability, CombineOp, CombineSource, CullFace, GraphicsBackend,
    MagFilter, MaterialColors, MinFilter, PolygonMode, ShadeModel, TexGen, TextureCombine, TextureFilter,
};
use crate::render::material::{Material, MATERIAL_MAX_TEXTURES};
use crate::render::resources::TextureHandle;
use crate::render::types::RenderMode;

use super::transforms::TransformState;

/// Last value sent to the backend, `None` when unknown
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cached<T>(Option<T>);

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: PartialEq + Copy> Cached<T> {
    /// Store `value`; true when it differs from the cached one
    fn replace(&mut self, value: T) -> bool {
        if self.0 == Some(value) {
            return false;
        }
        self.0 = Some(value);
        true
    }

    fn invalidate(&mut self) {
        self.0 = None;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct StageState {
    bound: Cached<Option<BackendTextureId>>,
    filter: Cached<TextureFilter>,
    combine: Cached<TextureCombine>,
    texgen: Cached<TexGen>,
}

/// Texture bound to a stage as seen by the filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTexture {
    /// Backend texture
    pub id: BackendTextureId,
    /// Whether the texture has mip levels
    pub has_mip_maps: bool,
}

/// 2D pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode2DConfig {
    /// A texture is drawn
    pub texture: bool,
    /// Vertex alpha is blended
    pub alpha: bool,
    /// Texture alpha is blended
    pub alpha_channel: bool,
}

/// Sampling parameters a material selects for a texture
///
/// # Arguments
/// * `material` - Material with the filter flags
/// * `has_mip_maps` - Whether the bound texture has mip levels
/// * `max_anisotropy` - Backend maximum, `None` without anisotropic filtering
pub fn texture_filter_for(material: &Material, has_mip_maps: bool, max_anisotropy: Option<f32>) -> TextureFilter {
    let smooth = material.bilinear_filter || material.trilinear_filter;
    let mag = if smooth { MagFilter::Linear } else { MagFilter::Nearest };

    let min = if has_mip_maps {
        if material.trilinear_filter {
            MinFilter::LinearMipLinear
        } else if material.bilinear_filter {
            MinFilter::LinearMipNearest
        } else {
            MinFilter::NearestMipNearest
        }
    } else if smooth {
        MinFilter::Linear
    } else {
        MinFilter::Nearest
    };

    let anisotropy = max_anisotropy.map(|max| if material.anisotropic_filter { max } else { 1.0 });

    TextureFilter { mag, min, anisotropy }
}

/// Material, mode and fixed-function state last applied to the backend
#[derive(Debug)]
pub struct StateCache {
    current: Material,
    last_applied: Material,
    transforms: TransformState,
    mode: RenderMode,
    reset_all: bool,
    stages: [StageState; MATERIAL_MAX_TEXTURES],
    blend: Cached<BlendMode>,
    alpha_test: Cached<AlphaTest>,
    mode_2d: Cached<Mode2DConfig>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    /// Fresh cache; everything is applied on first use
    pub fn new() -> Self {
        Self {
            current: Material::default(),
            last_applied: Material::default(),
            transforms: TransformState::default(),
            mode: RenderMode::Unset,
            reset_all: true,
            stages: [StageState::default(); MATERIAL_MAX_TEXTURES],
            blend: Cached::default(),
            alpha_test: Cached::default(),
            mode_2d: Cached::default(),
        }
    }

    /// Material requested by the client
    pub const fn current(&self) -> &Material {
        &self.current
    }

    /// Mutable access to the requested material
    pub fn current_mut(&mut self) -> &mut Material {
        &mut self.current
    }

    /// Material last pushed to the backend
    pub const fn last_applied(&self) -> &Material {
        &self.last_applied
    }

    /// Record that the current material has been applied
    pub fn commit_material(&mut self) {
        self.last_applied = self.current.clone();
        self.reset_all = false;
    }

    /// True when the current material differs from the applied one
    pub fn material_changed(&self) -> bool {
        self.current != self.last_applied
    }

    /// Transform matrices
    pub const fn transforms(&self) -> &TransformState {
        &self.transforms
    }

    /// Mutable transform matrices
    pub fn transforms_mut(&mut self) -> &mut TransformState {
        &mut self.transforms
    }

    /// Mode the backend is configured for
    pub const fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Record the mode the backend is configured for
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// Whether the next 3D application must emit every group
    pub const fn reset_all(&self) -> bool {
        self.reset_all
    }

    /// Force the next 3D application to emit every group
    pub fn request_reset(&mut self) {
        self.reset_all = true;
    }

    /// Forget the renderer-owned fixed-function state
    ///
    /// Used after a mode switch, since the other mode configured the same
    /// backend state differently.
    pub fn invalidate_fixed_function(&mut self) {
        for stage in &mut self.stages {
            stage.filter.invalidate();
            stage.combine.invalidate();
            stage.texgen.invalidate();
        }
        self.blend.invalidate();
        self.alpha_test.invalidate();
        self.mode_2d.invalidate();
    }

    /// Record a depth mask change made outside the material path
    pub fn note_depth_mask(&mut self, enabled: bool) {
        self.last_applied.z_write_enable = enabled;
    }

    /// Drop every reference to a destroyed texture
    ///
    /// Material slots holding `handle` are cleared and stages that had
    /// `texture` bound are marked unknown, so the next bind is emitted.
    pub fn forget_texture(&mut self, handle: TextureHandle, texture: BackendTextureId) {
        for slot in self.current.textures.iter_mut().chain(self.last_applied.textures.iter_mut()) {
            if *slot == Some(handle) {
                *slot = None;
            }
        }
        for stage in &mut self.stages {
            if stage.bound.0 == Some(Some(texture)) {
                stage.bound.invalidate();
                stage.filter.invalidate();
            }
        }
    }

    /// Drop every texture reference, after all textures were destroyed
    pub fn forget_all_textures(&mut self) {
        self.current.textures = [None; MATERIAL_MAX_TEXTURES];
        self.last_applied.textures = [None; MATERIAL_MAX_TEXTURES];
        for stage in &mut self.stages {
            stage.bound.invalidate();
            stage.filter.invalidate();
        }
    }

    /// Emit the fixed-function state groups of `material` that differ from `last`
    ///
    /// # Arguments
    /// * `backend` - Backend receiving the changes
    /// * `material` - Material to apply
    /// * `last` - Material the backend currently reflects
    /// * `reset_all` - Emit every group unconditionally
    /// * `textures` - Resolved textures of the usable stages
    /// * `max_anisotropy` - Backend maximum, `None` without anisotropic filtering
    pub fn apply_basic_states(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        material: &Material,
        last: &Material,
        reset_all: bool,
        textures: &[Option<StageTexture>],
        max_anisotropy: Option<f32>,
    ) {
        if reset_all || material.lighting_colors_differ(last) {
            backend.set_material_colors(&MaterialColors {
                ambient: ColorF::from(material.ambient_color).to_array(),
                diffuse: ColorF::from(material.diffuse_color).to_array(),
                specular: ColorF::from(material.specular_color).to_array(),
                emissive: ColorF::from(material.emissive_color).to_array(),
                shininess: material.shininess,
            });
            backend.set_capability(Capability::SeparateSpecular, material.shininess != 0.0);
        }

        self.apply_texture_stages(backend, material, textures, max_anisotropy);

        if reset_all || material.wireframe != last.wireframe || material.point_cloud != last.point_cloud {
            let mode = if material.wireframe {
                PolygonMode::Line
            } else if material.point_cloud {
                PolygonMode::Point
            } else {
                PolygonMode::Fill
            };
            backend.set_polygon_mode(mode);
        }

        if reset_all || material.gouraud_shading != last.gouraud_shading {
            let model = if material.gouraud_shading { ShadeModel::Smooth } else { ShadeModel::Flat };
            backend.set_shade_model(model);
        }

        if reset_all || material.lighting != last.lighting {
            backend.set_capability(Capability::Lighting, material.lighting);
        }

        if reset_all || material.z_buffer != last.z_buffer {
            backend.set_capability(Capability::DepthTest, material.z_buffer);
        }

        if reset_all || material.z_write_enable != last.z_write_enable {
            backend.set_depth_mask(material.z_write_enable);
        }

        if reset_all || material.backface_culling != last.backface_culling {
            if reset_all {
                backend.set_cull_face(CullFace::Back);
            }
            backend.set_capability(Capability::CullFace, material.backface_culling);
        }

        if reset_all || material.fog_enable != last.fog_enable {
            backend.set_capability(Capability::Fog, material.fog_enable);
        }

        if reset_all || material.normalize_normals != last.normalize_normals {
            backend.set_capability(Capability::Normalize, material.normalize_normals);
        }
    }

    /// Bind the material textures and apply their filters
    ///
    /// Evaluated on every 3D application; emits only for stages whose
    /// texture or filter changed.
    pub fn apply_texture_stages(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        material: &Material,
        textures: &[Option<StageTexture>],
        max_anisotropy: Option<f32>,
    ) {
        for (stage, texture) in textures.iter().enumerate().take(MATERIAL_MAX_TEXTURES) {
            self.bind_texture(backend, stage, texture.map(|t| t.id));
            if let Some(texture) = texture {
                let filter = texture_filter_for(material, texture.has_mip_maps, max_anisotropy);
                self.apply_filter(backend, stage, filter);
            }
        }
    }

    /// Bind a texture to a stage
    pub fn bind_texture(&mut self, backend: &mut dyn GraphicsBackend, stage: usize, texture: Option<BackendTextureId>) {
        let Some(state) = self.stages.get_mut(stage) else { return };
        if state.bound.replace(texture) {
            // sampling parameters belong to the texture object
            state.filter.invalidate();
            backend.bind_texture(stage, texture);
        }
    }

    /// Set the sampling parameters of the texture bound to a stage
    pub fn apply_filter(&mut self, backend: &mut dyn GraphicsBackend, stage: usize, filter: TextureFilter) {
        let Some(state) = self.stages.get_mut(stage) else { return };
        if state.filter.replace(filter) {
            backend.set_texture_filter(stage, filter);
        }
    }

    /// Set the texture environment of a stage
    pub fn set_combine(&mut self, backend: &mut dyn GraphicsBackend, stage: usize, combine: TextureCombine) {
        let Some(state) = self.stages.get_mut(stage) else { return };
        if state.combine.replace(combine) {
            backend.set_texture_combine(stage, combine);
        }
    }

    /// Set texture coordinate generation of a stage
    pub fn set_texgen(&mut self, backend: &mut dyn GraphicsBackend, stage: usize, mode: TexGen) {
        let Some(state) = self.stages.get_mut(stage) else { return };
        if state.texgen.replace(mode) {
            backend.set_texgen(stage, mode);
        }
    }

    /// Set blending
    pub fn set_blend(&mut self, backend: &mut dyn GraphicsBackend, mode: BlendMode) {
        if self.blend.replace(mode) {
            backend.set_blend(mode);
        }
    }

    /// Set the alpha test
    pub fn set_alpha_test(&mut self, backend: &mut dyn GraphicsBackend, test: AlphaTest) {
        if self.alpha_test.replace(test) {
            backend.set_alpha_test(test);
        }
    }

    /// Configure texturing and blending for 2D drawing
    ///
    /// `texture` is bound to stage 0 with nearest filtering. The whole group
    /// is skipped when the configuration and texture did not change.
    pub fn set_2d_config(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        texture: Option<BackendTextureId>,
        alpha: bool,
        alpha_channel: bool,
    ) {
        self.bind_texture(backend, 0, texture);

        let config = Mode2DConfig {
            texture: texture.is_some(),
            alpha,
            alpha_channel: alpha_channel && texture.is_some(),
        };
        if texture.is_some() {
            self.apply_filter(backend, 0, TextureFilter::NEAREST);
        }
        if !self.mode_2d.replace(config) {
            return;
        }

        if config.alpha_channel {
            let combine = TextureCombine::MODULATE.with_alpha(CombineOp::Replace, [CombineSource::Texture; 2]);
            self.set_combine(backend, 0, combine);
            self.set_alpha_test(backend, AlphaTest::Disabled);
            self.set_blend(backend, BlendMode::ALPHA);
        } else {
            self.set_combine(backend, 0, TextureCombine::MODULATE);
            self.set_alpha_test(backend, AlphaTest::Disabled);
            self.set_blend(backend, if alpha { BlendMode::ALPHA } else { BlendMode::Disabled });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Dimension2;
    use crate::render::backend::headless::default_info;
    use crate::render::backend::{BackendCall, HeadlessBackend};

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new(default_info(), Dimension2::new(8, 8))
    }

    /// Applying the same material twice emits nothing the second time
    #[test]
    fn test_equal_material_is_idempotent() {
        let mut cache = StateCache::new();
        let mut backend = backend();
        let material = Material::default();
        let textures = [Some(StageTexture {
            id: BackendTextureId(3),
            has_mip_maps: true,
        })];

        cache.apply_basic_states(&mut backend, &material, &material, true, &textures, Some(8.0));
        assert!(backend.count_calls(BackendCall::is_state_change) > 0);

        backend.clear_calls();
        cache.apply_basic_states(&mut backend, &material, &material, false, &textures, Some(8.0));
        assert_eq!(backend.count_calls(BackendCall::is_state_change), 0);
    }

    /// Only the group that changed is emitted
    #[test]
    fn test_single_group_diff() {
        let mut cache = StateCache::new();
        let mut backend = backend();
        let last = Material::default();
        let material = Material {
            wireframe: true,
            ..Material::default()
        };

        cache.apply_basic_states(&mut backend, &material, &last, false, &[], None);

        assert_eq!(backend.calls(), &[BackendCall::SetPolygonMode(PolygonMode::Line)]);
    }

    #[test]
    fn test_filter_selection() {
        let trilinear = Material {
            trilinear_filter: true,
            ..Material::default()
        };
        let filter = texture_filter_for(&trilinear, true, None);
        assert_eq!(filter.min, MinFilter::LinearMipLinear);
        assert_eq!(filter.mag, MagFilter::Linear);

        let nearest = Material {
            bilinear_filter: false,
            anisotropic_filter: true,
            ..Material::default()
        };
        let filter = texture_filter_for(&nearest, false, Some(4.0));
        assert_eq!(filter.min, MinFilter::Nearest);
        assert_eq!(filter.anisotropy, Some(4.0));
    }

    /// Rebinding a texture re-emits its filter
    #[test]
    fn test_rebinding_invalidates_filter() {
        let mut cache = StateCache::new();
        let mut backend = backend();

        cache.bind_texture(&mut backend, 0, Some(BackendTextureId(1)));
        cache.apply_filter(&mut backend, 0, TextureFilter::NEAREST);
        cache.bind_texture(&mut backend, 0, Some(BackendTextureId(2)));
        cache.apply_filter(&mut backend, 0, TextureFilter::NEAREST);

        let filters = backend.count_calls(|call| matches!(call, BackendCall::SetTextureFilter(..)));
        assert_eq!(filters, 2);
    }

    #[test]
    fn test_invalidation_re_emits_blend() {
        let mut cache = StateCache::new();
        let mut backend = backend();

        cache.set_blend(&mut backend, BlendMode::ALPHA);
        cache.set_blend(&mut backend, BlendMode::ALPHA);
        cache.invalidate_fixed_function();
        cache.set_blend(&mut backend, BlendMode::ALPHA);

        assert_eq!(backend.count_calls(|call| matches!(call, BackendCall::SetBlend(_))), 2);
    }
}
