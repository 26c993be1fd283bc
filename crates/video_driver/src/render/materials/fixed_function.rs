//! Fixed-function material renderers
//!
//! These renderers only touch texture environments, texture coordinate
//! generation, blending and the alpha test. The basic material states are
//! applied by the driver before `on_set_material` runs.

use crate::render::backend::{
    AlphaTest, BlendMode, CombineOp, CombineSource, CompareFunc, TexGen, TextureCombine,
};
use crate::render::material::{Material, MaterialTypeId};
use crate::render::types::VideoDriverFeature;

use super::{MaterialRenderer, MaterialRendererServices};

const TEXTURE_PREVIOUS: [CombineSource; 2] = [CombineSource::Texture, CombineSource::Previous];
const TEXTURE_PRIMARY: [CombineSource; 2] = [CombineSource::Texture, CombineSource::PrimaryColor];

fn has_second_stage(services: &dyn MaterialRendererServices) -> bool {
    services.query_feature(VideoDriverFeature::MultiTexture) && services.texture_stage_count() >= 2
}

fn reset_second_stage(services: &mut dyn MaterialRendererServices) {
    if has_second_stage(services) {
        services.set_texture_combine(1, TextureCombine::MODULATE);
        services.set_texgen(1, TexGen::Off);
    }
}

/// Texture modulated by the lit vertex colour
#[derive(Debug, Default)]
pub struct SolidRenderer;

impl MaterialRenderer for SolidRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
    }

    fn name(&self) -> &str {
        "solid"
    }
}

/// Two textures mixed by vertex alpha
#[derive(Debug, Default)]
pub struct Solid2LayerRenderer;

impl MaterialRenderer for Solid2LayerRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        if !has_second_stage(services) {
            services.set_texture_combine(0, TextureCombine::MODULATE);
            return;
        }
        services.set_texture_combine(0, TextureCombine::rgb(CombineOp::Replace, TEXTURE_PREVIOUS));
        services.set_texture_combine(
            1,
            TextureCombine::rgb(CombineOp::Interpolate, TEXTURE_PREVIOUS).with_interpolant(CombineSource::PrimaryColor),
        );
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        reset_second_stage(services);
        services.set_texture_combine(0, TextureCombine::MODULATE);
    }

    fn name(&self) -> &str {
        "solid_2layer"
    }
}

/// Lightmap family
///
/// One instance serves seven consecutive ids. The offset of the material type
/// from `first_id` selects the variant: plain, additive, x2, x4, lit, lit x2
/// and lit x4.
#[derive(Debug)]
pub struct LightmapRenderer {
    first_id: MaterialTypeId,
}

impl LightmapRenderer {
    /// Number of ids the renderer answers for
    pub const VARIANTS: usize = 7;

    /// Renderer whose plain variant is `first_id`
    pub const fn new(first_id: MaterialTypeId) -> Self {
        Self { first_id }
    }

    fn variant(&self, material: &Material) -> i32 {
        (material.material_type.0 - self.first_id.0).clamp(0, Self::VARIANTS as i32 - 1)
    }
}

impl MaterialRenderer for LightmapRenderer {
    fn on_set_material(&self, material: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        let variant = self.variant(material);
        let lit = variant >= 4;

        let first = if lit {
            TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PRIMARY)
        } else {
            TextureCombine::rgb(CombineOp::Replace, TEXTURE_PREVIOUS)
        };
        services.set_texture_combine(0, first);

        if !has_second_stage(services) {
            return;
        }
        let second = match variant {
            1 => TextureCombine::rgb(CombineOp::Add, TEXTURE_PREVIOUS),
            2 | 5 => TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PREVIOUS).with_scale(2),
            3 | 6 => TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PREVIOUS).with_scale(4),
            _ => TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PREVIOUS),
        };
        services.set_texture_combine(1, second);
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        reset_second_stage(services);
        services.set_texture_combine(0, TextureCombine::MODULATE);
    }

    fn name(&self) -> &str {
        "lightmap"
    }
}

/// Base texture with a signed detail texture added
#[derive(Debug, Default)]
pub struct DetailMapRenderer;

impl MaterialRenderer for DetailMapRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
        if has_second_stage(services) {
            services.set_texture_combine(1, TextureCombine::rgb(CombineOp::AddSigned, TEXTURE_PREVIOUS));
        }
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        reset_second_stage(services);
    }

    fn name(&self) -> &str {
        "detail_map"
    }
}

/// Environment map addressed by sphere-mapped coordinates
#[derive(Debug, Default)]
pub struct SphereMapRenderer;

impl MaterialRenderer for SphereMapRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
        services.set_texgen(0, TexGen::SphereMap);
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.set_texgen(0, TexGen::Off);
    }

    fn name(&self) -> &str {
        "sphere_map"
    }
}

/// Texture with a sphere-mapped reflection on the second stage
///
/// With `vertex_alpha` the result is blended by vertex alpha.
#[derive(Debug, Default)]
pub struct Reflection2LayerRenderer {
    vertex_alpha: bool,
}

impl Reflection2LayerRenderer {
    /// Opaque reflection
    pub const fn opaque() -> Self {
        Self { vertex_alpha: false }
    }

    /// Reflection blended by vertex alpha
    pub const fn transparent() -> Self {
        Self { vertex_alpha: true }
    }
}

impl MaterialRenderer for Reflection2LayerRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
        if has_second_stage(services) {
            let mut second = TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PREVIOUS);
            if self.vertex_alpha {
                second = second.with_alpha(CombineOp::Replace, [CombineSource::PrimaryColor; 2]);
            }
            services.set_texture_combine(1, second);
            services.set_texgen(1, TexGen::SphereMap);
        }
        if self.vertex_alpha {
            services.set_blend(BlendMode::ALPHA);
        }
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        reset_second_stage(services);
        if self.vertex_alpha {
            services.set_blend(BlendMode::Disabled);
        }
    }

    fn is_transparent(&self) -> bool {
        self.vertex_alpha
    }

    fn name(&self) -> &str {
        if self.vertex_alpha {
            "trans_reflection_2layer"
        } else {
            "reflection_2layer"
        }
    }
}

/// Additive blending
#[derive(Debug, Default)]
pub struct TransparentAddColorRenderer;

impl MaterialRenderer for TransparentAddColorRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
        services.set_blend(BlendMode::ADD_COLOR);
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.set_blend(BlendMode::Disabled);
    }

    fn is_transparent(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "trans_add"
    }
}

/// Blending by texture alpha
///
/// `material_type_param` is the alpha test reference; texels at or below it
/// are discarded.
#[derive(Debug, Default)]
pub struct TransparentAlphaChannelRenderer;

impl MaterialRenderer for TransparentAlphaChannelRenderer {
    fn on_set_material(&self, material: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(
            0,
            TextureCombine::MODULATE.with_alpha(CombineOp::Replace, [CombineSource::Texture; 2]),
        );
        services.set_blend(BlendMode::ALPHA);
        services.set_alpha_test(AlphaTest::Enabled {
            func: CompareFunc::Greater,
            reference: material.material_type_param.clamp(0.0, 1.0),
        });
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.set_alpha_test(AlphaTest::Disabled);
        services.set_blend(BlendMode::Disabled);
        services.set_texture_combine(0, TextureCombine::MODULATE);
    }

    fn is_transparent(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "trans_alphach"
    }
}

/// Texture alpha cut-out without blending
#[derive(Debug, Default)]
pub struct TransparentAlphaChannelRefRenderer;

impl MaterialRenderer for TransparentAlphaChannelRefRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(0, TextureCombine::MODULATE);
        services.set_alpha_test(AlphaTest::Enabled {
            func: CompareFunc::Greater,
            reference: 0.5,
        });
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.set_alpha_test(AlphaTest::Disabled);
    }

    fn name(&self) -> &str {
        "trans_alphach_ref"
    }
}

/// Blending by vertex alpha
#[derive(Debug, Default)]
pub struct TransparentVertexAlphaRenderer;

impl MaterialRenderer for TransparentVertexAlphaRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, services: &mut dyn MaterialRendererServices) {
        services.set_texture_combine(
            0,
            TextureCombine::MODULATE.with_alpha(CombineOp::Replace, [CombineSource::PrimaryColor; 2]),
        );
        services.set_blend(BlendMode::ALPHA);
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        services.set_blend(BlendMode::Disabled);
        services.set_texture_combine(0, TextureCombine::MODULATE);
    }

    fn is_transparent(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "trans_vertex_alpha"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::materials::test_support::{RecordingServices, ServiceCall};

    fn lightmap_material(id: i32) -> Material {
        Material::with_type(MaterialTypeId(id))
    }

    #[test]
    fn test_lightmap_variants_scale_second_stage() {
        let renderer = LightmapRenderer::new(MaterialTypeId(2));
        let mut services = RecordingServices::default();

        renderer.on_set_material(&lightmap_material(5), &Material::default(), true, &mut services);

        let expected = TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PREVIOUS).with_scale(4);
        assert!(services.calls.contains(&ServiceCall::Combine(1, expected)));
    }

    #[test]
    fn test_lit_lightmap_modulates_first_stage() {
        let renderer = LightmapRenderer::new(MaterialTypeId(2));
        let mut services = RecordingServices::default();

        renderer.on_set_material(&lightmap_material(6), &Material::default(), true, &mut services);

        assert_eq!(
            services.calls[0],
            ServiceCall::Combine(0, TextureCombine::rgb(CombineOp::Modulate, TEXTURE_PRIMARY))
        );
    }

    #[test]
    fn test_alpha_channel_uses_param_as_reference() {
        let renderer = TransparentAlphaChannelRenderer;
        let mut services = RecordingServices::default();
        let material = Material {
            material_type_param: 0.25,
            ..Material::default()
        };

        renderer.on_set_material(&material, &Material::default(), false, &mut services);

        assert!(services.calls.contains(&ServiceCall::Blend(BlendMode::ALPHA)));
        assert!(services.calls.contains(&ServiceCall::AlphaTest(AlphaTest::Enabled {
            func: CompareFunc::Greater,
            reference: 0.25,
        })));
        assert!(renderer.is_transparent());
    }

    #[test]
    fn test_unset_restores_blend() {
        let renderer = TransparentAddColorRenderer;
        let mut services = RecordingServices::default();

        renderer.on_set_material(&Material::default(), &Material::default(), false, &mut services);
        renderer.on_unset_material(&mut services);

        assert_eq!(services.calls.last(), Some(&ServiceCall::Blend(BlendMode::Disabled)));
    }

    #[test]
    fn test_sphere_map_toggles_texgen() {
        let renderer = SphereMapRenderer;
        let mut services = RecordingServices::default();

        renderer.on_set_material(&Material::default(), &Material::default(), false, &mut services);
        renderer.on_unset_material(&mut services);

        assert!(services.calls.contains(&ServiceCall::TexGen(0, TexGen::SphereMap)));
        assert_eq!(services.calls.last(), Some(&ServiceCall::TexGen(0, TexGen::Off)));
    }
}
