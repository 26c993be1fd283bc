//! Material description
//!
//! A [`Material`] is a plain value describing how geometry is shaded. The
//! driver keeps the material most recently set and the one most recently
//! applied, and compares the two field by field to find what changed.

use crate::foundation::color::Color;
use crate::render::resources::TextureHandle;

/// Number of texture slots a material carries
pub const MATERIAL_MAX_TEXTURES: usize = 4;

/// Material type id
///
/// Indexes the material renderer registry. Ids outside the registered range
/// select no renderer and the material is drawn with basic states only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialTypeId(pub i32);

impl MaterialTypeId {
    /// Id that never names a renderer
    pub const NONE: MaterialTypeId = MaterialTypeId(-1);
}

/// Shading description for a draw call
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Renderer that implements this material
    pub material_type: MaterialTypeId,
    /// Free parameter interpreted by the renderer (alpha reference, parallax height)
    pub material_type_param: f32,
    /// Textures bound to stages 0..MATERIAL_MAX_TEXTURES
    pub textures: [Option<TextureHandle>; MATERIAL_MAX_TEXTURES],
    /// Ambient reflection
    pub ambient_color: Color,
    /// Diffuse reflection
    pub diffuse_color: Color,
    /// Specular reflection
    pub specular_color: Color,
    /// Light emitted by the surface
    pub emissive_color: Color,
    /// Specular exponent; 0 disables the separate specular colour
    pub shininess: f32,
    /// Draw triangle edges only
    pub wireframe: bool,
    /// Draw vertices only
    pub point_cloud: bool,
    /// Smooth shading instead of flat shading
    pub gouraud_shading: bool,
    /// Fixed-function lighting
    pub lighting: bool,
    /// Depth test
    pub z_buffer: bool,
    /// Depth writes
    pub z_write_enable: bool,
    /// Cull back faces
    pub backface_culling: bool,
    /// Bilinear texture filtering
    pub bilinear_filter: bool,
    /// Trilinear texture filtering
    pub trilinear_filter: bool,
    /// Anisotropic texture filtering
    pub anisotropic_filter: bool,
    /// Apply the driver fog
    pub fog_enable: bool,
    /// Renormalise normals after transformation
    pub normalize_normals: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            material_type: MaterialTypeId(0),
            material_type_param: 0.0,
            textures: [None; MATERIAL_MAX_TEXTURES],
            ambient_color: Color::WHITE,
            diffuse_color: Color::WHITE,
            specular_color: Color::WHITE,
            emissive_color: Color::TRANSPARENT,
            shininess: 0.0,
            wireframe: false,
            point_cloud: false,
            gouraud_shading: true,
            lighting: true,
            z_buffer: true,
            z_write_enable: true,
            backface_culling: true,
            bilinear_filter: true,
            trilinear_filter: false,
            anisotropic_filter: false,
            fog_enable: false,
            normalize_normals: false,
        }
    }
}

impl Material {
    /// Material of the given type with default parameters
    pub fn with_type(material_type: MaterialTypeId) -> Self {
        Self {
            material_type,
            ..Self::default()
        }
    }

    /// Builder-style texture assignment
    pub fn with_texture(mut self, stage: usize, texture: TextureHandle) -> Self {
        if let Some(slot) = self.textures.get_mut(stage) {
            *slot = Some(texture);
        }
        self
    }

    /// True when any of the lighting colour group differs
    pub(crate) fn lighting_colors_differ(&self, other: &Material) -> bool {
        self.ambient_color != other.ambient_color
            || self.diffuse_color != other.diffuse_color
            || self.specular_color != other.specular_color
            || self.emissive_color != other.emissive_color
            || self.shininess != other.shininess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_is_solid_and_lit() {
        let material = Material::default();

        assert_eq!(material.material_type, MaterialTypeId(0));
        assert!(material.lighting);
        assert!(material.z_buffer);
        assert!(material.z_write_enable);
        assert!(material.textures.iter().all(Option::is_none));
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = Material::default();
        let mut b = Material::default();
        assert_eq!(a, b);

        b.fog_enable = true;
        assert_ne!(a, b);
    }

    #[test]
    fn test_lighting_color_group() {
        let a = Material::default();
        let mut b = a.clone();
        b.wireframe = true;
        assert!(!a.lighting_colors_differ(&b));

        b.shininess = 20.0;
        assert!(a.lighting_colors_differ(&b));
    }
}
