//! Ids of the built-in material renderers
//!
//! The driver registers the built-in renderers in declaration order, so each
//! one lands at `base + index`. Custom renderers follow after the last one.

use crate::render::material::MaterialTypeId;

/// Built-in material types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinMaterial {
    /// Single texture, lit
    Solid,
    /// Two textures blended by vertex alpha
    Solid2Layer,
    /// Texture times lightmap
    Lightmap,
    /// Texture plus lightmap
    LightmapAdd,
    /// Texture times lightmap, doubled
    LightmapM2,
    /// Texture times lightmap, quadrupled
    LightmapM4,
    /// Lit texture times lightmap
    LightmapLighting,
    /// Lit texture times lightmap, doubled
    LightmapLightingM2,
    /// Lit texture times lightmap, quadrupled
    LightmapLightingM4,
    /// Texture with a signed detail texture added
    DetailMap,
    /// Sphere environment map
    SphereMap,
    /// Texture with a sphere-mapped reflection
    Reflection2Layer,
    /// Additive transparency
    TransparentAddColor,
    /// Texture alpha blending
    TransparentAlphaChannel,
    /// Texture alpha cut-out
    TransparentAlphaChannelRef,
    /// Vertex alpha blending
    TransparentVertexAlpha,
    /// Reflection blended by vertex alpha
    TransparentReflection2Layer,
    /// Normal map over solid
    NormalMapSolid,
    /// Normal map over additive transparency
    NormalMapTransparentAddColor,
    /// Normal map over vertex alpha blending
    NormalMapTransparentVertexAlpha,
    /// Parallax map over solid
    ParallaxMapSolid,
    /// Parallax map over additive transparency
    ParallaxMapTransparentAddColor,
    /// Parallax map over vertex alpha blending
    ParallaxMapTransparentVertexAlpha,
}

impl BuiltinMaterial {
    /// Number of built-in material types
    pub const COUNT: usize = 23;

    /// All built-ins in registration order
    pub const ALL: [BuiltinMaterial; Self::COUNT] = [
        Self::Solid,
        Self::Solid2Layer,
        Self::Lightmap,
        Self::LightmapAdd,
        Self::LightmapM2,
        Self::LightmapM4,
        Self::LightmapLighting,
        Self::LightmapLightingM2,
        Self::LightmapLightingM4,
        Self::DetailMap,
        Self::SphereMap,
        Self::Reflection2Layer,
        Self::TransparentAddColor,
        Self::TransparentAlphaChannel,
        Self::TransparentAlphaChannelRef,
        Self::TransparentVertexAlpha,
        Self::TransparentReflection2Layer,
        Self::NormalMapSolid,
        Self::NormalMapTransparentAddColor,
        Self::NormalMapTransparentVertexAlpha,
        Self::ParallaxMapSolid,
        Self::ParallaxMapTransparentAddColor,
        Self::ParallaxMapTransparentVertexAlpha,
    ];

    /// Position in registration order
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Material type id when the registry starts at `base`
    pub fn id(self, base: i32) -> MaterialTypeId {
        MaterialTypeId(base + self.index() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_registration_order() {
        assert_eq!(BuiltinMaterial::Solid.id(0), MaterialTypeId(0));
        assert_eq!(BuiltinMaterial::LightmapLightingM4.id(0), MaterialTypeId(8));
        assert_eq!(BuiltinMaterial::TransparentReflection2Layer.id(0), MaterialTypeId(16));
        assert_eq!(BuiltinMaterial::ParallaxMapTransparentVertexAlpha.id(10), MaterialTypeId(32));
    }
}
