//! Small enums and flag sets shared across the driver

use bitflags::bitflags;

/// Transformation slots held by the driver
///
/// World, view and projection feed the 3D pipeline. The texture slots are
/// per-stage texture matrices that are uploaded at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformSlot {
    /// Object to world space
    World,
    /// World to camera space
    View,
    /// Camera to clip space
    Projection,
    /// Texture matrix of stage 0
    Texture0,
    /// Texture matrix of stage 1
    Texture1,
    /// Texture matrix of stage 2
    Texture2,
    /// Texture matrix of stage 3
    Texture3,
}

impl TransformSlot {
    /// Number of slots
    pub const COUNT: usize = 7;

    /// Dense index of the slot
    pub const fn index(self) -> usize {
        match self {
            Self::World => 0,
            Self::View => 1,
            Self::Projection => 2,
            Self::Texture0 => 3,
            Self::Texture1 => 4,
            Self::Texture2 => 5,
            Self::Texture3 => 6,
        }
    }

    /// Texture stage of a texture slot
    pub const fn texture_stage(self) -> Option<usize> {
        match self {
            Self::Texture0 => Some(0),
            Self::Texture1 => Some(1),
            Self::Texture2 => Some(2),
            Self::Texture3 => Some(3),
            _ => None,
        }
    }

    /// Texture slot for a stage
    pub const fn for_texture_stage(stage: usize) -> Option<Self> {
        match stage {
            0 => Some(Self::Texture0),
            1 => Some(Self::Texture1),
            2 => Some(Self::Texture2),
            3 => Some(Self::Texture3),
            _ => None,
        }
    }
}

/// Rendering mode the backend is currently configured for
///
/// Switching between 2D and 3D resets the backend state because the two modes
/// use incompatible defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Nothing has been drawn since initialisation
    #[default]
    Unset,
    /// Screen-space drawing with identity matrices
    Mode2D,
    /// Transformed, lit, material-driven drawing
    Mode3D,
}

/// Features that can be queried with `VideoDriver::query_feature`
///
/// Every flag resolves to a value probed from the backend at initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoDriverFeature {
    /// Bilinear texture filtering
    BilinearFilter,
    /// Rendering into textures
    RenderToTarget,
    /// Mip mapped textures
    MipMap,
    /// A stencil buffer is attached to the context
    StencilBuffer,
    /// First generation assembly vertex programs
    VertexProgram1,
    /// First generation assembly fragment programs
    FragmentProgram1,
    /// High-level shading language programs
    HighLevelShaders,
    /// More than one texture stage
    MultiTexture,
    /// Anisotropic texture filtering
    AnisotropicFilter,
    /// Textures whose sides are not powers of two
    NonPowerOfTwoTextures,
}

/// Vertex layouts accepted by the indexed draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexType {
    /// Position, normal, colour and one texture coordinate set
    Standard,
    /// Standard layout plus a second texture coordinate set
    TwoTCoords,
    /// Standard layout plus tangent and binormal
    Tangents,
}

/// Primitive assembly mode of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Independent triangles
    Triangles,
    /// Triangle fan around the first vertex
    TriangleFan,
    /// Triangle strip
    TriangleStrip,
    /// Independent line segments
    Lines,
    /// Independent quads
    Quads,
}

bitflags! {
    /// Flags controlling how textures are created
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureCreationFlags: u32 {
        /// Quantise texels to 16 bits
        const ALWAYS_16_BIT = 1 << 0;
        /// Keep texels at 32 bits
        const ALWAYS_32_BIT = 1 << 1;
        /// Prefer quality over speed
        const OPTIMIZED_FOR_QUALITY = 1 << 2;
        /// Prefer speed over quality
        const OPTIMIZED_FOR_SPEED = 1 << 3;
        /// Generate a mip map chain
        const CREATE_MIP_MAPS = 1 << 4;
    }
}

bitflags! {
    /// Buffers cleared by `GraphicsBackend::clear`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Colour buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// Per-frame drawing statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames presented since the driver was created
    pub frame: u64,
    /// Primitives submitted in the current frame
    pub primitives_drawn: u32,
    /// Draw calls issued in the current frame
    pub draw_calls: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_slot_indices_are_dense() {
        let slots = [
            TransformSlot::World,
            TransformSlot::View,
            TransformSlot::Projection,
            TransformSlot::Texture0,
            TransformSlot::Texture1,
            TransformSlot::Texture2,
            TransformSlot::Texture3,
        ];

        for (expected, slot) in slots.iter().enumerate() {
            assert_eq!(slot.index(), expected);
        }
        assert_eq!(slots.len(), TransformSlot::COUNT);
    }

    #[test]
    fn test_texture_slot_round_trip() {
        for stage in 0..4 {
            let slot = TransformSlot::for_texture_stage(stage).unwrap();
            assert_eq!(slot.texture_stage(), Some(stage));
        }
        assert_eq!(TransformSlot::for_texture_stage(4), None);
        assert_eq!(TransformSlot::World.texture_stage(), None);
    }
}
