//! Vertex formats
//!
//! Vertices are `#[repr(C)]` plain-old-data so a slice of them can be handed to
//! a backend as raw bytes together with a [`VertexLayout`] describing where
//! each attribute lives.

use bytemuck::{Pod, Zeroable};

use crate::foundation::color::Color;
use crate::render::types::VertexType;

/// Standard vertex: position, normal, colour, one texture coordinate set
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex3D {
    /// Position in object space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Vertex colour
    pub color: Color,
    /// Texture coordinates
    pub tcoords: [f32; 2],
}

impl Vertex3D {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: Color, tcoords: [f32; 2]) -> Self {
        Self { position, normal, color, tcoords }
    }
}

/// Vertex with a second texture coordinate set, used by lightmaps
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex2TCoords {
    /// Position in object space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Vertex colour
    pub color: Color,
    /// First texture coordinate set
    pub tcoords: [f32; 2],
    /// Second texture coordinate set
    pub tcoords2: [f32; 2],
}

/// Vertex with a tangent frame, used by normal and parallax mapping
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexTangents {
    /// Position in object space
    pub position: [f32; 3],
    /// Surface normal
    pub normal: [f32; 3],
    /// Vertex colour
    pub color: Color,
    /// Texture coordinates
    pub tcoords: [f32; 2],
    /// Tangent vector
    pub tangent: [f32; 3],
    /// Binormal vector
    pub binormal: [f32; 3],
}

/// Byte offsets of the vertex attributes inside one vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Size of one vertex in bytes
    pub stride: usize,
    /// Offset of the position (3 floats)
    pub position: usize,
    /// Offset of the normal (3 floats)
    pub normal: usize,
    /// Offsets and component counts of the texture coordinate sets by stage
    ///
    /// Tangent vertices feed their tangent and binormal through stages 1 and 2.
    pub texcoords: &'static [(usize, usize)],
}

impl VertexType {
    /// Attribute layout of this vertex type
    pub const fn layout(self) -> VertexLayout {
        match self {
            Self::Standard => VertexLayout {
                stride: std::mem::size_of::<Vertex3D>(),
                position: 0,
                normal: 12,
                texcoords: &[(28, 2)],
            },
            Self::TwoTCoords => VertexLayout {
                stride: std::mem::size_of::<Vertex2TCoords>(),
                position: 0,
                normal: 12,
                texcoords: &[(28, 2), (36, 2)],
            },
            Self::Tangents => VertexLayout {
                stride: std::mem::size_of::<VertexTangents>(),
                position: 0,
                normal: 12,
                texcoords: &[(28, 2), (36, 3), (48, 3)],
            },
        }
    }
}

/// Vertex accepted by the indexed draw calls
pub trait Vertex: Pod {
    /// Layout tag of the vertex
    const VERTEX_TYPE: VertexType;

    /// Vertex colour
    fn color(&self) -> Color;

    /// Object space position
    fn position(&self) -> [f32; 3];
}

impl Vertex for Vertex3D {
    const VERTEX_TYPE: VertexType = VertexType::Standard;

    fn color(&self) -> Color {
        self.color
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

impl Vertex for Vertex2TCoords {
    const VERTEX_TYPE: VertexType = VertexType::TwoTCoords;

    fn color(&self) -> Color {
        self.color
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

impl Vertex for VertexTangents {
    const VERTEX_TYPE: VertexType = VertexType::Tangents;

    fn color(&self) -> Color {
        self.color
    }

    fn position(&self) -> [f32; 3] {
        self.position
    }
}

/// Packed vertex data handed to `GraphicsBackend::draw_indexed`
///
/// Colours are delivered separately, already converted to the backend's
/// R, G, B, A byte order.
#[derive(Debug, Clone, Copy)]
pub struct VertexStream<'a> {
    /// Layout tag of `data`
    pub vertex_type: VertexType,
    /// Raw vertex bytes
    pub data: &'a [u8],
    /// One backend-ordered colour per vertex
    pub colors: &'a [[u8; 4]],
}

impl VertexStream<'_> {
    /// Number of vertices in the stream
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.vertex_type.layout().stride
    }

    /// Position of vertex `index`
    pub fn position(&self, index: usize) -> Option<[f32; 3]> {
        let layout = self.vertex_type.layout();
        let start = index * layout.stride + layout.position;
        let bytes = self.data.get(start..start + 12)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

/// Vertex of immediate-mode draws (2D quads, lines, shadow volumes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImmediateVertex {
    /// Position; 2D draws pass normalised device coordinates with z = 0
    pub position: [f32; 3],
    /// Backend-ordered colour
    pub color: [u8; 4],
    /// Texture coordinates of stage 0
    pub tcoords: [f32; 2],
}

impl ImmediateVertex {
    /// Untextured vertex
    pub const fn colored(position: [f32; 3], color: [u8; 4]) -> Self {
        Self { position, color, tcoords: [0.0, 0.0] }
    }

    /// Textured vertex
    pub const fn textured(position: [f32; 3], color: [u8; 4], tcoords: [f32; 2]) -> Self {
        Self { position, color, tcoords }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strides_match_struct_sizes() {
        assert_eq!(VertexType::Standard.layout().stride, 36);
        assert_eq!(VertexType::TwoTCoords.layout().stride, 44);
        assert_eq!(VertexType::Tangents.layout().stride, 60);
    }

    #[test]
    fn test_stream_reads_positions() {
        let vertices = [
            Vertex3D::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], Color::WHITE, [0.0, 0.0]),
            Vertex3D::new([4.0, 5.0, 6.0], [0.0, 1.0, 0.0], Color::BLACK, [1.0, 1.0]),
        ];
        let colors = [[255; 4]; 2];
        let stream = VertexStream {
            vertex_type: VertexType::Standard,
            data: bytemuck::cast_slice(&vertices),
            colors: &colors,
        };

        assert_eq!(stream.vertex_count(), 2);
        assert_eq!(stream.position(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(stream.position(2), None);
    }

    #[test]
    fn test_tangent_offsets_follow_fields() {
        let layout = VertexType::Tangents.layout();
        let vertex = VertexTangents {
            tangent: [7.0, 8.0, 9.0],
            ..VertexTangents::default()
        };
        let bytes = bytemuck::bytes_of(&vertex);
        let (offset, components) = layout.texcoords[1];
        let tangent: [f32; 3] = bytemuck::pod_read_unaligned(&bytes[offset..offset + components * 4]);

        assert_eq!(tangent, [7.0, 8.0, 9.0]);
    }
}
