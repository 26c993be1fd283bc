//! 3D drawing and stencil shadows

use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{BlendMode, Capability, CompareFunc, CullFace, MatrixMode, StencilOp, StencilState};
use crate::render::types::{ClearFlags, PrimitiveType, RenderMode, VertexType};
use crate::render::vertex::{ImmediateVertex, Vertex, VertexStream};

use super::VideoDriver;

const SHADOW_QUAD_EXTENT: f32 = 10.1;

impl VideoDriver {
    /// Draw an indexed triangle list
    ///
    /// `triangle_count` is clamped to the triangles `indices` can describe.
    pub fn draw_indexed_triangle_list<V: Vertex>(&mut self, vertices: &[V], indices: &[u16], triangle_count: usize) {
        let count = triangle_count.min(indices.len() / 3);
        self.draw_indexed(vertices, indices, count, count * 3, PrimitiveType::Triangles);
    }

    /// Draw an indexed triangle fan
    ///
    /// `triangle_count` is clamped to the triangles `indices` can describe.
    pub fn draw_indexed_triangle_fan<V: Vertex>(&mut self, vertices: &[V], indices: &[u16], triangle_count: usize) {
        let count = triangle_count.min(indices.len().saturating_sub(2));
        self.draw_indexed(vertices, indices, count, count + 2, PrimitiveType::TriangleFan);
    }

    fn draw_indexed<V: Vertex>(
        &mut self,
        vertices: &[V],
        indices: &[u16],
        primitive_count: usize,
        index_count: usize,
        primitive: PrimitiveType,
    ) {
        if primitive_count == 0 || vertices.is_empty() {
            log::trace!("Skipping empty draw");
            return;
        }
        let limit = usize::try_from(self.config.max_primitives_per_call).unwrap_or(usize::MAX);
        if primitive_count > limit {
            log::warn!("Draw of {primitive_count} primitives exceeds the limit of {limit}, skipping");
            return;
        }

        let indices = &indices[..index_count];
        if let Some(&bad) = indices.iter().find(|&&index| usize::from(index) >= vertices.len()) {
            log::error!("Index {bad} is out of range for {} vertices, skipping draw", vertices.len());
            return;
        }

        if !self.prepare_3d(V::VERTEX_TYPE) {
            log::trace!("Draw vetoed by the material renderer");
            return;
        }

        let colors: Vec<[u8; 4]> = vertices.iter().map(|v| v.color().to_backend_rgba()).collect();
        let stream = VertexStream {
            vertex_type: V::VERTEX_TYPE,
            data: bytemuck::cast_slice(vertices),
            colors: &colors,
        };
        self.backend.draw_indexed(&stream, primitive, indices);
        self.record_draw(primitive_count);
    }

    /// Draw a line in world space with the current transforms
    pub fn draw_3d_line(&mut self, start: Vec3, end: Vec3, color: Color) {
        if !self.prepare_3d(VertexType::Standard) {
            return;
        }
        let rgba = color.to_backend_rgba();
        let vertices = [
            ImmediateVertex::colored([start.x, start.y, start.z], rgba),
            ImmediateVertex::colored([end.x, end.y, end.z], rgba),
        ];
        self.backend.draw_immediate(PrimitiveType::Lines, &vertices);
        self.record_draw(1);
    }

    /// Render a shadow volume into the stencil buffer
    ///
    /// # Arguments
    /// * `triangles` - Volume triangles in world space, three points each
    /// * `zfail` - Use the depth-fail method, needed when the camera may be
    ///   inside the volume
    pub fn draw_stencil_shadow_volume(&mut self, triangles: &[Vec3], zfail: bool) {
        if !self.caps.stencil_buffer || triangles.len() < 3 {
            return;
        }

        if self.cache.mode() == RenderMode::Mode3D {
            self.unset_active_renderer();
            self.cache.request_reset();
        }

        let vertices: Vec<ImmediateVertex> = triangles
            .iter()
            .map(|p| ImmediateVertex::colored([p.x, p.y, p.z], [0, 0, 0, 255]))
            .collect();

        let backend = self.backend.as_mut();
        backend.push_state();
        backend.set_capability(Capability::Lighting, false);
        backend.set_capability(Capability::Fog, false);
        backend.set_depth_mask(false);
        backend.set_capability(Capability::StencilTest, true);
        backend.set_color_mask(false);
        backend.set_capability(Capability::CullFace, true);

        let passes = if zfail {
            [
                ([StencilOp::Keep, StencilOp::Increment, StencilOp::Keep], CullFace::Front),
                ([StencilOp::Keep, StencilOp::Decrement, StencilOp::Keep], CullFace::Back),
            ]
        } else {
            [
                ([StencilOp::Keep, StencilOp::Keep, StencilOp::Increment], CullFace::Back),
                ([StencilOp::Keep, StencilOp::Keep, StencilOp::Decrement], CullFace::Front),
            ]
        };
        for (ops, cull) in passes {
            backend.set_stencil(StencilState {
                func: CompareFunc::Always,
                reference: 1,
                ops,
            });
            backend.set_cull_face(cull);
            backend.draw_immediate(PrimitiveType::Triangles, &vertices);
        }

        backend.pop_state();
        self.cache.request_reset();
        self.record_draw(triangles.len() / 3 * 2);
    }

    /// Darken the stencilled shadow area with a screen-filling quad
    ///
    /// # Arguments
    /// * `clear_stencil` - Clear the stencil buffer afterwards
    /// * `colors` - Shadow colour at the upper left, upper right, lower left and lower right corner
    pub fn draw_stencil_shadow(&mut self, clear_stencil: bool, colors: [Color; 4]) {
        if !self.caps.stencil_buffer {
            return;
        }

        for stage in 0..self.texture_stage_count() {
            self.cache.bind_texture(self.backend.as_mut(), stage, None);
        }

        let [left_up, right_up, left_down, right_down] = colors;
        let e = SHADOW_QUAD_EXTENT;
        let vertices = [
            ImmediateVertex::colored([-e, e, 0.9], left_up.to_backend_rgba()),
            ImmediateVertex::colored([-e, -e, 0.9], left_down.to_backend_rgba()),
            ImmediateVertex::colored([e, e, 0.9], right_up.to_backend_rgba()),
            ImmediateVertex::colored([e, -e, 0.9], right_down.to_backend_rgba()),
        ];
        let identity = Mat4::identity();

        let backend = self.backend.as_mut();
        backend.push_state();
        backend.set_capability(Capability::Lighting, false);
        backend.set_depth_mask(false);
        backend.set_capability(Capability::StencilTest, true);
        backend.set_color_mask(true);
        backend.set_blend(BlendMode::ALPHA);
        backend.set_stencil(StencilState {
            func: CompareFunc::NotEqual,
            reference: 0,
            ops: [StencilOp::Keep; 3],
        });
        backend.set_capability(Capability::Fog, false);
        backend.load_matrix(MatrixMode::ModelView, &identity);
        backend.load_matrix(MatrixMode::Projection, &identity);

        backend.draw_immediate(PrimitiveType::TriangleStrip, &vertices);

        if clear_stencil {
            backend.clear(ClearFlags::STENCIL, Color::TRANSPARENT);
        }
        backend.pop_state();

        self.cache.request_reset();
        self.record_draw(2);
    }
}
