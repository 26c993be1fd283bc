//! Normal and parallax map renderers
//!
//! Per-pixel lighting with up to two dynamic lights, implemented with
//! assembly vertex and fragment programs. Geometry must use tangent
//! vertices: the tangent and binormal arrive in texture coordinate sets 1
//! and 2. Without program support the renderer draws like its base renderer.
//!
//! Vertex program locals:
//! - 0..=3 rows of world x view x projection
//! - 4, 6 light positions in object space
//! - 5, 7 light colours, w holding 1 / radius^2
//! - 8 eye position in object space (parallax only)
//!
//! Fragment program local 0 holds the parallax height scale.

use std::cell::Cell;
use std::rc::Rc;

use crate::foundation::math::{Mat4, Vec4};
use crate::render::backend::ProgramStage;
use crate::render::material::Material;
use crate::render::resources::ProgramHandle;
use crate::render::types::{TransformSlot, VertexType, VideoDriverFeature};

use super::{MaterialRenderer, MaterialRendererServices};

const NORMAL_MAP_VERTEX_PROGRAM: &str = "!!ARBvp1.0
PARAM mvp[4] = { program.local[0..3] };
PARAM light0 = program.local[4];
PARAM color0 = program.local[5];
PARAM light1 = program.local[6];
PARAM color1 = program.local[7];
ATTRIB pos = vertex.position;
ATTRIB tangent = vertex.texcoord[1];
ATTRIB binormal = vertex.texcoord[2];
TEMP dir, len;
DP4 result.position.x, mvp[0], pos;
DP4 result.position.y, mvp[1], pos;
DP4 result.position.z, mvp[2], pos;
DP4 result.position.w, mvp[3], pos;
MOV result.texcoord[0], vertex.texcoord[0];
SUB dir, light0, pos;
DP3 result.texcoord[1].x, tangent, dir;
DP3 result.texcoord[1].y, binormal, dir;
DP3 result.texcoord[1].z, vertex.normal, dir;
DP3 len, dir, dir;
MUL len, len, color0.w;
SUB len, 1.0, len;
MUL result.color.primary, color0, len;
SUB dir, light1, pos;
DP3 result.texcoord[2].x, tangent, dir;
DP3 result.texcoord[2].y, binormal, dir;
DP3 result.texcoord[2].z, vertex.normal, dir;
DP3 len, dir, dir;
MUL len, len, color1.w;
SUB len, 1.0, len;
MUL result.color.secondary, color1, len;
END";

const NORMAL_MAP_FRAGMENT_PROGRAM: &str = "!!ARBfp1.0
TEMP base, normal, dir, light;
TEX base, fragment.texcoord[0], texture[0], 2D;
TEX normal, fragment.texcoord[0], texture[1], 2D;
MAD normal, normal, 2.0, -1.0;
DP3 dir.w, fragment.texcoord[1], fragment.texcoord[1];
RSQ dir.w, dir.w;
MUL dir, fragment.texcoord[1], dir.w;
DP3_SAT light, normal, dir;
MUL light, light, fragment.color.primary;
DP3 dir.w, fragment.texcoord[2], fragment.texcoord[2];
RSQ dir.w, dir.w;
MUL dir, fragment.texcoord[2], dir.w;
DP3_SAT dir, normal, dir;
MAD light, dir, fragment.color.secondary, light;
MUL result.color.xyz, base, light;
MOV result.color.w, fragment.color.primary.w;
END";

const PARALLAX_VERTEX_PROGRAM: &str = "!!ARBvp1.0
PARAM mvp[4] = { program.local[0..3] };
PARAM light0 = program.local[4];
PARAM color0 = program.local[5];
PARAM light1 = program.local[6];
PARAM color1 = program.local[7];
PARAM eye = program.local[8];
ATTRIB pos = vertex.position;
ATTRIB tangent = vertex.texcoord[1];
ATTRIB binormal = vertex.texcoord[2];
TEMP dir, len;
DP4 result.position.x, mvp[0], pos;
DP4 result.position.y, mvp[1], pos;
DP4 result.position.z, mvp[2], pos;
DP4 result.position.w, mvp[3], pos;
MOV result.texcoord[0], vertex.texcoord[0];
SUB dir, light0, pos;
DP3 result.texcoord[1].x, tangent, dir;
DP3 result.texcoord[1].y, binormal, dir;
DP3 result.texcoord[1].z, vertex.normal, dir;
DP3 len, dir, dir;
MUL len, len, color0.w;
SUB len, 1.0, len;
MUL result.color.primary, color0, len;
SUB dir, light1, pos;
DP3 result.texcoord[2].x, tangent, dir;
DP3 result.texcoord[2].y, binormal, dir;
DP3 result.texcoord[2].z, vertex.normal, dir;
DP3 len, dir, dir;
MUL len, len, color1.w;
SUB len, 1.0, len;
MUL result.color.secondary, color1, len;
SUB dir, eye, pos;
DP3 result.texcoord[3].x, tangent, dir;
DP3 result.texcoord[3].y, binormal, dir;
DP3 result.texcoord[3].z, vertex.normal, dir;
END";

const PARALLAX_FRAGMENT_PROGRAM: &str = "!!ARBfp1.0
PARAM scale = program.local[0];
TEMP base, normal, dir, light, eye, coord;
DP3 eye.w, fragment.texcoord[3], fragment.texcoord[3];
RSQ eye.w, eye.w;
MUL eye, fragment.texcoord[3], eye.w;
TEX normal, fragment.texcoord[0], texture[1], 2D;
MAD normal.w, normal.w, scale.x, -scale.y;
MAD coord, eye, normal.w, fragment.texcoord[0];
TEX base, coord, texture[0], 2D;
TEX normal, coord, texture[1], 2D;
MAD normal, normal, 2.0, -1.0;
DP3 dir.w, fragment.texcoord[1], fragment.texcoord[1];
RSQ dir.w, dir.w;
MUL dir, fragment.texcoord[1], dir.w;
DP3_SAT light, normal, dir;
MUL light, light, fragment.color.primary;
DP3 dir.w, fragment.texcoord[2], fragment.texcoord[2];
RSQ dir.w, dir.w;
MUL dir, fragment.texcoord[2], dir.w;
DP3_SAT dir, normal, dir;
MAD light, dir, fragment.color.secondary, light;
MUL result.color.xyz, base, light;
MOV result.color.w, fragment.color.primary.w;
END";

/// Height scale used when the material does not set one
const DEFAULT_PARALLAX_SCALE: f32 = 0.02;

/// Lights the programs consume
const MAX_LIGHTS: usize = 2;

fn rows(matrix: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    for row in 0..4 {
        for col in 0..4 {
            out[row * 4 + col] = matrix[(row, col)];
        }
    }
    out
}

/// Normal map or parallax map renderer over a base renderer
pub struct NormalMapRenderer {
    programs: Option<(ProgramHandle, ProgramHandle)>,
    base: Rc<dyn MaterialRenderer>,
    parallax: bool,
    height_scale: Cell<f32>,
    warned: Cell<bool>,
}

impl NormalMapRenderer {
    /// Create the renderer, compiling its programs when the backend supports them
    ///
    /// # Arguments
    /// * `services` - Driver that compiles and owns the programs
    /// * `base` - Renderer providing blending
    /// * `parallax` - Offset texture lookups by the height in the normal map alpha
    pub fn new(services: &mut dyn MaterialRendererServices, base: Rc<dyn MaterialRenderer>, parallax: bool) -> Self {
        let supported = services.query_feature(VideoDriverFeature::VertexProgram1)
            && services.query_feature(VideoDriverFeature::FragmentProgram1);

        let programs = if supported {
            let (vertex, fragment) = if parallax {
                (PARALLAX_VERTEX_PROGRAM, PARALLAX_FRAGMENT_PROGRAM)
            } else {
                (NORMAL_MAP_VERTEX_PROGRAM, NORMAL_MAP_FRAGMENT_PROGRAM)
            };
            let compiled = services.compile_assembly_program(ProgramStage::Vertex, vertex).and_then(|v| {
                match services.compile_assembly_program(ProgramStage::Fragment, fragment) {
                    Ok(f) => Ok((v, f)),
                    Err(err) => {
                        services.delete_program(v);
                        Err(err)
                    }
                }
            });
            match compiled {
                Ok(programs) => Some(programs),
                Err(err) => {
                    log::error!("Could not create {} programs: {err}", Self::kind(parallax));
                    None
                }
            }
        } else {
            None
        };

        Self {
            programs,
            base,
            parallax,
            height_scale: Cell::new(DEFAULT_PARALLAX_SCALE),
            warned: Cell::new(false),
        }
    }

    const fn kind(parallax: bool) -> &'static str {
        if parallax {
            "parallax map"
        } else {
            "normal map"
        }
    }

    /// Whether the programs are available
    pub const fn is_supported(&self) -> bool {
        self.programs.is_some()
    }

    fn warn_unsupported_once(&self) {
        if !self.warned.replace(true) {
            log::warn!(
                "{} material needs vertex and fragment programs, drawing as {}",
                Self::kind(self.parallax),
                self.base.name()
            );
        }
    }

    fn set_constants(&self, services: &mut dyn MaterialRendererServices) {
        let world = services.transform(TransformSlot::World);
        let view = services.transform(TransformSlot::View);
        let projection = services.transform(TransformSlot::Projection);
        services.set_vertex_shader_constant(0, &rows(&(projection * view * world)));

        let inverse_world = world.try_inverse().unwrap_or_else(Mat4::identity);
        let mut lights = [0.0; MAX_LIGHTS * 8];
        for slot in 0..services.dynamic_light_count().min(MAX_LIGHTS) {
            let Some(light) = services.dynamic_light(slot) else { continue };
            let p = light.position;
            let object = inverse_world * Vec4::new(p.x, p.y, p.z, 1.0);
            let falloff = if light.radius > 0.0 { 1.0 / (light.radius * light.radius) } else { 0.0 };
            let c = light.diffuse_color;
            lights[slot * 8..slot * 8 + 8].copy_from_slice(&[object.x, object.y, object.z, 1.0, c.r, c.g, c.b, falloff]);
        }
        services.set_vertex_shader_constant(4, &lights);

        if self.parallax {
            let inverse_model_view = (view * world).try_inverse().unwrap_or_else(Mat4::identity);
            let eye = inverse_model_view * Vec4::new(0.0, 0.0, 0.0, 1.0);
            services.set_vertex_shader_constant(8, &[eye.x, eye.y, eye.z, 1.0]);

            let scale = self.height_scale.get();
            services.set_pixel_shader_constant(0, &[scale, scale * 0.5, 0.0, 0.0]);
        }
    }
}

impl MaterialRenderer for NormalMapRenderer {
    fn on_set_material(
        &self,
        material: &Material,
        last: &Material,
        reset_all: bool,
        services: &mut dyn MaterialRendererServices,
    ) {
        match self.programs {
            Some((vertex, fragment)) => {
                services.bind_assembly_program(ProgramStage::Vertex, Some(vertex));
                services.bind_assembly_program(ProgramStage::Fragment, Some(fragment));
                self.base.on_set_material(material, last, reset_all, services);
                let scale = if material.material_type_param == 0.0 {
                    DEFAULT_PARALLAX_SCALE
                } else {
                    material.material_type_param
                };
                self.height_scale.set(scale);
            }
            None => {
                self.warn_unsupported_once();
                self.base.on_set_material(material, last, reset_all, services);
            }
        }
    }

    fn on_render(&self, services: &mut dyn MaterialRendererServices, vertex_type: VertexType) -> bool {
        if self.programs.is_none() {
            return self.base.on_render(services, vertex_type);
        }
        if vertex_type != VertexType::Tangents {
            log::error!("{} material needs tangent vertices, draw skipped", Self::kind(self.parallax));
            return false;
        }
        self.set_constants(services);
        true
    }

    fn on_unset_material(&self, services: &mut dyn MaterialRendererServices) {
        if self.programs.is_some() {
            services.bind_assembly_program(ProgramStage::Vertex, None);
            services.bind_assembly_program(ProgramStage::Fragment, None);
        }
        self.base.on_unset_material(services);
    }

    fn is_transparent(&self) -> bool {
        self.base.is_transparent()
    }

    fn name(&self) -> &str {
        if self.parallax {
            "parallax_map"
        } else {
            "normal_map"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::color::ColorF;
    use crate::foundation::math::Vec3;
    use crate::render::lighting::Light;
    use crate::render::materials::fixed_function::SolidRenderer;
    use crate::render::materials::test_support::{RecordingServices, ServiceCall};

    #[test]
    fn test_falls_back_to_base_without_programs() {
        let mut services = RecordingServices::default();
        let renderer = NormalMapRenderer::new(&mut services, Rc::new(SolidRenderer), false);

        assert!(!renderer.is_supported());
        renderer.on_set_material(&Material::default(), &Material::default(), true, &mut services);
        assert!(renderer.on_render(&mut services, VertexType::Standard));
        assert!(!services.calls.iter().any(|c| matches!(c, ServiceCall::BindAssembly(..))));
    }

    #[test]
    fn test_rejected_fragment_program_frees_vertex_program() {
        let mut services = RecordingServices::with_shaders();
        services.rejected_stage = Some(ProgramStage::Fragment);

        let renderer = NormalMapRenderer::new(&mut services, Rc::new(SolidRenderer), true);

        assert!(!renderer.is_supported());
        assert!(services.programs.is_empty());
    }

    #[test]
    fn test_requires_tangent_vertices() {
        let mut services = RecordingServices::with_shaders();
        let renderer = NormalMapRenderer::new(&mut services, Rc::new(SolidRenderer), false);

        assert!(renderer.is_supported());
        assert!(!renderer.on_render(&mut services, VertexType::Standard));
        assert!(renderer.on_render(&mut services, VertexType::Tangents));
    }

    #[test]
    fn test_light_constants_in_object_space() {
        let mut services = RecordingServices::with_shaders();
        services.lights.push(Light::point(Vec3::new(1.0, 2.0, 3.0), ColorF::new(1.0, 0.5, 0.25, 1.0), 10.0));
        let renderer = NormalMapRenderer::new(&mut services, Rc::new(SolidRenderer), true);

        renderer.on_set_material(&Material::default(), &Material::default(), true, &mut services);
        assert!(renderer.on_render(&mut services, VertexType::Tangents));

        let lights = services.calls.iter().find_map(|call| match call {
            ServiceCall::VertexConstant(4, data) => Some(data.clone()),
            _ => None,
        });
        let lights = lights.unwrap();
        assert_eq!(&lights[0..4], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(&lights[4..8], &[1.0, 0.5, 0.25, 0.01]);
        assert!(services
            .calls
            .contains(&ServiceCall::PixelConstant(0, vec![DEFAULT_PARALLAX_SCALE, DEFAULT_PARALLAX_SCALE * 0.5, 0.0, 0.0])));
    }
}
