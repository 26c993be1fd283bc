//! Driver scenarios run against the headless backend

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;

use crate::config::DriverConfig;
use crate::foundation::color::{Color, ColorF};
use crate::foundation::math::{Dimension2, Mat4, Position2, Rect, Vec3};
use crate::render::backend::{
    BackendCall, Capability, HeadlessBackend, HeadlessFactory, MatrixMode, PolygonMode, ProgramStage,
};
use crate::render::error::DriverError;
use crate::render::image::Image;
use crate::render::lighting::Light;
use crate::render::material::{Material, MaterialTypeId};
use crate::render::materials::{MaterialRenderer, MaterialRendererServices, ShaderConstantSetCallback};
use crate::render::types::{TextureCreationFlags, TransformSlot, VertexType, VideoDriverFeature};
use crate::render::vertex::Vertex3D;
use crate::render::VideoDriver;

const RED: Color = Color::new(255, 255, 0, 0);

fn driver_with(config: DriverConfig) -> VideoDriver {
    let mut factory = HeadlessFactory::new();
    VideoDriver::new(config, &mut factory).unwrap()
}

fn driver() -> VideoDriver {
    driver_with(DriverConfig::default().with_screen_size(64, 64))
}

fn headless(driver: &VideoDriver) -> &HeadlessBackend {
    driver.backend().as_any().downcast_ref::<HeadlessBackend>().unwrap()
}

fn headless_mut(driver: &mut VideoDriver) -> &mut HeadlessBackend {
    driver.backend_mut().as_any_mut().downcast_mut::<HeadlessBackend>().unwrap()
}

/// One triangle covering the whole screen with identity transforms
fn screen_triangle(color: Color) -> Vec<Vertex3D> {
    let normal = [0.0, 0.0, 1.0];
    vec![
        Vertex3D::new([-1.0, -1.0, 0.0], normal, color, [0.0, 0.0]),
        Vertex3D::new([3.0, -1.0, 0.0], normal, color, [1.0, 0.0]),
        Vertex3D::new([-1.0, 3.0, 0.0], normal, color, [0.0, 1.0]),
    ]
}

fn draw_triangle(driver: &mut VideoDriver) {
    driver.draw_indexed_triangle_list(&screen_triangle(RED), &[0, 1, 2], 1);
}

fn solid_image(size: Dimension2, color: Color) -> Image {
    Image::from_colors(size, &vec![color; size.area()])
}

#[test]
fn test_redundant_material_emits_no_state_changes() {
    let mut driver = driver();
    driver.set_material(&Material::default());
    draw_triangle(&mut driver);

    headless_mut(&mut driver).clear_calls();
    driver.set_material(&Material::default());
    draw_triangle(&mut driver);

    let backend = headless(&driver);
    assert_eq!(backend.count_calls(BackendCall::is_state_change), 0);
    assert_eq!(backend.count_calls(BackendCall::is_draw), 1);
}

#[test]
fn test_changed_flag_emits_its_state_group() {
    let mut driver = driver();
    draw_triangle(&mut driver);

    headless_mut(&mut driver).clear_calls();
    driver.set_material(&Material {
        wireframe: true,
        ..Material::default()
    });
    draw_triangle(&mut driver);

    let backend = headless(&driver);
    assert_eq!(
        backend.count_calls(|call| *call == BackendCall::SetPolygonMode(PolygonMode::Line)),
        1
    );
    assert_eq!(backend.count_calls(|call| matches!(call, BackendCall::SetDepthMask(_))), 0);
}

#[test]
fn test_destroyed_texture_is_rejected() {
    let mut driver = driver();
    let texture = driver.add_texture("crate", &solid_image(Dimension2::new(4, 4), RED)).unwrap();
    driver.remove_texture(texture).unwrap();

    assert_eq!(driver.set_texture(0, Some(texture)), Err(DriverError::InvalidHandle));
    assert_eq!(
        driver.draw_2d_image(texture, Position2::new(0, 0), Rect::new(0, 0, 4, 4), None, Color::WHITE, false),
        Err(DriverError::InvalidHandle)
    );
    assert!(driver.remove_texture(texture).is_ok());
    assert_eq!(headless(&driver).texture_count(), 0);
}

#[test]
fn test_texture_of_another_driver_is_rejected() {
    let mut first = driver();
    let mut second = driver();
    let texture = first.add_texture("crate", &solid_image(Dimension2::new(4, 4), RED)).unwrap();

    assert_eq!(second.set_texture(0, Some(texture)), Err(DriverError::CrossDriverResource));
    assert_eq!(second.remove_texture(texture), Err(DriverError::CrossDriverResource));
    assert!(first.texture_info(texture).is_ok());
}

#[test]
fn test_release_destroys_with_last_owner() {
    let mut driver = driver();
    let texture = driver.add_texture("crate", &solid_image(Dimension2::new(4, 4), RED)).unwrap();
    driver.grab_texture(texture).unwrap();

    driver.release_texture(texture).unwrap();
    assert_eq!(driver.texture_count(), 1);
    driver.release_texture(texture).unwrap();
    assert_eq!(driver.texture_count(), 0);
    assert_eq!(driver.find_texture("crate"), None);
}

#[test]
fn test_npot_texture_is_scaled_up() {
    let mut driver = driver();
    driver.set_texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS, false);
    let texture = driver.add_texture("odd", &solid_image(Dimension2::new(3, 5), RED)).unwrap();

    let entry = driver.texture_info(texture).unwrap();
    assert_eq!(entry.original_size, Dimension2::new(3, 5));
    assert_eq!(entry.size, Dimension2::new(4, 8));
    assert!(!entry.has_mip_maps);
}

#[test]
fn test_mode_switch_resets_once() {
    let mut driver = driver();
    draw_triangle(&mut driver);
    driver.draw_2d_rectangle(RED, Rect::new(0, 0, 8, 8), None);

    headless_mut(&mut driver).clear_calls();
    driver.draw_2d_rectangle(RED, Rect::new(8, 8, 16, 16), None);
    assert_eq!(headless(&driver).count_calls(BackendCall::is_state_change), 0);

    headless_mut(&mut driver).clear_calls();
    draw_triangle(&mut driver);
    let backend = headless(&driver);
    assert!(backend.count_calls(|call| matches!(call, BackendCall::LoadMatrix(MatrixMode::ModelView, _))) >= 1);
    assert!(backend.count_calls(|call| matches!(call, BackendCall::SetMaterialColors(_))) >= 1);

    headless_mut(&mut driver).clear_calls();
    draw_triangle(&mut driver);
    assert_eq!(headless(&driver).count_calls(BackendCall::is_state_change), 0);
}

#[test]
fn test_clipped_blit_draws_nothing() {
    let mut driver = driver();
    let texture = driver.add_texture("crate", &solid_image(Dimension2::new(8, 8), RED)).unwrap();
    headless_mut(&mut driver).clear_calls();

    let off_screen = driver.draw_2d_image(
        texture,
        Position2::new(100, 100),
        Rect::new(0, 0, 8, 8),
        None,
        Color::WHITE,
        false,
    );
    let clip = Rect::new(0, 0, 4, 4);
    let outside_clip = driver.draw_2d_image(
        texture,
        Position2::new(10, 10),
        Rect::new(0, 0, 8, 8),
        Some(&clip),
        Color::WHITE,
        false,
    );

    assert!(off_screen.is_ok() && outside_clip.is_ok());
    assert_eq!(headless(&driver).count_calls(BackendCall::is_draw), 0);
    assert_eq!(driver.primitive_count_drawn(), 0);
}

#[test]
fn test_blit_writes_texels() {
    let mut driver = driver();
    let texture = driver.add_texture("crate", &solid_image(Dimension2::new(8, 8), RED)).unwrap();

    driver
        .draw_2d_image(texture, Position2::new(4, 4), Rect::new(0, 0, 8, 8), None, Color::WHITE, false)
        .unwrap();

    let backend = headless(&driver);
    assert_eq!(backend.pixel(7, 7), Some(RED));
    assert_eq!(backend.pixel(20, 20), Some(Color::BLACK));
}

#[test]
fn test_model_view_ignores_set_order() {
    let world = Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0));
    let view = Mat4::new_rotation(Vec3::new(0.0, 0.5, 0.0));

    let mut first = driver();
    first.set_transform(TransformSlot::World, world);
    first.set_transform(TransformSlot::View, view);

    let mut second = driver();
    second.set_transform(TransformSlot::View, view);
    second.set_transform(TransformSlot::World, world);

    assert_relative_eq!(*first.model_view(), view * world);
    assert_relative_eq!(*second.model_view(), view * world);
}

#[test]
fn test_lights_beyond_capacity_are_ignored() {
    let mut driver = driver();
    let light = Light::point(Vec3::new(0.0, 10.0, 0.0), ColorF::new(1.0, 1.0, 1.0, 1.0), 100.0);
    for _ in 0..9 {
        driver.add_dynamic_light(&light);
    }

    assert_eq!(driver.max_dynamic_lights(), 8);
    assert_eq!(driver.dynamic_light_count(), 8);
    let backend = headless(&driver);
    assert_eq!(
        backend.count_calls(|call| matches!(call, BackendCall::SetCapability(Capability::Light(_), true))),
        8
    );

    driver.delete_all_dynamic_lights();
    assert_eq!(driver.dynamic_light_count(), 0);
    assert!(driver.dynamic_light(0).is_none());
}

#[test]
fn test_render_target_has_no_mip_maps_and_keeps_flag() {
    let mut driver = driver();
    assert!(driver.texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS));

    let target = driver.create_render_target_texture(Dimension2::new(16, 16)).unwrap();

    assert!(driver.texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS));
    let entry = driver.texture_info(target).unwrap();
    assert!(entry.is_render_target);
    assert!(!entry.has_mip_maps);
    let id = entry.backend_id;
    assert_eq!(headless(&driver).texture_levels(id).map(<[_]>::len), Some(1));
}

#[test]
fn test_render_target_receives_drawing() {
    let mut driver = driver();
    let target = driver.create_render_target_texture(Dimension2::new(16, 16)).unwrap();

    driver.set_render_target(Some(target), true, true, Color::BLACK).unwrap();
    assert_eq!(driver.current_render_target_size(), Dimension2::new(16, 16));
    driver.draw_2d_rectangle(Color::WHITE, Rect::new(0, 0, 16, 16), None);
    driver.set_render_target(None, false, false, Color::BLACK).unwrap();

    assert_eq!(driver.render_target(), None);
    assert_eq!(driver.viewport(), Rect::new(0, 0, 64, 64));
    let id = driver.texture_info(target).unwrap().backend_id;
    let levels = headless(&driver).texture_levels(id).unwrap();
    assert!(levels[0].iter().all(|texel| *texel == Color::WHITE));
}

#[test]
fn test_oversized_render_target_viewport_stays_on_screen() {
    let mut driver = driver();
    let target = driver.create_render_target_texture(Dimension2::new(128, 32)).unwrap();

    driver.set_render_target(Some(target), false, false, Color::BLACK).unwrap();

    assert_eq!(driver.viewport(), Rect::new(0, 32, 64, 64));
    assert_eq!(headless(&driver).viewport(), Rect::new(0, 32, 64, 64));
    assert_eq!(driver.current_render_target_size(), Dimension2::new(128, 32));
}

#[test]
fn test_removing_active_render_target_restores_screen() {
    let mut driver = driver();
    let target = driver.create_render_target_texture(Dimension2::new(16, 16)).unwrap();
    driver.set_render_target(Some(target), false, false, Color::BLACK).unwrap();

    driver.remove_texture(target).unwrap();

    assert_eq!(driver.render_target(), None);
    assert_eq!(driver.current_render_target_size(), Dimension2::new(64, 64));
    assert_eq!(headless(&driver).viewport(), Rect::new(0, 0, 64, 64));
}

#[test]
fn test_viewport_is_clipped_to_screen() {
    let mut driver = driver();

    driver.set_viewport(Rect::new(-10, -10, 32, 32));
    assert_eq!(driver.viewport(), Rect::new(0, 0, 32, 32));
    assert_eq!(headless(&driver).viewport(), Rect::new(0, 0, 32, 32));

    driver.set_viewport(Rect::new(100, 100, 200, 200));
    assert_eq!(driver.viewport(), Rect::new(0, 0, 32, 32));
}

#[test]
fn test_screenshot_rows_are_top_to_bottom() {
    let mut driver = driver();
    driver.begin_scene(true, true, Color::BLACK);
    driver.draw_2d_rectangle(RED, Rect::new(0, 0, 64, 32), None);

    let shot = driver.create_screenshot().unwrap();

    assert_eq!(shot.size(), Dimension2::new(64, 64));
    assert_eq!(shot.pixel(0, 0), Some(RED));
    assert_eq!(shot.pixel(63, 31), Some(RED));
    assert_eq!(shot.pixel(0, 32), Some(Color::BLACK));
    assert_eq!(shot.pixel(0, 63), Some(Color::BLACK));
}

#[test]
fn test_clip_rect_limits_rectangle() {
    let mut driver = driver();
    let clip = Rect::new(0, 0, 10, 10);
    driver.draw_2d_rectangle(RED, Rect::new(0, 0, 64, 64), Some(&clip));

    let backend = headless(&driver);
    assert_eq!(backend.pixel(5, 5), Some(RED));
    assert_eq!(backend.pixel(12, 5), Some(Color::BLACK));
    assert_eq!(backend.pixel(5, 12), Some(Color::BLACK));
}

#[test]
fn test_missing_stencil_buffer_falls_back() {
    let mut factory = HeadlessFactory::new().without_stencil();
    let config = DriverConfig::default().with_stencil_buffer(true);

    let mut driver = VideoDriver::new(config, &mut factory).unwrap();

    assert_eq!(factory.attempts(), 2);
    assert!(!driver.query_feature(VideoDriverFeature::StencilBuffer));

    headless_mut(&mut driver).clear_calls();
    driver.draw_stencil_shadow_volume(&[Vec3::zeros(), Vec3::x(), Vec3::y()], false);
    driver.draw_stencil_shadow(true, [Color::new(128, 0, 0, 0); 4]);
    assert!(headless(&driver).calls().is_empty());
}

#[test]
fn test_unavailable_backend_fails_creation() {
    let mut factory = HeadlessFactory::new().unavailable();

    let result = VideoDriver::new(DriverConfig::default(), &mut factory);

    assert!(matches!(result, Err(DriverError::ContextCreation(_))));
}

#[test]
fn test_shadow_volume_restores_backend_state() {
    let mut driver = driver_with(DriverConfig::default().with_screen_size(64, 64).with_stencil_buffer(true));
    assert!(driver.query_feature(VideoDriverFeature::StencilBuffer));
    draw_triangle(&mut driver);
    headless_mut(&mut driver).clear_calls();

    driver.draw_stencil_shadow_volume(&[Vec3::zeros(), Vec3::x(), Vec3::y()], true);
    driver.draw_stencil_shadow(true, [Color::new(128, 0, 0, 0); 4]);

    let backend = headless(&driver);
    assert_eq!(backend.count_calls(|call| *call == BackendCall::PushState), 2);
    assert_eq!(backend.count_calls(|call| *call == BackendCall::PopState), 2);
    assert_eq!(backend.count_calls(BackendCall::is_draw), 3);
    assert_eq!(driver.primitive_count_drawn(), 1 + 2 + 2);

    // the next 3D draw sets the material up again
    headless_mut(&mut driver).clear_calls();
    draw_triangle(&mut driver);
    assert!(headless(&driver).count_calls(BackendCall::is_state_change) > 0);
}

#[test]
fn test_failed_shader_registers_nothing() {
    let mut driver = driver();
    let before = driver.material_renderer_count();

    let assembly = driver.add_shader_material(Some("not a program"), None, None, MaterialTypeId(0), 0);
    let high_level =
        driver.add_high_level_shader_material(Some("uniform float t;"), None, None, MaterialTypeId(0), 0);

    assert!(matches!(assembly, Err(DriverError::ShaderCompilation(_))));
    assert!(matches!(high_level, Err(DriverError::ShaderCompilation(_))));
    assert_eq!(driver.material_renderer_count(), before);
}

#[test]
fn test_material_type_base_without_room_fails_creation() {
    let config = DriverConfig::default().with_material_type_base(i32::MAX - 5);
    let mut factory = HeadlessFactory::new();

    let result = VideoDriver::new(config, &mut factory);

    assert!(matches!(result, Err(DriverError::MaterialTypeIdsExhausted(_))));
}

#[test]
fn test_partial_shader_failure_frees_compiled_program() {
    let mut driver = driver();
    let programs = headless(&driver).program_count();
    let renderers = driver.material_renderer_count();

    let result = driver.add_shader_material(
        Some("!!ARBvp1.0\nMOV result.position, vertex.position;\nEND"),
        Some("not a program"),
        None,
        MaterialTypeId(0),
        0,
    );

    assert!(matches!(result, Err(DriverError::ShaderCompilation(_))));
    assert_eq!(headless(&driver).program_count(), programs);
    assert_eq!(driver.material_renderer_count(), renderers);
}

#[test]
fn test_deleted_program_leaves_backend() {
    let mut driver = driver();
    let programs = headless(&driver).program_count();

    let handle = driver
        .compile_assembly_program(ProgramStage::Vertex, "!!ARBvp1.0\nMOV result.position, vertex.position;\nEND")
        .unwrap();
    assert_eq!(headless(&driver).program_count(), programs + 1);

    driver.delete_program(handle);
    driver.delete_program(handle);
    assert_eq!(headless(&driver).program_count(), programs);
}

struct TimeCallback {
    accepted: Cell<Option<bool>>,
}

impl ShaderConstantSetCallback for TimeCallback {
    fn on_set_constants(&self, services: &mut dyn MaterialRendererServices, user_data: i32) {
        #[allow(clippy::cast_precision_loss)]
        let time = user_data as f32;
        self.accepted.set(Some(services.set_shader_constant_by_name("time", &[time])));
    }
}

#[test]
fn test_high_level_material_sets_constants_per_draw() {
    let mut driver = driver();
    let callback = Rc::new(TimeCallback {
        accepted: Cell::new(None),
    });
    let source = "uniform float time;\nvoid main() {}";

    let constants: Rc<dyn ShaderConstantSetCallback> = Rc::clone(&callback) as _;
    let id = driver
        .add_high_level_shader_material(Some(source), None, Some(constants), MaterialTypeId(0), 7)
        .unwrap();
    assert_eq!(id, MaterialTypeId(23));

    driver.set_material(&Material::with_type(id));
    draw_triangle(&mut driver);

    assert_eq!(callback.accepted.get(), Some(true));
    let backend = headless(&driver);
    assert_eq!(
        backend.count_calls(|call| matches!(call, BackendCall::SetUniform(_, name, values) if name == "time" && values == &[7.0])),
        1
    );
}

#[derive(Default)]
struct CountingRenderer {
    set: Cell<u32>,
    render: Cell<u32>,
    unset: Cell<u32>,
}

impl MaterialRenderer for CountingRenderer {
    fn on_set_material(&self, _: &Material, _: &Material, _: bool, _: &mut dyn MaterialRendererServices) {
        self.set.set(self.set.get() + 1);
    }

    fn on_render(&self, _: &mut dyn MaterialRendererServices, _: VertexType) -> bool {
        self.render.set(self.render.get() + 1);
        true
    }

    fn on_unset_material(&self, _: &mut dyn MaterialRendererServices) {
        self.unset.set(self.unset.get() + 1);
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn test_shared_renderer_sees_every_registration() {
    let mut driver = driver();
    let renderer = Rc::new(CountingRenderer::default());
    let shared: Rc<dyn MaterialRenderer> = Rc::clone(&renderer) as _;
    let ids: Vec<MaterialTypeId> = (0..7).map(|_| driver.add_material_renderer(Rc::clone(&shared)).unwrap()).collect();

    for id in &ids {
        driver.set_material(&Material::with_type(*id));
        draw_triangle(&mut driver);
    }
    assert_eq!(renderer.set.get(), 7);
    assert_eq!(renderer.render.get(), 7);
    assert_eq!(renderer.unset.get(), 6);

    driver.draw_2d_rectangle(RED, Rect::new(0, 0, 4, 4), None);
    assert_eq!(renderer.unset.get(), 7);
}

#[test]
fn test_draw_with_bad_indices_is_skipped() {
    let mut driver = driver();
    headless_mut(&mut driver).clear_calls();

    driver.draw_indexed_triangle_list(&screen_triangle(RED), &[0, 1, 5], 1);
    driver.draw_indexed_triangle_list(&screen_triangle(RED), &[0, 1, 2], 0);
    driver.draw_indexed_triangle_fan::<Vertex3D>(&[], &[0, 1, 2], 1);

    assert_eq!(headless(&driver).count_calls(BackendCall::is_draw), 0);
}

#[test]
fn test_primitive_limit_skips_draw() {
    let mut driver = driver_with(DriverConfig::default().with_screen_size(64, 64).with_max_primitives_per_call(1));
    let vertices = screen_triangle(RED);

    driver.draw_indexed_triangle_fan(&vertices, &[0, 1, 2, 0], 2);
    assert_eq!(headless(&driver).count_calls(BackendCall::is_draw), 0);

    driver.draw_indexed_triangle_fan(&vertices, &[0, 1, 2], 1);
    assert_eq!(headless(&driver).count_calls(BackendCall::is_draw), 1);
}

#[test]
fn test_scene_counts_primitives_and_presents() {
    let mut driver = driver();

    driver.begin_scene(true, true, Color::BLACK);
    draw_triangle(&mut driver);
    assert_eq!(driver.primitive_count_drawn(), 1);
    assert!(driver.end_scene());

    driver.begin_scene(true, true, Color::BLACK);
    assert_eq!(driver.primitive_count_drawn(), 0);
    assert_eq!(driver.frame_stats().frame, 1);
    assert_eq!(headless(&driver).frames_presented(), 1);
    assert_eq!(headless(&driver).pixel(32, 32), Some(Color::BLACK));
}

#[test]
fn test_triangle_covers_screen() {
    let mut driver = driver();
    draw_triangle(&mut driver);

    let backend = headless(&driver);
    assert_eq!(backend.pixel(0, 0), Some(RED));
    assert_eq!(backend.pixel(63, 63), Some(RED));
}

#[test]
fn test_context_guard_releases_on_drop() {
    let mut driver = driver();
    {
        let context = driver.make_current().unwrap();
        assert!(headless(&context).is_current());
    }
    assert!(!headless(&driver).is_current());
}

#[test]
fn test_remove_all_textures_frees_backend_storage() {
    let mut driver = driver();
    let texture = driver.add_texture("a", &solid_image(Dimension2::new(4, 4), RED)).unwrap();
    driver.add_texture("b", &solid_image(Dimension2::new(4, 4), RED)).unwrap();
    driver.set_texture(0, Some(texture)).unwrap();
    draw_triangle(&mut driver);

    driver.remove_all_textures();

    assert_eq!(driver.texture_count(), 0);
    assert_eq!(headless(&driver).texture_count(), 0);
    assert_eq!(driver.set_texture(0, Some(texture)), Err(DriverError::InvalidHandle));
}
