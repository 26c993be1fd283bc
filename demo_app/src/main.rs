//! Driver demo application
//!
//! Renders one frame on the headless backend: a lit cube, a texture drawn
//! into a render target and blitted back, and a few 2D overlays. The frame is
//! written to `screenshot.png`.
//!
//! Usage: `driver_demo [config.toml|config.ron]`

use video_driver::config::ConfigError;
use video_driver::prelude::*;

const SCREENSHOT_PATH: &str = "screenshot.png";

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("could not load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("could not save screenshot: {0}")]
    Save(String),
}

fn load_config() -> Result<DriverConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            Ok(DriverConfig::load_from_file(&path)?)
        }
        None => Ok(DriverConfig::default()),
    }
}

fn checkerboard(size: i32) -> Image {
    let light = Color::new(255, 230, 230, 230);
    let dark = Color::new(255, 60, 90, 160);
    let pixels: Vec<Color> = (0..size)
        .flat_map(|y| (0..size).map(move |x| if (x / 8 + y / 8) % 2 == 0 { light } else { dark }))
        .collect();
    Image::from_colors(Dimension2::new(size, size), &pixels)
}

fn cube() -> (Vec<Vertex3D>, Vec<u16>) {
    let corners = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];
    let vertices = corners
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = Vec3::from(position).normalize();
            let shade = if i % 2 == 0 { 200 } else { 140 };
            Vertex3D::new(
                position,
                [normal.x, normal.y, normal.z],
                Color::new(255, shade, 80, 60),
                [0.0, 0.0],
            )
        })
        .collect();
    let indices = vec![
        0, 2, 1, 0, 3, 2, // front
        1, 6, 5, 1, 2, 6, // right
        5, 7, 4, 5, 6, 7, // back
        4, 3, 0, 4, 7, 3, // left
        3, 6, 2, 3, 7, 6, // top
        4, 1, 5, 4, 0, 1, // bottom
    ];
    (vertices, indices)
}

fn render_frame(driver: &mut VideoDriver) -> Result<(), DemoError> {
    let screen = driver.screen_size();
    #[allow(clippy::cast_precision_loss)]
    let aspect = screen.width as f32 / screen.height.max(1) as f32;

    let texture = driver.add_texture("checker", &checkerboard(64))?;
    let target = driver.create_render_target_texture(Dimension2::new(128, 128))?;

    // offscreen pass
    driver.set_render_target(Some(target), true, true, Color::new(255, 20, 20, 20))?;
    driver.draw_2d_image_scaled(texture, Rect::new(0, 0, 128, 128), Rect::new(0, 0, 64, 64), None, None, false)?;
    driver.set_render_target(None, false, false, Color::BLACK)?;

    driver.begin_scene(true, true, Color::new(255, 40, 40, 60));

    driver.set_transform(
        TransformSlot::Projection,
        Mat4::perspective_lh(std::f32::consts::FRAC_PI_4, aspect, 0.1, 100.0),
    );
    driver.set_transform(
        TransformSlot::View,
        <Mat4 as Mat4Ext>::look_at_lh(Vec3::new(3.0, 3.0, -6.0), Vec3::zeros(), Vec3::y()),
    );
    driver.add_dynamic_light(&Light::point(
        Vec3::new(4.0, 6.0, -4.0),
        ColorF::new(1.0, 0.95, 0.9, 1.0),
        50.0,
    ));

    let (vertices, indices) = cube();
    driver.set_transform(TransformSlot::World, Mat4::new_rotation(Vec3::new(0.0, 0.6, 0.0)));
    driver.set_material(&Material::default());
    driver.draw_indexed_triangle_list(&vertices, &indices, indices.len() / 3);
    driver.draw_3d_line(Vec3::zeros(), Vec3::new(0.0, 2.0, 0.0), Color::WHITE);

    driver.draw_2d_image(
        target,
        Position2::new(screen.width - 138, 10),
        Rect::new(0, 0, 128, 128),
        None,
        Color::WHITE,
        false,
    )?;
    driver.draw_2d_rectangle_gradient(
        Rect::new(10, screen.height - 40, 210, screen.height - 10),
        [Color::new(200, 255, 0, 0), Color::new(200, 0, 255, 0), Color::new(200, 0, 0, 255), Color::WHITE],
        None,
    );
    driver.draw_2d_line(Position2::new(10, 10), Position2::new(210, 10), Color::WHITE);

    let stats = driver.frame_stats();
    log::info!("Frame: {} draw calls, {} primitives", stats.draw_calls, stats.primitives_drawn);

    let shot = driver.create_screenshot()?;
    driver.end_scene();

    shot.to_rgba_image()?
        .save(SCREENSHOT_PATH)
        .map_err(|err| DemoError::Save(err.to_string()))?;
    log::info!("Saved {SCREENSHOT_PATH}");
    Ok(())
}

fn main() -> Result<(), DemoError> {
    video_driver::foundation::logging::init();

    let config = load_config()?;
    let mut factory = HeadlessFactory::new();
    let mut driver = VideoDriver::new(config, &mut factory)?;
    log::info!("Running on {}", driver.name());

    let mut context = driver.make_current()?;
    render_frame(&mut context)
}
