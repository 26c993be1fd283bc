//! Video driver facade
//!
//! [`VideoDriver`] is the only public entry point to the rendering core. It
//! owns the backend, the state cache, the resource tables and the material
//! renderer registry, and routes every state change through the cache.
//!
//! The implementation is split by concern:
//! - `render_states` - transforms, materials and the 2D/3D mode switch
//! - `draw_3d` / `draw_2d` - draw entry points
//! - `textures`, `render_target`, `lights`, `shaders` - resource management
//! - `context` - scene bracketing and context ownership
//! - `services` - the interface material renderers see

mod context;
mod draw_2d;
mod draw_3d;
mod lights;
mod ndc;
mod render_states;
mod render_target;
mod services;
mod shaders;
mod textures;

pub use context::CurrentContext;

use std::rc::Rc;

use crate::config::DriverConfig;
use crate::foundation::collections::DriverId;
use crate::foundation::color::ColorF;
use crate::foundation::math::{Dimension2, Rect};
use crate::render::backend::{
    BackendFactory, BackendProgramId, ContextRequest, DriverCapabilities, GraphicsBackend,
};
use crate::render::error::{DriverError, DriverResult};
use crate::render::lighting::{Fog, Light};
use crate::render::material::{MaterialTypeId, MATERIAL_MAX_TEXTURES};
use crate::render::materials::fixed_function::{
    DetailMapRenderer, LightmapRenderer, Reflection2LayerRenderer, Solid2LayerRenderer, SolidRenderer,
    SphereMapRenderer, TransparentAddColorRenderer, TransparentAlphaChannelRefRenderer,
    TransparentAlphaChannelRenderer, TransparentVertexAlphaRenderer,
};
use crate::render::materials::normal_map::NormalMapRenderer;
use crate::render::materials::{BuiltinMaterial, MaterialRenderer, MaterialRendererRegistry};
use crate::render::resources::{ProgramTable, TextureHandle, TextureTable};
use crate::render::state::StateCache;
use crate::render::types::{FrameStats, TextureCreationFlags, VideoDriverFeature};

/// Hardware abstraction over one graphics backend
pub struct VideoDriver {
    id: DriverId,
    backend: Box<dyn GraphicsBackend>,
    caps: DriverCapabilities,
    config: DriverConfig,
    name: String,
    screen_size: Dimension2,
    viewport: Rect,
    cache: StateCache,
    textures: TextureTable,
    programs: ProgramTable,
    renderers: MaterialRendererRegistry,
    active_renderer: Option<MaterialTypeId>,
    active_high_level: Option<BackendProgramId>,
    lights: Vec<Light>,
    ambient_light: ColorF,
    fog: Fog,
    texture_flags: TextureCreationFlags,
    render_target: Option<TextureHandle>,
    stats: FrameStats,
}

impl std::fmt::Debug for VideoDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDriver")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("screen_size", &self.screen_size)
            .field("caps", &self.caps)
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}

impl VideoDriver {
    /// Create a driver on a backend obtained from `factory`
    ///
    /// A context with the configured stencil request is asked for first. If
    /// that fails and a stencil buffer was requested, the request is repeated
    /// without one and stencil shadows are unavailable.
    ///
    /// # Errors
    /// `ContextCreation` when no context could be created at all,
    /// `MaterialTypeIdsExhausted` when the configured material type base
    /// leaves no room for the built-in renderers.
    pub fn new(config: DriverConfig, factory: &mut dyn BackendFactory) -> DriverResult<Self> {
        let mut request = ContextRequest {
            size: config.screen_size,
            stencil_buffer: config.stencil_buffer,
            vsync: config.vsync,
            anti_alias: config.anti_alias,
        };

        let backend = match factory.create(&request) {
            Ok(backend) => backend,
            Err(err) if request.stencil_buffer => {
                log::warn!("Cannot create a context with stencil buffer ({err}), disabling stencil shadows");
                request.stencil_buffer = false;
                factory.create(&request).map_err(|err| {
                    log::error!("Cannot create a rendering context: {err}");
                    DriverError::ContextCreation(err.to_string())
                })?
            }
            Err(err) => {
                log::error!("Cannot create a rendering context: {err}");
                return Err(DriverError::ContextCreation(err.to_string()));
            }
        };

        let info = backend.info();
        log::info!("Backend: {} {}", info.api_name, info.version);
        log::info!("Renderer: {}", info.renderer);
        log::info!("Vendor: {}", info.vendor);
        log::debug!("Extensions: {}", info.extensions);

        let caps = DriverCapabilities::probe(info, request.stencil_buffer);
        let name = info.display_name();
        let id = DriverId::next();

        let mut driver = Self {
            id,
            backend,
            caps,
            name,
            screen_size: config.screen_size,
            viewport: Rect::from_size(config.screen_size),
            cache: StateCache::new(),
            textures: TextureTable::new(id),
            programs: ProgramTable::new(),
            renderers: MaterialRendererRegistry::new(config.material_type_base),
            active_renderer: None,
            active_high_level: None,
            lights: Vec::new(),
            ambient_light: ColorF::new(0.0, 0.0, 0.0, 0.0),
            fog: config.fog,
            texture_flags: config.textures.flags(),
            render_target: None,
            stats: FrameStats::default(),
            config,
        };
        driver.initialize()?;
        Ok(driver)
    }

    fn initialize(&mut self) -> DriverResult<()> {
        let screen = Rect::from_size(self.screen_size);
        self.backend.set_viewport(screen);
        self.set_ambient_light(self.ambient_light);

        self.create_builtin_renderers().map_err(|err| {
            log::error!("Cannot register the built-in material renderers: {err}");
            err
        })?;

        self.cache.request_reset();
        self.apply_3d_states();

        let fog = self.fog;
        self.backend.set_fog(&fog);

        log::info!(
            "Video driver '{}' ready, {} material renderers, {} texture stages",
            self.name,
            self.renderers.len(),
            self.texture_stage_count()
        );
        Ok(())
    }

    fn create_builtin_renderers(&mut self) -> DriverResult<()> {
        let base = self.renderers.base();

        let solid: Rc<dyn MaterialRenderer> = Rc::new(SolidRenderer);
        self.renderers.register(Rc::clone(&solid))?;
        self.renderers.register(Rc::new(Solid2LayerRenderer))?;

        let lightmap: Rc<dyn MaterialRenderer> = Rc::new(LightmapRenderer::new(BuiltinMaterial::Lightmap.id(base)));
        for _ in 0..LightmapRenderer::VARIANTS {
            self.renderers.register(Rc::clone(&lightmap))?;
        }

        self.renderers.register(Rc::new(DetailMapRenderer))?;
        self.renderers.register(Rc::new(SphereMapRenderer))?;
        self.renderers.register(Rc::new(Reflection2LayerRenderer::opaque()))?;

        let add_color: Rc<dyn MaterialRenderer> = Rc::new(TransparentAddColorRenderer);
        self.renderers.register(Rc::clone(&add_color))?;
        self.renderers.register(Rc::new(TransparentAlphaChannelRenderer))?;
        self.renderers.register(Rc::new(TransparentAlphaChannelRefRenderer))?;

        let vertex_alpha: Rc<dyn MaterialRenderer> = Rc::new(TransparentVertexAlphaRenderer);
        self.renderers.register(Rc::clone(&vertex_alpha))?;
        self.renderers.register(Rc::new(Reflection2LayerRenderer::transparent()))?;

        for parallax in [false, true] {
            for base_renderer in [&solid, &add_color, &vertex_alpha] {
                let renderer = NormalMapRenderer::new(self, Rc::clone(base_renderer), parallax);
                self.renderers.register(Rc::new(renderer))?;
            }
        }

        debug_assert_eq!(self.renderers.len(), BuiltinMaterial::COUNT);
        Ok(())
    }

    /// Name reported by the backend, e.g. "OpenGL 1.5.0"
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier stamped into every handle this driver creates
    pub const fn id(&self) -> DriverId {
        self.id
    }

    /// Configuration the driver was created with
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Negotiated backend capabilities
    pub const fn capabilities(&self) -> &DriverCapabilities {
        &self.caps
    }

    /// Answer a capability query
    pub const fn query_feature(&self, feature: VideoDriverFeature) -> bool {
        self.caps.supports(feature)
    }

    /// Size of the drawable
    pub const fn screen_size(&self) -> Dimension2 {
        self.screen_size
    }

    /// Statistics of the current frame
    pub const fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Primitives submitted since `begin_scene`
    pub const fn primitive_count_drawn(&self) -> u32 {
        self.stats.primitives_drawn
    }

    /// The backend, for adapters and tools that need direct access
    pub fn backend(&self) -> &dyn GraphicsBackend {
        self.backend.as_ref()
    }

    /// Mutable backend access
    ///
    /// State changed through this reference bypasses the state cache; call
    /// [`VideoDriver::reset_render_states`] afterwards.
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Number of texture stages the driver drives
    pub fn texture_stage_count(&self) -> usize {
        self.caps.texture_stages(MATERIAL_MAX_TEXTURES)
    }

    fn max_anisotropy(&self) -> Option<f32> {
        self.caps.anisotropic_filter.then_some(self.caps.max_anisotropy)
    }

    fn record_draw(&mut self, primitives: usize) {
        self.stats.draw_calls += 1;
        self.stats.primitives_drawn = self
            .stats
            .primitives_drawn
            .saturating_add(u32::try_from(primitives).unwrap_or(u32::MAX));
    }
}

impl Drop for VideoDriver {
    fn drop(&mut self) {
        self.unset_active_renderer();
        self.renderers.clear();

        let textures = self.textures.drain();
        let programs = self.programs.drain();
        log::debug!(
            "Video driver '{}' shutting down, releasing {} textures and {} programs",
            self.name,
            textures.len(),
            programs.len()
        );
        for texture in textures {
            self.backend.delete_texture(texture.backend_id);
        }
        for program in programs {
            self.backend.delete_program(program.backend_id);
        }
    }
}
