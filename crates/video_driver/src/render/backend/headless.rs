//! Headless software backend
//!
//! [`HeadlessBackend`] implements [`GraphicsBackend`] without any GPU. It keeps
//! a CPU colour buffer, a texture store and a log of every call it receives.
//! Filled primitives are rasterised with flat depth-less coverage, vertex colour
//! interpolation and nearest texture sampling, which is enough to produce
//! meaningful screenshots. The call log lets tests assert exactly which state
//! changes the driver emitted.

use std::collections::HashMap;

use crate::foundation::color::{Color, ColorF};
use crate::foundation::math::{Dimension2, Mat4, Rect, Vec4};
use crate::render::error::{BackendError, BackendResult};
use crate::render::lighting::{BackendLight, Fog};
use crate::render::types::{ClearFlags, PrimitiveType, VertexType};
use crate::render::vertex::{ImmediateVertex, VertexStream};

use super::capabilities::{
    BackendInfo, EXT_FRAGMENT_PROGRAM, EXT_MULTITEXTURE, EXT_SHADING_LANGUAGE_100,
    EXT_TEXTURE_FILTER_ANISOTROPIC, EXT_VERTEX_PROGRAM,
};
use super::{
    AlphaTest, BackendFactory, BackendProgramId, BackendTextureId, BlendFactor, BlendMode, Capability,
    ContextRequest, CullFace, GraphicsBackend, MaterialColors, MatrixMode, PolygonMode, ProgramStage,
    ShadeModel, StencilState, TexGen, TextureCombine, TextureFilter, TextureUpload,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `make_current`
    MakeCurrent,
    /// `release_current`
    ReleaseCurrent,
    /// `present`
    Present,
    /// `set_viewport`
    SetViewport(Rect),
    /// `clear`
    Clear(ClearFlags, Color),
    /// `read_pixels`
    ReadPixels(Dimension2),
    /// `copy_framebuffer_to_texture`
    CopyFramebufferToTexture(BackendTextureId, Dimension2),
    /// `set_capability`
    SetCapability(Capability, bool),
    /// `load_matrix`
    LoadMatrix(MatrixMode, Mat4),
    /// `set_material_colors`
    SetMaterialColors(MaterialColors),
    /// `set_polygon_mode`
    SetPolygonMode(PolygonMode),
    /// `set_shade_model`
    SetShadeModel(ShadeModel),
    /// `set_depth_mask`
    SetDepthMask(bool),
    /// `set_color_mask`
    SetColorMask(bool),
    /// `set_cull_face`
    SetCullFace(CullFace),
    /// `set_blend`
    SetBlend(BlendMode),
    /// `set_alpha_test`
    SetAlphaTest(AlphaTest),
    /// `set_stencil`
    SetStencil(StencilState),
    /// `bind_texture`
    BindTexture(usize, Option<BackendTextureId>),
    /// `set_texture_filter`
    SetTextureFilter(usize, TextureFilter),
    /// `set_texture_combine`
    SetTextureCombine(usize, TextureCombine),
    /// `set_texgen`
    SetTexGen(usize, TexGen),
    /// `set_light`
    SetLight(usize, BackendLight),
    /// `set_ambient_light`
    SetAmbientLight(ColorF),
    /// `set_fog`
    SetFog(Fog),
    /// `push_state`
    PushState,
    /// `pop_state`
    PopState,
    /// `create_texture`
    CreateTexture {
        /// New texture
        id: BackendTextureId,
        /// Size of level 0
        size: Dimension2,
        /// Number of mip levels
        levels: usize,
    },
    /// `delete_texture`
    DeleteTexture(BackendTextureId),
    /// `create_assembly_program`
    CreateAssemblyProgram(ProgramStage, BackendProgramId),
    /// `bind_assembly_program`
    BindAssemblyProgram(ProgramStage, Option<BackendProgramId>),
    /// `set_program_parameter`
    SetProgramParameter(ProgramStage, u32, [f32; 4]),
    /// `create_high_level_program`
    CreateHighLevelProgram(BackendProgramId),
    /// `use_high_level_program`
    UseHighLevelProgram(Option<BackendProgramId>),
    /// `set_uniform`
    SetUniform(BackendProgramId, String, Vec<f32>),
    /// `delete_program`
    DeleteProgram(BackendProgramId),
    /// `draw_indexed`
    DrawIndexed {
        /// Vertex layout
        vertex_type: VertexType,
        /// Primitive assembly
        primitive: PrimitiveType,
        /// Vertices in the stream
        vertex_count: usize,
        /// Indices submitted
        index_count: usize,
    },
    /// `draw_immediate`
    DrawImmediate {
        /// Primitive assembly
        primitive: PrimitiveType,
        /// Submitted vertices
        vertices: Vec<ImmediateVertex>,
    },
}

impl BackendCall {
    /// True for calls that change rendering state
    pub const fn is_state_change(&self) -> bool {
        matches!(
            self,
            Self::SetViewport(_)
                | Self::SetCapability(..)
                | Self::LoadMatrix(..)
                | Self::SetMaterialColors(_)
                | Self::SetPolygonMode(_)
                | Self::SetShadeModel(_)
                | Self::SetDepthMask(_)
                | Self::SetColorMask(_)
                | Self::SetCullFace(_)
                | Self::SetBlend(_)
                | Self::SetAlphaTest(_)
                | Self::SetStencil(_)
                | Self::BindTexture(..)
                | Self::SetTextureFilter(..)
                | Self::SetTextureCombine(..)
                | Self::SetTexGen(..)
                | Self::SetLight(..)
                | Self::SetAmbientLight(_)
                | Self::SetFog(_)
                | Self::BindAssemblyProgram(..)
                | Self::UseHighLevelProgram(_)
        )
    }

    /// True for draw calls
    pub const fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed { .. } | Self::DrawImmediate { .. })
    }
}

/// Default information reported by the headless backend
pub fn default_info() -> BackendInfo {
    BackendInfo {
        api_name: "Headless".to_string(),
        version: "1.5.0 software".to_string(),
        renderer: "CPU rasteriser".to_string(),
        vendor: "video_driver".to_string(),
        extensions: [
            EXT_MULTITEXTURE,
            EXT_VERTEX_PROGRAM,
            EXT_FRAGMENT_PROGRAM,
            EXT_SHADING_LANGUAGE_100,
            EXT_TEXTURE_FILTER_ANISOTROPIC,
        ]
        .join(" "),
        max_texture_units: 4,
        max_anisotropy: 8.0,
        max_lights: 8,
    }
}

#[derive(Debug, Clone)]
struct HeadlessTexture {
    size: Dimension2,
    levels: Vec<Vec<Color>>,
}

#[derive(Debug, Clone)]
struct HeadlessProgram {
    uniforms: Vec<String>,
}

#[derive(Debug, Clone)]
struct RasterState {
    model_view: Mat4,
    projection: Mat4,
    color_mask: bool,
    blend: BlendMode,
    bound: [Option<BackendTextureId>; 4],
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            model_view: Mat4::identity(),
            projection: Mat4::identity(),
            color_mask: true,
            blend: BlendMode::Disabled,
            bound: [None; 4],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RasterVertex {
    clip: Vec4,
    color: [f32; 4],
    uv: [f32; 2],
}

/// Software backend without a GPU
#[derive(Debug)]
pub struct HeadlessBackend {
    info: BackendInfo,
    size: Dimension2,
    // rows bottom to top
    color_buffer: Vec<Color>,
    viewport: Rect,
    textures: HashMap<BackendTextureId, HeadlessTexture>,
    programs: HashMap<BackendProgramId, HeadlessProgram>,
    next_id: u32,
    state: RasterState,
    saved: Vec<RasterState>,
    current: bool,
    presented: u64,
    calls: Vec<BackendCall>,
}

impl HeadlessBackend {
    /// Create a backend with a drawable of the given size
    pub fn new(info: BackendInfo, size: Dimension2) -> Self {
        Self {
            info,
            size,
            color_buffer: vec![Color::BLACK; size.area()],
            viewport: Rect::from_size(size),
            textures: HashMap::new(),
            programs: HashMap::new(),
            next_id: 1,
            state: RasterState::default(),
            saved: Vec::new(),
            current: true,
            presented: 0,
            calls: Vec::new(),
        }
    }

    /// Recorded calls, oldest first
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget all recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Colour buffer pixel, `y` counted from the top
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return None;
        }
        let row = (self.size.height - 1 - y) as usize;
        self.color_buffer.get(row * self.size.width as usize + x as usize).copied()
    }

    /// Current viewport
    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Mip levels of a live texture
    pub fn texture_levels(&self, texture: BackendTextureId) -> Option<&[Vec<Color>]> {
        self.textures.get(&texture).map(|t| t.levels.as_slice())
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Whether the context is current
    pub const fn is_current(&self) -> bool {
        self.current
    }

    /// Frames presented so far
    pub const fn frames_presented(&self) -> u64 {
        self.presented
    }

    fn record(&mut self, call: BackendCall) {
        log::trace!("headless: {call:?}");
        self.calls.push(call);
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn to_window(&self, clip: Vec4) -> Option<(f32, f32)> {
        if clip.w <= 0.0 {
            return None;
        }
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let vp = self.viewport;
        let x = vp.upper_left.x as f32 + (ndc_x + 1.0) * 0.5 * vp.width() as f32;
        let y = vp.upper_left.y as f32 + (1.0 - ndc_y) * 0.5 * vp.height() as f32;
        Some((x, y))
    }

    fn sample(&self, uv: [f32; 2]) -> Option<[f32; 4]> {
        let texture = self.textures.get(&self.state.bound[0]?)?;
        let level = texture.levels.first()?;
        let w = texture.size.width.max(1);
        let h = texture.size.height.max(1);
        let tx = ((uv[0] * w as f32).floor() as i32).clamp(0, w - 1);
        let ty = ((uv[1] * h as f32).floor() as i32).clamp(0, h - 1);
        let texel = level.get((ty * w + tx) as usize)?;
        Some(ColorF::from(*texel).to_array())
    }

    fn rasterize_triangle(&mut self, vertices: [RasterVertex; 3]) {
        if !self.state.color_mask {
            return;
        }
        let Some(p0) = self.to_window(vertices[0].clip) else { return };
        let Some(p1) = self.to_window(vertices[1].clip) else { return };
        let Some(p2) = self.to_window(vertices[2].clip) else { return };

        let area = edge(p0, p1, p2);
        if area.abs() < f32::EPSILON {
            return;
        }

        let bounds = self.viewport.clipped(&Rect::from_size(self.size));
        let min_x = (p0.0.min(p1.0).min(p2.0).floor() as i32).max(bounds.upper_left.x);
        let max_x = (p0.0.max(p1.0).max(p2.0).ceil() as i32).min(bounds.lower_right.x);
        let min_y = (p0.1.min(p1.1).min(p2.1).floor() as i32).max(bounds.upper_left.y);
        let max_y = (p0.1.max(p1.1).max(p2.1).ceil() as i32).min(bounds.lower_right.y);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(p1, p2, p) / area;
                let w1 = edge(p2, p0, p) / area;
                let w2 = edge(p0, p1, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let mut color = [0.0; 4];
                for (channel, value) in color.iter_mut().enumerate() {
                    *value = w0 * vertices[0].color[channel]
                        + w1 * vertices[1].color[channel]
                        + w2 * vertices[2].color[channel];
                }
                let uv = [
                    w0 * vertices[0].uv[0] + w1 * vertices[1].uv[0] + w2 * vertices[2].uv[0],
                    w0 * vertices[0].uv[1] + w1 * vertices[1].uv[1] + w2 * vertices[2].uv[1],
                ];
                if let Some(texel) = self.sample(uv) {
                    for (channel, value) in color.iter_mut().enumerate() {
                        *value *= texel[channel];
                    }
                }
                self.write_pixel(x, y, color);
            }
        }
    }

    fn write_pixel(&mut self, x: i32, y: i32, color: [f32; 4]) {
        let row = (self.size.height - 1 - y) as usize;
        let index = row * self.size.width as usize + x as usize;
        let Some(dst) = self.color_buffer.get_mut(index) else { return };

        let out = match self.state.blend {
            BlendMode::Enabled {
                src: BlendFactor::SrcAlpha,
                dst: BlendFactor::OneMinusSrcAlpha,
            } => {
                let existing = ColorF::from(*dst).to_array();
                let alpha = color[3];
                [
                    color[0] * alpha + existing[0] * (1.0 - alpha),
                    color[1] * alpha + existing[1] * (1.0 - alpha),
                    color[2] * alpha + existing[2] * (1.0 - alpha),
                    1.0,
                ]
            }
            _ => color,
        };

        let to_byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        *dst = Color::new(to_byte(out[3]), to_byte(out[0]), to_byte(out[1]), to_byte(out[2]));
    }

    fn raster_vertex(&self, position: [f32; 3], color: [u8; 4], uv: [f32; 2]) -> RasterVertex {
        let mvp = self.state.projection * self.state.model_view;
        RasterVertex {
            clip: mvp * Vec4::new(position[0], position[1], position[2], 1.0),
            color: color.map(|c| f32::from(c) / 255.0),
            uv,
        }
    }

    fn rasterize(&mut self, primitive: PrimitiveType, vertices: &[RasterVertex]) {
        match primitive {
            PrimitiveType::Triangles => {
                for tri in vertices.chunks_exact(3) {
                    self.rasterize_triangle([tri[0], tri[1], tri[2]]);
                }
            }
            PrimitiveType::TriangleFan => {
                for i in 1..vertices.len().saturating_sub(1) {
                    self.rasterize_triangle([vertices[0], vertices[i], vertices[i + 1]]);
                }
            }
            PrimitiveType::TriangleStrip => {
                for i in 0..vertices.len().saturating_sub(2) {
                    self.rasterize_triangle([vertices[i], vertices[i + 1], vertices[i + 2]]);
                }
            }
            PrimitiveType::Quads => {
                for quad in vertices.chunks_exact(4) {
                    self.rasterize_triangle([quad[0], quad[1], quad[2]]);
                    self.rasterize_triangle([quad[0], quad[2], quad[3]]);
                }
            }
            PrimitiveType::Lines => {}
        }
    }
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn assembly_header(stage: ProgramStage) -> &'static str {
    match stage {
        ProgramStage::Vertex => "!!ARBvp1.0",
        ProgramStage::Fragment => "!!ARBfp1.0",
    }
}

fn uniform_names(source: &str) -> impl Iterator<Item = String> + '_ {
    source.lines().filter_map(|line| {
        let mut tokens = line.trim().trim_end_matches(';').split_whitespace();
        if tokens.next()? != "uniform" {
            return None;
        }
        let _type = tokens.next()?;
        Some(tokens.next()?.to_string())
    })
}

impl GraphicsBackend for HeadlessBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn make_current(&mut self) -> BackendResult<()> {
        self.current = true;
        self.record(BackendCall::MakeCurrent);
        Ok(())
    }

    fn release_current(&mut self) {
        self.current = false;
        self.record(BackendCall::ReleaseCurrent);
    }

    fn present(&mut self) -> BackendResult<()> {
        self.presented += 1;
        self.record(BackendCall::Present);
        Ok(())
    }

    fn set_viewport(&mut self, area: Rect) {
        self.viewport = area;
        self.record(BackendCall::SetViewport(area));
    }

    fn clear(&mut self, buffers: ClearFlags, color: Color) {
        if buffers.contains(ClearFlags::COLOR) {
            self.color_buffer.fill(color);
        }
        self.record(BackendCall::Clear(buffers, color));
    }

    fn read_pixels(&mut self, size: Dimension2) -> BackendResult<Vec<Color>> {
        self.record(BackendCall::ReadPixels(size));
        let mut out = Vec::with_capacity(size.area());
        for row in 0..size.height {
            for x in 0..size.width {
                let pixel = if row < self.size.height && x < self.size.width {
                    self.color_buffer[(row * self.size.width + x) as usize]
                } else {
                    Color::TRANSPARENT
                };
                out.push(pixel);
            }
        }
        Ok(out)
    }

    fn copy_framebuffer_to_texture(&mut self, texture: BackendTextureId, size: Dimension2) {
        self.record(BackendCall::CopyFramebufferToTexture(texture, size));
        let fb_size = self.size;
        let Some(target) = self.textures.get_mut(&texture) else {
            log::warn!("headless: copy into unknown texture {}", texture.0);
            return;
        };
        let Some(level) = target.levels.first_mut() else { return };

        let width = size.width.min(target.size.width).min(fb_size.width);
        let height = size.height.min(target.size.height).min(fb_size.height);
        for row in 0..height {
            let src_row = height - 1 - row;
            for x in 0..width {
                let src = self.color_buffer[(src_row * fb_size.width + x) as usize];
                level[(row * target.size.width + x) as usize] = src;
            }
        }
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.record(BackendCall::SetCapability(capability, enabled));
    }

    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Mat4) {
        match mode {
            MatrixMode::ModelView => self.state.model_view = *matrix,
            MatrixMode::Projection => self.state.projection = *matrix,
            MatrixMode::Texture(_) => {}
        }
        self.record(BackendCall::LoadMatrix(mode, *matrix));
    }

    fn set_material_colors(&mut self, colors: &MaterialColors) {
        self.record(BackendCall::SetMaterialColors(*colors));
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.record(BackendCall::SetPolygonMode(mode));
    }

    fn set_shade_model(&mut self, model: ShadeModel) {
        self.record(BackendCall::SetShadeModel(model));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.record(BackendCall::SetDepthMask(enabled));
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.state.color_mask = enabled;
        self.record(BackendCall::SetColorMask(enabled));
    }

    fn set_cull_face(&mut self, face: CullFace) {
        self.record(BackendCall::SetCullFace(face));
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        self.record(BackendCall::SetBlend(mode));
    }

    fn set_alpha_test(&mut self, test: AlphaTest) {
        self.record(BackendCall::SetAlphaTest(test));
    }

    fn set_stencil(&mut self, state: StencilState) {
        self.record(BackendCall::SetStencil(state));
    }

    fn bind_texture(&mut self, stage: usize, texture: Option<BackendTextureId>) {
        if let Some(slot) = self.state.bound.get_mut(stage) {
            *slot = texture;
        }
        self.record(BackendCall::BindTexture(stage, texture));
    }

    fn set_texture_filter(&mut self, stage: usize, filter: TextureFilter) {
        self.record(BackendCall::SetTextureFilter(stage, filter));
    }

    fn set_texture_combine(&mut self, stage: usize, combine: TextureCombine) {
        self.record(BackendCall::SetTextureCombine(stage, combine));
    }

    fn set_texgen(&mut self, stage: usize, mode: TexGen) {
        self.record(BackendCall::SetTexGen(stage, mode));
    }

    fn set_light(&mut self, slot: usize, light: &BackendLight) {
        self.record(BackendCall::SetLight(slot, *light));
    }

    fn set_ambient_light(&mut self, color: ColorF) {
        self.record(BackendCall::SetAmbientLight(color));
    }

    fn set_fog(&mut self, fog: &Fog) {
        self.record(BackendCall::SetFog(*fog));
    }

    fn push_state(&mut self) {
        self.saved.push(self.state.clone());
        self.record(BackendCall::PushState);
    }

    fn pop_state(&mut self) {
        match self.saved.pop() {
            Some(state) => self.state = state,
            None => log::warn!("headless: state stack underflow"),
        }
        self.record(BackendCall::PopState);
    }

    fn create_texture(&mut self, upload: &TextureUpload) -> BackendResult<BackendTextureId> {
        let Some(level0) = upload.levels.first() else {
            return Err(BackendError::OutOfMemory("texture without levels".to_string()));
        };
        if upload.size.area() == 0 || level0.len() != upload.size.area() {
            return Err(BackendError::OutOfMemory(format!(
                "texture of {}x{} with {} texels",
                upload.size.width,
                upload.size.height,
                level0.len()
            )));
        }

        let id = BackendTextureId(self.allocate_id());
        self.textures.insert(
            id,
            HeadlessTexture {
                size: upload.size,
                levels: upload.levels.clone(),
            },
        );
        self.record(BackendCall::CreateTexture {
            id,
            size: upload.size,
            levels: upload.levels.len(),
        });
        Ok(id)
    }

    fn delete_texture(&mut self, texture: BackendTextureId) {
        self.textures.remove(&texture);
        for slot in &mut self.state.bound {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
        self.record(BackendCall::DeleteTexture(texture));
    }

    fn create_assembly_program(&mut self, stage: ProgramStage, source: &str) -> BackendResult<BackendProgramId> {
        let trimmed = source.trim();
        if !trimmed.starts_with(assembly_header(stage)) {
            return Err(BackendError::Compile(format!(
                "program does not start with {}",
                assembly_header(stage)
            )));
        }
        if !trimmed.ends_with("END") {
            return Err(BackendError::Compile("program is missing END".to_string()));
        }

        let id = BackendProgramId(self.allocate_id());
        self.programs.insert(id, HeadlessProgram { uniforms: Vec::new() });
        self.record(BackendCall::CreateAssemblyProgram(stage, id));
        Ok(id)
    }

    fn bind_assembly_program(&mut self, stage: ProgramStage, program: Option<BackendProgramId>) {
        self.record(BackendCall::BindAssemblyProgram(stage, program));
    }

    fn set_program_parameter(&mut self, stage: ProgramStage, index: u32, value: [f32; 4]) {
        self.record(BackendCall::SetProgramParameter(stage, index, value));
    }

    fn create_high_level_program(
        &mut self,
        vertex_source: Option<&str>,
        pixel_source: Option<&str>,
    ) -> BackendResult<BackendProgramId> {
        if vertex_source.is_none() && pixel_source.is_none() {
            return Err(BackendError::Link("no shader objects attached".to_string()));
        }

        let mut uniforms = Vec::new();
        for source in [vertex_source, pixel_source].into_iter().flatten() {
            if !source.contains("void main") {
                return Err(BackendError::Compile("missing entry point 'main'".to_string()));
            }
            uniforms.extend(uniform_names(source));
        }

        let id = BackendProgramId(self.allocate_id());
        self.programs.insert(id, HeadlessProgram { uniforms });
        self.record(BackendCall::CreateHighLevelProgram(id));
        Ok(id)
    }

    fn use_high_level_program(&mut self, program: Option<BackendProgramId>) {
        self.record(BackendCall::UseHighLevelProgram(program));
    }

    fn set_uniform(&mut self, program: BackendProgramId, name: &str, values: &[f32]) -> bool {
        let known = self
            .programs
            .get(&program)
            .is_some_and(|p| p.uniforms.iter().any(|u| u == name));
        if known {
            self.record(BackendCall::SetUniform(program, name.to_string(), values.to_vec()));
        }
        known
    }

    fn delete_program(&mut self, program: BackendProgramId) {
        self.programs.remove(&program);
        self.record(BackendCall::DeleteProgram(program));
    }

    fn draw_indexed(&mut self, stream: &VertexStream<'_>, primitive: PrimitiveType, indices: &[u16]) {
        self.record(BackendCall::DrawIndexed {
            vertex_type: stream.vertex_type,
            primitive,
            vertex_count: stream.vertex_count(),
            index_count: indices.len(),
        });

        let layout = stream.vertex_type.layout();
        let (uv_offset, _) = layout.texcoords[0];
        let mut assembled = Vec::with_capacity(indices.len());
        for &index in indices {
            let index = usize::from(index);
            let Some(position) = stream.position(index) else { return };
            let start = index * layout.stride + uv_offset;
            let uv: [f32; 2] = stream
                .data
                .get(start..start + 8)
                .map_or([0.0, 0.0], bytemuck::pod_read_unaligned);
            let color = stream.colors.get(index).copied().unwrap_or([255; 4]);
            assembled.push(self.raster_vertex(position, color, uv));
        }
        self.rasterize(primitive, &assembled);
    }

    fn draw_immediate(&mut self, primitive: PrimitiveType, vertices: &[ImmediateVertex]) {
        self.record(BackendCall::DrawImmediate {
            primitive,
            vertices: vertices.to_vec(),
        });
        let assembled: Vec<RasterVertex> = vertices
            .iter()
            .map(|v| self.raster_vertex(v.position, v.color, v.tcoords))
            .collect();
        self.rasterize(primitive, &assembled);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Factory producing [`HeadlessBackend`]s
#[derive(Debug, Clone)]
pub struct HeadlessFactory {
    info: BackendInfo,
    stencil_available: bool,
    available: bool,
    attempts: u32,
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessFactory {
    /// Factory with the default backend information
    pub fn new() -> Self {
        Self {
            info: default_info(),
            stencil_available: true,
            available: true,
            attempts: 0,
        }
    }

    /// Report custom backend information
    pub fn with_info(mut self, info: BackendInfo) -> Self {
        self.info = info;
        self
    }

    /// Fail every request for a stencil buffer
    pub fn without_stencil(mut self) -> Self {
        self.stencil_available = false;
        self
    }

    /// Fail every request
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Number of `create` calls so far
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl BackendFactory for HeadlessFactory {
    fn create(&mut self, request: &ContextRequest) -> BackendResult<Box<dyn GraphicsBackend>> {
        self.attempts += 1;
        if !self.available {
            return Err(BackendError::ContextUnavailable("headless backend disabled".to_string()));
        }
        if request.stencil_buffer && !self.stencil_available {
            return Err(BackendError::ContextUnavailable(
                "no pixel format with a stencil buffer".to_string(),
            ));
        }
        Ok(Box::new(HeadlessBackend::new(self.info.clone(), request.size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new(default_info(), Dimension2::new(4, 4))
    }

    #[test]
    fn test_read_pixels_is_bottom_up() {
        let mut backend = backend();
        let red = [255, 0, 0, 255];
        // upper half of the screen in normalised coordinates
        backend.draw_immediate(
            PrimitiveType::Quads,
            &[
                ImmediateVertex::colored([-1.0, 1.0, 0.0], red),
                ImmediateVertex::colored([1.0, 1.0, 0.0], red),
                ImmediateVertex::colored([1.0, 0.0, 0.0], red),
                ImmediateVertex::colored([-1.0, 0.0, 0.0], red),
            ],
        );

        let pixels = backend.read_pixels(Dimension2::new(4, 4)).unwrap();
        assert_eq!(pixels[0], Color::BLACK);
        assert_eq!(pixels[15], Color::new(255, 255, 0, 0));
        assert_eq!(backend.pixel(0, 0), Some(Color::new(255, 255, 0, 0)));
    }

    #[test]
    fn test_assembly_programs_are_validated() {
        let mut backend = backend();

        assert!(backend
            .create_assembly_program(ProgramStage::Vertex, "!!ARBvp1.0\nMOV result.position, vertex.position;\nEND")
            .is_ok());
        assert!(matches!(
            backend.create_assembly_program(ProgramStage::Fragment, "!!ARBvp1.0\nEND"),
            Err(BackendError::Compile(_))
        ));
    }

    #[test]
    fn test_uniforms_are_collected_from_sources() {
        let mut backend = backend();
        let program = backend
            .create_high_level_program(Some("uniform mat4 mWorld;\nvoid main() {}"), None)
            .unwrap();

        assert!(backend.set_uniform(program, "mWorld", &[0.0; 16]));
        assert!(!backend.set_uniform(program, "mMissing", &[0.0]));
    }

    #[test]
    fn test_factory_refuses_stencil_when_unavailable() {
        let mut factory = HeadlessFactory::new().without_stencil();
        let mut request = ContextRequest {
            size: Dimension2::new(8, 8),
            stencil_buffer: true,
            vsync: false,
            anti_alias: false,
        };

        assert!(factory.create(&request).is_err());
        request.stencil_buffer = false;
        assert!(factory.create(&request).is_ok());
        assert_eq!(factory.attempts(), 2);
    }

    #[test]
    fn test_push_pop_restores_color_mask() {
        let mut backend = backend();
        backend.push_state();
        backend.set_color_mask(false);
        backend.pop_state();

        assert!(backend.state.color_mask);
    }
}
