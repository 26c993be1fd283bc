//! Capability probing
//!
//! Everything the driver knows about the backend's abilities is derived at
//! initialisation from [`BackendInfo`]: the implementation strings, the
//! advertised extension list and a few numeric limits. Nothing here is a
//! compile-time table.

use crate::render::types::VideoDriverFeature;

/// Multitexturing
pub const EXT_MULTITEXTURE: &str = "GL_ARB_multitexture";
/// Assembly vertex programs
pub const EXT_VERTEX_PROGRAM: &str = "GL_ARB_vertex_program";
/// Assembly fragment programs
pub const EXT_FRAGMENT_PROGRAM: &str = "GL_ARB_fragment_program";
/// High-level shading language
pub const EXT_SHADING_LANGUAGE_100: &str = "GL_ARB_shading_language_100";
/// Anisotropic filtering
pub const EXT_TEXTURE_FILTER_ANISOTROPIC: &str = "GL_EXT_texture_filter_anisotropic";
/// Textures with non power of two sides
pub const EXT_TEXTURE_NON_POWER_OF_TWO: &str = "GL_ARB_texture_non_power_of_two";

/// Implementation strings and limits reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendInfo {
    /// API family name, e.g. "OpenGL"
    pub api_name: String,
    /// Version string, e.g. "1.5.0 NVIDIA 53.03"
    pub version: String,
    /// Renderer string
    pub renderer: String,
    /// Vendor string
    pub vendor: String,
    /// Space separated extension list
    pub extensions: String,
    /// Number of texture units
    pub max_texture_units: u32,
    /// Maximum anisotropy
    pub max_anisotropy: f32,
    /// Number of light slots
    pub max_lights: u32,
}

impl BackendInfo {
    /// True when `name` appears as a whole word in the extension list
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.split_whitespace().any(|ext| ext == name)
    }

    /// Version number parsed from the start of the version string
    pub fn version_number(&self) -> Option<f32> {
        let token = self.version.split_whitespace().next()?;
        let mut parts = token.split('.');
        let major = parts.next()?;
        let minor = parts.next().unwrap_or("0");
        format!("{major}.{minor}").parse().ok()
    }

    /// Driver display name: API family and the first token of the version
    pub fn display_name(&self) -> String {
        match self.version.split_whitespace().next() {
            Some(version) => format!("{} {}", self.api_name, version),
            None => self.api_name.clone(),
        }
    }
}

/// Capabilities the driver negotiated with its backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverCapabilities {
    /// A stencil buffer is attached
    pub stencil_buffer: bool,
    /// More than one texture stage is usable
    pub multi_texture: bool,
    /// Texture units reported by the backend
    pub max_texture_units: u32,
    /// Assembly vertex programs
    pub vertex_program: bool,
    /// Assembly fragment programs
    pub fragment_program: bool,
    /// High-level shaders
    pub high_level_shaders: bool,
    /// Anisotropic filtering
    pub anisotropic_filter: bool,
    /// Maximum anisotropy
    pub max_anisotropy: f32,
    /// Non power of two texture sizes
    pub non_power_of_two: bool,
    /// Light slots
    pub max_lights: u32,
}

impl DriverCapabilities {
    /// Derive capabilities from backend information
    ///
    /// # Arguments
    /// * `info` - Probed backend information
    /// * `stencil_buffer` - Whether the context was created with a stencil buffer
    pub fn probe(info: &BackendInfo, stencil_buffer: bool) -> Self {
        match info.version_number() {
            Some(version) if version >= 1.2 => log::info!("Backend version {version} is 1.2 or better"),
            _ => log::warn!("Backend version '{}' is older than 1.2, some features may be missing", info.version),
        }

        let mut multi_texture = info.has_extension(EXT_MULTITEXTURE);
        if !multi_texture {
            log::warn!("Multitexture extension not available, proceeding without");
        } else if info.max_texture_units < 2 {
            multi_texture = false;
            log::warn!("Backend only has one texture unit, disabling multitexturing");
        }

        let caps = Self {
            stencil_buffer,
            multi_texture,
            max_texture_units: info.max_texture_units.max(1),
            vertex_program: info.has_extension(EXT_VERTEX_PROGRAM),
            fragment_program: info.has_extension(EXT_FRAGMENT_PROGRAM),
            high_level_shaders: info.has_extension(EXT_SHADING_LANGUAGE_100),
            anisotropic_filter: info.has_extension(EXT_TEXTURE_FILTER_ANISOTROPIC),
            max_anisotropy: info.max_anisotropy.max(1.0),
            non_power_of_two: info.has_extension(EXT_TEXTURE_NON_POWER_OF_TWO),
            max_lights: info.max_lights,
        };

        if caps.multi_texture {
            log::info!("Multitexturing active with {} texture units", caps.max_texture_units);
        }
        caps
    }

    /// Answer a feature query
    pub const fn supports(&self, feature: VideoDriverFeature) -> bool {
        match feature {
            // baseline of every GraphicsBackend: filtered sampling, mip
            // uploads and framebuffer copies are required trait methods
            VideoDriverFeature::BilinearFilter
            | VideoDriverFeature::RenderToTarget
            | VideoDriverFeature::MipMap => true,
            VideoDriverFeature::StencilBuffer => self.stencil_buffer,
            VideoDriverFeature::VertexProgram1 => self.vertex_program,
            VideoDriverFeature::FragmentProgram1 => self.fragment_program,
            VideoDriverFeature::HighLevelShaders => self.high_level_shaders,
            VideoDriverFeature::MultiTexture => self.multi_texture,
            VideoDriverFeature::AnisotropicFilter => self.anisotropic_filter,
            VideoDriverFeature::NonPowerOfTwoTextures => self.non_power_of_two,
        }
    }

    /// Number of texture stages the driver drives
    pub fn texture_stages(&self, max_material_textures: usize) -> usize {
        if self.multi_texture {
            (self.max_texture_units as usize).min(max_material_textures)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(extensions: &str, units: u32) -> BackendInfo {
        BackendInfo {
            api_name: "OpenGL".to_string(),
            version: "1.5.0 Test".to_string(),
            renderer: "Test renderer".to_string(),
            vendor: "Test vendor".to_string(),
            extensions: extensions.to_string(),
            max_texture_units: units,
            max_anisotropy: 8.0,
            max_lights: 8,
        }
    }

    #[test]
    fn test_extension_scanning_matches_whole_words() {
        let info = info("GL_ARB_multitexture_extra GL_ARB_vertex_program", 4);

        assert!(!info.has_extension(EXT_MULTITEXTURE));
        assert!(info.has_extension(EXT_VERTEX_PROGRAM));
    }

    #[test]
    fn test_single_texture_unit_disables_multitexture() {
        let caps = DriverCapabilities::probe(&info(EXT_MULTITEXTURE, 1), false);

        assert!(!caps.multi_texture);
        assert_eq!(caps.texture_stages(4), 1);
    }

    #[test]
    fn test_feature_flags_follow_extensions() {
        let caps = DriverCapabilities::probe(
            &info("GL_ARB_multitexture GL_ARB_fragment_program GL_EXT_texture_filter_anisotropic", 2),
            true,
        );

        assert!(caps.supports(VideoDriverFeature::StencilBuffer));
        assert!(caps.supports(VideoDriverFeature::FragmentProgram1));
        assert!(!caps.supports(VideoDriverFeature::VertexProgram1));
        assert!(!caps.supports(VideoDriverFeature::HighLevelShaders));
        assert!(caps.supports(VideoDriverFeature::AnisotropicFilter));
        assert_eq!(caps.texture_stages(4), 2);
    }

    #[test]
    fn test_display_name_uses_first_version_token() {
        let info = info("", 1);

        assert_eq!(info.display_name(), "OpenGL 1.5.0");
        assert_eq!(info.version_number(), Some(1.5));
    }

    #[test]
    fn test_baseline_features_need_no_extensions() {
        let caps = DriverCapabilities::probe(&info("", 1), false);

        assert!(caps.supports(VideoDriverFeature::BilinearFilter));
        assert!(caps.supports(VideoDriverFeature::RenderToTarget));
        assert!(caps.supports(VideoDriverFeature::MipMap));
        assert!(!caps.supports(VideoDriverFeature::MultiTexture));
        assert!(!caps.supports(VideoDriverFeature::StencilBuffer));
    }
}
