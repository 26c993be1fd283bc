//! Video driver configuration
//!
//! Settings read once when a [`crate::render::VideoDriver`] is created. Every
//! field has a default, so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::foundation::math::Dimension2;
use crate::render::lighting::Fog;
use crate::render::types::TextureCreationFlags;

/// Texture creation defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureCreationConfig {
    /// Generate mip maps for new textures
    pub create_mip_maps: bool,
    /// Quantise texels to 16 bits
    pub always_16_bit: bool,
    /// Keep texels at 32 bits
    pub always_32_bit: bool,
    /// Prefer quality over speed
    pub optimized_for_quality: bool,
    /// Prefer speed over quality
    pub optimized_for_speed: bool,
}

impl Default for TextureCreationConfig {
    fn default() -> Self {
        Self {
            create_mip_maps: true,
            always_16_bit: false,
            always_32_bit: false,
            optimized_for_quality: true,
            optimized_for_speed: false,
        }
    }
}

impl TextureCreationConfig {
    /// Flag set equivalent of this configuration
    pub fn flags(&self) -> TextureCreationFlags {
        let mut flags = TextureCreationFlags::empty();
        flags.set(TextureCreationFlags::CREATE_MIP_MAPS, self.create_mip_maps);
        flags.set(TextureCreationFlags::ALWAYS_16_BIT, self.always_16_bit);
        flags.set(TextureCreationFlags::ALWAYS_32_BIT, self.always_32_bit);
        flags.set(TextureCreationFlags::OPTIMIZED_FOR_QUALITY, self.optimized_for_quality);
        flags.set(TextureCreationFlags::OPTIMIZED_FOR_SPEED, self.optimized_for_speed);
        flags
    }
}

/// Video driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Drawable size in pixels
    pub screen_size: Dimension2,
    /// Ask for a stencil buffer (needed for stencil shadows)
    pub stencil_buffer: bool,
    /// Synchronise presentation with the display refresh
    pub vsync: bool,
    /// Ask for a multisampled drawable
    pub anti_alias: bool,
    /// Draw calls with more primitives are skipped
    pub max_primitives_per_call: u32,
    /// Id of the first built-in material renderer
    pub material_type_base: i32,
    /// Texture creation defaults
    pub textures: TextureCreationConfig,
    /// Fog applied at start-up
    pub fog: Fog,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            screen_size: Dimension2::new(800, 600),
            stencil_buffer: false,
            vsync: false,
            anti_alias: false,
            max_primitives_per_call: 65535,
            material_type_base: 0,
            textures: TextureCreationConfig::default(),
            fog: Fog::default(),
        }
    }
}

impl Config for DriverConfig {}

impl DriverConfig {
    /// Builder-style screen size
    pub fn with_screen_size(mut self, width: i32, height: i32) -> Self {
        self.screen_size = Dimension2::new(width, height);
        self
    }

    /// Builder-style stencil buffer request
    pub fn with_stencil_buffer(mut self, enabled: bool) -> Self {
        self.stencil_buffer = enabled;
        self
    }

    /// Builder-style primitive limit
    pub fn with_max_primitives_per_call(mut self, limit: u32) -> Self {
        self.max_primitives_per_call = limit;
        self
    }

    /// Builder-style material type base
    pub fn with_material_type_base(mut self, base: i32) -> Self {
        self.material_type_base = base;
        self
    }

    /// Builder-style texture defaults
    pub fn with_textures(mut self, textures: TextureCreationConfig) -> Self {
        self.textures = textures;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::config::ConfigError;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();

        assert_eq!(config.screen_size, Dimension2::new(800, 600));
        assert_eq!(config.max_primitives_per_call, 65535);
        assert_eq!(config.material_type_base, 0);
        assert!(config.textures.flags().contains(TextureCreationFlags::CREATE_MIP_MAPS));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DriverConfig = toml::from_str(
            "stencil_buffer = true\n\n[screen_size]\nwidth = 320\nheight = 200\n\n[textures]\ncreate_mip_maps = false\n",
        )
        .unwrap();

        assert!(config.stencil_buffer);
        assert_eq!(config.screen_size, Dimension2::new(320, 200));
        assert!(!config.textures.create_mip_maps);
        assert!(config.textures.optimized_for_quality);
        assert_eq!(config.max_primitives_per_call, 65535);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = DriverConfig::default().with_screen_size(64, 48).with_material_type_base(100);

        let text = ron::ser::to_string(&config).unwrap();
        let parsed: DriverConfig = ron::from_str(&text).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        writeln!(file, "stencil_buffer = true").unwrap();

        let err = DriverConfig::load_from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_saved_toml_loads_back() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let config = DriverConfig::default().with_screen_size(320, 200).with_stencil_buffer(true);

        config.save_to_file(file.path()).unwrap();
        let loaded = DriverConfig::load_from_file(file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_ron_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        write!(file, "(screen_size: ").unwrap();

        let err = DriverConfig::load_from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
