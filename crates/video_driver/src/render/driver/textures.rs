//! Texture creation, lookup and destruction

use crate::render::backend::TextureUpload;
use crate::render::error::{DriverError, DriverResult};
use crate::render::image::Image;
use crate::render::resources::mipmap::{build_mip_chain, quantise_16bit, scale_nearest};
use crate::render::resources::{TextureEntry, TextureHandle};
use crate::render::types::TextureCreationFlags;

use super::VideoDriver;

impl VideoDriver {
    /// Create a texture from a decoded image
    ///
    /// The current texture creation flags decide about mip maps and 16 bit
    /// quantisation. Without non-power-of-two support the texels are scaled
    /// up to the next power of two; the original size is kept for 2D drawing.
    ///
    /// # Errors
    /// `UnsupportedFormat` for compressed or empty images, `Backend` when the
    /// backend cannot allocate the texture.
    pub fn add_texture(&mut self, name: &str, image: &Image) -> DriverResult<TextureHandle> {
        let original_size = image.size();
        if original_size.area() == 0 {
            log::error!("Cannot create texture '{name}' from an empty image");
            return Err(DriverError::UnsupportedFormat("empty image".to_string()));
        }

        let mut pixels = image.to_colors().map_err(|err| {
            log::error!("Cannot create texture '{name}': {err}");
            err
        })?;

        let mut size = original_size;
        if !self.caps.non_power_of_two && !original_size.is_power_of_two() {
            size = original_size.next_power_of_two();
            log::debug!(
                "Scaling texture '{name}' from {}x{} to {}x{}",
                original_size.width,
                original_size.height,
                size.width,
                size.height
            );
            pixels = scale_nearest(&pixels, original_size, size);
        }

        if self.texture_flags.contains(TextureCreationFlags::ALWAYS_16_BIT) {
            quantise_16bit(&mut pixels);
        }

        let has_mip_maps = self.texture_flags.contains(TextureCreationFlags::CREATE_MIP_MAPS);
        let levels = if has_mip_maps { build_mip_chain(pixels, size) } else { vec![pixels] };

        let backend_id = self
            .backend
            .create_texture(&TextureUpload { size, levels })
            .map_err(|err| {
                log::error!("Backend could not create texture '{name}': {err}");
                DriverError::from(err)
            })?;

        let mut entry = TextureEntry::new(name, backend_id, original_size, size);
        entry.has_mip_maps = has_mip_maps;
        let handle = self.textures.insert(entry);
        log::debug!("Created texture '{name}' ({}x{})", size.width, size.height);
        Ok(handle)
    }

    /// Find a texture by the name it was created with
    pub fn find_texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.find(name)
    }

    /// Metadata of a texture
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for textures this driver cannot use.
    pub fn texture_info(&self, handle: TextureHandle) -> DriverResult<&TextureEntry> {
        self.textures.resolve(handle)
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Add an owner to a texture
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for textures this driver cannot use.
    pub fn grab_texture(&mut self, handle: TextureHandle) -> DriverResult<()> {
        self.textures.grab(handle)
    }

    /// Drop an owner; the texture is destroyed when the last owner is gone
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for textures this driver cannot use.
    pub fn release_texture(&mut self, handle: TextureHandle) -> DriverResult<()> {
        if let Some(entry) = self.textures.release(handle)? {
            self.destroy_texture(handle, &entry);
        }
        Ok(())
    }

    /// Destroy a texture regardless of its owners
    ///
    /// Removing a texture twice is harmless.
    ///
    /// # Errors
    /// `CrossDriverResource` for textures of another driver.
    pub fn remove_texture(&mut self, handle: TextureHandle) -> DriverResult<()> {
        match self.textures.remove(handle)? {
            Some(entry) => self.destroy_texture(handle, &entry),
            None => log::debug!("Texture was already removed"),
        }
        Ok(())
    }

    /// Destroy every texture
    pub fn remove_all_textures(&mut self) {
        if self.render_target.take().is_some() {
            self.set_screen_viewport();
        }
        let entries = self.textures.drain();
        log::debug!("Removing all {} textures", entries.len());
        for entry in entries {
            self.backend.delete_texture(entry.backend_id);
        }
        self.cache.forget_all_textures();
    }

    /// Change one texture creation flag
    ///
    /// `ALWAYS_16_BIT` and `ALWAYS_32_BIT` exclude each other, as do the two
    /// optimisation flags; setting one clears the other.
    pub fn set_texture_creation_flag(&mut self, flag: TextureCreationFlags, enabled: bool) {
        if enabled {
            if flag.contains(TextureCreationFlags::ALWAYS_16_BIT) {
                self.texture_flags.remove(TextureCreationFlags::ALWAYS_32_BIT);
            }
            if flag.contains(TextureCreationFlags::ALWAYS_32_BIT) {
                self.texture_flags.remove(TextureCreationFlags::ALWAYS_16_BIT);
            }
            if flag.contains(TextureCreationFlags::OPTIMIZED_FOR_QUALITY) {
                self.texture_flags.remove(TextureCreationFlags::OPTIMIZED_FOR_SPEED);
            }
            if flag.contains(TextureCreationFlags::OPTIMIZED_FOR_SPEED) {
                self.texture_flags.remove(TextureCreationFlags::OPTIMIZED_FOR_QUALITY);
            }
        }
        self.texture_flags.set(flag, enabled);
    }

    /// Whether a texture creation flag is set
    pub fn texture_creation_flag(&self, flag: TextureCreationFlags) -> bool {
        self.texture_flags.contains(flag)
    }

    fn destroy_texture(&mut self, handle: TextureHandle, entry: &TextureEntry) {
        if self.render_target == Some(handle) {
            log::debug!("Destroying the active render target, drawing to the screen again");
            self.render_target = None;
            self.set_screen_viewport();
        }
        self.cache.forget_texture(handle, entry.backend_id);
        self.backend.delete_texture(entry.backend_id);
        log::debug!("Destroyed texture '{}'", entry.name);
    }
}
