//! Render targets, viewport and screenshots
//!
//! The backend has no offscreen framebuffers. Rendering into a texture draws
//! into the lower-left part of the back buffer, and switching away from the
//! target copies that area into the texture.

use crate::foundation::color::Color;
use crate::foundation::math::{Dimension2, Rect};
use crate::render::error::DriverResult;
use crate::render::image::Image;
use crate::render::resources::TextureHandle;
use crate::render::types::{ClearFlags, TextureCreationFlags};

use super::VideoDriver;

impl VideoDriver {
    /// Create a texture that can be used as render target
    ///
    /// Render targets never have mip maps; the mip map creation flag is
    /// restored afterwards whatever its value was.
    ///
    /// # Errors
    /// `Backend` when the backend cannot allocate the texture.
    pub fn create_render_target_texture(&mut self, size: Dimension2) -> DriverResult<TextureHandle> {
        let create_mip_maps = self.texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS);
        self.set_texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS, false);
        let result = self.add_texture("rt", &Image::blank(size));
        self.set_texture_creation_flag(TextureCreationFlags::CREATE_MIP_MAPS, create_mip_maps);

        let handle = result?;
        self.textures.mark_render_target(handle)?;
        Ok(handle)
    }

    /// Redirect drawing into a texture, or back to the screen with `None`
    ///
    /// The previous target receives what was drawn into it before the switch.
    ///
    /// # Arguments
    /// * `target` - Render target texture, `None` for the screen
    /// * `clear_back_buffer` - Clear the colour buffer to `color`
    /// * `clear_z_buffer` - Clear the depth buffer
    /// * `color` - Clear colour
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for textures this driver
    /// cannot use; nothing is changed then.
    pub fn set_render_target(
        &mut self,
        target: Option<TextureHandle>,
        clear_back_buffer: bool,
        clear_z_buffer: bool,
        color: Color,
    ) -> DriverResult<()> {
        let target_size = match target {
            Some(handle) => Some(self.textures.resolve(handle)?.size),
            None => None,
        };

        if let Some(current) = self.render_target.take() {
            match self.textures.resolve(current) {
                Ok(entry) => {
                    let (id, size) = (entry.backend_id, entry.size);
                    self.backend.copy_framebuffer_to_texture(id, size);
                }
                Err(err) => log::warn!("Previous render target is gone: {err}"),
            }
            self.set_screen_viewport();
        }

        if let (Some(handle), Some(size)) = (target, target_size) {
            self.render_target = Some(handle);
            if size.width > self.screen_size.width || size.height > self.screen_size.height {
                log::warn!(
                    "Render target {}x{} is larger than the screen {}x{}, only the visible part receives drawing",
                    size.width,
                    size.height,
                    self.screen_size.width,
                    self.screen_size.height
                );
            }
            // lower-left corner of the back buffer, in top-left coordinates
            let area = Rect::new(0, self.screen_size.height - size.height, size.width, self.screen_size.height)
                .clipped(&Rect::from_size(self.screen_size));
            self.backend.set_viewport(area);
            self.viewport = area;
        }

        self.clear_buffers(clear_back_buffer, clear_z_buffer, color);
        Ok(())
    }

    /// Active render target, `None` when drawing to the screen
    pub const fn render_target(&self) -> Option<TextureHandle> {
        self.render_target
    }

    /// Size of the surface 2D drawing maps to
    pub fn current_render_target_size(&self) -> Dimension2 {
        self.render_target
            .and_then(|handle| self.textures.resolve(handle).ok())
            .map_or(self.screen_size, |entry| entry.size)
    }

    /// Restrict drawing to a part of the screen
    ///
    /// The area is clipped against the screen; an area that clips to nothing
    /// leaves the viewport unchanged.
    pub fn set_viewport(&mut self, area: Rect) {
        let clipped = area.clipped(&Rect::from_size(self.screen_size));
        if clipped.is_empty() {
            log::debug!("Ignoring empty viewport");
            return;
        }
        self.backend.set_viewport(clipped);
        self.viewport = clipped;
    }

    /// Current viewport
    pub const fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Read the screen back into an image, rows top to bottom
    ///
    /// # Errors
    /// `Backend` when the colour buffer cannot be read.
    pub fn create_screenshot(&mut self) -> DriverResult<Image> {
        let size = self.screen_size;
        let pixels = self.backend.read_pixels(size).map_err(|err| {
            log::error!("Could not read the colour buffer: {err}");
            err
        })?;

        let Ok(width) = usize::try_from(size.width) else {
            return Ok(Image::blank(Dimension2::new(0, 0)));
        };
        if width == 0 {
            return Ok(Image::blank(size));
        }

        // the backend delivers rows bottom to top
        let flipped: Vec<Color> = pixels.chunks_exact(width).rev().flatten().copied().collect();
        Ok(Image::from_colors(size, &flipped))
    }

    pub(super) fn set_screen_viewport(&mut self) {
        let screen = Rect::from_size(self.screen_size);
        self.backend.set_viewport(screen);
        self.viewport = screen;
    }

    pub(super) fn clear_buffers(&mut self, color_buffer: bool, z_buffer: bool, color: Color) {
        let mut buffers = ClearFlags::empty();
        if color_buffer {
            buffers |= ClearFlags::COLOR;
        }
        if z_buffer {
            // depth clears only reach the buffer with depth writes on
            self.backend.set_depth_mask(true);
            self.cache.note_depth_mask(true);
            buffers |= ClearFlags::DEPTH;
        }
        if !buffers.is_empty() {
            self.backend.clear(buffers, color);
        }
    }
}
