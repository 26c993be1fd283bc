//! Scene bracketing and context ownership

use std::ops::{Deref, DerefMut};

use crate::foundation::color::Color;
use crate::foundation::math::Dimension2;
use crate::render::error::DriverResult;
use crate::render::types::{ClearFlags, FrameStats};

use super::VideoDriver;

/// The driver with its context current on the calling thread
///
/// The context is released again when the guard is dropped.
#[derive(Debug)]
pub struct CurrentContext<'a> {
    driver: &'a mut VideoDriver,
}

impl Deref for CurrentContext<'_> {
    type Target = VideoDriver;

    fn deref(&self) -> &VideoDriver {
        self.driver
    }
}

impl DerefMut for CurrentContext<'_> {
    fn deref_mut(&mut self) -> &mut VideoDriver {
        self.driver
    }
}

impl Drop for CurrentContext<'_> {
    fn drop(&mut self) {
        self.driver.backend.release_current();
    }
}

impl VideoDriver {
    /// Make the backend context current for the lifetime of the returned guard
    ///
    /// # Errors
    /// `Backend` when the context cannot be made current.
    pub fn make_current(&mut self) -> DriverResult<CurrentContext<'_>> {
        self.backend.make_current().map_err(|err| {
            log::error!("Could not make the context current: {err}");
            err
        })?;
        Ok(CurrentContext { driver: self })
    }

    /// Start a frame
    ///
    /// Resets the frame statistics and clears the requested buffers.
    pub fn begin_scene(&mut self, clear_back_buffer: bool, clear_z_buffer: bool, color: Color) {
        self.stats = FrameStats {
            frame: self.stats.frame,
            ..FrameStats::default()
        };
        self.clear_buffers(clear_back_buffer, clear_z_buffer, color);
    }

    /// Finish a frame and present it
    ///
    /// Returns false when presenting failed.
    pub fn end_scene(&mut self) -> bool {
        self.stats.frame += 1;
        match self.backend.present() {
            Ok(()) => true,
            Err(err) => {
                log::error!("Could not present frame {}: {err}", self.stats.frame);
                false
            }
        }
    }

    /// React to a resized drawable
    pub fn on_resize(&mut self, size: Dimension2) {
        log::debug!("Drawable resized to {}x{}", size.width, size.height);
        self.screen_size = size;
        if self.render_target.is_none() {
            self.set_screen_viewport();
        }
    }

    /// Clear the depth buffer only
    pub fn clear_z_buffer(&mut self) {
        self.backend.set_depth_mask(true);
        self.cache.note_depth_mask(true);
        self.backend.clear(ClearFlags::DEPTH, Color::TRANSPARENT);
    }
}
