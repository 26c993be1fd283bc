//! 2D drawing in render target pixels
//!
//! Positions are pixels of the current render target with the origin in the
//! upper left corner. Everything is clipped on the CPU; a blit that clips to
//! nothing is dropped without touching the backend.

use crate::foundation::color::Color;
use crate::foundation::math::{Position2, Rect};
use crate::render::error::DriverResult;
use crate::render::resources::TextureHandle;
use crate::render::types::PrimitiveType;
use crate::render::vertex::ImmediateVertex;

use super::ndc::{texel_rect, NdcMapping};
use super::VideoDriver;

/// Clip one axis of a blit against `min..max`
///
/// Moves the target and source start forward by what is cut on the low side
/// and shortens the extent. Returns false when nothing is left.
fn clip_axis(target: &mut i32, source: &mut i32, extent: &mut i32, min: i32, max: i32) -> bool {
    if *extent <= 0 {
        return false;
    }
    if *target < min {
        let cut = min - *target;
        *extent -= cut;
        if *extent <= 0 {
            return false;
        }
        *source += cut;
        *target = min;
    }
    let excess = *target + *extent - max;
    if excess > 0 {
        *extent -= excess;
        if *extent <= 0 {
            return false;
        }
    }
    true
}

impl VideoDriver {
    fn ndc(&self) -> NdcMapping {
        NdcMapping::new(self.current_render_target_size())
    }

    /// Draw part of a texture unscaled at a pixel position
    ///
    /// # Arguments
    /// * `texture` - Texture to draw from
    /// * `position` - Upper left corner of the image on the render target
    /// * `source` - Part of the texture to draw, in texels of the original image
    /// * `clip` - Optional clip rectangle
    /// * `color` - Vertex colour the texels are modulated with
    /// * `use_alpha_channel` - Blend by the texture's alpha channel
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for unusable textures.
    pub fn draw_2d_image(
        &mut self,
        texture: TextureHandle,
        position: Position2,
        source: Rect,
        clip: Option<&Rect>,
        color: Color,
        use_alpha_channel: bool,
    ) -> DriverResult<()> {
        let (texture_id, texture_size) = self.texture_for_draw(texture)?;

        let mut target = position;
        let mut source_pos = source.upper_left;
        let mut size = source.size();

        let target_size = self.current_render_target_size();
        let bounds = [clip.copied(), Some(Rect::from_size(target_size))];
        for bound in bounds.iter().flatten() {
            let visible = clip_axis(
                &mut target.x,
                &mut source_pos.x,
                &mut size.width,
                bound.upper_left.x,
                bound.lower_right.x,
            ) && clip_axis(
                &mut target.y,
                &mut source_pos.y,
                &mut size.height,
                bound.upper_left.y,
                bound.lower_right.y,
            );
            if !visible {
                log::trace!("2D image clipped away");
                return Ok(());
            }
        }

        let [left, top, right, bottom] = texel_rect(
            source_pos.x as f32,
            source_pos.y as f32,
            size.width as f32,
            size.height as f32,
            texture_size,
        );
        let corners = self.ndc().quad(&Rect::from_position_size(target, size), true);

        self.prepare_2d(Some(texture_id), color.alpha() < 255, use_alpha_channel);

        let rgba = color.to_backend_rgba();
        let vertices = [
            ImmediateVertex::textured(corners[0], rgba, [left, top]),
            ImmediateVertex::textured(corners[1], rgba, [right, top]),
            ImmediateVertex::textured(corners[2], rgba, [right, bottom]),
            ImmediateVertex::textured(corners[3], rgba, [left, bottom]),
        ];
        self.backend.draw_immediate(PrimitiveType::Quads, &vertices);
        self.record_draw(2);
        Ok(())
    }

    /// Draw part of a texture stretched into a destination rectangle
    ///
    /// `colors` are given upper left, lower left, lower right, upper right and
    /// default to opaque white. The destination is clipped against `clip` and
    /// the render target, and the source shrinks in proportion.
    ///
    /// # Errors
    /// `CrossDriverResource` or `InvalidHandle` for unusable textures.
    pub fn draw_2d_image_scaled(
        &mut self,
        texture: TextureHandle,
        dest: Rect,
        source: Rect,
        clip: Option<&Rect>,
        colors: Option<&[Color; 4]>,
        use_alpha_channel: bool,
    ) -> DriverResult<()> {
        let (texture_id, texture_size) = self.texture_for_draw(texture)?;
        if dest.is_empty() || source.is_empty() {
            return Ok(());
        }

        let mut visible = Rect::from_size(self.current_render_target_size());
        if let Some(clip) = clip {
            visible.clip_against(clip);
        }
        let clipped = dest.clipped(&visible);
        if clipped.is_empty() {
            log::trace!("Scaled 2D image clipped away");
            return Ok(());
        }

        let scale_x = source.width() as f32 / dest.width() as f32;
        let scale_y = source.height() as f32 / dest.height() as f32;
        let source_left = source.upper_left.x as f32 + (clipped.upper_left.x - dest.upper_left.x) as f32 * scale_x;
        let source_top = source.upper_left.y as f32 + (clipped.upper_left.y - dest.upper_left.y) as f32 * scale_y;
        let [left, top, right, bottom] = texel_rect(
            source_left,
            source_top,
            clipped.width() as f32 * scale_x,
            clipped.height() as f32 * scale_y,
            texture_size,
        );

        let white = [Color::WHITE; 4];
        let colors = colors.unwrap_or(&white);
        let alpha = colors.iter().any(Color::is_translucent);

        let corners = self.ndc().quad(&clipped, true);
        self.prepare_2d(Some(texture_id), alpha, use_alpha_channel);

        let vertices = [
            ImmediateVertex::textured(corners[0], colors[0].to_backend_rgba(), [left, top]),
            ImmediateVertex::textured(corners[1], colors[3].to_backend_rgba(), [right, top]),
            ImmediateVertex::textured(corners[2], colors[2].to_backend_rgba(), [right, bottom]),
            ImmediateVertex::textured(corners[3], colors[1].to_backend_rgba(), [left, bottom]),
        ];
        self.backend.draw_immediate(PrimitiveType::Quads, &vertices);
        self.record_draw(2);
        Ok(())
    }

    /// Fill a rectangle with one colour
    pub fn draw_2d_rectangle(&mut self, color: Color, rect: Rect, clip: Option<&Rect>) {
        self.draw_2d_rectangle_gradient(rect, [color; 4], clip);
    }

    /// Fill a rectangle with a colour per corner
    ///
    /// `colors` are upper left, upper right, lower left, lower right.
    pub fn draw_2d_rectangle_gradient(&mut self, rect: Rect, colors: [Color; 4], clip: Option<&Rect>) {
        let mut area = rect;
        if let Some(clip) = clip {
            area.clip_against(clip);
        }
        if !area.is_valid() || area.is_empty() {
            return;
        }

        let [left_up, right_up, left_down, right_down] = colors;
        let alpha = colors.iter().any(Color::is_translucent);
        let corners = self.ndc().quad(&area, false);

        self.prepare_2d(None, alpha, false);

        let vertices = [
            ImmediateVertex::colored(corners[0], left_up.to_backend_rgba()),
            ImmediateVertex::colored(corners[1], right_up.to_backend_rgba()),
            ImmediateVertex::colored(corners[2], right_down.to_backend_rgba()),
            ImmediateVertex::colored(corners[3], left_down.to_backend_rgba()),
        ];
        self.backend.draw_immediate(PrimitiveType::Quads, &vertices);
        self.record_draw(2);
    }

    /// Draw a one pixel wide line
    pub fn draw_2d_line(&mut self, start: Position2, end: Position2, color: Color) {
        let ndc = self.ndc();
        self.prepare_2d(None, color.alpha() < 255, false);

        let rgba = color.to_backend_rgba();
        let vertices = [
            ImmediateVertex::colored(ndc.point(start.x, start.y), rgba),
            ImmediateVertex::colored(ndc.point(end.x, end.y), rgba),
        ];
        self.backend.draw_immediate(PrimitiveType::Lines, &vertices);
        self.record_draw(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_axis_cuts_low_side() {
        let (mut target, mut source, mut extent) = (-3, 0, 10);

        assert!(clip_axis(&mut target, &mut source, &mut extent, 0, 100));
        assert_eq!((target, source, extent), (0, 3, 7));
    }

    #[test]
    fn test_clip_axis_cuts_high_side() {
        let (mut target, mut source, mut extent) = (95, 2, 10);

        assert!(clip_axis(&mut target, &mut source, &mut extent, 0, 100));
        assert_eq!((target, source, extent), (95, 2, 5));
    }

    #[test]
    fn test_clip_axis_rejects_outside() {
        let (mut target, mut source, mut extent) = (-20, 0, 10);
        assert!(!clip_axis(&mut target, &mut source, &mut extent, 0, 100));

        let (mut target, mut source, mut extent) = (100, 0, 10);
        assert!(!clip_axis(&mut target, &mut source, &mut extent, 0, 100));
    }
}
