//! Pixel to normalised device coordinate mapping for 2D drawing
//!
//! 2D drawing loads identity matrices and hands the backend normalised
//! device coordinates directly. x runs from -1 at the left edge to +1 at the
//! right edge, y from +1 at the top to -1 at the bottom.

use crate::foundation::math::{Dimension2, Position2, Rect};

#[derive(Debug, Clone, Copy)]
pub(super) struct NdcMapping {
    x_plus: i32,
    x_fact: f32,
    y_plus: i32,
    y_fact: f32,
}

impl NdcMapping {
    /// Mapping for a render target of the given size
    pub(super) fn new(target: Dimension2) -> Self {
        let half_width = target.width >> 1;
        let half_height = target.height >> 1;
        Self {
            x_plus: -half_width,
            x_fact: 1.0 / half_width.max(1) as f32,
            y_plus: target.height - half_height,
            y_fact: 1.0 / half_height.max(1) as f32,
        }
    }

    /// Pixel corner to device coordinates
    pub(super) fn point(&self, x: i32, y: i32) -> [f32; 3] {
        [
            (x + self.x_plus) as f32 * self.x_fact,
            (self.y_plus - y) as f32 * self.y_fact,
            0.0,
        ]
    }

    /// Pixel corner of an image blit, shifted by half a pixel onto the texel centre
    pub(super) fn image_point(&self, x: i32, y: i32) -> [f32; 3] {
        [
            ((x + self.x_plus) as f32 + 0.5) * self.x_fact,
            ((self.y_plus - y) as f32 + 0.5) * self.y_fact,
            0.0,
        ]
    }

    /// Corners of a rectangle in quad order: upper left, upper right, lower right, lower left
    pub(super) fn quad(&self, rect: &Rect, image: bool) -> [[f32; 3]; 4] {
        let map = |p: Position2| if image { self.image_point(p.x, p.y) } else { self.point(p.x, p.y) };
        let ul = rect.upper_left;
        let lr = rect.lower_right;
        [
            map(ul),
            map(Position2::new(lr.x, ul.y)),
            map(lr),
            map(Position2::new(ul.x, lr.y)),
        ]
    }
}

/// Texture coordinates of a source rectangle, sampling texel centres
///
/// Returns (left, top, right, bottom).
pub(super) fn texel_rect(left: f32, top: f32, width: f32, height: f32, texture: Dimension2) -> [f32; 4] {
    let inv_width = 1.0 / texture.width.max(1) as f32;
    let inv_height = 1.0 / texture.height.max(1) as f32;
    [
        (left + 0.5) * inv_width,
        (top + 0.5) * inv_height,
        (left + 0.5 + width) * inv_width,
        (top + 0.5 + height) * inv_height,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_screen_corners_map_to_unit_square() {
        let ndc = NdcMapping::new(Dimension2::new(640, 480));

        let top_left = ndc.point(0, 0);
        let bottom_right = ndc.point(640, 480);

        assert_relative_eq!(top_left[0], -1.0);
        assert_relative_eq!(top_left[1], 1.0);
        assert_relative_eq!(bottom_right[0], 1.0);
        assert_relative_eq!(bottom_right[1], -1.0);
    }

    #[test]
    fn test_image_points_are_shifted_half_a_pixel() {
        let ndc = NdcMapping::new(Dimension2::new(4, 4));

        let p = ndc.image_point(0, 0);

        assert_relative_eq!(p[0], -0.75);
        assert_relative_eq!(p[1], 1.25);
    }

    #[test]
    fn test_degenerate_target_does_not_divide_by_zero() {
        let ndc = NdcMapping::new(Dimension2::new(1, 0));

        assert!(ndc.point(1, 1).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_texel_rect_samples_centres() {
        let coords = texel_rect(0.0, 0.0, 4.0, 2.0, Dimension2::new(4, 4));

        assert_relative_eq!(coords[0], 0.125);
        assert_relative_eq!(coords[1], 0.125);
        assert_relative_eq!(coords[2], 1.125);
        assert_relative_eq!(coords[3], 0.625);
    }
}
