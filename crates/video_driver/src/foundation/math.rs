//! Math utilities and types
//!
//! Matrix and vector types come from nalgebra. The driver also needs a handful
//! of small integer value types for screen-space work (sizes, positions and
//! rectangles) which are defined here.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Integer width/height pair used for screens, viewports and textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension2 {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Dimension2 {
    /// Create a new dimension
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered (zero for degenerate sizes)
    pub fn area(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Smallest power-of-two dimension that contains this one
    pub fn next_power_of_two(&self) -> Self {
        let round = |value: i32| (value.max(1) as u32).next_power_of_two() as i32;
        Self::new(round(self.width), round(self.height))
    }

    /// True when both sides are powers of two
    pub fn is_power_of_two(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (self.width as u32).is_power_of_two()
            && (self.height as u32).is_power_of_two()
    }
}

/// Integer 2D position in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position2 {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Position2 {
    /// Create a new position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned integer rectangle, upper-left inclusive and lower-right exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Upper left corner
    pub upper_left: Position2,
    /// Lower right corner
    pub lower_right: Position2,
}

impl Rect {
    /// Create a rectangle from its corner coordinates
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            upper_left: Position2::new(x1, y1),
            lower_right: Position2::new(x2, y2),
        }
    }

    /// Create a rectangle from a position and a size
    pub const fn from_position_size(position: Position2, size: Dimension2) -> Self {
        Self::new(
            position.x,
            position.y,
            position.x + size.width,
            position.y + size.height,
        )
    }

    /// Rectangle covering a whole surface of the given size
    pub const fn from_size(size: Dimension2) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Width of the rectangle (may be negative for invalid rectangles)
    pub const fn width(&self) -> i32 {
        self.lower_right.x - self.upper_left.x
    }

    /// Height of the rectangle (may be negative for invalid rectangles)
    pub const fn height(&self) -> i32 {
        self.lower_right.y - self.upper_left.y
    }

    /// Size of the rectangle
    pub const fn size(&self) -> Dimension2 {
        Dimension2::new(self.width(), self.height())
    }

    /// A rectangle is valid when its corners are ordered
    pub const fn is_valid(&self) -> bool {
        self.width() >= 0 && self.height() >= 0
    }

    /// True when the rectangle covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Clip this rectangle against another one
    ///
    /// The result may be empty; callers check `is_empty` before drawing.
    pub fn clip_against(&mut self, other: &Rect) {
        self.upper_left.x = self.upper_left.x.max(other.upper_left.x);
        self.upper_left.y = self.upper_left.y.max(other.upper_left.y);
        self.lower_right.x = self.lower_right.x.min(other.lower_right.x);
        self.lower_right.y = self.lower_right.y.min(other.lower_right.y);

        // Keep the rectangle ordered so width/height never go negative after clipping
        if self.upper_left.x > self.lower_right.x {
            self.lower_right.x = self.upper_left.x;
        }
        if self.upper_left.y > self.lower_right.y {
            self.lower_right.y = self.upper_left.y;
        }
    }

    /// Clipped copy of this rectangle
    pub fn clipped(&self, other: &Rect) -> Rect {
        let mut result = *self;
        result.clip_against(other);
        result
    }
}

/// Extension trait for Mat4 with the conventions the driver uses
///
/// The engine works in a left-handed, y-up space; backend adapters convert
/// to their own convention when uploading.
pub trait Mat4Ext {
    /// Left-handed perspective projection
    fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Left-handed look-at view matrix
    fn look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Column-major element array, the layout backends upload
    fn to_column_array(&self) -> [f32; 16];
}

impl Mat4Ext for Mat4 {
    fn perspective_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let height = 1.0 / (fov_y * 0.5).tan();
        let width = height / aspect;

        let mut result = Mat4::zeros();
        result[(0, 0)] = width;
        result[(1, 1)] = height;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -near * far / (far - near);
        result[(3, 2)] = 1.0;
        result
    }

    fn look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = up.cross(&forward).normalize();
        let camera_up = forward.cross(&right);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            forward.x, forward.y, forward.z, -forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn to_column_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rect_clip_against() {
        let mut rect = Rect::new(-10, -10, 50, 50);
        rect.clip_against(&Rect::new(0, 0, 40, 100));

        assert_eq!(rect, Rect::new(0, 0, 40, 50));
        assert!(!rect.is_empty());
    }

    #[test]
    fn test_rect_clip_disjoint_is_empty() {
        let rect = Rect::new(0, 0, 10, 10).clipped(&Rect::new(20, 20, 30, 30));

        assert!(rect.is_empty());
        assert!(rect.is_valid());
    }

    #[test]
    fn test_dimension_power_of_two() {
        assert_eq!(Dimension2::new(100, 64).next_power_of_two(), Dimension2::new(128, 64));
        assert_eq!(Dimension2::new(1, 1).next_power_of_two(), Dimension2::new(1, 1));
        assert!(Dimension2::new(256, 32).is_power_of_two());
        assert!(!Dimension2::new(0, 32).is_power_of_two());
    }

    #[test]
    fn test_look_at_maps_eye_to_origin() {
        let eye = Vec3::new(3.0, 2.0, -5.0);
        let view = <Mat4 as Mat4Ext>::look_at_lh(eye, Vec3::zeros(), Vec3::y());
        let transformed = view.transform_point(&nalgebra::Point3::from(eye));

        assert_relative_eq!(transformed.coords, Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_column_array_layout() {
        let matrix = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let columns = matrix.to_column_array();

        assert_eq!(&columns[12..15], &[1.0, 2.0, 3.0]);
    }
}
