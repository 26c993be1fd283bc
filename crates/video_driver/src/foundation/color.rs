//! Colour value types
//!
//! `Color` is a packed 32-bit A8R8G8B8 value, the format vertices, materials
//! and images carry. Backends want colours in a different channel order, so
//! the conversion helpers live here next to the type.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Packed 32-bit colour in A8R8G8B8 layout
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable)]
pub struct Color(pub u32);

impl Color {
    /// Opaque white
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    /// Opaque black
    pub const BLACK: Color = Color(0xFF00_0000);
    /// Fully transparent black
    pub const TRANSPARENT: Color = Color(0x0000_0000);

    /// Create a colour from alpha, red, green and blue channels
    pub const fn new(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self(
            (alpha as u32) << 24 | (red as u32) << 16 | (green as u32) << 8 | blue as u32,
        )
    }

    /// Alpha channel
    pub const fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel
    pub const fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel
    pub const fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel
    pub const fn blue(&self) -> u8 {
        self.0 as u8
    }

    /// True when the colour is not fully opaque
    pub const fn is_translucent(&self) -> bool {
        self.alpha() < 255
    }

    /// Channel order expected by backends: R, G, B, A bytes
    pub const fn to_backend_rgba(&self) -> [u8; 4] {
        [self.red(), self.green(), self.blue(), self.alpha()]
    }

    /// Quantise to 16-bit A1R5G5B5
    pub const fn to_a1r5g5b5(&self) -> u16 {
        let alpha = if self.alpha() >= 128 { 0x8000 } else { 0 };
        alpha
            | (((self.red() as u16) >> 3) << 10)
            | (((self.green() as u16) >> 3) << 5)
            | ((self.blue() as u16) >> 3)
    }

    /// Expand a 16-bit A1R5G5B5 value
    pub const fn from_a1r5g5b5(value: u16) -> Self {
        let alpha = if value & 0x8000 != 0 { 255 } else { 0 };
        Self::new(
            alpha,
            expand5(((value >> 10) & 0x1F) as u8),
            expand5(((value >> 5) & 0x1F) as u8),
            expand5((value & 0x1F) as u8),
        )
    }

    /// Expand a 16-bit R5G6B5 value (always opaque)
    pub const fn from_r5g6b5(value: u16) -> Self {
        let green = ((value >> 5) & 0x3F) as u8;
        Self::new(
            255,
            expand5(((value >> 11) & 0x1F) as u8),
            (green << 2) | (green >> 4),
            expand5((value & 0x1F) as u8),
        )
    }
}

const fn expand5(value: u8) -> u8 {
    (value << 3) | (value >> 2)
}

/// Floating point colour with channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorF {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl ColorF {
    /// Create a new floating point colour
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// RGBA array in the order backends upload
    pub const fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for ColorF {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl From<Color> for ColorF {
    fn from(color: Color) -> Self {
        const INV: f32 = 1.0 / 255.0;
        Self::new(
            f32::from(color.red()) * INV,
            f32::from(color.green()) * INV,
            f32::from(color.blue()) * INV,
            f32::from(color.alpha()) * INV,
        )
    }
}
