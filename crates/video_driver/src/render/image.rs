//! Decoded images
//!
//! [`Image`] is the hand-off type between image decoding and the driver. The
//! driver reads pixels out of it when creating textures and produces one when
//! taking a screenshot. Decoding itself belongs to the `image` crate; the
//! conversions at the bottom of this file bridge the two.

use crate::foundation::color::Color;
use crate::foundation::math::Dimension2;
use crate::render::error::{DriverError, DriverResult};

/// Pixel layout of an [`Image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 16 bit, 1 bit alpha and 5 bits per colour channel
    A1R5G5B5,
    /// 16 bit, no alpha
    R5G6B5,
    /// 24 bit, bytes in R, G, B order
    R8G8B8,
    /// 32 bit packed ARGB words
    A8R8G8B8,
    /// Block compressed, 4 bits per pixel
    Dxt1,
    /// Block compressed, 8 bits per pixel
    Dxt5,
}

impl ColorFormat {
    /// Bytes per pixel of uncompressed formats
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::A1R5G5B5 | Self::R5G6B5 => Some(2),
            Self::R8G8B8 => Some(3),
            Self::A8R8G8B8 => Some(4),
            Self::Dxt1 | Self::Dxt5 => None,
        }
    }

    /// True for block compressed formats
    pub const fn is_compressed(self) -> bool {
        self.bytes_per_pixel().is_none()
    }
}

/// A decoded image in memory
///
/// Pixel rows are stored top to bottom. Multi-byte pixels are little endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    format: ColorFormat,
    size: Dimension2,
    data: Vec<u8>,
}

impl Image {
    /// Wrap raw pixel data
    ///
    /// # Arguments
    /// * `format` - Layout of `data`
    /// * `size` - Image size in pixels
    /// * `data` - Pixel bytes, rows top to bottom
    ///
    /// # Errors
    /// `UnsupportedFormat` if `data` is too short for the size and format.
    pub fn from_raw(format: ColorFormat, size: Dimension2, data: Vec<u8>) -> DriverResult<Self> {
        if let Some(bpp) = format.bytes_per_pixel() {
            if data.len() < size.area() * bpp {
                return Err(DriverError::UnsupportedFormat(format!(
                    "{format:?} image of {}x{} needs {} bytes, got {}",
                    size.width,
                    size.height,
                    size.area() * bpp,
                    data.len()
                )));
            }
        }
        Ok(Self { format, size, data })
    }

    /// Build an A8R8G8B8 image from packed colours
    pub fn from_colors(size: Dimension2, pixels: &[Color]) -> Self {
        let mut data = Vec::with_capacity(size.area() * 4);
        for pixel in pixels.iter().take(size.area()) {
            data.extend_from_slice(&pixel.0.to_le_bytes());
        }
        data.resize(size.area() * 4, 0);
        Self {
            format: ColorFormat::A8R8G8B8,
            size,
            data,
        }
    }

    /// Blank A8R8G8B8 image
    pub fn blank(size: Dimension2) -> Self {
        Self {
            format: ColorFormat::A8R8G8B8,
            size,
            data: vec![0; size.area() * 4],
        }
    }

    /// Pixel layout
    pub const fn format(&self) -> ColorFormat {
        self.format
    }

    /// Image size in pixels
    pub const fn size(&self) -> Dimension2 {
        self.size
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Colour of one pixel, `None` outside the image or for compressed data
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel()?;
        let offset = (y as usize * self.size.width as usize + x as usize) * bpp;
        let bytes = self.data.get(offset..offset + bpp)?;

        Some(match self.format {
            ColorFormat::A1R5G5B5 => Color::from_a1r5g5b5(u16::from_le_bytes([bytes[0], bytes[1]])),
            ColorFormat::R5G6B5 => Color::from_r5g6b5(u16::from_le_bytes([bytes[0], bytes[1]])),
            ColorFormat::R8G8B8 => Color::new(255, bytes[0], bytes[1], bytes[2]),
            ColorFormat::A8R8G8B8 => Color(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            ColorFormat::Dxt1 | ColorFormat::Dxt5 => return None,
        })
    }

    /// All pixels as packed A8R8G8B8 colours, rows top to bottom
    ///
    /// # Errors
    /// `UnsupportedFormat` for compressed images.
    pub fn to_colors(&self) -> DriverResult<Vec<Color>> {
        if self.format.is_compressed() {
            return Err(DriverError::UnsupportedFormat(format!("{:?}", self.format)));
        }

        let mut pixels = Vec::with_capacity(self.size.area());
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                pixels.push(self.pixel(x, y).unwrap_or_default());
            }
        }
        Ok(pixels)
    }
}

impl From<&::image::RgbaImage> for Image {
    fn from(source: &::image::RgbaImage) -> Self {
        let size = Dimension2::new(source.width() as i32, source.height() as i32);
        let pixels: Vec<Color> = source
            .pixels()
            .map(|p| Color::new(p[3], p[0], p[1], p[2]))
            .collect();
        Self::from_colors(size, &pixels)
    }
}

impl From<&::image::DynamicImage> for Image {
    fn from(source: &::image::DynamicImage) -> Self {
        Self::from(&source.to_rgba8())
    }
}

impl Image {
    /// Convert into an `image::RgbaImage`, e.g. to save a screenshot
    ///
    /// # Errors
    /// `UnsupportedFormat` for compressed images.
    pub fn to_rgba_image(&self) -> DriverResult<::image::RgbaImage> {
        let pixels = self.to_colors()?;
        let mut out = ::image::RgbaImage::new(self.size.width.max(0) as u32, self.size.height.max(0) as u32);
        for (dst, color) in out.pixels_mut().zip(pixels) {
            *dst = ::image::Rgba(color.to_backend_rgba());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejects_short_data() {
        let result = Image::from_raw(ColorFormat::A8R8G8B8, Dimension2::new(2, 2), vec![0; 15]);

        assert!(matches!(result, Err(DriverError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_pixel_decoding_per_format() {
        let rgb = Image::from_raw(ColorFormat::R8G8B8, Dimension2::new(1, 1), vec![10, 20, 30]).unwrap();
        assert_eq!(rgb.pixel(0, 0), Some(Color::new(255, 10, 20, 30)));

        let packed = Color::new(255, 255, 0, 0).to_a1r5g5b5().to_le_bytes().to_vec();
        let a1 = Image::from_raw(ColorFormat::A1R5G5B5, Dimension2::new(1, 1), packed).unwrap();
        assert_eq!(a1.pixel(0, 0), Some(Color::new(255, 255, 0, 0)));
        assert_eq!(a1.pixel(1, 0), None);
    }

    #[test]
    fn test_compressed_images_have_no_colors() {
        let image = Image::from_raw(ColorFormat::Dxt1, Dimension2::new(4, 4), vec![0; 8]).unwrap();

        assert!(matches!(image.to_colors(), Err(DriverError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_rgba_image_round_trip() {
        let mut source = ::image::RgbaImage::new(2, 1);
        source.put_pixel(0, 0, ::image::Rgba([1, 2, 3, 4]));
        source.put_pixel(1, 0, ::image::Rgba([5, 6, 7, 8]));

        let converted = Image::from(&source);
        assert_eq!(converted.pixel(1, 0), Some(Color::new(8, 5, 6, 7)));
        assert_eq!(converted.to_rgba_image().unwrap(), source);
    }
}
