//! CPU-side texel preparation: power-of-two scaling, mip chains and 16 bit
//! quantisation. Pixels are packed ARGB rows, top to bottom.

use crate::foundation::color::Color;
use crate::foundation::math::Dimension2;

/// Nearest neighbour rescale
pub fn scale_nearest(pixels: &[Color], from: Dimension2, to: Dimension2) -> Vec<Color> {
    let mut out = Vec::with_capacity(to.area());
    if from.area() == 0 {
        out.resize(to.area(), Color::TRANSPARENT);
        return out;
    }

    for y in 0..to.height {
        let src_y = (i64::from(y) * i64::from(from.height) / i64::from(to.height)) as i32;
        for x in 0..to.width {
            let src_x = (i64::from(x) * i64::from(from.width) / i64::from(to.width)) as i32;
            let index = (src_y * from.width + src_x) as usize;
            out.push(pixels.get(index).copied().unwrap_or_default());
        }
    }
    out
}

/// Average of up to four texels, per channel
fn average(texels: &[Color]) -> Color {
    let count = texels.len().max(1) as u32;
    let sum = |channel: fn(&Color) -> u8| -> u8 {
        (texels.iter().map(|t| u32::from(channel(t))).sum::<u32>() / count) as u8
    };
    Color::new(sum(Color::alpha), sum(Color::red), sum(Color::green), sum(Color::blue))
}

/// Build a box-filtered mip chain down to 1x1, level 0 first
pub fn build_mip_chain(level0: Vec<Color>, size: Dimension2) -> Vec<Vec<Color>> {
    let mut levels = vec![level0];
    let mut current = size;

    while current.width > 1 || current.height > 1 {
        let next = Dimension2::new((current.width / 2).max(1), (current.height / 2).max(1));
        let Some(previous) = levels.last() else { break };

        let mut level = Vec::with_capacity(next.area());
        for y in 0..next.height {
            for x in 0..next.width {
                let mut texels = Vec::with_capacity(4);
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(current.width - 1);
                    let sy = (y * 2 + dy).min(current.height - 1);
                    if let Some(texel) = previous.get((sy * current.width + sx) as usize) {
                        texels.push(*texel);
                    }
                }
                level.push(average(&texels));
            }
        }

        levels.push(level);
        current = next;
    }
    levels
}

/// Reduce texels to A1R5G5B5 precision
pub fn quantise_16bit(pixels: &mut [Color]) {
    for pixel in pixels {
        *pixel = Color::from_a1r5g5b5(pixel.to_a1r5g5b5());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_chain_reaches_one_by_one() {
        let levels = build_mip_chain(vec![Color::WHITE; 8 * 2], Dimension2::new(8, 2));

        let sizes: Vec<usize> = levels.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![16, 4, 2, 1]);
    }

    #[test]
    fn test_box_filter_averages() {
        let pixels = vec![
            Color::new(255, 0, 0, 0),
            Color::new(255, 200, 0, 0),
            Color::new(255, 0, 0, 0),
            Color::new(255, 200, 0, 0),
        ];
        let levels = build_mip_chain(pixels, Dimension2::new(2, 2));

        assert_eq!(levels[1], vec![Color::new(255, 100, 0, 0)]);
    }

    #[test]
    fn test_scale_nearest_to_power_of_two() {
        let pixels = vec![Color::BLACK, Color::WHITE, Color::BLACK];
        let scaled = scale_nearest(&pixels, Dimension2::new(3, 1), Dimension2::new(4, 1));

        assert_eq!(scaled, vec![Color::BLACK, Color::BLACK, Color::WHITE, Color::BLACK]);
    }

    #[test]
    fn test_quantise_drops_low_bits() {
        let mut pixels = vec![Color::new(200, 7, 255, 0)];
        quantise_16bit(&mut pixels);

        assert_eq!(pixels[0], Color::new(255, 0, 255, 0));
    }
}
