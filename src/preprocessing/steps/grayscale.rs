use crate::error::OcrError;
use image::{GrayImage, Luma, RgbImage};

/// Convert a color image to a single luminance channel
/// This is the foundation for every other preprocessing step
pub fn apply(image: RgbImage) -> Result<GrayImage, OcrError> {
    Ok(luminance(&image))
}

/// ITU-R BT.601 luma: Y = 0.299 R + 0.587 G + 0.114 B
pub fn luminance(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        // Fixed point with 14 fractional bits, rounded
        let y = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        Luma([y.min(255) as u8])
    })
}
