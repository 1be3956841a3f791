use crate::error::OcrError;
use image::{imageops, GrayImage};

/// Guarantee dark glyphs on a light background
///
/// A mean intensity below `midpoint` means the background is dark, so the
/// image is inverted.
pub fn apply(mut image: GrayImage, midpoint: f32) -> Result<GrayImage, OcrError> {
    if mean_intensity(&image) < midpoint as f64 {
        imageops::invert(&mut image);
    }
    Ok(image)
}

fn mean_intensity(image: &GrayImage) -> f64 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.as_raw().iter().map(|&v| v as u64).sum();
    sum as f64 / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_dark_background_is_inverted() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([0]));
        img.put_pixel(4, 4, Luma([255])); // light glyph

        let result = apply(img, 127.0).unwrap();

        assert_eq!(result.get_pixel(0, 0).0[0], 255);
        assert_eq!(result.get_pixel(4, 4).0[0], 0);
    }

    #[test]
    fn test_light_background_is_kept() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        img.put_pixel(4, 4, Luma([0]));

        let result = apply(img.clone(), 127.0).unwrap();

        assert_eq!(result, img);
    }

    #[test]
    fn test_mean_at_midpoint_is_kept() {
        let img = GrayImage::from_pixel(4, 4, Luma([127]));
        let result = apply(img.clone(), 127.0).unwrap();
        assert_eq!(result, img);
    }
}
