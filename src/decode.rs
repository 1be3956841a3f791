//! Raw bytes to pixel matrices

use crate::error::OcrError;
use crate::preprocessing::steps::grayscale;
use image::{GrayImage, RgbImage};

/// Decode encoded image bytes (PNG, JPEG, GIF, BMP, ...) in color mode
pub fn decode_color(bytes: &[u8]) -> Result<RgbImage, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::UndecodableImage("empty input".to_string()));
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| OcrError::UndecodableImage(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(OcrError::UndecodableImage(format!(
            "image has no pixels ({}x{})",
            img.width(),
            img.height()
        )));
    }

    Ok(img.into_rgb8())
}

/// Decode encoded image bytes straight to a single luminance channel
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, OcrError> {
    decode_color(bytes).map(|rgb| grayscale::luminance(&rgb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png_in_both_modes() {
        let img = RgbImage::from_pixel(12, 7, Rgb([200, 100, 50]));
        let bytes = encode_png(&img);

        let color = decode_color(&bytes).unwrap();
        assert_eq!(color.dimensions(), (12, 7));
        assert_eq!(color.get_pixel(3, 3), &Rgb([200, 100, 50]));

        let gray = decode_grayscale(&bytes).unwrap();
        assert_eq!(gray.dimensions(), (12, 7));
    }

    #[test]
    fn test_empty_bytes_are_undecodable() {
        assert!(matches!(
            decode_color(&[]),
            Err(OcrError::UndecodableImage(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_are_undecodable() {
        assert!(matches!(
            decode_grayscale(b"definitely not an image"),
            Err(OcrError::UndecodableImage(_))
        ));
    }
}
