use crate::error::OcrError;
use image::{GrayImage, Luma};

/// Morphological closing (dilate, then erode) with a square structuring element
///
/// On dark-text-on-light images this erases dark specks smaller than the
/// element and leaves strokes at least `size` pixels thick intact.
pub fn close(image: GrayImage, size: u32) -> Result<GrayImage, OcrError> {
    if size == 0 {
        return Err(OcrError::PreprocessingError(
            "structuring element must be at least 1 pixel".to_string(),
        ));
    }

    let anchor = (size / 2) as i64;
    // Dilation reaches back by the anchor; erosion uses the reflected element
    let dilated = dilate(&image, size, anchor);
    Ok(erode(&dilated, size, size as i64 - 1 - anchor))
}

fn dilate(image: &GrayImage, size: u32, anchor: i64) -> GrayImage {
    sweep(image, size, -anchor, 0, u8::max)
}

fn erode(image: &GrayImage, size: u32, reach_back: i64) -> GrayImage {
    sweep(image, size, -reach_back, 255, u8::min)
}

/// Fold every in-bounds pixel of the `size` x `size` window starting at
/// offset `start` from each pixel
fn sweep(image: &GrayImage, size: u32, start: i64, init: u8, fold: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = init;
        for dy in 0..size as i64 {
            let sy = y as i64 + start + dy;
            if sy < 0 || sy >= height as i64 {
                continue;
            }
            for dx in 0..size as i64 {
                let sx = x as i64 + start + dx;
                if sx < 0 || sx >= width as i64 {
                    continue;
                }
                acc = fold(acc, image.get_pixel(sx as u32, sy as u32).0[0]);
            }
        }
        Luma([acc])
    })
}
