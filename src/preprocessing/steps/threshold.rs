use crate::error::OcrError;
use image::{GrayImage, Luma};
use imageproc::filter::separable_filter_equal;

/// Adaptive Gaussian thresholding
///
/// Each pixel is compared against the Gaussian-weighted mean of its
/// `block_size` x `block_size` neighbourhood minus `offset`: brighter pixels
/// become white (255), the rest black (0). Uneven illumination moves the
/// local mean along with it, so shaded backgrounds don't swallow characters.
pub fn adaptive(image: GrayImage, block_size: u32, offset: f32) -> Result<GrayImage, OcrError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(OcrError::PreprocessingError(format!(
            "adaptive threshold block size must be odd and >= 3, got {}",
            block_size
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::PreprocessingError(
            "adaptive threshold on empty image".to_string(),
        ));
    }

    let kernel = gaussian_kernel(block_size);
    let local_mean: GrayImage = separable_filter_equal(&image, &kernel);

    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y).0[0] as f32;
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - offset;
        if pixel > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    }))
}

/// Fixed global thresholding: pixels above `threshold` become white
pub fn global(image: GrayImage, threshold: u8) -> Result<GrayImage, OcrError> {
    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    }))
}

/// Normalized 1-D Gaussian kernel of odd length `size`
///
/// Sigma follows the usual derivation from the window size,
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`, which is 2.0 for an 11-pixel window.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;

    let weights: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();

    weights.into_iter().map(|w| w / sum).collect()
}
