use crate::error::OcrError;
use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Contrast-limited adaptive histogram equalization (CLAHE)
///
/// The image is split into a `tile_grid` x `tile_grid` grid (fewer tiles when the
/// image is smaller than the grid). Each tile gets its own equalization curve,
/// with histogram bins clipped at `clip_limit` times the average bin height and
/// the excess spread over all bins. Pixels are mapped by bilinear interpolation
/// between the curves of the four nearest tile centers, so tile seams don't show.
pub fn apply(image: GrayImage, clip_limit: f32, tile_grid: u32) -> Result<GrayImage, OcrError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::PreprocessingError(
            "contrast enhancement on empty image".to_string(),
        ));
    }
    if tile_grid == 0 || clip_limit <= 0.0 {
        return Err(OcrError::PreprocessingError(format!(
            "invalid CLAHE parameters (clip limit {}, tile grid {})",
            clip_limit, tile_grid
        )));
    }

    let tiles_x = tile_grid.min(width);
    let tiles_y = tile_grid.min(height);
    let x_bounds = tile_bounds(width, tiles_x);
    let y_bounds = tile_bounds(height, tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            luts.push(tile_lut(
                &image,
                (x_bounds[tx], x_bounds[tx + 1]),
                (y_bounds[ty], y_bounds[ty + 1]),
                clip_limit,
            ));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let (tx1, tx2, ax) = neighbours(x, width, tiles_x);
        let (ty1, ty2, ay) = neighbours(y, height, tiles_y);
        let v = image.get_pixel(x, y).0[0] as usize;

        let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - ax) + lut_at(tx2, ty1)[v] as f32 * ax;
        let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - ax) + lut_at(tx2, ty2)[v] as f32 * ax;
        let mapped = top * (1.0 - ay) + bottom * ay;

        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    }))
}

/// Split `len` pixels into `tiles` contiguous, non-empty spans
fn tile_bounds(len: u32, tiles: u32) -> Vec<u32> {
    (0..=tiles as u64)
        .map(|t| (t * len as u64 / tiles as u64) as u32)
        .collect()
}

/// The two tiles whose centers bracket `pos`, plus the weight of the second
fn neighbours(pos: u32, len: u32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) * tiles as f32 / len as f32 - 0.5;
    let lower = f.floor();
    let weight = f - lower;
    let last = tiles as i64 - 1;

    let t1 = (lower as i64).clamp(0, last) as u32;
    let t2 = (lower as i64 + 1).clamp(0, last) as u32;
    (t1, t2, weight)
}

/// Build the clipped equalization curve of one tile
fn tile_lut(image: &GrayImage, xs: (u32, u32), ys: (u32, u32), clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in ys.0..ys.1 {
        for x in xs.0..xs.1 {
            hist[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (xs.1 - xs.0) * (ys.1 - ys.0);
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for i in (0..BINS).step_by(step).take(residual) {
            hist[i] += 1;
        }
    }

    let scale = (BINS - 1) as f32 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (i, bin) in hist.iter().enumerate() {
        cumulative += bin;
        lut[i] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
