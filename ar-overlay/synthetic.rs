//! Deterministic test scenes.

use image::{imageops, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Square pattern of `block`-pixel cells with seeded random intensities.
///
/// Neighbouring cells differ enough to produce strong corners everywhere, and
/// the same seed always yields the same pattern.
pub fn block_pattern(size: u32, block: u32, seed: u64) -> RgbImage {
    let block = block.max(1);
    let cells = size.div_ceil(block);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let values: Vec<[u8; 3]> = (0..cells * cells)
        .map(|_| [rng.random_range(20..236), rng.random_range(20..236), rng.random_range(20..236)])
        .collect();
    RgbImage::from_fn(size, size, |x, y| Rgb(values[((y / block) * cells + x / block) as usize]))
}

/// `pattern` pasted with its top-left corner at `(x, y)` on a white canvas
pub fn paste_on_canvas(pattern: &RgbImage, width: u32, height: u32, x: i64, y: i64) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    imageops::replace(&mut canvas, pattern, x, y);
    canvas
}

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}
