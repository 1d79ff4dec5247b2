use image::GrayImage;
use rayon::prelude::*;

/// Dense per-pixel corner response for one pyramid level
#[derive(Debug, Clone)]
pub struct ResponseMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// Minimum eigenvalue of the windowed structure tensor (Shi-Tomasi).
///
/// Gradients are central differences on intensities scaled to [0, 1], the
/// tensor is averaged over a `(2r+1)^2` window. Pixels closer than `r + 1` to
/// the border have no full window and get a response of zero.
pub fn min_eigenvalue_response(img: &GrayImage, window_radius: usize) -> ResponseMap {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = img.as_raw();
    let mut data = vec![0.0f32; w * h];

    let r = window_radius;
    if w < 2 * r + 3 || h < 2 * r + 3 {
        return ResponseMap { width: w, height: h, data };
    }

    // Gradient products, zero on the 1-pixel border
    let mut ixx = vec![0.0f32; w * h];
    let mut iyy = vec![0.0f32; w * h];
    let mut ixy = vec![0.0f32; w * h];

    ixx.par_chunks_mut(w)
        .zip(iyy.par_chunks_mut(w))
        .zip(ixy.par_chunks_mut(w))
        .enumerate()
        .filter(|(y, _)| *y >= 1 && *y + 1 < h)
        .for_each(|(y, ((row_xx, row_yy), row_xy))| {
            for x in 1..w - 1 {
                let gx = (raw[y * w + x + 1] as f32 - raw[y * w + x - 1] as f32) / 510.0;
                let gy = (raw[(y + 1) * w + x] as f32 - raw[(y - 1) * w + x] as f32) / 510.0;
                row_xx[x] = gx * gx;
                row_yy[x] = gy * gy;
                row_xy[x] = gx * gy;
            }
        });

    let norm = 1.0 / ((2 * r + 1) * (2 * r + 1)) as f32;

    data.par_chunks_mut(w)
        .enumerate()
        .filter(|(y, _)| *y >= r + 1 && *y + r + 1 < h)
        .for_each(|(y, row)| {
            for x in (r + 1)..(w - r - 1) {
                let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
                for wy in (y - r)..=(y + r) {
                    let base = wy * w;
                    for wx in (x - r)..=(x + r) {
                        a += ixx[base + wx];
                        b += ixy[base + wx];
                        c += iyy[base + wx];
                    }
                }
                let (a, b, c) = (a * norm, b * norm, c * norm);
                let half_trace = 0.5 * (a + c);
                let half_diff = 0.5 * (a - c);
                let lambda_min = half_trace - (half_diff * half_diff + b * b).sqrt();
                row[x] = lambda_min.max(0.0);
            }
        });

    ResponseMap { width: w, height: h, data }
}
