use ar_core::{Descriptor, Keypoint, PyramidLevel, DESCRIPTOR_LEN};
use image::GrayImage;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Samples per side of the descriptor grid
const GRID: usize = 16;
/// Spatial cells per side
const CELLS: usize = 4;
/// Orientation bins per cell
const BINS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum DescribeError {
    InvalidSampleSpacing(f32),
    InvalidWeightSigma(f32),
    InvalidClip(f32),
}

impl std::fmt::Display for DescribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescribeError::InvalidSampleSpacing(s) => {
                write!(f, "Invalid sample spacing: {} (must be finite and > 0)", s)
            }
            DescribeError::InvalidWeightSigma(s) => {
                write!(f, "Invalid weight sigma: {} (must be finite and > 0)", s)
            }
            DescribeError::InvalidClip(c) => write!(f, "Invalid clip value: {} (must be in (0, 1])", c),
        }
    }
}

impl std::error::Error for DescribeError {}

pub type DescribeResult<T> = Result<T, DescribeError>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescriptorConfig {
    /// Distance between grid samples, in level pixels
    pub sample_spacing: f32,
    /// Gaussian weighting of gradient magnitudes, in grid samples
    pub weight_sigma: f32,
    /// Per-component cap applied after the first normalisation
    pub clip: f32,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self { sample_spacing: 1.0, weight_sigma: 8.0, clip: 0.2 }
    }
}

impl DescriptorConfig {
    pub fn validate(&self) -> DescribeResult<()> {
        if !self.sample_spacing.is_finite() || self.sample_spacing <= 0.0 {
            return Err(DescribeError::InvalidSampleSpacing(self.sample_spacing));
        }
        if !self.weight_sigma.is_finite() || self.weight_sigma <= 0.0 {
            return Err(DescribeError::InvalidWeightSigma(self.weight_sigma));
        }
        if !(self.clip > 0.0 && self.clip <= 1.0) {
            return Err(DescribeError::InvalidClip(self.clip));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "DescriptorConfig: {}x{} cells x {} bins, spacing={:.2}, sigma={:.1}, clip={:.2}",
            CELLS, CELLS, BINS, self.sample_spacing, self.weight_sigma, self.clip
        )
    }
}

/// Gradient-orientation histogram descriptors sampled in the keypoint's rotated frame
pub struct DescriptorGenerator {
    cfg: DescriptorConfig,
}

impl DescriptorGenerator {
    pub fn new(cfg: DescriptorConfig) -> DescribeResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.cfg
    }

    /// One descriptor per keypoint, computed on the keypoint's own pyramid level.
    /// A keypoint whose level is missing from `pyramid` gets an all-zero descriptor.
    pub fn generate_descriptors(&self, pyramid: &[PyramidLevel], kps: &[Keypoint]) -> Vec<Descriptor> {
        kps.par_iter()
            .map(|kp| match pyramid.iter().find(|l| l.level == kp.octave) {
                Some(level) => self.describe(level, kp),
                None => [0.0; DESCRIPTOR_LEN],
            })
            .collect()
    }

    fn describe(&self, level: &PyramidLevel, kp: &Keypoint) -> Descriptor {
        let img = &level.image;
        let (cx, cy) = level.to_level(kp.x, kp.y);
        let (s, c) = kp.angle.sin_cos();
        let step = self.cfg.sample_spacing;

        // Unit steps along the rotated axes
        let (ux, uy) = (c * step, s * step);
        let (vx, vy) = (-s * step, c * step);

        let half = (GRID as f32 - 1.0) / 2.0;
        let two_sigma_sq = 2.0 * self.cfg.weight_sigma * self.cfg.weight_sigma;
        let bin_width = std::f32::consts::TAU / BINS as f32;
        let samples_per_cell = GRID / CELLS;

        let mut hist = [0.0f32; DESCRIPTOR_LEN];

        for gy in 0..GRID {
            let v = gy as f32 - half;
            for gx in 0..GRID {
                let u = gx as f32 - half;
                let px = cx + u * ux + v * vx;
                let py = cy + u * uy + v * vy;

                let du = bilinear_sample(img, px + ux, py + uy) - bilinear_sample(img, px - ux, py - uy);
                let dv = bilinear_sample(img, px + vx, py + vy) - bilinear_sample(img, px - vx, py - vy);
                let magnitude = (du * du + dv * dv).sqrt();
                if magnitude == 0.0 {
                    continue;
                }

                let weight = (-(u * u + v * v) / two_sigma_sq).exp();
                let theta = dv.atan2(du).rem_euclid(std::f32::consts::TAU);

                // Linear split between the two nearest orientation bins
                let pos = theta / bin_width;
                let lower = pos.floor();
                let frac = pos - lower;
                let b0 = (lower as usize) % BINS;
                let b1 = (b0 + 1) % BINS;

                let cell = (gy / samples_per_cell) * CELLS + gx / samples_per_cell;
                let contribution = magnitude * weight;
                hist[cell * BINS + b0] += contribution * (1.0 - frac);
                hist[cell * BINS + b1] += contribution * frac;
            }
        }

        normalize_clip(&mut hist, self.cfg.clip);
        hist
    }
}

/// L2-normalise, clip large components, renormalise. Zero vectors stay zero.
fn normalize_clip(d: &mut Descriptor, clip: f32) {
    let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        d.fill(0.0);
        return;
    }
    for v in d.iter_mut() {
        *v = (*v / norm).min(clip);
    }
    let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in d.iter_mut() {
            *v /= norm;
        }
    }
}

/// Bilinear interpolation for subpixel sampling, clamped to the image bounds
fn bilinear_sample(img: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = img.as_raw();

    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let p00 = raw[y0 * w + x0] as f32;
    let p10 = raw[y0 * w + x1] as f32;
    let p01 = raw[y1 * w + x0] as f32;
    let p11 = raw[y1 * w + x1] as f32;

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}
