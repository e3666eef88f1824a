// ============================================================
// Layer 4 — Real-Time Image Augmentation
// ============================================================
// Random geometric jitter applied to each training image as it
// is batched, so every epoch sees slightly different digits.
//
// Knobs (all disabled by default):
//   rotation_range      degrees, angle ~ U(-r, r)
//   zoom_range          per-axis scale ~ U(1 - z, 1 + z)
//   width_shift_range   fraction of width,  shift ~ U(-w, w) * cols
//   height_shift_range  fraction of height, shift ~ U(-h, h) * rows
//   horizontal_flip     mirror left/right with probability 0.5
//
// Each output pixel is pulled from the input by inverse
// mapping around the image centre:
//
//   src = centre + Zoom · Rot(θ) · (dst - centre) - shift
//
// then rounded to the nearest pixel. Coordinates outside the
// image take the nearest edge pixel. The flip is applied last.
//
// With every knob disabled the augmenter returns its input
// unchanged and never touches the random stream.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AugmentConfig {
    pub rotation_range:     f32,
    pub zoom_range:         f32,
    pub width_shift_range:  f32,
    pub height_shift_range: f32,
    pub horizontal_flip:    bool,
}

impl AugmentConfig {
    /// True when no knob is enabled
    pub fn is_identity(&self) -> bool {
        self.rotation_range == 0.0
            && self.zoom_range == 0.0
            && self.width_shift_range == 0.0
            && self.height_shift_range == 0.0
            && !self.horizontal_flip
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.rotation_range) {
            bail!("rotation range must be in [0, 180] degrees, got {}", self.rotation_range);
        }
        if !(0.0..1.0).contains(&self.zoom_range) {
            bail!("zoom range must be in [0, 1), got {}", self.zoom_range);
        }
        for (name, v) in [
            ("width shift", self.width_shift_range),
            ("height shift", self.height_shift_range),
        ] {
            if !(0.0..1.0).contains(&v) {
                bail!("{name} range must be a fraction in [0, 1), got {v}");
            }
        }
        Ok(())
    }

    fn sample(&self, rng: &mut StdRng, rows: usize, cols: usize) -> Warp {
        let theta = symmetric(rng, self.rotation_range).to_radians();
        let (zoom_x, zoom_y) = if self.zoom_range > 0.0 {
            let z = self.zoom_range;
            (rng.gen_range(1.0 - z..=1.0 + z), rng.gen_range(1.0 - z..=1.0 + z))
        } else {
            (1.0, 1.0)
        };
        let shift_x = symmetric(rng, self.width_shift_range) * cols as f32;
        let shift_y = symmetric(rng, self.height_shift_range) * rows as f32;
        let flip    = self.horizontal_flip && rng.gen_bool(0.5);

        Warp { theta, zoom_x, zoom_y, shift_x, shift_y, flip }
    }
}

fn symmetric(rng: &mut StdRng, range: f32) -> f32 {
    if range > 0.0 { rng.gen_range(-range..=range) } else { 0.0 }
}

/// One sampled transform.
#[derive(Debug, Clone, Copy)]
struct Warp {
    theta:   f32,
    zoom_x:  f32,
    zoom_y:  f32,
    shift_x: f32,
    shift_y: f32,
    flip:    bool,
}

impl Warp {
    fn apply(&self, image: &[f32], rows: usize, cols: usize) -> Vec<f32> {
        let cy = (rows as f32 - 1.0) / 2.0;
        let cx = (cols as f32 - 1.0) / 2.0;
        let (sin, cos) = self.theta.sin_cos();

        let mut out = vec![0.0f32; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                let y = r as f32 - cy;
                let x = c as f32 - cx;

                let src_x = cx + self.zoom_x * (cos * x + sin * y) - self.shift_x;
                let src_y = cy + self.zoom_y * (-sin * x + cos * y) - self.shift_y;

                let sr = (src_y.round().max(0.0) as usize).min(rows - 1);
                let sc = (src_x.round().max(0.0) as usize).min(cols - 1);

                let dc = if self.flip { cols - 1 - c } else { c };
                out[r * cols + dc] = image[sr * cols + sc];
            }
        }
        out
    }
}

/// Applies randomly sampled warps from a seeded stream.
/// The stream sits behind a Mutex so the augmenter can be
/// shared with Burn's batcher, which only gets `&self`.
#[derive(Debug)]
pub struct Augmenter {
    config: AugmentConfig,
    rng:    Mutex<StdRng>,
}

impl Augmenter {
    pub fn new(config: AugmentConfig, seed: u64) -> Self {
        Self { config, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Augment a single-channel image stored row-major.
    pub fn apply(&self, image: &[f32], rows: usize, cols: usize) -> Vec<f32> {
        if self.config.is_identity() {
            return image.to_vec();
        }
        let warp = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.config.sample(&mut rng, rows, cols)
        };
        warp.apply(image, rows, cols)
    }
}
