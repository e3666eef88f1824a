// ============================================================
// Layer 4 — MNIST Loader
// ============================================================
// Supplies the fixed MNIST train/test split as raw 8-bit
// images plus class ids. Two backing stores:
//
//   no data dir  → Burn's vision MnistDataset, which downloads
//                  and caches the archive on first use
//   data dir     → the four standard IDX files, read locally:
//                    train-images-idx3-ubyte
//                    train-labels-idx1-ubyte
//                    t10k-images-idx3-ubyte
//                    t10k-labels-idx1-ubyte

use anyhow::{Context, Result};
use burn::data::dataset::{vision::MnistDataset, Dataset};
use std::{fs, path::{Path, PathBuf}};

use crate::data::idx;
use crate::domain::image::{DigitSplit, LabeledImages, RawImages, IMG_COLS, IMG_ROWS};
use crate::domain::traits::DigitSource;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES:  &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS:  &str = "t10k-labels-idx1-ubyte";

/// Loads MNIST either from Burn's dataset cache or from IDX files.
pub struct MnistLoader {
    dir: Option<PathBuf>,
}

impl MnistLoader {
    /// Use Burn's downloadable MNIST dataset
    pub fn download() -> Self {
        Self { dir: None }
    }

    /// Read the IDX files from a local directory
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    /// Pick the backing store from an optional CLI directory
    pub fn new(dir: Option<String>) -> Self {
        match dir {
            Some(d) => Self::from_dir(d),
            None    => Self::download(),
        }
    }
}

impl DigitSource for MnistLoader {
    fn load(&self) -> Result<DigitSplit> {
        let split = match &self.dir {
            Some(dir) => {
                tracing::info!("Reading MNIST IDX files from '{}'", dir.display());
                DigitSplit {
                    train: load_idx_pair(dir, TRAIN_IMAGES, TRAIN_LABELS)?,
                    test:  load_idx_pair(dir, TEST_IMAGES, TEST_LABELS)?,
                }
            }
            None => {
                tracing::info!("Loading MNIST through the Burn dataset cache");
                DigitSplit {
                    train: from_burn(MnistDataset::train())?,
                    test:  from_burn(MnistDataset::test())?,
                }
            }
        };

        tracing::info!(
            "Loaded {} training and {} test digits",
            split.train.len(),
            split.test.len()
        );
        Ok(split)
    }
}

fn load_idx_pair(dir: &Path, images: &str, labels: &str) -> Result<LabeledImages> {
    let image_path = dir.join(images);
    let label_path = dir.join(labels);

    let image_bytes = fs::read(&image_path)
        .with_context(|| format!("Cannot read '{}'", image_path.display()))?;
    let label_bytes = fs::read(&label_path)
        .with_context(|| format!("Cannot read '{}'", label_path.display()))?;

    let images = idx::parse_images(&image_bytes)
        .with_context(|| format!("Malformed image file '{}'", image_path.display()))?;
    let labels = idx::parse_labels(&label_bytes)
        .with_context(|| format!("Malformed label file '{}'", label_path.display()))?;

    if images.len() != labels.len() {
        anyhow::bail!(
            "'{}' holds {} images but '{}' holds {} labels",
            image_path.display(),
            images.len(),
            label_path.display(),
            labels.len()
        );
    }
    Ok(LabeledImages::new(images, labels))
}

/// Burn stores MNIST pixels as f32 in [0, 255]; bring them back to u8.
fn from_burn(dataset: MnistDataset) -> Result<LabeledImages> {
    let mut pixels = Vec::with_capacity(dataset.len() * IMG_ROWS * IMG_COLS);
    let mut labels = Vec::with_capacity(dataset.len());

    for item in dataset.iter() {
        for row in item.image.iter() {
            pixels.extend(row.iter().map(|&p| p.round().clamp(0.0, 255.0) as u8));
        }
        labels.push(item.label);
    }

    let images = RawImages::new(IMG_ROWS, IMG_COLS, pixels)?;
    Ok(LabeledImages::new(images, labels))
}
