// ============================================================
// Layer 3 — Image Domain Types
// ============================================================
// Two representations of a batch of digit images:
//
//   RawImages    — unsigned 8-bit pixels, shape (N, rows, cols),
//                  exactly as the dataset delivers them
//   ImageTensor  — 32-bit floats in [0, 1], shape (N, C, H, W)
//                  or (N, H, W, C) depending on ChannelOrder
//
// With a single grey channel both layouts store one image as
// one contiguous run of rows * cols values; only the declared
// shape differs.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// MNIST image height in pixels
pub const IMG_ROWS: usize = 28;

/// MNIST image width in pixels
pub const IMG_COLS: usize = 28;

/// Where the channel dimension sits in a 4-D image tensor.
/// This is a property of the numeric backend, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// (N, C, H, W)
    First,
    /// (N, H, W, C)
    Last,
}

/// Shape of a single model input, without the batch dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub channels: usize,
    pub rows:     usize,
    pub cols:     usize,
    pub order:    ChannelOrder,
}

impl InputShape {
    /// The per-image shape tuple in the configured channel order
    pub fn dims(&self) -> [usize; 3] {
        match self.order {
            ChannelOrder::First => [self.channels, self.rows, self.cols],
            ChannelOrder::Last  => [self.rows, self.cols, self.channels],
        }
    }

    pub fn values_per_image(&self) -> usize {
        self.channels * self.rows * self.cols
    }
}

// ─── RawImages ────────────────────────────────────────────────────────────────
/// A batch of unnormalised grayscale images stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImages {
    rows:   usize,
    cols:   usize,
    pixels: Vec<u8>,
}

impl RawImages {
    /// Wrap a flat pixel buffer holding a whole number of rows x cols images.
    pub fn new(rows: usize, cols: usize, pixels: Vec<u8>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            bail!("image dimensions must be non-zero, got {rows}x{cols}");
        }
        if pixels.len() % (rows * cols) != 0 {
            bail!(
                "pixel buffer of {} bytes is not a whole number of {}x{} images",
                pixels.len(),
                rows,
                cols
            );
        }
        Ok(Self { rows, cols, pixels })
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    pub fn len(&self) -> usize {
        self.pixels.len() / (self.rows * self.cols)
    }

    /// Pixels of the image at `index`, row-major.
    pub fn image(&self, index: usize) -> &[u8] {
        let size = self.rows * self.cols;
        &self.pixels[index * size..(index + 1) * size]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy the images at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> RawImages {
        let pixels = indices
            .iter()
            .flat_map(|&i| self.image(i).iter().copied())
            .collect();
        RawImages { rows: self.rows, cols: self.cols, pixels }
    }

    /// Keep only the first `count` images.
    pub fn truncate(&mut self, count: usize) {
        self.pixels.truncate(count * self.rows * self.cols);
    }
}

// ─── ImageTensor ──────────────────────────────────────────────────────────────
/// A batch of normalised images ready for the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 4],
    order: ChannelOrder,
    data:  Vec<f32>,
}

impl ImageTensor {
    /// Build a tensor of `count` images with the given per-image shape.
    ///
    /// # Panics
    /// Panics if `data` does not hold exactly `count` images.
    pub fn new(count: usize, input_shape: InputShape, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            count * input_shape.values_per_image(),
            "image data does not match {count} images of shape {:?}",
            input_shape.dims()
        );
        let [a, b, c] = input_shape.dims();
        Self { shape: [count, a, b, c], order: input_shape.order, data }
    }

    pub fn data(&self) -> &[f32] { &self.data }

    pub fn len(&self) -> usize { self.shape[0] }

    pub fn is_empty(&self) -> bool { self.shape[0] == 0 }

    /// Recover the per-image shape from the tensor shape.
    pub fn input_shape(&self) -> InputShape {
        let [_, a, b, c] = self.shape;
        match self.order {
            ChannelOrder::First => InputShape { channels: a, rows: b, cols: c, order: self.order },
            ChannelOrder::Last  => InputShape { rows: a, cols: b, channels: c, order: self.order },
        }
    }

    /// Values of the image at `index` in storage order.
    pub fn image(&self, index: usize) -> &[f32] {
        let size = self.input_shape().values_per_image();
        &self.data[index * size..(index + 1) * size]
    }

    /// Copy the images at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> ImageTensor {
        let data = indices
            .iter()
            .flat_map(|&i| self.image(i).iter().copied())
            .collect();
        ImageTensor::new(indices.len(), self.input_shape(), data)
    }
}

// ─── Labelled collections ─────────────────────────────────────────────────────
/// Images with a parallel sequence of class ids.
#[derive(Debug, Clone)]
pub struct LabeledImages {
    pub images: RawImages,
    pub labels: Vec<u8>,
}

impl LabeledImages {
    /// # Panics
    /// Panics if the number of labels differs from the number of images.
    pub fn new(images: RawImages, labels: Vec<u8>) -> Self {
        assert_eq!(
            images.len(),
            labels.len(),
            "{} images but {} labels",
            images.len(),
            labels.len()
        );
        Self { images, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Keep only the first `count` examples.
    pub fn truncate(&mut self, count: usize) {
        self.images.truncate(count);
        self.labels.truncate(count);
    }
}

/// The fixed train / test split delivered by a digit source.
#[derive(Debug, Clone)]
pub struct DigitSplit {
    pub train: LabeledImages,
    pub test:  LabeledImages,
}
