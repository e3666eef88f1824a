// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns raw (N, 28, 28) u8 images into model-ready tensors:
//
//   1. Insert a singleton channel dimension where the backend
//      expects it:
//        ChannelOrder::First → (N, 1, 28, 28)
//        ChannelOrder::Last  → (N, 28, 28, 1)
//   2. Cast every pixel to f32
//   3. Divide by 255.0 so values lie in [0, 1]
//
// The returned InputShape is what the model factory needs to
// size its first convolution and the flattened dense layer.

use crate::domain::image::{ChannelOrder, ImageTensor, InputShape, RawImages, IMG_COLS, IMG_ROWS};

pub struct Preprocessor {
    order: ChannelOrder,
}

impl Preprocessor {
    /// Create a preprocessor for the backend's channel order
    pub fn new(order: ChannelOrder) -> Self {
        Self { order }
    }

    /// Per-image input shape produced by this preprocessor
    pub fn input_shape(&self) -> InputShape {
        InputShape { channels: 1, rows: IMG_ROWS, cols: IMG_COLS, order: self.order }
    }

    /// Reshape, cast and normalise one batch.
    ///
    /// # Panics
    /// Panics unless the images are exactly 28x28.
    pub fn to_tensor(&self, images: &RawImages) -> ImageTensor {
        assert!(
            images.rows() == IMG_ROWS && images.cols() == IMG_COLS,
            "expected {}x{} images, got {}x{}",
            IMG_ROWS,
            IMG_COLS,
            images.rows(),
            images.cols()
        );

        // Single channel: channel-first and channel-last share one
        // storage order, only the declared shape changes.
        let data: Vec<f32> = images
            .pixels()
            .iter()
            .map(|&p| p as f32 / 255.0)
            .collect();

        ImageTensor::new(images.len(), self.input_shape(), data)
    }

    /// Preprocess the train and test pools together.
    pub fn process(
        &self,
        train: &RawImages,
        test:  &RawImages,
    ) -> (ImageTensor, ImageTensor, InputShape) {
        (self.to_tensor(train), self.to_tensor(test), self.input_shape())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn raw(count: usize, fill: impl Fn(usize) -> u8) -> RawImages {
        let pixels = (0..count * IMG_ROWS * IMG_COLS).map(fill).collect();
        RawImages::new(IMG_ROWS, IMG_COLS, pixels).unwrap()
    }

    #[test]
    fn test_channel_first_shape() {
        let p = Preprocessor::new(ChannelOrder::First);
        let t = p.to_tensor(&raw(3, |_| 0));
        assert_eq!((t.len(), t.input_shape().dims()), (3, [1, 28, 28]));
        assert_eq!(p.input_shape().dims(), [1, 28, 28]);
    }

    #[test]
    fn test_channel_last_shape() {
        let p = Preprocessor::new(ChannelOrder::Last);
        let (train, test, shape) = p.process(&raw(4, |_| 0), &raw(2, |_| 0));
        assert_eq!((train.len(), train.input_shape().dims()), (4, [28, 28, 1]));
        assert_eq!((test.len(), test.input_shape().dims()),   (2, [28, 28, 1]));
        assert_eq!(shape.dims(),  [28, 28, 1]);
    }

    #[test]
    fn test_values_in_unit_range_for_every_byte() {
        let p = Preprocessor::new(ChannelOrder::First);
        let t = p.to_tensor(&raw(1, |i| (i % 256) as u8));

        assert!(t.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(t.data()[0], 0.0);
        assert_eq!(t.data()[255], 1.0);
    }

    #[test]
    fn test_empty_batch_keeps_batch_dimension() {
        let p = Preprocessor::new(ChannelOrder::First);
        let t = p.to_tensor(&RawImages::new(IMG_ROWS, IMG_COLS, Vec::new()).unwrap());
        assert!(t.is_empty());
        assert_eq!(t.input_shape().dims(), [1, 28, 28]);
    }

    #[test]
    #[should_panic]
    fn test_rejects_wrong_image_size() {
        let p = Preprocessor::new(ChannelOrder::First);
        let _ = p.to_tensor(&RawImages::new(27, 28, vec![0; 27 * 28]).unwrap());
    }
}
