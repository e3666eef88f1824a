// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<DigitSample>
// into one batch of tensors on the target device.
//
//   Input:  N samples of rows * cols normalised pixels
//   Output: DigitBatch with
//             images  [N, C, H, W]  (Burn convolutions are
//                                    channel-first)
//             targets [N, classes]  one-hot rows
//             labels  [N]           class ids
//
// When an augmenter is attached, every image is warped as it
// is batched, so each epoch sees a fresh variant.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use std::sync::Arc;

use crate::data::{augment::Augmenter, dataset::DigitSample};
use crate::domain::image::{ChannelOrder, InputShape};
use crate::domain::labels::OneHot;

/// A batch of digits ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Images — shape: [batch_size, channels, rows, cols]
    pub images: Tensor<B, 4>,

    /// One-hot targets — shape: [batch_size, num_classes]
    pub targets: Tensor<B, 2>,

    /// Class ids — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    device:      B::Device,
    shape:       InputShape,
    num_classes: usize,
    augmenter:   Option<Arc<Augmenter>>,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device, shape: InputShape, num_classes: usize) -> Self {
        Self { device, shape, num_classes, augmenter: None }
    }

    /// Warp every training image with `augmenter` while batching
    pub fn with_augmenter(mut self, augmenter: Arc<Augmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }
}

/// Build a channel-first image tensor from `count` images stored
/// in the layout described by `shape`.
pub fn images_to_tensor<B: Backend>(
    data:   Vec<f32>,
    count:  usize,
    shape:  InputShape,
    device: &B::Device,
) -> Tensor<B, 4> {
    let [a, b, c] = shape.dims();
    let tensor = Tensor::<B, 4>::from_data(TensorData::new(data, [count, a, b, c]), device);

    match shape.order {
        ChannelOrder::First => tensor,
        // [N, H, W, C] → [N, C, W, H] → [N, C, H, W]
        ChannelOrder::Last  => tensor.swap_dims(1, 3).swap_dims(2, 3),
    }
}

impl<B: Backend> Batcher<DigitSample, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitSample>) -> DigitBatch<B> {
        let batch_size = items.len();

        // ── Images (optionally augmented) ────────────────────────────────────
        let mut flat = Vec::with_capacity(batch_size * self.shape.values_per_image());
        for item in &items {
            match &self.augmenter {
                Some(aug) => flat.extend(aug.apply(&item.pixels, self.shape.rows, self.shape.cols)),
                None      => flat.extend_from_slice(&item.pixels),
            }
        }
        let images = images_to_tensor::<B>(flat, batch_size, self.shape, &self.device);

        // ── Targets ──────────────────────────────────────────────────────────
        let labels: Vec<u8> = items.iter().map(|s| s.label).collect();
        let one_hot = OneHot::encode(&labels, self.num_classes);

        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(one_hot.data().to_vec(), [batch_size, self.num_classes]),
            &self.device,
        );

        let ids: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(ids, [batch_size]),
            &self.device,
        );

        DigitBatch { images, targets, labels }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use crate::data::augment::AugmentConfig;

    type TestBackend = NdArray;

    fn shape(order: ChannelOrder) -> InputShape {
        InputShape { channels: 1, rows: 2, cols: 3, order }
    }

    fn samples() -> Vec<DigitSample> {
        vec![
            DigitSample { pixels: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5], label: 2 },
            DigitSample { pixels: vec![1.0; 6], label: 0 },
        ]
    }

    #[test]
    fn test_batch_shapes() {
        let device  = NdArrayDevice::Cpu;
        let batcher = DigitBatcher::<TestBackend>::new(device, shape(ChannelOrder::First), 3);
        let batch   = batcher.batch(samples());

        assert_eq!(batch.images.dims(),  [2, 1, 2, 3]);
        assert_eq!(batch.targets.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(),  [2]);
    }

    #[test]
    fn test_targets_are_one_hot() {
        let device  = NdArrayDevice::Cpu;
        let batcher = DigitBatcher::<TestBackend>::new(device, shape(ChannelOrder::First), 3);
        let batch   = batcher.batch(samples());

        let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(targets, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![2, 0]);
    }

    #[test]
    fn test_flip_augmenter_mirrors_or_keeps_each_image() {
        let cfg       = AugmentConfig { horizontal_flip: true, ..Default::default() };
        let augmenter = Arc::new(Augmenter::new(cfg, 7));
        let batcher   = DigitBatcher::<TestBackend>::new(NdArrayDevice::Cpu, shape(ChannelOrder::First), 3)
            .with_augmenter(augmenter);

        let original = samples()[0].pixels.clone();
        let mirrored: Vec<f32> = vec![0.2, 0.1, 0.0, 0.5, 0.4, 0.3];

        let (mut kept, mut flipped) = (0, 0);
        for _ in 0..32 {
            let batch  = batcher.batch(samples());
            let images = batch.images.into_data().to_vec::<f32>().unwrap();
            assert_eq!(&images[6..], &[1.0f32; 6]);

            let first = &images[..6];
            if first == original.as_slice() {
                kept += 1;
            } else if first == mirrored.as_slice() {
                flipped += 1;
            } else {
                panic!("image was neither kept nor mirrored: {first:?}");
            }

            // labels are never touched by augmentation
            let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
            assert_eq!(labels, vec![2, 0]);
        }
        assert!(kept > 0 && flipped > 0, "kept {kept}, flipped {flipped}");
    }

    #[test]
    fn test_channel_last_lands_channel_first() {
        let first = DigitBatcher::<TestBackend>::new(NdArrayDevice::Cpu, shape(ChannelOrder::First), 3)
            .batch(samples());
        let last  = DigitBatcher::<TestBackend>::new(NdArrayDevice::Cpu, shape(ChannelOrder::Last), 3)
            .batch(samples());

        assert_eq!(last.images.dims(), [2, 1, 2, 3]);
        let a = first.images.into_data().to_vec::<f32>().unwrap();
        let b = last.images.into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }
}
