// ============================================================
// Layer 5 — Inferencer
// ============================================================
// A trained DigitCnn behind the Classifier trait. Images are
// fed through the network in fixed-size batches and come back
// as softmax probability rows in input order.

use anyhow::{anyhow, bail, Result};
use burn::prelude::*;

use crate::data::batcher::images_to_tensor;
use crate::domain::image::{ImageTensor, InputShape};
use crate::domain::traits::Classifier;
use crate::infra::model_store::ModelStore;
use crate::ml::model::{DigitCnn, DigitCnnConfig};
use crate::ml::CHANNEL_ORDER;

const DEFAULT_BATCH_SIZE: usize = 128;

pub struct Inferencer<B: Backend> {
    model:      DigitCnn<B>,
    config:     DigitCnnConfig,
    device:     B::Device,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: DigitCnn<B>, config: DigitCnnConfig, device: B::Device) -> Self {
        Self { model, config, device, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Re-load model `name` from the store onto `device`.
    pub fn from_store(store: &ModelStore, name: &str, device: B::Device) -> Result<Self> {
        let (config, model) = store.load_model::<B>(name, &device)?;
        Ok(Self::new(model, config, device))
    }

    /// Shape the network was built for, in the backend's channel order
    pub fn input_shape(&self) -> InputShape {
        InputShape {
            channels: self.config.channels,
            rows:     self.config.rows,
            cols:     self.config.cols,
            order:    CHANNEL_ORDER,
        }
    }
}

impl<B: Backend> Classifier for Inferencer<B> {
    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn predict(&self, images: &ImageTensor) -> Result<Vec<Vec<f32>>> {
        let shape    = images.input_shape();
        let expected = self.input_shape();
        if (shape.channels, shape.rows, shape.cols) != (expected.channels, expected.rows, expected.cols) {
            bail!(
                "model expects {}x{}x{} images, got {}x{}x{}",
                expected.channels, expected.rows, expected.cols,
                shape.channels, shape.rows, shape.cols,
            );
        }

        let per_image = shape.values_per_image();
        let classes   = self.num_classes();
        let mut rows  = Vec::with_capacity(images.len());

        let mut start = 0;
        while start < images.len() {
            let end  = (start + self.batch_size).min(images.len());
            let data = images.data()[start * per_image..end * per_image].to_vec();

            let input = images_to_tensor::<B>(data, end - start, shape, &self.device);
            let probs = self
                .model
                .forward_probabilities(input)
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;

            rows.extend(probs.chunks(classes).map(<[f32]>::to_vec));
            start = end;
        }

        tracing::debug!("Predicted {} images", rows.len());
        Ok(rows)
    }
}
