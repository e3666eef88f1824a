// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Mini-batch training with Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend; the model is built
//     after B::seed(seed) so initial weights follow the seed
//   - Each epoch draws floor(N_train / batch_size) full
//     batches from a seeded shuffle; the ragged tail is skipped
//   - model.valid() moves the model to the inner backend
//     (dropout off, no autodiff graph) for validation
//   - Loss and accuracy are averaged per example, not per batch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    augment::Augmenter,
    batcher::{DigitBatch, DigitBatcher},
    dataset::DigitDataset,
    splitter::TrainValSplit,
};
use crate::domain::history::{EpochMetrics, TrainingHistory};
use crate::infra::metrics::MetricsLogger;
use crate::ml::model::{DigitCnn, DigitCnnConfig};

/// Optimiser steps per epoch: only full batches count.
fn batches_per_epoch(n_train: usize, batch_size: usize) -> usize {
    if batch_size == 0 { 0 } else { n_train / batch_size }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    model_cfg: &DigitCnnConfig,
    split:     TrainValSplit,
    metrics:   Option<&MetricsLogger>,
    device:    &B::Device,
) -> Result<(DigitCnn<B>, TrainingHistory)> {
    let n_train = split.y_train.len();
    let steps   = batches_per_epoch(n_train, cfg.batch_size);
    if steps == 0 {
        bail!(
            "batch size {} leaves no full batch in {} training examples",
            cfg.batch_size,
            n_train
        );
    }
    if split.y_val.is_empty() {
        bail!("validation partition is empty; use more data or a larger validation fraction");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    B::seed(cfg.seed);
    let mut model: DigitCnn<B> = model_cfg.init(device);
    tracing::info!("Model ready: {} trainable params", model.num_params());
    tracing::debug!("\n{}", model_cfg.summary());

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g
    // v = β2*v + (1-β2)*g²
    // θ = θ - lr * m̂ / (√v̂ + ε)
    let mut optim = AdamConfig::new()
        .with_beta_1(cfg.beta_1 as f32)
        .with_beta_2(cfg.beta_2 as f32)
        .with_epsilon(cfg.epsilon as f32)
        .init::<B, DigitCnn<B>>();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let shape = split.x_train.input_shape();

    let mut train_batcher = DigitBatcher::<B>::new(device.clone(), shape, cfg.num_classes);
    if !cfg.augmentation.is_identity() {
        tracing::info!("Real-time augmentation enabled: {:?}", cfg.augmentation);
        let augmenter = Augmenter::new(cfg.augmentation.clone(), cfg.seed);
        train_batcher = train_batcher.with_augmenter(Arc::new(augmenter));
    }
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .build(DigitDataset::new(split.x_train, split.y_train));

    let val_batcher = DigitBatcher::<B::InnerBackend>::new(device.clone(), shape, cfg.num_classes);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .build(DigitDataset::new(split.x_val, split.y_val));

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut history = TrainingHistory::new();

    for epoch in 1..=cfg.epochs {
        let (trained, train) = train_epoch(
            model, &mut optim, train_loader.as_ref(), steps, cfg.learning_rate,
        );
        model = trained;

        let model_valid = model.valid();
        let mut val = Tally::default();

        for batch in val_loader.iter() {
            let batch_len = batch.labels.dims()[0];
            let (loss, logits) = model_valid.forward_loss(batch.images, batch.targets);
            val.add(
                loss.into_scalar().elem::<f64>(),
                count_correct(logits, batch.labels),
                batch_len,
            );
        }

        let m = EpochMetrics {
            epoch,
            loss:         train.mean_loss(),
            accuracy:     train.accuracy(),
            val_loss:     val.mean_loss(),
            val_accuracy: val.accuracy(),
        };
        history.record(&m);
        if let Some(logger) = metrics {
            logger.log(&m)?;
        }

        println!(
            "Epoch {:>2}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
            epoch, cfg.epochs, m.loss, m.accuracy, m.val_loss, m.val_accuracy,
        );
    }

    tracing::info!("Training complete after {} epochs", cfg.epochs);
    Ok((model, history))
}

/// One pass of `steps` optimiser updates over the shuffled loader.
/// A trailing partial batch is never reached.
fn train_epoch<B, O>(
    mut model: DigitCnn<B>,
    optim:     &mut O,
    loader:    &dyn DataLoader<DigitBatch<B>>,
    steps:     usize,
    lr:        f64,
) -> (DigitCnn<B>, Tally)
where
    B: AutodiffBackend,
    O: Optimizer<DigitCnn<B>, B>,
{
    let mut tally = Tally::default();

    for batch in loader.iter().take(steps) {
        let batch_len = batch.labels.dims()[0];
        let (loss, logits) = model.forward_loss(batch.images, batch.targets);
        tally.add(
            loss.clone().into_scalar().elem::<f64>(),
            count_correct(logits, batch.labels),
            batch_len,
        );

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(lr, model, grads);
    }
    (model, tally)
}

/// Number of rows whose arg-max logit equals the label.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted.equal(labels).int().sum().into_scalar().elem::<i64>() as usize
}

/// Example-weighted running sums for one pass over a loader.
#[derive(Debug, Default)]
struct Tally {
    loss_sum: f64,
    correct:  usize,
    seen:     usize,
}

impl Tally {
    fn add(&mut self, batch_mean_loss: f64, correct: usize, batch_len: usize) {
        self.loss_sum += batch_mean_loss * batch_len as f64;
        self.correct  += correct;
        self.seen     += batch_len;
    }

    fn mean_loss(&self) -> f64 {
        if self.seen > 0 { self.loss_sum / self.seen as f64 } else { f64::NAN }
    }

    fn accuracy(&self) -> f64 {
        if self.seen > 0 { self.correct as f64 / self.seen as f64 } else { 0.0 }
    }
}
