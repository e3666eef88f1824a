// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network lives
// here, along with the backend choice.
//
//   model.rs      — DigitCnn architecture and its config
//                   (two 3x3 convolutions, max-pool, dropout,
//                   dense head with softmax output)
//
//   trainer.rs    — Adam training loop with per-epoch
//                   validation, producing a TrainingHistory
//
//   inferencer.rs — Wraps a trained DigitCnn behind the
//                   Classifier trait, batching predictions
//
//   evaluator.rs  — Test accuracy and the misclassification
//                   scan over any Classifier
//
// Backend: Wgpu by default, NdArray when built without the
// `wgpu` feature. Training wraps either in Autodiff.

use burn::backend::Autodiff;

use crate::domain::image::ChannelOrder;

#[cfg(feature = "wgpu")]
pub type ComputeBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type ComputeBackend = burn::backend::NdArray;

pub type TrainBackend = Autodiff<ComputeBackend>;

/// Burn convolutions expect [batch, C, H, W]
pub const CHANNEL_ORDER: ChannelOrder = ChannelOrder::First;

/// CNN architecture for 28x28 digit images
pub mod model;

/// Training loop with validation and history recording
pub mod trainer;

/// Classifier backed by a trained DigitCnn
pub mod inferencer;

/// Accuracy and misclassification scan
pub mod evaluator;
