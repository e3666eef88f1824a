// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only sees these two traits:
//   - DigitSource → MnistLoader (burn download or IDX files),
//                   in-memory sources in tests
//   - Classifier  → Inferencer (a trained Burn model),
//                   fixed-output classifiers in tests

use anyhow::Result;
use crate::domain::image::{DigitSplit, ImageTensor};

// ─── DigitSource ──────────────────────────────────────────────────────────────
/// Any component that can supply the labelled train/test digits.
pub trait DigitSource {
    /// Load the full train and test pools.
    fn load(&self) -> Result<DigitSplit>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A trained model seen as an opaque capability.
pub trait Classifier {
    /// Number of output classes (width of each probability row)
    fn num_classes(&self) -> usize;

    /// Class probabilities for every image in the batch,
    /// one row of `num_classes()` values per image, in input order.
    fn predict(&self, images: &ImageTensor) -> Result<Vec<Vec<f32>>>;
}
