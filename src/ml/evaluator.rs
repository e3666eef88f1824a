// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores any Classifier against labelled images:
//
//   accuracy           batch inference, arg-max vs ground truth
//   scan_misclassified one image at a time in dataset order,
//                      stopping after `limit` mistakes

use anyhow::{bail, Result};

use crate::domain::image::ImageTensor;
use crate::domain::labels::{argmax, OneHot};
use crate::domain::traits::Classifier;

/// Cells in the misclassification grid
pub const MAX_MISCLASSIFIED: usize = 16;

/// Fraction of images whose arg-max prediction matches the label.
///
/// # Panics
/// Panics if `images` and `labels` differ in length.
pub fn accuracy(classifier: &dyn Classifier, images: &ImageTensor, labels: &OneHot) -> Result<f64> {
    assert_eq!(images.len(), labels.rows(), "images and labels differ in length");
    if images.is_empty() {
        bail!("cannot compute accuracy on an empty test set");
    }

    let probs = classifier.predict(images)?;
    if probs.len() != images.len() {
        bail!("classifier returned {} rows for {} images", probs.len(), images.len());
    }

    let correct = probs
        .iter()
        .zip(labels.decode())
        .filter(|(row, truth)| argmax(row) == *truth)
        .count();

    tracing::debug!("{} / {} test images correct", correct, images.len());
    Ok(correct as f64 / images.len() as f64)
}

/// A test image the classifier got wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Misclassified {
    /// Position in the test set
    pub index:     usize,
    pub predicted: usize,
    pub actual:    usize,
}

/// Walk the test set in order and collect up to `limit` mistakes.
pub fn scan_misclassified(
    classifier: &dyn Classifier,
    images:     &ImageTensor,
    labels:     &[u8],
    limit:      usize,
) -> Result<Vec<Misclassified>> {
    assert_eq!(images.len(), labels.len(), "images and labels differ in length");

    let mut found = Vec::new();
    for (index, &label) in labels.iter().enumerate() {
        if found.len() >= limit {
            break;
        }

        let probs = classifier.predict(&images.select(&[index]))?;
        let Some(row) = probs.first() else {
            bail!("classifier returned no prediction for image {index}");
        };

        let predicted = argmax(row);
        if predicted != label as usize {
            found.push(Misclassified { index, predicted, actual: label as usize });
        }
    }

    tracing::info!("Found {} misclassified images", found.len());
    Ok(found)
}
