// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the indices of the training pool and cuts them in
// two:
//   - Validation set: the first floor(v * N) shuffled indices
//   - Training set:   every remaining index
//
// Every index lands in exactly one partition; nothing is
// resampled. The shuffle draws from an explicitly seeded
// StdRng owned by the caller, so the split depends only on
// the seed and N.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom};

use crate::domain::image::ImageTensor;

/// Smallest accepted validation fraction
pub const MIN_VALIDATION_FRACTION: f64 = 0.05;

/// Largest accepted validation fraction
pub const MAX_VALIDATION_FRACTION: f64 = 0.30;

/// Index partition of a pool of N examples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train:      Vec<usize>,
    pub validation: Vec<usize>,
}

/// Preprocessed training and validation partitions.
#[derive(Debug, Clone)]
pub struct TrainValSplit {
    pub x_train: ImageTensor,
    pub y_train: Vec<u8>,
    pub x_val:   ImageTensor,
    pub y_val:   Vec<u8>,
}

/// Number of validation examples for a pool of `total`.
pub fn validation_count(total: usize, validation_fraction: f64) -> usize {
    (validation_fraction * total as f64).floor() as usize
}

/// Shuffle `0..total` and split off the validation indices.
///
/// # Panics
/// Panics if `validation_fraction` is outside [0.05, 0.30].
pub fn split_indices(total: usize, validation_fraction: f64, rng: &mut StdRng) -> SplitIndices {
    assert!(
        (MIN_VALIDATION_FRACTION..=MAX_VALIDATION_FRACTION).contains(&validation_fraction),
        "validation fraction {validation_fraction} must lie in [{MIN_VALIDATION_FRACTION}, {MAX_VALIDATION_FRACTION}]"
    );

    let mut indices: Vec<usize> = (0..total).collect();
    indices.shuffle(rng);

    // split_off(n) leaves [0..n] in `indices` and returns [n..]
    let val_count = validation_count(total, validation_fraction);
    let train     = indices.split_off(val_count);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        train.len(),
        indices.len(),
    );

    SplitIndices { train, validation: indices }
}

/// Split preprocessed images and their labels into train/validation.
///
/// # Panics
/// Panics on an out-of-range fraction or if `labels` and
/// `images` differ in length.
pub fn split_train_val(
    images:              &ImageTensor,
    labels:              &[u8],
    validation_fraction: f64,
    rng:                 &mut StdRng,
) -> TrainValSplit {
    assert_eq!(images.len(), labels.len(), "images and labels differ in length");

    let split = split_indices(images.len(), validation_fraction, rng);
    let pick  = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect::<Vec<u8>>();

    TrainValSplit {
        x_train: images.select(&split.train),
        y_train: pick(&split.train),
        x_val:   images.select(&split.validation),
        y_val:   pick(&split.validation),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ChannelOrder, InputShape};
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_partitions_cover_every_index_once() {
        for &v in &[0.05, 0.1, 0.2, 0.25, 0.3] {
            for &n in &[0usize, 1, 7, 100, 999] {
                let mut rng = StdRng::seed_from_u64(11);
                let split   = split_indices(n, v, &mut rng);

                assert_eq!(split.validation.len(), validation_count(n, v));
                assert_eq!(split.train.len() + split.validation.len(), n);

                let all: HashSet<usize> =
                    split.train.iter().chain(&split.validation).copied().collect();
                assert_eq!(all.len(), n, "overlap for n={n}, v={v}");
                assert!(all.iter().all(|&i| i < n));
            }
        }
    }

    #[test]
    fn test_same_seed_same_validation_set() {
        let first  = split_indices(1000, 0.2, &mut StdRng::seed_from_u64(2));
        let second = split_indices(1000, 0.2, &mut StdRng::seed_from_u64(2));

        assert_eq!(first.validation.len(), 200);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seed_changes_the_split() {
        let a = split_indices(1000, 0.2, &mut StdRng::seed_from_u64(2));
        let b = split_indices(1000, 0.2, &mut StdRng::seed_from_u64(3));
        assert_ne!(a.validation, b.validation);
    }

    #[test]
    #[should_panic]
    fn test_fraction_below_range_panics() {
        let _ = split_indices(10, 0.04, &mut StdRng::seed_from_u64(0));
    }

    #[test]
    #[should_panic]
    fn test_fraction_above_range_panics() {
        let _ = split_indices(10, 0.31, &mut StdRng::seed_from_u64(0));
    }

    #[test]
    fn test_images_follow_their_labels() {
        let shape  = InputShape { channels: 1, rows: 1, cols: 1, order: ChannelOrder::First };
        // Image i holds the value i, label i holds i as well
        let images = ImageTensor::new(20, shape, (0..20).map(|i| i as f32).collect());
        let labels: Vec<u8> = (0..20).collect();

        let split = split_train_val(&images, &labels, 0.25, &mut StdRng::seed_from_u64(2));
        assert_eq!(split.x_val.len(), 5);
        assert_eq!(split.x_train.len(), 15);
        for (i, &label) in split.y_val.iter().enumerate() {
            assert_eq!(split.x_val.image(i), &[label as f32]);
        }
        for (i, &label) in split.y_train.iter().enumerate() {
            assert_eq!(split.x_train.image(i), &[label as f32]);
        }
    }
}
