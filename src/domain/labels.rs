// ============================================================
// Layer 3 — Labels and One-Hot Encoding
// ============================================================
// Class ids are small integers in [0, num_classes).
// The trainer and evaluator work with one-hot rows:
//
//   label 3, 10 classes → [0, 0, 0, 1, 0, 0, 0, 0, 0, 0]

/// Number of digit classes in MNIST
pub const NUM_CLASSES: usize = 10;

/// A row-major (N, num_classes) one-hot matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHot {
    classes: usize,
    data:    Vec<f32>,
}

impl OneHot {
    /// Encode integer labels.
    ///
    /// # Panics
    /// Panics if any label is outside [0, num_classes).
    pub fn encode(labels: &[u8], num_classes: usize) -> Self {
        let mut data = vec![0.0f32; labels.len() * num_classes];
        for (row, &label) in labels.iter().enumerate() {
            let label = label as usize;
            assert!(
                label < num_classes,
                "label {label} is out of range for {num_classes} classes"
            );
            data[row * num_classes + label] = 1.0;
        }
        Self { classes: num_classes, data }
    }


    pub fn rows(&self) -> usize {
        if self.classes == 0 { 0 } else { self.data.len() / self.classes }
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.classes..(index + 1) * self.classes]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Decode back to class ids via arg-max of each row.
    pub fn decode(&self) -> Vec<usize> {
        (0..self.rows()).map(|i| argmax(self.row(i))).collect()
    }
}

/// Index of the largest score. Ties resolve to the lowest index.
///
/// # Panics
/// Panics on an empty slice.
pub fn argmax(scores: &[f32]) -> usize {
    assert!(!scores.is_empty(), "argmax of an empty score vector");
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_round_trip_for_every_class() {
        let labels: Vec<u8> = (0..NUM_CLASSES as u8).collect();
        let encoded = OneHot::encode(&labels, NUM_CLASSES);

        for (i, &label) in labels.iter().enumerate() {
            assert_eq!(argmax(encoded.row(i)), label as usize);
        }
        let decoded: Vec<usize> = labels.iter().map(|&l| l as usize).collect();
        assert_eq!(encoded.decode(), decoded);
    }

    #[test]
    fn test_exactly_one_hot_entry_per_row() {
        let encoded = OneHot::encode(&[7, 0, 9, 7], NUM_CLASSES);
        assert_eq!(encoded.rows(), 4);
        for i in 0..encoded.rows() {
            let row = encoded.row(i);
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
            assert_eq!(row.iter().sum::<f32>(), 1.0);
        }
    }

    #[test]
    #[should_panic]
    fn test_label_out_of_range_panics() {
        let _ = OneHot::encode(&[10], NUM_CLASSES);
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.1, 0.1, 0.1]), 0);
        assert_eq!(argmax(&[0.0, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[-1.0, -3.0, -0.5]), 2);
    }
}
