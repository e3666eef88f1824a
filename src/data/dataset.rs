use burn::data::dataset::Dataset;

use crate::domain::image::ImageTensor;

/// One normalised image and its class id.
#[derive(Debug, Clone)]
pub struct DigitSample {
    pub pixels: Vec<f32>,
    pub label:  u8,
}

/// A preprocessed partition exposed through Burn's Dataset trait.
pub struct DigitDataset {
    images: ImageTensor,
    labels: Vec<u8>,
}

impl DigitDataset {
    /// # Panics
    /// Panics if images and labels differ in length.
    pub fn new(images: ImageTensor, labels: Vec<u8>) -> Self {
        assert_eq!(images.len(), labels.len(), "images and labels differ in length");
        Self { images, labels }
    }
}

impl Dataset<DigitSample> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        let label = *self.labels.get(index)?;
        Some(DigitSample { pixels: self.images.image(index).to_vec(), label })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ChannelOrder, InputShape};

    #[test]
    fn test_get_returns_matching_pair() {
        let shape = InputShape { channels: 1, rows: 1, cols: 2, order: ChannelOrder::First };
        let ds    = DigitDataset::new(ImageTensor::new(2, shape, vec![0.1, 0.2, 0.3, 0.4]), vec![4, 9]);

        let second = ds.get(1).unwrap();
        assert_eq!(second.pixels, vec![0.3, 0.4]);
        assert_eq!(second.label, 9);
        assert!(ds.get(2).is_none());
        assert_eq!(ds.len(), 2);
    }
}
