// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Re-loads a named model and reports its accuracy on the
// held-out MNIST test set.
//
//   Step 1: Load the model from the store   (Layer 6 - infra)
//   Step 2: Load + preprocess the test pool (Layer 4 - data)
//   Step 3: One-hot encode the test labels  (Layer 3 - domain)
//   Step 4: Batch inference + accuracy      (Layer 5 - ml)

use anyhow::Result;
use burn::prelude::Backend;

use crate::data::{loader::MnistLoader, preprocessor::Preprocessor};
use crate::domain::labels::OneHot;
use crate::domain::traits::{Classifier, DigitSource};
use crate::infra::model_store::ModelStore;
use crate::ml::{evaluator::accuracy, inferencer::Inferencer, ComputeBackend, CHANNEL_ORDER};

pub struct TestUseCase {
    store:  ModelStore,
    name:   String,
    source: Box<dyn DigitSource>,
}

impl TestUseCase {
    pub fn new(model_dir: &str, name: &str, data_dir: Option<String>) -> Self {
        Self::with_source(model_dir, name, Box::new(MnistLoader::new(data_dir)))
    }

    pub fn with_source(model_dir: &str, name: &str, source: Box<dyn DigitSource>) -> Self {
        Self { store: ModelStore::new(model_dir), name: name.to_string(), source }
    }

    /// Evaluate on the default inference backend.
    pub fn execute(&self) -> Result<f64> {
        self.execute_on::<ComputeBackend>(Default::default())
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<f64> {
        // Fail on a missing model before touching the dataset
        let inferencer = Inferencer::<B>::from_store(&self.store, &self.name, device)?;

        let data   = self.source.load()?;
        let x_test = Preprocessor::new(CHANNEL_ORDER).to_tensor(&data.test.images);
        let y_test = OneHot::encode(&data.test.labels, inferencer.num_classes());

        let acc = accuracy(&inferencer, &x_test, &y_test)?;
        println!("Test accuracy: {}", acc);
        Ok(acc)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::tests::{train_tiny, SyntheticSource};
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    #[test]
    fn test_accuracy_of_trained_model_is_a_fraction() {
        let dir = tempfile::tempdir().unwrap();
        train_tiny(dir.path());

        let use_case = TestUseCase::with_source(
            &dir.path().display().to_string(),
            "tiny",
            Box::new(SyntheticSource { train: 60, test: 20 }),
        );
        let acc = use_case.execute_on::<NdArray>(NdArrayDevice::Cpu).unwrap();
        assert!((0.0..=1.0).contains(&acc));
        // 20 images: accuracy is a multiple of 1/20
        assert!(((acc * 20.0) - (acc * 20.0).round()).abs() < 1e-9);
    }

    #[test]
    fn test_missing_model_propagates_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = TestUseCase::with_source(
            &dir.path().display().to_string(),
            "never_trained",
            Box::new(SyntheticSource { train: 10, test: 10 }),
        );
        let err = use_case.execute_on::<NdArray>(NdArrayDevice::Cpu).unwrap_err();
        assert!(err.to_string().contains("never_trained"));
    }
}
