// ============================================================
// Layer 2 — Visualisation Use Cases
// ============================================================
//   VisualiseUseCase::misclassified
//       scan the test set in order with single-image inference,
//       keep the first 16 mistakes and render the original
//       (unnormalised) digits captioned with the PREDICTED class
//
//   VisualiseUseCase::history
//       re-render the stored training curves
//
//   SamplesUseCase
//       render the first 16 training digits with their true labels

use anyhow::Result;
use burn::prelude::Backend;
use std::path::{Path, PathBuf};

use crate::data::{loader::MnistLoader, preprocessor::Preprocessor};
use crate::domain::traits::DigitSource;
use crate::infra::{
    model_store::{ModelStore, HISTORY_PLOT, MISCLASSIFIED},
    render::{render_digit_grid, render_history, DISPLAY_SIZE},
};
use crate::ml::{
    evaluator::{scan_misclassified, Misclassified, MAX_MISCLASSIFIED},
    inferencer::Inferencer,
    ComputeBackend, CHANNEL_ORDER,
};

pub struct VisualiseUseCase {
    store:  ModelStore,
    name:   String,
    source: Box<dyn DigitSource>,
}

impl VisualiseUseCase {
    pub fn new(model_dir: &str, name: &str, data_dir: Option<String>) -> Self {
        Self::with_source(model_dir, name, Box::new(MnistLoader::new(data_dir)))
    }

    pub fn with_source(model_dir: &str, name: &str, source: Box<dyn DigitSource>) -> Self {
        Self { store: ModelStore::new(model_dir), name: name.to_string(), source }
    }

    /// Misclassification grid on the default inference backend.
    pub fn misclassified(&self) -> Result<Vec<Misclassified>> {
        self.misclassified_on::<ComputeBackend>(Default::default())
    }

    pub fn misclassified_on<B: Backend>(&self, device: B::Device) -> Result<Vec<Misclassified>> {
        let inferencer = Inferencer::<B>::from_store(&self.store, &self.name, device)?;

        let data   = self.source.load()?;
        let x_test = Preprocessor::new(CHANNEL_ORDER).to_tensor(&data.test.images);

        let found = scan_misclassified(&inferencer, &x_test, &data.test.labels, MAX_MISCLASSIFIED)?;
        if found.is_empty() {
            println!("No misclassified test images");
            return Ok(found);
        }

        let ids: Vec<usize>       = found.iter().map(|m| m.index).collect();
        let predicted: Vec<usize> = found.iter().map(|m| m.predicted).collect();

        let path = self.store.artifact(&self.name, MISCLASSIFIED);
        render_digit_grid(&data.test.images.select(&ids), &predicted, &path)?;
        println!("Saved {} misclassified digits to {}", found.len(), path.display());
        Ok(found)
    }

    /// Re-render history.svg from the stored history.json.
    pub fn history(&self) -> Result<PathBuf> {
        let history = self.store.load_history(&self.name)?;
        let path    = self.store.artifact(&self.name, HISTORY_PLOT);
        render_history(&history, &path)?;
        println!("Saved training curves to {}", path.display());
        Ok(path)
    }
}

/// Ground-truth grid of the first training digits.
pub struct SamplesUseCase {
    source: Box<dyn DigitSource>,
    output: PathBuf,
}

impl SamplesUseCase {
    pub fn new(data_dir: Option<String>, output: impl Into<PathBuf>) -> Self {
        Self::with_source(Box::new(MnistLoader::new(data_dir)), output)
    }

    pub fn with_source(source: Box<dyn DigitSource>, output: impl Into<PathBuf>) -> Self {
        Self { source, output: output.into() }
    }

    pub fn execute(&self) -> Result<&Path> {
        let data  = self.source.load()?;
        let count = data.train.len().min(DISPLAY_SIZE * DISPLAY_SIZE);
        let ids: Vec<usize> = (0..count).collect();

        let labels: Vec<usize> = data.train.labels[..count].iter().map(|&l| l as usize).collect();
        render_digit_grid(&data.train.images.select(&ids), &labels, &self.output)?;
        println!("Saved {} training digits to {}", count, self.output.display());
        Ok(&self.output)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::tests::{train_tiny, SyntheticSource};
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    #[test]
    fn test_misclassified_grid_is_rendered() {
        let dir = tempfile::tempdir().unwrap();
        train_tiny(dir.path());

        let use_case = VisualiseUseCase::with_source(
            &dir.path().display().to_string(),
            "tiny",
            Box::new(SyntheticSource { train: 60, test: 40 }),
        );
        let found = use_case.misclassified_on::<NdArray>(NdArrayDevice::Cpu).unwrap();

        assert!(found.len() <= MAX_MISCLASSIFIED);
        assert!(found.iter().all(|m| m.predicted != m.actual));
        let png = dir.path().join("tiny").join(MISCLASSIFIED);
        assert_eq!(png.is_file(), !found.is_empty());
    }

    #[test]
    fn test_history_is_re_rendered() {
        let dir = tempfile::tempdir().unwrap();
        train_tiny(dir.path());
        let svg_path = dir.path().join("tiny").join(HISTORY_PLOT);
        std::fs::remove_file(&svg_path).unwrap();

        let use_case = VisualiseUseCase::with_source(
            &dir.path().display().to_string(),
            "tiny",
            Box::new(SyntheticSource { train: 1, test: 1 }),
        );
        assert_eq!(use_case.history().unwrap(), svg_path);
        assert!(svg_path.is_file());
    }

    #[test]
    fn test_samples_grid_is_written() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.png");
        let use_case = SamplesUseCase::with_source(Box::new(SyntheticSource { train: 30, test: 1 }), &path);

        assert_eq!(use_case.execute().unwrap(), path.as_path());
        assert!(image::open(&path).is_ok());
    }
}
