// ============================================================
// Layer 6 — Model Store
// ============================================================
// Persists trained models by name using Burn's CompactRecorder.
//
// One directory per model name:
//
//   models/
//     <name>/
//       model.mpk.gz        ← trained weights (half precision)
//       model_config.json   ← DigitCnnConfig, needed to rebuild
//                             the network before loading weights
//       train_config.json   ← full TrainConfig of the run
//       history.json        ← per-epoch metrics
//       metrics.csv         ← written by MetricsLogger
//       history.svg         ← rendered training curves
//       misclassified.png   ← rendered by `visualise`
//
// Loading is type-checked by Burn: a config that disagrees with
// the stored weights fails instead of silently mis-loading.

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::history::TrainingHistory;
use crate::ml::model::{DigitCnn, DigitCnnConfig};

const WEIGHTS_STEM:  &str = "model";
const WEIGHTS_FILE:  &str = "model.mpk.gz";
const MODEL_CONFIG:  &str = "model_config.json";
const TRAIN_CONFIG:  &str = "train_config.json";
const HISTORY_FILE:  &str = "history.json";

pub const HISTORY_PLOT:  &str = "history.svg";
pub const MISCLASSIFIED: &str = "misclassified.png";

/// Saves and loads named models under a root directory.
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every artifact of model `name`
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of an artifact file inside the model's directory
    pub fn artifact(&self, name: &str, file: &str) -> PathBuf {
        self.model_dir(name).join(file)
    }

    /// True once weights for `name` have been saved
    pub fn exists(&self, name: &str) -> bool {
        self.artifact(name, WEIGHTS_FILE).is_file()
    }

    /// Create the model directory (like `mkdir -p`) and return it.
    pub fn ensure_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.model_dir(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(dir)
    }

    /// Save the topology and trained weights of model `name`.
    /// Returns the weights file path.
    pub fn save_model<B: Backend>(
        &self,
        name:   &str,
        config: &DigitCnnConfig,
        model:  &DigitCnn<B>,
    ) -> Result<PathBuf> {
        let dir = self.ensure_dir(name)?;
        write_json(&dir.join(MODEL_CONFIG), config)?;

        // The recorder appends its own `.mpk.gz` extension
        let path = dir.join(WEIGHTS_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        tracing::debug!("Saved model '{}' to '{}'", name, dir.display());
        Ok(dir.join(WEIGHTS_FILE))
    }

    /// Rebuild model `name` from its stored topology and load its weights.
    pub fn load_model<B: Backend>(
        &self,
        name:   &str,
        device: &B::Device,
    ) -> Result<(DigitCnnConfig, DigitCnn<B>)> {
        if !self.exists(name) {
            bail!(
                "Model '{}' not found in '{}'. Have you run 'train {}' first?",
                name,
                self.root.display(),
                name
            );
        }

        let config: DigitCnnConfig = read_json(&self.artifact(name, MODEL_CONFIG))?;

        let path   = self.model_dir(name).join(WEIGHTS_STEM);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model weights '{}'", path.display()))?;

        let model = config.init::<B>(device).load_record(record);
        tracing::info!("Loaded model '{}' ({} params)", name, model.num_params());
        Ok((config, model))
    }

    pub fn save_train_config(&self, name: &str, cfg: &TrainConfig) -> Result<()> {
        let dir = self.ensure_dir(name)?;
        write_json(&dir.join(TRAIN_CONFIG), cfg)
    }

    pub fn save_history(&self, name: &str, history: &TrainingHistory) -> Result<()> {
        let dir = self.ensure_dir(name)?;
        write_json(&dir.join(HISTORY_FILE), history)
    }

    pub fn load_history(&self, name: &str) -> Result<TrainingHistory> {
        read_json(&self.artifact(name, HISTORY_FILE))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use crate::domain::history::{EpochMetrics, Metric};
    use crate::infra::render::render_history;
    use crate::domain::image::{ChannelOrder, InputShape};

    type TestBackend = NdArray;

    fn small_config() -> DigitCnnConfig {
        let shape = InputShape { channels: 1, rows: 10, cols: 10, order: ChannelOrder::First };
        DigitCnnConfig::from_input_shape(&shape, 10).with_filters(4).with_feature_size(8)
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let dir    = tempfile::tempdir().unwrap();
        let store  = ModelStore::new(dir.path());
        let device = NdArrayDevice::Cpu;

        let config = small_config();
        let model: DigitCnn<TestBackend> = config.init(&device);
        let path = store.save_model("mnist", &config, &model).unwrap();
        assert!(path.is_file());
        assert!(store.exists("mnist"));

        let (loaded_cfg, loaded) = store.load_model::<TestBackend>("mnist", &device).unwrap();
        assert_eq!(loaded_cfg.flattened_size(), config.flattened_size());

        let images = Tensor::<TestBackend, 4>::ones([2, 1, 10, 10], &device) * 0.3;
        let before = model.forward_probabilities(images.clone()).into_data().to_vec::<f32>().unwrap();
        let after  = loaded.forward_probabilities(images).into_data().to_vec::<f32>().unwrap();
        for (a, b) in before.iter().zip(&after) {
            // half-precision storage
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_missing_model_names_the_model() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        let err = store.load_model::<TestBackend>("ghost", &NdArrayDevice::Cpu).unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert!(!store.exists("ghost"));
    }

    #[test]
    fn test_history_and_train_config_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        let mut history = TrainingHistory::new();
        history.record(&EpochMetrics { epoch: 1, loss: 0.4, accuracy: 0.9, val_loss: 0.2, val_accuracy: 0.95 });
        store.save_history("mnist", &history).unwrap();
        assert_eq!(store.load_history("mnist").unwrap(), history);

        let cfg = TrainConfig { epochs: 3, ..TrainConfig::default() };
        store.save_train_config("mnist", &cfg).unwrap();
        let saved: TrainConfig = read_json(&store.artifact("mnist", TRAIN_CONFIG)).unwrap();
        assert_eq!(saved.epochs, 3);
    }

    #[test]
    fn test_diverged_history_reloads_and_renders() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        let mut history = TrainingHistory::new();
        history.record(&EpochMetrics { epoch: 1, loss: 2.3, accuracy: 0.1, val_loss: 2.3, val_accuracy: 0.1 });
        history.record(&EpochMetrics { epoch: 2, loss: f64::NAN, accuracy: 0.1, val_loss: f64::NAN, val_accuracy: 0.1 });
        store.save_history("diverged", &history).unwrap();

        let loaded = store.load_history("diverged").unwrap();
        assert_eq!(loaded.epochs(), 2);
        assert!(loaded.get(Metric::Loss)[1].is_nan());

        let svg = store.artifact("diverged", HISTORY_PLOT);
        render_history(&loaded, &svg).unwrap();
        assert!(svg.is_file());
    }
}
