// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the MNIST train/test split   (Layer 4 - data)
//   Step 2: Keep the requested data fraction  (Layer 4 - data)
//   Step 3: Reshape + normalise pixels        (Layer 4 - data)
//   Step 4: Seeded train/validation split     (Layer 4 - data)
//   Step 5: Build the model config            (Layer 5 - ml)
//   Step 6: Save run config, open metrics CSV (Layer 6 - infra)
//   Step 7: Run the training loop             (Layer 5 - ml)
//   Step 8: Save model, history and curves    (Layer 6 - infra)

use anyhow::{bail, Result};
use burn::{module::Module, tensor::backend::AutodiffBackend};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    augment::AugmentConfig,
    loader::MnistLoader,
    preprocessor::Preprocessor,
    splitter::{split_train_val, MAX_VALIDATION_FRACTION, MIN_VALIDATION_FRACTION},
};
use crate::domain::history::TrainingHistory;
use crate::domain::image::InputShape;
use crate::domain::labels::NUM_CLASSES;
use crate::domain::traits::DigitSource;
use crate::infra::{
    metrics::MetricsLogger,
    model_store::{ModelStore, HISTORY_PLOT},
    render::render_history,
};
use crate::ml::{model::DigitCnnConfig, trainer::train_loop, TrainBackend, CHANNEL_ORDER};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a training run. Saved next to the model as
// train_config.json so a run can be inspected or repeated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub name:                String,
    pub model_dir:           String,
    pub data_dir:            Option<String>,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub learning_rate:       f64,
    pub beta_1:              f64,
    pub beta_2:              f64,
    pub epsilon:             f64,
    pub validation_fraction: f64,
    pub fraction_of_data:    f64,
    pub seed:                u64,
    pub num_classes:         usize,
    pub filters:             usize,
    pub feature_size:        usize,
    pub dropout:             f64,
    pub augmentation:        AugmentConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            name:                "mnist_cnn".to_string(),
            model_dir:           "models".to_string(),
            data_dir:            None,
            batch_size:          128,
            epochs:              12,
            learning_rate:       1e-3,
            beta_1:              0.9,
            beta_2:              0.999,
            epsilon:             1e-7,
            validation_fraction: 0.2,
            fraction_of_data:    1.0,
            seed:                2,
            num_classes:         NUM_CLASSES,
            filters:             16,
            feature_size:        16,
            dropout:             0.25,
            augmentation:        AugmentConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Network topology for images of `shape`
    pub fn model_config(&self, shape: &InputShape) -> DigitCnnConfig {
        DigitCnnConfig::from_input_shape(shape, self.num_classes)
            .with_filters(self.filters)
            .with_feature_size(self.feature_size)
            .with_dropout(self.dropout)
    }

    /// Reject settings that would only fail deep inside the run.
    pub fn validate(&self) -> Result<()> {
        if !(self.fraction_of_data > 0.0 && self.fraction_of_data <= 1.0) {
            bail!("fraction of data must be in (0, 1], got {}", self.fraction_of_data);
        }
        if self.batch_size == 0 || self.epochs == 0 {
            bail!("batch size and epochs must be positive");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        self.augmentation.validate()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    source: Box<dyn DigitSource>,
}

impl TrainUseCase {
    /// Train on MNIST, from `config.data_dir` if set, else Burn's download.
    pub fn new(config: TrainConfig) -> Self {
        let source = Box::new(MnistLoader::new(config.data_dir.clone()));
        Self { config, source }
    }

    pub fn with_source(config: TrainConfig, source: Box<dyn DigitSource>) -> Self {
        Self { config, source }
    }

    /// Execute the full pipeline on the default training backend.
    pub fn execute(&self) -> Result<TrainingHistory> {
        self.execute_on::<TrainBackend>(&Default::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainingHistory> {
        let cfg = &self.config;
        cfg.validate()?;
        assert!(
            (MIN_VALIDATION_FRACTION..=MAX_VALIDATION_FRACTION).contains(&cfg.validation_fraction),
            "validation fraction {} must lie in [{MIN_VALIDATION_FRACTION}, {MAX_VALIDATION_FRACTION}]",
            cfg.validation_fraction
        );

        // ── Step 1: Load train/test pools ─────────────────────────────────────
        let mut data = self.source.load()?;

        // ── Step 2: Keep the leading fraction of the training pool ────────────
        if cfg.fraction_of_data < 1.0 {
            println!("Using only {}% of training data", 100.0 * cfg.fraction_of_data);
            let keep = (cfg.fraction_of_data * data.train.len() as f64) as usize;
            data.train.truncate(keep);
        }

        // ── Step 3: Reshape + normalise ───────────────────────────────────────
        let preprocessor = Preprocessor::new(CHANNEL_ORDER);
        let (x_train, x_test, input_shape) = preprocessor.process(&data.train.images, &data.test.images);

        // ── Step 4: Seeded train / validation split ───────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let split   = split_train_val(&x_train, &data.train.labels, cfg.validation_fraction, &mut rng);

        println!("{} train samples", split.x_train.len());
        println!("{} validation samples", split.x_val.len());
        println!("{} test samples", x_test.len());

        // ── Step 5: Model topology ────────────────────────────────────────────
        let model_cfg = cfg.model_config(&input_shape);
        println!("{}", model_cfg.summary());

        // ── Step 6: Persist run config, start metrics CSV ─────────────────────
        let store   = ModelStore::new(&cfg.model_dir);
        store.save_train_config(&cfg.name, cfg)?;
        let metrics = MetricsLogger::new(store.model_dir(&cfg.name))?;

        // ── Step 7: Training loop (Layer 5) ───────────────────────────────────
        let (model, history) = train_loop::<B>(cfg, &model_cfg, split, Some(&metrics), device)?;

        // ── Step 8: Persist model and history ─────────────────────────────────
        println!("Training Done. Saving model as {}", cfg.name);
        let path = store.save_model(&cfg.name, &model_cfg, &model)?;
        tracing::info!(
            "Model weights written to '{}' ({} trainable params)",
            path.display(),
            model.num_params()
        );
        println!("{}", saved_report(&cfg.name, &model_cfg));

        store.save_history(&cfg.name, &history)?;
        render_history(&history, &store.artifact(&cfg.name, HISTORY_PLOT))?;

        Ok(history)
    }
}

/// Printed once the model is on disk: the name it was saved
/// under followed by the layer summary.
fn saved_report(name: &str, model_cfg: &DigitCnnConfig) -> String {
    format!("Saved model '{name}'\n{}", model_cfg.summary())
}
