// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands:
//
//   train <name>      — train a CNN and save it under <name>
//   test <name>       — test-set accuracy of a saved model
//   visualise <name>  — grid of misclassified test digits
//                       (or, with --history, the training curves)
//   samples           — grid of the first training digits

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::augment::AugmentConfig;
use crate::domain::labels::NUM_CLASSES;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a digit classifier and save it under a name
    Train(TrainArgs),

    /// Report test-set accuracy of a saved model
    Test(ModelArgs),

    /// Render misclassified test digits or the training curves
    Visualise(VisualiseArgs),

    /// Render the first 16 training digits with their labels
    Samples(SamplesArgs),
}

/// Where the MNIST files come from.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding the four MNIST IDX files.
    /// Downloads MNIST through Burn when omitted.
    #[arg(long)]
    pub data_dir: Option<String>,
}

/// Arguments shared by every command that works on a saved model.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Name the model was saved under
    pub name: String,

    /// Root directory of saved models
    #[arg(long, default_value = "models")]
    pub model_dir: String,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct VisualiseArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Re-render the stored training curves instead
    #[arg(long)]
    pub history: bool,
}

#[derive(Args, Debug)]
pub struct SamplesArgs {
    /// Output PNG path
    #[arg(long, default_value = "samples.png")]
    pub output: String,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Samples per gradient step
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 12)]
    pub epochs: usize,

    /// Adam step size
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Adam decay of the first moment estimate
    #[arg(long, default_value_t = 0.9)]
    pub beta_1: f64,

    /// Adam decay of the second moment estimate
    #[arg(long, default_value_t = 0.999)]
    pub beta_2: f64,

    #[arg(long, default_value_t = 1e-7)]
    pub epsilon: f64,

    /// Share of the training pool held out for validation, in [0.05, 0.3]
    #[arg(long, default_value_t = 0.2)]
    pub validation_fraction: f64,

    /// Train on only the leading share of the training pool
    #[arg(long, default_value_t = 1.0)]
    pub fraction_of_data: f64,

    /// Seeds the split, batch order, augmentation and weight init
    #[arg(long, default_value_t = 2)]
    pub seed: u64,

    /// Filters in the first convolution (the second has twice as many)
    #[arg(long, default_value_t = 16)]
    pub filters: usize,

    /// Width of the hidden dense layer
    #[arg(long, default_value_t = 16)]
    pub feature_size: usize,

    #[arg(long, default_value_t = 0.25)]
    pub dropout: f64,

    /// Random rotation range in degrees (0 to 180)
    #[arg(long, default_value_t = 0.0)]
    pub rotation_range: f32,

    /// Random zoom range, scale drawn from [1 - z, 1 + z]
    #[arg(long, default_value_t = 0.0)]
    pub zoom_range: f32,

    /// Random horizontal shift as a fraction of width
    #[arg(long, default_value_t = 0.0)]
    pub width_shift_range: f32,

    /// Random vertical shift as a fraction of height
    #[arg(long, default_value_t = 0.0)]
    pub height_shift_range: f32,

    /// Randomly mirror images left/right
    #[arg(long)]
    pub horizontal_flip: bool,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            name:                a.model.name,
            model_dir:           a.model.model_dir,
            data_dir:            a.model.data.data_dir,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            learning_rate:       a.learning_rate,
            beta_1:              a.beta_1,
            beta_2:              a.beta_2,
            epsilon:             a.epsilon,
            validation_fraction: a.validation_fraction,
            fraction_of_data:    a.fraction_of_data,
            seed:                a.seed,
            num_classes:         NUM_CLASSES,
            filters:             a.filters,
            feature_size:        a.feature_size,
            dropout:             a.dropout,
            augmentation: AugmentConfig {
                rotation_range:     a.rotation_range,
                zoom_range:         a.zoom_range,
                width_shift_range:  a.width_shift_range,
                height_shift_range: a.height_shift_range,
                horizontal_flip:    a.horizontal_flip,
            },
        }
    }
}
