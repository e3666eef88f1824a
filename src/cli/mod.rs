// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes each subcommand to its
// use case in Layer 2. Nothing is computed here.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ModelArgs, SamplesArgs, TrainArgs, VisualiseArgs};

#[derive(Parser, Debug)]
#[command(
    name = "digit-cnn",
    version,
    about = "Train, test and inspect a small CNN on handwritten MNIST digits."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Test(args)      => run_test(args),
            Commands::Visualise(args) => run_visualise(args),
            Commands::Samples(args)   => run_samples(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training model '{}'", args.model.name);
    let history = TrainUseCase::new(args.into()).execute()?;

    if let Some(last) = history.last() {
        println!(
            "Final epoch: accuracy {:.4}, val_accuracy {:.4}",
            last.accuracy, last.val_accuracy
        );
    }
    Ok(())
}

fn run_test(args: ModelArgs) -> Result<()> {
    use crate::application::test_use_case::TestUseCase;

    TestUseCase::new(&args.model_dir, &args.name, args.data.data_dir).execute()?;
    Ok(())
}

fn run_visualise(args: VisualiseArgs) -> Result<()> {
    use crate::application::visualise_use_case::VisualiseUseCase;

    let m = args.model;
    let use_case = VisualiseUseCase::new(&m.model_dir, &m.name, m.data.data_dir);
    if args.history {
        use_case.history()?;
    } else {
        use_case.misclassified()?;
    }
    Ok(())
}

fn run_samples(args: SamplesArgs) -> Result<()> {
    use crate::application::visualise_use_case::SamplesUseCase;

    SamplesUseCase::new(args.data.data_dir, args.output).execute()?;
    Ok(())
}
