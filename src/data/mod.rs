// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the MNIST files to tensor batches:
//
//   IDX files / Burn MNIST cache
//       │
//       ▼
//   MnistLoader       → raw u8 images + class ids
//       │
//       ▼
//   Preprocessor      → (N, 1, 28, 28) f32 in [0, 1]
//       │
//       ▼
//   Splitter          → seeded train / validation partitions
//       │
//       ▼
//   DigitDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher      → augments and stacks tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop

/// Parses the MNIST IDX binary format
pub mod idx;

/// Loads the MNIST train/test split
pub mod loader;

/// Reshapes and normalises raw pixels
pub mod preprocessor;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Random rotation / zoom / shift / flip of training images
pub mod augment;

/// Implements Burn's Dataset trait for digit samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
