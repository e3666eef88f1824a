// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing the experiment:
// digit images, labels, training history, and the two
// abstractions the rest of the pipeline is written against
// (a source of labelled digits and a trained classifier).
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// Raw and normalised image batches, channel order, input shape
pub mod image;

// Class ids and one-hot encoding
pub mod labels;

// Per-epoch metrics and the training history record
pub mod history;

// Core abstractions (traits) that other layers implement
pub mod traits;
