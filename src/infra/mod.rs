// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several use cases:
//
//   model_store.rs — Saving and loading named models
//                    Uses Burn's CompactRecorder for weights,
//                    JSON for the topology, run config and
//                    training history.
//
//   metrics.rs     — Per-epoch metrics CSV
//
//   render.rs      — PNG digit grids and SVG training curves

/// Named model persistence
pub mod model_store;

/// Training metrics CSV logger
pub mod metrics;

/// Digit grids and training curves
pub mod render;
