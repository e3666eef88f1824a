// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data,
// ml and infra layers together for one CLI command.
//
//   train_use_case     — load, split, train, persist
//   test_use_case      — re-load a model, test-set accuracy
//   visualise_use_case — misclassified digits, training
//                        curves, ground-truth samples

pub mod train_use_case;

pub mod test_use_case;

pub mod visualise_use_case;
