// ============================================================
// Layer 3 — Training History
// ============================================================
// One training run produces one TrainingHistory: a mapping
// from metric name to its per-epoch values, in epoch order.
//
//   accuracy      [0.81, 0.93, 0.95, ...]
//   val_accuracy  [0.90, 0.94, 0.96, ...]
//   loss          [0.62, 0.24, 0.17, ...]
//   val_loss      [0.33, 0.20, 0.14, ...]
//
// The trainer is the only writer. Everyone else gets a
// shared reference and reads the series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    ValAccuracy,
    Loss,
    ValLoss,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Accuracy,
        Metric::ValAccuracy,
        Metric::Loss,
        Metric::ValLoss,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy    => "accuracy",
            Metric::ValAccuracy => "val_accuracy",
            Metric::Loss        => "loss",
            Metric::ValLoss     => "val_loss",
        }
    }
}

/// Metrics for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean categorical cross-entropy over the training batches
    pub loss: f64,

    /// Fraction of training examples classified correctly
    pub accuracy: f64,

    /// Mean categorical cross-entropy on the validation partition
    pub val_loss: f64,

    /// Fraction of validation examples classified correctly
    pub val_accuracy: f64,
}

impl EpochMetrics {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy    => self.accuracy,
            Metric::ValAccuracy => self.val_accuracy,
            Metric::Loss        => self.loss,
            Metric::ValLoss     => self.val_loss,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    #[serde(with = "non_finite_as_null")]
    values: BTreeMap<Metric, Vec<f64>>,
}

// JSON has no NaN or infinity. A diverged epoch is written as
// null and read back as NaN, so the history still loads.
mod non_finite_as_null {
    use super::Metric;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        values: &BTreeMap<Metric, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let stored: BTreeMap<&Metric, Vec<Option<f64>>> = values
            .iter()
            .map(|(m, v)| (m, v.iter().map(|x| x.is_finite().then_some(*x)).collect()))
            .collect();
        stored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Metric, Vec<f64>>, D::Error> {
        let stored = BTreeMap::<Metric, Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(stored
            .into_iter()
            .map(|(m, v)| (m, v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
            .collect())
    }
}

impl TrainingHistory {
    pub fn new() -> Self {
        let values = Metric::ALL.iter().map(|&m| (m, Vec::new())).collect();
        Self { values }
    }

    /// Append one epoch to every series.
    pub(crate) fn record(&mut self, m: &EpochMetrics) {
        for metric in Metric::ALL {
            self.values.entry(metric).or_default().push(m.value(metric));
        }
    }

    /// Per-epoch values of `metric`, oldest first.
    pub fn get(&self, metric: Metric) -> &[f64] {
        self.values.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn epochs(&self) -> usize {
        self.get(Metric::Loss).len()
    }

    /// Metrics of the most recent epoch, if any epoch was recorded.
    pub fn last(&self) -> Option<EpochMetrics> {
        let n = self.epochs();
        if n == 0 {
            return None;
        }
        let at = |m: Metric| self.get(m).get(n - 1).copied().unwrap_or(f64::NAN);
        Some(EpochMetrics {
            epoch:        n,
            loss:         at(Metric::Loss),
            accuracy:     at(Metric::Accuracy),
            val_loss:     at(Metric::ValLoss),
            val_accuracy: at(Metric::ValAccuracy),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, loss: f64) -> EpochMetrics {
        EpochMetrics { epoch, loss, accuracy: 0.5, val_loss: loss + 0.1, val_accuracy: 0.4 }
    }

    #[test]
    fn test_series_grow_in_epoch_order() {
        let mut h = TrainingHistory::new();
        h.record(&epoch(1, 2.0));
        h.record(&epoch(2, 1.0));

        assert_eq!(h.epochs(), 2);
        assert_eq!(h.get(Metric::Loss), &[2.0, 1.0]);
        assert_eq!(h.get(Metric::ValLoss), &[2.1, 1.1]);
        assert_eq!(h.last().unwrap().epoch, 2);
    }

    #[test]
    fn test_empty_history_has_all_keys() {
        let h = TrainingHistory::new();
        for m in Metric::ALL {
            assert!(h.get(m).is_empty());
        }
        assert!(h.last().is_none());
    }

    #[test]
    fn test_json_uses_metric_names() {
        let mut h = TrainingHistory::new();
        h.record(&epoch(1, 0.3));
        let json = serde_json::to_string(&h).unwrap();
        for m in Metric::ALL {
            assert!(json.contains(&format!("\"{}\"", m.name())), "{json}");
        }
        let back: TrainingHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_diverged_epoch_survives_json() {
        let mut h = TrainingHistory::new();
        h.record(&epoch(1, 0.7));
        h.record(&epoch(2, f64::NAN));
        h.record(&epoch(3, f64::INFINITY));

        let json = serde_json::to_string(&h).unwrap();
        assert!(json.contains("null"), "{json}");

        let back: TrainingHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.epochs(), 3);
        let loss = back.get(Metric::Loss);
        assert_eq!(loss[0], 0.7);
        assert!(loss[1].is_nan() && loss[2].is_nan());
        assert_eq!(back.get(Metric::Accuracy), &[0.5, 0.5, 0.5]);
    }
}
