// ============================================================
// Layer 5 — Digit CNN (model factory)
// ============================================================
// Fixed topology, channel-first input [batch, C, 28, 28]:
//
//   Conv2d  C → F,   3x3, ReLU      [batch, F,  26, 26]
//   Conv2d  F → 2F,  3x3, ReLU      [batch, 2F, 24, 24]
//   MaxPool 2x2, stride 2           [batch, 2F, 12, 12]
//   Flatten                         [batch, 2F * 144]
//   Linear  → feature_size, ReLU    [batch, feature_size]
//   Dropout 0.25 (training only)
//   Linear  → num_classes           [batch, num_classes]
//   Softmax (applied at inference; training works on logits)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::domain::image::InputShape;

const KERNEL: usize = 3;
const POOL:   usize = 2;

// Config derives Clone + serde itself; saved as model_config.json.
#[derive(Config, Debug)]
pub struct DigitCnnConfig {
    pub channels:    usize,
    pub rows:        usize,
    pub cols:        usize,
    pub num_classes: usize,
    #[config(default = 16)]
    pub filters:      usize,
    #[config(default = 16)]
    pub feature_size: usize,
    #[config(default = 0.25)]
    pub dropout:      f64,
}

impl DigitCnnConfig {
    pub fn from_input_shape(shape: &InputShape, num_classes: usize) -> Self {
        Self::new(shape.channels, shape.rows, shape.cols, num_classes)
    }

    /// Spatial size after both valid 3x3 convolutions and the pool
    pub fn pooled_dims(&self) -> [usize; 2] {
        let shrink = 2 * (KERNEL - 1);
        [(self.rows - shrink) / POOL, (self.cols - shrink) / POOL]
    }

    /// Width of the flattened feature map fed to the first dense layer
    pub fn flattened_size(&self) -> usize {
        let [h, w] = self.pooled_dims();
        2 * self.filters * h * w
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitCnn<B> {
        assert!(
            self.rows >= 2 * (KERNEL - 1) + POOL && self.cols >= 2 * (KERNEL - 1) + POOL,
            "input {}x{} is too small for two 3x3 convolutions and a 2x2 pool",
            self.rows,
            self.cols
        );

        let conv1 = Conv2dConfig::new([self.channels, self.filters], [KERNEL, KERNEL]).init(device);
        let conv2 = Conv2dConfig::new([self.filters, 2 * self.filters], [KERNEL, KERNEL]).init(device);
        let pool  = MaxPool2dConfig::new([POOL, POOL]).with_strides([POOL, POOL]).init();
        let fc1   = LinearConfig::new(self.flattened_size(), self.feature_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        let fc2   = LinearConfig::new(self.feature_size, self.num_classes).init(device);

        DigitCnn { conv1, conv2, pool, fc1, dropout, fc2 }
    }

    /// Trainable parameters per layer, in forward order
    pub fn layer_params(&self) -> Vec<(&'static str, usize)> {
        let k  = KERNEL * KERNEL;
        let f  = self.filters;
        vec![
            ("conv2d_1", self.channels * f * k + f),
            ("conv2d_2", f * 2 * f * k + 2 * f),
            ("max_pool", 0),
            ("flatten",  0),
            ("dense_1",  self.flattened_size() * self.feature_size + self.feature_size),
            ("dropout",  0),
            ("dense_2",  self.feature_size * self.num_classes + self.num_classes),
        ]
    }

    /// Human-readable layer table with output shapes and parameter counts.
    pub fn summary(&self) -> String {
        let [h1, w1] = [self.rows - (KERNEL - 1), self.cols - (KERNEL - 1)];
        let [h2, w2] = [h1 - (KERNEL - 1), w1 - (KERNEL - 1)];
        let [hp, wp] = self.pooled_dims();
        let shapes = [
            format!("[{}, {h1}, {w1}]", self.filters),
            format!("[{}, {h2}, {w2}]", 2 * self.filters),
            format!("[{}, {hp}, {wp}]", 2 * self.filters),
            format!("[{}]", self.flattened_size()),
            format!("[{}]", self.feature_size),
            format!("[{}]", self.feature_size),
            format!("[{}]", self.num_classes),
        ];

        let mut out = format!("{:<10} {:<16} {:>8}\n", "layer", "output", "params");
        let mut total = 0;
        for ((name, params), shape) in self.layer_params().into_iter().zip(shapes) {
            out.push_str(&format!("{name:<10} {shape:<16} {params:>8}\n"));
            total += params;
        }
        out.push_str(&format!("total trainable params: {total}"));
        out
    }
}

#[derive(Module, Debug)]
pub struct DigitCnn<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub fc1:     Linear<B>,
    pub dropout: Dropout,
    pub fc2:     Linear<B>,
}

impl<B: Backend> DigitCnn<B> {
    /// images: [batch, C, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = activation::relu(self.conv1.forward(images));
        let x = activation::relu(self.conv2.forward(x));
        let x = self.pool.forward(x);
        let x = x.flatten::<2>(1, 3);
        let x = activation::relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Softmax class probabilities, each row sums to 1
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        activation::softmax(self.forward(images), 1)
    }

    /// Mean categorical cross-entropy against one-hot targets.
    /// Returns (loss, logits).
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss   = categorical_cross_entropy(logits.clone(), targets);
        (loss, logits)
    }
}

/// -mean_i sum_c target[i, c] * log_softmax(logits)[i, c]
pub fn categorical_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = activation::log_softmax(logits, 1);
    (log_probs * targets).sum_dim(1).mean().neg()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use crate::domain::image::ChannelOrder;

    type TestBackend = NdArray;

    fn mnist_config() -> DigitCnnConfig {
        let shape = InputShape { channels: 1, rows: 28, cols: 28, order: ChannelOrder::First };
        DigitCnnConfig::from_input_shape(&shape, 10)
    }

    #[test]
    fn test_default_hyperparameters() {
        let cfg = mnist_config();
        assert_eq!((cfg.filters, cfg.feature_size), (16, 16));
        assert_eq!(cfg.dropout, 0.25);
        assert_eq!(cfg.pooled_dims(), [12, 12]);
        assert_eq!(cfg.flattened_size(), 32 * 12 * 12);
    }

    #[test]
    fn test_forward_shapes() {
        let device = NdArrayDevice::Cpu;
        let model: DigitCnn<TestBackend> = mnist_config().init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([3, 1, 28, 28], &device);
        assert_eq!(model.forward(images).dims(), [3, 10]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = NdArrayDevice::Cpu;
        let model: DigitCnn<TestBackend> = mnist_config().init(&device);

        let images = Tensor::<TestBackend, 4>::ones([2, 1, 28, 28], &device) * 0.5;
        let probs  = model.forward_probabilities(images).into_data().to_vec::<f32>().unwrap();
        for row in probs.chunks(10) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
        }
    }

    #[test]
    fn test_param_count_matches_summary() {
        let device = NdArrayDevice::Cpu;
        let cfg    = mnist_config();
        let model: DigitCnn<TestBackend> = cfg.init(&device);

        let expected: usize = cfg.layer_params().iter().map(|(_, p)| p).sum();
        assert_eq!(model.num_params(), expected);
        assert!(cfg.summary().contains(&format!("total trainable params: {expected}")));
    }

    #[test]
    fn test_cross_entropy_of_uniform_logits_is_ln_classes() {
        let device  = NdArrayDevice::Cpu;
        let logits  = Tensor::<TestBackend, 2>::zeros([4, 10], &device);
        let targets = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(
                (0..40).map(|i| if i % 11 == 0 { 1.0f32 } else { 0.0 }).collect::<Vec<_>>(),
                [4, 10],
            ),
            &device,
        );

        let loss: f32 = categorical_cross_entropy(logits, targets).into_scalar().elem();
        assert!((loss - 10f32.ln()).abs() < 1e-5, "loss = {loss}");
    }
}
