/// Multi-Layer Perceptron (MLP) - feedforward network used for both the actor and the critic
///
/// The actor is an MLP with one output per action (logits, softmax applied by the agent),
/// the critic is an MLP with a single output (the state value).

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};

/// Configuration for Multi-Layer Perceptron
///
/// Saved next to the weights in a checkpoint so the architecture can be rebuilt.
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [64, 64] for two hidden layers of 64 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
    /// Use ReLU activation for hidden layers, tanh otherwise (default: true)
    #[config(default = "true")]
    pub use_relu: bool,
}

/// Multi-Layer Perceptron implementation
///
/// Hidden layers use ReLU activation by default
/// Output layer has no activation (linear)
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    use_relu: bool,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let mut hidden = Vec::with_capacity(self.hidden_layers.len());
        let mut fan_in = self.input_dim;

        for &width in &self.hidden_layers {
            hidden.push(LinearConfig::new(fan_in, width).init(device));
            fan_in = width;
        }

        MLP {
            hidden,
            output: LinearConfig::new(fan_in, self.output_dim).init(device),
            use_relu: self.use_relu,
        }
    }
}

impl<B: Backend> MLP<B> {
    /// Generic forward pass - works with any tensor dimension
    ///
    /// - D=1: Single example `[features]`
    /// - D=2: Batch processing `[batch, features]` (what the agent uses)
    ///
    /// The last dimension is always treated as the feature dimension.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;

        for layer in &self.hidden {
            x = layer.forward(x);
            x = if self.use_relu { relu(x) } else { x.tanh() };
        }

        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_mlp_forward_1d() {
        let device = NdArrayDevice::default();

        // Lander actor shape: 8 → [64, 64] → 4
        let config = MLPConfig::new(8, vec![64, 64], 4);
        let mlp = config.init::<NdArray>(&device);

        let input = Tensor::<NdArray, 1>::random(
            [8],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );

        let output: Tensor<NdArray, 1> = mlp.forward(input);

        assert_eq!(output.shape().dims, [4]);
    }

    #[test]
    fn test_mlp_forward_2d() {
        let device = NdArrayDevice::default();

        // Critic shape: 8 → [64, 64] → 1
        let config = MLPConfig::new(8, vec![64, 64], 1);
        let mlp = config.init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random(
            [16, 8],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );

        let output: Tensor<NdArray, 2> = mlp.forward(input);

        assert_eq!(output.shape().dims, [16, 1]);
        assert_eq!(mlp.hidden.len(), 2);
    }

    #[test]
    fn test_mlp_no_hidden_layers() {
        let device = NdArrayDevice::default();

        // Direct connection: 8 → 4
        let config = MLPConfig::new(8, vec![], 4);
        let mlp = config.init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random([1, 8], burn::tensor::Distribution::Default, &device);
        let output = mlp.forward(input);

        assert_eq!(output.shape().dims, [1, 4]);
        assert!(mlp.hidden.is_empty());
    }

    #[test]
    fn test_mlp_tanh_hidden_layers() {
        let device = NdArrayDevice::default();

        let config = MLPConfig::new(8, vec![32], 1).with_use_relu(false);
        let mlp = config.init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random([3, 8], burn::tensor::Distribution::Default, &device);
        let output: Tensor<NdArray, 2> = mlp.forward(input);

        assert_eq!(output.shape().dims, [3, 1]);
    }
}
