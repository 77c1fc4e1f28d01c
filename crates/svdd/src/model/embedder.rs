use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::TensorData;

/// A differentiable feature map from flattened samples to representations.
///
/// Training and scoring only see this trait, so any burn module that
/// implements it can replace [`MlpEmbedder`]. Gradient steps are applied by
/// the training loop through a burn optimizer on the `AutodiffModule`.
pub trait Embedder<B: Backend>: Module<B> {
    /// Map `(batch, input_dim)` to `(batch, output_dim)`.
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Flattened length of one input sample.
    fn input_dim(&self) -> usize;

    /// Representation dimension `d`.
    fn output_dim(&self) -> usize;
}

/// Configuration for the default MLP embedder.
///
/// ```text
/// (batch, d_input)
///   → Linear(d_input→d_hidden, no bias) → LeakyReLU
///   → Linear(d_hidden→d_hidden/2, no bias) → LeakyReLU
///   → Linear(d_hidden/2→representation_dim, no bias)
///   → representation: (batch, representation_dim)
/// ```
///
/// All layers are bias-free: a bias in the last layer would let the network
/// map every input to the center with zero weights.
#[derive(Config, Debug)]
pub struct MlpEmbedderConfig {
    /// Flattened input length (e.g. 32 * 32 * 3).
    pub d_input: usize,
    /// First hidden layer width.
    #[config(default = 128)]
    pub d_hidden: usize,
    /// Output representation dimension.
    #[config(default = 32)]
    pub representation_dim: usize,
    /// Negative slope of the LeakyReLU activations.
    #[config(default = 0.01)]
    pub negative_slope: f64,
}

/// Bias-free MLP embedder.
#[derive(Module, Debug)]
pub struct MlpEmbedder<B: Backend> {
    linear1: Linear<B>,
    linear2: Linear<B>,
    linear3: Linear<B>,
    negative_slope: f64,
}

impl MlpEmbedderConfig {
    /// Initialize an MlpEmbedder with the given configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpEmbedder<B> {
        let d_hidden2 = (self.d_hidden / 2).max(1);
        MlpEmbedder {
            linear1: LinearConfig::new(self.d_input, self.d_hidden)
                .with_bias(false)
                .init(device),
            linear2: LinearConfig::new(self.d_hidden, d_hidden2)
                .with_bias(false)
                .init(device),
            linear3: LinearConfig::new(d_hidden2, self.representation_dim)
                .with_bias(false)
                .init(device),
            negative_slope: self.negative_slope,
        }
    }
}

impl<B: Backend> Embedder<B> for MlpEmbedder<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear1.forward(input);
        let x = burn::tensor::activation::leaky_relu(x, self.negative_slope);

        let x = self.linear2.forward(x);
        let x = burn::tensor::activation::leaky_relu(x, self.negative_slope);

        self.linear3.forward(x)
    }

    fn input_dim(&self) -> usize {
        // burn stores Linear weights as (d_input, d_output).
        self.linear1.weight.val().dims()[0]
    }

    fn output_dim(&self) -> usize {
        self.linear3.weight.val().dims()[1]
    }
}

/// Configuration for a single bias-free linear embedder.
#[derive(Config, Debug)]
pub struct LinearEmbedderConfig {
    /// Flattened input length.
    pub d_input: usize,
    /// Output representation dimension.
    pub representation_dim: usize,
}

/// Single bias-free linear map. Useful as a baseline and for checking the
/// estimator against representations known in closed form.
#[derive(Module, Debug)]
pub struct LinearEmbedder<B: Backend> {
    linear: Linear<B>,
}

impl LinearEmbedderConfig {
    /// Initialize a LinearEmbedder with random weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearEmbedder<B> {
        LinearEmbedder {
            linear: LinearConfig::new(self.d_input, self.representation_dim)
                .with_bias(false)
                .init(device),
        }
    }
}

impl<B: Backend> LinearEmbedder<B> {
    /// Build from an explicit `(d_input, d_output)` weight matrix in
    /// row-major order, so `output = input · weights`.
    pub fn from_weights(
        weights: Vec<f32>,
        d_input: usize,
        d_output: usize,
        device: &B::Device,
    ) -> Self {
        let weight =
            Tensor::<B, 2>::from_data(TensorData::new(weights, [d_input, d_output]), device);
        let mut linear = LinearConfig::new(d_input, d_output)
            .with_bias(false)
            .init(device);
        linear.weight = Param::from_tensor(weight);
        Self { linear }
    }

    /// Identity map on `dim` features.
    pub fn identity(dim: usize, device: &B::Device) -> Self {
        let mut weights = vec![0.0_f32; dim * dim];
        for i in 0..dim {
            weights[i * dim + i] = 1.0;
        }
        Self::from_weights(weights, dim, dim, device)
    }
}

impl<B: Backend> Embedder<B> for LinearEmbedder<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }

    fn input_dim(&self) -> usize {
        self.linear.weight.val().dims()[0]
    }

    fn output_dim(&self) -> usize {
        self.linear.weight.val().dims()[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(48).init::<TestBackend>(&device);
        let input =
            Tensor::<TestBackend, 2>::random([8, 48], Distribution::Uniform(0.0, 1.0), &device);
        let output = model.forward(input);
        assert_eq!(output.dims(), [8, 32]);
    }

    #[test]
    fn test_dims_reported() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(12)
            .with_d_hidden(8)
            .with_representation_dim(3)
            .init::<TestBackend>(&device);
        assert_eq!(model.input_dim(), 12);
        assert_eq!(model.output_dim(), 3);
    }

    #[test]
    fn test_no_bias_parameters() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(16)
            .with_d_hidden(8)
            .with_representation_dim(2)
            .init::<TestBackend>(&device);
        // 16*8 + 8*4 + 4*2, no bias terms
        assert_eq!(model.num_params(), 128 + 32 + 8);
    }

    #[test]
    fn test_zero_input_maps_to_origin() {
        let device = Default::default();
        let model = MlpEmbedderConfig::new(6)
            .with_d_hidden(4)
            .with_representation_dim(2)
            .init::<TestBackend>(&device);
        let out = model.forward(Tensor::zeros([1, 6], &device));
        let sum: f32 = out.abs().sum().into_scalar().elem();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn test_gradient_flows_through_all_layers() {
        use burn::optim::GradientsParams;

        let device = Default::default();
        let model = MlpEmbedderConfig::new(16)
            .with_d_hidden(8)
            .with_representation_dim(4)
            .init::<TestAutodiffBackend>(&device);

        let input = Tensor::<TestAutodiffBackend, 2>::random(
            [4, 16],
            Distribution::Uniform(0.1, 1.0),
            &device,
        );
        let loss = model.forward(input).powf_scalar(2.0).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);

        for (name, id) in [
            ("linear1", model.linear1.weight.id),
            ("linear2", model.linear2.weight.id),
            ("linear3", model.linear3.weight.id),
        ] {
            let grad = grads
                .get::<NdArray<f32>, 2>(id)
                .unwrap_or_else(|| panic!("{name} weight should have gradient"));
            let grad_sum: f32 = grad.abs().sum().into_scalar().elem();
            assert!(grad_sum > 0.0, "{name} gradient is zero");
        }
    }

    #[test]
    fn test_identity_linear_embedder() {
        let device = Default::default();
        let model = LinearEmbedder::<TestBackend>::identity(3, &device);
        assert_eq!(model.input_dim(), 3);
        assert_eq!(model.output_dim(), 3);

        let input = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[1.0_f32, -2.0, 3.5], [0.0, 0.25, -1.0]]),
            &device,
        );
        let out: Vec<f32> = model.forward(input).into_data().to_vec().unwrap();
        assert_eq!(out, vec![1.0, -2.0, 3.5, 0.0, 0.25, -1.0]);
    }

    #[test]
    fn test_linear_embedder_projection() {
        let device = Default::default();
        // 3 inputs → 2 outputs: out = [x0 + x1, 2 * x2]
        let model = LinearEmbedder::<TestBackend>::from_weights(
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 2.0],
            3,
            2,
            &device,
        );
        let input =
            Tensor::<TestBackend, 2>::from_data(TensorData::from([[1.0_f32, 2.0, 3.0]]), &device);
        let out: Vec<f32> = model.forward(input).into_data().to_vec().unwrap();
        assert_eq!(out, vec![3.0, 6.0]);
    }
}
