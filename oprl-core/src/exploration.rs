use candle_core::{Result, Shape, Tensor};

/// Additive gaussian action noise used while collecting experience.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNoise {
    pub mu: f32,
    pub sigma: f32,
}

impl GaussianNoise {
    pub fn new(sigma: f32) -> Self {
        Self { mu: 0., sigma }
    }

    pub fn sample<S: Into<Shape>>(&self, shape: S, device: &candle_core::Device) -> Result<Tensor> {
        Tensor::randn(self.mu, self.sigma, shape, device)
    }
}
