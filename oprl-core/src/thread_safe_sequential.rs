use candle_core::{Result, Tensor};
use candle_nn::{Activation, Module, Sequential, VarBuilder, linear, seq};
use derive_more::Deref;

#[derive(Deref)]
pub struct ThreadSafeSequential(pub Sequential);

// SAFETY: ThreadSafeSequential will only contain Linear and Relu layers, both of which are Sync.
unsafe impl Sync for ThreadSafeSequential {}

impl ThreadSafeSequential {
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        self.0.forward(input)
    }
}

pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<ThreadSafeSequential> {
    let mut last_dim = input_dim;
    let mut nn = seq();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        if layer_idx == num_layers - 1 {
            nn = nn.add(linear(last_dim, *layer_size, vb.pp(layer_pp))?)
        } else {
            nn = nn
                .add(linear(last_dim, *layer_size, vb.pp(layer_pp))?)
                .add(Activation::Relu);
        }
        last_dim = *layer_size;
    }
    Ok(ThreadSafeSequential(nn))
}
