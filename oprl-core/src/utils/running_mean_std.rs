use candle_core::Device;
use candle_core::Result;
use candle_core::Shape;
use candle_core::Tensor;
use candle_core::shape::Dim;

pub struct RunningMeanStd {
    pub mean: Tensor,
    pub var: Tensor,
    pub count: f32,
    pub device: Device,
}

pub fn biased_var<D: Dim>(t: &Tensor, dim: D) -> Result<Tensor> {
    let dim = dim.to_index(t.shape(), "var")?;
    let mean = t.mean_keepdim(dim)?;
    let squares = t.broadcast_sub(&mean)?.sqr()?;
    (squares.sum_keepdim(dim)? / t.dim(dim)? as f64)?.squeeze(dim)
}

impl RunningMeanStd {
    pub fn new<S: Into<Shape> + Copy>(shape: S, device: Device) -> Self {
        let mean = Tensor::zeros(shape, candle_core::DType::F32, &device).unwrap();
        let var = Tensor::zeros(shape, candle_core::DType::F32, &device).unwrap();
        Self {
            mean,
            var,
            count: 0.,
            device,
        }
    }

    pub fn update(&mut self, arr: &Tensor) -> Result<()> {
        let batch_mean = arr.mean(0)?;
        let batch_var = biased_var(arr, 0)?;
        let batch_count = arr.shape().dim(0)? as f32;
        self.update_from_moments(batch_mean, batch_var, batch_count)?;
        Ok(())
    }

    /// Standard deviation with a numerical floor, so normalization never divides by zero.
    pub fn std(&self, eps: f32) -> Result<Tensor> {
        (self.var.clone() + eps as f64)?.sqrt()
    }

    // implements Welford's algorithm
    fn update_from_moments(
        &mut self,
        batch_mean: Tensor,
        batch_var: Tensor,
        batch_count: f32,
    ) -> Result<()> {
        let delta = batch_mean.sub(&self.mean)?;
        let tot_count = self.count + batch_count;
        self.mean = self.mean.add(
            &(delta.broadcast_mul(&Tensor::full(batch_count / tot_count, (), &self.device)?)?),
        )?;
        let m_a = self
            .var
            .broadcast_mul(&Tensor::full(self.count, (), self.var.device())?)?;
        let m_b = batch_var.broadcast_mul(&Tensor::full(batch_count, (), self.var.device())?)?;
        let m_2 = m_a
            .add(&m_b)?
            .add(&delta.sqr()?.broadcast_mul(&Tensor::full(
                self.count * batch_count / (self.count + batch_count),
                (),
                &self.device,
            )?)?)?;
        self.var = m_2.broadcast_mul(&Tensor::full(
            1. / (self.count + batch_count),
            (),
            &self.device,
        )?)?;
        self.count = batch_count + self.count;
        Ok(())
    }
}
