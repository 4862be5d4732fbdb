pub mod deterministic_policy;

use candle_core::{Result, Tensor, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, VarMap};
use std::fmt::Debug;

pub use deterministic_policy::{Actor, DeterministicPolicy};

/// The acting seam between an agent and the collectors. Off policy agents expose one of these;
/// collectors only ever see this trait.
pub trait Policy: Sync {
    /// Action used while gathering training experience. Exploration noise belongs here.
    fn act(&self, observation: &Tensor) -> Result<Tensor>;

    /// Action used during evaluation rollouts.
    fn act_deterministic(&self, observation: &Tensor) -> Result<Tensor> {
        self.act(observation)
    }
}

fn clip_grad(t: &Tensor, varmap: &VarMap, max_norm: f32) -> Result<GradStore> {
    let mut total_norm_squared = 0.0f32;
    let mut grad_store = t.backward()?;
    let mut var_ids = vec![];
    let all_vars = varmap.all_vars();
    for var in all_vars.iter() {
        let id = var.id();
        if let Some(grad) = grad_store.get_id(id) {
            var_ids.push(id);
            let grad_norm_sq = grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            total_norm_squared += grad_norm_sq;
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = (max_norm) / (total_norm + 1e-6);
        for var_id in var_ids {
            let var = all_vars.iter().find(|t| t.id() == var_id).unwrap();
            let old_grad = grad_store.get_id(var_id).unwrap();
            let clip_coef = Tensor::full(clip_coef, old_grad.shape(), old_grad.device())?;
            let new_grad = old_grad.broadcast_mul(&clip_coef)?;
            grad_store.insert(var.as_tensor(), new_grad);
        }
    }
    Ok(grad_store)
}

pub struct OptimizerWithMaxGrad {
    pub optimizer: AdamW,
    pub max_grad_norm: Option<f32>,
    pub varmap: VarMap,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("optimizer", &self.optimizer)
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(optimizer: AdamW, max_grad_norm: Option<f32>, varmap: VarMap) -> Self {
        Self {
            optimizer,
            max_grad_norm,
            varmap,
        }
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = if let Some(max_norm) = self.max_grad_norm {
            clip_grad(loss, &self.varmap, max_norm)?
        } else {
            loss.backward()?
        };
        self.optimizer.step(&grads)?;
        Ok(())
    }
}

/// Blends the source variables into the target ones: target <- tau * source + (1 - tau) * target.
/// Both maps must have been built from structurally identical networks.
pub fn soft_update(source: &VarMap, target: &VarMap, tau: f64) -> Result<()> {
    let source_data = source.data().lock().unwrap();
    let target_data = target.data().lock().unwrap();
    for (name, source_var) in source_data.iter() {
        let Some(target_var) = target_data.get(name) else {
            candle_core::bail!("soft update: no target variable named {name}")
        };
        let blended =
            ((source_var.as_tensor() * tau)? + (target_var.as_tensor() * (1. - tau))?)?;
        target_var.set(&blended)?;
    }
    Ok(())
}

/// Overwrites the target variables with the source ones. Used once at construction so that
/// the targets start out as exact copies.
pub fn hard_update(source: &VarMap, target: &VarMap) -> Result<()> {
    let source_data = source.data().lock().unwrap();
    let target_data = target.data().lock().unwrap();
    for (name, source_var) in source_data.iter() {
        let Some(target_var) = target_data.get(name) else {
            candle_core::bail!("hard update: no target variable named {name}")
        };
        target_var.set(source_var.as_tensor())?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{Init, ParamsAdamW};

    fn const_varmap(value: f64) -> Result<VarMap> {
        let varmap = VarMap::new();
        varmap.get(4, "w", Init::Const(value), DType::F32, &Device::Cpu)?;
        Ok(varmap)
    }

    #[test]
    fn clipping_caps_the_global_grad_norm() -> Result<()> {
        let varmap = const_varmap(1.)?;
        let w = varmap.all_vars()[0].clone();
        // d(sum(w) * 1000)/dw is 1000 everywhere, a global norm of 2000
        let loss = (w.sum_all()? * 1000.)?;
        let grads = clip_grad(&loss, &varmap, 1.0)?;
        let grad = grads.get_id(w.id()).unwrap();
        let norm = grad.sqr()?.sum_all()?.to_scalar::<f32>()?.sqrt();
        assert!((norm - 1.0).abs() < 1e-3, "clipped norm was {norm}");
        Ok(())
    }

    #[test]
    fn grads_below_the_limit_are_untouched() -> Result<()> {
        let varmap = const_varmap(1.)?;
        let w = varmap.all_vars()[0].clone();
        let loss = w.sum_all()?;
        let grads = clip_grad(&loss, &varmap, 10.0)?;
        let grad = grads.get_id(w.id()).unwrap();
        assert_eq!(grad.to_vec1::<f32>()?, vec![1., 1., 1., 1.]);
        Ok(())
    }

    #[test]
    fn backward_step_applies_clipped_grads() -> Result<()> {
        let varmap = const_varmap(1.)?;
        let w = varmap.all_vars()[0].clone();
        let params = ParamsAdamW {
            lr: 0.1,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        let mut optimizer = OptimizerWithMaxGrad::new(optimizer, Some(1.0), varmap);
        let loss = (w.as_tensor().sum_all()? * 1000.)?;
        optimizer.backward_step(&loss)?;
        let updated = w.to_vec1::<f32>()?;
        assert!(updated.iter().all(|v| *v < 1.));
        Ok(())
    }

    #[test]
    fn hard_update_copies_the_source() -> Result<()> {
        let source = const_varmap(2.)?;
        let target = const_varmap(0.5)?;
        hard_update(&source, &target)?;
        assert_eq!(target.all_vars()[0].to_vec1::<f32>()?, vec![2., 2., 2., 2.]);
        Ok(())
    }

    #[test]
    fn soft_update_blends_with_tau() -> Result<()> {
        let source = const_varmap(2.)?;
        let target = const_varmap(0.5)?;
        soft_update(&source, &target, 0.1)?;
        // 0.1 * 2.0 + 0.9 * 0.5
        for value in target.all_vars()[0].to_vec1::<f32>()? {
            assert!((value - 0.65).abs() < 1e-6, "blended value was {value}");
        }
        // the source is left alone
        assert_eq!(source.all_vars()[0].to_vec1::<f32>()?, vec![2., 2., 2., 2.]);
        Ok(())
    }

    #[test]
    fn updates_fail_on_mismatched_varmaps() -> Result<()> {
        let source = const_varmap(1.)?;
        let target = VarMap::new();
        target.get(4, "other", Init::Const(0.), DType::F32, &Device::Cpu)?;
        assert!(soft_update(&source, &target, 0.5).is_err());
        assert!(hard_update(&source, &target).is_err());
        Ok(())
    }
}
