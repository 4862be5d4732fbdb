use super::Policy;
use crate::{exploration::GaussianNoise, thread_safe_sequential::ThreadSafeSequential};
use candle_core::{Result, Tensor};

/// A deterministic continous actor: an MLP trunk with a tanh head scaled to the action bound.
pub struct Actor {
    net: ThreadSafeSequential,
    max_action: f64,
}

impl Actor {
    pub fn new(net: ThreadSafeSequential, max_action: f64) -> Self {
        Self { net, max_action }
    }

    pub fn forward(&self, observation: &Tensor) -> Result<Tensor> {
        let action = self.net.forward(observation)?.tanh()?;
        action * self.max_action
    }

    pub fn max_action(&self) -> f64 {
        self.max_action
    }
}

pub struct DeterministicPolicy {
    pub actor: Actor,
    pub exploration_noise: Option<GaussianNoise>,
}

impl DeterministicPolicy {
    pub fn new(actor: Actor, exploration_noise: Option<GaussianNoise>) -> Self {
        Self {
            actor,
            exploration_noise,
        }
    }
}

impl Policy for DeterministicPolicy {
    fn act(&self, observation: &Tensor) -> Result<Tensor> {
        let action = self.actor.forward(observation)?;
        let Some(noise) = &self.exploration_noise else {
            return Ok(action.detach());
        };
        let max_action = self.actor.max_action();
        let sampled = noise.sample(action.shape(), action.device())?;
        let noisy = (action + sampled)?;
        Ok(noisy.clamp(-max_action, max_action)?.detach())
    }

    fn act_deterministic(&self, observation: &Tensor) -> Result<Tensor> {
        Ok(self.actor.forward(observation)?.detach())
    }
}
