use super::EnvHolder;
use crate::env::{Env, EnvironmentDescription, StepSnapshot};
use candle_core::{Result, Tensor};

/// The dummy pool: every env lives on the calling thread and steps one after the other.
pub struct VecEnvHolder<E: Env> {
    pub envs: Vec<E>,
}

impl<E: Env> VecEnvHolder<E> {
    pub fn new(envs: Vec<E>) -> Self {
        Self { envs }
    }
}

impl<E: Env> EnvHolder for VecEnvHolder<E> {
    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn env_description(&self) -> EnvironmentDescription {
        self.envs[0].env_description()
    }

    fn reset_env(&mut self, env_idx: usize, seed: u64) -> Result<Tensor> {
        self.envs[env_idx].reset(seed)
    }

    fn step(&mut self, actions: Vec<(usize, Tensor)>) -> Result<Vec<(usize, StepSnapshot)>> {
        actions
            .into_iter()
            .map(|(env_idx, action)| {
                let snapshot = self.envs[env_idx].step(&action)?;
                Ok((env_idx, snapshot))
            })
            .collect()
    }

    fn render_env(&mut self, env_idx: usize) -> Result<()> {
        self.envs[env_idx].render();
        Ok(())
    }
}
