pub mod thread_env_holder;
pub mod vector_env_holder;

use crate::env::{Env, EnvironmentDescription, StepSnapshot};
use candle_core::{Result, Tensor};
use enum_dispatch::enum_dispatch;
use thread_env_holder::ThreadEnvHolder;
use vector_env_holder::VecEnvHolder;

/// A pool of environment replicas. The collector decides which envs step in a given tick, the
/// holder is only responsible for executing resets and steps.
#[enum_dispatch]
pub trait EnvHolder {
    fn num_envs(&self) -> usize;

    fn env_description(&self) -> EnvironmentDescription;

    fn reset_env(&mut self, env_idx: usize, seed: u64) -> Result<Tensor>;

    /// Steps the listed envs with their actions, returning snapshots tagged with the same
    /// indices. The order of the returned snapshots is unspecified.
    fn step(&mut self, actions: Vec<(usize, Tensor)>) -> Result<Vec<(usize, StepSnapshot)>>;

    fn render_env(&mut self, env_idx: usize) -> Result<()>;
}

#[enum_dispatch(EnvHolder)]
pub enum EnvHolderKind<E: Env> {
    Vec(VecEnvHolder<E>),
    Thread(ThreadEnvHolder),
}
