use candle_core::Result;
use oprl_core::{
    env::Env,
    env_pools::{EnvHolderKind, thread_env_holder::ThreadEnvHolder, vector_env_holder::VecEnvHolder},
};
use oprl_envs::NativeEnv;

/// Anything that can stamp out environment replicas for a pool.
pub trait EnvBuilderTrait {
    type Env: Env + 'static;

    fn build_env(&self, env_idx: usize) -> Result<Self::Env>;
}

impl<E: Env + 'static, F: Fn(usize) -> Result<E>> EnvBuilderTrait for F {
    type Env = E;

    fn build_env(&self, env_idx: usize) -> Result<E> {
        self(env_idx)
    }
}

impl EnvBuilderTrait for String {
    type Env = NativeEnv;

    fn build_env(&self, _env_idx: usize) -> Result<NativeEnv> {
        oprl_envs::make(self, None)
    }
}

/// Builds replicas of a registered task by its id.
pub struct TaskEnvBuilder {
    pub task: String,
    pub max_episode_steps: Option<usize>,
}

impl TaskEnvBuilder {
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_owned(),
            max_episode_steps: None,
        }
    }
}

impl EnvBuilderTrait for TaskEnvBuilder {
    type Env = NativeEnv;

    fn build_env(&self, _env_idx: usize) -> Result<NativeEnv> {
        oprl_envs::make(&self.task, self.max_episode_steps)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolType {
    /// All envs stepped sequentially on the calling thread.
    #[default]
    Vec,
    /// One worker thread per env.
    Thread,
}

pub struct EnvPoolBuilder {
    pub pool_type: PoolType,
    pub num_envs: usize,
}

impl EnvPoolBuilder {
    pub fn build<B: EnvBuilderTrait>(&self, env_builder: &B) -> Result<EnvHolderKind<B::Env>> {
        let envs = (0..self.num_envs)
            .map(|env_idx| env_builder.build_env(env_idx))
            .collect::<Result<Vec<_>>>()?;
        match self.pool_type {
            PoolType::Vec => Ok(EnvHolderKind::Vec(VecEnvHolder::new(envs))),
            PoolType::Thread => Ok(EnvHolderKind::Thread(ThreadEnvHolder::spawn(envs)?)),
        }
    }
}
