use crate::builders::env_pool::{EnvBuilderTrait, EnvPoolBuilder, PoolType};
use candle_core::{Device, Result};
use oprl_agents::td3::{TD3, TD3Builder};
use oprl_core::{
    collector::Collector,
    env_pools::EnvHolder,
    off_policy_algorithm::{
        DefaultOffPolicyHooks, OffPolicyAlgorithm, TrainerParams, TrainingReport,
    },
    replay_buffer::ReplayBuffer,
};
use std::path::PathBuf;

type StopFn = Box<dyn Fn(f32) -> bool>;

/// Assembles a TD3 trainer: two env pools, a replay buffer fed train collector, an episode
/// only test collector, the agent networks and the default hooks.
pub struct OffPolicyAlgorithmBuilder {
    pub device: Device,
    pub num_train_envs: usize,
    pub num_test_envs: usize,
    pub train_pool_type: PoolType,
    pub test_pool_type: PoolType,
    pub buffer_size: usize,
    pub trainer_params: TrainerParams,
    pub td3: TD3Builder,
    pub stop_fn: Option<StopFn>,
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for OffPolicyAlgorithmBuilder {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            num_train_envs: 8,
            num_test_envs: 100,
            train_pool_type: PoolType::Thread,
            test_pool_type: PoolType::Thread,
            buffer_size: 20000,
            trainer_params: TrainerParams {
                epochs: 100,
                step_per_epoch: 2400,
                collect_per_step: 10,
                update_per_collect: 10,
                batch_size: 128,
                episode_per_test: 100,
            },
            td3: TD3Builder::default(),
            stop_fn: None,
            checkpoint_dir: None,
        }
    }
}

impl OffPolicyAlgorithmBuilder {
    pub fn build<B: EnvBuilderTrait>(
        mut self,
        env_builder: &B,
    ) -> Result<OffPolicyAlgorithm<B::Env, TD3, DefaultOffPolicyHooks>> {
        let train_holder = EnvPoolBuilder {
            pool_type: self.train_pool_type,
            num_envs: self.num_train_envs,
        }
        .build(env_builder)?;
        let test_holder = EnvPoolBuilder {
            pool_type: self.test_pool_type,
            num_envs: self.num_test_envs,
        }
        .build(env_builder)?;

        let env_description = train_holder.env_description();
        let agent = self.td3.build(&env_description, &self.device)?;

        let train_collector = Collector::new(
            train_holder,
            Some(ReplayBuffer::new(self.buffer_size)),
            self.device.clone(),
        )?;
        let test_collector = Collector::new(test_holder, None, self.device.clone())?;

        let hooks = match self.stop_fn.take() {
            Some(stop_fn) => DefaultOffPolicyHooks::with_stop_fn(stop_fn),
            None => DefaultOffPolicyHooks::new(),
        };

        Ok(OffPolicyAlgorithm {
            agent,
            train_collector,
            test_collector,
            params: self.trainer_params,
            hooks,
            checkpoint_dir: self.checkpoint_dir,
            device: self.device,
            report: TrainingReport::default(),
        })
    }
}
