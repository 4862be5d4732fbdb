use super::{Critic, TD3};
use candle_core::{DType, Device, Result};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use oprl_core::{
    env::EnvironmentDescription,
    exploration::GaussianNoise,
    policies::{Actor, DeterministicPolicy, OptimizerWithMaxGrad, hard_update},
    thread_safe_sequential::{ThreadSafeSequential, build_sequential},
    utils::running_mean_std::RunningMeanStd,
};

/// Sizes and assembles the six TD3 networks from an environment description.
pub struct TD3Builder {
    pub actor_lr: f64,
    pub critic_lr: f64,
    pub gamma: f64,
    pub tau: f64,
    pub exploration_noise: f64,
    pub policy_noise: f64,
    pub noise_clip: f64,
    pub update_actor_freq: usize,
    pub hidden_layers: Vec<usize>,
    pub max_grad_norm: Option<f32>,
    pub reward_normalization: bool,
    pub ignore_done: bool,
}

impl Default for TD3Builder {
    fn default() -> Self {
        Self {
            actor_lr: 3e-5,
            critic_lr: 1e-4,
            gamma: 0.99,
            tau: 0.005,
            exploration_noise: 0.1,
            policy_noise: 0.2,
            noise_clip: 0.5,
            update_actor_freq: 2,
            hidden_layers: vec![128],
            max_grad_norm: None,
            reward_normalization: true,
            ignore_done: true,
        }
    }
}

struct NetworkPair {
    net: ThreadSafeSequential,
    varmap: VarMap,
    target_net: ThreadSafeSequential,
    target_varmap: VarMap,
}

impl TD3Builder {
    fn build_network_pair(
        &self,
        input_dim: usize,
        output_dim: usize,
        prefix: &str,
        device: &Device,
    ) -> Result<NetworkPair> {
        let mut layers = self.hidden_layers.clone();
        layers.push(output_dim);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let net = build_sequential(input_dim, &layers, &vb, prefix)?;

        let target_varmap = VarMap::new();
        let target_vb = VarBuilder::from_varmap(&target_varmap, DType::F32, device);
        let target_net = build_sequential(input_dim, &layers, &target_vb, prefix)?;
        hard_update(&varmap, &target_varmap)?;

        Ok(NetworkPair {
            net,
            varmap,
            target_net,
            target_varmap,
        })
    }

    fn optimizer(&self, varmap: VarMap, lr: f64) -> Result<OptimizerWithMaxGrad> {
        let params = ParamsAdamW {
            lr,
            weight_decay: 0.,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        Ok(OptimizerWithMaxGrad::new(
            optimizer,
            self.max_grad_norm,
            varmap,
        ))
    }

    pub fn build(&self, env_description: &EnvironmentDescription, device: &Device) -> Result<TD3> {
        let observation_size = env_description.observation_size();
        let action_size = env_description.action_size();
        let max_action = env_description.max_action().unwrap_or(1.) as f64;

        let actor_pair =
            self.build_network_pair(observation_size, action_size, "actor", device)?;
        let critic_input = observation_size + action_size;
        let critic1_pair = self.build_network_pair(critic_input, 1, "critic1", device)?;
        let critic2_pair = self.build_network_pair(critic_input, 1, "critic2", device)?;

        let exploration_noise = if self.exploration_noise > 0. {
            Some(GaussianNoise::new(self.exploration_noise as f32))
        } else {
            None
        };
        let policy = DeterministicPolicy::new(
            Actor::new(actor_pair.net, max_action),
            exploration_noise,
        );

        Ok(TD3 {
            policy,
            actor_target: Actor::new(actor_pair.target_net, max_action),
            critic1: Critic::new(critic1_pair.net),
            critic2: Critic::new(critic2_pair.net),
            critic1_target: Critic::new(critic1_pair.target_net),
            critic2_target: Critic::new(critic2_pair.target_net),
            actor_optimizer: self.optimizer(actor_pair.varmap, self.actor_lr)?,
            critic1_optimizer: self.optimizer(critic1_pair.varmap, self.critic_lr)?,
            critic2_optimizer: self.optimizer(critic2_pair.varmap, self.critic_lr)?,
            actor_target_varmap: actor_pair.target_varmap,
            critic1_target_varmap: critic1_pair.target_varmap,
            critic2_target_varmap: critic2_pair.target_varmap,
            gamma: self.gamma,
            tau: self.tau,
            policy_noise: self.policy_noise,
            noise_clip: self.noise_clip,
            update_actor_freq: self.update_actor_freq,
            reward_normalization: self.reward_normalization,
            ignore_done: self.ignore_done,
            reward_rms: RunningMeanStd::new(1, device.clone()),
            gradient_step: 0,
            device: device.clone(),
        })
    }
}
