pub mod builder;

use candle_core::{Device, Result, Tensor};
use oprl_core::{
    agents::{LearnStats, OffPolicyAgent},
    policies::{Actor, DeterministicPolicy, OptimizerWithMaxGrad, soft_update},
    replay_buffer::TransitionBatch,
    tensors::{ActorLoss, CriticLoss},
    thread_safe_sequential::ThreadSafeSequential,
    utils::running_mean_std::RunningMeanStd,
};
use candle_nn::VarMap;
use std::path::Path;

pub use builder::TD3Builder;

/// A state-action value network. The observation and action are concatenated before the MLP.
pub struct Critic {
    net: ThreadSafeSequential,
}

impl Critic {
    pub fn new(net: ThreadSafeSequential) -> Self {
        Self { net }
    }

    pub fn forward(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let input = Tensor::cat(&[observations, actions], 1)?;
        self.net.forward(&input)
    }
}

/// Twin delayed DDPG. Twin critics bootstrapped through the smaller of the two target
/// estimates, the actor trained at a fraction of the critic cadence, targets trailing behind
/// through soft updates.
pub struct TD3 {
    pub policy: DeterministicPolicy,
    actor_target: Actor,
    critic1: Critic,
    critic2: Critic,
    critic1_target: Critic,
    critic2_target: Critic,
    actor_optimizer: OptimizerWithMaxGrad,
    critic1_optimizer: OptimizerWithMaxGrad,
    critic2_optimizer: OptimizerWithMaxGrad,
    actor_target_varmap: VarMap,
    critic1_target_varmap: VarMap,
    critic2_target_varmap: VarMap,
    gamma: f64,
    tau: f64,
    policy_noise: f64,
    noise_clip: f64,
    update_actor_freq: usize,
    reward_normalization: bool,
    ignore_done: bool,
    reward_rms: RunningMeanStd,
    gradient_step: usize,
    device: Device,
}

impl TD3 {
    fn normalize_rewards(&mut self, rewards: Tensor) -> Result<Tensor> {
        if !self.reward_normalization {
            return Ok(rewards);
        }
        self.reward_rms.update(&rewards)?;
        let std = self.reward_rms.std(1e-8)?;
        rewards
            .broadcast_sub(&self.reward_rms.mean)?
            .broadcast_div(&std)
    }

    fn critic_targets(
        &self,
        batch: &TransitionBatch,
        rewards: &Tensor,
        not_done: &Tensor,
    ) -> Result<Tensor> {
        let next_actions = self.actor_target.forward(&batch.next_observations)?;
        let noise = Tensor::randn(
            0f32,
            self.policy_noise as f32,
            next_actions.shape(),
            &self.device,
        )?
        .clamp(-self.noise_clip, self.noise_clip)?;
        let max_action = self.policy.actor.max_action();
        let next_actions = (next_actions + noise)?.clamp(-max_action, max_action)?;
        let target_q1 = self
            .critic1_target
            .forward(&batch.next_observations, &next_actions)?;
        let target_q2 = self
            .critic2_target
            .forward(&batch.next_observations, &next_actions)?;
        let target_q = target_q1.minimum(&target_q2)?;
        let target = (rewards + (target_q.mul(not_done)? * self.gamma)?)?;
        Ok(target.detach())
    }

    fn update_actor(&mut self, observations: &Tensor) -> Result<f32> {
        let actions = self.policy.actor.forward(observations)?;
        let q_values = self.critic1.forward(observations, &actions)?;
        let actor_loss = ActorLoss(q_values.neg()?.mean_all()?);
        self.actor_optimizer.backward_step(&actor_loss)?;
        soft_update(
            &self.actor_optimizer.varmap,
            &self.actor_target_varmap,
            self.tau,
        )?;
        soft_update(
            &self.critic1_optimizer.varmap,
            &self.critic1_target_varmap,
            self.tau,
        )?;
        soft_update(
            &self.critic2_optimizer.varmap,
            &self.critic2_target_varmap,
            self.tau,
        )?;
        actor_loss.to_scalar::<f32>()
    }
}

impl OffPolicyAgent for TD3 {
    type Policy = DeterministicPolicy;

    fn policy(&self) -> &Self::Policy {
        &self.policy
    }

    fn learn(&mut self, batch: TransitionBatch) -> Result<LearnStats> {
        let rewards = self.normalize_rewards(batch.rewards.clone())?;
        // bootstrapping through episode ends is intentional when ignore_done is set
        let not_done = if self.ignore_done {
            batch.dones.ones_like()?
        } else {
            batch.dones.affine(-1., 1.)?
        };
        let target = self.critic_targets(&batch, &rewards, &not_done)?;

        let q1 = self.critic1.forward(&batch.observations, &batch.actions)?;
        let critic1_loss = CriticLoss(q1.sub(&target)?.sqr()?.mean_all()?);
        self.critic1_optimizer.backward_step(&critic1_loss)?;

        let q2 = self.critic2.forward(&batch.observations, &batch.actions)?;
        let critic2_loss = CriticLoss(q2.sub(&target)?.sqr()?.mean_all()?);
        self.critic2_optimizer.backward_step(&critic2_loss)?;

        self.gradient_step += 1;
        let actor_loss = if self.gradient_step % self.update_actor_freq == 0 {
            Some(self.update_actor(&batch.observations)?)
        } else {
            None
        };

        let critic_loss =
            (critic1_loss.to_scalar::<f32>()? + critic2_loss.to_scalar::<f32>()?) / 2.;
        Ok(LearnStats {
            actor_loss,
            critic_loss,
        })
    }

    fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(candle_core::Error::wrap)?;
        self.actor_optimizer.varmap.save(dir.join("actor.safetensors"))?;
        self.critic1_optimizer
            .varmap
            .save(dir.join("critic1.safetensors"))?;
        self.critic2_optimizer
            .varmap
            .save(dir.join("critic2.safetensors"))?;
        Ok(())
    }
}
