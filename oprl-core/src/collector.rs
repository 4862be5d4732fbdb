use crate::{
    env::{Env, EnvironmentDescription},
    env_pools::{EnvHolder, EnvHolderKind},
    policies::Policy,
    replay_buffer::{ReplayBuffer, Transition},
    rng::RNG,
};
use candle_core::{Device, Result, Tensor};
use rand::Rng;
use std::time::Duration;

/// What a collection run produced. Returns and lengths cover the episodes that finished during
/// the run.
#[derive(Debug, Default, Clone)]
pub struct CollectStats {
    pub n_steps: usize,
    pub n_episodes: usize,
    pub returns: Vec<f32>,
    pub lengths: Vec<usize>,
}

impl CollectStats {
    pub fn mean_return(&self) -> f32 {
        if self.returns.is_empty() {
            0.
        } else {
            self.returns.iter().sum::<f32>() / self.returns.len() as f32
        }
    }

    pub fn mean_length(&self) -> f32 {
        if self.lengths.is_empty() {
            0.
        } else {
            self.lengths.iter().sum::<usize>() as f32 / self.lengths.len() as f32
        }
    }
}

/// Runs a policy against an env pool and records what happened. A collector with a replay
/// buffer feeds training, one without is an evaluator.
pub struct Collector<E: Env> {
    pub env_holder: EnvHolderKind<E>,
    pub buffer: Option<ReplayBuffer>,
    device: Device,
    current_states: Vec<Tensor>,
    episode_returns: Vec<f32>,
    episode_lengths: Vec<usize>,
}

impl<E: Env> Collector<E> {
    pub fn new(
        env_holder: EnvHolderKind<E>,
        buffer: Option<ReplayBuffer>,
        device: Device,
    ) -> Result<Self> {
        let num_envs = env_holder.num_envs();
        let mut collector = Self {
            env_holder,
            buffer,
            device,
            current_states: vec![],
            episode_returns: vec![0.; num_envs],
            episode_lengths: vec![0; num_envs],
        };
        collector.reset()?;
        Ok(collector)
    }

    pub fn num_envs(&self) -> usize {
        self.env_holder.num_envs()
    }

    pub fn env_description(&self) -> EnvironmentDescription {
        self.env_holder.env_description()
    }

    /// Reseeds and resets every env and clears the per env episode accumulators. The replay
    /// buffer is left alone.
    pub fn reset(&mut self) -> Result<()> {
        let num_envs = self.env_holder.num_envs();
        let mut states = Vec::with_capacity(num_envs);
        for env_idx in 0..num_envs {
            let seed = RNG.with_borrow_mut(|rng| rng.random::<u64>());
            states.push(self.env_holder.reset_env(env_idx, seed)?);
        }
        self.current_states = states;
        self.episode_returns = vec![0.; num_envs];
        self.episode_lengths = vec![0; num_envs];
        Ok(())
    }

    fn act_batch<P: Policy>(
        &self,
        policy: &P,
        env_idxs: &[usize],
        deterministic: bool,
    ) -> Result<Vec<(usize, Tensor)>> {
        let states: Vec<Tensor> = env_idxs
            .iter()
            .map(|idx| self.current_states[*idx].clone())
            .collect();
        let observations = Tensor::stack(&states, 0)?.to_device(&self.device)?;
        let actions = if deterministic {
            policy.act_deterministic(&observations)?
        } else {
            policy.act(&observations)?
        };
        let actions = actions.to_device(&Device::Cpu)?;
        env_idxs
            .iter()
            .enumerate()
            .map(|(row, env_idx)| Ok((*env_idx, actions.get(row)?)))
            .collect()
    }

    /// Steps the pool until at least `n_steps` environment steps have been taken, recording
    /// every transition into the replay buffer. Finished envs are reset on the spot.
    pub fn collect_steps<P: Policy>(&mut self, policy: &P, n_steps: usize) -> Result<CollectStats> {
        let num_envs = self.env_holder.num_envs();
        let mut stats = CollectStats::default();
        while stats.n_steps < n_steps {
            let env_idxs: Vec<usize> = (0..num_envs).collect();
            let actions = self.act_batch(policy, &env_idxs, false)?;
            let mut actions_by_env: Vec<Option<Tensor>> = vec![None; num_envs];
            for (env_idx, action) in &actions {
                actions_by_env[*env_idx] = Some(action.clone());
            }
            let snapshots = self.env_holder.step(actions)?;
            for (env_idx, snapshot) in snapshots {
                let Some(action) = actions_by_env[env_idx].take() else {
                    candle_core::bail!("got a snapshot for env {env_idx} which was not stepped")
                };
                let done = snapshot.done();
                if let Some(buffer) = &mut self.buffer {
                    buffer.push(Transition {
                        state: self.current_states[env_idx].clone(),
                        action,
                        reward: snapshot.reward,
                        next_state: snapshot.state.clone(),
                        done: snapshot.terminated,
                    });
                }
                self.episode_returns[env_idx] += snapshot.reward;
                self.episode_lengths[env_idx] += 1;
                stats.n_steps += 1;
                if done {
                    stats.n_episodes += 1;
                    stats.returns.push(self.episode_returns[env_idx]);
                    stats.lengths.push(self.episode_lengths[env_idx]);
                    self.episode_returns[env_idx] = 0.;
                    self.episode_lengths[env_idx] = 0;
                    let seed = RNG.with_borrow_mut(|rng| rng.random::<u64>());
                    self.current_states[env_idx] = self.env_holder.reset_env(env_idx, seed)?;
                } else {
                    self.current_states[env_idx] = snapshot.state;
                }
            }
        }
        Ok(stats)
    }

    /// Runs evaluation episodes with deterministic actions. The quota is spread over the pool,
    /// every env runs at most its share of episodes and nothing is recorded into the buffer.
    /// `render_delay` sleeps between vector steps after rendering the first env.
    pub fn collect_episodes<P: Policy>(
        &mut self,
        policy: &P,
        n_episodes: usize,
        render_delay: Option<Duration>,
    ) -> Result<CollectStats> {
        let num_envs = self.env_holder.num_envs();
        let mut quotas = vec![n_episodes / num_envs; num_envs];
        for quota in quotas.iter_mut().take(n_episodes % num_envs) {
            *quota += 1;
        }
        let mut stats = CollectStats::default();
        while stats.n_episodes < n_episodes {
            let env_idxs: Vec<usize> = (0..num_envs).filter(|idx| quotas[*idx] > 0).collect();
            let actions = self.act_batch(policy, &env_idxs, true)?;
            let snapshots = self.env_holder.step(actions)?;
            if let Some(delay) = render_delay {
                self.env_holder.render_env(env_idxs[0])?;
                std::thread::sleep(delay);
            }
            for (env_idx, snapshot) in snapshots {
                self.episode_returns[env_idx] += snapshot.reward;
                self.episode_lengths[env_idx] += 1;
                stats.n_steps += 1;
                if snapshot.done() {
                    quotas[env_idx] -= 1;
                    stats.n_episodes += 1;
                    stats.returns.push(self.episode_returns[env_idx]);
                    stats.lengths.push(self.episode_lengths[env_idx]);
                    self.episode_returns[env_idx] = 0.;
                    self.episode_lengths[env_idx] = 0;
                    let seed = RNG.with_borrow_mut(|rng| rng.random::<u64>());
                    self.current_states[env_idx] = self.env_holder.reset_env(env_idx, seed)?;
                } else {
                    self.current_states[env_idx] = snapshot.state;
                }
            }
        }
        Ok(stats)
    }
}
