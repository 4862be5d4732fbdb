use candle_core::{Device, Result, Tensor};
use oprl_core::{
    collector::Collector,
    env::{Env, EnvironmentDescription, Space, StepSnapshot},
    env_pools::{EnvHolderKind, thread_env_holder::ThreadEnvHolder, vector_env_holder::VecEnvHolder},
    policies::Policy,
    replay_buffer::ReplayBuffer,
};

/// Terminates after a fixed number of steps, paying one unit of reward per step.
struct CountdownEnv {
    t: usize,
    episode_len: usize,
}

impl CountdownEnv {
    fn new(episode_len: usize) -> Self {
        Self { t: 0, episode_len }
    }
}

impl Env for CountdownEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.t = 0;
        Tensor::from_slice(&[0f32], 1, &Device::Cpu)
    }

    fn step(&mut self, _action: &Tensor) -> Result<StepSnapshot> {
        self.t += 1;
        Ok(StepSnapshot {
            state: Tensor::from_slice(&[self.t as f32], 1, &Device::Cpu)?,
            reward: 1.,
            terminated: self.t >= self.episode_len,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let min = Tensor::from_slice(&[-1f32], 1, &Device::Cpu).unwrap();
        let max = Tensor::from_slice(&[1f32], 1, &Device::Cpu).unwrap();
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![1]),
            Space::Continous {
                min: Some(min),
                max: Some(max),
                size: 1,
            },
            None,
        )
    }
}

struct ZeroPolicy;

impl Policy for ZeroPolicy {
    fn act(&self, observation: &Tensor) -> Result<Tensor> {
        observation.zeros_like()
    }
}

/// Observations encode the reset seed, so runs with the same rng seed are comparable and
/// transitions are attributable to the env that produced them.
struct SeedEnv {
    seed: u64,
    t: usize,
}

impl SeedEnv {
    fn new() -> Self {
        Self { seed: 0, t: 0 }
    }

    fn observation(&self) -> Result<Tensor> {
        let obs = [(self.seed % 97) as f32, self.t as f32];
        Tensor::from_slice(&obs, obs.len(), &Device::Cpu)
    }
}

impl Env for SeedEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        self.seed = seed;
        self.t = 0;
        self.observation()
    }

    fn step(&mut self, _action: &Tensor) -> Result<StepSnapshot> {
        self.t += 1;
        Ok(StepSnapshot {
            state: self.observation()?,
            reward: (self.seed % 7) as f32,
            terminated: self.t >= 3,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let min = Tensor::from_slice(&[-1f32, -1.], 2, &Device::Cpu).unwrap();
        let max = Tensor::from_slice(&[1f32, 1.], 2, &Device::Cpu).unwrap();
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![2]),
            Space::Continous {
                min: Some(min),
                max: Some(max),
                size: 2,
            },
            None,
        )
    }
}

/// Echoes the observation back as the action.
struct IdentityPolicy;

impl Policy for IdentityPolicy {
    fn act(&self, observation: &Tensor) -> Result<Tensor> {
        Ok(observation.clone())
    }
}

#[test]
fn step_collection_fills_the_buffer_and_counts_episodes() -> Result<()> {
    let envs = vec![CountdownEnv::new(5), CountdownEnv::new(5)];
    let holder = EnvHolderKind::Vec(VecEnvHolder::new(envs));
    let mut collector = Collector::new(holder, Some(ReplayBuffer::new(100)), Device::Cpu)?;
    let stats = collector.collect_steps(&ZeroPolicy, 20)?;
    assert_eq!(stats.n_steps, 20);
    // both envs finish every 5 steps, 10 steps each -> 4 episodes
    assert_eq!(stats.n_episodes, 4);
    assert!(stats.returns.iter().all(|r| *r == 5.));
    assert!(stats.lengths.iter().all(|l| *l == 5));
    assert_eq!(collector.buffer.as_ref().unwrap().len(), 20);
    Ok(())
}

#[test]
fn episode_collection_respects_the_quota_and_skips_the_buffer() -> Result<()> {
    let envs = vec![CountdownEnv::new(3), CountdownEnv::new(3), CountdownEnv::new(3)];
    let holder = EnvHolderKind::Vec(VecEnvHolder::new(envs));
    let mut collector = Collector::new(holder, None, Device::Cpu)?;
    let stats = collector.collect_episodes(&ZeroPolicy, 3, None)?;
    assert_eq!(stats.n_episodes, 3);
    assert_eq!(stats.n_steps, 9);
    assert_eq!(stats.mean_return(), 3.);
    assert_eq!(stats.mean_length(), 3.);
    Ok(())
}

#[test]
fn recorded_actions_belong_to_their_envs() -> Result<()> {
    let holder = EnvHolderKind::Vec(VecEnvHolder::new(vec![SeedEnv::new(), SeedEnv::new()]));
    let mut collector = Collector::new(holder, Some(ReplayBuffer::new(64)), Device::Cpu)?;
    collector.collect_steps(&IdentityPolicy, 12)?;
    // the policy echoes the observation, so every stored action must equal the state it was
    // computed from
    let buffer = collector.buffer.as_ref().unwrap();
    for (state, action) in buffer.states.iter().zip(buffer.actions.iter()) {
        assert_eq!(state.to_vec1::<f32>()?, action.to_vec1::<f32>()?);
    }
    Ok(())
}

#[test]
fn collection_is_reproducible_under_the_same_seed() -> Result<()> {
    let run = || -> Result<(Vec<Vec<f32>>, Vec<f32>)> {
        oprl_core::rng::set_seed(9);
        let holder = EnvHolderKind::Vec(VecEnvHolder::new(vec![SeedEnv::new(), SeedEnv::new()]));
        let mut collector = Collector::new(holder, Some(ReplayBuffer::new(64)), Device::Cpu)?;
        collector.collect_steps(&IdentityPolicy, 10)?;
        let buffer = collector.buffer.as_ref().unwrap();
        let states = buffer
            .states
            .iter()
            .map(|t| t.to_vec1::<f32>())
            .collect::<Result<Vec<_>>>()?;
        Ok((states, buffer.rewards.clone()))
    };
    let (first_states, first_rewards) = run()?;
    let (second_states, second_rewards) = run()?;
    assert_eq!(first_states, second_states);
    assert_eq!(first_rewards, second_rewards);
    Ok(())
}

#[test]
fn thread_pool_matches_the_vec_pool() -> Result<()> {
    let vec_holder = EnvHolderKind::Vec(VecEnvHolder::new(vec![
        CountdownEnv::new(4),
        CountdownEnv::new(4),
    ]));
    let thread_holder: EnvHolderKind<CountdownEnv> = EnvHolderKind::Thread(ThreadEnvHolder::spawn(
        vec![CountdownEnv::new(4), CountdownEnv::new(4)],
    )?);
    let mut vec_collector = Collector::new(vec_holder, Some(ReplayBuffer::new(64)), Device::Cpu)?;
    let mut thread_collector =
        Collector::new(thread_holder, Some(ReplayBuffer::new(64)), Device::Cpu)?;
    let vec_stats = vec_collector.collect_steps(&ZeroPolicy, 16)?;
    let thread_stats = thread_collector.collect_steps(&ZeroPolicy, 16)?;
    assert_eq!(vec_stats.n_steps, thread_stats.n_steps);
    assert_eq!(vec_stats.n_episodes, thread_stats.n_episodes);
    assert_eq!(vec_stats.returns, thread_stats.returns);
    Ok(())
}
