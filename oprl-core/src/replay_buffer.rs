use crate::rng::RNG;
use candle_core::{Device, Result, Tensor};
use rand::Rng;

/// A single environment transition as the collector records it. States live on the CPU, the
/// sampled batches move to the training device.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Tensor,
    pub action: Tensor,
    pub reward: f32,
    pub next_state: Tensor,
    pub done: bool,
}

/// A bounded ring buffer of past transitions. Once full, new transitions overwrite the oldest
/// ones.
#[derive(Debug, Default)]
pub struct ReplayBuffer {
    pub capacity: usize,
    pub states: Vec<Tensor>,
    pub actions: Vec<Tensor>,
    pub rewards: Vec<f32>,
    pub next_states: Vec<Tensor>,
    pub dones: Vec<bool>,
    head: usize,
}

/// A minibatch sampled from the replay buffer, stacked and moved to the training device.
/// Rewards and the done mask come out with shape [batch, 1] so they broadcast against the
/// critic outputs.
pub struct TransitionBatch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_observations: Tensor,
    pub dones: Tensor,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            states: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            next_states: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn push(&mut self, transition: Transition) {
        let Transition {
            state,
            action,
            reward,
            next_state,
            done,
        } = transition;
        if self.is_full() {
            self.states[self.head] = state;
            self.actions[self.head] = action;
            self.rewards[self.head] = reward;
            self.next_states[self.head] = next_state;
            self.dones[self.head] = done;
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.states.push(state);
            self.actions.push(action);
            self.rewards.push(reward);
            self.next_states.push(next_state);
            self.dones.push(done);
            if self.is_full() {
                self.head = 0;
            }
        }
    }

    pub fn sample(&self, batch_size: usize, device: &Device) -> Result<TransitionBatch> {
        if self.len() < batch_size {
            candle_core::bail!(
                "cannot sample {batch_size} transitions from a buffer holding {}",
                self.len()
            )
        }
        let indices: Vec<usize> = RNG.with_borrow_mut(|rng| {
            (0..batch_size)
                .map(|_| rng.random_range(0..self.len()))
                .collect()
        });
        let mut states = Vec::with_capacity(batch_size);
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut next_states = Vec::with_capacity(batch_size);
        let mut dones = Vec::with_capacity(batch_size);
        for idx in indices {
            states.push(self.states[idx].clone());
            actions.push(self.actions[idx].clone());
            rewards.push(self.rewards[idx]);
            next_states.push(self.next_states[idx].clone());
            dones.push(if self.dones[idx] { 1.0f32 } else { 0.0 });
        }
        let observations = Tensor::stack(&states, 0)?.to_device(device)?;
        let actions = Tensor::stack(&actions, 0)?.to_device(device)?;
        let next_observations = Tensor::stack(&next_states, 0)?.to_device(device)?;
        let rewards = Tensor::from_vec(rewards, (batch_size, 1), device)?;
        let dones = Tensor::from_vec(dones, (batch_size, 1), device)?;
        Ok(TransitionBatch {
            observations,
            actions,
            rewards,
            next_observations,
            dones,
        })
    }
}
