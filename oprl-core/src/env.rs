use candle_core::{Result, Tensor};

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Tensor>,
        max: Option<Tensor>,
        size: usize,
    },
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size, .. } => *size,
        }
    }

    /// The largest magnitude a continous action component can take, if the space is bounded.
    pub fn high(&self) -> Option<f32> {
        match &self {
            Self::Discrete(..) => None,
            Self::Continous { max, .. } => {
                let max = max.as_ref()?;
                max.flatten_all().ok()?.to_vec1::<f32>().ok()?.first().copied()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
    /// The average episode return above which the environment counts as solved. Mirrors the
    /// reward threshold a gym registry entry would carry.
    pub reward_threshold: Option<f32>,
}

impl EnvironmentDescription {
    pub fn new(
        observation_space: Space,
        action_space: Space,
        reward_threshold: Option<f32>,
    ) -> Self {
        Self {
            observation_space,
            action_space,
            reward_threshold,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    pub fn max_action(&self) -> Option<f32> {
        self.action_space.high()
    }
}

/// What a single environment step hands back.
pub struct StepSnapshot {
    pub state: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl StepSnapshot {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env: Send {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;
    fn step(&mut self, action: &Tensor) -> Result<StepSnapshot>;
    fn env_description(&self) -> EnvironmentDescription;

    /// Draw the current state somewhere a human can see it. No-op by default.
    fn render(&mut self) {}
}
